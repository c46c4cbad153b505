//! Session memory
//!
//! A bounded, ordered log of turns that renders itself into the prompt sent
//! to the language model. The bound is expressed in messages:
//! `2 * max_turns`, one user message and one assistant reply per turn.

use std::collections::VecDeque;

use voice_turn_config::ConversationConfig;
use voice_turn_core::{Turn, TurnRole};

/// Line that cues the model to answer
pub const ASSISTANT_CUE: &str = "Assistant:";

#[derive(Debug, Clone)]
pub struct SessionMemory {
    max_turns: usize,
    messages: VecDeque<Turn>,
}

impl SessionMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            messages: VecDeque::with_capacity(max_turns * 2 + 1),
        }
    }

    pub fn from_config(config: &ConversationConfig) -> Self {
        Self::new(config.max_turns)
    }

    /// Maximum number of stored messages
    pub fn capacity(&self) -> usize {
        self.max_turns * 2
    }

    /// Append a message, evicting the oldest ones past capacity
    pub fn add_message(&mut self, role: TurnRole, content: impl Into<String>) {
        self.messages.push_back(Turn::new(role, content));

        let capacity = self.capacity();
        while self.messages.len() > capacity {
            self.messages.pop_front();
        }
    }

    /// Append a message whose role arrives as text
    ///
    /// Only `user` and `assistant` (any case) are accepted.
    pub fn add_message_str(
        &mut self,
        role: &str,
        content: impl Into<String>,
    ) -> voice_turn_core::Result<()> {
        let role: TurnRole = role.parse()?;
        self.add_message(role, content);
        Ok(())
    }

    /// Render history plus a new user input
    ///
    /// Each stored message becomes `"<Role>: <content>"`, followed by
    /// `"User: <new_input>"` and the `"Assistant:"` cue, joined by newlines.
    pub fn get_prompt(&self, new_input: &str) -> String {
        let mut lines: Vec<String> = self.messages.iter().map(Turn::prompt_line).collect();
        lines.push(format!("{}: {}", TurnRole::User.display_name(), new_input));
        lines.push(ASSISTANT_CUE.to_string());
        lines.join("\n")
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.messages.iter()
    }

    /// Owned copy of the history, oldest first
    pub fn snapshot(&self) -> Vec<Turn> {
        self.messages.iter().cloned().collect()
    }
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::from_config(&ConversationConfig::default())
    }
}
