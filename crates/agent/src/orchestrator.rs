//! Turn orchestrator
//!
//! Drives one exchange: transcribe, prompt, generate, commit, synthesize.
//! The three engines are shared across sessions; each is guarded by its own
//! semaphore so engines that cannot take concurrent calls are serialized.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use voice_turn_config::{CommitPolicy, Settings};
use voice_turn_core::{
    LanguageModel, SpeechToText, Stage, StageTimings, TextToSpeech, Transcription, TurnRole,
};

use crate::session::Session;
use crate::AgentError;

/// In-flight call limits per engine
#[derive(Debug)]
pub struct StageLimits {
    stt: Semaphore,
    llm: Semaphore,
    tts: Semaphore,
}

impl StageLimits {
    pub fn new(stt: usize, llm: usize, tts: usize) -> Result<Self, AgentError> {
        for (stage, limit) in [
            (Stage::SpeechToText, stt),
            (Stage::LanguageModel, llm),
            (Stage::TextToSpeech, tts),
        ] {
            if limit == 0 {
                return Err(AgentError::Configuration(format!(
                    "{} concurrency limit must be at least 1",
                    stage
                )));
            }
        }

        Ok(Self {
            stt: Semaphore::new(stt),
            llm: Semaphore::new(llm),
            tts: Semaphore::new(tts),
        })
    }

    /// One call at a time into every engine
    pub fn serialized() -> Self {
        Self {
            stt: Semaphore::new(1),
            llm: Semaphore::new(1),
            tts: Semaphore::new(1),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AgentError> {
        Self::new(
            settings.stt.max_concurrent,
            settings.llm.max_concurrent,
            settings.tts.max_concurrent,
        )
    }

    fn semaphore(&self, stage: Stage) -> &Semaphore {
        match stage {
            Stage::SpeechToText => &self.stt,
            Stage::LanguageModel => &self.llm,
            Stage::TextToSpeech => &self.tts,
        }
    }
}

/// Result of one exchange
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// Nothing was said; generation and synthesis were skipped
    NoSpeech { transcription_time: Duration },
    Reply {
        transcript: String,
        text: String,
        audio: Vec<u8>,
        timings: StageTimings,
    },
}

impl ExchangeOutcome {
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, ExchangeOutcome::NoSpeech { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            ExchangeOutcome::NoSpeech { .. } => "",
            ExchangeOutcome::Reply { text, .. } => text,
        }
    }

    pub fn audio(&self) -> &[u8] {
        match self {
            ExchangeOutcome::NoSpeech { .. } => &[],
            ExchangeOutcome::Reply { audio, .. } => audio,
        }
    }

    pub fn transcription_time(&self) -> Duration {
        match self {
            ExchangeOutcome::NoSpeech { transcription_time } => *transcription_time,
            ExchangeOutcome::Reply { timings, .. } => timings.transcription,
        }
    }
}

/// Acknowledgement of a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetStatus {
    pub cleared_messages: usize,
}

impl ResetStatus {
    pub const STATUS: &'static str = "conversation reset";

    pub fn status(&self) -> &'static str {
        Self::STATUS
    }
}

pub struct TurnOrchestrator {
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn TextToSpeech>,
    limits: StageLimits,
    commit_policy: CommitPolicy,
}

impl TurnOrchestrator {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn LanguageModel>,
        tts: Arc<dyn TextToSpeech>,
    ) -> Self {
        Self {
            stt,
            llm,
            tts,
            limits: StageLimits::serialized(),
            commit_policy: CommitPolicy::default(),
        }
    }

    pub fn with_limits(mut self, limits: StageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.commit_policy = policy;
        self
    }

    pub fn commit_policy(&self) -> CommitPolicy {
        self.commit_policy
    }

    pub fn language_model(&self) -> &Arc<dyn LanguageModel> {
        &self.llm
    }

    /// Run one exchange on a session
    ///
    /// Waits for any exchange already running on the same session. A stage
    /// failure aborts the exchange and is returned unchanged. Memory is only
    /// committed once generation succeeds; with `AfterSynthesis` it also
    /// waits for synthesis.
    pub async fn converse(
        &self,
        session: &Session,
        audio: &[u8],
    ) -> Result<ExchangeOutcome, AgentError> {
        let _exchange = session.begin_exchange().await;
        let start = Instant::now();

        let transcription = self
            .run_stage(session, Stage::SpeechToText, self.stt.transcribe(audio))
            .await?;
        let transcription_time = start.elapsed();

        let transcript = match transcription {
            Transcription::NoSpeech => {
                tracing::info!(
                    session_id = %session.id(),
                    bytes = audio.len(),
                    stt_ms = transcription_time.as_millis() as u64,
                    "No speech detected"
                );
                return Ok(ExchangeOutcome::NoSpeech { transcription_time });
            }
            Transcription::Speech(text) => text,
        };

        let prompt = session.with_memory(|memory| memory.get_prompt(&transcript));
        let llm_start = Instant::now();
        let text = self
            .run_stage(session, Stage::LanguageModel, self.llm.generate(&prompt))
            .await?;
        let generation_time = llm_start.elapsed();

        if self.commit_policy == CommitPolicy::AfterGeneration {
            self.commit(session, &transcript, &text);
        }

        let tts_start = Instant::now();
        let audio = self
            .run_stage(session, Stage::TextToSpeech, self.tts.synthesize(&text))
            .await?;
        let synthesis_time = tts_start.elapsed();

        if self.commit_policy == CommitPolicy::AfterSynthesis {
            self.commit(session, &transcript, &text);
        }

        let timings = StageTimings {
            transcription: transcription_time,
            generation: generation_time,
            synthesis: synthesis_time,
            total: start.elapsed(),
        };

        tracing::info!(
            session_id = %session.id(),
            stt_ms = timings.transcription.as_millis() as u64,
            llm_ms = timings.generation.as_millis() as u64,
            tts_ms = timings.synthesis.as_millis() as u64,
            total_ms = timings.total.as_millis() as u64,
            "Exchange complete"
        );

        Ok(ExchangeOutcome::Reply {
            transcript,
            text,
            audio,
            timings,
        })
    }

    /// Clear a session's memory once any in-flight exchange has finished
    pub async fn reset(&self, session: &Session) -> ResetStatus {
        let _idle = session.wait_idle().await;
        let cleared_messages = session.with_memory(|memory| {
            let count = memory.len();
            memory.clear();
            count
        });
        session.touch();

        tracing::info!(session_id = %session.id(), cleared_messages, "Conversation reset");
        ResetStatus { cleared_messages }
    }

    fn commit(&self, session: &Session, transcript: &str, reply: &str) {
        session.with_memory(|memory| {
            memory.add_message(TurnRole::User, transcript);
            memory.add_message(TurnRole::Assistant, reply);
        });
    }

    async fn run_stage<T, F>(&self, session: &Session, stage: Stage, call: F) -> Result<T, AgentError>
    where
        F: Future<Output = voice_turn_core::Result<T>>,
    {
        let _permit = self
            .limits
            .semaphore(stage)
            .acquire()
            .await
            .map_err(|_| AgentError::Configuration(format!("{} limiter closed", stage)))?;

        call.await.map_err(|err| {
            tracing::warn!(session_id = %session.id(), %stage, error = %err, "Stage failed");
            AgentError::Stage(err)
        })
    }
}
