//! Language Model traits

use async_trait::async_trait;

use crate::Result;

/// Language Model interface
///
/// Implementations:
/// - `OllamaBackend` - Local Ollama inference
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(OllamaBackend::new(&settings.llm)?);
/// let reply = llm.generate("User: What time is it?\nAssistant:").await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Single-shot completion of a fully rendered prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if model is available
    ///
    /// Returns false if model is not loaded or backend is unavailable.
    async fn is_available(&self) -> bool {
        true
    }

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
