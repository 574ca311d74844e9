use crate::core::domain::{ExecutionResult, Language};
use crate::core::errors::ExecutorError;

/// Language-specific compile+run (or run-only) strategy.
#[async_trait::async_trait]
pub trait LanguageAdapter: std::fmt::Debug + Send + Sync {
    fn language(&self) -> Language;

    async fn execute(
        &self,
        source: &str,
        time_limit_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError>;
}
