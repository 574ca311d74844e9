use crate::core::domain::{ExecutionLimits, ExecutionResult, Language};
use crate::core::errors::ExecutorError;

/// Executes source code in a given language. `Err` is reserved for
/// judge-side failures; anything the program does wrong is an `Ok` result.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    async fn execute(
        &self,
        language: Language,
        source: &str,
        limits: &ExecutionLimits,
    ) -> Result<ExecutionResult, ExecutorError>;
}
