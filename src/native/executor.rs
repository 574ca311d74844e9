use crate::core::{
    domain::{ExecutionLimits, ExecutionResult, Language},
    errors::ExecutorError,
    traits::executor::Executor,
};
use crate::native::registry::AdapterRegistry;

/// Executes programs as plain OS processes through the registered adapters.
#[derive(Debug)]
pub struct NativeExecutor {
    registry: AdapterRegistry,
}

impl NativeExecutor {
    pub fn new(registry: AdapterRegistry) -> Self {
        NativeExecutor { registry }
    }

    pub fn languages(&self) -> Vec<Language> {
        self.registry.languages()
    }
}

#[async_trait::async_trait]
impl Executor for NativeExecutor {
    #[tracing::instrument(skip(self, source, limits), fields(time_ms = limits.time_ms))]
    async fn execute(
        &self,
        language: Language,
        source: &str,
        limits: &ExecutionLimits,
    ) -> Result<ExecutionResult, ExecutorError> {
        let Some(adapter) = self.registry.get(language) else {
            return Err(ExecutorError::LanguageDisabled {
                language: language.to_string(),
            });
        };

        // Memory limits are accepted but not enforced for native processes
        let result = adapter.execute(source, limits.time_ms).await?;
        tracing::debug!(
            success = result.success,
            exit_code = result.exit_code,
            execution_time_ms = result.execution_time_ms,
            "Execution finished"
        );
        Ok(result)
    }
}
