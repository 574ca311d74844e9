use std::sync::Arc;

use crate::core::domain::{ExecutionResult, Language};
use crate::core::errors::ExecutorError;
use crate::core::languages::{LanguageEntry, TemplateSlots};
use crate::core::traits::adapter::LanguageAdapter;
use crate::core::traits::runner::{CommandSpec, Runner};
use crate::native::workspace::Workspace;

/// Compiles to a native executable next to the source, then runs it.
/// Compilation has its own time budget and a failed compile never runs.
#[derive(Debug)]
pub struct CompiledAdapter {
    entry: &'static LanguageEntry,
    compiler: String,
    compile_time_limit_ms: u64,
    workspace: Arc<Workspace>,
    runner: Arc<dyn Runner>,
}

impl CompiledAdapter {
    pub fn new(
        entry: &'static LanguageEntry,
        compiler: impl Into<String>,
        compile_time_limit_ms: u64,
        workspace: Arc<Workspace>,
        runner: Arc<dyn Runner>,
    ) -> Self {
        Self {
            entry,
            compiler: compiler.into(),
            compile_time_limit_ms,
            workspace,
            runner,
        }
    }
}

#[async_trait::async_trait]
impl LanguageAdapter for CompiledAdapter {
    fn language(&self) -> Language {
        self.entry.language
    }

    #[tracing::instrument(skip(self, source), fields(language = %self.entry.language))]
    async fn execute(
        &self,
        source: &str,
        time_limit_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError> {
        let stem = Workspace::unique_name(self.entry.language.tag());
        let source_path = self
            .workspace
            .write_file(&format!("{}.{}", stem, self.entry.extension), source)
            .await?;
        let executable = self.workspace.root().join(&stem);
        let (source_arg, output_arg, dir_arg) = (
            source_path.to_string_lossy(),
            executable.to_string_lossy(),
            self.workspace.root().to_string_lossy(),
        );
        let slots = TemplateSlots {
            source: &source_arg,
            output: &output_arg,
            dir: &dir_arg,
            entry: &output_arg,
        };

        let compile = CommandSpec::new(&self.compiler, self.compile_time_limit_ms)
            .args(slots.render(self.entry.compile_args.unwrap_or_default()))
            .working_dir(self.workspace.root());
        let compiled = self.runner.run(&compile).await;

        let result = if compiled.success {
            tracing::debug!(
                compile_time_ms = compiled.execution_time_ms,
                "Compilation succeeded"
            );
            let run = CommandSpec::new(output_arg.to_string(), time_limit_ms)
                .args(slots.render(self.entry.run_args))
                .working_dir(self.workspace.root());
            self.runner.run(&run).await
        } else {
            tracing::debug!(exit_code = compiled.exit_code, "Compilation failed");
            ExecutionResult::compilation_failed(&compiled)
        };

        self.workspace.discard(&source_path).await;
        self.workspace.discard(&executable).await;
        Ok(result)
    }
}
