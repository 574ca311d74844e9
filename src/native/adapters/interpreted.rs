use std::sync::Arc;

use crate::core::domain::{ExecutionResult, Language};
use crate::core::errors::ExecutorError;
use crate::core::languages::{LanguageEntry, TemplateSlots};
use crate::core::traits::adapter::LanguageAdapter;
use crate::core::traits::runner::{CommandSpec, Runner};
use crate::native::workspace::Workspace;

/// Writes the script to the workspace and hands it to the interpreter.
#[derive(Debug)]
pub struct InterpretedAdapter {
    entry: &'static LanguageEntry,
    interpreter: String,
    workspace: Arc<Workspace>,
    runner: Arc<dyn Runner>,
}

impl InterpretedAdapter {
    pub fn new(
        entry: &'static LanguageEntry,
        interpreter: impl Into<String>,
        workspace: Arc<Workspace>,
        runner: Arc<dyn Runner>,
    ) -> Self {
        Self {
            entry,
            interpreter: interpreter.into(),
            workspace,
            runner,
        }
    }
}

#[async_trait::async_trait]
impl LanguageAdapter for InterpretedAdapter {
    fn language(&self) -> Language {
        self.entry.language
    }

    #[tracing::instrument(skip(self, source), fields(language = %self.entry.language))]
    async fn execute(
        &self,
        source: &str,
        time_limit_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError> {
        let name = format!(
            "{}.{}",
            Workspace::unique_name(self.entry.language.tag()),
            self.entry.extension
        );
        let script = self.workspace.write_file(&name, source).await?;

        let script_path = script.to_string_lossy();
        let slots = TemplateSlots {
            source: &script_path,
            ..TemplateSlots::default()
        };
        let command = CommandSpec::new(&self.interpreter, time_limit_ms)
            .args(slots.render(self.entry.run_args))
            .working_dir(self.workspace.root());
        let result = self.runner.run(&command).await;

        self.workspace.discard(&script).await;
        Ok(result)
    }
}
