use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::constants::FALLBACK_CLASS_NAME;
use crate::core::domain::{ExecutionResult, Language};
use crate::core::errors::ExecutorError;
use crate::core::languages::{LanguageEntry, TemplateSlots};
use crate::core::traits::adapter::LanguageAdapter;
use crate::core::traits::runner::{CommandSpec, Runner};
use crate::native::workspace::Workspace;

static PUBLIC_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"public\s+class\s+(\w+)").unwrap());

static PACKAGE_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").unwrap());

/// The source file must be named after its public class.
pub fn public_class_name(source: &str) -> &str {
    PUBLIC_CLASS
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map_or(FALLBACK_CLASS_NAME, |m| m.as_str())
}

/// Name the VM is started with: the public class, package-qualified when the
/// source declares a package.
pub fn entry_class_name(source: &str) -> String {
    let class_name = public_class_name(source);
    match PACKAGE_DECL.captures(source).and_then(|caps| caps.get(1)) {
        Some(package) => format!("{}.{}", package.as_str(), class_name),
        None => class_name.to_string(),
    }
}

/// Compiles into a private subdirectory, so concurrent submissions declaring
/// the same class never share class files, then runs the class on the VM.
#[derive(Debug)]
pub struct ClassFileAdapter {
    entry: &'static LanguageEntry,
    compiler: String,
    vm: String,
    compile_time_limit_ms: u64,
    workspace: Arc<Workspace>,
    runner: Arc<dyn Runner>,
}

impl ClassFileAdapter {
    pub fn new(
        entry: &'static LanguageEntry,
        compiler: impl Into<String>,
        vm: impl Into<String>,
        compile_time_limit_ms: u64,
        workspace: Arc<Workspace>,
        runner: Arc<dyn Runner>,
    ) -> Self {
        Self {
            entry,
            compiler: compiler.into(),
            vm: vm.into(),
            compile_time_limit_ms,
            workspace,
            runner,
        }
    }

    async fn compile_and_run(
        &self,
        dir: &std::path::Path,
        source: &str,
        time_limit_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError> {
        let source_path = dir.join(format!(
            "{}.{}",
            public_class_name(source),
            self.entry.extension
        ));
        tokio::fs::write(&source_path, source).await?;

        let (source_arg, dir_arg) = (source_path.to_string_lossy(), dir.to_string_lossy());
        let entry_class = entry_class_name(source);
        let slots = TemplateSlots {
            source: &source_arg,
            dir: &dir_arg,
            entry: &entry_class,
            ..TemplateSlots::default()
        };

        let compile = CommandSpec::new(&self.compiler, self.compile_time_limit_ms)
            .args(slots.render(self.entry.compile_args.unwrap_or_default()))
            .working_dir(dir);
        let compiled = self.runner.run(&compile).await;
        if !compiled.success {
            tracing::debug!(exit_code = compiled.exit_code, "Compilation failed");
            return Ok(ExecutionResult::compilation_failed(&compiled));
        }

        let run = CommandSpec::new(&self.vm, time_limit_ms)
            .args(slots.render(self.entry.run_args))
            .working_dir(dir);
        Ok(self.runner.run(&run).await)
    }
}

#[async_trait::async_trait]
impl LanguageAdapter for ClassFileAdapter {
    fn language(&self) -> Language {
        self.entry.language
    }

    #[tracing::instrument(skip(self, source), fields(language = %self.entry.language))]
    async fn execute(
        &self,
        source: &str,
        time_limit_ms: u64,
    ) -> Result<ExecutionResult, ExecutorError> {
        let dir = self
            .workspace
            .create_dir(&Workspace::unique_name(self.entry.language.tag()))
            .await?;

        let result = self.compile_and_run(&dir, source, time_limit_ms).await;

        self.workspace.discard(&dir).await;
        result
    }
}
