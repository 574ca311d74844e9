use std::collections::HashMap;
use std::sync::Arc;

use crate::config::JudgeConfig;
use crate::core::domain::Language;
use crate::core::languages::Family;
use crate::core::traits::adapter::LanguageAdapter;
use crate::core::traits::runner::Runner;
use crate::native::adapters::{ClassFileAdapter, CompiledAdapter, InterpretedAdapter};
use crate::native::workspace::Workspace;

/// Adapters for the enabled languages, built once at startup.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Language, Arc<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    pub fn from_config(
        config: &JudgeConfig,
        workspace: Arc<Workspace>,
        runner: Arc<dyn Runner>,
    ) -> Self {
        let mut registry = Self::default();
        for &language in &config.languages {
            let entry = language.entry();
            let program = config.toolchain.primary(language);
            let adapter: Arc<dyn LanguageAdapter> = match entry.family {
                Family::Interpreted => Arc::new(InterpretedAdapter::new(
                    entry,
                    program,
                    workspace.clone(),
                    runner.clone(),
                )),
                Family::CompiledNative => Arc::new(CompiledAdapter::new(
                    entry,
                    program,
                    config.compile.native_ms,
                    workspace.clone(),
                    runner.clone(),
                )),
                Family::ClassFile => Arc::new(ClassFileAdapter::new(
                    entry,
                    program,
                    &config.toolchain.java,
                    config.compile.class_ms,
                    workspace.clone(),
                    runner.clone(),
                )),
            };
            registry.register(adapter);
        }
        tracing::info!(
            languages = ?registry.languages(),
            "Language adapters registered"
        );
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn LanguageAdapter>) {
        self.adapters.insert(adapter.language(), adapter);
    }

    pub fn get(&self, language: Language) -> Option<Arc<dyn LanguageAdapter>> {
        self.adapters.get(&language).cloned()
    }

    /// Enabled languages in declaration order.
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|language| self.adapters.contains_key(language))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::runner::MockRunner;

    #[test]
    fn test_registers_enabled_languages_only() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Arc::new(Workspace::init(dir.path()).unwrap());
        let config = JudgeConfig {
            languages: vec![Language::Java, Language::Python],
            ..JudgeConfig::default()
        };

        let registry =
            AdapterRegistry::from_config(&config, workspace, Arc::new(MockRunner::new()));

        assert_eq!(registry.languages(), vec![Language::Python, Language::Java]);
        assert_eq!(
            registry.get(Language::Java).map(|a| a.language()),
            Some(Language::Java)
        );
        assert!(registry.get(Language::Cpp).is_none());
    }
}
