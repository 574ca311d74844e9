use std::path::{Path, PathBuf};
use std::time::Duration;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CLASS_COMPILE_TIME_LIMIT_MS, MAX_FILE_AGE, NATIVE_COMPILE_TIME_LIMIT_MS, OUTPUT_LIMIT_CHARS,
    SWEEP_INTERVAL, WORKSPACE_DIR_NAME,
};
use crate::core::domain::Language;
use crate::core::errors::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct JudgeConfig {
    /// Scratch directory for sources and build outputs
    pub workspace_dir: PathBuf,
    pub toolchain: Toolchain,
    /// Languages served by this process; others are rejected
    pub languages: Vec<Language>,
    pub compile: CompileBudgets,
    /// Per-stream cap on captured output, in characters
    pub output_limit: usize,
    pub sweep_interval_secs: u64,
    pub max_file_age_secs: u64,
}

/// Programs looked up through PATH unless given as absolute paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Toolchain {
    pub python: String,
    pub node: String,
    pub gxx: String,
    pub javac: String,
    pub java: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CompileBudgets {
    pub native_ms: u64,
    pub class_ms: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        JudgeConfig {
            workspace_dir: std::env::temp_dir().join(WORKSPACE_DIR_NAME),
            toolchain: Toolchain::default(),
            languages: Language::ALL.to_vec(),
            compile: CompileBudgets::default(),
            output_limit: OUTPUT_LIMIT_CHARS,
            sweep_interval_secs: SWEEP_INTERVAL.as_secs(),
            max_file_age_secs: MAX_FILE_AGE.as_secs(),
        }
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            python: "python3".to_string(),
            node: "node".to_string(),
            gxx: "g++".to_string(),
            javac: "javac".to_string(),
            java: "java".to_string(),
        }
    }
}

impl Toolchain {
    /// The interpreter or compiler invoked first for a language.
    pub fn primary(&self, language: Language) -> &str {
        match language {
            Language::Python => &self.python,
            Language::JavaScript => &self.node,
            Language::Cpp => &self.gxx,
            Language::Java => &self.javac,
        }
    }
}

impl Default for CompileBudgets {
    fn default() -> Self {
        CompileBudgets {
            native_ms: NATIVE_COMPILE_TIME_LIMIT_MS,
            class_ms: CLASS_COMPILE_TIME_LIMIT_MS,
        }
    }
}

impl JudgeConfig {
    /// Defaults, then the optional JSON file, then `JUDGE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("JUDGE_WORKSPACE_DIR") {
            self.workspace_dir = PathBuf::from(dir);
        }
        for (key, slot) in [
            ("JUDGE_PYTHON", &mut self.toolchain.python),
            ("JUDGE_NODE", &mut self.toolchain.node),
            ("JUDGE_GXX", &mut self.toolchain.gxx),
            ("JUDGE_JAVAC", &mut self.toolchain.javac),
            ("JUDGE_JAVA", &mut self.toolchain.java),
        ] {
            if let Some(program) = lookup(key) {
                *slot = program;
            }
        }
        if let Some(list) = lookup("JUDGE_LANGUAGES") {
            self.languages = parse_languages(&list)?;
        }
        if let Some(value) = lookup("JUDGE_OUTPUT_LIMIT") {
            self.output_limit = parse_number("JUDGE_OUTPUT_LIMIT", &value)?;
        }
        if let Some(value) = lookup("JUDGE_SWEEP_INTERVAL_SECS") {
            self.sweep_interval_secs = parse_number("JUDGE_SWEEP_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = lookup("JUDGE_MAX_FILE_AGE_SECS") {
            self.max_file_age_secs = parse_number("JUDGE_MAX_FILE_AGE_SECS", &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn max_file_age(&self) -> Duration {
        Duration::from_secs(self.max_file_age_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: String| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        };
        if self.output_limit == 0 {
            return Err(invalid("output-limit", "0".to_string()));
        }
        // A zero period would make the sweeper spin
        if self.sweep_interval_secs == 0 {
            return Err(invalid("sweep-interval-secs", "0".to_string()));
        }
        if self.compile.native_ms == 0 || self.compile.class_ms == 0 {
            return Err(invalid("compile", format!("{:?}", self.compile)));
        }
        Ok(())
    }
}

fn parse_languages(list: &str) -> Result<Vec<Language>, ConfigError> {
    let languages = list
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(|tag| {
            tag.parse::<Language>().map_err(|_| ConfigError::InvalidValue {
                key: "JUDGE_LANGUAGES".to_string(),
                value: tag.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(languages.into_iter().unique().collect())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
