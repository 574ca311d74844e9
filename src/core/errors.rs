/// Malformed requests, rejected before any process is spawned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Code cannot be empty")]
    EmptyCode,
    #[error("Unsupported language: {language}")]
    UnsupportedLanguage { language: String },
    #[error("Time limit {value}ms is out of range")]
    TimeLimitOutOfRange { value: u64 },
    #[error("Memory limit {value}MB is out of range")]
    MemoryLimitOutOfRange { value: u64 },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    #[error("Workspace error: {msg}")]
    Workspace { msg: String },
    #[error("Language {language} is not enabled")]
    LanguageDisabled { language: String },
}

impl From<std::io::Error> for ExecutorError {
    fn from(e: std::io::Error) -> Self {
        ExecutorError::Workspace { msg: e.to_string() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}
