use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    COMPILATION_FAILED_ERROR, DEFAULT_MEMORY_LIMIT_MB, DEFAULT_TIME_LIMIT_MS, MAX_MEMORY_LIMIT_MB,
    MAX_TIME_LIMIT_MS, MIN_MEMORY_LIMIT_MB, MIN_TIME_LIMIT_MS, OUTPUT_LIMIT_ERROR, TIMEOUT_ERROR,
};
use crate::core::errors::RequestError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Cpp,
    Java,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Cpp,
        Language::Java,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "cpp" | "c++" | "cxx" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            _ => Err(RequestError::UnsupportedLanguage {
                language: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub time_ms: u64,
    /// Advisory: accepted and reported, never enforced by the process model.
    pub memory_mb: u64,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            time_ms: DEFAULT_TIME_LIMIT_MS,
            memory_mb: DEFAULT_MEMORY_LIMIT_MB,
        }
    }
}

/// Raw "run my code" request as it arrives from the routing layer.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub code: String,
    pub language: String,
    #[serde(default, alias = "timeLimit")]
    pub time_limit_ms: Option<u64>,
    #[serde(default, alias = "memoryLimit")]
    pub memory_limit_mb: Option<u64>,
    #[serde(default)]
    pub question_id: Option<String>,
}

/// Validated, immutable execution request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest {
    source_code: String,
    language: Language,
    limits: ExecutionLimits,
    question_id: Option<String>,
}

impl ExecutionRequest {
    pub fn new(
        source_code: impl Into<String>,
        language: Language,
        time_limit_ms: Option<u64>,
        memory_limit_mb: Option<u64>,
        question_id: Option<String>,
    ) -> Result<Self, RequestError> {
        let source_code = source_code.into();
        if source_code.trim().is_empty() {
            return Err(RequestError::EmptyCode);
        }

        let time_ms = time_limit_ms.unwrap_or(DEFAULT_TIME_LIMIT_MS);
        if !(MIN_TIME_LIMIT_MS..=MAX_TIME_LIMIT_MS).contains(&time_ms) {
            return Err(RequestError::TimeLimitOutOfRange { value: time_ms });
        }

        let memory_mb = memory_limit_mb.unwrap_or(DEFAULT_MEMORY_LIMIT_MB);
        if !(MIN_MEMORY_LIMIT_MB..=MAX_MEMORY_LIMIT_MB).contains(&memory_mb) {
            return Err(RequestError::MemoryLimitOutOfRange { value: memory_mb });
        }

        Ok(Self {
            source_code,
            language,
            limits: ExecutionLimits { time_ms, memory_mb },
            question_id,
        })
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    pub fn question_id(&self) -> Option<&str> {
        self.question_id.as_deref()
    }
}

impl TryFrom<RunRequest> for ExecutionRequest {
    type Error = RequestError;

    fn try_from(req: RunRequest) -> Result<Self, RequestError> {
        let language = req.language.parse()?;
        Self::new(
            req.code,
            language,
            req.time_limit_ms,
            req.memory_limit_mb,
            req.question_id,
        )
    }
}

/// Outcome of one external process invocation. Built once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_error: Option<String>,
}

impl ExecutionResult {
    pub fn spawn_failure(msg: &str, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: msg.to_string(),
            exit_code: -1,
            execution_time_ms,
            error: Some(msg.to_string()),
            system_error: Some(msg.to_string()),
        }
    }

    pub fn unsupported_language(language: &str) -> Self {
        let msg = format!("Unsupported language: {}", language);
        Self {
            success: false,
            stdout: String::new(),
            stderr: msg.clone(),
            exit_code: -1,
            execution_time_ms: 0,
            error: Some(msg),
            system_error: None,
        }
    }

    /// Judge-side failure (workspace I/O and the like), not the program's fault.
    pub fn internal_failure(msg: &str) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: msg.to_string(),
            exit_code: -1,
            execution_time_ms: 0,
            error: Some(msg.to_string()),
            system_error: Some(msg.to_string()),
        }
    }

    /// Wraps a failed compiler invocation; the program itself never ran.
    pub fn compilation_failed(compile: &ExecutionResult) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: format!(
                "{}{}",
                crate::constants::COMPILATION_ERROR_PREFIX,
                compile.stderr
            ),
            exit_code: compile.exit_code,
            execution_time_ms: compile.execution_time_ms,
            error: Some(COMPILATION_FAILED_ERROR.to_string()),
            system_error: compile.system_error.clone(),
        }
    }

    /// Classification of the run alone, without comparing output.
    pub fn verdict(&self) -> Verdict {
        if self.success {
            return Verdict::Accepted;
        }
        match self.error.as_deref() {
            Some(COMPILATION_FAILED_ERROR) => Verdict::CompilationError,
            Some(TIMEOUT_ERROR) => Verdict::TimeLimitExceeded,
            Some(OUTPUT_LIMIT_ERROR) => Verdict::OutputLimitExceeded,
            _ if self.system_error.is_some() => Verdict::SystemError,
            _ => Verdict::RuntimeError,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    CompilationError,
    TimeLimitExceeded,
    OutputLimitExceeded,
    RuntimeError,
    SystemError,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::CompilationError => "Compilation Error",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::OutputLimitExceeded => "Output Limit Exceeded",
            Verdict::RuntimeError => "Execution Error",
            Verdict::SystemError => "System Error",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
}

/// The part of a coding question the judge consumes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingQuestion {
    pub id: String,
    pub sample_input: String,
    pub sample_output: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default, alias = "timeLimit")]
    pub time_limit_ms: Option<u64>,
    #[serde(default, alias = "memoryLimit")]
    pub memory_limit_mb: Option<u64>,
    #[serde(default)]
    pub points: u32,
}

impl CodingQuestion {
    pub fn sample_case(&self) -> TestCase {
        TestCase {
            input: self.sample_input.clone(),
            expected_output: self.sample_output.clone(),
            is_hidden: false,
        }
    }

    /// Sample first, then the stored cases in order.
    pub fn all_cases(&self) -> Vec<TestCase> {
        std::iter::once(self.sample_case())
            .chain(self.test_cases.iter().cloned())
            .collect()
    }

    /// Zero or missing limits fall back to the defaults; the rest are clamped
    /// into the range accepted for run requests.
    pub fn limits(&self) -> ExecutionLimits {
        let defaults = ExecutionLimits::default();
        ExecutionLimits {
            time_ms: self
                .time_limit_ms
                .filter(|t| *t > 0)
                .map_or(defaults.time_ms, |t| {
                    t.clamp(MIN_TIME_LIMIT_MS, MAX_TIME_LIMIT_MS)
                }),
            memory_mb: self
                .memory_limit_mb
                .filter(|m| *m > 0)
                .map_or(defaults.memory_mb, |m| {
                    m.clamp(MIN_MEMORY_LIMIT_MB, MAX_MEMORY_LIMIT_MB)
                }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub passed: bool,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub verdict: Verdict,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub all_passed: bool,
    pub per_case_results: Vec<CaseResult>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub verdict: Verdict,
}

impl ValidationResult {
    pub fn from_cases(per_case_results: Vec<CaseResult>) -> Self {
        let total_tests = per_case_results.len();
        let passed_tests = per_case_results.iter().filter(|c| c.passed).count();
        let all_passed = passed_tests == total_tests;
        let verdict = per_case_results
            .iter()
            .find(|c| !c.passed)
            .map_or(Verdict::Accepted, |c| c.verdict);

        Self {
            all_passed,
            per_case_results,
            total_tests,
            passed_tests,
            verdict,
        }
    }
}

/// What the bookkeeping layer stores on the submission record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionGrade {
    pub is_correct: bool,
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl SubmissionGrade {
    /// No partial credit: full points iff every case passed.
    pub fn from_validation(result: &ValidationResult, question_points: u32) -> Self {
        Self {
            is_correct: result.all_passed,
            points: if result.all_passed { question_points } else { 0 },
            execution_time_ms: result
                .per_case_results
                .iter()
                .map(|c| c.execution_time_ms)
                .max(),
        }
    }
}
