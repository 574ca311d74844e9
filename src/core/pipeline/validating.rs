use crate::core::{
    domain::{
        CaseResult, CodingQuestion, ExecutionResult, Language, TestCase, ValidationResult, Verdict,
    },
    injection::inject,
    traits::executor::Executor,
};

/// Runs the submission against the sample case and then every stored case,
/// one at a time and without stopping at the first failure.
#[tracing::instrument(skip(executor, code, question), fields(question_id = %question.id))]
pub async fn validate_submission(
    executor: &dyn Executor,
    code: &str,
    language: Language,
    question: &CodingQuestion,
) -> ValidationResult {
    let limits = question.limits();
    let mut per_case_results = Vec::with_capacity(question.test_cases.len() + 1);

    for (case_idx, case) in question.all_cases().into_iter().enumerate() {
        let source = inject(code, &case.input, language);
        let case_result = match executor.execute(language, &source, &limits).await {
            Ok(result) => judge_case(case, result),
            Err(e) => {
                tracing::error!(case_idx, "Case failed inside the judge: {}", e);
                CaseResult {
                    passed: false,
                    input: case.input,
                    expected_output: case.expected_output,
                    actual_output: String::new(),
                    execution_time_ms: 0,
                    error: Some(e.to_string()),
                    verdict: Verdict::SystemError,
                }
            }
        };
        tracing::debug!(
            case_idx,
            passed = case_result.passed,
            verdict = %case_result.verdict,
            "Case judged"
        );
        per_case_results.push(case_result);
    }

    let result = ValidationResult::from_cases(per_case_results);
    tracing::info!(
        passed_tests = result.passed_tests,
        total_tests = result.total_tests,
        verdict = %result.verdict,
        "Submission validated"
    );
    result
}

/// Outputs match when equal after trimming surrounding whitespace.
fn judge_case(case: TestCase, result: ExecutionResult) -> CaseResult {
    let actual_output = result.stdout.trim().to_string();
    let matches = actual_output == case.expected_output.trim();
    let passed = result.success && matches;

    let verdict = match result.verdict() {
        Verdict::Accepted if !matches => Verdict::WrongAnswer,
        verdict => verdict,
    };
    let error = if result.success {
        None
    } else {
        result
            .error
            .or_else(|| (!result.stderr.is_empty()).then_some(result.stderr))
    };

    CaseResult {
        passed,
        input: case.input,
        expected_output: case.expected_output,
        actual_output,
        execution_time_ms: result.execution_time_ms,
        error,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::constants::{COMPILATION_FAILED_ERROR, TIMEOUT_ERROR};
    use crate::core::{errors::ExecutorError, traits::executor::MockExecutor};

    fn finished(stdout: &str) -> ExecutionResult {
        ExecutionResult {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
            execution_time_ms: 7,
            error: None,
            system_error: None,
        }
    }

    fn sum_question() -> CodingQuestion {
        CodingQuestion {
            id: "sum".to_string(),
            sample_input: "3 5".to_string(),
            sample_output: "8".to_string(),
            test_cases: vec![TestCase {
                input: "10 20".to_string(),
                expected_output: "30".to_string(),
                is_hidden: true,
            }],
            time_limit_ms: Some(2000),
            memory_limit_mb: None,
            points: 100,
        }
    }

    /// Answers from the literal the injector placed into the source.
    fn summing_executor() -> MockExecutor {
        let mut executor = MockExecutor::new();
        executor.expect_execute().returning(|_, source, limits| {
            assert_eq!(limits.time_ms, 2000);
            let out = if source.contains("\"3 5\"") {
                "8\n"
            } else if source.contains("\"10 20\"") {
                "30\n"
            } else {
                ""
            };
            Ok(finished(out))
        });
        executor
    }

    const SUM_PY: &str = "a, b = map(int, input().split())\nprint(a + b)";

    #[tokio::test]
    async fn test_sum_submission_passes_every_case() {
        let executor = summing_executor();

        let result =
            validate_submission(&executor, SUM_PY, Language::Python, &sum_question()).await;

        assert!(result.all_passed);
        assert_eq!(result.total_tests, 2);
        assert_eq!(result.passed_tests, 2);
        assert_eq!(result.verdict, Verdict::Accepted);
        assert_eq!(result.per_case_results[0].input, "3 5");
        assert_eq!(result.per_case_results[0].actual_output, "8");
        assert_eq!(result.per_case_results[1].input, "10 20");
    }

    #[tokio::test]
    async fn test_runs_every_case_in_order_sample_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .times(4)
            .returning(move |_, source, _| {
                recorder.lock().unwrap().push(source.to_string());
                Ok(finished("wrong"))
            });

        let mut question = sum_question();
        question.test_cases.push(TestCase {
            input: "1 1".to_string(),
            expected_output: "2".to_string(),
            is_hidden: false,
        });
        question.test_cases.push(TestCase {
            input: "0 0".to_string(),
            expected_output: "0".to_string(),
            is_hidden: true,
        });

        let result = validate_submission(&executor, SUM_PY, Language::Python, &question).await;

        assert_eq!(result.per_case_results.len(), 4);
        assert_eq!(result.passed_tests, 0);
        assert!(!result.all_passed);
        assert_eq!(result.verdict, Verdict::WrongAnswer);
        let inputs: Vec<_> = result
            .per_case_results
            .iter()
            .map(|c| c.input.as_str())
            .collect();
        assert_eq!(inputs, vec!["3 5", "10 20", "1 1", "0 0"]);
        let seen = seen.lock().unwrap();
        assert!(seen[0].contains("\"3 5\""));
        assert!(seen[3].contains("\"0 0\""));
    }

    #[tokio::test]
    async fn test_comparison_trims_but_respects_case() {
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .returning(|_, _, _| Ok(finished("  Yes \n\n")));
        let question = CodingQuestion {
            id: "yn".to_string(),
            sample_input: String::new(),
            sample_output: "Yes".to_string(),
            test_cases: vec![TestCase {
                input: String::new(),
                expected_output: "yes".to_string(),
                is_hidden: false,
            }],
            time_limit_ms: None,
            memory_limit_mb: None,
            points: 10,
        };

        let result =
            validate_submission(&executor, "print('Yes')", Language::Python, &question).await;

        assert!(result.per_case_results[0].passed);
        assert!(!result.per_case_results[1].passed);
        assert_eq!(result.per_case_results[1].verdict, Verdict::WrongAnswer);
        assert_eq!(result.per_case_results[1].error, None);
    }

    #[tokio::test]
    async fn test_stderr_of_successful_run_is_not_an_error() {
        let mut executor = MockExecutor::new();
        executor.expect_execute().returning(|_, _, _| {
            Ok(ExecutionResult {
                stderr: "warning: unused variable".to_string(),
                ..finished("7")
            })
        });

        let result =
            validate_submission(&executor, SUM_PY, Language::Python, &sum_question()).await;

        assert_eq!(result.per_case_results[0].verdict, Verdict::WrongAnswer);
        assert_eq!(result.per_case_results[0].error, None);
    }

    #[tokio::test]
    async fn test_question_limits_are_clamped() {
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .times(2)
            .withf(|_, _, limits| limits.time_ms == 10_000 && limits.memory_mb == 512)
            .returning(|_, _, _| Ok(finished("")));
        let question = CodingQuestion {
            time_limit_ms: Some(3_600_000),
            memory_limit_mb: Some(4096),
            ..sum_question()
        };

        let result = validate_submission(&executor, SUM_PY, Language::Python, &question).await;

        assert_eq!(result.total_tests, 2);
    }

    #[tokio::test]
    async fn test_failures_are_classified() {
        let mut executor = MockExecutor::new();
        let mut calls = 0;
        executor.expect_execute().returning(move |_, _, _| {
            calls += 1;
            match calls {
                1 => Ok(ExecutionResult {
                    success: false,
                    stdout: String::new(),
                    stderr: "Compilation Error:\nerror: expected ';'".to_string(),
                    exit_code: 1,
                    execution_time_ms: 300,
                    error: Some(COMPILATION_FAILED_ERROR.to_string()),
                    system_error: None,
                }),
                2 => Ok(ExecutionResult {
                    success: false,
                    stdout: "30".to_string(),
                    stderr: format!("\n{}", TIMEOUT_ERROR),
                    exit_code: -1,
                    execution_time_ms: 2000,
                    error: Some(TIMEOUT_ERROR.to_string()),
                    system_error: None,
                }),
                _ => Ok(ExecutionResult {
                    success: false,
                    stdout: String::new(),
                    stderr: "Traceback: ZeroDivisionError".to_string(),
                    exit_code: 1,
                    execution_time_ms: 20,
                    error: None,
                    system_error: None,
                }),
            }
        });
        let mut question = sum_question();
        question.test_cases.push(TestCase {
            input: "1 0".to_string(),
            expected_output: "1".to_string(),
            is_hidden: true,
        });

        let result = validate_submission(&executor, SUM_PY, Language::Python, &question).await;
        let cases = &result.per_case_results;

        assert_eq!(cases[0].verdict, Verdict::CompilationError);
        assert_eq!(cases[0].error.as_deref(), Some(COMPILATION_FAILED_ERROR));
        // Correct output does not rescue a timed-out run
        assert!(!cases[1].passed);
        assert_eq!(cases[1].verdict, Verdict::TimeLimitExceeded);
        assert_eq!(cases[2].verdict, Verdict::RuntimeError);
        assert_eq!(cases[2].error.as_deref(), Some("Traceback: ZeroDivisionError"));
        assert_eq!(result.verdict, Verdict::CompilationError);
    }

    #[tokio::test]
    async fn test_executor_error_becomes_failed_case() {
        let mut executor = MockExecutor::new();
        let mut calls = 0;
        executor.expect_execute().returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Err(ExecutorError::Workspace {
                    msg: "No space left on device".to_string(),
                })
            } else {
                Ok(finished("30"))
            }
        });

        let result =
            validate_submission(&executor, SUM_PY, Language::Python, &sum_question()).await;

        assert_eq!(result.total_tests, 2);
        assert_eq!(result.passed_tests, 1);
        assert_eq!(result.per_case_results[0].verdict, Verdict::SystemError);
        assert_eq!(
            result.per_case_results[0].error.as_deref(),
            Some("Workspace error: No space left on device")
        );
        assert!(result.per_case_results[1].passed);
    }
}
