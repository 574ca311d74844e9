use std::sync::Arc;

use crate::core::{
    domain::{
        CodingQuestion, ExecutionRequest, ExecutionResult, Language, SubmissionGrade,
        ValidationResult,
    },
    errors::ExecutorError,
    injection::inject,
    pipeline::validating,
    traits::executor::Executor,
};

/// The two operations exposed to the bookkeeping layer.
#[derive(Debug, Clone)]
pub struct Judge {
    executor: Arc<dyn Executor>,
}

impl Judge {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Judge { executor }
    }

    /// Runs the code once without judging its output. With a question, the
    /// sample input is injected first; otherwise the program sees no input.
    #[tracing::instrument(skip_all, fields(language = %request.language()))]
    pub async fn run_once(
        &self,
        request: &ExecutionRequest,
        question: Option<&CodingQuestion>,
    ) -> ExecutionResult {
        let source = match question {
            Some(question) => {
                if let Some(id) = request.question_id().filter(|id| *id != question.id) {
                    tracing::warn!(
                        requested = id,
                        supplied = %question.id,
                        "Question id mismatch, injecting the supplied question's sample"
                    );
                }
                inject(request.source_code(), &question.sample_input, request.language())
            }
            None => request.source_code().to_string(),
        };

        match self
            .executor
            .execute(request.language(), &source, &request.limits())
            .await
        {
            Ok(result) => result,
            Err(ExecutorError::LanguageDisabled { language }) => {
                tracing::warn!(%language, "Rejected run for disabled language");
                ExecutionResult::unsupported_language(&language)
            }
            Err(e) => {
                tracing::error!("Run failed inside the judge: {}", e);
                ExecutionResult::internal_failure(&e.to_string())
            }
        }
    }

    pub async fn validate_submission(
        &self,
        code: &str,
        language: Language,
        question: &CodingQuestion,
    ) -> ValidationResult {
        validating::validate_submission(self.executor.as_ref(), code, language, question).await
    }

    /// Validates and derives what gets stored on the submission record.
    pub async fn grade(
        &self,
        code: &str,
        language: Language,
        question: &CodingQuestion,
    ) -> (ValidationResult, SubmissionGrade) {
        let validation = self.validate_submission(code, language, question).await;
        let grade = SubmissionGrade::from_validation(&validation, question.points);
        tracing::info!(
            question_id = %question.id,
            is_correct = grade.is_correct,
            points = grade.points,
            "Submission graded"
        );
        (validation, grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{domain::TestCase, traits::executor::MockExecutor};

    fn finished(stdout: &str) -> ExecutionResult {
        ExecutionResult {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
            execution_time_ms: 5,
            error: None,
            system_error: None,
        }
    }

    fn echo_question() -> CodingQuestion {
        CodingQuestion {
            id: "echo".to_string(),
            sample_input: "5 3".to_string(),
            sample_output: "5 3".to_string(),
            test_cases: vec![TestCase {
                input: "a b".to_string(),
                expected_output: "a b".to_string(),
                is_hidden: true,
            }],
            time_limit_ms: None,
            memory_limit_mb: None,
            points: 25,
        }
    }

    #[tokio::test]
    async fn test_run_once_without_question_runs_code_as_is() {
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .times(1)
            .withf(|language, source, limits| {
                *language == Language::Python
                    && source == "print(input())"
                    && limits.time_ms == 1500
            })
            .returning(|_, _, _| Ok(finished("")));
        let judge = Judge::new(Arc::new(executor));

        let request =
            ExecutionRequest::new("print(input())", Language::Python, Some(1500), None, None)
                .unwrap();
        let result = judge.run_once(&request, None).await;

        assert!(result.success);
    }

    #[tokio::test]
    async fn test_run_once_injects_sample_input() {
        let mut executor = MockExecutor::new();
        executor
            .expect_execute()
            .withf(|_, source, _| source == "print(\"5 3\")")
            .returning(|_, _, _| Ok(finished("5 3\n")));
        let judge = Judge::new(Arc::new(executor));

        let request = ExecutionRequest::new(
            "print(input())",
            Language::Python,
            None,
            None,
            Some("echo".to_string()),
        )
        .unwrap();
        let result = judge.run_once(&request, Some(&echo_question())).await;

        assert_eq!(result.stdout.trim(), "5 3");
    }

    #[tokio::test]
    async fn test_run_once_turns_errors_into_results() {
        let mut executor = MockExecutor::new();
        executor.expect_execute().returning(|language, _, _| {
            if language == Language::Java {
                Err(ExecutorError::LanguageDisabled {
                    language: language.to_string(),
                })
            } else {
                Err(ExecutorError::Workspace {
                    msg: "Permission denied".to_string(),
                })
            }
        });
        let judge = Judge::new(Arc::new(executor));

        let java = ExecutionRequest::new("class A {}", Language::Java, None, None, None).unwrap();
        let result = judge.run_once(&java, None).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unsupported language: java"));

        let py = ExecutionRequest::new("print(1)", Language::Python, None, None, None).unwrap();
        let result = judge.run_once(&py, None).await;
        assert!(!result.success);
        assert_eq!(
            result.system_error.as_deref(),
            Some("Workspace error: Permission denied")
        );
    }

    #[tokio::test]
    async fn test_grade_awards_full_points_only_when_all_pass() {
        let mut executor = MockExecutor::new();
        executor.expect_execute().returning(|_, source, _| {
            let echoed = if source.contains("\"5 3\"") { "5 3" } else { "a  b" };
            Ok(finished(echoed))
        });
        let judge = Judge::new(Arc::new(executor));

        let (validation, grade) = judge
            .grade("print(input())", Language::Python, &echo_question())
            .await;

        assert_eq!(validation.passed_tests, 1);
        assert_eq!(validation.total_tests, 2);
        assert!(!grade.is_correct);
        assert_eq!(grade.points, 0);

        let mut executor = MockExecutor::new();
        executor.expect_execute().returning(|_, source, _| {
            let echoed = if source.contains("\"5 3\"") { "5 3" } else { "a b" };
            Ok(finished(echoed))
        });
        let judge = Judge::new(Arc::new(executor));

        let (_, grade) = judge
            .grade("print(input())", Language::Python, &echo_question())
            .await;

        assert!(grade.is_correct);
        assert_eq!(grade.points, 25);
        assert_eq!(grade.execution_time_ms, Some(5));
    }
}
