//! Runs one submission against one test case end-to-end.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ExecError;
use crate::input::{normalize_input, outputs_match};
use crate::language::{self, InterpreterResolver, LanguageId};
use crate::limiter::Limiter;
use crate::sandbox::{self, RunRequest};
use crate::types::{CaseResult, JudgeConfig, TestCase};

/// Per-case pipeline: normalize → admission gate → sandbox run →
/// trim-only comparison. Every failure mode becomes a `CaseResult`;
/// sibling cases are never affected.
pub struct CaseExecutor<'a> {
    pub config: &'a JudgeConfig,
    pub limiter: &'a Limiter,
    pub resolver: &'a InterpreterResolver,
}

impl CaseExecutor<'_> {
    pub async fn execute(
        &self,
        language: LanguageId,
        source_code: &str,
        case: &TestCase,
        time_limit_ms: u64,
    ) -> CaseResult {
        let stdin = normalize_input(&case.input);

        // Queue wait is not charged to the submission; the clock starts
        // once a slot is granted. The permit is released on every path
        // when it drops at the end of this scope.
        let _permit = self.limiter.acquire().await;
        let started = Instant::now();

        let run_result = match language::resolve_profile(language, source_code, self.resolver).await
        {
            Ok(profile) => {
                sandbox::run(RunRequest {
                    profile: &profile,
                    source_code,
                    stdin: &stdin,
                    time_limit: Duration::from_millis(time_limit_ms),
                    max_output_bytes: self.config.max_output_bytes,
                })
                .await
            }
            Err(err) => Err(err),
        };
        let execution_time_ms = started.elapsed().as_millis() as u64;

        let mut result = CaseResult {
            input: case.input.clone(),
            expected_output: case.expected_output.clone(),
            actual_output: String::new(),
            passed: false,
            execution_time_ms,
            memory_usage_mb: 0,
            error: None,
        };

        match run_result {
            Ok(out) if out.timed_out => {
                // A timeout is a failed case, not an engine error, and
                // carries no message.
                result.actual_output = out.stdout;
                result.memory_usage_mb = out.memory_usage_mb;
            }
            Ok(out) if !out.exit_success => {
                result.actual_output = out.stdout;
                result.memory_usage_mb = out.memory_usage_mb;
                result.error = Some(language::classify_runtime_error(language, &out.stderr));
            }
            Ok(out) => {
                result.passed = outputs_match(&out.stdout, &case.expected_output);
                result.actual_output = out.stdout;
                result.memory_usage_mb = out.memory_usage_mb;
            }
            Err(err) => {
                result.error = Some(error_message(err));
            }
        }

        debug!(
            case = case.order_index,
            passed = result.passed,
            time_ms = result.execution_time_ms,
            "case judged"
        );
        result
    }
}

fn error_message(err: ExecError) -> String {
    match err {
        // Keep the compiler's own diagnostics up front
        ExecError::Compilation(message) => format!("Compilation failed: {message}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(input: &str, expected: &str) -> TestCase {
        TestCase {
            input: input.to_string(),
            expected_output: expected.to_string(),
            is_visible: true,
            points: 10,
            order_index: 0,
        }
    }

    fn executor_parts() -> (JudgeConfig, Limiter, InterpreterResolver) {
        (
            JudgeConfig::default(),
            Limiter::new(2),
            InterpreterResolver::default(),
        )
    }

    #[tokio::test]
    async fn missing_toolchain_fails_the_case_with_an_error() {
        let (config, limiter, _) = executor_parts();
        let resolver = InterpreterResolver::new(
            vec!["no-such-python3".into()],
            vec!["no-such-python".into()],
        );
        let executor = CaseExecutor {
            config: &config,
            limiter: &limiter,
            resolver: &resolver,
        };
        let result = executor
            .execute(LanguageId::Python, "print(1)", &case("", "1"), 1_000)
            .await;
        assert!(!result.passed);
        assert!(result.error.is_some());
    }

    // The toolchain-backed paths need a real interpreter on the host.
    #[tokio::test]
    #[ignore]
    async fn python_case_passes_with_trimmed_output() {
        let (config, limiter, resolver) = executor_parts();
        let executor = CaseExecutor {
            config: &config,
            limiter: &limiter,
            resolver: &resolver,
        };
        let source = "a = int(input())\nb = int(input())\nprint(a + b)";
        let result = executor
            .execute(LanguageId::Python3, source, &case("10\\n 20", "30"), 5_000)
            .await;
        assert!(result.passed, "error: {:?}", result.error);
        assert_eq!(result.actual_output.trim(), "30");
    }

    #[tokio::test]
    #[ignore]
    async fn python_crash_is_classified() {
        let (config, limiter, resolver) = executor_parts();
        let executor = CaseExecutor {
            config: &config,
            limiter: &limiter,
            resolver: &resolver,
        };
        let result = executor
            .execute(LanguageId::Python3, "print(1 // 0)", &case("", ""), 5_000)
            .await;
        assert!(!result.passed);
        let message = result.error.unwrap();
        assert!(message.contains("ZeroDivisionError"), "got: {message}");
    }

    #[tokio::test]
    #[ignore]
    async fn sleeping_program_times_out_without_an_error_message() {
        let (config, limiter, resolver) = executor_parts();
        let executor = CaseExecutor {
            config: &config,
            limiter: &limiter,
            resolver: &resolver,
        };
        let result = executor
            .execute(
                LanguageId::Python3,
                "import time\ntime.sleep(30)",
                &case("", ""),
                300,
            )
            .await;
        assert!(!result.passed);
        assert!(result.error.is_none());
    }
}
