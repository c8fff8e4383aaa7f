//! Evaluator/Scorer: fans one submission out over its test-case set and
//! aggregates per-case results into a status and a score.

use tracing::info;

use crate::error::JudgeError;
use crate::executor::CaseExecutor;
use crate::language::{self, LanguageId};
use crate::limiter::Limiter;
use crate::types::{
    CaseResult, EvaluationResult, JudgeConfig, Problem, Status, Submission, TestCase,
};

pub use crate::language::InterpreterResolver;

/// The judging engine. Holds the only shared state: the admission gate
/// and the interpreter cache. Everything per-execution (temp dirs,
/// children, buffers) is owned by the single case that created it.
pub struct Judge {
    config: JudgeConfig,
    limiter: Limiter,
    resolver: InterpreterResolver,
}

impl Judge {
    pub fn new(config: JudgeConfig) -> Self {
        Self::with_resolver(config, InterpreterResolver::default())
    }

    /// Construct with a caller-supplied interpreter resolver, so tests
    /// can substitute fake candidate lists.
    pub fn with_resolver(config: JudgeConfig, resolver: InterpreterResolver) -> Self {
        let limiter = Limiter::new(config.max_concurrent);
        Self {
            config,
            limiter,
            resolver,
        }
    }

    fn executor(&self) -> CaseExecutor<'_> {
        CaseExecutor {
            config: &self.config,
            limiter: &self.limiter,
            resolver: &self.resolver,
        }
    }

    /// Interactive "run code" feedback: judge one caller-selected case.
    pub async fn run_case(
        &self,
        submission: &Submission,
        case: &TestCase,
        problem: &Problem,
    ) -> Result<CaseResult, JudgeError> {
        let language: LanguageId = submission.language.parse()?;
        let time_limit_ms = problem
            .time_limit_ms
            .unwrap_or(self.config.default_time_limit_ms);
        Ok(self
            .executor()
            .execute(language, &submission.source_code, case, time_limit_ms)
            .await)
    }

    /// Final scored evaluation against the caller-supplied case set.
    ///
    /// Cases run sequentially in input order; results preserve that
    /// order. The only error this call itself returns is the
    /// unsupported-language configuration error; every per-case failure
    /// is folded into its `CaseResult`.
    pub async fn evaluate(
        &self,
        submission: &Submission,
        cases: &[TestCase],
        problem: &Problem,
    ) -> Result<EvaluationResult, JudgeError> {
        let language: LanguageId = submission.language.parse()?;

        if cases.is_empty() {
            return Ok(EvaluationResult {
                status: Status::NoTestCases,
                score: 0,
                execution_time_ms: 0,
                memory_usage_mb: 0,
                test_results: Vec::new(),
            });
        }

        let time_limit_ms = problem
            .time_limit_ms
            .unwrap_or(self.config.default_time_limit_ms);
        let executor = self.executor();

        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            results.push(
                executor
                    .execute(language, &submission.source_code, case, time_limit_ms)
                    .await,
            );
        }

        let passed = results.iter().filter(|r| r.passed).count();
        let status = classify_status(&results);
        let score = proportional_score(passed, results.len(), problem.points);
        let execution_time_ms = results.iter().map(|r| r.execution_time_ms).sum();
        let memory_usage_mb = results.iter().map(|r| r.memory_usage_mb).max().unwrap_or(0);

        info!(
            problem = %problem.id,
            language = %language,
            passed,
            total = results.len(),
            score,
            ?status,
            "submission judged"
        );

        Ok(EvaluationResult {
            status,
            score,
            execution_time_ms,
            memory_usage_mb,
            test_results: results,
        })
    }

    /// Report which language toolchains are present on this host.
    pub fn check_environment() -> Vec<(&'static str, &'static str, bool)> {
        language::toolchain_overview()
    }
}

/// Precedence: any recorded error → RuntimeError; zero passed →
/// WrongAnswer; all passed → Accepted; otherwise PartialAccepted.
fn classify_status(results: &[CaseResult]) -> Status {
    let passed = results.iter().filter(|r| r.passed).count();
    if results.iter().any(|r| r.error.is_some()) {
        Status::RuntimeError
    } else if passed == 0 {
        Status::WrongAnswer
    } else if passed == results.len() {
        Status::Accepted
    } else {
        Status::PartialAccepted
    }
}

/// Uniform partial credit: round(passed/total × points). Per-case
/// weights are display-only and do not enter the headline score.
fn proportional_score(passed: usize, total: usize, points: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let fraction = passed as f64 / total as f64;
    ((fraction * f64::from(points)).round() as u32).min(points)
}
