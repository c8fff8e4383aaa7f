use serde::{Deserialize, Serialize};

/// One attempt to solve a problem: source code plus a declared language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub source_code: String,
    pub language: String, // "c", "cpp", "python", ...
    pub problem_id: String,
}

/// One input/expected-output pair used to judge a submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    /// Whether the case is shown to the submission's author. Filtered
    /// upstream by the caller; execution ignores it.
    pub is_visible: bool,
    /// Display weight of this case. The headline score is a uniform
    /// fraction of cases passed and does not consult this field.
    pub points: u32,
    pub order_index: u32,
}

/// Problem metadata the engine needs for scoring and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    /// Maximum score for the problem
    pub points: u32,
    /// Per-case wall-clock limit in milliseconds; falls back to the
    /// engine default when absent
    pub time_limit_ms: Option<u64>,
}

/// Result of judging one test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub passed: bool,
    pub execution_time_ms: u64,
    /// Best-effort peak resident memory in MiB; 0 when unavailable
    pub memory_usage_mb: u64,
    /// Set when the run itself errored (compile failure, missing
    /// toolchain, crash). A plain timeout carries no message.
    pub error: Option<String>,
}

/// Overall classification of a judged submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NoTestCases,
    Accepted,
    PartialAccepted,
    WrongAnswer,
    RuntimeError,
}

/// Result of judging one submission against its full test-case set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub status: Status,
    /// Integer in [0, problem.points], proportional to cases passed
    pub score: u32,
    /// Sum of per-case execution times
    pub execution_time_ms: u64,
    /// Maximum per-case memory reading
    pub memory_usage_mb: u64,
    /// One entry per test case, in input order
    pub test_results: Vec<CaseResult>,
}

/// Engine-wide knobs, injected at construction
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Host-wide cap on simultaneous sandboxed executions
    pub max_concurrent: usize,
    /// Per-case wall-clock limit when the problem specifies none
    pub default_time_limit_ms: u64,
    /// Cap on captured stdout/stderr per stream, in bytes
    pub max_output_bytes: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 16,
            default_time_limit_ms: 5_000,
            max_output_bytes: 1024 * 1024,
        }
    }
}
