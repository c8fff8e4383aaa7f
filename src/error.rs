use thiserror::Error;

/// Errors the evaluation call itself can return. Everything else is
/// folded into a per-case result by the executor.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Failures of a single sandboxed execution. Captured at the test-case
/// boundary as `CaseResult.error`; sibling cases still run.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Compilation failed: {0}")]
    Compilation(String),

    #[error("no usable {0} interpreter found")]
    InterpreterNotFound(&'static str),

    #[error("failed to start process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("sandbox i/o error: {0}")]
    Io(#[from] std::io::Error),
}
