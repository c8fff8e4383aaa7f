pub mod error;
pub mod executor;
pub mod input;
pub mod judge;
pub mod language;
pub mod limiter;
pub mod metrics;
pub mod sandbox;
pub mod types;

pub use error::{ExecError, JudgeError};
pub use judge::{InterpreterResolver, Judge};
pub use types::*;
