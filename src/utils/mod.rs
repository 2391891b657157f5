//! Utility modules.

pub mod file;
pub mod retry;
pub mod text;

pub use file::{calculate_checksum, collect_files};
pub use retry::{RetryConfig, RetryResult, Retryable, with_retry};
