//! Utility modules.

pub mod file;
pub mod retry;

pub use file::{calculate_checksum, get_relative_path, read_file_bytes};
pub use retry::{RetryConfig, Retryable, with_retry};
