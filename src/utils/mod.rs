//! Utility modules supporting the resource clients.
//!
//! - [`Transport`]: the single-request HTTP boundary, with [`HttpTransport`] as
//!   the reqwest implementation
//! - [`RetryConfig`]: configuration for retry logic with exponential backoff
//! - [`with_retry`]: execute an operation with automatic retry on transient errors
//! - [`document_table`]: render documents as a terminal table
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use mp_rester::resters::ResterError;
//! use mp_rester::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_total() -> Result<u64, ResterError> { Ok(1) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), ResterError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let total = with_retry(config, || fetch_total()).await?;
//! # Ok(())
//! # }
//! ```

mod display;
mod http;
mod retry;

pub use display::{
    document_table, format_value, is_terminal, key_value_table, table_columns,
    truncate_with_ellipsis, DEFAULT_CELL_WIDTH,
};
pub use self::http::{
    HttpSettings, HttpTransport, Transport, TransportError, TransportRequest, TransportResponse,
    API_KEY_HEADER,
};
pub use retry::{with_retry, with_retry_detailed, RetryConfig, RetryResult, TransientError};
