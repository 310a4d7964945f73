//! HTTP Client Factory
//!
//! Builds the reqwest client shared by backend providers.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a `reqwest::Client` with connect and whole-request timeouts.
///
/// A `timeout_secs` of zero leaves the request timeout unset.
pub fn build_http_client(timeout_secs: u64) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
    if timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(timeout_secs));
    }
    builder.build().map_err(|e| LlmError::NetworkError {
        message: format!("failed to build HTTP client: {}", e),
    })
}
