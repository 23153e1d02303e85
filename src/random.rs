//! Client for the downstream random number service
//!
//! Follows a trait-based pattern so handlers can be tested without a network:
//! - `RandomSource` trait for abstraction
//! - `HttpRandomClient` for production (one GET per call, no retries)
//! - `MockRandomSource` for testing

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Error)]
pub enum RandomError {
    /// Connection refused, DNS failure or any other network error
    #[error("{0}")]
    Transport(String),

    /// Response body did not match `{"values": [...]}`
    #[error("{0}")]
    Decode(String),
}

/// Parameters sent to the random service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomQuery {
    pub min: i64,
    pub max: i64,
    pub count: usize,
}

impl RandomQuery {
    pub fn new(min: i64, max: i64, count: usize) -> Self {
        Self { min, max, count }
    }
}

/// Wire shape returned by the random service
#[derive(Debug, Deserialize)]
struct RandomResponse {
    values: Vec<i64>,
}

/// Source of random integers
///
/// Implementations do not check that the number of returned values matches
/// `query.count`; that is left to the caller.
#[async_trait]
pub trait RandomSource: Send + Sync {
    async fn next(&self, query: RandomQuery) -> Result<Vec<i64>, RandomError>;
}

/// HTTP client for the random service
///
/// No request timeout is configured, so a hanging downstream call hangs the
/// request that issued it.
#[derive(Debug, Clone)]
pub struct HttpRandomClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRandomClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn next_url(&self, query: &RandomQuery) -> String {
        format!(
            "{}/next?min={}&max={}&num={}",
            self.base_url, query.min, query.max, query.count
        )
    }
}

#[async_trait]
impl RandomSource for HttpRandomClient {
    async fn next(&self, query: RandomQuery) -> Result<Vec<i64>, RandomError> {
        let url = self.next_url(&query);

        let response = self.client.get(&url).send().await.map_err(|e| {
            let msg = error_chain(&e);
            warn!(error = %msg, url = %url, "Error contacting random service");
            RandomError::Transport(msg)
        })?;

        // The status code is not inspected: whatever the service sends back
        // has to decode as a values list.
        let body = response.bytes().await.map_err(|e| {
            let msg = error_chain(&e);
            warn!(error = %msg, url = %url, "Error reading random service response");
            RandomError::Transport(msg)
        })?;

        let parsed: RandomResponse =
            serde_json::from_slice(&body).map_err(|e| RandomError::Decode(e.to_string()))?;

        Ok(parsed.values)
    }
}

/// Render an error with all of its sources, e.g. the OS-level
/// "Connection refused" underneath reqwest's "error sending request".
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !msg.contains(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        source = cause.source();
    }
    msg
}

/// Mock random source for testing
///
/// Returns a preconfigured response and counts calls.
#[cfg(test)]
pub struct MockRandomSource {
    response: Result<Vec<i64>, RandomError>,
    pub queries: std::sync::Mutex<Vec<RandomQuery>>,
}

#[cfg(test)]
impl MockRandomSource {
    pub fn new(values: Vec<i64>) -> Self {
        Self {
            response: Ok(values),
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with a transport error
    pub fn new_failing(error_msg: &str) -> Self {
        Self::with_error(RandomError::Transport(error_msg.to_string()))
    }

    /// Fail every call with a decode error
    pub fn new_undecodable(error_msg: &str) -> Self {
        Self::with_error(RandomError::Decode(error_msg.to_string()))
    }

    fn with_error(error: RandomError) -> Self {
        Self {
            response: Err(error),
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }

    #[allow(clippy::unwrap_used)]
    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl RandomSource for MockRandomSource {
    async fn next(&self, query: RandomQuery) -> Result<Vec<i64>, RandomError> {
        self.queries
            .lock()
            .map_err(|_| RandomError::Transport("lock poisoned".into()))?
            .push(query);

        self.response.clone()
    }
}
