//! Failure taxonomy for fetching and ranking funds.

use crate::core::retry::Retryable;
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

/// The three per-fund resources exposed by the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    CommonData,
    Performance,
    Fees,
}

impl Endpoint {
    pub fn resource(&self) -> &'static str {
        match self {
            Endpoint::CommonData => "common-data",
            Endpoint::Performance => "performance",
            Endpoint::Fees => "fees",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.resource())
    }
}

/// A single request failure, classified so the engine knows whether to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {message}")]
    Connection { message: String },
    #[error("HTTP status {status}")]
    Http { status: u16 },
    #[error("failed to decode response: {message}")]
    Decode { message: String },
    #[error("upstream reported status {status}")]
    UpstreamStatus { status: String },
}

impl Retryable for FetchError {
    /// Timeouts, connection errors, 5xx and 429 are worth another attempt.
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Connection { .. } => true,
            FetchError::Http { status } => *status == 429 || (500..600).contains(status),
            FetchError::Decode { .. } | FetchError::UpstreamStatus { .. } => false,
        }
    }
}

/// A terminally failed endpoint request, after retries.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{endpoint} failed after {attempts} attempt(s): {error}")]
pub struct EndpointFailure {
    pub endpoint: Endpoint,
    pub error: FetchError,
    pub attempts: u32,
}

/// Why a fund produced no record at all.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Identity data could not be fetched, so no record can be built.
    #[error("normalization failed: {cause}")]
    Normalization { cause: EndpointFailure },
    /// The batch was cancelled before this code was started.
    #[error("cancelled before fetch started")]
    Cancelled,
}

impl FailureReason {
    pub fn is_normalization(&self) -> bool {
        matches!(self, FailureReason::Normalization { .. })
    }
}
