//! Fund data source abstraction

use crate::core::error::FetchError;
use crate::core::payload::{FeesData, IdentityData, PerformanceData};
use async_trait::async_trait;

/// One request per call, no retries; the fetch engine owns retry and pacing.
#[async_trait]
pub trait FundDataProvider: Send + Sync {
    async fn fetch_identity(&self, code: &str) -> Result<IdentityData, FetchError>;
    async fn fetch_performance(&self, code: &str) -> Result<PerformanceData, FetchError>;
    async fn fetch_fees(&self, code: &str) -> Result<FeesData, FetchError>;
}
