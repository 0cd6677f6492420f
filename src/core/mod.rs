//! Fetching, normalizing and scoring fund records

pub mod batch;
pub mod config;
pub mod error;
pub mod fees;
pub mod listing;
pub mod log;
pub mod normalize;
pub mod oracle;
pub mod payload;
pub mod provider;
pub mod record;
pub mod retry;
pub mod scoring;
pub mod venue;

// Re-export main types for cleaner imports
pub use batch::{BatchOutcome, FetchEngine};
pub use error::{Endpoint, EndpointFailure, FailureReason, FetchError};
pub use listing::FundListing;
pub use provider::FundDataProvider;
pub use record::NormalizedRecord;
pub use scoring::{CohortRanking, score_cohort};
