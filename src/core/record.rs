use crate::core::error::EndpointFailure;
use crate::core::fees::FeeBreakdown;
use crate::core::venue::VenueClass;
use chrono::NaiveDate;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

/// Returns are percentages; `None` means the provider did not report them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    pub ytd_return: Option<f64>,
    pub three_year_return: Option<f64>,
    pub five_year_return: Option<f64>,
    pub benchmark_name: Option<String>,
    pub benchmark_ytd_return: Option<f64>,
}

impl PerformanceMetrics {
    pub fn new(
        ytd_return: Option<f64>,
        three_year_return: Option<f64>,
        five_year_return: Option<f64>,
        benchmark_name: Option<String>,
        benchmark_ytd_return: Option<f64>,
    ) -> Self {
        PerformanceMetrics {
            ytd_return,
            three_year_return,
            five_year_return,
            benchmark_name,
            benchmark_ytd_return,
        }
    }

    /// YTD return minus benchmark YTD return, when both are known.
    pub fn excess_return(&self) -> Option<f64> {
        match (self.ytd_return, self.benchmark_ytd_return) {
            (Some(fund), Some(benchmark)) => Some(round2(fund - benchmark)),
            _ => None,
        }
    }

    pub fn beats_benchmark(&self) -> Option<bool> {
        self.excess_return().map(|excess| excess > 0.0)
    }
}

impl Serialize for PerformanceMetrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PerformanceMetrics", 6)?;
        state.serialize_field("ytd_return", &self.ytd_return)?;
        state.serialize_field("three_year_return", &self.three_year_return)?;
        state.serialize_field("five_year_return", &self.five_year_return)?;
        state.serialize_field("benchmark_name", &self.benchmark_name)?;
        state.serialize_field("benchmark_ytd_return", &self.benchmark_ytd_return)?;
        state.serialize_field("excess_return", &self.excess_return())?;
        state.end()
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One fund after merging the provider's endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub code: String,
    pub display_name: String,
    pub venue_class: VenueClass,
    /// Fund size in currency units.
    pub scale_amount: Option<f64>,
    pub inception_date: Option<NaiveDate>,
    pub fees: FeeBreakdown,
    pub performance: PerformanceMetrics,
    /// Endpoints that failed terminally; the record was built without them.
    pub degraded: Vec<EndpointFailure>,
}

/// Why a record cannot take part in ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscorableReason {
    MissingScale,
    MissingReturns,
}

impl std::fmt::Display for UnscorableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnscorableReason::MissingScale => write!(f, "fund size unknown"),
            UnscorableReason::MissingReturns => {
                write!(f, "neither YTD nor five-year return known")
            }
        }
    }
}

impl NormalizedRecord {
    /// A record is ranked only when its size and at least one of YTD or
    /// five-year return are known.
    pub fn scorability(&self) -> Result<(), UnscorableReason> {
        if self.scale_amount.is_none() {
            return Err(UnscorableReason::MissingScale);
        }
        if self.performance.ytd_return.is_none() && self.performance.five_year_return.is_none() {
            return Err(UnscorableReason::MissingReturns);
        }
        Ok(())
    }

    pub fn is_scorable(&self) -> bool {
        self.scorability().is_ok()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Fund size in units of 100 million, the way fund sizes are usually quoted.
    pub fn scale_in_hundred_millions(&self) -> Option<f64> {
        self.scale_amount.map(|s| round2(s / 1.0e8))
    }
}
