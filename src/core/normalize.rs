//! Merges the three endpoint payloads of a fund into one [`NormalizedRecord`].

use crate::core::config::FeeDefaults;
use crate::core::error::{EndpointFailure, FailureReason};
use crate::core::fees::{self, KnownFees};
use crate::core::listing::FundListing;
use crate::core::payload::{FeesData, IdentityData, PerformanceData};
use crate::core::record::{NormalizedRecord, PerformanceMetrics, round2};
use crate::core::venue::VenueClass;
use chrono::NaiveDate;
use tracing::debug;

/// Terminal outcome of each endpoint for one fund.
#[derive(Debug, Clone)]
pub struct EndpointResults {
    pub identity: Result<IdentityData, EndpointFailure>,
    pub performance: Result<PerformanceData, EndpointFailure>,
    pub fees: Result<FeesData, EndpointFailure>,
}

/// Builds the record for `listing`. Performance and fee failures degrade the
/// record; an identity failure means there is no record at all.
pub fn normalize(
    listing: &FundListing,
    results: EndpointResults,
    fee_defaults: &FeeDefaults,
) -> Result<NormalizedRecord, FailureReason> {
    let identity = results
        .identity
        .map_err(|cause| FailureReason::Normalization { cause })?;

    let mut degraded = Vec::new();
    let performance = results
        .performance
        .map_err(|failure| degraded.push(failure))
        .ok();
    let fees = results.fees.map_err(|failure| degraded.push(failure)).ok();

    let code = listing.code.clone();
    let venue_class = VenueClass::from_code(&code);
    let display_name = [&listing.name, &identity.name, &identity.fund_name]
        .into_iter()
        .flatten()
        .find(|name| !name.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| format!("Fund {code}"));

    let inception_date = identity.inception_date.as_deref().and_then(|date| {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| debug!(code = %code, date, error = %e, "Ignoring unparseable inception date"))
            .ok()
    });

    let record = NormalizedRecord {
        venue_class,
        display_name,
        scale_amount: identity.fund_size.filter(|size| *size > 0.0),
        inception_date,
        fees: fees::estimate(venue_class, &known_fees(fees.as_ref()), fee_defaults),
        performance: performance_metrics(performance.as_ref()),
        degraded,
        code,
    };
    debug!(code = %record.code, degraded = record.degraded.len(), "Normalized record");
    Ok(record)
}

/// Reads returns from the unwrapped performance object (`dayEnd.returns`).
fn performance_metrics(performance: Option<&PerformanceData>) -> PerformanceMetrics {
    let Some(performance) = performance else {
        return PerformanceMetrics::default();
    };
    let day_end = performance.day_end.clone().unwrap_or_default();
    PerformanceMetrics::new(
        day_end.returns.ytd.map(round2),
        day_end.returns.three_year.map(round2),
        day_end.returns.five_year.map(round2),
        performance
            .benchmark_name
            .clone()
            .filter(|name| !name.is_empty()),
        day_end.benchmark_returns.ytd.map(round2),
    )
}

fn known_fees(fees: Option<&FeesData>) -> KnownFees {
    let Some(schedule) = fees.and_then(|f| f.fees.as_ref()) else {
        return KnownFees::default();
    };
    KnownFees {
        management_fee: schedule.management_fee,
        custodian_fee: schedule.custodian_fee,
        subscription_fee: schedule.subscription_fee,
        redemption_fee: schedule.redemption_fee,
        sales_service_fee: schedule.distribution_fee,
        transaction_cost: schedule.trade_cost,
        other_fees: schedule.other_cost,
    }
}
