//! Decoded payloads, one type per provider endpoint.
//!
//! Each type is the content of the provider's `data` object. Providers strip
//! the response envelope before handing these over, so nothing downstream
//! ever looks for a nested `data` key.

use serde::Deserialize;

/// `GET <base>/{code}/common-data`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityData {
    pub name: Option<String>,
    pub fund_name: Option<String>,
    /// `YYYY-MM-DD`
    pub inception_date: Option<String>,
    /// Fund size in currency units.
    pub fund_size: Option<f64>,
}

/// `GET <base>/{code}/performance`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    pub benchmark_name: Option<String>,
    pub day_end: Option<DayEndPerformance>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEndPerformance {
    #[serde(default)]
    pub returns: PeriodReturns,
    #[serde(default)]
    pub benchmark_returns: PeriodReturns,
}

/// Cumulative returns in percent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PeriodReturns {
    #[serde(rename = "YTD")]
    pub ytd: Option<f64>,
    #[serde(rename = "Y3")]
    pub three_year: Option<f64>,
    #[serde(rename = "Y5")]
    pub five_year: Option<f64>,
}

/// `GET <base>/{code}/fees`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeesData {
    pub fees: Option<FeeSchedule>,
}

/// Fee schedule in percent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    pub management_fee: Option<f64>,
    pub custodian_fee: Option<f64>,
    pub subscription_fee: Option<f64>,
    pub redemption_fee: Option<f64>,
    pub distribution_fee: Option<f64>,
    pub trade_cost: Option<f64>,
    pub other_cost: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance_shape() {
        let json = r#"{
            "benchmarkName": "CSI Dividend",
            "dayEnd": {
                "returns": {"YTD": 4.123, "Y3": 12.0, "Y5": 50.55},
                "benchmarkReturns": {"YTD": 9.19}
            }
        }"#;
        let perf: PerformanceData = serde_json::from_str(json).unwrap();
        assert_eq!(perf.benchmark_name.as_deref(), Some("CSI Dividend"));
        let day_end = perf.day_end.unwrap();
        assert_eq!(day_end.returns.ytd, Some(4.123));
        assert_eq!(day_end.returns.three_year, Some(12.0));
        assert_eq!(day_end.returns.five_year, Some(50.55));
        assert_eq!(day_end.benchmark_returns.ytd, Some(9.19));
        assert_eq!(day_end.benchmark_returns.five_year, None);
    }

    #[test]
    fn test_unknown_and_null_keys_are_tolerated() {
        let json = r#"{"fundName": "Some Fund", "fundSize": null, "extra": [1, 2]}"#;
        let identity: IdentityData = serde_json::from_str(json).unwrap();
        assert_eq!(identity.fund_name.as_deref(), Some("Some Fund"));
        assert_eq!(identity.name, None);
        assert_eq!(identity.fund_size, None);
    }

    #[test]
    fn test_fee_schedule_shape() {
        let json = r#"{"fees": {"managementFee": 0.5, "custodianFee": 0.1, "distributionFee": null, "tradeCost": 0.03, "otherCost": 0.2}}"#;
        let fees: FeesData = serde_json::from_str(json).unwrap();
        let schedule = fees.fees.unwrap();
        assert_eq!(schedule.management_fee, Some(0.5));
        assert_eq!(schedule.custodian_fee, Some(0.1));
        assert_eq!(schedule.distribution_fee, None);
        assert_eq!(schedule.trade_cost, Some(0.03));
        assert_eq!(schedule.other_cost, Some(0.2));
    }
}
