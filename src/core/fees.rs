//! Fee breakdown and the best-effort estimator for missing fee fields.
//!
//! All fee values are annual percentages (`0.15` means 0.15%).

use crate::core::config::FeeDefaults;
use crate::core::venue::VenueClass;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Fee fields as reported upstream; any of them may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KnownFees {
    pub management_fee: Option<f64>,
    pub custodian_fee: Option<f64>,
    pub subscription_fee: Option<f64>,
    pub redemption_fee: Option<f64>,
    pub sales_service_fee: Option<f64>,
    pub transaction_cost: Option<f64>,
    pub other_fees: Option<f64>,
}

/// A complete fee breakdown. The total is derived from the fields on every
/// read and is never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeBreakdown {
    pub management_fee: f64,
    pub custodian_fee: f64,
    pub subscription_fee: f64,
    pub redemption_fee: f64,
    pub sales_service_fee: f64,
    pub transaction_cost: f64,
    pub other_fees: f64,
}

impl FeeBreakdown {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        management_fee: f64,
        custodian_fee: f64,
        subscription_fee: f64,
        redemption_fee: f64,
        sales_service_fee: f64,
        transaction_cost: f64,
        other_fees: f64,
    ) -> Self {
        FeeBreakdown {
            management_fee,
            custodian_fee,
            subscription_fee,
            redemption_fee,
            sales_service_fee,
            transaction_cost,
            other_fees,
        }
    }

    /// Fees disclosed in the fund contract.
    pub fn explicit(&self) -> f64 {
        self.management_fee
            + self.custodian_fee
            + self.subscription_fee
            + self.redemption_fee
            + self.sales_service_fee
    }

    /// Costs borne by the fund but not charged as a named fee.
    pub fn implicit(&self) -> f64 {
        self.transaction_cost + self.other_fees
    }

    pub fn total_annual_fee(&self) -> f64 {
        self.explicit() + self.implicit()
    }
}

impl Serialize for FeeBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeeBreakdown", 8)?;
        state.serialize_field("management_fee", &self.management_fee)?;
        state.serialize_field("custodian_fee", &self.custodian_fee)?;
        state.serialize_field("subscription_fee", &self.subscription_fee)?;
        state.serialize_field("redemption_fee", &self.redemption_fee)?;
        state.serialize_field("sales_service_fee", &self.sales_service_fee)?;
        state.serialize_field("transaction_cost", &self.transaction_cost)?;
        state.serialize_field("other_fees", &self.other_fees)?;
        state.serialize_field("total_annual_fee", &self.total_annual_fee())?;
        state.end()
    }
}

/// Fills every missing fee field from the defaults for `class`. Known fields
/// are kept verbatim and the total is recomputed from the result.
pub fn estimate(class: VenueClass, known: &KnownFees, defaults: &FeeDefaults) -> FeeBreakdown {
    let class_defaults = defaults.for_class(class);
    FeeBreakdown::new(
        known.management_fee.unwrap_or(class_defaults.management_fee),
        known.custodian_fee.unwrap_or(defaults.custodian_fee),
        known
            .subscription_fee
            .unwrap_or(class_defaults.subscription_fee),
        known.redemption_fee.unwrap_or(class_defaults.redemption_fee),
        known
            .sales_service_fee
            .unwrap_or(class_defaults.sales_service_fee),
        known.transaction_cost.unwrap_or(defaults.transaction_cost),
        known.other_fees.unwrap_or(defaults.other_fees),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ClassFeeDefaults;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_all_missing_off_exchange_uses_class_defaults() {
        let defaults = FeeDefaults::default();
        let fees = estimate(VenueClass::OffExchange, &KnownFees::default(), &defaults);

        assert_eq!(fees.management_fee, 1.20);
        assert_eq!(fees.custodian_fee, 0.05);
        assert_eq!(fees.subscription_fee, 0.0);
        assert_eq!(fees.redemption_fee, 0.0);
        assert_eq!(fees.sales_service_fee, 0.0);
        assert_eq!(fees.transaction_cost, 0.0);
        assert_eq!(fees.other_fees, 0.0);
        assert_close(fees.total_annual_fee(), 1.25);
    }

    #[test]
    fn test_etf_default_management_fee_is_lower_than_active_classes() {
        let defaults = FeeDefaults::default();
        let etf = estimate(VenueClass::Etf, &KnownFees::default(), &defaults);
        let off = estimate(VenueClass::OffExchange, &KnownFees::default(), &defaults);
        assert!(etf.management_fee < off.management_fee);
        // Custodian fee does not depend on the class
        assert_eq!(etf.custodian_fee, off.custodian_fee);
    }

    #[test]
    fn test_known_fields_are_kept_verbatim() {
        let known = KnownFees {
            management_fee: Some(0.5),
            custodian_fee: Some(0.1),
            transaction_cost: Some(0.03),
            other_fees: Some(0.2),
            ..KnownFees::default()
        };
        let fees = estimate(VenueClass::Etf, &known, &FeeDefaults::default());

        assert_eq!(fees.management_fee, 0.5);
        assert_eq!(fees.custodian_fee, 0.1);
        assert_eq!(fees.transaction_cost, 0.03);
        assert_eq!(fees.other_fees, 0.2);
        assert_close(fees.explicit(), 0.6);
        assert_close(fees.implicit(), 0.23);
        assert_close(fees.total_annual_fee(), 0.83);
    }

    #[test]
    fn test_total_always_matches_sum_of_fields() {
        let mut defaults = FeeDefaults::default();
        defaults.classes.lof = ClassFeeDefaults {
            management_fee: 0.6,
            subscription_fee: 0.12,
            redemption_fee: 0.5,
            sales_service_fee: 0.25,
        };
        defaults.other_fees = 0.07;

        let partials = [
            KnownFees::default(),
            KnownFees {
                redemption_fee: Some(0.0),
                ..KnownFees::default()
            },
            KnownFees {
                management_fee: Some(1.0),
                sales_service_fee: Some(0.4),
                ..KnownFees::default()
            },
        ];
        for known in &partials {
            let fees = estimate(VenueClass::Lof, known, &defaults);
            let sum = fees.management_fee
                + fees.custodian_fee
                + fees.subscription_fee
                + fees.redemption_fee
                + fees.sales_service_fee
                + fees.transaction_cost
                + fees.other_fees;
            assert_close(fees.total_annual_fee(), sum);
        }
    }

    #[test]
    fn test_total_follows_field_updates() {
        let mut fees = FeeBreakdown::new(0.5, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert_close(fees.total_annual_fee(), 0.6);

        fees.management_fee = 2.0;
        fees.other_fees = 0.3;
        assert_close(fees.total_annual_fee(), 2.4);
        assert_close(fees.total_annual_fee(), fees.explicit() + fees.implicit());

        let json = serde_json::to_value(fees).unwrap();
        assert_close(json["total_annual_fee"].as_f64().unwrap(), 2.4);
        assert_eq!(json["management_fee"], 2.0);
    }
}
