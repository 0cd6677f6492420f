use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Where a fund trades, derived from the prefix of its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueClass {
    Etf,
    Lof,
    ClosedEnd,
    OffExchange,
}

// Longest prefixes first so that "159" wins over "15".
const PREFIX_RULES: &[(&str, VenueClass)] = &[
    ("159", VenueClass::Etf),
    ("51", VenueClass::Etf),
    ("52", VenueClass::Etf),
    ("56", VenueClass::Etf),
    ("58", VenueClass::Etf),
    ("16", VenueClass::Lof),
    ("15", VenueClass::ClosedEnd),
    ("50", VenueClass::ClosedEnd),
];

impl VenueClass {
    /// Classifies a fund code. Total: anything unmatched is off-exchange.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        PREFIX_RULES
            .iter()
            .find(|(prefix, _)| code.starts_with(prefix))
            .map_or(VenueClass::OffExchange, |(_, class)| *class)
    }

    pub fn is_on_exchange(&self) -> bool {
        !matches!(self, VenueClass::OffExchange)
    }
}

impl Display for VenueClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                VenueClass::Etf => "ETF",
                VenueClass::Lof => "LOF",
                VenueClass::ClosedEnd => "Closed-end",
                VenueClass::OffExchange => "Off-exchange",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_traded_prefixes() {
        assert_eq!(VenueClass::from_code("515890"), VenueClass::Etf);
        assert_eq!(VenueClass::from_code("588410"), VenueClass::Etf);
        assert_eq!(VenueClass::from_code("159136"), VenueClass::Etf);
        assert_eq!(VenueClass::from_code("563930"), VenueClass::Etf);
        assert_eq!(VenueClass::from_code("520810"), VenueClass::Etf);
    }

    #[test]
    fn test_lof_and_closed_end_prefixes() {
        assert_eq!(VenueClass::from_code("161725"), VenueClass::Lof);
        assert_eq!(VenueClass::from_code("150001"), VenueClass::ClosedEnd);
        assert_eq!(VenueClass::from_code("505888"), VenueClass::ClosedEnd);
    }

    #[test]
    fn test_unmatched_codes_are_off_exchange() {
        for code in ["000001", "026163", "", "X", "1", "  "] {
            assert_eq!(VenueClass::from_code(code), VenueClass::OffExchange);
        }
        assert!(!VenueClass::OffExchange.is_on_exchange());
        assert!(VenueClass::Lof.is_on_exchange());
    }

    #[test]
    fn test_classification_is_deterministic() {
        for code in ["159141", "025958", "16", "15", "589150"] {
            assert_eq!(VenueClass::from_code(code), VenueClass::from_code(code));
        }
    }
}
