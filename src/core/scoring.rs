//! Relative scoring of a fund cohort.
//!
//! Every dimension is scored by percentile rank within the cohort rather than
//! against absolute thresholds, so the same fund can score differently in a
//! different cohort. Percentiles map to a fraction of the dimension's weight
//! through the configured [`PercentileBand`]s.

use crate::core::config::{DimensionWeights, PercentileBand, ScoringConfig};
use crate::core::record::{NormalizedRecord, UnscorableReason, round2};
use chrono::Datelike;
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Fees,
    Scale,
    ShortTerm,
    LongTerm,
    ExcessReturn,
    Stability,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Fees,
        Dimension::Scale,
        Dimension::ShortTerm,
        Dimension::LongTerm,
        Dimension::ExcessReturn,
        Dimension::Stability,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Fees => "Fees",
            Dimension::Scale => "Scale",
            Dimension::ShortTerm => "YTD",
            Dimension::LongTerm => "Long-term",
            Dimension::ExcessReturn => "Excess",
            Dimension::Stability => "Stability",
        }
    }

    fn weight(&self, weights: &DimensionWeights) -> f64 {
        match self {
            Dimension::Fees => weights.fees,
            Dimension::Scale => weights.scale,
            Dimension::ShortTerm => weights.short_term,
            Dimension::LongTerm => weights.long_term,
            Dimension::ExcessReturn => weights.excess_return,
            Dimension::Stability => weights.stability,
        }
    }
}

/// Which return the long-term dimension was scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LongTermBasis {
    FiveYear,
    ThreeYearAnnualized,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionScore {
    pub score: f64,
    pub max: f64,
    /// `None` when the fund had no value and got the missing-data share.
    pub percentile: Option<f64>,
    /// The metric the percentile was computed on, in display units: total fee
    /// (%), size (100 million), returns (%), years older than the cohort's
    /// youngest fund.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortScore {
    pub fees: DimensionScore,
    pub scale: DimensionScore,
    pub short_term: DimensionScore,
    pub long_term: DimensionScore,
    pub excess_return: DimensionScore,
    pub stability: DimensionScore,
    pub long_term_basis: LongTermBasis,
    pub total: f64,
}

impl CohortScore {
    pub fn dimension(&self, dimension: Dimension) -> &DimensionScore {
        match dimension {
            Dimension::Fees => &self.fees,
            Dimension::Scale => &self.scale,
            Dimension::ShortTerm => &self.short_term,
            Dimension::LongTerm => &self.long_term,
            Dimension::ExcessReturn => &self.excess_return,
            Dimension::Stability => &self.stability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFund {
    pub rank: usize,
    pub code: String,
    pub name: String,
    pub score: CohortScore,
}

/// A record left out of the ranking, kept so it is reported rather than lost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exclusion {
    pub code: String,
    pub name: String,
    pub reason: UnscorableReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohortRanking {
    pub ranked: Vec<RankedFund>,
    pub excluded: Vec<Exclusion>,
}

impl CohortRanking {
    /// `(code, score)` pairs in rank order.
    pub fn scores(&self) -> impl Iterator<Item = (&str, &CohortScore)> {
        self.ranked.iter().map(|f| (f.code.as_str(), &f.score))
    }

    pub fn get(&self, code: &str) -> Option<&RankedFund> {
        self.ranked.iter().find(|f| f.code == code)
    }
}

/// Metric values of one fund. Higher is better for every field.
struct Metrics {
    fee: Option<f64>,
    scale: Option<f64>,
    ytd: Option<f64>,
    long_term: Option<f64>,
    long_term_basis: LongTermBasis,
    excess: Option<f64>,
    inception_day: Option<i32>,
}

impl Metrics {
    fn of(record: &NormalizedRecord) -> Self {
        let perf = &record.performance;
        let five_year = perf.five_year_return.and_then(|r| annualize(r, 5));
        let three_year = perf.three_year_return.and_then(|r| annualize(r, 3));
        let (long_term, long_term_basis) = match (five_year, three_year) {
            (Some(rate), _) => (Some(rate), LongTermBasis::FiveYear),
            (None, Some(rate)) => (Some(rate), LongTermBasis::ThreeYearAnnualized),
            (None, None) => (None, LongTermBasis::Missing),
        };
        Metrics {
            fee: Some(record.fees.total_annual_fee()),
            scale: record.scale_amount,
            ytd: perf.ytd_return,
            long_term,
            long_term_basis,
            excess: perf.excess_return(),
            inception_day: record.inception_date.map(|d| d.num_days_from_ce()),
        }
    }
}

/// Converts a cumulative return over `years` into an annual rate, both in percent.
fn annualize(cumulative_pct: f64, years: u32) -> Option<f64> {
    let begin_bal = Decimal::from(100);
    let end_bal = Decimal::from_f64(100.0 + cumulative_pct)?;
    if end_bal <= Decimal::ZERO {
        return None;
    }
    let rate = cagr(begin_bal, end_bal, Decimal::from(years));
    (rate * Decimal::from(100)).to_f64().map(round2)
}

/// Fraction of the entities with a value whose value is at or below each
/// entity's own. Ties share a percentile.
fn percentiles(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let n = present.len() as f64;
    values
        .iter()
        .map(|value| {
            value.map(|v| present.iter().filter(|other| **other <= v).count() as f64 / n)
        })
        .collect()
}

/// Maps a percentile to a fraction of a dimension's weight. Bands are ordered
/// by decreasing lower bound; each one spans up to the previous band's bound.
fn band_fraction(percentile: f64, bands: &[PercentileBand]) -> f64 {
    let mut upper = 1.0;
    for band in bands {
        if percentile >= band.lower {
            let span = upper - band.lower;
            let t = if span > 0.0 {
                ((percentile - band.lower) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            return band.floor + (band.ceiling - band.floor) * t;
        }
        upper = band.lower;
    }
    bands.last().map_or(0.0, |band| band.floor)
}

struct DimensionInput {
    dimension: Dimension,
    // Ranked on
    goodness: Vec<Option<f64>>,
    // Shown
    display: Vec<Option<f64>>,
}

/// Scores the scorable records against each other and ranks them.
/// Unscorable records are listed in `excluded`. Records are never modified.
pub fn score_cohort(records: &[NormalizedRecord], config: &ScoringConfig) -> CohortRanking {
    let mut scorable = Vec::new();
    let mut excluded = Vec::new();
    for record in records {
        match record.scorability() {
            Ok(()) => scorable.push(record),
            Err(reason) => {
                debug!(code = %record.code, %reason, "Excluding fund from ranking");
                excluded.push(Exclusion {
                    code: record.code.clone(),
                    name: record.display_name.clone(),
                    reason,
                });
            }
        }
    }
    excluded.sort_by(|a, b| a.code.cmp(&b.code));

    let metrics: Vec<Metrics> = scorable.iter().map(|r| Metrics::of(r)).collect();
    let midpoint = config.ideal_scale.midpoint();
    let youngest = metrics.iter().filter_map(|m| m.inception_day).max();

    let inputs = [
        DimensionInput {
            dimension: Dimension::Fees,
            goodness: metrics.iter().map(|m| m.fee.map(|f| -f)).collect(),
            display: metrics.iter().map(|m| m.fee.map(round2)).collect(),
        },
        DimensionInput {
            dimension: Dimension::Scale,
            goodness: metrics
                .iter()
                .map(|m| m.scale.map(|s| -(s - midpoint).abs()))
                .collect(),
            display: scorable.iter().map(|r| r.scale_in_hundred_millions()).collect(),
        },
        DimensionInput {
            dimension: Dimension::ShortTerm,
            goodness: metrics.iter().map(|m| m.ytd).collect(),
            display: metrics.iter().map(|m| m.ytd).collect(),
        },
        DimensionInput {
            dimension: Dimension::LongTerm,
            goodness: metrics.iter().map(|m| m.long_term).collect(),
            display: metrics.iter().map(|m| m.long_term).collect(),
        },
        DimensionInput {
            dimension: Dimension::ExcessReturn,
            goodness: metrics.iter().map(|m| m.excess).collect(),
            display: metrics.iter().map(|m| m.excess).collect(),
        },
        DimensionInput {
            dimension: Dimension::Stability,
            goodness: metrics
                .iter()
                .map(|m| m.inception_day.map(|d| -f64::from(d)))
                .collect(),
            display: metrics
                .iter()
                .map(|m| {
                    m.inception_day
                        .zip(youngest)
                        .map(|(day, youngest)| round2(f64::from(youngest - day) / 365.25))
                })
                .collect(),
        },
    ];

    // scores[dimension][fund]
    let scores: Vec<Vec<DimensionScore>> = inputs
        .iter()
        .map(|input| score_dimension(input, &metrics, config))
        .collect();

    let mut ranked: Vec<RankedFund> = scorable
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let take = |d: Dimension| scores[d as usize][i].clone();
            let mut score = CohortScore {
                fees: take(Dimension::Fees),
                scale: take(Dimension::Scale),
                short_term: take(Dimension::ShortTerm),
                long_term: take(Dimension::LongTerm),
                excess_return: take(Dimension::ExcessReturn),
                stability: take(Dimension::Stability),
                long_term_basis: metrics[i].long_term_basis,
                total: 0.0,
            };
            score.total = round2(
                Dimension::ALL
                    .iter()
                    .map(|d| score.dimension(*d).score)
                    .sum(),
            );
            RankedFund {
                rank: 0,
                code: record.code.clone(),
                name: record.display_name.clone(),
                score,
            }
        })
        .collect();

    ranked.sort_by(compare_ranked);
    for (i, fund) in ranked.iter_mut().enumerate() {
        fund.rank = i + 1;
    }

    debug!(
        ranked = ranked.len(),
        excluded = excluded.len(),
        "Scored cohort"
    );
    CohortRanking { ranked, excluded }
}

fn score_dimension(
    input: &DimensionInput,
    metrics: &[Metrics],
    config: &ScoringConfig,
) -> Vec<DimensionScore> {
    let max = input.dimension.weight(&config.weights);
    percentiles(&input.goodness)
        .into_iter()
        .zip(&input.display)
        .zip(metrics)
        .map(|((percentile, value), m)| {
            let fraction = match percentile {
                None => config.missing_fraction,
                Some(p) => {
                    let fraction = band_fraction(p, &config.bands);
                    if input.dimension == Dimension::LongTerm
                        && m.long_term_basis == LongTermBasis::ThreeYearAnnualized
                    {
                        fraction.min(config.fallback_cap)
                    } else {
                        fraction
                    }
                }
            };
            DimensionScore {
                score: round2(max * fraction),
                max,
                percentile,
                value: *value,
            }
        })
        .collect()
}

/// Total descending, then long-term score descending, then code ascending.
fn compare_ranked(a: &RankedFund, b: &RankedFund) -> Ordering {
    b.score
        .total
        .total_cmp(&a.score.total)
        .then_with(|| b.score.long_term.score.total_cmp(&a.score.long_term.score))
        .then_with(|| a.code.cmp(&b.code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fees::FeeBreakdown;
    use crate::core::record::PerformanceMetrics;
    use crate::core::venue::VenueClass;
    use chrono::NaiveDate;

    fn fund(code: &str, ytd: Option<f64>, three: Option<f64>, five: Option<f64>) -> NormalizedRecord {
        NormalizedRecord {
            code: code.to_string(),
            display_name: format!("Fund {code}"),
            venue_class: VenueClass::from_code(code),
            scale_amount: Some(2.6e9),
            inception_date: NaiveDate::from_ymd_opt(2015, 6, 1),
            fees: FeeBreakdown::new(0.5, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0),
            performance: PerformanceMetrics::new(ytd, three, five, None, None),
            degraded: Vec::new(),
        }
    }

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    #[test]
    fn test_five_year_extremes() {
        let records = vec![
            fund("000001", Some(5.0), None, Some(10.0)),
            fund("000002", Some(5.0), None, Some(20.0)),
            fund("000003", Some(5.0), None, Some(30.0)),
        ];
        let ranking = score_cohort(&records, &config());

        let long_term = |code: &str| ranking.get(code).unwrap().score.long_term.clone();
        assert_eq!(long_term("000003").score, 25.0);
        assert_eq!(long_term("000003").percentile, Some(1.0));
        let lowest = long_term("000001").score;
        assert!(ranking.ranked.iter().all(|f| f.score.long_term.score >= lowest));
        assert!(lowest < long_term("000003").score);

        assert_eq!(ranking.ranked[0].code, "000003");
        assert_eq!(ranking.ranked[0].rank, 1);
        let codes: Vec<&str> = ranking.scores().map(|(code, _)| code).collect();
        assert_eq!(codes, vec!["000003", "000001", "000002"]);
        // 30% over five years is about 5.39% a year
        assert_eq!(long_term("000003").value, Some(5.39));
    }

    #[test]
    fn test_three_year_fallback_is_capped() {
        let records = vec![
            fund("000001", Some(5.0), None, Some(10.0)),
            fund("000002", Some(5.0), Some(9.0), None),
        ];
        let ranking = score_cohort(&records, &config());

        let fallback = ranking.get("000002").unwrap();
        assert_eq!(
            fallback.score.long_term_basis,
            LongTermBasis::ThreeYearAnnualized
        );
        // Ranks first on annualized rate yet cannot reach the full weight
        assert_eq!(fallback.score.long_term.percentile, Some(1.0));
        assert!(fallback.score.long_term.score < fallback.score.long_term.max);
        assert_eq!(fallback.score.long_term.score, 20.0);
        assert_eq!(fallback.score.long_term.value, Some(2.91));
    }

    #[test]
    fn test_ties_share_percentile_and_score() {
        let records = vec![
            fund("000004", Some(8.0), None, Some(20.0)),
            fund("000002", Some(3.0), None, Some(20.0)),
            fund("000003", Some(3.0), None, Some(20.0)),
            fund("000001", Some(1.0), None, Some(20.0)),
        ];
        let ranking = score_cohort(&records, &config());

        let a = &ranking.get("000002").unwrap().score.short_term;
        let b = &ranking.get("000003").unwrap().score.short_term;
        assert_eq!(a.percentile, Some(0.75));
        assert_eq!(a, b);

        // Identical funds order by code
        let codes: Vec<&str> = ranking.ranked.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["000004", "000002", "000003", "000001"]);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let records = vec![
            fund("515890", Some(4.12), Some(21.46), Some(50.55)),
            fund("159136", Some(-2.0), None, Some(12.0)),
            fund("000001", Some(7.5), Some(3.0), None),
        ];
        let first = score_cohort(&records, &config());
        let second = score_cohort(&records, &config());
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_and_unscorable_cohorts() {
        let ranking = score_cohort(&[], &config());
        assert!(ranking.ranked.is_empty());
        assert!(ranking.excluded.is_empty());

        let mut no_scale = fund("000002", Some(1.0), None, None);
        no_scale.scale_amount = None;
        let no_returns = fund("000001", None, Some(10.0), None);
        let ranking = score_cohort(&[no_scale, no_returns], &config());
        assert!(ranking.ranked.is_empty());
        assert_eq!(ranking.excluded.len(), 2);
        assert_eq!(ranking.excluded[0].code, "000001");
        assert_eq!(ranking.excluded[0].reason, UnscorableReason::MissingReturns);
        assert_eq!(ranking.excluded[1].reason, UnscorableReason::MissingScale);
    }

    #[test]
    fn test_single_fund_cohort() {
        let ranking = score_cohort(&[fund("000001", Some(1.0), None, Some(5.0))], &config());
        let only = &ranking.ranked[0];
        assert_eq!(only.rank, 1);
        assert_eq!(only.score.short_term.percentile, Some(1.0));
        assert_eq!(only.score.short_term.score, 20.0);
        // No benchmark: excess return gets the missing-data share
        assert_eq!(only.score.excess_return.percentile, None);
        assert_eq!(only.score.excess_return.score, 5.0);
    }

    #[test]
    fn test_fees_scale_and_stability_directions() {
        let mut cheap_old = fund("000001", Some(1.0), None, Some(5.0));
        cheap_old.fees = FeeBreakdown::new(0.15, 0.05, 0.0, 0.0, 0.0, 0.0, 0.0);
        cheap_old.inception_date = NaiveDate::from_ymd_opt(2010, 1, 1);
        cheap_old.scale_amount = Some(2.6e9);

        let mut pricey_new = fund("000002", Some(1.0), None, Some(5.0));
        pricey_new.fees = FeeBreakdown::new(1.2, 0.2, 0.0, 0.0, 0.0, 0.0, 0.0);
        pricey_new.inception_date = NaiveDate::from_ymd_opt(2020, 1, 1);
        pricey_new.scale_amount = Some(1.0e8);

        let ranking = score_cohort(&[pricey_new, cheap_old], &config());
        let cheap = &ranking.get("000001").unwrap().score;
        let pricey = &ranking.get("000002").unwrap().score;

        assert_eq!(cheap.fees.score, 15.0);
        assert!(pricey.fees.score < cheap.fees.score);
        assert_eq!(cheap.fees.value, Some(0.2));
        assert!(cheap.scale.score > pricey.scale.score);
        assert_eq!(pricey.scale.value, Some(1.0));
        assert!(cheap.stability.score > pricey.stability.score);
        assert_eq!(pricey.stability.value, Some(0.0));
        assert_eq!(cheap.stability.value, Some(10.0));
        assert_eq!(ranking.ranked[0].code, "000001");
    }

    #[test]
    fn test_band_fraction_interpolates_top_band() {
        let bands = config().bands;
        assert_eq!(band_fraction(1.0, &bands), 1.0);
        assert!((band_fraction(0.95, &bands) - 0.95).abs() < 1e-9);
        assert_eq!(band_fraction(0.9, &bands), 0.9);
        assert_eq!(band_fraction(0.8, &bands), 0.75);
        assert_eq!(band_fraction(0.5, &bands), 0.55);
        assert_eq!(band_fraction(0.1, &bands), 0.25);
    }

    #[test]
    fn test_annualize() {
        assert_eq!(annualize(30.0, 5), Some(5.39));
        assert_eq!(annualize(0.0, 3), Some(0.0));
        assert_eq!(annualize(-100.0, 5), None);
        assert!(annualize(-50.0, 5).is_some_and(|r| r < 0.0));
    }

    #[test]
    fn test_reduced_cohort_renormalizes() {
        let full = vec![
            fund("000001", Some(1.0), None, Some(10.0)),
            fund("000002", Some(2.0), None, Some(20.0)),
            fund("000003", Some(3.0), None, Some(30.0)),
        ];
        let reduced = score_cohort(&full[..2], &config());
        assert_eq!(reduced.ranked.len(), 2);
        let top = reduced.get("000002").unwrap();
        assert_eq!(top.score.short_term.percentile, Some(1.0));
        assert_eq!(top.score.short_term.score, 20.0);
    }
}
