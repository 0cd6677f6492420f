//! Exchange format with the external AI ranking step.
//!
//! The engine exports every scorable fund as structured data and reads back an
//! ordered list with a rationale per fund. How that list is produced is not
//! this crate's concern.

use crate::core::fees::FeeBreakdown;
use crate::core::record::NormalizedRecord;
use crate::core::scoring::{CohortRanking, CohortScore};
use crate::core::venue::VenueClass;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleFees {
    pub explicit: f64,
    pub implicit: f64,
    pub total: f64,
    #[serde(flatten)]
    pub breakdown: FeeBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleFund {
    pub code: String,
    pub name: String,
    pub venue_class: VenueClass,
    pub on_exchange: bool,
    /// In units of 100 million.
    pub scale: Option<f64>,
    pub inception_date: Option<NaiveDate>,
    pub fees: OracleFees,
    pub ytd_return: Option<f64>,
    pub three_year_return: Option<f64>,
    pub five_year_return: Option<f64>,
    pub benchmark_name: Option<String>,
    pub benchmark_ytd_return: Option<f64>,
    pub excess_return: Option<f64>,
    pub beats_benchmark: Option<bool>,
    pub engine_rank: usize,
    pub engine_score: CohortScore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleRequest {
    pub cohort: String,
    pub generated_for: NaiveDate,
    pub funds: Vec<OracleFund>,
}

impl OracleRequest {
    /// Builds the request from the ranked funds, in engine rank order.
    /// Excluded records are not sent.
    pub fn new(
        cohort: &str,
        generated_for: NaiveDate,
        records: &[NormalizedRecord],
        ranking: &CohortRanking,
    ) -> Self {
        let funds = ranking
            .ranked
            .iter()
            .filter_map(|ranked| {
                let record = records.iter().find(|r| r.code == ranked.code)?;
                Some(OracleFund {
                    code: record.code.clone(),
                    name: record.display_name.clone(),
                    venue_class: record.venue_class,
                    on_exchange: record.venue_class.is_on_exchange(),
                    scale: record.scale_in_hundred_millions(),
                    inception_date: record.inception_date,
                    fees: OracleFees {
                        explicit: record.fees.explicit(),
                        implicit: record.fees.implicit(),
                        total: record.fees.total_annual_fee(),
                        breakdown: record.fees,
                    },
                    ytd_return: record.performance.ytd_return,
                    three_year_return: record.performance.three_year_return,
                    five_year_return: record.performance.five_year_return,
                    benchmark_name: record.performance.benchmark_name.clone(),
                    benchmark_ytd_return: record.performance.benchmark_ytd_return,
                    excess_return: record.performance.excess_return(),
                    beats_benchmark: record.performance.beats_benchmark(),
                    engine_rank: ranked.rank,
                    engine_score: ranked.score.clone(),
                })
            })
            .collect();

        OracleRequest {
            cohort: cohort.to_string(),
            generated_for,
            funds,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRanking {
    pub rank: usize,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(alias = "reasoning")]
    pub rationale: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum OracleError {
    #[error("malformed ranking: {0}")]
    Malformed(String),
    #[error("ranks must run from 1 to {expected} without gaps, found {found}")]
    RankSequence { expected: usize, found: usize },
    #[error("fund {0} is ranked more than once")]
    DuplicateCode(String),
}

/// Parses a returned ranking (a JSON array, or an object with a `rankings`
/// array) and checks that ranks are `1..=n` with every code appearing once.
pub fn parse_oracle_response(body: &str) -> Result<Vec<OracleRanking>, OracleError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Response {
        List(Vec<OracleRanking>),
        Wrapped { rankings: Vec<OracleRanking> },
    }

    let mut rankings = match serde_json::from_str::<Response>(body)
        .map_err(|e| OracleError::Malformed(e.to_string()))?
    {
        Response::List(list) => list,
        Response::Wrapped { rankings } => rankings,
    };
    rankings.sort_by_key(|r| r.rank);

    let mut seen = HashSet::new();
    for (i, ranking) in rankings.iter().enumerate() {
        if ranking.rank != i + 1 {
            return Err(OracleError::RankSequence {
                expected: rankings.len(),
                found: ranking.rank,
            });
        }
        if !seen.insert(ranking.code.as_str()) {
            return Err(OracleError::DuplicateCode(ranking.code.clone()));
        }
    }
    Ok(rankings)
}
