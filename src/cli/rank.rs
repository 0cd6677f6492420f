use super::ui;
use crate::core::batch::{BatchOutcome, FetchEngine};
use crate::core::config::AppConfig;
use crate::core::listing::{FundListing, load_listing};
use crate::core::oracle::{OracleRanking, OracleRequest, parse_oracle_response};
use crate::core::provider::FundDataProvider;
use crate::core::scoring::{CohortRanking, Dimension, DimensionScore, score_cohort};
use crate::core::venue::VenueClass;
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Options of the `rank` command.
#[derive(Debug, Clone, Default)]
pub struct RankArgs {
    pub codes: Vec<String>,
    pub listing: Option<PathBuf>,
    pub cohort: String,
    pub top: Option<usize>,
    /// Stop starting new funds after this long.
    pub deadline: Option<Duration>,
    pub export: Option<PathBuf>,
    pub oracle_response: Option<PathBuf>,
}

pub struct RankReport {
    pub outcome: BatchOutcome,
    pub ranking: CohortRanking,
    pub oracle: Option<Vec<OracleRanking>>,
}

impl RankArgs {
    /// Codes from the command line followed by the listing file, if any.
    pub fn listings(&self) -> Result<Vec<FundListing>> {
        let mut listings: Vec<FundListing> =
            self.codes.iter().map(|c| FundListing::new(c)).collect();
        if let Some(path) = &self.listing {
            listings.extend(load_listing(path)?);
        }
        if listings.is_empty() {
            bail!("No fund codes given. Pass codes as arguments or use --listing");
        }
        Ok(listings)
    }
}

/// Fetches every fund, scores the cohort and handles the AI exchange files.
pub async fn rank(
    args: &RankArgs,
    config: &AppConfig,
    provider: &(dyn FundDataProvider + Send + Sync),
) -> Result<RankReport> {
    let listings = args.listings()?;
    info!(cohort = %args.cohort, funds = listings.len(), "Ranking cohort");

    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone(), args.deadline));

    let pb = ui::new_progress_bar(listings.len() as u64);
    pb.set_message("Fetching funds");
    let engine = FetchEngine::new(provider, &config.fetch, &config.fee_defaults);
    let outcome = engine
        .fetch_all(listings, &cancel, &|| pb.inc(1))
        .await;
    pb.finish_and_clear();
    // Fetching is over; later interrupts end the process.
    cancel.cancel();

    let ranking = score_cohort(&outcome.records, &config.scoring);

    if let Some(path) = &args.export {
        let request = OracleRequest::new(
            &args.cohort,
            chrono::Local::now().date_naive(),
            &outcome.records,
            &ranking,
        );
        fs::write(path, request.to_json()?)
            .with_context(|| format!("Failed to write export file: {}", path.display()))?;
        info!("Exported {} funds to {}", request.funds.len(), path.display());
    }

    let oracle = match &args.oracle_response {
        Some(path) => {
            let body = fs::read_to_string(path)
                .with_context(|| format!("Failed to read ranking file: {}", path.display()))?;
            let rankings = parse_oracle_response(&body)
                .with_context(|| format!("Invalid ranking file: {}", path.display()))?;
            for unknown in rankings.iter().filter(|r| ranking.get(&r.code).is_none()) {
                warn!(code = %unknown.code, "Ranked fund is not in the scored cohort");
            }
            Some(rankings)
        }
        None => None,
    };

    Ok(RankReport {
        outcome,
        ranking,
        oracle,
    })
}

/// The first Ctrl-C or the deadline cancels the fetch. Listening for Ctrl-C
/// replaces the default SIGINT handling, so the watcher stays alive after that
/// and exits the process on the next Ctrl-C.
async fn watch_interrupts(cancel: CancellationToken, deadline: Option<Duration>) {
    let deadline = async {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, finishing funds already in flight");
            cancel.cancel();
        }
        _ = deadline => {
            warn!("Deadline reached, finishing funds already in flight");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }

    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupted, exiting");
        std::process::exit(130);
    }
}

fn literal(dimension: Dimension, score: &DimensionScore) -> Option<String> {
    let value = score.value?;
    Some(match dimension {
        Dimension::Fees | Dimension::ShortTerm | Dimension::ExcessReturn => format!("{value:.2}%"),
        Dimension::LongTerm => format!("{value:.2}%/yr"),
        Dimension::Scale => format!("{value:.2}亿"),
        Dimension::Stability => format!("+{value:.1}y"),
    })
}

pub fn render_ranking(cohort: &str, ranking: &CohortRanking, top: Option<usize>) -> String {
    let mut table = ui::new_styled_table();
    let mut header = vec![
        ui::header_cell("#"),
        ui::header_cell("Code"),
        ui::header_cell("Name"),
        ui::header_cell("Venue"),
    ];
    for dimension in Dimension::ALL {
        header.push(ui::header_cell(dimension.label()));
    }
    header.push(ui::header_cell("Total"));
    table.set_header(header);

    let shown = top.unwrap_or(ranking.ranked.len());
    for fund in ranking.ranked.iter().take(shown) {
        let mut row = vec![
            Cell::new(fund.rank),
            Cell::new(&fund.code),
            Cell::new(&fund.name),
            Cell::new(VenueClass::from_code(&fund.code)),
        ];
        for dimension in Dimension::ALL {
            let score = fund.score.dimension(dimension);
            row.push(ui::score_cell(score.score, score.max, literal(dimension, score)));
        }
        row.push(ui::total_cell(fund.score.total));
        table.add_row(row);
    }

    let mut output = format!("Cohort: {}\n\n", ui::style_text(cohort, ui::StyleType::Title));
    output.push_str(&table.to_string());
    if shown < ranking.ranked.len() {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!("{} more not shown", ranking.ranked.len() - shown),
                ui::StyleType::Subtle
            )
        ));
    }
    output
}

/// Exclusions, failures and degraded records. Empty when there are none.
pub fn render_manifest(outcome: &BatchOutcome, ranking: &CohortRanking) -> String {
    let mut output = String::new();

    if !ranking.excluded.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Code"),
            ui::header_cell("Name"),
            ui::header_cell("Not ranked because"),
        ]);
        for exclusion in &ranking.excluded {
            table.add_row(vec![
                Cell::new(&exclusion.code),
                Cell::new(&exclusion.name),
                Cell::new(exclusion.reason.to_string()),
            ]);
        }
        output.push_str(&format!(
            "\n{}\n{table}",
            ui::style_text("Excluded", ui::StyleType::Warning)
        ));
    }

    if !outcome.failures.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Code"), ui::header_cell("Failure")]);
        for (code, reason) in &outcome.failures {
            table.add_row(vec![Cell::new(code), Cell::new(reason.to_string())]);
        }
        output.push_str(&format!(
            "\n{}\n{table}",
            ui::style_text("Failed", ui::StyleType::Error)
        ));
    }

    for record in outcome.records.iter().filter(|r| r.is_degraded()) {
        let endpoints: Vec<String> = record.degraded.iter().map(|f| f.to_string()).collect();
        output.push_str(&format!(
            "\n{} {}: {}",
            ui::style_text("Partial data", ui::StyleType::Subtle),
            record.code,
            endpoints.join("; ")
        ));
    }
    output
}

pub fn render_oracle(rankings: &[OracleRanking], ranking: &CohortRanking) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Code"),
        ui::header_cell("Name"),
        ui::header_cell("Score"),
        ui::header_cell("Engine #"),
        ui::header_cell("Rationale"),
    ]);
    for entry in rankings {
        table.add_row(vec![
            Cell::new(entry.rank),
            Cell::new(&entry.code),
            Cell::new(&entry.name),
            ui::format_optional_cell(entry.score, |s| format!("{s:.1}")),
            ui::format_optional_cell(ranking.get(&entry.code).map(|f| f.rank), |r| r.to_string()),
            Cell::new(&entry.rationale),
        ]);
    }
    format!(
        "{}\n\n{table}",
        ui::style_text("AI ranking", ui::StyleType::Title)
    )
}

pub fn display_report(args: &RankArgs, report: &RankReport) {
    let outcome = &report.outcome;
    debug!(total = outcome.total(), "Rendering report");

    println!("{}", render_ranking(&args.cohort, &report.ranking, args.top));
    let manifest = render_manifest(outcome, &report.ranking);
    if !manifest.is_empty() {
        println!("{manifest}");
    }
    if let Some(rankings) = &report.oracle {
        ui::print_separator();
        println!("{}", render_oracle(rankings, &report.ranking));
    }

    println!(
        "\n{} {} of {} funds ranked, {} excluded, {} failed",
        ui::style_text("Summary:", ui::StyleType::TotalLabel),
        ui::style_text(
            &report.ranking.ranked.len().to_string(),
            ui::StyleType::TotalValue
        ),
        outcome.total(),
        report.ranking.excluded.len(),
        outcome.failures.len(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScoringConfig;
    use crate::core::error::{Endpoint, EndpointFailure, FailureReason, FetchError};
    use crate::core::fees::FeeBreakdown;
    use crate::core::record::{NormalizedRecord, PerformanceMetrics};
    use std::collections::BTreeMap;

    fn record(code: &str, ytd: Option<f64>) -> NormalizedRecord {
        NormalizedRecord {
            code: code.to_string(),
            display_name: format!("Fund {code}"),
            venue_class: VenueClass::from_code(code),
            scale_amount: Some(1.0e9),
            inception_date: None,
            fees: FeeBreakdown::new(0.5, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0),
            performance: PerformanceMetrics::new(ytd, None, None, None, None),
            degraded: Vec::new(),
        }
    }

    #[test]
    fn test_listings_need_at_least_one_code() {
        let args = RankArgs::default();
        assert!(args.listings().unwrap_err().to_string().contains("No fund codes"));

        let args = RankArgs {
            codes: vec!["515890".to_string(), " 159136 ".to_string()],
            ..RankArgs::default()
        };
        let listings = args.listings().unwrap();
        assert_eq!(listings[1].code, "159136");
    }

    #[test]
    fn test_render_ranking_respects_top() {
        let records = vec![record("000001", Some(1.0)), record("000002", Some(2.0))];
        let ranking = score_cohort(&records, &ScoringConfig::default());

        let output = render_ranking("dividend", &ranking, Some(1));
        assert!(output.contains("000002"));
        assert!(!output.contains("000001"));
        assert!(output.contains("1 more not shown"));
    }

    #[test]
    fn test_render_manifest_lists_exclusions_and_failures() {
        let mut degraded = record("000003", Some(1.0));
        degraded.degraded.push(EndpointFailure {
            endpoint: Endpoint::Fees,
            error: FetchError::Http { status: 404 },
            attempts: 1,
        });
        let outcome = BatchOutcome {
            records: vec![record("000001", None), degraded],
            failures: BTreeMap::from([("000002".to_string(), FailureReason::Cancelled)]),
        };
        let ranking = score_cohort(&outcome.records, &ScoringConfig::default());

        let output = render_manifest(&outcome, &ranking);
        assert!(output.contains("Excluded"));
        assert!(output.contains("000001"));
        assert!(output.contains("Failed"));
        assert!(output.contains("000002"));
        assert!(output.contains("fees failed after 1 attempt(s): HTTP status 404"));
    }

    #[tokio::test]
    async fn test_deadline_cancels_and_watcher_keeps_listening() {
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch_interrupts(
            cancel.clone(),
            Some(Duration::from_millis(10)),
        ));

        tokio::time::timeout(Duration::from_secs(2), cancel.cancelled())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Still waiting for a Ctrl-C after the fetch was cancelled
        assert!(!watcher.is_finished());
        watcher.abort();
    }

    #[tokio::test]
    async fn test_watcher_outlives_a_finished_fetch() {
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch_interrupts(cancel.clone(), None));

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!watcher.is_finished());
        watcher.abort();
    }

    #[test]
    fn test_render_manifest_empty_when_clean() {
        let outcome = BatchOutcome {
            records: vec![record("000001", Some(1.0))],
            failures: BTreeMap::new(),
        };
        let ranking = score_cohort(&outcome.records, &ScoringConfig::default());
        assert!(render_manifest(&outcome, &ranking).is_empty());
    }
}
