//! Concurrent batch fetch of fund records.
//!
//! A fixed pool of workers drains a shared queue of codes. Each worker paces
//! itself, fetches the three endpoints of a fund concurrently with retry, and
//! sends the normalized outcome to a single collector. One fund's failure never
//! stops the others.

use crate::core::config::{FeeDefaults, FetchConfig};
use crate::core::error::{Endpoint, EndpointFailure, FailureReason, FetchError};
use crate::core::listing::{FundListing, dedup_listings};
use crate::core::normalize::{EndpointResults, normalize};
use crate::core::provider::FundDataProvider;
use crate::core::record::NormalizedRecord;
use crate::core::retry::{RetryFailure, RetryPolicy, with_backoff};
use futures::future::join_all;
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type FundOutcome = (String, Result<NormalizedRecord, FailureReason>);

/// Result of a batch: every distinct input code is either in `records` or in
/// `failures`, exactly once.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<NormalizedRecord>,
    pub failures: BTreeMap<String, FailureReason>,
}

impl BatchOutcome {
    pub fn degraded_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_degraded()).count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.failures
            .values()
            .filter(|reason| matches!(reason, FailureReason::Cancelled))
            .count()
    }

    pub fn total(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}

pub struct FetchEngine<'a> {
    provider: &'a (dyn FundDataProvider + Send + Sync),
    config: FetchConfig,
    retry: RetryPolicy,
    fee_defaults: FeeDefaults,
}

impl<'a> FetchEngine<'a> {
    pub fn new(
        provider: &'a (dyn FundDataProvider + Send + Sync),
        config: &FetchConfig,
        fee_defaults: &FeeDefaults,
    ) -> Self {
        FetchEngine {
            provider,
            retry: config.retry_policy(),
            config: config.clone(),
            fee_defaults: fee_defaults.clone(),
        }
    }

    /// Fetches and normalizes every listing. Cancelling `cancel` stops workers
    /// from starting new funds; funds never started are reported as
    /// [`FailureReason::Cancelled`]. `on_progress` runs once per finished fund.
    pub async fn fetch_all(
        &self,
        listings: Vec<FundListing>,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn() + Sync),
    ) -> BatchOutcome {
        let queue = Mutex::new(VecDeque::from(dedup_listings(listings)));
        let total = queue.lock().await.len();
        let worker_count = self.config.max_concurrency.clamp(1, total.max(1));
        debug!(total, worker_count, "Starting batch fetch");

        let (tx, mut rx) = mpsc::unbounded_channel::<FundOutcome>();
        let workers = (0..worker_count)
            .map(|id| self.worker(id, &queue, tx.clone(), cancel, on_progress))
            .collect::<Vec<_>>();
        drop(tx);

        let collector = async {
            let mut outcome = BatchOutcome::default();
            while let Some((code, result)) = rx.recv().await {
                match result {
                    Ok(record) => outcome.records.push(record),
                    Err(reason) => {
                        debug!(code = %code, reason = %reason, "Fund failed");
                        outcome.failures.insert(code, reason);
                    }
                }
            }
            outcome
        };

        let (_, mut outcome) = tokio::join!(join_all(workers), collector);

        for listing in queue.into_inner() {
            outcome
                .failures
                .insert(listing.code, FailureReason::Cancelled);
        }

        info!(
            total,
            succeeded = outcome.records.len(),
            degraded = outcome.degraded_count(),
            failed = outcome.failures.len(),
            cancelled = outcome.cancelled_count(),
            "Batch fetch complete"
        );
        outcome
    }

    async fn worker(
        &self,
        id: usize,
        queue: &Mutex<VecDeque<FundListing>>,
        tx: mpsc::UnboundedSender<FundOutcome>,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn() + Sync),
    ) {
        let mut last_request: Option<Instant> = None;
        loop {
            if cancel.is_cancelled() {
                debug!(worker = id, "Worker stopping on cancellation");
                break;
            }
            let Some(listing) = queue.lock().await.pop_front() else {
                break;
            };
            if let Some(last) = last_request {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        queue.lock().await.push_front(listing);
                        break;
                    }
                    _ = tokio::time::sleep_until(last + self.config.min_interval()) => {}
                }
            }
            last_request = Some(Instant::now());
            debug!(worker = id, code = %listing.code, "Fetching fund");

            let result = self.fetch_one(&listing).await;
            on_progress();
            if tx.send((listing.code, result)).is_err() {
                break;
            }
        }
    }

    async fn fetch_one(&self, listing: &FundListing) -> Result<NormalizedRecord, FailureReason> {
        let code = listing.code.as_str();
        let (identity, performance, fees) = tokio::join!(
            self.fetch_endpoint(Endpoint::CommonData, code, || {
                self.provider.fetch_identity(code)
            }),
            self.fetch_endpoint(Endpoint::Performance, code, || {
                self.provider.fetch_performance(code)
            }),
            self.fetch_endpoint(Endpoint::Fees, code, || self.provider.fetch_fees(code)),
        );
        normalize(
            listing,
            EndpointResults {
                identity,
                performance,
                fees,
            },
            &self.fee_defaults,
        )
    }

    async fn fetch_endpoint<T, F, Fut>(
        &self,
        endpoint: Endpoint,
        code: &str,
        operation: F,
    ) -> Result<T, EndpointFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        with_backoff(&self.retry, operation)
            .await
            .map_err(|RetryFailure { error, attempts }| {
                debug!(code, %endpoint, %error, attempts, "Endpoint failed");
                EndpointFailure {
                    endpoint,
                    error,
                    attempts,
                }
            })
    }
}
