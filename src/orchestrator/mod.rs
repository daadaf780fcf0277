//! Sequential scrape orchestration: competitor-major passes with politeness delays and retries

mod retry;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

pub use retry::{RetryPolicy, Sleeper, TaskState, TokioSleeper};

use crate::error::{ConfigError, FetchError};
use crate::extractor::PriceExtractor;
use crate::models::{ExtractionOutcome, InputRow, PriceStatus};
use crate::reconciler::Reconciler;
use crate::traits::SiteAdapter;
use crate::transport::{FetchRequest, PageSnapshot, Transport};

/// Timing knobs for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Between consecutive requests within one competitor's pass
    pub request_delay: Duration,
    /// Between two competitor passes
    pub competitor_delay: Duration,
    /// Per fetch attempt
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub tasks: usize,
    pub found: usize,
    pub not_found: usize,
    pub no_link: usize,
    pub transport_failures: usize,
    pub retries: u32,
}

impl RunSummary {
    fn tally(&mut self, outcome: &ExtractionOutcome) {
        self.tasks += 1;
        match outcome.status {
            PriceStatus::Found => self.found += 1,
            PriceStatus::NotFound => self.not_found += 1,
            PriceStatus::NoLink => self.no_link += 1,
        }
    }
}

/// Result of driving one fetch through the retry state machine
struct FetchReport {
    state: TaskState,
    retries: u32,
}

/// Sequences (competitor × SKU) tasks and feeds their outcomes to the reconciler
pub struct ScrapeOrchestrator {
    adapters: Vec<Arc<dyn SiteAdapter>>,
    http: Arc<dyn Transport>,
    browser: Option<Arc<dyn Transport>>,
    sleeper: Arc<dyn Sleeper>,
    extractor: PriceExtractor,
    pacing: Pacing,
}

impl ScrapeOrchestrator {
    /// `adapters` fixes the competitor pass order
    pub fn new(
        adapters: Vec<Arc<dyn SiteAdapter>>,
        http: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        pacing: Pacing,
    ) -> Self {
        Self {
            adapters,
            http,
            browser: None,
            sleeper,
            extractor: PriceExtractor::default(),
            pacing,
        }
    }

    /// Attach the transport used for client-side rendered sites
    #[must_use]
    pub fn with_browser(mut self, browser: Arc<dyn Transport>) -> Self {
        self.browser = Some(browser);
        self
    }

    pub fn needs_renderer(&self) -> bool {
        self.adapters.iter().any(|adapter| adapter.requires_render())
    }

    /// Competitor names in pass order
    pub fn competitors(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|adapter| adapter.name().to_string())
            .collect()
    }

    /// Run every competitor's pass over `rows`.
    ///
    /// Each task's outcome is reconciled as soon as it completes, so an error
    /// returned here leaves every earlier task already in `reconciler`.
    pub async fn run(
        &self,
        rows: &[InputRow],
        reconciler: &mut Reconciler,
    ) -> Result<RunSummary, ConfigError> {
        let mut summary = RunSummary::default();

        for (index, adapter) in self.adapters.iter().enumerate() {
            if index > 0 {
                info!(
                    "Waiting {:?} before processing {}",
                    self.pacing.competitor_delay,
                    adapter.name()
                );
                self.sleeper.sleep(self.pacing.competitor_delay).await;
            }

            self.run_pass(adapter.as_ref(), rows, reconciler, &mut summary)
                .await?;
        }

        info!(
            "Completed {} tasks: {} found, {} not found, {} without link, {} transport failures, {} retries",
            summary.tasks,
            summary.found,
            summary.not_found,
            summary.no_link,
            summary.transport_failures,
            summary.retries
        );

        Ok(summary)
    }

    async fn run_pass(
        &self,
        adapter: &dyn SiteAdapter,
        rows: &[InputRow],
        reconciler: &mut Reconciler,
        summary: &mut RunSummary,
    ) -> Result<(), ConfigError> {
        let transport = self.transport_for(adapter)?;
        info!("Processing competitor: {} ({} products)", adapter.name(), rows.len());

        let mut requests = 0_usize;
        for row in rows {
            let link = row
                .links
                .get(adapter.name())
                .map_or("", |link| link.trim());

            let outcome = if link.is_empty() {
                info!("{} - {}: no link provided", adapter.name(), row.sku);
                ExtractionOutcome {
                    competitor: adapter.name().to_string(),
                    sku: row.sku.clone(),
                    source_link: String::new(),
                    price: None,
                    strategy_used: None,
                    status: PriceStatus::NoLink,
                }
            } else {
                if requests > 0 {
                    self.sleeper.sleep(self.pacing.request_delay).await;
                }
                requests += 1;
                self.run_task(adapter, transport, &row.sku, link, summary)
                    .await
            };

            summary.tally(&outcome);
            reconciler.record(outcome, row.my_price);
        }

        info!("Completed processing all products for {}", adapter.name());
        Ok(())
    }

    fn transport_for(&self, adapter: &dyn SiteAdapter) -> Result<&dyn Transport, ConfigError> {
        if adapter.requires_render() {
            self.browser
                .as_deref()
                .ok_or_else(|| ConfigError::MissingRenderer(adapter.name().to_string()))
        } else {
            Ok(self.http.as_ref())
        }
    }

    /// Fetch and extract one product page. Never fails: every error becomes an unresolved outcome.
    async fn run_task(
        &self,
        adapter: &dyn SiteAdapter,
        transport: &dyn Transport,
        sku: &str,
        link: &str,
        summary: &mut RunSummary,
    ) -> ExtractionOutcome {
        info!("Processing SKU {} for {}: {}", sku, adapter.name(), link);

        let request = FetchRequest {
            url: link,
            render: adapter.render(),
            timeout: self.pacing.request_timeout,
        };

        let report = self.fetch_with_retry(transport, &request).await;
        summary.retries += report.retries;

        let mut outcome = ExtractionOutcome {
            competitor: adapter.name().to_string(),
            sku: sku.to_string(),
            source_link: link.to_string(),
            price: None,
            strategy_used: None,
            status: PriceStatus::NotFound,
        };

        match report.state {
            TaskState::Fetched(snapshot) => {
                if snapshot.wait_timed_out {
                    debug!("{} - {}: primary element missing, using fallbacks", adapter.name(), sku);
                }

                match self.extractor.extract(&snapshot.html, adapter.config()) {
                    Some(extraction) => {
                        info!(
                            "{} - {}: {} (via {})",
                            adapter.name(),
                            sku,
                            extraction.price,
                            extraction.strategy.as_str()
                        );
                        outcome.price = Some(extraction.price);
                        outcome.strategy_used = Some(extraction.strategy);
                        outcome.status = PriceStatus::Found;
                    }
                    None => warn!("{} - {}: no price found on {}", adapter.name(), sku, link),
                }
            }
            TaskState::Failed(FetchError::NotFound(code)) => {
                summary.transport_failures += 1;
                warn!("{} - {}: HTTP {} for {}, skipping", adapter.name(), sku, code, link);
            }
            TaskState::Failed(err) => {
                summary.transport_failures += 1;
                error!("{} - {}: {}", adapter.name(), sku, err);
            }
            state => error!("{} - {}: fetch ended in non-terminal state {:?}", adapter.name(), sku, state),
        }

        outcome
    }

    async fn fetch_with_retry(
        &self,
        transport: &dyn Transport,
        request: &FetchRequest<'_>,
    ) -> FetchReport {
        let mut state = TaskState::Pending;
        let mut retries = 0;

        while !state.is_terminal() {
            state = match state {
                TaskState::Pending => TaskState::Fetching { attempt: 1 },
                TaskState::Fetching { attempt } => match transport.fetch(request).await {
                    Ok(snapshot) => TaskState::Fetched(snapshot),
                    Err(err) => {
                        warn!(
                            "Attempt {}/{} for {} failed: {}",
                            attempt, self.pacing.retry.max_attempts, request.url, err
                        );
                        self.pacing.retry.after_failure(attempt, err)
                    }
                },
                TaskState::Retrying { attempt, delay } => {
                    info!("Waiting {:?} before retrying {}", delay, request.url);
                    self.sleeper.sleep(delay).await;
                    retries += 1;
                    TaskState::Fetching {
                        attempt: attempt + 1,
                    }
                }
                terminal => terminal,
            };
        }

        FetchReport { state, retries }
    }
}
