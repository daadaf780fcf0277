use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::database::Database;
use crate::export;
use crate::orchestrator::{RunSummary, ScrapeOrchestrator, TokioSleeper};
use crate::reconciler::Reconciler;
use crate::sites::SiteRegistry;
use crate::transport::{BrowserTransport, HttpTransport};

pub struct PriceTracker {
    config: Config,
    registry: SiteRegistry,
    orchestrator: ScrapeOrchestrator,
    database: Option<Database>,
}

impl PriceTracker {
    pub async fn new(config: Config) -> Result<Self> {
        let registry = SiteRegistry::with_defaults(config.render_wait_timeout)?;
        let adapters = registry.resolve(&config.competitors)?;

        let http = Arc::new(HttpTransport::new()?);
        let mut orchestrator =
            ScrapeOrchestrator::new(adapters, http, Arc::new(TokioSleeper), config.pacing());

        if orchestrator.needs_renderer() {
            if config.browser_enabled {
                match BrowserTransport::launch(config.browser_headless).await {
                    Ok(browser) => {
                        info!("Headless browser ready");
                        orchestrator = orchestrator.with_browser(Arc::new(browser));
                    }
                    Err(e) => error!("Could not start browser: {:#}", e),
                }
            } else {
                warn!("Browser disabled; rendered competitors cannot be scraped");
            }
        }

        let database = match &config.database_url {
            Some(url) => Some(Database::new(url).await?),
            None => None,
        };

        Ok(Self {
            config,
            registry,
            orchestrator,
            database,
        })
    }

    /// Scrape every competitor for every input product, then export.
    ///
    /// Whatever was reconciled is exported even when the run is aborted.
    pub async fn run(&self) -> Result<RunSummary> {
        let rows = export::read_input(&self.config.input_csv, &self.registry)?;

        let mut reconciler = Reconciler::new(self.orchestrator.competitors());
        for row in &rows {
            reconciler.seed(&row.sku, row.my_price);
        }

        info!(
            "Processing {} products across {} competitors",
            rows.len(),
            reconciler.competitors().len()
        );

        let result = self.orchestrator.run(&rows, &mut reconciler).await;
        if let Err(e) = &result {
            error!("Scraping aborted: {}", e);
        }

        self.export(&reconciler).await?;

        let summary = result?;
        info!(
            "Done: {} products, {} prices found, {} unresolved",
            reconciler.len(),
            summary.found,
            summary.not_found + summary.no_link
        );
        Ok(summary)
    }

    async fn export(&self, reconciler: &Reconciler) -> Result<()> {
        if reconciler.is_empty() {
            info!("No products to export");
            return Ok(());
        }

        let rows = reconciler.rows();
        export::write_wide_csv(&self.config.output_csv, reconciler)?;
        export::write_comparison_csv(&self.config.comparison_csv, &rows)?;

        if let Some(database) = &self.database {
            let saved = database.save_rows(&rows).await?;
            info!("Saved {} rows to the database", saved);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::error::ConfigError;

    fn config(dir: &Path, vars: &[(&str, &str)]) -> Config {
        let mut env: HashMap<String, String> = HashMap::from([
            ("PRICE_INPUT_CSV".to_string(), dir.join("links.csv").display().to_string()),
            ("PRICE_OUTPUT_CSV".to_string(), dir.join("unified.csv").display().to_string()),
            (
                "PRICE_COMPARISON_CSV".to_string(),
                dir.join("comparison.csv").display().to_string(),
            ),
            ("DATABASE_URL".to_string(), String::new()),
            ("COMPETITOR_DELAY_SECS".to_string(), "0".to_string()),
            ("REQUEST_DELAY_SECS".to_string(), "0".to_string()),
        ]);
        for (key, value) in vars {
            env.insert((*key).to_string(), (*value).to_string());
        }
        Config::from_lookup(|key| env.get(key).cloned()).unwrap()
    }

    fn write_input(dir: &Path) {
        std::fs::write(
            dir.join("links.csv"),
            "SKU,Price,Cartpk,Diamond,Metro\nABC123,100,https://www.cartpk.com/p/1,,\nXYZ789,250,,,\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_run_without_links_exports_sentinels_and_database() {
        let dir = TempDir::new().unwrap();
        write_input(dir.path());
        let db_url = format!("sqlite:{}", dir.path().join("db/prices.db").display());
        let config = config(
            dir.path(),
            &[("COMPETITORS", "Diamond,Naheed"), ("DATABASE_URL", &db_url)],
        );

        let tracker = PriceTracker::new(config).await.unwrap();
        let summary = tracker.run().await.unwrap();

        assert_eq!(summary.tasks, 4);
        assert_eq!(summary.no_link, 4);
        assert!(dir.path().join("db/prices.db").exists());

        let comparison = std::fs::read_to_string(dir.path().join("comparison.csv")).unwrap();
        let lines: Vec<&str> = comparison.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "ABC123,100.00,Diamond,None,,");
        assert_eq!(lines[3], "ABC123,100.00,Naheed,None,,");

        let unified = std::fs::read_to_string(dir.path().join("unified.csv")).unwrap();
        assert!(unified.starts_with("SKU,my_price,Diamond_price,Diamond_link,Naheed_price,Naheed_link"));
    }

    #[tokio::test]
    async fn test_missing_renderer_still_exports_partial_results() {
        let dir = TempDir::new().unwrap();
        write_input(dir.path());
        let config = config(
            dir.path(),
            &[("COMPETITORS", "Diamond,Metro"), ("BROWSER_ENABLED", "false")],
        );

        let tracker = PriceTracker::new(config).await.unwrap();
        let err = tracker.run().await.unwrap_err();

        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingRenderer("Metro".to_string()))
        );

        let unified = std::fs::read_to_string(dir.path().join("unified.csv")).unwrap();
        let lines: Vec<&str> = unified.lines().collect();
        assert_eq!(lines[0], "SKU,my_price,Diamond_price,Diamond_link,Metro_price,Metro_link");
        assert_eq!(lines[1], "ABC123,100.00,None,,,");
    }

    #[tokio::test]
    async fn test_unknown_competitor_fails_start_up() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), &[("COMPETITORS", "Diamond,Imtiaz")]);

        let err = PriceTracker::new(config).await.err().unwrap();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::UnknownCompetitor("Imtiaz".to_string()))
        );
    }
}
