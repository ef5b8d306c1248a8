//! Daily batch orchestrator: scrape steps → day store → analysis report.
//!
//! ## Run modes
//!
//! `run()` — the whole trading-day batch (cron use):
//!   1. KRX snapshot download → krx_snapshot_{date}.csv
//!   2. Theme index scrape    → theme_list_{date}.csv
//!   3. Theme member scrape   → theme_members_{date}.csv
//!   4. Market-cap scrape     → market_cap_{date}.csv
//!   5. Classify + pivot + summarize → analysis/theme_summary CSVs
//!
//! Each step is also callable on its own (the CLI exposes one subcommand per
//! step), reading its inputs from the day store rather than re-scraping.
//!
//! Requests run strictly sequentially; the HttpClient sleeps its configured
//! delay (+ jitter) before every request as a courtesy to the source sites.

use crate::analysis::{classify_all, pivot};
use crate::config::AppConfig;
use crate::report;
use crate::scraper::{GoogleNewsClient, KrxDownloader, NaverScraper, SnapshotSource};
use crate::storage::DayStore;
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

pub struct Pipeline {
    config: AppConfig,
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub securities: usize,
    pub themes: usize,
    pub membership_edges: usize,
    pub market_cap_rows: usize,
    pub selected: usize,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// The full daily batch, in order. Any failing step aborts the run; the
    /// analyze step never leaves partial output behind.
    pub async fn run(&self, store: &DayStore) -> Result<PipelineStats> {
        let mut stats = PipelineStats::default();

        info!("=== Step 1: KRX snapshot ({}) ===", store.date());
        stats.securities = self.snapshot_step(store).await?;

        info!("=== Step 2: Theme index ===");
        stats.themes = self.theme_step(store).await?;

        info!("=== Step 3: Theme members ===");
        stats.membership_edges = self.members_step(store).await?;

        info!("=== Step 4: Market-cap listing ===");
        stats.market_cap_rows = self.market_cap_step(store).await?;

        info!("=== Step 5: Analysis ===");
        stats.selected = self.analyze_step(store)?;

        info!(
            "=== Done: {} securities | {} themes | {} edges | {} selected ===",
            stats.securities, stats.themes, stats.membership_edges, stats.selected
        );
        Ok(stats)
    }

    /// Step 1: download and store the day's full-market price list.
    pub async fn snapshot_step(&self, store: &DayStore) -> Result<usize> {
        let downloader =
            KrxDownloader::new(&self.config.scraper).context("Failed to build KRX downloader")?;
        let source: &dyn SnapshotSource = &downloader;

        let records = source
            .fetch_snapshot(store.date())
            .await
            .context("KRX snapshot fetch failed")?;
        if records.is_empty() {
            warn!("KRX snapshot for {} is empty", store.date());
        }
        store.write_snapshot(&records)?;
        Ok(records.len())
    }

    /// Step 2: scrape and store the theme index.
    pub async fn theme_step(&self, store: &DayStore) -> Result<usize> {
        let scraper =
            NaverScraper::new(&self.config.scraper).context("Failed to build Naver scraper")?;
        let themes = scraper.fetch_theme_list().await?;
        store.write_theme_list(&themes)?;
        Ok(themes.len())
    }

    /// Step 3: scrape each stored theme's member table.
    pub async fn members_step(&self, store: &DayStore) -> Result<usize> {
        let themes = store
            .read_theme_list()
            .context("Theme index must be scraped before members")?;
        let scraper =
            NaverScraper::new(&self.config.scraper).context("Failed to build Naver scraper")?;
        let members = scraper.fetch_theme_members(&themes).await?;
        store.write_theme_members(&members)?;
        Ok(members.len())
    }

    /// Step 4: scrape and store the market-cap listing.
    pub async fn market_cap_step(&self, store: &DayStore) -> Result<usize> {
        let scraper =
            NaverScraper::new(&self.config.scraper).context("Failed to build Naver scraper")?;
        let rows = scraper.fetch_market_cap().await?;
        store.write_market_cap(&rows)?;
        Ok(rows.len())
    }

    /// Step 5: the pure core over the stored tables. Classification, pivot
    /// and summary are computed entirely in memory before anything is
    /// written. Returns the number of selected securities.
    pub fn analyze_step(&self, store: &DayStore) -> Result<usize> {
        let snapshot = store.read_snapshot()?;
        let members = store.read_theme_members()?;

        let classified = classify_all(&snapshot, &self.config.selection);
        info!(
            "Selection: {} of {} securities (change% ≥ {}, or turnover ≥ {} KRW and range% ≥ {})",
            classified.len(),
            snapshot.len(),
            self.config.selection.min_change_pct,
            crate::utils::fmt_number(self.config.selection.min_turnover as i64),
            self.config.selection.min_range_pct,
        );

        let rows = pivot(&classified, &members);
        report::write_analysis(store, &rows)?;
        Ok(rows.len())
    }

    /// Fetch headlines for every security in the day's analysis table.
    pub async fn news_step(&self, store: &DayStore) -> Result<usize> {
        let index = report::read_analysis_index(store)
            .context("Analysis report must exist before fetching news")?;
        let client =
            GoogleNewsClient::new(&self.config.scraper).context("Failed to build news client")?;

        let mut items = Vec::new();
        for (i, (code, name)) in index.iter().enumerate() {
            info!("[{}/{}] news for {}", i + 1, index.len(), name);
            match client.fetch_for(code, name).await {
                Ok(found) => items.extend(found),
                Err(e) => warn!("{}: {:#}", name, e),
            }
        }

        store.write_news(&items)?;
        Ok(items.len())
    }

    /// Emit chart image links for the day's selected securities.
    pub fn chart_links_step(&self, store: &DayStore) -> Result<usize> {
        let index = report::read_analysis_index(store)
            .context("Analysis report must exist before building chart links")?;
        let links = report::build_chart_links(&index, Utc::now().timestamp_millis());
        store.write_chart_links(&links)?;
        Ok(links.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SecurityRecord, ThemeMembership};
    use crate::storage::StoreError;

    fn pipeline(data_dir: &std::path::Path) -> Pipeline {
        let mut config = AppConfig::default();
        config.storage.data_dir = data_dir.to_path_buf();
        Pipeline::new(config)
    }

    fn sec(code: &str, change_pct: f64, turnover: f64) -> SecurityRecord {
        SecurityRecord {
            code: code.to_string(),
            name: format!("sec-{}", code),
            segment: "KOSDAQ".to_string(),
            shares_outstanding: None,
            high: 110.0,
            low: 100.0,
            close: 105.0,
            change_pct,
            volume: Some(500),
            turnover,
        }
    }

    fn member(theme: &str, code: &str) -> ThemeMembership {
        ThemeMembership {
            theme: theme.to_string(),
            theme_change_pct: None,
            code: code.to_string(),
            name: format!("sec-{}", code),
            price_diff: String::new(),
            change_pct: None,
            volume: None,
            inclusion_reason: String::new(),
        }
    }

    #[test]
    fn test_analyze_step_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();
        let pipe = pipeline(tmp.path());

        store
            .write_snapshot(&[
                sec("000001", 20.0, 10_000_000_000.0), // A
                sec("000002", 5.0, 60_000_000_000.0),  // B (range 10%)
                sec("000003", 1.0, 1_000_000_000.0),   // dropped
            ])
            .unwrap();
        store
            .write_theme_members(&[
                member("Theme1", "000001"),
                member("Theme1", "000002"),
                member("Theme2", "000003"), // dropped security's theme must not appear
            ])
            .unwrap();

        let selected = pipe.analyze_step(&store).unwrap();
        assert_eq!(selected, 2);

        let analysis = std::fs::read_to_string(store.analysis_path()).unwrap();
        assert!(analysis.contains("000001"));
        assert!(analysis.contains("000002"));
        assert!(!analysis.contains("000003"));

        let summary = std::fs::read_to_string(store.theme_summary_path()).unwrap();
        assert!(summary.contains("Theme1,2,medium"));
        assert!(!summary.contains("Theme2"));
    }

    #[test]
    fn test_analyze_step_requires_inputs() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();
        let pipe = pipeline(tmp.path());

        let err = pipe.analyze_step(&store).unwrap_err();
        assert!(err.downcast_ref::<StoreError>().is_some());
        // nothing was written
        assert!(!store.analysis_path().exists());
        assert!(!store.theme_summary_path().exists());
    }

    #[test]
    fn test_chart_links_step_requires_analysis() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();
        let pipe = pipeline(tmp.path());

        assert!(pipe.chart_links_step(&store).is_err());
    }
}
