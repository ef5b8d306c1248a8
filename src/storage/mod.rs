//! Per-trading-day artifact store.
//!
//! Every run owns one directory, `{data_dir}/{YYYYMMDD}/`, holding the raw
//! scraped tables and the derived report tables, all CSV, all suffixed with
//! the trading-day string. Artifacts are immutable inputs once written; a
//! re-run overwrites them whole (delete first, then write).

use crate::models::{
    ChartLinkRow, MarketCapRow, NewsItem, SecurityRecord, ThemeListRow, ThemeMembership,
};
use crate::scraper::cleaner::pad_code;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Fatal input problems. Everything here aborts the run before any partial
/// output is produced.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("required input missing: {path}")]
    MissingInput { path: PathBuf },

    #[error("column '{column}' missing from {table}")]
    SchemaMismatch { column: String, table: String },
}

// Artifact file stems.
const SNAPSHOT: &str = "krx_snapshot";
const THEME_LIST: &str = "theme_list";
const THEME_MEMBERS: &str = "theme_members";
const MARKET_CAP: &str = "market_cap";
const ANALYSIS: &str = "analysis";
const THEME_SUMMARY: &str = "theme_summary";
const NEWS: &str = "stock_news";
const CHART_LINKS: &str = "chart_links";

pub struct DayStore {
    dir: PathBuf,
    date: String,
}

impl DayStore {
    /// Open (and create if needed) the folder for one trading day.
    pub fn open(data_dir: &Path, date: &str) -> Result<Self> {
        let dir = data_dir.join(date);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Could not create day folder {:?}", dir))?;
        Ok(Self {
            dir,
            date: date.to_string(),
        })
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn artifact(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", stem, self.date))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.artifact(SNAPSHOT)
    }
    pub fn theme_list_path(&self) -> PathBuf {
        self.artifact(THEME_LIST)
    }
    pub fn theme_members_path(&self) -> PathBuf {
        self.artifact(THEME_MEMBERS)
    }
    pub fn market_cap_path(&self) -> PathBuf {
        self.artifact(MARKET_CAP)
    }
    pub fn analysis_path(&self) -> PathBuf {
        self.artifact(ANALYSIS)
    }
    pub fn theme_summary_path(&self) -> PathBuf {
        self.artifact(THEME_SUMMARY)
    }
    pub fn news_path(&self) -> PathBuf {
        self.artifact(NEWS)
    }
    pub fn chart_links_path(&self) -> PathBuf {
        self.artifact(CHART_LINKS)
    }

    /// (artifact name, exists) for the status printout.
    pub fn status(&self) -> Vec<(String, bool)> {
        [
            SNAPSHOT,
            THEME_LIST,
            THEME_MEMBERS,
            MARKET_CAP,
            ANALYSIS,
            THEME_SUMMARY,
            NEWS,
            CHART_LINKS,
        ]
        .iter()
        .map(|stem| {
            let path = self.artifact(stem);
            (
                path.file_name().unwrap().to_string_lossy().into_owned(),
                path.exists(),
            )
        })
        .collect()
    }

    // ── Typed writers ─────────────────────────────────────────────────────────

    pub fn write_snapshot(&self, rows: &[SecurityRecord]) -> Result<()> {
        write_table(&self.snapshot_path(), rows)
    }

    pub fn write_theme_list(&self, rows: &[ThemeListRow]) -> Result<()> {
        write_table(&self.theme_list_path(), rows)
    }

    pub fn write_theme_members(&self, rows: &[ThemeMembership]) -> Result<()> {
        write_table(&self.theme_members_path(), rows)
    }

    pub fn write_market_cap(&self, rows: &[MarketCapRow]) -> Result<()> {
        write_table(&self.market_cap_path(), rows)
    }

    pub fn write_news(&self, rows: &[NewsItem]) -> Result<()> {
        write_table(&self.news_path(), rows)
    }

    pub fn write_chart_links(&self, rows: &[ChartLinkRow]) -> Result<()> {
        write_table(&self.chart_links_path(), rows)
    }

    // ── Typed readers ─────────────────────────────────────────────────────────

    /// Load the day's snapshot, re-padding codes in case the file was touched
    /// by code-mangling tooling.
    pub fn read_snapshot(&self) -> Result<Vec<SecurityRecord>> {
        let mut rows: Vec<SecurityRecord> =
            read_table(&self.snapshot_path(), &["code", "high", "low", "change_pct", "turnover"])?;
        for row in &mut rows {
            row.code = pad_code(&row.code);
        }
        Ok(rows)
    }

    pub fn read_theme_list(&self) -> Result<Vec<ThemeListRow>> {
        read_table(&self.theme_list_path(), &["theme", "detail_no"])
    }

    pub fn read_theme_members(&self) -> Result<Vec<ThemeMembership>> {
        let mut rows: Vec<ThemeMembership> =
            read_table(&self.theme_members_path(), &["theme", "code"])?;
        for row in &mut rows {
            row.code = pad_code(&row.code);
        }
        Ok(rows)
    }
}

// ── Generic CSV I/O ───────────────────────────────────────────────────────────

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if path.exists() {
        debug!("Overwriting {:?}", path);
        std::fs::remove_file(path).with_context(|| format!("Could not remove {:?}", path))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Could not create {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}

fn read_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(StoreError::MissingInput {
            path: path.to_path_buf(),
        }
        .into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|_| StoreError::MissingInput {
            path: path.to_path_buf(),
        })?;

    let headers = reader.headers().context("Missing header row")?.clone();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(StoreError::SchemaMismatch {
                column: column.to_string(),
                table: path.file_name().unwrap_or_default().to_string_lossy().into_owned(),
            }
            .into());
        }
    }

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("{:?} row {}: {}", path, i + 1, e),
        }
    }
    Ok(rows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_security() -> SecurityRecord {
        SecurityRecord {
            code: "005930".to_string(),
            name: "삼성전자".to_string(),
            segment: "KOSPI".to_string(),
            shares_outstanding: Some(5_969_782_550),
            high: 53_400.0,
            low: 52_500.0,
            close: 53_100.0,
            change_pct: 1.14,
            volume: Some(12_345_678),
            turnover: 654_321_000_000.0,
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();

        let rows = vec![sample_security()];
        store.write_snapshot(&rows).unwrap();
        assert!(store.snapshot_path().exists());

        let loaded = store.read_snapshot().unwrap();
        assert_eq!(loaded, rows);
    }

    #[test]
    fn test_overwrite_replaces_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();

        store.write_snapshot(&[sample_security(), sample_security()]).unwrap();
        store.write_snapshot(&[sample_security()]).unwrap();
        assert_eq!(store.read_snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_input_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();

        let err = store.read_snapshot().unwrap_err();
        let store_err = err.downcast_ref::<StoreError>().unwrap();
        match store_err {
            StoreError::MissingInput { path } => {
                assert!(path.to_string_lossy().contains("krx_snapshot_20250606.csv"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_schema_mismatch_names_the_column() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();

        std::fs::write(store.snapshot_path(), "name,close\n삼성전자,53100\n").unwrap();

        let err = store.read_snapshot().unwrap_err();
        let store_err = err.downcast_ref::<StoreError>().unwrap();
        match store_err {
            StoreError::SchemaMismatch { column, table } => {
                assert_eq!(column, "code");
                assert!(table.contains("krx_snapshot"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_member_codes_repadded_on_read() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();

        // a hand-edited file that lost its leading zeros
        std::fs::write(
            store.theme_members_path(),
            "theme,theme_change_pct,code,name,price_diff,change_pct,volume,inclusion_reason\n\
             반도체,1.5,5930,삼성전자,+600,1.14,1000,\n",
        )
        .unwrap();

        let members = store.read_theme_members().unwrap();
        assert_eq!(members[0].code, "005930");
    }
}
