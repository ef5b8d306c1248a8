//! Report serialization: the fixed-width analysis table, the theme frequency
//! summary, and the chart-link sheet.
//!
//! The pivot stays sparse until this boundary; theme_1..theme_k columns are
//! materialized here, with k = the widest theme list of the run.

use crate::analysis::{max_theme_count, summarize};
use crate::models::{ChartLinkRow, FrequencyTier, PivotedRow, ThemeFrequency};
use crate::storage::{DayStore, StoreError};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

// ── Analysis table ────────────────────────────────────────────────────────────

/// Fixed leading columns of the analysis table, before theme_1..theme_k.
const BASE_COLUMNS: [&str; 10] = [
    "code",
    "name",
    "reason",
    "segment",
    "close",
    "high",
    "low",
    "change_pct",
    "volume",
    "turnover_100m",
];

/// Header row for a run whose widest theme list has `k` entries.
pub fn analysis_header(k: usize) -> Vec<String> {
    let mut header: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    for i in 1..=k {
        header.push(format!("theme_{}", i));
    }
    header
}

/// One serialized record; theme cells beyond the row's own list are empty.
pub fn analysis_record(row: &PivotedRow, k: usize) -> Vec<String> {
    let r = &row.security.record;
    let mut record = vec![
        r.code.clone(),
        r.name.clone(),
        row.security.reason.as_str().to_string(),
        r.segment.clone(),
        format!("{}", r.close),
        format!("{}", r.high),
        format!("{}", r.low),
        format!("{}", r.change_pct),
        r.volume.map(|v| v.to_string()).unwrap_or_default(),
        format!("{:.1}", row.turnover_100m()),
    ];
    for i in 0..k {
        record.push(row.themes.get(i).cloned().unwrap_or_default());
    }
    record
}

/// Write the classified-and-pivoted table and the theme summary together.
///
/// Both tables are fully built in memory before either file is touched, so a
/// failure mid-assembly leaves no partial output on disk.
pub fn write_analysis(store: &DayStore, rows: &[PivotedRow]) -> Result<()> {
    let k = max_theme_count(rows);
    let summary = summarize(rows);

    let mut records: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    records.push(analysis_header(k));
    for row in rows {
        records.push(analysis_record(row, k));
    }

    write_records(&store.analysis_path(), &records)?;
    write_theme_summary(store, &summary)?;

    info!(
        "Analysis report: {} securities, {} theme columns, {} distinct themes",
        rows.len(),
        k,
        summary.len()
    );
    Ok(())
}

/// Theme frequency summary: theme, count, emphasis tier.
pub fn write_theme_summary(store: &DayStore, summary: &[ThemeFrequency]) -> Result<()> {
    let mut records = vec![vec![
        "theme".to_string(),
        "count".to_string(),
        "tier".to_string(),
    ]];
    for freq in summary {
        records.push(vec![
            freq.theme.clone(),
            freq.count.to_string(),
            FrequencyTier::from_count(freq.count)
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
        ]);
    }
    write_records(&store.theme_summary_path(), &records)
}

fn write_records(path: &Path, records: &[Vec<String>]) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).with_context(|| format!("Could not remove {:?}", path))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Could not create {:?}", path))?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read back (code, name) pairs from the day's analysis table. The news and
/// chart-link steps iterate exactly the securities the report selected.
pub fn read_analysis_index(store: &DayStore) -> Result<Vec<(String, String)>> {
    let path = store.analysis_path();
    if !path.exists() {
        return Err(StoreError::MissingInput { path }.into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(&path)?;

    let headers = reader.headers().context("Missing header row")?.clone();
    let find = |name: &str| -> Result<usize, StoreError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| StoreError::SchemaMismatch {
                column: name.to_string(),
                table: path.file_name().unwrap_or_default().to_string_lossy().into_owned(),
            })
    };
    let idx_code = find("code")?;
    let idx_name = find("name")?;

    let mut index = Vec::new();
    for result in reader.records() {
        let record = result?;
        if let (Some(code), Some(name)) = (record.get(idx_code), record.get(idx_name)) {
            index.push((code.to_string(), name.to_string()));
        }
    }
    Ok(index)
}

// ── Chart links ───────────────────────────────────────────────────────────────

/// Naver serves pre-rendered chart images per issue; `sidcode` is a
/// millisecond timestamp used as a cache-buster.
pub fn chart_url(code: &str, span: &str, sidcode: i64) -> String {
    format!(
        "https://ssl.pstatic.net/imgfinance/chart/item/area/{}/{}.png?sidcode={}",
        span, code, sidcode
    )
}

pub fn build_chart_links(index: &[(String, String)], sidcode: i64) -> Vec<ChartLinkRow> {
    index
        .iter()
        .map(|(code, name)| ChartLinkRow {
            code: code.clone(),
            name: name.clone(),
            chart_3m: chart_url(code, "month3", sidcode),
            chart_1y: chart_url(code, "year", sidcode),
            chart_3y: chart_url(code, "year3", sidcode),
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassifiedSecurity, SecurityRecord, SelectionReason};

    fn pivoted(code: &str, reason: SelectionReason, turnover: f64, themes: &[&str]) -> PivotedRow {
        PivotedRow {
            security: ClassifiedSecurity {
                record: SecurityRecord {
                    code: code.to_string(),
                    name: format!("sec-{}", code),
                    segment: "KOSPI".to_string(),
                    shares_outstanding: None,
                    high: 110.0,
                    low: 100.0,
                    close: 105.0,
                    change_pct: 16.0,
                    volume: Some(1_000),
                    turnover,
                },
                range_pct: 10.0,
                reason,
            },
            themes: themes.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_analysis_header_width() {
        assert_eq!(analysis_header(0).len(), 10);
        let h = analysis_header(3);
        assert_eq!(h.len(), 13);
        assert_eq!(h[10], "theme_1");
        assert_eq!(h[12], "theme_3");
    }

    #[test]
    fn test_analysis_record_pads_short_theme_lists() {
        let row = pivoted("005930", SelectionReason::A, 65_432_100_000.0, &["반도체"]);
        let record = analysis_record(&row, 3);
        assert_eq!(record.len(), 13);
        assert_eq!(record[0], "005930");
        assert_eq!(record[2], "A");
        assert_eq!(record[9], "654.3"); // 65,432,100,000 KRW → 654.3 hundred-million
        assert_eq!(record[10], "반도체");
        assert_eq!(record[11], "");
        assert_eq!(record[12], "");
    }

    #[test]
    fn test_write_and_read_back_analysis() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();

        let rows = vec![
            pivoted("000010", SelectionReason::A, 80_000_000_000.0, &["Theme1", "Theme2"]),
            pivoted("000011", SelectionReason::B, 70_000_000_000.0, &["Theme1"]),
        ];
        write_analysis(&store, &rows).unwrap();

        let index = read_analysis_index(&store).unwrap();
        assert_eq!(
            index,
            vec![
                ("000010".to_string(), "sec-000010".to_string()),
                ("000011".to_string(), "sec-000011".to_string()),
            ]
        );

        let summary_text = std::fs::read_to_string(store.theme_summary_path()).unwrap();
        let mut lines = summary_text.lines();
        assert_eq!(lines.next(), Some("theme,count,tier"));
        assert_eq!(lines.next(), Some("Theme1,2,medium"));
        assert_eq!(lines.next(), Some("Theme2,1,low"));
    }

    #[test]
    fn test_write_analysis_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DayStore::open(tmp.path(), "20250606").unwrap();
        let rows = vec![
            pivoted("000010", SelectionReason::A, 80_000_000_000.0, &["Theme1", "Theme2"]),
            pivoted("000011", SelectionReason::B, 70_000_000_000.0, &["Theme1"]),
        ];

        write_analysis(&store, &rows).unwrap();
        let first = std::fs::read(store.analysis_path()).unwrap();
        write_analysis(&store, &rows).unwrap();
        let second = std::fs::read(store.analysis_path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_chart_links() {
        let index = vec![("005930".to_string(), "삼성전자".to_string())];
        let links = build_chart_links(&index, 1_700_000_000_000);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].chart_3m,
            "https://ssl.pstatic.net/imgfinance/chart/item/area/month3/005930.png?sidcode=1700000000000"
        );
        assert!(links[0].chart_1y.contains("/area/year/005930.png"));
        assert!(links[0].chart_3y.contains("/area/year3/005930.png"));
    }
}
