//! The pure merge-and-classify core.
//!
//! Everything in this module operates on already-loaded in-memory tables and
//! performs no I/O, so it unit-tests without network or filesystem access.
//!
//! Steps:
//!   1. `classify` — tag each security with a selection reason (A/B) or drop it.
//!   2. `pivot`    — left-join survivors to theme memberships on the padded
//!                   code and collect each row's themes in appearance order.
//!   3. `summarize` — flatten theme occurrences into (theme, count) pairs.
//!
//! The three steps are deterministic: identical inputs produce identical
//! outputs, byte for byte, regardless of how often they run.

use crate::config::SelectionConfig;
use crate::models::{
    ClassifiedSecurity, PivotedRow, SecurityRecord, SelectionReason, ThemeFrequency,
    ThemeMembership,
};
use std::collections::HashMap;
use tracing::debug;

// ── Classification ────────────────────────────────────────────────────────────

/// Intraday range percentage: (high − low) / low × 100.
///
/// Halted or no-trade issues come through with low = 0; those get 0 rather
/// than a division fault. Never negative for sane high ≥ low inputs, and
/// clamped to 0 if a source ever delivers high < low.
pub fn range_pct(high: f64, low: f64) -> f64 {
    if low <= 0.0 {
        return 0.0;
    }
    ((high - low) / low * 100.0).max(0.0)
}

/// Apply the selection rule to one security.
///
/// Reason B requires turnover AND range to clear their thresholds; reason A
/// requires change% alone. When both hold, A wins — a single-valued outcome,
/// never a combined tag.
pub fn classify(record: &SecurityRecord, cfg: &SelectionConfig) -> Option<SelectionReason> {
    let range = range_pct(record.high, record.low);

    let cond_a = record.change_pct >= cfg.min_change_pct;
    let cond_b = record.turnover >= cfg.min_turnover && range >= cfg.min_range_pct;

    if cond_a {
        Some(SelectionReason::A)
    } else if cond_b {
        Some(SelectionReason::B)
    } else {
        None
    }
}

/// Classify a whole snapshot, keeping only the securities that earned a
/// reason. Input order is preserved.
pub fn classify_all(
    records: &[SecurityRecord],
    cfg: &SelectionConfig,
) -> Vec<ClassifiedSecurity> {
    let mut selected = Vec::new();
    for record in records {
        if record.low <= 0.0 {
            debug!("{} ({}): low <= 0, range% forced to 0", record.code, record.name);
        }
        if let Some(reason) = classify(record, cfg) {
            selected.push(ClassifiedSecurity {
                record: record.clone(),
                range_pct: range_pct(record.high, record.low),
                reason,
            });
        }
    }
    selected
}

// ── Theme pivot ───────────────────────────────────────────────────────────────

/// Left-join classified securities to their theme memberships.
///
/// Join key is the zero-padded code string; loaders normalize padding before
/// rows reach this point. Securities with no membership still appear, with an
/// empty theme list. Each row's themes are distinct, non-empty, and in the
/// order they first appear in the membership table.
///
/// Output order: reason ascending (A before B), then turnover in
/// hundred-million units descending. The sort is stable, so rows tying on
/// both keys keep their input order.
pub fn pivot(
    classified: &[ClassifiedSecurity],
    memberships: &[ThemeMembership],
) -> Vec<PivotedRow> {
    let mut themes_by_code: HashMap<&str, Vec<&str>> = HashMap::new();
    for m in memberships {
        let theme = m.theme.trim();
        if theme.is_empty() {
            continue;
        }
        let entry = themes_by_code.entry(m.code.as_str()).or_default();
        if !entry.contains(&theme) {
            entry.push(theme);
        }
    }

    let mut rows: Vec<PivotedRow> = classified
        .iter()
        .map(|sec| PivotedRow {
            security: sec.clone(),
            themes: themes_by_code
                .get(sec.record.code.as_str())
                .map(|list| list.iter().map(|t| t.to_string()).collect())
                .unwrap_or_default(),
        })
        .collect();

    rows.sort_by(|a, b| {
        a.security
            .reason
            .cmp(&b.security.reason)
            .then_with(|| {
                b.turnover_100m()
                    .partial_cmp(&a.turnover_100m())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    rows
}

/// Widest theme list in this run; the serialized report gets exactly this
/// many theme_N columns.
pub fn max_theme_count(rows: &[PivotedRow]) -> usize {
    rows.iter().map(|r| r.themes.len()).max().unwrap_or(0)
}

// ── Frequency summary ─────────────────────────────────────────────────────────

/// Count how many surviving securities carry each theme.
///
/// Sorted by count descending; ties keep first-seen order across the pivoted
/// rows (stable sort over the appearance sequence).
pub fn summarize(rows: &[PivotedRow]) -> Vec<ThemeFrequency> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for row in rows {
        for theme in &row.themes {
            let n = counts.entry(theme.as_str()).or_insert(0);
            if *n == 0 {
                first_seen.push(theme.as_str());
            }
            *n += 1;
        }
    }

    let mut summary: Vec<ThemeFrequency> = first_seen
        .into_iter()
        .map(|theme| ThemeFrequency {
            theme: theme.to_string(),
            count: counts[theme],
        })
        .collect();

    summary.sort_by(|a, b| b.count.cmp(&a.count));
    summary
}

// ── Tests ─────────────────────────────────────────────────────────────────────
