use serde::{Deserialize, Serialize};

// ── Securities ────────────────────────────────────────────────────────────────

/// One row of the KRX end-of-day full-market price list.
///
/// `code` is the 6-character zero-padded issue code. It is the join key for
/// everything downstream and must stay a string: "005930" and "5930" are the
/// same issue only after padding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityRecord {
    pub code: String,
    pub name: String,
    pub segment: String, // KOSPI / KOSDAQ / KONEX
    pub shares_outstanding: Option<i64>,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub change_pct: f64,
    pub volume: Option<i64>,
    pub turnover: f64, // KRW traded value for the day
}

// ── Themes ────────────────────────────────────────────────────────────────────

/// One row of the Naver theme index (theme list page).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeListRow {
    pub theme: String,
    pub change_pct: Option<f64>,
    /// `no=` query value of the theme's detail page.
    pub detail_no: String,
}

/// One (theme, member security) edge from a theme detail page.
///
/// Many-to-many: a security may appear under zero, one, or many themes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeMembership {
    pub theme: String,
    pub theme_change_pct: Option<f64>,
    pub code: String,
    pub name: String,
    pub price_diff: String,
    pub change_pct: Option<f64>,
    pub volume: Option<i64>,
    pub inclusion_reason: String,
}

// ── Market-cap listing ────────────────────────────────────────────────────────

/// One row of the Naver market-cap listing (sise_market_sum). Stored verbatim
/// as a report sheet; not consumed by the analysis core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketCapRow {
    pub code: String,
    pub name: String,
    pub segment: String,
    pub price: Option<f64>,
    pub price_diff: String,
    pub change_pct: Option<f64>,
    pub volume: Option<i64>,
    pub per: Option<f64>,
}

// ── Classification ────────────────────────────────────────────────────────────

/// Why a security was selected for the daily report.
///
/// A: change% cleared the fluctuation threshold.
/// B: turnover and intraday range both cleared their thresholds.
/// A wins when both hold; there is deliberately no combined tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum SelectionReason {
    A,
    B,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::A => "A",
            SelectionReason::B => "B",
        }
    }
}

/// A security that survived classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSecurity {
    pub record: SecurityRecord,
    /// (high − low) / low × 100, forced to 0 when low ≤ 0 (halted issues).
    pub range_pct: f64,
    pub reason: SelectionReason,
}

/// A classified security plus the themes it belongs to, in first-appearance
/// order. Kept sparse; fixed theme_1..theme_k columns exist only in the
/// serialized report.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotedRow {
    pub security: ClassifiedSecurity,
    pub themes: Vec<String>,
}

impl PivotedRow {
    /// Turnover in hundred-million KRW units, rounded to 1 decimal.
    /// This is the sort key and the value the report prints.
    pub fn turnover_100m(&self) -> f64 {
        (self.security.record.turnover / 100_000_000.0 * 10.0).round() / 10.0
    }
}

// ── Theme frequency summary ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThemeFrequency {
    pub theme: String,
    pub count: usize,
}

/// Visual-emphasis bucket for a theme cell, driven by how many surviving
/// securities carry that theme. Presentation only, never a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyTier {
    High,   // count >= 3
    Medium, // count == 2
    Low,    // count == 1
}

impl FrequencyTier {
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(FrequencyTier::Low),
            2 => Some(FrequencyTier::Medium),
            _ => Some(FrequencyTier::High),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencyTier::High => "high",
            FrequencyTier::Medium => "medium",
            FrequencyTier::Low => "low",
        }
    }
}

// ── News & chart links ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub code: String,
    pub name: String,
    pub media: String,
    pub title: String,
    pub url: String,
}

/// Direct links to Naver's pre-rendered chart images for one security.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartLinkRow {
    pub code: String,
    pub name: String,
    pub chart_3m: String,
    pub chart_1y: String,
    pub chart_3y: String,
}
