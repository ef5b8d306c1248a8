use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub storage: StorageConfig,
    pub selection: SelectionConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_krx_otp_url")]
    pub krx_otp_url: String,

    #[serde(default = "default_krx_download_url")]
    pub krx_download_url: String,

    #[serde(default = "default_naver_base_url")]
    pub naver_base_url: String,

    #[serde(default = "default_news_rss_url")]
    pub news_rss_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum pause before every outbound request. Courtesy rate limiting,
    /// not concurrency control — the pipeline is sequential anyway.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Naver theme index page count (1..=N).
    #[serde(default = "default_theme_pages")]
    pub theme_pages: u32,

    /// Upper bound on market-cap listing pages per segment; pagination stops
    /// earlier on the first empty page.
    #[serde(default = "default_market_cap_page_limit")]
    pub market_cap_page_limit: u32,

    /// Headlines fetched per security from the news feed.
    #[serde(default = "default_news_per_security")]
    pub news_per_security: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root under which one folder per trading day is created.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Selection-rule thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    /// Reason A: change% at or above this.
    #[serde(default = "default_min_change_pct")]
    pub min_change_pct: f64,

    /// Reason B, first leg: KRW turnover at or above this.
    #[serde(default = "default_min_turnover")]
    pub min_turnover: f64,

    /// Reason B, second leg: intraday range% at or above this.
    #[serde(default = "default_min_range_pct")]
    pub min_range_pct: f64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_krx_otp_url() -> String {
    "http://data.krx.co.kr/comm/fileDn/GenerateOTP/generate.cmd".to_string()
}
fn default_krx_download_url() -> String {
    "http://data.krx.co.kr/comm/fileDn/download_csv/download.cmd".to_string()
}
fn default_naver_base_url() -> String {
    "https://finance.naver.com".to_string()
}
fn default_news_rss_url() -> String {
    "https://news.google.com/rss/search".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36"
        .to_string()
}
fn default_theme_pages() -> u32 {
    8
}
fn default_market_cap_page_limit() -> u32 {
    49
}
fn default_news_per_security() -> usize {
    2
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_min_change_pct() -> f64 {
    15.0
}
fn default_min_turnover() -> f64 {
    50_000_000_000.0
}
fn default_min_range_pct() -> f64 {
    6.0
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("KRX").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig {
                krx_otp_url: default_krx_otp_url(),
                krx_download_url: default_krx_download_url(),
                naver_base_url: default_naver_base_url(),
                news_rss_url: default_news_rss_url(),
                timeout_secs: default_timeout_secs(),
                request_delay_ms: default_request_delay_ms(),
                jitter_ms: default_jitter_ms(),
                max_retries: default_max_retries(),
                user_agent: default_user_agent(),
                theme_pages: default_theme_pages(),
                market_cap_page_limit: default_market_cap_page_limit(),
                news_per_security: default_news_per_security(),
            },
            storage: StorageConfig {
                data_dir: default_data_dir(),
            },
            selection: SelectionConfig {
                min_change_pct: default_min_change_pct(),
                min_turnover: default_min_turnover(),
                min_range_pct: default_min_range_pct(),
            },
        }
    }
}
