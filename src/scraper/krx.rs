//! KRX full-market snapshot download.
//!
//! The data portal gates file downloads behind a one-time token: GET the OTP
//! endpoint with the report's query parameters, then POST the returned token
//! to the download endpoint. The answer is an EUC-KR CSV with Korean column
//! headers.

use crate::config::ScraperConfig;
use crate::models::SecurityRecord;
use crate::scraper::cleaner::{pad_code, parse_count, parse_pct, parse_price};
use crate::scraper::http_client::HttpClient;
use crate::storage::StoreError;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

// Korean headers of the MDCSTAT01501 full-market price report.
const COL_CODE: &str = "종목코드";
const COL_NAME: &str = "종목명";
const COL_SEGMENT: &str = "시장구분";
const COL_HIGH: &str = "고가";
const COL_LOW: &str = "저가";
const COL_CLOSE: &str = "종가";
const COL_CHANGE_PCT: &str = "등락률";
const COL_VOLUME: &str = "거래량";
const COL_TURNOVER: &str = "거래대금";
const COL_SHARES: &str = "상장주식수";

pub struct KrxDownloader {
    client: HttpClient,
    otp_url: String,
    download_url: String,
}

impl KrxDownloader {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            otp_url: config.krx_otp_url.clone(),
            download_url: config.krx_download_url.clone(),
        })
    }

    /// Download the end-of-day price list for `trading_day` (YYYYMMDD).
    pub async fn fetch_snapshot(&self, trading_day: &str) -> Result<Vec<SecurityRecord>> {
        info!("Requesting KRX OTP token for {}", trading_day);

        let otp = self
            .client
            .get_text_with_query(
                &self.otp_url,
                &[
                    ("locale", "ko_KR"),
                    ("mktId", "ALL"),
                    ("trdDd", trading_day),
                    ("share", "1"),
                    ("money", "1"),
                    ("csvxls_isNo", "false"),
                    ("name", "fileDown"),
                    ("url", "dbms/MDC/STAT/standard/MDCSTAT01501"),
                ],
            )
            .await
            .context("KRX OTP generation failed")?;

        debug!("OTP token issued ({} bytes)", otp.len());

        let csv_text = self
            .client
            .post_form_text_euckr(&self.download_url, &[("code", &otp)])
            .await
            .context("KRX CSV download failed")?;

        let records = parse_snapshot_csv(&csv_text)?;
        info!("KRX snapshot: {} securities for {}", records.len(), trading_day);
        Ok(records)
    }
}

/// Parse the downloaded CSV by header name. A missing header is a schema
/// error; a row that fails to parse is logged and skipped.
pub fn parse_snapshot_csv(text: &str) -> Result<Vec<SecurityRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().context("KRX CSV has no header row")?.clone();
    let col = |name: &str| -> Result<usize, StoreError> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| StoreError::SchemaMismatch {
                column: name.to_string(),
                table: "KRX snapshot CSV".to_string(),
            })
    };

    let idx_code = col(COL_CODE)?;
    let idx_name = col(COL_NAME)?;
    let idx_segment = col(COL_SEGMENT)?;
    let idx_high = col(COL_HIGH)?;
    let idx_low = col(COL_LOW)?;
    let idx_close = col(COL_CLOSE)?;
    let idx_change = col(COL_CHANGE_PCT)?;
    let idx_volume = col(COL_VOLUME)?;
    let idx_turnover = col(COL_TURNOVER)?;
    let idx_shares = col(COL_SHARES)?;

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("KRX CSV row {}: {}", i + 1, e);
                continue;
            }
        };

        let code = match record.get(idx_code) {
            Some(c) if !c.trim().is_empty() => pad_code(c),
            _ => {
                warn!("KRX CSV row {}: empty code, skipped", i + 1);
                continue;
            }
        };

        let cell = |idx: usize| record.get(idx).unwrap_or("");

        records.push(SecurityRecord {
            code,
            name: cell(idx_name).trim().to_string(),
            segment: cell(idx_segment).trim().to_string(),
            shares_outstanding: parse_count(cell(idx_shares)),
            high: parse_price(cell(idx_high)).unwrap_or(0.0),
            low: parse_price(cell(idx_low)).unwrap_or(0.0),
            close: parse_price(cell(idx_close)).unwrap_or(0.0),
            change_pct: parse_pct(cell(idx_change)).unwrap_or(0.0),
            volume: parse_count(cell(idx_volume)),
            turnover: parse_price(cell(idx_turnover)).unwrap_or(0.0),
        });
    }

    Ok(records)
}
