use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use rand::RngExt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Shared HTTP client: cookie jar (the KRX download needs the OTP session),
/// polite inter-request delay, bounded retry with backoff.
pub struct HttpClient {
    inner: reqwest::Client,
    config: ScraperConfig,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// Fetch a URL as UTF-8 text with rate-limiting and retry.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self.get_with_retry(url, &[]).await?;
        resp.text().await.context("Failed to read response body")
    }

    /// Fetch a URL whose body is EUC-KR encoded (Naver finance pages serve
    /// euc-kr, sometimes without a charset header).
    pub async fn get_text_euckr(&self, url: &str) -> Result<String> {
        let resp = self.get_with_retry(url, &[]).await?;
        resp.text_with_charset("euc-kr")
            .await
            .context("Failed to decode EUC-KR response body")
    }

    /// GET with query parameters, returning the raw body text.
    pub async fn get_text_with_query(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let resp = self.get_with_retry(url, query).await?;
        resp.text().await.context("Failed to read response body")
    }

    /// POST a form body and decode the response as EUC-KR text. Used by the
    /// KRX download step, which answers with an EUC-KR CSV attachment.
    pub async fn post_form_text_euckr(&self, url: &str, form: &[(&str, &str)]) -> Result<String> {
        self.polite_delay().await;

        let resp = self
            .inner
            .post(url)
            .form(form)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {} from {}", status, url);
        }

        resp.text_with_charset("euc-kr")
            .await
            .context("Failed to decode EUC-KR response body")
    }

    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        self.polite_delay().await;

        let mut last_err = anyhow::anyhow!("No attempts made");

        for attempt in 1..=(self.config.max_retries + 1) {
            debug!("GET {} (attempt {})", url, attempt);

            let mut req = self.inner.get(url);
            if !query.is_empty() {
                req = req.query(query);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    } else if status.as_u16() == 429 || status.as_u16() == 503 {
                        let backoff = Duration::from_millis(
                            self.config.request_delay_ms * (2u64.pow(attempt)),
                        );
                        warn!(
                            "Rate limited ({}) on attempt {}, sleeping {:?}",
                            status, attempt, backoff
                        );
                        sleep(backoff).await;
                        last_err = anyhow::anyhow!("HTTP {}", status);
                    } else {
                        last_err = anyhow::anyhow!("HTTP error {}", status);
                        break; // Don't retry 4xx other than 429
                    }
                }
                Err(e) => {
                    last_err = anyhow::anyhow!("Request error: {}", e);
                    let backoff =
                        Duration::from_millis(self.config.request_delay_ms * (attempt as u64));
                    warn!("Request failed on attempt {}: {}", attempt, e);
                    sleep(backoff).await;
                }
            }
        }

        Err(last_err).with_context(|| format!("All retries exhausted for {}", url))
    }

    /// Sleep for the configured delay + random jitter before every request.
    async fn polite_delay(&self) {
        let jitter = if self.config.jitter_ms > 0 {
            rand::rng().random_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        let total = Duration::from_millis(self.config.request_delay_ms + jitter);
        sleep(total).await;
    }
}
