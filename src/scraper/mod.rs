pub mod cleaner;
pub mod http_client;
pub mod krx;
pub mod naver;
pub mod news;

use crate::models::SecurityRecord;
use anyhow::Result;
use async_trait::async_trait;

pub use krx::KrxDownloader;
pub use naver::NaverScraper;
pub use news::GoogleNewsClient;

/// Swappable snapshot source. The production source is the KRX data portal;
/// tests and backfills can substitute a canned one.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self, trading_day: &str) -> Result<Vec<SecurityRecord>>;
}

#[async_trait]
impl SnapshotSource for KrxDownloader {
    async fn fetch_snapshot(&self, trading_day: &str) -> Result<Vec<SecurityRecord>> {
        KrxDownloader::fetch_snapshot(self, trading_day).await
    }
}
