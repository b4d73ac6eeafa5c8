use anyhow::Result;
use async_trait::async_trait;

use crate::domain::PriceSeries;

/// Anything that can produce a validated daily price series.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short label for log lines, e.g. "CSV File"
    fn signature(&self) -> &'static str;

    async fn load(&self) -> Result<PriceSeries>;
}
