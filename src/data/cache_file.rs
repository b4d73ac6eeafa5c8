use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::{PERSISTENCE, price_cache_filename},
    data::{PriceSource, create_file_with_parents},
    domain::PriceSeries,
    utils::{epoch_ms_to_date_string, now_timestamp_ms},
};

/// Binary cache file wrapper with metadata
#[derive(Serialize, Deserialize, Debug)]
struct CacheFile {
    pub version: f64,
    pub timestamp_ms: i64,
    pub data: PriceSeries,
}

/// Default location for a symbol's cache: `<directory>/<prices_SYMBOL_vN.bin>`
pub fn default_cache_path(symbol: &str) -> PathBuf {
    PathBuf::from(PERSISTENCE.price.directory).join(price_cache_filename(symbol))
}

fn unwrap_cache(cache: CacheFile, version_required: f64, path: &Path) -> Result<PriceSeries> {
    if cache.version != version_required {
        bail!(
            "Cache version mismatch in {}: file v{} vs required v{}",
            path.display(),
            cache.version,
            version_required
        );
    }
    cache
        .data
        .validate()
        .with_context(|| format!("Cached series in {} is invalid", path.display()))?;
    log::debug!(
        "Cache {} written {} holds {} prices",
        path.display(),
        epoch_ms_to_date_string(cache.timestamp_ms),
        cache.data.len()
    );
    Ok(cache.data)
}

/// Uses bincode; the file is stamped with the current cache version.
pub fn write_price_cache(path: &Path, series: &PriceSeries) -> Result<()> {
    let file = create_file_with_parents(path)?;
    let writer = BufWriter::new(file);

    let cache = CacheFile {
        version: PERSISTENCE.price.version,
        timestamp_ms: now_timestamp_ms(),
        data: series.clone(),
    };

    bincode::serialize_into(writer, &cache)
        .with_context(|| format!("Failed to serialize cache to: {}", path.display()))?;

    log::info!(
        "Cache written: {} ({} prices for {})",
        path.display(),
        series.len(),
        series.symbol
    );
    Ok(())
}

pub fn read_price_cache(path: &Path, version_required: f64) -> Result<PriceSeries> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let cache: CacheFile = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("Failed to deserialize cache from: {}", path.display()))?;
    unwrap_cache(cache, version_required, path)
}

pub struct PriceCacheFile {
    pub path: PathBuf,
}

impl PriceCacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PriceSource for PriceCacheFile {
    fn signature(&self) -> &'static str {
        "Local Cache"
    }

    async fn load(&self) -> Result<PriceSeries> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read cache: {}", self.path.display()))?;

        // Deserialize in blocking task (bincode is CPU-bound)
        let cache: CacheFile = tokio::task::spawn_blocking(move || bincode::deserialize(&bytes))
            .await
            .context("Deserialization task panicked")?
            .with_context(|| format!("Failed to deserialize cache from: {}", self.path.display()))?;

        unwrap_cache(cache, PERSISTENCE.price.version, &self.path)
    }
}
