mod alpha_vantage;
mod cache_file;
mod csv_file;
mod source;

use std::{fs, path::Path};

use anyhow::{Context, Result};

pub use {
    alpha_vantage::{AlphaVantageClient, parse_daily_response},
    cache_file::{PriceCacheFile, default_cache_path, read_price_cache, write_price_cache},
    csv_file::{CsvPriceFile, parse_prices_csv, read_prices_csv, write_prices_csv},
    source::PriceSource,
};

// Helper function to create a new file and any missing parent directories.
pub(crate) fn create_file_with_parents(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))
}

/// Pick a loader from the file extension: `.bin` is the bincode cache, anything
/// else is read as CSV.
pub fn source_for_path(path: &Path, symbol: &str) -> Box<dyn PriceSource> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => Box::new(PriceCacheFile::new(path)),
        _ => Box::new(CsvPriceFile::new(path, symbol)),
    }
}
