//! File persistence and serialization configuration

/// Configuration for price data persistence
pub struct PricePersistenceConfig {
    /// Directory path for storing price files
    pub directory: &'static str,
    /// Base filename for the binary cache (without symbol/extension)
    pub filename_base: &'static str,
    /// Current version of the cache serialization format
    pub version: f64,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub price: PricePersistenceConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    price: PricePersistenceConfig {
        directory: "price_data",
        filename_base: "prices",
        version: 1.0,
    },
};

/// Symbol-specific cache filename.
/// Example: "prices_IBM_v1.bin"
pub fn price_cache_filename(symbol: &str) -> String {
    let clean: String = symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    format!(
        "{}_{}_v{}.bin",
        PERSISTENCE.price.filename_base, clean, PERSISTENCE.price.version
    )
}

/// Symbol-specific CSV filename, e.g. "IBM_daily.csv"
pub fn price_csv_filename(symbol: &str) -> String {
    let clean: String = symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_daily.csv", clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_filename_sanitises_symbol() {
        assert_eq!(price_cache_filename("NSE:NIFTY"), "prices_NSE_NIFTY_v1.bin");
        assert_eq!(price_csv_filename("^NSEI"), "_NSEI_daily.csv");
    }
}
