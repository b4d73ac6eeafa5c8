use serde::{Deserialize, Serialize};

/// One daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp_ms: i64,

    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,

    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp_ms: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Candle {
            timestamp_ms,
            open_price: open,
            high_price: high,
            low_price: low,
            close_price: close,
            volume,
        }
    }

    /// A bar where only the close is known (open/high/low collapse onto it).
    pub fn from_close(timestamp_ms: i64, close: f64) -> Self {
        Self::new(timestamp_ms, close, close, close, close, 0.0)
    }
}
