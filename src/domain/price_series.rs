use serde::{Deserialize, Serialize};

use crate::{
    domain::Candle,
    error::{RegimeError, RegimeResult},
};

/// Column-wise daily price history for one symbol.
///
/// Invariants (checked by every constructor): all columns have the same length,
/// timestamps strictly increase, and every close is finite and > 0.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub timestamps: Vec<i64>,
    pub open_prices: Vec<f64>,
    pub high_prices: Vec<f64>,
    pub low_prices: Vec<f64>,
    pub close_prices: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl PriceSeries {
    pub fn from_candles(symbol: impl Into<String>, candles: Vec<Candle>) -> RegimeResult<Self> {
        let len = candles.len();
        let mut series = Self {
            symbol: symbol.into(),
            timestamps: Vec::with_capacity(len),
            open_prices: Vec::with_capacity(len),
            high_prices: Vec::with_capacity(len),
            low_prices: Vec::with_capacity(len),
            close_prices: Vec::with_capacity(len),
            volumes: Vec::with_capacity(len),
        };

        for c in &candles {
            series.timestamps.push(c.timestamp_ms);
            series.open_prices.push(c.open_price);
            series.high_prices.push(c.high_price);
            series.low_prices.push(c.low_price);
            series.close_prices.push(c.close_price);
            series.volumes.push(c.volume);
        }

        series.validate()?;
        Ok(series)
    }

    /// Close-only series; open/high/low mirror the close.
    pub fn from_closes(
        symbol: impl Into<String>,
        timestamps: Vec<i64>,
        closes: Vec<f64>,
    ) -> RegimeResult<Self> {
        if timestamps.len() != closes.len() {
            return Err(RegimeError::invalid(
                "closes",
                format!(
                    "{} timestamps but {} closes",
                    timestamps.len(),
                    closes.len()
                ),
            ));
        }
        let candles = timestamps
            .into_iter()
            .zip(closes)
            .map(|(ts, close)| Candle::from_close(ts, close))
            .collect();
        Self::from_candles(symbol, candles)
    }

    pub fn validate(&self) -> RegimeResult<()> {
        let n = self.timestamps.len();
        let columns = [
            self.open_prices.len(),
            self.high_prices.len(),
            self.low_prices.len(),
            self.close_prices.len(),
            self.volumes.len(),
        ];
        if columns.iter().any(|&len| len != n) {
            return Err(RegimeError::invalid(
                "series",
                format!("column lengths differ: timestamps={} others={:?}", n, columns),
            ));
        }

        if let Some(i) = (1..n).find(|&i| self.timestamps[i] <= self.timestamps[i - 1]) {
            return Err(RegimeError::invalid(
                "timestamps",
                format!("not strictly increasing at index {}", i),
            ));
        }

        if let Some((i, p)) = self
            .close_prices
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p <= 0.0)
        {
            return Err(RegimeError::invalid(
                "close",
                format!("price {} at index {} must be finite and positive", p, i),
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.close_prices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.close_prices.is_empty()
    }

    #[inline]
    pub fn closes(&self) -> &[f64] {
        &self.close_prices
    }

    pub fn get_candle(&self, idx: usize) -> Candle {
        Candle::new(
            self.timestamps[idx],
            self.open_prices[idx],
            self.high_prices[idx],
            self.low_prices[idx],
            self.close_prices[idx],
            self.volumes[idx],
        )
    }

    pub fn candles(&self) -> Vec<Candle> {
        (0..self.len()).map(|i| self.get_candle(i)).collect()
    }
}
