// Domain types and value objects
mod candle;
mod price_series;

pub use candle::Candle;
pub use price_series::PriceSeries;
