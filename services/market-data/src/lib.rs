//! Historical market data for the signal service.
//!
//! Provides the asset catalog, OHLCV candle types and a Yahoo Finance
//! chart-API client behind the [`HistoricalDataSource`] trait.

pub mod assets;
pub mod types;
pub mod sources {
    pub mod yahoo;
}
pub mod normalizers;

pub use assets::{supported_asset_names, Asset};
pub use sources::yahoo::YahooFinanceClient;
pub use types::*;
