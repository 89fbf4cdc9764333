//! Catalog of instruments the service can predict.

use serde::{Serialize, Serializer};
use std::fmt;

/// Asset name -> Yahoo Finance ticker
static SUPPORTED_ASSETS: phf::OrderedMap<&'static str, &'static str> = phf::phf_ordered_map! {
    "EURUSD" => "EURUSD=X",
    "GBPUSD" => "GBPUSD=X",
    "USDJPY" => "JPY=X",
    "BTCUSD" => "BTC-USD",
};

/// A supported instrument. Only constructible from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Asset {
    name: &'static str,
    ticker: &'static str,
}

impl Asset {
    /// Look up an asset by name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        let key = name.trim().to_uppercase();
        SUPPORTED_ASSETS
            .get_entry(key.as_str())
            .map(|(name, ticker)| Asset {
                name: *name,
                ticker: *ticker,
            })
    }

    /// All supported assets in catalog order
    pub fn all() -> Vec<Asset> {
        SUPPORTED_ASSETS
            .entries()
            .map(|(name, ticker)| Asset {
                name: *name,
                ticker: *ticker,
            })
            .collect()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Provider ticker used when fetching history
    pub fn ticker(&self) -> &'static str {
        self.ticker
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

/// Names of all supported assets
pub fn supported_asset_names() -> Vec<&'static str> {
    SUPPORTED_ASSETS.keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        let asset = Asset::parse(" eurusd ").unwrap();
        assert_eq!(asset.name(), "EURUSD");
        assert_eq!(asset.ticker(), "EURUSD=X");

        assert_eq!(Asset::parse("usdjpy").unwrap().ticker(), "JPY=X");
        assert_eq!(Asset::parse("BTCUSD").unwrap().ticker(), "BTC-USD");
    }

    #[test]
    fn test_unknown_asset() {
        assert!(Asset::parse("XAUUSD").is_none());
        assert!(Asset::parse("").is_none());
    }

    #[test]
    fn test_catalog_order() {
        assert_eq!(
            supported_asset_names(),
            vec!["EURUSD", "GBPUSD", "USDJPY", "BTCUSD"]
        );
        assert_eq!(Asset::all().len(), 4);
    }
}
