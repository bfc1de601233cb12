//! Asset and market registry
//!
//! Listings are fixed at construction; the matching core never mutates
//! them. A market pairs two distinct active assets and is addressed by its
//! "BASE-QUOTE" symbol.

use std::collections::BTreeMap;
use types::prelude::*;

/// A listed trading pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub id: MarketId,
    pub base: AssetSymbol,
    pub quote: AssetSymbol,
}

/// Registry of known assets and listed markets.
#[derive(Debug, Default)]
pub struct MarketRegistry {
    assets: BTreeMap<AssetSymbol, Asset>,
    markets: BTreeMap<MarketId, Market>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard listings: BTC-USDT and ETH-USDT.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for (symbol, name, precision) in [
            ("BTC", "Bitcoin", 8),
            ("ETH", "Ethereum", 8),
            ("USDT", "Tether", 2),
        ] {
            if let Some(sym) = AssetSymbol::try_new(symbol) {
                registry.add_asset(Asset::new(sym, name, precision));
            }
        }
        for pair in ["BTC-USDT", "ETH-USDT"] {
            if let Some(id) = MarketId::try_new(pair) {
                // standard symbols always resolve
                let _ = registry.list_market(id);
            }
        }
        registry
    }

    pub fn add_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.symbol.clone(), asset);
    }

    /// List a market. Both legs must name distinct, active, known assets.
    pub fn list_market(&mut self, id: MarketId) -> CoreResult<()> {
        let (base, quote) = id.split();
        let base = AssetSymbol::try_new(base)
            .ok_or_else(|| CoreError::InvalidParams(format!("invalid base symbol in {id}")))?;
        let quote = AssetSymbol::try_new(quote)
            .ok_or_else(|| CoreError::InvalidParams(format!("invalid quote symbol in {id}")))?;
        if base == quote {
            return Err(CoreError::InvalidParams(format!(
                "market {id} pairs an asset with itself"
            )));
        }
        for sym in [&base, &quote] {
            let asset = self.asset(sym)?;
            if !asset.is_active {
                return Err(CoreError::InvalidParams(format!(
                    "asset {sym} is not active"
                )));
            }
        }
        self.markets.insert(id.clone(), Market { id, base, quote });
        Ok(())
    }

    pub fn market(&self, id: &MarketId) -> CoreResult<&Market> {
        self.markets.get(id).ok_or_else(|| CoreError::InvalidMarket {
            symbol: id.as_str().to_string(),
        })
    }

    pub fn asset(&self, symbol: &AssetSymbol) -> CoreResult<&Asset> {
        self.assets
            .get(symbol)
            .ok_or_else(|| CoreError::NotFound(format!("asset {symbol}")))
    }

    /// Like [`MarketRegistry::asset`] but also rejects inactive assets;
    /// funding operations use this.
    pub fn active_asset(&self, symbol: &AssetSymbol) -> CoreResult<&Asset> {
        let asset = self.asset(symbol)?;
        if !asset.is_active {
            return Err(CoreError::InvalidParams(format!(
                "asset {symbol} is not active"
            )));
        }
        Ok(asset)
    }

    pub fn active_assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values().filter(|a| a.is_active)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_listings() {
        let registry = MarketRegistry::standard();
        let btc_usdt = MarketId::try_new("BTC-USDT").unwrap();
        let market = registry.market(&btc_usdt).unwrap();
        assert_eq!(market.base.as_str(), "BTC");
        assert_eq!(market.quote.as_str(), "USDT");
        assert_eq!(registry.active_assets().count(), 3);
        assert_eq!(registry.markets().count(), 2);
    }

    #[test]
    fn test_unknown_market_is_invalid() {
        let registry = MarketRegistry::standard();
        let err = registry
            .market(&MarketId::try_new("DOGE-USDT").unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidMarket { .. }));
    }

    #[test]
    fn test_listing_requires_known_assets() {
        let mut registry = MarketRegistry::new();
        registry.add_asset(Asset::new(
            AssetSymbol::try_new("BTC").unwrap(),
            "Bitcoin",
            8,
        ));
        let err = registry
            .list_market(MarketId::try_new("BTC-USDT").unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_listing_rejects_self_pair() {
        let mut registry = MarketRegistry::new();
        registry.add_asset(Asset::new(
            AssetSymbol::try_new("BTC").unwrap(),
            "Bitcoin",
            8,
        ));
        let err = registry
            .list_market(MarketId::try_new("BTC-BTC").unwrap())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidParams(_)));
    }
}
