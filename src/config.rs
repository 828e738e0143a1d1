use serde::{Deserialize, Serialize};

use crate::arbitrage::fees::FeeApplication;
use crate::types::PairTrio;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub arbitrage: ArbitrageConfig,
    pub universe: UniverseConfig,
    pub execution: ExecutionConfig,
    pub oplog: OplogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeConfig {
    pub rest_url: String,
    pub orderbook_depth: u32,
    pub recv_window_ms: u64,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ArbitrageConfig {
    pub starting_notional: f64,
    pub taker_fee: f64,
    pub fee_application: FeeApplication,
    pub fee_on_conversion: bool,
    pub min_profit: f64,
    pub rounding_precision: u32,
    pub cycle_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UniverseConfig {
    pub quote1: String,
    pub quote2: String,
    pub conversion_symbol: String,
    pub coins: Vec<String>,
}

impl UniverseConfig {
    /// The triangles to scan, in configured order.
    pub fn trios(&self) -> Vec<PairTrio> {
        self.coins
            .iter()
            .map(|coin| PairTrio {
                coin: coin.clone(),
                quote1_symbol: format!("{}{}", coin, self.quote1),
                quote2_symbol: format!("{}{}", coin, self.quote2),
            })
            .collect()
    }

    /// Every symbol a cycle needs, the shared conversion pair included once.
    pub fn fetch_symbols(&self) -> Vec<String> {
        let mut symbols = Vec::with_capacity(self.coins.len() * 2 + 1);
        for trio in self.trios() {
            symbols.push(trio.quote1_symbol);
            symbols.push(trio.quote2_symbol);
        }
        symbols.push(self.conversion_symbol.clone());
        symbols
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExecutionConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
    pub fill_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OplogConfig {
    pub path: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mut settings = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::Environment::with_prefix("ARBITRAGE").separator("__"));

        // Override REST endpoint from environment if present (e.g. testnet)
        if let Ok(rest_url) = std::env::var("BYBIT_REST_URL") {
            settings = settings.set_override("exchange.rest_url", rest_url)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> UniverseConfig {
        UniverseConfig {
            quote1: "USDT".to_string(),
            quote2: "USDC".to_string(),
            conversion_symbol: "USDCUSDT".to_string(),
            coins: vec!["ADA".to_string(), "XRP".to_string()],
        }
    }

    #[test]
    fn test_trios_derive_both_quote_symbols() {
        let trios = universe().trios();
        assert_eq!(trios.len(), 2);
        assert_eq!(trios[0].quote1_symbol, "ADAUSDT");
        assert_eq!(trios[0].quote2_symbol, "ADAUSDC");
        assert_eq!(trios[1].coin, "XRP");
    }

    #[test]
    fn test_fetch_symbols_include_conversion_once() {
        let symbols = universe().fetch_symbols();
        assert_eq!(symbols.len(), 5);
        assert_eq!(
            symbols.iter().filter(|s| *s == "USDCUSDT").count(),
            1
        );
    }

    #[test]
    fn test_fee_application_parses_from_config_names() {
        let parsed: FeeApplication = serde_json::from_str("\"all_legs\"").unwrap();
        assert_eq!(parsed, FeeApplication::AllLegs);
        let parsed: FeeApplication = serde_json::from_str("\"buy_legs\"").unwrap();
        assert_eq!(parsed, FeeApplication::BuyLegs);
        let parsed: FeeApplication = serde_json::from_str("\"sell_legs\"").unwrap();
        assert_eq!(parsed, FeeApplication::SellLegs);
    }
}
