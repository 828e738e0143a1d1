use anyhow::Result;
use async_trait::async_trait;

use crate::types::{OrderBookSnapshot, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn order_book(&self, symbol: &str, depth: u32) -> Result<OrderBookSnapshot>;

    async fn health_check(&self) -> Result<()>;
}

#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: f64,
        price: f64,
    ) -> Result<String>;

    async fn order_status(&self, symbol: &str, order_id: &str) -> Result<OrderStatus>;

    async fn wallet_balance(&self, coin: &str) -> Result<f64>;
}
