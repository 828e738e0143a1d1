//! Sequential, blocking execution of one discovered roundtrip at a time.
//!
//! Legs run strictly in order and every order replays a simulated fill
//! literally; the engine never recomputes prices, because a fill that
//! diverges from the simulation means the opportunity may no longer exist.
//! The simulated prices can go stale while a leg waits for its fill, and an
//! aborted roundtrip leaves its resting orders on the book; both are
//! reported to the operator rather than handled here.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::ExecutionConfig,
    error::ExecutionError,
    exchange::traits::{OrderGateway, OrderStatus},
    types::{Opportunity, Side},
};

#[derive(Debug, Clone)]
pub struct LegExecution {
    pub symbol: String,
    pub side: Side,
    pub order_ids: Vec<String>,
}

/// Per-leg outcome of one roundtrip, consumed only by logging.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub opportunity_id: Uuid,
    pub legs: Vec<LegExecution>,
}

pub struct ExecutionEngine {
    gateway: Arc<dyn OrderGateway>,
    poll_interval: Duration,
    fill_timeout: Duration,
    quote1: String,
}

impl ExecutionEngine {
    pub fn new(gateway: Arc<dyn OrderGateway>, config: &ExecutionConfig, quote1: String) -> Self {
        Self {
            gateway,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            fill_timeout: Duration::from_millis(config.fill_timeout_ms),
            quote1,
        }
    }

    /// Execute one opportunity: place each leg's simulated fills as limit
    /// orders and block until every order of the leg fills before moving on.
    /// A leg that does not fill within the timeout aborts the remaining
    /// legs.
    pub async fn execute(&self, opportunity: &Opportunity) -> Result<ExecutionReport, ExecutionError> {
        let balance = self
            .gateway
            .wallet_balance(&self.quote1)
            .await
            .map_err(|e| ExecutionError::Gateway {
                leg_index: 0,
                symbol: self.quote1.clone(),
                message: e.to_string(),
            })?;
        if balance < opportunity.starting_notional {
            return Err(ExecutionError::InsufficientBalance {
                coin: self.quote1.clone(),
                balance,
                required: opportunity.starting_notional,
            });
        }

        let mut legs = Vec::with_capacity(opportunity.legs.len());

        for (leg_index, leg) in opportunity.legs.iter().enumerate() {
            let mut order_ids = Vec::with_capacity(leg.fill.fills.len());
            for fill in &leg.fill.fills {
                let order_id = self
                    .gateway
                    .place_limit_order(&leg.symbol, leg.side, fill.quantity, fill.price)
                    .await
                    .map_err(|e| ExecutionError::Gateway {
                        leg_index,
                        symbol: leg.symbol.clone(),
                        message: e.to_string(),
                    })?;
                order_ids.push(order_id);
            }

            for order_id in &order_ids {
                self.wait_for_fill(leg_index, &leg.symbol, order_id).await?;
            }

            info!(
                leg = leg_index,
                symbol = %leg.symbol,
                side = %leg.side,
                orders = order_ids.len(),
                "leg filled"
            );
            legs.push(LegExecution {
                symbol: leg.symbol.clone(),
                side: leg.side,
                order_ids,
            });
        }

        Ok(ExecutionReport {
            opportunity_id: opportunity.id,
            legs,
        })
    }

    async fn wait_for_fill(
        &self,
        leg_index: usize,
        symbol: &str,
        order_id: &str,
    ) -> Result<(), ExecutionError> {
        let poll = async {
            loop {
                match self.gateway.order_status(symbol, order_id).await {
                    Ok(OrderStatus::Filled) => return,
                    Ok(_) => {}
                    // transient status failures just mean another poll;
                    // the outer timeout bounds the wait
                    Err(e) => warn!(%symbol, %order_id, error = %e, "order status poll failed"),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(self.fill_timeout, poll)
            .await
            .map_err(|_| ExecutionError::LegTimedOut {
                leg_index,
                symbol: symbol.to_string(),
                order_id: order_id.to_string(),
                timeout_ms: self.fill_timeout.as_millis() as u64,
            })
    }
}
