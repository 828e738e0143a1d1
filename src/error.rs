use thiserror::Error;

use crate::types::{RouteDirection, Side};

/// Why a trio-direction produced no opportunity this cycle. All variants are
/// local to the cycle: the scanner records them and moves on.
#[derive(Debug, Clone, Error)]
pub enum RouteRejection {
    #[error("no snapshot for {symbol} this cycle")]
    DataUnavailable { symbol: String },

    #[error("insufficient depth on {symbol} ({side}) for {direction}")]
    InsufficientDepth {
        symbol: String,
        side: Side,
        direction: RouteDirection,
    },

    #[error("roundtrip not profitable: started {starting}, ended {ending}")]
    NotProfitable { starting: f64, ending: f64 },

    #[error("profit {profit} below configured minimum {minimum}")]
    BelowMinimumProfit { profit: f64, minimum: f64 },

    #[error("arithmetic anomaly after {symbol} leg: {value}")]
    ArithmeticAnomaly { symbol: String, value: f64 },
}

impl RouteRejection {
    /// Anomalies should be unreachable if the book invariants hold; they are
    /// the only rejection worth surfacing above debug level.
    pub fn is_anomaly(&self) -> bool {
        matches!(self, RouteRejection::ArithmeticAnomaly { .. })
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{coin} balance {balance} is below the starting notional {required}")]
    InsufficientBalance {
        coin: String,
        balance: f64,
        required: f64,
    },

    #[error("order {order_id} on {symbol} not filled within {timeout_ms} ms (leg {leg_index})")]
    LegTimedOut {
        leg_index: usize,
        symbol: String,
        order_id: String,
        timeout_ms: u64,
    },

    #[error("gateway failure on leg {leg_index} ({symbol}): {message}")]
    Gateway {
        leg_index: usize,
        symbol: String,
        message: String,
    },
}
