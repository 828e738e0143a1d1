use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

impl PriceLevel {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }
}

/// One side of a book is ordered best-price-first: asks ascending, bids
/// descending. A snapshot is never mutated after capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
    pub captured_at: DateTime<Utc>,
}

impl OrderBookSnapshot {
    pub fn new(symbol: String, asks: Vec<PriceLevel>, bids: Vec<PriceLevel>) -> Self {
        Self {
            symbol,
            asks,
            bids,
            captured_at: Utc::now(),
        }
    }
}

/// The complete set of books fetched for one cycle. Owned by the cycle,
/// never carried over to the next one.
#[derive(Debug, Default)]
pub struct SnapshotSet {
    books: HashMap<String, OrderBookSnapshot>,
}

impl SnapshotSet {
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
        }
    }

    pub fn insert(&mut self, snapshot: OrderBookSnapshot) {
        self.books.insert(snapshot.symbol.clone(), snapshot);
    }

    pub fn get(&self, symbol: &str) -> Option<&OrderBookSnapshot> {
        self.books.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

impl FromIterator<OrderBookSnapshot> for SnapshotSet {
    fn from_iter<I: IntoIterator<Item = OrderBookSnapshot>>(iter: I) -> Self {
        let mut set = Self::new();
        for snapshot in iter {
            set.insert(snapshot);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// A price/quantity pair actually consumed by a simulated walk. Execution
/// replays these literally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillSimulationResult {
    pub filled_quantity: f64,
    pub counter_amount: f64,
    pub fills: Vec<Fill>,
    pub fully_filled: bool,
}

impl FillSimulationResult {
    pub fn empty() -> Self {
        Self {
            filled_quantity: 0.0,
            counter_amount: 0.0,
            fills: Vec::new(),
            fully_filled: false,
        }
    }
}

/// One step of a triangular route, with the simulated fills to replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub symbol: String,
    pub side: Side,
    pub fee_rate: f64,
    pub fill: FillSimulationResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteDirection {
    /// quote1 -> coin -> quote2 -> quote1
    Quote1ToQuote2,
    /// quote1 -> quote2 -> coin -> quote1
    Quote2ToQuote1,
}

impl std::fmt::Display for RouteDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteDirection::Quote1ToQuote2 => write!(f, "quote1 -> quote2"),
            RouteDirection::Quote2ToQuote1 => write!(f, "quote2 -> quote1"),
        }
    }
}

/// A profitable roundtrip discovered in one cycle. Valid only for the
/// snapshot set it was computed from; never revalidated or mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Uuid,
    pub discovered_at: DateTime<Utc>,
    pub direction: RouteDirection,
    pub legs: [Leg; 3],
    pub starting_notional: f64,
    pub ending_notional: f64,
    pub profit: f64,
}

impl Opportunity {
    pub fn new(
        direction: RouteDirection,
        legs: [Leg; 3],
        starting_notional: f64,
        ending_notional: f64,
        profit: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            discovered_at: Utc::now(),
            direction,
            legs,
            starting_notional,
            ending_notional,
            profit,
        }
    }

    pub fn route(&self) -> String {
        let steps: Vec<String> = self
            .legs
            .iter()
            .map(|leg| format!("{} {}", leg.side, leg.symbol))
            .collect();
        steps.join(" -> ")
    }
}

/// The two coin pairs of a triangle; the shared conversion pair comes from
/// the universe configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairTrio {
    pub coin: String,
    pub quote1_symbol: String,
    pub quote2_symbol: String,
}
