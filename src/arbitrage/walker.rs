use crate::types::{Fill, FillSimulationResult, PriceLevel};

pub const DEFAULT_PRECISION: u32 = 2;

/// Budget walks divide by the level price, so the spent amount rarely lands
/// on exactly zero; anything below this is leftover float noise, not money.
const BUDGET_DUST: f64 = 1e-9;

/// Floor `value` to `precision` decimal places. Balances are always floored,
/// never rounded up: an exchange credits discrete increments, and the
/// simulation must not claim more than execution would deliver.
pub fn floor_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).floor() / scale
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WalkRequest {
    /// Consume up to this base-asset quantity.
    Quantity(f64),
    /// Spend up to this quote-asset amount.
    Budget(f64),
}

impl WalkRequest {
    fn amount(&self) -> f64 {
        match self {
            WalkRequest::Quantity(q) => *q,
            WalkRequest::Budget(b) => *b,
        }
    }
}

/// Simulates consuming successive price levels of one book side. Recorded
/// fill quantities are floored to `precision` so execution can replay them
/// as placeable orders; the accumulated totals stay exact.
#[derive(Debug, Clone, Copy)]
pub struct BookWalker {
    precision: u32,
}

impl BookWalker {
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    /// Walk `levels` best-price-first against `request`.
    ///
    /// `fully_filled` means the entire request was satisfied from the given
    /// levels. Running out of levels is "no liquidity for this route", never
    /// a partial execution: a real order cannot chase price beyond the
    /// visible snapshot. Non-positive or non-finite requests and malformed
    /// levels yield the zero result, never an error.
    pub fn walk(&self, levels: &[PriceLevel], request: WalkRequest) -> FillSimulationResult {
        let amount = request.amount();
        if !amount.is_finite() || amount <= 0.0 || levels.is_empty() {
            return FillSimulationResult::empty();
        }
        if levels
            .iter()
            .any(|level| !(level.price > 0.0) || !(level.quantity >= 0.0))
        {
            return FillSimulationResult::empty();
        }

        match request {
            WalkRequest::Quantity(quantity) => self.walk_quantity(levels, quantity),
            WalkRequest::Budget(budget) => self.walk_budget(levels, budget),
        }
    }

    fn walk_quantity(&self, levels: &[PriceLevel], quantity: f64) -> FillSimulationResult {
        let mut remaining = quantity;
        let mut filled_quantity = 0.0;
        let mut counter_amount = 0.0;
        let mut fills = Vec::new();

        for level in levels {
            if remaining <= 0.0 {
                break;
            }
            let tradable = remaining.min(level.quantity);
            if tradable <= 0.0 {
                continue;
            }
            filled_quantity += tradable;
            counter_amount += tradable * level.price;
            remaining -= tradable;
            self.record_fill(&mut fills, level.price, tradable);
        }

        FillSimulationResult {
            filled_quantity,
            counter_amount,
            fills,
            fully_filled: remaining <= 0.0,
        }
    }

    fn walk_budget(&self, levels: &[PriceLevel], budget: f64) -> FillSimulationResult {
        let mut remaining = budget;
        let mut filled_quantity = 0.0;
        let mut counter_amount = 0.0;
        let mut fills = Vec::new();

        for level in levels {
            if remaining <= BUDGET_DUST {
                break;
            }
            let tradable = (remaining / level.price).min(level.quantity);
            if tradable <= 0.0 {
                continue;
            }
            filled_quantity += tradable;
            counter_amount += tradable * level.price;
            remaining -= tradable * level.price;
            self.record_fill(&mut fills, level.price, tradable);
        }

        FillSimulationResult {
            filled_quantity,
            counter_amount,
            fills,
            fully_filled: remaining <= BUDGET_DUST,
        }
    }

    fn record_fill(&self, fills: &mut Vec<Fill>, price: f64, quantity: f64) {
        let quantity = floor_to(quantity, self.precision);
        if quantity > 0.0 {
            fills.push(Fill { price, quantity });
        }
    }
}

impl Default for BookWalker {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}
