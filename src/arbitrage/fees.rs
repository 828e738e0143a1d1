use serde::{Deserialize, Serialize};

use crate::types::Side;

/// Which legs of a roundtrip the taker fee applies to. The historical
/// variants of this strategy disagreed on this, so it is explicit
/// configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeApplication {
    BuyLegs,
    SellLegs,
    AllLegs,
}

/// Leg-scoped fee policy. The quote1/quote2 conversion leg has its own
/// switch since stable-to-stable pairs are fee-free on some venues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub taker_fee: f64,
    pub application: FeeApplication,
    pub fee_on_conversion: bool,
}

impl FeePolicy {
    pub fn new(taker_fee: f64, application: FeeApplication, fee_on_conversion: bool) -> Self {
        Self {
            taker_fee,
            application,
            fee_on_conversion,
        }
    }

    /// Fee rate for one leg of the route.
    pub fn rate(&self, side: Side, is_conversion: bool) -> f64 {
        if is_conversion && !self.fee_on_conversion {
            return 0.0;
        }
        match self.application {
            FeeApplication::AllLegs => self.taker_fee,
            FeeApplication::BuyLegs if side == Side::Buy => self.taker_fee,
            FeeApplication::SellLegs if side == Side::Sell => self.taker_fee,
            _ => 0.0,
        }
    }
}
