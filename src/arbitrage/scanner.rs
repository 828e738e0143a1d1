use tracing::{debug, warn};

use crate::{
    arbitrage::evaluator::RouteEvaluator,
    config::UniverseConfig,
    error::RouteRejection,
    types::{Opportunity, RouteDirection, SnapshotSet},
};

/// One detection pass over the configured universe. Stateless across cycles:
/// every call works only from the snapshot set it is given, and the returned
/// opportunities belong to that set alone.
pub struct RouteScanner {
    evaluator: RouteEvaluator,
    universe: UniverseConfig,
}

impl RouteScanner {
    pub fn new(evaluator: RouteEvaluator, universe: UniverseConfig) -> Self {
        Self {
            evaluator,
            universe,
        }
    }

    /// Evaluate both directions of every trio, in scan order. A missing
    /// snapshot skips the affected trio; rejections are a normal outcome.
    /// The list is not reordered by profit (extension point).
    pub fn scan(&self, snapshots: &SnapshotSet) -> Vec<Opportunity> {
        let mut opportunities = Vec::new();

        let conversion = match snapshots.get(&self.universe.conversion_symbol) {
            Some(book) => book,
            None => {
                let rejection = RouteRejection::DataUnavailable {
                    symbol: self.universe.conversion_symbol.clone(),
                };
                warn!(%rejection, "nothing to scan this cycle");
                return opportunities;
            }
        };

        for trio in self.universe.trios() {
            let (book_quote1, book_quote2) = match (
                snapshots.get(&trio.quote1_symbol),
                snapshots.get(&trio.quote2_symbol),
            ) {
                (Some(a), Some(b)) => (a, b),
                (None, _) => {
                    let rejection = RouteRejection::DataUnavailable {
                        symbol: trio.quote1_symbol.clone(),
                    };
                    debug!(coin = %trio.coin, %rejection, "skipping trio");
                    continue;
                }
                (_, None) => {
                    let rejection = RouteRejection::DataUnavailable {
                        symbol: trio.quote2_symbol.clone(),
                    };
                    debug!(coin = %trio.coin, %rejection, "skipping trio");
                    continue;
                }
            };

            for direction in [
                RouteDirection::Quote1ToQuote2,
                RouteDirection::Quote2ToQuote1,
            ] {
                match self
                    .evaluator
                    .evaluate(&trio, direction, book_quote1, book_quote2, conversion)
                {
                    Ok(opportunity) => opportunities.push(opportunity),
                    Err(rejection) if rejection.is_anomaly() => {
                        warn!(coin = %trio.coin, %direction, %rejection, "route dropped");
                    }
                    Err(rejection) => {
                        debug!(coin = %trio.coin, %direction, %rejection, "route rejected");
                    }
                }
            }
        }

        opportunities
    }
}
