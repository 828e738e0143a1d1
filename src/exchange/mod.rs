pub mod bybit;
pub mod traits;

pub use bybit::{BybitClient, BybitCredentials};
pub use traits::{MarketDataProvider, OrderGateway, OrderStatus};

use futures::future::join_all;
use tracing::warn;

use crate::types::SnapshotSet;

/// Fetch every symbol's book concurrently and join before compute begins, so
/// cycle latency is bounded by the slowest single request. A failed symbol
/// is logged and omitted; its trios are skipped downstream.
pub async fn fetch_snapshot_set(
    provider: &dyn MarketDataProvider,
    symbols: &[String],
    depth: u32,
) -> SnapshotSet {
    let fetches = symbols
        .iter()
        .map(|symbol| async move { (symbol, provider.order_book(symbol, depth).await) });

    let mut snapshots = SnapshotSet::new();
    for (symbol, result) in join_all(fetches).await {
        match result {
            Ok(snapshot) => snapshots.insert(snapshot),
            Err(e) => warn!(%symbol, error = %e, "order book fetch failed"),
        }
    }
    snapshots
}
