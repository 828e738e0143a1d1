use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::types::Opportunity;

/// Append-only, human-readable record of every discovered opportunity.
/// The encoding is for inspection tooling, not for correctness.
pub struct OpportunityLog {
    path: PathBuf,
}

impl OpportunityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn append(&self, opportunity: &Opportunity) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("cannot open opportunity log {}", self.path.display()))?;

        file.write_all(format_record(opportunity).as_bytes())
            .await
            .context("opportunity log write failed")?;
        Ok(())
    }
}

fn format_record(opportunity: &Opportunity) -> String {
    let fills: Vec<String> = opportunity
        .legs
        .iter()
        .map(|leg| {
            let orders: Vec<String> = leg
                .fill
                .fills
                .iter()
                .map(|fill| format!("({}, {})", fill.price, fill.quantity))
                .collect();
            format!("{} {} [{}]", leg.side, leg.symbol, orders.join(", "))
        })
        .collect();

    format!(
        "{} | {} | {} | start {:.4} -> end {:.4} | profit {:.4} | {}\n",
        opportunity.discovered_at.format("%Y-%m-%d %H:%M:%S%.3f"),
        opportunity.id,
        opportunity.direction,
        opportunity.starting_notional,
        opportunity.ending_notional,
        opportunity.profit,
        fills.join(" | ")
    )
}
