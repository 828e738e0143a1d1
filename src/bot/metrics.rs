use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Opportunity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotMetrics {
    pub cycles_completed: u64,
    pub opportunities_found: u64,
    pub total_simulated_profit: f64,
    pub average_profit_per_opportunity: f64,
    pub fetch_failures: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub route_performance: HashMap<String, RouteMetrics>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteMetrics {
    pub route: String,
    pub opportunities: u64,
    pub total_profit: f64,
    pub best_profit: f64,
}

impl BotMetrics {
    pub fn new() -> Self {
        Self {
            cycles_completed: 0,
            opportunities_found: 0,
            total_simulated_profit: 0.0,
            average_profit_per_opportunity: 0.0,
            fetch_failures: 0,
            error_count: 0,
            last_error: None,
            route_performance: HashMap::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn record_cycle(&mut self, opportunities: &[Opportunity], fetch_failures: u64) {
        self.cycles_completed += 1;
        self.fetch_failures += fetch_failures;
        self.opportunities_found += opportunities.len() as u64;

        for opportunity in opportunities {
            self.total_simulated_profit += opportunity.profit;

            let route = opportunity.route();
            let metrics = self
                .route_performance
                .entry(route.clone())
                .or_insert_with(|| RouteMetrics {
                    route,
                    opportunities: 0,
                    total_profit: 0.0,
                    best_profit: 0.0,
                });
            metrics.opportunities += 1;
            metrics.total_profit += opportunity.profit;
            if opportunity.profit > metrics.best_profit {
                metrics.best_profit = opportunity.profit;
            }
        }

        if self.opportunities_found > 0 {
            self.average_profit_per_opportunity =
                self.total_simulated_profit / self.opportunities_found as f64;
        }
        self.last_updated = Utc::now();
    }

    pub fn record_error(&mut self, error_message: &str) {
        self.error_count += 1;
        self.last_error = Some(error_message.to_string());
        self.last_updated = Utc::now();
    }

    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Arbitrage Bot Metrics Report ===\n");
        report.push_str(&format!("Total Cycles: {}\n", self.cycles_completed));
        report.push_str(&format!(
            "Opportunities Found: {}\n",
            self.opportunities_found
        ));
        report.push_str(&format!(
            "Total Simulated Profit: {:.4}\n",
            self.total_simulated_profit
        ));
        report.push_str(&format!(
            "Average Profit per Opportunity: {:.4}\n",
            self.average_profit_per_opportunity
        ));
        report.push_str(&format!("Fetch Failures: {}\n", self.fetch_failures));
        report.push_str(&format!("Error Count: {}\n", self.error_count));

        if let Some(ref error) = self.last_error {
            report.push_str(&format!("Last Error: {}\n", error));
        }

        if !self.route_performance.is_empty() {
            report.push_str("\n=== Route Performance ===\n");
            for metrics in self.route_performance.values() {
                report.push_str(&format!(
                    "{}: {} opportunities, {:.4} total profit, {:.4} best\n",
                    metrics.route, metrics.opportunities, metrics.total_profit, metrics.best_profit
                ));
            }
        }

        report.push_str(&format!("\nLast Updated: {}\n", self.last_updated));
        report
    }

    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize metrics: {}", e))
    }
}

impl Default for BotMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Fill, FillSimulationResult, Leg, RouteDirection, Side};

    fn opportunity(profit: f64) -> Opportunity {
        let leg = |symbol: &str, side| Leg {
            symbol: symbol.to_string(),
            side,
            fee_rate: 0.001,
            fill: FillSimulationResult {
                filled_quantity: 1.0,
                counter_amount: 1.0,
                fills: vec![Fill {
                    price: 1.0,
                    quantity: 1.0,
                }],
                fully_filled: true,
            },
        };
        Opportunity::new(
            RouteDirection::Quote1ToQuote2,
            [
                leg("ADAUSDT", Side::Buy),
                leg("ADAUSDC", Side::Sell),
                leg("USDCUSDT", Side::Sell),
            ],
            100.0,
            100.0 + profit,
            profit,
        )
    }

    #[test]
    fn test_record_cycle_accumulates_totals() {
        let mut metrics = BotMetrics::new();

        metrics.record_cycle(&[opportunity(0.5), opportunity(0.3)], 1);
        metrics.record_cycle(&[], 0);

        assert_eq!(metrics.cycles_completed, 2);
        assert_eq!(metrics.opportunities_found, 2);
        assert_eq!(metrics.fetch_failures, 1);
        assert!((metrics.total_simulated_profit - 0.8).abs() < 1e-12);
        assert!((metrics.average_profit_per_opportunity - 0.4).abs() < 1e-12);

        let route = metrics.route_performance.values().next().unwrap();
        assert_eq!(route.opportunities, 2);
        assert_eq!(route.best_profit, 0.5);
    }

    #[test]
    fn test_report_lists_counts_and_errors() {
        let mut metrics = BotMetrics::new();
        metrics.record_cycle(&[opportunity(0.5)], 0);
        metrics.record_error("book fetch exploded");

        let report = metrics.generate_report();
        assert!(report.contains("Total Cycles: 1"));
        assert!(report.contains("Opportunities Found: 1"));
        assert!(report.contains("book fetch exploded"));

        assert!(metrics.export_json().unwrap().contains("cycles_completed"));
    }
}
