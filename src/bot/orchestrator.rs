use anyhow::{anyhow, Result};
use std::{sync::Arc, time::Duration};
use tokio::time::{interval, sleep};
use tracing::{debug, error, info, warn};

use crate::{
    arbitrage::{RouteEvaluator, RouteScanner},
    bot::BotMetrics,
    config::Config,
    exchange::{fetch_snapshot_set, BybitClient, BybitCredentials, MarketDataProvider},
    execution::ExecutionEngine,
    oplog::OpportunityLog,
};

/// Owns the whole detection context: one client, one scanner, one optional
/// execution engine, all constructed up front and passed down explicitly.
pub struct ArbitrageBot {
    config: Config,
    market: Arc<BybitClient>,
    scanner: RouteScanner,
    engine: Option<ExecutionEngine>,
    oplog: OpportunityLog,
    metrics: BotMetrics,
    is_running: bool,
}

impl ArbitrageBot {
    pub fn new(config: Config) -> Result<Self> {
        info!("Initializing Arbitrage Bot");

        let credentials = BybitCredentials::from_env();
        if config.execution.enabled && credentials.is_none() {
            return Err(anyhow!(
                "execution is enabled but BYBIT_API_KEY / BYBIT_API_SECRET are not set"
            ));
        }

        let market = Arc::new(BybitClient::new(&config.exchange, credentials)?);
        info!("Exchange client initialized");

        let evaluator = RouteEvaluator::new(&config.arbitrage);
        let scanner = RouteScanner::new(evaluator, config.universe.clone());
        info!(
            coins = config.universe.coins.len(),
            conversion = %config.universe.conversion_symbol,
            "Scanner initialized"
        );

        let engine = if config.execution.enabled {
            Some(ExecutionEngine::new(
                market.clone(),
                &config.execution,
                config.universe.quote1.clone(),
            ))
        } else {
            None
        };

        let oplog = OpportunityLog::new(&config.oplog.path);

        Ok(Self {
            config,
            market,
            scanner,
            engine,
            oplog,
            metrics: BotMetrics::new(),
            is_running: false,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.is_running {
            return Err(anyhow!("Bot is already running"));
        }

        info!("Starting Arbitrage Bot");
        self.is_running = true;

        self.market.health_check().await?;
        info!("Exchange health check passed");

        self.run_monitoring_loop().await
    }

    pub async fn stop(&mut self) {
        info!("Stopping Arbitrage Bot");
        self.is_running = false;
    }

    async fn run_monitoring_loop(&mut self) -> Result<()> {
        let mut interval = interval(Duration::from_millis(
            self.config.arbitrage.cycle_interval_ms,
        ));
        let mut cycle_count = 0u64;

        info!(
            interval_ms = self.config.arbitrage.cycle_interval_ms,
            "Starting monitoring loop"
        );

        while self.is_running {
            interval.tick().await;
            cycle_count += 1;

            match self.run_single_cycle().await {
                Ok(opportunities_found) => {
                    debug!(
                        cycle = cycle_count,
                        opportunities_found, "cycle completed"
                    );
                }
                Err(e) => {
                    error!("Error in monitoring cycle #{}: {}", cycle_count, e);
                    self.metrics.record_error(&e.to_string());

                    let backoff_duration = Duration::from_secs(30);
                    warn!("Backing off for {:?} due to error", backoff_duration);
                    sleep(backoff_duration).await;
                }
            }

            if cycle_count % 100 == 0 {
                info!("{}", self.metrics.generate_report());
            }
        }

        info!("Monitoring loop stopped");
        Ok(())
    }

    /// One cycle: fetch a fresh snapshot set, scan it, hand every qualifying
    /// opportunity to the log and (if enabled) the execution engine. Nothing
    /// survives into the next cycle.
    async fn run_single_cycle(&mut self) -> Result<usize> {
        let symbols = self.config.universe.fetch_symbols();
        let snapshots = fetch_snapshot_set(
            self.market.as_ref(),
            &symbols,
            self.config.exchange.orderbook_depth,
        )
        .await;

        let fetch_failures = (symbols.len() - snapshots.len()) as u64;
        if snapshots.is_empty() {
            return Err(anyhow!(
                "no order book could be fetched for any of {} symbols",
                symbols.len()
            ));
        }

        let opportunities = self.scanner.scan(&snapshots);

        for opportunity in &opportunities {
            info!(
                route = %opportunity.route(),
                profit = opportunity.profit,
                ending = opportunity.ending_notional,
                "Arbitrage opportunity found"
            );

            if let Err(e) = self.oplog.append(opportunity).await {
                warn!("Failed to record opportunity: {}", e);
            }

            // Sequential and blocking: one roundtrip completes before the
            // next begins, so execution, not detection, bounds throughput.
            if let Some(engine) = &self.engine {
                match engine.execute(opportunity).await {
                    Ok(report) => {
                        info!(
                            opportunity = %report.opportunity_id,
                            legs = report.legs.len(),
                            "opportunity executed"
                        );
                    }
                    Err(e) => {
                        error!("Execution failed: {}", e);
                        self.metrics.record_error(&e.to_string());
                    }
                }
            }
        }

        self.metrics.record_cycle(&opportunities, fetch_failures);
        Ok(opportunities.len())
    }

    pub fn metrics(&self) -> &BotMetrics {
        &self.metrics
    }
}
