//! Long-running background jobs. Do not await the returned handles; the workers run until the runtime shuts down.
use chrono::Duration;
use log::*;
use mpe_engine::{PaymentMonitor, SqliteDatabase, TickSummary, VolatilityMonitor};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::integrations::zcash_rpc::ZcashRpcClient;

fn ticker(period: Duration) -> tokio::time::Interval {
    let period = period.to_std().unwrap_or(std::time::Duration::from_secs(60));
    let mut timer = interval(period);
    // A slow tick pushes the schedule back rather than triggering a burst of catch-up ticks
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Starts the volatility worker. The monitor must already have been initialised.
pub fn start_volatility_worker(monitor: VolatilityMonitor<SqliteDatabase>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = ticker(period);
        info!("🕰️ Volatility worker started. Ticking every {}s", period.num_seconds());
        loop {
            timer.tick().await;
            trace!("🕰️ Running volatility tick");
            monitor.tick().await;
        }
    })
}

/// Starts the payment monitor worker for one chain.
pub fn start_payment_monitor_worker(
    monitor: PaymentMonitor<SqliteDatabase, ZcashRpcClient>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = ticker(period);
        let currency = monitor.settings().currency.clone();
        info!("🕰️ {currency} payment monitor started. Polling every {}s", period.num_seconds());
        loop {
            timer.tick().await;
            trace!("🕰️ Running {currency} payment reconciliation");
            let summary = monitor.run_once().await;
            log_summary(&currency, &summary);
        }
    })
}

fn log_summary(currency: &str, summary: &TickSummary) {
    if summary.failed_addresses > 0 {
        warn!(
            "🕰️ {currency}: {} of {} address(es) could not be checked. They will be retried next tick.",
            summary.failed_addresses, summary.addresses
        );
    }
}
