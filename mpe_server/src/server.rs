use log::*;
use mpe_engine::{PaymentMonitor, SqliteDatabase, VolatilityMonitor};
use tokio::task::JoinHandle;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{purchase_webhook::create_event_handlers, zcash_rpc::ZcashRpcClient},
    workers::{start_payment_monitor_worker, start_volatility_worker},
};

const MAX_DB_CONNECTIONS: u32 = 25;

/// Runs the daemon until it receives Ctrl-C.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;
    let mut db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS).await?;
    db.run_migrations().await?;
    let workers = start_workers(&config, db.clone())?;
    info!("🚀️ {} worker(s) running. Press Ctrl-C to stop.", workers.len());
    tokio::signal::ctrl_c().await?;
    info!("🚀️ Shutting down");
    workers.iter().for_each(JoinHandle::abort);
    db.close().await?;
    Ok(())
}

/// Wires the monitors to the database, the chain nodes and the event hooks, and spawns a worker for each.
pub fn start_workers(config: &ServerConfig, db: SqliteDatabase) -> Result<Vec<JoinHandle<()>>, ServerError> {
    let handlers = create_event_handlers(config.purchase_webhook_url.as_deref())?;
    let producers = handlers.producers();
    tokio::spawn(handlers.start_handlers());

    let mut workers = Vec::with_capacity(config.chains.len() + 1);
    if config.volatility_enabled {
        let monitor = VolatilityMonitor::new(db.clone(), config.volatility.clone()).with_producers(producers.clone());
        monitor.init();
        workers.push(start_volatility_worker(monitor, config.volatility_tick));
    }
    for chain in &config.chains {
        let client = ZcashRpcClient::new(chain)?;
        info!(
            "🚀️ Watching {} payments through {} ({} confirmations)",
            chain.currency, chain.rpc_url, chain.min_confirmations
        );
        let monitor = PaymentMonitor::new(db.clone(), client, chain.settings()).with_producers(producers.clone());
        workers.push(start_payment_monitor_worker(monitor, chain.poll_interval));
    }
    Ok(workers)
}
