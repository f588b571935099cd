use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::*;
use mpe_engine::{
    db_types::{NewExchangeRate, NewPayment},
    events::EventProducers,
    AddressApi,
    CurrencyConverter,
    ExchangeRateApi,
    PaymentApi,
    PaymentMonitor,
    QuoteApi,
    SqliteDatabase,
    VolatilityMonitor,
};
use mpe_server::{
    config::{ChainConfig, ServerConfig},
    integrations::{purchase_webhook::create_event_handlers, zcash_rpc::ZcashRpcClient},
};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;

use crate::{
    command_def::{Command, NewPaymentParams, PaymentsCommand, RatesCommand, WalletCommand},
    formatting::{
        format_conversion,
        format_currencies,
        format_market_states,
        format_payments,
        format_rates,
        format_tick_summary,
    },
};

pub async fn handle_command(command: Command) -> Result<()> {
    let config = ServerConfig::from_env_or_default();
    match command {
        Command::Rates(cmd) => {
            let db = open_database(&config).await?;
            match cmd {
                RatesCommand::Add { base, quote, rate, source, volatile } => {
                    let rate = NewExchangeRate::new(&base, &quote, rate, &source).volatile(volatile);
                    add_rate(db, rate).await
                },
                RatesCommand::List => list_rates(db).await,
            }
        },
        Command::Convert { amount, from, to, quote } => {
            let db = open_database(&config).await?;
            convert(db, &config, amount, &from, &to, quote).await
        },
        Command::Market => {
            let db = open_database(&config).await?;
            print_market(db, &config).await
        },
        Command::Currencies => {
            println!("{}", format_currencies(&config.currencies));
            Ok(())
        },
        Command::Payments(cmd) => {
            let db = open_database(&config).await?;
            match cmd {
                PaymentsCommand::Create(params) => create_payment(db, params).await,
                PaymentsCommand::Pending { method } => list_pending(db, &method).await,
                PaymentsCommand::Cancel { id } => close_payment(db, &config, id, false).await,
                PaymentsCommand::Expire { id } => close_payment(db, &config, id, true).await,
                PaymentsCommand::Reconcile { chain } => reconcile(db, &config, &chain).await,
            }
        },
        Command::Wallet(WalletCommand::ImportKey { chain, viewing_key, rescan, start_height }) => {
            let client = ZcashRpcClient::new(chain_config(&config, &chain)?)?;
            AddressApi::new(client).import_viewing_key(&viewing_key, rescan, start_height).await?;
            println!("Viewing key imported into the {} node", chain.to_ascii_uppercase());
            Ok(())
        },
    }
}

async fn open_database(config: &ServerConfig) -> Result<SqliteDatabase> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 5)
        .await
        .with_context(|| format!("Could not open the database at {}", config.database_url))?;
    db.run_migrations().await?;
    Ok(db)
}

fn chain_config<'a>(config: &'a ServerConfig, chain: &str) -> Result<&'a ChainConfig> {
    let code = chain.to_ascii_uppercase();
    config
        .chains
        .iter()
        .find(|c| c.currency == code)
        .ok_or_else(|| anyhow!("{code} is not a configured chain. Add it to MPE_CHAINS."))
}

/// Forwards payment status changes to the purchase webhook for the lifetime of one command.
struct StatusHooks {
    producers: EventProducers,
    drain: Option<JoinHandle<()>>,
}

impl StatusHooks {
    fn start(config: &ServerConfig) -> Result<Self> {
        let mut handlers = create_event_handlers(config.purchase_webhook_url.as_deref())?;
        let producers = handlers.producers();
        let drain = handlers.on_payment_status_changed.take().map(|h| tokio::spawn(h.start_handler()));
        Ok(Self { producers, drain })
    }

    fn producers(&self) -> EventProducers {
        self.producers.clone()
    }

    /// Waits for queued notifications to be delivered. Every clone of the producers must have been dropped first.
    async fn finish(self) {
        let Self { producers, drain } = self;
        drop(producers);
        if let Some(drain) = drain {
            if let Err(e) = drain.await {
                warn!("Event handler did not shut down cleanly. {e}");
            }
        }
    }
}

async fn add_rate(db: SqliteDatabase, rate: NewExchangeRate) -> Result<()> {
    let rate = ExchangeRateApi::new(db).record_rate(rate).await?;
    println!("Recorded exchange rate #{}: {rate}", rate.id);
    Ok(())
}

async fn list_rates(db: SqliteDatabase) -> Result<()> {
    let rates = ExchangeRateApi::new(db).latest_rates().await?;
    println!("{}", format_rates(&rates));
    Ok(())
}

async fn convert(
    db: SqliteDatabase,
    config: &ServerConfig,
    amount: Decimal,
    from: &str,
    to: &str,
    quote: bool,
) -> Result<()> {
    let converter = CurrencyConverter::new(db.clone(), config.currencies.clone());
    let result = if quote {
        let monitor = VolatilityMonitor::new(db, config.volatility.clone());
        monitor.init();
        monitor.tick().await;
        QuoteApi::new(converter, monitor.states()).quote(amount, from, to).await?
    } else {
        converter.convert(amount, from, to).await?
    };
    println!("{}", format_conversion(&result));
    Ok(())
}

/// Evaluates every monitored market once, from a cold start. A market that was volatile before but has recovered reads
/// as normal here, since the cooldown is only tracked by the running daemon.
async fn print_market(db: SqliteDatabase, config: &ServerConfig) -> Result<()> {
    let monitor = VolatilityMonitor::new(db, config.volatility.clone());
    monitor.init();
    monitor.tick().await;
    let reference = &monitor.config().reference_currency;
    println!("{}", format_market_states(&monitor.states().snapshot(), reference));
    Ok(())
}

async fn create_payment(db: SqliteDatabase, params: NewPaymentParams) -> Result<()> {
    let deadline = Utc::now() + params.deadline;
    let payment = NewPayment::new(&params.purchase_id, params.amount, &params.method, deadline)
        .with_parties(&params.buyer, &params.seller)
        .with_memo(&params.memo)
        .with_address(&params.address);
    let payment = PaymentApi::new(db, EventProducers::default()).create_payment(payment).await?;
    println!("{}", format_payments(&[payment]));
    Ok(())
}

async fn list_pending(db: SqliteDatabase, method: &str) -> Result<()> {
    let payments = PaymentApi::new(db, EventProducers::default()).pending_payments(method).await?;
    println!("{}", format_payments(&payments));
    Ok(())
}

async fn close_payment(db: SqliteDatabase, config: &ServerConfig, id: i64, expire: bool) -> Result<()> {
    let hooks = StatusHooks::start(config)?;
    let result = {
        let api = PaymentApi::new(db, hooks.producers());
        if expire {
            api.expire_payment(id).await
        } else {
            api.cancel_payment(id).await
        }
    };
    hooks.finish().await;
    let payment = result?;
    println!("{}", format_payments(&[payment]));
    Ok(())
}

async fn reconcile(db: SqliteDatabase, config: &ServerConfig, chain: &str) -> Result<()> {
    let chain = chain_config(config, chain)?;
    let client = ZcashRpcClient::new(chain)?;
    let hooks = StatusHooks::start(config)?;
    let summary = {
        let monitor = PaymentMonitor::new(db, client, chain.settings()).with_producers(hooks.producers());
        monitor.run_once().await
    };
    hooks.finish().await;
    println!("{}", format_tick_summary(&chain.currency, &summary));
    Ok(())
}
