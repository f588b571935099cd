use anyhow::{anyhow, Result};
use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use mpe_engine::RescanPolicy;
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(version, about = "Operator tools for the marketplace payment engine")]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(subcommand)]
    /// Record or list market exchange rates
    Rates(RatesCommand),
    /// Convert an amount between two currencies using the latest stored rates
    Convert {
        #[arg(required = true, index = 1, value_parser = parse_amount)]
        amount: Decimal,
        #[arg(required = true, index = 2)]
        from: String,
        #[arg(required = true, index = 3)]
        to: String,
        /// Refuse to convert if either currency's market is volatile or stale, as checkout would
        #[arg(short, long)]
        quote: bool,
    },
    /// Evaluate and print the current volatility state of every monitored market
    Market,
    /// List the configured currencies, their canonical decimal places and whether they settle payments
    Currencies,
    #[command(subcommand)]
    /// Create, list, close or reconcile payments
    Payments(PaymentsCommand),
    #[command(subcommand)]
    /// Chain node wallet management
    Wallet(WalletCommand),
}

#[derive(Debug, Subcommand)]
pub enum RatesCommand {
    /// Record a new observation: one BASE buys RATE units of QUOTE
    Add {
        #[arg(required = true, index = 1)]
        base: String,
        #[arg(required = true, index = 2)]
        quote: String,
        #[arg(required = true, index = 3, value_parser = parse_amount)]
        rate: Decimal,
        /// The name of the price source
        #[arg(short, long, default_value = "manual")]
        source: String,
        /// Flag the observation as volatile at the source
        #[arg(long)]
        volatile: bool,
    },
    /// List the latest rate for every currency pair
    List,
}

#[derive(Debug, Subcommand)]
pub enum PaymentsCommand {
    /// Register a new payment to watch for
    Create(NewPaymentParams),
    /// List the payments still awaiting confirmation on the given chain
    Pending {
        #[arg(default_value = "YEC", index = 1)]
        method: String,
    },
    /// Cancel a payment that is still awaiting confirmation
    Cancel {
        #[arg(required = true, index = 1)]
        id: i64,
    },
    /// Fail a payment that is still awaiting confirmation, regardless of its deadline
    Expire {
        #[arg(required = true, index = 1)]
        id: i64,
    },
    /// Run a single reconciliation pass against the node for the given chain
    Reconcile {
        #[arg(default_value = "YEC", index = 1)]
        chain: String,
    },
}

#[derive(Debug, Args)]
pub struct NewPaymentParams {
    /// The purchase this payment settles
    #[arg(required = true, index = 1)]
    pub purchase_id: String,
    #[arg(required = true, index = 2, value_parser = parse_amount)]
    pub amount: Decimal,
    /// The chain currency the payment is made in
    #[arg(required = true, index = 3)]
    pub method: String,
    /// The memo the buyer will attach to the transaction
    #[arg(short, long)]
    pub memo: String,
    /// The shielded address the payment must arrive at
    #[arg(short, long)]
    pub address: String,
    /// How long the buyer has to pay, e.g. 30m, 2h or 1d
    #[arg(short, long, default_value = "1h", value_parser = parse_timeout)]
    pub deadline: Duration,
    #[arg(long, default_value = "")]
    pub buyer: String,
    #[arg(long, default_value = "")]
    pub seller: String,
}

#[derive(Debug, Subcommand)]
pub enum WalletCommand {
    /// Import a viewing key into the chain node so that payments to its addresses become visible
    ImportKey {
        #[arg(required = true, index = 1)]
        chain: String,
        #[arg(required = true, index = 2)]
        viewing_key: String,
        /// yes, no or whenkeyisnew
        #[arg(short, long, default_value = "whenkeyisnew", value_parser = parse_rescan_policy)]
        rescan: RescanPolicy,
        /// Block height to start the rescan from
        #[arg(short, long)]
        start_height: Option<u64>,
    },
}

fn parse_amount(s: &str) -> Result<Decimal> {
    s.trim().parse::<Decimal>().map_err(|e| anyhow!("'{s}' is not a decimal number. {e}"))
}

fn parse_rescan_policy(s: &str) -> Result<RescanPolicy> {
    match s.trim().to_ascii_lowercase().as_str() {
        "yes" => Ok(RescanPolicy::Yes),
        "no" => Ok(RescanPolicy::No),
        "whenkeyisnew" => Ok(RescanPolicy::WhenKeyIsNew),
        _ => Err(anyhow!("Rescan must be one of yes, no or whenkeyisnew")),
    }
}

/// Parses a duration such as `90s`, `30m`, `2h` or `1d`. A bare number is taken as minutes.
fn parse_timeout(s: &str) -> Result<Duration> {
    let s = s.trim();
    let (value, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => s.split_at(i),
        None => (s, "m"),
    };
    let value = value.parse::<i64>().map_err(|e| anyhow!("Invalid duration '{s}'. {e}"))?;
    let duration = match unit {
        "s" => Duration::seconds(value),
        "m" => Duration::minutes(value),
        "h" => Duration::hours(value),
        "d" => Duration::days(value),
        _ => return Err(anyhow!("Invalid duration unit in '{s}'. Use s, m, h or d")),
    };
    Ok(duration)
}
