//! Daemon configuration.
//!
//! Everything is read from `MPE_*` environment variables (after `.env` has been loaded). Missing or malformed values
//! are logged and replaced with defaults, so the daemon always starts with a usable configuration.
use std::{env, fmt::Display, str::FromStr};

use chrono::Duration;
use log::*;
use mpe_common::{
    helpers::{parse_boolean_flag, parse_currency_list},
    CurrencyTable,
    Secret,
    YEC,
};
use mpe_engine::{ChainSettings, VolatilityConfig};
use rust_decimal::Decimal;

use crate::errors::ConfigError;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/mpe_store.db?mode=rwc";
const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8232";
const DEFAULT_MIN_CONFIRMATIONS: u32 = 10;
const DEFAULT_POLL_INTERVAL: Duration = Duration::seconds(60);
const DEFAULT_RPC_TIMEOUT: Duration = Duration::seconds(30);
const DEFAULT_MAX_CONCURRENT_ADDRESSES: usize = 8;
const DEFAULT_VOLATILITY_TICK: Duration = Duration::seconds(60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub currencies: CurrencyTable,
    /// When false, the volatility worker is not started and every market reads as normal.
    pub volatility_enabled: bool,
    pub volatility: VolatilityConfig,
    pub volatility_tick: Duration,
    pub chains: Vec<ChainConfig>,
    /// Where payment status changes are POSTed. No webhook is installed when this is `None`.
    pub purchase_webhook_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            currencies: CurrencyTable::default(),
            volatility_enabled: true,
            volatility: VolatilityConfig::default(),
            volatility_tick: DEFAULT_VOLATILITY_TICK,
            chains: vec![ChainConfig::new(YEC)],
            purchase_webhook_url: None,
        }
    }
}

/// Connection and polling settings for one chain node.
#[derive(Clone, Debug)]
pub struct ChainConfig {
    pub currency: String,
    pub rpc_url: String,
    pub rpc_user: String,
    pub rpc_password: Secret<String>,
    pub min_confirmations: u32,
    pub poll_interval: Duration,
    pub rpc_timeout: Duration,
    pub max_concurrent_addresses: usize,
}

impl ChainConfig {
    pub fn new(currency: &str) -> Self {
        Self {
            currency: currency.to_ascii_uppercase(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            rpc_user: String::default(),
            rpc_password: Secret::default(),
            min_confirmations: DEFAULT_MIN_CONFIRMATIONS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            max_concurrent_addresses: DEFAULT_MAX_CONCURRENT_ADDRESSES,
        }
    }

    pub fn settings(&self) -> ChainSettings {
        ChainSettings::new(&self.currency, self.min_confirmations)
            .with_max_concurrent_addresses(self.max_concurrent_addresses)
    }

    fn from_lookup<F>(currency: &str, lookup: &F) -> Self
    where F: Fn(&str) -> Option<String> {
        let defaults = Self::new(currency);
        let code = defaults.currency.clone();
        let var = |suffix: &str| format!("MPE_{code}_{suffix}");
        let rpc_url = lookup(&var("RPC_URL")).unwrap_or_else(|| {
            info!("🪛️ {} is not set. Using the default node address, {DEFAULT_RPC_URL}.", var("RPC_URL"));
            DEFAULT_RPC_URL.to_string()
        });
        let rpc_user = lookup(&var("RPC_USER")).unwrap_or_default();
        let rpc_password = lookup(&var("RPC_PASSWORD")).map(Secret::from).unwrap_or_default();
        if rpc_password.is_empty() {
            warn!("🪛️ {} is not set. Requests to the {code} node will not be authenticated.", var("RPC_PASSWORD"));
        }
        let min_confirmations =
            parse_or_default(lookup, &var("MIN_CONFIRMATIONS"), defaults.min_confirmations);
        let poll_interval = seconds_or_default(lookup, &var("POLL_SECONDS"), defaults.poll_interval);
        let rpc_timeout = seconds_or_default(lookup, &var("RPC_TIMEOUT_SECONDS"), defaults.rpc_timeout);
        let max_concurrent_addresses =
            parse_or_default(lookup, &var("MAX_CONCURRENT_ADDRESSES"), defaults.max_concurrent_addresses);
        Self {
            currency: code,
            rpc_url,
            rpc_user,
            rpc_password,
            min_confirmations,
            poll_interval,
            rpc_timeout,
            max_concurrent_addresses,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. `lookup` returns `None` for unset variables.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("MPE_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ MPE_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let currencies = configure_currencies(&lookup);
        let volatility_enabled = parse_boolean_flag(lookup("MPE_VOLATILITY_ENABLED"), true);
        if !volatility_enabled {
            warn!("🪛️ Volatility monitoring is disabled. Markets will never be frozen.");
        }
        let volatility = configure_volatility(&lookup, &currencies);
        let volatility_tick = seconds_or_default(&lookup, "MPE_VOLATILITY_TICK_SECONDS", DEFAULT_VOLATILITY_TICK);
        let chain_codes = match lookup("MPE_CHAINS").map(|s| parse_currency_list(&s)) {
            Some(codes) if !codes.is_empty() => codes,
            _ => {
                info!("🪛️ MPE_CHAINS is not set. Monitoring {YEC} payments only.");
                vec![YEC.to_string()]
            },
        };
        let chains = chain_codes.iter().map(|code| ChainConfig::from_lookup(code, &lookup)).collect();
        let purchase_webhook_url = lookup("MPE_PURCHASE_WEBHOOK_URL").filter(|s| !s.trim().is_empty());
        if purchase_webhook_url.is_none() {
            info!("🪛️ MPE_PURCHASE_WEBHOOK_URL is not set. Payment status changes will only be logged.");
        }
        Self {
            database_url,
            currencies,
            volatility_enabled,
            volatility,
            volatility_tick,
            chains,
            purchase_webhook_url,
        }
    }

    /// Checks the things that cannot be defaulted away: there must be at least one chain, and each chain only once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chains.is_empty() {
            return Err(ConfigError::NoChains);
        }
        let mut seen = std::collections::HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.currency.as_str()) {
                return Err(ConfigError::DuplicateChain(chain.currency.clone()));
            }
        }
        Ok(())
    }
}

fn configure_currencies<F>(lookup: &F) -> CurrencyTable
where F: Fn(&str) -> Option<String> {
    let mut currencies = CurrencyTable::default();
    if let Some(overrides) = lookup("MPE_CURRENCY_PRECISION") {
        if let Err(e) = currencies.apply_overrides(&overrides) {
            warn!("🪛️ Ignoring MPE_CURRENCY_PRECISION. {e}");
        }
    }
    currencies
}

fn configure_volatility<F>(lookup: &F, currencies: &CurrencyTable) -> VolatilityConfig
where F: Fn(&str) -> Option<String> {
    let defaults = VolatilityConfig::default();
    let reference_currency = lookup("MPE_REFERENCE_CURRENCY")
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .unwrap_or(defaults.reference_currency);
    let monitored_currencies = match lookup("MPE_MONITORED_CURRENCIES").map(|s| parse_currency_list(&s)) {
        Some(codes) if !codes.is_empty() => codes,
        _ => {
            let codes = currencies.settlement_currencies();
            info!("🪛️ MPE_MONITORED_CURRENCIES is not set. Monitoring the settlement currencies: {}", codes.join(", "));
            codes
        },
    };
    let downside_threshold_pct: Decimal =
        parse_or_default(lookup, "MPE_VOLATILITY_DOWNSIDE_THRESHOLD_PCT", defaults.downside_threshold_pct);
    let downside_threshold_pct = if downside_threshold_pct <= Decimal::ZERO {
        warn!("🪛️ The volatility threshold must be positive. Using {}%.", defaults.downside_threshold_pct);
        defaults.downside_threshold_pct
    } else {
        downside_threshold_pct
    };
    VolatilityConfig {
        reference_currency,
        monitored_currencies,
        downside_threshold_pct,
        window: seconds_or_default(lookup, "MPE_VOLATILITY_WINDOW_SECONDS", defaults.window),
        cooldown: seconds_or_default(lookup, "MPE_VOLATILITY_COOLDOWN_SECONDS", defaults.cooldown),
        stale_threshold: seconds_or_default(lookup, "MPE_VOLATILITY_STALE_THRESHOLD_SECONDS", defaults.stale_threshold),
    }
}

fn parse_or_default<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    lookup(name)
        .ok_or_else(|| debug!("🪛️ {name} is not set. Using the default value of {default}."))
        .and_then(|s| {
            s.trim()
                .parse::<T>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default of {default}."))
        })
        .unwrap_or(default)
}

fn seconds_or_default<F>(lookup: &F, name: &str, default: Duration) -> Duration
where F: Fn(&str) -> Option<String> {
    let secs = parse_or_default(lookup, name, default.num_seconds());
    if secs <= 0 {
        warn!("🪛️ {name} must be a positive number of seconds. Using {}s.", default.num_seconds());
        return default;
    }
    Duration::seconds(secs)
}
