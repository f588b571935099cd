//! Market volatility classification.
//!
//! Every tick, each monitored currency is priced against a stable reference currency and classified as
//! * **stale** if there is no recent observation at all,
//! * **volatile** if the latest price has dropped by at least the configured percentage from the highest price in the
//!   trailing window, or
//! * **normal** otherwise.
//!
//! A volatile currency only returns to normal once the drop has stayed below the threshold for the cooldown period,
//! measured from the *last* tick that breached the threshold.
//!
//! Other components gate risky operations on [`MarketStates::is_frozen`], which is true for volatile or stale markets.
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    sync::Arc,
};

use chrono::{DateTime, Duration, Utc};
use log::*;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    clock::{system_clock, Clock},
    db_types::ExchangeRate,
    events::{EventProducers, MarketStateChangedEvent},
    traits::{RateStore, RateStoreError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatilityState {
    pub is_volatile: bool,
    /// When the current volatile episode was last confirmed. Reset on every tick that breaches the threshold.
    pub start_time: Option<DateTime<Utc>>,
    pub max_price_in_window: Option<Decimal>,
    /// Percentage drop of the current price from the window maximum
    pub current_drop_pct: Decimal,
    pub last_updated: DateTime<Utc>,
    pub is_stale: bool,
}

impl VolatilityState {
    pub fn normal(now: DateTime<Utc>) -> Self {
        Self {
            is_volatile: false,
            start_time: None,
            max_price_in_window: None,
            current_drop_pct: Decimal::ZERO,
            last_updated: now,
            is_stale: false,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.is_volatile || self.is_stale
    }

    pub fn label(&self) -> &'static str {
        match (self.is_stale, self.is_volatile) {
            (true, _) => "stale",
            (false, true) => "volatile",
            (false, false) => "normal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VolatilityConfig {
    /// The stable currency every monitored currency is priced against
    pub reference_currency: String,
    pub monitored_currencies: Vec<String>,
    /// The drop, in percent, that marks a market as volatile
    pub downside_threshold_pct: Decimal,
    pub window: Duration,
    pub cooldown: Duration,
    pub stale_threshold: Duration,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            reference_currency: mpe_common::USDT.to_string(),
            monitored_currencies: mpe_common::CurrencyTable::default().settlement_currencies(),
            downside_threshold_pct: Decimal::from(5),
            window: Duration::seconds(3600),
            cooldown: Duration::seconds(1800),
            stale_threshold: Duration::seconds(900),
        }
    }
}

/// Computes the next state of a currency whose latest observation is fresh, given the observations in the trailing
/// window.
///
/// An empty window means there was no trading activity; the previous classification is kept and only `last_updated`
/// moves.
pub fn classify(
    prev: &VolatilityState,
    window: &[ExchangeRate],
    config: &VolatilityConfig,
    now: DateTime<Utc>,
) -> VolatilityState {
    let Some(current) = window.iter().max_by_key(|r| (r.updated_at, r.id)) else {
        return VolatilityState { last_updated: now, ..prev.clone() };
    };
    let current = current.rate;
    let max = window.iter().map(|r| r.rate).max().unwrap_or(current);
    let drop_pct = if max <= Decimal::ZERO { Decimal::ZERO } else { (max - current) / max * Decimal::ONE_HUNDRED };
    let mut next = VolatilityState {
        is_volatile: prev.is_volatile,
        start_time: prev.start_time,
        max_price_in_window: Some(max),
        current_drop_pct: drop_pct,
        last_updated: now,
        is_stale: false,
    };
    if drop_pct >= config.downside_threshold_pct {
        next.is_volatile = true;
        next.start_time = Some(now);
    } else if prev.is_volatile {
        let cooled_down = prev.start_time.map(|t| now > t + config.cooldown).unwrap_or(true);
        if cooled_down {
            next.is_volatile = false;
            next.start_time = None;
        }
    }
    next
}

/// A cheap, cloneable, read-only view of the current market classification.
///
/// Readers always see a complete record; the monitor replaces records whole.
#[derive(Clone, Default)]
pub struct MarketStates {
    states: Arc<RwLock<HashMap<String, Arc<VolatilityState>>>>,
}

impl Debug for MarketStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MarketStates ({} currencies)", self.states.read().len())
    }
}

impl MarketStates {
    pub fn state(&self, currency: &str) -> Option<VolatilityState> {
        self.states.read().get(&currency.to_ascii_uppercase()).map(|s| s.as_ref().clone())
    }

    pub fn is_volatile(&self, currency: &str) -> bool {
        self.state(currency).map(|s| s.is_volatile).unwrap_or(false)
    }

    /// Unmonitored currencies are never frozen.
    pub fn is_frozen(&self, currency: &str) -> bool {
        self.state(currency).map(|s| s.is_frozen()).unwrap_or(false)
    }

    pub fn snapshot(&self) -> BTreeMap<String, VolatilityState> {
        self.states.read().iter().map(|(k, v)| (k.clone(), v.as_ref().clone())).collect()
    }

    fn replace(&self, currency: &str, state: VolatilityState) -> Option<Arc<VolatilityState>> {
        self.states.write().insert(currency.to_string(), Arc::new(state))
    }

    fn current(&self, currency: &str) -> Option<Arc<VolatilityState>> {
        self.states.read().get(currency).cloned()
    }
}

pub struct VolatilityMonitor<B> {
    db: B,
    config: VolatilityConfig,
    states: MarketStates,
    clock: Arc<dyn Clock>,
    producers: EventProducers,
}

impl<B> Debug for VolatilityMonitor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VolatilityMonitor({:?})", self.states)
    }
}

impl<B> VolatilityMonitor<B> {
    pub fn new(db: B, config: VolatilityConfig) -> Self {
        let config = VolatilityConfig {
            reference_currency: config.reference_currency.to_ascii_uppercase(),
            monitored_currencies: config.monitored_currencies.iter().map(|c| c.to_ascii_uppercase()).collect(),
            ..config
        };
        Self { db, config, states: MarketStates::default(), clock: system_clock(), producers: EventProducers::default() }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn config(&self) -> &VolatilityConfig {
        &self.config
    }

    /// A read handle that stays live as the monitor ticks.
    pub fn states(&self) -> MarketStates {
        self.states.clone()
    }

    /// Marks every monitored currency as normal.
    pub fn init(&self) {
        let now = self.clock.now();
        for currency in &self.config.monitored_currencies {
            self.states.replace(currency, VolatilityState::normal(now));
        }
        info!(
            "📈️ Volatility monitor initialised for {} against {}",
            self.config.monitored_currencies.join(", "),
            self.config.reference_currency
        );
    }

    pub fn is_volatile(&self, currency: &str) -> bool {
        self.states.is_volatile(currency)
    }

    pub fn is_frozen(&self, currency: &str) -> bool {
        self.states.is_frozen(currency)
    }

    pub fn state(&self, currency: &str) -> Option<VolatilityState> {
        self.states.state(currency)
    }
}

impl<B> VolatilityMonitor<B>
where B: RateStore
{
    /// Re-evaluates every monitored currency. A failure for one currency leaves its state untouched and does not
    /// affect the others.
    pub async fn tick(&self) {
        let now = self.clock.now();
        for currency in &self.config.monitored_currencies {
            let prev = match self.states.current(currency) {
                Some(s) => s,
                None => Arc::new(VolatilityState::normal(now)),
            };
            match self.evaluate(currency, &prev, now).await {
                Ok(next) => self.commit(currency, &prev, next).await,
                Err(e) => warn!("📈️ Could not evaluate the {currency} market this tick. {e}"),
            }
        }
    }

    async fn evaluate(
        &self,
        currency: &str,
        prev: &VolatilityState,
        now: DateTime<Utc>,
    ) -> Result<VolatilityState, RateStoreError> {
        let reference = &self.config.reference_currency;
        let latest = self.db.fetch_latest(currency, reference).await?;
        let is_fresh = latest.as_ref().map(|r| now - r.updated_at <= self.config.stale_threshold).unwrap_or(false);
        if !is_fresh {
            trace!("📈️ {currency}/{reference} has no fresh observation");
            return Ok(VolatilityState { is_stale: true, last_updated: now, ..prev.clone() });
        }
        let window = self.db.fetch_rates_in_window(currency, reference, now - self.config.window, now).await?;
        if window.is_empty() {
            trace!("📈️ No {currency}/{reference} activity in the window. Keeping the previous classification");
        }
        Ok(classify(prev, &window, &self.config, now))
    }

    async fn commit(&self, currency: &str, prev: &VolatilityState, next: VolatilityState) {
        let changed = prev.label() != next.label();
        if changed {
            info!(
                "📈️ {currency} market is now {} (was {}). Drop {}% from {:?}",
                next.label(),
                prev.label(),
                next.current_drop_pct.round_dp(2),
                next.max_price_in_window
            );
        }
        let frozen_flipped = prev.is_frozen() != next.is_frozen();
        let event = frozen_flipped.then(|| MarketStateChangedEvent::new(currency, prev.clone(), next.clone()));
        self.states.replace(currency, next);
        if let Some(event) = event {
            self.producers.publish_market_state_changed(event).await;
        }
    }
}
