//! Marketplace Payment Engine
//!
//! This library contains the core logic for pricing and settling marketplace purchases in cryptocurrency. It is
//! provider-agnostic: price feeds, chain nodes and storage all plug in through the traits in [`mod@traits`].
//!
//! The library is divided into these main sections:
//! 1. Storage ([`mod@db`]). SQLite and an in-process memory store are the supported backends. Neither needs to be
//!    accessed directly; use the public API instead. The data types used by the stores live in [`mod@db_types`].
//! 2. The public API ([`mod@mpe_api`]). This holds the currency converter, the market volatility monitor, the payment
//!    monitor and facades for recording rates, creating payments, quoting prices and importing viewing keys.
//!
//! The engine also emits events when payments change status and when a market freezes or thaws. A simple channel-based
//! hook system lets you react to these events, e.g. to fulfil a purchase once its payment completes.
pub mod clock;
pub mod db;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod mpe_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use db::memory::MemoryDatabase;
#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use mpe_api::{
    address_api::AddressApi,
    converter::{ConversionError, ConversionResult, ConversionStep, CurrencyConverter},
    errors::{AddressImportError, ExchangeRateApiError, PaymentApiError, QuoteError},
    exchange_rate_api::ExchangeRateApi,
    payment_api::PaymentApi,
    payment_monitor::{ChainSettings, PaymentMonitor, ReconcileError, TickSummary},
    quote_api::QuoteApi,
    volatility::{MarketStates, VolatilityConfig, VolatilityMonitor, VolatilityState},
};
pub use traits::{ChainClient, ChainClientError, PaymentStore, PaymentStoreError, RateStore, RateStoreError, RescanPolicy};
