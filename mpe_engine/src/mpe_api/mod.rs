//! # Payment engine public API
//!
//! The `mpe_api` module exposes the programmatic API of the engine. Each part only needs the backend traits it uses, so
//! clients can pick the pieces they need and back them with whatever store suits them.
//!
//! * [`converter`] converts amounts between currencies along the shortest path of stored market rates.
//! * [`volatility`] classifies each monitored market as normal, volatile or stale, and exposes the gating predicate
//!   [`volatility::MarketStates::is_frozen`].
//! * [`payment_monitor`] reconciles pending payments against the transactions a chain node has received.
//! * [`exchange_rate_api`], [`payment_api`], [`quote_api`] and [`address_api`] are thin facades for the common
//!   operations around those components.
//!
//! # API usage
//!
//! An API instance is created by supplying a backend that implements the traits the API needs:
//!
//! ```rust,ignore
//! use mpe_engine::{CurrencyConverter, SqliteDatabase};
//! use mpe_common::CurrencyTable;
//! let db = SqliteDatabase::new_with_url("sqlite://data/mpe_store.db", 5).await?;
//! let converter = CurrencyConverter::new(db, CurrencyTable::default());
//! let result = converter.convert(dec!(2), "YEC", "PLN").await?;
//! ```
pub mod address_api;
pub mod converter;
pub mod errors;
pub mod exchange_rate_api;
pub mod payment_api;
pub mod payment_monitor;
pub mod quote_api;
pub mod volatility;
