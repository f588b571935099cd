//! # Backend contracts
//!
//! This module defines the behaviour the engine needs from its collaborators. The engine never talks to a database or
//! a chain node directly; instead it is handed something that implements one of these traits.
//!
//! * [`RateStore`] persists timestamped exchange-rate observations and answers "latest per pair", "latest for one
//!   pair" and "rates in a window" queries.
//! * [`PaymentStore`] persists settlement payments keyed by id.
//! * [`ChainClient`] wraps the RPC interface of a cryptocurrency node. There is one implementation per supported chain
//!   family.
//!
//! [`SqliteDatabase`](crate::SqliteDatabase) and [`MemoryDatabase`](crate::MemoryDatabase) both implement the two
//! store traits.
mod chain_client;
mod payment_store;
mod rate_store;

pub use chain_client::{ChainClient, ChainClientError, RescanPolicy, RPC_INVALID_ADDRESS_OR_KEY};
pub use payment_store::{PaymentStore, PaymentStoreError};
pub use rate_store::{RateStore, RateStoreError};
