//! # Marketplace payment engine daemon
//!
//! This crate hosts the long-running side of the payment engine. It is responsible for:
//! * Keeping the volatility classification of every monitored market up to date.
//! * Reconciling pending payments against each configured chain node.
//! * Forwarding payment status changes to the purchase workflow.
//!
//! ## Configuration
//! The daemon is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod errors;
pub mod integrations;
pub mod server;
pub mod workers;
