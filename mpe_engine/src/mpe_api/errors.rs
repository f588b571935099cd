use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    db_types::{InvalidRateError, PaymentStatus},
    mpe_api::converter::ConversionError,
    traits::{PaymentStoreError, RateStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum ExchangeRateApiError {
    #[error("Invalid exchange rate. {0}")]
    InvalidRate(#[from] InvalidRateError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] RateStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum PaymentApiError {
    #[error("Payment amount must be positive, but was {0}")]
    InvalidAmount(Decimal),
    #[error("A payment needs a memo to be matched against on-chain transactions")]
    MissingMemo,
    #[error("A payment needs a receiving address")]
    MissingAddress,
    #[error("Payment #{0} does not exist")]
    PaymentNotFound(i64),
    #[error("Payment #{id} is already {status} and cannot be changed")]
    AlreadyClosed { id: i64, status: PaymentStatus },
    #[error("Database error: {0}")]
    DatabaseError(#[from] PaymentStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum QuoteError {
    #[error("The {0} market is frozen. Quotes are unavailable until it stabilises")]
    MarketFrozen(String),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressImportError {
    #[error("The node rejected the viewing key. {0}")]
    InvalidViewingKey(String),
    #[error("The node is unavailable. {0}")]
    NodeUnavailable(String),
    #[error("The node returned error {code}: {message}")]
    NodeError { code: i64, message: String },
    #[error("The node returned an unexpected response. {0}")]
    InvalidResponse(String),
}
