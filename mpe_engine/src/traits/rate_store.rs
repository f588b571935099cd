use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{ExchangeRate, InvalidRateError, NewExchangeRate};

#[derive(Debug, Clone, Error)]
pub enum RateStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Refusing to store an invalid exchange rate. {0}")]
    InvalidRate(#[from] InvalidRateError),
    #[error("Stored exchange rate #{0} is corrupt: {1}")]
    CorruptRecord(i64, String),
}

#[allow(async_fn_in_trait)]
pub trait RateStore {
    /// The most recent observation for every currency pair, where `A/B` and `B/A` count as the same pair.
    ///
    /// Ties on `updated_at` are broken in favour of the most recently inserted record.
    async fn fetch_all_latest(&self) -> Result<Vec<ExchangeRate>, RateStoreError>;

    /// The most recent observation for exactly `base/quote`, if there is one.
    async fn fetch_latest(&self, base: &str, quote: &str) -> Result<Option<ExchangeRate>, RateStoreError>;

    /// Every `base/quote` observation with `from <= updated_at <= to`, newest first.
    async fn fetch_rates_in_window(
        &self,
        base: &str,
        quote: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRate>, RateStoreError>;

    /// Validates and stores a new observation, returning the stored record.
    async fn insert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate, RateStoreError>;
}
