//! Recording and reading market rate observations.
//!
//! Price providers and operator tools write through [`ExchangeRateApi::record_rate`]; everything else only reads.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{ExchangeRate, NewExchangeRate},
    mpe_api::errors::ExchangeRateApiError,
    traits::RateStore,
};

pub struct ExchangeRateApi<B> {
    db: B,
}

impl<B> Debug for ExchangeRateApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeRateApi")
    }
}

impl<B> ExchangeRateApi<B>
where B: RateStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn record_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate, ExchangeRateApiError> {
        rate.validate()?;
        let rate = self.db.insert_rate(rate).await?;
        debug!("💱️ Recorded exchange rate #{}: {rate}", rate.id);
        Ok(rate)
    }

    /// The newest observation for exactly this direction, if any.
    pub async fn latest_rate(&self, base: &str, quote: &str) -> Result<Option<ExchangeRate>, ExchangeRateApiError> {
        let rate = self.db.fetch_latest(&base.to_ascii_uppercase(), &quote.to_ascii_uppercase()).await?;
        Ok(rate)
    }

    /// The newest observation for every currency pair, regardless of direction.
    pub async fn latest_rates(&self) -> Result<Vec<ExchangeRate>, ExchangeRateApiError> {
        Ok(self.db.fetch_all_latest().await?)
    }
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{db::memory::MemoryDatabase, db_types::InvalidRateError};

    #[tokio::test]
    async fn record_and_read() {
        let api = ExchangeRateApi::new(MemoryDatabase::new());
        api.record_rate(NewExchangeRate::new("yec", "usdt", dec!(1.5), "test")).await.unwrap();
        let err = api.record_rate(NewExchangeRate::new("YEC", "USDT", dec!(0), "test")).await.unwrap_err();
        assert!(matches!(err, ExchangeRateApiError::InvalidRate(InvalidRateError::NotPositive(..))));
        let latest = api.latest_rate("yec", "usdt").await.unwrap().unwrap();
        assert_eq!(latest.rate, dec!(1.5));
        assert!(api.latest_rate("USDT", "YEC").await.unwrap().is_none());
        assert_eq!(api.latest_rates().await.unwrap().len(), 1);
    }
}
