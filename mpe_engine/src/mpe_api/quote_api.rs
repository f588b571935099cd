use std::fmt::Debug;

use log::*;
use rust_decimal::Decimal;

use crate::{
    mpe_api::{
        converter::{ConversionResult, CurrencyConverter},
        errors::QuoteError,
        volatility::MarketStates,
    },
    traits::RateStore,
};

/// Prices an amount in another currency, but only while both markets are trading normally.
pub struct QuoteApi<B> {
    converter: CurrencyConverter<B>,
    markets: MarketStates,
}

impl<B> Debug for QuoteApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QuoteApi")
    }
}

impl<B> QuoteApi<B>
where B: RateStore
{
    pub fn new(converter: CurrencyConverter<B>, markets: MarketStates) -> Self {
        Self { converter, markets }
    }

    pub async fn quote(&self, amount: Decimal, from: &str, to: &str) -> Result<ConversionResult, QuoteError> {
        for currency in [from, to] {
            if self.markets.is_frozen(currency) {
                info!("💱️ Refusing to quote {amount} {from} in {to}. The {currency} market is frozen");
                return Err(QuoteError::MarketFrozen(currency.to_ascii_uppercase()));
            }
        }
        Ok(self.converter.convert(amount, from, to).await?)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::Utc;
    use mpe_common::CurrencyTable;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        clock::ManualClock,
        db::memory::MemoryDatabase,
        db_types::NewExchangeRate,
        mpe_api::volatility::{VolatilityConfig, VolatilityMonitor},
    };

    #[tokio::test]
    async fn stale_markets_cannot_be_quoted() {
        let db = MemoryDatabase::new();
        db.insert_rate(NewExchangeRate::new("YEC", "PLN", dec!(4), "test")).await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = VolatilityConfig { monitored_currencies: vec!["YEC".into()], ..Default::default() };
        let monitor = VolatilityMonitor::new(db.clone(), config).with_clock(clock);
        monitor.init();
        let api = QuoteApi::new(CurrencyConverter::new(db.clone(), CurrencyTable::default()), monitor.states());

        let quote = api.quote(dec!(1), "YEC", "PLN").await.unwrap();
        assert_eq!(quote.amount, dec!(4));

        // there is no YEC/USDT rate, so the next tick marks YEC as stale
        monitor.tick().await;
        let err = api.quote(dec!(1), "PLN", "yec").await.unwrap_err();
        assert!(matches!(err, QuoteError::MarketFrozen(c) if c == "YEC"));
    }
}
