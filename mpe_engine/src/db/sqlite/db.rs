use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{db_url, exchange_rates, new_pool, payments, SqliteDatabaseError};
use crate::{
    db_types::{ExchangeRate, NewExchangeRate, NewPayment, Payment, PaymentStatus},
    traits::{PaymentStore, PaymentStoreError, RateStore, RateStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the `MPE_DATABASE_URL` environment variable, or the default URL.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

impl RateStore for SqliteDatabase {
    async fn fetch_all_latest(&self) -> Result<Vec<ExchangeRate>, RateStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let rates = exchange_rates::fetch_all_latest(&mut conn).await?;
        trace!("🗃️ Fetched {} latest exchange rates", rates.len());
        Ok(rates)
    }

    async fn fetch_latest(&self, base: &str, quote: &str) -> Result<Option<ExchangeRate>, RateStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let rate = exchange_rates::fetch_latest(base, quote, &mut conn).await?;
        Ok(rate)
    }

    async fn fetch_rates_in_window(
        &self,
        base: &str,
        quote: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRate>, RateStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let rates = exchange_rates::fetch_rates_in_window(base, quote, from, to, &mut conn).await?;
        Ok(rates)
    }

    async fn insert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate, RateStoreError> {
        rate.validate()?;
        let mut tx = self.pool.begin().await.map_err(SqliteDatabaseError::from)?;
        let rate = exchange_rates::insert_rate(&rate, &mut tx).await?;
        tx.commit().await.map_err(SqliteDatabaseError::from)?;
        debug!("🗃️ Exchange rate #{} saved: {rate}", rate.id);
        Ok(rate)
    }
}

impl PaymentStore for SqliteDatabase {
    async fn fetch_payments_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let payments = payments::fetch_payments_by_status(status, &mut conn).await?;
        Ok(payments)
    }

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let payment = payments::fetch_payment(id, &mut conn).await?;
        Ok(payment)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentStoreError> {
        let mut tx = self.pool.begin().await.map_err(SqliteDatabaseError::from)?;
        let payment = payments::insert_payment(&payment, Utc::now(), &mut tx).await?;
        tx.commit().await.map_err(SqliteDatabaseError::from)?;
        debug!("🗃️ {payment} saved");
        Ok(payment)
    }

    async fn save_payment(&self, payment: &Payment) -> Result<Payment, PaymentStoreError> {
        let mut tx = self.pool.begin().await.map_err(SqliteDatabaseError::from)?;
        let payment = payments::upsert_payment(payment, &mut tx).await?;
        tx.commit().await.map_err(SqliteDatabaseError::from)?;
        trace!("🗃️ {payment} updated");
        Ok(payment)
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    async fn memory_db() -> SqliteDatabase {
        let _ = env_logger::try_init();
        let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating database");
        db.run_migrations().await.expect("Error running migrations");
        db
    }

    #[tokio::test]
    async fn latest_rates_collapse_pairs_and_break_ties_by_insert_order() {
        let db = memory_db().await;
        let now = Utc::now();
        let earlier = now - Duration::minutes(10);
        db.insert_rate(NewExchangeRate::new("YEC", "USDT", dec!(1.4), "a").at(earlier)).await.unwrap();
        db.insert_rate(NewExchangeRate::new("USDT", "YEC", dec!(0.66), "b").at(now)).await.unwrap();
        db.insert_rate(NewExchangeRate::new("USD", "PLN", dec!(4.01), "a").at(now)).await.unwrap();
        db.insert_rate(NewExchangeRate::new("USD", "PLN", dec!(4.02), "b").at(now)).await.unwrap();

        let latest = db.fetch_all_latest().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!((latest[0].base_currency.as_str(), latest[0].rate), ("USD", dec!(4.02)));
        assert_eq!((latest[1].base_currency.as_str(), latest[1].rate), ("USDT", dec!(0.66)));

        let exact = db.fetch_latest("YEC", "USDT").await.unwrap().expect("rate exists");
        assert_eq!(exact.rate, dec!(1.4));
        assert!(db.fetch_latest("YEC", "PLN").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn window_queries_are_bounded_and_newest_first() {
        let db = memory_db().await;
        let now = Utc::now();
        for (mins, rate) in [(90, dec!(10)), (30, dec!(9.8)), (5, dec!(9.4))] {
            let obs = NewExchangeRate::new("YEC", "USDT", rate, "feed").at(now - Duration::minutes(mins));
            db.insert_rate(obs).await.unwrap();
        }
        let window = db.fetch_rates_in_window("YEC", "USDT", now - Duration::hours(1), now).await.unwrap();
        let rates = window.iter().map(|r| r.rate).collect::<Vec<_>>();
        assert_eq!(rates, vec![dec!(9.4), dec!(9.8)]);
    }

    #[tokio::test]
    async fn invalid_rates_are_rejected() {
        let db = memory_db().await;
        let err = db.insert_rate(NewExchangeRate::new("YEC", "USDT", dec!(0), "feed")).await.unwrap_err();
        assert!(matches!(err, RateStoreError::InvalidRate(_)));
        assert!(db.fetch_all_latest().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn payments_insert_and_upsert() {
        let db = memory_db().await;
        let deadline = Utc::now() + Duration::hours(1);
        let new_payment = NewPayment::new("purchase-1", dec!(2.5), "yec", deadline)
            .with_parties("alice", "bob")
            .with_memo("memo-1")
            .with_address("ys1address");
        let mut payment = db.insert_payment(new_payment).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::AwaitingConfirmation);
        assert_eq!(payment.paid_amount, Decimal::ZERO);
        assert_eq!(payment.payment_method, "YEC");

        payment.paid_amount = dec!(1.25);
        let saved = db.save_payment(&payment).await.unwrap();
        assert_eq!(saved.paid_amount, dec!(1.25));
        assert_eq!(db.fetch_payments_by_status(PaymentStatus::AwaitingConfirmation).await.unwrap().len(), 1);

        payment.status = PaymentStatus::Complete;
        db.save_payment(&payment).await.unwrap();
        assert!(db.fetch_payments_by_status(PaymentStatus::AwaitingConfirmation).await.unwrap().is_empty());
        let stored = db.fetch_payment(payment.id).await.unwrap().expect("payment exists");
        assert_eq!(stored.status, PaymentStatus::Complete);
        assert!(db.fetch_payment(payment.id + 1).await.unwrap().is_none());
    }
}
