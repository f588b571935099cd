use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use chrono::{DateTime, Utc};
use log::*;
use parking_lot::RwLock;

use crate::{
    db_types::{ExchangeRate, NewExchangeRate, NewPayment, Payment, PaymentStatus},
    helpers::latest_per_pair,
    traits::{PaymentStore, PaymentStoreError, RateStore, RateStoreError},
};

#[derive(Default)]
struct Tables {
    rates: Vec<ExchangeRate>,
    payments: BTreeMap<i64, Payment>,
    next_rate_id: i64,
    next_payment_id: i64,
}

/// An in-process store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl Debug for MemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        write!(f, "MemoryDatabase ({} rates, {} payments)", tables.rates.len(), tables.payments.len())
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_payments(&self) -> Vec<Payment> {
        self.tables.read().payments.values().cloned().collect()
    }
}

impl RateStore for MemoryDatabase {
    async fn fetch_all_latest(&self) -> Result<Vec<ExchangeRate>, RateStoreError> {
        let rates = self.tables.read().rates.clone();
        Ok(latest_per_pair(rates))
    }

    async fn fetch_latest(&self, base: &str, quote: &str) -> Result<Option<ExchangeRate>, RateStoreError> {
        let tables = self.tables.read();
        let latest = tables
            .rates
            .iter()
            .filter(|r| r.base_currency == base && r.quote_currency == quote)
            .max_by_key(|r| (r.updated_at, r.id))
            .cloned();
        Ok(latest)
    }

    async fn fetch_rates_in_window(
        &self,
        base: &str,
        quote: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRate>, RateStoreError> {
        let tables = self.tables.read();
        let mut rates = tables
            .rates
            .iter()
            .filter(|r| r.base_currency == base && r.quote_currency == quote)
            .filter(|r| r.updated_at >= from && r.updated_at <= to)
            .cloned()
            .collect::<Vec<_>>();
        rates.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
        Ok(rates)
    }

    async fn insert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate, RateStoreError> {
        rate.validate()?;
        let mut tables = self.tables.write();
        tables.next_rate_id += 1;
        let rate = rate.into_exchange_rate(tables.next_rate_id);
        trace!("🗃️ Exchange rate #{} stored in memory: {rate}", rate.id);
        tables.rates.push(rate.clone());
        Ok(rate)
    }
}

impl PaymentStore for MemoryDatabase {
    async fn fetch_payments_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, PaymentStoreError> {
        let tables = self.tables.read();
        Ok(tables.payments.values().filter(|p| p.status == status).cloned().collect())
    }

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, PaymentStoreError> {
        Ok(self.tables.read().payments.get(&id).cloned())
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentStoreError> {
        let mut tables = self.tables.write();
        tables.next_payment_id += 1;
        let payment = payment.into_payment(tables.next_payment_id, Utc::now());
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn save_payment(&self, payment: &Payment) -> Result<Payment, PaymentStoreError> {
        let mut tables = self.tables.write();
        tables.next_payment_id = tables.next_payment_id.max(payment.id);
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment.clone())
    }
}
