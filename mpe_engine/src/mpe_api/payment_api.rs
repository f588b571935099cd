use std::fmt::Debug;

use chrono::Utc;
use log::*;
use rust_decimal::Decimal;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    events::{EventProducers, PaymentStatusChangedEvent},
    mpe_api::errors::PaymentApiError,
    traits::PaymentStore,
};

/// `PaymentApi` is how the purchase workflow creates payments and applies the terminal transitions that happen outside
/// the payment monitor (cancellation and hard timeouts).
pub struct PaymentApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi")
    }
}

impl<B> PaymentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PaymentApi<B>
where B: PaymentStore
{
    pub async fn create_payment(&self, payment: NewPayment) -> Result<Payment, PaymentApiError> {
        if payment.amount <= Decimal::ZERO {
            return Err(PaymentApiError::InvalidAmount(payment.amount));
        }
        if payment.memo.trim().is_empty() {
            return Err(PaymentApiError::MissingMemo);
        }
        if payment.receiving_address.trim().is_empty() {
            return Err(PaymentApiError::MissingAddress);
        }
        let payment = self.db.insert_payment(payment).await?;
        info!(
            "💰️ New payment #{} for purchase {}: {} {}",
            payment.id, payment.purchase_id, payment.amount, payment.payment_method
        );
        Ok(payment)
    }

    pub async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, PaymentApiError> {
        Ok(self.db.fetch_payment(id).await?)
    }

    /// Payments still awaiting confirmation for the given payment method, oldest first.
    pub async fn pending_payments(&self, payment_method: &str) -> Result<Vec<Payment>, PaymentApiError> {
        let method = payment_method.to_ascii_uppercase();
        let payments = self.db.fetch_payments_by_status(PaymentStatus::AwaitingConfirmation).await?;
        Ok(payments.into_iter().filter(|p| p.payment_method == method).collect())
    }

    pub async fn cancel_payment(&self, id: i64) -> Result<Payment, PaymentApiError> {
        self.close_payment(id, PaymentStatus::Cancelled).await
    }

    /// Marks a payment as having hit its hard timeout. This is a manual intervention; the monitor only ever applies
    /// soft timeouts.
    pub async fn expire_payment(&self, id: i64) -> Result<Payment, PaymentApiError> {
        self.close_payment(id, PaymentStatus::FailedHardTimeout).await
    }

    async fn close_payment(&self, id: i64, status: PaymentStatus) -> Result<Payment, PaymentApiError> {
        let payment = self.db.fetch_payment(id).await?.ok_or(PaymentApiError::PaymentNotFound(id))?;
        if payment.status.is_terminal() {
            return Err(PaymentApiError::AlreadyClosed { id, status: payment.status });
        }
        let old_status = payment.status;
        let updated = Payment { status, updated_at: Utc::now(), ..payment };
        let saved = self.db.save_payment(&updated).await?;
        info!("💰️ Payment #{id} for purchase {} is now {status}", saved.purchase_id);
        self.producers.publish_payment_status_changed(PaymentStatusChangedEvent::new(old_status, &saved)).await;
        Ok(saved)
    }
}
