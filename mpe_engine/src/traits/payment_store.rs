use thiserror::Error;

use crate::db_types::{NewPayment, Payment, PaymentStatus};

#[derive(Debug, Clone, Error)]
pub enum PaymentStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment #{0} does not exist")]
    PaymentNotFound(i64),
    #[error("Stored payment #{0} is corrupt: {1}")]
    CorruptRecord(i64, String),
}

#[allow(async_fn_in_trait)]
pub trait PaymentStore {
    /// Every payment currently in `status`, in ascending id order.
    async fn fetch_payments_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, PaymentStoreError>;

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, PaymentStoreError>;

    /// Stores a brand-new payment in `AWAITING_CONFIRMATION` with nothing paid.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentStoreError>;

    /// Upserts the payment by id and returns the stored record.
    async fn save_payment(&self, payment: &Payment) -> Result<Payment, PaymentStoreError>;
}
