use thiserror::Error;

use crate::traits::{PaymentStoreError, RateStoreError};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Record #{0} could not be decoded: {1}")]
    CorruptRecord(i64, String),
    #[error("Payment #{0} does not exist")]
    PaymentNotFound(i64),
}

impl From<SqliteDatabaseError> for RateStoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::CorruptRecord(id, msg) => RateStoreError::CorruptRecord(id, msg),
            e => RateStoreError::DatabaseError(e.to_string()),
        }
    }
}

impl From<SqliteDatabaseError> for PaymentStoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::CorruptRecord(id, msg) => PaymentStoreError::CorruptRecord(id, msg),
            SqliteDatabaseError::PaymentNotFound(id) => PaymentStoreError::PaymentNotFound(id),
            e => PaymentStoreError::DatabaseError(e.to_string()),
        }
    }
}
