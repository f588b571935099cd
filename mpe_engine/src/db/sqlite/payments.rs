use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewPayment, Payment, PaymentStatus},
};

#[derive(Debug, Clone, FromRow)]
struct PaymentRow {
    id: i64,
    purchase_id: String,
    buyer_id: String,
    seller_id: String,
    amount: String,
    paid_amount: String,
    status: String,
    payment_method: String,
    memo: String,
    deadline: DateTime<Utc>,
    receiving_address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_decimal(id: i64, field: &str, value: &str) -> Result<Decimal, SqliteDatabaseError> {
    Decimal::from_str(value).map_err(|e| SqliteDatabaseError::CorruptRecord(id, format!("{field} '{value}': {e}")))
}

impl TryFrom<PaymentRow> for Payment {
    type Error = SqliteDatabaseError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let amount = parse_decimal(row.id, "amount", &row.amount)?;
        let paid_amount = parse_decimal(row.id, "paid_amount", &row.paid_amount)?;
        let status = PaymentStatus::from_str(&row.status)
            .map_err(|e| SqliteDatabaseError::CorruptRecord(row.id, e.to_string()))?;
        Ok(Payment {
            id: row.id,
            purchase_id: row.purchase_id,
            buyer_id: row.buyer_id,
            seller_id: row.seller_id,
            amount,
            paid_amount,
            status,
            payment_method: row.payment_method,
            memo: row.memo,
            deadline: row.deadline,
            receiving_address: row.receiving_address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Writes with a RETURNING clause are drained with `fetch_all` so that the statement runs to completion before the
// connection goes back to the pool.
pub async fn insert_payment(
    payment: &NewPayment,
    created_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Payment, SqliteDatabaseError> {
    let rows: Vec<PaymentRow> = sqlx::query_as(
        r#"INSERT INTO payments (purchase_id, buyer_id, seller_id, amount, paid_amount, status, payment_method, memo,
            deadline, receiving_address, created_at, updated_at)
        VALUES ($1, $2, $3, $4, '0', $5, $6, $7, $8, $9, $10, $11)
        RETURNING *"#,
    )
    .bind(&payment.purchase_id)
    .bind(&payment.buyer_id)
    .bind(&payment.seller_id)
    .bind(payment.amount.normalize().to_string())
    .bind(PaymentStatus::AwaitingConfirmation.to_string())
    .bind(&payment.payment_method)
    .bind(&payment.memo)
    .bind(payment.deadline)
    .bind(&payment.receiving_address)
    .bind(created_at)
    .bind(created_at)
    .fetch_all(conn)
    .await?;
    let row = rows.into_iter().next().ok_or(sqlx::Error::RowNotFound)?;
    Payment::try_from(row)
}

/// Inserts or replaces the payment with the same id.
pub async fn upsert_payment(payment: &Payment, conn: &mut SqliteConnection) -> Result<Payment, SqliteDatabaseError> {
    let rows: Vec<PaymentRow> = sqlx::query_as(
        r#"INSERT INTO payments (id, purchase_id, buyer_id, seller_id, amount, paid_amount, status, payment_method,
            memo, deadline, receiving_address, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT(id) DO UPDATE SET
            purchase_id = excluded.purchase_id,
            buyer_id = excluded.buyer_id,
            seller_id = excluded.seller_id,
            amount = excluded.amount,
            paid_amount = excluded.paid_amount,
            status = excluded.status,
            payment_method = excluded.payment_method,
            memo = excluded.memo,
            deadline = excluded.deadline,
            receiving_address = excluded.receiving_address,
            updated_at = excluded.updated_at
        RETURNING *"#,
    )
    .bind(payment.id)
    .bind(&payment.purchase_id)
    .bind(&payment.buyer_id)
    .bind(&payment.seller_id)
    .bind(payment.amount.normalize().to_string())
    .bind(payment.paid_amount.normalize().to_string())
    .bind(payment.status.to_string())
    .bind(&payment.payment_method)
    .bind(&payment.memo)
    .bind(payment.deadline)
    .bind(&payment.receiving_address)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .fetch_all(conn)
    .await?;
    let row = rows.into_iter().next().ok_or(sqlx::Error::RowNotFound)?;
    Payment::try_from(row)
}

pub async fn fetch_payment(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, SqliteDatabaseError> {
    let row: Option<PaymentRow> =
        sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await?;
    row.map(Payment::try_from).transpose()
}

pub async fn fetch_payments_by_status(
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, SqliteDatabaseError> {
    let rows: Vec<PaymentRow> = sqlx::query_as("SELECT * FROM payments WHERE status = $1 ORDER BY id")
        .bind(status.to_string())
        .fetch_all(conn)
        .await?;
    rows.into_iter().map(Payment::try_from).collect()
}
