use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{ExchangeRate, NewExchangeRate},
};

#[derive(Debug, Clone, FromRow)]
struct ExchangeRateRow {
    id: i64,
    base_currency: String,
    quote_currency: String,
    rate: String,
    updated_at: DateTime<Utc>,
    source: String,
    is_volatile: bool,
}

impl TryFrom<ExchangeRateRow> for ExchangeRate {
    type Error = SqliteDatabaseError;

    fn try_from(row: ExchangeRateRow) -> Result<Self, Self::Error> {
        let rate = Decimal::from_str(&row.rate)
            .map_err(|e| SqliteDatabaseError::CorruptRecord(row.id, format!("rate '{}': {e}", row.rate)))?;
        Ok(ExchangeRate {
            id: row.id,
            base_currency: row.base_currency,
            quote_currency: row.quote_currency,
            rate,
            updated_at: row.updated_at,
            source: row.source,
            is_volatile: row.is_volatile,
        })
    }
}

fn decode_all(rows: Vec<ExchangeRateRow>) -> Result<Vec<ExchangeRate>, SqliteDatabaseError> {
    rows.into_iter().map(ExchangeRate::try_from).collect()
}

pub async fn insert_rate(
    rate: &NewExchangeRate,
    conn: &mut SqliteConnection,
) -> Result<ExchangeRate, SqliteDatabaseError> {
    let rows: Vec<ExchangeRateRow> = sqlx::query_as(
        r#"INSERT INTO exchange_rates (base_currency, quote_currency, rate, updated_at, source, is_volatile)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *"#,
    )
    .bind(&rate.base_currency)
    .bind(&rate.quote_currency)
    .bind(rate.rate.normalize().to_string())
    .bind(rate.updated_at)
    .bind(&rate.source)
    .bind(rate.is_volatile)
    .fetch_all(conn)
    .await?;
    let row = rows.into_iter().next().ok_or(sqlx::Error::RowNotFound)?;
    ExchangeRate::try_from(row)
}

pub async fn fetch_latest(
    base: &str,
    quote: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ExchangeRate>, SqliteDatabaseError> {
    let row: Option<ExchangeRateRow> = sqlx::query_as(
        r#"SELECT * FROM exchange_rates
        WHERE base_currency = $1 AND quote_currency = $2
        ORDER BY updated_at DESC, id DESC LIMIT 1"#,
    )
    .bind(base)
    .bind(quote)
    .fetch_optional(conn)
    .await?;
    row.map(ExchangeRate::try_from).transpose()
}

/// One row per unordered pair. Ties on `updated_at` go to the highest id.
pub async fn fetch_all_latest(conn: &mut SqliteConnection) -> Result<Vec<ExchangeRate>, SqliteDatabaseError> {
    let rows: Vec<ExchangeRateRow> = sqlx::query_as(
        r#"SELECT r.* FROM exchange_rates r
        WHERE r.id = (
            SELECT r2.id FROM exchange_rates r2
            WHERE (r2.base_currency = r.base_currency AND r2.quote_currency = r.quote_currency)
               OR (r2.base_currency = r.quote_currency AND r2.quote_currency = r.base_currency)
            ORDER BY r2.updated_at DESC, r2.id DESC
            LIMIT 1
        )
        ORDER BY r.base_currency, r.quote_currency"#,
    )
    .fetch_all(conn)
    .await?;
    decode_all(rows)
}

pub async fn fetch_rates_in_window(
    base: &str,
    quote: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<ExchangeRate>, SqliteDatabaseError> {
    let rows: Vec<ExchangeRateRow> = sqlx::query_as(
        r#"SELECT * FROM exchange_rates
        WHERE base_currency = $1 AND quote_currency = $2 AND updated_at >= $3 AND updated_at <= $4
        ORDER BY updated_at DESC, id DESC"#,
    )
    .bind(base)
    .bind(quote)
    .bind(from)
    .bind(to)
    .fetch_all(conn)
    .await?;
    decode_all(rows)
}
