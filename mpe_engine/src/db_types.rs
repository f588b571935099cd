use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------     ExchangeRate      ---------------------------------------------------------
/// A single stored market-rate observation: one unit of `base_currency` buys `rate` units of `quote_currency`.
///
/// Observations are immutable. A newer price is a new record, never an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: i64,
    pub base_currency: String,
    pub quote_currency: String,
    pub rate: Decimal,
    pub updated_at: DateTime<Utc>,
    /// The name of the price provider that produced the observation
    pub source: String,
    /// Volatility flag carried over from the provider at observation time
    pub is_volatile: bool,
}

impl ExchangeRate {
    /// True if this observation links `a` and `b`, in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.base_currency == a && self.quote_currency == b) || (self.base_currency == b && self.quote_currency == a)
    }

    /// The unordered pair key, lexicographically sorted, used to collapse observations in both directions.
    pub fn pair_key(&self) -> (String, String) {
        if self.base_currency <= self.quote_currency {
            (self.base_currency.clone(), self.quote_currency.clone())
        } else {
            (self.quote_currency.clone(), self.base_currency.clone())
        }
    }
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1 {} => {} {} ({})", self.base_currency, self.rate, self.quote_currency, self.source)
    }
}

//--------------------------------------    NewExchangeRate    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExchangeRate {
    pub base_currency: String,
    pub quote_currency: String,
    pub rate: Decimal,
    pub updated_at: DateTime<Utc>,
    pub source: String,
    pub is_volatile: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidRateError {
    #[error("Exchange rate for {0}/{1} must be positive, but was {2}")]
    NotPositive(String, String, Decimal),
    #[error("Cannot record an exchange rate of {0} against itself")]
    SameCurrency(String),
    #[error("Currency codes cannot be empty")]
    EmptyCurrency,
}

impl NewExchangeRate {
    pub fn new(base: &str, quote: &str, rate: Decimal, source: &str) -> Self {
        Self {
            base_currency: base.to_ascii_uppercase(),
            quote_currency: quote.to_ascii_uppercase(),
            rate,
            updated_at: Utc::now(),
            source: source.to_string(),
            is_volatile: false,
        }
    }

    pub fn at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn volatile(mut self, is_volatile: bool) -> Self {
        self.is_volatile = is_volatile;
        self
    }

    pub fn validate(&self) -> Result<(), InvalidRateError> {
        if self.base_currency.is_empty() || self.quote_currency.is_empty() {
            return Err(InvalidRateError::EmptyCurrency);
        }
        if self.base_currency == self.quote_currency {
            return Err(InvalidRateError::SameCurrency(self.base_currency.clone()));
        }
        if self.rate <= Decimal::ZERO {
            return Err(InvalidRateError::NotPositive(
                self.base_currency.clone(),
                self.quote_currency.clone(),
                self.rate,
            ));
        }
        Ok(())
    }

    pub fn into_exchange_rate(self, id: i64) -> ExchangeRate {
        ExchangeRate {
            id,
            base_currency: self.base_currency,
            quote_currency: self.quote_currency,
            rate: self.rate,
            updated_at: self.updated_at,
            source: self.source,
            is_volatile: self.is_volatile,
        }
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// The payment has been created and the engine is watching the chain for matching transactions.
    AwaitingConfirmation,
    /// Transactions carrying the payment memo cover the full amount.
    Complete,
    /// The deadline passed after some, but not all, of the amount arrived.
    CompleteUnderpaid,
    /// The deadline passed and nothing arrived.
    FailedSoftTimeout,
    /// Manually failed from outside the engine.
    FailedHardTimeout,
    /// Cancelled from outside the engine.
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::AwaitingConfirmation)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            PaymentStatus::Complete => "COMPLETE",
            PaymentStatus::CompleteUnderpaid => "COMPLETE_UNDERPAID",
            PaymentStatus::FailedSoftTimeout => "FAILED_SOFT_TIMEOUT",
            PaymentStatus::FailedHardTimeout => "FAILED_HARD_TIMEOUT",
            PaymentStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment status: {0}")]
pub struct StatusParseError(String);

impl FromStr for PaymentStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWAITING_CONFIRMATION" => Ok(Self::AwaitingConfirmation),
            "COMPLETE" => Ok(Self::Complete),
            "COMPLETE_UNDERPAID" => Ok(Self::CompleteUnderpaid),
            "FAILED_SOFT_TIMEOUT" => Ok(Self::FailedSoftTimeout),
            "FAILED_HARD_TIMEOUT" => Ok(Self::FailedHardTimeout),
            "CANCELLED" => Ok(Self::Cancelled),
            s => Err(StatusParseError(s.to_string())),
        }
    }
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub purchase_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    /// The total amount that must arrive for the payment to complete
    pub amount: Decimal,
    /// The amount matched on-chain at the last write. Partial while awaiting, final once terminal.
    pub paid_amount: Decimal,
    pub status: PaymentStatus,
    /// The currency code of the chain the payment is expected on, e.g. `YEC`
    pub payment_method: String,
    /// Opaque correlation token that the buyer embeds in the on-chain transaction
    pub memo: String,
    pub deadline: DateTime<Utc>,
    pub receiving_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Display for Payment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Payment #{} for purchase {} ({}/{} {}, {})",
            self.id, self.purchase_id, self.paid_amount, self.amount, self.payment_method, self.status
        )
    }
}

//--------------------------------------       NewPayment      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub purchase_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: Decimal,
    pub payment_method: String,
    pub memo: String,
    pub deadline: DateTime<Utc>,
    pub receiving_address: String,
}

impl NewPayment {
    pub fn new(purchase_id: &str, amount: Decimal, payment_method: &str, deadline: DateTime<Utc>) -> Self {
        Self {
            purchase_id: purchase_id.to_string(),
            buyer_id: String::default(),
            seller_id: String::default(),
            amount,
            payment_method: payment_method.to_ascii_uppercase(),
            memo: String::default(),
            deadline,
            receiving_address: String::default(),
        }
    }

    pub fn with_parties(mut self, buyer_id: &str, seller_id: &str) -> Self {
        self.buyer_id = buyer_id.to_string();
        self.seller_id = seller_id.to_string();
        self
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.receiving_address = address.to_string();
        self
    }

    pub fn into_payment(self, id: i64, created_at: DateTime<Utc>) -> Payment {
        Payment {
            id,
            purchase_id: self.purchase_id,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            amount: self.amount,
            paid_amount: Decimal::ZERO,
            status: PaymentStatus::AwaitingConfirmation,
            payment_method: self.payment_method,
            memo: self.memo,
            deadline: self.deadline,
            receiving_address: self.receiving_address,
            created_at,
            updated_at: created_at,
        }
    }
}

//--------------------------------------  ReceivedTransaction  ---------------------------------------------------------
/// A transaction a chain node reports as received at an address. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedTransaction {
    pub txid: String,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub confirmations: u32,
}

impl ReceivedTransaction {
    pub fn new(txid: &str, amount: Decimal, memo: Option<&str>, confirmations: u32) -> Self {
        Self { txid: txid.to_string(), amount, memo: memo.map(String::from), confirmations }
    }
}
