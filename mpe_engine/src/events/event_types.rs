use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Payment, PaymentStatus},
    mpe_api::volatility::VolatilityState,
};

/// Published whenever a payment moves from one status to another.
///
/// This is what the purchase workflow listens for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusChangedEvent {
    pub payment_id: i64,
    pub purchase_id: String,
    pub old_status: PaymentStatus,
    pub new_status: PaymentStatus,
    pub paid_amount: Decimal,
}

impl PaymentStatusChangedEvent {
    pub fn new(old_status: PaymentStatus, payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            purchase_id: payment.purchase_id.clone(),
            old_status,
            new_status: payment.status,
            paid_amount: payment.paid_amount,
        }
    }
}

/// Published when a currency's market becomes frozen (volatile or stale) or thaws again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStateChangedEvent {
    pub currency: String,
    pub old_state: VolatilityState,
    pub new_state: VolatilityState,
}

impl MarketStateChangedEvent {
    pub fn new(currency: &str, old_state: VolatilityState, new_state: VolatilityState) -> Self {
        Self { currency: currency.to_string(), old_state, new_state }
    }

    pub fn is_frozen(&self) -> bool {
        self.new_state.is_frozen()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    PaymentStatusChanged(PaymentStatusChangedEvent),
    MarketStateChanged(MarketStateChangedEvent),
}
