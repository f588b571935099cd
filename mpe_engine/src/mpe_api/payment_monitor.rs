//! Reconciliation of pending payments against what a chain node has actually received.
//!
//! One [`PaymentMonitor`] runs per supported chain. Each call to [`PaymentMonitor::run_once`] is one tick:
//! 1. Load every payment that is still `AWAITING_CONFIRMATION` for the chain's currency.
//! 2. Group them by receiving address, so each address is queried once.
//! 3. For every address, ask the node for the transactions received with enough confirmations.
//! 4. For every payment at that address, add up the transactions whose memo matches the payment memo exactly.
//! 5. Decide the new status from that total, the required amount and the deadline.
//!
//! The total is recomputed from scratch every tick. The monitor keeps no cursor, so running the same tick twice gives
//! the same result and a missed tick loses nothing.
use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use log::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    clock::{system_clock, Clock},
    db_types::{Payment, PaymentStatus, ReceivedTransaction},
    events::{EventProducers, PaymentStatusChangedEvent},
    traits::{ChainClient, ChainClientError, PaymentStore, PaymentStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("Chain node query failed. {0}")]
    ChainClient(#[from] ChainClientError),
    #[error("Could not save payment. {0}")]
    PaymentStore(#[from] PaymentStoreError),
    #[error("The received amounts for payment #{0} overflowed")]
    Overflow(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSettings {
    /// The currency code payments on this chain use as their payment method
    pub currency: String,
    pub min_confirmations: u32,
    /// How many addresses are queried at the same time within a tick
    pub max_concurrent_addresses: usize,
}

impl ChainSettings {
    pub fn new(currency: &str, min_confirmations: u32) -> Self {
        Self { currency: currency.to_ascii_uppercase(), min_confirmations, max_concurrent_addresses: 8 }
    }

    pub fn with_max_concurrent_addresses(mut self, n: usize) -> Self {
        self.max_concurrent_addresses = n.max(1);
        self
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub addresses: usize,
    pub failed_addresses: usize,
    pub payments_checked: usize,
    pub completed: usize,
    pub underpaid: usize,
    pub timed_out: usize,
    pub partial_updates: usize,
}

impl TickSummary {
    pub fn transitions(&self) -> usize {
        self.completed + self.underpaid + self.timed_out
    }

    fn merge(&mut self, other: &TickSummary) {
        self.addresses += other.addresses;
        self.failed_addresses += other.failed_addresses;
        self.payments_checked += other.payments_checked;
        self.completed += other.completed;
        self.underpaid += other.underpaid;
        self.timed_out += other.timed_out;
        self.partial_updates += other.partial_updates;
    }
}

/// The verdict for one payment in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// The full amount has arrived
    Complete(Decimal),
    /// The deadline passed with only part of the amount received
    Underpaid(Decimal),
    /// The deadline passed with nothing received
    TimedOut,
    /// Still within the deadline and a new partial total should be recorded
    Partial(Decimal),
    /// Nothing to write
    Unchanged,
}

impl Assessment {
    pub fn new_status(&self) -> Option<PaymentStatus> {
        match self {
            Assessment::Complete(_) => Some(PaymentStatus::Complete),
            Assessment::Underpaid(_) => Some(PaymentStatus::CompleteUnderpaid),
            Assessment::TimedOut => Some(PaymentStatus::FailedSoftTimeout),
            Assessment::Partial(_) | Assessment::Unchanged => None,
        }
    }
}

/// Sums the transactions whose memo equals the payment memo and that have at least `min_confirmations`.
pub fn total_paid(payment: &Payment, txs: &[ReceivedTransaction], min_confirmations: u32) -> Option<Decimal> {
    txs.iter()
        .filter(|tx| tx.confirmations >= min_confirmations)
        .filter(|tx| tx.memo.as_deref() == Some(payment.memo.as_str()))
        .try_fold(Decimal::ZERO, |acc, tx| acc.checked_add(tx.amount))
}

pub fn assess(payment: &Payment, total: Decimal, now: DateTime<Utc>) -> Assessment {
    if total >= payment.amount {
        Assessment::Complete(total)
    } else if now > payment.deadline {
        if total > Decimal::ZERO {
            Assessment::Underpaid(total)
        } else {
            Assessment::TimedOut
        }
    } else if total != payment.paid_amount {
        // also rewinds a partial total that a re-org has since dropped
        Assessment::Partial(total)
    } else {
        Assessment::Unchanged
    }
}

pub struct PaymentMonitor<B, C> {
    db: B,
    chain: C,
    settings: ChainSettings,
    clock: Arc<dyn Clock>,
    producers: EventProducers,
}

impl<B, C> Debug for PaymentMonitor<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentMonitor({})", self.settings.currency)
    }
}

impl<B, C> PaymentMonitor<B, C> {
    pub fn new(db: B, chain: C, settings: ChainSettings) -> Self {
        Self { db, chain, settings, clock: system_clock(), producers: EventProducers::default() }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }
}

impl<B, C> PaymentMonitor<B, C>
where
    B: PaymentStore,
    C: ChainClient,
{
    /// Runs one reconciliation tick. Never fails: problems are logged and show up in the summary.
    pub async fn run_once(&self) -> TickSummary {
        let currency = &self.settings.currency;
        let pending = match self.db.fetch_payments_by_status(PaymentStatus::AwaitingConfirmation).await {
            Ok(p) => p,
            Err(e) => {
                error!("🔭️ Could not load pending {currency} payments. Skipping this tick. {e}");
                return TickSummary::default();
            },
        };
        let mut by_address = BTreeMap::<String, Vec<Payment>>::new();
        for payment in pending.into_iter().filter(|p| &p.payment_method == currency) {
            by_address.entry(payment.receiving_address.clone()).or_default().push(payment);
        }
        if by_address.is_empty() {
            trace!("🔭️ No pending {currency} payments");
            return TickSummary::default();
        }
        debug!("🔭️ Checking {} {currency} address(es) for pending payments", by_address.len());
        let now = self.clock.now();
        let results = stream::iter(by_address)
            .map(|(address, payments)| async move {
                let n = payments.len();
                let result = self.reconcile_address(&address, payments, now).await;
                (address, n, result)
            })
            .buffer_unordered(self.settings.max_concurrent_addresses.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut summary = TickSummary::default();
        for (address, n, result) in results {
            summary.addresses += 1;
            match result {
                Ok(s) => summary.merge(&s),
                Err(e) => {
                    warn!("🔭️ Could not reconcile {n} payment(s) at {address}. {e}");
                    summary.failed_addresses += 1;
                    summary.payments_checked += n;
                },
            }
        }
        info!(
            "🔭️ {currency} tick done. {} payments at {} addresses ({} failed). {} complete, {} underpaid, {} timed \
             out, {} partial",
            summary.payments_checked,
            summary.addresses,
            summary.failed_addresses,
            summary.completed,
            summary.underpaid,
            summary.timed_out,
            summary.partial_updates
        );
        summary
    }

    async fn reconcile_address(
        &self,
        address: &str,
        payments: Vec<Payment>,
        now: DateTime<Utc>,
    ) -> Result<TickSummary, ReconcileError> {
        let min_conf = self.settings.min_confirmations;
        let txs = self.chain.received_by_address(address, min_conf).await?;
        trace!("🔭️ {} transaction(s) received at {address}", txs.len());
        let mut summary = TickSummary::default();
        for payment in payments {
            summary.payments_checked += 1;
            let total = total_paid(&payment, &txs, min_conf).ok_or(ReconcileError::Overflow(payment.id))?;
            let assessment = assess(&payment, total, now);
            match assessment {
                Assessment::Unchanged => {},
                Assessment::Partial(total) => {
                    let updated = Payment { paid_amount: total, updated_at: now, ..payment };
                    self.db.save_payment(&updated).await?;
                    debug!("🔭️ Payment #{} has received {total} of {} so far", updated.id, updated.amount);
                    summary.partial_updates += 1;
                },
                Assessment::Complete(total) | Assessment::Underpaid(total) => {
                    self.transition(payment, &assessment, total, now).await?;
                    match assessment {
                        Assessment::Complete(_) => summary.completed += 1,
                        _ => summary.underpaid += 1,
                    }
                },
                Assessment::TimedOut => {
                    self.transition(payment, &assessment, Decimal::ZERO, now).await?;
                    summary.timed_out += 1;
                },
            }
        }
        Ok(summary)
    }

    async fn transition(
        &self,
        payment: Payment,
        assessment: &Assessment,
        total: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), ReconcileError> {
        let Some(new_status) = assessment.new_status() else {
            return Ok(());
        };
        let old_status = payment.status;
        let updated = Payment { status: new_status, paid_amount: total, updated_at: now, ..payment };
        let saved = self.db.save_payment(&updated).await?;
        info!("🔭️ Payment #{} for purchase {} is now {new_status} ({total} received)", saved.id, saved.purchase_id);
        let event = PaymentStatusChangedEvent::new(old_status, &saved);
        self.producers.publish_payment_status_changed(event).await;
        Ok(())
    }
}
