//! Runs the payment monitor over a burst of payments stored in SQLite.
use std::{collections::HashMap, time::Duration};

use chrono::Utc;
use log::*;
use mpe_engine::{
    db_types::{NewPayment, PaymentStatus, ReceivedTransaction},
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    ChainClient,
    ChainClientError,
    ChainSettings,
    PaymentApi,
    PaymentMonitor,
    RescanPolicy,
};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

const NUM_PAYMENTS: u64 = 40;
const NUM_ADDRESSES: u64 = 7;
const RATE: u64 = 200; // payments per second

/// Replays a fixed set of received transactions per address.
struct HalfPaidNode {
    received: HashMap<String, Vec<ReceivedTransaction>>,
}

impl ChainClient for HalfPaidNode {
    async fn received_by_address(&self, address: &str, _: u32) -> Result<Vec<ReceivedTransaction>, ChainClientError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(self.received.get(address).cloned().unwrap_or_default())
    }

    async fn import_viewing_key(&self, _: &str, _: RescanPolicy, _: Option<u64>) -> Result<(), ChainClientError> {
        Ok(())
    }
}

#[test]
fn burst_payments() {
    info!("🚀️ Starting payment burst test");
    let sys = Runtime::new().unwrap();
    let delay = Duration::from_millis(1000 / RATE);

    sys.block_on(async move {
        let url = random_db_path();
        let mut db = prepare_test_env(&url).await;
        let api = PaymentApi::new(db.clone(), Default::default());
        let mut received = HashMap::<String, Vec<ReceivedTransaction>>::new();

        let mut timer = tokio::time::interval(delay);
        info!("🚀️ Injecting {NUM_PAYMENTS} payments");
        let deadline = Utc::now() + chrono::Duration::hours(1);
        for i in 0..NUM_PAYMENTS {
            timer.tick().await;
            let address = format!("zs1burst{}", i % NUM_ADDRESSES);
            let memo = format!("burst-{i}");
            let amount = Decimal::from(i + 1);
            let payment = NewPayment::new(&format!("purchase-{i}"), amount, "YEC", deadline)
                .with_memo(&memo)
                .with_address(&address);
            if let Err(e) = api.create_payment(payment).await {
                panic!("Error creating payment {i}: {e}");
            }
            let paid = if i % 2 == 0 { amount } else { amount / Decimal::TWO };
            let tx = ReceivedTransaction::new(&format!("tx-{i}"), paid, Some(&memo), 20);
            received.entry(address).or_default().push(tx);
        }

        let settings = ChainSettings::new("YEC", 10).with_max_concurrent_addresses(3);
        let monitor = PaymentMonitor::new(db.clone(), HalfPaidNode { received }, settings);
        let summary = monitor.run_once().await;
        assert_eq!(summary.addresses as u64, NUM_ADDRESSES);
        assert_eq!(summary.failed_addresses, 0);
        assert_eq!(summary.payments_checked as u64, NUM_PAYMENTS);
        assert_eq!(summary.completed as u64, NUM_PAYMENTS / 2);
        assert_eq!(summary.partial_updates as u64, NUM_PAYMENTS / 2);

        let pending = api.pending_payments("YEC").await.unwrap();
        assert_eq!(pending.len() as u64, NUM_PAYMENTS / 2);
        assert!(pending
            .iter()
            .all(|p| p.status == PaymentStatus::AwaitingConfirmation && p.paid_amount * Decimal::TWO == p.amount));

        // nothing changed on-chain, so a second tick writes nothing
        let again = monitor.run_once().await;
        assert_eq!(again.transitions() + again.partial_updates, 0);

        db.close().await.unwrap();
        drop_database(&url).await;
    });
    info!("🚀️ test complete");
}
