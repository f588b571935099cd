//! Writes to the SQLite store are visible to the very next read, whichever pooled connection serves it.
use chrono::{Duration, Utc};
use log::*;
use mpe_engine::{
    db_types::{NewExchangeRate, NewPayment, PaymentStatus},
    events::EventProducers,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    PaymentApi,
    PaymentApiError,
    PaymentStore,
    RateStore,
};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

fn new_payment(i: usize) -> NewPayment {
    NewPayment::new(&format!("purchase-{i}"), Decimal::ONE, "YEC", Utc::now() + Duration::hours(1))
        .with_memo(&format!("memo-{i}"))
        .with_address("zs1store")
}

#[test]
fn payments_are_read_back_straight_after_writing() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        let mut db = prepare_test_env(&url).await;

        let mut ids = vec![];
        for i in 0..5 {
            let payment = db.insert_payment(new_payment(i)).await.unwrap();
            ids.push(payment.id);
            let pending = db.fetch_payments_by_status(PaymentStatus::AwaitingConfirmation).await.unwrap();
            assert_eq!(pending.len(), i + 1, "payment #{} not visible after insert", payment.id);
            let stored = db.fetch_payment(payment.id).await.unwrap().expect("payment exists");
            assert_eq!(stored.memo, format!("memo-{i}"));
        }

        let mut payment = db.fetch_payment(ids[0]).await.unwrap().expect("payment exists");
        payment.paid_amount = Decimal::new(5, 1);
        payment.status = PaymentStatus::CompleteUnderpaid;
        db.save_payment(&payment).await.unwrap();
        let stored = db.fetch_payment(ids[0]).await.unwrap().expect("payment exists");
        assert_eq!(stored.status, PaymentStatus::CompleteUnderpaid);
        assert_eq!(stored.paid_amount, Decimal::new(5, 1));
        assert_eq!(db.fetch_payments_by_status(PaymentStatus::AwaitingConfirmation).await.unwrap().len(), 4);

        db.close().await.unwrap();
        drop_database(&url).await;
    });
}

#[test]
fn rates_are_read_back_straight_after_writing() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        let mut db = prepare_test_env(&url).await;

        for i in 1..=3i64 {
            let rate = NewExchangeRate::new("YEC", "USDT", Decimal::new(i, 0), "feed").at(Utc::now());
            let saved = db.insert_rate(rate).await.unwrap();
            let latest = db.fetch_latest("YEC", "USDT").await.unwrap().expect("rate exists");
            assert_eq!(latest.id, saved.id);
            assert_eq!(latest.rate, Decimal::new(i, 0));
        }

        db.close().await.unwrap();
        drop_database(&url).await;
    });
}

#[test]
fn closed_payments_cannot_be_closed_again() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async move {
        let url = random_db_path();
        let mut db = prepare_test_env(&url).await;
        let api = PaymentApi::new(db.clone(), EventProducers::default());

        let id = api.create_payment(new_payment(0)).await.unwrap().id;
        let expired = api.expire_payment(id).await.unwrap();
        assert_eq!(expired.status, PaymentStatus::FailedHardTimeout);

        let err = api.cancel_payment(id).await.unwrap_err();
        info!("🗃️ {err}");
        assert!(matches!(err, PaymentApiError::AlreadyClosed { status: PaymentStatus::FailedHardTimeout, .. }));
        let err = api.expire_payment(id).await.unwrap_err();
        assert!(matches!(err, PaymentApiError::AlreadyClosed { .. }));
        let stored = db.fetch_payment(id).await.unwrap().expect("payment exists");
        assert_eq!(stored.status, PaymentStatus::FailedHardTimeout);

        drop(api);
        db.close().await.unwrap();
        drop_database(&url).await;
    });
}
