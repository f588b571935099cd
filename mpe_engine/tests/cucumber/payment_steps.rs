use std::str::FromStr;

use chrono::Duration;
use cucumber::{given, then, when};
use mpe_engine::{
    clock::Clock,
    db_types::{NewPayment, PaymentStatus, ReceivedTransaction},
    PaymentApi,
    PaymentStore,
};
use rust_decimal::Decimal;

use crate::cucumber::EngineWorld;

fn amount(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap_or_else(|e| panic!("{s} is not a valid amount. {e}"))
}

#[given(expr = "a {word} payment {string} of {word} to address {string} with memo {string} due in {int} minutes")]
async fn create_payment(
    world: &mut EngineWorld,
    method: String,
    purchase_id: String,
    value: String,
    address: String,
    memo: String,
    minutes: i64,
) {
    let deadline = world.clock.now() + Duration::minutes(minutes);
    let payment = NewPayment::new(&purchase_id, amount(&value), &method, deadline)
        .with_parties("buyer", "seller")
        .with_memo(&memo)
        .with_address(&address);
    let api = PaymentApi::new(world.db.clone(), Default::default());
    let payment = api.create_payment(payment).await.expect("Error creating payment");
    world.payments.insert(purchase_id, payment.id);
}

#[given(expr = "the node reports {word} to {string} with memo {string} and {int} confirmations")]
#[when(expr = "the node reports {word} to {string} with memo {string} and {int} confirmations")]
async fn node_reports(world: &mut EngineWorld, value: String, address: String, memo: String, confirmations: u32) {
    let txid = format!("tx-{}", world.chain.len());
    world.chain.receive(&address, ReceivedTransaction::new(&txid, amount(&value), Some(&memo), confirmations));
}

#[given(expr = "the node reports {word} to {string} without a memo")]
#[when(expr = "the node reports {word} to {string} without a memo")]
async fn node_reports_no_memo(world: &mut EngineWorld, value: String, address: String) {
    let txid = format!("tx-{}", world.chain.len());
    world.chain.receive(&address, ReceivedTransaction::new(&txid, amount(&value), None, 100));
}

#[given(expr = "the node cannot be reached for address {string}")]
async fn node_offline(world: &mut EngineWorld, address: String) {
    world.chain.take_offline(&address);
}

#[when(expr = "the {word} payment monitor runs")]
async fn run_monitor(world: &mut EngineWorld, currency: String) {
    let summary = world.payment_monitor(&currency).run_once().await;
    world.last_tick = Some(summary);
}

#[when(expr = "payment {string} is cancelled")]
async fn cancel_payment(world: &mut EngineWorld, purchase_id: String) {
    let api = PaymentApi::new(world.db.clone(), Default::default());
    api.cancel_payment(world.payment_id(&purchase_id)).await.expect("Error cancelling payment");
}

#[then(expr = "payment {string} has status {word}")]
async fn check_status(world: &mut EngineWorld, purchase_id: String, status: String) {
    let expected = PaymentStatus::from_str(&status).expect("Unknown payment status");
    let payment = world.db.fetch_payment(world.payment_id(&purchase_id)).await.unwrap().expect("Payment is missing");
    assert_eq!(payment.status, expected, "{payment}");
}

#[then(expr = "payment {string} has a paid amount of {word}")]
async fn check_paid(world: &mut EngineWorld, purchase_id: String, value: String) {
    let payment = world.db.fetch_payment(world.payment_id(&purchase_id)).await.unwrap().expect("Payment is missing");
    assert_eq!(payment.paid_amount, amount(&value), "{payment}");
}

#[then(expr = "the last tick checked {int} address(es) with {int} failure(s)")]
async fn check_tick_addresses(world: &mut EngineWorld, addresses: usize, failures: usize) {
    let summary = world.last_tick.expect("The payment monitor has not run");
    assert_eq!(summary.addresses, addresses);
    assert_eq!(summary.failed_addresses, failures);
}

#[then(expr = "the last tick made {int} status change(s)")]
async fn check_tick_transitions(world: &mut EngineWorld, transitions: usize) {
    let summary = world.last_tick.expect("The payment monitor has not run");
    assert_eq!(summary.transitions(), transitions);
}
