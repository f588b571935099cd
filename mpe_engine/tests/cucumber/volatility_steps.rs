use std::str::FromStr;

use chrono::Duration;
use cucumber::{given, then, when};
use mpe_engine::{clock::Clock, db_types::NewExchangeRate, RateStore};
use rust_decimal::Decimal;

use crate::cucumber::EngineWorld;

async fn record_rate(world: &EngineWorld, base: &str, quote: &str, rate: &str, minutes_ago: i64) {
    let rate = Decimal::from_str(rate).expect("Not a valid rate");
    let at = world.clock.now() - Duration::minutes(minutes_ago);
    world.db.insert_rate(NewExchangeRate::new(base, quote, rate, "feature").at(at)).await.expect("Error storing rate");
}

#[given(expr = "1 {word} was worth {word} {word} {int} minutes ago")]
async fn rate_in_the_past(world: &mut EngineWorld, base: String, rate: String, quote: String, minutes: i64) {
    record_rate(world, &base, &quote, &rate, minutes).await;
}

#[given(expr = "1 {word} is worth {word} {word}")]
#[when(expr = "1 {word} is worth {word} {word}")]
async fn rate_now(world: &mut EngineWorld, base: String, rate: String, quote: String) {
    record_rate(world, &base, &quote, &rate, 0).await;
}

#[when("the volatility monitor ticks")]
async fn tick(world: &mut EngineWorld) {
    world.volatility().tick().await;
}

#[then(expr = "the {word} market is {word}")]
async fn check_market(world: &mut EngineWorld, currency: String, expected: String) {
    let state = world.volatility().state(&currency).expect("Currency is not monitored");
    assert_eq!(state.label(), expected, "{state:?}");
}

#[then(expr = "{word} is frozen")]
async fn check_frozen(world: &mut EngineWorld, currency: String) {
    assert!(world.volatility().is_frozen(&currency));
}

#[then(expr = "{word} is not frozen")]
async fn check_not_frozen(world: &mut EngineWorld, currency: String) {
    assert!(!world.volatility().is_frozen(&currency));
}

#[then(expr = "{word} is volatile")]
async fn check_volatile(world: &mut EngineWorld, currency: String) {
    assert!(world.volatility().is_volatile(&currency));
}

#[then(expr = "the {word} price has dropped {word}% from a high of {word}")]
async fn check_drop(world: &mut EngineWorld, currency: String, drop: String, max: String) {
    let state = world.volatility().state(&currency).expect("Currency is not monitored");
    assert_eq!(state.current_drop_pct, Decimal::from_str(&drop).unwrap());
    assert_eq!(state.max_price_in_window, Some(Decimal::from_str(&max).unwrap()));
}
