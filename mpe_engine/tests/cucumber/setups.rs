use std::sync::Arc;

use chrono::Duration;
use cucumber::{given, when};
use mpe_engine::{VolatilityConfig, VolatilityMonitor};
use rust_decimal::Decimal;

use crate::cucumber::EngineWorld;

#[given("a fresh engine")]
async fn fresh_engine(world: &mut EngineWorld) {
    *world = EngineWorld::new();
}

#[given(expr = "the {word} chain requires {int} confirmations")]
async fn chain_confirmations(world: &mut EngineWorld, currency: String, confirmations: u32) {
    world.chain_settings.currency = currency.to_ascii_uppercase();
    world.chain_settings.min_confirmations = confirmations;
}

#[given(
    expr = "a volatility monitor for {word} against {word} with a {int}% threshold, a {int}s window, a {int}s \
            cooldown and {int}s staleness"
)]
async fn volatility_monitor(
    world: &mut EngineWorld,
    currency: String,
    reference: String,
    threshold: i64,
    window: i64,
    cooldown: i64,
    stale: i64,
) {
    let config = VolatilityConfig {
        reference_currency: reference,
        monitored_currencies: vec![currency],
        downside_threshold_pct: Decimal::from(threshold),
        window: Duration::seconds(window),
        cooldown: Duration::seconds(cooldown),
        stale_threshold: Duration::seconds(stale),
    };
    let monitor = VolatilityMonitor::new(world.db.clone(), config).with_clock(Arc::new(world.clock.clone()));
    monitor.init();
    world.volatility = Some(monitor);
}

#[given(expr = "{int} minutes pass")]
#[when(expr = "{int} minutes pass")]
async fn minutes_pass(world: &mut EngineWorld, minutes: i64) {
    world.clock.advance(Duration::minutes(minutes));
}
