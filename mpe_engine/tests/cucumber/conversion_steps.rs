use std::str::FromStr;

use cucumber::{then, when};
use mpe_common::CurrencyTable;
use mpe_engine::CurrencyConverter;
use rust_decimal::Decimal;

use crate::cucumber::EngineWorld;

#[when(expr = "I convert {word} {word} to {word}")]
async fn convert(world: &mut EngineWorld, amount: String, from: String, to: String) {
    let amount = Decimal::from_str(&amount).expect("Not a valid amount");
    let converter = CurrencyConverter::new(world.db.clone(), CurrencyTable::default());
    world.conversion = Some(converter.convert(amount, &from, &to).await);
}

#[then(expr = "the result is {word} in {int} step(s)")]
async fn check_result(world: &mut EngineWorld, expected: String, steps: usize) {
    let result = world.conversion.as_ref().expect("No conversion was made").as_ref().expect("Conversion failed");
    assert_eq!(result.amount.to_string(), expected);
    assert_eq!(result.steps.len(), steps);
}

#[then(expr = "step {int} converts {word} to {word} at {word}")]
async fn check_step(world: &mut EngineWorld, n: usize, base: String, quote: String, rate: String) {
    let result = world.conversion.as_ref().expect("No conversion was made").as_ref().expect("Conversion failed");
    let step = &result.steps[n - 1];
    assert_eq!(step.base_currency, base);
    assert_eq!(step.quote_currency, quote);
    assert_eq!(step.rate, Decimal::from_str(&rate).unwrap());
}

#[then(expr = "the conversion fails with {string}")]
async fn check_failure(world: &mut EngineWorld, message: String) {
    match world.conversion.as_ref().expect("No conversion was made") {
        Ok(r) => panic!("Conversion should have failed, but gave {r}"),
        Err(e) => assert_eq!(e.to_string(), message),
    }
}
