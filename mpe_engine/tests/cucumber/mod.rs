mod conversion_steps;
mod payment_steps;
mod setups;
mod volatility_steps;
mod world;

pub use world::{EngineWorld, ScriptedChain};
