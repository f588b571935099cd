//! Leaf types shared by every crate in the marketplace payment engine workspace.
mod currency;
pub mod helpers;
mod secret;

pub use currency::{
    CurrencyInfo,
    CurrencyTable,
    CurrencyTableError,
    DEFAULT_DECIMALS,
    PLN,
    USD,
    USDT,
    YEC,
    ZEC,
};
pub use secret::Secret;
