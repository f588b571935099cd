use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const USD: &str = "USD";
pub const PLN: &str = "PLN";
pub const USDT: &str = "USDT";
pub const YEC: &str = "YEC";
pub const ZEC: &str = "ZEC";

/// Decimal places used for any currency the table does not know about.
pub const DEFAULT_DECIMALS: u32 = 8;

//--------------------------------------     CurrencyInfo     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub code: String,
    /// The canonical number of decimal places amounts in this currency are rounded to.
    pub decimals: u32,
    /// True if the currency can be used as an actual payment medium, rather than only a display price.
    pub settlement: bool,
}

impl CurrencyInfo {
    pub fn new(code: &str, decimals: u32, settlement: bool) -> Self {
        Self { code: code.to_ascii_uppercase(), decimals, settlement }
    }
}

impl Display for CurrencyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.settlement { "settlement" } else { "reference" };
        write!(f, "{} ({} dp, {kind})", self.code, self.decimals)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CurrencyTableError {
    #[error("Invalid currency entry '{0}'. Expected CODE:DECIMALS or CODE:DECIMALS:settle")]
    InvalidEntry(String),
    #[error("Invalid number of decimals for {code}: {reason}")]
    InvalidDecimals { code: String, reason: String },
}

impl FromStr for CurrencyInfo {
    type Err = CurrencyTableError;

    /// Parses `CODE:DECIMALS` or `CODE:DECIMALS:settle`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.trim().split(':').map(str::trim).collect::<Vec<_>>();
        let (code, decimals, settlement) = match parts.as_slice() {
            [code, decimals] => (*code, *decimals, false),
            [code, decimals, flag] if flag.eq_ignore_ascii_case("settle") => (*code, *decimals, true),
            _ => return Err(CurrencyTableError::InvalidEntry(s.to_string())),
        };
        if code.is_empty() {
            return Err(CurrencyTableError::InvalidEntry(s.to_string()));
        }
        let decimals = decimals
            .parse::<u32>()
            .map_err(|e| CurrencyTableError::InvalidDecimals { code: code.to_string(), reason: e.to_string() })?;
        // rust_decimal cannot carry more than 28 fractional digits
        if decimals > 28 {
            return Err(CurrencyTableError::InvalidDecimals {
                code: code.to_string(),
                reason: format!("{decimals} is more than 28"),
            });
        }
        Ok(Self::new(code, decimals, settlement))
    }
}

//--------------------------------------     CurrencyTable    ---------------------------------------------------------
/// Per-currency metadata: canonical precision and whether the currency settles payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyTable {
    entries: BTreeMap<String, CurrencyInfo>,
}

impl Default for CurrencyTable {
    fn default() -> Self {
        Self::empty()
            .with_currency(USD, 2, false)
            .with_currency("EUR", 2, false)
            .with_currency(PLN, 2, false)
            .with_currency(USDT, 6, false)
            .with_currency("BTC", 8, false)
            .with_currency(YEC, 8, true)
            .with_currency(ZEC, 8, true)
    }
}

impl CurrencyTable {
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    pub fn with_currency(mut self, code: &str, decimals: u32, settlement: bool) -> Self {
        self.insert(CurrencyInfo::new(code, decimals, settlement));
        self
    }

    pub fn insert(&mut self, info: CurrencyInfo) {
        self.entries.insert(info.code.clone(), info);
    }

    pub fn get(&self, code: &str) -> Option<&CurrencyInfo> {
        self.entries.get(&code.to_ascii_uppercase())
    }

    /// The canonical decimal places for `code`, falling back to [`DEFAULT_DECIMALS`].
    pub fn decimals(&self, code: &str) -> u32 {
        self.get(code).map(|c| c.decimals).unwrap_or(DEFAULT_DECIMALS)
    }

    pub fn is_settlement(&self, code: &str) -> bool {
        self.get(code).map(|c| c.settlement).unwrap_or(false)
    }

    pub fn settlement_currencies(&self) -> Vec<String> {
        self.entries.values().filter(|c| c.settlement).map(|c| c.code.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurrencyInfo> {
        self.entries.values()
    }

    /// Applies a comma-separated list of `CODE:DECIMALS[:settle]` overrides on top of the current table.
    pub fn apply_overrides(&mut self, overrides: &str) -> Result<(), CurrencyTableError> {
        let parsed = overrides
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(CurrencyInfo::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        parsed.into_iter().for_each(|info| self.insert(info));
        Ok(())
    }
}
