//! Currency conversion along a path of market rates.
//!
//! The converter reads the newest observation for every currency pair, builds a directed graph with an edge in each
//! direction per observation and then runs a breadth-first search from the source currency. The first path found is
//! the one with the fewest hops. Amounts are multiplied through at full precision and rounded (half away from zero)
//! to the target currency's canonical decimal places once, at the end.
use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    fmt::{Debug, Display},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use log::*;
use mpe_common::CurrencyTable;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    clock::{system_clock, Clock},
    db_types::ExchangeRate,
    traits::{RateStore, RateStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    #[error("no path from {from} to {to}")]
    NoPath { from: String, to: String },
    #[error("Could not read exchange rates. {0}")]
    RateStore(#[from] RateStoreError),
    #[error("Arithmetic overflow converting {amount} {from} to {to}")]
    Overflow { amount: Decimal, from: String, to: String },
}

/// One edge traversal along a conversion path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStep {
    pub base_currency: String,
    pub quote_currency: String,
    /// The rate applied in this direction. For an inverse edge this is `1 / source.rate`.
    pub rate: Decimal,
    /// The stored observation the rate came from
    pub source: ExchangeRate,
}

impl ConversionStep {
    pub fn is_inverse(&self) -> bool {
        self.base_currency != self.source.base_currency
    }
}

impl Display for ConversionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {} @ {}", self.base_currency, self.quote_currency, self.rate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// The converted amount, at the target currency's canonical precision
    pub amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
    pub steps: Vec<ConversionStep>,
    /// The age of the oldest observation used along the path
    pub updated_at: DateTime<Utc>,
    /// True if any observation along the path was flagged as volatile
    pub is_volatile: bool,
}

impl ConversionResult {
    /// The composite rate along the whole path, unrounded.
    pub fn effective_rate(&self) -> Option<Decimal> {
        self.steps.iter().try_fold(Decimal::ONE, |acc, s| acc.checked_mul(s.rate))
    }
}

impl Display for ConversionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} via {} step(s)", self.amount, self.to_currency, self.steps.len())?;
        if self.is_volatile {
            write!(f, " [volatile]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Edge {
    to: String,
    rate: Decimal,
    source: ExchangeRate,
}

/// Adjacency lists for every currency that appears in at least one observation.
#[derive(Debug, Default)]
pub(crate) struct RateGraph {
    edges: HashMap<String, Vec<Edge>>,
}

impl RateGraph {
    /// Observations are sorted by `(base, quote)` first so that adjacency order, and hence the choice between
    /// equally short paths, is the same on every run.
    pub fn new(mut rates: Vec<ExchangeRate>) -> Self {
        rates.sort_by(|a, b| {
            (a.base_currency.as_str(), a.quote_currency.as_str())
                .cmp(&(b.base_currency.as_str(), b.quote_currency.as_str()))
        });
        let mut graph = Self::default();
        for rate in rates {
            if rate.rate.is_zero() {
                warn!("💱️ Ignoring the inverse of a zero rate: {rate}");
            } else {
                match Decimal::ONE.checked_div(rate.rate) {
                    Some(inverse) => graph.add_edge(&rate.quote_currency, &rate.base_currency, inverse, &rate),
                    None => warn!("💱️ Cannot invert {rate}. Only the forward edge is used"),
                }
            }
            let (from, to, r) = (rate.base_currency.clone(), rate.quote_currency.clone(), rate.rate);
            graph.add_edge(&from, &to, r, &rate);
        }
        graph
    }

    fn add_edge(&mut self, from: &str, to: &str, rate: Decimal, source: &ExchangeRate) {
        let edge = Edge { to: to.to_string(), rate, source: source.clone() };
        self.edges.entry(from.to_string()).or_default().push(edge);
    }

    /// Breadth-first search for the path with the fewest hops.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<ConversionStep>> {
        let mut visited = HashSet::from([from.to_string()]);
        let mut queue = VecDeque::from([from.to_string()]);
        // node -> (previous node, edge used to reach it)
        let mut parents = BTreeMap::<String, (String, &Edge)>::new();
        while let Some(node) = queue.pop_front() {
            if node == to {
                break;
            }
            for edge in self.edges.get(&node).into_iter().flatten() {
                if visited.insert(edge.to.clone()) {
                    parents.insert(edge.to.clone(), (node.clone(), edge));
                    queue.push_back(edge.to.clone());
                }
            }
        }
        if !parents.contains_key(to) {
            return None;
        }
        let mut steps = Vec::new();
        let mut current = to.to_string();
        while current != from {
            let (prev, edge) = parents.get(&current)?;
            steps.push(ConversionStep {
                base_currency: prev.clone(),
                quote_currency: edge.to.clone(),
                rate: edge.rate,
                source: edge.source.clone(),
            });
            current = prev.clone();
        }
        steps.reverse();
        Some(steps)
    }
}

/// Converts amounts between any two currencies connected by stored exchange rates.
///
/// Conversion only reads from the rate store, so a single converter can be shared by many concurrent callers.
pub struct CurrencyConverter<B> {
    db: B,
    currencies: CurrencyTable,
    clock: Arc<dyn Clock>,
}

impl<B> Debug for CurrencyConverter<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CurrencyConverter")
    }
}

impl<B> CurrencyConverter<B> {
    pub fn new(db: B, currencies: CurrencyTable) -> Self {
        Self { db, currencies, clock: system_clock() }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn currencies(&self) -> &CurrencyTable {
        &self.currencies
    }

    /// Rounds half away from zero to the currency's canonical precision, keeping trailing zeros.
    pub fn to_canonical(&self, amount: Decimal, currency: &str) -> Decimal {
        let dp = self.currencies.decimals(currency);
        let mut rounded = amount.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(dp);
        rounded
    }
}

impl<B> CurrencyConverter<B>
where B: RateStore
{
    pub async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<ConversionResult, ConversionError> {
        let from = from.to_ascii_uppercase();
        let to = to.to_ascii_uppercase();
        if from == to {
            return Ok(ConversionResult {
                amount: self.to_canonical(amount, &to),
                from_currency: from,
                to_currency: to,
                steps: vec![],
                updated_at: self.clock.now(),
                is_volatile: false,
            });
        }
        let rates = self.db.fetch_all_latest().await?;
        trace!("💱️ Building rate graph from {} observations", rates.len());
        let graph = RateGraph::new(rates);
        let steps = graph.shortest_path(&from, &to).ok_or_else(|| {
            debug!("💱️ No conversion path from {from} to {to}");
            ConversionError::NoPath { from: from.clone(), to: to.clone() }
        })?;
        let raw = steps
            .iter()
            .try_fold(amount, |acc, step| acc.checked_mul(step.rate))
            .ok_or_else(|| ConversionError::Overflow { amount, from: from.clone(), to: to.clone() })?;
        // a path always has at least one step here, since from != to
        let updated_at = steps.iter().map(|s| s.source.updated_at).min().unwrap_or_else(|| self.clock.now());
        let is_volatile = steps.iter().any(|s| s.source.is_volatile);
        let result = ConversionResult {
            amount: self.to_canonical(raw, &to),
            from_currency: from,
            to_currency: to,
            steps,
            updated_at,
            is_volatile,
        };
        debug!("💱️ {amount} {} => {result}", result.from_currency);
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{db::memory::MemoryDatabase, db_types::NewExchangeRate};

    async fn seed(db: &MemoryDatabase, rates: &[(&str, &str, Decimal)]) {
        for (base, quote, rate) in rates {
            db.insert_rate(NewExchangeRate::new(base, quote, *rate, "test")).await.unwrap();
        }
    }

    fn converter(db: &MemoryDatabase) -> CurrencyConverter<MemoryDatabase> {
        CurrencyConverter::new(db.clone(), CurrencyTable::default())
    }

    #[tokio::test]
    async fn identity_conversion_rescales() {
        let db = MemoryDatabase::new();
        let result = converter(&db).convert(dec!(10.005), "pln", "PLN").await.unwrap();
        assert_eq!(result.amount, dec!(10.01));
        assert!(result.steps.is_empty());
        assert!(!result.is_volatile);
        let result = converter(&db).convert(dec!(3), "YEC", "YEC").await.unwrap();
        assert_eq!(result.amount.to_string(), "3.00000000");
    }

    #[tokio::test]
    async fn multi_hop() {
        let db = MemoryDatabase::new();
        seed(&db, &[("YEC", "USDT", dec!(1.5)), ("USDT", "USD", dec!(1.0)), ("USD", "PLN", dec!(4.0))]).await;
        let result = converter(&db).convert(dec!(2), "YEC", "PLN").await.unwrap();
        assert_eq!(result.amount, dec!(12));
        assert_eq!(result.amount.to_string(), "12.00");
        assert_eq!(result.steps.len(), 3);
        let path = result.steps.iter().map(|s| s.quote_currency.as_str()).collect::<Vec<_>>();
        assert_eq!(path, vec!["USDT", "USD", "PLN"]);
    }

    #[tokio::test]
    async fn inverse_edge() {
        let db = MemoryDatabase::new();
        seed(&db, &[("YEC", "PLN", dec!(4.0))]).await;
        let result = converter(&db).convert(dec!(12), "PLN", "YEC").await.unwrap();
        assert_eq!(result.amount, dec!(3));
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].rate, dec!(0.25));
        assert!(result.steps[0].is_inverse());
        assert_eq!(result.steps[0].source.base_currency, "YEC");
    }

    #[tokio::test]
    async fn direct_rate_beats_longer_path() {
        let db = MemoryDatabase::new();
        seed(&db, &[("YEC", "USDT", dec!(1.5)), ("USDT", "PLN", dec!(4)), ("YEC", "PLN", dec!(7))]).await;
        let result = converter(&db).convert(dec!(1), "YEC", "PLN").await.unwrap();
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.amount, dec!(7));
    }

    #[tokio::test]
    async fn no_path() {
        let db = MemoryDatabase::new();
        seed(&db, &[("YEC", "USDT", dec!(1.5)), ("EUR", "PLN", dec!(4.3))]).await;
        let err = converter(&db).convert(dec!(1), "YEC", "PLN").await.unwrap_err();
        assert!(matches!(err, ConversionError::NoPath { .. }));
        assert_eq!(err.to_string(), "no path from YEC to PLN");
        let err = converter(&db).convert(dec!(1), "XMR", "PLN").await.unwrap_err();
        assert_eq!(err.to_string(), "no path from XMR to PLN");
    }

    #[tokio::test]
    async fn freshness_and_volatility_come_from_the_weakest_link() {
        let db = MemoryDatabase::new();
        let now = Utc::now();
        let old = now - Duration::minutes(30);
        db.insert_rate(NewExchangeRate::new("YEC", "USDT", dec!(1.5), "a").at(now).volatile(true)).await.unwrap();
        db.insert_rate(NewExchangeRate::new("USDT", "PLN", dec!(4), "b").at(old)).await.unwrap();
        let result = converter(&db).convert(dec!(1), "YEC", "PLN").await.unwrap();
        assert_eq!(result.updated_at, old);
        assert!(result.is_volatile);
        assert_eq!(result.effective_rate(), Some(dec!(6.0)));
    }

    #[tokio::test]
    async fn rounds_only_at_the_end() {
        let db = MemoryDatabase::new();
        seed(&db, &[("USD", "PLN", dec!(3))]).await;
        // 1/3 per hop would lose precision if each hop were rounded to 2dp
        let result = converter(&db).convert(dec!(100), "PLN", "USD").await.unwrap();
        assert_eq!(result.amount, dec!(33.33));
        let result = converter(&db).convert(dec!(0.05), "PLN", "USD").await.unwrap();
        assert_eq!(result.amount, dec!(0.02));
    }

    #[test]
    fn equal_paths_resolve_in_code_order() {
        let now = Utc::now();
        let rates = vec![
            NewExchangeRate::new("YEC", "USDT", dec!(1), "a").at(now).into_exchange_rate(1),
            NewExchangeRate::new("USDT", "PLN", dec!(4), "a").at(now).into_exchange_rate(2),
            NewExchangeRate::new("YEC", "EUR", dec!(1), "a").at(now).into_exchange_rate(3),
            NewExchangeRate::new("EUR", "PLN", dec!(4.3), "a").at(now).into_exchange_rate(4),
        ];
        let mut reversed = rates.clone();
        reversed.reverse();
        let a = RateGraph::new(rates).shortest_path("YEC", "PLN").unwrap();
        let b = RateGraph::new(reversed).shortest_path("YEC", "PLN").unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].quote_currency, "EUR");
    }
}
