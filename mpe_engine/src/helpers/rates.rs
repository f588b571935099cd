use std::collections::BTreeMap;

use crate::db_types::ExchangeRate;

/// Collapses a history of observations to the newest one per unordered currency pair.
///
/// The newest is the one with the greatest `updated_at`; equal timestamps go to the greatest id, i.e. the last one
/// inserted. The result is sorted by pair key.
pub fn latest_per_pair<I>(rates: I) -> Vec<ExchangeRate>
where I: IntoIterator<Item = ExchangeRate> {
    let mut latest = BTreeMap::<(String, String), ExchangeRate>::new();
    for rate in rates {
        let key = rate.pair_key();
        match latest.get(&key) {
            Some(current) if (current.updated_at, current.id) >= (rate.updated_at, rate.id) => {},
            _ => {
                latest.insert(key, rate);
            },
        }
    }
    latest.into_values().collect()
}
