mod rates;

pub use rates::latest_per_pair;
