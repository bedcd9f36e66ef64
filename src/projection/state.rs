//! Per-bucket corpus balances carried from year to year

use std::ops::{Index, IndexMut};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::records::{AssetBucket, InvestmentHolding};

/// Corpus value held in each asset bucket
///
/// Serializes as a `{ "BUCKET": value }` map holding only the non-zero
/// buckets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BucketBalances([f64; AssetBucket::COUNT]);

impl BucketBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate holdings by bucket, ignoring negative values
    pub fn from_holdings<'h>(holdings: impl IntoIterator<Item = &'h InvestmentHolding>) -> Self {
        let mut balances = Self::new();
        for holding in holdings {
            balances[holding.bucket] += holding.current_value.max(0.0);
        }
        balances
    }

    pub fn get(&self, bucket: AssetBucket) -> f64 {
        self.0[bucket.index()]
    }

    pub fn add(&mut self, bucket: AssetBucket, amount: f64) {
        self.0[bucket.index()] += amount;
    }

    pub fn add_all(&mut self, other: &BucketBalances) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            *mine += theirs;
        }
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Non-zero buckets with their balances, in bucket order
    pub fn iter(&self) -> impl Iterator<Item = (AssetBucket, f64)> + '_ {
        AssetBucket::ALL
            .into_iter()
            .map(|b| (b, self.get(b)))
            .filter(|(_, v)| *v != 0.0)
    }

    /// Grow every bucket by its annual rate (%), returning the total growth
    ///
    /// Rates below -100% are clamped so a bucket can lose at most its value.
    pub fn grow(&mut self, mut rate_pct: impl FnMut(AssetBucket) -> f64) -> f64 {
        let mut growth = 0.0;
        for bucket in AssetBucket::ALL {
            let rate = rate_pct(bucket).max(-100.0) / 100.0;
            let delta = self[bucket] * rate;
            self[bucket] += delta;
            growth += delta;
        }
        growth
    }
}

impl Index<AssetBucket> for BucketBalances {
    type Output = f64;

    fn index(&self, bucket: AssetBucket) -> &f64 {
        &self.0[bucket.index()]
    }
}

impl IndexMut<AssetBucket> for BucketBalances {
    fn index_mut(&mut self, bucket: AssetBucket) -> &mut f64 {
        &mut self.0[bucket.index()]
    }
}

impl Serialize for BucketBalances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<(AssetBucket, f64)> = self.iter().collect();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (bucket, value) in entries {
            map.serialize_entry(&bucket, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_holdings_aggregates_by_bucket() {
        let holdings = vec![
            InvestmentHolding::new("Index fund", AssetBucket::EquityMf, 300_000.0),
            InvestmentHolding::new("Flexi cap", AssetBucket::EquityMf, 200_000.0),
            InvestmentHolding::new("Savings", AssetBucket::Cash, 50_000.0),
        ];
        let balances = BucketBalances::from_holdings(&holdings);

        assert_eq!(balances[AssetBucket::EquityMf], 500_000.0);
        assert_eq!(balances.total(), 550_000.0);
    }

    #[test]
    fn test_grow_clamps_below_total_loss() {
        let mut balances = BucketBalances::new();
        balances.add(AssetBucket::Crypto, 1_000.0);
        balances.add(AssetBucket::Ppf, 1_000.0);

        let growth = balances.grow(|b| if b == AssetBucket::Crypto { -150.0 } else { 7.1 });

        assert_eq!(balances[AssetBucket::Crypto], 0.0);
        assert_relative_eq!(balances[AssetBucket::Ppf], 1_071.0, epsilon = 1e-9);
        assert_relative_eq!(growth, -1_000.0 + 71.0, epsilon = 1e-9);
    }

    #[test]
    fn test_serializes_non_zero_buckets() {
        let mut balances = BucketBalances::new();
        balances.add(AssetBucket::FixedDeposit, 10.0);
        let json = serde_json::to_string(&balances).unwrap();
        assert_eq!(json, r#"{"FD":10.0}"#);
    }
}
