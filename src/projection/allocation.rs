//! Liquidation order for withdrawals from the corpus

use crate::records::AssetBucket;

use super::state::BucketBalances;

/// Balances below this are treated as zero when drawing
const DRAW_EPSILON: f64 = 1e-9;

/// Outcome of drawing an amount from the corpus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    /// Amount taken from each bucket
    pub sources: BucketBalances,
    pub drawn: f64,
    /// Part of the request the corpus could not cover
    pub unmet: f64,
}

impl Allocation {
    pub fn is_capped(&self) -> bool {
        self.unmet > DRAW_EPSILON
    }
}

/// Draw `amount` from the balances following `AssetBucket::WITHDRAWAL_ORDER`
///
/// Liquid buckets are exhausted before less liquid ones. Balances never go
/// negative; whatever cannot be covered is reported as `unmet`.
pub fn draw(balances: &mut BucketBalances, amount: f64) -> Allocation {
    let mut allocation = Allocation::default();
    if amount <= 0.0 {
        return allocation;
    }

    let mut remaining = amount;
    for bucket in AssetBucket::WITHDRAWAL_ORDER {
        if remaining <= DRAW_EPSILON {
            break;
        }
        let available = balances[bucket];
        if available <= DRAW_EPSILON {
            continue;
        }
        let take = available.min(remaining);
        balances[bucket] -= take;
        allocation.sources[bucket] += take;
        remaining -= take;
    }

    allocation.drawn = amount - remaining.max(0.0);
    allocation.unmet = if remaining > DRAW_EPSILON { remaining } else { 0.0 };
    allocation
}
