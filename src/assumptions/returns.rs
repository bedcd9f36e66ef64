//! Effective annual return per asset bucket and calendar year
//!
//! Resolution order:
//! 1. a multi-period override whose `[from_year, to_year]` contains the year,
//!    returned as is
//! 2. the bucket's simple rate (scenario, then holdings, then bucket default)
//! 3. rate decay on the simple rate, when enabled for the bucket: every full
//!    `interval_years` since the start year removes `decay_pct`. The
//!    reduction is measured against the simple rate, not the previously
//!    decayed one, and never takes the rate below zero.

use crate::records::{AssetBucket, InvestmentHolding};

use super::ScenarioAssumptions;

/// Supplies the annual rate (%) a bucket earns in a calendar year
pub trait RateSource {
    fn annual_rate(&self, bucket: AssetBucket, year: i32) -> f64;
}

/// Deterministic return schedule for one scenario
#[derive(Debug, Clone)]
pub struct ReturnSchedule<'a> {
    scenario: &'a ScenarioAssumptions,
    start_year: i32,
    base_rates: [f64; AssetBucket::COUNT],
}

impl<'a> ReturnSchedule<'a> {
    /// Build the schedule, deriving each bucket's simple rate
    ///
    /// A bucket without a scenario rate takes the value-weighted expected
    /// return of the holdings in it, and failing that the bucket default.
    pub fn new(
        scenario: &'a ScenarioAssumptions,
        start_year: i32,
        holdings: &[InvestmentHolding],
    ) -> Self {
        let mut base_rates = [0.0; AssetBucket::COUNT];
        for bucket in AssetBucket::ALL {
            base_rates[bucket.index()] = scenario
                .bucket_returns
                .get(&bucket)
                .copied()
                .or_else(|| weighted_holding_return(bucket, holdings))
                .unwrap_or_else(|| bucket.default_return_pct());
        }

        Self {
            scenario,
            start_year,
            base_rates,
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Simple rate before overrides and decay
    pub fn base_rate(&self, bucket: AssetBucket) -> f64 {
        self.base_rates[bucket.index()]
    }

    /// Effective annual rate (%) for the bucket in the given year
    pub fn resolve(&self, bucket: AssetBucket, year: i32) -> f64 {
        let overridden = self
            .scenario
            .return_overrides
            .get(&bucket)
            .and_then(|ranges| ranges.iter().find(|r| r.contains(year)));
        if let Some(range) = overridden {
            return range.rate_pct;
        }

        let rate = self.base_rate(bucket);
        let decay = &self.scenario.rate_decay;
        if !decay.applies_to(bucket) || decay.interval_years == 0 {
            return rate;
        }

        let elapsed = (year - self.start_year).max(0) as u32;
        let steps = elapsed / decay.interval_years;
        (rate - steps as f64 * decay.decay_pct).max(0.0)
    }
}

impl RateSource for ReturnSchedule<'_> {
    fn annual_rate(&self, bucket: AssetBucket, year: i32) -> f64 {
        self.resolve(bucket, year)
    }
}

fn weighted_holding_return(bucket: AssetBucket, holdings: &[InvestmentHolding]) -> Option<f64> {
    let (weighted, weight) = holdings
        .iter()
        .filter(|h| h.bucket == bucket)
        .filter_map(|h| h.expected_return_pct.map(|r| (r, h.current_value.max(0.0))))
        .fold((0.0, 0.0), |(sum, total), (rate, value)| (sum + rate * value, total + value));

    if weight > 0.0 {
        Some(weighted / weight)
    } else {
        None
    }
}
