//! Scenario assumptions: ages, return rates, inflation, contributions and
//! withdrawal strategy

mod returns;
pub mod loader;

pub use returns::{RateSource, ReturnSchedule};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::records::AssetBucket;

pub const DEFAULT_CURRENT_AGE: u32 = 35;
pub const DEFAULT_RETIREMENT_AGE: u32 = 60;
pub const DEFAULT_LIFE_EXPECTANCY: u32 = 85;
pub const DEFAULT_INFLATION_PCT: f64 = 6.0;
pub const DEFAULT_EQUITY_RETURN_PCT: f64 = 12.0;
pub const DEFAULT_DEBT_RETURN_PCT: f64 = 7.0;

/// Share of current income assumed as retirement expense when none is given
pub const DEFAULT_EXPENSE_REPLACEMENT: f64 = 0.70;

/// One `[from_year, to_year] -> rate` override range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateOverride {
    pub from_year: i32,
    pub to_year: i32,
    /// Annual rate (%) for the range
    pub rate_pct: f64,
}

impl RateOverride {
    pub fn new(from_year: i32, to_year: i32, rate_pct: f64) -> Self {
        Self { from_year, to_year, rate_pct }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.from_year..=self.to_year).contains(&year)
    }
}

/// "Reduce by X% every N years" rule for rate-stable instruments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateDecay {
    #[serde(default)]
    pub enabled: bool,

    /// Percentage points removed per elapsed interval
    #[serde(default = "default_decay_pct")]
    pub decay_pct: f64,

    #[serde(default = "default_decay_interval")]
    pub interval_years: u32,

    /// Buckets the decay applies to
    #[serde(default = "default_decay_buckets")]
    pub buckets: Vec<AssetBucket>,
}

impl Default for RateDecay {
    fn default() -> Self {
        Self {
            enabled: false,
            decay_pct: default_decay_pct(),
            interval_years: default_decay_interval(),
            buckets: default_decay_buckets(),
        }
    }
}

impl RateDecay {
    pub fn applies_to(&self, bucket: AssetBucket) -> bool {
        self.enabled && self.buckets.contains(&bucket)
    }
}

/// Post-retirement withdrawal strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStrategy {
    /// Inflation-adjusted expense need until the corpus runs out
    SimpleDepletion,
    /// Fixed share of the corpus at retirement, inflated every year
    #[serde(rename = "SAFE_4_PERCENT")]
    Safe4Percent,
    /// Lesser of corpus return and expense need
    Sustainable,
}

impl Default for WithdrawalStrategy {
    fn default() -> Self {
        WithdrawalStrategy::SimpleDepletion
    }
}

/// How often the scenario's lump sum is invested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LumpSumFrequency {
    OneTime,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl LumpSumFrequency {
    pub fn per_year(&self) -> u32 {
        match self {
            LumpSumFrequency::OneTime => 1,
            LumpSumFrequency::Monthly => 12,
            LumpSumFrequency::Quarterly => 4,
            LumpSumFrequency::HalfYearly => 2,
            LumpSumFrequency::Yearly => 1,
        }
    }
}

/// Extra contribution on top of holding SIPs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LumpSumPlan {
    pub amount: f64,
    pub frequency: LumpSumFrequency,
    #[serde(default = "default_lump_sum_bucket")]
    pub bucket: AssetBucket,
}

/// Complete set of assumptions for one projection scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAssumptions {
    #[serde(default = "default_current_age")]
    pub current_age: u32,

    #[serde(default = "default_retirement_age")]
    pub retirement_age: u32,

    #[serde(default = "default_life_expectancy")]
    pub life_expectancy: u32,

    /// Calendar year of `current_age`; the as-of year when absent
    #[serde(default)]
    pub start_year: Option<i32>,

    /// Simple annual return (%) per bucket
    #[serde(default = "default_bucket_returns")]
    pub bucket_returns: BTreeMap<AssetBucket, f64>,

    /// Multi-period return overrides per bucket
    #[serde(default)]
    pub return_overrides: BTreeMap<AssetBucket, Vec<RateOverride>>,

    #[serde(default = "default_inflation")]
    pub inflation_rate: f64,

    /// Annual SIP step-up (%)
    #[serde(default)]
    pub sip_step_up_pct: f64,

    #[serde(default)]
    pub lump_sum: Option<LumpSumPlan>,

    /// First year the step-up and lump-sum settings take effect
    #[serde(default)]
    pub effective_from_year: Option<i32>,

    #[serde(default)]
    pub withdrawal_strategy: WithdrawalStrategy,

    /// Expected corpus return (%) for the sustainable strategy
    #[serde(default = "default_corpus_return")]
    pub corpus_return_rate: f64,

    /// Initial withdrawal rate (%) for the safe-withdrawal strategy
    #[serde(default = "default_withdrawal_rate")]
    pub withdrawal_rate: f64,

    #[serde(default)]
    pub rate_decay: RateDecay,

    /// Monthly living expense in retirement, in today's value
    #[serde(default)]
    pub retirement_monthly_expense: Option<f64>,

    /// Share (%) of income left after fixed obligations that is saved to cash
    #[serde(default)]
    pub income_savings_pct: f64,

    /// Bucket that receives insurance payouts
    #[serde(default = "default_reinvestment_bucket")]
    pub reinvestment_bucket: AssetBucket,
}

impl Default for ScenarioAssumptions {
    fn default() -> Self {
        Self {
            current_age: DEFAULT_CURRENT_AGE,
            retirement_age: DEFAULT_RETIREMENT_AGE,
            life_expectancy: DEFAULT_LIFE_EXPECTANCY,
            start_year: None,
            bucket_returns: default_bucket_returns(),
            return_overrides: BTreeMap::new(),
            inflation_rate: DEFAULT_INFLATION_PCT,
            sip_step_up_pct: 0.0,
            lump_sum: None,
            effective_from_year: None,
            withdrawal_strategy: WithdrawalStrategy::default(),
            corpus_return_rate: default_corpus_return(),
            withdrawal_rate: default_withdrawal_rate(),
            rate_decay: RateDecay::default(),
            retirement_monthly_expense: None,
            income_savings_pct: 0.0,
            reinvestment_bucket: default_reinvestment_bucket(),
        }
    }
}

impl ScenarioAssumptions {
    /// Scenario with the given ages and every other field defaulted
    pub fn with_ages(current_age: u32, retirement_age: u32, life_expectancy: u32) -> Self {
        Self {
            current_age,
            retirement_age,
            life_expectancy,
            ..Self::default()
        }
    }

    /// Reject scenarios that cannot be projected
    ///
    /// Age ordering, rate finiteness and the decay interval are validation
    /// failures. Overlapping override ranges cannot be resolved to a single
    /// rate per year and surface as `MalformedOverrides`.
    pub fn validate(&self) -> EngineResult<()> {
        if self.retirement_age <= self.current_age {
            return Err(EngineError::invalid(format!(
                "retirement age {} must be greater than current age {}",
                self.retirement_age, self.current_age
            )));
        }
        if self.life_expectancy <= self.retirement_age {
            return Err(EngineError::invalid(format!(
                "life expectancy {} must be greater than retirement age {}",
                self.life_expectancy, self.retirement_age
            )));
        }

        let scalar_rates = [
            ("inflation_rate", self.inflation_rate),
            ("sip_step_up_pct", self.sip_step_up_pct),
            ("corpus_return_rate", self.corpus_return_rate),
            ("withdrawal_rate", self.withdrawal_rate),
            ("income_savings_pct", self.income_savings_pct),
        ];
        for (name, value) in scalar_rates {
            if !value.is_finite() {
                return Err(EngineError::invalid(format!("{name} is not a finite number")));
            }
        }
        if let Some((bucket, _)) = self.bucket_returns.iter().find(|(_, r)| !r.is_finite()) {
            return Err(EngineError::invalid(format!("return for {bucket} is not finite")));
        }

        if self.rate_decay.enabled {
            if self.rate_decay.interval_years == 0 {
                return Err(EngineError::invalid("rate decay interval must be at least one year"));
            }
            if !self.rate_decay.decay_pct.is_finite() || self.rate_decay.decay_pct < 0.0 {
                return Err(EngineError::invalid("rate decay must be a non-negative number"));
            }
        }

        for (bucket, ranges) in &self.return_overrides {
            validate_overrides(*bucket, ranges)?;
        }

        Ok(())
    }

    /// Calendar year of retirement given the projection start year
    pub fn retirement_year(&self, start_year: i32) -> i32 {
        start_year + (self.retirement_age - self.current_age) as i32
    }

    /// Calendar year of life expectancy given the projection start year
    pub fn final_year(&self, start_year: i32) -> i32 {
        start_year + (self.life_expectancy - self.current_age) as i32
    }

    /// First year the step-up and lump-sum settings apply
    pub fn effective_year(&self, start_year: i32) -> i32 {
        self.effective_from_year.unwrap_or(start_year).max(start_year)
    }
}

fn validate_overrides(bucket: AssetBucket, ranges: &[RateOverride]) -> EngineResult<()> {
    for range in ranges {
        if range.from_year > range.to_year {
            return Err(EngineError::invalid(format!(
                "return override for {bucket} runs backwards: {} > {}",
                range.from_year, range.to_year
            )));
        }
        if !range.rate_pct.is_finite() {
            return Err(EngineError::invalid(format!(
                "return override for {bucket} has a non-finite rate"
            )));
        }
    }

    let mut sorted: Vec<&RateOverride> = ranges.iter().collect();
    sorted.sort_by_key(|r| r.from_year);
    for pair in sorted.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if second.from_year <= first.to_year {
            return Err(EngineError::MalformedOverrides {
                bucket,
                first_from: first.from_year,
                first_to: first.to_year,
                second_from: second.from_year,
                second_to: second.to_year,
            });
        }
    }
    Ok(())
}

fn default_current_age() -> u32 {
    DEFAULT_CURRENT_AGE
}

fn default_retirement_age() -> u32 {
    DEFAULT_RETIREMENT_AGE
}

fn default_life_expectancy() -> u32 {
    DEFAULT_LIFE_EXPECTANCY
}

fn default_inflation() -> f64 {
    DEFAULT_INFLATION_PCT
}

fn default_bucket_returns() -> BTreeMap<AssetBucket, f64> {
    BTreeMap::from([
        (AssetBucket::EquityMf, DEFAULT_EQUITY_RETURN_PCT),
        (AssetBucket::DebtMf, DEFAULT_DEBT_RETURN_PCT),
    ])
}

fn default_corpus_return() -> f64 {
    8.0
}

fn default_withdrawal_rate() -> f64 {
    4.0
}

fn default_decay_pct() -> f64 {
    0.5
}

fn default_decay_interval() -> u32 {
    5
}

fn default_decay_buckets() -> Vec<AssetBucket> {
    AssetBucket::ALL.into_iter().filter(|b| b.is_rate_stable()).collect()
}

fn default_lump_sum_bucket() -> AssetBucket {
    AssetBucket::EquityMf
}

fn default_reinvestment_bucket() -> AssetBucket {
    AssetBucket::DebtMf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let scenario = ScenarioAssumptions::default();
        assert_eq!(scenario.inflation_rate, 6.0);
        assert_eq!(scenario.bucket_returns[&AssetBucket::EquityMf], 12.0);
        assert_eq!(scenario.bucket_returns[&AssetBucket::DebtMf], 7.0);
        assert_eq!(scenario.retirement_age, 60);
        assert_eq!(scenario.life_expectancy, 85);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let scenario: ScenarioAssumptions =
            serde_json::from_str(r#"{"current_age": 30, "withdrawal_strategy": "SAFE_4_PERCENT"}"#)
                .unwrap();
        assert_eq!(scenario.current_age, 30);
        assert_eq!(scenario.retirement_age, 60);
        assert_eq!(scenario.withdrawal_strategy, WithdrawalStrategy::Safe4Percent);
        assert_eq!(scenario.rate_decay.buckets.len(), 4);
    }

    #[test]
    fn test_retirement_before_current_age_rejected() {
        let scenario = ScenarioAssumptions::with_ages(60, 60, 85);
        let err = scenario.validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_life_expectancy_before_retirement_rejected() {
        let scenario = ScenarioAssumptions::with_ages(30, 60, 55);
        assert!(scenario.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_overlapping_overrides_rejected() {
        let mut scenario = ScenarioAssumptions::default();
        scenario.return_overrides.insert(
            AssetBucket::EquityMf,
            vec![RateOverride::new(2030, 2035, 10.0), RateOverride::new(2025, 2030, 12.0)],
        );
        let err = scenario.validate().unwrap_err();
        assert!(matches!(err, EngineError::MalformedOverrides { bucket: AssetBucket::EquityMf, .. }));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_adjacent_overrides_accepted() {
        let mut scenario = ScenarioAssumptions::default();
        scenario.return_overrides.insert(
            AssetBucket::DebtMf,
            vec![RateOverride::new(2025, 2029, 7.5), RateOverride::new(2030, 2040, 6.5)],
        );
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_zero_decay_interval_rejected() {
        let mut scenario = ScenarioAssumptions::default();
        scenario.rate_decay.enabled = true;
        scenario.rate_decay.interval_years = 0;
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_calendar_years() {
        let scenario = ScenarioAssumptions::with_ages(30, 60, 85);
        assert_eq!(scenario.retirement_year(2026), 2056);
        assert_eq!(scenario.final_year(2026), 2081);
    }
}
