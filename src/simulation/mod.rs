//! Monte Carlo simulation of the corpus projection under randomized returns
//!
//! Every trial replays the projector's precomputed cash flows with its own
//! perturbed return schedule. Trial `i` draws from ChaCha20 stream `i` of the
//! configured seed, so results are reproducible and independent of how rayon
//! schedules the trials. Aggregation runs only once every trial has finished.
//!
//! Trials always run through life expectancy and success is judged on the
//! whole path. The configured horizon only limits the years reported in the
//! percentile bands and the typical path.

mod perturbed;
pub mod stats;

pub use perturbed::{bucket_distributions, PerturbedRates};
pub use stats::{percentile, PercentileBand};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::projection::CorpusProjector;

pub const DEFAULT_TRIALS: u32 = 1000;
pub const DEFAULT_HORIZON_YEARS: u32 = 10;
pub const DEFAULT_SEED: u64 = 42;

/// Trial count, horizon and seed for one simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_trials")]
    pub trials: u32,

    /// Years reported in the bands; `None` reports through life expectancy
    #[serde(default = "default_horizon")]
    pub horizon_years: Option<u32>,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            horizon_years: default_horizon(),
            seed: DEFAULT_SEED,
        }
    }
}

impl MonteCarloConfig {
    /// Report bands through life expectancy
    pub fn full_life(trials: u32, seed: u64) -> Self {
        Self {
            trials,
            horizon_years: None,
            seed,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.trials == 0 {
            return Err(EngineError::invalid("trial count must be positive"));
        }
        if self.horizon_years == Some(0) {
            return Err(EngineError::invalid("simulation horizon must be positive"));
        }
        Ok(())
    }
}

/// Percentiles of the closing corpus in one simulated year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearBand {
    pub year: i32,
    pub age: u32,
    #[serde(flatten)]
    pub band: PercentileBand,
}

/// Aggregated outcome of all trials
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub trials: u32,
    pub seed: u64,
    pub horizon_years: u32,
    pub bands: Vec<YearBand>,
    pub terminal: PercentileBand,
    pub mean_terminal: f64,
    /// Share of trials with no shortfall through life expectancy
    pub success_probability: f64,
    /// Closing corpus path of the trial whose terminal value is nearest the median
    pub typical_path: Vec<f64>,
}

struct TrialPath {
    closing: Vec<f64>,
    shortfall: bool,
}

pub struct MonteCarloEngine {
    config: MonteCarloConfig,
}

impl MonteCarloEngine {
    pub fn new(config: MonteCarloConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Run every trial in parallel and aggregate
    pub fn run(&self, projector: &CorpusProjector<'_>) -> EngineResult<SimulationResult> {
        let full = projector.full_horizon();
        if full == 0 {
            return Err(EngineError::invalid("projection has no years to simulate"));
        }
        let horizon = self.config.horizon_years.map_or(full, |h| h.min(full));

        let distributions = bucket_distributions()?;
        let seed = self.config.seed;

        let paths = (0..self.config.trials)
            .into_par_iter()
            .map(|trial| -> EngineResult<TrialPath> {
                let mut rng = ChaCha20Rng::seed_from_u64(seed);
                rng.set_stream(u64::from(trial));
                let rates =
                    PerturbedRates::sample(projector.rates(), full as usize, &distributions, &mut rng);
                let result = projector.run_without_events(&rates, None)?;
                let mut closing = result.trajectory();
                closing.truncate(horizon as usize);
                Ok(TrialPath {
                    closing,
                    shortfall: result.has_shortfall(),
                })
            })
            .collect::<EngineResult<Vec<TrialPath>>>()?;

        let result = self.aggregate(projector, horizon, &paths);
        log::info!(
            "simulated {} trials over {} years: success {:.1}%, median terminal {:.0}",
            result.trials,
            result.horizon_years,
            result.success_probability * 100.0,
            result.terminal.p50
        );
        Ok(result)
    }

    fn aggregate(&self, projector: &CorpusProjector<'_>, horizon: u32, paths: &[TrialPath]) -> SimulationResult {
        let start_year = projector.flows().start_year();
        let current_age = projector.scenario().current_age;

        let bands = (0..horizon as usize)
            .map(|i| {
                let mut column: Vec<f64> =
                    paths.iter().map(|p| p.closing.get(i).copied().unwrap_or(0.0)).collect();
                YearBand {
                    year: start_year + i as i32,
                    age: current_age + i as u32,
                    band: PercentileBand::from_values(&mut column),
                }
            })
            .collect();

        let terminals: Vec<f64> = paths
            .iter()
            .map(|p| p.closing.last().copied().unwrap_or(0.0))
            .collect();
        let mut sorted = terminals.clone();
        let terminal = PercentileBand::from_values(&mut sorted);

        let typical_path = terminals
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - terminal.p50).abs().total_cmp(&(*b - terminal.p50).abs()))
            .map(|(i, _)| paths[i].closing.clone())
            .unwrap_or_default();

        let successes = paths.iter().filter(|p| !p.shortfall).count();

        SimulationResult {
            trials: self.config.trials,
            seed: self.config.seed,
            horizon_years: horizon,
            bands,
            terminal,
            mean_terminal: stats::mean(&terminals),
            success_probability: successes as f64 / paths.len() as f64,
            typical_path,
        }
    }
}

fn default_trials() -> u32 {
    DEFAULT_TRIALS
}

fn default_horizon() -> Option<u32> {
    Some(DEFAULT_HORIZON_YEARS)
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::ScenarioAssumptions;
    use crate::records::{AssetBucket, FinancialRecordSet, IncomeStream, InvestmentHolding};
    use chrono::NaiveDate;

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn records() -> FinancialRecordSet {
        FinancialRecordSet {
            income_streams: vec![IncomeStream::new("Salary", 100_000.0, 7.0)],
            holdings: vec![
                InvestmentHolding::new("Equity fund", AssetBucket::EquityMf, 1_000_000.0).with_sip(10_000.0, 1),
                InvestmentHolding::new("Debt fund", AssetBucket::DebtMf, 500_000.0),
            ],
            ..Default::default()
        }
    }

    fn config(trials: u32, seed: u64) -> MonteCarloConfig {
        MonteCarloConfig {
            trials,
            horizon_years: Some(10),
            seed,
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let records = records();
        let scenario = ScenarioAssumptions::with_ages(30, 60, 85);
        let projector = CorpusProjector::new(&records, &scenario, jan_first()).unwrap();
        let engine = MonteCarloEngine::new(config(200, 11)).unwrap();

        let first = engine.run(&projector).unwrap();
        let second = engine.run(&projector).unwrap();
        assert_eq!(first, second);

        let other = MonteCarloEngine::new(config(200, 12)).unwrap().run(&projector).unwrap();
        assert_ne!(first.terminal, other.terminal);
    }

    #[test]
    fn test_more_trials_tighten_median_noise() {
        let records = records();
        let scenario = ScenarioAssumptions::with_ages(30, 60, 85);
        let projector = CorpusProjector::new(&records, &scenario, jan_first()).unwrap();

        let medians = |trials: u32| -> Vec<f64> {
            (0..10u64)
                .map(|seed| {
                    MonteCarloEngine::new(config(trials, seed))
                        .unwrap()
                        .run(&projector)
                        .unwrap()
                        .terminal
                        .p50
                })
                .collect()
        };

        let small = stats::variance(&medians(50));
        let large = stats::variance(&medians(800));
        assert!(large < small, "variance with 800 trials {large} not below 50 trials {small}");
    }

    #[test]
    fn test_bands_are_ordered_and_sized() {
        let records = records();
        let scenario = ScenarioAssumptions::with_ages(30, 60, 85);
        let projector = CorpusProjector::new(&records, &scenario, jan_first()).unwrap();
        let result = MonteCarloEngine::new(config(300, 1)).unwrap().run(&projector).unwrap();

        assert_eq!(result.bands.len(), 10);
        assert_eq!(result.bands[0].year, 2026);
        assert_eq!(result.bands[9].age, 39);
        assert!(result.bands.iter().all(|b| b.band.p10 <= b.band.p50 && b.band.p50 <= b.band.p90));
        assert_eq!(result.typical_path.len(), 10);
        assert!((0.0..=1.0).contains(&result.success_probability));
    }

    #[test]
    fn test_success_judged_through_life_expectancy() {
        let records = FinancialRecordSet {
            holdings: vec![InvestmentHolding::new("Savings", AssetBucket::Cash, 100_000.0)],
            ..Default::default()
        };
        let mut scenario = ScenarioAssumptions::with_ages(35, 60, 85);
        scenario.retirement_monthly_expense = Some(100_000.0);
        let projector = CorpusProjector::new(&records, &scenario, jan_first()).unwrap();

        let deterministic = projector.project(None).unwrap();
        assert_eq!(deterministic.first_shortfall_year, Some(2051));
        assert!(!projector.project(Some(10)).unwrap().has_shortfall());

        let result = MonteCarloEngine::new(MonteCarloConfig::default())
            .unwrap()
            .run(&projector)
            .unwrap();
        assert_eq!(result.horizon_years, 10);
        assert_eq!(result.bands.len(), 10);
        assert_eq!(result.typical_path.len(), 10);
        assert!(result.success_probability < 1.0);
        assert_eq!(result.success_probability, 0.0);
    }

    #[test]
    fn test_reported_horizon_does_not_change_success() {
        let records = records();
        let mut scenario = ScenarioAssumptions::with_ages(50, 55, 85);
        scenario.retirement_monthly_expense = Some(150_000.0);
        let projector = CorpusProjector::new(&records, &scenario, jan_first()).unwrap();

        let short = MonteCarloEngine::new(config(100, 4)).unwrap().run(&projector).unwrap();
        let full = MonteCarloEngine::new(MonteCarloConfig::full_life(100, 4))
            .unwrap()
            .run(&projector)
            .unwrap();
        assert_eq!(short.success_probability, full.success_probability);
        assert_eq!(full.bands.len(), 36);
        assert_eq!(short.bands[..], full.bands[..10]);
    }

    #[test]
    fn test_unfundable_plan_never_succeeds() {
        let records = FinancialRecordSet {
            holdings: vec![InvestmentHolding::new("Savings", AssetBucket::Cash, 100_000.0)],
            ..Default::default()
        };
        let mut scenario = ScenarioAssumptions::with_ages(59, 60, 65);
        scenario.retirement_monthly_expense = Some(100_000.0);
        let projector = CorpusProjector::new(&records, &scenario, jan_first()).unwrap();
        let result = MonteCarloEngine::new(MonteCarloConfig::full_life(100, 3))
            .unwrap()
            .run(&projector)
            .unwrap();

        assert_eq!(result.horizon_years, 7);
        assert_eq!(result.success_probability, 0.0);
    }

    #[test]
    fn test_horizon_capped_at_life_expectancy() {
        let records = records();
        let scenario = ScenarioAssumptions::with_ages(60, 70, 75);
        let projector = CorpusProjector::new(&records, &scenario, jan_first()).unwrap();
        let config = MonteCarloConfig {
            horizon_years: Some(40),
            ..config(20, 5)
        };
        let result = MonteCarloEngine::new(config).unwrap().run(&projector).unwrap();
        assert_eq!(result.horizon_years, 16);
    }

    #[test]
    fn test_non_positive_inputs_rejected() {
        let err = MonteCarloEngine::new(config(0, 1)).err().unwrap();
        assert!(err.is_validation());

        let zero_horizon = MonteCarloConfig {
            horizon_years: Some(0),
            ..MonteCarloConfig::default()
        };
        assert!(MonteCarloEngine::new(zero_horizon).err().unwrap().is_validation());
    }

    #[test]
    fn test_config_defaults() {
        let config: MonteCarloConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MonteCarloConfig::default());
        assert_eq!(config.trials, 1000);
        assert_eq!(config.horizon_years, Some(10));
    }
}
