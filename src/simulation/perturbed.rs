//! Randomized return schedule for one Monte Carlo trial

use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};

use crate::assumptions::{RateSource, ReturnSchedule};
use crate::error::{EngineError, EngineResult};
use crate::records::AssetBucket;

/// Scheduled rate plus normally distributed noise per bucket and year
///
/// The noise is drawn up front, year by year in bucket order, so a trial's
/// path depends only on its random stream.
#[derive(Debug, Clone)]
pub struct PerturbedRates<'s, 'a> {
    base: &'s ReturnSchedule<'a>,
    noise: Vec<[f64; AssetBucket::COUNT]>,
}

impl<'s, 'a> PerturbedRates<'s, 'a> {
    pub fn sample(
        base: &'s ReturnSchedule<'a>,
        years: usize,
        distributions: &[Normal<f64>],
        rng: &mut ChaCha20Rng,
    ) -> Self {
        let mut noise = Vec::with_capacity(years);
        for _ in 0..years {
            let mut row = [0.0; AssetBucket::COUNT];
            for (slot, dist) in row.iter_mut().zip(distributions) {
                *slot = dist.sample(&mut *rng);
            }
            noise.push(row);
        }
        Self { base, noise }
    }
}

impl RateSource for PerturbedRates<'_, '_> {
    fn annual_rate(&self, bucket: AssetBucket, year: i32) -> f64 {
        let scheduled = self.base.resolve(bucket, year);
        let offset = usize::try_from(year - self.base.start_year()).ok();
        let noise = offset
            .and_then(|i| self.noise.get(i))
            .map_or(0.0, |row| row[bucket.index()]);
        scheduled + noise
    }
}

/// Zero-mean normal noise per bucket in index order, sigma = bucket volatility
pub fn bucket_distributions() -> EngineResult<Vec<Normal<f64>>> {
    AssetBucket::ALL
        .iter()
        .map(|bucket| Normal::new(0.0, bucket.volatility_pct()).map_err(distribution_error))
        .collect()
}

fn distribution_error(err: rand_distr::NormalError) -> EngineError {
    EngineError::Computation(format!("invalid return distribution: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::ScenarioAssumptions;
    use rand::SeedableRng;

    #[test]
    fn test_noise_centred_on_schedule() {
        let scenario = ScenarioAssumptions::default();
        let schedule = ReturnSchedule::new(&scenario, 2026, &[]);
        let distributions = bucket_distributions().unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let rates = PerturbedRates::sample(&schedule, 2_000, &distributions, &mut rng);

        let mean: f64 = (0..2_000)
            .map(|i| rates.annual_rate(AssetBucket::EquityMf, 2026 + i))
            .sum::<f64>()
            / 2_000.0;
        // Standard error is 18 / sqrt(2000) ~ 0.4
        assert!((mean - 12.0).abs() < 2.0, "mean {mean}");
    }

    #[test]
    fn test_years_beyond_sample_use_schedule() {
        let scenario = ScenarioAssumptions::default();
        let schedule = ReturnSchedule::new(&scenario, 2026, &[]);
        let distributions = bucket_distributions().unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let rates = PerturbedRates::sample(&schedule, 3, &distributions, &mut rng);

        assert_eq!(rates.annual_rate(AssetBucket::DebtMf, 2040), 7.0);
        assert_eq!(rates.annual_rate(AssetBucket::DebtMf, 2020), 7.0);
    }
}
