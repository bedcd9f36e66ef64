//! Percentile statistics over trial outcomes

use serde::Serialize;

/// Percentile with linear interpolation between closest ranks
///
/// Sorts `values` in place. Empty input yields 0.
pub fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(values, p)
}

/// Same as `percentile` for already sorted values
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    match n {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let w = rank - lower as f64;
        sorted[lower] * (1.0 - w) + sorted[upper] * w
    }
}

/// p10 / p50 / p90 of a set of outcomes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileBand {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

impl PercentileBand {
    pub fn from_values(values: &mut [f64]) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        Self {
            p10: percentile_sorted(values, 10.0),
            p50: percentile_sorted(values, 50.0),
            p90: percentile_sorted(values, 90.0),
        }
    }

    /// Distance between p90 and p10
    pub fn spread(&self) -> f64 {
        self.p90 - self.p10
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentile_interpolates_between_points() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(percentile(&mut values, 25.0), 1.75);
        assert_relative_eq!(percentile(&mut values, 50.0), 2.5);
        assert_eq!(percentile(&mut values, 100.0), 4.0);
    }

    #[test]
    fn test_percentile_edge_sizes() {
        assert_eq!(percentile(&mut [], 50.0), 0.0);
        assert_eq!(percentile(&mut [7.0], 90.0), 7.0);
    }

    #[test]
    fn test_band_ordering() {
        let mut values: Vec<f64> = (1..=101).map(f64::from).rev().collect();
        let band = PercentileBand::from_values(&mut values);
        assert_eq!(band.p10, 11.0);
        assert_eq!(band.p50, 51.0);
        assert_eq!(band.p90, 91.0);
        assert_eq!(band.spread(), 80.0);
    }

    #[test]
    fn test_sample_variance() {
        assert_relative_eq!(variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 32.0 / 7.0);
        assert_eq!(variance(&[1.0]), 0.0);
    }
}
