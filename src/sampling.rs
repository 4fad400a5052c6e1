//! Categorical sampling over precomputed weights.

use rand::Rng;

/// Largest accepted deviation of a distribution's sum from 1.0.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Why a weight list was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistributionDefect {
    #[error("candidates have no weights")]
    MissingWeights,
    #[error("{candidates} candidates but {weights} weights")]
    LengthMismatch { candidates: usize, weights: usize },
    #[error("weight {index} is {weight}, expected a finite non-negative value")]
    BadWeight { index: usize, weight: f64 },
    #[error("weights sum to {sum}, expected 1.0")]
    BadSum { sum: f64 },
}

/// Check that `weights` is a distribution over `candidates` choices.
pub fn check_distribution(candidates: usize, weights: &[f64]) -> Result<(), DistributionDefect> {
    if weights.len() != candidates {
        return Err(DistributionDefect::LengthMismatch { candidates, weights: weights.len() });
    }
    if let Some((index, &weight)) =
        weights.iter().enumerate().find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(DistributionDefect::BadWeight { index, weight });
    }
    let sum = weights.iter().sum::<f64>();
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(DistributionDefect::BadSum { sum });
    }
    Ok(())
}

/// Draw one index with probability proportional to `weights[i]`.
///
/// Linear CDF search. The uniform draw is scaled by the actual sum, so weights that are
/// within tolerance of 1.0 never fall off the end of the table. Returns `None` for an empty
/// weight list.
pub fn sample_cdf<R: Rng>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    match weights.len() {
        0 => return None,
        1 => return Some(0),
        _ => {}
    }

    let sum = weights.iter().sum::<f64>();
    let mut r = rng.random::<f64>() * sum;
    for (i, &w) in weights.iter().enumerate() {
        if r < w {
            return Some(i);
        }
        r -= w;
    }
    // Rounding can leave `r` a hair above the last weight; pick the last non-zero entry.
    Some(weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn single_candidate_is_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..100 {
            assert_eq!(sample_cdf(&mut rng, &[1.0]), Some(0));
        }
    }

    #[test]
    fn empty_weights_draw_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(sample_cdf(&mut rng, &[]), None);
    }

    #[test]
    fn zero_weight_entries_are_never_drawn() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..5_000 {
            let i = sample_cdf(&mut rng, &[0.0, 0.6, 0.0, 0.4, 0.0]).unwrap();
            assert!(i == 1 || i == 3, "drew zero-weight index {i}");
        }
    }

    #[test]
    fn check_distribution_tolerates_rounding() {
        assert!(check_distribution(3, &[0.1, 0.2, 0.7]).is_ok());
        assert!(check_distribution(2, &[0.5, 0.5 + 5e-7]).is_ok());
        assert_eq!(
            check_distribution(2, &[0.25, 0.25]),
            Err(DistributionDefect::BadSum { sum: 0.5 })
        );
        assert_eq!(
            check_distribution(2, &[1.0]),
            Err(DistributionDefect::LengthMismatch { candidates: 2, weights: 1 })
        );
        assert_eq!(
            check_distribution(2, &[1.5, -0.5]),
            Err(DistributionDefect::BadWeight { index: 1, weight: -0.5 })
        );
        assert!(matches!(
            check_distribution(1, &[f64::NAN]),
            Err(DistributionDefect::BadWeight { index: 0, .. })
        ));
    }

    #[test]
    fn cdf_draw_distribution_smoke() {
        // Deterministic chi-squared smoke test: catches egregious CDF bugs
        // without being overly sensitive.
        let probs = [0.1f64, 0.2, 0.7];
        let trials = 20_000usize;
        let mut counts = [0usize; 3];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..trials {
            counts[sample_cdf(&mut rng, &probs).unwrap()] += 1;
        }

        let chi2: f64 = counts
            .iter()
            .zip(probs.iter())
            .map(|(&c, &p)| {
                let e = trials as f64 * p;
                let diff = c as f64 - e;
                (diff * diff) / e
            })
            .sum();

        // df = 2; E[chi2] ~ 2. Use a very conservative cutoff.
        assert!(chi2 < 50.0, "chi2 too large (chi2={chi2:.2}). counts={counts:?}");
    }
}
