//! Weighted selection primitives shared by the GA and deletion.

use rand::Rng;

/// Error returned when no candidate can be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SelectionError {
    #[display("no candidates to select from")]
    EmptyCandidates,
    #[display("total selection weight is zero or not finite")]
    ZeroTotalWeight,
}

/// Roulette-wheel selection.
///
/// Draws a point uniformly in `[0, Σ weights)` and returns the index of the
/// first cumulative bucket exceeding it.
pub fn roulette<R>(weights: &[f64], rng: &mut R) -> Result<usize, SelectionError>
where
    R: Rng + ?Sized,
{
    if weights.is_empty() {
        return Err(SelectionError::EmptyCandidates);
    }
    let total: f64 = weights.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return Err(SelectionError::ZeroTotalWeight);
    }
    let point = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if cumulative > point {
            return Ok(i);
        }
    }
    // rounding left the point past the last bucket
    Ok(weights
        .iter()
        .rposition(|weight| *weight > 0.0)
        .unwrap_or(weights.len() - 1))
}

/// Tournament selection.
///
/// Each candidate takes part with probability `participation`; the
/// participant with the highest score wins (earliest on ties). If nobody takes
/// part, a candidate is drawn uniformly.
pub fn tournament<R>(scores: &[f64], participation: f64, rng: &mut R) -> Result<usize, SelectionError>
where
    R: Rng + ?Sized,
{
    if scores.is_empty() {
        return Err(SelectionError::EmptyCandidates);
    }
    let mut winner: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if rng.random_bool(participation) && winner.is_none_or(|(_, best)| score > best) {
            winner = Some((i, score));
        }
    }
    Ok(match winner {
        Some((i, _)) => i,
        None => rng.random_range(0..scores.len()),
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_roulette_errors() {
        let mut rng = Pcg32::seed_from_u64(0);
        assert_eq!(roulette(&[], &mut rng), Err(SelectionError::EmptyCandidates));
        assert_eq!(
            roulette(&[0.0, 0.0], &mut rng),
            Err(SelectionError::ZeroTotalWeight)
        );
        assert_eq!(
            roulette(&[f64::INFINITY], &mut rng),
            Err(SelectionError::ZeroTotalWeight)
        );
    }

    #[test]
    fn test_roulette_skips_zero_weights() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..200 {
            assert_eq!(roulette(&[0.0, 2.0, 0.0], &mut rng), Ok(1));
        }
    }

    #[test]
    fn test_roulette_is_proportional() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut counts = [0_u32; 2];
        for _ in 0..10_000 {
            counts[roulette(&[1.0, 3.0], &mut rng).unwrap()] += 1;
        }
        let ratio = f64::from(counts[1]) / f64::from(counts[0]);
        assert!((2.5..3.5).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn test_tournament() {
        let mut rng = Pcg32::seed_from_u64(3);
        assert_eq!(
            tournament(&[], 0.5, &mut rng),
            Err(SelectionError::EmptyCandidates)
        );
        // everybody participates: the best always wins
        for _ in 0..50 {
            assert_eq!(tournament(&[0.1, 0.7, 0.3], 1.0, &mut rng), Ok(1));
        }
        // nobody participates: uniform fallback stays in range
        for _ in 0..50 {
            assert!(tournament(&[0.1, 0.7, 0.3], 0.0, &mut rng).unwrap() < 3);
        }
    }
}
