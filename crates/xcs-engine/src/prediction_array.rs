use rand::{Rng, seq::IndexedRandom as _};

use crate::{
    classifier::Action,
    match_set::MatchSet,
    population::Population,
    selection::SelectionError,
    symbol::Symbol,
};

/// Action-selection policy over a [`PredictionArray`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionPolicy {
    /// Best predicted action, ties broken uniformly.
    Greedy,
    /// A uniformly random represented action with the given probability,
    /// greedy otherwise.
    EpsilonGreedy(f64),
}

/// Fitness-weighted payoff prediction of every action in a match set.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionArray<A> {
    entries: Vec<(A, f64)>,
}

impl<A> PredictionArray<A>
where
    A: Action,
{
    /// Aggregates `match_set`, listing represented actions in the order of
    /// `actions`.
    pub fn new<S>(match_set: &MatchSet, population: &Population<S, A>, actions: &[A]) -> Self
    where
        S: Symbol,
    {
        let mut sums: Vec<Option<(f64, f64)>> = vec![None; actions.len()];
        for cl in match_set.ids().iter().filter_map(|id| population.get(*id)) {
            let Some(index) = actions.iter().position(|a| *a == cl.action) else {
                continue;
            };
            let (weighted, fitness) = sums[index].get_or_insert((0.0, 0.0));
            *weighted += cl.prediction * cl.fitness;
            *fitness += cl.fitness;
        }
        let entries = actions
            .iter()
            .zip(sums)
            .filter_map(|(action, sum)| {
                let (weighted, fitness) = sum?;
                let value = if fitness > 0.0 { weighted / fitness } else { 0.0 };
                Some((action.clone(), value))
            })
            .collect();
        Self { entries }
    }

    /// Represented actions with their predicted payoff.
    #[must_use]
    pub fn entries(&self) -> &[(A, f64)] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Predicted payoff of `action`, or `None` if no matching classifier
    /// advocates it.
    #[must_use]
    pub fn value(&self, action: &A) -> Option<f64> {
        self.entries
            .iter()
            .find(|(a, _)| a == action)
            .map(|(_, value)| *value)
    }

    /// Highest predicted payoff, `0.0` when nothing is represented.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.entries
            .iter()
            .map(|(_, value)| *value)
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    /// Picks an action according to `policy`.
    pub fn select<R>(&self, policy: ActionPolicy, rng: &mut R) -> Result<A, SelectionError>
    where
        R: Rng + ?Sized,
    {
        if self.entries.is_empty() {
            return Err(SelectionError::EmptyCandidates);
        }
        let explore = match policy {
            ActionPolicy::Greedy => false,
            ActionPolicy::EpsilonGreedy(epsilon) => rng.random_bool(epsilon),
        };
        let chosen = if explore {
            self.entries.choose(rng)
        } else {
            let max = self.max();
            let best: Vec<_> = self.entries.iter().filter(|(_, value)| *value == max).collect();
            best.choose(rng).copied()
        };
        chosen
            .map(|(action, _)| action.clone())
            .ok_or(SelectionError::EmptyCandidates)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use crate::{classifier::Classifier, config::XcsConfig, symbol::Ternary};

    use super::*;

    fn population() -> (Population<Ternary, u8>, MatchSet) {
        let config = XcsConfig::default();
        let mut population = Population::new();
        for (condition, action, prediction, fitness) in [
            ("1#", 0, 100.0, 0.1),
            ("#1", 0, 400.0, 0.3),
            ("11", 2, 200.0, 0.5),
            ("0#", 1, 900.0, 0.9),
        ] {
            let mut cl = Classifier::new(condition.parse().unwrap(), action, 0, &config);
            cl.prediction = prediction;
            cl.fitness = fitness;
            population.insert_or_increment(cl);
        }
        let mut match_set = MatchSet::new();
        match_set.collect_matching(&population, &[true, true]);
        (population, match_set)
    }

    #[test]
    fn test_fitness_weighted_values() {
        let (population, match_set) = population();
        let array = PredictionArray::new(&match_set, &population, &[0, 1, 2]);
        assert_eq!(array.entries().len(), 2);
        assert!((array.value(&0).unwrap() - 325.0).abs() < 1e-9);
        assert_eq!(array.value(&1), None);
        assert!((array.value(&2).unwrap() - 200.0).abs() < 1e-9);
        assert!((array.max() - 325.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_fitness_yields_zero() {
        let config = XcsConfig::default();
        let mut population = Population::<Ternary, u8>::new();
        let mut cl = Classifier::new("1".parse().unwrap(), 0, 0, &config);
        cl.fitness = 0.0;
        population.insert_or_increment(cl);
        let mut match_set = MatchSet::new();
        match_set.collect_matching(&population, &[true]);
        let array = PredictionArray::new(&match_set, &population, &[0]);
        assert_eq!(array.value(&0), Some(0.0));
    }

    #[test]
    fn test_greedy_and_random_selection() {
        let mut rng = Pcg32::seed_from_u64(1);
        let (population, match_set) = population();
        let array = PredictionArray::new(&match_set, &population, &[0, 1, 2]);
        for _ in 0..50 {
            assert_eq!(array.select(ActionPolicy::Greedy, &mut rng), Ok(0));
        }
        let mut seen = [false; 3];
        for _ in 0..200 {
            let action = array.select(ActionPolicy::EpsilonGreedy(1.0), &mut rng).unwrap();
            seen[usize::from(action)] = true;
        }
        assert_eq!(seen, [true, false, true]);
    }

    #[test]
    fn test_empty_array() {
        let mut rng = Pcg32::seed_from_u64(2);
        let array = PredictionArray::<u8>::new(&MatchSet::new(), &Population::<Ternary, u8>::new(), &[0, 1]);
        assert!(array.is_empty());
        assert_eq!(array.max(), 0.0);
        assert_eq!(
            array.select(ActionPolicy::Greedy, &mut rng),
            Err(SelectionError::EmptyCandidates)
        );
    }
}
