use rand::Rng;
use tracing::debug;

use crate::{
    classifier::Action,
    config::XcsConfig,
    genetic::GeneticAlgorithm,
    match_set::MatchSet,
    population::{ClassifierId, Population},
    selection::SelectionError,
    symbol::Symbol,
};

/// Classifiers of a match set that advocate the chosen action.
///
/// The action set receives the payoff of the action and is the niche in which
/// the genetic algorithm and action-set subsumption operate.
#[derive(Debug, Clone, Default)]
pub struct ActionSet {
    ids: Vec<ClassifierId>,
}

impl ActionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ids(&self) -> &[ClassifierId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Rebuilds the set from the members of `match_set` advocating `action`.
    pub fn regenerate<S, A>(&mut self, match_set: &MatchSet, population: &Population<S, A>, action: &A)
    where
        S: Symbol,
        A: Action,
    {
        self.ids.clear();
        self.ids.extend(
            match_set
                .ids()
                .iter()
                .copied()
                .filter(|id| population.get(*id).is_some_and(|cl| cl.action == *action)),
        );
    }

    /// Drops handles whose classifier has been removed from `population`.
    pub fn retain_live<S, A>(&mut self, population: &Population<S, A>)
    where
        S: Symbol,
        A: Action,
    {
        self.ids.retain(|id| population.contains(*id));
    }

    /// Number of micro-classifiers in the set.
    #[must_use]
    pub fn numerosity_sum<S, A>(&self, population: &Population<S, A>) -> u64
    where
        S: Symbol,
        A: Action,
    {
        self.ids
            .iter()
            .filter_map(|id| population.get(*id))
            .map(|cl| u64::from(cl.numerosity))
            .sum()
    }

    /// Reinforces every member with `payoff`, shares fitness among them and,
    /// if enabled, runs action-set subsumption.
    #[expect(clippy::cast_precision_loss)]
    pub fn update<S, A, R>(
        &mut self,
        payoff: f64,
        population: &mut Population<S, A>,
        config: &XcsConfig,
        rng: &mut R,
    ) where
        S: Symbol,
        A: Action,
        R: Rng + ?Sized,
    {
        self.retain_live(population);
        let set_numerosity = self.numerosity_sum(population) as f64;
        for id in &self.ids {
            if let Some(cl) = population.get_mut(*id) {
                cl.update_statistics(payoff, set_numerosity, config);
            }
        }
        self.update_fitness(population, config);
        if config.action_set_subsumption {
            self.subsume(population, config, rng);
        }
    }

    fn update_fitness<S, A>(&self, population: &mut Population<S, A>, config: &XcsConfig)
    where
        S: Symbol,
        A: Action,
    {
        let accuracies: Vec<(ClassifierId, f64)> = self
            .ids
            .iter()
            .filter_map(|id| {
                let cl = population.get(*id)?;
                Some((*id, cl.accuracy(config) * f64::from(cl.numerosity)))
            })
            .collect();
        let accuracy_sum: f64 = accuracies.iter().map(|(_, weighted)| weighted).sum();
        if accuracy_sum <= 0.0 {
            return;
        }
        for (id, weighted) in accuracies {
            if let Some(cl) = population.get_mut(id) {
                cl.fitness += config.learning_rate * (weighted / accuracy_sum - cl.fitness);
            }
        }
    }

    /// Lets the most general subsumer of the set absorb every member it is
    /// more general than. Ties on generality are broken uniformly.
    pub fn subsume<S, A, R>(&mut self, population: &mut Population<S, A>, config: &XcsConfig, rng: &mut R)
    where
        S: Symbol,
        A: Action,
        R: Rng + ?Sized,
    {
        let mut best: Option<(ClassifierId, f64)> = None;
        let mut ties = 0_u32;
        for id in &self.ids {
            let Some(cl) = population.get(*id) else {
                continue;
            };
            if !cl.is_subsumer(config) {
                continue;
            }
            let generality = cl.condition.generality();
            match best {
                Some((_, best_generality)) if generality < best_generality => {}
                Some((_, best_generality)) if generality == best_generality => {
                    // reservoir sampling keeps each tied candidate equally likely
                    ties += 1;
                    if rng.random_range(0..ties) == 0 {
                        best = Some((*id, generality));
                    }
                }
                _ => {
                    best = Some((*id, generality));
                    ties = 1;
                }
            }
        }
        let Some((subsumer, _)) = best else {
            return;
        };

        let subsumed: Vec<ClassifierId> = self
            .ids
            .iter()
            .copied()
            .filter(|id| *id != subsumer)
            .filter(|id| {
                match (population.get(subsumer), population.get(*id)) {
                    (Some(general), Some(cl)) => general
                        .condition
                        .is_more_general(&cl.condition, config.subsumption_tolerance),
                    _ => false,
                }
            })
            .collect();
        for id in subsumed {
            if population.absorb(subsumer, id) {
                debug!(?subsumer, ?id, "action set subsumption");
            }
        }
        self.retain_live(population);
    }

    /// Runs the genetic algorithm if the numerosity-weighted mean time since
    /// the last GA in this set reaches the threshold. Returns whether it ran.
    #[expect(clippy::cast_precision_loss)]
    pub fn run_ga<S, A, R>(
        &mut self,
        situation: &[S::Value],
        population: &mut Population<S, A>,
        actions: &[A],
        time_stamp: u64,
        config: &XcsConfig,
        rng: &mut R,
    ) -> Result<bool, SelectionError>
    where
        S: Symbol,
        A: Action,
        R: Rng + ?Sized,
    {
        self.retain_live(population);
        let numerosity_sum = self.numerosity_sum(population);
        if numerosity_sum == 0 {
            return Ok(false);
        }
        let weighted_stamps: f64 = self
            .ids
            .iter()
            .filter_map(|id| population.get(*id))
            .map(|cl| cl.time_stamp as f64 * f64::from(cl.numerosity))
            .sum();
        let mean_stamp = weighted_stamps / numerosity_sum as f64;
        if (time_stamp as f64) - mean_stamp < config.ga_threshold as f64 {
            return Ok(false);
        }

        for id in &self.ids {
            if let Some(cl) = population.get_mut(*id) {
                cl.time_stamp = time_stamp;
            }
        }
        debug!(time_stamp, set_size = self.ids.len(), "running genetic algorithm");
        GeneticAlgorithm::new(config).run(&self.ids, situation, population, actions, time_stamp, rng)?;
        self.retain_live(population);
        Ok(true)
    }
}
