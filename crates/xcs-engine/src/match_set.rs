use rand::{Rng, seq::IndexedRandom as _};
use tracing::debug;

use crate::{
    XcsError,
    classifier::{Action, Classifier},
    config::XcsConfig,
    population::{ClassifierId, Population},
    symbol::Symbol,
};

/// Error returned when a freshly covered classifier does not match the
/// situation it was created for.
///
/// This indicates a broken [`Symbol`] implementation; it is never retried.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("covering classifier `{classifier}` does not match situation {situation}")]
pub struct CoveringError {
    pub situation: String,
    pub classifier: String,
}

/// Classifiers whose condition matches the current situation.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    ids: Vec<ClassifierId>,
}

impl MatchSet {
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

    /// Drops handles whose classifier has been removed from `population`.
    pub fn retain_live<S, A>(&mut self, population: &Population<S, A>)
    where
        S: Symbol,
        A: Action,
    {
        self.ids.retain(|id| population.contains(*id));
    }

    /// Collects the matching classifiers without covering.
    pub fn collect_matching<S, A>(&mut self, population: &Population<S, A>, situation: &[S::Value])
    where
        S: Symbol,
        A: Action,
    {
        self.ids.clear();
        self.ids.extend(
            population
                .iter()
                .filter(|(_, cl)| cl.condition.matches(situation))
                .map(|(id, _)| id),
        );
    }

    /// Rebuilds the set for `situation`, covering until at least
    /// `min_actions` distinct actions are advocated.
    ///
    /// Every covering insertion is followed by eviction, which may remove
    /// matching classifiers again; matching restarts after each one.
    ///
    /// Fails without covering if the population is too small to hold one
    /// classifier per required action.
    pub fn regenerate<S, A, R>(
        &mut self,
        population: &mut Population<S, A>,
        situation: &[S::Value],
        actions: &[A],
        time_stamp: u64,
        config: &XcsConfig,
        rng: &mut R,
    ) -> Result<(), XcsError>
    where
        S: Symbol,
        A: Action,
        R: Rng + ?Sized,
    {
        let required = config.required_actions(actions.len())?;
        loop {
            self.collect_matching(population, situation);
            let missing: Vec<&A> = actions
                .iter()
                .filter(|action| {
                    !self
                        .ids
                        .iter()
                        .filter_map(|id| population.get(*id))
                        .any(|cl| cl.action == **action)
                })
                .collect();
            if actions.len() - missing.len() >= required {
                return Ok(());
            }
            let Some(&action) = missing.choose(rng) else {
                return Ok(());
            };

            let classifier = Classifier::cover(situation, action.clone(), time_stamp, config, rng);
            if !classifier.condition.matches(situation) {
                return Err(CoveringError {
                    situation: format!("{situation:?}"),
                    classifier: classifier.to_string(),
                }
                .into());
            }
            debug!(classifier = %classifier, "covering");
            population.insert_or_increment(classifier);
            population.delete_extra_classifiers(config, rng);
        }
    }

    /// Distinct actions advocated by the set, in first-seen order.
    pub fn actions<S, A>(&self, population: &Population<S, A>) -> Vec<A>
    where
        S: Symbol,
        A: Action,
    {
        let mut actions: Vec<A> = Vec::new();
        for cl in self.ids.iter().filter_map(|id| population.get(*id)) {
            if !actions.contains(&cl.action) {
                actions.push(cl.action.clone());
            }
        }
        actions
    }
}
