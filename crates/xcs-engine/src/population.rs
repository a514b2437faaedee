use rand::Rng;
use tracing::debug;

use crate::{
    classifier::{Action, Classifier},
    condition::Condition,
    config::{SelectionMethod, XcsConfig},
    selection,
    symbol::Symbol,
};

/// Stable handle to a classifier stored in a [`Population`].
///
/// Handles stay valid until the classifier is removed; afterwards they are
/// stale and every lookup through them returns `None`, even if the slot has
/// been reused by a newer classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassifierId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot<S, A> {
    generation: u32,
    classifier: Option<Classifier<S, A>>,
}

/// The rule base: the single owner of every classifier.
///
/// Classifiers live in an arena of slots. Match sets and action sets refer to
/// them through [`ClassifierId`] handles, so removing a classifier here
/// removes it from every view at once.
#[derive(Debug, Clone)]
pub struct Population<S, A> {
    slots: Vec<Slot<S, A>>,
    free: Vec<u32>,
    len: usize,
}

impl<S, A> Default for Population<S, A> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<S, A> Population<S, A>
where
    S: Symbol,
    A: Action,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of macro-classifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of micro-classifiers.
    #[must_use]
    pub fn numerosity_sum(&self) -> u64 {
        self.classifiers()
            .map(|cl| u64::from(cl.numerosity))
            .sum()
    }

    #[must_use]
    pub fn contains(&self, id: ClassifierId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn get(&self, id: ClassifierId) -> Option<&Classifier<S, A>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.classifier.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: ClassifierId) -> Option<&mut Classifier<S, A>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.classifier.as_mut()
    }

    /// Iterates over live classifiers with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ClassifierId, &Classifier<S, A>)> + '_ {
        self.slots.iter().zip(0..).filter_map(|(slot, index)| {
            let classifier = slot.classifier.as_ref()?;
            let id = ClassifierId {
                index,
                generation: slot.generation,
            };
            Some((id, classifier))
        })
    }

    pub fn classifiers(&self) -> impl Iterator<Item = &Classifier<S, A>> + '_ {
        self.slots.iter().filter_map(|slot| slot.classifier.as_ref())
    }

    /// Finds the classifier with exactly this condition and action.
    #[must_use]
    pub fn find(&self, condition: &Condition<S>, action: &A) -> Option<ClassifierId> {
        self.iter()
            .find(|(_, cl)| cl.action == *action && cl.condition == *condition)
            .map(|(id, _)| id)
    }

    fn insert(&mut self, classifier: Classifier<S, A>) -> ClassifierId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.classifier.is_none());
            slot.classifier = Some(classifier);
            return ClassifierId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).expect("population arena exceeds u32 slots");
        self.slots.push(Slot {
            generation: 0,
            classifier: Some(classifier),
        });
        ClassifierId {
            index,
            generation: 0,
        }
    }

    /// Adds a classifier, or merges it into the existing classifier with the
    /// same condition and action by adding its numerosity.
    ///
    /// Does not evict; call [`Self::delete_extra_classifiers`] afterwards.
    pub fn insert_or_increment(&mut self, classifier: Classifier<S, A>) -> ClassifierId {
        if let Some(id) = self.find(&classifier.condition, &classifier.action) {
            if let Some(existing) = self.get_mut(id) {
                existing.numerosity += classifier.numerosity;
            }
            return id;
        }
        self.insert(classifier)
    }

    /// Removes a classifier entirely, whatever its numerosity.
    pub(crate) fn remove(&mut self, id: ClassifierId) -> Option<Classifier<S, A>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let classifier = slot.classifier.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(classifier)
    }

    pub(crate) fn add_numerosity(&mut self, id: ClassifierId, count: u32) -> bool {
        match self.get_mut(id) {
            Some(cl) => {
                cl.numerosity += count;
                true
            }
            None => false,
        }
    }

    /// Moves the whole numerosity of `subsumed` into `subsumer` and removes
    /// `subsumed`. Returns `false` if either handle is stale.
    pub(crate) fn absorb(&mut self, subsumer: ClassifierId, subsumed: ClassifierId) -> bool {
        if subsumer == subsumed || !self.contains(subsumer) {
            return false;
        }
        let Some(removed) = self.remove(subsumed) else {
            return false;
        };
        self.add_numerosity(subsumer, removed.numerosity)
    }

    /// Removes every classifier.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }

    /// Deletes micro-classifiers until the population holds at most
    /// `max_population` of them. Returns the number deleted.
    pub fn delete_extra_classifiers<R>(&mut self, config: &XcsConfig, rng: &mut R) -> u64
    where
        R: Rng + ?Sized,
    {
        let mut deleted = 0;
        while self.numerosity_sum() > config.max_population {
            self.delete_one(config, rng);
            deleted += 1;
        }
        deleted
    }

    #[expect(clippy::cast_precision_loss)]
    fn delete_one<R>(&mut self, config: &XcsConfig, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let numerosity_sum = self.numerosity_sum();
        if numerosity_sum == 0 {
            return;
        }
        let fitness_sum: f64 = self.classifiers().map(|cl| cl.fitness).sum();
        let mean_fitness = fitness_sum / numerosity_sum as f64;

        let (ids, votes): (Vec<_>, Vec<_>) = self
            .iter()
            .map(|(id, cl)| (id, cl.deletion_vote(mean_fitness, config)))
            .unzip();
        let chosen = match config.selection {
            SelectionMethod::Roulette => selection::roulette(&votes, rng),
            SelectionMethod::Tournament { participation } => {
                selection::tournament(&votes, participation, rng)
            }
        }
        .unwrap_or_else(|_| rng.random_range(0..ids.len()));
        let id = ids[chosen];

        let Some(cl) = self.get_mut(id) else {
            return;
        };
        if cl.numerosity > 1 {
            cl.numerosity -= 1;
            debug!(numerosity = cl.numerosity, "decremented numerosity on deletion");
        } else if let Some(removed) = self.remove(id) {
            debug!(classifier = %removed, "deleted classifier");
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use crate::symbol::Ternary;

    use super::*;

    fn classifier(condition: &str, action: u8) -> Classifier<Ternary, u8> {
        Classifier::new(condition.parse().unwrap(), action, 0, &XcsConfig::default())
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut population = Population::new();
        let first = population.insert_or_increment(classifier("1#0", 1));
        let second = population.insert_or_increment(classifier("1#0", 1));
        let other_action = population.insert_or_increment(classifier("1#0", 0));
        assert_eq!(first, second);
        assert_ne!(first, other_action);
        assert_eq!(population.len(), 2);
        assert_eq!(population.numerosity_sum(), 3);
        assert_eq!(population.get(first).unwrap().numerosity(), 2);
    }

    #[test]
    fn test_stale_handles() {
        let mut population = Population::new();
        let id = population.insert_or_increment(classifier("1#0", 1));
        assert!(population.remove(id).is_some());
        assert!(population.get(id).is_none());
        assert!(population.remove(id).is_none());

        // the slot is reused but the old handle stays stale
        let reused = population.insert_or_increment(classifier("000", 1));
        assert_ne!(reused, id);
        assert!(population.get(id).is_none());
        assert_eq!(population.get(reused).unwrap().condition().to_string(), "000");
        assert_eq!(population.len(), 1);
    }

    #[test]
    fn test_absorb() {
        let mut population = Population::new();
        let general = population.insert_or_increment(classifier("1##", 1));
        let specific = population.insert_or_increment(classifier("10#", 1));
        population.add_numerosity(specific, 2);
        assert!(population.absorb(general, specific));
        assert_eq!(population.len(), 1);
        assert_eq!(population.get(general).unwrap().numerosity(), 4);
        assert!(!population.absorb(general, specific));
        assert!(!population.absorb(general, general));
    }

    #[test]
    fn test_delete_one_of_five() {
        let config = XcsConfig {
            max_population: 4,
            ..XcsConfig::default()
        };
        let mut rng = Pcg32::seed_from_u64(5);
        let mut population = Population::new();
        for condition in ["000", "001", "010", "011", "100"] {
            population.insert_or_increment(classifier(condition, 0));
        }
        assert_eq!(population.numerosity_sum(), 5);
        assert_eq!(population.delete_extra_classifiers(&config, &mut rng), 1);
        assert_eq!(population.numerosity_sum(), 4);
        assert_eq!(population.len(), 4);
        // already within bounds
        assert_eq!(population.delete_extra_classifiers(&config, &mut rng), 0);
    }

    #[test]
    fn test_delete_decrements_macro_classifier() {
        let config = XcsConfig {
            max_population: 2,
            ..XcsConfig::default()
        };
        let mut rng = Pcg32::seed_from_u64(6);
        let mut population = Population::new();
        let id = population.insert_or_increment(classifier("1##", 0));
        population.add_numerosity(id, 2);
        population.delete_extra_classifiers(&config, &mut rng);
        assert_eq!(population.len(), 1);
        assert_eq!(population.get(id).unwrap().numerosity(), 2);
    }

    #[test]
    fn test_deletion_prefers_weak_experienced_rules() {
        let config = XcsConfig {
            max_population: 1,
            ..XcsConfig::default()
        };
        let mut deleted_weak = 0;
        for seed in 0..200 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut population = Population::new();
            let mut strong = classifier("1##", 0);
            strong.fitness = 1.0;
            let mut weak = classifier("0##", 0);
            weak.fitness = 0.001;
            weak.experience = config.deletion_threshold + 1;
            population.insert_or_increment(strong);
            let weak = population.insert_or_increment(weak);
            population.delete_extra_classifiers(&config, &mut rng);
            if !population.contains(weak) {
                deleted_weak += 1;
            }
        }
        assert!(deleted_weak > 180, "weak rule deleted {deleted_weak} times");
    }

    #[test]
    fn test_tournament_deletion_removes_highest_vote() {
        let config = XcsConfig {
            max_population: 2,
            selection: SelectionMethod::Tournament { participation: 1.0 },
            ..XcsConfig::default()
        };
        for seed in 0..20 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut population = Population::new();
            let ids: Vec<_> = [("1##", 1.0), ("0##", 5.0), ("#1#", 2.0)]
                .into_iter()
                .map(|(condition, action_set_size)| {
                    let mut cl = classifier(condition, 0);
                    cl.action_set_size = action_set_size;
                    population.insert_or_increment(cl)
                })
                .collect();
            population.delete_extra_classifiers(&config, &mut rng);
            assert!(population.contains(ids[0]));
            assert!(!population.contains(ids[1]));
            assert!(population.contains(ids[2]));
        }

        // a mature rule without fitness outvotes a larger niche
        let mut rng = Pcg32::seed_from_u64(0);
        let mut population = Population::new();
        let big = {
            let mut cl = classifier("1##", 0);
            cl.action_set_size = 50.0;
            cl.fitness = 1.0;
            population.insert_or_increment(cl)
        };
        let useless = {
            let mut cl = classifier("0##", 0);
            cl.fitness = 0.0;
            cl.experience = config.deletion_threshold + 1;
            population.insert_or_increment(cl)
        };
        population.insert_or_increment(classifier("#1#", 0));
        population.delete_extra_classifiers(&config, &mut rng);
        assert!(population.contains(big));
        assert!(!population.contains(useless));
    }

    #[test]
    fn test_tournament_deletion_keeps_bound() {
        let config = XcsConfig {
            max_population: 10,
            selection: SelectionMethod::Tournament { participation: 0.4 },
            ..XcsConfig::default()
        };
        let mut rng = Pcg32::seed_from_u64(8);
        let mut population = Population::new();
        for _ in 0..100 {
            let condition = Condition::<Ternary>::cover(
                &[rng.random(), rng.random(), rng.random(), rng.random()],
                &config.representation,
                &mut rng,
            );
            let action = rng.random_range(0..3_u8);
            population.insert_or_increment(Classifier::new(condition, action, 0, &config));
            population.delete_extra_classifiers(&config, &mut rng);
            assert!(population.numerosity_sum() <= config.max_population);
        }
        let mut pairs: Vec<_> = population
            .classifiers()
            .map(|cl| (cl.condition().to_string(), *cl.action()))
            .collect();
        let before = pairs.len();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), before);
    }
}
