use std::{
    fmt,
    io::{BufRead, Write},
    mem,
    str::FromStr,
};

use rand::{Rng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use tracing::{debug, info, trace};

use crate::{
    XcsError,
    action_set::ActionSet,
    classifier::Action,
    config::XcsConfig,
    match_set::MatchSet,
    population::Population,
    prediction_array::{ActionPolicy, PredictionArray},
    record::{self, ClassifierRecord, LoadMode, PersistenceError},
    seed::Seed,
    selection::SelectionError,
    symbol::Symbol,
};

#[derive(Debug, Clone)]
enum Decision<V> {
    Idle,
    AwaitingReward { situation: Vec<V>, evolve: bool },
}

/// Action set of the previous step of a multi-step problem, waiting for the
/// discounted payoff of the current step.
#[derive(Debug, Clone)]
struct PendingStep<V> {
    action_set: ActionSet,
    reward: f64,
    situation: Vec<V>,
}

/// An XCS learner.
///
/// One decision cycle is either
///
/// - [`Self::explore`] followed by [`Self::reward`]: learning with rule
///   discovery,
/// - [`Self::exploit`] with `update = true` followed by [`Self::reward`]:
///   learning without rule discovery, or
/// - [`Self::exploit`] with `update = false`: a read-only decision that needs
///   no reward and may be made at any time.
///
/// Calls out of this order are rejected with [`XcsError::DecisionPending`] or
/// [`XcsError::NoPendingDecision`].
///
/// # Example
///
/// ```
/// use xcs_engine::{Seed, Ternary, Xcs, XcsConfig};
///
/// let mut xcs = Xcs::<Ternary, bool>::with_seed(
///     XcsConfig::default(),
///     vec![false, true],
///     3,
///     Seed::from(7_u64),
/// )
/// .unwrap();
///
/// let action = xcs.explore(&[true, false, true]).unwrap();
/// xcs.reward(if action { 1000.0 } else { 0.0 }, true).unwrap();
/// assert_eq!(xcs.time_stamp(), 1);
/// assert!(xcs.population().numerosity_sum() >= 2);
/// ```
#[derive(Debug, Clone)]
pub struct Xcs<S, A>
where
    S: Symbol,
{
    config: XcsConfig,
    actions: Vec<A>,
    situation_len: usize,
    population: Population<S, A>,
    match_set: MatchSet,
    action_set: ActionSet,
    decision: Decision<S::Value>,
    previous: Option<PendingStep<S::Value>>,
    time_stamp: u64,
    rng: Pcg32,
}

impl<S, A> Xcs<S, A>
where
    S: Symbol,
    A: Action,
{
    /// Creates a learner seeded from the thread-local generator.
    pub fn new(config: XcsConfig, actions: Vec<A>, situation_len: usize) -> Result<Self, XcsError> {
        Self::with_seed(config, actions, situation_len, rand::rng().random())
    }

    /// Like [`Self::new`], but deterministic for a given `seed`.
    pub fn with_seed(
        config: XcsConfig,
        actions: Vec<A>,
        situation_len: usize,
        seed: Seed,
    ) -> Result<Self, XcsError> {
        if actions.is_empty() {
            return Err(XcsError::EmptyActions);
        }
        if actions
            .iter()
            .enumerate()
            .any(|(i, action)| actions[..i].contains(action))
        {
            return Err(XcsError::DuplicateAction);
        }
        if situation_len == 0 {
            return Err(XcsError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        check_config(&config, actions.len())?;
        Ok(Self {
            config,
            actions,
            situation_len,
            population: Population::new(),
            match_set: MatchSet::new(),
            action_set: ActionSet::new(),
            decision: Decision::Idle,
            previous: None,
            time_stamp: 0,
            rng: seed.rng(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &XcsConfig {
        &self.config
    }

    /// Replaces the live configuration; the change applies from the next call
    /// on.
    ///
    /// `config` is checked like at construction; if it is rejected the
    /// current configuration stays in place.
    pub fn set_config(&mut self, config: XcsConfig) -> Result<(), XcsError> {
        check_config(&config, self.actions.len())?;
        self.config = config;
        Ok(())
    }

    /// Switches to condensation: rule discovery keeps running, but crossover
    /// and mutation are disabled so that only subsumption and deletion
    /// reshape the population.
    pub fn start_condensation(&mut self) {
        debug!(time_stamp = self.time_stamp, "starting condensation");
        self.config.condense();
    }

    #[must_use]
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    #[must_use]
    pub fn situation_len(&self) -> usize {
        self.situation_len
    }

    #[must_use]
    pub fn population(&self) -> &Population<S, A> {
        &self.population
    }

    /// Match set of the most recent learning decision.
    #[must_use]
    pub fn match_set(&self) -> &MatchSet {
        &self.match_set
    }

    /// Action set of the most recent learning decision.
    #[must_use]
    pub fn action_set(&self) -> &ActionSet {
        &self.action_set
    }

    /// Number of completed exploring decisions.
    #[must_use]
    pub fn time_stamp(&self) -> u64 {
        self.time_stamp
    }

    #[must_use]
    pub fn is_awaiting_reward(&self) -> bool {
        matches!(self.decision, Decision::AwaitingReward { .. })
    }

    fn check_idle(&self) -> Result<(), XcsError> {
        if self.is_awaiting_reward() {
            return Err(XcsError::DecisionPending);
        }
        Ok(())
    }

    fn check_situation(&self, situation: &[S::Value]) -> Result<(), XcsError> {
        if situation.len() != self.situation_len {
            return Err(XcsError::DimensionMismatch {
                expected: self.situation_len,
                actual: situation.len(),
            });
        }
        Ok(())
    }

    /// Chooses an action for `situation` while learning; [`Self::reward`]
    /// must follow.
    pub fn explore(&mut self, situation: &[S::Value]) -> Result<A, XcsError> {
        self.check_idle()?;
        self.check_situation(situation)?;
        let policy = ActionPolicy::EpsilonGreedy(self.config.explore_probability);
        self.decide(situation, policy, true)
    }

    /// Chooses the best action for `situation`.
    ///
    /// With `update = false` the learner is left untouched: no covering takes
    /// place, and if no classifier matches, an action is drawn uniformly from
    /// the declared actions. With `update = true` the decision is learned from
    /// like an exploring one, without rule discovery, and [`Self::reward`]
    /// must follow.
    ///
    /// A read-only exploit is allowed while another decision awaits its
    /// reward and does not affect it.
    pub fn exploit(&mut self, situation: &[S::Value], update: bool) -> Result<A, XcsError> {
        if update {
            self.check_idle()?;
        }
        self.check_situation(situation)?;
        if update {
            return self.decide(situation, ActionPolicy::Greedy, false);
        }

        let mut match_set = MatchSet::new();
        match_set.collect_matching(&self.population, situation);
        let prediction_array = PredictionArray::new(&match_set, &self.population, &self.actions);
        let action = if prediction_array.is_empty() {
            self.actions
                .choose(&mut self.rng)
                .cloned()
                .ok_or(SelectionError::EmptyCandidates)?
        } else {
            prediction_array.select(ActionPolicy::Greedy, &mut self.rng)?
        };
        trace!(?action, matched = match_set.len(), "read-only exploit");
        Ok(action)
    }

    fn decide(
        &mut self,
        situation: &[S::Value],
        policy: ActionPolicy,
        evolve: bool,
    ) -> Result<A, XcsError> {
        self.match_set.regenerate(
            &mut self.population,
            situation,
            &self.actions,
            self.time_stamp,
            &self.config,
            &mut self.rng,
        )?;
        let prediction_array = PredictionArray::new(&self.match_set, &self.population, &self.actions);
        let action = prediction_array.select(policy, &mut self.rng)?;
        self.action_set
            .regenerate(&self.match_set, &self.population, &action);

        if let Some(mut previous) = self.previous.take() {
            let payoff = previous.reward + self.config.discount * prediction_array.max();
            previous
                .action_set
                .update(payoff, &mut self.population, &self.config, &mut self.rng);
            if evolve {
                previous.action_set.run_ga(
                    &previous.situation,
                    &mut self.population,
                    &self.actions,
                    self.time_stamp,
                    &self.config,
                    &mut self.rng,
                )?;
            }
            self.action_set.retain_live(&self.population);
        }

        trace!(
            ?action,
            matched = self.match_set.len(),
            action_set = self.action_set.len(),
            "decision"
        );
        self.decision = Decision::AwaitingReward {
            situation: situation.to_vec(),
            evolve,
        };
        Ok(action)
    }

    /// Delivers the reward of the pending decision.
    ///
    /// At the end of a problem the current action set is reinforced with
    /// `reward` directly. Otherwise it waits for the next decision, which
    /// reinforces it with `reward` plus the discounted best prediction of the
    /// next step.
    pub fn reward(&mut self, reward: f64, end_of_problem: bool) -> Result<(), XcsError> {
        let Decision::AwaitingReward { situation, evolve } =
            mem::replace(&mut self.decision, Decision::Idle)
        else {
            return Err(XcsError::NoPendingDecision);
        };

        if end_of_problem {
            self.previous = None;
            self.action_set
                .update(reward, &mut self.population, &self.config, &mut self.rng);
            if evolve {
                self.action_set.run_ga(
                    &situation,
                    &mut self.population,
                    &self.actions,
                    self.time_stamp,
                    &self.config,
                    &mut self.rng,
                )?;
            }
        } else {
            self.previous = Some(PendingStep {
                action_set: mem::take(&mut self.action_set),
                reward,
                situation,
            });
        }
        if evolve {
            self.time_stamp += 1;
        }
        Ok(())
    }

    /// Ends the current problem without a terminal reward, dropping any
    /// pending decision and the action set awaiting its discounted payoff.
    pub fn abandon_problem(&mut self) {
        self.decision = Decision::Idle;
        self.previous = None;
        self.action_set.clear();
    }
}

fn check_config(config: &XcsConfig, action_count: usize) -> Result<(), XcsError> {
    config.validate()?;
    config.required_actions(action_count)?;
    Ok(())
}

impl<S, A> Xcs<S, A>
where
    S: Symbol,
    A: Action + fmt::Display,
{
    /// Snapshot of every macro-classifier.
    #[must_use]
    pub fn records(&self) -> Vec<ClassifierRecord> {
        self.population
            .classifiers()
            .map(|cl| ClassifierRecord::new(cl, &self.config))
            .collect()
    }

    /// Writes the population as CSV.
    pub fn dump_population<W>(&self, writer: &mut W) -> Result<(), PersistenceError>
    where
        W: Write,
    {
        record::write_csv(writer, &self.records())
    }
}

impl<S, A> Xcs<S, A>
where
    S: Symbol,
    A: Action + FromStr,
{
    /// Replaces the population with one read from CSV and returns the number
    /// of macro-classifiers loaded.
    ///
    /// Rows that repeat a condition and action are merged, and the population
    /// is trimmed to the configured size. Any pending decision is dropped.
    pub fn load_population<R>(&mut self, reader: R, mode: LoadMode) -> Result<usize, PersistenceError>
    where
        R: BufRead,
    {
        let classifiers = record::read_classifiers::<S, A, _>(reader, &self.actions, self.situation_len)?;
        self.abandon_problem();
        self.match_set.clear();
        self.population.clear();
        for mut cl in classifiers {
            match mode {
                LoadMode::Fresh => cl.reset_statistics(self.time_stamp, &self.config),
                LoadMode::Resume => self.time_stamp = self.time_stamp.max(cl.time_stamp),
            }
            self.population.insert_or_increment(cl);
        }
        self.population
            .delete_extra_classifiers(&self.config, &mut self.rng);
        info!(
            classifiers = self.population.len(),
            numerosity = self.population.numerosity_sum(),
            ?mode,
            "loaded population"
        );
        Ok(self.population.len())
    }
}
