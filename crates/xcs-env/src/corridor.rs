use rand::Rng as _;
use rand_pcg::Pcg32;
use xcs_engine::{Environment, Seed};

const GOAL_REWARD: f64 = 1000.0;

const MOVES: [Move; 2] = [Move::Left, Move::Right];

/// Action in a [`Corridor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, derive_more::FromStr)]
pub enum Move {
    Left,
    Right,
}

/// Multi-step corridor of `length` cells.
///
/// Each problem starts in a random cell left of the goal, the rightmost cell.
/// Moving left from the first cell stays in place. Reaching the goal ends the
/// problem with a reward of 1000; every other step earns nothing.
///
/// The situation is the position in binary, most significant bit first.
#[derive(Debug, Clone)]
pub struct Corridor {
    length: usize,
    position: usize,
    situation: Vec<bool>,
    rng: Pcg32,
}

impl Corridor {
    /// # Panics
    ///
    /// Panics if `length` is below 2.
    #[must_use]
    pub fn new(length: usize, seed: Seed) -> Self {
        assert!(length >= 2, "a corridor needs a start cell and a goal");
        let bits = (usize::BITS - (length - 1).leading_zeros()) as usize;
        let mut this = Self {
            length,
            position: 0,
            situation: vec![false; bits],
            rng: seed.rng(),
        };
        this.reset();
        this
    }

    #[must_use]
    pub fn situation_len(&self) -> usize {
        self.situation.len()
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Smallest number of moves from the current cell to the goal.
    #[must_use]
    pub fn distance_to_goal(&self) -> usize {
        self.length - 1 - self.position
    }

    fn move_to(&mut self, position: usize) {
        self.position = position;
        let bits = self.situation.len();
        for (i, bit) in self.situation.iter_mut().enumerate() {
            *bit = (position >> (bits - 1 - i)) & 1 == 1;
        }
    }
}

impl Environment for Corridor {
    type Value = bool;
    type Action = Move;

    fn actions(&self) -> &[Move] {
        &MOVES
    }

    fn situation(&self) -> &[bool] {
        &self.situation
    }

    fn execute_action(&mut self, action: &Move) -> f64 {
        let position = match action {
            Move::Left => self.position.saturating_sub(1),
            Move::Right => (self.position + 1).min(self.length - 1),
        };
        self.move_to(position);
        if self.is_end_of_problem() {
            GOAL_REWARD
        } else {
            0.0
        }
    }

    fn is_end_of_problem(&self) -> bool {
        self.position == self.length - 1
    }

    fn reset(&mut self) {
        let start = self.rng.random_range(0..self.length - 1);
        self.move_to(start);
    }
}
