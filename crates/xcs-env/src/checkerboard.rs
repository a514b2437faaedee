use rand::Rng as _;
use rand_pcg::Pcg32;
use xcs_engine::{Environment, Seed};

const CORRECT_REWARD: f64 = 1000.0;

const COLOURS: [bool; 2] = [false, true];

/// Real-valued checkerboard over `[0, 1)^n`.
///
/// Each dimension is cut into `divisions` equal cells; the colour of a point
/// is the parity of the sum of its cell indices (`true` for odd). The learner
/// has to name the colour. Every problem is a single step.
#[derive(Debug, Clone)]
pub struct Checkerboard {
    divisions: u32,
    situation: Vec<f64>,
    rng: Pcg32,
    done: bool,
}

impl Checkerboard {
    /// # Panics
    ///
    /// Panics if `dimensions` or `divisions` is zero.
    #[must_use]
    pub fn new(dimensions: usize, divisions: u32, seed: Seed) -> Self {
        assert!(dimensions > 0 && divisions > 0);
        let mut this = Self {
            divisions,
            situation: vec![0.0; dimensions],
            rng: seed.rng(),
            done: false,
        };
        this.reset();
        this
    }

    #[must_use]
    pub fn situation_len(&self) -> usize {
        self.situation.len()
    }

    /// Colour of `point`.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn colour(&self, point: &[f64]) -> bool {
        let divisions = f64::from(self.divisions);
        let cells: u64 = point
            .iter()
            .map(|x| ((x * divisions).floor() as u64).min(u64::from(self.divisions) - 1))
            .sum();
        cells % 2 == 1
    }
}

impl Environment for Checkerboard {
    type Value = f64;
    type Action = bool;

    fn actions(&self) -> &[bool] {
        &COLOURS
    }

    fn situation(&self) -> &[f64] {
        &self.situation
    }

    fn execute_action(&mut self, action: &bool) -> f64 {
        self.done = true;
        if *action == self.colour(&self.situation) {
            CORRECT_REWARD
        } else {
            0.0
        }
    }

    fn is_end_of_problem(&self) -> bool {
        self.done
    }

    fn reset(&mut self) {
        for x in &mut self.situation {
            *x = self.rng.random();
        }
        self.done = false;
    }
}
