use rand::Rng as _;
use rand_pcg::Pcg32;
use xcs_engine::{Environment, Seed};

const CORRECT_REWARD: f64 = 1000.0;

const ACTIONS: [bool; 2] = [false, true];

/// Value of the data bit selected by the leading `address_bits` bits,
/// read most significant first.
fn addressed_bit<I>(bits: I, address_bits: usize) -> bool
where
    I: IntoIterator<Item = bool>,
{
    let mut bits = bits.into_iter();
    let address = bits
        .by_ref()
        .take(address_bits)
        .fold(0, |address, bit| address * 2 + usize::from(bit));
    bits.nth(address).unwrap_or(false)
}

/// Boolean multiplexer: `k` address bits select one of `2^k` data bits, and
/// the correct action is the value of that bit.
///
/// Every problem is a single step.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    address_bits: usize,
    situation: Vec<bool>,
    rng: Pcg32,
    done: bool,
}

impl Multiplexer {
    /// Creates the `k + 2^k`-bit multiplexer and draws its first situation.
    #[must_use]
    pub fn new(address_bits: usize, seed: Seed) -> Self {
        let mut this = Self {
            address_bits,
            situation: vec![false; address_bits + (1 << address_bits)],
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

    /// Action earning the reward in the current situation.
    #[must_use]
    pub fn correct_action(&self) -> bool {
        addressed_bit(self.situation.iter().copied(), self.address_bits)
    }
}

impl Environment for Multiplexer {
    type Value = bool;
    type Action = bool;

    fn actions(&self) -> &[bool] {
        &ACTIONS
    }

    fn situation(&self) -> &[bool] {
        &self.situation
    }

    fn execute_action(&mut self, action: &bool) -> f64 {
        self.done = true;
        if *action == self.correct_action() {
            CORRECT_REWARD
        } else {
            0.0
        }
    }

    fn is_end_of_problem(&self) -> bool {
        self.done
    }

    fn reset(&mut self) {
        for bit in &mut self.situation {
            *bit = self.rng.random();
        }
        self.done = false;
    }
}

/// Real-valued multiplexer: inputs are drawn from `[0, 1)` and read as bits
/// by thresholding at 0.5.
#[derive(Debug, Clone)]
pub struct RealMultiplexer {
    address_bits: usize,
    situation: Vec<f64>,
    rng: Pcg32,
    done: bool,
}

impl RealMultiplexer {
    #[must_use]
    pub fn new(address_bits: usize, seed: Seed) -> Self {
        let mut this = Self {
            address_bits,
            situation: vec![0.0; address_bits + (1 << address_bits)],
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

    #[must_use]
    pub fn correct_action(&self) -> bool {
        addressed_bit(self.situation.iter().map(|x| *x >= 0.5), self.address_bits)
    }
}

impl Environment for RealMultiplexer {
    type Value = f64;
    type Action = bool;

    fn actions(&self) -> &[bool] {
        &ACTIONS
    }

    fn situation(&self) -> &[f64] {
        &self.situation
    }

    fn execute_action(&mut self, action: &bool) -> f64 {
        self.done = true;
        if *action == self.correct_action() {
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
