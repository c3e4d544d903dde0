use rand::Rng;

use crate::{assert_interval, decay::Decay};

use super::Choice;

/// Epsilon greedy exploration policy with an epsilon that decays once per episode
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: f32,
    decay: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy from a starting epsilon and a decay strategy
    ///
    /// **Panics** if `start` is not in the interval `[0,1]`
    pub fn new(start: f32, decay: D) -> Self {
        assert_interval!(start, 0.0, 1.0);
        Self {
            epsilon: start,
            decay,
        }
    }

    /// Invoke epsilon greedy policy with the current epsilon
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Choice {
        if rng.gen::<f32>() < self.epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    /// Apply one step of the decay strategy
    pub fn decay(&mut self) {
        self.epsilon = self.decay.next(self.epsilon);
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn floor(&self) -> f32 {
        self.decay.floor()
    }

    /// Replace the current epsilon, e.g. with one restored from disk
    ///
    /// **Panics** if `epsilon` is not in the interval `[0,1]`
    pub fn set_epsilon(&mut self, epsilon: f32) {
        assert_interval!(epsilon, 0.0, 1.0);
        self.epsilon = epsilon;
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::decay::{Constant, Geometric};

    #[test]
    fn extremes_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        let always = EpsilonGreedy::new(1.0, Constant);
        let never = EpsilonGreedy::new(0.0, Constant);
        for _ in 0..100 {
            assert_eq!(always.choose(&mut rng), Choice::Explore);
            assert_eq!(never.choose(&mut rng), Choice::Exploit);
        }
    }

    #[test]
    fn decay_is_bounded() {
        let mut policy = EpsilonGreedy::new(1.0, Geometric::new(0.9, 0.2).unwrap());
        let mut last = policy.epsilon();
        for _ in 0..100 {
            policy.decay();
            assert!(policy.epsilon() <= last, "Epsilon never increases");
            assert!(policy.epsilon() >= 0.2, "Epsilon never drops below floor");
            last = policy.epsilon();
        }
        assert_eq!(policy.epsilon(), 0.2);
    }

    #[test]
    #[should_panic(expected = "Invalid value for `start`")]
    fn rejects_out_of_range_start() {
        EpsilonGreedy::new(1.5, Constant);
    }
}
