/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time MDP with one agent,
/// a finite observation space and a finite action space.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Determine if the episode is still running
    fn is_active(&self) -> bool;

    /// Update the environment in response to an action taken by an agent
    ///
    /// **Returns** `(next_state, reward, done)`
    fn step(&mut self, action: Self::Action) -> (Self::State, f32, bool);

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}

/// A fixed action space whose actions are indexed `0..COUNT`
pub trait DiscreteAction: Copy + Sized {
    /// Number of actions in the space
    const COUNT: usize;

    /// Position of this action in the space
    fn index(self) -> usize;

    /// Look up an action by index, `None` if out of range
    fn from_index(index: usize) -> Option<Self>;
}

/// Named per-episode counters accumulated by an environment
///
/// Key order is fixed at construction so the values line up with plot names.
#[derive(Debug, Clone)]
pub struct Report {
    keys: Vec<&'static str>,
    values: Vec<f64>,
}

impl Report {
    pub fn new(keys: Vec<&'static str>) -> Self {
        let values = vec![0.0; keys.len()];
        Self { keys, values }
    }

    pub fn keys(&self) -> &[&'static str] {
        &self.keys
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.position(key).map(|i| self.values[i])
    }

    /// Add `amount` to the counter `key`
    ///
    /// **Panics** if `key` was not registered
    pub fn add(&mut self, key: &str, amount: f64) {
        let i = self.expect_position(key);
        self.values[i] += amount;
    }

    /// Overwrite the counter `key`
    ///
    /// **Panics** if `key` was not registered
    pub fn set(&mut self, key: &str, value: f64) {
        let i = self.expect_position(key);
        self.values[i] = value;
    }

    /// Take the current values, leaving every counter at zero
    pub fn take(&mut self) -> Vec<f64> {
        let len = self.values.len();
        std::mem::replace(&mut self.values, vec![0.0; len])
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }

    fn expect_position(&self, key: &str) -> usize {
        self.position(key)
            .unwrap_or_else(|| panic!("Unknown report key `{key}`"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum MockAction {
        Stay = 0,
        Advance = 1,
    }

    impl DiscreteAction for MockAction {
        const COUNT: usize = 2;

        fn index(self) -> usize {
            self as usize
        }

        fn from_index(index: usize) -> Option<Self> {
            match index {
                0 => Some(Self::Stay),
                1 => Some(Self::Advance),
                _ => None,
            }
        }
    }

    /// A corridor of `LEN` cells; reaching the last cell pays 1, every other step costs 0.1
    pub struct MockEnv {
        pub pos: u8,
        pub steps: u32,
    }

    impl MockEnv {
        pub const LEN: u8 = 5;
        pub const MAX_STEPS: u32 = 50;

        pub fn new() -> Self {
            Self { pos: 0, steps: 0 }
        }
    }

    impl Environment for MockEnv {
        type State = u8;
        type Action = MockAction;

        fn is_active(&self) -> bool {
            self.pos < Self::LEN - 1 && self.steps < Self::MAX_STEPS
        }

        fn step(&mut self, action: Self::Action) -> (Self::State, f32, bool) {
            self.steps += 1;
            if action == MockAction::Advance {
                self.pos += 1;
            }
            let reward = if self.pos == Self::LEN - 1 { 1.0 } else { -0.1 };
            (self.pos, reward, !self.is_active())
        }

        fn reset(&mut self) -> Self::State {
            self.pos = 0;
            self.steps = 0;
            self.pos
        }
    }

    #[test]
    fn report_take_resets() {
        let mut report = Report::new(vec!["reward", "steps"]);
        report.add("steps", 1.0);
        report.add("steps", 1.0);
        report.set("reward", -3.5);

        assert_eq!(report.get("steps"), Some(2.0));
        assert_eq!(report.take(), vec![-3.5, 2.0], "Values follow key order");
        assert_eq!(report.take(), vec![0.0, 0.0], "Counters reset after take");
        assert_eq!(report.get("missing"), None);
    }

    #[test]
    #[should_panic(expected = "Unknown report key")]
    fn report_rejects_unknown_key() {
        Report::new(vec!["reward"]).add("score", 1.0);
    }
}
