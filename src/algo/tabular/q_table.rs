use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
    fs, io,
    path::Path,
    str::FromStr,
};

use rand::{seq::SliceRandom, thread_rng};
use serde::{Deserialize, Serialize};

use crate::{
    assert_interval,
    decay::{self, Decay},
    env::{DiscreteAction, Environment},
    error::{Error, Result},
    exploration::{BiasedRandom, Choice, EpsilonGreedy},
    memory::Exp,
};

use super::Hashable;

/// Configuration for the [`QTableAgent`]
pub struct QTableAgentConfig<D: Decay> {
    /// Epsilon greedy policy with its starting epsilon and per-episode decay
    ///
    /// **Default**: epsilon `1.0`, decayed by `0.997` per episode down to `0.05`
    pub exploration: EpsilonGreedy<D>,
    /// Distribution of exploratory actions
    ///
    /// **Default**: uniform
    pub bias: BiasedRandom,
    /// Learning rate
    ///
    /// **Default**: `0.15`
    pub alpha: f32,
    /// Discount factor
    ///
    /// **Default**: `0.99`
    pub gamma: f32,
}

impl Default for QTableAgentConfig<decay::Geometric> {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::new(1.0, decay::Geometric::default()),
            bias: BiasedRandom::uniform(),
            alpha: 0.15,
            gamma: 0.99,
        }
    }
}

/// A Q-learning agent that keeps one row of action values per observed state
///
/// ### Generics
/// - `E` - The [`Environment`] in which the agent will learn
///     - States must be `Copy`, `Eq`, and `Hash` to be used as keys in a [`HashMap`]
///     - Actions must form a [`DiscreteAction`] space; each row holds one value per action
/// - `D` - The [`Decay`] strategy applied to epsilon after every finished episode
///
/// Rows are created zeroed the first time a state is looked up and are never removed.
pub struct QTableAgent<E, D = decay::Geometric>
where
    E: Environment,
    E::State: Hashable,
    E::Action: DiscreteAction,
    D: Decay,
{
    q_table: HashMap<E::State, Vec<f32>>,
    /// How often each action was picked greedily, for reporting only
    action_counts: HashMap<E::State, Vec<u32>>,
    exploration: EpsilonGreedy<D>,
    bias: BiasedRandom,
    alpha: f32,   // learning rate
    gamma: f32,   // discount factor
    episode: u32, // completed learning episodes
}

impl<E, D> QTableAgent<E, D>
where
    E: Environment,
    E::State: Hashable,
    E::Action: DiscreteAction,
    D: Decay,
{
    /// Initialize a new `QTableAgent`
    ///
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`, or if the
    /// exploration bias prefers an action outside the action space
    pub fn new(config: QTableAgentConfig<D>) -> Self {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);
        assert!(
            config
                .bias
                .max_index()
                .map_or(true, |i| i < E::Action::COUNT),
            "Exploration bias refers to an action outside the action space"
        );
        Self {
            q_table: HashMap::new(),
            action_counts: HashMap::new(),
            exploration: config.exploration,
            bias: config.bias,
            alpha: config.alpha,
            gamma: config.gamma,
            episode: 0,
        }
    }

    pub fn get_q_table(&self) -> &HashMap<E::State, Vec<f32>> {
        &self.q_table
    }

    pub fn get_action_counts(&self) -> &HashMap<E::State, Vec<u32>> {
        &self.action_counts
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }

    /// Number of learning episodes completed
    pub fn episode(&self) -> u32 {
        self.episode
    }

    fn row(&mut self, state: E::State) -> &mut Vec<f32> {
        self.q_table
            .entry(state)
            .or_insert_with(|| vec![0.0; E::Action::COUNT])
    }

    /// Choose an action for `state`
    ///
    /// With `explore` set, epsilon greedy: exploratory actions come from the
    /// configured bias. Otherwise, or when the policy exploits, one of the
    /// highest valued actions is picked uniformly at random.
    pub fn act(&mut self, state: E::State, explore: bool) -> E::Action {
        let mut rng = thread_rng();
        if explore && self.exploration.choose(&mut rng) == Choice::Explore {
            let index = self.bias.sample(E::Action::COUNT, &mut rng);
            return action_at::<E::Action>(index);
        }

        let values = self.row(state);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let best = values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v == max)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let index = best.choose(&mut rng).copied().unwrap_or(0);

        self.action_counts
            .entry(state)
            .or_insert_with(|| vec![0; E::Action::COUNT])[index] += 1;
        action_at::<E::Action>(index)
    }

    /// One-step temporal difference update from a given experience
    ///
    /// A terminal experience (`next_state == None`) uses the reward alone as the target
    /// and never touches a next row.
    pub fn learn(&mut self, experience: Exp<E>) {
        let Exp {
            state,
            action,
            next_state,
            reward,
        } = experience;

        let target = match next_state {
            Some(next) => {
                let max_next = self
                    .row(next)
                    .iter()
                    .copied()
                    .fold(f32::NEG_INFINITY, f32::max);
                reward + self.gamma * max_next
            }
            None => reward,
        };

        let alpha = self.alpha;
        let q = &mut self.row(state)[action.index()];
        *q += alpha * (target - *q);
    }

    /// Decay epsilon once; call after each finished episode
    pub fn decay_exploration(&mut self) {
        self.exploration.decay();
    }

    /// Run one learning episode to completion
    ///
    /// **Returns** the summed reward
    pub fn go(&mut self, env: &mut E) -> f32 {
        self.go_until(env, || false).unwrap_or_default()
    }

    /// Run one learning episode, polling `stop` once per tick
    ///
    /// Updates made before a stop stay applied, but epsilon is only decayed
    /// for episodes that finish.
    ///
    /// **Returns** the summed reward, or `None` if stopped early
    pub fn go_until(&mut self, env: &mut E, stop: impl Fn() -> bool) -> Option<f32> {
        let mut state = env.reset();
        let mut total = 0.0;
        loop {
            if stop() {
                return None;
            }

            let action = self.act(state, true);
            let step = env.step(action);
            let (next, reward, done) = step;
            total += reward;

            self.learn(Exp::from_step(state, action, step));
            if done {
                break;
            }
            state = next;
        }

        self.decay_exploration();
        self.episode += 1;
        Some(total)
    }

    /// Run one greedy episode without learning, polling `stop` once per tick
    ///
    /// **Returns** the summed reward, or `None` if stopped early
    pub fn play(&mut self, env: &mut E, stop: impl Fn() -> bool) -> Option<f32> {
        let mut state = env.reset();
        let mut total = 0.0;
        loop {
            if stop() {
                return None;
            }

            let action = self.act(state, false);
            let (next, reward, done) = env.step(action);
            total += reward;
            if done {
                return Some(total);
            }
            state = next;
        }
    }

    /// The `n` states with the highest best action value, with that action and value
    pub fn policy_sample(&self, n: usize) -> Vec<(E::State, E::Action, f32)>
    where
        E::State: Ord,
    {
        let mut best = self
            .q_table
            .iter()
            .map(|(&state, values)| {
                let (index, value) = values
                    .iter()
                    .copied()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });
                (state, action_at::<E::Action>(index), value)
            })
            .collect::<Vec<_>>();

        best.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
        best.truncate(n);
        best
    }
}

fn action_at<A: DiscreteAction>(index: usize) -> A {
    A::from_index(index).expect("Action index is always within the action space")
}

/// On-disk form of a trained table
///
/// States are keyed by their `Display` form and parsed back with `FromStr`.
#[derive(Debug, Serialize, Deserialize)]
struct TableDocument {
    q_table: BTreeMap<String, Vec<f32>>,
    #[serde(default)]
    action_counts: BTreeMap<String, Vec<u32>>,
    #[serde(default)]
    epsilon: Option<f32>,
}

impl<E, D> QTableAgent<E, D>
where
    E: Environment,
    E::State: Hashable + Display + FromStr,
    <E::State as FromStr>::Err: Display,
    E::Action: DiscreteAction,
    D: Decay,
{
    /// Write the tables and the current epsilon as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let document = TableDocument {
            q_table: self
                .q_table
                .iter()
                .map(|(s, v)| (s.to_string(), v.clone()))
                .collect(),
            action_counts: self
                .action_counts
                .iter()
                .map(|(s, v)| (s.to_string(), v.clone()))
                .collect(),
            epsilon: Some(self.epsilon()),
        };

        fs::write(path, serde_json::to_string_pretty(&document)?)?;
        log::info!(
            "Q-table saved: {} ({} states)",
            path.display(),
            self.q_table.len()
        );
        Ok(())
    }

    /// Replace the tables and epsilon with those saved at `path`
    ///
    /// Nothing is replaced unless the whole document is valid. A document
    /// without an epsilon resumes at the decay floor.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let malformed = |reason: String| Error::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let document: TableDocument =
            serde_json::from_str(&text).map_err(|e| malformed(e.to_string()))?;

        let q_table = decode_rows::<E::State, f32>(document.q_table, E::Action::COUNT)
            .map_err(malformed)?;
        let action_counts = decode_rows::<E::State, u32>(document.action_counts, E::Action::COUNT)
            .map_err(malformed)?;

        let epsilon = document.epsilon.unwrap_or(self.exploration.floor());
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(malformed(format!("epsilon {epsilon} outside [0, 1]")));
        }

        self.q_table = q_table;
        self.action_counts = action_counts;
        self.exploration.set_epsilon(epsilon);
        log::info!(
            "Loaded Q-table: {} states (epsilon: {:.4})",
            self.q_table.len(),
            epsilon
        );
        Ok(())
    }
}

fn decode_rows<S, T>(
    rows: BTreeMap<String, Vec<T>>,
    width: usize,
) -> std::result::Result<HashMap<S, Vec<T>>, String>
where
    S: Hashable + FromStr,
    S::Err: Display,
{
    rows.into_iter()
        .map(|(key, row)| {
            let state = key.parse::<S>().map_err(|e| e.to_string())?;
            if row.len() != width {
                return Err(format!(
                    "row for {key} has {} values, expected {width}",
                    row.len()
                ));
            }
            Ok((state, row))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decay::Constant,
        env::tests::{MockAction, MockEnv},
    };

    fn agent(epsilon: f32) -> QTableAgent<MockEnv, Constant> {
        QTableAgent::new(QTableAgentConfig {
            exploration: EpsilonGreedy::new(epsilon, Constant),
            bias: BiasedRandom::uniform(),
            alpha: 0.5,
            gamma: 0.9,
        })
    }

    #[test]
    fn terminal_update_ignores_next_state() {
        let mut agent = agent(0.0);
        agent.learn(Exp {
            state: 3,
            action: MockAction::Advance,
            next_state: None,
            reward: 10.0,
        });

        assert_eq!(agent.get_q_table()[&3], vec![0.0, 5.0]);
        assert_eq!(agent.get_q_table().len(), 1, "Next row never created");
    }

    #[test]
    fn update_bootstraps_from_best_next_value() {
        let mut agent = agent(0.0);
        agent.q_table.insert(2, vec![4.0, -1.0]);
        agent.learn(Exp {
            state: 1,
            action: MockAction::Stay,
            next_state: Some(2),
            reward: 1.0,
        });

        // target = 1 + 0.9 * 4 = 4.6, q = 0 + 0.5 * 4.6
        let q = agent.get_q_table()[&1][0];
        assert!((q - 2.3).abs() < 1e-6, "q = {q}");
        assert_eq!(agent.get_q_table()[&2], vec![4.0, -1.0], "Next row unchanged");
    }

    #[test]
    fn greedy_ties_are_broken_randomly() {
        let mut agent = agent(0.0);
        let mut seen = [0; 2];
        for _ in 0..200 {
            seen[agent.act(0, false).index()] += 1;
        }
        assert!(seen[0] > 0 && seen[1] > 0, "Both tied actions picked: {seen:?}");
        assert_eq!(agent.get_action_counts()[&0].iter().sum::<u32>(), 200);
    }

    #[test]
    fn greedy_picks_highest_value() {
        let mut agent = agent(0.0);
        agent.q_table.insert(0, vec![-0.5, 0.25]);
        for _ in 0..20 {
            assert_eq!(agent.act(0, true), MockAction::Advance);
        }
    }

    #[test]
    fn exploration_does_not_count_actions() {
        let mut agent = agent(1.0);
        for _ in 0..50 {
            agent.act(0, true);
        }
        assert!(agent.get_action_counts().is_empty());
        assert!(agent.get_q_table().is_empty());
    }

    #[test]
    fn learns_the_corridor() {
        let mut agent = QTableAgent::<MockEnv>::new(QTableAgentConfig {
            exploration: EpsilonGreedy::new(1.0, decay::Geometric::new(0.98, 0.05).unwrap()),
            ..Default::default()
        });
        let mut env = MockEnv::new();

        let mut table_size = 0;
        let mut epsilon = agent.epsilon();
        for _ in 0..500 {
            agent.go(&mut env);
            assert!(agent.get_q_table().len() >= table_size, "Table never shrinks");
            assert!(agent.epsilon() <= epsilon, "Epsilon never increases");
            assert!(agent.epsilon() >= 0.05);
            table_size = agent.get_q_table().len();
            epsilon = agent.epsilon();
        }
        assert_eq!(agent.episode(), 500);

        for state in 0..MockEnv::LEN - 1 {
            let row = &agent.get_q_table()[&state];
            assert!(row[1] > row[0], "Advancing is preferred in cell {state}: {row:?}");
        }

        let reward = agent.play(&mut env, || false).unwrap();
        assert!((reward - 0.7).abs() < 1e-5, "Shortest path taken: {reward}");
    }

    #[test]
    fn stopping_keeps_updates_and_epsilon() {
        let mut agent = agent(1.0);
        let mut env = MockEnv::new();
        let ticks = std::cell::Cell::new(0);
        let result = agent.go_until(&mut env, || {
            ticks.set(ticks.get() + 1);
            ticks.get() > 3
        });

        assert_eq!(result, None);
        assert_eq!(agent.episode(), 0);
        assert!(!agent.get_q_table().is_empty(), "Updates before the stop stay applied");
    }

    #[test]
    fn policy_sample_orders_by_value() {
        let mut agent = agent(0.0);
        agent.q_table.insert(0, vec![1.0, 3.0]);
        agent.q_table.insert(1, vec![7.0, 2.0]);
        agent.q_table.insert(2, vec![-1.0, -2.0]);

        let sample = agent.policy_sample(2);
        assert_eq!(
            sample,
            vec![(1, MockAction::Stay, 7.0), (0, MockAction::Advance, 3.0)]
        );
    }

    #[test]
    #[should_panic(expected = "outside the action space")]
    fn rejects_bias_outside_action_space() {
        QTableAgent::<MockEnv, Constant>::new(QTableAgentConfig {
            exploration: EpsilonGreedy::new(0.5, Constant),
            bias: BiasedRandom::new(vec![(4, 0.5)]),
            alpha: 0.5,
            gamma: 0.9,
        });
    }
}
