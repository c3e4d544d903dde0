//! Training and evaluation drivers for the platformer agent

use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use serde::{Deserialize, Serialize};

use crate::{
    algo::tabular::{QTableAgent, QTableAgentConfig},
    decay::{Decay, Geometric},
    env::DiscreteAction,
    error::Error,
    exploration::{BiasedRandom, EpsilonGreedy},
    gym::platformer::{Action, LevelGenerator, Platformer, PlatformerConfig},
    util::trailing_mean,
};

/// Cooperative stop flag, polled once per tick by running episodes
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Agent hyperparameters as they appear in a settings file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub alpha: f32,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_floor: f32,
    pub epsilon_decay: f32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            alpha: 0.15,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_floor: 0.05,
            epsilon_decay: 0.997,
        }
    }
}

impl AgentSettings {
    /// Agent configuration for the platformer
    ///
    /// Exploration favours running right, running jumps and standing jumps before
    /// falling back to a uniform pick.
    pub fn agent_config(&self) -> Result<QTableAgentConfig<Geometric>, Error> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("epsilon_start", self.epsilon_start),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }

        Ok(QTableAgentConfig {
            exploration: EpsilonGreedy::new(
                self.epsilon_start,
                Geometric::new(self.epsilon_decay, self.epsilon_floor)?,
            ),
            bias: BiasedRandom::new(vec![
                (Action::Right.index(), 0.35),
                (Action::RightJump.index(), 0.2),
                (Action::Jump.index(), 0.2),
            ]),
            alpha: self.alpha,
            gamma: self.gamma,
        })
    }
}

/// Everything a run can be configured with from a JSON document
///
/// Missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub game: PlatformerConfig,
    pub agent: AgentSettings,
}

impl Settings {
    /// Read and validate settings from a JSON file
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.game.validate()?;
        settings.agent.agent_config()?;
        Ok(settings)
    }
}

/// Outcome of one finished episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub reward: f32,
    pub steps: u32,
    pub score: u32,
    /// Game time in seconds
    pub time: f32,
    pub coins: usize,
    pub coin_percentage: f32,
    pub win: bool,
    /// Won holding every coin
    pub perfect: bool,
}

impl EpisodeRecord {
    fn from_env<G: LevelGenerator>(env: &Platformer<G>, reward: f32) -> Self {
        Self {
            reward,
            steps: env.steps(),
            score: env.score(),
            time: env.time_taken(),
            coins: env.coins_collected(),
            coin_percentage: env.coin_percentage(),
            win: env.win(),
            perfect: env.win() && env.coins_collected() == env.total_coins(),
        }
    }
}

/// Per-episode series and end-of-run summary of a training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub episode_rewards: Vec<f32>,
    pub episode_steps: Vec<u32>,
    pub episode_scores: Vec<u32>,
    pub episode_times: Vec<f32>,
    pub coins_collected: Vec<usize>,
    pub coin_percentages: Vec<f32>,
    pub wins: Vec<bool>,
    /// Win rate over the trailing window after each episode
    pub success_rate: Vec<f32>,
    pub epsilon_values: Vec<f32>,
    pub perfect_runs: u32,
    pub final_win_rate: f32,
    pub avg_final_score: f32,
    pub avg_final_coins: f32,
    pub avg_final_coin_pct: f32,
    pub avg_final_time: f32,
    pub total_episodes: u32,
    pub q_table_size: usize,
}

impl TrainingStats {
    fn push(&mut self, record: &EpisodeRecord, epsilon: f32, window: usize) {
        self.episode_rewards.push(record.reward);
        self.episode_steps.push(record.steps);
        self.episode_scores.push(record.score);
        self.episode_times.push(record.time);
        self.coins_collected.push(record.coins);
        self.coin_percentages.push(record.coin_percentage);
        self.wins.push(record.win);
        self.epsilon_values.push(epsilon);
        self.perfect_runs += record.perfect as u32;
        self.success_rate.push(self.win_rate(window));
    }

    /// Share of wins among the last `window` episodes
    pub fn win_rate(&self, window: usize) -> f32 {
        let wins = self.wins.iter().map(|&w| w as u8 as f32).collect::<Vec<_>>();
        trailing_mean(&wins, window)
    }

    fn summarize(&mut self, window: usize, q_table_size: usize) {
        let as_f32 = |values: &[u32]| values.iter().map(|&v| v as f32).collect::<Vec<_>>();
        let coins = self.coins_collected.iter().map(|&c| c as f32).collect::<Vec<_>>();

        self.final_win_rate = self.win_rate(window);
        self.avg_final_score = trailing_mean(&as_f32(&self.episode_scores), window);
        self.avg_final_coins = trailing_mean(&coins, window);
        self.avg_final_coin_pct = trailing_mean(&self.coin_percentages, window);
        self.avg_final_time = trailing_mean(&self.episode_times, window);
        self.total_episodes = self.wins.len() as u32;
        self.q_table_size = q_table_size;
    }
}

/// Drives learning episodes and keeps statistics
#[derive(Debug, Clone)]
pub struct Trainer {
    /// Log a progress line every this many episodes
    pub progress_every: u32,
    /// Number of trailing episodes rates and averages are taken over
    pub window: usize,
    pub interrupt: Interrupt,
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            progress_every: 50,
            window: 100,
            interrupt: Interrupt::new(),
        }
    }
}

impl Trainer {
    /// Train `agent` for up to `episodes` episodes, one at a time
    ///
    /// `on_episode` receives the episode index and the environment's report
    /// after every finished episode. An interrupted episode is left out of the
    /// statistics, but the table updates it made are kept.
    pub fn train<G, D>(
        &self,
        agent: &mut QTableAgent<Platformer<G>, D>,
        env: &mut Platformer<G>,
        episodes: u32,
        mut on_episode: impl FnMut(u32, Vec<f64>),
    ) -> TrainingStats
    where
        G: LevelGenerator,
        D: Decay,
    {
        let mut stats = TrainingStats::default();
        log::info!("Training for {episodes} episodes");

        for episode in 0..episodes {
            let Some(reward) = agent.go_until(env, || self.interrupt.is_triggered()) else {
                log::warn!("Training interrupted during episode {}", episode + 1);
                env.report.take();
                break;
            };

            let record = EpisodeRecord::from_env(env, reward);
            stats.push(&record, agent.epsilon(), self.window);
            on_episode(episode, env.report.take());

            if (episode + 1) % self.progress_every == 0 {
                self.log_progress(&stats, env.total_coins(), agent.epsilon());
            }
        }

        stats.summarize(self.window, agent.get_q_table().len());
        log::info!(
            "Training complete: win rate {:.2}%, avg score {:.0}, avg coins {:.1} ({:.1}%), avg time {:.1}s, perfect runs {}",
            stats.final_win_rate * 100.0,
            stats.avg_final_score,
            stats.avg_final_coins,
            stats.avg_final_coin_pct,
            stats.avg_final_time,
            stats.perfect_runs
        );
        log::info!(
            "Q-table size: {} states, final epsilon {:.4}",
            stats.q_table_size,
            agent.epsilon()
        );
        stats
    }

    fn log_progress(&self, stats: &TrainingStats, total_coins: usize, epsilon: f32) {
        let n = self.progress_every as usize;
        let wins = stats.wins.iter().filter(|&&w| w).count();
        let scores = stats.episode_scores.iter().map(|&s| s as f32).collect::<Vec<_>>();
        let coins = stats.coins_collected.iter().map(|&c| c as f32).collect::<Vec<_>>();
        log::info!(
            "Episode {:>6} | wins {}/{} | time {:.1}s | score {:.0} | coins {:.1}/{} ({:.0}%) | epsilon {:.4} | win rate {:.2}%",
            stats.wins.len(),
            wins,
            stats.wins.len(),
            trailing_mean(&stats.episode_times, n),
            trailing_mean(&scores, n),
            trailing_mean(&coins, n),
            total_coins,
            trailing_mean(&stats.coin_percentages, n),
            epsilon,
            stats.win_rate(self.window) * 100.0
        );
    }

    /// Replay greedy episodes without learning
    ///
    /// Stops early, without a record for the unfinished episode, when interrupted.
    pub fn evaluate<G, D>(
        &self,
        agent: &mut QTableAgent<Platformer<G>, D>,
        env: &mut Platformer<G>,
        episodes: u32,
    ) -> Vec<EpisodeRecord>
    where
        G: LevelGenerator,
        D: Decay,
    {
        let mut records = Vec::with_capacity(episodes as usize);
        for episode in 0..episodes {
            let Some(reward) = agent.play(env, || self.interrupt.is_triggered()) else {
                break;
            };
            env.report.take();

            let record = EpisodeRecord::from_env(env, reward);
            let result = if record.win {
                "WIN"
            } else if env.timed_out() {
                "TIMEOUT"
            } else {
                "LOSS"
            };
            log::info!(
                "Episode {}: {} | score {} | coins {}/{} | time {:.1}s",
                episode + 1,
                result,
                record.score,
                record.coins,
                env.total_coins(),
                record.time
            );
            records.push(record);
        }
        records
    }
}

/// Log the best learned actions for the top `n` states
pub fn log_policy_sample<G, D>(agent: &QTableAgent<Platformer<G>, D>, n: usize)
where
    G: LevelGenerator,
    D: Decay,
{
    let sample = agent.policy_sample(n);
    if sample.is_empty() {
        log::info!("No policy learned yet (Q-table is empty)");
        return;
    }

    log::info!("Top {} learned strategies:", sample.len());
    for (state, action, value) in sample {
        log::info!("{:<60} | {:<12} | {:.2}", state.describe(), action, value);
    }
}
