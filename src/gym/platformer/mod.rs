//! A side-scrolling coin collection game
//!
//! The player runs right across a level of pits, blocks, spikes and enemies,
//! picking up coins on the way to a goal line. Positions are in screen units
//! with y growing downwards; the player is a square whose top-left corner is
//! `(x, y)`.

pub mod action;
pub mod config;
pub mod level;
pub mod observation;

pub use action::Action;
pub use config::{Difficulty, LevelParams, PlatformerConfig};
pub use level::{Coin, FixedLevel, Level, LevelGenerator, Obstacle, PatternGenerator};
pub use observation::Observation;

use crate::{
    env::{Environment, Report},
    error::Error,
};

/// Continuous kinematic state of the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub vy: f32,
    /// False exactly when resting on the ground
    pub airborne: bool,
}

/// Bests kept across episodes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Records {
    /// Fastest win, in seconds
    pub best_time: Option<f32>,
    /// Highest score at a win
    pub best_score: u32,
}

/// Read-only snapshot handed to renderers once per tick
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub player: Player,
    /// Left edge of the visible window
    pub camera_x: f32,
    pub level: &'a Level,
    pub config: &'a PlatformerConfig,
    pub score: u32,
    pub coins_collected: usize,
    pub steps: u32,
    pub time: f32,
    pub game_over: bool,
    pub win: bool,
    pub timed_out: bool,
    pub records: Records,
}

enum Collision {
    /// Episode over with the penalty of the last fatal obstacle in level order
    Fatal(f32),
    /// No fatal contact, with any bonus earned for clearing hazards
    Clear(f32),
}

/// The coin collection environment
///
/// Owns the player, the level geometry and all per-episode counters. Geometry
/// comes from a [`LevelGenerator`] on every reset.
pub struct Platformer<G = PatternGenerator> {
    config: PlatformerConfig,
    generator: G,
    player: Player,
    level: Level,
    /// Furthest x reached this episode
    max_x: f32,
    steps: u32,
    score: u32,
    coins_collected: usize,
    game_over: bool,
    win: bool,
    timed_out: bool,
    records: Records,
    pub report: Report,
}

impl<G: LevelGenerator> Platformer<G> {
    pub fn new(config: PlatformerConfig, mut generator: G) -> Self {
        let level = generator.generate(config.physics.ground_y);
        let mut env = Self {
            config,
            generator,
            player: Player {
                x: 0.0,
                y: 0.0,
                vy: 0.0,
                airborne: false,
            },
            level,
            max_x: 0.0,
            steps: 0,
            score: 0,
            coins_collected: 0,
            game_over: false,
            win: false,
            timed_out: false,
            records: Records::default(),
            report: Report::new(vec!["reward", "steps", "score", "coins", "win"]),
        };
        env.restart();
        env
    }

    pub fn config(&self) -> &PlatformerConfig {
        &self.config
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn coins_collected(&self) -> usize {
        self.coins_collected
    }

    pub fn total_coins(&self) -> usize {
        self.level.total_coins()
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn win(&self) -> bool {
        self.win
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn records(&self) -> Records {
        self.records
    }

    /// Elapsed game time in seconds
    pub fn time_taken(&self) -> f32 {
        self.steps as f32 / self.config.screen.fps as f32
    }

    /// Share of the level's coins collected, `0.0` for a level without coins
    pub fn coin_percentage(&self) -> f32 {
        match self.total_coins() {
            0 => 0.0,
            total => self.coins_collected as f32 / total as f32 * 100.0,
        }
    }

    /// Discrete observation of the current state
    pub fn observe(&self) -> Observation {
        Observation::project(
            &self.player,
            &self.level,
            &self.config.physics,
            &self.config.margins,
        )
    }

    /// Snapshot for rendering
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            player: self.player,
            camera_x: (self.player.x - self.config.screen.width / 3.0).max(0.0),
            level: &self.level,
            config: &self.config,
            score: self.score,
            coins_collected: self.coins_collected,
            steps: self.steps,
            time: self.time_taken(),
            game_over: self.game_over,
            win: self.win,
            timed_out: self.timed_out,
            records: self.records,
        }
    }

    /// Step with a raw action id
    ///
    /// Ids outside `0..6` are rejected rather than treated as a no-op.
    pub fn step_id(&mut self, id: u8) -> Result<(Observation, f32, bool), Error> {
        let action = Action::try_from(id)?;
        Ok(self.step(action))
    }

    /// Put the player back at the start with cleared counters, keeping the level
    fn restart(&mut self) {
        let physics = &self.config.physics;
        self.player = Player {
            x: physics.start_x,
            y: physics.rest_y(),
            vy: 0.0,
            airborne: false,
        };
        self.max_x = physics.start_x;
        self.steps = 0;
        self.score = 0;
        self.coins_collected = 0;
        self.game_over = false;
        self.win = false;
        self.timed_out = false;
    }

    fn apply_action(&mut self, action: Action) {
        let physics = &self.config.physics;
        self.player.x += action.direction() * physics.speed;
        if action.jumps() && !self.player.airborne {
            self.player.vy = physics.jump_force;
            self.player.airborne = true;
        }
    }

    fn integrate(&mut self) {
        let physics = &self.config.physics;
        let player = &mut self.player;

        player.vy += physics.gravity;
        player.y += player.vy;

        if player.y >= physics.rest_y() {
            player.y = physics.rest_y();
            player.vy = 0.0;
            player.airborne = false;
        }

        player.x = player.x.max(0.0);
    }

    /// Pick up every coin the player overlaps, returning the reward earned
    fn collect_coins(&mut self) -> f32 {
        let size = self.config.physics.player_size;
        let rules = self.config.coins;
        let (cx, cy) = (self.player.x + size / 2.0, self.player.y + size / 2.0);

        let mut reward = 0.0;
        for coin in self.level.coins.iter_mut().filter(|c| !c.collected) {
            let dist = (cx - coin.x).hypot(cy - coin.y);
            if dist < size / 2.0 + rules.radius {
                coin.collected = true;
                self.coins_collected += 1;
                self.score += rules.value;
                reward += rules.reward;
            }
        }
        reward
    }

    /// Reward for ground not covered before in this episode
    fn forward_progress(&mut self) -> f32 {
        if self.player.x > self.max_x {
            let reward = (self.player.x - self.max_x) * self.config.rewards.forward;
            self.max_x = self.player.x;
            reward
        } else {
            0.0
        }
    }

    fn check_collisions(&self) -> Collision {
        let Player { x, y, .. } = self.player;
        let size = self.config.physics.player_size;
        let ground_y = self.config.physics.ground_y;
        let rewards = &self.config.rewards;
        let margins = &self.config.margins;
        let bottom = y + size;

        let mut bonus = 0.0;
        let mut fatal = None;
        for obstacle in &self.level.obstacles {
            match *obstacle {
                Obstacle::Pit { x: px, width } => {
                    if x + size > px && x < px + width {
                        if bottom >= ground_y - margins.pit_ground_tolerance {
                            fatal = Some(rewards.pit_death);
                        } else if y < self.config.physics.rest_y() - margins.pit_clearance {
                            bonus += rewards.jump_over_pit;
                        }
                    }
                }
                Obstacle::Block {
                    x: bx,
                    y: by,
                    width,
                    ..
                } => {
                    let inset = margins.block_inset;
                    if x + size > bx + inset && x < bx + width - inset && bottom > by + inset {
                        fatal = Some(rewards.block_collision);
                    }
                }
                Obstacle::Spike {
                    x: sx,
                    y: sy,
                    width,
                    ..
                } => {
                    if x + size > sx && x < sx + width && bottom > sy {
                        fatal = Some(rewards.spike_death);
                    }
                }
                Obstacle::Enemy {
                    x: ex,
                    y: ey,
                    radius,
                    ..
                } => {
                    let dist = (x + size / 2.0 - ex).hypot(y + size / 2.0 - ey);
                    if dist < size / 2.0 + radius {
                        fatal = Some(rewards.enemy_death);
                    }
                }
            }
        }
        match fatal {
            Some(penalty) => Collision::Fatal(penalty),
            None => Collision::Clear(bonus),
        }
    }

    /// Terminal reward for reaching the goal with the current counters
    fn goal_reward(&self) -> f32 {
        let rewards = &self.config.rewards;
        let remaining = self.config.limits.time_budget.saturating_sub(self.steps);
        let perfect = if self.coins_collected == self.total_coins() {
            rewards.perfect_bonus
        } else {
            0.0
        };

        rewards.goal_reached
            + self.coins_collected as f32 * rewards.coin_bonus
            + remaining as f32 * rewards.time_bonus
            + perfect
    }

    fn record_win(&mut self) {
        let time = self.time_taken();
        if self.records.best_time.map_or(true, |best| time < best) {
            self.records.best_time = Some(time);
        }
        self.records.best_score = self.records.best_score.max(self.score);
    }
}

impl<G: LevelGenerator> Environment for Platformer<G> {
    type State = Observation;
    type Action = Action;

    fn is_active(&self) -> bool {
        !(self.game_over || self.win || self.timed_out)
    }

    fn step(&mut self, action: Self::Action) -> (Self::State, f32, bool) {
        self.steps += 1;
        let old_x = self.player.x;

        self.apply_action(action);
        self.integrate();

        let mut reward = self.collect_coins();
        reward += self.forward_progress();

        // Terminal rewards replace everything earned this tick
        let mut terminal = None;
        match self.check_collisions() {
            Collision::Fatal(penalty) => {
                self.game_over = true;
                terminal = Some(penalty);
            }
            Collision::Clear(bonus) => reward += bonus,
        }

        // Reaching the goal replaces a collision penalty on the same tick
        if self.player.x >= self.level.goal_x {
            self.win = true;
            terminal = Some(self.goal_reward());
            self.record_win();
        }

        let reward = match terminal {
            Some(terminal) => terminal,
            None if self.steps > self.config.limits.max_steps => {
                self.timed_out = true;
                self.config.rewards.timeout
            }
            None => {
                let mut reward = reward + self.config.rewards.step_penalty;
                if self.player.x < old_x {
                    reward += self.config.rewards.backward_penalty;
                }
                reward
            }
        };

        let done = !self.is_active();
        self.report.add("reward", reward as f64);
        self.report.set("steps", self.steps as f64);
        self.report.set("score", self.score as f64);
        self.report.set("coins", self.coins_collected as f64);
        self.report.set("win", self.win as u8 as f64);

        if done {
            log::debug!(
                "Episode ended after {} steps: win={} game_over={} timed_out={} score={} coins={}/{}",
                self.steps,
                self.win,
                self.game_over,
                self.timed_out,
                self.score,
                self.coins_collected,
                self.total_coins()
            );
        }

        (self.observe(), reward, done)
    }

    fn reset(&mut self) -> Self::State {
        self.level = self.generator.generate(self.config.physics.ground_y);
        self.restart();
        self.observe()
    }
}
