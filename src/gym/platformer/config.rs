use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Everything that parameterizes a [`Platformer`](super::Platformer)
///
/// Passed by value into the environment so differently configured instances
/// can live side by side. Every section falls back to its default when absent
/// from a serialized document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformerConfig {
    pub screen: Screen,
    pub physics: Physics,
    pub coins: CoinRules,
    pub rewards: Rewards,
    pub limits: Limits,
    pub margins: Margins,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Screen {
    pub width: f32,
    pub height: f32,
    /// Ticks per second, converts step counts into elapsed time
    pub fps: u32,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 500.0,
            fps: 60,
        }
    }
}

/// Player kinematics, screen coordinates with y growing downwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Physics {
    pub player_size: f32,
    /// Horizontal displacement per tick
    pub speed: f32,
    /// Vertical velocity applied on take-off (negative is up)
    pub jump_force: f32,
    pub gravity: f32,
    pub ground_y: f32,
    pub start_x: f32,
}

impl Physics {
    /// Top edge of a player standing on the ground
    pub fn rest_y(&self) -> f32 {
        self.ground_y - self.player_size
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            player_size: 30.0,
            speed: 6.0,
            jump_force: -15.0,
            gravity: 0.45,
            ground_y: 400.0,
            start_x: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinRules {
    pub radius: f32,
    /// Score points per coin
    pub value: u32,
    /// Reward per coin picked up
    pub reward: f32,
}

impl Default for CoinRules {
    fn default() -> Self {
        Self {
            radius: 10.0,
            value: 10,
            reward: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    /// Per unit of x beyond the furthest point reached this episode
    pub forward: f32,
    pub step_penalty: f32,
    pub backward_penalty: f32,
    pub pit_death: f32,
    pub block_collision: f32,
    pub spike_death: f32,
    pub enemy_death: f32,
    /// Per tick spent airborne above a pit
    pub jump_over_pit: f32,
    pub goal_reached: f32,
    /// Per coin held when reaching the goal
    pub coin_bonus: f32,
    /// Per step left under [`Limits::time_budget`]
    pub time_bonus: f32,
    /// Reaching the goal holding every coin
    pub perfect_bonus: f32,
    pub timeout: f32,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            forward: 0.3,
            step_penalty: -0.02,
            backward_penalty: -0.2,
            pit_death: -100.0,
            block_collision: -50.0,
            spike_death: -60.0,
            enemy_death: -50.0,
            jump_over_pit: 1.0,
            goal_reached: 200.0,
            coin_bonus: 5.0,
            time_bonus: 0.1,
            perfect_bonus: 100.0,
            timeout: -30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Episodes time out once the step count exceeds this
    pub max_steps: u32,
    /// Soft budget the time bonus counts down from
    pub time_budget: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 1200,
            time_budget: 500,
        }
    }
}

/// Tolerances used by collision checks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    /// Horizontal inset on both sides of a block, and vertical inset on its top
    pub block_inset: f32,
    /// The player falls into a pit once its bottom is this close to the ground
    pub pit_ground_tolerance: f32,
    /// Height above resting position needed for the jump-over-pit bonus
    pub pit_clearance: f32,
    /// Obstacles up to this far behind the player still count as ahead
    pub obstacle_look_behind: f32,
    /// Horizontal window `(behind, ahead)`, relative to the player, in which coins are observed
    pub coin_window: (f32, f32),
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            block_inset: 5.0,
            pit_ground_tolerance: 2.0,
            pit_clearance: 10.0,
            obstacle_look_behind: 20.0,
            coin_window: (-10.0, 200.0),
        }
    }
}

/// Difficulty presets for [`PatternGenerator`](super::PatternGenerator)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Easy),
            2 => Some(Self::Medium),
            3 => Some(Self::Hard),
            _ => None,
        }
    }

    pub fn params(self) -> LevelParams {
        match self {
            Self::Easy => LevelParams {
                pit_widths: vec![60.0, 70.0],
                block_heights: vec![50.0],
            },
            Self::Medium => LevelParams {
                pit_widths: vec![70.0, 90.0],
                block_heights: vec![50.0, 60.0],
            },
            Self::Hard => LevelParams {
                pit_widths: vec![75.0, 100.0],
                block_heights: vec![55.0, 65.0],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelParams {
    /// Candidate widths for jumpable pits
    pub pit_widths: Vec<f32>,
    /// Candidate heights for single blocks
    pub block_heights: Vec<f32>,
}

impl PlatformerConfig {
    /// Reject configurations the simulation cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        let checks = [
            (self.physics.player_size > 0.0, "physics.player_size must be positive"),
            (self.physics.speed >= 0.0, "physics.speed must not be negative"),
            (self.physics.gravity > 0.0, "physics.gravity must be positive"),
            (self.physics.jump_force < 0.0, "physics.jump_force must be negative"),
            (self.physics.start_x >= 0.0, "physics.start_x must not be negative"),
            (self.coins.radius >= 0.0, "coins.radius must not be negative"),
            (self.screen.fps > 0, "screen.fps must be positive"),
            (self.limits.max_steps > 0, "limits.max_steps must be positive"),
            (
                self.margins.obstacle_look_behind >= 0.0,
                "margins.obstacle_look_behind must not be negative",
            ),
            (
                self.margins.coin_window.0 < self.margins.coin_window.1,
                "margins.coin_window must be an increasing range",
            ),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, reason)) => Err(Error::InvalidConfig(String::from(*reason))),
            None => Ok(()),
        }
    }
}
