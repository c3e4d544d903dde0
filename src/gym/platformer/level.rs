use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use super::config::{Difficulty, LevelParams};

/// A hazard in the level, positioned by its left edge (or centre, for enemies)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Obstacle {
    /// A gap in the ground
    Pit { x: f32, width: f32 },
    /// A solid block standing on the ground, `y` is its top edge
    Block { x: f32, y: f32, width: f32, height: f32 },
    /// A spike standing on the ground, `y` is its tip
    Spike { x: f32, y: f32, width: f32, height: f32 },
    /// A round enemy centred on `(x, y)`
    ///
    /// `patrol_range` describes the walk it would take from `start_x`; enemies
    /// are not moved by the simulation.
    Enemy {
        x: f32,
        y: f32,
        radius: f32,
        start_x: f32,
        patrol_range: f32,
    },
}

impl Obstacle {
    /// Horizontal reference position used for distance measurements
    pub fn x(&self) -> f32 {
        match *self {
            Self::Pit { x, .. }
            | Self::Block { x, .. }
            | Self::Spike { x, .. }
            | Self::Enemy { x, .. } => x,
        }
    }

    /// Observation code: pit 1, block 2, spike 3, enemy 4
    pub fn code(&self) -> u8 {
        match self {
            Self::Pit { .. } => 1,
            Self::Block { .. } => 2,
            Self::Spike { .. } => 3,
            Self::Enemy { .. } => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub collected: bool,
}

impl Coin {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            collected: false,
        }
    }
}

/// Geometry of one episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub obstacles: Vec<Obstacle>,
    /// Coins keep their position in this list for the whole episode
    pub coins: Vec<Coin>,
    /// The episode is won once the player reaches this x
    pub goal_x: f32,
}

impl Level {
    /// A level with no obstacles and no coins
    pub fn empty(goal_x: f32) -> Self {
        Self {
            goal_x,
            ..Default::default()
        }
    }

    pub fn total_coins(&self) -> usize {
        self.coins.len()
    }
}

/// Produces fresh geometry for every episode
pub trait LevelGenerator {
    fn generate(&mut self, ground_y: f32) -> Level;
}

impl<F> LevelGenerator for F
where
    F: FnMut(f32) -> Level,
{
    fn generate(&mut self, ground_y: f32) -> Level {
        self(ground_y)
    }
}

/// Replays the same level every episode
#[derive(Debug, Clone)]
pub struct FixedLevel(pub Level);

impl LevelGenerator for FixedLevel {
    fn generate(&mut self, _ground_y: f32) -> Level {
        let mut level = self.0.clone();
        for coin in &mut level.coins {
            coin.collected = false;
        }
        level
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    CoinTrail,
    SafeSpace,
    EasyPit,
    PitCoins,
    SingleBlock,
    BlockCoins,
    CoinArc,
    SpikeCoins,
    EnemyCoins,
    CoinMaze,
    DoubleBlockCoins,
    FinalCoinRush,
}

const COURSE: [Pattern; 18] = {
    use Pattern::*;
    [
        CoinTrail,
        EasyPit,
        CoinTrail,
        SingleBlock,
        SafeSpace,
        PitCoins,
        CoinArc,
        SpikeCoins,
        SafeSpace,
        BlockCoins,
        CoinTrail,
        EnemyCoins,
        SafeSpace,
        EasyPit,
        DoubleBlockCoins,
        CoinMaze,
        SafeSpace,
        FinalCoinRush,
    ]
};

const COURSE_START_X: f32 = 300.0;
const GOAL_PADDING: f32 = 50.0;

/// Lays out a fixed sequence of obstacle and coin patterns
///
/// Only pit widths and block heights are randomized, so every generated level
/// has the same obstacle count and coin count.
pub struct PatternGenerator {
    params: LevelParams,
    rng: StdRng,
}

impl PatternGenerator {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            params: difficulty.params(),
            rng: StdRng::from_entropy(),
        }
    }

    /// A generator whose levels are reproducible
    pub fn seeded(difficulty: Difficulty, seed: u64) -> Self {
        Self {
            params: difficulty.params(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

fn pick(rng: &mut StdRng, options: &[f32], fallback: f32) -> f32 {
    options.choose(rng).copied().unwrap_or(fallback)
}

impl LevelGenerator for PatternGenerator {
    fn generate(&mut self, ground_y: f32) -> Level {
        let mut obstacles = Vec::new();
        let mut coins = Vec::new();
        let mut x = COURSE_START_X;
        let g = ground_y;

        for pattern in COURSE {
            match pattern {
                Pattern::CoinTrail => {
                    coins.extend((0..8).map(|i| Coin::new(x + i as f32 * 30.0, g - 40.0)));
                    x += 280.0;
                }
                Pattern::SafeSpace => {
                    coins.extend((0..3).map(|i| Coin::new(x + i as f32 * 40.0, g - 50.0)));
                    x += 180.0;
                }
                Pattern::EasyPit => {
                    let width = pick(&mut self.rng, &self.params.pit_widths, 60.0);
                    obstacles.push(Obstacle::Pit { x, width });
                    coins.push(Coin::new(x - 40.0, g - 60.0));
                    coins.push(Coin::new(x + width + 40.0, g - 60.0));
                    x += width + 200.0;
                }
                Pattern::PitCoins => {
                    let width = 70.0;
                    obstacles.push(Obstacle::Pit { x, width });
                    coins.extend((0..5).map(|i| {
                        Coin::new(x + 10.0 + i as f32 * 15.0, g - 100.0 - (i % 2) as f32 * 20.0)
                    }));
                    x += width + 200.0;
                }
                Pattern::SingleBlock => {
                    let height = pick(&mut self.rng, &self.params.block_heights, 50.0);
                    obstacles.push(block(x, g, 40.0, height));
                    coins.push(Coin::new(x + 20.0, g - height - 40.0));
                    x += 200.0;
                }
                Pattern::BlockCoins => {
                    let height = pick(&mut self.rng, &self.params.block_heights, 50.0);
                    obstacles.push(block(x, g, 40.0, height));
                    coins.push(Coin::new(x + 20.0, g - height - 40.0));
                    coins.push(Coin::new(x - 40.0, g - 60.0));
                    coins.push(Coin::new(x + 80.0, g - 60.0));
                    x += 250.0;
                }
                Pattern::CoinArc => {
                    coins.extend((0..9).map(|i: i32| {
                        let height = 50.0 + (4 - i).abs() as f32 * 20.0;
                        Coin::new(x + i as f32 * 30.0, g - height)
                    }));
                    x += 300.0;
                }
                Pattern::SpikeCoins => {
                    obstacles.push(Obstacle::Spike {
                        x,
                        y: g - 50.0,
                        width: 40.0,
                        height: 50.0,
                    });
                    coins.extend((0..3).map(|i| Coin::new(x - 30.0 + i as f32 * 30.0, g - 120.0)));
                    x += 250.0;
                }
                Pattern::EnemyCoins => {
                    obstacles.push(Obstacle::Enemy {
                        x: x + 40.0,
                        y: g - 30.0,
                        radius: 15.0,
                        start_x: x + 40.0,
                        patrol_range: 80.0,
                    });
                    coins.extend((0..4).map(|i| Coin::new(x - 20.0 + i as f32 * 40.0, g - 100.0)));
                    x += 280.0;
                }
                Pattern::CoinMaze => {
                    coins.extend((0..10).map(|i| {
                        let height = 60.0 + (i % 3) as f32 * 35.0;
                        Coin::new(x + i as f32 * 25.0, g - height)
                    }));
                    x += 280.0;
                }
                Pattern::DoubleBlockCoins => {
                    for i in 0..2 {
                        let bx = x + i as f32 * 120.0;
                        obstacles.push(block(bx, g, 40.0, 55.0));
                        coins.push(Coin::new(bx + 20.0, g - 95.0));
                    }
                    coins.extend((0..2).map(|j| Coin::new(x + 60.0 + j as f32 * 20.0, g - 70.0)));
                    x += 280.0;
                }
                Pattern::FinalCoinRush => {
                    coins.extend((0..12).map(|i| Coin::new(x + i as f32 * 25.0, g - 40.0)));
                    coins.extend((0..10).map(|i| Coin::new(x + 30.0 + i as f32 * 30.0, g - 110.0)));
                    x += 400.0;
                }
            }
        }

        let level = Level {
            obstacles,
            coins,
            goal_x: x + GOAL_PADDING,
        };
        log::debug!(
            "Level generated: {} obstacles, {} coins, goal at x={}",
            level.obstacles.len(),
            level.coins.len(),
            level.goal_x
        );
        level
    }
}

fn block(x: f32, ground_y: f32, width: f32, height: f32) -> Obstacle {
    Obstacle::Block {
        x,
        y: ground_y - height,
        width,
        height,
    }
}
