use std::{fmt, str::FromStr};

use thiserror::Error;

use super::{
    config::{Margins, Physics},
    level::Level,
    Obstacle, Player,
};

/// Distance bucket reported when no obstacle is ahead
pub const NO_OBSTACLE: u8 = 8;
/// Coin distance bucket reported when no coin qualifies, or the first one is too far to bucket
pub const NO_COIN: u8 = 8;

/// Upper bounds of obstacle distance buckets 0..=4, anything further is bucket 5
const OBSTACLE_BUCKETS: [f32; 5] = [30.0, 60.0, 100.0, 150.0, 200.0];
/// Upper bounds of coin distance buckets 0..=2
const COIN_BUCKETS: [f32; 3] = [50.0, 100.0, 150.0];
/// Heights above ground separating low, mid and high coins
const COIN_HIGH: f32 = 100.0;
const COIN_MID: f32 = 60.0;
/// Vertical speed under which a jump counts as being near its peak
const PEAK_SPEED: f32 = 5.0;

/// Discrete view of the game handed to the agent
///
/// Every field is a small integer so the whole tuple can key a Q-table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Observation {
    /// 0 none, 1 pit, 2 block, 3 spike, 4 enemy
    pub obstacle_type: u8,
    /// 0..=5 from very close to very far, [`NO_OBSTACLE`] when there is none
    pub distance_bucket: u8,
    /// 0 grounded, 1 rising, 2 near peak, 3 falling
    pub jump_phase: u8,
    /// 1 while the player's centre is over a pit
    pub over_pit: u8,
    /// 0..=2 from near to far, [`NO_COIN`] otherwise
    pub coin_distance: u8,
    /// 0 low, 1 mid, 2 high
    pub coin_height: u8,
}

impl Observation {
    /// Project the continuous game state into an observation
    ///
    /// Pure: the same player and level always give the same observation.
    pub fn project(player: &Player, level: &Level, physics: &Physics, margins: &Margins) -> Self {
        let (obstacle_type, distance_bucket) =
            nearest_obstacle(player, &level.obstacles, margins.obstacle_look_behind);
        let (coin_distance, coin_height) =
            first_coin(player, level, physics.ground_y, margins.coin_window);
        let centre = player.x + physics.player_size / 2.0;

        let over_pit = level.obstacles.iter().any(|o| match *o {
            Obstacle::Pit { x, width } => centre > x && centre < x + width,
            _ => false,
        });

        Self {
            obstacle_type,
            distance_bucket,
            jump_phase: jump_phase(player),
            over_pit: over_pit as u8,
            coin_distance,
            coin_height,
        }
    }

    fn fields(&self) -> [u8; 6] {
        [
            self.obstacle_type,
            self.distance_bucket,
            self.jump_phase,
            self.over_pit,
            self.coin_distance,
            self.coin_height,
        ]
    }

    /// Human readable summary used in policy reports
    pub fn describe(&self) -> String {
        let obstacle = match self.obstacle_type {
            0 => "None",
            1 => "Pit",
            2 => "Block",
            3 => "Spike",
            4 => "Enemy",
            _ => "?",
        };
        let distance = match self.distance_bucket {
            0 => "VeryClose",
            1 => "Close",
            2 => "Medium",
            3 => "MedFar",
            4 => "Far",
            5 => "VeryFar",
            NO_OBSTACLE => "None",
            _ => "?",
        };
        let jump = match self.jump_phase {
            0 => "Ground",
            1 => "Rising",
            2 => "Peak",
            3 => "Falling",
            _ => "?",
        };
        let coin = match self.coin_distance {
            0 => "Nearby",
            1 => "Close",
            2 => "MedFar",
            NO_COIN => "None",
            _ => "?",
        };
        let height = match self.coin_height {
            0 => "Low",
            1 => "Mid",
            2 => "High",
            _ => "?",
        };
        format!(
            "Obs:{obstacle:<6} Dist:{distance:<9} Jump:{jump:<7} Pit:{} Coin:{coin:<6}@{height}",
            self.over_pit
        )
    }
}

fn nearest_obstacle(player: &Player, obstacles: &[Obstacle], look_behind: f32) -> (u8, u8) {
    let mut nearest: Option<(&Obstacle, f32)> = None;
    for obstacle in obstacles {
        let dist = obstacle.x() - player.x;
        let closer = nearest.map_or(true, |(_, best)| dist < best);
        if dist > -look_behind && closer {
            nearest = Some((obstacle, dist));
        }
    }

    match nearest {
        None => (0, NO_OBSTACLE),
        Some((obstacle, dist)) => {
            let bucket = OBSTACLE_BUCKETS
                .iter()
                .position(|&bound| dist < bound)
                .unwrap_or(OBSTACLE_BUCKETS.len());
            (obstacle.code(), bucket as u8)
        }
    }
}

/// The first uncollected coin in level order inside the window, not the closest
fn first_coin(player: &Player, level: &Level, ground_y: f32, window: (f32, f32)) -> (u8, u8) {
    let (behind, ahead) = window;
    let coin = level
        .coins
        .iter()
        .filter(|c| !c.collected)
        .find(|c| {
            let dist = c.x - player.x;
            dist > behind && dist < ahead
        });

    let Some(coin) = coin else {
        return (NO_COIN, 0);
    };

    let dist = coin.x - player.x;
    let distance = COIN_BUCKETS
        .iter()
        .position(|&bound| dist < bound)
        .map_or(NO_COIN, |b| b as u8);
    let height = if coin.y < ground_y - COIN_HIGH {
        2
    } else if coin.y < ground_y - COIN_MID {
        1
    } else {
        0
    };
    (distance, height)
}

fn jump_phase(player: &Player) -> u8 {
    if !player.airborne {
        0
    } else if player.vy < -PEAK_SPEED {
        1
    } else if player.vy.abs() <= PEAK_SPEED {
        2
    } else {
        3
    }
}

impl fmt::Display for Observation {
    /// Formats as a parenthesised tuple, e.g. `(1, 2, 0, 0, 8, 0)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.fields();
        write!(f, "({a}, {b}, {c}, {d}, {e}, {g})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid observation key `{key}`: {reason}")]
pub struct ParseObservationError {
    key: String,
    reason: &'static str,
}

impl FromStr for Observation {
    type Err = ParseObservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ParseObservationError {
            key: String::from(s),
            reason,
        };

        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| fail("expected a parenthesised tuple"))?;

        let values = inner
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| fail("expected small non-negative integers"))?;

        let [obstacle_type, distance_bucket, jump_phase, over_pit, coin_distance, coin_height] =
            values[..]
        else {
            return Err(fail("expected exactly six fields"));
        };

        let valid = obstacle_type <= 4
            && (distance_bucket <= 5 || distance_bucket == NO_OBSTACLE)
            && jump_phase <= 3
            && over_pit <= 1
            && (coin_distance <= 2 || coin_distance == NO_COIN)
            && coin_height <= 2;
        if !valid {
            return Err(fail("field out of range"));
        }

        Ok(Self {
            obstacle_type,
            distance_bucket,
            jump_phase,
            over_pit,
            coin_distance,
            coin_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gym::platformer::level::Coin;

    fn physics() -> Physics {
        Physics::default()
    }

    fn observe(player: &Player, level: &Level) -> Observation {
        Observation::project(player, level, &physics(), &Margins::default())
    }

    fn grounded(x: f32) -> Player {
        Player {
            x,
            y: physics().rest_y(),
            vy: 0.0,
            airborne: false,
        }
    }

    #[test]
    fn empty_level_uses_sentinels() {
        let obs = observe(&grounded(100.0), &Level::empty(1000.0));
        assert_eq!(
            obs,
            Observation {
                obstacle_type: 0,
                distance_bucket: NO_OBSTACLE,
                jump_phase: 0,
                over_pit: 0,
                coin_distance: NO_COIN,
                coin_height: 0,
            }
        );
    }

    #[test]
    fn obstacle_buckets() {
        let level = |x| Level {
            obstacles: vec![Obstacle::Spike {
                x,
                y: 350.0,
                width: 40.0,
                height: 50.0,
            }],
            ..Level::empty(5000.0)
        };
        let bucket = |x| observe(&grounded(100.0), &level(x)).distance_bucket;

        assert_eq!(bucket(85.0), 0, "Just passed still counts");
        assert_eq!(bucket(129.0), 0);
        assert_eq!(bucket(130.0), 1);
        assert_eq!(bucket(199.0), 2);
        assert_eq!(bucket(249.0), 3);
        assert_eq!(bucket(299.0), 4);
        assert_eq!(bucket(300.0), 5);
        assert_eq!(bucket(80.0), NO_OBSTACLE, "Too far behind");
    }

    #[test]
    fn nearest_obstacle_wins() {
        let level = Level {
            obstacles: vec![
                Obstacle::Pit { x: 400.0, width: 60.0 },
                Obstacle::Enemy {
                    x: 150.0,
                    y: 370.0,
                    radius: 15.0,
                    start_x: 150.0,
                    patrol_range: 80.0,
                },
            ],
            ..Level::empty(5000.0)
        };
        let obs = observe(&grounded(100.0), &level);
        assert_eq!((obs.obstacle_type, obs.distance_bucket), (4, 1));
    }

    #[test]
    fn jump_phases() {
        let phase = |airborne, vy| {
            let player = Player {
                x: 0.0,
                y: 200.0,
                vy,
                airborne,
            };
            observe(&player, &Level::empty(100.0)).jump_phase
        };
        assert_eq!(phase(false, -10.0), 0);
        assert_eq!(phase(true, -10.0), 1);
        assert_eq!(phase(true, -5.0), 2);
        assert_eq!(phase(true, 5.0), 2);
        assert_eq!(phase(true, 5.5), 3);
    }

    #[test]
    fn over_pit_ignores_height() {
        let level = Level {
            obstacles: vec![Obstacle::Pit { x: 100.0, width: 60.0 }],
            ..Level::empty(5000.0)
        };
        let mut player = grounded(90.0);
        player.y = 100.0;
        player.airborne = true;
        assert_eq!(observe(&player, &level).over_pit, 1);

        // Centre at exactly the pit edge is outside
        let edge = grounded(85.0);
        assert_eq!(observe(&edge, &level).over_pit, 0);
    }

    #[test]
    fn first_listed_coin_is_used() {
        let mut level = Level::empty(5000.0);
        level.coins = vec![
            Coin::new(270.0, 250.0),
            Coin::new(120.0, 360.0),
            Coin::new(105.0, 330.0),
        ];
        let obs = observe(&grounded(100.0), &level);
        assert_eq!(
            (obs.coin_distance, obs.coin_height),
            (NO_COIN, 2),
            "First coin in the window sits past the last bucket but still reports height"
        );

        level.coins[0].collected = true;
        let obs = observe(&grounded(100.0), &level);
        assert_eq!((obs.coin_distance, obs.coin_height), (0, 0));

        level.coins[1].collected = true;
        let obs = observe(&grounded(100.0), &level);
        assert_eq!((obs.coin_distance, obs.coin_height), (0, 1));
    }

    #[test]
    fn windows_come_from_margins() {
        let mut level = Level::empty(5000.0);
        level.coins = vec![Coin::new(130.0, 385.0)];
        level.obstacles = vec![Obstacle::Pit { x: 85.0, width: 60.0 }];

        let obs = observe(&grounded(100.0), &level);
        assert_eq!((obs.obstacle_type, obs.coin_distance), (1, 0));

        let margins = Margins {
            obstacle_look_behind: 10.0,
            coin_window: (-10.0, 20.0),
            ..Margins::default()
        };
        let obs = Observation::project(&grounded(100.0), &level, &physics(), &margins);
        assert_eq!((obs.obstacle_type, obs.distance_bucket), (0, NO_OBSTACLE));
        assert_eq!(obs.coin_distance, NO_COIN);
    }

    #[test]
    fn key_codec() {
        let obs = Observation {
            obstacle_type: 1,
            distance_bucket: 8,
            jump_phase: 3,
            over_pit: 1,
            coin_distance: 2,
            coin_height: 0,
        };
        assert_eq!(obs.to_string(), "(1, 8, 3, 1, 2, 0)");
        assert_eq!("(1, 8, 3, 1, 2, 0)".parse::<Observation>(), Ok(obs));
        assert_eq!(" (1,8,3,1,2,0) ".parse::<Observation>(), Ok(obs));
    }

    #[test]
    fn key_codec_rejects_garbage() {
        for key in [
            "1, 2, 0, 0, 8, 0",
            "(1, 2, 0, 0, 8)",
            "(1, 2, 0, 0, 8, 0, 0)",
            "(1, 2, 0, 0, 8, x)",
            "(1, 6, 0, 0, 8, 0)",
            "(9, 2, 0, 0, 8, 0)",
            "(1, 2, 0, 0, 8, -1)",
            "__import__('os')",
        ] {
            assert!(key.parse::<Observation>().is_err(), "{key} should be rejected");
        }
    }

    #[test]
    fn describe_is_readable() {
        let obs: Observation = "(2, 1, 0, 0, 0, 2)".parse().unwrap();
        let text = obs.describe();
        assert!(text.contains("Block"));
        assert!(text.contains("Close"));
        assert!(text.contains("Nearby@High"));
    }
}
