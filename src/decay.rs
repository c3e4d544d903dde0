use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A schedule for a value that decays once per episode
pub trait Decay {
    /// Value after one more decay step from `current`
    fn next(&self, current: f32) -> f32;

    /// Lowest value the schedule will ever produce
    fn floor(&self) -> f32;
}

fn validate(rate: f32, floor: f32) -> Result<(), Error> {
    if !(rate > 0.0 && rate <= 1.0) {
        return Err(Error::InvalidConfig(format!(
            "decay rate must be in (0, 1], got {rate}"
        )));
    }
    if !(0.0..=1.0).contains(&floor) {
        return Err(Error::InvalidConfig(format!(
            "decay floor must be in [0, 1], got {floor}"
        )));
    }
    Ok(())
}

/// A value that never decays
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Constant;

impl Decay for Constant {
    fn next(&self, current: f32) -> f32 {
        current
    }

    fn floor(&self) -> f32 {
        0.0
    }
}

/// v<sub>n+1</sub> = max(v<sub>n</sub> * r, v<sub>f</sub>)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometric {
    rate: f32,
    floor: f32,
}

impl Geometric {
    pub fn new(rate: f32, floor: f32) -> Result<Self, Error> {
        validate(rate, floor)?;
        Ok(Self { rate, floor })
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }
}

impl Default for Geometric {
    fn default() -> Self {
        Self {
            rate: 0.997,
            floor: 0.05,
        }
    }
}

impl Decay for Geometric {
    fn next(&self, current: f32) -> f32 {
        (current * self.rate).max(self.floor)
    }

    fn floor(&self) -> f32 {
        self.floor
    }
}
