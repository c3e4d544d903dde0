use strum::{Display, EnumCount, FromRepr, VariantArray};

use crate::{env::DiscreteAction, error::Error};

/// Controller input for one tick
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, VariantArray, FromRepr, Display,
)]
#[repr(u8)]
pub enum Action {
    #[strum(to_string = "NONE")]
    None = 0,
    #[strum(to_string = "LEFT")]
    Left = 1,
    #[strum(to_string = "RIGHT")]
    Right = 2,
    #[strum(to_string = "JUMP")]
    Jump = 3,
    #[strum(to_string = "RIGHT+JUMP")]
    RightJump = 4,
    #[strum(to_string = "LEFT+JUMP")]
    LeftJump = 5,
}

impl Action {
    /// Horizontal direction of travel: -1, 0 or 1
    pub fn direction(self) -> f32 {
        match self {
            Self::Left | Self::LeftJump => -1.0,
            Self::Right | Self::RightJump => 1.0,
            Self::None | Self::Jump => 0.0,
        }
    }

    pub fn jumps(self) -> bool {
        matches!(self, Self::Jump | Self::RightJump | Self::LeftJump)
    }
}

impl TryFrom<u8> for Action {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_repr(id).ok_or(Error::InvalidAction(id))
    }
}

impl DiscreteAction for Action {
    const COUNT: usize = <Self as EnumCount>::COUNT;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().and_then(Self::from_repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for action in Action::VARIANTS {
            assert_eq!(Action::from_index(action.index()), Some(*action));
        }
        assert_eq!(<Action as DiscreteAction>::COUNT, 6);
    }

    #[test]
    fn rejects_unknown_ids() {
        assert!(matches!(Action::try_from(6), Err(Error::InvalidAction(6))));
        assert_eq!(Action::from_index(99), None);
        assert_eq!(Action::try_from(4).unwrap(), Action::RightJump);
    }

    #[test]
    fn movement_flags() {
        assert_eq!(Action::LeftJump.direction(), -1.0);
        assert_eq!(Action::Jump.direction(), 0.0);
        assert!(Action::RightJump.jumps());
        assert!(!Action::Right.jumps());
        assert_eq!(Action::RightJump.to_string(), "RIGHT+JUMP");
    }
}
