use crate::env::Environment;

/// Represents a single experience or transition in the environment
pub struct Exp<E: Environment> {
    /// The state of the environment before taking the action
    pub state: E::State,
    /// The action taken in the given state
    pub action: E::Action,
    /// The state of the environment after the action is taken, or if terminal, `None`
    pub next_state: Option<E::State>,
    /// The reward received after taking the action
    pub reward: f32,
}

impl<E: Environment> Exp<E> {
    /// Build an experience from one environment step, dropping the next state if `done`
    pub fn from_step(
        state: E::State,
        action: E::Action,
        (next_state, reward, done): (E::State, f32, bool),
    ) -> Self {
        Self {
            state,
            action,
            next_state: (!done).then_some(next_state),
            reward,
        }
    }
}

impl<E: Environment> Clone for Exp<E>
where
    E::State: Clone,
    E::Action: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            action: self.action.clone(),
            next_state: self.next_state.clone(),
            reward: self.reward,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::env::tests::{MockAction, MockEnv};

    use super::*;

    #[test]
    fn terminal_steps_drop_next_state() {
        let exp = Exp::<MockEnv>::from_step(3, MockAction::Advance, (4, 1.0, true));
        assert_eq!(exp.next_state, None);
        assert_eq!(exp.reward, 1.0);

        let exp = Exp::<MockEnv>::from_step(1, MockAction::Stay, (1, -0.1, false));
        assert_eq!(exp.clone().next_state, Some(1));
    }
}
