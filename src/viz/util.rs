use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEventKind};

/// Takes an event, checks if it is a key press event, and returns the [`KeyCode`]
pub(super) fn event_keycode(event: &Event) -> Option<KeyCode> {
    let Event::Key(key) = event else {
        return None;
    };

    if key.kind == KeyEventKind::Release {
        return None;
    }

    Some(key.code)
}

/// Time budget of one tick at `fps`
pub(super) fn tick_duration(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyEventState, KeyModifiers};

    fn key(code: KeyCode, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn only_presses_and_repeats_count() {
        assert_eq!(
            event_keycode(&key(KeyCode::Left, KeyEventKind::Press)),
            Some(KeyCode::Left)
        );
        assert_eq!(
            event_keycode(&key(KeyCode::Left, KeyEventKind::Repeat)),
            Some(KeyCode::Left)
        );
        assert_eq!(event_keycode(&key(KeyCode::Left, KeyEventKind::Release)), None);
        assert_eq!(event_keycode(&Event::FocusLost), None);
    }

    #[test]
    fn tick_duration_functional() {
        assert_eq!(tick_duration(50), Duration::from_millis(20));
        assert_eq!(tick_duration(0), Duration::from_secs(1));
    }
}
