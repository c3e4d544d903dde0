use std::{
    io,
    time::{Duration, Instant},
};

use crossterm::event::{self, KeyCode};

use super::{
    game::GameView,
    tui::{self, Tui},
    util::{event_keycode, tick_duration},
};
use crate::{
    algo::tabular::QTableAgent,
    decay::Decay,
    env::Environment,
    gym::platformer::{Action, LevelGenerator, Platformer},
};

/// Ticks a direction key stays held after its last press or repeat
const HOLD_TICKS: u32 = 8;

/// Pause between watched episodes
const EPISODE_PAUSE: Duration = Duration::from_millis(1200);

/// Combine a horizontal direction and a jump into one action
fn compose(direction: i8, jump: bool) -> Action {
    match (direction.signum(), jump) {
        (0, false) => Action::None,
        (-1, false) => Action::Left,
        (1, false) => Action::Right,
        (0, true) => Action::Jump,
        (1, true) => Action::RightJump,
        (_, _) => Action::LeftJump,
    }
}

/// Keyboard state turned into one action per tick
///
/// Terminals report presses and repeats but rarely releases, so a direction
/// counts as held for a few ticks after its last event.
#[derive(Debug, Default)]
struct Controls {
    tick: u32,
    left_until: u32,
    right_until: u32,
    jump: bool,
}

impl Controls {
    fn press(&mut self, key: KeyCode) {
        match key {
            KeyCode::Left | KeyCode::Char('a') => {
                self.left_until = self.tick + HOLD_TICKS;
                self.right_until = 0;
            }
            KeyCode::Right | KeyCode::Char('d') => {
                self.right_until = self.tick + HOLD_TICKS;
                self.left_until = 0;
            }
            KeyCode::Up | KeyCode::Char(' ') | KeyCode::Char('w') => self.jump = true,
            KeyCode::Down => {
                self.left_until = 0;
                self.right_until = 0;
            }
            _ => {}
        }
    }

    /// Action for the current tick; advances the clock and consumes a pending jump
    fn next_action(&mut self) -> Action {
        let held = |until: u32| (self.tick < until) as i8;
        let direction = held(self.right_until) - held(self.left_until);
        let action = compose(direction, self.jump);
        self.jump = false;
        self.tick += 1;
        action
    }
}

fn outcome<G: LevelGenerator>(env: &Platformer<G>) -> &'static str {
    if env.win() {
        "level complete"
    } else if env.timed_out() {
        "out of time"
    } else {
        "game over"
    }
}

fn log_episode<G: LevelGenerator>(env: &Platformer<G>, label: &str) {
    log::info!(
        "{label}: {} after {:.1}s | score {} | coins {}/{} ({:.0}%)",
        outcome(env),
        env.time_taken(),
        env.score(),
        env.coins_collected(),
        env.total_coins(),
        env.coin_percentage()
    );
}

/// Let a person play in the terminal at the configured frame rate
///
/// Arrows or `a`/`d` move, space or up jumps, `r` restarts, `Esc` or `q` quits.
pub fn play_human<G: LevelGenerator>(env: &mut Platformer<G>) -> io::Result<()> {
    let mut terminal = tui::init()?;
    let result = run_human(&mut terminal, env);
    tui::restore()?;
    result
}

fn run_human<G: LevelGenerator>(terminal: &mut Tui, env: &mut Platformer<G>) -> io::Result<()> {
    let tick = tick_duration(env.config().screen.fps);
    let mut controls = Controls::default();
    let mut attempt = 1;
    env.reset();
    log::info!("Reach the flag, collect coins, avoid pits, blocks, spikes and enemies");

    loop {
        let deadline = Instant::now() + tick;
        tui_logger::move_events();
        terminal.draw(|frame| {
            frame.render_widget(
                GameView::new(env.frame(), "Platformer (arrows move, space jumps, r restarts, Esc quits)")
                    .with_logs(),
                frame.size(),
            )
        })?;

        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            if !event::poll(remaining)? {
                break;
            }
            match event_keycode(&event::read()?) {
                Some(KeyCode::Esc | KeyCode::Char('q')) => return Ok(()),
                Some(KeyCode::Char('r')) => {
                    env.reset();
                    controls = Controls::default();
                    attempt += 1;
                }
                Some(key) => controls.press(key),
                None => {}
            }
        }

        if env.is_active() {
            env.step(controls.next_action());
            if !env.is_active() {
                env.report.take();
                log_episode(env, &format!("Attempt {attempt}"));
                log::info!("Press r to play again");
            }
        }
    }
}

/// Replay `episodes` greedy episodes in the terminal at the configured frame rate
///
/// `Esc` or `q` stops early.
pub fn watch_agent<G, D>(
    agent: &mut QTableAgent<Platformer<G>, D>,
    env: &mut Platformer<G>,
    episodes: u32,
) -> io::Result<()>
where
    G: LevelGenerator,
    D: Decay,
{
    let mut terminal = tui::init()?;
    let result = run_agent(&mut terminal, agent, env, episodes);
    tui::restore()?;
    result
}

fn run_agent<G, D>(
    terminal: &mut Tui,
    agent: &mut QTableAgent<Platformer<G>, D>,
    env: &mut Platformer<G>,
    episodes: u32,
) -> io::Result<()>
where
    G: LevelGenerator,
    D: Decay,
{
    let tick = tick_duration(env.config().screen.fps);

    for episode in 1..=episodes {
        let title = format!("Agent playback {episode}/{episodes} (Esc quits)");
        let mut state = env.reset();

        loop {
            let active = env.is_active();
            let deadline = Instant::now() + if active { tick } else { EPISODE_PAUSE };
            tui_logger::move_events();
            terminal.draw(|frame| {
                frame.render_widget(GameView::new(env.frame(), &title).with_logs(), frame.size())
            })?;

            while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
                if !event::poll(remaining)? {
                    break;
                }
                if let Some(KeyCode::Esc | KeyCode::Char('q')) = event_keycode(&event::read()?) {
                    return Ok(());
                }
            }

            if !active {
                break;
            }
            let (next, _, done) = env.step(agent.act(state, false));
            state = next;
            if done {
                env.report.take();
                log_episode(env, &format!("Episode {episode}"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_covers_every_action() {
        assert_eq!(compose(0, false), Action::None);
        assert_eq!(compose(-1, false), Action::Left);
        assert_eq!(compose(1, false), Action::Right);
        assert_eq!(compose(0, true), Action::Jump);
        assert_eq!(compose(1, true), Action::RightJump);
        assert_eq!(compose(-1, true), Action::LeftJump);
    }

    #[test]
    fn direction_is_held_briefly() {
        let mut controls = Controls::default();
        controls.press(KeyCode::Right);
        controls.press(KeyCode::Char(' '));

        assert_eq!(controls.next_action(), Action::RightJump);
        for _ in 1..HOLD_TICKS {
            assert_eq!(controls.next_action(), Action::Right, "Jump is consumed once");
        }
        assert_eq!(controls.next_action(), Action::None);
    }

    #[test]
    fn opposite_direction_replaces_the_held_one() {
        let mut controls = Controls::default();
        controls.press(KeyCode::Right);
        controls.next_action();
        controls.press(KeyCode::Left);
        assert_eq!(controls.next_action(), Action::Left);

        controls.press(KeyCode::Down);
        assert_eq!(controls.next_action(), Action::None);
    }
}
