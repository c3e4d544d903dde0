use std::{
    io::{self, stdout, Stdout},
    panic,
    sync::Once,
};

use crossterm as ct;
use ct::{
    cursor::{Hide, Show},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

/// The terminal type every screen draws to
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

static PANIC_HOOK: Once = Once::new();

/// Enter the alternate screen in raw mode
pub fn init() -> io::Result<Tui> {
    PANIC_HOOK.call_once(init_panic_hook);
    ct::execute!(stdout(), EnterAlternateScreen, Hide)?;
    enable_raw_mode()?;
    Terminal::new(CrosstermBackend::new(stdout()))
}

/// Restore the terminal to its original state
pub fn restore() -> io::Result<()> {
    disable_raw_mode()?;
    ct::execute!(stdout(), LeaveAlternateScreen, Show)?;
    Ok(())
}

/// Leave the terminal usable when a panic unwinds through a screen
fn init_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}
