use std::{
    io,
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
};

use crate::train::Interrupt;

mod app;
mod components;
mod game;
mod play;
mod tui;
mod util;

pub use app::{App, Update};
pub use game::GameView;
pub use play::{play_human, watch_agent};

/// Route `log` records into the in-terminal log pane
pub fn init_logging() -> Result<(), log::SetLoggerError> {
    tui_logger::init_logger(log::LevelFilter::Trace)?;
    tui_logger::set_default_level(log::LevelFilter::Info);
    Ok(())
}

/// Spawn the training dashboard on its own thread
///
/// Pressing `q` triggers `interrupt`. The dashboard keeps running after the
/// sender is dropped until the user quits.
///
/// **Returns** the thread handle and the channel for per-episode updates
pub fn init(
    plots: &[&'static str],
    episodes: u32,
    interrupt: Interrupt,
) -> (JoinHandle<io::Result<()>>, Sender<Update>) {
    let (tx, rx) = mpsc::channel();
    let plots = plots.to_vec();
    let handle = thread::spawn(move || {
        let mut app = App::new(&plots, episodes, interrupt);
        app.run(rx)
    });

    (handle, tx)
}
