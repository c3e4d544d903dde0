use std::{
    io,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use crossterm::event::{self, KeyCode};
use ratatui::{prelude::*, widgets::*};

use super::{
    components::{help::render_help, Component, Logs, Plots},
    tui,
    util::event_keycode,
};
use crate::train::Interrupt;

const TABS: [&str; 2] = ["Plots", "Logs"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum State {
    #[default]
    Train,
    /// The trainer hung up; the dashboard stays open for inspection
    Done,
    Quit,
}

/// Format for updating plot data
pub struct Update {
    pub episode: u32,
    pub data: Vec<f64>,
}

/// The root TUI component which holds the main app state and runs the render loop
pub struct App {
    state: State,
    episode: u32,
    total_episodes: u32,
    selected_tab: usize,
    show_help: bool,
    plots: Plots,
    logs: Logs,
    interrupt: Interrupt,
}

impl App {
    pub fn new(plots: &[&'static str], episodes: u32, interrupt: Interrupt) -> Self {
        Self {
            state: Default::default(),
            episode: 0,
            total_episodes: episodes,
            selected_tab: 0,
            show_help: false,
            plots: Plots::new(plots.to_vec(), episodes),
            logs: Logs::new(),
            interrupt,
        }
    }

    /// Initialize the terminal and run the main loop
    ///
    /// Restores the terminal on exit
    pub fn run(&mut self, plot_rx: Receiver<Update>) -> io::Result<()> {
        let mut terminal = tui::init()?;

        while self.state != State::Quit {
            if self.state == State::Train {
                loop {
                    match plot_rx.try_recv() {
                        Ok(update) => {
                            self.episode = update.episode;
                            self.plots.update(update);
                        }
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            self.state = State::Done;
                            log::info!("Training finished, press q to exit");
                            break;
                        }
                    }
                }
            }

            tui_logger::move_events();
            terminal.draw(|frame| frame.render_widget(&*self, frame.size()))?;

            if event::poll(Duration::from_millis(16))? {
                let event = event::read()?;
                let Some(key) = event_keycode(&event) else {
                    continue;
                };
                match key {
                    KeyCode::Char('q') => {
                        self.interrupt.trigger();
                        self.state = State::Quit;
                    }
                    KeyCode::Char('h') => self.show_help = !self.show_help,
                    KeyCode::Tab => self.selected_tab = (self.selected_tab + 1) % TABS.len(),
                    _ => match self.selected_tab {
                        0 => {
                            self.plots.handle_ui_event(&event);
                        }
                        _ => {
                            self.logs.handle_ui_event(&event);
                        }
                    },
                }
            }
        }

        tui::restore()
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [menu_area, main_area, progress_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(3),
        ])
        .areas(area);

        Tabs::new(TABS)
            .block(Block::default().padding(Padding::uniform(1)))
            .white()
            .bold()
            .highlight_style(Style::default().light_green())
            .select(self.selected_tab)
            .render(menu_area, buf);

        match self.selected_tab {
            0 => self.plots.render_ref(main_area, buf),
            _ => self.logs.render_ref(main_area, buf),
        }

        let title = match self.state {
            State::Done => "Progress (done, q to exit)",
            _ => "Progress (h for help)",
        };
        Gauge::default()
            .block(Block::bordered().border_type(BorderType::Rounded).title(title))
            .gauge_style(Color::Cyan)
            .ratio((self.episode as f64 / self.total_episodes.max(1) as f64).min(1.0))
            .label(format!("{}/{}", self.episode, self.total_episodes))
            .render(progress_area, buf);

        if self.show_help {
            render_help(area, buf, self.selected_tab);
        }
    }
}
