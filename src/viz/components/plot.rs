use crossterm::event::{Event, KeyCode};
use ratatui::{prelude::*, style::Stylize, widgets::*};

use super::Component;
use crate::viz::{util::event_keycode, Update};

/// Episodes averaged into each point of the smoothed line
const SMOOTHING: usize = 50;

/// One metric over episodes, with its moving average
pub struct Plot {
    title: &'static str,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    data: Vec<(f64, f64)>,
    smoothed: Vec<(f64, f64)>,
}

impl Plot {
    pub fn new(title: &'static str, episodes: u32) -> Self {
        Self {
            title,
            x_bounds: [0.0, episodes.max(1) as f64],
            y_bounds: [f64::MAX, f64::MIN],
            data: Vec::new(),
            smoothed: Vec::new(),
        }
    }

    pub fn update(&mut self, point: (f64, f64)) {
        self.x_bounds[1] = self.x_bounds[1].max(point.0);
        self.y_bounds[0] = self.y_bounds[0].min(point.1);
        self.y_bounds[1] = self.y_bounds[1].max(point.1);
        self.data.push(point);

        let tail = &self.data[self.data.len().saturating_sub(SMOOTHING)..];
        let mean = tail.iter().map(|p| p.1).sum::<f64>() / tail.len() as f64;
        self.smoothed.push((point.0, mean));
    }

    fn y_bounds(&self) -> [f64; 2] {
        match self.y_bounds {
            [lo, hi] if lo > hi => [0.0, 1.0],
            [lo, hi] if lo == hi => [lo - 1.0, hi + 1.0],
            bounds => bounds,
        }
    }
}

fn labels(bounds: [f64; 2]) -> Vec<Span<'static>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|v| Span::from(format!("{v:.1}")).bold())
        .collect()
}

impl Widget for &Plot {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let y_bounds = self.y_bounds();
        let datasets = vec![
            Dataset::default()
                .name(self.title)
                .marker(Marker::Braille)
                .graph_type(GraphType::Scatter)
                .dark_gray()
                .data(&self.data),
            Dataset::default()
                .name(format!("mean of last {SMOOTHING}"))
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .cyan()
                .data(&self.smoothed),
        ];

        let x_axis = Axis::default()
            .title("Episode")
            .dark_gray()
            .labels(labels(self.x_bounds))
            .bounds(self.x_bounds);

        let y_axis = Axis::default()
            .title(self.title)
            .dark_gray()
            .labels(labels(y_bounds))
            .bounds(y_bounds);

        Chart::new(datasets)
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .padding(Padding::horizontal(1)),
            )
            .x_axis(x_axis)
            .y_axis(y_axis)
            .render(area, buf);
    }
}

/// Tabbed set of plots, one per report key
pub struct Plots {
    names: Vec<&'static str>,
    plots: Vec<Plot>,
    selected: usize,
}

impl Plots {
    pub fn new(names: Vec<&'static str>, episodes: u32) -> Self {
        let plots = names.iter().map(|&k| Plot::new(k, episodes)).collect();
        Self {
            names,
            plots,
            selected: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn next_plot(&mut self) {
        if !self.is_empty() {
            self.selected = (self.selected + 1) % self.len();
        }
    }

    pub fn prev_plot(&mut self) {
        if !self.is_empty() {
            let len = self.len();
            self.selected = (self.selected + len - 1) % len;
        }
    }

    pub fn update(&mut self, update: Update) {
        let Update { episode, data } = update;
        for (plot, metric) in self.plots.iter_mut().zip(data) {
            plot.update((episode as f64, metric));
        }
    }
}

impl WidgetRef for Plots {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        let [tabs_area, plot_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(area);

        Tabs::new(self.names.iter().copied())
            .white()
            .highlight_style(Style::default().light_green())
            .select(self.selected)
            .render(tabs_area, buf);

        if let Some(plot) = self.plots.get(self.selected) {
            plot.render(plot_area, buf);
        }
    }
}

impl Component for Plots {
    fn handle_ui_event(&mut self, event: &Event) -> bool {
        match event_keycode(event) {
            Some(KeyCode::Left) => self.prev_plot(),
            Some(KeyCode::Right) => self.next_plot(),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_tracks_bounds_and_mean() {
        let mut plot = Plot::new("reward", 10);
        plot.update((0.0, -4.0));
        plot.update((1.0, 2.0));
        assert_eq!(plot.y_bounds(), [-4.0, 2.0]);
        assert_eq!(plot.smoothed.last(), Some(&(1.0, -1.0)));

        plot.update((12.0, 0.0));
        assert_eq!(plot.x_bounds, [0.0, 12.0], "X range grows past the planned episodes");
    }

    #[test]
    fn plots_cycle_selection() {
        let mut plots = Plots::new(vec!["reward", "steps", "win"], 5);
        plots.prev_plot();
        assert_eq!(plots.selected, 2);
        plots.next_plot();
        assert_eq!(plots.selected, 0);

        plots.update(Update {
            episode: 1,
            data: vec![1.0, 20.0, 0.0],
        });
        assert_eq!(plots.plots[1].data, vec![(1.0, 20.0)]);
    }
}
