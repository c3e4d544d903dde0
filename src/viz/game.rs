use ratatui::{
    prelude::*,
    widgets::{
        canvas::{Canvas, Circle, Line as Segment, Rectangle},
        *,
    },
};
use tui_logger::TuiLoggerWidget;

use crate::gym::platformer::{Frame, Level, Obstacle};

/// Renders one [`Frame`] of the platformer: a heads-up line, the world, and
/// optionally the most recent log lines
pub struct GameView<'a> {
    frame: Frame<'a>,
    title: &'a str,
    logs: bool,
}

impl<'a> GameView<'a> {
    pub fn new(frame: Frame<'a>, title: &'a str) -> Self {
        Self {
            frame,
            title,
            logs: false,
        }
    }

    pub fn with_logs(mut self) -> Self {
        self.logs = true;
        self
    }

    fn hud(&self) -> Line<'static> {
        let f = &self.frame;
        let best = f
            .records
            .best_time
            .map_or_else(|| String::from("-"), |t| format!("{t:.2}s"));
        Line::from(vec![
            Span::from(format!(" Score {} ", f.score)).bold(),
            Span::raw(format!(
                "| Coins {}/{} ",
                f.coins_collected,
                f.level.total_coins()
            ))
            .yellow(),
            Span::raw(format!("| Time {:.1}s | Step {} ", f.time, f.steps)),
            Span::raw(format!("| Best {best} / {}", f.records.best_score)).dark_gray(),
        ])
    }

    fn banner(&self) -> Option<(&'static str, Color)> {
        let f = &self.frame;
        if f.win {
            Some(("LEVEL COMPLETE", Color::LightGreen))
        } else if f.game_over {
            Some(("GAME OVER", Color::LightRed))
        } else if f.timed_out {
            Some(("TIME UP", Color::LightYellow))
        } else {
            None
        }
    }

    fn render_world(&self, area: Rect, buf: &mut Buffer) {
        let f = &self.frame;
        let screen = f.config.screen;
        let ground = f.config.physics.ground_y;
        let size = f.config.physics.player_size as f64;
        let (left, right) = (f.camera_x as f64, (f.camera_x + screen.width) as f64);
        let height = screen.height as f64;
        let flip = |y: f32| height - y as f64;

        Canvas::default()
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .title(self.title),
            )
            .marker(Marker::Braille)
            .x_bounds([left, right])
            .y_bounds([0.0, height])
            .paint(|ctx| {
                for (x1, x2) in ground_segments(f.level, left, right) {
                    ctx.draw(&Segment {
                        x1,
                        y1: flip(ground),
                        x2,
                        y2: flip(ground),
                        color: Color::Green,
                    });
                }

                for obstacle in &f.level.obstacles {
                    match *obstacle {
                        Obstacle::Pit { .. } => {}
                        Obstacle::Block {
                            x,
                            y,
                            width,
                            height,
                        } => ctx.draw(&Rectangle {
                            x: x as f64,
                            y: flip(y + height),
                            width: width as f64,
                            height: height as f64,
                            color: Color::Gray,
                        }),
                        Obstacle::Spike {
                            x,
                            y,
                            width,
                            height,
                        } => {
                            let base = flip(y + height);
                            let (tip_x, tip_y) = ((x + width / 2.0) as f64, flip(y));
                            for base_x in [x as f64, (x + width) as f64] {
                                ctx.draw(&Segment {
                                    x1: base_x,
                                    y1: base,
                                    x2: tip_x,
                                    y2: tip_y,
                                    color: Color::Red,
                                });
                            }
                        }
                        Obstacle::Enemy { x, y, radius, .. } => ctx.draw(&Circle {
                            x: x as f64,
                            y: flip(y),
                            radius: radius as f64,
                            color: Color::Magenta,
                        }),
                    }
                }

                for coin in f.level.coins.iter().filter(|c| !c.collected) {
                    ctx.draw(&Circle {
                        x: coin.x as f64,
                        y: flip(coin.y),
                        radius: f.config.coins.radius as f64,
                        color: Color::Yellow,
                    });
                }

                let goal = f.level.goal_x as f64;
                ctx.draw(&Segment {
                    x1: goal,
                    y1: flip(ground),
                    x2: goal,
                    y2: flip(ground - 150.0),
                    color: Color::White,
                });
                ctx.draw(&Rectangle {
                    x: goal,
                    y: flip(ground - 120.0),
                    width: 40.0,
                    height: 30.0,
                    color: Color::LightGreen,
                });

                ctx.layer();
                ctx.draw(&Rectangle {
                    x: f.player.x as f64,
                    y: flip(f.player.y) - size,
                    width: size,
                    height: size,
                    color: Color::Cyan,
                });

                if let Some((text, color)) = self.banner() {
                    ctx.print(
                        left + screen.width as f64 / 2.0 - 60.0,
                        height * 0.75,
                        Span::from(text).fg(color).bold(),
                    );
                }
            })
            .render(area, buf);
    }
}

/// Visible stretches of ground between `from` and `to`, with pits cut out
fn ground_segments(level: &Level, from: f64, to: f64) -> Vec<(f64, f64)> {
    let mut pits = level
        .obstacles
        .iter()
        .filter_map(|o| match *o {
            Obstacle::Pit { x, width } => Some((x as f64, (x + width) as f64)),
            _ => None,
        })
        .collect::<Vec<_>>();
    pits.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut segments = Vec::new();
    let mut start = from;
    for (pit_start, pit_end) in pits {
        if pit_end <= start {
            continue;
        }
        if pit_start >= to {
            break;
        }
        if pit_start > start {
            segments.push((start, pit_start));
        }
        start = pit_end;
    }
    if start < to {
        segments.push((start, to));
    }
    segments
}

impl Widget for GameView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let log_height = if self.logs { 8 } else { 0 };
        let [hud_area, world_area, log_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(log_height),
        ])
        .areas(area);

        Paragraph::new(self.hud()).render(hud_area, buf);
        self.render_world(world_area, buf);

        if self.logs {
            TuiLoggerWidget::default()
                .block(Block::bordered().border_type(BorderType::Rounded).title("Log"))
                .style_error(Style::default().light_red())
                .style_warn(Style::default().light_yellow())
                .style_info(Style::default().cyan())
                .output_separator(' ')
                .output_target(false)
                .output_file(false)
                .output_line(false)
                .render(log_area, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_pits(pits: &[(f32, f32)]) -> Level {
        Level {
            obstacles: pits
                .iter()
                .map(|&(x, width)| Obstacle::Pit { x, width })
                .collect(),
            ..Level::empty(2000.0)
        }
    }

    #[test]
    fn ground_has_gaps_over_pits() {
        let level = with_pits(&[(500.0, 80.0), (200.0, 60.0)]);
        assert_eq!(
            ground_segments(&level, 0.0, 1000.0),
            vec![(0.0, 200.0), (260.0, 500.0), (580.0, 1000.0)]
        );
    }

    #[test]
    fn ground_is_clipped_to_the_view() {
        let level = with_pits(&[(100.0, 50.0), (900.0, 50.0)]);
        assert_eq!(ground_segments(&level, 120.0, 400.0), vec![(150.0, 400.0)]);
        assert!(ground_segments(&with_pits(&[(0.0, 500.0)]), 0.0, 400.0).is_empty());
    }

    #[test]
    fn renders_without_panicking() {
        use crate::gym::platformer::{FixedLevel, Platformer, PlatformerConfig};

        let env = Platformer::new(
            PlatformerConfig::default(),
            FixedLevel(with_pits(&[(300.0, 70.0)])),
        );
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        GameView::new(env.frame(), "Platformer").render(area, &mut buf);

        let text = buf
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(text.contains("Score 0"));
        assert!(text.contains("Platformer"));
    }
}
