use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use platformer_rl::{
    algo::tabular::QTableAgent,
    gym::platformer::{Difficulty, PatternGenerator, Platformer},
    train::{log_policy_sample, Settings, Trainer},
    viz,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "platformer")]
#[command(about = "Side-scrolling coin collection game with a tabular Q-learning agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the game yourself in the terminal
    Play {
        #[command(flatten)]
        level: LevelArgs,
    },
    /// Train an agent and save its table and statistics
    Train {
        #[arg(long, default_value_t = 3000)]
        episodes: u32,
        #[arg(long, default_value = "q_table.json")]
        table: PathBuf,
        #[arg(long, default_value = "training_stats.json")]
        stats: PathBuf,
        #[command(flatten)]
        level: LevelArgs,
        /// Show the training dashboard instead of plain log output
        #[arg(long)]
        tui: bool,
    },
    /// Replay a trained agent greedily without writing anything
    Test {
        #[arg(long, default_value = "q_table.json")]
        table: PathBuf,
        #[arg(long, default_value_t = 5)]
        episodes: u32,
        #[command(flatten)]
        level: LevelArgs,
        /// Watch the agent play instead of printing results only
        #[arg(long)]
        tui: bool,
    },
}

#[derive(clap::Args, Debug)]
struct LevelArgs {
    /// Level difficulty, 1 (easy) to 3 (hard)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    difficulty: u8,
    /// Seed for level generation; a fresh seed is drawn when absent
    #[arg(long)]
    seed: Option<u64>,
    /// JSON file overriding game and agent settings
    #[arg(long)]
    config: Option<PathBuf>,
}

impl LevelArgs {
    fn settings(&self) -> Result<Settings> {
        match &self.config {
            Some(path) => Settings::from_json(path)
                .with_context(|| format!("failed to load settings from {}", path.display())),
            None => Ok(Settings::default()),
        }
    }

    fn environment(&self, settings: &Settings) -> Result<Platformer> {
        let difficulty = Difficulty::from_level(self.difficulty)
            .ok_or_else(|| anyhow!("unknown difficulty {}", self.difficulty))?;
        let generator = match self.seed {
            Some(seed) => PatternGenerator::seeded(difficulty, seed),
            None => PatternGenerator::new(difficulty),
        };
        Ok(Platformer::new(settings.game.clone(), generator))
    }
}

fn init_headless_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play { level } => {
            viz::init_logging()?;
            let settings = level.settings()?;
            let mut env = level.environment(&settings)?;
            viz::play_human(&mut env)?;
        }
        Commands::Train {
            episodes,
            table,
            stats,
            level,
            tui,
        } => {
            if tui {
                viz::init_logging()?;
            } else {
                init_headless_logging();
            }
            train(episodes, &table, &stats, &level, tui)?;
        }
        Commands::Test {
            table,
            episodes,
            level,
            tui,
        } => {
            if tui {
                viz::init_logging()?;
            } else {
                init_headless_logging();
            }
            test(&table, episodes, &level, tui)?;
        }
    }

    Ok(())
}

fn train(
    episodes: u32,
    table: &Path,
    stats_path: &Path,
    level: &LevelArgs,
    tui: bool,
) -> Result<()> {
    let settings = level.settings()?;
    let mut env = level.environment(&settings)?;
    let mut agent: QTableAgent<Platformer> = QTableAgent::new(settings.agent.agent_config()?);
    let trainer = Trainer::default();

    let stats = if tui {
        let (handle, tx) = viz::init(env.report.keys(), episodes, trainer.interrupt.clone());
        let stats = trainer.train(&mut agent, &mut env, episodes, |episode, data| {
            // The dashboard may already be closed
            let _ = tx.send(viz::Update {
                episode: episode + 1,
                data,
            });
        });
        drop(tx);
        handle
            .join()
            .map_err(|_| anyhow!("dashboard thread panicked"))?
            .context("dashboard failed")?;
        stats
    } else {
        trainer.train(&mut agent, &mut env, episodes, |_, _| {})
    };

    agent
        .save(table)
        .with_context(|| format!("failed to save table to {}", table.display()))?;
    fs::write(stats_path, serde_json::to_string_pretty(&stats)?)
        .with_context(|| format!("failed to write stats to {}", stats_path.display()))?;
    log::info!("Training statistics saved: {}", stats_path.display());

    log_policy_sample(&agent, 15);
    Ok(())
}

fn test(table: &Path, episodes: u32, level: &LevelArgs, tui: bool) -> Result<()> {
    let settings = level.settings()?;
    let mut env = level.environment(&settings)?;
    let mut agent: QTableAgent<Platformer> = QTableAgent::new(settings.agent.agent_config()?);

    if let Err(e) = agent.load(table) {
        if e.is_missing_table() {
            // Printed directly so the message survives a terminal front-end
            eprintln!("No usable trained table: {e}");
            eprintln!("Train an agent first: platformer train --episodes 3000");
            return Ok(());
        }
        return Err(e).context("failed to load table");
    }
    log_policy_sample(&agent, 5);

    if tui {
        viz::watch_agent(&mut agent, &mut env, episodes)?;
        return Ok(());
    }

    let records = Trainer::default().evaluate(&mut agent, &mut env, episodes);
    let wins = records.iter().filter(|r| r.win).count();
    let avg_score = records.iter().map(|r| r.score as f32).sum::<f32>() / records.len().max(1) as f32;
    log::info!(
        "Won {wins}/{} episodes, average score {avg_score:.0}",
        records.len()
    );
    Ok(())
}
