#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a headless RoboFlow session.

mod driver;
mod script;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use roboflow_core::{Command, LevelId};
use roboflow_system_hud::{Hud, HudSnapshot};
use roboflow_world::{Catalogs, Session, SessionConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{driver::Driver, script::Script};

#[derive(Debug, Parser)]
#[command(name = "roboflow")]
#[command(about = "Headless driver for the RoboFlow factory puzzle")]
struct Cli {
    /// TOML level and robot catalog replacing the built-in campaign.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Number of fixed ticks to simulate.
    #[arg(long, default_value_t = 6_000)]
    ticks: u32,
    /// Length of a single tick in milliseconds.
    #[arg(long, default_value_t = 100)]
    dt_ms: u64,
    /// TOML script of player actions to replay.
    #[arg(long, conflicts_with = "auto")]
    script: Option<PathBuf>,
    /// Route every product straight to the end cell and play through the campaign.
    #[arg(long, default_value_t = false)]
    auto: bool,
}

/// Entry point for the RoboFlow command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let catalogs = match &cli.catalog {
        Some(path) => load_catalogs(path)?,
        None => Catalogs::reference(),
    };
    let session = Session::new(catalogs, SessionConfig::default());
    let hud = Hud;
    println!("{}", hud.welcome_banner(&session));

    let mut driver = Driver::new(session, Duration::from_millis(cli.dt_ms));
    driver.submit(Command::ShowMenu);

    if let Some(path) = &cli.script {
        let script = Script::load(path)?;
        info!(steps = script.steps().len(), "replaying script");
        for step in script.steps() {
            driver.run_step(step);
        }
    } else if cli.auto {
        let consumed = driver.autoplay(cli.ticks);
        info!(ticks = consumed, "autoplay stopped");
    } else {
        driver.submit(Command::StartLevel {
            level: LevelId::FIRST,
        });
        driver.idle(cli.ticks);
    }

    print_summary(&hud.snapshot(driver.session()));
    driver.shutdown();
    Ok(())
}

fn load_catalogs(path: &Path) -> Result<Catalogs> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    Catalogs::from_toml_str(&contents)
        .with_context(|| format!("failed to load catalog {}", path.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_summary(snapshot: &HudSnapshot) {
    println!(
        "state:      {:?}{}",
        snapshot.state,
        if snapshot.run_over { " (run over)" } else { "" }
    );
    println!("level:      {} {}", snapshot.level, snapshot.level_name);
    println!("score:      {}", snapshot.score);
    println!(
        "time:       {}{}",
        snapshot.timer,
        if snapshot.low_time { " (low)" } else { "" }
    );
    println!(
        "delivered:  {}/{} ({}%)",
        snapshot.delivered, snapshot.products_target, snapshot.efficiency_percent
    );
    println!(
        "collisions: {} ({} remaining)",
        snapshot.collisions, snapshot.collisions_remaining
    );
}
