//! `marvin` binary: wires config, logging, the Slack adapter, and the
//! built-in plugins together.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use marvin::adapters::slack::SlackAdapter;
use marvin::config::{self, Config};
use marvin::robot::{self, Robot};
use marvin::{logging, plugins};

#[derive(Debug, Parser)]
#[command(name = "marvin", version, about = "Chat robot for Slack")]
struct Cli {
    /// Path to config.toml. Defaults to ~/.marvin/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to Slack and dispatch messages until Ctrl+C.
    Start,
    /// Validate the config and check the token is available.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_dir()?.join("config.toml"),
    };

    match cli.command {
        Command::Start => start(&config_path).await,
        Command::Check => check(&config_path),
    }
}

async fn start(config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = config::load_config(config_path)?;
    let _logging = logging::init_production(&config.logs_dir()?)?;

    let adapter = Arc::new(SlackAdapter::new(config.adapter_config()?));
    let mut robot = build_robot(&config, adapter)?;

    robot.open().await.context("failed to connect")?;

    tokio::select! {
        () = robot.run() => warn!("adapter stopped producing messages"),
        _ = tokio::signal::ctrl_c() => info!("received shutdown signal"),
    }

    robot.close().await.context("failed to close")?;
    info!("marvin shut down");
    Ok(())
}

fn build_robot(config: &Config, adapter: Arc<SlackAdapter>) -> anyhow::Result<Robot> {
    let mut robot = Robot::new(&config.robot.name, adapter)?;
    robot.register_plugin(plugins::ping)?;
    robot.register_plugin(plugins::echo)?;

    if let Some(bind) = config.http.bind {
        robot.register_plugin(plugins::health)?;
        robot.serve_http(bind);
    }

    if let Some(channel) = config.robot.announce_channel.clone() {
        robot.register_deferred_plugin(plugins::announce(channel));
    }

    Ok(robot)
}

fn check(config_path: &std::path::Path) -> anyhow::Result<()> {
    logging::init_cli();

    let config = config::load_config(config_path)?;
    robot::address_pattern(&config.robot.name).context("robot name is not usable")?;
    config.slack_token()?;

    println!("config ok: robot {} via {}", config.robot.name, config.slack.rtm_start_endpoint);
    Ok(())
}
