use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use apimon::aggregation::AggregationEngine;
use apimon::config::Config;
use apimon::database::models::{Headers, NewMonitor};
use apimon::database::{self, MonitorRegistry, MonitorSource};
use apimon::monitoring::validation::validate_monitor;
use apimon::monitoring::{HttpProber, MonitorScheduler, ProbeExecutor};
use apimon::shutdown;

#[derive(Debug, Parser)]
#[command(
    name = "apimon",
    version,
    about = "Probe HTTP endpoints and roll results into per-minute aggregates"
)]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/apimon/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe all monitors and aggregate every minute until interrupted
    Run,
    /// Probe all monitors without aggregating
    Collect,
    /// Aggregate stored measurements every minute without probing
    Aggregate,
    /// Create or migrate the database schema
    InitDb,
    /// Add a monitor definition
    AddMonitor(AddMonitorArgs),
    /// List configured monitors
    ListMonitors,
    /// Print the effective configuration
    ShowConfig,
}

#[derive(Debug, Args)]
struct AddMonitorArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    url: String,

    #[arg(long, default_value = "GET")]
    method: String,

    /// Request header as "Name: value", repeatable
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Request body sent with every probe
    #[arg(long)]
    body: Option<String>,

    /// Polling interval in seconds
    #[arg(long, default_value_t = 60)]
    interval: u64,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got \"{raw}\""))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name cannot be empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        Config::from_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = cli.database {
        config.database.path = path;
    }

    logger::init_with_level(&config.logging.level);

    match cli.command {
        Command::Run => run_service(&config, true, true).await,
        Command::Collect => run_service(&config, true, false).await,
        Command::Aggregate => run_service(&config, false, true).await,
        Command::InitDb => {
            database::connect(&config.database).await?;
            println!("Database initialized at {}", config.database.path.display());
            Ok(())
        }
        Command::AddMonitor(args) => add_monitor(&config, args).await,
        Command::ListMonitors => list_monitors(&config).await,
        Command::ShowConfig => {
            print!("{config}");
            Ok(())
        }
    }
}

async fn run_service(config: &Config, probing: bool, aggregating: bool) -> Result<()> {
    let store = database::connect(&config.database).await?;
    let token = CancellationToken::new();
    let mut handles = Vec::new();

    if probing {
        let monitors = store.list_monitors().await.context("Failed to load monitors")?;
        if monitors.is_empty() {
            info!("No monitors configured. Add one with `apimon add-monitor`. Exiting.");
            return Ok(());
        }

        let prober = Arc::new(HttpProber::new(&config.probe)?);
        let executor = Arc::new(ProbeExecutor::new(prober, store.clone()));
        let scheduler = MonitorScheduler::new(executor, config.probe.min_interval());

        info!("Scheduling {} monitors", monitors.len());
        handles.extend(scheduler.schedule_monitors(monitors, &token));
    }

    if aggregating {
        let engine = AggregationEngine::new(store.clone(), store.clone(), store.clone());
        handles.push(engine.spawn(token.clone()));
    }

    shutdown::wait_for_signal().await;
    info!("Shutting down {} tasks", handles.len());
    token.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Task ended abnormally: {}", e);
        }
    }

    info!("Stopped");
    Ok(())
}

async fn add_monitor(config: &Config, args: AddMonitorArgs) -> Result<()> {
    let monitor = NewMonitor {
        name: args.name,
        url: args.url,
        method: args.method.to_uppercase(),
        headers: args.headers.into_iter().collect::<Headers>(),
        body: args.body,
        interval_seconds: args.interval,
    };

    if let Err(e) = validate_monitor(&monitor, config.probe.min_interval_seconds) {
        bail!("Invalid monitor: {e}");
    }

    let store = database::connect(&config.database).await?;
    let id = store.add_monitor(&monitor).await?;
    println!(
        "Added monitor {id}: {} {} every {}s",
        monitor.method, monitor.url, monitor.interval_seconds
    );
    Ok(())
}

async fn list_monitors(config: &Config) -> Result<()> {
    let store = database::connect(&config.database).await?;
    let monitors = store.list_monitors().await?;

    if monitors.is_empty() {
        println!("No monitors configured.");
        return Ok(());
    }

    for monitor in monitors {
        println!(
            "{:>4}  {:<20} {:<6} {:<50} every {}s",
            monitor.id, monitor.name, monitor.method, monitor.url, monitor.interval_seconds
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization: Bearer abc:def").unwrap(),
            ("Authorization".to_string(), "Bearer abc:def".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(" : value").is_err());
    }

    #[test]
    fn test_cli_parses_add_monitor() {
        let cli = Cli::try_parse_from([
            "apimon",
            "--database",
            "/tmp/a.db",
            "add-monitor",
            "--name",
            "api",
            "--url",
            "https://example.com",
            "--header",
            "X-Key: 1",
            "--interval",
            "30",
        ])
        .unwrap();

        assert_eq!(cli.database, Some(PathBuf::from("/tmp/a.db")));
        match cli.command {
            Command::AddMonitor(args) => {
                assert_eq!(args.method, "GET");
                assert_eq!(args.interval, 30);
                assert_eq!(args.headers, vec![("X-Key".to_string(), "1".to_string())]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
