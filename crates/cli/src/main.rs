mod config;
mod error;
mod platform;
mod presenter;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::{Parser, Subcommand};
use monitor::{CapabilityKind, GrantMap, Monitor};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use config::Config;
use error::Result;
use platform::{CommandOpener, CommandPlatform};
use presenter::TerminalPresenter;

const CONFIG_FILE: &str = "permwatch.toml";

#[derive(Parser)]
#[command(name = "permwatch")]
#[command(about = "Check and request the OS capabilities a terminal app depends on", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./permwatch.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "monitor=debug" (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every capability once and print the result
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep checking and print every change until interrupted
    Watch,
    /// Request a capability, or "all" for every missing one
    Request {
        /// Capability name (automation, screen-capture, accessibility) or "all"
        capability: String,
    },
    /// Drop cached results and recheck everything twice
    Recheck,
    /// Explain why a capability is needed and request it on confirmation
    Explain {
        /// Capability name (automation, screen-capture, accessibility)
        capability: CapabilityKind,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = load_config(cli.config.as_deref())?;
    let settle = settle_time(&config);
    let recheck_wait = config.monitor.recheck_confirm_delay() + config.monitor.probe_timeout();

    let monitor = Monitor::builder(Arc::new(CommandPlatform::new(config.platform.clone())))
        .opener(CommandOpener::new(config.platform.open))
        .config(config.monitor)
        .spawn();

    match cli.command {
        Some(Commands::Status { json }) => cmd_status(&monitor, json).await,
        None => cmd_status(&monitor, false).await,
        Some(Commands::Watch) => cmd_watch(&monitor).await,
        Some(Commands::Request { capability }) => cmd_request(&monitor, &capability, settle).await,
        Some(Commands::Recheck) => cmd_recheck(&monitor, recheck_wait).await,
        Some(Commands::Explain { capability }) => cmd_explain(&monitor, capability, settle).await,
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

/// How long to keep the process alive after a request so that delayed
/// settings fallbacks still fire.
fn settle_time(config: &Config) -> Duration {
    let delay = config
        .monitor
        .automation_settings_delay()
        .max(config.monitor.settings_fallback_delay());
    delay + Duration::from_millis(500)
}

async fn cmd_status(monitor: &Monitor, json: bool) -> Result<()> {
    monitor.check_all().await?;

    if json {
        let status = monitor.status().await?;
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_grants(&monitor.grants());
    }
    Ok(())
}

async fn cmd_watch(monitor: &Monitor) -> Result<()> {
    let mut changes = monitor.subscribe();
    let _watching = monitor.watch();

    monitor.check_all().await?;
    print_grants(&monitor.grants());
    println!("\nWatching for changes. Press Ctrl+C to stop.\n");

    loop {
        tokio::select! {
            changed = changes.recv() => match changed {
                Ok(_) | Err(RecvError::Lagged(_)) => print_change(&monitor.grants()),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

async fn cmd_request(monitor: &Monitor, target: &str, settle: Duration) -> Result<()> {
    monitor.check_all().await?;

    if target.eq_ignore_ascii_case("all") {
        let missing = monitor.missing_capabilities();
        if missing.is_empty() {
            println!("All capabilities already granted.");
            return Ok(());
        }
        monitor.request_all_missing();
    } else {
        let kind: CapabilityKind = target.parse()?;
        if monitor.has_capability(kind) {
            println!("{kind} is already granted.");
            return Ok(());
        }
        monitor.request_capability(kind);
    }

    tokio::time::sleep(settle).await;
    monitor.check_all().await?;
    print_grants(&monitor.grants());
    Ok(())
}

async fn cmd_recheck(monitor: &Monitor, wait: Duration) -> Result<()> {
    monitor.forced_recheck();

    // Wait for both the immediate and the confirmation pass.
    let deadline = tokio::time::Instant::now() + wait;
    while monitor.status().await?.passes_completed < 2 {
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    print_grants(&monitor.grants());
    Ok(())
}

async fn cmd_explain(monitor: &Monitor, kind: CapabilityKind, settle: Duration) -> Result<()> {
    monitor.check_all().await?;

    if monitor.has_capability(kind) {
        println!("{kind} is already granted.");
        return Ok(());
    }
    if !monitor.explain_and_request(kind, &TerminalPresenter) {
        return Ok(());
    }

    tokio::time::sleep(settle).await;
    monitor.check_all().await?;
    print_grants(&monitor.grants());
    Ok(())
}

fn print_grants(grants: &GrantMap) {
    println!("{:<20}  {:<8}  WHY", "CAPABILITY", "STATUS");
    println!("{}", "-".repeat(80));

    for (kind, granted) in grants.iter() {
        let status = if granted { "granted" } else { "missing" };
        println!(
            "{:<20}  {:<8}  {}",
            kind.display_name(),
            status,
            kind.metadata().rationale
        );
    }

    let missing = grants.missing();
    if !missing.is_empty() {
        println!();
        for kind in missing {
            println!("Grant {kind}: {}", kind.metadata().remediation_link);
        }
    }
}

fn print_change(grants: &GrantMap) {
    let time = Local::now().format("%H:%M:%S");
    let summary: Vec<String> = grants
        .iter()
        .map(|(kind, granted)| format!("{}={}", kind.as_str(), if granted { "yes" } else { "no" }))
        .collect();
    println!("[{time}] permissions changed: {}", summary.join(" "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn explain_parses_capability_names() {
        let cli = Cli::try_parse_from(["permwatch", "explain", "screen-capture"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Explain {
                capability: CapabilityKind::ScreenCapture
            })
        ));

        assert!(Cli::try_parse_from(["permwatch", "explain", "camera"]).is_err());
    }

    #[test]
    fn settle_time_covers_the_longest_fallback() {
        let config = Config::default();
        assert_eq!(settle_time(&config), Duration::from_millis(1500));
    }
}
