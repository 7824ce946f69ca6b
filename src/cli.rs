//! CLI interface for the relay.
//!
//! - `serial-relay run` — attach to the simulator and forward readings until Ctrl-C.
//! - `serial-relay replay <FILE>...` — run saved console snapshots through the
//!   same extraction, offline.
//! - `serial-relay journal [PATH]` — summarize a readings journal.

mod journal;
mod replay;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bridge::{BridgeSettings, Outbound, run_bridge};
use crate::config::{Config, ConfigError};
use crate::dispatch::{Dispatcher, Observer};
use crate::queue::{self, Producer};
use crate::session::{SessionConfig, open_session};
use crate::shutdown;
use crate::sink::{Journal, JournalObserver, TelemetryObserver};

/// Relay a circuit simulator's serial console to telemetry sinks.
#[derive(Debug, Parser)]
#[command(name = "serial-relay", version, after_long_help = SETUP_HELP)]
pub struct Cli {
    /// Log at debug level. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

const SETUP_HELP: &str = r#"Setup
  1. chrome --remote-debugging-port=9222 --user-data-dir=/tmp/relay-profile
  2. chromedriver --port=9515
  3. serial-relay run --url https://www.tinkercad.com/things/<id>/editel

Configuration is read from ~/.serial-relay/config.toml, then SERIAL_RELAY_*
environment variables, then flags:
  simulation-url = "https://www.tinkercad.com/things/<id>/editel"
  sample-rate-ms = 50
  [telemetry]
  token = "<device access token>""#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Attach to the simulator and relay readings until interrupted.
    Run(RunArgs),

    /// Extract readings from saved console snapshots.
    ///
    /// Each file is treated as one poll of the console, in the order given.
    /// Readings are printed to stdout as JSON lines.
    Replay {
        /// Snapshot files, oldest first.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Only emit samples newer than this time.
        #[arg(long)]
        after: Option<i64>,
    },

    /// Summarize a readings journal per run.
    Journal {
        /// Journal file. Defaults to the configured `journal`.
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Simulation page to open.
    #[arg(long)]
    url: Option<String>,

    /// WebDriver server URL.
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Chrome remote-debugging address (host:port).
    #[arg(long)]
    debugger_address: Option<String>,

    /// Console polling period in milliseconds.
    #[arg(long)]
    sample_rate_ms: Option<u64>,

    /// Samples or commands buffered before producers wait.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Seconds to wait for the simulation page to load.
    #[arg(long)]
    ready_timeout_secs: Option<u64>,

    /// Telemetry endpoint base URL.
    #[arg(long)]
    telemetry_url: Option<String>,

    /// Telemetry device access token.
    #[arg(long)]
    telemetry_token: Option<String>,

    /// Append delivered readings to this JSONL file.
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Do not post readings to the telemetry endpoint.
    #[arg(long)]
    no_telemetry: bool,

    /// Command to send to the serial console once running. Repeatable.
    #[arg(long)]
    send: Vec<String>,

    /// Forward each line read from stdin to the serial console.
    #[arg(long)]
    stdin: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.simulation_url = Some(url.clone());
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url.clone_from(url);
        }
        if let Some(address) = &self.debugger_address {
            config.debugger_address.clone_from(address);
        }
        if let Some(rate) = self.sample_rate_ms {
            config.sample_rate_ms = rate;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(secs) = self.ready_timeout_secs {
            config.ready_timeout_secs = secs;
        }
        if let Some(url) = &self.telemetry_url {
            config.telemetry.base_url.clone_from(url);
        }
        if let Some(token) = &self.telemetry_token {
            config.telemetry.token = Some(token.clone());
        }
        if let Some(path) = &self.journal {
            config.journal = Some(path.clone());
        }
        // --no-telemetry wins over any token.
        if self.no_telemetry {
            config.telemetry.token = None;
        }
    }
}

/// Run the CLI, returning an error message on failure.
pub async fn run(cli: Cli) -> Result<(), String> {
    dispatch(cli, Config::load).await
}

/// Replay works offline, so only `run` and `journal` read the config.
async fn dispatch(
    cli: Cli,
    load: impl FnOnce() -> Result<Config, ConfigError>,
) -> Result<(), String> {
    match cli.command {
        Command::Run(args) => {
            let config = load().map_err(|e| e.to_string())?;
            cmd_run(config, args).await
        }
        Command::Replay { files, after } => replay::cmd_replay(&files, after),
        Command::Journal { path } => {
            let path = match path {
                Some(path) => path,
                None => load()
                    .map_err(|e| e.to_string())?
                    .journal
                    .ok_or("no journal: pass a path or set `journal` in the config")?,
            };
            journal::cmd_journal(&path)
        }
    }
}

async fn cmd_run(mut config: Config, args: RunArgs) -> Result<(), String> {
    args.apply(&mut config);
    config.validate().map_err(|e| e.to_string())?;
    let simulation_url = config.simulation_url.clone().ok_or(
        "no simulation URL: pass --url, set SERIAL_RELAY_SIMULATION_URL, \
         or add `simulation-url` to ~/.serial-relay/config.toml",
    )?;

    let run_id = Uuid::new_v4();
    let dispatcher = Dispatcher::new(build_observers(&config, run_id)?);
    let names = dispatcher.observer_names().join(", ");
    if names.is_empty() {
        warn!("no observers configured, readings will only be logged");
    }
    info!(run = %run_id, observers = %names, "starting relay");

    let session = open_session(&SessionConfig {
        webdriver_url: config.webdriver_url.clone(),
        debugger_address: config.debugger_address.clone(),
        simulation_url,
        ready_timeout: config.ready_timeout(),
    })
    .await
    .map_err(|e| format!("failed to open simulation: {e}"))?;
    let console = Arc::new(session);

    let (commands_tx, commands, outbound_join) = queue::channel(config.queue_capacity);
    if !args.send.is_empty() {
        let tx = commands_tx.clone();
        tokio::spawn(async move {
            for command in args.send {
                if tx.put(command).await.is_err() {
                    break;
                }
            }
        });
    }
    if args.stdin {
        forward_stdin(commands_tx);
    } else {
        drop(commands_tx);
    }

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                trigger.fire();
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    });

    let settings = BridgeSettings {
        sample_interval: config.sample_interval(),
        queue_capacity: config.queue_capacity,
    };
    let outcome = run_bridge(
        Arc::clone(&console),
        dispatcher,
        Outbound {
            commands,
            join: outbound_join,
        },
        settings,
        shutdown,
    )
    .await;

    match Arc::try_unwrap(console) {
        Ok(session) => session.close().await,
        Err(_) => warn!("browser session still in use, leaving it open"),
    }

    let summary = outcome.map_err(|e| e.to_string())?;
    info!(
        emitted = summary.reader.emitted,
        delivered = summary.dispatch.delivered,
        invalid = summary.dispatch.invalid,
        observer_failures = summary.dispatch.observer_failures,
        sent = summary.writer.sent,
        "relay stopped"
    );
    Ok(())
}

fn build_observers(config: &Config, run_id: Uuid) -> Result<Vec<Box<dyn Observer>>, String> {
    let mut observers: Vec<Box<dyn Observer>> = Vec::new();

    if let Some(token) = &config.telemetry.token {
        observers.push(Box::new(TelemetryObserver::new(
            &config.telemetry.base_url,
            token,
        )));
    }

    if let Some(path) = &config.journal {
        let journal = Journal::new(path)
            .map_err(|e| format!("failed to open journal {}: {e}", path.display()))?;
        observers.push(Box::new(JournalObserver::new(journal, run_id)));
    }

    Ok(observers)
}

/// Forward stdin lines as outbound commands on a plain thread.
///
/// Not a runtime task: a blocking stdin read must not hold up runtime shutdown.
fn forward_stdin(commands: Producer<String>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if commands.blocking_put(line).is_err() {
                break;
            }
        }
    });
}
