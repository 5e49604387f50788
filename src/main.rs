//! k8090 - Command-line tool for the K8090 relay card
//!
//! Provides both a REPL and one-shot command execution.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use k8090_client::{ConnectionConfig, SerialTransport, SimulatedBoard, Transport, K8090};
use k8090_core::Notification;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// The device type the CLI drives: serial or simulated.
pub type Device = K8090<Box<dyn Transport>>;

/// Pause between polls while watching.
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "k8090")]
#[command(about = "Control a Velleman K8090/VM8090 relay card")]
#[command(version)]
struct Cli {
    /// Serial port (overrides config file and K8090_PORT)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// YAML configuration file
    #[arg(short, long, env = "K8090_CONFIG")]
    config: Option<PathBuf>,

    /// Talk to an in-memory simulated board instead of a serial port
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive REPL
    Repl,

    /// Show relays, buttons and device info
    Status,

    /// Switch a relay on
    On {
        /// Relay number (1-8)
        relay: String,
    },

    /// Switch a relay off
    Off {
        /// Relay number (1-8)
        relay: String,
    },

    /// Toggle a relay
    Toggle {
        /// Relay number (1-8)
        relay: String,
    },

    /// Start a relay timer
    Timer {
        /// Relay number (1-8)
        relay: String,

        /// Seconds (0-65535); the preset delay is used if omitted
        seconds: Option<String>,
    },

    /// Set a relay's preset timer delay
    Delay {
        /// Relay number (1-8)
        relay: String,

        /// Seconds (0-65535)
        seconds: String,
    },

    /// Set a button's mode
    Mode {
        /// Button number (1-8)
        button: String,

        /// momentary, toggle or timed
        mode: String,
    },

    /// Query the firmware version
    Version,

    /// Query the event jumper
    Jumper,

    /// Restore default button modes and timer delays
    FactoryReset,

    /// Stream state changes and diagnostics as JSON lines until Ctrl+C
    Watch,
}

impl Commands {
    fn action(self) -> Result<commands::Action, Box<dyn std::error::Error>> {
        use commands::Action;

        Ok(match self {
            Commands::Status => Action::Status,
            Commands::On { relay } => Action::On(commands::channel(&relay)?),
            Commands::Off { relay } => Action::Off(commands::channel(&relay)?),
            Commands::Toggle { relay } => Action::Toggle(commands::channel(&relay)?),
            Commands::Timer { relay, seconds } => commands::timer(&relay, seconds.as_deref())?,
            Commands::Delay { relay, seconds } => commands::delay(&relay, &seconds)?,
            Commands::Mode { button, mode } => commands::mode(&button, &mode)?,
            Commands::Version => Action::Version,
            Commands::Jumper => Action::Jumper,
            Commands::FactoryReset => Action::FactoryReset,
            Commands::Repl | Commands::Watch => unreachable!(),
        })
    }
}

fn load_config(cli: &Cli) -> Result<ConnectionConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = ConnectionConfig::from_file(path)?;
            config.apply_env_overrides();
            config
        }
        None => ConnectionConfig::from_env(),
    };

    if let Some(port) = &cli.port {
        config.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if cli.simulate {
        config.port = "simulated".to_string();
    }

    config.validate()?;
    Ok(config)
}

fn connect(cli: &Cli, config: ConnectionConfig) -> Result<Device, Box<dyn std::error::Error>> {
    let transport: Box<dyn Transport> = if cli.simulate {
        Box::new(SimulatedBoard::new())
    } else {
        Box::new(SerialTransport::open(
            &config.port,
            config.baud_rate,
            config.read_timeout(),
        )?)
    };
    tracing::info!("Connecting to {}", config.port);
    Ok(K8090::with_transport(transport, config)?)
}

async fn watch(device: Device) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = device.subscribe();
    let stop = Arc::new(AtomicBool::new(false));

    // The driver is blocking, so polling runs on its own thread.
    let poller = {
        let stop = stop.clone();
        let mut device = device;
        tokio::task::spawn_blocking(move || {
            while !stop.load(Ordering::Relaxed) {
                if let Err(e) = device.sync() {
                    tracing::error!("Sync failed: {}", e);
                    break;
                }
                std::thread::sleep(WATCH_POLL_INTERVAL);
            }
            device.close()
        })
    };

    eprintln!("{}", "Watching for button and relay reports...".green());
    eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

    loop {
        tokio::select! {
            notification = rx.recv() => {
                match notification {
                    Ok(n) => print_notification(&n)?,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        eprintln!("{}: lagged {} notifications", "Warning".yellow(), n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        eprintln!("{}", "Connection closed".red());
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", "Stopping watch...".dimmed());
                break;
            }
        }
    }

    stop.store(true, Ordering::Relaxed);
    poller.await??;
    Ok(())
}

fn print_notification(notification: &Notification) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(notification)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli).map_err(|e| {
        eprintln!("{}: {}", "Configuration error".red(), e);
        e
    })?;
    let mut device = connect(&cli, config).map_err(|e| {
        eprintln!("{}: {}", "Connection failed".red(), e);
        e
    })?;

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(device)?;
        }
        Some(Commands::Watch) => {
            watch(device).await?;
        }
        Some(cmd) => {
            let result = cmd
                .action()
                .and_then(|action| Ok(commands::execute(&mut device, action)?));

            device.close()?;

            match result {
                Ok(output) => {
                    println!("{}", output);
                }
                Err(e) => {
                    eprintln!(
                        "{}: {}",
                        "Error".red(),
                        commands::describe_error(e.as_ref())
                    );
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
