//! Interactive REPL.

use crate::commands::{self, Action};
use crate::Device;
use colored::Colorize;
use k8090_core::Notification;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use tokio::sync::broadcast;

const HELP_TEXT: &str = r#"
Available commands (channels are numbered 1-8):
  help                          Show this help
  status                        Show relays, buttons and device info
  sync                          Read pending button and timer reports

  on <relay>                    Switch a relay on
  off <relay>                   Switch a relay off
  toggle <relay>                Toggle a relay
  timer <relay> [seconds]       Start a relay timer (default: preset delay)
  delay <relay> <seconds>       Set a relay's preset delay (0-65535)

  mode <button> <mode>          Set a button mode: momentary, toggle or timed

  version                       Query the firmware version
  jumper                        Query the event jumper
  factory-reset                 Restore default button modes and delays

  quit, exit                    Exit the REPL
"#;

pub fn run(mut device: Device) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "K8090 relay card".bold().cyan());
    println!("Connected to {}", device.config().port);

    let mut notifications = device.subscribe();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".k8090_history"))
        .unwrap_or_else(|_| ".k8090_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "k8090>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&mut device, line) {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => println!(
                        "{}: {}\n",
                        "Error".red(),
                        commands::describe_error(e.as_ref())
                    ),
                }
                print_diagnostics(&mut notifications);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    device.close()?;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

/// Shows receive-path problems seen while the last command ran. State
/// changes are already reflected in the command output.
fn print_diagnostics(rx: &mut broadcast::Receiver<Notification>) {
    while let Ok(notification) = rx.try_recv() {
        if let Notification::Diagnostic(diagnostic) = notification {
            println!("{}: {}", "Warning".yellow(), diagnostic);
        }
    }
}

fn parse_line(line: &str) -> Result<Option<Action>, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((cmd, args)) = parts.split_first() else {
        return Ok(None);
    };
    let cmd = cmd.to_lowercase();

    let usage = |text: &str| -> Result<Option<Action>, Box<dyn std::error::Error>> {
        Err(format!("usage: {}", text).into())
    };

    let action = match cmd.as_str() {
        "status" | "s" => Action::Status,
        "on" => match args {
            [relay] => Action::On(commands::channel(relay)?),
            _ => return usage("on <relay>"),
        },
        "off" => match args {
            [relay] => Action::Off(commands::channel(relay)?),
            _ => return usage("off <relay>"),
        },
        "toggle" | "t" => match args {
            [relay] => Action::Toggle(commands::channel(relay)?),
            _ => return usage("toggle <relay>"),
        },
        "timer" => match args {
            [relay] => commands::timer(relay, None)?,
            [relay, seconds] => commands::timer(relay, Some(*seconds))?,
            _ => return usage("timer <relay> [seconds]"),
        },
        "delay" => match args {
            [relay, seconds] => commands::delay(relay, seconds)?,
            _ => return usage("delay <relay> <seconds>"),
        },
        "mode" => match args {
            [button, mode] => commands::mode(button, mode)?,
            _ => return usage("mode <button> <momentary|toggle|timed>"),
        },
        "version" => Action::Version,
        "jumper" => Action::Jumper,
        "factory-reset" => Action::FactoryReset,
        _ => return Ok(None),
    };
    Ok(Some(action))
}

fn execute_repl_command(
    device: &mut Device,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let cmd = line
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();

    match cmd.as_str() {
        "help" | "?" => return Ok(Some(HELP_TEXT.to_string())),
        "quit" | "exit" | "q" => return Ok(None),
        "sync" => {
            device.sync()?;
            return Ok(Some(commands::format_state(device.state())));
        }
        _ => {}
    }

    match parse_line(line)? {
        Some(action) => Ok(Some(commands::execute(device, action)?)),
        None => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}
