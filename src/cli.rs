//! Command-line interface and REPL
//!
//! Device selection and log inspection for the MIDI setup, driven from a
//! `rustyline` prompt.

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

use crate::config::MonitorConfig;
use crate::midi::rotation::RotationAggregator;
use crate::midi::session::{DeviceSession, RefreshOutcome, SessionError};
use crate::monitor::{format_dials, list_ports_formatted, print_entry};

/// How a device is addressed on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    Index(usize),
    Name(String),
}

impl DeviceTarget {
    /// Numeric arguments select by index, anything else by exact name
    pub fn parse(arg: &str) -> Self {
        match arg.parse::<usize>() {
            Ok(index) => DeviceTarget::Index(index),
            Err(_) => DeviceTarget::Name(arg.to_string()),
        }
    }

    /// Connect `session` to this target
    pub fn connect(&self, session: &mut DeviceSession) -> Result<(), SessionError> {
        match self {
            DeviceTarget::Index(index) => session.connect(*index),
            DeviceTarget::Name(name) => session.connect_by_name(name),
        }
    }
}

/// REPL commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Connect(DeviceTarget),
    Disconnect,
    Refresh,
    Status,
    Log(Option<usize>),
    Clear,
    Dials,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "list" | "ls" => Ok(Command::List),
            "connect" | "c" => {
                if rest.is_empty() {
                    Err("usage: connect <index|name>".to_string())
                } else {
                    Ok(Command::Connect(DeviceTarget::parse(rest)))
                }
            }
            "disconnect" => Ok(Command::Disconnect),
            "refresh" => Ok(Command::Refresh),
            "status" => Ok(Command::Status),
            "log" => {
                if rest.is_empty() {
                    Ok(Command::Log(None))
                } else {
                    rest.parse::<usize>()
                        .map(|n| Command::Log(Some(n)))
                        .map_err(|_| format!("invalid count: {}", rest))
                }
            }
            "clear" => Ok(Command::Clear),
            "dials" => Ok(Command::Dials),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err(String::new()),
            other => Err(format!("unknown command: {} (try 'help')", other)),
        }
    }
}

fn print_help() {
    println!("  {}                 list input ports", "list".bold());
    println!("  {} <index|name>  open a port", "connect".bold());
    println!("  {}           close the open port", "disconnect".bold());
    println!("  {}              rebuild the port list and reopen the device", "refresh".bold());
    println!("  {}               connection status", "status".bold());
    println!("  {} [n]              show the last n log entries", "log".bold());
    println!("  {}                clear the log", "clear".bold());
    println!("  {}                jog wheel angles", "dials".bold());
    println!("  {}                 leave", "quit".bold());
}

/// Execute one command. Returns false when the REPL should stop.
pub fn execute(
    command: Command,
    session: &mut DeviceSession,
    dials: &RotationAggregator,
    config: &MonitorConfig,
) -> bool {
    match command {
        Command::List => list_ports_formatted(session),
        Command::Connect(target) => match target.connect(session) {
            Ok(()) => println!(
                "{} {}",
                "Connected to".green(),
                session.connected_device_name().unwrap_or_default()
            ),
            Err(e) => println!("{} {}", "Connection failed:".red(), e),
        },
        Command::Disconnect => {
            if session.is_connected() {
                session.disconnect();
                println!("{}", "Disconnected".yellow());
            } else {
                println!("{}", "Not connected".dimmed());
            }
        }
        Command::Refresh => match session.refresh() {
            Ok(RefreshOutcome::Refreshed) => println!("Device list refreshed"),
            Ok(RefreshOutcome::Reconnected(name)) => {
                println!("Device list refreshed, reconnected to {}", name.green())
            }
            Ok(RefreshOutcome::ReconnectFailed(name)) => {
                println!("Device list refreshed, {} {}", name.bright_white(), "is no longer available".red())
            }
            Err(e) => println!("{} {}", "Refresh failed:".red(), e),
        },
        Command::Status => match session.connected_device_name() {
            Some(name) => println!("{} {}", "Connected:".green(), name),
            None => println!("{}", "Disconnected".red()),
        },
        Command::Log(count) => {
            let entries = session.recent_messages(count.unwrap_or(config.recent));
            if entries.is_empty() {
                println!("{}", "No MIDI messages received yet...".dimmed());
            }
            for entry in &entries {
                print_entry(entry);
            }
        }
        Command::Clear => {
            session.clear_message_log();
            println!("Log cleared");
        }
        Command::Dials => println!("{}", format_dials(dials.snapshot())),
        Command::Help => print_help(),
        Command::Quit => return false,
    }
    true
}

pub fn run_repl(
    mut session: DeviceSession,
    dials: Arc<RotationAggregator>,
    config: &MonitorConfig,
) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("Type 'help' for commands");

    loop {
        match rl.readline("gamma> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match Command::parse(&line) {
                    Ok(command) => {
                        if !execute(command, &mut session, &dials, config) {
                            break;
                        }
                    }
                    Err(message) if message.is_empty() => {}
                    Err(message) => println!("{}", message.red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    session.shutdown();
    Ok(())
}
