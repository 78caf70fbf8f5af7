//! Terminal MIDI monitor
//!
//! Streams the session's signal log and the jog-wheel angles to the console,
//! standing in for the setup screen's signal log and dial widgets.

use anyhow::Result;
use colored::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::MonitorConfig;
use crate::midi::log::{MessageKind, MessageLog, RawMessage};
use crate::midi::rotation::{RotationAggregator, RotationSnapshot};
use crate::midi::session::DeviceSession;

/// Tracks how far a reader has consumed a [`MessageLog`]
#[derive(Debug, Default)]
pub struct LogCursor {
    seen: u64,
}

impl LogCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries appended since the previous poll, oldest first.
    ///
    /// Entries evicted or cleared before the poll are skipped.
    pub fn poll(&mut self, log: &MessageLog) -> Vec<RawMessage> {
        let (entries, total) = log.entries_since(self.seen);
        self.seen = total;
        entries
    }
}

/// `[1.234] description`
pub fn format_entry(message: &RawMessage) -> String {
    format!("[{:.3}] {}", message.timestamp, message.description)
}

/// Arrow pointing the way a dial at `angle` degrees points (0° = up, clockwise)
pub fn dial_glyph(angle: f32) -> char {
    const ARROWS: [char; 8] = ['↑', '↗', '→', '↘', '↓', '↙', '←', '↖'];
    let sector = ((angle.rem_euclid(360.0) + 22.5) / 45.0) as usize % 8;
    ARROWS[sector]
}

/// One-line rendering of both dials
pub fn format_dials(snapshot: RotationSnapshot) -> String {
    format!(
        "L {} {:5.1}°   R {} {:5.1}°",
        dial_glyph(snapshot.left),
        snapshot.left,
        dial_glyph(snapshot.right),
        snapshot.right
    )
}

fn colorize(message: &RawMessage) -> ColoredString {
    let line = format_entry(message);
    match message.kind() {
        MessageKind::Note => line.bright_green(),
        MessageKind::ControlChange => line.bright_cyan(),
        MessageKind::PitchBend => line.yellow(),
        MessageKind::System => line.dimmed(),
        MessageKind::Status => line.bold().white(),
        MessageKind::Other => line.normal(),
    }
}

/// Print a message log entry with its category colour
pub fn print_entry(message: &RawMessage) {
    println!("{}", colorize(message));
}

/// Stream the log and dial angles until Ctrl+C, then shut the session down
pub async fn run_monitor(
    mut session: DeviceSession,
    dials: Arc<RotationAggregator>,
    config: &MonitorConfig,
) -> Result<()> {
    println!("{}", "=== Gamma VJ MIDI Monitor ===".bold().cyan());
    match session.connected_device_name() {
        Some(name) => println!("Listening on {}", name.bright_white()),
        None => println!("{}", "No device connected".yellow()),
    }
    println!("Press Ctrl+C to exit\n");

    let log = session.message_log();
    let mut cursor = LogCursor::new();
    let mut last_dials = dials.snapshot();
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_ms));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for entry in cursor.poll(&log) {
                    print_entry(&entry);
                }

                let current = dials.snapshot();
                if current != last_dials {
                    println!("{}", format_dials(current).bright_magenta());
                    last_dials = current;
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping monitor");
                break;
            }
        }
    }

    session.shutdown();
    println!("\n{}", "Monitor stopped".yellow());
    Ok(())
}

/// List all input ports in a formatted way
pub fn list_ports_formatted(session: &DeviceSession) {
    println!("\n{}", "=== Available MIDI Input Ports ===".bold().cyan());

    if !session.is_initialized() {
        println!("  {}", "MIDI system not available".red());
        println!();
        return;
    }

    let ports = session.enumerate();
    if ports.is_empty() {
        println!("  {}", "No input ports found".dimmed());
    } else {
        for (index, name) in ports.iter().enumerate() {
            let marker = if session.connected_device_name() == Some(name.as_str()) {
                "[CONNECTED]".green()
            } else {
                format!("[{}]", index).normal()
            };
            println!("  {} {}", marker, name);
        }
    }

    println!();
}
