//! Surface sniffer for debugging layouts
//!
//! Prints each message from the control surface with the control it
//! resolves to. Toggle states are tracked so banked controls resolve the way
//! the engine would see them, but no action is executed.

use anyhow::Result;
use colored::*;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::AppConfig;
use crate::engine::resolve;
use crate::midi::WireMessage;
use crate::registry::{ControlKind, Registry};
use crate::surface::connect_input;

/// Sniffed message
#[derive(Debug, Clone)]
pub struct SnifferEvent {
    pub timestamp_ms: u64,
    pub message: WireMessage,
}

/// Resolve a message to a control label, updating toggle state
pub fn describe(registry: &Registry, message: WireMessage) -> Option<String> {
    let descriptor = resolve(registry, message.status, message.data1)?;
    let detail = match descriptor.kind {
        ControlKind::Toggle(_) => {
            let on = message.data2 & 0x01 == 1;
            descriptor.set_state(on);
            String::from(if on { "on" } else { "off" })
        }
        ControlKind::Momentary(_) => {
            String::from(if message.data2 == 0 { "release" } else { "press" })
        }
        ControlKind::Slider { .. } | ControlKind::Knob { .. } => message.data2.to_string(),
    };
    Some(format!("{} {}", descriptor.label, detail))
}

/// CLI sniffer on the configured surface input
pub async fn run_cli_sniffer(config: &AppConfig) -> Result<()> {
    println!("{}", "=== Surface Sniffer ===".bold().cyan());
    println!("Press Ctrl+C to exit\n");

    let registry = Registry::build(&config.surface);
    let start_time = Instant::now();
    let (tx, mut rx) = mpsc::channel::<SnifferEvent>(1000);

    let (_connection, port_name) = connect_input(
        "Kontrol-GW-Sniffer",
        &config.midi.input_port,
        tx,
        move |data| {
            WireMessage::from_bytes(data).map(|message| SnifferEvent {
                timestamp_ms: start_time.elapsed().as_millis() as u64,
                message,
            })
        },
    )?;
    info!("Sniffing {}", port_name);

    println!("\n{}", "Monitoring surface traffic...".green());
    println!("{}", "Format: [timestamp] IN  | HEX => CONTROL".dimmed());
    println!("{}\n", "─".repeat(60).dimmed());

    loop {
        tokio::select! {
            Some(event) = rx.recv() => print_event(&registry, &event),
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", "Sniffer stopped".yellow());
                return Ok(());
            }
        }
    }
}

fn print_event(registry: &Registry, event: &SnifferEvent) {
    let resolved = match describe(registry, event.message) {
        Some(label) => label.bright_white().to_string(),
        None => "unmapped".dimmed().to_string(),
    };
    println!(
        "[{:>8}] {} | {} => {}",
        event.timestamp_ms.to_string().dimmed(),
        "IN ".green(),
        event.message.to_string().yellow(),
        resolved
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SurfaceLayout;

    #[test]
    fn test_describe_tracks_shift_state() {
        let registry = Registry::build(&SurfaceLayout::default());

        assert_eq!(
            describe(&registry, WireMessage::new(0xB0, 0x00, 99)).as_deref(),
            Some("Slider 1/0 99")
        );
        assert_eq!(
            describe(&registry, WireMessage::new(0xB0, 0x40, 0x7F)).as_deref(),
            Some("Rec 1 on")
        );
        assert_eq!(
            describe(&registry, WireMessage::new(0xB0, 0x00, 99)).as_deref(),
            Some("Slider 1/1 99")
        );
        assert_eq!(
            describe(&registry, WireMessage::new(0xB0, 0x2E, 0x7F)).as_deref(),
            Some("Cycle on")
        );
        assert_eq!(
            describe(&registry, WireMessage::new(0xB0, 0x2B, 0x00)).as_deref(),
            Some("Rewind/1 release")
        );
    }

    #[test]
    fn test_describe_unmapped() {
        let registry = Registry::build(&SurfaceLayout::default());
        assert_eq!(describe(&registry, WireMessage::new(0x90, 0x29, 0x7F)), None);
    }
}
