//! `kvm-serial`: command-line front end for the serial KVM link.
//!
//! Opens the device port, queues one command (or runs until Ctrl-C), waits
//! for the queue to drain, and disconnects cleanly.
//!
//! # Usage
//!
//! ```text
//! kvm-serial [OPTIONS] <COMMAND>
//!
//! Commands:
//!   ports        List serial ports
//!   hotkey       Send a hotkey chord (ctrl-alt-del, alt-tab, win-l, ...)
//!   key          Press and release one key by Windows VK code
//!   click        Click at absolute device coordinates
//!   scroll       Scroll by N ticks (positive = up)
//!   keep-awake   Stay connected and jiggle the pointer while idle
//!   capture      Forward this machine's keyboard and mouse (Windows only)
//!
//! Options:
//!   --port <PORT>      Serial port [env: KVM_SERIAL_PORT]
//!   --baud <BAUD>      Line speed [env: KVM_SERIAL_BAUD]
//!   --config <PATH>    Config file [env: KVM_SERIAL_CONFIG]
//!   --dry-run          Use an in-memory port and print the frames
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ AppConfig (TOML)       -- log level, queue pacing, jiggle, input
//!  └─ SerialLink::connect()  -- opens the port, starts worker + jiggle
//!       └─ queue_* calls     -- from the chosen sub-command
//!  └─ wait_until_drained()
//!  └─ dispose()
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use kvm_serial_core::{Hotkey, KeyAction, MouseAction, Point};
use kvm_serial_link::application::{
    ForwardInputUseCase, InputSink, LinkEvent, SerialLink, ViewArea,
};
use kvm_serial_link::infrastructure::input_capture::platform_source;
use kvm_serial_link::infrastructure::serial::mock::MockConnector;
use kvm_serial_link::infrastructure::serial::{
    list_ports, SerialPortConnector, SerialSettings, TransportConnector,
};
use kvm_serial_link::infrastructure::storage::{self, AppConfig, ConfigError};

/// How long one-shot commands wait for the queue to empty before disconnecting.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Port name used by `--dry-run` when none is configured.
const DRY_RUN_PORT: &str = "DRYRUN";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serial KVM link.
///
/// Sends keyboard and mouse commands to a USB HID emulator over a serial port.
#[derive(Debug, Parser)]
#[command(name = "kvm-serial", about = "Serial KVM keyboard/mouse link", version)]
struct Cli {
    /// Serial port name, e.g. `COM3` or `/dev/ttyUSB0`.
    ///
    /// Overrides `[serial] port` in the config file.
    #[arg(long, global = true, env = "KVM_SERIAL_PORT")]
    port: Option<String>,

    /// Line speed in baud.  Overrides `[serial] baud_rate`.
    #[arg(long, global = true, env = "KVM_SERIAL_BAUD")]
    baud: Option<u32>,

    /// Config file path.  Defaults to the platform config directory.
    #[arg(long, global = true, env = "KVM_SERIAL_CONFIG")]
    config: Option<PathBuf>,

    /// Write to an in-memory port and print the frames instead.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List serial ports.
    Ports,

    /// Send a hotkey chord.
    Hotkey {
        /// One of: ctrl-alt-del, print-screen, alt-tab, alt-f4, ctrl-shift-esc, win-l.
        #[arg(value_parser = parse_hotkey)]
        name: Hotkey,
    },

    /// Press and release one key.
    Key {
        /// Windows virtual-key code, decimal or `0x`-prefixed hex.
        #[arg(value_parser = parse_code)]
        code: u8,
    },

    /// Move to absolute device coordinates and click.
    Click {
        x: u16,
        y: u16,
        /// Use the right button.
        #[arg(long)]
        right: bool,
    },

    /// Scroll by a number of ticks; positive scrolls up.
    Scroll {
        #[arg(allow_hyphen_values = true)]
        ticks: i32,
    },

    /// Stay connected and keep the target awake until Ctrl-C.
    KeepAwake,

    /// Forward this machine's keyboard and mouse until Ctrl-C.
    Capture {
        /// Screen x of the video view's left edge.
        #[arg(long, default_value_t = 0)]
        left: i32,
        /// Screen y of the video view's top edge.
        #[arg(long, default_value_t = 0)]
        top: i32,
    },
}

fn parse_code(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid key code `{s}`: {e}"))
}

fn parse_hotkey(s: &str) -> Result<Hotkey, String> {
    s.parse::<Hotkey>().map_err(|e| {
        let known: Vec<String> = Hotkey::ALL.iter().map(ToString::to_string).collect();
        format!("{e} (known: {})", known.join(", "))
    })
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    if let Command::Ports = cli.command {
        return print_ports();
    }

    let mut settings = config
        .to_link_settings()
        .context("invalid configuration")?;
    if matches!(cli.command, Command::KeepAwake) {
        settings.jiggle.enabled = true;
    }

    let serial = resolve_serial(&cli, &config)?;
    let mock = cli.dry_run.then(|| Arc::new(MockConnector::new()));
    let connector: Arc<dyn TransportConnector> = match &mock {
        Some(mock) => Arc::clone(mock) as Arc<dyn TransportConnector>,
        None => Arc::new(SerialPortConnector::new()),
    };

    let link = Arc::new(SerialLink::new(connector, settings));
    spawn_event_logger(&link);
    link.connect(&serial)
        .await
        .with_context(|| format!("connecting to {}", serial.port))?;

    let outcome = run_command(&cli.command, &link, &config).await;

    if !link.wait_until_drained(DRAIN_TIMEOUT).await {
        warn!("{} frame(s) still queued after {DRAIN_TIMEOUT:?}", link.queue_count());
    }
    let stats = link.stats();
    info!(
        "sent {} of {} queued frame(s) ({} coalesced, {} failed)",
        stats.total_sent, stats.total_queued, stats.total_coalesced, stats.total_failed
    );
    link.dispose().await;

    if let Some(mock) = mock {
        for transport in mock.transports() {
            for frame in transport.written() {
                println!("{frame}");
            }
        }
    }

    outcome
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AppConfig> {
    let loaded = match path {
        Some(path) => storage::load_from(path),
        None => match storage::load_config() {
            Err(ConfigError::NoPlatformConfigDir) => Ok(AppConfig::default()),
            other => other,
        },
    };
    loaded.context("loading configuration")
}

fn resolve_serial(cli: &Cli, config: &AppConfig) -> anyhow::Result<SerialSettings> {
    let mut serial = match (&cli.port, config.serial_settings()) {
        (Some(port), Some(configured)) => SerialSettings {
            port: port.clone(),
            ..configured
        },
        (Some(port), None) => SerialSettings::new(port.clone()),
        (None, Some(configured)) => configured,
        (None, None) if cli.dry_run => SerialSettings::new(DRY_RUN_PORT),
        (None, None) => bail!("no serial port given; use --port or set [serial] port in the config"),
    };
    if let Some(baud) = cli.baud {
        serial.baud_rate = baud;
    }
    Ok(serial)
}

fn print_ports() -> anyhow::Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for port in ports {
        if port.description.is_empty() {
            println!("{}", port.name);
        } else {
            println!("{}\t{}", port.name, port.description);
        }
    }
    Ok(())
}

fn spawn_event_logger(link: &SerialLink) {
    let mut rx = link.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(LinkEvent::StatusChanged(status)) => info!("{status}"),
                Ok(LinkEvent::SendError(e)) => warn!("{e}"),
                Ok(LinkEvent::MessageSent(msg)) => debug!("sent {}", msg.frame),
                Ok(LinkEvent::ConnectionChanged(_)) => {}
                Err(RecvError::Lagged(n)) => debug!("event logger skipped {n} event(s)"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn run_command(command: &Command, link: &Arc<SerialLink>, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        Command::Ports => {}
        Command::Hotkey { name } => link.queue_hotkey(*name),
        Command::Key { code } => {
            link.queue_vk_event(KeyAction::Down, *code, false);
            link.queue_vk_event(KeyAction::Up, *code, false);
        }
        Command::Click { x, y, right } => {
            let pos = Point::new(i32::from(*x), i32::from(*y));
            let (down, up) = if *right {
                (MouseAction::RightDown, MouseAction::RightUp)
            } else {
                (MouseAction::LeftDown, MouseAction::LeftUp)
            };
            link.queue_mouse_event(MouseAction::Move, pos)?;
            link.queue_mouse_event(down, pos)?;
            link.queue_mouse_event(up, pos)?;
        }
        Command::Scroll { ticks } => link.queue_scroll(Point::default(), *ticks)?,
        Command::KeepAwake => {
            info!("keeping the target awake; press Ctrl-C to exit");
            tokio::signal::ctrl_c().await?;
            info!("shutdown signal received");
        }
        Command::Capture { left, top } => {
            let view = ViewArea::new(
                *left,
                *top,
                f64::from(config.input.view_width),
                f64::from(config.input.view_height),
            )
            .for_profile(&link.settings().profile);
            forward_until_interrupted(link, view, config).await?;
        }
    }
    Ok(())
}

async fn forward_until_interrupted(
    link: &Arc<SerialLink>,
    view: ViewArea,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let capture = platform_source()?.start()?;
    let use_case = Arc::new(ForwardInputUseCase::new(
        Arc::clone(link) as Arc<dyn InputSink>,
        view,
        config.scroll_settings(),
    ));
    let stop = Arc::new(AtomicBool::new(false));

    let forward = {
        let use_case = Arc::clone(&use_case);
        let stop = Arc::clone(&stop);
        tokio::task::spawn_blocking(move || use_case.run(&capture, &stop))
    };

    info!("forwarding input; press Ctrl-C to exit");
    tokio::signal::ctrl_c().await?;
    stop.store(true, Ordering::SeqCst);
    forward.await?;
    info!("forwarded {} event(s)", use_case.forwarded());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_code_accepts_decimal_and_hex() {
        assert_eq!(parse_code("65"), Ok(65));
        assert_eq!(parse_code("0x41"), Ok(0x41));
        assert!(parse_code("0x1FF").is_err());
    }

    #[test]
    fn test_parse_hotkey_lists_known_names_on_error() {
        let err = parse_hotkey("ctrl+q").unwrap_err();
        assert!(err.contains("known:"));
    }

    #[test]
    fn test_scroll_accepts_negative_ticks() {
        let cli = Cli::try_parse_from(["kvm-serial", "--dry-run", "scroll", "-3"]).unwrap();
        assert!(matches!(cli.command, Command::Scroll { ticks: -3 }));
    }

    #[test]
    fn test_dry_run_without_port_uses_placeholder() {
        let cli = Cli::try_parse_from(["kvm-serial", "--dry-run", "key", "0x41"]).unwrap();
        let serial = resolve_serial(&cli, &AppConfig::default()).unwrap();
        assert_eq!(serial.port, DRY_RUN_PORT);
    }

    #[test]
    fn test_port_flag_keeps_configured_baud() {
        // Arrange
        let mut config = AppConfig::default();
        config.serial.port = Some("COM1".into());
        config.serial.baud_rate = 9600;
        let cli = Cli::try_parse_from(["kvm-serial", "--port", "COM4", "keep-awake"]).unwrap();

        // Act
        let serial = resolve_serial(&cli, &config).unwrap();

        // Assert
        assert_eq!(serial.port, "COM4");
        assert_eq!(serial.baud_rate, 9600);
    }
}
