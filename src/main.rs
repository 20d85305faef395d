//! axterm - Voice Control accessibility for terminal sessions
//!
//! Runs a scripted dictation session against an in-process terminal grid and
//! reports what an accessibility client would see after each phrase.
//!
//! # Quick Start
//!
//! ```text
//! axterm                           # Dictate the built-in phrases
//! axterm "ls -la" " | less"        # Dictate your own phrases
//! axterm --force --debounce 50     # Run on any platform, 50ms debounce
//! ```
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `AXTERM_ACCESSIBILITY` | `1` forces accessibility on, `0` off |
//! | `AXTERM_LOG` | Log filter, e.g. `debug` or `axterm=trace` |
//! | `AXTERM_DEBUG_ACCESSIBILITY` | `1` logs at debug level |

use std::env;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use anyhow::Context;
use crossterm::style::Stylize;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use axterm::accessibility::{
    AccessibleSession, Attribute, AttributeValue, DictationSimulator, LogBridge,
};
use axterm::config::{config_dir, Config};
use axterm::core::session::TerminalSession;

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

const PROMPT: &str = "$ ";

const DEFAULT_PHRASES: &[&str] = &["echo hello", " world", " | grep 世界"];

/// Command line options
#[derive(Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    debounce_ms: Option<u64>,
    disable: bool,
    force: bool,
    save_config: bool,
    phrases: Vec<String>,
}

fn print_version() {
    eprintln!("axterm {}", VERSION);
}

fn print_help() {
    eprintln!("axterm {} - Voice Control accessibility for terminals", VERSION);
    eprintln!();
    eprintln!("Usage: axterm [OPTIONS] [PHRASE]...");
    eprintln!();
    eprintln!("Each PHRASE is dictated into the session in order.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>   Read configuration from FILE");
    eprintln!("  --debounce <MS>       Notification debounce interval");
    eprintln!("  --disable             Run with accessibility disabled");
    eprintln!("  --force               Enable accessibility on any platform");
    eprintln!("  --save-config         Write the effective config to ~/.axterm and exit");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.axterm/config.toml");
    eprintln!("Log file:      ~/.axterm/axterm.log");
}

fn parse_args() -> Result<CliArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut cli = CliArgs::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                let path = args.get(i).ok_or("Missing config file argument")?;
                cli.config_path = Some(PathBuf::from(path));
            }
            "--debounce" => {
                i += 1;
                let value = args.get(i).ok_or("Missing debounce argument")?;
                let ms = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid debounce interval: {}", value))?;
                cli.debounce_ms = Some(ms);
            }
            "--disable" => cli.disable = true,
            "--force" => cli.force = true,
            "--save-config" => cli.save_config = true,
            arg if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            phrase => cli.phrases.push(phrase.to_string()),
        }
        i += 1;
    }

    if cli.disable && cli.force {
        return Err("--disable and --force cannot be combined".to_string());
    }
    Ok(cli)
}

/// Log to `~/.axterm/axterm.log`; silently skipped when the file can't be opened
fn init_logging() {
    let log_path = config_dir()
        .map(|dir| dir.join("axterm.log"))
        .unwrap_or_else(|| PathBuf::from("axterm.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    let debug_accessibility = env::var("AXTERM_DEBUG_ACCESSIBILITY").map_or(false, |v| v == "1");
    let filter = if debug_accessibility {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("AXTERM_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("axterm {} starting...", VERSION);

    let mut config = match &cli.config_path {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(ms) = cli.debounce_ms {
        config.accessibility.debounce_ms = ms;
    }

    if cli.save_config {
        config.save().context("failed to save config")?;
        if let Some(path) = Config::config_path() {
            println!("{} {}", "saved".green(), path.display());
        }
        return Ok(());
    }

    let mut settings = config.settings();
    if cli.disable {
        settings.enabled = false;
    }
    if cli.force {
        settings.enabled = true;
    }

    let bridge = if cli.force {
        LogBridge::forced()
    } else {
        LogBridge::new()
    };

    let (terminal, input_rx) = TerminalSession::new(
        1,
        config.terminal.cols,
        config.terminal.rows,
        config.terminal.scrollback_limit,
    );
    let terminal = Arc::new(terminal);
    terminal.draw(PROMPT);

    let session = AccessibleSession::new(&terminal, Arc::new(bridge), settings);
    println!(
        "{} platform={} accessibility={}",
        "axterm".bold(),
        session.platform(),
        if session.is_enabled() {
            "on".green()
        } else {
            "off".red()
        }
    );

    session.notify_focus_changed();
    session.on_screen_update();

    let phrases: Vec<String> = if cli.phrases.is_empty() {
        DEFAULT_PHRASES.iter().map(|s| s.to_string()).collect()
    } else {
        cli.phrases
    };

    let dictation = DictationSimulator::new(&session);
    for phrase in &phrases {
        println!();
        println!("{} {:?}", "dictate".cyan(), phrase);
        if !dictation.dictate(phrase) {
            println!("  {}", "(skipped)".dark_grey());
            continue;
        }
        echo_input(&terminal, &input_rx);
        session.on_screen_update();
        print_attributes(&session);
    }

    // Move back to the start of the command line
    println!();
    println!("{} {}", "move".cyan(), PROMPT.chars().count());
    session.set_cursor_offset(PROMPT.chars().count());
    echo_input(&terminal, &input_rx);

    info!("axterm finished");
    Ok(())
}

/// Play the program's part: echo typed text, report key sequences
fn echo_input(terminal: &TerminalSession, input_rx: &Receiver<Vec<u8>>) {
    while let Ok(bytes) = input_rx.try_recv() {
        if bytes.first() == Some(&0x1b) {
            let keys = String::from_utf8_lossy(&bytes).escape_debug().to_string();
            println!("  {} {}", "keys".dark_grey(), keys);
            continue;
        }
        let text = String::from_utf8_lossy(&bytes);
        debug!("echoing {} bytes", bytes.len());
        terminal.draw(&text);
    }
}

fn print_attributes(session: &AccessibleSession) {
    for attribute in Attribute::ALL {
        let Some(value) = session.attribute_value(attribute) else {
            continue;
        };
        let shown = match value {
            AttributeValue::Text(text) => format!("{:?}", text),
            AttributeValue::Integer(n) => n.to_string(),
            AttributeValue::Range(range) => range.to_string(),
        };
        println!("  {} {}", format!("{:<28}", attribute.name()).yellow(), shown);
    }
}
