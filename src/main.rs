//! Terminal front end for the `apartment-climate` client.
//!
//! This binary orchestrates the startup sequence and then drives the screen
//! state machine from stdin:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing (to stderr)
//! - Building the sensor API client and the file-backed store
//! - Rendering the current screen to stdout after every change
//!
//! # Commands
//! - `scan <payload>...` – open the scanner and feed it the given QR payloads
//!   (no payloads closes the scanner without a result)
//! - `deny` – open the scanner with camera permission refused
//! - `reset` – forget the stored apartment
//! - `unit c|f|k` – change the display unit
//! - `quit`
//!
//! # Environment Variables
//! See [`apartment_climate::config::load_from_env`] for the client settings, plus:
//! - `CLIMATE_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `CLIMATE_SPAN_EVENTS` (optional) – span event mode for tracing
use std::env;

use anyhow::Result;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use apartment_climate::{
    config, render, App, EgainClient, Event, FileKeyValue, Frame, QueuedCamera, Scanner, Screen,
    Store, Unit, View,
};

// ---

/// One line of user input.
#[derive(Debug, PartialEq)]
enum Command {
    Scan(Vec<String>),
    Deny,
    Reset,
    Unit(Unit),
    Quit,
    Help,
}

impl Command {
    // ---
    fn parse(line: &str) -> Result<Option<Command>, String> {
        // ---
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "scan" => Command::Scan(words.map(String::from).collect()),
            "deny" => Command::Deny,
            "reset" => Command::Reset,
            "unit" => Command::Unit(words.next().unwrap_or_default().parse()?),
            "quit" | "exit" | "q" => Command::Quit,
            "help" | "?" => Command::Help,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(Some(command))
    }
}

const HELP: &str = "commands: scan <payload>... | deny | reset | unit c|f|k | quit";

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let api = EgainClient::from_config(&cfg)?;
    let store = Store::new(FileKeyValue::new(&cfg.store_dir), cfg.store_key.clone());
    let scanner = Scanner::new(cfg.scan_prefix.clone());

    let mut view = View {
        unit: cfg.display_unit,
        timezone: cfg.timezone,
    };
    let mut app = App::new(api, store, scanner, QueuedCamera::granted());

    app.dispatch(Event::Started).await;
    let mut shown = show(&app.screen(), &view, None);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("stdin closed, exiting");
                    break;
                };
                match Command::parse(&line) {
                    Ok(None) => continue,
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Help)) => println!("{HELP}"),
                    Ok(Some(Command::Unit(unit))) => {
                        view.unit = unit;
                        shown = None;
                    }
                    Ok(Some(Command::Reset)) => app.dispatch(Event::ResetRequested).await,
                    Ok(Some(Command::Scan(payloads))) => {
                        let camera = app.camera_mut();
                        *camera = QueuedCamera::granted();
                        for payload in payloads {
                            camera.push(Frame::qr(payload));
                        }
                        app.dispatch(Event::ScanRequested).await;
                    }
                    Ok(Some(Command::Deny)) => {
                        *app.camera_mut() = QueuedCamera::denied();
                        app.dispatch(Event::ScanRequested).await;
                    }
                    Err(e) => println!("{e}"),
                }
            }
            Some(event) = app.next_completion() => app.dispatch(event).await,
        }
        shown = show(&app.screen(), &view, shown);
    }

    Ok(())
}

/// Print `screen` unless it is what was printed last.
fn show(screen: &Screen, view: &View, last: Option<Screen>) -> Option<Screen> {
    // ---
    if last.as_ref() != Some(screen) {
        println!("{}\n", render(screen, view));
    }
    Some(screen.clone())
}

// ---

/// Crates whose request-level chatter would drown out the client's own logs.
const QUIET_CRATES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls"];

/// Filter directives for a `CLIMATE_LOG_LEVEL` value. Unknown or missing
/// levels fall back to `info`.
fn log_directives(level: Option<&str>) -> String {
    // ---
    let level = match level.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some(l @ ("trace" | "debug" | "info" | "warn" | "error" | "off")) => l.to_string(),
        _ => "info".to_string(),
    };
    QUIET_CRATES
        .iter()
        .fold(level, |acc, name| format!("{acc},{name}=warn"))
}

/// `RUST_LOG` wins when set; otherwise `CLIMATE_LOG_LEVEL` picks our level.
fn log_filter() -> EnvFilter {
    // ---
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(log_directives(env::var("CLIMATE_LOG_LEVEL").ok().as_deref()))
    })
}

/// `CLIMATE_SPAN_EVENTS=full|enter_exit`; anything else reports closes only.
fn span_events(mode: Option<&str>) -> FmtSpan {
    match mode {
        Some("full") => FmtSpan::FULL,
        Some("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    }
}

/// Logs share the terminal with the rendered screen, so they go to stderr and
/// only use color when stderr is a TTY (or `FORCE_COLOR` says otherwise).
fn init_tracing() {
    // ---
    let stderr = std::io::stderr;
    let ansi = match env::var("FORCE_COLOR").as_deref() {
        Ok("1" | "true" | "yes") => true,
        Ok("0" | "false" | "no") => false,
        _ => stderr().is_terminal(),
    };

    tracing_subscriber::fmt()
        .compact()
        .with_writer(stderr)
        .with_ansi(ansi)
        .with_target(true)
        .with_line_number(true)
        .with_span_events(span_events(env::var("CLIMATE_SPAN_EVENTS").ok().as_deref()))
        .with_env_filter(log_filter())
        .init();
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_commands() {
        // ---
        assert_eq!(Command::parse("   "), Ok(None));
        assert_eq!(
            Command::parse("scan http://install.egain.se?gid=ABCDEFGHIJ"),
            Ok(Some(Command::Scan(vec![
                "http://install.egain.se?gid=ABCDEFGHIJ".to_string()
            ])))
        );
        assert_eq!(Command::parse("scan"), Ok(Some(Command::Scan(Vec::new()))));
        assert_eq!(Command::parse("unit f"), Ok(Some(Command::Unit(Unit::Fahrenheit))));
        assert_eq!(Command::parse("QUIT"), Ok(Some(Command::Quit)));
        assert!(Command::parse("unit").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn test_log_directives_quiet_http_crates() {
        // ---
        let directives = log_directives(Some("DEBUG "));
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("reqwest=warn"));
        assert!(directives.contains("hyper=warn"));

        assert!(log_directives(None).starts_with("info,"));
        assert!(log_directives(Some("loud")).starts_with("info,"));
    }

    #[test]
    fn test_span_events_mode() {
        // ---
        assert_eq!(span_events(Some("full")), FmtSpan::FULL);
        assert_eq!(span_events(Some("enter_exit")), FmtSpan::ENTER | FmtSpan::EXIT);
        assert_eq!(span_events(None), FmtSpan::CLOSE);
    }
}
