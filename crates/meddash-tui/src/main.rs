//! MedDash - a terminal administration dashboard for the MedDash pharmacy
//! platform.
//!
//! Signs an administrator in, keeps the session alive in the background and
//! shows the Statistics, Users and Pharmacies pages.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meddash_core::api::ApiClient;
use meddash_core::auth::SessionController;
use meddash_core::config::Config;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE: &str = "meddash.log";

const USAGE: &str = "\
Usage: meddash [OPTIONS]

Options:
  --ephemeral   Keep the session in memory only
  --login       Sign in from the command line and exit
  --logout      Clear stored credentials and exit
  -h, --help    Show this message";

/// Command-line flags
#[derive(Debug, Default, PartialEq, Eq)]
struct Flags {
    ephemeral: bool,
    login: bool,
    logout: bool,
    help: bool,
}

fn parse_flags<I: IntoIterator<Item = String>>(args: I) -> Result<Flags> {
    let mut flags = Flags::default();
    for arg in args {
        match arg.as_str() {
            "--ephemeral" => flags.ephemeral = true,
            "--login" => flags.login = true,
            "--logout" => flags.logout = true,
            "-h" | "--help" => flags.help = true,
            other => anyhow::bail!("Unknown option: {}\n\n{}", other, USAGE),
        }
    }
    Ok(flags)
}

/// Log to a file in the cache directory; the terminal belongs to the UI.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=meddash_core=debug).
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let flags = parse_flags(std::env::args().skip(1))?;
    if flags.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config ({}), using defaults", e);
            Config::default()
        }
    };

    let cache_dir = config.cache_dir()?;
    let _log_guard = init_tracing(&cache_dir)?;
    info!(backend = %config.backend_url, ephemeral = flags.ephemeral, "MedDash starting");

    let store = config.credential_store(flags.ephemeral)?;

    if flags.logout {
        store.clear().context("Failed to clear stored credentials")?;
        println!("Signed out.");
        return Ok(());
    }

    let api = Arc::new(ApiClient::new(&config.backend_url)?);
    let session = SessionController::new(store, api.clone());

    if flags.login {
        return login_interactive(config, &session, !flags.ephemeral).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, session, api);
    app.persist_config = !flags.ephemeral;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("MedDash shutting down");
    Ok(())
}

/// Sign in from the command line, storing the session for the next start.
async fn login_interactive(
    mut config: Config,
    session: &SessionController,
    persist_config: bool,
) -> Result<()> {
    println!("\n=== MedDash Login ===\n");

    let email = match config.last_email.clone() {
        Some(last) => {
            let input = prompt(&format!("Email [{}]: ", last))?;
            if input.is_empty() {
                last
            } else {
                input
            }
        }
        None => prompt("Email: ")?,
    };

    let password = match config.env_password.take() {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };

    println!("\nAuthenticating...");
    session
        .sign_in(&email, &password)
        .await
        .context("Login failed")?;

    remember_email(&mut config, email, persist_config, Config::save);

    println!("Login successful!\n");
    Ok(())
}

/// Record the email that signed in; the config file is only written when
/// `persist` is set.
fn remember_email(
    config: &mut Config,
    email: String,
    persist: bool,
    save: impl FnOnce(&Config) -> Result<()>,
) {
    config.last_email = Some(email);
    if !persist {
        return;
    }
    if let Err(e) = save(config) {
        warn!(error = %e, "Failed to save config");
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    // Show the loading screen while a stored session is validated
    terminal.draw(|f| render(f, app))?;
    app.start().await;

    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Apply redirects from the refresh timer
        app.check_background_tasks().await;

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse_flags(args(&[])).unwrap(), Flags::default());

        let flags = parse_flags(args(&["--ephemeral", "--logout"])).unwrap();
        assert!(flags.ephemeral);
        assert!(flags.logout);
        assert!(!flags.login);

        assert!(parse_flags(args(&["-h"])).unwrap().help);
    }

    #[test]
    fn test_ephemeral_login_never_writes_config() {
        let mut config = Config::default();
        remember_email(&mut config, "ada@example.com".to_string(), false, |_| {
            panic!("config written in ephemeral mode")
        });
        assert_eq!(config.last_email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_login_saves_email_when_persisting() {
        let mut config = Config::default();
        let mut saved = None;
        remember_email(&mut config, "ada@example.com".to_string(), true, |c| {
            saved = c.last_email.clone();
            Ok(())
        });
        assert_eq!(saved.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = parse_flags(args(&["--offline"])).unwrap_err();
        assert!(err.to_string().contains("Unknown option: --offline"));
    }
}
