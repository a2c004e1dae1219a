//! FunFansPlay admin console.
//!
//! A terminal front end for the admin session guard: log in with the admin
//! credentials, watch the one-hour session count down, log out.

mod app;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use funfans_core::auth::{Clock, Credentials, FileStore, SessionGuard, SessionStore, SystemClock};
use funfans_core::Config;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{AdminGuard, App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name in the cache directory
const LOG_FILE: &str = "funfans-admin.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a file so they do not draw over the TUI. The returned guard
/// must be held until exit to flush buffered lines.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

/// Build the guard from the environment and the on-disk session file
fn build_guard(config: &Config, cache_dir: &Path) -> (AdminGuard, String) {
    let store = FileStore::new(cache_dir);
    let location = store.path().display().to_string();

    let store: Box<dyn SessionStore> = Box::new(store);
    let clock: Box<dyn Clock> = Box::new(SystemClock);
    let guard =
        SessionGuard::new(Credentials::from_env(), store, clock).with_namespace(config.namespace());

    (guard, location)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config_path = Config::default_path().ok();
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config ({}), using defaults", e);
            Config::default()
        }
    };
    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
    if let Err(e) = std::fs::create_dir_all(&cache_dir) {
        eprintln!("Warning: could not create {}: {}", cache_dir.display(), e);
    }

    let _log_guard = init_tracing(&cache_dir);
    info!("FunFansPlay admin console starting");

    let (guard, store_location) = build_guard(&config, &cache_dir);
    let mut app = App::new(config, config_path, guard, store_location);

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--login") => return cli_login(&mut app),
        Some("--logout") => {
            app.logout();
            println!("Logged out.");
            return Ok(());
        }
        Some("--status") => return cli_status(&mut app),
        Some(other) => {
            warn!(arg = other, "Unknown argument");
            eprintln!("Unknown argument: {}", other);
            eprintln!("Usage: funfans-admin [--login | --logout | --status]");
            std::process::exit(2);
        }
        None => {}
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
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

    info!("FunFansPlay admin console shutting down");
    Ok(())
}

fn warn_if_fallback(app: &App) {
    if app.using_fallback_credentials() {
        eprintln!(
            "Development mode: using default credentials. Set ADMIN_USERNAME and \
             ADMIN_PASSWORD in your .env file for production."
        );
    }
}

/// `--login`: prompt for credentials and start a session
fn cli_login(app: &mut App) -> Result<()> {
    warn_if_fallback(app);

    if app.login_interactive()? {
        println!(
            "Login successful! Session expires in {} minutes.",
            app.session_minutes
        );
        Ok(())
    } else {
        Err(anyhow::anyhow!(app::INVALID_CREDENTIALS_MESSAGE))
    }
}

/// `--status`: print the session state as JSON
fn cli_status(app: &mut App) -> Result<()> {
    let status = app.status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout so the session countdown keeps moving
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

        app.tick();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
