//! E-Inventory console - a terminal front end for the E-Inventory admin.
//!
//! The protected views are only reachable with a session. Sign in with a
//! username, password and site; the session closes after a window without
//! keyboard or mouse input.

mod app;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use einventory_core::auth::StoredTokenCheck;
use einventory_core::Config;

use app::{App, AppState};
use ui::input::{activity_kind, handle_input};
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE: &str = "einventory.log";

/// Initialize the tracing subscriber for logging.
///
/// The terminal is in raw mode while the console runs, so logs go to a daily
/// file in the cache directory. Use RUST_LOG to control the level.
fn init_tracing() -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = Config::default()
        .cache_dir()
        .unwrap_or_else(|_| PathBuf::from("./cache"));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Initialize logging
    let _log_guard = init_tracing();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--login") => return login_command().await,
        Some("--logout") => return logout_command().await,
        Some("--status") => return status_command().await,
        Some(other) => anyhow::bail!("Unknown argument: {}", other),
        None => {}
    }

    info!("E-Inventory console starting");

    // Create app and settle the session before the first frame
    let mut app = App::new().await?;
    app.mount().await;

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

    info!("E-Inventory console shutting down");
    Ok(())
}

/// Sign in from the command line
async fn login_command() -> Result<()> {
    let mut app = App::new().await?;
    app.login_interactive().await
}

/// Clear the stored session
async fn logout_command() -> Result<()> {
    let mut app = App::new().await?;
    app.logout();
    println!("Logged out.");
    Ok(())
}

/// Report whether the stored session is still accepted by the server
async fn status_command() -> Result<()> {
    let app = App::new().await?;
    match app.login.check_stored_token().await {
        StoredTokenCheck::NoToken => println!("Not signed in."),
        StoredTokenCheck::Valid => println!("Signed in ({})", app.config.api_base_url()),
        StoredTokenCheck::Discarded => println!("Session expired. Run with --login to sign in again."),
    }
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            let event = event::read()?;
            if let Some(kind) = activity_kind(&event) {
                app.record_activity(kind);
            }

            if let Event::Key(key) = event {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check for monitor events and session changes
        app.check_background_tasks().await;

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
