//! ppop - terminal client for the Personalized Prophylaxis Platform.
//!
//! Usage:
//!   ppop [PATH]      open the client, optionally at a route such as /patients
//!   ppop --login     sign in from the command line and exit
//!   ppop --logout    forget the stored credential and exit

mod app;
mod forms;
mod ui;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ppop_core::routing::HOME_PATH;
use ppop_core::{ApiClient, Config, Shell};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name prefix; the appender adds the date
const LOG_FILE_PREFIX: &str = "ppop.log";

/// Initialize file logging. The terminal belongs to the UI, so nothing is
/// written to stderr while it runs.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=ppop_core=debug).
fn init_tracing() -> Result<WorkerGuard> {
    let log_dir = Config::cache_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
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

    let _log_guard = init_tracing()?;

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--logout") => return logout(),
        Some("--login") => return login_interactive().await,
        _ => {}
    }
    let initial_path = args
        .get(1)
        .filter(|arg| arg.starts_with('/'))
        .map(String::as_str)
        .unwrap_or(HOME_PATH);

    info!("ppop starting");
    let config = Config::load()?;
    let mut app = App::new(config, initial_path)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.start();

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.shutdown().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("ppop shutting down");
    Ok(())
}

async fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Nothing is drawn until the session has been hydrated
        if app.shell.is_ready() {
            terminal.draw(|f| render(f, app))?;
        }

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }
                if handle_input(app, key) {
                    return Ok(());
                }
            }
        }

        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

/// Clear the stored credential without starting the UI.
fn logout() -> Result<()> {
    let config = Config::load()?;
    let mut shell = Shell::new(config.credential_store()?, HOME_PATH);
    shell.hydrate();
    shell.logout();
    println!("Signed out.");
    Ok(())
}

/// Sign in from the command line, prompting for email and password.
async fn login_interactive() -> Result<()> {
    let mut config = Config::load()?;
    let api = ApiClient::new(config.api_url())?;

    let default_email = config.last_email.clone().unwrap_or_default();
    if default_email.is_empty() {
        print!("Email: ");
    } else {
        print!("Email [{}]: ", default_email);
    }
    io::stdout().flush()?;

    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    let email = match email.trim() {
        "" => default_email,
        typed => typed.to_string(),
    };
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }

    let password = rpassword::prompt_password("Password: ")?;

    println!("Signing in...");
    let token = api.authenticate(&email, &password).await?;

    let mut shell = Shell::new(config.credential_store()?, HOME_PATH);
    shell.hydrate();
    shell.login(&token, &email)?;

    config.last_email = Some(email.clone());
    config.save()?;

    println!("Signed in as {}.", email);
    Ok(())
}
