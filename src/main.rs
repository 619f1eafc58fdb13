mod app;
mod audio;
mod backend;
mod config;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup};
use backend::BackendClient;
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "garita")]
#[command(version = "0.1.0")]
#[command(about = "A terminal kiosk for a camera-based access checkpoint")]
struct Args {
    /// Output current detection status as JSON (for scripts/waybar)
    #[arg(short, long)]
    status: bool,

    /// Ask the backend to start a scan, then exit
    #[arg(short, long)]
    begin: bool,

    /// Ask the backend to clear its detection state, then exit
    #[arg(short, long)]
    reset: bool,

    /// Flip the backend's debug overlay, then exit
    #[arg(long)]
    toggle_debug: bool,

    /// Backend base URL (overrides the config file)
    #[arg(short, long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_default();
    if let Some(url) = args.url {
        config.backend_url = url;
    }

    // Handle CLI-only commands
    if args.status {
        return print_status(&config).await;
    }

    if args.begin {
        return begin_scan(&config).await;
    }

    if args.reset {
        return reset_backend(&config).await;
    }

    if args.toggle_debug {
        return toggle_debug(&config).await;
    }

    // Run TUI
    run_tui(config).await
}

async fn print_status(config: &AppConfig) -> Result<()> {
    let client = BackendClient::new(&config.backend_url)?;
    let status = client.fetch_status().await?;

    let class = if status.access_granted {
        "granted"
    } else if status.is_scanning {
        "scanning"
    } else {
        "idle"
    };

    let text = match class {
        "granted" => "✔ granted".to_string(),
        "scanning" => format!("scanning {}/15", status.consecutive_frames),
        _ => String::new(),
    };

    // Output waybar-compatible JSON
    let output = serde_json::json!({
        "text": text,
        "tooltip": format!("garita · {}", config.backend_url),
        "class": class,
        "alt": class,
        "access_granted": status.access_granted,
        "scanning": status.is_scanning,
        "debug": status.debug_mode,
    });

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

async fn begin_scan(config: &AppConfig) -> Result<()> {
    let client = BackendClient::new(&config.backend_url)?;
    client.start_scan().await?;
    notify("garita", "Scan started")?;
    Ok(())
}

async fn reset_backend(config: &AppConfig) -> Result<()> {
    let client = BackendClient::new(&config.backend_url)?;
    client.reset().await?;
    notify("garita", "Checkpoint reset")?;
    Ok(())
}

async fn toggle_debug(config: &AppConfig) -> Result<()> {
    let client = BackendClient::new(&config.backend_url)?;
    let enabled = client.toggle_debug().await?;
    println!("debug_mode: {}", enabled);
    Ok(())
}

async fn run_tui(config: AppConfig) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(config)?;
    app.refresh().await;

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

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.popup == Popup::None => return Ok(()),
                        KeyCode::Char('c')
                            if key.modifiers.contains(event::KeyModifiers::CONTROL) =>
                        {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key).await {
                                app.status_message = Some(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        // Periodic refresh
        let _ = app.tick().await;
    }
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("camera-video")
        .show()?;
    Ok(())
}
