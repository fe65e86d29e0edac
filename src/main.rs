// connwall - Connection Wall: live force-directed social graph
// A kiosk-style TUI that shows who met whom at an event, as it happens

mod app;
mod error;
mod graph;
mod render;
mod stream;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::config::{Cli, WallConfig, FRAME_INTERVAL, MAX_EVENTS_PER_FRAME};
use app::{event::handle_key_event, AppState, WallSession};
use clap::Parser;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::io;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = Cli::parse().into_config()?;
    init_logging(&config)?;
    info!(event_id = %config.event_id, toggles = ?config.toggles, "Connection wall starting");

    // Background tasks start before the terminal switches modes so a
    // runtime failure is reported on a normal screen
    let mut session = WallSession::start(&config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if config.toggles.kiosk {
        execute!(stdout, Hide)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let res = run_app(&mut terminal, &config, &mut session);

    // Tear down tasks first so nothing is dispatched into a closed UI
    session.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }
    info!("Connection wall stopped");
    Ok(())
}

fn init_logging(config: &WallConfig) -> Result<()> {
    let file = File::create(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("connwall=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    config: &WallConfig,
    session: &mut WallSession,
) -> Result<()> {
    let mut rng = rand::rng();
    let mut app = AppState::new(config, stream::now_ms());

    loop {
        let now = stream::now_ms();
        for event in session.drain(MAX_EVENTS_PER_FRAME) {
            app.apply(event, now, &mut rng);
        }
        app.on_tick(now, &mut rng);
        app.render_frame(now);
        terminal.draw(|f| ui::draw(f, &app, now))?;

        if !app.running {
            return Ok(());
        }

        if event::poll(FRAME_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key_event(&mut app, key.code);
                }
            }
        }
    }
}
