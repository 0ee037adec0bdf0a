mod ado;
mod app;
mod cli;
mod config;
mod error;
mod event;
mod llm;
mod model;
mod sync;
mod ui;
mod util;

use std::fs::OpenOptions;
use std::io;
use std::panic;
use std::sync::Mutex;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use app::{Action, App};
use cli::CliCommand;
use config::AppConfig;

const DEFAULT_FILTER: &str = "ado_assist=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// The dashboard owns the terminal, so its logs go to a file.
fn init_file_logging() -> Result<()> {
    let dir = config::data_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join("ado-assist.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match cli::parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}\n");
            cli::print_help();
            std::process::exit(2);
        }
    };

    match command {
        Some(CliCommand::Help) => {
            cli::print_help();
            Ok(())
        }
        Some(command) => {
            let config = config::load_config()?;
            init_stderr_logging();
            cli::run(command, &config).await
        }
        None => {
            let config = config::load_config()?;
            init_file_logging()?;
            run_dashboard(config).await
        }
    }
}

async fn run_dashboard(config: AppConfig) -> Result<()> {
    // Fail on missing credentials before the terminal is taken over
    let gateway = ado::AdoClient::from_env(&config.ado)?;
    let mut assistant = llm::Assistant::new(Box::new(llm::client::SparkClient::from_env(
        &config.llm,
    )?));
    if config.debug_dump {
        assistant = assistant.with_dump(config::data_dir().join("last_response.json"));
    }

    // Set up action channel
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut app = App::new(&config, Box::new(gateway), assistant, action_tx.clone());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Spawn event reader
    let event_tx = action_tx.clone();
    tokio::spawn(async move {
        event::run_event_loop(event_tx).await;
    });

    // Main loop
    loop {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(action) = action_rx.recv().await {
            app.update(action).await;
            if app.should_quit {
                break;
            }
        } else {
            break;
        }
    }

    // Restore terminal
    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
