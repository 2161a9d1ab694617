use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hubchat_core::{AlwaysConfirm, ChatSession, Confirm, Config, HttpBackend};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;
mod view;

use app::App;
use tui::EventHandler;
use view::{ChannelObserver, PromptConfirm};

#[derive(Parser)]
#[command(name = "hubchat")]
#[command(about = "Terminal chat client for the College Application Hub counselor")]
struct Cli {
    /// Backend base URL (overrides config and HUBCHAT_URL)
    #[arg(short, long)]
    url: Option<String>,

    /// Existing conversation to list in the sidebar (repeatable)
    #[arg(short, long = "conversation", value_name = "ID")]
    conversations: Vec<i64>,

    /// Log file (defaults to hubchat.log in the local data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load config")?;
    if let Some(url) = &cli.url {
        config.apply_url_override(url);
    }

    init_logging(&config, cli.log_file)?;
    let backend = HttpBackend::new(&config.base_url);
    info!(base_url = %backend.base_url(), "starting hubchat");

    let mut events = EventHandler::new();
    let tx = events.sender();

    let confirm: Box<dyn Confirm> = if config.confirm_delete {
        Box::new(PromptConfirm::new(tx.clone()))
    } else {
        Box::new(AlwaysConfirm)
    };
    let session = ChatSession::new(backend, ChannelObserver::new(tx.clone()), confirm)
        .with_conversations(app::seed_conversations(config.conversations, &cli.conversations));

    let mut app = App::new(Arc::new(session), tx);
    app.probe_llm();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(frame, &mut app))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    if let Err(err) = Config::remember_conversations(app.session.conversations()) {
        warn!(error = %err, "could not save the conversation list");
    }
    result
}

/// The TUI owns the terminal, so logs go to a file.
fn init_logging(config: &Config, log_file: Option<PathBuf>) -> Result<()> {
    let path = match log_file {
        Some(path) => path,
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hubchat")
            .join("hubchat.log"),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let default_filter = config.log_filter.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
