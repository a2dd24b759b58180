use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use anyhow::Result;
use ragtech_core::Config;
use tokio::sync::mpsc;
use tracing::{info, warn};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

/// Open the append-only log file in `dir`, creating the directory.
fn open_log_file(dir: &Path) -> Result<File> {
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("ragtech.log"))?;
    Ok(file)
}

/// Log to a file under the data directory; the terminal belongs to the UI.
fn init_tracing() -> Result<()> {
    let file = open_log_file(&Config::data_dir()?)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // The client still runs without a writable data dir, just unlogged
    let logging = init_tracing();
    if let Err(e) = &logging {
        eprintln!("ragtech: logging disabled: {:#}", e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });

    let (voice_tx, voice_rx) = mpsc::unbounded_channel();
    let mut app = App::new(&config, voice_tx)?;
    if let Err(e) = logging {
        app.notice.get_or_insert_with(|| format!("Logging disabled: {:#}", e));
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(voice_rx);

    info!("ragtech started");

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    info!("ragtech exited");
    result
}

async fn run(app: &mut App, terminal: &mut tui::Tui, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("ragtech");
        open_log_file(&log_dir).unwrap();
        assert!(log_dir.join("ragtech.log").is_file());
    }

    #[test]
    fn test_open_log_file_reports_unwritable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        assert!(open_log_file(&blocker).is_err());
    }
}
