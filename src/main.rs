//! Dev harness: uploads `file_path` from a TOML config and renders progress.
//! Press `c` or `Esc` to cancel.

use std::io::Write;
use std::time::Duration;
use anyhow::Context;
use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType};
use crossterm::{queue, style::Print};
use futures::StreamExt;
use presigned_uploader::utils::format_duration;
use presigned_uploader::{CancellationToken, PresignedUploader, UploadFile, UploadState, UploadStatus, UploaderConfig};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize, Debug)]
struct DevConfig {
    file_path: String,
    #[serde(flatten)]
    uploader: UploaderConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config: {}", config_path))?;
    let config: DevConfig = toml::from_str(&content)
        .with_context(|| format!("Invalid config: {}", config_path))?;

    let uploader = PresignedUploader::new(config.uploader).context("Invalid uploader config")?;
    let file = UploadFile::from_path(&config.file_path)
        .await
        .with_context(|| format!("Failed to open file: {}", config.file_path))?;

    if !uploader.accepts(&file.info) {
        tracing::warn!(file = %file.info.name, file_types = %uploader.config().file_types, "file type not in accepted list");
    }

    let cancel = CancellationToken::new();
    let mut stream = uploader.upload(file, cancel.clone()).await?;

    let finished = CancellationToken::new();
    let keyboard = tokio::task::spawn_blocking({
        let cancel = cancel.clone();
        let finished = finished.clone();
        move || watch_keyboard(cancel, finished)
    });

    let mut outcome: anyhow::Result<()> = Ok(());
    while let Some(state) = stream.next().await {
        match state {
            Ok(state) => {
                if let Err(err) = render(&state) {
                    outcome = Err(err);
                    break;
                }
            }
            Err(err) => {
                outcome = Err(anyhow::Error::new(err).context("Upload failed"));
                break;
            }
        }
    }

    finished.cancel();
    keyboard.await??;
    println!();

    outcome
}

/// Raw mode for as long as the guard lives
struct RawMode;

impl RawMode {
    fn enable() -> std::io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn watch_keyboard(cancel: CancellationToken, finished: CancellationToken) -> anyhow::Result<()> {
    let _raw_mode = RawMode::enable()?;

    while !finished.is_cancelled() {
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
            if kind != KeyEventKind::Press {
                continue;
            }
            if matches!(code, KeyCode::Char('c') | KeyCode::Esc) {
                cancel.cancel();
            }
        }
    }

    Ok(())
}

fn render(state: &UploadState) -> anyhow::Result<()> {
    let progress = &state.progress;
    let line = match state.status {
        UploadStatus::Uploading => format!(
            "{} {:>3}% {} eta {}",
            state.file.name,
            progress.percent_completed.unwrap_or(0),
            progress.speed_human.as_deref().unwrap_or("-"),
            progress
                .time_remaining
                .map(|secs| format_duration(Duration::from_secs(secs)))
                .unwrap_or_else(|| "-".to_string()),
        ),
        UploadStatus::Success => format!(
            "{} uploaded to {}",
            state.file.name,
            state.source.as_deref().unwrap_or_default()
        ),
        UploadStatus::Error => format!(
            "{} failed: {}",
            state.file.name,
            state.response.as_ref().map(|r| r.to_string()).unwrap_or_default()
        ),
        status => format!("{} {}", state.file.name, status),
    };

    let mut stdout = std::io::stdout();
    queue!(stdout, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line))?;
    stdout.flush()?;
    Ok(())
}
