use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use rollcall::api::{ApiError, Backend, HttpBackend};
use rollcall::config::{ClientConfig, DEFAULT_API_URL, env_var};
use rollcall::console::{ConsoleCommand, DEFAULT_EXPORT_PATH, HELP, render};
use rollcall::model::{SessionId, Token};
use rollcall::services::capture::{CAPTURE_SUCCESS_MESSAGE, CaptureError, submit_presence};
use rollcall::services::push::WsPushChannel;
use rollcall::view::{InstructorView, ViewHandle};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Capture(#[from] CaptureError),
    #[error("io failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "rollcall", about = "Live attendance sessions: instructor console and student capture")]
struct Cli {
    #[arg(long, env = "ROLLCALL_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a session and run the live instructor console.
    Instructor {
        /// Session name; omit to type `create <name>` in the console.
        #[arg(long)]
        name: Option<String>,
    },
    /// Record attendance against a scanned token.
    Present {
        #[arg(long)]
        token: String,
        #[arg(long)]
        name: String,
    },
    /// Download the attendance export for a session.
    Export {
        #[arg(long)]
        session_id: i64,
        #[arg(long, default_value = DEFAULT_EXPORT_PATH)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "ignoring unreadable .env"),
    }

    let cli = Cli::parse();
    let config = ClientConfig::with_api_url(cli.api_url, env_var);

    match cli.command {
        Command::Instructor { name } => run_instructor(&config, name).await,
        Command::Present { token, name } => run_present(&config, &token, &name).await,
        Command::Export { session_id, output } => run_export(&config, SessionId(session_id), &output).await,
    }
}

// =============================================================================
// INSTRUCTOR
// =============================================================================

async fn run_instructor(config: &ClientConfig, name: Option<String>) -> Result<(), CliError> {
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(config.api_url.clone())?);
    let push = Arc::new(WsPushChannel::new(config.push_url.clone()));
    info!(api_url = %config.api_url, push_url = %push.url(), "instructor console starting");

    let view = InstructorView::spawn(config, backend, push);
    if let Some(name) = name {
        view.create(name);
    }
    eprintln!("{HELP}");

    let mut state = view.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                println!("\n{}", render(&snapshot, config));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if !run_command(&view, &line).await {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    view.close().await;
    info!("instructor console closed");
    Ok(())
}

/// Apply one console line. Returns `false` when the console should exit.
async fn run_command(view: &ViewHandle, line: &str) -> bool {
    match ConsoleCommand::parse(line) {
        ConsoleCommand::Create(name) => view.create(name),
        ConsoleCommand::Start => view.start_call(),
        ConsoleCommand::Export(path) => {
            if view.snapshot().phase.session().is_none() {
                eprintln!("no session to export yet");
            } else if let Some(bytes) = view.export().await {
                match tokio::fs::write(&path, &bytes).await {
                    Ok(()) => eprintln!("exported {} bytes to {path}", bytes.len()),
                    Err(e) => eprintln!("could not write {path}: {e}"),
                }
            }
        }
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Empty => {}
        ConsoleCommand::Unknown(line) => eprintln!("unknown command `{line}`; {HELP}"),
    }
    true
}

// =============================================================================
// STUDENT / EXPORT
// =============================================================================

async fn run_present(config: &ClientConfig, token: &str, name: &str) -> Result<(), CliError> {
    let backend = HttpBackend::new(config.api_url.clone())?;
    submit_presence(&backend, name, &Token::from(token)).await?;
    println!("{CAPTURE_SUCCESS_MESSAGE}");
    Ok(())
}

async fn run_export(config: &ClientConfig, session_id: SessionId, output: &Path) -> Result<(), CliError> {
    let backend = HttpBackend::new(config.api_url.clone())?;
    let bytes = backend.export_roster(session_id).await?;
    tokio::fs::write(output, &bytes).await?;
    eprintln!("exported {} bytes to {}", bytes.len(), output.display());
    Ok(())
}
