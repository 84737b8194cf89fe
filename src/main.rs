use anyhow::{anyhow, bail, Context, Result};
use capture_session::{
    Config, IntervalScheduler, OutputProfile, RecordingSession, SessionController, SessionEvent,
    SessionFacade, SessionStore, SyntheticBackend, WavRecorder,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "capture-session")]
#[command(about = "Run a single audio recording session")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the synthetic device for a fixed time
    Record {
        /// Session ID (generated when omitted)
        #[arg(short, long)]
        session_id: Option<String>,

        /// Output profile: narrowband or wideband
        #[arg(short, long, default_value = "narrowband")]
        profile: OutputProfile,

        /// Seconds to record before stopping
        #[arg(long, default_value = "5")]
        seconds: u64,

        /// Copy the finished recording into this directory before cleanup
        #[arg(short, long)]
        keep: Option<String>,

        /// Print session snapshots as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Record {
            session_id,
            profile,
            seconds,
            keep,
            json,
        } => {
            let session_id = session_id.unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));
            record(&cfg, session_id, profile, seconds, keep, json).await
        }
    }
}

async fn record(
    cfg: &Config,
    session_id: String,
    profile: OutputProfile,
    seconds: u64,
    keep: Option<String>,
    json: bool,
) -> Result<()> {
    let cache_dir = cfg.recorder.cache_dir();
    info!("Temporary recordings go to {:?}", cache_dir);

    let recorder = WavRecorder::new(
        Box::new(SyntheticBackend::default()),
        cache_dir,
        cfg.recorder.profiles(),
    );
    let controller = SessionController::new(
        Box::new(recorder),
        Arc::new(IntervalScheduler::new()),
        Arc::new(SessionStore::new()),
    );
    let (facade, handle) = controller.spawn();

    let printer = tokio::spawn(print_snapshots(facade.observe(), json));
    let mut events = facade.events();

    info!("Recording session {} for {}s", session_id, seconds);
    facade.start(session_id, profile);

    tokio::select! {
        _ = sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, discarding recording");
            handle.terminate().await;
            printer.abort();
            return Ok(());
        }
        Ok(SessionEvent::StartFailed { reason, .. }) = events.recv() => {
            handle.terminate().await;
            printer.abort();
            bail!("Recording could not start: {}", reason);
        }
    }

    facade.stop();
    let outcome = finish(&facade, &mut events, keep).await;

    facade.cleanup();
    handle.terminate().await;
    printer.abort();

    outcome
}

/// Wait for the stopped session to finalize and optionally keep a copy
async fn finish(
    facade: &SessionFacade,
    events: &mut broadcast::Receiver<SessionEvent>,
    keep: Option<String>,
) -> Result<()> {
    let mut state = facade.observe();

    let finished = timeout(Duration::from_secs(5), async {
        tokio::select! {
            ready = state.wait_for(|s| s.as_ref().is_some_and(|s| s.file.is_some())) => {
                ready
                    .map(|session| session.clone())
                    .context("Session controller stopped unexpectedly")
            }
            reason = storage_failure(events) => {
                Err(anyhow!("Recording could not be finalized: {}", reason))
            }
        }
    })
    .await
    .context("Timed out waiting for the recording to finalize")??;

    if let Some(RecordingSession {
        file: Some(path),
        duration_ms,
        ..
    }) = finished
    {
        info!("Recorded {:.1}s to {:?}", duration_ms as f64 / 1000.0, path);

        if let Some(dir) = keep {
            let dir = PathBuf::from(shellexpand::tilde(&dir).into_owned());
            std::fs::create_dir_all(&dir).context("Failed to create output directory")?;

            let name = path.file_name().context("Recording has no file name")?;
            let target = dir.join(name);
            std::fs::copy(&path, &target)
                .with_context(|| format!("Failed to copy recording to {:?}", target))?;
            info!("Kept recording at {:?}", target);
        }
    }

    Ok(())
}

/// Resolve with the reason of the next storage failure
async fn storage_failure(events: &mut broadcast::Receiver<SessionEvent>) -> String {
    loop {
        match events.recv().await {
            Ok(SessionEvent::StorageFailed { reason, .. }) => return reason,
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => std::future::pending().await,
        }
    }
}

async fn print_snapshots(mut state: watch::Receiver<Option<RecordingSession>>, json: bool) {
    while state.changed().await.is_ok() {
        let snapshot = state.borrow_and_update().clone();

        if json {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize snapshot: {}", e),
            }
        } else if let Some(session) = snapshot {
            print!(
                "\r{} {:>6.1}s  level {:>5}",
                session.session_id,
                session.duration_ms as f64 / 1000.0,
                session.amplitude
            );
            std::io::Write::flush(&mut std::io::stdout()).ok();
        }
    }
}
