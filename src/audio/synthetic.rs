// Deterministic tone generator standing in for a capture device
//
// Produces a sine wave at a fixed frequency and level so recordings made with
// it are reproducible. Used by the CLI and the recorder tests.

use anyhow::{bail, Result};
use std::f32::consts::TAU;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

/// Synthetic audio backend
pub struct SyntheticBackend {
    frequency_hz: f32,
    level: i16,
    available: bool,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyntheticBackend {
    pub fn new(frequency_hz: f32, level: i16) -> Self {
        Self {
            frequency_hz,
            level,
            available: true,
            shutdown_tx: None,
            task: None,
        }
    }

    /// A backend whose device can never be acquired
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(440.0, i16::MAX / 4)
    }
}

#[async_trait::async_trait]
impl AudioBackend for SyntheticBackend {
    async fn start(&mut self, config: AudioBackendConfig) -> Result<mpsc::Receiver<AudioFrame>> {
        if !self.available {
            bail!("Synthetic device is unavailable");
        }
        if self.task.is_some() {
            bail!("Already capturing");
        }

        info!(
            "Starting synthetic capture ({}Hz, {} channels, {}ms buffers)",
            config.sample_rate, config.channels, config.buffer_duration_ms
        );

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let frequency_hz = self.frequency_hz;
        let level = self.level as f32;
        let buffer_ms = config.buffer_duration_ms.max(1);
        let frames_per_buffer = (config.sample_rate as u64 * buffer_ms / 1000) as usize;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(buffer_ms));
            let mut phase = 0.0f32;
            let step = TAU * frequency_hz / config.sample_rate as f32;
            let mut timestamp_ms = 0;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {}
                }

                let mut samples = Vec::with_capacity(frames_per_buffer * config.channels as usize);
                for _ in 0..frames_per_buffer {
                    let value = (phase.sin() * level) as i16;
                    phase = (phase + step) % TAU;
                    for _ in 0..config.channels {
                        samples.push(value);
                    }
                }

                let frame = AudioFrame {
                    samples,
                    sample_rate: config.sample_rate,
                    channels: config.channels,
                    timestamp_ms,
                };
                timestamp_ms += buffer_ms;

                if frame_tx.send(frame).await.is_err() {
                    debug!("Frame receiver dropped, ending synthetic capture");
                    break;
                }
            }
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await?;
            info!("Synthetic capture stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "synthetic tone"
    }
}
