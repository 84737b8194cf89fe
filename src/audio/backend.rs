use anyhow::Result;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Peak absolute sample value in this frame
    pub fn peak(&self) -> u32 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs() as u32)
            .max()
            .unwrap_or(0)
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Sample rate the backend should deliver
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            channels: 1,
            buffer_duration_ms: 100,
        }
    }
}

/// Audio capture backend trait
///
/// A backend is the device side of a recorder: it only produces frames.
/// Turning frames into an artifact on disk is the recorder's job.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The channel
    /// closes once the backend has been stopped.
    async fn start(&mut self, config: AudioBackendConfig) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_peak() {
        let frame = AudioFrame {
            samples: vec![100, -3000, 250, i16::MIN],
            sample_rate: 8000,
            channels: 1,
            timestamp_ms: 0,
        };

        assert_eq!(frame.peak(), 32768);
    }

    #[test]
    fn test_empty_frame_peak_is_zero() {
        let frame = AudioFrame {
            samples: Vec::new(),
            sample_rate: 8000,
            channels: 1,
            timestamp_ms: 100,
        };

        assert_eq!(frame.peak(), 0);
    }
}
