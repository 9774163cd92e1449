//! Application configuration
//!
//! Loaded from a TOML file by the binaries and handed to the library as
//! explicit values. Every section falls back to its defaults when absent.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub stream: StreamConfig,
    pub opus: OpusConfig,
    pub audio: AudioConfig,
}

/// Socket addresses for the duplex channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind; receivers need one, senders may leave it unset
    pub local_addr: Option<SocketAddr>,
    /// Peer that frames are sent to
    pub remote_addr: Option<SocketAddr>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            local_addr: None,
            remote_addr: Some(SocketAddr::from(([127, 0, 0, 1], DEFAULT_UDP_PORT))),
        }
    }
}

/// Stream timing and PCM layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub frame_duration_ms: u32,
    pub prebuffer_frames: usize,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
            prebuffer_frames: DEFAULT_PREBUFFER_FRAMES,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl StreamConfig {
    /// Samples per channel in one frame
    pub fn frame_size(&self) -> usize {
        frame_size_from_ms(self.sample_rate, self.frame_duration_ms)
    }

    /// Interleaved samples in one frame
    pub fn samples_per_frame(&self) -> usize {
        self.frame_size() * self.channels as usize
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms as u64)
    }
}

/// Calculate samples per channel for a frame duration
pub fn frame_size_from_ms(sample_rate: u32, duration_ms: u32) -> usize {
    (sample_rate as u64 * duration_ms as u64 / 1000) as usize
}

/// Opus encoder application mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpusApplication {
    Voip,
    #[default]
    Audio,
    LowDelay,
}

/// Encoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpusConfig {
    pub application: OpusApplication,
    /// Target bitrate in bits per second; `None` leaves the encoder default
    pub bitrate: Option<u32>,
    pub vbr: bool,
}

impl Default for OpusConfig {
    fn default() -> Self {
        Self {
            application: OpusApplication::Audio,
            bitrate: None,
            vbr: true,
        }
    }
}

/// Playback device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name; `None` picks the host default
    pub output_device: Option<String>,
    /// Playback buffer capacity in samples
    pub buffer_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_device: None,
            buffer_capacity: PLAYBACK_BUFFER_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Platform config file location, e.g. `~/.config/opus-frame-streamer/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "opus-frame-streamer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else the platform default file if it exists,
    /// else the built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject values no stream can run with
    pub fn validate(&self) -> Result<()> {
        let stream = &self.stream;

        if stream.frame_duration_ms == 0 {
            return Err(Error::Config("frame_duration_ms must be positive".into()));
        }
        if stream.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".into()));
        }
        if !(1..=2).contains(&stream.channels) {
            return Err(Error::Config(format!(
                "Unsupported channel count: {}",
                stream.channels
            )));
        }
        if self.audio.buffer_capacity < stream.samples_per_frame() {
            return Err(Error::Config(format!(
                "Playback buffer of {} samples cannot hold one frame of {}",
                self.audio.buffer_capacity,
                stream.samples_per_frame()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stream.frame_duration_ms, 60);
        assert_eq!(config.stream.prebuffer_frames, 3);
        assert_eq!(config.stream.frame_size(), 960);
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [network]
            local_addr = "0.0.0.0:9000"

            [stream]
            prebuffer_frames = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.network.local_addr, Some("0.0.0.0:9000".parse().unwrap()));
        assert_eq!(config.stream.prebuffer_frames, 5);
        assert_eq!(config.stream.frame_duration_ms, 60);
        assert_eq!(config.opus.application, OpusApplication::Audio);
    }

    #[test]
    fn test_invalid_channels() {
        let err = AppConfig::from_toml_str("[stream]\nchannels = 6\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AppConfig::default();
        config.opus.bitrate = Some(24_000);
        config.opus.application = OpusApplication::LowDelay;

        let text = config.to_toml_string().unwrap();
        assert_eq!(AppConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_frame_size_from_ms() {
        assert_eq!(frame_size_from_ms(48000, 10), 480);
        assert_eq!(frame_size_from_ms(16000, 60), 960);
    }
}
