//! # Opus Frame Streamer
//!
//! Streams pre-encoded Opus frames over UDP at their real playback cadence, and
//! receives such streams for immediate playback.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────── SENDER ────────────────────────────────┐
//! │                                                                        │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────────────────┐  │
//! │  │  .p3 file /  │───▶│ FrameSource  │───▶│ Pacer (network::sender)  │  │
//! │  │  raw PCM     │    │  (source)    │    │  burst of 3, then 60 ms  │  │
//! │  └──────┬───────┘    └──────────────┘    └────────────┬─────────────┘  │
//! │         │ container::decode                           │                │
//! │         │ codec::OpusEncoder                          ▼                │
//! │                                     ┌──────────────────────────────┐   │
//! │                                     │ DuplexChannel (UDP, socket2) │   │
//! │                                     │ AbortSignal checked per frame│   │
//! │                                     └──────────────┬───────────────┘   │
//! └────────────────────────────────────────────────────┼───────────────────┘
//!                                                      │ one frame per datagram
//!                                                      ▼
//! ┌─────────────────────────────── RECEIVER ───────────┼───────────────────┐
//! │                                     ┌──────────────┴───────────────┐   │
//! │                                     │ DuplexChannel::receive       │   │
//! │                                     └──────────────┬───────────────┘   │
//! │                                                    ▼                   │
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────────────────┐  │
//! │  │ cpal output  │◀───│ PlaybackSink │◀───│ ReceiverPipeline         │  │
//! │  │ thread       │    │  (audio)     │    │  FrameDecoder (codec)    │  │
//! │  └──────────────┘    └──────────────┘    └──────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod network;
pub mod source;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for encoded streams
    pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

    /// Default channel count (mono)
    pub const DEFAULT_CHANNELS: u16 = 1;

    /// Nominal playback duration of one encoded frame
    pub const DEFAULT_FRAME_DURATION_MS: u32 = 60;

    /// Frames sent back-to-back before paced delivery starts
    pub const DEFAULT_PREBUFFER_FRAMES: usize = 3;

    /// Default UDP port for audio streaming
    pub const DEFAULT_UDP_PORT: u16 = 8080;

    /// Largest UDP payload over IPv4
    pub const MAX_DATAGRAM_SIZE: usize = 65_507;

    /// Receive buffer size, large enough that no datagram is truncated
    pub const RECEIVE_BUFFER_SIZE: usize = 65_536;

    /// Playback buffer capacity in samples (2 s of 48kHz stereo)
    pub const PLAYBACK_BUFFER_CAPACITY: usize = 48000 * 2 * 2;
}
