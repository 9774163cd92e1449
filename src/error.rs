//! Error types for the frame streamer

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Container (.p3) encode/decode errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Malformed container at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("Frame {index} too large for container: {len} bytes (max 65535)")]
    FrameTooLarge { index: usize, len: usize },
}

/// Datagram channel errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("No local or remote address supplied")]
    NoAddress,

    #[error("No remote address to send to")]
    NoRemoteAddress,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoder initialization failed: {0}")]
    EncoderInit(String),

    #[error("Decoder initialization failed: {0}")]
    DecoderInit(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(usize),
}

/// Playback subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Playback is not running")]
    NotRunning,
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_wrapping() {
        let err: Error = ContainerError::FrameTooLarge { index: 2, len: 70_000 }.into();
        assert!(matches!(err, Error::Container(ContainerError::FrameTooLarge { index: 2, .. })));
        assert!(err.to_string().contains("70000"));
    }
}
