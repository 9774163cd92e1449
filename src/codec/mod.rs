//! Codec seam
//!
//! The streaming core treats encoding and decoding as opaque, fallible
//! calls behind [`FrameEncoder`] and [`FrameDecoder`]. The Opus wrappers are
//! the implementations the binaries use.

pub mod decoder;
pub mod encoder;

pub use decoder::OpusDecoder;
pub use encoder::OpusEncoder;

use bytes::Bytes;

use crate::error::CodecError;

/// Turns one frame of interleaved PCM into an encoded frame
pub trait FrameEncoder {
    /// `pcm` holds `frame_size` samples per channel
    fn encode(&mut self, pcm: &[f32], frame_size: usize) -> Result<Bytes, CodecError>;

    fn channels(&self) -> u16;
}

/// Turns one encoded frame back into interleaved PCM
pub trait FrameDecoder {
    /// Returns at most `frame_size` samples per channel
    fn decode(&mut self, frame: &[u8], frame_size: usize) -> Result<Vec<f32>, CodecError>;
}
