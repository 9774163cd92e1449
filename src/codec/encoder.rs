//! Opus encoder wrapper

use bytes::Bytes;
use opus::{Application, Channels, Encoder};

use crate::codec::FrameEncoder;
use crate::config::{OpusApplication, OpusConfig, StreamConfig};
use crate::error::CodecError;

/// Frame durations Opus accepts, in whole milliseconds
const VALID_FRAME_MS: [u32; 8] = [5, 10, 20, 40, 60, 80, 100, 120];

/// Opus encoder wrapper
pub struct OpusEncoder {
    encoder: Encoder,
    sample_rate: u32,
    channels: u16,
    frame_size: usize,
    /// Encoding buffer (reused to avoid allocations)
    encode_buffer: Vec<u8>,
    /// Frame counter for statistics
    frames_encoded: u64,
    /// Total bytes produced
    bytes_produced: u64,
}

impl OpusEncoder {
    /// Create an encoder for the given stream layout
    pub fn new(stream: &StreamConfig, config: &OpusConfig) -> Result<Self, CodecError> {
        let channels = match stream.channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            _ => return Err(CodecError::EncoderInit(
                format!("Unsupported channel count: {}", stream.channels)
            )),
        };

        if !VALID_FRAME_MS.contains(&stream.frame_duration_ms) {
            return Err(CodecError::EncoderInit(
                format!("Unsupported frame duration: {}ms", stream.frame_duration_ms)
            ));
        }

        let application = match config.application {
            OpusApplication::Voip => Application::Voip,
            OpusApplication::Audio => Application::Audio,
            OpusApplication::LowDelay => Application::LowDelay,
        };

        let mut encoder = Encoder::new(stream.sample_rate, channels, application)
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;

        if let Some(bitrate) = config.bitrate {
            encoder.set_bitrate(opus::Bitrate::Bits(bitrate as i32))
                .map_err(|e| CodecError::EncoderInit(format!("Failed to set bitrate: {}", e)))?;
        }

        encoder.set_vbr(config.vbr)
            .map_err(|e| CodecError::EncoderInit(format!("Failed to set VBR: {}", e)))?;

        // Max Opus packet is 1275 bytes per 20ms; 120ms frames stay well under 8k
        let encode_buffer = vec![0u8; 8000];

        Ok(Self {
            encoder,
            sample_rate: stream.sample_rate,
            channels: stream.channels,
            frame_size: stream.frame_size(),
            encode_buffer,
            frames_encoded: 0,
            bytes_produced: 0,
        })
    }

    /// Encode one frame of interleaved samples
    pub fn encode_frame(&mut self, samples: &[f32]) -> Result<Bytes, CodecError> {
        let expected_len = self.samples_per_frame();
        if samples.len() != expected_len {
            return Err(CodecError::InvalidFrameSize(samples.len()));
        }

        let size = self.encoder
            .encode_float(samples, &mut self.encode_buffer)
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;

        self.frames_encoded += 1;
        self.bytes_produced += size as u64;

        Ok(Bytes::copy_from_slice(&self.encode_buffer[..size]))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel in one frame
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Interleaved samples in one frame
    pub fn samples_per_frame(&self) -> usize {
        self.frame_size * self.channels as usize
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
            average_frame_size: if self.frames_encoded > 0 {
                self.bytes_produced as f32 / self.frames_encoded as f32
            } else {
                0.0
            },
        }
    }
}

impl FrameEncoder for OpusEncoder {
    fn encode(&mut self, pcm: &[f32], frame_size: usize) -> Result<Bytes, CodecError> {
        if frame_size != self.frame_size {
            return Err(CodecError::InvalidFrameSize(frame_size));
        }
        self.encode_frame(pcm)
    }

    fn channels(&self) -> u16 {
        self.channels
    }
}

/// Encoder statistics
#[derive(Debug, Clone)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
    pub average_frame_size: f32,
}
