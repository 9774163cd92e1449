//! Opus decoder wrapper
//!
//! Provides Opus decoding with packet loss concealment.

use opus::{Channels, Decoder};

use crate::codec::FrameDecoder;
use crate::error::CodecError;

/// Longest Opus frame (120ms) per channel at 48kHz
const MAX_FRAME_SIZE: usize = 48000 * 120 / 1000;

/// Opus decoder wrapper
pub struct OpusDecoder {
    decoder: Decoder,
    sample_rate: u32,
    channels: u16,
    frame_size: usize,
    /// Decoding buffer (reused to avoid allocations)
    decode_buffer: Vec<f32>,
    /// Frames decoded
    frames_decoded: u64,
    /// Frames lost (PLC used)
    frames_lost: u64,
}

impl OpusDecoder {
    /// Create a new Opus decoder
    pub fn new(sample_rate: u32, channels: u16, frame_size: usize) -> Result<Self, CodecError> {
        let opus_channels = match channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            _ => return Err(CodecError::DecoderInit(
                format!("Unsupported channel count: {}", channels)
            )),
        };

        let decoder = Decoder::new(sample_rate, opus_channels)
            .map_err(|e| CodecError::DecoderInit(e.to_string()))?;

        let decode_buffer = vec![0.0f32; MAX_FRAME_SIZE * channels as usize];

        Ok(Self {
            decoder,
            sample_rate,
            channels,
            frame_size,
            decode_buffer,
            frames_decoded: 0,
            frames_lost: 0,
        })
    }

    fn decode_into_buffer(
        &mut self,
        data: &[u8],
        frame_size: usize,
    ) -> Result<Vec<f32>, CodecError> {
        let limit = frame_size.min(MAX_FRAME_SIZE) * self.channels as usize;
        let samples = self.decoder
            .decode_float(data, &mut self.decode_buffer[..limit], false)
            .map_err(|e| CodecError::DecodingFailed(e.to_string()))?;

        let total_samples = samples * self.channels as usize;
        Ok(self.decode_buffer[..total_samples].to_vec())
    }

    /// Generate packet loss concealment samples for one missing frame
    pub fn decode_plc(&mut self) -> Result<Vec<f32>, CodecError> {
        let samples = self.decode_into_buffer(&[], self.frame_size)?;
        self.frames_lost += 1;
        Ok(samples)
    }

    /// Reset decoder state, e.g. when a new stream starts
    pub fn reset(&mut self) -> Result<(), CodecError> {
        self.decoder.reset_state()
            .map_err(|e| CodecError::DecoderInit(e.to_string()))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Get frame size in samples (per channel)
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Get statistics
    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            frames_decoded: self.frames_decoded,
            frames_lost: self.frames_lost,
        }
    }
}

impl FrameDecoder for OpusDecoder {
    fn decode(&mut self, frame: &[u8], frame_size: usize) -> Result<Vec<f32>, CodecError> {
        let samples = self.decode_into_buffer(frame, frame_size)?;
        self.frames_decoded += 1;
        Ok(samples)
    }
}

/// Decoder statistics
#[derive(Debug, Clone)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub frames_lost: u64,
}
