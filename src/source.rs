//! Frame sources
//!
//! A [`FrameSource`] is the ordered list of encoded frames one pacer run
//! consumes, plus the nominal duration each frame covers. It is built either
//! from a `.p3` container or by pushing PCM through a [`FrameEncoder`].

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;

use crate::codec::FrameEncoder;
use crate::container;
use crate::error::{Error, Result};

/// Ordered encoded frames with a fixed per-frame duration
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSource {
    frames: Vec<Bytes>,
    frame_duration_ms: u32,
}

impl FrameSource {
    pub fn new(frames: Vec<Bytes>, frame_duration_ms: u32) -> Self {
        Self {
            frames,
            frame_duration_ms,
        }
    }

    /// Frames stored in container bytes
    pub fn from_container(data: &[u8], frame_duration_ms: u32) -> Result<Self> {
        let decoded = container::decode_with_duration(data, frame_duration_ms)?;
        Ok(Self::new(decoded.frames, frame_duration_ms))
    }

    /// Frames stored in a container file
    pub fn from_file(path: impl AsRef<Path>, frame_duration_ms: u32) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let source = Self::from_container(&data, frame_duration_ms)?;

        tracing::info!(
            "Loaded {} frames ({:.2}s) from {}",
            source.len(),
            source.duration().as_secs_f64(),
            path.display()
        );

        Ok(source)
    }

    /// Encode interleaved PCM frame by frame.
    ///
    /// `frame_size` is samples per channel. A final partial frame is
    /// zero-padded before encoding.
    pub fn from_pcm<E: FrameEncoder>(
        encoder: &mut E,
        pcm: &[f32],
        frame_size: usize,
        frame_duration_ms: u32,
    ) -> Result<Self> {
        let chunk_len = frame_size * encoder.channels() as usize;
        if chunk_len == 0 {
            return Err(Error::Config("frame size must be positive".into()));
        }

        let mut frames = Vec::with_capacity(pcm.len().div_ceil(chunk_len));
        let mut padded = Vec::new();

        for chunk in pcm.chunks(chunk_len) {
            let frame = if chunk.len() < chunk_len {
                padded.clear();
                padded.extend_from_slice(chunk);
                padded.resize(chunk_len, 0.0);
                encoder.encode(&padded, frame_size)?
            } else {
                encoder.encode(chunk, frame_size)?
            };
            frames.push(frame);
        }

        tracing::debug!("Encoded {} PCM samples into {} frames", pcm.len(), frames.len());
        Ok(Self::new(frames, frame_duration_ms))
    }

    /// Split raw PCM bytes into unencoded frames of `frame_bytes` each,
    /// zero-padding the last one
    pub fn from_raw_pcm(pcm: &[u8], frame_bytes: usize, frame_duration_ms: u32) -> Result<Self> {
        if frame_bytes == 0 {
            return Err(Error::Config("frame size must be positive".into()));
        }

        let frames = pcm
            .chunks(frame_bytes)
            .map(|chunk| {
                let mut frame = chunk.to_vec();
                frame.resize(frame_bytes, 0);
                Bytes::from(frame)
            })
            .collect();

        Ok(Self::new(frames, frame_duration_ms))
    }

    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_duration_ms(&self) -> u32 {
        self.frame_duration_ms
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms as u64)
    }

    /// Nominal playback length of all frames
    pub fn duration(&self) -> Duration {
        self.frame_duration() * self.frames.len() as u32
    }

    /// Write the frames out as a container file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        container::write_file(path, &self.frames)
    }
}

/// Convert signed 16-bit little-endian PCM to `f32` in `[-1.0, 1.0)`.
///
/// A trailing odd byte is ignored.
pub fn samples_from_s16le(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;

    /// Encoder that records frame lengths and emits the first sample's bits
    struct RecordingEncoder {
        channels: u16,
        seen: Vec<Vec<f32>>,
    }

    impl FrameEncoder for RecordingEncoder {
        fn encode(
            &mut self,
            pcm: &[f32],
            frame_size: usize,
        ) -> std::result::Result<Bytes, CodecError> {
            if pcm.len() != frame_size * self.channels as usize {
                return Err(CodecError::InvalidFrameSize(pcm.len()));
            }
            self.seen.push(pcm.to_vec());
            Ok(Bytes::from(vec![self.seen.len() as u8]))
        }

        fn channels(&self) -> u16 {
            self.channels
        }
    }

    #[test]
    fn test_from_container() {
        let data = [0x00, 0x00, 0x00, 0x03, 0xAA, 0xBB, 0xCC];

        let source = FrameSource::from_container(&data, 60).unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(source.duration(), Duration::from_millis(60));
    }

    #[test]
    fn test_malformed_container() {
        let err = FrameSource::from_container(&[0x00, 0x00, 0x00, 0x09, 0x01], 60).unwrap_err();
        assert!(matches!(err, Error::Container(_)));
    }

    #[test]
    fn test_pcm_last_frame_padded() {
        let mut encoder = RecordingEncoder { channels: 2, seen: Vec::new() };
        let pcm = vec![0.5f32; 2 * 4 + 3];

        let source = FrameSource::from_pcm(&mut encoder, &pcm, 4, 60).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(encoder.seen[1].len(), 8);
        assert_eq!(&encoder.seen[1][..3], &[0.5, 0.5, 0.5]);
        assert!(encoder.seen[1][3..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_pcm_exact_frames() {
        let mut encoder = RecordingEncoder { channels: 1, seen: Vec::new() };
        let source = FrameSource::from_pcm(&mut encoder, &[0.1; 30], 10, 60).unwrap();

        assert_eq!(source.len(), 3);
        assert_eq!(source.duration(), Duration::from_millis(180));
    }

    #[test]
    fn test_raw_pcm() {
        let source = FrameSource::from_raw_pcm(&[1, 2, 3, 4, 5], 2, 60).unwrap();

        assert_eq!(source.len(), 3);
        assert_eq!(&source.frames()[2][..], &[5, 0]);
        assert!(FrameSource::from_raw_pcm(&[1], 0, 60).is_err());
    }

    #[test]
    fn test_raw_pcm_stream_frames() {
        // 60ms of 16kHz mono s16le per frame, last one padded
        let stream = crate::config::StreamConfig::default();
        let frame_bytes = stream.samples_per_frame() * 2;
        let pcm = vec![0x7fu8; frame_bytes * 2 + 10];

        let source =
            FrameSource::from_raw_pcm(&pcm, frame_bytes, stream.frame_duration_ms).unwrap();

        assert_eq!(frame_bytes, 1920);
        assert_eq!(source.len(), 3);
        assert!(source.frames().iter().all(|f| f.len() == frame_bytes));
        assert!(source.frames()[2][10..].iter().all(|&b| b == 0));
        assert_eq!(source.duration(), Duration::from_millis(180));
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("p3-source-{}.p3", std::process::id()));
        let frames = vec![Bytes::from_static(b"ab"), Bytes::from_static(b"c")];
        let source = FrameSource::new(frames, 60);

        source.save(&path).unwrap();
        assert_eq!(FrameSource::from_file(&path, 60).unwrap(), source);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_s16le_conversion() {
        let samples = samples_from_s16le(&[0x00, 0x80, 0x00, 0x40, 0xFF]);
        assert_eq!(samples, vec![-1.0, 0.5]);
    }
}
