//! Playback to an output device
//!
//! The cpal stream lives on a dedicated thread (streams are not `Send` on
//! every host). Decoded samples reach it through a lock-free
//! [`SampleBuffer`].

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::{create_shared_buffer, SharedSampleBuffer};
use crate::audio::device::find_output_device;
use crate::audio::PlaybackSink;
use crate::error::AudioError;

/// Plays interleaved `f32` samples on an output device
pub struct AudioPlayback {
    /// Output device name; `None` is the host default
    device_name: Option<String>,

    /// Whether the output thread should keep running
    running: Arc<AtomicBool>,

    /// Samples waiting for the device callback
    buffer: SharedSampleBuffer,

    /// Output thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,

    /// Stream configuration
    config: StreamConfig,
}

impl AudioPlayback {
    /// Prepare playback at a fixed rate and channel count. Nothing is opened
    /// until [`start`](Self::start).
    pub fn new(
        device_name: Option<&str>,
        sample_rate: u32,
        channels: u16,
        buffer_capacity: usize,
    ) -> Self {
        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Self {
            device_name: device_name.map(str::to_string),
            running: Arc::new(AtomicBool::new(false)),
            buffer: create_shared_buffer(buffer_capacity),
            thread_handle: None,
            error_rx: None,
            config,
        }
    }

    /// Open the device and start the output stream
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let device = find_output_device(self.device_name.as_deref())?;
        let (error_tx, error_rx) = bounded::<AudioError>(16);
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let buffer = self.buffer.clone();
        let config = self.config.clone();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                let stream = device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        buffer.fill(data);
                    },
                    move |err| {
                        let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                        running.store(false, Ordering::SeqCst);
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                    running.store(false, Ordering::SeqCst);
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Keep the stream alive while running
                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(
                    "Playback started: {}Hz, {} channels",
                    self.config.sample_rate.0,
                    self.config.channels
                );
                Ok(())
            }
            Ok(Err(e)) => {
                self.stop();
                Err(e)
            }
            Err(_) => {
                self.stop();
                Err(AudioError::StreamError("playback thread exited".to_string()))
            }
        }
    }

    /// Stop the output stream and join its thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Buffer feeding the device
    pub fn buffer(&self) -> &SharedSampleBuffer {
        &self.buffer
    }

    /// Check for stream errors
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl PlaybackSink for AudioPlayback {
    fn play(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        if !self.is_running() {
            return Err(AudioError::NotRunning);
        }
        if let Some(err) = self.check_errors() {
            return Err(err);
        }

        let accepted = self.buffer.push_slice(samples);
        if accepted < samples.len() {
            tracing::warn!("Playback buffer full, dropped {} samples", samples.len() - accepted);
        }
        Ok(())
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_before_start() {
        let mut playback = AudioPlayback::new(None, 16000, 1, 4096);

        assert!(!playback.is_running());
        assert!(matches!(playback.play(&[0.0; 16]), Err(AudioError::NotRunning)));
        assert!(playback.buffer().is_empty());
    }

    #[test]
    fn test_start_unknown_device() {
        let mut playback = AudioPlayback::new(Some("no-such-device-\u{1F50A}"), 16000, 1, 4096);

        assert!(matches!(playback.start(), Err(AudioError::DeviceNotFound(_))));
        assert!(!playback.is_running());
    }
}
