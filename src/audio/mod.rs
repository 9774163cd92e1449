//! Audio playback module
//!
//! The receiver pipeline only needs a [`PlaybackSink`]; [`AudioPlayback`]
//! is the cpal-backed implementation used by the receiver binary.

pub mod buffer;
pub mod device;
pub mod playback;

pub use buffer::{create_shared_buffer, SampleBuffer, SharedSampleBuffer};
pub use device::{find_output_device, list_output_devices, AudioDeviceInfo};
pub use playback::AudioPlayback;

use crate::error::AudioError;

/// Consumer of decoded, interleaved samples at a fixed rate and channel
/// count. Implementations do their own buffering.
pub trait PlaybackSink {
    fn play(&mut self, samples: &[f32]) -> Result<(), AudioError>;
}

impl<S: PlaybackSink + ?Sized> PlaybackSink for Box<S> {
    fn play(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        (**self).play(samples)
    }
}
