//! Lock-free sample buffer
//!
//! Single-producer single-consumer queue of interleaved `f32` samples
//! between the receiver task and the audio device callback.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lock-free ring buffer for samples
pub struct SampleBuffer {
    queue: ArrayQueue<f32>,
    overflow_count: AtomicUsize,
    underrun_count: AtomicUsize,
}

impl SampleBuffer {
    /// Create a new buffer holding up to `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            overflow_count: AtomicUsize::new(0),
            underrun_count: AtomicUsize::new(0),
        }
    }

    /// Push samples, dropping whatever does not fit.
    /// Returns the number of samples accepted.
    pub fn push_slice(&self, samples: &[f32]) -> usize {
        for (i, &sample) in samples.iter().enumerate() {
            if self.queue.push(sample).is_err() {
                let dropped = samples.len() - i;
                self.overflow_count.fetch_add(dropped, Ordering::Relaxed);
                return i;
            }
        }
        samples.len()
    }

    /// Fill `out` from the buffer, writing silence for missing samples.
    /// Returns the number of real samples written.
    pub fn fill(&self, out: &mut [f32]) -> usize {
        let mut written = 0;
        for slot in out.iter_mut() {
            match self.queue.pop() {
                Some(sample) => {
                    *slot = sample;
                    written += 1;
                }
                None => *slot = 0.0,
            }
        }

        if written < out.len() {
            self.underrun_count.fetch_add(out.len() - written, Ordering::Relaxed);
        }
        written
    }

    /// Discard everything queued
    pub fn clear(&self) {
        while self.queue.pop().is_some() {}
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Samples dropped because the buffer was full
    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Silent samples written because the buffer was empty
    pub fn underrun_count(&self) -> usize {
        self.underrun_count.load(Ordering::Relaxed)
    }

    /// Get fill level as a fraction of capacity
    pub fn fill_level(&self) -> f32 {
        self.len() as f32 / self.capacity() as f32
    }
}

/// Thread-safe handle to a sample buffer
pub type SharedSampleBuffer = Arc<SampleBuffer>;

/// Create a new shared sample buffer
pub fn create_shared_buffer(capacity: usize) -> SharedSampleBuffer {
    Arc::new(SampleBuffer::new(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_fill() {
        let buffer = SampleBuffer::new(8);

        assert_eq!(buffer.push_slice(&[0.1, 0.2, 0.3]), 3);
        assert_eq!(buffer.len(), 3);

        let mut out = [1.0f32; 5];
        assert_eq!(buffer.fill(&mut out), 3);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.0, 0.0]);
        assert_eq!(buffer.underrun_count(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_overflow() {
        let buffer = SampleBuffer::new(4);

        assert_eq!(buffer.push_slice(&[1.0; 6]), 4);
        assert_eq!(buffer.overflow_count(), 2);
        assert_eq!(buffer.fill_level(), 1.0);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_cross_thread() {
        let buffer = create_shared_buffer(1024);
        let producer = buffer.clone();

        std::thread::spawn(move || {
            producer.push_slice(&[0.5; 100]);
        })
        .join()
        .unwrap();

        let mut out = vec![0.0f32; 100];
        assert_eq!(buffer.fill(&mut out), 100);
        assert!(out.iter().all(|&s| s == 0.5));
    }
}
