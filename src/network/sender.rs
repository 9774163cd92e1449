//! Real-time frame pacing
//!
//! The [`Pacer`] sends frames so they leave at the rate they play back.
//! Every frame's deadline is an absolute offset from the moment the run
//! started, so a frame delayed by scheduling jitter does not shift the
//! frames after it:
//!
//! ```text
//! start
//!   │ burst (pre-buffer)     paced
//!   ├─ f0 f1 f2 ──────────── f3 ─────────── f4 ─────────── f5 ──▶
//!   0ms                      60ms           120ms          180ms
//! ```

use bytes::Bytes;
use std::time::Duration;
use tokio::time::Instant;

use crate::constants::DEFAULT_PREBUFFER_FRAMES;
use crate::error::NetworkError;
use crate::network::channel::{AbortSignal, DatagramTx, DuplexChannel};
use crate::source::FrameSource;

/// Outcome of one pacer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacerReport {
    /// Frames handed to the transport, burst included
    pub frames_sent: usize,
    /// Frames sent in the initial burst
    pub prebuffered: usize,
    /// Paced frames that missed their deadline
    pub late_frames: usize,
    /// Worst observed lateness
    pub max_lateness: Duration,
    /// Whether the abort signal cut the run short
    pub aborted: bool,
}

/// Sends frames at their nominal playback cadence
#[derive(Debug, Clone)]
pub struct Pacer {
    frame_duration: Duration,
    prebuffer_frames: usize,
}

impl Pacer {
    pub fn new(frame_duration: Duration, prebuffer_frames: usize) -> Self {
        Self {
            frame_duration,
            prebuffer_frames,
        }
    }

    /// Pacer for `frame_duration_ms` frames with the default burst of 3
    pub fn with_frame_ms(frame_duration_ms: u32) -> Self {
        Self::new(
            Duration::from_millis(frame_duration_ms as u64),
            DEFAULT_PREBUFFER_FRAMES,
        )
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn prebuffer_frames(&self) -> usize {
        self.prebuffer_frames
    }

    /// Send `frames` through `channel`.
    ///
    /// With `prebuffer`, the first `min(prebuffer_frames, frames.len())`
    /// frames go out back-to-back; the rest are paced one frame duration
    /// apart starting one frame after the burst. Without it, the first frame
    /// goes out immediately and the rest follow at one frame duration each.
    ///
    /// Returns early, without error, once the channel's abort signal is set.
    /// The flag is checked before every frame, and again after waiting for a
    /// paced frame's deadline. A send failure ends the run and is returned.
    pub async fn run<T: DatagramTx>(
        &self,
        channel: &T,
        frames: &[Bytes],
        prebuffer: bool,
    ) -> Result<PacerReport, NetworkError> {
        let start_time = Instant::now();
        let abort = channel.abort_signal();
        let mut report = PacerReport::default();

        let burst = if prebuffer {
            self.prebuffer_frames.min(frames.len())
        } else {
            0
        };

        for frame in &frames[..burst] {
            if Self::should_stop(abort, &mut report) {
                return Ok(report);
            }
            channel.send(frame).await?;
            report.frames_sent += 1;
            report.prebuffered += 1;
        }

        // The burst occupies the slot at offset 0
        let mut position = if burst > 0 { self.frame_duration } else { Duration::ZERO };

        for frame in &frames[burst..] {
            if Self::should_stop(abort, &mut report) {
                return Ok(report);
            }

            let expected_send_time = start_time + position;
            let now = Instant::now();
            if now < expected_send_time {
                tokio::time::sleep_until(expected_send_time).await;
                // The flag may have been set while we slept
                if Self::should_stop(abort, &mut report) {
                    return Ok(report);
                }
            } else if now > expected_send_time {
                let lateness = now - expected_send_time;
                report.late_frames += 1;
                report.max_lateness = report.max_lateness.max(lateness);
                tracing::trace!("Frame {} late by {:?}", report.frames_sent, lateness);
            }

            channel.send(frame).await?;
            report.frames_sent += 1;
            position += self.frame_duration;
        }

        tracing::debug!(
            "Sent {} frames ({} pre-buffered, {} late) in {:?}",
            report.frames_sent,
            report.prebuffered,
            report.late_frames,
            start_time.elapsed()
        );

        Ok(report)
    }

    fn should_stop(abort: &AbortSignal, report: &mut PacerReport) -> bool {
        if abort.is_aborted() {
            tracing::info!("Send loop aborted after {} frames", report.frames_sent);
            report.aborted = true;
            return true;
        }
        false
    }
}

/// One direction of transfer: a channel plus the sources sent through it.
///
/// The pre-buffer burst only applies to the first source of a logical
/// conversation; later sources continue at the paced rate.
pub struct StreamSession {
    channel: DuplexChannel,
    prebuffer_frames: usize,
    started_at: Instant,
    sources_sent: usize,
}

impl StreamSession {
    pub fn new(channel: DuplexChannel, prebuffer_frames: usize) -> Self {
        Self {
            channel,
            prebuffer_frames,
            started_at: Instant::now(),
            sources_sent: 0,
        }
    }

    /// Pace one source through the channel
    pub async fn send(&mut self, source: &FrameSource) -> Result<PacerReport, NetworkError> {
        let prebuffer = self.sources_sent == 0;
        let pacer = Pacer::new(source.frame_duration(), self.prebuffer_frames);

        tracing::info!(
            "Streaming {} frames ({:.2}s) to {:?}{}",
            source.len(),
            source.duration().as_secs_f64(),
            self.channel.remote_addr(),
            if prebuffer { " with pre-buffer" } else { "" }
        );

        let report = pacer.run(&self.channel, source.frames(), prebuffer).await?;
        self.sources_sent += 1;
        Ok(report)
    }

    /// Start a new conversation: re-arm the pre-buffer burst and clear any
    /// earlier abort
    pub fn new_conversation(&mut self) {
        self.sources_sent = 0;
        self.channel.abort_handle().reset();
    }

    pub fn channel(&self) -> &DuplexChannel {
        &self.channel
    }

    pub fn abort_handle(&self) -> AbortSignal {
        self.channel.abort_handle()
    }

    /// Time since the session was created
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Close the session, handing back the channel
    pub fn into_channel(self) -> DuplexChannel {
        self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Transport that records when each frame was sent
    #[derive(Default)]
    struct RecordingTx {
        abort: AbortSignal,
        sent: Mutex<Vec<(Instant, Bytes)>>,
        /// Abort once this many frames have gone out
        abort_after: Option<usize>,
        /// Fail on this frame index
        fail_at: Option<usize>,
        /// Extra delay injected while sending this frame index
        stall_at: Option<(usize, Duration)>,
    }

    impl RecordingTx {
        fn times(&self, start: Instant) -> Vec<Duration> {
            self.sent.lock().unwrap().iter().map(|(t, _)| *t - start).collect()
        }

        fn payloads(&self) -> Vec<Bytes> {
            self.sent.lock().unwrap().iter().map(|(_, b)| b.clone()).collect()
        }
    }

    impl DatagramTx for RecordingTx {
        async fn send(&self, payload: &[u8]) -> Result<(), NetworkError> {
            let index = self.sent.lock().unwrap().len();
            if self.fail_at == Some(index) {
                return Err(NetworkError::SendFailed("injected".into()));
            }
            if let Some((at, delay)) = self.stall_at {
                if at == index {
                    tokio::time::sleep(delay).await;
                }
            }

            self.sent.lock().unwrap().push((Instant::now(), Bytes::copy_from_slice(payload)));

            if self.abort_after == Some(index + 1) {
                self.abort.abort();
            }
            Ok(())
        }

        fn abort_signal(&self) -> &AbortSignal {
            &self.abort
        }
    }

    fn frames(n: usize) -> Vec<Bytes> {
        (0..n).map(|i| Bytes::from(vec![i as u8])).collect()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_frames_with_prebuffer() {
        let tx = RecordingTx::default();
        let start = Instant::now();

        let report = Pacer::with_frame_ms(60).run(&tx, &frames(5), true).await.unwrap();

        assert_eq!(report.frames_sent, 5);
        assert_eq!(report.prebuffered, 3);
        assert!(!report.aborted);
        assert_eq!(tx.times(start), vec![ms(0), ms(0), ms(0), ms(60), ms(120)]);
        assert_eq!(tx.payloads(), frames(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prebuffer_count_is_capped() {
        for n in 0..6 {
            let tx = RecordingTx::default();
            let report = Pacer::with_frame_ms(60).run(&tx, &frames(n), true).await.unwrap();

            assert_eq!(report.prebuffered, n.min(3));
            assert_eq!(report.frames_sent, n);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_prebuffer() {
        let tx = RecordingTx::default();
        let start = Instant::now();

        let report = Pacer::with_frame_ms(60).run(&tx, &frames(4), false).await.unwrap();

        assert_eq!(report.prebuffered, 0);
        assert_eq!(tx.times(start), vec![ms(0), ms(60), ms(120), ms(180)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_frames_never_early() {
        let tx = RecordingTx::default();
        let start = Instant::now();

        Pacer::new(ms(20), 2).run(&tx, &frames(10), true).await.unwrap();

        let times = tx.times(start);
        for (k, t) in times[2..].iter().enumerate() {
            assert!(*t >= ms(20) * (k as u32 + 1));
        }
        for pair in times[2..].windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_frame_does_not_drift() {
        // Frame 4 stalls 100ms inside the transport
        let tx = RecordingTx {
            stall_at: Some((4, ms(100))),
            ..Default::default()
        };
        let start = Instant::now();

        let report = Pacer::with_frame_ms(60).run(&tx, &frames(8), true).await.unwrap();

        let times = tx.times(start);
        // f3 @60, f4 due @120 but lands @220
        assert_eq!(times[3], ms(60));
        assert_eq!(times[4], ms(220));
        // f5 was due @180: sent immediately, no catch-up burst beyond it
        assert_eq!(times[5], ms(220));
        // f6 and f7 keep the original baseline
        assert_eq!(times[6], ms(240));
        assert_eq!(times[7], ms(300));

        assert_eq!(report.late_frames, 1);
        assert_eq!(report.max_lateness, ms(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_before_start() {
        let tx = RecordingTx::default();
        tx.abort.abort();

        let report = Pacer::with_frame_ms(60).run(&tx, &frames(5), true).await.unwrap();

        assert!(report.aborted);
        assert_eq!(report.frames_sent, 0);
        assert!(tx.payloads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_mid_stream() {
        let tx = RecordingTx {
            abort_after: Some(4),
            ..Default::default()
        };

        let report = Pacer::with_frame_ms(60).run(&tx, &frames(10), true).await.unwrap();

        assert!(report.aborted);
        assert_eq!(report.frames_sent, 4);
        assert_eq!(tx.payloads(), frames(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_from_other_task() {
        let tx = std::sync::Arc::new(RecordingTx::default());
        let handle = tx.abort.clone();

        let runner = {
            let tx = tx.clone();
            tokio::spawn(async move { Pacer::with_frame_ms(60).run(&*tx, &frames(20), true).await })
        };

        // Between f4 (@120ms) and f5 (@180ms)
        tokio::time::sleep(ms(150)).await;
        handle.abort();

        let report = runner.await.unwrap().unwrap();
        assert!(report.aborted);
        assert_eq!(report.frames_sent, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_propagates() {
        let tx = RecordingTx {
            fail_at: Some(3),
            ..Default::default()
        };

        let result = Pacer::with_frame_ms(60).run(&tx, &frames(5), true).await;
        assert!(matches!(result, Err(NetworkError::SendFailed(_))));
        assert_eq!(tx.payloads().len(), 3);
    }

    #[tokio::test]
    async fn test_session_prebuffers_first_source_only() {
        let receiver = DuplexChannel::open(Some("127.0.0.1:0".parse().unwrap()), None).unwrap();
        let channel = DuplexChannel::open(None, Some(receiver.local_addr())).unwrap();
        let mut session = StreamSession::new(channel, 3);

        let source = FrameSource::new(frames(2), 5);
        let first = session.send(&source).await.unwrap();
        let second = session.send(&source).await.unwrap();
        assert_eq!(first.prebuffered, 2);
        assert_eq!(second.prebuffered, 0);

        session.new_conversation();
        let third = session.send(&source).await.unwrap();
        assert_eq!(third.prebuffered, 2);

        for _ in 0..6 {
            receiver.receive().await.unwrap();
        }
        assert_eq!(session.channel().stats().datagrams_sent, 6);
    }
}
