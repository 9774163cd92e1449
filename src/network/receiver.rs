//! Receive → decode → play loop

use std::net::SocketAddr;

use crate::audio::PlaybackSink;
use crate::codec::FrameDecoder;
use crate::error::Result;
use crate::network::channel::DuplexChannel;

/// Receiver statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub samples_played: u64,
}

/// Feeds every datagram on a channel through a decoder into a sink, in
/// arrival order
pub struct ReceiverPipeline<D, S> {
    decoder: D,
    sink: S,
    frame_size: usize,
    last_source: Option<SocketAddr>,
    stats: ReceiverStats,
}

impl<D: FrameDecoder, S: PlaybackSink> ReceiverPipeline<D, S> {
    /// `frame_size` is the samples per channel the decoder should produce
    pub fn new(decoder: D, sink: S, frame_size: usize) -> Self {
        Self {
            decoder,
            sink,
            frame_size,
            last_source: None,
            stats: ReceiverStats::default(),
        }
    }

    /// Run until the channel, decoder or sink fails.
    ///
    /// There is no receive timeout: a silent peer blocks here indefinitely.
    pub async fn run(&mut self, channel: &DuplexChannel) -> Result<()> {
        tracing::info!("Receiving on {}", channel.local_addr());

        loop {
            if let Err(e) = self.step(channel).await {
                tracing::error!(
                    "Receiver stopped after {} datagrams: {}",
                    self.stats.datagrams_received,
                    e
                );
                return Err(e);
            }
        }
    }

    /// Receive, decode and play exactly one datagram. Returns the number of
    /// samples handed to the sink.
    pub async fn step(&mut self, channel: &DuplexChannel) -> Result<usize> {
        let (payload, source) = channel.receive().await?;

        if self.last_source != Some(source) {
            tracing::info!("Receiving stream from {}", source);
            self.last_source = Some(source);
        }

        self.stats.datagrams_received += 1;
        self.stats.bytes_received += payload.len() as u64;

        let samples = self.decoder.decode(&payload, self.frame_size)?;
        self.sink.play(&samples)?;

        self.stats.samples_played += samples.len() as u64;
        tracing::trace!("Played {} samples from {} byte frame", samples.len(), payload.len());

        Ok(samples.len())
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Take the decoder and sink back
    pub fn into_parts(self) -> (D, S) {
        (self.decoder, self.sink)
    }
}
