//! Duplex datagram channel
//!
//! A [`DuplexChannel`] wraps one UDP socket bound to a local address, a
//! remote address, or both. It is used in one direction per session: the
//! pacer only sends on it, the receiver pipeline only receives.

use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::constants::{MAX_DATAGRAM_SIZE, RECEIVE_BUFFER_SIZE};
use crate::error::NetworkError;
use crate::network::udp::{create_socket, unspecified_for, UdpSocket};

/// Cooperative stop flag observed by the pacer between frames.
///
/// Clones share the same flag, so any task holding one can stop a send
/// loop running elsewhere.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the current send loop stops before its next frame
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag so the channel can carry another stream
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sending half of a datagram transport, as seen by the pacer
pub trait DatagramTx {
    /// Send one datagram to the transport's peer
    fn send(&self, payload: &[u8]) -> impl Future<Output = Result<(), NetworkError>> + Send;

    /// Flag checked before each frame
    fn abort_signal(&self) -> &AbortSignal;
}

/// Channel traffic counters
#[derive(Debug, Default)]
struct ChannelCounters {
    datagrams_sent: AtomicU64,
    bytes_sent: AtomicU64,
    datagrams_received: AtomicU64,
    bytes_received: AtomicU64,
}

/// Snapshot of channel traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub datagrams_sent: u64,
    pub bytes_sent: u64,
    pub datagrams_received: u64,
    pub bytes_received: u64,
}

/// UDP socket with a default peer and an abort flag
pub struct DuplexChannel {
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote_addr: Option<SocketAddr>,
    abort: AbortSignal,
    counters: ChannelCounters,
    recv_buf: Mutex<Vec<u8>>,
}

impl DuplexChannel {
    /// Bind a channel. At least one address must be given; with only a
    /// remote address the socket binds the wildcard address on an
    /// ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, since the socket is
    /// registered with the runtime's reactor.
    pub fn open(
        local_addr: Option<SocketAddr>,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Self, NetworkError> {
        let bind_addr = match (local_addr, remote_addr) {
            (Some(local), _) => local,
            (None, Some(remote)) => unspecified_for(remote),
            (None, None) => return Err(NetworkError::NoAddress),
        };

        let socket = create_socket(bind_addr)?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

        tracing::info!(
            "Opened UDP channel on {} (remote: {})",
            local_addr,
            remote_addr.map_or_else(|| "none".to_string(), |a| a.to_string())
        );

        Ok(Self {
            socket,
            local_addr,
            remote_addr,
            abort: AbortSignal::new(),
            counters: ChannelCounters::default(),
            recv_buf: Mutex::new(vec![0u8; RECEIVE_BUFFER_SIZE]),
        })
    }

    /// Send one datagram to the channel's remote address
    pub async fn send(&self, payload: &[u8]) -> Result<(), NetworkError> {
        let remote = self.remote_addr.ok_or(NetworkError::NoRemoteAddress)?;
        self.send_to(payload, remote).await
    }

    /// Send one datagram to an explicit address
    pub async fn send_to(&self, payload: &[u8], addr: SocketAddr) -> Result<(), NetworkError> {
        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(NetworkError::SendFailed(format!(
                "{}: {} byte frame exceeds the {} byte datagram limit",
                addr,
                payload.len(),
                MAX_DATAGRAM_SIZE
            )));
        }

        let sent = self
            .socket
            .send_to(payload, addr)
            .await
            .map_err(|e| NetworkError::SendFailed(format!("{}: {}", addr, e)))?;

        if sent != payload.len() {
            return Err(NetworkError::SendFailed(format!(
                "{}: short send of {} of {} bytes",
                addr,
                sent,
                payload.len()
            )));
        }

        self.counters.datagrams_sent.fetch_add(1, Ordering::Relaxed);
        self.counters.bytes_sent.fetch_add(sent as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Wait for the next datagram. Each call yields exactly one datagram.
    ///
    /// The returned payload owns only its own bytes; the receive buffer is
    /// reused across calls.
    pub async fn receive(&self) -> Result<(Bytes, SocketAddr), NetworkError> {
        let mut buf = self.recv_buf.lock().await;
        let (len, source) = self
            .socket
            .recv_from(&mut buf[..])
            .await
            .map_err(|e| NetworkError::ReceiveFailed(e.to_string()))?;

        self.counters.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.counters.bytes_received.fetch_add(len as u64, Ordering::Relaxed);

        Ok((Bytes::copy_from_slice(&buf[..len]), source))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Handle to this channel's abort flag
    pub fn abort_handle(&self) -> AbortSignal {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            datagrams_sent: self.counters.datagrams_sent.load(Ordering::Relaxed),
            bytes_sent: self.counters.bytes_sent.load(Ordering::Relaxed),
            datagrams_received: self.counters.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.counters.bytes_received.load(Ordering::Relaxed),
        }
    }
}

impl DatagramTx for DuplexChannel {
    async fn send(&self, payload: &[u8]) -> Result<(), NetworkError> {
        DuplexChannel::send(self, payload).await
    }

    fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }
}

impl Drop for DuplexChannel {
    fn drop(&mut self) {
        tracing::debug!("Closing UDP channel on {}", self.local_addr);
    }
}
