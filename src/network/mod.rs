//! Network subsystem for UDP frame transport

pub mod channel;
pub mod receiver;
pub mod sender;
pub mod udp;

pub use channel::{AbortSignal, ChannelStats, DatagramTx, DuplexChannel};
pub use receiver::{ReceiverPipeline, ReceiverStats};
pub use sender::{Pacer, PacerReport, StreamSession};
pub use udp::{create_socket, UdpSocket};
