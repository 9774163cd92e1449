//! UDP socket construction

use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::error::NetworkError;

pub use tokio::net::UdpSocket;

/// Create a non-blocking UDP socket bound to `addr` with address reuse
/// enabled, so a restarted process can rebind immediately.
///
/// Must be called from within a tokio runtime.
pub fn create_socket(addr: SocketAddr) -> Result<UdpSocket, NetworkError> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(format!("socket(): {}", e)))?;

    socket
        .set_reuse_address(true)
        .map_err(|e| NetworkError::BindFailed(format!("SO_REUSEADDR: {}", e)))?;

    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket
        .set_reuse_port(true)
        .map_err(|e| NetworkError::BindFailed(format!("SO_REUSEPORT: {}", e)))?;

    socket
        .set_nonblocking(true)
        .map_err(|e| NetworkError::BindFailed(format!("O_NONBLOCK: {}", e)))?;

    socket
        .bind(&addr.into())
        .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
        .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))
}

/// Wildcard address of the same family as `remote`, on an ephemeral port
pub fn unspecified_for(remote: SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_socket_ephemeral() {
        let socket = create_socket("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = socket.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        // A plain std socket does not opt into reuse, so the second bind fails
        let holder = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = holder.local_addr().unwrap();

        let result = create_socket(addr);
        assert!(matches!(result, Err(NetworkError::BindFailed(_))));
    }

    #[test]
    fn test_unspecified_for() {
        let v4 = unspecified_for("10.0.0.1:5000".parse().unwrap());
        assert_eq!(v4, "0.0.0.0:0".parse().unwrap());

        let v6 = unspecified_for("[::1]:5000".parse().unwrap());
        assert_eq!(v6, "[::]:0".parse().unwrap());
    }
}
