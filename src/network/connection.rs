use bytes::{Bytes, BytesMut};
use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

use crate::core::{ClientConfig, Result, TransportError, MAX_PACKET_SIZE};
use super::Transport;

/// One-shot UDP exchange with an NTP server.
///
/// Every call resolves the server, binds a fresh socket and waits for one
/// reply, so concurrent queries share nothing.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    /// `host:port` handed to the resolver
    server: String,
    /// Local bind address
    bind_addr: SocketAddr,
    /// Wait for the reply datagram
    timeout: Duration,
}

impl UdpTransport {
    /// Creates a transport for the server in `config`
    pub fn new(config: &ClientConfig) -> Self {
        UdpTransport {
            server: config.server_addr(),
            bind_addr: config.bind_addr,
            timeout: config.timeout,
        }
    }

    /// Returns the `host:port` this transport talks to
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Resolves the server to its first address
    async fn resolve(&self) -> Result<SocketAddr> {
        let resolve_error = |reason: String| TransportError::Resolve {
            host: self.server.clone(),
            reason,
        };

        let mut addrs = lookup_host(self.server.as_str())
            .await
            .map_err(|e| resolve_error(e.to_string()))?;

        Ok(addrs
            .next()
            .ok_or_else(|| resolve_error("no addresses returned".to_string()))?)
    }

    /// Picks a local address of the same family as `server`
    fn local_addr_for(&self, server: SocketAddr) -> SocketAddr {
        match (self.bind_addr, server) {
            (SocketAddr::V4(local), SocketAddr::V6(_)) if local.ip().is_unspecified() => {
                SocketAddr::from((Ipv6Addr::UNSPECIFIED, local.port()))
            }
            (local, _) => local,
        }
    }
}

impl Transport for UdpTransport {
    async fn send_and_receive(&self, request: Bytes) -> Result<Bytes> {
        let server = self.resolve().await?;

        let socket = UdpSocket::bind(self.local_addr_for(server))
            .await
            .map_err(TransportError::Bind)?;
        // Connecting drops datagrams from any other source
        socket
            .connect(server)
            .await
            .map_err(TransportError::Unreachable)?;

        socket
            .send(&request)
            .await
            .map_err(TransportError::Unreachable)?;
        debug!(%server, bytes = request.len(), "sent NTP request");

        let mut buf = BytesMut::zeroed(MAX_PACKET_SIZE);
        let len = match timeout(self.timeout, socket.recv(&mut buf)).await {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => return Err(TransportError::Unreachable(e).into()),
            Err(_) => {
                return Err(TransportError::Timeout {
                    server: self.server.clone(),
                    timeout: self.timeout,
                }
                .into())
            }
        };
        buf.truncate(len);
        debug!(%server, bytes = len, "received NTP response");

        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use std::net::Ipv4Addr;

    fn config_for(addr: SocketAddr, timeout: Duration) -> ClientConfig {
        ClientConfig {
            server: addr.ip().to_string(),
            port: addr.port(),
            timeout,
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        }
    }

    #[tokio::test]
    async fn test_exchange_with_echo_server() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            let mut reply = buf[..len].to_vec();
            reply.reverse();
            server.send_to(&reply, peer).await.unwrap();
        });

        let transport = UdpTransport::new(&config_for(addr, Duration::from_secs(2)));
        let reply = transport
            .send_and_receive(Bytes::from_static(&[1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(&reply[..], &[3, 2, 1]);

        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_reply_is_not_truncated_to_packet_size() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&[0u8; 49], peer).await.unwrap();
        });

        let transport = UdpTransport::new(&config_for(addr, Duration::from_secs(2)));
        let reply = transport.send_and_receive(Bytes::from_static(&[0; 48])).await.unwrap();
        assert_eq!(reply.len(), 49);

        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Bound but never answers
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();

        let transport = UdpTransport::new(&config_for(addr, Duration::from_millis(100)));
        let err = transport
            .send_and_receive(Bytes::from_static(&[0; 48]))
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "unexpected error: {err}");
        drop(server);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let closed = {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            socket.local_addr().unwrap()
        };

        let transport = UdpTransport::new(&config_for(closed, Duration::from_secs(2)));
        let err = transport
            .send_and_receive(Bytes::from_static(&[0; 48]))
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::Transport(TransportError::Unreachable(_))),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let config = ClientConfig {
            timeout: Duration::from_millis(100),
            ..ClientConfig::new("ntp.host.invalid", 123)
        };
        let transport = UdpTransport::new(&config);
        assert_eq!(transport.server(), "ntp.host.invalid:123");

        let err = transport
            .send_and_receive(Bytes::from_static(&[0; 48]))
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Transport(TransportError::Resolve { .. })),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_bind_family_follows_server() {
        let transport = UdpTransport::new(&ClientConfig::default());
        let v6: SocketAddr = "[2001:db8::1]:123".parse().unwrap();
        let v4: SocketAddr = "192.0.2.1:123".parse().unwrap();

        assert!(transport.local_addr_for(v6).is_ipv6());
        assert!(transport.local_addr_for(v4).is_ipv4());
    }
}
