//! Query orchestration module
//!
//! One query is one request/response exchange: capture t1, send the request,
//! capture t4 as soon as the reply arrives, decode it and derive delay and
//! offset. There is no retry, averaging or outlier rejection; callers wanting
//! another sample run another query.

mod result;

pub use self::result::{clock_offset, round_trip_delay, QueryResult};

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::core::{ClientConfig, Error, Result, DEFAULT_PORT, PACKET_SIZE};
use crate::network::{Transport, UdpTransport};
use crate::protocol::{NtpCodec, NtpPacket};
use crate::time::{Clock, SystemClock};

/// Runs one exchange over `transport`, reading local instants from `clock`.
///
/// A timestamp range error is raised before the transport is touched.
pub async fn query<T, C>(transport: &T, clock: &C) -> Result<QueryResult>
where
    T: Transport,
    C: Clock,
{
    let mut codec = NtpCodec::new();

    let t1 = clock.now();
    let request = NtpPacket::client_request(t1)?;
    let mut buf = BytesMut::with_capacity(PACKET_SIZE);
    codec.encode(request, &mut buf)?;

    let response = transport.send_and_receive(buf.freeze()).await?;
    let t4 = clock.now();

    let mut response = BytesMut::from(&response[..]);
    let packet = codec
        .decode(&mut response)?
        .ok_or_else(|| Error::format("empty response datagram"))?;

    let result = QueryResult::from_exchange(t1, t4, packet);
    if result.round_trip_delay < 0.0 {
        warn!(
            delay = result.round_trip_delay,
            "negative round-trip delay, server or local clock is inconsistent"
        );
    }
    debug!(
        stratum = packet.stratum,
        delay = result.round_trip_delay,
        offset = result.clock_offset,
        "NTP query complete"
    );

    Ok(result)
}

/// Queries a single NTP server.
///
/// ```no_run
/// # async fn run() -> ntp_query::Result<()> {
/// let client = ntp_query::NtpClient::new("pool.ntp.org", 123)?;
/// let result = client.query().await?;
/// println!("offset {:.3} ms", result.clock_offset * 1000.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NtpClient<T = UdpTransport, C = SystemClock> {
    config: ClientConfig,
    transport: T,
    clock: C,
}

impl NtpClient {
    /// Creates a UDP client for `server:port`
    pub fn new(server: impl Into<String>, port: u16) -> Result<Self> {
        Self::from_config(ClientConfig::new(server, port))
    }

    /// Creates a UDP client for `server` on port 123
    pub fn with_default_port(server: impl Into<String>) -> Result<Self> {
        Self::new(server, DEFAULT_PORT)
    }

    /// Creates a UDP client from a full configuration
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = UdpTransport::new(&config);
        Ok(NtpClient {
            config,
            transport,
            clock: SystemClock,
        })
    }
}

impl<T: Transport, C: Clock> NtpClient<T, C> {
    /// Creates a client over a caller-supplied transport and clock
    pub fn with_transport(config: ClientConfig, transport: T, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(NtpClient {
            config,
            transport,
            clock,
        })
    }

    /// Performs one full exchange
    pub async fn query(&self) -> Result<QueryResult> {
        debug!(server = %self.config.server, port = self.config.port, "querying NTP server");
        query(&self.transport, &self.clock).await
    }

    /// Returns the configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Queries `server:port` once over UDP
pub async fn request(server: impl Into<String>, port: u16) -> Result<QueryResult> {
    NtpClient::new(server, port)?.query().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransportError;
    use crate::protocol::{LeapIndicator, Mode};
    use crate::time::NtpTimestamp;
    use bytes::Bytes;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, UNIX_EPOCH};
    use tokio::net::UdpSocket;

    /// Hands out a fixed sequence of instants
    struct ScriptedClock(Mutex<VecDeque<DateTime<Utc>>>);

    impl ScriptedClock {
        fn new(instants: &[DateTime<Utc>]) -> Self {
            ScriptedClock(Mutex::new(instants.iter().copied().collect()))
        }
    }

    impl Clock for ScriptedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.lock().unwrap().pop_front().expect("clock script exhausted")
        }
    }

    /// Replies with a canned datagram and records the request
    struct CannedTransport {
        reply: Vec<u8>,
        requests: Mutex<Vec<Bytes>>,
        calls: AtomicUsize,
    }

    impl CannedTransport {
        fn new(reply: Vec<u8>) -> Self {
            CannedTransport {
                reply,
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for CannedTransport {
        async fn send_and_receive(&self, request: Bytes) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            Ok(Bytes::from(self.reply.clone()))
        }
    }

    struct SilentTransport;

    impl Transport for SilentTransport {
        async fn send_and_receive(&self, _request: Bytes) -> Result<Bytes> {
            Err(TransportError::Timeout {
                server: "192.0.2.1:123".to_string(),
                timeout: Duration::from_millis(10),
            }
            .into())
        }
    }

    fn at(secs: f64) -> DateTime<Utc> {
        DateTime::<Utc>::from(UNIX_EPOCH) + TimeDelta::nanoseconds((secs * 1e9).round() as i64)
    }

    fn server_reply(t1: DateTime<Utc>, t2: DateTime<Utc>, t3: DateTime<Utc>) -> Vec<u8> {
        let mut packet = NtpPacket::client_request(t1).unwrap();
        packet.leap_indicator = LeapIndicator::NoWarning;
        packet.mode = Mode::Server;
        packet.stratum = 2;
        packet.transmit_timestamp = NtpTimestamp::from_datetime(t3).unwrap();
        packet.receive_timestamp = NtpTimestamp::from_datetime(t2).unwrap();
        packet.to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_query_computes_delay_and_offset() {
        let transport = CannedTransport::new(server_reply(at(1000.0), at(1001.0), at(1001.5)));
        let clock = ScriptedClock::new(&[at(1000.0), at(1002.0)]);

        let result = query(&transport, &clock).await.unwrap();
        assert!((result.round_trip_delay - 1.5).abs() < 1e-6);
        assert!((result.clock_offset - 0.25).abs() < 1e-6);
        assert_eq!(result.local_transmit_instant, at(1000.0));
        assert_eq!(result.local_receive_instant, at(1002.0));
        assert_eq!(result.packet.mode, Mode::Server);
        assert_eq!(result.packet.originate_timestamp.to_datetime(), at(1000.0));

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), PACKET_SIZE);
        assert_eq!(requests[0][0], 0xDB);
        assert_eq!(&requests[0][24..32], &requests[0][40..48]);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_format_error() {
        let mut reply = server_reply(at(1000.0), at(1001.0), at(1001.5));
        reply.push(0);
        let transport = CannedTransport::new(reply);
        let clock = ScriptedClock::new(&[at(1000.0), at(1002.0)]);

        let err = query(&transport, &clock).await.unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[tokio::test]
    async fn test_empty_reply_is_format_error() {
        let transport = CannedTransport::new(Vec::new());
        let clock = ScriptedClock::new(&[at(1000.0), at(1002.0)]);

        let err = query(&transport, &clock).await.unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[tokio::test]
    async fn test_range_error_before_network() {
        let transport = CannedTransport::new(Vec::new());
        let clock = ScriptedClock::new(&[Utc.with_ymd_and_hms(2037, 1, 1, 0, 0, 0).unwrap()]);

        let err = query(&transport, &clock).await.unwrap_err();
        assert!(matches!(err, Error::Range(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_error_is_passed_through() {
        let clock = ScriptedClock::new(&[at(1000.0)]);
        let err = query(&SilentTransport, &clock).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_client_rejects_bad_config() {
        assert!(matches!(NtpClient::new("", 123), Err(Error::Config(_))));
        assert!(NtpClient::with_default_port("pool.ntp.org").is_ok());
        assert_eq!(
            NtpClient::with_default_port("pool.ntp.org").unwrap().config().port,
            123
        );
    }

    #[tokio::test]
    async fn test_client_against_loopback_server() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = server.local_addr().unwrap();

        // Answers with its own clock 2 seconds ahead
        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 128];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            let request = NtpPacket::from_bytes(&buf[..len]).unwrap();

            let now = Utc::now() + TimeDelta::seconds(2);
            let mut reply = request;
            reply.leap_indicator = LeapIndicator::NoWarning;
            reply.mode = Mode::Server;
            reply.stratum = 1;
            reply.reference_identifier = u32::from_be_bytes(*b"LOCL");
            reply.receive_timestamp = NtpTimestamp::from_datetime(now).unwrap();
            reply.transmit_timestamp = NtpTimestamp::from_datetime(now).unwrap();
            server.send_to(&reply.to_bytes(), peer).await.unwrap();
        });

        let client = NtpClient::new(addr.ip().to_string(), addr.port()).unwrap();
        let result = client.query().await.unwrap();
        responder.await.unwrap();

        assert_eq!(result.packet.stratum, 1);
        assert_eq!(result.packet.reference_id().to_string(), "LOCL");
        assert!(result.round_trip_delay >= 0.0);
        assert!((result.clock_offset - 2.0).abs() < 0.5, "offset {}", result.clock_offset);
    }
}
