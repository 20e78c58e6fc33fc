//! PROXY protocol listener.
//!
//! Sits behind a TCP load balancer that prepends a PROXY header (v1 text or
//! v2 binary) carrying the original client address. The header is consumed
//! before HTTP starts and its source address becomes the connection's
//! `ConnectInfo`.
//!
//! Wire formats (HAProxy PROXY protocol):
//! - v1: `PROXY TCP4|TCP6|UNKNOWN <src> <dst> <sport> <dport>\r\n`, at most
//!   107 bytes
//! - v2: 12 byte signature, version/command, family/transport, 2 byte length,
//!   then addresses and optional TLVs

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

use crate::net::listener::ListenerError;

/// PROXY protocol v2 signature (12 bytes).
const V2_SIGNATURE: [u8; 12] = [
    0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
];

/// Longest legal v1 header, CRLF included.
const V1_MAX_LEN: usize = 107;

const COMMAND_LOCAL: u8 = 0x0;
const COMMAND_PROXY: u8 = 0x1;

/// Address family AF_INET / AF_INET6 over STREAM.
const TCP_OVER_IPV4: u8 = 0x11;
const TCP_OVER_IPV6: u8 = 0x21;

/// Decoded PROXY header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyHeader {
    /// The balancer relayed a client connection.
    Proxied {
        source: SocketAddr,
        destination: SocketAddr,
    },
    /// Health check or unknown transport: use the socket's own peer address.
    Local,
}

impl ProxyHeader {
    /// The client address to report, falling back to the transport peer.
    pub fn client_addr(&self, peer: SocketAddr) -> SocketAddr {
        match self {
            ProxyHeader::Proxied { source, .. } => *source,
            ProxyHeader::Local => peer,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProxyHeaderError {
    #[error("connection closed before PROXY header: {0}")]
    Io(#[from] io::Error),

    #[error("missing PROXY protocol signature")]
    MissingSignature,

    #[error("malformed PROXY header: {0}")]
    Malformed(&'static str),

    #[error("PROXY header not received within {0:?}")]
    Timeout(Duration),
}

/// Read and consume a PROXY header from the front of `reader`.
///
/// Reads exactly the header's bytes, leaving the application stream intact.
pub async fn read_header<R>(reader: &mut R) -> Result<ProxyHeader, ProxyHeaderError>
where
    R: AsyncRead + Unpin,
{
    // Shortest v1 header ("PROXY UNKNOWN\r\n") is longer than the v2 signature.
    let mut prefix = [0u8; 12];
    reader.read_exact(&mut prefix).await?;

    if prefix == V2_SIGNATURE {
        let mut fixed = [0u8; 4];
        reader.read_exact(&mut fixed).await?;
        let len = u16::from_be_bytes([fixed[2], fixed[3]]) as usize;
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).await?;
        return parse_v2(fixed[0], fixed[1], &body);
    }

    if !prefix.starts_with(b"PROXY ") {
        return Err(ProxyHeaderError::MissingSignature);
    }

    let mut line = prefix.to_vec();
    while !line.ends_with(b"\r\n") {
        if line.len() >= V1_MAX_LEN {
            return Err(ProxyHeaderError::Malformed("v1 header too long"));
        }
        line.push(reader.read_u8().await?);
    }

    let line = std::str::from_utf8(&line[..line.len() - 2])
        .map_err(|_| ProxyHeaderError::Malformed("v1 header is not ASCII"))?;
    parse_v1(line)
}

/// Parse a v1 header line without its trailing CRLF.
fn parse_v1(line: &str) -> Result<ProxyHeader, ProxyHeaderError> {
    let mut parts = line.split(' ');
    if parts.next() != Some("PROXY") {
        return Err(ProxyHeaderError::MissingSignature);
    }

    let protocol = parts
        .next()
        .ok_or(ProxyHeaderError::Malformed("missing protocol"))?;
    if protocol == "UNKNOWN" {
        return Ok(ProxyHeader::Local);
    }

    let fields: Vec<&str> = parts.collect();
    let &[src_ip, dst_ip, src_port, dst_port] = fields.as_slice() else {
        return Err(ProxyHeaderError::Malformed("expected four address fields"));
    };

    let parse_ip = |raw: &str| -> Result<IpAddr, ProxyHeaderError> {
        let ip: IpAddr = raw
            .parse()
            .map_err(|_| ProxyHeaderError::Malformed("invalid address"))?;
        match (protocol, ip) {
            ("TCP4", IpAddr::V4(_)) | ("TCP6", IpAddr::V6(_)) => Ok(ip),
            ("TCP4" | "TCP6", _) => Err(ProxyHeaderError::Malformed("address family mismatch")),
            _ => Err(ProxyHeaderError::Malformed("unknown protocol")),
        }
    };
    let parse_port = |raw: &str| -> Result<u16, ProxyHeaderError> {
        raw.parse()
            .map_err(|_| ProxyHeaderError::Malformed("invalid port"))
    };

    Ok(ProxyHeader::Proxied {
        source: SocketAddr::new(parse_ip(src_ip)?, parse_port(src_port)?),
        destination: SocketAddr::new(parse_ip(dst_ip)?, parse_port(dst_port)?),
    })
}

/// Parse the part of a v2 header that follows the signature.
fn parse_v2(
    version_command: u8,
    family_protocol: u8,
    body: &[u8],
) -> Result<ProxyHeader, ProxyHeaderError> {
    if version_command >> 4 != 2 {
        return Err(ProxyHeaderError::Malformed("unsupported version"));
    }

    match version_command & 0x0F {
        COMMAND_LOCAL => return Ok(ProxyHeader::Local),
        COMMAND_PROXY => {}
        _ => return Err(ProxyHeaderError::Malformed("unknown command")),
    }

    match family_protocol {
        TCP_OVER_IPV4 => {
            if body.len() < 12 {
                return Err(ProxyHeaderError::Malformed("short IPv4 address block"));
            }
            let src_ip = Ipv4Addr::new(body[0], body[1], body[2], body[3]);
            let dst_ip = Ipv4Addr::new(body[4], body[5], body[6], body[7]);
            let src_port = u16::from_be_bytes([body[8], body[9]]);
            let dst_port = u16::from_be_bytes([body[10], body[11]]);
            Ok(ProxyHeader::Proxied {
                source: SocketAddr::new(IpAddr::V4(src_ip), src_port),
                destination: SocketAddr::new(IpAddr::V4(dst_ip), dst_port),
            })
        }
        TCP_OVER_IPV6 => {
            if body.len() < 36 {
                return Err(ProxyHeaderError::Malformed("short IPv6 address block"));
            }
            let mut src = [0u8; 16];
            let mut dst = [0u8; 16];
            src.copy_from_slice(&body[0..16]);
            dst.copy_from_slice(&body[16..32]);
            let src_port = u16::from_be_bytes([body[32], body[33]]);
            let dst_port = u16::from_be_bytes([body[34], body[35]]);
            Ok(ProxyHeader::Proxied {
                source: SocketAddr::new(IpAddr::V6(Ipv6Addr::from(src)), src_port),
                destination: SocketAddr::new(IpAddr::V6(Ipv6Addr::from(dst)), dst_port),
            })
        }
        // UNSPEC, UDP and unix sockets carry nothing usable for a TCP client.
        _ => Ok(ProxyHeader::Local),
    }
}

/// Pause after a resource error (fd or buffer exhaustion) before accepting again.
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// How an accept error affects the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptFault {
    /// The peer went away before we got it; try the next one.
    Connection,
    /// The process is short on resources; back off and retry.
    Transient,
    /// The listening socket itself is unusable.
    Fatal,
}

fn classify_accept_error(e: &io::Error) -> AcceptFault {
    match e.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut => AcceptFault::Connection,
        io::ErrorKind::InvalidInput | io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied => {
            AcceptFault::Fatal
        }
        _ => AcceptFault::Transient,
    }
}

/// A TCP listener whose peers must open with a PROXY header.
pub struct ProxyProtocolListener {
    inner: TcpListener,
    header_timeout: Duration,
}

impl ProxyProtocolListener {
    pub async fn bind(addr: SocketAddr, header_timeout: Duration) -> Result<Self, ListenerError> {
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            inner,
            header_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accept connections until the socket fails.
    ///
    /// Each connection gets its own task: header read, then HTTP/1.1 or
    /// HTTP/2 served by `router`. A bad header drops only that connection.
    /// Aborted connections are skipped and resource exhaustion backs off;
    /// only an error on the listening socket itself ends the listener.
    pub async fn serve(self, router: Router) -> Result<(), ListenerError> {
        loop {
            let (mut stream, peer) = match self.inner.accept().await {
                Ok(accepted) => accepted,
                Err(e) => match classify_accept_error(&e) {
                    AcceptFault::Connection => continue,
                    AcceptFault::Transient => {
                        tracing::warn!(error = %e, backoff = ?ACCEPT_BACKOFF, "Accept failed, retrying");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                    AcceptFault::Fatal => return Err(ListenerError::Accept(e)),
                },
            };
            let router = router.clone();
            let header_timeout = self.header_timeout;

            tokio::spawn(async move {
                let header = match tokio::time::timeout(header_timeout, read_header(&mut stream)).await
                {
                    Ok(Ok(header)) => header,
                    Ok(Err(e)) => {
                        tracing::debug!(peer = %peer, error = %e, "Rejected PROXY connection");
                        return;
                    }
                    Err(_) => {
                        let e = ProxyHeaderError::Timeout(header_timeout);
                        tracing::debug!(peer = %peer, error = %e, "Rejected PROXY connection");
                        return;
                    }
                };
                let client = header.client_addr(peer);

                let service = tower::service_fn(move |mut request: Request<Incoming>| {
                    request.extensions_mut().insert(ConnectInfo(client));
                    router.clone().oneshot(request)
                });

                let builder = Builder::new(TokioExecutor::new());
                if let Err(e) = builder
                    .serve_connection(TokioIo::new(stream), TowerToHyperService::new(service))
                    .await
                {
                    tracing::debug!(client = %client, error = %e, "Connection ended with error");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v2_header(command: u8, family: u8, addresses: &[u8]) -> Vec<u8> {
        let mut buf = V2_SIGNATURE.to_vec();
        buf.push(0x20 | command);
        buf.push(family);
        buf.extend_from_slice(&(addresses.len() as u16).to_be_bytes());
        buf.extend_from_slice(addresses);
        buf
    }

    #[tokio::test]
    async fn reads_v1_tcp4() {
        let mut input: &[u8] = b"PROXY TCP4 203.0.113.9 10.0.0.1 56324 443\r\nGET / HTTP/1.1\r\n";
        let header = read_header(&mut input).await.unwrap();

        assert_eq!(
            header,
            ProxyHeader::Proxied {
                source: "203.0.113.9:56324".parse().unwrap(),
                destination: "10.0.0.1:443".parse().unwrap(),
            }
        );
        assert_eq!(input, b"GET / HTTP/1.1\r\n");
    }

    #[tokio::test]
    async fn reads_v1_tcp6_and_unknown() {
        let mut input: &[u8] = b"PROXY TCP6 2001:db8::1 2001:db8::2 4000 80\r\n";
        let header = read_header(&mut input).await.unwrap();
        assert_eq!(
            header.client_addr("127.0.0.1:1".parse().unwrap()),
            "[2001:db8::1]:4000".parse().unwrap()
        );

        let mut input: &[u8] = b"PROXY UNKNOWN\r\n";
        let peer = "127.0.0.1:5555".parse().unwrap();
        assert_eq!(read_header(&mut input).await.unwrap().client_addr(peer), peer);
    }

    #[tokio::test]
    async fn rejects_bad_v1() {
        let mut input: &[u8] = b"PROXY TCP4 2001:db8::1 10.0.0.1 1 2\r\n";
        assert!(matches!(
            read_header(&mut input).await,
            Err(ProxyHeaderError::Malformed(_))
        ));

        let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        assert!(matches!(
            read_header(&mut input).await,
            Err(ProxyHeaderError::MissingSignature)
        ));

        let long = format!("PROXY TCP4 {}\r\n", "1".repeat(120));
        let mut input = long.as_bytes();
        assert!(matches!(
            read_header(&mut input).await,
            Err(ProxyHeaderError::Malformed("v1 header too long"))
        ));
    }

    #[tokio::test]
    async fn reads_v2_ipv4_and_leaves_payload() {
        let mut addresses = vec![192, 168, 1, 1, 10, 0, 0, 1];
        addresses.extend_from_slice(&12345u16.to_be_bytes());
        addresses.extend_from_slice(&443u16.to_be_bytes());
        let mut buf = v2_header(COMMAND_PROXY, TCP_OVER_IPV4, &addresses);
        buf.extend_from_slice(b"payload");

        let mut input = &buf[..];
        let header = read_header(&mut input).await.unwrap();
        assert_eq!(
            header,
            ProxyHeader::Proxied {
                source: "192.168.1.1:12345".parse().unwrap(),
                destination: "10.0.0.1:443".parse().unwrap(),
            }
        );
        assert_eq!(input, b"payload");
    }

    #[tokio::test]
    async fn reads_v2_ipv6_with_tlvs() {
        let src: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let dst: Ipv6Addr = "2001:db8::2".parse().unwrap();
        let mut addresses = src.octets().to_vec();
        addresses.extend_from_slice(&dst.octets());
        addresses.extend_from_slice(&4000u16.to_be_bytes());
        addresses.extend_from_slice(&443u16.to_be_bytes());
        // A trailing TLV (type, length, value) must be skipped.
        addresses.extend_from_slice(&[0x04, 0x00, 0x01, 0xFF]);

        let buf = v2_header(COMMAND_PROXY, TCP_OVER_IPV6, &addresses);
        let mut input = &buf[..];
        let header = read_header(&mut input).await.unwrap();
        assert_eq!(
            header.client_addr("127.0.0.1:1".parse().unwrap()),
            "[2001:db8::1]:4000".parse().unwrap()
        );
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn v2_local_uses_peer() {
        let buf = v2_header(COMMAND_LOCAL, 0x00, &[]);
        let mut input = &buf[..];
        assert_eq!(read_header(&mut input).await.unwrap(), ProxyHeader::Local);
    }

    #[tokio::test]
    async fn truncated_header_is_io_error() {
        let mut input: &[u8] = b"PROXY TCP4 1.2";
        assert!(matches!(
            read_header(&mut input).await,
            Err(ProxyHeaderError::Io(_))
        ));
    }

    #[test]
    fn accept_errors_are_classified() {
        let fault = |kind| classify_accept_error(&io::Error::from(kind));
        assert_eq!(fault(io::ErrorKind::ConnectionAborted), AcceptFault::Connection);
        assert_eq!(fault(io::ErrorKind::ConnectionReset), AcceptFault::Connection);
        assert_eq!(fault(io::ErrorKind::InvalidInput), AcceptFault::Fatal);
        assert_eq!(fault(io::ErrorKind::OutOfMemory), AcceptFault::Transient);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn descriptor_exhaustion_backs_off() {
        // EMFILE and ENFILE
        for errno in [24, 23] {
            assert_eq!(
                classify_accept_error(&io::Error::from_raw_os_error(errno)),
                AcceptFault::Transient
            );
        }
    }
}
