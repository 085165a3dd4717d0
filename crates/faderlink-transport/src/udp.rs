use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use faderlink_osc::{decode, Message};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::link::OscLink;
use crate::retry::{retry_on_addr_in_use, RetryPolicy};

/// Receive buffer size. One console reply always fits; this is not a
/// streaming read.
pub const RECV_BUFFER_SIZE: usize = 512;

/// Default deadline for writing one datagram.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(4);

/// Default deadline for the reply half of an inquiry.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(4);

/// std rejects a zero socket timeout, so deadlines are clamped to this.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Configuration for dialing a console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialConfig {
    /// Local interface to bind. Default: all interfaces.
    pub bind_host: IpAddr,
    /// Retry policy when the local port is already taken.
    pub retry: RetryPolicy,
    /// Write deadline for each datagram.
    pub write_timeout: Duration,
    /// Read deadline used by [`OscSocket::inquire`].
    pub read_timeout: Duration,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            retry: RetryPolicy::default(),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Resolve a `host:port` string to the first matching socket address.
pub fn resolve_remote(remote: &str) -> Result<SocketAddr> {
    let remote = remote.trim();
    let mut addrs = remote
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            addr: remote.to_string(),
            source,
        })?;
    addrs.next().ok_or_else(|| TransportError::Resolve {
        addr: remote.to_string(),
        source: std::io::Error::new(ErrorKind::NotFound, "no addresses found"),
    })
}

/// A UDP socket bound to a local port and connected to one console.
///
/// Sends and inquiries are serialized through an internal exchange lock, so
/// the socket can be shared across threads without two request/reply pairs
/// interleaving on the wire.
pub struct OscSocket {
    socket: UdpSocket,
    exchange: Mutex<()>,
    remote: SocketAddr,
    config: DialConfig,
}

impl OscSocket {
    /// Dial `remote` from `local_port` with default configuration.
    pub fn dial(local_port: u16, remote: &str) -> Result<Self> {
        Self::dial_with_config(local_port, remote, &DialConfig::default())
    }

    /// Dial with explicit configuration.
    ///
    /// If the local port is in use, the next port is tried, up to the retry
    /// policy's attempt count.
    pub fn dial_with_config(local_port: u16, remote: &str, config: &DialConfig) -> Result<Self> {
        let remote = resolve_remote(remote)?;
        retry_on_addr_in_use(
            &config.retry,
            local_port,
            |port| Self::dial_once(port, remote, config),
            std::thread::sleep,
        )
    }

    fn dial_once(port: u16, remote: SocketAddr, config: &DialConfig) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(config.bind_host, port))
            .map_err(|source| TransportError::Bind { port, source })?;
        socket
            .connect(remote)
            .map_err(|source| TransportError::Connect {
                addr: remote,
                source,
            })?;

        info!(local = ?socket.local_addr().ok(), %remote, "dialed console");

        Ok(Self {
            socket,
            exchange: Mutex::new(()),
            remote,
            config: config.clone(),
        })
    }

    /// Encode and write one datagram.
    pub fn send(&self, message: &Message) -> Result<()> {
        let _guard = self.lock_exchange();
        self.send_locked(message)
    }

    /// Read and decode one datagram, waiting at most `timeout`.
    pub fn receive(&self, timeout: Duration) -> Result<Message> {
        let _guard = self.lock_exchange();
        self.receive_locked(timeout)
    }

    /// Send `request` and wait for the datagram that answers it.
    ///
    /// Replies carry no correlation token. Datagrams already queued before the
    /// send (late answers to inquiries that timed out) are discarded, and so
    /// is any reply whose address differs from the request's, until the read
    /// deadline expires.
    pub fn inquire(&self, request: &Message) -> Result<Message> {
        let _guard = self.lock_exchange();
        self.drain_locked()?;
        self.send_locked(request)?;

        let timeout = self.config.read_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout(timeout));
            }
            let reply = match self.receive_locked(remaining) {
                Err(TransportError::Timeout(_)) => return Err(TransportError::Timeout(timeout)),
                other => other?,
            };
            if reply.address() == request.address() {
                return Ok(reply);
            }
            debug!(
                request = %String::from_utf8_lossy(request.address()),
                reply = %String::from_utf8_lossy(reply.address()),
                "discarding reply to another request"
            );
        }
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    /// Remote console address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    pub fn config(&self) -> &DialConfig {
        &self.config
    }

    fn lock_exchange(&self) -> MutexGuard<'_, ()> {
        self.exchange
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn send_locked(&self, message: &Message) -> Result<()> {
        let wire = message.encode()?;
        let deadline = self.config.write_timeout.max(MIN_TIMEOUT);
        self.socket.set_write_timeout(Some(deadline))?;
        let sent = self
            .socket
            .send(&wire)
            .map_err(|err| io_to_transport(err, deadline))?;
        if sent != wire.len() {
            return Err(TransportError::ShortWrite {
                sent,
                len: wire.len(),
            });
        }
        trace!(packet = %message, "sent datagram");
        Ok(())
    }

    /// Throw away every datagram already waiting on the socket.
    fn drain_locked(&self) -> Result<usize> {
        self.socket.set_nonblocking(true)?;
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let mut dropped = 0;
        loop {
            match self.socket.recv(&mut buf) {
                Ok(len) => {
                    dropped += 1;
                    trace!(len, "discarding stale datagram");
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    // A queued ICMP error surfaces once; nothing else is pending.
                    trace!(error = %err, "stopped draining");
                    break;
                }
            }
        }
        self.socket.set_nonblocking(false)?;
        if dropped > 0 {
            debug!(dropped, "discarded stale datagrams before inquiry");
        }
        Ok(dropped)
    }

    fn receive_locked(&self, timeout: Duration) -> Result<Message> {
        let deadline = timeout.max(MIN_TIMEOUT);
        self.socket.set_read_timeout(Some(deadline))?;
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let len = self
            .socket
            .recv(&mut buf)
            .map_err(|err| io_to_transport(err, deadline))?;
        let message = decode(&buf[..len])?;
        trace!(packet = %message, len, "received datagram");
        Ok(message)
    }
}

impl OscLink for OscSocket {
    fn send(&self, message: &Message) -> Result<()> {
        OscSocket::send(self, message)
    }

    fn inquire(&self, request: &Message) -> Result<Message> {
        OscSocket::inquire(self, request)
    }
}

impl std::fmt::Debug for OscSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscSocket")
            .field("local", &self.socket.local_addr().ok())
            .field("remote", &self.remote)
            .finish()
    }
}

fn io_to_transport(err: std::io::Error, deadline: Duration) -> TransportError {
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::Timeout(deadline),
        _ => TransportError::Io(err),
    }
}
