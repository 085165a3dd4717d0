use std::net::SocketAddr;
use std::time::Duration;

use faderlink_osc::OscError;

/// Errors that can occur in UDP transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote `host:port` could not be resolved.
    #[error("failed to resolve remote address '{addr}': {source}")]
    Resolve {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to bind the local UDP port.
    #[error("failed to bind local port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    /// Failed to associate the socket with the remote console.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A read or write did not complete before its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The socket accepted fewer bytes than the datagram holds.
    #[error("short write ({sent} of {len} bytes)")]
    ShortWrite { sent: usize, len: usize },

    /// The message could not be encoded, or the reply could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] OscError),

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True when the local port is already bound by another socket.
    pub fn is_addr_in_use(&self) -> bool {
        matches!(
            self,
            TransportError::Bind { source, .. }
                if source.kind() == std::io::ErrorKind::AddrInUse
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
