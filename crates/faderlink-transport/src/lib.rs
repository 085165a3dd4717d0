//! UDP transport for OSC-style console control.
//!
//! One message per datagram over an unconnected, unordered transport with no
//! message IDs. Replies are paired with requests purely by ordering, so every
//! exchange on a connection holds that connection's exchange lock.
//!
//! This is the lowest I/O layer of faderlink. The mixer layer talks to the wire
//! only through the [`OscLink`] trait defined here.

pub mod error;
pub mod link;
pub mod retry;
pub mod udp;

pub use error::{Result, TransportError};
pub use link::OscLink;
pub use retry::{retry_on_addr_in_use, RetryPolicy};
pub use udp::{
    resolve_remote, DialConfig, OscSocket, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT,
    RECV_BUFFER_SIZE,
};
