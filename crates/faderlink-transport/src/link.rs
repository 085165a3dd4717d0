use faderlink_osc::Message;

use crate::error::Result;

/// A request/response channel to one console.
///
/// Implemented by [`OscSocket`](crate::OscSocket) for real UDP traffic. The
/// mixer layer only ever talks to the wire through this trait, which keeps
/// fade sequencing and level polling testable without sockets.
///
/// Implementations must serialize exchanges: a `send` issued while another
/// thread's `inquire` is in flight waits for that inquiry to finish.
pub trait OscLink: Send + Sync {
    /// Write one message as a single datagram.
    fn send(&self, message: &Message) -> Result<()>;

    /// Send `request` and return the next message received as its reply.
    fn inquire(&self, request: &Message) -> Result<Message>;
}
