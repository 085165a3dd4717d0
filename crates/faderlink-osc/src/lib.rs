//! OSC-style message codec for digital mixing console control.
//!
//! Every packet is a single message laid out as:
//! - A null-terminated address, padded to a 4-byte boundary
//! - A comma followed by one type tag per argument, padded the same way
//! - The argument payloads, in tag order
//!
//! A block whose length is already a multiple of 4 still gets four null bytes,
//! so every block carries at least one terminator. No I/O happens here.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{decode, decode_argument, encode, padding_for, ALIGNMENT};
pub use error::{OscError, Result};
pub use message::{Argument, Message, OscValue, TypeTag};
