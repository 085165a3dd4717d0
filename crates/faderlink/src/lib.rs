//! Remote control of OSC-style digital mixing consoles over UDP.
//!
//! # Crate Structure
//!
//! - [`osc`]: binary message model and wire codec
//! - [`transport`]: UDP connection with request/reply exchanges
//! - [`mixer`]: channel addressing, timed fades and level monitoring

/// Re-export codec types.
pub mod osc {
    pub use faderlink_osc::*;
}

/// Re-export transport types.
pub mod transport {
    pub use faderlink_transport::*;
}

/// Re-export mixer types.
pub mod mixer {
    pub use faderlink_mixer::*;
}
