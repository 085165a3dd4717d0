use faderlink_osc::OscError;
use faderlink_transport::TransportError;

/// Coarse classification of a [`MixerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or unexpected packets.
    Protocol,
    /// Dialing, timeouts, socket errors, repeated send failures.
    Transport,
    /// Invalid arguments or a fader in the wrong state.
    State,
}

/// Errors that can occur in mixer operations.
#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Codec-level error.
    #[error("protocol error: {0}")]
    Protocol(#[from] OscError),

    /// The console answered, but not with what the query asks for.
    #[error("unexpected reply to {address}: {detail}")]
    UnexpectedReply { address: String, detail: String },

    /// No control connection has been established.
    #[error("not connected to a console")]
    NotConnected,

    /// Too many consecutive sends failed during a fade.
    #[error("too many failures sending message ({0} in a row)")]
    TooManyFailures(u32),

    /// Channel id outside 0-79.
    #[error("invalid channel id {0} (expected 0-79)")]
    InvalidChannel(usize),

    /// Fader resolution input is not an integer in 1-65536.
    #[error("cannot parse fader resolution '{0}' as an integer in 1-65536: fader resolution unchanged")]
    InvalidResolution(String),

    /// A fader level outside the unit interval.
    #[error("invalid start/stop value {0} (expected 0.0-1.0)")]
    InvalidLevel(f32),

    /// The fader is moving, or another fade already owns it.
    #[error("fader currently in motion")]
    InMotion,

    /// The fade was cancelled before it finished.
    #[error("fade interrupted")]
    Interrupted,
}

impl MixerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MixerError::Protocol(_)
            | MixerError::UnexpectedReply { .. }
            | MixerError::Transport(TransportError::Protocol(_)) => ErrorCategory::Protocol,
            MixerError::Transport(_) | MixerError::NotConnected | MixerError::TooManyFailures(_) => {
                ErrorCategory::Transport
            }
            MixerError::InvalidChannel(_)
            | MixerError::InvalidResolution(_)
            | MixerError::InvalidLevel(_)
            | MixerError::InMotion
            | MixerError::Interrupted => ErrorCategory::State,
        }
    }
}

pub type Result<T> = std::result::Result<T, MixerError>;
