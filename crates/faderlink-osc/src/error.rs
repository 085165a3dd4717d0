/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OscError {
    /// The packet ended before the named section was complete.
    #[error("packet truncated while reading {0}")]
    Truncated(&'static str),

    /// A fixed-size argument did not carry its declared number of bytes.
    #[error("argument {index} ('{tag}') has {actual} bytes, expected {expected}")]
    BadLength {
        index: usize,
        tag: char,
        expected: usize,
        actual: usize,
    },

    /// The type tag string contains a character this codec does not support.
    #[error("unknown type tag '{0}'")]
    UnknownTag(char),

    /// A blob argument declared a negative length.
    #[error("invalid blob length {0}")]
    InvalidBlobLength(i32),

    /// A blob is too large for its 32-bit length prefix.
    #[error("blob of {0} bytes does not fit a 32-bit length prefix")]
    BlobTooLarge(usize),

    /// An argument's payload is inconsistent with its type tag.
    #[error("cannot encode argument {index} ('{tag}'): payload is {actual} bytes, expected 4")]
    Encode {
        index: usize,
        tag: char,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, OscError>;
