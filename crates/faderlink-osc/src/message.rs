use std::fmt;

use bytes::Bytes;

use crate::codec::{decode_argument, encode};
use crate::error::Result;

/// Argument type tags understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// `i`: 32-bit big-endian signed integer.
    Int,
    /// `f`: 32-bit big-endian IEEE-754 float.
    Float,
    /// `s`: null-terminated string padded to 4 bytes.
    String,
    /// `b`: length-prefixed blob padded to 4 bytes.
    Blob,
}

impl TypeTag {
    /// Parse a tag character from the wire.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'i' => Some(Self::Int),
            b'f' => Some(Self::Float),
            b's' => Some(Self::String),
            b'b' => Some(Self::Blob),
            _ => None,
        }
    }

    /// The tag character written to the wire.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Int => b'i',
            Self::Float => b'f',
            Self::String => b's',
            Self::Blob => b'b',
        }
    }

    pub fn as_char(self) -> char {
        char::from(self.as_byte())
    }

    /// Payload size for fixed-width tags.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Int | Self::Float => Some(4),
            Self::String | Self::Blob => None,
        }
    }
}

/// A decoded argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum OscValue {
    Int(i32),
    Float(f32),
    String(String),
    Blob(Bytes),
}

impl OscValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Int(_) => TypeTag::Int,
            Self::Float(_) => TypeTag::Float,
            Self::String(_) => TypeTag::String,
            Self::Blob(_) => TypeTag::Blob,
        }
    }
}

/// One message argument: its tag and the raw payload bytes.
///
/// For `i`/`f` the payload is the 4 big-endian bytes; for `s` it is the string
/// bytes without terminator or padding; for `b` it is the blob data without the
/// length prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    tag: TypeTag,
    raw: Bytes,
}

impl Argument {
    pub fn int(value: i32) -> Self {
        Self {
            tag: TypeTag::Int,
            raw: Bytes::copy_from_slice(&value.to_be_bytes()),
        }
    }

    pub fn float(value: f32) -> Self {
        Self {
            tag: TypeTag::Float,
            raw: Bytes::copy_from_slice(&value.to_bits().to_be_bytes()),
        }
    }

    pub fn string(value: impl AsRef<str>) -> Self {
        Self {
            tag: TypeTag::String,
            raw: Bytes::copy_from_slice(value.as_ref().as_bytes()),
        }
    }

    pub fn blob(data: impl Into<Bytes>) -> Self {
        Self {
            tag: TypeTag::Blob,
            raw: data.into(),
        }
    }

    /// Build an argument from an arbitrary tag/payload pair.
    ///
    /// No size check is done here; [`encode`] rejects fixed-size arguments
    /// whose payload is not 4 bytes.
    pub fn from_raw(tag: TypeTag, raw: impl Into<Bytes>) -> Self {
        Self {
            tag,
            raw: raw.into(),
        }
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Decode the payload, or `None` if it does not fit the tag.
    pub fn value(&self) -> Option<OscValue> {
        decode_argument(self.tag, &self.raw)
    }
}

impl From<OscValue> for Argument {
    fn from(value: OscValue) -> Self {
        match value {
            OscValue::Int(v) => Self::int(v),
            OscValue::Float(v) => Self::float(v),
            OscValue::String(v) => Self::string(v),
            OscValue::Blob(v) => Self::blob(v),
        }
    }
}

/// A single OSC-style message: an address plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    address: Bytes,
    arguments: Vec<Argument>,
}

impl Message {
    /// Create a message with no arguments (a query, on most consoles).
    pub fn new(address: impl AsRef<[u8]>) -> Self {
        Self {
            address: Bytes::copy_from_slice(address.as_ref()),
            arguments: Vec::new(),
        }
    }

    pub(crate) fn from_parts(address: Bytes, arguments: Vec<Argument>) -> Self {
        Self { address, arguments }
    }

    pub fn with_int(mut self, value: i32) -> Self {
        self.push(Argument::int(value));
        self
    }

    pub fn with_float(mut self, value: f32) -> Self {
        self.push(Argument::float(value));
        self
    }

    pub fn with_string(mut self, value: impl AsRef<str>) -> Self {
        self.push(Argument::string(value));
        self
    }

    pub fn with_blob(mut self, data: impl Into<Bytes>) -> Self {
        self.push(Argument::blob(data));
        self
    }

    pub fn push(&mut self, argument: Argument) {
        self.arguments.push(argument);
    }

    pub fn address(&self) -> &[u8] {
        &self.address
    }

    /// The address as text, if it is valid UTF-8.
    pub fn address_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.address).ok()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Type tag characters in argument order (without the leading comma).
    pub fn type_tags(&self) -> String {
        self.arguments.iter().map(|arg| arg.tag().as_char()).collect()
    }

    /// Decoded values in argument order; `None` where a payload is malformed.
    pub fn values(&self) -> Vec<Option<OscValue>> {
        self.arguments.iter().map(Argument::value).collect()
    }

    /// The first argument as a float, if it is one.
    pub fn first_float(&self) -> Option<f32> {
        match self.arguments.first()?.value()? {
            OscValue::Float(v) => Some(v),
            _ => None,
        }
    }

    /// All string arguments, in order; other argument types are skipped.
    pub fn strings(&self) -> Vec<String> {
        self.arguments
            .iter()
            .filter_map(|arg| match arg.value() {
                Some(OscValue::String(s)) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Encode this message into its wire form.
    pub fn encode(&self) -> Result<Bytes> {
        encode(self)
    }
}

impl fmt::Display for Message {
    /// Printable wire rendering: null bytes are shown as `~`, other
    /// non-printable bytes as `.`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wire = match encode(self) {
            Ok(wire) => wire,
            Err(err) => return write!(f, "<unencodable: {err}>"),
        };
        for &byte in wire.iter() {
            let c = match byte {
                0 => '~',
                0x20..=0x7e => char::from(byte),
                _ => '.',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_tags_in_order() {
        let msg = Message::new("/ch/01/mix/fader")
            .with_float(0.5)
            .with_int(3)
            .with_string("kick");
        assert_eq!(msg.type_tags(), "fis");
        assert_eq!(msg.address_str(), Some("/ch/01/mix/fader"));
    }

    #[test]
    fn values_decode_typed_arguments() {
        let msg = Message::new("/x")
            .with_int(-7)
            .with_float(0.25)
            .with_string("vox")
            .with_blob(vec![1u8, 2, 3]);
        assert_eq!(
            msg.values(),
            vec![
                Some(OscValue::Int(-7)),
                Some(OscValue::Float(0.25)),
                Some(OscValue::String("vox".to_string())),
                Some(OscValue::Blob(Bytes::from_static(&[1, 2, 3]))),
            ]
        );
    }

    #[test]
    fn first_float_requires_float_argument() {
        assert_eq!(Message::new("/a").with_float(0.75).first_float(), Some(0.75));
        assert_eq!(Message::new("/a").with_int(1).first_float(), None);
        assert_eq!(Message::new("/a").first_float(), None);
    }

    #[test]
    fn strings_skips_non_string_arguments() {
        let msg = Message::new("/info")
            .with_string("V2.07")
            .with_int(1)
            .with_string("M32")
            .with_string("4.06");
        assert_eq!(msg.strings(), vec!["V2.07", "M32", "4.06"]);
    }

    #[test]
    fn malformed_raw_argument_has_no_value() {
        let arg = Argument::from_raw(TypeTag::Float, vec![0u8, 1]);
        assert_eq!(arg.value(), None);
    }

    #[test]
    fn display_shows_nulls_as_tilde() {
        let msg = Message::new("/info");
        assert_eq!(msg.to_string(), "/info~~~,~~~");
    }

    #[test]
    fn tag_bytes_roundtrip() {
        for tag in [TypeTag::Int, TypeTag::Float, TypeTag::String, TypeTag::Blob] {
            assert_eq!(TypeTag::from_byte(tag.as_byte()), Some(tag));
        }
        assert_eq!(TypeTag::from_byte(b'd'), None);
    }
}
