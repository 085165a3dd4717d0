use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{OscError, Result};
use crate::message::{Argument, Message, OscValue, TypeTag};

/// Every block on the wire ends on a multiple of this many bytes.
pub const ALIGNMENT: usize = 4;

/// Null bytes that terminate and pad a block of `len` bytes.
///
/// Always in `1..=4`: a block already on a boundary gets four full null bytes
/// because the protocol requires a terminator.
pub fn padding_for(len: usize) -> usize {
    ALIGNMENT - (len % ALIGNMENT)
}

/// Blob data is length-prefixed, so it is only aligned (0..=3 bytes).
fn blob_padding(len: usize) -> usize {
    (ALIGNMENT - (len % ALIGNMENT)) % ALIGNMENT
}

fn put_padded(dst: &mut BytesMut, block: &[u8]) {
    dst.put_slice(block);
    dst.put_bytes(0, padding_for(block.len()));
}

fn encoded_len(message: &Message) -> usize {
    let address = message.address().len() + padding_for(message.address().len());
    let tag_count = message.arguments().len() + 1;
    let tags = tag_count + padding_for(tag_count);
    let args: usize = message
        .arguments()
        .iter()
        .map(|arg| match arg.tag() {
            TypeTag::Int | TypeTag::Float => 4,
            TypeTag::String => arg.raw().len() + padding_for(arg.raw().len()),
            TypeTag::Blob => 4 + arg.raw().len() + blob_padding(arg.raw().len()),
        })
        .sum();
    address + tags + args
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬─────────────────────────┬──────────────────────┐
/// │ Address              │ ',' + type tags         │ Arguments            │
/// │ (null-padded to %4)  │ (null-padded to %4)     │ (in tag order)       │
/// └──────────────────────┴─────────────────────────┴──────────────────────┘
///   i/f: 4 bytes BE   s: null-padded string   b: i32 BE length + data + pad
/// ```
pub fn encode(message: &Message) -> Result<Bytes> {
    for (index, arg) in message.arguments().iter().enumerate() {
        let tag = arg.tag();
        if let Some(size) = tag.fixed_size() {
            if arg.raw().len() != size {
                return Err(OscError::Encode {
                    index,
                    tag: tag.as_char(),
                    actual: arg.raw().len(),
                });
            }
        }
        if tag == TypeTag::Blob && i32::try_from(arg.raw().len()).is_err() {
            return Err(OscError::BlobTooLarge(arg.raw().len()));
        }
    }

    let mut dst = BytesMut::with_capacity(encoded_len(message));
    put_padded(&mut dst, message.address());

    let tag_count = message.arguments().len() + 1;
    dst.put_u8(b',');
    for arg in message.arguments() {
        dst.put_u8(arg.tag().as_byte());
    }
    dst.put_bytes(0, padding_for(tag_count));

    for arg in message.arguments() {
        match arg.tag() {
            TypeTag::Int | TypeTag::Float => dst.put_slice(arg.raw()),
            TypeTag::String => put_padded(&mut dst, arg.raw()),
            TypeTag::Blob => {
                // Length checked above.
                dst.put_i32(arg.raw().len() as i32);
                dst.put_slice(arg.raw());
                dst.put_bytes(0, blob_padding(arg.raw().len()));
            }
        }
    }

    Ok(dst.freeze())
}

/// Decode one message from a datagram.
pub fn decode(src: &[u8]) -> Result<Message> {
    let comma = src
        .iter()
        .position(|&b| b == b',')
        .ok_or(OscError::Truncated("address"))?;
    let address = trim_trailing_nulls(&src[..comma]);

    let tags_start = comma + 1;
    let tags_end = src[tags_start..]
        .iter()
        .position(|&b| b == 0)
        .map(|offset| tags_start + offset)
        .ok_or(OscError::Truncated("type tags"))?;

    let tags = src[tags_start..tags_end]
        .iter()
        .map(|&b| TypeTag::from_byte(b).ok_or(OscError::UnknownTag(char::from(b))))
        .collect::<Result<Vec<_>>>()?;

    // Skip exactly the padding of the tag block (comma included in its
    // length); anything further may already be a zero-valued argument.
    let mut pos = (tags_end + padding_for(tags.len() + 1)).min(src.len());

    let mut arguments = Vec::with_capacity(tags.len());
    for (index, &tag) in tags.iter().enumerate() {
        let remaining = src.len() - pos;
        match tag {
            TypeTag::Int | TypeTag::Float => {
                if remaining == 0 {
                    return Err(OscError::Truncated("argument"));
                }
                if remaining < 4 {
                    return Err(OscError::BadLength {
                        index,
                        tag: tag.as_char(),
                        expected: 4,
                        actual: remaining,
                    });
                }
                arguments.push(Argument::from_raw(
                    tag,
                    Bytes::copy_from_slice(&src[pos..pos + 4]),
                ));
                pos += 4;
            }
            TypeTag::String => {
                let end = src[pos..]
                    .iter()
                    .position(|&b| b == 0)
                    .map(|offset| pos + offset)
                    .ok_or(OscError::Truncated("string argument"))?;
                let len = end - pos;
                let next = end + padding_for(len);
                if next > src.len() {
                    return Err(OscError::Truncated("string padding"));
                }
                arguments.push(Argument::from_raw(
                    tag,
                    Bytes::copy_from_slice(&src[pos..end]),
                ));
                pos = next;
            }
            TypeTag::Blob => {
                if remaining < 4 {
                    return Err(OscError::Truncated("blob length"));
                }
                let declared = i32::from_be_bytes([src[pos], src[pos + 1], src[pos + 2], src[pos + 3]]);
                let len = usize::try_from(declared)
                    .map_err(|_| OscError::InvalidBlobLength(declared))?;
                let data_start = pos + 4;
                let data_end = data_start + len;
                if data_end > src.len() {
                    return Err(OscError::Truncated("blob data"));
                }
                let next = data_end + blob_padding(len);
                if next > src.len() {
                    return Err(OscError::Truncated("blob padding"));
                }
                arguments.push(Argument::from_raw(
                    tag,
                    Bytes::copy_from_slice(&src[data_start..data_end]),
                ));
                pos = next;
            }
        }
    }

    if pos < src.len() {
        tracing::trace!(extra = src.len() - pos, "ignoring trailing bytes after message");
    }

    Ok(Message::from_parts(Bytes::copy_from_slice(address), arguments))
}

/// Convert a raw argument payload into its value.
///
/// Returns `None` rather than failing when a fixed-size tag carries the wrong
/// number of bytes or a string is not UTF-8; [`decode`] reports size problems
/// at packet granularity.
pub fn decode_argument(tag: TypeTag, raw: &[u8]) -> Option<OscValue> {
    match tag {
        TypeTag::Int => {
            let bytes: [u8; 4] = raw.try_into().ok()?;
            Some(OscValue::Int(i32::from_be_bytes(bytes)))
        }
        TypeTag::Float => {
            let bytes: [u8; 4] = raw.try_into().ok()?;
            Some(OscValue::Float(f32::from_bits(u32::from_be_bytes(bytes))))
        }
        TypeTag::String => std::str::from_utf8(raw)
            .ok()
            .map(|s| OscValue::String(s.to_string())),
        TypeTag::Blob => Some(OscValue::Blob(Bytes::copy_from_slice(raw))),
    }
}

fn trim_trailing_nulls(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encode_query_without_arguments() {
        let wire = encode(&Message::new("/info")).unwrap();
        assert_eq!(wire.as_ref(), b"/info\0\0\0,\0\0\0");
    }

    #[test]
    fn encode_fader_set() {
        let wire = encode(&Message::new("/ch/05/mix/fader").with_float(0.5)).unwrap();
        let mut expected = b"/ch/05/mix/fader\0\0\0\0,f\0\0".to_vec();
        expected.extend_from_slice(&0.5f32.to_bits().to_be_bytes());
        assert_eq!(wire.as_ref(), expected.as_slice());
    }

    #[test]
    fn aligned_blocks_get_four_nulls() {
        // "/abc" is 4 bytes and ",iii" is 4 bytes.
        let msg = Message::new("/abc").with_int(1).with_int(2).with_int(3);
        let wire = encode(&msg).unwrap();
        assert_eq!(&wire[..8], b"/abc\0\0\0\0");
        assert_eq!(&wire[8..16], b",iii\0\0\0\0");
        assert_eq!(wire.len(), 16 + 12);
    }

    #[test]
    fn string_argument_is_terminated_and_padded() {
        let wire = encode(&Message::new("/n").with_string("abcd")).unwrap();
        assert_eq!(wire.as_ref(), b"/n\0\0,s\0\0abcd\0\0\0\0");

        let wire = encode(&Message::new("/n").with_string("abc")).unwrap();
        assert_eq!(wire.as_ref(), b"/n\0\0,s\0\0abc\0");
    }

    #[test]
    fn blob_argument_is_length_prefixed() {
        let wire = encode(&Message::new("/b").with_blob(vec![9u8, 8, 7, 6, 5])).unwrap();
        assert_eq!(
            wire.as_ref(),
            b"/b\0\0,b\0\0\0\0\0\x05\x09\x08\x07\x06\x05\0\0\0"
        );
        let decoded = decode(&wire).unwrap();
        assert_eq!(
            decoded.values(),
            vec![Some(OscValue::Blob(Bytes::from_static(&[9, 8, 7, 6, 5])))]
        );
    }

    #[test]
    fn encode_rejects_short_fixed_payload() {
        let mut msg = Message::new("/x");
        msg.push(Argument::from_raw(TypeTag::Float, vec![0u8, 0]));
        let err = encode(&msg).unwrap_err();
        assert_eq!(
            err,
            OscError::Encode {
                index: 0,
                tag: 'f',
                actual: 2
            }
        );
    }

    #[test]
    fn decode_fader_reply() {
        let mut wire = b"/ch/01/mix/fader\0\0\0\0,f\0\0".to_vec();
        wire.extend_from_slice(&0.75f32.to_bits().to_be_bytes());

        let msg = decode(&wire).unwrap();
        assert_eq!(msg.address(), b"/ch/01/mix/fader");
        assert_eq!(msg.first_float(), Some(0.75));
    }

    #[test]
    fn decode_does_not_swallow_zero_float() {
        // ",f" pads with two nulls; a 0.0 payload is four more nulls that
        // belong to the argument.
        let wire = encode(&Message::new("/dca/1/fader").with_float(0.0)).unwrap();
        let msg = decode(&wire).unwrap();
        assert_eq!(msg.first_float(), Some(0.0));
    }

    #[test]
    fn decode_status_reply_with_strings() {
        let reply = Message::new("/info")
            .with_string("V2.07")
            .with_string("osc-server")
            .with_string("M32")
            .with_string("4.06");
        let msg = decode(&encode(&reply).unwrap()).unwrap();
        assert_eq!(msg.strings(), vec!["V2.07", "osc-server", "M32", "4.06"]);
    }

    #[test]
    fn decode_missing_comma_is_truncated() {
        let err = decode(b"/info\0\0\0").unwrap_err();
        assert_eq!(err, OscError::Truncated("address"));
    }

    #[test]
    fn decode_missing_tag_terminator_is_truncated() {
        let err = decode(b"/info\0\0\0,ff").unwrap_err();
        assert_eq!(err, OscError::Truncated("type tags"));
    }

    #[test]
    fn decode_short_float_is_bad_length() {
        let err = decode(b"/a\0\0,f\0\0\x3f\x00").unwrap_err();
        assert!(matches!(
            err,
            OscError::BadLength {
                index: 0,
                tag: 'f',
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn decode_missing_argument_is_truncated() {
        let err = decode(b"/a\0\0,i\0\0").unwrap_err();
        assert_eq!(err, OscError::Truncated("argument"));
    }

    #[test]
    fn decode_unknown_tag() {
        let err = decode(b"/a\0\0,d\0\0\0\0\0\0\0\0\0\0").unwrap_err();
        assert_eq!(err, OscError::UnknownTag('d'));
    }

    #[test]
    fn decode_unterminated_string_is_truncated() {
        let err = decode(b"/a\0\0,s\0\0abcd").unwrap_err();
        assert_eq!(err, OscError::Truncated("string argument"));
    }

    #[test]
    fn decode_negative_blob_length() {
        let err = decode(b"/a\0\0,b\0\0\xff\xff\xff\xff").unwrap_err();
        assert_eq!(err, OscError::InvalidBlobLength(-1));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut wire = encode(&Message::new("/a").with_int(5)).unwrap().to_vec();
        wire.extend_from_slice(&[0, 0, 0, 0]);
        let msg = decode(&wire).unwrap();
        assert_eq!(msg.values(), vec![Some(OscValue::Int(5))]);
    }

    #[test]
    fn decode_argument_wrong_size_is_none() {
        assert_eq!(decode_argument(TypeTag::Int, &[0, 1, 2]), None);
        assert_eq!(decode_argument(TypeTag::Float, &[0, 1, 2, 3, 4]), None);
        assert_eq!(
            decode_argument(TypeTag::Int, &[0, 0, 1, 0]),
            Some(OscValue::Int(256))
        );
    }

    #[test]
    fn decode_argument_invalid_utf8_is_none() {
        assert_eq!(decode_argument(TypeTag::String, &[0xff, 0xfe]), None);
    }

    #[test]
    fn padding_is_never_zero() {
        assert_eq!(padding_for(0), 4);
        assert_eq!(padding_for(1), 3);
        assert_eq!(padding_for(3), 1);
        assert_eq!(padding_for(4), 4);
        assert_eq!(padding_for(17), 3);
    }

    fn argument_strategy() -> impl Strategy<Value = Argument> {
        prop_oneof![
            any::<i32>().prop_map(Argument::int),
            any::<f32>().prop_map(Argument::float),
            "[a-zA-Z0-9 ._-]{0,24}".prop_map(Argument::string),
            proptest::collection::vec(any::<u8>(), 0..24).prop_map(Argument::blob),
        ]
    }

    fn message_strategy() -> impl Strategy<Value = Message> {
        (
            "/[a-z0-9/]{0,24}",
            proptest::collection::vec(argument_strategy(), 0..6),
        )
            .prop_map(|(address, args)| {
                let mut msg = Message::new(address);
                for arg in args {
                    msg.push(arg);
                }
                msg
            })
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_address_and_arguments(msg in message_strategy()) {
            let wire = encode(&msg).unwrap();
            let decoded = decode(&wire).unwrap();
            prop_assert_eq!(decoded.address(), msg.address());
            // Raw payload equality compares floats bit for bit.
            prop_assert_eq!(decoded.arguments(), msg.arguments());
        }

        #[test]
        fn blocks_are_padded_to_alignment(msg in message_strategy()) {
            let wire = encode(&msg).unwrap();
            let address_block = wire.iter().position(|&b| b == b',').unwrap();
            prop_assert!(address_block > 0);
            prop_assert_eq!(address_block % ALIGNMENT, 0);

            let tag_count = msg.arguments().len() + 1;
            let tag_block = tag_count + padding_for(tag_count);
            prop_assert_eq!(tag_block % ALIGNMENT, 0);
            prop_assert!(wire[address_block + tag_count..address_block + tag_block]
                .iter()
                .all(|&b| b == 0));
            prop_assert_eq!(wire.len(), encoded_len(&msg));
            prop_assert_eq!(wire.len() % ALIGNMENT, 0);
        }
    }
}
