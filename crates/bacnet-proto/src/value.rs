//! Tagged-value layer: the `ApplicationValue` sum type and its
//! application-tagged and context-tagged encode/decode pairs.

use crate::errors::{ProtocolError, Result};
use crate::primitive::{
    self, BacnetDate, BacnetTime, CharacterStringEncoding, ObjectId, TAG_BIT_STRING, TAG_BOOLEAN,
    TAG_CHARACTER_STRING, TAG_DATE, TAG_DOUBLE, TAG_ENUMERATED, TAG_NULL, TAG_OBJECT_ID, TAG_OCTET_STRING,
    TAG_REAL, TAG_SIGNED_INT, TAG_TIME, TAG_UNSIGNED_INT,
};
use crate::tag::{decode_tag, encode_application_tag, Tag, TagClass};

/// The tagged union of every BACnet primitive application value
/// (ASHRAE 135 clause 20.2).
///
/// `Unknown` preserves forward compatibility: an application tag number this
/// crate does not recognize decodes to its raw tag and payload rather than
/// failing the whole PDU.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationValue {
    /// The empty value.
    Null,
    /// A boolean.
    Boolean(bool),
    /// An unsigned integer, canonically 32-bit.
    UnsignedInt(u32),
    /// A signed integer.
    SignedInt(i32),
    /// An IEEE 754 single-precision float.
    Real(f32),
    /// An IEEE 754 double-precision float.
    Double(f64),
    /// An uninterpreted byte string.
    OctetString(Vec<u8>),
    /// A string with an explicit character encoding.
    CharacterString {
        /// Which of the six ASHRAE-135 encodings the bytes use.
        encoding: CharacterStringEncoding,
        /// Encoded string bytes.
        bytes: Vec<u8>,
    },
    /// A packed bit string with a remainder-bit count.
    BitString {
        /// Number of meaningful bits (may be fewer than `bytes.len() * 8`).
        bits_used: u16,
        /// Packed bit bytes.
        bytes: Vec<u8>,
    },
    /// An enumerated value (same wire form as `UnsignedInt`).
    Enumerated(u32),
    /// A calendar date, possibly carrying wildcard fields.
    Date(BacnetDate),
    /// A time of day, possibly carrying wildcard fields.
    Time(BacnetTime),
    /// An object identifier.
    ObjectId(ObjectId),
    /// An application tag this crate does not interpret, preserved verbatim.
    Unknown {
        /// The raw application tag number.
        tag_number: u8,
        /// The raw payload bytes.
        bytes: Vec<u8>,
    },
}

impl ApplicationValue {
    /// The application tag number this value encodes as.
    #[must_use]
    pub fn tag_number(&self) -> u8 {
        match self {
            Self::Null => TAG_NULL,
            Self::Boolean(_) => TAG_BOOLEAN,
            Self::UnsignedInt(_) => TAG_UNSIGNED_INT,
            Self::SignedInt(_) => TAG_SIGNED_INT,
            Self::Real(_) => TAG_REAL,
            Self::Double(_) => TAG_DOUBLE,
            Self::OctetString(_) => TAG_OCTET_STRING,
            Self::CharacterString { .. } => TAG_CHARACTER_STRING,
            Self::BitString { .. } => TAG_BIT_STRING,
            Self::Enumerated(_) => TAG_ENUMERATED,
            Self::Date(_) => TAG_DATE,
            Self::Time(_) => TAG_TIME,
            Self::ObjectId(_) => TAG_OBJECT_ID,
            Self::Unknown { tag_number, .. } => *tag_number,
        }
    }
}

/// Encodes an [`ApplicationValue`] with its application tag, returning bytes written.
pub fn encode_application_data(buf: &mut Vec<u8>, value: &ApplicationValue) -> usize {
    let start = buf.len();
    match value {
        ApplicationValue::Null => {
            encode_application_tag(buf, TAG_NULL, 0);
        },
        ApplicationValue::Boolean(b) => {
            primitive::encode_application_boolean(buf, *b);
        },
        ApplicationValue::UnsignedInt(v) => {
            primitive::encode_application_unsigned(buf, *v);
        },
        ApplicationValue::SignedInt(v) => {
            primitive::encode_application_signed(buf, *v);
        },
        ApplicationValue::Real(v) => {
            primitive::encode_application_real(buf, *v);
        },
        ApplicationValue::Double(v) => {
            primitive::encode_application_double(buf, *v);
        },
        ApplicationValue::OctetString(bytes) => {
            primitive::encode_application_octet_string(buf, bytes);
        },
        ApplicationValue::CharacterString { encoding, bytes } => {
            primitive::encode_application_character_string(buf, *encoding, bytes);
        },
        ApplicationValue::BitString { .. } => {
            let body = value_payload(value);
            encode_application_tag(buf, TAG_BIT_STRING, body.len() as u32);
            buf.extend_from_slice(&body);
        },
        ApplicationValue::Enumerated(v) => {
            primitive::encode_application_enumerated(buf, *v);
        },
        ApplicationValue::Date(date) => {
            primitive::encode_application_date(buf, *date);
        },
        ApplicationValue::Time(time) => {
            primitive::encode_application_time(buf, *time);
        },
        ApplicationValue::ObjectId(id) => {
            primitive::encode_application_object_id(buf, *id);
        },
        ApplicationValue::Unknown { tag_number, bytes } => {
            encode_application_tag(buf, *tag_number, bytes.len() as u32);
            buf.extend_from_slice(bytes);
        },
    }
    buf.len() - start
}

/// Decodes an [`ApplicationValue`] (tag header plus payload) from the front of `buf`.
///
/// Unknown application tag numbers decode as [`ApplicationValue::Unknown`]
/// rather than an error.
pub fn decode_application_data(buf: &[u8]) -> Result<(usize, ApplicationValue)> {
    let (tag_consumed, tag) = decode_tag(buf)?;
    if tag.class != TagClass::Application {
        return Err(ProtocolError::InvalidTag {
            expected: "application-class tag",
            found: tag.number,
            found_context: true,
        });
    }

    let value = decode_value_body(tag, &buf[tag_consumed..])?;
    let payload_len = application_payload_len(tag);
    Ok((tag_consumed + payload_len, value))
}

fn application_payload_len(tag: Tag) -> usize {
    if tag.number == TAG_BOOLEAN { 0 } else { tag.lvt as usize }
}

fn decode_value_body(tag: Tag, payload: &[u8]) -> Result<ApplicationValue> {
    let declared_len = application_payload_len(tag);
    if payload.len() < declared_len {
        return Err(ProtocolError::Truncated { needed: declared_len, available: payload.len() });
    }
    let payload = &payload[..declared_len];

    Ok(match tag.number {
        TAG_NULL => ApplicationValue::Null,
        TAG_BOOLEAN => ApplicationValue::Boolean(tag.lvt != 0),
        TAG_UNSIGNED_INT => ApplicationValue::UnsignedInt(primitive::decode_unsigned(payload)?),
        TAG_SIGNED_INT => ApplicationValue::SignedInt(primitive::decode_signed(payload)?),
        TAG_REAL => ApplicationValue::Real(primitive::decode_real(payload)?),
        TAG_DOUBLE => ApplicationValue::Double(primitive::decode_double(payload)?),
        TAG_OCTET_STRING => ApplicationValue::OctetString(payload.to_vec()),
        TAG_CHARACTER_STRING => {
            let (encoding, bytes) = primitive::decode_character_string(payload)?;
            ApplicationValue::CharacterString { encoding, bytes: bytes.to_vec() }
        },
        TAG_BIT_STRING => {
            let (bits_used, bytes) = primitive::decode_bit_string(payload)?;
            ApplicationValue::BitString { bits_used, bytes: bytes.to_vec() }
        },
        TAG_ENUMERATED => ApplicationValue::Enumerated(primitive::decode_unsigned(payload)?),
        TAG_DATE => ApplicationValue::Date(primitive::decode_date(payload)?),
        TAG_TIME => ApplicationValue::Time(primitive::decode_time(payload)?),
        TAG_OBJECT_ID => ApplicationValue::ObjectId(primitive::decode_object_id(payload)?),
        other => ApplicationValue::Unknown { tag_number: other, bytes: payload.to_vec() },
    })
}

/// The raw payload octets of `value`, without any tag header.
///
/// This is the shared body both tag classes bracket — with one exception:
/// a context-tagged Boolean carries one payload octet, whereas the
/// application form packs the value into LVT and has no payload at all.
fn value_payload(value: &ApplicationValue) -> Vec<u8> {
    match value {
        ApplicationValue::Null => Vec::new(),
        ApplicationValue::Boolean(b) => vec![u8::from(*b)],
        ApplicationValue::UnsignedInt(v) | ApplicationValue::Enumerated(v) => primitive::encode_unsigned(*v),
        ApplicationValue::SignedInt(v) => primitive::encode_signed(*v),
        ApplicationValue::Real(v) => primitive::encode_real(*v).to_vec(),
        ApplicationValue::Double(v) => primitive::encode_double(*v).to_vec(),
        ApplicationValue::OctetString(bytes) | ApplicationValue::Unknown { bytes, .. } => bytes.clone(),
        ApplicationValue::CharacterString { encoding, bytes } => {
            let mut body = Vec::with_capacity(bytes.len() + 1);
            body.push(*encoding as u8);
            body.extend_from_slice(bytes);
            body
        },
        ApplicationValue::BitString { bits_used, bytes } => {
            let unused_bits =
                if bytes.is_empty() { 0 } else { ((8 - usize::from(*bits_used) % 8) % 8) as u8 };
            let mut body = Vec::with_capacity(bytes.len() + 1);
            body.push(unused_bits);
            body.extend_from_slice(bytes);
            body
        },
        ApplicationValue::Date(date) => date.to_octets().to_vec(),
        ApplicationValue::Time(time) => time.to_octets().to_vec(),
        ApplicationValue::ObjectId(id) => id.to_u32().to_be_bytes().to_vec(),
    }
}

/// Encodes `value` as a context-tagged field (same payload shape as the
/// application form, but tag class flipped and `context_number` supplied by
/// the caller) — used inside constructed service parameter lists.
pub fn encode_context_data(buf: &mut Vec<u8>, context_number: u8, value: &ApplicationValue) -> usize {
    let start = buf.len();
    let body = value_payload(value);
    crate::tag::encode_context_tag(buf, context_number, body.len() as u32);
    buf.extend_from_slice(&body);
    buf.len() - start
}

/// Decodes a context-tagged field whose payload has the shape of application
/// tag number `expected_application_tag` (the caller must know which
/// primitive type a given context number carries — context tags do not
/// self-describe their payload type).
pub fn decode_context_data(
    buf: &[u8],
    expected_context_number: u8,
    expected_application_tag: u8,
) -> Result<(usize, ApplicationValue)> {
    let (tag_consumed, tag) = decode_tag(buf)?;
    if tag.class != TagClass::Context || tag.number != expected_context_number {
        return Err(ProtocolError::InvalidTag {
            expected: "matching context tag",
            found: tag.number,
            found_context: tag.class == TagClass::Context,
        });
    }
    let declared_len = tag.lvt as usize;
    let payload = crate::tag::payload_slice(buf, tag_consumed, declared_len)?;

    let value = if expected_application_tag == TAG_BOOLEAN {
        let &octet = payload
            .first()
            .ok_or(ProtocolError::Truncated { needed: tag_consumed + 1, available: buf.len() })?;
        ApplicationValue::Boolean(octet != 0)
    } else {
        let synthetic = Tag { number: expected_application_tag, class: TagClass::Application, lvt: tag.lvt };
        decode_value_body(synthetic, payload)?
    };
    Ok((tag_consumed + declared_len, value))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::primitive::BACNET_MAX_INSTANCE;

    fn round_trip(value: ApplicationValue) {
        let mut buf = Vec::new();
        let written = encode_application_data(&mut buf, &value);
        assert_eq!(written, buf.len());
        let (consumed, decoded) = decode_application_data(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, value);
    }

    #[test]
    fn null_round_trips() {
        round_trip(ApplicationValue::Null);
    }

    #[test]
    fn boundary_unsigned_values_round_trip() {
        round_trip(ApplicationValue::UnsignedInt(0));
        round_trip(ApplicationValue::UnsignedInt(0xFFFF));
        round_trip(ApplicationValue::UnsignedInt(0xFFFF_FFFF));
    }

    #[test]
    fn boundary_signed_values_round_trip() {
        round_trip(ApplicationValue::SignedInt(0));
        round_trip(ApplicationValue::SignedInt(-1));
        round_trip(ApplicationValue::SignedInt(-32768));
        round_trip(ApplicationValue::SignedInt(32767));
    }

    #[test]
    fn boundary_real_values_round_trip() {
        round_trip(ApplicationValue::Real(0.0));
        round_trip(ApplicationValue::Real(-1.0));
        round_trip(ApplicationValue::Real(std::f32::consts::PI));
    }

    #[test]
    fn object_id_boundaries_round_trip() {
        round_trip(ApplicationValue::ObjectId(ObjectId::new(0, 0).unwrap()));
        const OBJECT_LIFE_SAFETY_ZONE: u16 = 29;
        round_trip(ApplicationValue::ObjectId(
            ObjectId::new(OBJECT_LIFE_SAFETY_ZONE, BACNET_MAX_INSTANCE).unwrap(),
        ));
    }

    #[test]
    fn date_5_5_22_1_round_trips() {
        round_trip(ApplicationValue::Date(BacnetDate::new(5, 5, 22, 1).unwrap()));
    }

    #[test]
    fn time_23_59_59_12_round_trips() {
        round_trip(ApplicationValue::Time(BacnetTime::new(23, 59, 59, 12)));
    }

    #[test]
    fn unknown_tag_preserves_raw_payload() {
        let mut buf = Vec::new();
        encode_application_tag(&mut buf, 13, 2);
        buf.extend_from_slice(&[0xAB, 0xCD]);
        let (consumed, value) = decode_application_data(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(value, ApplicationValue::Unknown { tag_number: 13, bytes: vec![0xAB, 0xCD] });
    }

    #[test]
    fn context_tagged_unsigned_round_trips() {
        let mut buf = Vec::new();
        encode_context_data(&mut buf, 2, &ApplicationValue::UnsignedInt(75));
        let (consumed, value) = decode_context_data(&buf, 2, TAG_UNSIGNED_INT).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(value, ApplicationValue::UnsignedInt(75));
    }

    #[test]
    fn context_tagged_boolean_carries_a_payload_octet() {
        // Unlike the application form, which packs the value into LVT.
        let mut buf = Vec::new();
        encode_context_data(&mut buf, 4, &ApplicationValue::Boolean(true));
        assert_eq!(buf, vec![0x49, 0x01]);
        let (consumed, value) = decode_context_data(&buf, 4, crate::primitive::TAG_BOOLEAN).unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(value, ApplicationValue::Boolean(true));
    }

    #[test]
    fn context_tag_mismatch_is_rejected() {
        let mut buf = Vec::new();
        encode_context_data(&mut buf, 2, &ApplicationValue::UnsignedInt(75));
        assert!(decode_context_data(&buf, 3, TAG_UNSIGNED_INT).is_err());
    }

    proptest! {
        #[test]
        fn unsigned_round_trip(v in any::<u32>()) {
            let value = ApplicationValue::UnsignedInt(v);
            let mut buf = Vec::new();
            encode_application_data(&mut buf, &value);
            let (consumed, decoded) = decode_application_data(&buf).unwrap();
            prop_assert_eq!(consumed, buf.len());
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn signed_round_trip(v in any::<i32>()) {
            let value = ApplicationValue::SignedInt(v);
            let mut buf = Vec::new();
            encode_application_data(&mut buf, &value);
            let (consumed, decoded) = decode_application_data(&buf).unwrap();
            prop_assert_eq!(consumed, buf.len());
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn octet_string_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let value = ApplicationValue::OctetString(bytes);
            let mut buf = Vec::new();
            encode_application_data(&mut buf, &value);
            let (consumed, decoded) = decode_application_data(&buf).unwrap();
            prop_assert_eq!(consumed, buf.len());
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn character_string_round_trip(s in "[ -~]{0,32}") {
            let value = ApplicationValue::CharacterString {
                encoding: CharacterStringEncoding::Utf8,
                bytes: s.into_bytes(),
            };
            let mut buf = Vec::new();
            encode_application_data(&mut buf, &value);
            let (consumed, decoded) = decode_application_data(&buf).unwrap();
            prop_assert_eq!(consumed, buf.len());
            prop_assert_eq!(decoded, value);
        }
    }
}
