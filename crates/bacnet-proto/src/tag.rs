//! Tag header encoding (ASHRAE 135 clause 20.2.1).
//!
//! Every encoded value is preceded by a tag header: one to seven octets
//! carrying a tag number, a class (application or context), and a
//! length/value/type (LVT) field. This module only deals with that header;
//! [`crate::primitive`] and [`crate::value`] interpret the bytes it brackets.

use crate::errors::{ProtocolError, Result};

/// Whether a tag number is interpreted as a primitive type (application) or
/// in the context of the enclosing constructed value (context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    /// Tag number identifies a primitive application type.
    Application,
    /// Tag number is meaningful only within the enclosing structure.
    Context,
}

/// LVT value reserved to mean "open a constructed context-tagged value".
pub const LVT_OPENING: u32 = 6;
/// LVT value reserved to mean "close a constructed context-tagged value".
pub const LVT_CLOSING: u32 = 7;
/// LVT value reserved to mean "the real length follows in extra octets".
const LVT_EXTENDED: u32 = 5;
/// Tag-number nibble reserved to mean "the real tag number follows in the next octet".
const TAG_NUMBER_EXTENDED: u8 = 15;

/// A decoded tag header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Tag number, `0..=254`.
    pub number: u8,
    /// Application or context class.
    pub class: TagClass,
    /// Length/value/type: a literal boolean (0 or 1) for the application
    /// Boolean tag, [`LVT_OPENING`]/[`LVT_CLOSING`] for constructed
    /// brackets, or the length in octets of the value that follows.
    pub lvt: u32,
}

impl Tag {
    /// True if this is a context-tagged opening bracket (`lvt == 6`).
    #[must_use]
    pub fn is_opening(&self) -> bool {
        self.class == TagClass::Context && self.lvt == LVT_OPENING
    }

    /// True if this is a context-tagged closing bracket (`lvt == 7`).
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.class == TagClass::Context && self.lvt == LVT_CLOSING
    }
}

/// Encodes a tag header into `buf`, returning the number of bytes written.
///
/// Chooses the minimal legal encoding for `lvt`; encoders always emit this
/// canonical form, while [`decode_tag`] accepts any legal form.
pub fn encode_tag(buf: &mut Vec<u8>, tag_number: u8, class: TagClass, lvt: u32) -> usize {
    let start = buf.len();

    let number_nibble = if tag_number < TAG_NUMBER_EXTENDED { tag_number } else { TAG_NUMBER_EXTENDED };

    let class_bit = match class {
        TagClass::Application => 0u8,
        TagClass::Context => 0x08,
    };

    let is_bracket = lvt == LVT_OPENING || lvt == LVT_CLOSING;
    let lvt_bits = if is_bracket || lvt < LVT_EXTENDED { lvt as u8 } else { LVT_EXTENDED as u8 };

    buf.push((number_nibble << 4) | class_bit | lvt_bits);

    if tag_number >= TAG_NUMBER_EXTENDED {
        buf.push(tag_number);
    }

    if !is_bracket && lvt >= LVT_EXTENDED {
        if lvt < 254 {
            buf.push(lvt as u8);
        } else if lvt <= 0xFFFF {
            buf.push(254);
            buf.extend_from_slice(&(lvt as u16).to_be_bytes());
        } else {
            buf.push(255);
            buf.extend_from_slice(&lvt.to_be_bytes());
        }
    }

    buf.len() - start
}

/// Borrows the `len`-octet payload starting at `start`, the bytes bracketed
/// by a just-decoded tag header. Errors instead of panicking when the buffer
/// ends early, so malformed frames can be dropped rather than aborting.
pub(crate) fn payload_slice(buf: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    buf.get(start..start + len)
        .ok_or(ProtocolError::Truncated { needed: start + len, available: buf.len() })
}

/// Convenience wrapper for an application-class tag.
pub fn encode_application_tag(buf: &mut Vec<u8>, tag_number: u8, lvt: u32) -> usize {
    encode_tag(buf, tag_number, TagClass::Application, lvt)
}

/// Convenience wrapper for a context-class tag.
pub fn encode_context_tag(buf: &mut Vec<u8>, tag_number: u8, lvt: u32) -> usize {
    encode_tag(buf, tag_number, TagClass::Context, lvt)
}

/// Emits a context-tagged opening bracket.
pub fn encode_opening_tag(buf: &mut Vec<u8>, tag_number: u8) -> usize {
    encode_tag(buf, tag_number, TagClass::Context, LVT_OPENING)
}

/// Emits a context-tagged closing bracket.
pub fn encode_closing_tag(buf: &mut Vec<u8>, tag_number: u8) -> usize {
    encode_tag(buf, tag_number, TagClass::Context, LVT_CLOSING)
}

/// Decodes a tag header from the front of `buf`.
///
/// Accepts any legal encoding, including non-canonical extended-length
/// forms — only [`encode_tag`] is required to be canonical.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if `buf` ends before the header
/// (including its extended tag-number or extended-length octets) is fully
/// present.
pub fn decode_tag(buf: &[u8]) -> Result<(usize, Tag)> {
    if buf.is_empty() {
        return Err(ProtocolError::Truncated { needed: 1, available: 0 });
    }

    let first = buf[0];
    let class = if first & 0x08 == 0 { TagClass::Application } else { TagClass::Context };
    let mut consumed = 1;

    let number = if (first >> 4) == TAG_NUMBER_EXTENDED {
        let byte = *buf.get(consumed).ok_or(ProtocolError::Truncated {
            needed: consumed + 1,
            available: buf.len(),
        })?;
        consumed += 1;
        byte
    } else {
        first >> 4
    };

    let lvt_bits = u32::from(first & 0x07);
    let lvt = if lvt_bits < LVT_EXTENDED || lvt_bits == LVT_OPENING || lvt_bits == LVT_CLOSING {
        lvt_bits
    } else {
        let first_extra =
            *buf.get(consumed).ok_or(ProtocolError::Truncated {
                needed: consumed + 1,
                available: buf.len(),
            })?;
        consumed += 1;

        if first_extra < 254 {
            u32::from(first_extra)
        } else if first_extra == 254 {
            let bytes = buf.get(consumed..consumed + 2).ok_or(ProtocolError::Truncated {
                needed: consumed + 2,
                available: buf.len(),
            })?;
            consumed += 2;
            u32::from(u16::from_be_bytes([bytes[0], bytes[1]]))
        } else {
            let bytes = buf.get(consumed..consumed + 4).ok_or(ProtocolError::Truncated {
                needed: consumed + 4,
                available: buf.len(),
            })?;
            consumed += 4;
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
        }
    };

    Ok((consumed, Tag { number, class, lvt }))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn one_octet_tag_numbers_fit_in_header() {
        let mut buf = Vec::new();
        let len = encode_tag(&mut buf, 14, TagClass::Application, 4);
        assert_eq!(len, 1);
        assert_eq!(buf.len(), 1);

        let (consumed, tag) = decode_tag(&buf).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(tag.number, 14);
        assert_eq!(tag.lvt, 4);
    }

    #[test]
    fn tag_number_15_uses_extended_form() {
        let mut buf = Vec::new();
        let len = encode_tag(&mut buf, 15, TagClass::Context, 0);
        assert_eq!(len, 2);

        let (consumed, tag) = decode_tag(&buf).unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(tag.number, 15);
        assert_eq!(tag.class, TagClass::Context);
    }

    #[test]
    fn length_253_uses_single_extended_octet() {
        let mut buf = Vec::new();
        encode_tag(&mut buf, 0, TagClass::Application, 253);
        // header octet + one extended-length octet (253 < 254, fits in one byte)
        assert_eq!(buf.len(), 2);
        let (_, tag) = decode_tag(&buf).unwrap();
        assert_eq!(tag.lvt, 253);
    }

    #[test]
    fn length_254_uses_two_octet_form() {
        let mut buf = Vec::new();
        encode_tag(&mut buf, 0, TagClass::Application, 254);
        // header + 1 length-size octet (254) + 2 length octets
        assert_eq!(buf.len(), 4);
        let (_, tag) = decode_tag(&buf).unwrap();
        assert_eq!(tag.lvt, 254);
    }

    #[test]
    fn length_65535_uses_four_octet_form() {
        let mut buf = Vec::new();
        encode_tag(&mut buf, 0, TagClass::Application, 65535);
        assert_eq!(buf.len(), 6); // header + 1 marker + 4 length octets
        let (_, tag) = decode_tag(&buf).unwrap();
        assert_eq!(tag.lvt, 65535);
    }

    #[test]
    fn opening_and_closing_tags_round_trip() {
        let mut buf = Vec::new();
        encode_opening_tag(&mut buf, 3);
        let (consumed, tag) = decode_tag(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert!(tag.is_opening());

        let mut buf2 = Vec::new();
        encode_closing_tag(&mut buf2, 3);
        let (_, tag2) = decode_tag(&buf2).unwrap();
        assert!(tag2.is_closing());
    }

    #[test]
    fn decode_rejects_empty_buffer() {
        assert!(matches!(decode_tag(&[]), Err(ProtocolError::Truncated { .. })));
    }

    proptest! {
        #[test]
        fn tag_round_trip(
            tag_number in 0u8..=254,
            context in any::<bool>(),
            lvt in 0u32..=70_000,
        ) {
            // LVT 6/7 are reserved brackets; skip unless exercising that path directly.
            prop_assume!(lvt != LVT_OPENING && lvt != LVT_CLOSING);

            let class = if context { TagClass::Context } else { TagClass::Application };
            let mut buf = Vec::new();
            encode_tag(&mut buf, tag_number, class, lvt);

            let (consumed, tag) = decode_tag(&buf).unwrap();
            prop_assert_eq!(consumed, buf.len());
            prop_assert_eq!(tag.number, tag_number);
            prop_assert_eq!(tag.class, class);
            prop_assert_eq!(tag.lvt, lvt);
        }

        #[test]
        fn encode_is_canonical_minimal(lvt in 0u32..=70_000) {
            prop_assume!(lvt != LVT_OPENING && lvt != LVT_CLOSING);
            let mut buf = Vec::new();
            encode_tag(&mut buf, 1, TagClass::Application, lvt);

            let expected_extra = if lvt < LVT_EXTENDED {
                0
            } else if lvt < 254 {
                1
            } else if lvt <= 0xFFFF {
                3
            } else {
                5
            };

            prop_assert_eq!(buf.len(), 1 + expected_extra);
        }
    }
}
