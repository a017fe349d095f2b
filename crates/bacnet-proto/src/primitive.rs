//! Primitive value encode/decode (ASHRAE 135 clause 20.2).
//!
//! Functions here work on raw payload bytes only — the caller is
//! responsible for reading/writing the tag header via [`crate::tag`]. The
//! `encode_application_<T>` wrappers are the one exception: they are
//! convenience functions that emit the application tag *and* the payload
//! together.

use crate::errors::{ProtocolError, Result};
use crate::tag::{encode_application_tag, TagClass};

/// Application tag number for `Null`.
pub const TAG_NULL: u8 = 0;
/// Application tag number for `Boolean`.
pub const TAG_BOOLEAN: u8 = 1;
/// Application tag number for `UnsignedInt`.
pub const TAG_UNSIGNED_INT: u8 = 2;
/// Application tag number for `SignedInt`.
pub const TAG_SIGNED_INT: u8 = 3;
/// Application tag number for `Real`.
pub const TAG_REAL: u8 = 4;
/// Application tag number for `Double`.
pub const TAG_DOUBLE: u8 = 5;
/// Application tag number for `OctetString`.
pub const TAG_OCTET_STRING: u8 = 6;
/// Application tag number for `CharacterString`.
pub const TAG_CHARACTER_STRING: u8 = 7;
/// Application tag number for `BitString`.
pub const TAG_BIT_STRING: u8 = 8;
/// Application tag number for `Enumerated`.
pub const TAG_ENUMERATED: u8 = 9;
/// Application tag number for `Date`.
pub const TAG_DATE: u8 = 10;
/// Application tag number for `Time`.
pub const TAG_TIME: u8 = 11;
/// Application tag number for `ObjectId`.
pub const TAG_OBJECT_ID: u8 = 12;

// ---------------------------------------------------------------------
// Unsigned integer
// ---------------------------------------------------------------------

/// Encodes `value` as a minimal big-endian byte string (1..=4 octets).
#[must_use]
pub fn encode_unsigned(value: u32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first_significant = bytes.iter().position(|&b| b != 0).unwrap_or(3);
    bytes[first_significant..].to_vec()
}

/// Decodes an unsigned integer from 1..=4 octets.
pub fn decode_unsigned(data: &[u8]) -> Result<u32> {
    if data.is_empty() || data.len() > 4 {
        return Err(ProtocolError::LengthMismatch { claimed: data.len(), available: data.len() });
    }
    let mut padded = [0u8; 4];
    padded[4 - data.len()..].copy_from_slice(data);
    Ok(u32::from_be_bytes(padded))
}

/// Emits the application tag plus minimal unsigned payload.
pub fn encode_application_unsigned(buf: &mut Vec<u8>, value: u32) -> usize {
    let payload = encode_unsigned(value);
    let start = buf.len();
    encode_application_tag(buf, TAG_UNSIGNED_INT, payload.len() as u32);
    buf.extend_from_slice(&payload);
    buf.len() - start
}

// ---------------------------------------------------------------------
// Signed integer
// ---------------------------------------------------------------------

/// Encodes `value` as a minimal two's-complement byte string (1..=4 octets),
/// dropping leading `0x00`/`0xFF` bytes only while doing so preserves the sign.
#[must_use]
pub fn encode_signed(value: i32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 3 {
        let b = bytes[start];
        let next = bytes[start + 1];
        let next_sign_bit_set = next & 0x80 != 0;
        if b == 0x00 && !next_sign_bit_set {
            start += 1;
        } else if b == 0xFF && next_sign_bit_set {
            start += 1;
        } else {
            break;
        }
    }
    bytes[start..].to_vec()
}

/// Decodes a two's-complement signed integer from 1..=4 octets, sign-extending.
pub fn decode_signed(data: &[u8]) -> Result<i32> {
    if data.is_empty() || data.len() > 4 {
        return Err(ProtocolError::LengthMismatch { claimed: data.len(), available: data.len() });
    }
    let fill = if data[0] & 0x80 != 0 { 0xFFu8 } else { 0x00u8 };
    let mut padded = [fill; 4];
    padded[4 - data.len()..].copy_from_slice(data);
    Ok(i32::from_be_bytes(padded))
}

/// Emits the application tag plus minimal signed payload.
pub fn encode_application_signed(buf: &mut Vec<u8>, value: i32) -> usize {
    let payload = encode_signed(value);
    let start = buf.len();
    encode_application_tag(buf, TAG_SIGNED_INT, payload.len() as u32);
    buf.extend_from_slice(&payload);
    buf.len() - start
}

// ---------------------------------------------------------------------
// Real / Double
// ---------------------------------------------------------------------

/// Encodes an IEEE 754 binary32, big-endian (always 4 octets).
#[must_use]
pub fn encode_real(value: f32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Decodes an IEEE 754 binary32, big-endian.
pub fn decode_real(data: &[u8]) -> Result<f32> {
    let arr: [u8; 4] =
        data.try_into().map_err(|_| ProtocolError::LengthMismatch { claimed: 4, available: data.len() })?;
    Ok(f32::from_be_bytes(arr))
}

/// Emits the application tag plus a 4-octet real payload.
pub fn encode_application_real(buf: &mut Vec<u8>, value: f32) -> usize {
    let start = buf.len();
    encode_application_tag(buf, TAG_REAL, 4);
    buf.extend_from_slice(&encode_real(value));
    buf.len() - start
}

/// Encodes an IEEE 754 binary64, big-endian (always 8 octets).
#[must_use]
pub fn encode_double(value: f64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Decodes an IEEE 754 binary64, big-endian.
pub fn decode_double(data: &[u8]) -> Result<f64> {
    let arr: [u8; 8] =
        data.try_into().map_err(|_| ProtocolError::LengthMismatch { claimed: 8, available: data.len() })?;
    Ok(f64::from_be_bytes(arr))
}

/// Emits the application tag plus an 8-octet double payload.
pub fn encode_application_double(buf: &mut Vec<u8>, value: f64) -> usize {
    let start = buf.len();
    encode_application_tag(buf, TAG_DOUBLE, 8);
    buf.extend_from_slice(&encode_double(value));
    buf.len() - start
}

// ---------------------------------------------------------------------
// Boolean
// ---------------------------------------------------------------------

/// Emits a Boolean application tag with the value carried directly in LVT
/// (no payload octets).
pub fn encode_application_boolean(buf: &mut Vec<u8>, value: bool) -> usize {
    encode_application_tag(buf, TAG_BOOLEAN, u32::from(value))
}

// ---------------------------------------------------------------------
// Octet string / Character string / Bit string
// ---------------------------------------------------------------------

/// Emits the application tag plus raw octet-string payload.
pub fn encode_application_octet_string(buf: &mut Vec<u8>, bytes: &[u8]) -> usize {
    let start = buf.len();
    encode_application_tag(buf, TAG_OCTET_STRING, bytes.len() as u32);
    buf.extend_from_slice(bytes);
    buf.len() - start
}

/// Character-string encodings recognized by ASHRAE 135 clause 20.2.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CharacterStringEncoding {
    /// UTF-8 (ANSI X3.4 / ASCII compatible subset).
    Utf8 = 0,
    /// IBM/Microsoft DBCS.
    Dbcs = 1,
    /// JIS X 0208.
    JisX0208 = 2,
    /// UCS-4.
    Ucs4 = 3,
    /// UCS-2.
    Ucs2 = 4,
    /// ISO 8859-1 (Latin-1).
    Iso8859_1 = 5,
}

impl CharacterStringEncoding {
    /// Maps a wire encoding octet to a known variant.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Utf8),
            1 => Ok(Self::Dbcs),
            2 => Ok(Self::JisX0208),
            3 => Ok(Self::Ucs4),
            4 => Ok(Self::Ucs2),
            5 => Ok(Self::Iso8859_1),
            other => Err(ProtocolError::ValueOutOfRange {
                field: "character_string_encoding",
                value: i64::from(other),
            }),
        }
    }
}

/// Emits the application tag plus a character string payload (encoding
/// octet followed by raw bytes in that encoding).
pub fn encode_application_character_string(
    buf: &mut Vec<u8>,
    encoding: CharacterStringEncoding,
    bytes: &[u8],
) -> usize {
    let start = buf.len();
    #[allow(clippy::cast_possible_truncation)]
    let lvt = (bytes.len() + 1) as u32;
    encode_application_tag(buf, TAG_CHARACTER_STRING, lvt);
    buf.push(encoding as u8);
    buf.extend_from_slice(bytes);
    buf.len() - start
}

/// Splits a character-string payload into its encoding octet and content bytes.
pub fn decode_character_string(data: &[u8]) -> Result<(CharacterStringEncoding, &[u8])> {
    let (&encoding_byte, rest) =
        data.split_first().ok_or(ProtocolError::LengthMismatch { claimed: 1, available: 0 })?;
    Ok((CharacterStringEncoding::from_u8(encoding_byte)?, rest))
}

/// Emits the application tag plus a bit-string payload (unused-bits octet
/// followed by the packed bits).
///
/// `bits_used` is the count of meaningful bits; `bytes` must be
/// `ceil(bits_used / 8)` long.
pub fn encode_application_bit_string(buf: &mut Vec<u8>, bits_used: u16, bytes: &[u8]) -> Result<usize> {
    let expected_bytes = usize::from(bits_used).div_ceil(8);
    if bytes.len() != expected_bytes {
        return Err(ProtocolError::LengthMismatch { claimed: expected_bytes, available: bytes.len() });
    }
    let unused_bits = if bytes.is_empty() { 0 } else { ((8 - usize::from(bits_used) % 8) % 8) as u8 };

    let start = buf.len();
    #[allow(clippy::cast_possible_truncation)]
    let lvt = (bytes.len() + 1) as u32;
    encode_application_tag(buf, TAG_BIT_STRING, lvt);
    buf.push(unused_bits);
    buf.extend_from_slice(bytes);
    Ok(buf.len() - start)
}

/// Splits a bit-string payload into `(bits_used, packed_bytes)`.
pub fn decode_bit_string(data: &[u8]) -> Result<(u16, &[u8])> {
    let (&unused_bits, rest) =
        data.split_first().ok_or(ProtocolError::LengthMismatch { claimed: 1, available: 0 })?;
    if unused_bits > 7 {
        return Err(ProtocolError::ValueOutOfRange {
            field: "bit_string_unused_bits",
            value: i64::from(unused_bits),
        });
    }
    let total_bits = rest.len() * 8;
    let bits_used = total_bits.saturating_sub(usize::from(unused_bits));
    #[allow(clippy::cast_possible_truncation)]
    Ok((bits_used as u16, rest))
}

// ---------------------------------------------------------------------
// Enumerated (same wire form as unsigned)
// ---------------------------------------------------------------------

/// Emits the application tag plus minimal enumerated payload.
pub fn encode_application_enumerated(buf: &mut Vec<u8>, value: u32) -> usize {
    let payload = encode_unsigned(value);
    let start = buf.len();
    encode_application_tag(buf, TAG_ENUMERATED, payload.len() as u32);
    buf.extend_from_slice(&payload);
    buf.len() - start
}

// ---------------------------------------------------------------------
// Object identifier
// ---------------------------------------------------------------------

/// Largest legal BACnet object instance number (22 bits).
pub const BACNET_MAX_INSTANCE: u32 = 0x3F_FFFF;
/// Largest legal BACnet object type number (10 bits).
pub const BACNET_MAX_OBJECT_TYPE: u16 = 0x3FF;

/// A BACnet object identifier: a 10-bit object type and a 22-bit instance
/// number, packed into a single 4-octet field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    /// Object type, `0..=1023`.
    pub object_type: u16,
    /// Instance number, `0..=4_194_303`.
    pub instance: u32,
}

impl ObjectId {
    /// Builds an object identifier, rejecting out-of-range fields.
    pub fn new(object_type: u16, instance: u32) -> Result<Self> {
        if object_type > BACNET_MAX_OBJECT_TYPE {
            return Err(ProtocolError::ValueOutOfRange {
                field: "object_type",
                value: i64::from(object_type),
            });
        }
        if instance > BACNET_MAX_INSTANCE {
            return Err(ProtocolError::ValueOutOfRange { field: "instance", value: i64::from(instance) });
        }
        Ok(Self { object_type, instance })
    }

    pub(crate) fn to_u32(self) -> u32 {
        (u32::from(self.object_type) << 22) | self.instance
    }

    fn from_u32(raw: u32) -> Self {
        Self { object_type: (raw >> 22) as u16 & BACNET_MAX_OBJECT_TYPE, instance: raw & BACNET_MAX_INSTANCE }
    }
}

/// Emits the application tag plus 4-octet object identifier payload.
pub fn encode_application_object_id(buf: &mut Vec<u8>, id: ObjectId) -> usize {
    let start = buf.len();
    encode_application_tag(buf, TAG_OBJECT_ID, 4);
    buf.extend_from_slice(&id.to_u32().to_be_bytes());
    buf.len() - start
}

/// Decodes a 4-octet object identifier payload.
pub fn decode_object_id(data: &[u8]) -> Result<ObjectId> {
    let arr: [u8; 4] =
        data.try_into().map_err(|_| ProtocolError::LengthMismatch { claimed: 4, available: data.len() })?;
    Ok(ObjectId::from_u32(u32::from_be_bytes(arr)))
}

// ---------------------------------------------------------------------
// Date / Time, with first-class wildcard markers
// ---------------------------------------------------------------------

/// Wildcard marker for BACnet year octet: `0xFF` on the wire.
const WILD_OCTET: u8 = 0xFF;

/// A BACnet date year field: either a literal year since 1900, or the
/// protocol's "any year" wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearField {
    /// Literal year, stored as the raw `actual_year - 1900` wire value.
    Year(u8),
    /// Matches any year.
    Any,
}

/// A BACnet date month field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthField {
    /// Literal month, `1..=12`.
    Month(u8),
    /// Matches any odd month.
    AnyOdd,
    /// Matches any even month.
    AnyEven,
    /// Matches any month.
    Any,
}

/// A BACnet date day-of-month field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayField {
    /// Literal day, `1..=31`.
    Day(u8),
    /// Matches the last day of the month.
    LastOfMonth,
    /// Matches any odd day.
    AnyOdd,
    /// Matches any even day.
    AnyEven,
    /// Matches any day.
    Any,
}

/// A BACnet date weekday field (`1` = Monday, `7` = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekdayField {
    /// Literal weekday, `1..=7`.
    Weekday(u8),
    /// Matches any weekday.
    Any,
}

/// A BACnet `Date` primitive, always 4 octets on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacnetDate {
    /// Year field.
    pub year: YearField,
    /// Month field.
    pub month: MonthField,
    /// Day-of-month field.
    pub day: DayField,
    /// Weekday field.
    pub weekday: WeekdayField,
}

impl BacnetDate {
    /// Builds a date from raw wire-convention octets, validating ranges and
    /// translating `0xFF`/wildcard codes into [`YearField`]/[`MonthField`]/
    /// [`DayField`]/[`WeekdayField`] variants.
    pub fn new(year_since_1900: u8, month: u8, day: u8, weekday: u8) -> Result<Self> {
        let year = if year_since_1900 == WILD_OCTET { YearField::Any } else { YearField::Year(year_since_1900) };

        let month = match month {
            1..=12 => MonthField::Month(month),
            13 => MonthField::AnyOdd,
            14 => MonthField::AnyEven,
            WILD_OCTET => MonthField::Any,
            other => {
                return Err(ProtocolError::ValueOutOfRange { field: "month", value: i64::from(other) })
            },
        };

        let day = match day {
            1..=31 => DayField::Day(day),
            32 => DayField::LastOfMonth,
            33 => DayField::AnyOdd,
            34 => DayField::AnyEven,
            WILD_OCTET => DayField::Any,
            other => return Err(ProtocolError::ValueOutOfRange { field: "day", value: i64::from(other) }),
        };

        let weekday = match weekday {
            1..=7 => WeekdayField::Weekday(weekday),
            WILD_OCTET => WeekdayField::Any,
            other => {
                return Err(ProtocolError::ValueOutOfRange { field: "weekday", value: i64::from(other) })
            },
        };

        Ok(Self { year, month, day, weekday })
    }

    /// True iff every field is a wildcard — the "any date" pattern used by
    /// schedule entries and log start/stop times.
    ///
    /// All fields must be wild (conjunction): a date with only some fields
    /// wild still constrains the others and is not "any date".
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.year == YearField::Any
            && self.month == MonthField::Any
            && self.day == DayField::Any
            && self.weekday == WeekdayField::Any
    }

    pub(crate) fn to_octets(self) -> [u8; 4] {
        let year = match self.year {
            YearField::Year(y) => y,
            YearField::Any => WILD_OCTET,
        };
        let month = match self.month {
            MonthField::Month(m) => m,
            MonthField::AnyOdd => 13,
            MonthField::AnyEven => 14,
            MonthField::Any => WILD_OCTET,
        };
        let day = match self.day {
            DayField::Day(d) => d,
            DayField::LastOfMonth => 32,
            DayField::AnyOdd => 33,
            DayField::AnyEven => 34,
            DayField::Any => WILD_OCTET,
        };
        let weekday = match self.weekday {
            WeekdayField::Weekday(w) => w,
            WeekdayField::Any => WILD_OCTET,
        };
        [year, month, day, weekday]
    }
}

/// Emits the application tag plus 4-octet date payload.
pub fn encode_application_date(buf: &mut Vec<u8>, date: BacnetDate) -> usize {
    let start = buf.len();
    encode_application_tag(buf, TAG_DATE, 4);
    buf.extend_from_slice(&date.to_octets());
    buf.len() - start
}

/// Decodes a 4-octet date payload.
pub fn decode_date(data: &[u8]) -> Result<BacnetDate> {
    if data.len() != 4 {
        return Err(ProtocolError::LengthMismatch { claimed: 4, available: data.len() });
    }
    BacnetDate::new(data[0], data[1], data[2], data[3])
}

/// A single BACnet time-of-day field: a literal `0..=99` value (hours are
/// `0..=23`, minutes/seconds/hundredths are `0..=59`/`0..=99` but the wire
/// format allows the full `0..=99` range verbatim) or the wildcard `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    /// Literal value.
    Value(u8),
    /// Matches any value for this field.
    Any,
}

impl TimeField {
    fn to_octet(self) -> u8 {
        match self {
            Self::Value(v) => v,
            Self::Any => WILD_OCTET,
        }
    }

    fn from_octet(octet: u8) -> Self {
        if octet == WILD_OCTET { Self::Any } else { Self::Value(octet) }
    }
}

/// A BACnet `Time` primitive, always 4 octets on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacnetTime {
    /// Hour field.
    pub hour: TimeField,
    /// Minute field.
    pub minute: TimeField,
    /// Second field.
    pub second: TimeField,
    /// Hundredths-of-a-second field.
    pub hundredths: TimeField,
}

impl BacnetTime {
    /// Builds a time-of-day from raw wire octets.
    #[must_use]
    pub fn new(hour: u8, minute: u8, second: u8, hundredths: u8) -> Self {
        Self {
            hour: TimeField::from_octet(hour),
            minute: TimeField::from_octet(minute),
            second: TimeField::from_octet(second),
            hundredths: TimeField::from_octet(hundredths),
        }
    }

    /// True iff every field is a wildcard — the "any time" pattern used by
    /// log start/stop times.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.hour == TimeField::Any
            && self.minute == TimeField::Any
            && self.second == TimeField::Any
            && self.hundredths == TimeField::Any
    }

    pub(crate) fn to_octets(self) -> [u8; 4] {
        [
            self.hour.to_octet(),
            self.minute.to_octet(),
            self.second.to_octet(),
            self.hundredths.to_octet(),
        ]
    }
}

/// Emits the application tag plus 4-octet time payload.
pub fn encode_application_time(buf: &mut Vec<u8>, time: BacnetTime) -> usize {
    let start = buf.len();
    encode_application_tag(buf, TAG_TIME, 4);
    buf.extend_from_slice(&time.to_octets());
    buf.len() - start
}

/// Decodes a 4-octet time payload.
pub fn decode_time(data: &[u8]) -> Result<BacnetTime> {
    if data.len() != 4 {
        return Err(ProtocolError::LengthMismatch { claimed: 4, available: data.len() });
    }
    Ok(BacnetTime::new(data[0], data[1], data[2], data[3]))
}

/// Shared helper: the [`TagClass`] every application-tagged primitive uses.
pub const APPLICATION: TagClass = TagClass::Application;
