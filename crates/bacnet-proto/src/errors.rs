//! Decode-time errors raised while parsing wire bytes.
//!
//! These are local-only failures: the dispatcher that owns the incoming
//! buffer drops the frame silently on any of them. They are distinct from the three peer-visible taxonomies
//! ([`crate::services::RejectReason`], [`crate::services::AbortReason`], and
//! `(ErrorClass, ErrorCode)`) which travel on the wire back to the sender.

use thiserror::Error;

/// Result type used throughout the codec.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding BACnet application-layer bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes remained in the buffer than the value being decoded requires.
    #[error("truncated: need at least {needed} byte(s), have {available}")]
    Truncated {
        /// Minimum bytes required to proceed.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// A tag header did not match the class or number the caller expected.
    #[error("invalid tag: expected {expected}, found tag number {found} (context={found_context})")]
    InvalidTag {
        /// Description of what was expected.
        expected: &'static str,
        /// Tag number actually read.
        found: u8,
        /// Whether the tag actually read was context-class.
        found_context: bool,
    },

    /// A decoded scalar field fell outside its legal range (e.g. a date's
    /// month field outside `1..=14`).
    #[error("value out of range: {field} = {value}")]
    ValueOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The out-of-range value, rendered for display.
        value: i64,
    },

    /// The application tag number has no known primitive mapping.
    ///
    /// Not itself a fatal error for [`crate::value::decode_application_data`]
    /// — unknown application tags decode to
    /// [`crate::value::ApplicationValue::Unknown`] for forward compatibility.
    /// Surfaced as an error only where the caller requires a specific type.
    #[error("unrecognized application tag number {0}")]
    UnknownTag(u8),

    /// A length-prefixed field (string, bit string, octet string) declared a
    /// length that does not fit the remaining buffer.
    #[error("length mismatch: field claims {claimed} byte(s), {available} available")]
    LengthMismatch {
        /// Length claimed by the encoded value.
        claimed: usize,
        /// Bytes actually available after the length header.
        available: usize,
    },
}
