//! BACnet application-layer wire codec.
//!
//! Pure encode/decode over byte slices: tag headers, primitive values, the
//! tagged `ApplicationValue` union, APDU fixed headers, and per-service
//! parameter lists. Nothing here holds state, blocks, or reads a clock —
//! that lives in `bacnet-core`.
//!
//! # Layers
//!
//! - [`tag`] — the one-to-seven-octet tag header every value is prefixed with.
//! - [`primitive`] — encode/decode for each primitive type's raw payload.
//! - [`value`] — the [`value::ApplicationValue`] tagged union and its
//!   application-tagged/context-tagged encode/decode pairs.
//! - [`apdu`] — the fixed header octets distinguishing Confirmed-Request,
//!   Unconfirmed-Request, the ack/error/reject/abort PDU types.
//! - [`services`] — per-service parameter encode/decode, plus the
//!   `RejectReason`/`AbortReason`/`(ErrorClass, ErrorCode)` taxonomies.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod apdu;
pub mod errors;
pub mod primitive;
pub mod services;
pub mod tag;
pub mod value;

pub use errors::{ProtocolError, Result};
pub use primitive::{BacnetDate, BacnetTime, CharacterStringEncoding, ObjectId};
pub use tag::{Tag, TagClass};
pub use value::{decode_application_data, encode_application_data, ApplicationValue};
