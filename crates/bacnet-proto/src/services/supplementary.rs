//! `LifeSafetyOperation`, `ReadRange`, and `AtomicReadFile`.
//!
//! `ReadRange`'s by-sequence-number and by-time selectors and
//! `AtomicReadFile`'s record-access mode are not modeled: this crate's scope
//! covers the by-position range selector and stream file access, the forms
//! exercised by the components this crate actually drives (trend-log-style
//! buffer reads and EPICS-style file transfer). Both encoders are pure
//! functions over the shapes they do support, so adding the remaining
//! selectors later is additive.

use crate::errors::Result;
use crate::primitive::{CharacterStringEncoding, ObjectId};
use crate::tag::{decode_tag, encode_context_tag, TagClass};
use crate::value::{decode_context_data, encode_context_data, ApplicationValue};

/// `LifeSafetyOperation` request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeSafetyOperationRequest {
    /// Identifier of the requesting process, for response correlation.
    pub requesting_process_identifier: u32,
    /// Human-readable identification of the requester.
    pub requesting_source: Vec<u8>,
    /// Requested life-safety operation, kept as its raw enum value.
    pub operation: u32,
    /// Target object, if the operation applies to a specific one.
    pub object_id: Option<ObjectId>,
}

/// Encodes a `LifeSafetyOperation` request body, returning bytes written.
pub fn encode_life_safety_operation_request(buf: &mut Vec<u8>, request: &LifeSafetyOperationRequest) -> usize {
    let start = buf.len();
    encode_context_data(buf, 0, &ApplicationValue::UnsignedInt(request.requesting_process_identifier));
    let mut payload = Vec::with_capacity(request.requesting_source.len() + 1);
    payload.push(CharacterStringEncoding::Utf8 as u8);
    payload.extend_from_slice(&request.requesting_source);
    encode_context_tag(buf, 1, payload.len() as u32);
    buf.extend_from_slice(&payload);
    encode_context_data(buf, 2, &ApplicationValue::Enumerated(request.operation));
    if let Some(object_id) = request.object_id {
        encode_context_data(buf, 3, &ApplicationValue::ObjectId(object_id));
    }
    buf.len() - start
}

/// Decodes a `LifeSafetyOperation` request body.
pub fn decode_life_safety_operation_request(buf: &[u8]) -> Result<(usize, LifeSafetyOperationRequest)> {
    let mut offset = 0;

    let (n, pid_value) = decode_context_data(&buf[offset..], 0, crate::primitive::TAG_UNSIGNED_INT)?;
    offset += n;
    let requesting_process_identifier = match pid_value {
        ApplicationValue::UnsignedInt(v) => v,
        other => return Err(unexpected_type("UnsignedInt", &other)),
    };

    let (header, tag) = decode_tag(&buf[offset..])?;
    let payload = crate::tag::payload_slice(buf, offset + header, tag.lvt as usize)?;
    let (_, source_bytes) = crate::primitive::decode_character_string(payload)?;
    let requesting_source = source_bytes.to_vec();
    offset += header + tag.lvt as usize;

    let (n, op_value) = decode_context_data(&buf[offset..], 2, crate::primitive::TAG_ENUMERATED)?;
    offset += n;
    let operation = match op_value {
        ApplicationValue::Enumerated(v) => v,
        other => return Err(unexpected_type("Enumerated", &other)),
    };

    let object_id = if offset < buf.len() {
        let (n, id_value) = decode_context_data(&buf[offset..], 3, crate::primitive::TAG_OBJECT_ID)?;
        offset += n;
        match id_value {
            ApplicationValue::ObjectId(id) => Some(id),
            other => return Err(unexpected_type("ObjectId", &other)),
        }
    } else {
        None
    };

    Ok((offset, LifeSafetyOperationRequest { requesting_process_identifier, requesting_source, operation, object_id }))
}

/// `ReadRange` by-position selector: a 1-indexed reference and item count
/// (negative counts read backward from the reference, per ASHRAE 135).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByPositionRange {
    /// 1-indexed position of the reference item.
    pub reference_index: u32,
    /// Number of items to read; negative reads backward from the reference.
    pub count: i32,
}

/// `ReadRange` request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRangeRequest {
    /// Object whose list-valued property is being range-read.
    pub object_id: ObjectId,
    /// Property identifier being read.
    pub property_identifier: u32,
    /// Index into the property, if it is itself an array of lists.
    pub array_index: Option<u32>,
    /// Range selection.
    pub range: ByPositionRange,
}

/// Encodes a `ReadRange` request body, returning bytes written.
pub fn encode_read_range_request(buf: &mut Vec<u8>, request: &ReadRangeRequest) -> usize {
    let start = buf.len();
    encode_context_data(buf, 0, &ApplicationValue::ObjectId(request.object_id));
    encode_context_data(buf, 1, &ApplicationValue::Enumerated(request.property_identifier));
    if let Some(index) = request.array_index {
        encode_context_data(buf, 2, &ApplicationValue::UnsignedInt(index));
    }
    crate::tag::encode_opening_tag(buf, 3);
    encode_context_data(buf, 1, &ApplicationValue::UnsignedInt(request.range.reference_index));
    encode_context_data(buf, 2, &ApplicationValue::SignedInt(request.range.count));
    crate::tag::encode_closing_tag(buf, 3);
    buf.len() - start
}

/// Decodes a `ReadRange` request body.
pub fn decode_read_range_request(buf: &[u8]) -> Result<(usize, ReadRangeRequest)> {
    let mut offset = 0;

    let (n, object_id_value) = decode_context_data(&buf[offset..], 0, crate::primitive::TAG_OBJECT_ID)?;
    offset += n;
    let object_id = match object_id_value {
        ApplicationValue::ObjectId(id) => id,
        other => return Err(unexpected_type("ObjectId", &other)),
    };

    let (n, prop_value) = decode_context_data(&buf[offset..], 1, crate::primitive::TAG_ENUMERATED)?;
    offset += n;
    let property_identifier = match prop_value {
        ApplicationValue::Enumerated(v) => v,
        other => return Err(unexpected_type("Enumerated", &other)),
    };

    let (_, peek_tag) = decode_tag(&buf[offset..])?;
    let array_index = if peek_tag.class == TagClass::Context && peek_tag.number == 2 {
        let (n, index_value) = decode_context_data(&buf[offset..], 2, crate::primitive::TAG_UNSIGNED_INT)?;
        offset += n;
        match index_value {
            ApplicationValue::UnsignedInt(v) => Some(v),
            other => return Err(unexpected_type("UnsignedInt", &other)),
        }
    } else {
        None
    };

    let (opening_consumed, opening_tag) = decode_tag(&buf[offset..])?;
    if !opening_tag.is_opening() || opening_tag.number != 3 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "opening tag 3",
            found: opening_tag.number,
            found_context: opening_tag.class == TagClass::Context,
        });
    }
    offset += opening_consumed;

    let (n, reference_value) = decode_context_data(&buf[offset..], 1, crate::primitive::TAG_UNSIGNED_INT)?;
    offset += n;
    let reference_index = match reference_value {
        ApplicationValue::UnsignedInt(v) => v,
        other => return Err(unexpected_type("UnsignedInt", &other)),
    };

    let (n, count_value) = decode_context_data(&buf[offset..], 2, crate::primitive::TAG_SIGNED_INT)?;
    offset += n;
    let count = match count_value {
        ApplicationValue::SignedInt(v) => v,
        other => return Err(unexpected_type("SignedInt", &other)),
    };

    let (closing_consumed, closing_tag) = decode_tag(&buf[offset..])?;
    if !closing_tag.is_closing() || closing_tag.number != 3 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "closing tag 3",
            found: closing_tag.number,
            found_context: closing_tag.class == TagClass::Context,
        });
    }
    offset += closing_consumed;

    Ok((offset, ReadRangeRequest { object_id, property_identifier, array_index, range: ByPositionRange { reference_index, count } }))
}

/// `AtomicReadFile` request parameters (stream-access form only, see module docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomicReadFileRequest {
    /// File object being read.
    pub file_id: ObjectId,
    /// Byte offset to begin reading at.
    pub start_position: i32,
    /// Number of octets requested.
    pub requested_octet_count: u32,
}

/// Encodes an `AtomicReadFile` request body, returning bytes written.
pub fn encode_atomic_read_file_request(buf: &mut Vec<u8>, request: &AtomicReadFileRequest) -> usize {
    let start = buf.len();
    crate::value::encode_application_data(buf, &ApplicationValue::ObjectId(request.file_id));
    crate::tag::encode_opening_tag(buf, 0);
    crate::value::encode_application_data(buf, &ApplicationValue::SignedInt(request.start_position));
    crate::value::encode_application_data(
        buf,
        &ApplicationValue::UnsignedInt(request.requested_octet_count),
    );
    crate::tag::encode_closing_tag(buf, 0);
    buf.len() - start
}

/// Decodes an `AtomicReadFile` request body.
pub fn decode_atomic_read_file_request(buf: &[u8]) -> Result<(usize, AtomicReadFileRequest)> {
    let (n, file_value) = crate::value::decode_application_data(buf)?;
    let file_id = match file_value {
        ApplicationValue::ObjectId(id) => id,
        other => return Err(unexpected_type("ObjectId", &other)),
    };
    let mut offset = n;

    let (opening_consumed, opening_tag) = decode_tag(&buf[offset..])?;
    if !opening_tag.is_opening() || opening_tag.number != 0 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "opening tag 0 (stream access)",
            found: opening_tag.number,
            found_context: opening_tag.class == TagClass::Context,
        });
    }
    offset += opening_consumed;

    let (n, start_value) = crate::value::decode_application_data(&buf[offset..])?;
    offset += n;
    let start_position = match start_value {
        ApplicationValue::SignedInt(v) => v,
        other => return Err(unexpected_type("SignedInt", &other)),
    };

    let (n, count_value) = crate::value::decode_application_data(&buf[offset..])?;
    offset += n;
    let requested_octet_count = match count_value {
        ApplicationValue::UnsignedInt(v) => v,
        other => return Err(unexpected_type("UnsignedInt", &other)),
    };

    let (closing_consumed, closing_tag) = decode_tag(&buf[offset..])?;
    if !closing_tag.is_closing() || closing_tag.number != 0 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "closing tag 0 (stream access)",
            found: closing_tag.number,
            found_context: closing_tag.class == TagClass::Context,
        });
    }
    offset += closing_consumed;

    Ok((offset, AtomicReadFileRequest { file_id, start_position, requested_octet_count }))
}

/// `BACnetResultFlags` accompanying a `ReadRange-ACK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadRangeResultFlags {
    /// The first item in the property's value list was returned.
    pub first_item: bool,
    /// The last item in the property's value list was returned.
    pub last_item: bool,
    /// The property has more items beyond those returned here.
    pub more_items: bool,
}

/// `ReadRange` complex-ack parameters.
///
/// `item_data` is the raw bytes of `listOfResults` — the encoding of each
/// item depends on the object's log-record type, which this crate does not
/// model (see module docs), so it is carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRangeAck {
    /// Object the range was read from.
    pub object_id: ObjectId,
    /// Property identifier that was read.
    pub property_identifier: u32,
    /// Index into the property, if it is itself an array of lists.
    pub array_index: Option<u32>,
    /// Position of the returned range within the property's full value list.
    pub result_flags: ReadRangeResultFlags,
    /// Number of items present in `item_data`.
    pub item_count: u32,
    /// Raw encoded items.
    pub item_data: Vec<u8>,
}

/// Encodes a `ReadRange` complex-ack body, returning bytes written.
pub fn encode_read_range_ack(buf: &mut Vec<u8>, ack: &ReadRangeAck) -> usize {
    let start = buf.len();
    encode_context_data(buf, 0, &ApplicationValue::ObjectId(ack.object_id));
    encode_context_data(buf, 1, &ApplicationValue::Enumerated(ack.property_identifier));
    if let Some(index) = ack.array_index {
        encode_context_data(buf, 2, &ApplicationValue::UnsignedInt(index));
    }
    let flags_byte = (u8::from(ack.result_flags.first_item) << 7)
        | (u8::from(ack.result_flags.last_item) << 6)
        | (u8::from(ack.result_flags.more_items) << 5);
    encode_context_data(buf, 3, &ApplicationValue::BitString { bits_used: 3, bytes: vec![flags_byte] });
    encode_context_data(buf, 4, &ApplicationValue::UnsignedInt(ack.item_count));
    crate::tag::encode_opening_tag(buf, 5);
    buf.extend_from_slice(&ack.item_data);
    crate::tag::encode_closing_tag(buf, 5);
    buf.len() - start
}

/// Decodes a `ReadRange` complex-ack body.
pub fn decode_read_range_ack(buf: &[u8]) -> Result<(usize, ReadRangeAck)> {
    let mut offset = 0;

    let (n, object_id_value) = decode_context_data(&buf[offset..], 0, crate::primitive::TAG_OBJECT_ID)?;
    offset += n;
    let object_id = match object_id_value {
        ApplicationValue::ObjectId(id) => id,
        other => return Err(unexpected_type("ObjectId", &other)),
    };

    let (n, prop_value) = decode_context_data(&buf[offset..], 1, crate::primitive::TAG_ENUMERATED)?;
    offset += n;
    let property_identifier = match prop_value {
        ApplicationValue::Enumerated(v) => v,
        other => return Err(unexpected_type("Enumerated", &other)),
    };

    let (_, peek_tag) = decode_tag(&buf[offset..])?;
    let array_index = if peek_tag.class == TagClass::Context && peek_tag.number == 2 {
        let (n, index_value) = decode_context_data(&buf[offset..], 2, crate::primitive::TAG_UNSIGNED_INT)?;
        offset += n;
        match index_value {
            ApplicationValue::UnsignedInt(v) => Some(v),
            other => return Err(unexpected_type("UnsignedInt", &other)),
        }
    } else {
        None
    };

    let (n, flags_value) = decode_context_data(&buf[offset..], 3, crate::primitive::TAG_BIT_STRING)?;
    offset += n;
    let flags_byte = match flags_value {
        ApplicationValue::BitString { bytes, .. } => bytes.first().copied().unwrap_or(0),
        other => return Err(unexpected_type("BitString", &other)),
    };
    let result_flags = ReadRangeResultFlags {
        first_item: flags_byte & 0x80 != 0,
        last_item: flags_byte & 0x40 != 0,
        more_items: flags_byte & 0x20 != 0,
    };

    let (n, count_value) = decode_context_data(&buf[offset..], 4, crate::primitive::TAG_UNSIGNED_INT)?;
    offset += n;
    let item_count = match count_value {
        ApplicationValue::UnsignedInt(v) => v,
        other => return Err(unexpected_type("UnsignedInt", &other)),
    };

    let (opening_consumed, opening_tag) = decode_tag(&buf[offset..])?;
    if !opening_tag.is_opening() || opening_tag.number != 5 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "opening tag 5",
            found: opening_tag.number,
            found_context: opening_tag.class == TagClass::Context,
        });
    }
    offset += opening_consumed;

    let body_start = offset;
    let mut depth = 1usize;
    loop {
        let (consumed, tag) = decode_tag(buf.get(offset..).unwrap_or_default())?;
        if tag.is_opening() {
            depth += 1;
            offset += consumed;
        } else if tag.is_closing() {
            depth -= 1;
            if depth == 0 {
                let item_data = buf[body_start..offset].to_vec();
                offset += consumed;
                return Ok((
                    offset,
                    ReadRangeAck { object_id, property_identifier, array_index, result_flags, item_count, item_data },
                ));
            }
            offset += consumed;
        } else {
            offset += consumed + tag.lvt as usize;
        }
    }
}

/// `AtomicReadFile` complex-ack parameters (stream-access form only, see
/// module docs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicReadFileAck {
    /// Whether this was the last record/block of the file.
    pub end_of_file: bool,
    /// Byte offset the returned data begins at.
    pub start_position: i32,
    /// The file data returned.
    pub file_data: Vec<u8>,
}

/// Encodes an `AtomicReadFile` complex-ack body, returning bytes written.
pub fn encode_atomic_read_file_ack(buf: &mut Vec<u8>, ack: &AtomicReadFileAck) -> usize {
    let start = buf.len();
    crate::value::encode_application_data(buf, &ApplicationValue::Boolean(ack.end_of_file));
    crate::tag::encode_opening_tag(buf, 0);
    crate::value::encode_application_data(buf, &ApplicationValue::SignedInt(ack.start_position));
    crate::value::encode_application_data(buf, &ApplicationValue::OctetString(ack.file_data.clone()));
    crate::tag::encode_closing_tag(buf, 0);
    buf.len() - start
}

/// Decodes an `AtomicReadFile` complex-ack body.
pub fn decode_atomic_read_file_ack(buf: &[u8]) -> Result<(usize, AtomicReadFileAck)> {
    let (n, eof_value) = crate::value::decode_application_data(buf)?;
    let end_of_file = match eof_value {
        ApplicationValue::Boolean(v) => v,
        other => return Err(unexpected_type("Boolean", &other)),
    };
    let mut offset = n;

    let (opening_consumed, opening_tag) = decode_tag(&buf[offset..])?;
    if !opening_tag.is_opening() || opening_tag.number != 0 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "opening tag 0 (stream access)",
            found: opening_tag.number,
            found_context: opening_tag.class == TagClass::Context,
        });
    }
    offset += opening_consumed;

    let (n, start_value) = crate::value::decode_application_data(&buf[offset..])?;
    offset += n;
    let start_position = match start_value {
        ApplicationValue::SignedInt(v) => v,
        other => return Err(unexpected_type("SignedInt", &other)),
    };

    let (n, data_value) = crate::value::decode_application_data(&buf[offset..])?;
    offset += n;
    let file_data = match data_value {
        ApplicationValue::OctetString(bytes) => bytes,
        other => return Err(unexpected_type("OctetString", &other)),
    };

    let (closing_consumed, closing_tag) = decode_tag(&buf[offset..])?;
    if !closing_tag.is_closing() || closing_tag.number != 0 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "closing tag 0 (stream access)",
            found: closing_tag.number,
            found_context: closing_tag.class == TagClass::Context,
        });
    }
    offset += closing_consumed;

    Ok((offset, AtomicReadFileAck { end_of_file, start_position, file_data }))
}

fn unexpected_type(expected: &'static str, found: &ApplicationValue) -> crate::errors::ProtocolError {
    crate::errors::ProtocolError::InvalidTag { expected, found: found.tag_number(), found_context: false }
}
