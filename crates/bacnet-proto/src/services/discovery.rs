//! Who-Is / I-Am / Who-Has / I-Have (unconfirmed discovery services).

use crate::errors::Result;
use crate::primitive::{CharacterStringEncoding, ObjectId};
use crate::tag::{decode_tag, encode_context_tag, TagClass};
use crate::value::{decode_application_data, encode_application_data, encode_context_data, ApplicationValue};

/// `Who-Is` request parameters. Both bounds are optional; when both are
/// absent the request targets every device on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhoIsRequest {
    /// Inclusive lower bound on device instance number.
    pub device_instance_range_low: Option<u32>,
    /// Inclusive upper bound on device instance number.
    pub device_instance_range_high: Option<u32>,
}

/// Encodes a `Who-Is` request body (no APDU header), returning bytes written.
pub fn encode_who_is_request(buf: &mut Vec<u8>, request: &WhoIsRequest) -> usize {
    let start = buf.len();
    if let (Some(low), Some(high)) = (request.device_instance_range_low, request.device_instance_range_high) {
        encode_context_unsigned(buf, 0, low);
        encode_context_unsigned(buf, 1, high);
    }
    buf.len() - start
}

/// Decodes a `Who-Is` request body.
pub fn decode_who_is_request(buf: &[u8]) -> Result<(usize, WhoIsRequest)> {
    if buf.is_empty() {
        return Ok((0, WhoIsRequest::default()));
    }
    let (low_header, low_tag) = decode_tag(buf)?;
    if low_tag.class != TagClass::Context || low_tag.number != 0 {
        return Ok((0, WhoIsRequest::default()));
    }
    let low_bytes = crate::tag::payload_slice(buf, low_header, low_tag.lvt as usize)?;
    let low = crate::primitive::decode_unsigned(low_bytes)?;
    let mut consumed = low_header + low_tag.lvt as usize;

    let (high_header, high_tag) = decode_tag(&buf[consumed..])?;
    let high_start = consumed + high_header;
    let high_bytes = crate::tag::payload_slice(buf, high_start, high_tag.lvt as usize)?;
    let high = crate::primitive::decode_unsigned(high_bytes)?;
    consumed = high_start + high_tag.lvt as usize;

    Ok((consumed, WhoIsRequest { device_instance_range_low: Some(low), device_instance_range_high: Some(high) }))
}

/// `I-Am` broadcast parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IAmRequest {
    /// The announcing device's object identifier.
    pub device_id: ObjectId,
    /// The announcing device's advertised max APDU length.
    pub max_apdu_length_accepted: u32,
    /// The announcing device's segmentation support.
    pub segmentation_supported: u32,
    /// The announcing device's vendor identifier.
    pub vendor_id: u32,
}

/// Encodes an `I-Am` request body, returning bytes written.
pub fn encode_i_am_request(buf: &mut Vec<u8>, request: &IAmRequest) -> usize {
    let start = buf.len();
    encode_application_data(buf, &ApplicationValue::ObjectId(request.device_id));
    encode_application_data(buf, &ApplicationValue::UnsignedInt(request.max_apdu_length_accepted));
    encode_application_data(buf, &ApplicationValue::Enumerated(request.segmentation_supported));
    encode_application_data(buf, &ApplicationValue::UnsignedInt(request.vendor_id));
    buf.len() - start
}

/// Decodes an `I-Am` request body.
pub fn decode_i_am_request(buf: &[u8]) -> Result<(usize, IAmRequest)> {
    let mut offset = 0;

    let (n, device_id) = decode_application_data(&buf[offset..])?;
    offset += n;
    let device_id = expect_object_id(&device_id)?;

    let (n, max_apdu) = decode_application_data(&buf[offset..])?;
    offset += n;
    let max_apdu_length_accepted = expect_unsigned(&max_apdu)?;

    let (n, segmentation) = decode_application_data(&buf[offset..])?;
    offset += n;
    let segmentation_supported = expect_enumerated(&segmentation)?;

    let (n, vendor) = decode_application_data(&buf[offset..])?;
    offset += n;
    let vendor_id = expect_unsigned(&vendor)?;

    Ok((offset, IAmRequest { device_id, max_apdu_length_accepted, segmentation_supported, vendor_id }))
}

/// `Who-Has` request, identifying the target object either by identifier or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhoHasObjectSelector {
    /// Select by object identifier (context tag 2).
    Identifier(ObjectId),
    /// Select by object name (context tag 3).
    Name(Vec<u8>),
}

/// `Who-Has` request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoHasRequest {
    /// Optional device-instance range restricting which devices should answer.
    pub device_instance_range_low: Option<u32>,
    /// Optional device-instance range restricting which devices should answer.
    pub device_instance_range_high: Option<u32>,
    /// Which object is being searched for.
    pub selector: WhoHasObjectSelector,
}

/// Encodes a `Who-Has` request body, returning bytes written.
pub fn encode_who_has_request(buf: &mut Vec<u8>, request: &WhoHasRequest) -> usize {
    let start = buf.len();
    if let (Some(low), Some(high)) =
        (request.device_instance_range_low, request.device_instance_range_high)
    {
        encode_context_unsigned(buf, 0, low);
        encode_context_unsigned(buf, 1, high);
    }
    match &request.selector {
        WhoHasObjectSelector::Identifier(id) => {
            encode_context_data(buf, 2, &ApplicationValue::ObjectId(*id));
        },
        WhoHasObjectSelector::Name(name) => {
            encode_context_data(
                buf,
                3,
                &ApplicationValue::CharacterString {
                    encoding: CharacterStringEncoding::Utf8,
                    bytes: name.clone(),
                },
            );
        },
    }
    buf.len() - start
}

/// Decodes a `Who-Has` request body.
pub fn decode_who_has_request(buf: &[u8]) -> Result<(usize, WhoHasRequest)> {
    let mut offset = 0;
    let (header, tag) = decode_tag(&buf[offset..])?;

    let (device_instance_range_low, device_instance_range_high) = if tag.class == TagClass::Context
        && tag.number == 0
    {
        let low =
            crate::primitive::decode_unsigned(crate::tag::payload_slice(buf, offset + header, tag.lvt as usize)?)?;
        offset += header + tag.lvt as usize;
        let (header2, tag2) = decode_tag(&buf[offset..])?;
        let high = crate::primitive::decode_unsigned(crate::tag::payload_slice(
            buf,
            offset + header2,
            tag2.lvt as usize,
        )?)?;
        offset += header2 + tag2.lvt as usize;
        (Some(low), Some(high))
    } else {
        (None, None)
    };

    let (header, tag) = decode_tag(&buf[offset..])?;
    let payload_start = offset + header;
    let payload = crate::tag::payload_slice(buf, payload_start, tag.lvt as usize)?;
    let selector = if tag.number == 2 {
        WhoHasObjectSelector::Identifier(crate::primitive::decode_object_id(payload)?)
    } else {
        let (_, name_bytes) = crate::primitive::decode_character_string(payload)?;
        WhoHasObjectSelector::Name(name_bytes.to_vec())
    };
    offset = payload_start + tag.lvt as usize;

    Ok((offset, WhoHasRequest { device_instance_range_low, device_instance_range_high, selector }))
}

/// `I-Have` broadcast parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IHaveRequest {
    /// Identifier of the device that owns the announced object.
    pub device_id: ObjectId,
    /// Identifier of the announced object.
    pub object_id: ObjectId,
    /// Name of the announced object.
    pub object_name: Vec<u8>,
}

/// Encodes an `I-Have` request body, returning bytes written.
pub fn encode_i_have_request(buf: &mut Vec<u8>, request: &IHaveRequest) -> usize {
    let start = buf.len();
    encode_application_data(buf, &ApplicationValue::ObjectId(request.device_id));
    encode_application_data(buf, &ApplicationValue::ObjectId(request.object_id));
    encode_application_data(
        buf,
        &ApplicationValue::CharacterString {
            encoding: CharacterStringEncoding::Utf8,
            bytes: request.object_name.clone(),
        },
    );
    buf.len() - start
}

/// Decodes an `I-Have` request body.
pub fn decode_i_have_request(buf: &[u8]) -> Result<(usize, IHaveRequest)> {
    let mut offset = 0;
    let (n, device_id) = decode_application_data(&buf[offset..])?;
    offset += n;
    let device_id = expect_object_id(&device_id)?;

    let (n, object_id) = decode_application_data(&buf[offset..])?;
    offset += n;
    let object_id = expect_object_id(&object_id)?;

    let (n, name) = decode_application_data(&buf[offset..])?;
    offset += n;
    let object_name = match name {
        ApplicationValue::CharacterString { bytes, .. } => bytes,
        other => return Err(unexpected_type("CharacterString", &other)),
    };

    Ok((offset, IHaveRequest { device_id, object_id, object_name }))
}

fn encode_context_unsigned(buf: &mut Vec<u8>, context_number: u8, value: u32) {
    let raw = crate::primitive::encode_unsigned(value);
    encode_context_tag(buf, context_number, raw.len() as u32);
    buf.extend_from_slice(&raw);
}

fn expect_object_id(value: &ApplicationValue) -> Result<ObjectId> {
    match value {
        ApplicationValue::ObjectId(id) => Ok(*id),
        other => Err(unexpected_type("ObjectId", other)),
    }
}

fn expect_unsigned(value: &ApplicationValue) -> Result<u32> {
    match value {
        ApplicationValue::UnsignedInt(v) => Ok(*v),
        other => Err(unexpected_type("UnsignedInt", other)),
    }
}

fn expect_enumerated(value: &ApplicationValue) -> Result<u32> {
    match value {
        ApplicationValue::Enumerated(v) => Ok(*v),
        other => Err(unexpected_type("Enumerated", other)),
    }
}

fn unexpected_type(expected: &'static str, found: &ApplicationValue) -> crate::errors::ProtocolError {
    crate::errors::ProtocolError::InvalidTag { expected, found: found.tag_number(), found_context: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn who_is_bounded_round_trips() {
        let request = WhoIsRequest { device_instance_range_low: Some(123), device_instance_range_high: Some(123) };
        let mut buf = Vec::new();
        encode_who_is_request(&mut buf, &request);
        let (consumed, decoded) = decode_who_is_request(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, request);
    }

    #[test]
    fn who_is_global_round_trips() {
        let request = WhoIsRequest::default();
        let mut buf = Vec::new();
        encode_who_is_request(&mut buf, &request);
        assert!(buf.is_empty());
        let (consumed, decoded) = decode_who_is_request(&buf).unwrap();
        assert_eq!(consumed, 0);
        assert_eq!(decoded, request);
    }

    #[test]
    fn i_am_round_trips() {
        let request = IAmRequest {
            device_id: ObjectId::new(8, 123).unwrap(),
            max_apdu_length_accepted: 1476,
            segmentation_supported: 3, // "none"
            vendor_id: 42,
        };
        let mut buf = Vec::new();
        encode_i_am_request(&mut buf, &request);
        let (consumed, decoded) = decode_i_am_request(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, request);
    }

    #[test]
    fn who_has_by_identifier_round_trips() {
        let request = WhoHasRequest {
            device_instance_range_low: None,
            device_instance_range_high: None,
            selector: WhoHasObjectSelector::Identifier(ObjectId::new(0, 5).unwrap()),
        };
        let mut buf = Vec::new();
        encode_who_has_request(&mut buf, &request);
        let (consumed, decoded) = decode_who_has_request(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, request);
    }

    #[test]
    fn who_has_by_name_round_trips() {
        let request = WhoHasRequest {
            device_instance_range_low: Some(0),
            device_instance_range_high: Some(4_194_303),
            selector: WhoHasObjectSelector::Name(b"Lobby Temp".to_vec()),
        };
        let mut buf = Vec::new();
        encode_who_has_request(&mut buf, &request);
        let (consumed, decoded) = decode_who_has_request(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, request);
    }

    #[test]
    fn i_have_round_trips() {
        let request = IHaveRequest {
            device_id: ObjectId::new(8, 123).unwrap(),
            object_id: ObjectId::new(0, 5).unwrap(),
            object_name: b"Lobby Temp".to_vec(),
        };
        let mut buf = Vec::new();
        encode_i_have_request(&mut buf, &request);
        let (consumed, decoded) = decode_i_have_request(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, request);
    }
}
