//! `ReadProperty`, `ReadPropertyMultiple`, and `WriteProperty`.

use crate::errors::Result;
use crate::primitive::ObjectId;
use crate::tag::{decode_tag, TagClass};
use crate::value::{decode_application_data, decode_context_data, encode_application_data, encode_context_data, ApplicationValue};

/// Application tag number `ReadProperty`'s property-identifier field decodes as.
const PROPERTY_IDENTIFIER_APPLICATION_TAG: u8 = crate::primitive::TAG_ENUMERATED;
const ARRAY_INDEX_APPLICATION_TAG: u8 = crate::primitive::TAG_UNSIGNED_INT;

/// `ReadProperty` request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    /// Object whose property is being read.
    pub object_id: ObjectId,
    /// Property identifier (`BACnetPropertyIdentifier`), kept as its raw enum value.
    pub property_identifier: u32,
    /// Index into an array-valued property, if any.
    pub array_index: Option<u32>,
}

/// Encodes a `ReadProperty` request body, returning bytes written.
pub fn encode_read_property_request(buf: &mut Vec<u8>, request: &ReadPropertyRequest) -> usize {
    let start = buf.len();
    encode_context_data(buf, 0, &ApplicationValue::ObjectId(request.object_id));
    encode_context_data(buf, 1, &ApplicationValue::Enumerated(request.property_identifier));
    if let Some(index) = request.array_index {
        encode_context_data(buf, 2, &ApplicationValue::UnsignedInt(index));
    }
    buf.len() - start
}

/// Decodes a `ReadProperty` request body.
pub fn decode_read_property_request(buf: &[u8]) -> Result<(usize, ReadPropertyRequest)> {
    let mut offset = 0;

    let (n, object_id_value) = decode_context_data(&buf[offset..], 0, crate::primitive::TAG_OBJECT_ID)?;
    offset += n;
    let object_id = match object_id_value {
        ApplicationValue::ObjectId(id) => id,
        other => return Err(unexpected_type("ObjectId", &other)),
    };

    let (n, property_value) = decode_context_data(&buf[offset..], 1, PROPERTY_IDENTIFIER_APPLICATION_TAG)?;
    offset += n;
    let property_identifier = match property_value {
        ApplicationValue::Enumerated(v) => v,
        other => return Err(unexpected_type("Enumerated", &other)),
    };

    let array_index = if offset < buf.len() {
        let (n, index_value) = decode_context_data(&buf[offset..], 2, ARRAY_INDEX_APPLICATION_TAG)?;
        offset += n;
        match index_value {
            ApplicationValue::UnsignedInt(v) => Some(v),
            other => return Err(unexpected_type("UnsignedInt", &other)),
        }
    } else {
        None
    };

    Ok((offset, ReadPropertyRequest { object_id, property_identifier, array_index }))
}

/// `ReadProperty` complex-ack parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyAck {
    /// Object the property was read from.
    pub object_id: ObjectId,
    /// Property identifier that was read.
    pub property_identifier: u32,
    /// Index into an array-valued property, if any.
    pub array_index: Option<u32>,
    /// The property's value.
    pub value: ApplicationValue,
}

/// Encodes a `ReadProperty` complex-ack body, returning bytes written.
pub fn encode_read_property_ack(buf: &mut Vec<u8>, ack: &ReadPropertyAck) -> usize {
    let start = buf.len();
    encode_context_data(buf, 0, &ApplicationValue::ObjectId(ack.object_id));
    encode_context_data(buf, 1, &ApplicationValue::Enumerated(ack.property_identifier));
    if let Some(index) = ack.array_index {
        encode_context_data(buf, 2, &ApplicationValue::UnsignedInt(index));
    }
    crate::tag::encode_opening_tag(buf, 3);
    encode_application_data(buf, &ack.value);
    crate::tag::encode_closing_tag(buf, 3);
    buf.len() - start
}

/// Decodes a `ReadProperty` complex-ack body.
pub fn decode_read_property_ack(buf: &[u8]) -> Result<(usize, ReadPropertyAck)> {
    let mut offset = 0;

    let (n, object_id_value) = decode_context_data(&buf[offset..], 0, crate::primitive::TAG_OBJECT_ID)?;
    offset += n;
    let object_id = match object_id_value {
        ApplicationValue::ObjectId(id) => id,
        other => return Err(unexpected_type("ObjectId", &other)),
    };

    let (n, property_value) = decode_context_data(&buf[offset..], 1, PROPERTY_IDENTIFIER_APPLICATION_TAG)?;
    offset += n;
    let property_identifier = match property_value {
        ApplicationValue::Enumerated(v) => v,
        other => return Err(unexpected_type("Enumerated", &other)),
    };

    let (opening_header, opening_tag) = decode_tag(&buf[offset..])?;
    let (array_index, value_start) = if opening_tag.class == TagClass::Context && opening_tag.number == 2 {
        let payload = crate::tag::payload_slice(buf, offset + opening_header, opening_tag.lvt as usize)?;
        let index = crate::primitive::decode_unsigned(payload)?;
        let next_offset = offset + opening_header + opening_tag.lvt as usize;
        (Some(index), next_offset)
    } else {
        (None, offset)
    };
    offset = value_start;

    let (opening_consumed, opening_tag) = decode_tag(&buf[offset..])?;
    if !opening_tag.is_opening() || opening_tag.number != 3 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "opening tag 3",
            found: opening_tag.number,
            found_context: opening_tag.class == TagClass::Context,
        });
    }
    offset += opening_consumed;

    let (value_consumed, value) = decode_application_data(&buf[offset..])?;
    offset += value_consumed;

    let (closing_consumed, closing_tag) = decode_tag(&buf[offset..])?;
    if !closing_tag.is_closing() || closing_tag.number != 3 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "closing tag 3",
            found: closing_tag.number,
            found_context: closing_tag.class == TagClass::Context,
        });
    }
    offset += closing_consumed;

    Ok((offset, ReadPropertyAck { object_id, property_identifier, array_index, value }))
}

/// A single property reference within a `ReadPropertyMultiple` specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyReference {
    /// Property identifier being requested.
    pub property_identifier: u32,
    /// Index into an array-valued property, if any.
    pub array_index: Option<u32>,
}

/// One object's worth of property references in a `ReadPropertyMultiple` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAccessSpecification {
    /// Object the properties belong to.
    pub object_id: ObjectId,
    /// Properties requested on that object.
    pub properties: Vec<PropertyReference>,
}

/// Encodes a `ReadPropertyMultiple` request body, returning bytes written.
pub fn encode_read_property_multiple_request(buf: &mut Vec<u8>, specs: &[ReadAccessSpecification]) -> usize {
    let start = buf.len();
    for spec in specs {
        encode_context_data(buf, 0, &ApplicationValue::ObjectId(spec.object_id));
        crate::tag::encode_opening_tag(buf, 1);
        for property in &spec.properties {
            encode_context_data(buf, 0, &ApplicationValue::Enumerated(property.property_identifier));
            if let Some(index) = property.array_index {
                encode_context_data(buf, 1, &ApplicationValue::UnsignedInt(index));
            }
        }
        crate::tag::encode_closing_tag(buf, 1);
    }
    buf.len() - start
}

/// Decodes a `ReadPropertyMultiple` request body.
pub fn decode_read_property_multiple_request(buf: &[u8]) -> Result<(usize, Vec<ReadAccessSpecification>)> {
    let mut offset = 0;
    let mut specs = Vec::new();

    while offset < buf.len() {
        let (n, object_id_value) = decode_context_data(&buf[offset..], 0, crate::primitive::TAG_OBJECT_ID)?;
        offset += n;
        let object_id = match object_id_value {
            ApplicationValue::ObjectId(id) => id,
            other => return Err(unexpected_type("ObjectId", &other)),
        };

        let (opening_consumed, opening_tag) = decode_tag(&buf[offset..])?;
        if !opening_tag.is_opening() || opening_tag.number != 1 {
            return Err(crate::errors::ProtocolError::InvalidTag {
                expected: "opening tag 1",
                found: opening_tag.number,
                found_context: opening_tag.class == TagClass::Context,
            });
        }
        offset += opening_consumed;

        let mut properties = Vec::new();
        loop {
            let (_, peek_tag) = decode_tag(&buf[offset..])?;
            if peek_tag.is_closing() && peek_tag.number == 1 {
                let (closing_consumed, _) = decode_tag(&buf[offset..])?;
                offset += closing_consumed;
                break;
            }

            let (n, prop_value) =
                decode_context_data(&buf[offset..], 0, PROPERTY_IDENTIFIER_APPLICATION_TAG)?;
            offset += n;
            let property_identifier = match prop_value {
                ApplicationValue::Enumerated(v) => v,
                other => return Err(unexpected_type("Enumerated", &other)),
            };

            let (_, maybe_index_tag) = decode_tag(&buf[offset..])?;
            let array_index = if maybe_index_tag.class == TagClass::Context && maybe_index_tag.number == 1 {
                let (n, index_value) = decode_context_data(&buf[offset..], 1, ARRAY_INDEX_APPLICATION_TAG)?;
                offset += n;
                match index_value {
                    ApplicationValue::UnsignedInt(v) => Some(v),
                    other => return Err(unexpected_type("UnsignedInt", &other)),
                }
            } else {
                None
            };

            properties.push(PropertyReference { property_identifier, array_index });
        }

        specs.push(ReadAccessSpecification { object_id, properties });
    }

    Ok((offset, specs))
}

/// Outcome of reading one property within a `ReadPropertyMultiple` request.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyReadOutcome {
    /// The property was read successfully.
    Value(ApplicationValue),
    /// The property could not be read.
    Error(super::ErrorClass, super::ErrorCode),
}

/// One property's result within a `ReadAccessResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAccessResult {
    /// Property identifier this result is for.
    pub property_identifier: u32,
    /// Index into an array-valued property, if any.
    pub array_index: Option<u32>,
    /// The read outcome.
    pub outcome: PropertyReadOutcome,
}

/// One object's worth of results in a `ReadPropertyMultiple` complex-ack.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAccessResult {
    /// Object the results belong to.
    pub object_id: ObjectId,
    /// Per-property results requested on that object.
    pub results: Vec<PropertyAccessResult>,
}

/// Encodes one `ReadAccessResult`, returning bytes written.
pub fn encode_read_access_result(buf: &mut Vec<u8>, result: &ReadAccessResult) -> usize {
    let start = buf.len();
    encode_context_data(buf, 0, &ApplicationValue::ObjectId(result.object_id));
    crate::tag::encode_opening_tag(buf, 1);
    for item in &result.results {
        encode_context_data(buf, 2, &ApplicationValue::Enumerated(item.property_identifier));
        if let Some(index) = item.array_index {
            encode_context_data(buf, 3, &ApplicationValue::UnsignedInt(index));
        }
        match &item.outcome {
            PropertyReadOutcome::Value(value) => {
                crate::tag::encode_opening_tag(buf, 4);
                encode_application_data(buf, value);
                crate::tag::encode_closing_tag(buf, 4);
            },
            PropertyReadOutcome::Error(class, code) => {
                crate::tag::encode_opening_tag(buf, 5);
                encode_application_data(buf, &ApplicationValue::Enumerated(class.to_u32()));
                encode_application_data(buf, &ApplicationValue::Enumerated(code.to_u32()));
                crate::tag::encode_closing_tag(buf, 5);
            },
        }
    }
    crate::tag::encode_closing_tag(buf, 1);
    buf.len() - start
}

/// Decodes one `ReadAccessResult`.
pub fn decode_read_access_result(buf: &[u8]) -> Result<(usize, ReadAccessResult)> {
    let mut offset = 0;

    let (n, object_id_value) = decode_context_data(&buf[offset..], 0, crate::primitive::TAG_OBJECT_ID)?;
    offset += n;
    let object_id = match object_id_value {
        ApplicationValue::ObjectId(id) => id,
        other => return Err(unexpected_type("ObjectId", &other)),
    };

    let (opening_consumed, opening_tag) = decode_tag(&buf[offset..])?;
    if !opening_tag.is_opening() || opening_tag.number != 1 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "opening tag 1",
            found: opening_tag.number,
            found_context: opening_tag.class == TagClass::Context,
        });
    }
    offset += opening_consumed;

    let mut results = Vec::new();
    loop {
        let (_, peek_tag) = decode_tag(&buf[offset..])?;
        if peek_tag.is_closing() && peek_tag.number == 1 {
            let (closing_consumed, _) = decode_tag(&buf[offset..])?;
            offset += closing_consumed;
            break;
        }

        let (n, prop_value) = decode_context_data(&buf[offset..], 2, PROPERTY_IDENTIFIER_APPLICATION_TAG)?;
        offset += n;
        let property_identifier = match prop_value {
            ApplicationValue::Enumerated(v) => v,
            other => return Err(unexpected_type("Enumerated", &other)),
        };

        let (_, maybe_index_tag) = decode_tag(&buf[offset..])?;
        let array_index = if maybe_index_tag.class == TagClass::Context && maybe_index_tag.number == 3 {
            let (n, index_value) = decode_context_data(&buf[offset..], 3, ARRAY_INDEX_APPLICATION_TAG)?;
            offset += n;
            match index_value {
                ApplicationValue::UnsignedInt(v) => Some(v),
                other => return Err(unexpected_type("UnsignedInt", &other)),
            }
        } else {
            None
        };

        let (opening_consumed, opening_tag) = decode_tag(&buf[offset..])?;
        let outcome = if opening_tag.is_opening() && opening_tag.number == 4 {
            offset += opening_consumed;
            let (value_consumed, value) = decode_application_data(&buf[offset..])?;
            offset += value_consumed;
            let (closing_consumed, closing_tag) = decode_tag(&buf[offset..])?;
            if !closing_tag.is_closing() || closing_tag.number != 4 {
                return Err(crate::errors::ProtocolError::InvalidTag {
                    expected: "closing tag 4",
                    found: closing_tag.number,
                    found_context: closing_tag.class == TagClass::Context,
                });
            }
            offset += closing_consumed;
            PropertyReadOutcome::Value(value)
        } else if opening_tag.is_opening() && opening_tag.number == 5 {
            offset += opening_consumed;
            let (class_consumed, class_value) = decode_application_data(&buf[offset..])?;
            offset += class_consumed;
            let (code_consumed, code_value) = decode_application_data(&buf[offset..])?;
            offset += code_consumed;
            let class_num = match class_value {
                ApplicationValue::Enumerated(v) => v,
                other => return Err(unexpected_type("Enumerated", &other)),
            };
            let code_num = match code_value {
                ApplicationValue::Enumerated(v) => v,
                other => return Err(unexpected_type("Enumerated", &other)),
            };
            let (closing_consumed, closing_tag) = decode_tag(&buf[offset..])?;
            if !closing_tag.is_closing() || closing_tag.number != 5 {
                return Err(crate::errors::ProtocolError::InvalidTag {
                    expected: "closing tag 5",
                    found: closing_tag.number,
                    found_context: closing_tag.class == TagClass::Context,
                });
            }
            offset += closing_consumed;
            PropertyReadOutcome::Error(super::ErrorClass::from_u32(class_num)?, super::ErrorCode::from_u32(code_num))
        } else {
            return Err(crate::errors::ProtocolError::InvalidTag {
                expected: "opening tag 4 or 5",
                found: opening_tag.number,
                found_context: opening_tag.class == TagClass::Context,
            });
        };

        results.push(PropertyAccessResult { property_identifier, array_index, outcome });
    }

    Ok((offset, ReadAccessResult { object_id, results }))
}

/// Encodes a `ReadPropertyMultiple` complex-ack body, returning bytes written.
pub fn encode_read_property_multiple_ack(buf: &mut Vec<u8>, results: &[ReadAccessResult]) -> usize {
    let start = buf.len();
    for result in results {
        encode_read_access_result(buf, result);
    }
    buf.len() - start
}

/// Decodes a `ReadPropertyMultiple` complex-ack body.
pub fn decode_read_property_multiple_ack(buf: &[u8]) -> Result<(usize, Vec<ReadAccessResult>)> {
    let mut offset = 0;
    let mut results = Vec::new();
    while offset < buf.len() {
        let (n, result) = decode_read_access_result(&buf[offset..])?;
        offset += n;
        results.push(result);
    }
    Ok((offset, results))
}

/// `WriteProperty` request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest {
    /// Object whose property is being written.
    pub object_id: ObjectId,
    /// Property identifier being written.
    pub property_identifier: u32,
    /// Index into an array-valued property, if any.
    pub array_index: Option<u32>,
    /// New value for the property.
    pub value: ApplicationValue,
    /// Write priority, `1..=16`; `None` means the default (lowest) priority.
    pub priority: Option<u8>,
}

/// Encodes a `WriteProperty` request body, returning bytes written.
pub fn encode_write_property_request(buf: &mut Vec<u8>, request: &WritePropertyRequest) -> usize {
    let start = buf.len();
    encode_context_data(buf, 0, &ApplicationValue::ObjectId(request.object_id));
    encode_context_data(buf, 1, &ApplicationValue::Enumerated(request.property_identifier));
    if let Some(index) = request.array_index {
        encode_context_data(buf, 2, &ApplicationValue::UnsignedInt(index));
    }
    crate::tag::encode_opening_tag(buf, 3);
    encode_application_data(buf, &request.value);
    crate::tag::encode_closing_tag(buf, 3);
    if let Some(priority) = request.priority {
        encode_context_data(buf, 4, &ApplicationValue::UnsignedInt(u32::from(priority)));
    }
    buf.len() - start
}

/// Decodes a `WriteProperty` request body.
pub fn decode_write_property_request(buf: &[u8]) -> Result<(usize, WritePropertyRequest)> {
    let mut offset = 0;

    let (n, object_id_value) = decode_context_data(&buf[offset..], 0, crate::primitive::TAG_OBJECT_ID)?;
    offset += n;
    let object_id = match object_id_value {
        ApplicationValue::ObjectId(id) => id,
        other => return Err(unexpected_type("ObjectId", &other)),
    };

    let (n, property_value) = decode_context_data(&buf[offset..], 1, PROPERTY_IDENTIFIER_APPLICATION_TAG)?;
    offset += n;
    let property_identifier = match property_value {
        ApplicationValue::Enumerated(v) => v,
        other => return Err(unexpected_type("Enumerated", &other)),
    };

    let (_, peek_tag) = decode_tag(&buf[offset..])?;
    let array_index = if peek_tag.class == TagClass::Context && peek_tag.number == 2 {
        let (n, index_value) = decode_context_data(&buf[offset..], 2, ARRAY_INDEX_APPLICATION_TAG)?;
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

    let (value_consumed, value) = decode_application_data(&buf[offset..])?;
    offset += value_consumed;

    let (closing_consumed, closing_tag) = decode_tag(&buf[offset..])?;
    if !closing_tag.is_closing() || closing_tag.number != 3 {
        return Err(crate::errors::ProtocolError::InvalidTag {
            expected: "closing tag 3",
            found: closing_tag.number,
            found_context: closing_tag.class == TagClass::Context,
        });
    }
    offset += closing_consumed;

    let priority = if offset < buf.len() {
        let (n, priority_value) = decode_context_data(&buf[offset..], 4, ARRAY_INDEX_APPLICATION_TAG)?;
        offset += n;
        match priority_value {
            ApplicationValue::UnsignedInt(v) => Some(v as u8),
            other => return Err(unexpected_type("UnsignedInt", &other)),
        }
    } else {
        None
    };

    Ok((offset, WritePropertyRequest { object_id, property_identifier, array_index, value, priority }))
}

fn unexpected_type(expected: &'static str, found: &ApplicationValue) -> crate::errors::ProtocolError {
    crate::errors::ProtocolError::InvalidTag { expected, found: found.tag_number(), found_context: false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::ObjectId;

    const OBJECT_DEVICE: u16 = 8;
    const PROPERTY_OBJECT_IDENTIFIER: u32 = 75;

    #[test]
    fn read_property_request_round_trips() {
        let request = ReadPropertyRequest {
            object_id: ObjectId::new(OBJECT_DEVICE, 260_001).unwrap(),
            property_identifier: PROPERTY_OBJECT_IDENTIFIER,
            array_index: None,
        };
        let mut buf = Vec::new();
        encode_read_property_request(&mut buf, &request);
        let (consumed, decoded) = decode_read_property_request(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, request);
    }

    #[test]
    fn read_property_ack_round_trips() {
        let ack = ReadPropertyAck {
            object_id: ObjectId::new(OBJECT_DEVICE, 260_001).unwrap(),
            property_identifier: PROPERTY_OBJECT_IDENTIFIER,
            array_index: None,
            value: ApplicationValue::ObjectId(ObjectId::new(OBJECT_DEVICE, 260_001).unwrap()),
        };
        let mut buf = Vec::new();
        encode_read_property_ack(&mut buf, &ack);
        let (consumed, decoded) = decode_read_property_ack(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, ack);
    }

    #[test]
    fn read_property_multiple_round_trips() {
        let specs = vec![ReadAccessSpecification {
            object_id: ObjectId::new(OBJECT_DEVICE, 1).unwrap(),
            properties: vec![
                PropertyReference { property_identifier: PROPERTY_OBJECT_IDENTIFIER, array_index: None },
                PropertyReference { property_identifier: 28, array_index: Some(1) },
            ],
        }];
        let mut buf = Vec::new();
        encode_read_property_multiple_request(&mut buf, &specs);
        let (consumed, decoded) = decode_read_property_multiple_request(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, specs);
    }

    #[test]
    fn read_property_multiple_ack_round_trips_with_mixed_outcomes() {
        let results = vec![ReadAccessResult {
            object_id: ObjectId::new(OBJECT_DEVICE, 1).unwrap(),
            results: vec![
                PropertyAccessResult {
                    property_identifier: PROPERTY_OBJECT_IDENTIFIER,
                    array_index: None,
                    outcome: PropertyReadOutcome::Value(ApplicationValue::ObjectId(
                        ObjectId::new(OBJECT_DEVICE, 1).unwrap(),
                    )),
                },
                PropertyAccessResult {
                    property_identifier: 999, // nonexistent property
                    array_index: None,
                    outcome: PropertyReadOutcome::Error(super::super::ErrorClass::Property, super::super::ErrorCode::UnknownProperty),
                },
            ],
        }];
        let mut buf = Vec::new();
        encode_read_property_multiple_ack(&mut buf, &results);
        let (consumed, decoded) = decode_read_property_multiple_ack(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, results);
    }

    #[test]
    fn write_property_with_priority_round_trips() {
        let request = WritePropertyRequest {
            object_id: ObjectId::new(0, 3).unwrap(),
            property_identifier: 85, // present-value
            array_index: None,
            value: ApplicationValue::Real(21.5),
            priority: Some(8),
        };
        let mut buf = Vec::new();
        encode_write_property_request(&mut buf, &request);
        let (consumed, decoded) = decode_write_property_request(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, request);
    }
}
