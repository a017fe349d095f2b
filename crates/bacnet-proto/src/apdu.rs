//! APDU fixed-header codec (ASHRAE 135 clause 20.1).
//!
//! Only the header octets are handled here; everything after the header —
//! service parameters, reject/abort/error codes — belongs to
//! [`crate::services`]. The header shape differs by PDU type, so this module
//! exposes one variant struct per type behind an [`Apdu`] enum rather than a
//! single fixed-layout struct.

use crate::errors::{ProtocolError, Result};

/// PDU type nibble values (top 4 bits of the first octet).
pub mod pdu_type {
    /// Confirmed-Request.
    pub const CONFIRMED_REQUEST: u8 = 0x0;
    /// Unconfirmed-Request.
    pub const UNCONFIRMED_REQUEST: u8 = 0x1;
    /// Simple-Ack.
    pub const SIMPLE_ACK: u8 = 0x2;
    /// Complex-Ack.
    pub const COMPLEX_ACK: u8 = 0x3;
    /// Segment-Ack.
    pub const SEGMENT_ACK: u8 = 0x4;
    /// Error.
    pub const ERROR: u8 = 0x5;
    /// Reject.
    pub const REJECT: u8 = 0x6;
    /// Abort.
    pub const ABORT: u8 = 0x7;
}

/// Decodes the max-APDU-length code (low nibble of the second header octet
/// in Confirmed-Request/Complex-Ack/Segment-Ack headers) into an actual
/// octet count, per the fixed ASHRAE 135 table.
#[must_use]
pub fn max_apdu_from_code(code: u8) -> u16 {
    match code {
        0 => 50,
        1 => 128,
        2 => 206,
        3 => 480,
        4 => 1024,
        _ => 1476,
    }
}

/// Encodes an actual max-APDU octet count into the nearest-fitting code.
#[must_use]
pub fn max_apdu_to_code(max_apdu: u16) -> u8 {
    match max_apdu {
        0..=50 => 0,
        51..=128 => 1,
        129..=206 => 2,
        207..=480 => 3,
        481..=1024 => 4,
        _ => 5,
    }
}

/// Decodes the max-segments-accepted code (high nibble of the second header
/// octet) into an actual segment count, `0` meaning "segmentation not
/// indicated / unspecified".
#[must_use]
pub fn max_segments_from_code(code: u8) -> u8 {
    match code {
        0 => 0,
        1 => 2,
        2 => 4,
        3 => 8,
        4 => 16,
        5 => 32,
        6 => 64,
        _ => 255,
    }
}

/// Encodes an actual max-segments count into the nearest-fitting code.
#[must_use]
pub fn max_segments_to_code(max_segments: u8) -> u8 {
    match max_segments {
        0 => 0,
        1..=2 => 1,
        3..=4 => 2,
        5..=8 => 3,
        9..=16 => 4,
        17..=32 => 5,
        33..=64 => 6,
        _ => 7,
    }
}

/// Decoded Confirmed-Request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedRequestHeader {
    /// Whether the request itself is segmented.
    pub segmented: bool,
    /// Whether more segments follow this one.
    pub more_follows: bool,
    /// Whether the originator accepts a segmented response.
    pub segmented_response_accepted: bool,
    /// Max segments the originator accepts, decoded from its wire code.
    pub max_segments_accepted: u8,
    /// Max APDU length the originator accepts, decoded from its wire code.
    pub max_apdu_accepted: u16,
    /// Invoke ID chosen by the originator.
    pub invoke_id: u8,
    /// Present only when `segmented` is set.
    pub sequence_number: Option<u8>,
    /// Present only when `segmented` is set.
    pub proposed_window_size: Option<u8>,
    /// Service choice selecting which confirmed service this request invokes.
    pub service_choice: u8,
}

impl ConfirmedRequestHeader {
    /// Encodes the header, returning bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let start = buf.len();
        let mut flags = pdu_type::CONFIRMED_REQUEST << 4;
        if self.segmented {
            flags |= 0x08;
        }
        if self.more_follows {
            flags |= 0x04;
        }
        if self.segmented_response_accepted {
            flags |= 0x02;
        }
        buf.push(flags);
        buf.push(
            (max_segments_to_code(self.max_segments_accepted) << 4)
                | max_apdu_to_code(self.max_apdu_accepted),
        );
        buf.push(self.invoke_id);
        if self.segmented {
            buf.push(self.sequence_number.unwrap_or(0));
            buf.push(self.proposed_window_size.unwrap_or(0));
        }
        buf.push(self.service_choice);
        buf.len() - start
    }

    /// Decodes the header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(usize, Self)> {
        if buf.len() < 3 {
            return Err(ProtocolError::Truncated { needed: 3, available: buf.len() });
        }
        let flags = buf[0];
        if flags >> 4 != pdu_type::CONFIRMED_REQUEST {
            return Err(ProtocolError::InvalidTag {
                expected: "Confirmed-Request PDU type",
                found: flags >> 4,
                found_context: false,
            });
        }
        let segmented = flags & 0x08 != 0;
        let more_follows = flags & 0x04 != 0;
        let segmented_response_accepted = flags & 0x02 != 0;
        let max_segments_accepted = max_segments_from_code(buf[1] >> 4);
        let max_apdu_accepted = max_apdu_from_code(buf[1] & 0x0F);
        let invoke_id = buf[2];

        let mut consumed = 3;
        let (sequence_number, proposed_window_size) = if segmented {
            if buf.len() < consumed + 2 {
                return Err(ProtocolError::Truncated { needed: consumed + 2, available: buf.len() });
            }
            let seq = buf[consumed];
            let window = buf[consumed + 1];
            consumed += 2;
            (Some(seq), Some(window))
        } else {
            (None, None)
        };

        let service_choice =
            *buf.get(consumed).ok_or(ProtocolError::Truncated { needed: consumed + 1, available: buf.len() })?;
        consumed += 1;

        Ok((
            consumed,
            Self {
                segmented,
                more_follows,
                segmented_response_accepted,
                max_segments_accepted,
                max_apdu_accepted,
                invoke_id,
                sequence_number,
                proposed_window_size,
                service_choice,
            },
        ))
    }
}

/// Decoded Unconfirmed-Request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnconfirmedRequestHeader {
    /// Service choice selecting which unconfirmed service this invokes.
    pub service_choice: u8,
}

impl UnconfirmedRequestHeader {
    /// Encodes the header, returning bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let start = buf.len();
        buf.push(pdu_type::UNCONFIRMED_REQUEST << 4);
        buf.push(self.service_choice);
        buf.len() - start
    }

    /// Decodes the header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(usize, Self)> {
        if buf.len() < 2 {
            return Err(ProtocolError::Truncated { needed: 2, available: buf.len() });
        }
        if buf[0] >> 4 != pdu_type::UNCONFIRMED_REQUEST {
            return Err(ProtocolError::InvalidTag {
                expected: "Unconfirmed-Request PDU type",
                found: buf[0] >> 4,
                found_context: false,
            });
        }
        Ok((2, Self { service_choice: buf[1] }))
    }
}

/// Decoded Simple-Ack header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleAckHeader {
    /// Invoke ID this ack correlates to.
    pub invoke_id: u8,
    /// Service choice of the original confirmed request.
    pub service_choice: u8,
}

impl SimpleAckHeader {
    /// Encodes the header, returning bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let start = buf.len();
        buf.push(pdu_type::SIMPLE_ACK << 4);
        buf.push(self.invoke_id);
        buf.push(self.service_choice);
        buf.len() - start
    }

    /// Decodes the header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(usize, Self)> {
        if buf.len() < 3 {
            return Err(ProtocolError::Truncated { needed: 3, available: buf.len() });
        }
        if buf[0] >> 4 != pdu_type::SIMPLE_ACK {
            return Err(ProtocolError::InvalidTag {
                expected: "Simple-Ack PDU type",
                found: buf[0] >> 4,
                found_context: false,
            });
        }
        Ok((3, Self { invoke_id: buf[1], service_choice: buf[2] }))
    }
}

/// Decoded Complex-Ack header, possibly segmented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexAckHeader {
    /// Whether this ack itself is segmented.
    pub segmented: bool,
    /// Whether more segments follow this one.
    pub more_follows: bool,
    /// Invoke ID this ack correlates to.
    pub invoke_id: u8,
    /// Present only when `segmented` is set.
    pub sequence_number: Option<u8>,
    /// Present only when `segmented` is set.
    pub proposed_window_size: Option<u8>,
    /// Service choice of the original confirmed request.
    pub service_choice: u8,
}

impl ComplexAckHeader {
    /// Encodes the header, returning bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let start = buf.len();
        let mut flags = pdu_type::COMPLEX_ACK << 4;
        if self.segmented {
            flags |= 0x08;
        }
        if self.more_follows {
            flags |= 0x04;
        }
        buf.push(flags);
        buf.push(self.invoke_id);
        if self.segmented {
            buf.push(self.sequence_number.unwrap_or(0));
            buf.push(self.proposed_window_size.unwrap_or(0));
        }
        buf.push(self.service_choice);
        buf.len() - start
    }

    /// Decodes the header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(usize, Self)> {
        if buf.len() < 2 {
            return Err(ProtocolError::Truncated { needed: 2, available: buf.len() });
        }
        let flags = buf[0];
        if flags >> 4 != pdu_type::COMPLEX_ACK {
            return Err(ProtocolError::InvalidTag {
                expected: "Complex-Ack PDU type",
                found: flags >> 4,
                found_context: false,
            });
        }
        let segmented = flags & 0x08 != 0;
        let more_follows = flags & 0x04 != 0;
        let invoke_id = buf[1];

        let mut consumed = 2;
        let (sequence_number, proposed_window_size) = if segmented {
            if buf.len() < consumed + 2 {
                return Err(ProtocolError::Truncated { needed: consumed + 2, available: buf.len() });
            }
            let seq = buf[consumed];
            let window = buf[consumed + 1];
            consumed += 2;
            (Some(seq), Some(window))
        } else {
            (None, None)
        };

        let service_choice =
            *buf.get(consumed).ok_or(ProtocolError::Truncated { needed: consumed + 1, available: buf.len() })?;
        consumed += 1;

        Ok((
            consumed,
            Self { segmented, more_follows, invoke_id, sequence_number, proposed_window_size, service_choice },
        ))
    }
}

/// Decoded Segment-Ack header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentAckHeader {
    /// True if this ack reports a gap and requests rewind-retransmit.
    pub negative_ack: bool,
    /// True if the sender of this ack is the original request's server.
    pub server: bool,
    /// Invoke ID of the transaction being acked.
    pub invoke_id: u8,
    /// Sequence number of the last segment successfully received.
    pub sequence_number: u8,
    /// Window size the acker is now prepared to receive.
    pub actual_window_size: u8,
}

impl SegmentAckHeader {
    /// Encodes the header, returning bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let start = buf.len();
        let mut flags = pdu_type::SEGMENT_ACK << 4;
        if self.negative_ack {
            flags |= 0x02;
        }
        if self.server {
            flags |= 0x01;
        }
        buf.push(flags);
        buf.push(self.invoke_id);
        buf.push(self.sequence_number);
        buf.push(self.actual_window_size);
        buf.len() - start
    }

    /// Decodes the header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(usize, Self)> {
        if buf.len() < 4 {
            return Err(ProtocolError::Truncated { needed: 4, available: buf.len() });
        }
        let flags = buf[0];
        if flags >> 4 != pdu_type::SEGMENT_ACK {
            return Err(ProtocolError::InvalidTag {
                expected: "Segment-Ack PDU type",
                found: flags >> 4,
                found_context: false,
            });
        }
        Ok((
            4,
            Self {
                negative_ack: flags & 0x02 != 0,
                server: flags & 0x01 != 0,
                invoke_id: buf[1],
                sequence_number: buf[2],
                actual_window_size: buf[3],
            },
        ))
    }
}

/// Decoded Error header (the error class/code pair follows as application
/// data, see [`crate::services`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorHeader {
    /// Invoke ID of the transaction that failed.
    pub invoke_id: u8,
    /// Service choice of the original confirmed request.
    pub service_choice: u8,
}

impl ErrorHeader {
    /// Encodes the header, returning bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let start = buf.len();
        buf.push(pdu_type::ERROR << 4);
        buf.push(self.invoke_id);
        buf.push(self.service_choice);
        buf.len() - start
    }

    /// Decodes the header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(usize, Self)> {
        if buf.len() < 3 {
            return Err(ProtocolError::Truncated { needed: 3, available: buf.len() });
        }
        if buf[0] >> 4 != pdu_type::ERROR {
            return Err(ProtocolError::InvalidTag {
                expected: "Error PDU type",
                found: buf[0] >> 4,
                found_context: false,
            });
        }
        Ok((3, Self { invoke_id: buf[1], service_choice: buf[2] }))
    }
}

/// Decoded Reject header (reason is a single trailing octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectHeader {
    /// Invoke ID of the rejected request.
    pub invoke_id: u8,
    /// Reason code, see [`crate::services::RejectReason`].
    pub reason: u8,
}

impl RejectHeader {
    /// Encodes the header, returning bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let start = buf.len();
        buf.push(pdu_type::REJECT << 4);
        buf.push(self.invoke_id);
        buf.push(self.reason);
        buf.len() - start
    }

    /// Decodes the header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(usize, Self)> {
        if buf.len() < 3 {
            return Err(ProtocolError::Truncated { needed: 3, available: buf.len() });
        }
        if buf[0] >> 4 != pdu_type::REJECT {
            return Err(ProtocolError::InvalidTag {
                expected: "Reject PDU type",
                found: buf[0] >> 4,
                found_context: false,
            });
        }
        Ok((3, Self { invoke_id: buf[1], reason: buf[2] }))
    }
}

/// Decoded Abort header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortHeader {
    /// True if the aborting party is the original request's server.
    pub server: bool,
    /// Invoke ID of the aborted transaction.
    pub invoke_id: u8,
    /// Reason code, see [`crate::services::AbortReason`].
    pub reason: u8,
}

impl AbortHeader {
    /// Encodes the header, returning bytes written.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        let start = buf.len();
        let mut flags = pdu_type::ABORT << 4;
        if self.server {
            flags |= 0x01;
        }
        buf.push(flags);
        buf.push(self.invoke_id);
        buf.push(self.reason);
        buf.len() - start
    }

    /// Decodes the header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(usize, Self)> {
        if buf.len() < 3 {
            return Err(ProtocolError::Truncated { needed: 3, available: buf.len() });
        }
        let flags = buf[0];
        if flags >> 4 != pdu_type::ABORT {
            return Err(ProtocolError::InvalidTag {
                expected: "Abort PDU type",
                found: flags >> 4,
                found_context: false,
            });
        }
        Ok((3, Self { server: flags & 0x01 != 0, invoke_id: buf[1], reason: buf[2] }))
    }
}

/// The classified first octet of an incoming APDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apdu {
    /// Confirmed-Request.
    ConfirmedRequest(ConfirmedRequestHeader),
    /// Unconfirmed-Request.
    UnconfirmedRequest(UnconfirmedRequestHeader),
    /// Simple-Ack.
    SimpleAck(SimpleAckHeader),
    /// Complex-Ack.
    ComplexAck(ComplexAckHeader),
    /// Segment-Ack.
    SegmentAck(SegmentAckHeader),
    /// Error.
    Error(ErrorHeader),
    /// Reject.
    Reject(RejectHeader),
    /// Abort.
    Abort(AbortHeader),
}

impl Apdu {
    /// Classifies and decodes the header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(usize, Self)> {
        let first = *buf.first().ok_or(ProtocolError::Truncated { needed: 1, available: 0 })?;
        match first >> 4 {
            pdu_type::CONFIRMED_REQUEST => {
                let (n, h) = ConfirmedRequestHeader::decode(buf)?;
                Ok((n, Self::ConfirmedRequest(h)))
            },
            pdu_type::UNCONFIRMED_REQUEST => {
                let (n, h) = UnconfirmedRequestHeader::decode(buf)?;
                Ok((n, Self::UnconfirmedRequest(h)))
            },
            pdu_type::SIMPLE_ACK => {
                let (n, h) = SimpleAckHeader::decode(buf)?;
                Ok((n, Self::SimpleAck(h)))
            },
            pdu_type::COMPLEX_ACK => {
                let (n, h) = ComplexAckHeader::decode(buf)?;
                Ok((n, Self::ComplexAck(h)))
            },
            pdu_type::SEGMENT_ACK => {
                let (n, h) = SegmentAckHeader::decode(buf)?;
                Ok((n, Self::SegmentAck(h)))
            },
            pdu_type::ERROR => {
                let (n, h) = ErrorHeader::decode(buf)?;
                Ok((n, Self::Error(h)))
            },
            pdu_type::REJECT => {
                let (n, h) = RejectHeader::decode(buf)?;
                Ok((n, Self::Reject(h)))
            },
            pdu_type::ABORT => {
                let (n, h) = AbortHeader::decode(buf)?;
                Ok((n, Self::Abort(h)))
            },
            other => {
                Err(ProtocolError::InvalidTag { expected: "known PDU type", found: other, found_context: false })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_property_request_header_wire_bytes() {
        // Confirmed, max-seg 0, max-apdu 1476 (code 5), invoke-id 1,
        // service ReadProperty (12 / 0x0C).
        let header = ConfirmedRequestHeader {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: false,
            max_segments_accepted: 0,
            max_apdu_accepted: 1476,
            invoke_id: 1,
            sequence_number: None,
            proposed_window_size: None,
            service_choice: 12,
        };
        let mut buf = Vec::new();
        header.encode(&mut buf);
        assert_eq!(buf, vec![0x00, 0x05, 0x01, 0x0C]);
    }

    #[test]
    fn confirmed_request_round_trips_with_segmentation() {
        let header = ConfirmedRequestHeader {
            segmented: true,
            more_follows: true,
            segmented_response_accepted: true,
            max_segments_accepted: 4,
            max_apdu_accepted: 480,
            invoke_id: 7,
            sequence_number: Some(2),
            proposed_window_size: Some(4),
            service_choice: 14,
        };
        let mut buf = Vec::new();
        let written = header.encode(&mut buf);
        let (consumed, decoded) = ConfirmedRequestHeader::decode(&buf).unwrap();
        assert_eq!(consumed, written);
        assert_eq!(decoded, header);
    }

    #[test]
    fn apdu_classifies_by_top_nibble() {
        let mut buf = Vec::new();
        UnconfirmedRequestHeader { service_choice: 8 }.encode(&mut buf);
        let (_, apdu) = Apdu::decode(&buf).unwrap();
        assert!(matches!(apdu, Apdu::UnconfirmedRequest(h) if h.service_choice == 8));
    }

    #[test]
    fn segment_ack_round_trips() {
        let header = SegmentAckHeader {
            negative_ack: true,
            server: false,
            invoke_id: 3,
            sequence_number: 2,
            actual_window_size: 4,
        };
        let mut buf = Vec::new();
        header.encode(&mut buf);
        let (_, decoded) = SegmentAckHeader::decode(&buf).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn max_apdu_code_round_trips_through_canonical_bucket() {
        assert_eq!(max_apdu_from_code(max_apdu_to_code(1476)), 1476);
        assert_eq!(max_apdu_from_code(max_apdu_to_code(50)), 50);
    }
}
