//! Error types for the BACnet protocol core.
//!
//! Strongly-typed errors for each stateful layer: transaction state machine
//! errors, segmentation errors, and address binding errors. Decode failures
//! from `bacnet-proto` are wrapped rather than discarded, so a caller can
//! always recover the original malformed-tag/truncation detail.

use thiserror::Error;

use bacnet_proto::services::{AbortReason, RejectReason};
use bacnet_proto::ProtocolError;

/// Errors surfaced by the transaction state machine, segmentation engine,
/// address cache, and dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// No invoke ID is free to start a new confirmed transaction.
    #[error("no free invoke id: all slots in use")]
    NoFreeInvokeId,

    /// Operation referenced an invoke ID with no matching transaction.
    #[error("unknown invoke id: {0}")]
    UnknownInvokeId(u8),

    /// A confirmed transaction exceeded its retry budget without an ack.
    #[error("transaction timed out: invoke id {invoke_id} after {retries} retries")]
    TransactionTimedOut {
        /// Invoke ID of the abandoned transaction.
        invoke_id: u8,
        /// Number of retransmissions attempted before giving up.
        retries: u8,
    },

    /// The address binding cache is full and holds no evictable entry.
    #[error("address cache full: {0} static entries occupy every slot")]
    AddressCacheFull(usize),

    /// No address binding exists for the requested device instance.
    #[error("no address binding for device instance {0}")]
    UnboundDevice(u32),

    /// A segment arrived outside the expected sequence/window state.
    #[error("segment out of state: expected sequence {expected}, got {actual}")]
    SegmentOutOfState {
        /// Sequence number the reassembler expected next.
        expected: u8,
        /// Sequence number actually received.
        actual: u8,
    },

    /// Peer does not support segmentation, but the message required it.
    #[error("segmentation not supported by peer")]
    SegmentationNotSupported,

    /// An APDU could not be decoded at all.
    #[error("decode error: {0}")]
    Decode(#[from] ProtocolError),
}

impl CoreError {
    /// Maps this error to the Abort reason a peer expecting a Sent
    /// confirmation should be told, where one applies.
    #[must_use]
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self {
            Self::TransactionTimedOut { .. } => Some(AbortReason::TsmTimeout),
            Self::SegmentationNotSupported => Some(AbortReason::SegmentationNotSupported),
            Self::SegmentOutOfState { .. } => Some(AbortReason::InvalidApduInThisState),
            Self::NoFreeInvokeId | Self::AddressCacheFull(_) => Some(AbortReason::OutOfResources),
            Self::UnknownInvokeId(_) | Self::UnboundDevice(_) | Self::Decode(_) => None,
        }
    }

    /// Maps this error to the Reject reason appropriate for a malformed
    /// inbound APDU, where one applies.
    #[must_use]
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Decode(_) => Some(RejectReason::InvalidTag),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_timeout_maps_to_tsm_timeout_abort() {
        let err = CoreError::TransactionTimedOut { invoke_id: 7, retries: 3 };
        assert_eq!(err.abort_reason(), Some(AbortReason::TsmTimeout));
        assert_eq!(err.reject_reason(), None);
    }

    #[test]
    fn decode_error_maps_to_invalid_tag_reject() {
        let err = CoreError::Decode(ProtocolError::UnknownTag(99));
        assert_eq!(err.reject_reason(), Some(RejectReason::InvalidTag));
        assert_eq!(err.abort_reason(), None);
    }

    #[test]
    fn unbound_device_has_no_mapped_reason() {
        let err = CoreError::UnboundDevice(1234);
        assert_eq!(err.abort_reason(), None);
        assert_eq!(err.reject_reason(), None);
    }
}
