//! Stack-wide configuration (timeouts, retry budgets, device identity).

/// Runtime configuration for a BACnet application-layer stack instance.
///
/// Defaults match the values commonly used across BACnet/IP stacks and the
/// ranges ASHRAE 135 allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Time to wait for a Simple-Ack/Complex-Ack/Error/Reject/Abort before
    /// retransmitting a confirmed request, in milliseconds.
    pub apdu_timeout_ms: u32,

    /// Number of retransmissions attempted before a confirmed transaction is
    /// abandoned.
    pub number_of_apdu_retries: u8,

    /// Time to wait for the next segment-ack or segment before the
    /// segmentation engine gives up, in milliseconds.
    pub apdu_segment_timeout_ms: u32,

    /// Largest APDU this device will accept, in octets.
    pub max_apdu: u16,

    /// Whether this device supports segmented transmit, receive, both, or
    /// neither.
    pub segmentation_supported: SegmentationSupport,

    /// This device's object instance number (0..=0x3F_FFFF).
    pub device_object_instance_number: u32,

    /// Vendor identifier advertised in I-Am broadcasts.
    pub vendor_id: u16,
}

/// A device's segmentation capability, as advertised in I-Am and negotiated
/// in Confirmed-Request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationSupport {
    /// Can both transmit and receive segmented messages.
    Both,
    /// Can transmit segmented messages but not receive them.
    Transmit,
    /// Can receive segmented messages but not transmit them.
    Receive,
    /// No segmentation support.
    None,
}

impl SegmentationSupport {
    /// Maps to the wire enumeration used by I-Am's `segmentation_supported`
    /// parameter (0=both, 1=transmit, 2=receive, 3=none).
    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            Self::Both => 0,
            Self::Transmit => 1,
            Self::Receive => 2,
            Self::None => 3,
        }
    }

    /// Inverse of [`Self::to_u32`]. Unknown codes fall back to `None`, the
    /// conservative choice when a peer's capability can't be classified.
    #[must_use]
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Both,
            1 => Self::Transmit,
            2 => Self::Receive,
            _ => Self::None,
        }
    }

    /// Whether this device can transmit segmented APDUs.
    #[must_use]
    pub fn can_transmit(self) -> bool {
        matches!(self, Self::Both | Self::Transmit)
    }

    /// Whether this device can receive segmented APDUs.
    #[must_use]
    pub fn can_receive(self) -> bool {
        matches!(self, Self::Both | Self::Receive)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apdu_timeout_ms: 3000,
            number_of_apdu_retries: 3,
            apdu_segment_timeout_ms: 2000,
            max_apdu: 1476,
            segmentation_supported: SegmentationSupport::Both,
            device_object_instance_number: 0,
            vendor_id: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.apdu_timeout_ms, 3000);
        assert_eq!(config.number_of_apdu_retries, 3);
        assert_eq!(config.apdu_segment_timeout_ms, 2000);
        assert_eq!(config.max_apdu, 1476);
    }

    #[test]
    fn segmentation_support_round_trips_through_wire_codes() {
        for support in
            [SegmentationSupport::Both, SegmentationSupport::Transmit, SegmentationSupport::Receive, SegmentationSupport::None]
        {
            assert_eq!(SegmentationSupport::from_u32(support.to_u32()), support);
        }
    }

    #[test]
    fn unknown_segmentation_code_falls_back_to_none() {
        assert_eq!(SegmentationSupport::from_u32(99), SegmentationSupport::None);
    }

    #[test]
    fn both_can_transmit_and_receive() {
        assert!(SegmentationSupport::Both.can_transmit());
        assert!(SegmentationSupport::Both.can_receive());
        assert!(!SegmentationSupport::None.can_transmit());
        assert!(!SegmentationSupport::None.can_receive());
    }
}
