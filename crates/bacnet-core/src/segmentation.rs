//! Segmentation and reassembly engine.
//!
//! Outgoing: split an APDU too large for the peer's max-APDU into
//! fixed-size segments, send them in sliding windows, and rewind on a
//! negative or early Segment-Ack. Incoming: buffer segments keyed by
//! sequence number inside the current window, fill gaps out of order, and
//! deliver the reassembled APDU once the final segment is contiguous.
//!
//! Both sides are pure values: nothing here touches a clock or the
//! datalink. The driver calls [`OutgoingSegmentation::current_window`] /
//! [`OutgoingSegmentation::on_segment_ack`] and
//! [`IncomingReassembly::accept_segment`] and executes whatever they
//! return.

/// Octets reserved for the Complex-Ack/Confirmed-Request segmented header
/// (PDU type/flags, invoke ID, service choice, sequence number, proposed
/// window size) when computing how much payload fits in one segment.
pub const SEGMENT_HEADER_OVERHEAD: usize = 7;

/// Splits `payload` into chunks of at most `segment_size` octets. The final
/// chunk may be shorter.
#[must_use]
pub fn split_into_segments(payload: &[u8], segment_size: usize) -> Vec<Vec<u8>> {
    if payload.is_empty() {
        return vec![Vec::new()];
    }
    payload.chunks(segment_size.max(1)).map(<[u8]>::to_vec).collect()
}

/// One segment ready to transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingSegment<'a> {
    /// Wire sequence number (wraps mod 256).
    pub sequence_number: u8,
    /// Whether more segments follow this one.
    pub more_follows: bool,
    /// The segment's payload bytes.
    pub data: &'a [u8],
}

/// Outcome of delivering a Segment-Ack to an [`OutgoingSegmentation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentAckOutcome {
    /// Advance to the next window.
    ContinueWindow,
    /// Rewind and resend from an earlier segment.
    Rewind,
    /// Every segment has been acknowledged.
    Complete,
}

/// Sliding-window sender of a single oversized outgoing APDU.
#[derive(Debug, Clone)]
pub struct OutgoingSegmentation {
    segments: Vec<Vec<u8>>,
    window_size: u8,
    window_start: usize,
}

impl OutgoingSegmentation {
    /// Splits `payload` and prepares the first window.
    #[must_use]
    pub fn new(payload: &[u8], segment_size: usize, window_size: u8) -> Self {
        Self { segments: split_into_segments(payload, segment_size), window_size, window_start: 0 }
    }

    /// Total number of segments this APDU was split into.
    #[must_use]
    pub fn total_segments(&self) -> usize {
        self.segments.len()
    }

    fn current_window_len(&self) -> usize {
        (self.segments.len() - self.window_start).min(self.window_size as usize)
    }

    /// The segments due to be sent in the current window.
    #[must_use]
    pub fn current_window(&self) -> Vec<OutgoingSegment<'_>> {
        let len = self.current_window_len();
        (self.window_start..self.window_start + len)
            .map(|index| OutgoingSegment {
                sequence_number: (index % 256) as u8,
                more_follows: index + 1 < self.segments.len(),
                data: &self.segments[index],
            })
            .collect()
    }

    /// Applies a Segment-Ack, rewinding or advancing the window.
    pub fn on_segment_ack(&mut self, negative_ack: bool, sequence_number: u8) -> SegmentAckOutcome {
        let acked_index = sequence_number as usize;
        let window_len = self.current_window_len();
        let last_sent = self.window_start + window_len - 1;

        if negative_ack || acked_index < last_sent {
            tracing::debug!(sequence_number, negative_ack, "rewinding outgoing window");
            self.window_start = acked_index + 1;
        } else {
            self.window_start += window_len;
        }

        if self.window_start >= self.segments.len() {
            SegmentAckOutcome::Complete
        } else if negative_ack || acked_index < last_sent {
            SegmentAckOutcome::Rewind
        } else {
            SegmentAckOutcome::ContinueWindow
        }
    }
}

/// Outcome of delivering one inbound segment to an [`IncomingReassembly`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// Segment buffered; still waiting on the rest of the window.
    Buffered,
    /// Segment already seen (retransmission); silently ignored.
    Duplicate,
    /// A gap was detected; the sender should rewind to `resend_from`.
    NegativeAck {
        /// Sequence number the sender should resume from.
        resend_from: u8,
    },
    /// Segment arrived outside the current window.
    OutOfWindow,
    /// The APDU is fully reassembled.
    Complete(Vec<u8>),
}

/// Sliding-window receiver reassembling one inbound segmented APDU.
#[derive(Debug, Clone)]
pub struct IncomingReassembly {
    window_size: u8,
    received: Vec<Option<(bool, Vec<u8>)>>,
    expected_base: usize,
    assembled: Vec<u8>,
}

impl IncomingReassembly {
    /// Creates a reassembler expecting segment 0 first, with the given
    /// window size.
    #[must_use]
    pub fn new(window_size: u8) -> Self {
        let size = window_size.max(1) as usize;
        Self { window_size, received: vec![None; size], expected_base: 0, assembled: Vec::new() }
    }

    /// The window size this reassembler was created with.
    #[must_use]
    pub fn window_size(&self) -> u8 {
        self.window_size
    }

    /// Delivers one inbound segment.
    pub fn accept_segment(&mut self, sequence_number: u8, more_follows: bool, data: &[u8]) -> SegmentOutcome {
        let seq = sequence_number as usize;
        if seq < self.expected_base {
            return SegmentOutcome::Duplicate;
        }

        let offset = seq - self.expected_base;
        if offset >= self.window_size as usize {
            return SegmentOutcome::OutOfWindow;
        }

        if self.received[offset].is_some() {
            return SegmentOutcome::Duplicate;
        }
        self.received[offset] = Some((more_follows, data.to_vec()));

        let mut last_more_follows = true;
        let mut drained_any = false;
        while matches!(self.received.first(), Some(Some(_))) {
            if let Some((segment_more_follows, segment_data)) = self.received.remove(0) {
                self.assembled.extend_from_slice(&segment_data);
                self.received.push(None);
                self.expected_base += 1;
                last_more_follows = segment_more_follows;
                drained_any = true;
            }
        }

        if drained_any && !last_more_follows {
            return SegmentOutcome::Complete(std::mem::take(&mut self.assembled));
        }

        if let Some(gap_offset) = self.received.iter().position(Option::is_none) {
            if self.received[gap_offset + 1..].iter().any(Option::is_some) {
                let resend_from = ((self.expected_base + gap_offset) % 256) as u8;
                tracing::debug!(resend_from, "gap detected in incoming segments, requesting resend");
                return SegmentOutcome::NegativeAck { resend_from };
            }
        }

        SegmentOutcome::Buffered
    }
}
