//! Datalink interface consumed by the core.
//!
//! The core treats the datalink as an unreliable, datagram, possibly
//! broadcast-capable transport with no ordering or delivery guarantees. NPDU
//! framing and the physical/link layer (BACnet/IP, MS/TP, ...) live entirely
//! on the other side of this trait; nothing in `bacnet-core` parses or
//! produces NPDU bytes beyond treating them as an opaque prefix.

use std::fmt::Debug;

/// A datalink-layer peer address. Implementations vary per datalink (a
/// BACnet/IP stack carries an IPv4 socket address plus a BACnet/IP port,
/// MS/TP carries a single MAC byte); the core only needs to move, compare,
/// and hash this value.
pub trait Address: Clone + Debug + Eq + std::hash::Hash + Send + Sync + 'static {}

impl<T> Address for T where T: Clone + Debug + Eq + std::hash::Hash + Send + Sync + 'static {}

/// NPDU metadata accompanying an outgoing send, produced by an external NPDU
/// encoder. The core only inspects `data_expecting_reply`, which it sets on
/// confirmed requests so a router can prioritize accordingly; every other
/// byte is opaque and passed through unmodified.
#[derive(Debug, Clone, Default)]
pub struct NpduData {
    /// Raw NPDU header bytes to prepend to the APDU before transmission.
    pub header: Vec<u8>,
    /// Whether the originator expects an application-layer reply. Set for
    /// confirmed requests, clear for unconfirmed requests and acks/errors.
    pub data_expecting_reply: bool,
}

/// Unreliable datagram transport beneath the application layer.
///
/// A single poll cycle calls [`Datalink::receive`] with a bounded timeout,
/// dispatches whatever it returned, then moves on; nothing here blocks past
/// that timeout.
pub trait Datalink<A: Address> {
    /// Polls for at most one received PDU, waiting up to `timeout_ms`.
    ///
    /// Returns the PDU length written into `buf`, and `0` on timeout.
    fn receive(&mut self, src: &mut Option<A>, buf: &mut [u8], timeout_ms: u32) -> usize;

    /// Sends `buf[..pdu_len]` to `dest`, prefixed by `npdu_data.header`.
    ///
    /// Returns the number of octets sent, or `None` on transport failure.
    fn send_pdu(&mut self, dest: &A, npdu_data: &NpduData, buf: &[u8], pdu_len: usize) -> Option<usize>;

    /// This datalink's broadcast address, used for Who-Is/I-Am.
    fn broadcast_address(&self) -> A;

    /// This node's own address on the datalink.
    fn my_address(&self) -> A;
}
