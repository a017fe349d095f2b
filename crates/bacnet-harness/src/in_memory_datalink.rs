//! In-memory [`Datalink`] for exercising `bacnet-core` without real sockets.
//!
//! A single [`InMemoryNetwork`] holds one inbox per node; [`InMemoryDatalink`]
//! is a handle onto one node's inbox plus a way to drop frames into any
//! other node's, including a broadcast fan-out. There is no framing, loss,
//! or reordering here — segment-loss scenarios inject that themselves by
//! simply not calling `send_pdu` for the segment under test.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use bacnet_core::datalink::{Datalink, NpduData};

/// Node address on an [`InMemoryNetwork`]: an arbitrary small integer.
pub type NodeId = u8;

/// Reserved address meaning "every other node on this network".
pub const BROADCAST: NodeId = 0xFF;

#[derive(Debug, Default)]
struct NetworkState {
    inboxes: HashMap<NodeId, VecDeque<(NodeId, Vec<u8>)>>,
}

/// Shared medium that [`InMemoryDatalink`] handles deliver frames through.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNetwork(Rc<RefCell<NetworkState>>);

impl InMemoryNetwork {
    /// Creates a network with no nodes yet attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `id` to this network and returns its datalink handle.
    #[must_use]
    pub fn node(&self, id: NodeId) -> InMemoryDatalink {
        self.0.borrow_mut().inboxes.entry(id).or_default();
        InMemoryDatalink { network: self.clone(), id }
    }
}

/// One node's handle onto an [`InMemoryNetwork`].
#[derive(Debug, Clone)]
pub struct InMemoryDatalink {
    network: InMemoryNetwork,
    id: NodeId,
}

impl Datalink<NodeId> for InMemoryDatalink {
    fn receive(&mut self, src: &mut Option<NodeId>, buf: &mut [u8], _timeout_ms: u32) -> usize {
        let mut state = self.network.0.borrow_mut();
        let inbox = state.inboxes.entry(self.id).or_default();
        let Some((from, frame)) = inbox.pop_front() else {
            *src = None;
            return 0;
        };
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        *src = Some(from);
        n
    }

    fn send_pdu(&mut self, dest: &NodeId, npdu_data: &NpduData, buf: &[u8], pdu_len: usize) -> Option<usize> {
        let mut frame = npdu_data.header.clone();
        frame.extend_from_slice(&buf[..pdu_len]);

        tracing::trace!(from = self.id, to = *dest, len = frame.len(), "delivering frame");
        let mut state = self.network.0.borrow_mut();
        if *dest == BROADCAST {
            let targets: Vec<NodeId> =
                state.inboxes.keys().copied().filter(|node| *node != self.id).collect();
            for target in targets {
                state.inboxes.entry(target).or_default().push_back((self.id, frame.clone()));
            }
        } else {
            state.inboxes.entry(*dest).or_default().push_back((self.id, frame.clone()));
        }
        Some(frame.len())
    }

    fn broadcast_address(&self) -> NodeId {
        BROADCAST
    }

    fn my_address(&self) -> NodeId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicast_round_trips_between_two_nodes() {
        let network = InMemoryNetwork::new();
        let mut a = network.node(1);
        let mut b = network.node(2);

        let npdu = NpduData::default();
        a.send_pdu(&2, &npdu, b"hello", 5).unwrap();

        let mut buf = [0u8; 16];
        let mut src = None;
        let n = b.receive(&mut src, &mut buf, 0);
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(src, Some(1));
    }

    #[test]
    fn broadcast_reaches_every_other_node_but_not_the_sender() {
        let network = InMemoryNetwork::new();
        let mut a = network.node(1);
        let mut b = network.node(2);
        let mut c = network.node(3);

        let npdu = NpduData::default();
        a.send_pdu(&a.broadcast_address(), &npdu, b"who-is", 6).unwrap();

        let mut buf = [0u8; 16];
        let mut src = None;
        assert_eq!(b.receive(&mut src, &mut buf, 0), 6);
        assert_eq!(c.receive(&mut src, &mut buf, 0), 6);
        assert_eq!(a.receive(&mut src, &mut buf, 0), 0, "sender must not receive its own broadcast");
    }

    #[test]
    fn empty_inbox_reports_zero_and_clears_src() {
        let network = InMemoryNetwork::new();
        let mut a = network.node(1);
        let mut buf = [0u8; 8];
        let mut src = Some(9);
        assert_eq!(a.receive(&mut src, &mut buf, 0), 0);
        assert_eq!(src, None);
    }
}
