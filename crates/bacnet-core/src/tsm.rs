//! Confirmed-request Transaction State Machine (ASHRAE 135 clause 5.4).
//!
//! One slot per outstanding invoke ID. Like [`crate::address`], this is a
//! pure value: `timer_milliseconds` advances every slot's retry clock by a
//! caller-supplied delta instead of reading one itself, so a multi-second
//! retry sequence can be driven instantly in tests.
//!
//! ```text
//! Idle ──send confirmed──▶ AwaitConfirmation
//!                              │  ack received        → Idle (free on observe)
//!                              │  error/reject/abort   → Idle (failed on observe)
//!                              │  timeout, retries<N   → AwaitConfirmation (resend)
//!                              │  timeout, retries≥N   → Idle (failed)
//!                              │  segmentation needed  → SegmentedRequest
//! SegmentedRequest ──segment-ack──▶ SegmentedRequest (next window)
//! SegmentedRequest ──all sent──▶ AwaitConfirmation
//! ```

/// Default invoke-ID slot capacity.
pub const MAX_TSM_TRANSACTIONS: usize = 255;

/// A transaction's position in the state diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Slot unused, or its outcome has been fully observed.
    Idle,
    /// A non-segmented confirmed request is outstanding.
    AwaitConfirmation,
    /// Transmitting a segmented confirmed request, awaiting the next
    /// segment-ack.
    SegmentedRequest,
    /// All segments sent; waiting for the final ack/error/reject/abort.
    AwaitSegmentedAck,
    /// Receiving a segmented complex-ack for a request we originated.
    SegmentedResponse,
}

/// A terminal outcome pending observation by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOutcome {
    None,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
struct Slot<A> {
    state: TransactionState,
    pending: PendingOutcome,
    peer: Option<A>,
    payload: Vec<u8>,
    retries_remaining: u8,
    elapsed_ms: u32,
    timeout_ms: u32,
}

impl<A> Default for Slot<A> {
    fn default() -> Self {
        Self {
            state: TransactionState::Idle,
            pending: PendingOutcome::None,
            peer: None,
            payload: Vec::new(),
            retries_remaining: 0,
            elapsed_ms: 0,
            timeout_ms: 0,
        }
    }
}

/// Action the caller must execute as a result of a TSM operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TsmAction<A> {
    /// (Re)transmit `payload` to `peer`.
    Transmit {
        /// Destination of the retransmission.
        peer: A,
        /// Full wire bytes previously stored by `set_confirmed_transaction`.
        payload: Vec<u8>,
    },
}

/// Confirmed-request transaction state machine over a fixed invoke-ID space.
#[derive(Debug, Clone)]
pub struct Tsm<A> {
    slots: Vec<Slot<A>>,
    apdu_timeout_ms: u32,
    number_of_apdu_retries: u8,
    apdu_segment_timeout_ms: u32,
    next_search: usize,
}

impl<A: Clone> Tsm<A> {
    /// Creates a TSM with `capacity` invoke-ID slots (0..capacity).
    #[must_use]
    pub fn new(capacity: usize, apdu_timeout_ms: u32, number_of_apdu_retries: u8, apdu_segment_timeout_ms: u32) -> Self {
        let capacity = capacity.min(256);
        Self {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            apdu_timeout_ms,
            number_of_apdu_retries,
            apdu_segment_timeout_ms,
            // Start allocation at 1, matching the common stack convention of
            // keeping invoke ID 0 for last.
            next_search: usize::from(capacity > 1),
        }
    }

    /// Finds an invoke ID with no outstanding transaction and no
    /// unobserved outcome. Rotates the search cursor so IDs aren't reused
    /// immediately.
    pub fn next_free_invoke_id(&mut self) -> Option<u8> {
        let capacity = self.slots.len();
        for offset in 0..capacity {
            let index = (self.next_search + offset) % capacity;
            let slot = &self.slots[index];
            if slot.state == TransactionState::Idle && slot.pending == PendingOutcome::None {
                self.next_search = (index + 1) % capacity;
                let invoke_id = u8::try_from(index).ok()?;
                tracing::trace!(invoke_id, "allocated invoke id");
                return Some(invoke_id);
            }
        }
        None
    }

    /// Stores a confirmed transaction and returns the bytes to transmit.
    ///
    /// `payload` is the full wire-encoded APDU (fixed header plus parameters)
    /// to send, and to retransmit verbatim on timeout.
    pub fn set_confirmed_transaction(&mut self, invoke_id: u8, peer: A, payload: Vec<u8>) -> (usize, TsmAction<A>) {
        let len = payload.len();
        let slot = &mut self.slots[invoke_id as usize];
        *slot = Slot {
            state: TransactionState::AwaitConfirmation,
            pending: PendingOutcome::None,
            peer: Some(peer.clone()),
            payload: payload.clone(),
            retries_remaining: self.number_of_apdu_retries,
            elapsed_ms: 0,
            timeout_ms: self.apdu_timeout_ms,
        };
        (len, TsmAction::Transmit { peer, payload })
    }

    /// Transitions a transaction from `AwaitConfirmation` to
    /// `SegmentedRequest` because the request body didn't fit in one APDU.
    pub fn begin_segmented_request(&mut self, invoke_id: u8) {
        let slot = &mut self.slots[invoke_id as usize];
        slot.state = TransactionState::SegmentedRequest;
        slot.elapsed_ms = 0;
        slot.timeout_ms = self.apdu_segment_timeout_ms;
    }

    /// Records that a segment-ack was received for the current window;
    /// stays in `SegmentedRequest` to send the next window.
    pub fn segment_window_acked(&mut self, invoke_id: u8) {
        let slot = &mut self.slots[invoke_id as usize];
        if slot.state == TransactionState::SegmentedRequest {
            slot.elapsed_ms = 0;
            slot.retries_remaining = self.number_of_apdu_retries;
        }
    }

    /// Records that the final segment was sent; now waiting for the ack to
    /// the whole request.
    pub fn all_segments_sent(&mut self, invoke_id: u8) {
        let slot = &mut self.slots[invoke_id as usize];
        slot.state = TransactionState::AwaitConfirmation;
        slot.elapsed_ms = 0;
        slot.timeout_ms = self.apdu_timeout_ms;
        slot.retries_remaining = self.number_of_apdu_retries;
    }

    /// Marks a transaction as successfully completed (simple-ack or a fully
    /// reassembled complex-ack).
    pub fn complete(&mut self, invoke_id: u8) {
        let slot = &mut self.slots[invoke_id as usize];
        if slot.state != TransactionState::Idle {
            slot.state = TransactionState::Idle;
            slot.pending = PendingOutcome::Completed;
        }
    }

    /// Marks a transaction as terminally failed (error, reject, or abort).
    pub fn fail(&mut self, invoke_id: u8) {
        let slot = &mut self.slots[invoke_id as usize];
        if slot.state != TransactionState::Idle {
            slot.state = TransactionState::Idle;
            slot.pending = PendingOutcome::Failed;
        }
    }

    /// Current state of a slot. `Idle` for an invoke ID never allocated.
    #[must_use]
    pub fn state(&self, invoke_id: u8) -> TransactionState {
        self.slots[invoke_id as usize].state
    }

    /// True iff the slot is idle and has a completed outcome pending
    /// observation. Consumes that pending flag.
    pub fn invoke_id_free(&mut self, invoke_id: u8) -> bool {
        let slot = &mut self.slots[invoke_id as usize];
        match (slot.state, slot.pending) {
            (TransactionState::Idle, PendingOutcome::None | PendingOutcome::Completed) => {
                slot.pending = PendingOutcome::None;
                true
            },
            _ => false,
        }
    }

    /// True iff the slot has a terminal failure pending observation.
    /// Consumes that pending flag.
    pub fn invoke_id_failed(&mut self, invoke_id: u8) -> bool {
        let slot = &mut self.slots[invoke_id as usize];
        if slot.state == TransactionState::Idle && slot.pending == PendingOutcome::Failed {
            slot.pending = PendingOutcome::None;
            true
        } else {
            false
        }
    }

    /// Forcibly releases a slot; any response for this invoke ID is now
    /// stale and should be silently dropped by the dispatcher.
    pub fn free_invoke_id(&mut self, invoke_id: u8) {
        self.slots[invoke_id as usize] = Slot::default();
    }

    /// Advances every outstanding slot's retry clock by `elapsed_ms`,
    /// retransmitting slots that time out until their retry budget is
    /// exhausted, at which point they become `Failed`.
    pub fn timer_milliseconds(&mut self, elapsed_ms: u32) -> Vec<TsmAction<A>> {
        let mut actions = Vec::new();
        for (invoke_id, slot) in self.slots.iter_mut().enumerate() {
            if !matches!(
                slot.state,
                TransactionState::AwaitConfirmation | TransactionState::SegmentedRequest
            ) {
                continue;
            }

            slot.elapsed_ms = slot.elapsed_ms.saturating_add(elapsed_ms);
            if slot.elapsed_ms < slot.timeout_ms {
                continue;
            }

            if slot.retries_remaining == 0 {
                tracing::debug!(invoke_id, "transaction timed out, retry budget exhausted");
                slot.state = TransactionState::Idle;
                slot.pending = PendingOutcome::Failed;
                continue;
            }

            slot.retries_remaining -= 1;
            slot.elapsed_ms = 0;
            tracing::trace!(invoke_id, retries_remaining = slot.retries_remaining, "retransmitting confirmed request");
            if let Some(peer) = slot.peer.clone() {
                actions.push(TsmAction::Transmit { peer, payload: slot.payload.clone() });
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_ids_rotate_instead_of_reusing_immediately() {
        let mut tsm: Tsm<u32> = Tsm::new(4, 3000, 3, 2000);
        let a = tsm.next_free_invoke_id().unwrap();
        tsm.set_confirmed_transaction(a, 1, vec![1, 2, 3]);
        let b = tsm.next_free_invoke_id().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn simple_ack_completes_only_the_matching_slot() {
        let mut tsm: Tsm<u32> = Tsm::new(4, 3000, 3, 2000);
        let a = tsm.next_free_invoke_id().unwrap();
        tsm.set_confirmed_transaction(a, 1, vec![1]);
        let b = tsm.next_free_invoke_id().unwrap();
        tsm.set_confirmed_transaction(b, 2, vec![2]);

        tsm.complete(a);

        assert!(tsm.invoke_id_free(a));
        assert_eq!(tsm.state(b), TransactionState::AwaitConfirmation);
        assert!(!tsm.invoke_id_free(b));
    }

    #[test]
    fn timeout_retries_then_fails_after_budget_exhausted() {
        let mut tsm: Tsm<u32> = Tsm::new(4, 100, 2, 2000);
        let id = tsm.next_free_invoke_id().unwrap();
        tsm.set_confirmed_transaction(id, 1, vec![9]);

        // Original send at t=0 already happened via set_confirmed_transaction.
        // Three transmissions total (original + 2 retries) over 300ms.
        let retransmit_1 = tsm.timer_milliseconds(100);
        assert_eq!(retransmit_1.len(), 1);
        let retransmit_2 = tsm.timer_milliseconds(100);
        assert_eq!(retransmit_2.len(), 1);
        let retransmit_3 = tsm.timer_milliseconds(100);
        assert!(retransmit_3.is_empty(), "retry budget exhausted, no further transmission");

        assert!(tsm.invoke_id_failed(id));
        assert!(!tsm.invoke_id_failed(id), "failure observation is one-shot");
        assert!(tsm.invoke_id_free(id));
    }

    #[test]
    fn reject_marks_transaction_failed_immediately() {
        let mut tsm: Tsm<u32> = Tsm::new(4, 3000, 3, 2000);
        let id = tsm.next_free_invoke_id().unwrap();
        tsm.set_confirmed_transaction(id, 1, vec![9]);

        tsm.fail(id);

        assert!(tsm.invoke_id_failed(id));
        assert!(tsm.invoke_id_free(id));
    }

    #[test]
    fn full_slot_table_yields_no_free_invoke_id() {
        let mut tsm: Tsm<u32> = Tsm::new(2, 3000, 3, 2000);
        let a = tsm.next_free_invoke_id().unwrap();
        tsm.set_confirmed_transaction(a, 1, vec![]);
        let b = tsm.next_free_invoke_id().unwrap();
        tsm.set_confirmed_transaction(b, 1, vec![]);

        assert_eq!(tsm.next_free_invoke_id(), None);
    }

    #[test]
    fn segmented_request_transitions_to_await_confirmation_after_all_sent() {
        let mut tsm: Tsm<u32> = Tsm::new(4, 3000, 3, 2000);
        let id = tsm.next_free_invoke_id().unwrap();
        tsm.set_confirmed_transaction(id, 1, vec![0; 2000]);
        tsm.begin_segmented_request(id);
        assert_eq!(tsm.state(id), TransactionState::SegmentedRequest);

        tsm.segment_window_acked(id);
        assert_eq!(tsm.state(id), TransactionState::SegmentedRequest);

        tsm.all_segments_sent(id);
        assert_eq!(tsm.state(id), TransactionState::AwaitConfirmation);
    }
}
