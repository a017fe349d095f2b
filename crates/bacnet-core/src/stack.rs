//! Application-layer driver tying the TSM, segmentation engine, address
//! cache, and handler registry together.
//!
//! Uses the action pattern: methods take inbound bytes or elapsed time and
//! return [`StackAction`]s for the driver loop to execute against its
//! datalink. This keeps the whole application layer pure (no I/O, no clock),
//! so multi-step scenarios — discovery, retry sequences, segmented
//! reassembly with loss — run deterministically in tests.
//!
//! The driver loop around this type is one poll cycle:
//!
//! ```text
//! loop {
//!     let n = datalink.receive(&mut src, &mut buf, POLL_TIMEOUT_MS);
//!     if n > 0 {
//!         for action in stack.on_received(&src, &buf[..n]).1 { /* send */ }
//!     }
//!     for action in stack.tick(elapsed_ms_since_last_iteration) { /* send */ }
//! }
//! ```

use std::collections::HashMap;

use bacnet_proto::apdu::{
    AbortHeader, Apdu, ConfirmedRequestHeader, RejectHeader, SegmentAckHeader, UnconfirmedRequestHeader,
};
use bacnet_proto::primitive::ObjectId;
use bacnet_proto::services::{
    decode_i_am_request, decode_who_is_request, encode_i_am_request, AbortReason, IAmRequest, RejectReason,
    UnconfirmedServiceChoice,
};

use crate::address::{AddressCache, AddressCacheAction, DEFAULT_BIND_REQUEST_RETRY_INTERVAL_SECONDS, MAX_ADDRESS_CACHE};
use crate::config::{Config, SegmentationSupport};
use crate::datalink::Address;
use crate::dispatcher::HandlerRegistry;
use crate::error::CoreError;
use crate::segmentation::{
    IncomingReassembly, OutgoingSegmentation, SegmentAckOutcome, SegmentOutcome, SEGMENT_HEADER_OVERHEAD,
};
use crate::tsm::{Tsm, TsmAction, TransactionState, MAX_TSM_TRANSACTIONS};

/// Object type number of the Device object, used for I-Am identifiers.
const OBJECT_DEVICE: u16 = 8;

/// Fallback window size when a segmented PDU omits a usable proposal.
const DEFAULT_WINDOW_SIZE: u8 = 1;

/// Window size proposed when this stack originates a segmented request.
const PROPOSED_WINDOW_SIZE: u8 = 4;

/// How [`Stack::on_received`] classified one inbound APDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The APDU was routed; any required replies are in the returned actions.
    Handled,
    /// A confirmed request named a service choice with no registered
    /// handler; the returned actions carry the Reject answering it.
    Reject {
        /// Invoke ID the Reject is addressed to.
        invoke_id: u8,
        /// Reason reported to the peer.
        reason: RejectReason,
    },
    /// The APDU was malformed, a duplicate segment, or addressed a
    /// stale/unknown invoke ID, and was dropped.
    Dropped,
}

/// An I/O effect the driver loop must execute after a stack call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackAction<A> {
    /// Send `pdu` to `peer`.
    Send {
        /// Destination address.
        peer: A,
        /// Full APDU bytes (fixed header plus parameters).
        pdu: Vec<u8>,
        /// Whether the NPDU layer should mark this as expecting a reply.
        data_expecting_reply: bool,
    },
    /// Send `pdu` to the datalink's broadcast address.
    Broadcast {
        /// Full APDU bytes (fixed header plus parameters).
        pdu: Vec<u8>,
    },
}

/// The stateful BACnet application layer for one node.
///
/// Owns the invoke-ID slot table, the device-address cache, the handler
/// registry, and any in-progress segmented reassemblies. All mutation goes
/// through `&mut self`; a multi-threaded host wraps the whole value in a
/// single mutex.
pub struct Stack<A: Address> {
    config: Config,
    tsm: Tsm<A>,
    cache: AddressCache<A>,
    registry: HandlerRegistry,
    /// Segmented confirmed requests being reassembled, keyed by the
    /// peer-chosen invoke ID.
    request_reassembly: HashMap<u8, IncomingReassembly>,
    /// Segmented complex-acks being reassembled, keyed by our invoke ID.
    response_reassembly: HashMap<u8, IncomingReassembly>,
    /// Segmented confirmed requests this stack is transmitting, keyed by our
    /// invoke ID.
    outgoing_segmented: HashMap<u8, SegmentedRequest>,
    /// Milliseconds accumulated toward the next whole-second cache tick.
    cache_tick_ms: u32,
}

/// Transmit-side state of one segmented confirmed request.
struct SegmentedRequest {
    engine: OutgoingSegmentation,
    service_choice: u8,
    window: u8,
}

impl<A: Address> Stack<A> {
    /// Creates a stack with the default table capacities.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let tsm = Tsm::new(
            MAX_TSM_TRANSACTIONS,
            config.apdu_timeout_ms,
            config.number_of_apdu_retries,
            config.apdu_segment_timeout_ms,
        );
        Self {
            config,
            tsm,
            cache: AddressCache::new(MAX_ADDRESS_CACHE, DEFAULT_BIND_REQUEST_RETRY_INTERVAL_SECONDS),
            registry: HandlerRegistry::new(),
            request_reassembly: HashMap::new(),
            response_reassembly: HashMap::new(),
            outgoing_segmented: HashMap::new(),
            cache_tick_ms: 0,
        }
    }

    /// The handler registry, for wiring up service handlers at startup.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// The device-address binding cache.
    #[must_use]
    pub fn address_cache(&self) -> &AddressCache<A> {
        &self.cache
    }

    /// This stack's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True iff `invoke_id`'s transaction completed since last observed.
    /// See [`Tsm::invoke_id_free`].
    pub fn invoke_id_free(&mut self, invoke_id: u8) -> bool {
        self.tsm.invoke_id_free(invoke_id)
    }

    /// True iff `invoke_id`'s transaction failed since last observed.
    /// See [`Tsm::invoke_id_failed`].
    pub fn invoke_id_failed(&mut self, invoke_id: u8) -> bool {
        self.tsm.invoke_id_failed(invoke_id)
    }

    /// Forcibly releases `invoke_id`; any late response carrying it is
    /// silently dropped from then on.
    pub fn free_invoke_id(&mut self, invoke_id: u8) {
        self.response_reassembly.remove(&invoke_id);
        self.outgoing_segmented.remove(&invoke_id);
        self.tsm.free_invoke_id(invoke_id);
    }

    /// Starts a confirmed transaction: allocates an invoke ID, records the
    /// transaction for retry, and returns the ID plus the send actions.
    ///
    /// `params` is the service parameter list, already encoded by the
    /// matching `bacnet_proto::services` encoder. A parameter list too large
    /// for one APDU goes out segmented, window by window, provided this
    /// device is configured to transmit segments.
    pub fn send_confirmed(
        &mut self,
        peer: A,
        service_choice: u8,
        params: &[u8],
    ) -> Result<(u8, Vec<StackAction<A>>), CoreError> {
        let max_apdu = usize::from(self.config.max_apdu);
        if 4 + params.len() > max_apdu {
            return self.send_confirmed_segmented(peer, service_choice, params);
        }

        let invoke_id = self.tsm.next_free_invoke_id().ok_or(CoreError::NoFreeInvokeId)?;
        let header = ConfirmedRequestHeader {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: false,
            max_segments_accepted: 0,
            max_apdu_accepted: self.config.max_apdu,
            invoke_id,
            sequence_number: None,
            proposed_window_size: None,
            service_choice,
        };
        let mut pdu = Vec::with_capacity(4 + params.len());
        header.encode(&mut pdu);
        pdu.extend_from_slice(params);

        let (_, action) = self.tsm.set_confirmed_transaction(invoke_id, peer, pdu);
        Ok((invoke_id, vec![transmit_to_send(action)]))
    }

    fn send_confirmed_segmented(
        &mut self,
        peer: A,
        service_choice: u8,
        params: &[u8],
    ) -> Result<(u8, Vec<StackAction<A>>), CoreError> {
        if !self.config.segmentation_supported.can_transmit() {
            return Err(CoreError::SegmentationNotSupported);
        }
        let invoke_id = self.tsm.next_free_invoke_id().ok_or(CoreError::NoFreeInvokeId)?;

        let segment_size = usize::from(self.config.max_apdu).saturating_sub(SEGMENT_HEADER_OVERHEAD).max(1);
        let state = SegmentedRequest {
            engine: OutgoingSegmentation::new(params, segment_size, PROPOSED_WINDOW_SIZE),
            service_choice,
            window: PROPOSED_WINDOW_SIZE,
        };
        tracing::trace!(
            invoke_id,
            segments = state.engine.total_segments(),
            "sending segmented confirmed request"
        );
        let actions = segmented_request_window(self.config.max_apdu, &peer, invoke_id, &state);

        // The timeout/retry clock tracks the first segment of the current
        // window; a timeout retransmits it, and the peer's segment-ack
        // rewinds cover the rest.
        if let Some(StackAction::Send { pdu, .. }) = actions.first() {
            self.tsm.set_confirmed_transaction(invoke_id, peer, pdu.clone());
        }
        self.tsm.begin_segmented_request(invoke_id);
        self.outgoing_segmented.insert(invoke_id, state);
        Ok((invoke_id, actions))
    }

    /// Resolves `device_id` through the address cache, emitting a targeted
    /// Who-Is broadcast when the binding is unknown and none is in flight.
    pub fn bind_request(&mut self, device_id: u32) -> (Option<(u16, A)>, Vec<StackAction<A>>) {
        let (binding, action) = self.cache.bind_request(device_id);
        let actions = match action {
            Some(AddressCacheAction::SendWhoIs { low, high }) => {
                let request = bacnet_proto::services::WhoIsRequest {
                    device_instance_range_low: Some(low),
                    device_instance_range_high: Some(high),
                };
                let mut pdu = Vec::new();
                UnconfirmedRequestHeader { service_choice: UnconfirmedServiceChoice::WhoIs.to_u8() }
                    .encode(&mut pdu);
                bacnet_proto::services::encode_who_is_request(&mut pdu, &request);
                vec![StackAction::Broadcast { pdu }]
            },
            None => Vec::new(),
        };
        (binding, actions)
    }

    /// Classifies and processes one inbound APDU from `src`.
    ///
    /// Returns the dispatch outcome plus any reply actions (segment-acks,
    /// rejects, aborts, I-Am responses) the driver must send.
    pub fn on_received(&mut self, src: &A, pdu: &[u8]) -> (DispatchOutcome, Vec<StackAction<A>>) {
        let Ok((consumed, apdu)) = Apdu::decode(pdu) else {
            tracing::trace!(len = pdu.len(), "dropping malformed APDU");
            return (DispatchOutcome::Dropped, Vec::new());
        };
        let params = &pdu[consumed..];

        match apdu {
            Apdu::ConfirmedRequest(header) => self.on_confirmed_request(src, header, params),
            Apdu::UnconfirmedRequest(header) => {
                let actions = self.on_unconfirmed_request(src, header.service_choice, params);
                (DispatchOutcome::Handled, actions)
            },
            Apdu::SimpleAck(header) => {
                if self.tsm.state(header.invoke_id) == TransactionState::Idle {
                    tracing::trace!(invoke_id = header.invoke_id, "dropping stale simple-ack");
                    return (DispatchOutcome::Dropped, Vec::new());
                }
                self.tsm.complete(header.invoke_id);
                self.registry.invoke_simple_ack(header.service_choice, header.invoke_id, params);
                (DispatchOutcome::Handled, Vec::new())
            },
            Apdu::ComplexAck(header) => {
                if self.tsm.state(header.invoke_id) == TransactionState::Idle {
                    tracing::trace!(invoke_id = header.invoke_id, "dropping stale complex-ack");
                    return (DispatchOutcome::Dropped, Vec::new());
                }
                if header.segmented {
                    self.on_segmented_complex_ack(src, &header, params)
                } else {
                    self.tsm.complete(header.invoke_id);
                    self.registry.invoke_ack(header.service_choice, header.invoke_id, params);
                    (DispatchOutcome::Handled, Vec::new())
                }
            },
            Apdu::SegmentAck(header) => {
                let actions = self.on_segment_ack(src, &header);
                (DispatchOutcome::Handled, actions)
            },
            Apdu::Error(header) => {
                if self.tsm.state(header.invoke_id) == TransactionState::Idle {
                    return (DispatchOutcome::Dropped, Vec::new());
                }
                self.tsm.fail(header.invoke_id);
                self.registry.invoke_error(header.service_choice, header.invoke_id, params);
                (DispatchOutcome::Handled, Vec::new())
            },
            Apdu::Reject(header) => {
                if self.tsm.state(header.invoke_id) == TransactionState::Idle {
                    return (DispatchOutcome::Dropped, Vec::new());
                }
                self.tsm.fail(header.invoke_id);
                self.registry.invoke_reject(header.invoke_id, header.reason);
                (DispatchOutcome::Handled, Vec::new())
            },
            Apdu::Abort(header) => {
                if self.tsm.state(header.invoke_id) == TransactionState::Idle {
                    return (DispatchOutcome::Dropped, Vec::new());
                }
                self.tsm.fail(header.invoke_id);
                self.registry.invoke_abort(header.invoke_id, header.reason);
                (DispatchOutcome::Handled, Vec::new())
            },
        }
    }

    /// Advances all timers by `elapsed_ms`, returning any retransmissions.
    pub fn tick(&mut self, elapsed_ms: u32) -> Vec<StackAction<A>> {
        let actions: Vec<StackAction<A>> = self
            .tsm
            .timer_milliseconds(elapsed_ms)
            .into_iter()
            .map(transmit_to_send)
            .collect();

        // Transactions the timer just abandoned leave no reassembly or
        // transmit-window state behind.
        let tsm = &self.tsm;
        self.outgoing_segmented.retain(|id, _| tsm.state(*id) != TransactionState::Idle);
        self.response_reassembly.retain(|id, _| tsm.state(*id) != TransactionState::Idle);

        self.cache_tick_ms += elapsed_ms;
        let whole_seconds = self.cache_tick_ms / 1000;
        if whole_seconds > 0 {
            self.cache_tick_ms %= 1000;
            self.cache.timer(whole_seconds);
        }

        actions
    }

    /// Advances the transmit window of a segmented request in response to a
    /// peer's Segment-Ack.
    fn on_segment_ack(&mut self, src: &A, header: &SegmentAckHeader) -> Vec<StackAction<A>> {
        let Some(state) = self.outgoing_segmented.get_mut(&header.invoke_id) else {
            self.tsm.segment_window_acked(header.invoke_id);
            return Vec::new();
        };

        match state.engine.on_segment_ack(header.negative_ack, header.sequence_number) {
            SegmentAckOutcome::Complete => {
                self.outgoing_segmented.remove(&header.invoke_id);
                self.tsm.all_segments_sent(header.invoke_id);
                Vec::new()
            },
            SegmentAckOutcome::ContinueWindow | SegmentAckOutcome::Rewind => {
                self.tsm.segment_window_acked(header.invoke_id);
                let state = &self.outgoing_segmented[&header.invoke_id];
                segmented_request_window(self.config.max_apdu, src, header.invoke_id, state)
            },
        }
    }

    fn on_confirmed_request(
        &mut self,
        src: &A,
        header: ConfirmedRequestHeader,
        params: &[u8],
    ) -> (DispatchOutcome, Vec<StackAction<A>>) {
        if header.segmented {
            if !self.config.segmentation_supported.can_receive() {
                let mut pdu = Vec::new();
                AbortHeader {
                    server: true,
                    invoke_id: header.invoke_id,
                    reason: AbortReason::SegmentationNotSupported.to_u8(),
                }
                .encode(&mut pdu);
                return (
                    DispatchOutcome::Handled,
                    vec![StackAction::Send { peer: src.clone(), pdu, data_expecting_reply: false }],
                );
            }
            return self.on_segmented_confirmed_request(src, &header, params);
        }

        if self.registry.invoke_confirmed(header.service_choice, header.invoke_id, params) {
            return (DispatchOutcome::Handled, Vec::new());
        }

        tracing::debug!(
            invoke_id = header.invoke_id,
            service_choice = header.service_choice,
            "no handler registered, rejecting as unrecognized service"
        );
        self.registry.invoke_unrecognized(header.invoke_id, params);
        let mut pdu = Vec::new();
        RejectHeader { invoke_id: header.invoke_id, reason: RejectReason::UnrecognizedService.to_u8() }
            .encode(&mut pdu);
        (
            DispatchOutcome::Reject {
                invoke_id: header.invoke_id,
                reason: RejectReason::UnrecognizedService,
            },
            vec![StackAction::Send { peer: src.clone(), pdu, data_expecting_reply: false }],
        )
    }

    fn on_unconfirmed_request(&mut self, src: &A, service_choice: u8, params: &[u8]) -> Vec<StackAction<A>> {
        let mut actions = Vec::new();
        match UnconfirmedServiceChoice::from_u8(service_choice) {
            UnconfirmedServiceChoice::IAm => {
                if let Ok((_, i_am)) = decode_i_am_request(params) {
                    let max_apdu = u16::try_from(i_am.max_apdu_length_accepted).unwrap_or(u16::MAX);
                    self.cache.add(
                        i_am.device_id.instance,
                        max_apdu,
                        SegmentationSupport::from_u32(i_am.segmentation_supported),
                        0,
                        src.clone(),
                    );
                    tracing::trace!(device_id = i_am.device_id.instance, "bound device from I-Am");
                }
            },
            UnconfirmedServiceChoice::WhoIs => {
                if let Ok((_, who_is)) = decode_who_is_request(params) {
                    if let Some(pdu) = self.i_am_reply(&who_is) {
                        actions.push(StackAction::Broadcast { pdu });
                    }
                }
            },
            _ => {},
        }
        self.registry.invoke_unconfirmed(service_choice, params);
        actions
    }

    /// Builds an I-Am broadcast if `who_is`'s instance range covers this
    /// device (an absent range matches every device).
    fn i_am_reply(&self, who_is: &bacnet_proto::services::WhoIsRequest) -> Option<Vec<u8>> {
        let instance = self.config.device_object_instance_number;
        let in_range = match (who_is.device_instance_range_low, who_is.device_instance_range_high) {
            (Some(low), Some(high)) => (low..=high).contains(&instance),
            _ => true,
        };
        if !in_range {
            return None;
        }

        let device_id = ObjectId::new(OBJECT_DEVICE, instance).ok()?;
        let i_am = IAmRequest {
            device_id,
            max_apdu_length_accepted: u32::from(self.config.max_apdu),
            segmentation_supported: self.config.segmentation_supported.to_u32(),
            vendor_id: u32::from(self.config.vendor_id),
        };
        let mut pdu = Vec::new();
        UnconfirmedRequestHeader { service_choice: UnconfirmedServiceChoice::IAm.to_u8() }.encode(&mut pdu);
        encode_i_am_request(&mut pdu, &i_am);
        Some(pdu)
    }

    fn on_segmented_complex_ack(
        &mut self,
        src: &A,
        header: &bacnet_proto::apdu::ComplexAckHeader,
        params: &[u8],
    ) -> (DispatchOutcome, Vec<StackAction<A>>) {
        let window = header.proposed_window_size.unwrap_or(DEFAULT_WINDOW_SIZE);
        let sequence = header.sequence_number.unwrap_or(0);
        let reassembly = self
            .response_reassembly
            .entry(header.invoke_id)
            .or_insert_with(|| IncomingReassembly::new(window));
        let outcome = reassembly.accept_segment(sequence, header.more_follows, params);

        // The acking side here is the client, so `server` stays false.
        match outcome {
            SegmentOutcome::Buffered => {
                let mut actions = Vec::new();
                if (u16::from(sequence) + 1) % u16::from(reassembly.window_size().max(1)) == 0 {
                    actions.push(segment_ack(src, false, false, header.invoke_id, sequence, window));
                }
                (DispatchOutcome::Handled, actions)
            },
            SegmentOutcome::Duplicate => (DispatchOutcome::Dropped, Vec::new()),
            SegmentOutcome::NegativeAck { resend_from } => (
                DispatchOutcome::Handled,
                vec![segment_ack(src, false, true, header.invoke_id, resend_from, window)],
            ),
            SegmentOutcome::OutOfWindow => {
                self.response_reassembly.remove(&header.invoke_id);
                self.tsm.fail(header.invoke_id);
                let mut pdu = Vec::new();
                AbortHeader {
                    server: false,
                    invoke_id: header.invoke_id,
                    reason: AbortReason::InvalidApduInThisState.to_u8(),
                }
                .encode(&mut pdu);
                (
                    DispatchOutcome::Dropped,
                    vec![StackAction::Send { peer: src.clone(), pdu, data_expecting_reply: false }],
                )
            },
            SegmentOutcome::Complete(assembled) => {
                self.response_reassembly.remove(&header.invoke_id);
                self.tsm.complete(header.invoke_id);
                let actions = vec![segment_ack(src, false, false, header.invoke_id, sequence, window)];
                self.registry.invoke_ack(header.service_choice, header.invoke_id, &assembled);
                (DispatchOutcome::Handled, actions)
            },
        }
    }

    fn on_segmented_confirmed_request(
        &mut self,
        src: &A,
        header: &ConfirmedRequestHeader,
        params: &[u8],
    ) -> (DispatchOutcome, Vec<StackAction<A>>) {
        let window = header.proposed_window_size.unwrap_or(DEFAULT_WINDOW_SIZE);
        let sequence = header.sequence_number.unwrap_or(0);
        let reassembly = self
            .request_reassembly
            .entry(header.invoke_id)
            .or_insert_with(|| IncomingReassembly::new(window));
        let outcome = reassembly.accept_segment(sequence, header.more_follows, params);

        match outcome {
            SegmentOutcome::Buffered => {
                let mut actions = Vec::new();
                if (u16::from(sequence) + 1) % u16::from(reassembly.window_size().max(1)) == 0 {
                    actions.push(segment_ack(src, true, false, header.invoke_id, sequence, window));
                }
                (DispatchOutcome::Handled, actions)
            },
            SegmentOutcome::Duplicate => (DispatchOutcome::Dropped, Vec::new()),
            SegmentOutcome::NegativeAck { resend_from } => (
                DispatchOutcome::Handled,
                vec![segment_ack(src, true, true, header.invoke_id, resend_from, window)],
            ),
            SegmentOutcome::OutOfWindow => {
                self.request_reassembly.remove(&header.invoke_id);
                let mut pdu = Vec::new();
                AbortHeader {
                    server: true,
                    invoke_id: header.invoke_id,
                    reason: AbortReason::InvalidApduInThisState.to_u8(),
                }
                .encode(&mut pdu);
                (
                    DispatchOutcome::Dropped,
                    vec![StackAction::Send { peer: src.clone(), pdu, data_expecting_reply: false }],
                )
            },
            SegmentOutcome::Complete(assembled) => {
                self.request_reassembly.remove(&header.invoke_id);
                let mut actions = vec![segment_ack(src, true, false, header.invoke_id, sequence, window)];
                if !self.registry.invoke_confirmed(header.service_choice, header.invoke_id, &assembled) {
                    self.registry.invoke_unrecognized(header.invoke_id, &assembled);
                    let mut pdu = Vec::new();
                    RejectHeader {
                        invoke_id: header.invoke_id,
                        reason: RejectReason::UnrecognizedService.to_u8(),
                    }
                    .encode(&mut pdu);
                    actions.push(StackAction::Send { peer: src.clone(), pdu, data_expecting_reply: false });
                    return (
                        DispatchOutcome::Reject {
                            invoke_id: header.invoke_id,
                            reason: RejectReason::UnrecognizedService,
                        },
                        actions,
                    );
                }
                (DispatchOutcome::Handled, actions)
            },
        }
    }
}

fn transmit_to_send<A>(action: TsmAction<A>) -> StackAction<A> {
    match action {
        TsmAction::Transmit { peer, payload } => {
            StackAction::Send { peer, pdu: payload, data_expecting_reply: true }
        },
    }
}

/// Encodes every segment in the current transmit window as a segmented
/// Confirmed-Request PDU.
fn segmented_request_window<A: Address>(
    max_apdu: u16,
    peer: &A,
    invoke_id: u8,
    state: &SegmentedRequest,
) -> Vec<StackAction<A>> {
    state
        .engine
        .current_window()
        .into_iter()
        .map(|segment| {
            let mut pdu = Vec::with_capacity(6 + segment.data.len());
            ConfirmedRequestHeader {
                segmented: true,
                more_follows: segment.more_follows,
                segmented_response_accepted: false,
                max_segments_accepted: 0,
                max_apdu_accepted: max_apdu,
                invoke_id,
                sequence_number: Some(segment.sequence_number),
                proposed_window_size: Some(state.window),
                service_choice: state.service_choice,
            }
            .encode(&mut pdu);
            pdu.extend_from_slice(segment.data);
            StackAction::Send { peer: peer.clone(), pdu, data_expecting_reply: true }
        })
        .collect()
}

fn segment_ack<A: Address>(
    src: &A,
    server: bool,
    negative: bool,
    invoke_id: u8,
    sequence: u8,
    window: u8,
) -> StackAction<A> {
    let mut pdu = Vec::new();
    SegmentAckHeader {
        negative_ack: negative,
        server,
        invoke_id,
        sequence_number: sequence,
        actual_window_size: window,
    }
    .encode(&mut pdu);
    StackAction::Send { peer: src.clone(), pdu, data_expecting_reply: false }
}
