//! Handler registry for inbound APDUs.
//!
//! Application code registers one handler per (PDU type, service choice);
//! [`crate::stack::Stack::on_received`] classifies each inbound APDU and
//! routes it here. A confirmed request with no registered handler falls
//! through to `unrecognized_service_handler`, and the stack answers it with
//! a Reject of reason `UNRECOGNIZED_SERVICE` without running any business
//! handler.

use std::collections::HashMap;

/// A confirmed-request handler: given the invoke ID and the raw parameter
/// bytes following the fixed header, performs the service and returns
/// nothing — any reply the driver should send is produced by the handler
/// calling back into the TSM/datalink directly, since the reply shape
/// (simple-ack, complex-ack, error) is service-specific.
pub type ConfirmedHandler = Box<dyn FnMut(u8, &[u8])>;

/// An unconfirmed-request handler: given the raw parameter bytes, performs
/// the service. No reply is possible by definition.
pub type UnconfirmedHandler = Box<dyn FnMut(&[u8])>;

/// A handler for an ack/error/reject/abort received in response to one of
/// our own confirmed requests, given the invoke ID and raw payload bytes.
pub type ResponseHandler = Box<dyn FnMut(u8, &[u8])>;

/// A handler invoked for Abort/Reject APDUs, which carry no service choice.
pub type UnkeyedResponseHandler = Box<dyn FnMut(u8, u8)>;

/// Registry of per-(PDU type, service choice) handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    confirmed: HashMap<u8, ConfirmedHandler>,
    unconfirmed: HashMap<u8, UnconfirmedHandler>,
    confirmed_ack: HashMap<u8, ResponseHandler>,
    confirmed_simple_ack: HashMap<u8, ResponseHandler>,
    error: HashMap<u8, ResponseHandler>,
    abort: Option<UnkeyedResponseHandler>,
    reject: Option<UnkeyedResponseHandler>,
    unrecognized_service: Option<ConfirmedHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler invoked when a Confirmed-Request with this
    /// service choice arrives.
    pub fn set_confirmed_handler(&mut self, service_choice: u8, handler: ConfirmedHandler) {
        self.confirmed.insert(service_choice, handler);
    }

    /// Registers the handler invoked when an Unconfirmed-Request with this
    /// service choice arrives.
    pub fn set_unconfirmed_handler(&mut self, service_choice: u8, handler: UnconfirmedHandler) {
        self.unconfirmed.insert(service_choice, handler);
    }

    /// Registers the handler invoked when a Complex-Ack for this service
    /// choice arrives, correlating one of our confirmed requests.
    pub fn set_confirmed_ack_handler(&mut self, service_choice: u8, handler: ResponseHandler) {
        self.confirmed_ack.insert(service_choice, handler);
    }

    /// Registers the handler invoked when a Simple-Ack for this service
    /// choice arrives.
    pub fn set_confirmed_simple_ack_handler(&mut self, service_choice: u8, handler: ResponseHandler) {
        self.confirmed_simple_ack.insert(service_choice, handler);
    }

    /// Registers the handler invoked when an Error for this service choice
    /// arrives.
    pub fn set_error_handler(&mut self, service_choice: u8, handler: ResponseHandler) {
        self.error.insert(service_choice, handler);
    }

    /// Registers the handler invoked for every incoming Abort.
    pub fn set_abort_handler(&mut self, handler: UnkeyedResponseHandler) {
        self.abort = Some(handler);
    }

    /// Registers the handler invoked for every incoming Reject.
    pub fn set_reject_handler(&mut self, handler: UnkeyedResponseHandler) {
        self.reject = Some(handler);
    }

    /// Registers the handler invoked for a confirmed/unconfirmed request
    /// whose service choice has no other registered handler. If unset, the
    /// stack rejects confirmed requests with `UNRECOGNIZED_SERVICE` and
    /// silently drops unconfirmed ones.
    pub fn set_unrecognized_service_handler(&mut self, handler: ConfirmedHandler) {
        self.unrecognized_service = Some(handler);
    }

    /// Runs the confirmed handler for `service_choice`, if one is registered.
    pub(crate) fn invoke_confirmed(&mut self, service_choice: u8, invoke_id: u8, params: &[u8]) -> bool {
        match self.confirmed.get_mut(&service_choice) {
            Some(handler) => {
                handler(invoke_id, params);
                true
            },
            None => false,
        }
    }

    /// Runs the unrecognized-service fallback, if one is registered.
    pub(crate) fn invoke_unrecognized(&mut self, invoke_id: u8, params: &[u8]) {
        if let Some(handler) = &mut self.unrecognized_service {
            handler(invoke_id, params);
        }
    }

    /// Runs the unconfirmed handler for `service_choice`, if one is registered.
    pub(crate) fn invoke_unconfirmed(&mut self, service_choice: u8, params: &[u8]) {
        if let Some(handler) = self.unconfirmed.get_mut(&service_choice) {
            handler(params);
        }
    }

    /// Runs the simple-ack handler for `service_choice`, if one is registered.
    pub(crate) fn invoke_simple_ack(&mut self, service_choice: u8, invoke_id: u8, params: &[u8]) {
        if let Some(handler) = self.confirmed_simple_ack.get_mut(&service_choice) {
            handler(invoke_id, params);
        }
    }

    /// Runs the complex-ack handler for `service_choice`, if one is registered.
    pub(crate) fn invoke_ack(&mut self, service_choice: u8, invoke_id: u8, params: &[u8]) {
        if let Some(handler) = self.confirmed_ack.get_mut(&service_choice) {
            handler(invoke_id, params);
        }
    }

    /// Runs the error handler for `service_choice`, if one is registered.
    pub(crate) fn invoke_error(&mut self, service_choice: u8, invoke_id: u8, params: &[u8]) {
        if let Some(handler) = self.error.get_mut(&service_choice) {
            handler(invoke_id, params);
        }
    }

    /// Runs the reject handler, if one is registered.
    pub(crate) fn invoke_reject(&mut self, invoke_id: u8, reason: u8) {
        if let Some(handler) = &mut self.reject {
            handler(invoke_id, reason);
        }
    }

    /// Runs the abort handler, if one is registered.
    pub(crate) fn invoke_abort(&mut self, invoke_id: u8, reason: u8) {
        if let Some(handler) = &mut self.abort {
            handler(invoke_id, reason);
        }
    }
}
