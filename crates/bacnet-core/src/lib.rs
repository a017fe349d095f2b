//! Stateful BACnet application-layer core.
//!
//! Built on top of `bacnet-proto`'s pure codec, this crate holds every piece
//! of state a BACnet device needs beyond parsing bytes: the transaction
//! state machine correlating confirmed requests with their replies, the
//! segmentation/reassembly engine for APDUs too large for one PDU, the
//! device-address binding table populated by Who-Is/I-Am, and the handler
//! registry dispatching inbound APDUs to application code.
//!
//! # Layers
//!
//! - [`config`] — per-device configuration (timeouts, retry counts, segment
//!   size, segmentation support).
//! - [`datalink`] — the transport trait the core sends and receives through;
//!   no concrete datalink (BACnet/IP, MS/TP, ...) lives here.
//! - [`tsm`] — the transaction state machine: invoke-ID allocation,
//!   confirmed-request/reply correlation, timeout and retry.
//! - [`segmentation`] — splitting an oversized APDU into segments and
//!   reassembling one received in segments.
//! - [`address`] — the device-instance-to-datalink-address binding cache.
//! - [`dispatcher`] — the per-(PDU type, service choice) handler registry
//!   the stack routes inbound APDUs through.
//! - [`stack`] — the [`stack::Stack`] application-layer driver composing the
//!   pieces above: one inbound-APDU entry point, one confirmed-send entry
//!   point, one timer entry point, all returning actions for the driver loop
//!   to execute.
//! - [`trend_log`] — the Trend-Log enable-window and enable-write decision
//!   functions a WriteProperty handler for such an object calls.
//! - [`env`] — the [`env::Clock`] abstraction the driver loop uses to turn
//!   wall-clock time into the elapsed deltas `tsm`/`segmentation`/`address`
//!   consume.
//! - [`error`] — [`error::CoreError`], wrapping decode failures from
//!   `bacnet-proto` alongside this crate's own state-machine errors.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod address;
pub mod config;
pub mod datalink;
pub mod dispatcher;
pub mod env;
pub mod error;
pub mod segmentation;
pub mod stack;
pub mod trend_log;
pub mod tsm;

pub use address::{AddressCache, AddressCacheAction};
pub use config::{Config, SegmentationSupport};
pub use datalink::{Address, Datalink, NpduData};
pub use dispatcher::HandlerRegistry;
pub use env::{Clock, SystemClock};
pub use error::CoreError;
pub use segmentation::{IncomingReassembly, OutgoingSegmentation, SegmentOutcome};
pub use stack::{DispatchOutcome, Stack, StackAction};
pub use tsm::{Tsm, TsmAction};
