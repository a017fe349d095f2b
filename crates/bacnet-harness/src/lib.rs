//! Deterministic test harness for `bacnet-core`.
//!
//! Two pieces: [`FakeClock`], a manually-advanced clock implementing
//! [`bacnet_core::env::Clock`], and [`InMemoryNetwork`]/[`InMemoryDatalink`],
//! an in-process [`bacnet_core::datalink::Datalink`] so multi-node scenarios
//! (Who-Is/I-Am discovery, segmented transfers, transaction timeouts) run
//! without real sockets or wall-clock waits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fake_clock;
pub mod in_memory_datalink;

pub use fake_clock::FakeClock;
pub use in_memory_datalink::{InMemoryDatalink, InMemoryNetwork, NodeId, BROADCAST};
