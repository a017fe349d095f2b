//! Device-address binding table.
//!
//! A fixed-capacity cache mapping device instance numbers to datalink
//! addresses, maximum-APDU sizes, and segmentation capabilities, populated by
//! Who-Is/I-Am discovery. Like the TSM, this is a pure value: `timer`
//! advances TTLs by a caller-supplied delta rather than reading a clock.

use crate::config::SegmentationSupport;
use crate::datalink::Address;

/// Default cache capacity. ASHRAE 135 implementations commonly size this at
/// 255 to match the 8-bit device-count fields used in some reporting
/// services; nothing in this crate requires that exact number.
pub const MAX_ADDRESS_CACHE: usize = 255;

/// How often, in seconds, a repeated `bind_request` for the same
/// unresolved device re-emits a Who-Is.
pub const DEFAULT_BIND_REQUEST_RETRY_INTERVAL_SECONDS: u32 = 10;

/// A single address binding.
#[derive(Debug, Clone)]
struct Entry<A> {
    device_id: u32,
    address: A,
    max_apdu: u16,
    segmentation: SegmentationSupport,
    max_segments: u8,
    /// Seconds remaining before this entry is reclaimable. Negative means
    /// static (never expires, never evicted to make room for another).
    ttl_seconds: i32,
    /// Monotonically increasing insertion sequence, used to find the
    /// oldest non-static entry on overflow.
    inserted_at: u64,
}

/// Action the caller should take as a result of an address-cache operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressCacheAction {
    /// Emit a Who-Is restricted to the given device-instance range.
    SendWhoIs {
        /// Inclusive lower bound of the device-instance range.
        low: u32,
        /// Inclusive upper bound of the device-instance range.
        high: u32,
    },
}

/// Fixed-capacity device-address binding cache.
#[derive(Debug, Clone)]
pub struct AddressCache<A> {
    entries: Vec<Entry<A>>,
    capacity: usize,
    retry_interval_seconds: u32,
    /// Seconds since the last Who-Is was emitted for a device still being
    /// resolved, keyed by device id.
    pending: Vec<(u32, u32)>,
    next_sequence: u64,
}

impl<A: Address> AddressCache<A> {
    /// Creates an empty cache with the given capacity and bind-retry
    /// interval.
    #[must_use]
    pub fn new(capacity: usize, retry_interval_seconds: u32) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            retry_interval_seconds,
            pending: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Upserts a binding for `device_id`. Replaces an existing entry for the
    /// same device. If the cache is full and holds no expired or
    /// evictable non-static entry, returns `false` and leaves the cache
    /// unchanged.
    pub fn add(
        &mut self,
        device_id: u32,
        max_apdu: u16,
        segmentation: SegmentationSupport,
        max_segments: u8,
        address: A,
    ) -> bool {
        self.pending.retain(|(id, _)| *id != device_id);

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        if let Some(existing) = self.entries.iter_mut().find(|e| e.device_id == device_id) {
            existing.address = address;
            existing.max_apdu = max_apdu;
            existing.segmentation = segmentation;
            existing.max_segments = max_segments;
            existing.inserted_at = sequence;
            return true;
        }

        if self.entries.len() >= self.capacity {
            match self.evict_one() {
                Some(index) => {
                    tracing::debug!(evicted_device = self.entries[index].device_id, device_id, "address cache full, evicting oldest entry");
                    self.entries.swap_remove(index);
                },
                None => {
                    tracing::debug!(device_id, capacity = self.capacity, "address cache full, no evictable entry");
                    return false;
                },
            }
        }

        self.entries.push(Entry {
            device_id,
            address,
            max_apdu,
            segmentation,
            max_segments,
            ttl_seconds: -1,
            inserted_at: sequence,
        });
        true
    }

    /// Index of the oldest non-static, non-zero-ttl-protected entry, or
    /// `None` if every entry is static.
    fn evict_one(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.ttl_seconds >= 0)
            .min_by_key(|(_, e)| e.inserted_at)
            .map(|(index, _)| index)
    }

    /// Overrides the TTL of an existing binding. Negative marks the entry
    /// static (never expires); non-negative values count down on
    /// [`Self::timer`] and the entry is evicted when the TTL reaches zero.
    pub fn set_ttl(&mut self, device_id: u32, ttl_seconds: i32) -> bool {
        match self.entries.iter_mut().find(|e| e.device_id == device_id) {
            Some(entry) => {
                entry.ttl_seconds = ttl_seconds;
                true
            },
            None => false,
        }
    }

    /// Looks up a binding by device instance number.
    #[must_use]
    pub fn get_by_device(&self, device_id: u32) -> Option<(u16, SegmentationSupport, u8, A)> {
        self.entries
            .iter()
            .find(|e| e.device_id == device_id)
            .map(|e| (e.max_apdu, e.segmentation, e.max_segments, e.address.clone()))
    }

    /// Looks up a binding by its position in the cache. Order is not
    /// meaningful beyond being stable between mutations.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<(u32, u16, A)> {
        self.entries.get(index).map(|e| (e.device_id, e.max_apdu, e.address.clone()))
    }

    /// Number of bound entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves `device_id`, or requests that one be resolved.
    ///
    /// Returns the binding if known. Otherwise returns `None` and, if no
    /// Who-Is has been emitted for this device within the retry interval,
    /// an action asking the caller to emit one.
    pub fn bind_request(&mut self, device_id: u32) -> (Option<(u16, A)>, Option<AddressCacheAction>) {
        if let Some((max_apdu, _, _, address)) = self.get_by_device(device_id) {
            return (Some((max_apdu, address)), None);
        }

        let should_send = match self.pending.iter().find(|(id, _)| *id == device_id) {
            Some((_, elapsed)) => *elapsed >= self.retry_interval_seconds,
            None => true,
        };

        if should_send {
            tracing::trace!(device_id, "emitting Who-Is to resolve unbound device");
            if let Some(slot) = self.pending.iter_mut().find(|(id, _)| *id == device_id) {
                slot.1 = 0;
            } else {
                self.pending.push((device_id, 0));
            }
            return (None, Some(AddressCacheAction::SendWhoIs { low: device_id, high: device_id }));
        }

        (None, None)
    }

    /// Advances TTLs and pending-bind timers by `elapsed_seconds`, evicting
    /// any entry whose TTL has reached zero.
    pub fn timer(&mut self, elapsed_seconds: u32) {
        let delta = i32::try_from(elapsed_seconds).unwrap_or(i32::MAX);
        self.entries.retain_mut(|e| {
            if e.ttl_seconds < 0 {
                return true;
            }
            e.ttl_seconds = e.ttl_seconds.saturating_sub(delta);
            e.ttl_seconds > 0
        });

        for (_, elapsed) in &mut self.pending {
            *elapsed = elapsed.saturating_add(elapsed_seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestAddr = u32;

    #[test]
    fn add_then_get_by_device_round_trips() {
        let mut cache: AddressCache<TestAddr> = AddressCache::new(4, 10);
        assert!(cache.add(123, 1476, SegmentationSupport::None, 0, 0xAAAA));
        assert_eq!(cache.get_by_device(123), Some((1476, SegmentationSupport::None, 0, 0xAAAA)));
    }

    #[test]
    fn who_is_i_am_binds_device() {
        let mut cache: AddressCache<TestAddr> = AddressCache::new(255, 10);
        let (result, action) = cache.bind_request(123);
        assert_eq!(result, None);
        assert_eq!(action, Some(AddressCacheAction::SendWhoIs { low: 123, high: 123 }));

        assert!(cache.add(123, 1476, SegmentationSupport::None, 0, 0xBEEF));
        assert_eq!(cache.get_by_device(123), Some((1476, SegmentationSupport::None, 0, 0xBEEF)));
    }

    #[test]
    fn overflow_evicts_oldest_non_static_entry() {
        let mut cache: AddressCache<TestAddr> = AddressCache::new(2, 10);
        assert!(cache.add(1, 480, SegmentationSupport::Both, 4, 1));
        assert!(cache.add(2, 480, SegmentationSupport::Both, 4, 2));
        assert!(cache.add(3, 480, SegmentationSupport::Both, 4, 3));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_by_device(1), None);
        assert!(cache.get_by_device(2).is_some());
        assert!(cache.get_by_device(3).is_some());
    }

    #[test]
    fn evicted_device_can_be_rebound_with_at_most_one_who_is_per_interval() {
        let mut cache: AddressCache<TestAddr> = AddressCache::new(1, 10);
        cache.add(1, 480, SegmentationSupport::Both, 4, 1);
        cache.add(2, 480, SegmentationSupport::Both, 4, 2);
        assert_eq!(cache.get_by_device(1), None);

        let (result, action) = cache.bind_request(1);
        assert_eq!(result, None);
        assert!(action.is_some());

        let (result, action) = cache.bind_request(1);
        assert_eq!(result, None);
        assert_eq!(action, None, "second bind_request within the retry interval must not re-emit");

        cache.timer(10);
        let (_, action) = cache.bind_request(1);
        assert!(action.is_some(), "a new Who-Is is due once the retry interval elapses");
    }

    #[test]
    fn finite_ttl_entry_expires_on_tick_while_static_entries_survive() {
        let mut cache: AddressCache<TestAddr> = AddressCache::new(4, 10);
        cache.add(1, 480, SegmentationSupport::Both, 4, 1);
        cache.add(2, 480, SegmentationSupport::Both, 4, 2);
        assert!(cache.set_ttl(2, 30));

        cache.timer(29);
        assert!(cache.get_by_device(2).is_some(), "TTL not yet elapsed");

        cache.timer(1);
        assert_eq!(cache.get_by_device(2), None, "zero-TTL entry is reclaimed");
        assert!(cache.get_by_device(1).is_some(), "static entries never expire on tick");

        assert!(!cache.set_ttl(99, 5), "unknown device has no TTL to set");
    }

    #[test]
    fn get_by_index_reflects_inserted_entries() {
        let mut cache: AddressCache<TestAddr> = AddressCache::new(4, 10);
        cache.add(42, 480, SegmentationSupport::Both, 4, 99);
        let (device_id, max_apdu, address) = cache.get_by_index(0).unwrap();
        assert_eq!(device_id, 42);
        assert_eq!(max_apdu, 480);
        assert_eq!(address, 99);
    }
}
