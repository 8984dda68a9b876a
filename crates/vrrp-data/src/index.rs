//! Dispatch indexes from wire-level identifiers to instances.
//!
//! Each key maps to a bucket of [`InstanceId`] references. Several
//! instances may share a key (same router ID, same socket), so a lookup
//! returns a slice. Indexes never own what they reference.

use crate::container::OrderedContainer;
use crate::error::{BuildError, Result};
use crate::instance::InstanceId;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::os::fd::RawFd;
use tracing::debug;

/// Key type for a [`DispatchIndex`].
pub trait DispatchKey: Copy + Eq + Hash + fmt::Display {
    /// Position of the key within the index domain. Keys whose slot is at
    /// or beyond the index bucket count are rejected.
    fn slot(&self) -> usize;
}

/// Router ID on a given interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouterKey {
    pub router_id: u8,
    pub ifindex: u32,
}

impl RouterKey {
    pub fn new(router_id: u8, ifindex: u32) -> Self {
        Self { router_id, ifindex }
    }
}

impl fmt::Display for RouterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vrid {} on ifindex {}", self.router_id, self.ifindex)
    }
}

impl DispatchKey for RouterKey {
    fn slot(&self) -> usize {
        self.router_id as usize
    }
}

/// Socket descriptor shared by one or more instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor(pub RawFd);

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

impl DispatchKey for Descriptor {
    fn slot(&self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

/// Associative index of instance references
///
/// An instance is held under at most one key at a time.
#[derive(Debug, Clone)]
pub struct DispatchIndex<K: DispatchKey> {
    name: &'static str,
    bucket_count: usize,
    buckets: HashMap<K, OrderedContainer<InstanceId>>,
    keys: HashMap<InstanceId, K>,
}

/// Index keyed by router ID and interface
pub type RouterIndex = DispatchIndex<RouterKey>;

/// Index keyed by socket descriptor
pub type DescriptorIndex = DispatchIndex<Descriptor>;

impl<K: DispatchKey> DispatchIndex<K> {
    /// Create an empty index accepting keys whose slot is below `bucket_count`.
    pub fn new(name: &'static str, bucket_count: usize) -> Self {
        Self {
            name,
            bucket_count,
            buckets: HashMap::new(),
            keys: HashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Append `id` to the bucket for `key`.
    ///
    /// An instance already held under another key is moved; inserting it
    /// again under the same key is a no-op. Fails with
    /// [`BuildError::KeyOutOfRange`] and leaves the index untouched when
    /// the key falls outside the domain.
    pub fn insert(&mut self, key: K, id: InstanceId) -> Result<()> {
        let slot = key.slot();
        if slot >= self.bucket_count {
            return Err(BuildError::KeyOutOfRange {
                index: self.name,
                key: slot,
                bucket_count: self.bucket_count,
            });
        }

        if let Some(current) = self.key_of(id) {
            if current == key {
                return Ok(());
            }
            self.remove(id);
        }

        debug!(index = self.name, %key, instance = %id, "Indexed instance");
        self.buckets.entry(key).or_default().append(id);
        self.keys.insert(id, key);
        Ok(())
    }

    /// Drop the reference to `id`, returning the key it was held under.
    pub fn remove(&mut self, id: InstanceId) -> Option<K> {
        let key = self.keys.remove(&id)?;
        if let Some(bucket) = self.buckets.remove(&key) {
            let rest: OrderedContainer<InstanceId> =
                bucket.into_iter().filter(|other| *other != id).collect();
            if !rest.is_empty() {
                self.buckets.insert(key, rest);
            }
        }
        debug!(index = self.name, %key, instance = %id, "Removed index entry");
        Some(key)
    }

    /// Key `id` is currently held under.
    pub fn key_of(&self, id: InstanceId) -> Option<K> {
        self.keys.get(&id).copied()
    }

    /// Instances registered under `key`; empty when there are none.
    pub fn lookup(&self, key: &K) -> &[InstanceId] {
        self.buckets
            .get(key)
            .map(OrderedContainer::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, key: &K, id: InstanceId) -> bool {
        self.lookup(key).contains(&id)
    }

    /// Number of populated keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of references across all buckets.
    pub fn references(&self) -> usize {
        self.buckets.values().map(OrderedContainer::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[InstanceId])> {
        self.buckets.iter().map(|(k, b)| (k, b.as_slice()))
    }

    /// Release the buckets. Referenced instances are left alone.
    ///
    /// Returns the number of buckets released.
    pub fn destroy(self) -> usize {
        let count = self.buckets.len();
        for bucket in self.buckets.into_values() {
            bucket.destroy_all();
        }
        debug!(index = self.name, buckets = count, "Released dispatch index");
        count
    }
}

impl DispatchIndex<RouterKey> {
    /// Every instance using `router_id`, across all interfaces.
    pub fn lookup_router_id(&self, router_id: u8) -> Vec<InstanceId> {
        let mut ids: Vec<InstanceId> = self
            .buckets
            .iter()
            .filter(|(k, _)| k.router_id == router_id)
            .flat_map(|(_, b)| b.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_DESCRIPTOR_BUCKETS, ROUTER_ID_SPACE};

    #[test]
    fn test_insert_then_lookup() {
        let mut index = RouterIndex::new("router", ROUTER_ID_SPACE);
        index.insert(RouterKey::new(51, 2), InstanceId(0)).unwrap();

        assert_eq!(index.lookup(&RouterKey::new(51, 2)), &[InstanceId(0)]);
        assert!(index.lookup(&RouterKey::new(52, 2)).is_empty());
        assert!(index.lookup(&RouterKey::new(51, 3)).is_empty());
        assert!(index.contains(&RouterKey::new(51, 2), InstanceId(0)));
    }

    #[test]
    fn test_bucket_holds_collisions_in_order() {
        let mut index = DescriptorIndex::new("descriptor", DEFAULT_DESCRIPTOR_BUCKETS);
        index.insert(Descriptor(7), InstanceId(2)).unwrap();
        index.insert(Descriptor(7), InstanceId(0)).unwrap();

        assert_eq!(index.lookup(&Descriptor(7)), &[InstanceId(2), InstanceId(0)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.references(), 2);
    }

    #[test]
    fn test_key_at_bucket_count_is_rejected() {
        let mut index = DescriptorIndex::new("descriptor", DEFAULT_DESCRIPTOR_BUCKETS);
        let err = index
            .insert(Descriptor(DEFAULT_DESCRIPTOR_BUCKETS as RawFd), InstanceId(0))
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::KeyOutOfRange {
                index: "descriptor",
                key: DEFAULT_DESCRIPTOR_BUCKETS,
                bucket_count: DEFAULT_DESCRIPTOR_BUCKETS,
            }
        );
        assert!(index.is_empty());

        // Last valid key is accepted
        index
            .insert(Descriptor((DEFAULT_DESCRIPTOR_BUCKETS - 1) as RawFd), InstanceId(0))
            .unwrap();
    }

    #[test]
    fn test_negative_descriptor_is_rejected() {
        let mut index = DescriptorIndex::new("descriptor", DEFAULT_DESCRIPTOR_BUCKETS);
        assert!(index.insert(Descriptor(-1), InstanceId(0)).is_err());
        assert!(index.lookup(&Descriptor(-1)).is_empty());
    }

    #[test]
    fn test_lookup_router_id_spans_interfaces() {
        let mut index = RouterIndex::new("router", ROUTER_ID_SPACE);
        index.insert(RouterKey::new(10, 3), InstanceId(4)).unwrap();
        index.insert(RouterKey::new(10, 2), InstanceId(1)).unwrap();
        index.insert(RouterKey::new(11, 2), InstanceId(2)).unwrap();

        assert_eq!(index.lookup_router_id(10), vec![InstanceId(1), InstanceId(4)]);
        assert!(index.lookup_router_id(12).is_empty());
    }

    #[test]
    fn test_reinsert_moves_instance() {
        let mut index = RouterIndex::new("router", ROUTER_ID_SPACE);
        index.insert(RouterKey::new(51, 2), InstanceId(0)).unwrap();
        index.insert(RouterKey::new(51, 2), InstanceId(1)).unwrap();
        index.insert(RouterKey::new(51, 2), InstanceId(0)).unwrap();
        assert_eq!(index.references(), 2);

        index.insert(RouterKey::new(52, 2), InstanceId(0)).unwrap();
        assert_eq!(index.lookup(&RouterKey::new(51, 2)), &[InstanceId(1)]);
        assert_eq!(index.lookup(&RouterKey::new(52, 2)), &[InstanceId(0)]);
        assert_eq!(index.key_of(InstanceId(0)), Some(RouterKey::new(52, 2)));
        assert_eq!(index.references(), 2);
    }

    #[test]
    fn test_out_of_range_move_keeps_old_entry() {
        let mut index = DescriptorIndex::new("descriptor", 16);
        index.insert(Descriptor(5), InstanceId(0)).unwrap();

        assert!(index.insert(Descriptor(16), InstanceId(0)).is_err());
        assert_eq!(index.lookup(&Descriptor(5)), &[InstanceId(0)]);
        assert_eq!(index.key_of(InstanceId(0)), Some(Descriptor(5)));
    }

    #[test]
    fn test_remove_drops_empty_bucket() {
        let mut index = DescriptorIndex::new("descriptor", DEFAULT_DESCRIPTOR_BUCKETS);
        index.insert(Descriptor(5), InstanceId(0)).unwrap();

        assert_eq!(index.remove(InstanceId(0)), Some(Descriptor(5)));
        assert_eq!(index.remove(InstanceId(0)), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_destroy_releases_buckets_only() {
        let mut index = RouterIndex::new("router", ROUTER_ID_SPACE);
        index.insert(RouterKey::new(1, 1), InstanceId(0)).unwrap();
        index.insert(RouterKey::new(2, 1), InstanceId(1)).unwrap();
        assert_eq!(index.destroy(), 2);
    }
}
