//! Bounded LRU memoization of predictor outputs.
//!
//! Keys are the exact bit patterns of the descriptor floats; two
//! descriptors hit the same entry only when they are bitwise identical.
//! There is deliberately no epsilon tolerance.

use std::collections::{BTreeMap, HashMap};

/// LRU cache from descriptor vectors to predicted scalars.
#[derive(Debug)]
pub struct LruCache {
    capacity: usize,
    map: HashMap<Vec<u32>, (f32, u64)>,
    recency: BTreeMap<u64, Vec<u32>>,
    stamp: u64,
}

impl LruCache {
    /// Cache holding up to `capacity` entries. Zero disables storage.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            recency: BTreeMap::new(),
            stamp: 0,
        }
    }

    fn key(descriptor: &[f32]) -> Vec<u32> {
        descriptor.iter().map(|v| v.to_bits()).collect()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Look up a descriptor, refreshing its recency on a hit.
    pub fn get(&mut self, descriptor: &[f32]) -> Option<f32> {
        let key = Self::key(descriptor);
        let (value, old_stamp) = *self.map.get(&key)?;

        self.stamp += 1;
        let stamp = self.stamp;
        self.recency.remove(&old_stamp);
        self.recency.insert(stamp, key.clone());
        self.map.insert(key, (value, stamp));
        Some(value)
    }

    /// Insert or update an entry, evicting the least recently used one
    /// when at capacity.
    pub fn add(&mut self, descriptor: &[f32], value: f32) {
        if self.capacity == 0 {
            return;
        }
        let key = Self::key(descriptor);
        self.stamp += 1;
        let stamp = self.stamp;

        if let Some((_, old_stamp)) = self.map.insert(key.clone(), (value, stamp)) {
            self.recency.remove(&old_stamp);
        } else if self.map.len() > self.capacity {
            if let Some((&oldest, _)) = self.recency.iter().next() {
                if let Some(victim) = self.recency.remove(&oldest) {
                    self.map.remove(&victim);
                }
            }
        }
        self.recency.insert(stamp, key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let mut cache = LruCache::new(4);
        let d = [1.0f32, 2.0, 3.0];
        assert_eq!(cache.get(&d), None);
        cache.add(&d, 42.0);
        assert_eq!(cache.get(&d), Some(42.0));
    }

    #[test]
    fn bitwise_keys_have_no_tolerance() {
        let mut cache = LruCache::new(4);
        cache.add(&[1.0f32], 1.0);
        assert_eq!(cache.get(&[1.0f32 + f32::EPSILON]), None);
        // 0.0 and -0.0 differ in bits, so they are different keys
        cache.add(&[0.0f32], 7.0);
        assert_eq!(cache.get(&[-0.0f32]), None);
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        cache.add(&[1.0f32], 1.0);
        cache.add(&[2.0f32], 2.0);
        // touch [1.0] so [2.0] becomes the LRU entry
        assert_eq!(cache.get(&[1.0f32]), Some(1.0));
        cache.add(&[3.0f32], 3.0);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&[2.0f32]), None);
        assert_eq!(cache.get(&[1.0f32]), Some(1.0));
        assert_eq!(cache.get(&[3.0f32]), Some(3.0));
    }

    #[test]
    fn update_refreshes_value_and_recency() {
        let mut cache = LruCache::new(2);
        cache.add(&[1.0f32], 1.0);
        cache.add(&[2.0f32], 2.0);
        cache.add(&[1.0f32], 10.0); // update, [2.0] is now LRU
        cache.add(&[3.0f32], 3.0);

        assert_eq!(cache.get(&[1.0f32]), Some(10.0));
        assert_eq!(cache.get(&[2.0f32]), None);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut cache = LruCache::new(0);
        cache.add(&[1.0f32], 1.0);
        assert!(cache.is_empty());
        assert_eq!(cache.get(&[1.0f32]), None);
    }
}
