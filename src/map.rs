//! Byte-string keyed counter table.
//!
//! Separate chaining over a power-of-two bucket array, FNV-1a hashing and
//! doubling when the load factor passes 3/4. Keys are stored once; growing the
//! table moves entries into the new buckets instead of copying them.

use crate::error::MapError;

pub const INITIAL_CAPACITY: usize = 1024;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a.
#[inline]
pub fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[derive(Debug)]
struct Entry {
    key: Box<[u8]>,
    value: i64,
}

#[derive(Debug)]
pub struct AggregationMap {
    buckets: Vec<Vec<Entry>>,
    len: usize,
}

impl Default for AggregationMap {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationMap {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(INITIAL_CAPACITY);
        buckets.resize_with(INITIAL_CAPACITY, Vec::new);
        Self { buckets, len: 0 }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Counter for `key`, `0` when the key was never set.
    pub fn get(&self, key: &[u8]) -> i64 {
        self.buckets[self.index_of(key)]
            .iter()
            .find(|e| &*e.key == key)
            .map_or(0, |e| e.value)
    }

    /// Inserts or overwrites the counter for `key`.
    ///
    /// On `Err` the map is left in an unspecified state and must be dropped.
    pub fn set(&mut self, key: &[u8], value: i64) -> Result<(), MapError> {
        let idx = self.index_of(key);
        if let Some(entry) = self.buckets[idx].iter_mut().find(|e| &*e.key == key) {
            entry.value = value;
            return Ok(());
        }
        self.insert_new(idx, key, value)
    }

    /// Same as `set(key, get(key) + delta)` with a single chain walk.
    pub fn add(&mut self, key: &[u8], delta: i64) -> Result<(), MapError> {
        let idx = self.index_of(key);
        if let Some(entry) = self.buckets[idx].iter_mut().find(|e| &*e.key == key) {
            entry.value += delta;
            return Ok(());
        }
        self.insert_new(idx, key, delta)
    }

    /// All entries, bucket index ascending then chain position ascending.
    ///
    /// The order only depends on the keys and the insertion sequence, so two
    /// maps built from the same input iterate identically.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], i64)> + '_ {
        self.buckets
            .iter()
            .flat_map(|chain| chain.iter())
            .map(|e| (&*e.key, e.value))
    }

    #[inline]
    fn index_of(&self, key: &[u8]) -> usize {
        bucket_index(key, self.buckets.len())
    }

    fn insert_new(&mut self, idx: usize, key: &[u8], value: i64) -> Result<(), MapError> {
        let mut owned = Vec::new();
        owned.try_reserve_exact(key.len())?;
        owned.extend_from_slice(key);

        let chain = &mut self.buckets[idx];
        chain.try_reserve(1)?;
        chain.push(Entry {
            key: owned.into_boxed_slice(),
            value,
        });
        self.len += 1;

        if self.len > self.capacity() * 3 / 4 {
            self.grow()?;
        }
        Ok(())
    }

    fn grow(&mut self) -> Result<(), MapError> {
        let new_capacity = self.capacity() * 2;

        let mut buckets: Vec<Vec<Entry>> = Vec::new();
        buckets.try_reserve_exact(new_capacity)?;
        buckets.resize_with(new_capacity, Vec::new);

        let old = std::mem::replace(&mut self.buckets, buckets);
        for entry in old.into_iter().flatten() {
            let chain = &mut self.buckets[bucket_index(&entry.key, new_capacity)];
            chain.try_reserve(1)?;
            chain.push(entry);
        }
        Ok(())
    }
}

#[inline]
fn bucket_index(key: &[u8], capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    (fnv1a64(key) & (capacity as u64 - 1)) as usize
}
