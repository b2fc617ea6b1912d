//! Top-K selection by repeated full scans.
//!
//! Each round scans the whole map in its iteration order (bucket ascending,
//! chain position ascending) and takes the strictly largest counter among the
//! keys not picked yet, so among equal counters the first key met in that
//! order wins. `O(k * len)`, fine for the small `k` this is used with.

use ahash::AHashSet;

use crate::map::AggregationMap;

/// Fills the result when the map has fewer than `k` keys.
pub const PLACEHOLDER: &str = "(none)";

/// Up to `k` `(key, counter)` pairs, counter descending.
pub fn top_k_entries(map: &AggregationMap, k: usize) -> Vec<(&[u8], i64)> {
    let mut picked: AHashSet<&[u8]> = AHashSet::with_capacity(k);
    let mut out = Vec::with_capacity(k.min(map.len()));

    for _ in 0..k {
        let mut best: Option<(&[u8], i64)> = None;
        for (key, value) in map.iter() {
            if picked.contains(key) {
                continue;
            }
            if best.map_or(true, |(_, v)| value > v) {
                best = Some((key, value));
            }
        }
        let Some((key, value)) = best else {
            break;
        };
        picked.insert(key);
        out.push((key, value));
    }
    out
}

/// Exactly `k` keys, counter descending, padded with [`PLACEHOLDER`].
pub fn top_k(map: &AggregationMap, k: usize) -> Vec<String> {
    let mut keys: Vec<String> = top_k_entries(map, k)
        .into_iter()
        .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
        .collect();
    keys.resize(k, PLACEHOLDER.to_string());
    keys
}
