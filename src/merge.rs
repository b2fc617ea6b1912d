use crate::error::MapError;
use crate::map::AggregationMap;

/// Sums every counter of every input map into one fresh map.
///
/// Runs after the join barrier on the merging thread, which by then is the
/// only owner of the worker maps.
pub fn join<I>(maps: I) -> Result<AggregationMap, MapError>
where
    I: IntoIterator<Item = AggregationMap>,
{
    let mut result = AggregationMap::new();
    for map in maps {
        for (key, value) in map.iter() {
            result.set(key, result.get(key) + value)?;
        }
    }
    Ok(result)
}
