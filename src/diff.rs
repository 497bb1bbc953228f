use crate::types::RawMap;

/// Names of fields whose values differ structurally between two snapshots.
///
/// A field present on one side and absent on the other counts as changed.
/// Order follows `next`, then fields only present in `prev`.
pub fn changed_fields(prev: &RawMap, next: &RawMap) -> Vec<String> {
    let mut changed: Vec<String> = next
        .iter()
        .filter(|(key, value)| prev.get(key.as_str()) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();

    changed.extend(
        prev.keys()
            .filter(|key| !next.contains_key(key.as_str()))
            .cloned(),
    );
    changed
}
