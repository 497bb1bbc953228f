use crate::types::RawMap;

/// Lay `overlay` over `base`, field by field. An overlay field replaces the
/// base value for that field wholesale; nested objects are not merged.
pub fn overlay(mut base: RawMap, overlay: RawMap) -> RawMap {
    for (key, value) in overlay {
        base.insert(key, value);
    }
    base
}
