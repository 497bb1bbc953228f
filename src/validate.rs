//! Strict-mode validation: detect source keys that match no schema field.

use crate::error::{FieldIssue, ValidationFailure};
use crate::schema::Schema;
use crate::types::RawMap;

/// Fail with one issue per key in `raw` that the schema does not declare.
pub fn validate_unknown_keys(raw: &RawMap, schema: &Schema) -> Result<(), ValidationFailure> {
    let issues: Vec<FieldIssue> = raw
        .keys()
        .filter(|key| !schema.contains(key))
        .map(|key| FieldIssue {
            field: key.clone(),
            reason: "unknown field".into(),
        })
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { issues })
    }
}
