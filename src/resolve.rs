//! Core resolution pipeline: merge the source mapping with the env overlay and
//! produce a validated snapshot.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, so the full
//! pipeline is testable with synthetic inputs. Steps:
//!
//! 1. Reject unknown source keys (if strict mode)
//! 2. Lay the env overlay over the source mapping (overlay wins)
//! 3. Validate the merged mapping against the combined validator

use crate::compile::CompiledSchema;
use crate::error::ValidationFailure;
use crate::merge;
use crate::types::RawMap;
use crate::validate;

/// All pre-loaded data needed to resolve a snapshot.
pub struct ResolveInput {
    /// Mapping produced by the source adapter.
    pub raw: RawMap,
    /// Validated env overlay.
    pub overlay: RawMap,
    /// Whether to reject source keys that match no field.
    pub strict: bool,
}

/// Resolve a snapshot. On failure every issue is reported: unknown keys from
/// step 1 together with the field issues from step 3.
pub fn resolve(compiled: &CompiledSchema, input: ResolveInput) -> Result<RawMap, ValidationFailure> {
    let mut issues = Vec::new();
    if input.strict
        && let Err(unknown) = validate::validate_unknown_keys(&input.raw, &compiled.schema)
    {
        issues.extend(unknown.issues);
    }

    let merged = merge::overlay(input.raw, input.overlay);
    match compiled.combined.validate(&merged) {
        Ok(snapshot) if issues.is_empty() => Ok(snapshot),
        Ok(_) => Err(ValidationFailure { issues }),
        Err(failure) => {
            issues.extend(failure.issues);
            Err(ValidationFailure { issues })
        }
    }
}
