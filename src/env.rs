use std::collections::HashMap;

use serde_json::Value;

use crate::compile::CompiledSchema;
use crate::error::ValidationFailure;
use crate::types::RawMap;

/// Where environment variables come from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// Read the process environment at every load.
    #[default]
    Process,
    /// A fixed set of variables. Used by tests and embedders that manage
    /// their own environment.
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    fn lookup(&self, name: &str) -> Option<String> {
        match self {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// Build the raw overlay: one string entry per env-bound field whose variable
/// is set to a non-empty value. Unset variables leave no key behind.
pub fn env_to_map(compiled: &CompiledSchema, env: &EnvSource) -> RawMap {
    let mut map = RawMap::new();
    for (field, var) in compiled.env_bindings() {
        let Some(value) = env.lookup(var) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        map.insert(field.to_string(), Value::String(value));
    }
    map
}

/// Read the environment and validate it against the env-overlay validator.
///
/// A variable that fails its field's coercion is a validation failure, the
/// same as a mistyped file value.
pub fn resolve_overlay(
    compiled: &CompiledSchema,
    env: &EnvSource,
) -> Result<RawMap, ValidationFailure> {
    let raw = env_to_map(compiled, env);
    compiled.env_overlay.validate(&raw)
}
