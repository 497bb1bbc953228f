//! Schema compilation: turn a [`Schema`] into the two aggregate validators
//! used by the load pipeline.
//!
//! - `combined` checks a whole merged mapping, one entry per field.
//! - `env_overlay` checks only env-bound fields, each wrapped as optional
//!   and without defaults, so an unset variable contributes nothing.
//!
//! Both are built once, when the engine is built.

use crate::error::{FieldIssue, ValidationFailure};
use crate::schema::{Field, Schema};
use crate::types::RawMap;

#[derive(Debug, Clone)]
struct Rule {
    name: String,
    field: Field,
    /// Absence is valid and yields nothing, regardless of the field's own
    /// optional/default settings.
    absent_ok: bool,
}

/// Validates a mapping against a fixed set of named fields.
#[derive(Debug, Clone)]
pub struct ObjectValidator {
    rules: Vec<Rule>,
}

impl ObjectValidator {
    /// Validate `input` and return the normalized mapping.
    ///
    /// Keys without a rule are dropped. Every failing field is reported, not
    /// just the first.
    pub fn validate(&self, input: &RawMap) -> Result<RawMap, ValidationFailure> {
        let mut out = RawMap::new();
        let mut issues = Vec::new();

        for rule in &self.rules {
            let raw = input.get(&rule.name);
            let result = match raw {
                None if rule.absent_ok => Ok(None),
                Some(value) if rule.absent_ok => rule.field.check(value).map(Some),
                _ => rule.field.validate(raw),
            };
            match result {
                Ok(Some(value)) => {
                    out.insert(rule.name.clone(), value);
                }
                Ok(None) => {}
                Err(reason) => issues.push(FieldIssue {
                    field: rule.name.clone(),
                    reason,
                }),
            }
        }

        if issues.is_empty() {
            Ok(out)
        } else {
            Err(ValidationFailure { issues })
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// The schema's compiled form. Read-only after construction.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub schema: Schema,
    pub combined: ObjectValidator,
    pub env_overlay: ObjectValidator,
}

impl CompiledSchema {
    pub fn compile(schema: Schema) -> Self {
        let combined = ObjectValidator {
            rules: schema
                .iter()
                .map(|(name, field)| Rule {
                    name: name.to_string(),
                    field: field.clone(),
                    absent_ok: false,
                })
                .collect(),
        };

        let env_overlay = ObjectValidator {
            rules: schema
                .iter()
                .filter(|(_, field)| field.env_name().is_some())
                .map(|(name, field)| Rule {
                    name: name.to_string(),
                    field: field.clone(),
                    absent_ok: true,
                })
                .collect(),
        };

        Self {
            schema,
            combined,
            env_overlay,
        }
    }

    /// `(field, variable)` pairs for every env-bound field.
    pub fn env_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.schema
            .iter()
            .filter_map(|(name, field)| field.env_name().map(|var| (name, var)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::server_schema;
    use serde_json::json;

    fn map(value: serde_json::Value) -> RawMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn combined_covers_every_field() {
        let compiled = CompiledSchema::compile(server_schema());
        let names: Vec<&str> = compiled.combined.field_names().collect();
        assert_eq!(names, vec!["debug", "host", "port", "tags"]);
    }

    #[test]
    fn env_overlay_covers_only_bound_fields() {
        let compiled = CompiledSchema::compile(server_schema());
        let names: Vec<&str> = compiled.env_overlay.field_names().collect();
        assert_eq!(names, vec!["debug", "port"]);
        let bindings: Vec<_> = compiled.env_bindings().collect();
        assert_eq!(bindings, vec![("debug", "APP_DEBUG"), ("port", "APP_PORT")]);
    }

    #[test]
    fn combined_accepts_valid_mapping() {
        let compiled = CompiledSchema::compile(server_schema());
        let out = compiled
            .combined
            .validate(&map(json!({"port": "3000", "host": "localhost"})))
            .unwrap();
        assert_eq!(out["port"], json!(3000));
        assert_eq!(out["debug"], json!(false));
        assert!(!out.contains_key("tags"));
    }

    #[test]
    fn combined_reports_every_offending_field() {
        let compiled = CompiledSchema::compile(server_schema());
        let err = compiled
            .combined
            .validate(&map(json!({"port": "invalid"})))
            .unwrap_err();
        assert!(err.has_field("port"));
        assert!(err.has_field("host"));
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn combined_drops_unknown_keys() {
        let compiled = CompiledSchema::compile(server_schema());
        let out = compiled
            .combined
            .validate(&map(json!({"port": 1, "host": "h", "extra": true})))
            .unwrap();
        assert!(!out.contains_key("extra"));
    }

    #[test]
    fn env_overlay_treats_absence_as_valid_without_defaults() {
        let compiled = CompiledSchema::compile(server_schema());
        let out = compiled.env_overlay.validate(&RawMap::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn env_overlay_rejects_mistyped_value() {
        let compiled = CompiledSchema::compile(server_schema());
        let err = compiled
            .env_overlay
            .validate(&map(json!({"port": "not-a-port"})))
            .unwrap_err();
        assert!(err.has_field("port"));
    }

    #[test]
    fn env_overlay_ignores_unbound_fields() {
        let compiled = CompiledSchema::compile(server_schema());
        let out = compiled
            .env_overlay
            .validate(&map(json!({"host": 12})))
            .unwrap();
        assert!(out.is_empty());
    }
}
