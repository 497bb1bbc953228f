//! Declarative per-field schema.
//!
//! A [`Schema`] maps field names to [`Field`]s. Each field knows how to
//! validate (and normalize) one raw value, and may bind an environment
//! variable whose value overrides the source for that field.
//!
//! ```ignore
//! let schema = Schema::new()
//!     .field("port", Field::integer().coerce().env("PORT"))
//!     .field("host", Field::string().default("localhost"))
//!     .field("tags", Field::array().optional());
//! ```
//!
//! Values flow through as `serde_json::Value` trees. A validator returns the
//! normalized value (e.g. `"3000"` coerced to `3000`) or a reason string that
//! ends up in a [`FieldIssue`](crate::error::FieldIssue).

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A custom check for one field's value.
pub trait Validator: Send + Sync {
    /// Validate a present value and return its normalized form.
    fn validate(&self, value: &Value) -> Result<Value, String>;
}

impl<F> Validator for F
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<Value, String> {
        self(value)
    }
}

struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Validator for Typed<T>
where
    T: DeserializeOwned + Serialize,
{
    fn validate(&self, value: &Value) -> Result<Value, String> {
        let typed: T = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
        serde_json::to_value(typed).map_err(|e| e.to_string())
    }
}

#[derive(Clone)]
enum Kind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
    Custom(Arc<dyn Validator>),
}

impl Kind {
    fn label(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Integer => "integer",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Array => "array",
            Kind::Object => "object",
            Kind::Any => "any",
            Kind::Custom(_) => "custom",
        }
    }
}

/// One configuration field: its shape, coercion, env binding, and fallback.
#[derive(Clone)]
pub struct Field {
    kind: Kind,
    coerce: bool,
    env: Option<String>,
    optional: bool,
    default: Option<Value>,
}

impl Field {
    fn of(kind: Kind) -> Self {
        Self {
            kind,
            coerce: false,
            env: None,
            optional: false,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::of(Kind::String)
    }

    /// A whole number (`i64` or `u64` range).
    pub fn integer() -> Self {
        Self::of(Kind::Integer)
    }

    pub fn number() -> Self {
        Self::of(Kind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(Kind::Boolean)
    }

    pub fn array() -> Self {
        Self::of(Kind::Array)
    }

    pub fn object() -> Self {
        Self::of(Kind::Object)
    }

    /// Accept any value as-is.
    pub fn any() -> Self {
        Self::of(Kind::Any)
    }

    /// Validate by deserializing into `T` and serializing back, so the stored
    /// value is exactly what `T` accepts and produces.
    pub fn typed<T>() -> Self
    where
        T: DeserializeOwned + Serialize + 'static,
    {
        Self::of(Kind::Custom(Arc::new(Typed::<T>(PhantomData))))
    }

    pub fn custom(validator: impl Validator + 'static) -> Self {
        Self::of(Kind::Custom(Arc::new(validator)))
    }

    /// Let scalar kinds accept their string spelling (`"8080"`, `"true"`).
    /// Needed for any field fed from an environment variable.
    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// Bind an environment variable. When set, it overrides the source value.
    pub fn env(mut self, name: &str) -> Self {
        self.env = Some(name.to_string());
        self
    }

    /// Absence is valid; the field is simply missing from the snapshot.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the field is absent from every source. Stored as given,
    /// without passing through the validator.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn env_name(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Validate a field slot that may be absent. `null` counts as absent.
    ///
    /// Returns `Ok(None)` when the field is optional and nothing was supplied.
    pub fn validate(&self, raw: Option<&Value>) -> Result<Option<Value>, String> {
        match raw {
            None | Some(Value::Null) => {
                if let Some(default) = &self.default {
                    Ok(Some(default.clone()))
                } else if self.optional {
                    Ok(None)
                } else {
                    Err("required".into())
                }
            }
            Some(value) => self.check(value).map(Some),
        }
    }

    /// Validate a value that is known to be present.
    pub fn check(&self, value: &Value) -> Result<Value, String> {
        match (&self.kind, value) {
            (Kind::Any, v) => Ok(v.clone()),
            (Kind::Custom(validator), v) => validator.validate(v),
            (Kind::String, Value::String(_)) => Ok(value.clone()),
            (Kind::String, Value::Number(n)) if self.coerce => Ok(Value::String(n.to_string())),
            (Kind::String, Value::Bool(b)) if self.coerce => Ok(Value::String(b.to_string())),
            (Kind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            (Kind::Integer, Value::String(s)) if self.coerce => parse_integer(s.trim())
                .ok_or_else(|| format!("expected an integer, got \"{s}\"")),
            (Kind::Number, Value::Number(_)) => Ok(value.clone()),
            (Kind::Number, Value::String(s)) if self.coerce => parse_number(s.trim())
                .ok_or_else(|| format!("expected a number, got \"{s}\"")),
            (Kind::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (Kind::Boolean, Value::String(s)) if self.coerce => parse_bool(s.trim())
                .ok_or_else(|| format!("expected a boolean, got \"{s}\"")),
            (Kind::Array, Value::Array(_)) => Ok(value.clone()),
            (Kind::Object, Value::Object(_)) => Ok(value.clone()),
            (kind, other) => Err(format!(
                "expected {}, got {}",
                kind.label(),
                value_label(other)
            )),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind.label())
            .field("coerce", &self.coerce)
            .field("env", &self.env)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .finish()
    }
}

fn parse_integer(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<u64>().ok().map(Value::from)
}

fn parse_number(s: &str) -> Option<Value> {
    if let Some(int) = parse_integer(s) {
        return Some(int);
    }
    // NaN and infinities have no JSON representation.
    let f = s.parse::<f64>().ok()?;
    serde_json::Number::from_f64(f).map(Value::Number)
}

fn parse_bool(s: &str) -> Option<Value> {
    if s.eq_ignore_ascii_case("true") {
        Some(Value::Bool(true))
    } else if s.eq_ignore_ascii_case("false") {
        Some(Value::Bool(false))
    } else {
        None
    }
}

fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The full set of named fields. Immutable once handed to the builder.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. A later field with the same name replaces the earlier one.
    pub fn field(mut self, name: &str, field: Field) -> Self {
        self.fields.insert(name.to_string(), field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Env-friendly field constructors handed to schema functions.
///
/// Every field built here already has coercion on, since environment values
/// always arrive as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coerce;

impl Coerce {
    pub fn string(&self) -> Field {
        Field::string().coerce()
    }

    pub fn integer(&self) -> Field {
        Field::integer().coerce()
    }

    pub fn number(&self) -> Field {
        Field::number().coerce()
    }

    pub fn boolean(&self) -> Field {
        Field::boolean().coerce()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn strict_integer_rejects_string() {
        let err = Field::integer().check(&json!("3000")).unwrap_err();
        assert_eq!(err, "expected integer, got string");
    }

    #[test]
    fn coerced_integer_parses_string() {
        assert_eq!(Field::integer().coerce().check(&json!("3000")).unwrap(), json!(3000));
    }

    #[test]
    fn coerced_integer_rejects_garbage() {
        let err = Field::integer().coerce().check(&json!("invalid")).unwrap_err();
        assert!(err.contains("invalid"));
    }

    #[test]
    fn integer_rejects_fraction() {
        assert!(Field::integer().check(&json!(1.5)).is_err());
    }

    #[test]
    fn coerced_number_accepts_float_and_int() {
        let field = Field::number().coerce();
        assert_eq!(field.check(&json!("1.5")).unwrap(), json!(1.5));
        assert_eq!(field.check(&json!("7")).unwrap(), json!(7));
        assert!(field.check(&json!("NaN")).is_err());
    }

    #[test]
    fn coerced_boolean_is_case_insensitive() {
        let field = Field::boolean().coerce();
        assert_eq!(field.check(&json!("TRUE")).unwrap(), json!(true));
        assert_eq!(field.check(&json!("false")).unwrap(), json!(false));
        assert!(field.check(&json!("yes")).is_err());
    }

    #[test]
    fn coerced_string_accepts_scalars() {
        let field = Field::string().coerce();
        assert_eq!(field.check(&json!(42)).unwrap(), json!("42"));
        assert!(Field::string().check(&json!(42)).is_err());
    }

    #[test]
    fn absent_required_field_fails() {
        assert_eq!(Field::string().validate(None).unwrap_err(), "required");
        assert_eq!(
            Field::string().validate(Some(&Value::Null)).unwrap_err(),
            "required"
        );
    }

    #[test]
    fn absent_optional_field_is_none() {
        assert_eq!(Field::string().optional().validate(None).unwrap(), None);
    }

    #[test]
    fn default_fills_absence() {
        let field = Field::string().default("localhost");
        assert_eq!(field.validate(None).unwrap(), Some(json!("localhost")));
        assert_eq!(
            field.validate(Some(&json!("0.0.0.0"))).unwrap(),
            Some(json!("0.0.0.0"))
        );
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum Mode {
        Fast,
        Slow,
    }

    #[test]
    fn typed_field_uses_serde() {
        let field = Field::typed::<Mode>();
        assert_eq!(field.check(&json!("fast")).unwrap(), json!("fast"));
        assert!(field.check(&json!("medium")).is_err());
    }

    #[test]
    fn custom_closure_validator() {
        let field = Field::custom(|v: &Value| match v.as_u64() {
            Some(port) if port > 0 && port < 65536 => Ok(v.clone()),
            _ => Err("expected a port number".to_string()),
        });
        assert!(field.check(&json!(8080)).is_ok());
        assert_eq!(field.check(&json!(0)).unwrap_err(), "expected a port number");
    }

    #[test]
    fn coerce_helpers_turn_on_coercion() {
        let c = Coerce;
        assert_eq!(c.integer().check(&json!("12")).unwrap(), json!(12));
        assert_eq!(c.boolean().check(&json!("true")).unwrap(), json!(true));
    }

    #[test]
    fn schema_later_field_replaces_earlier() {
        let schema = Schema::new()
            .field("port", Field::string())
            .field("port", Field::integer().env("PORT"));
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("port").unwrap().env_name(), Some("PORT"));
    }
}
