//! Schema-driven, typed configuration. Declare your fields, point at a file
//! or an object, and read validated values.
//!
//! Schemafig loads configuration from a source (a JSON/YAML/TOML file or an
//! in-memory object), overlays environment-variable overrides, validates the
//! merged result against a declarative schema, and keeps the last good
//! snapshot. It notifies per-field listeners when values change and can
//! re-read its source on a timer.
//!
//! ```ignore
//! let config = Schemafig::builder()
//!     .schema(
//!         Schema::new()
//!             .field("port", Field::integer().coerce().env("PORT"))
//!             .field("host", Field::string().default("localhost")),
//!     )
//!     .build()?;
//!
//! config.load("config/app.yaml").await?;
//! let port: u16 = config.get("port")?;
//! ```
//!
//! # Layer precedence
//!
//! ```text
//! Field defaults        Field::default(...)
//!        ↑ overridden by
//! Source                file or object passed to load()
//!        ↑ overridden by
//! Environment vars      Field::env("NAME")
//! ```
//!
//! Environment values win even when the source has a valid value for the same
//! field. Overrides are per field: an env var replaces the whole field value,
//! nested objects are not merged.
//!
//! # Schema
//!
//! A [`Schema`] maps field names to [`Field`]s. Built-in kinds cover strings,
//! integers, numbers, booleans, arrays, and objects; [`Field::typed`]
//! validates through any serde type and [`Field::custom`] takes a closure.
//!
//! Environment variables always arrive as strings, so env-bound scalar fields
//! usually want [`.coerce()`](Field::coerce), which accepts `"8080"` for an
//! integer or `"true"` for a boolean. A variable that fails its field's check
//! fails the load, exactly like a bad file value. Unset (or empty) variables
//! contribute nothing.
//!
//! The schema is compiled once, at [`build()`](SchemafigBuilder::build), into
//! a validator for the whole configuration and a second one covering only the
//! env-bound fields.
//!
//! # Sources and adapters
//!
//! `load` takes anything that converts into a [`SourceRef`]: a path, a
//! `serde_json` object, or [`SourceRef::computed`], a function that picks the
//! source from the resolved env overlay (e.g. `config/{stage}.json`).
//!
//! Unless an adapter was assigned explicitly, one is chosen per load: objects
//! go through the object adapter, paths by suffix (`.json`, `.yaml`/`.yml`,
//! `.toml`, case-sensitive). Any other path fails with
//! [`AdapterNotSet`](SchemafigError::AdapterNotSet). Implement [`Adapter`] to
//! read from somewhere else.
//!
//! # Lifecycle
//!
//! A fresh engine is *unloaded*: [`get`](Schemafig::get) and
//! [`set`](Schemafig::set) fail with [`NotLoaded`](SchemafigError::NotLoaded).
//! Every load is all-or-nothing: if validation fails, the error is returned
//! and the previous snapshot stays in place.
//!
//! Reads and writes copy. The engine never hands out references into its
//! snapshot, so mutating a value you got from `get` (or passed to `set`) never
//! changes engine state.
//!
//! # Listeners
//!
//! [`add_listener`](Schemafig::add_listener) registers a callback for one
//! field. After a load or reload, listeners run for every field whose value
//! changed structurally. After `set`, the field's listeners always run.
//! Callbacks run in registration order; the first one to return an error
//! stops the rest and its error is returned to the caller.
//!
//! # Reloading
//!
//! [`start_reload_interval`](Schemafig::start_reload_interval) re-reads the
//! stored source periodically on the tokio runtime. A failed tick has no
//! caller to report to: it is logged at the `error` event (and passed to
//! [`on_reload_error`](SchemafigBuilder::on_reload_error) if set) and the
//! last good snapshot stays.
//!
//! # Error handling
//!
//! All fallible operations return [`SchemafigError`]. Validation failures
//! carry every offending field with its reason. See the [`error`] module.

pub mod adapter;
pub mod error;
pub mod log;
pub mod schema;
pub mod types;

mod builder;
mod compile;
mod diff;
mod engine;
mod env;
mod file;
mod listeners;
pub(crate) mod merge;
mod reload;
mod resolve;
mod validate;

#[cfg(test)]
mod fixtures;

pub use adapter::{Adapter, FileAdapter, ObjectAdapter};
pub use builder::SchemafigBuilder;
pub use engine::Schemafig;
pub use error::{FieldIssue, ListenerError, SchemafigError, ValidationFailure};
pub use file::Format;
pub use log::{LogEvent, Logger, Severity};
pub use reload::DEFAULT_RELOAD_INTERVAL;
pub use schema::{Coerce, Field, Schema, Validator};
pub use types::{Encoding, RawMap, Source, SourceRef};
