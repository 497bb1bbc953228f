use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::adapter::Adapter;
use crate::compile::CompiledSchema;
use crate::engine::{Inner, ReloadErrorFn, Schemafig, State};
use crate::env::EnvSource;
use crate::error::SchemafigError;
use crate::log::{EventLog, LogEvent, Logger, Severity};
use crate::schema::{Coerce, Schema};

/// Builder for a [`Schemafig`] engine.
///
/// Only the schema is required. Everything else has a default:
///
/// - **Logging**: `tracing` events under the `schemafig` target.
/// - **Environment**: the process environment, read at every load.
/// - **Adapter**: chosen from each source (see [`adapter`](crate::adapter)).
/// - **Reload**: off until [`start_reload_interval`](Schemafig::start_reload_interval)
///   is called, or armed after the first load if [`reload_interval`](Self::reload_interval) is set.
pub struct SchemafigBuilder {
    schema: Option<Schema>,
    reload_interval: Option<Duration>,
    logger: Option<Logger>,
    levels: HashMap<LogEvent, Severity>,
    adapter: Option<Arc<dyn Adapter>>,
    env: EnvSource,
    strict: bool,
    on_reload_error: Option<ReloadErrorFn>,
}

impl SchemafigBuilder {
    pub(crate) fn new() -> Self {
        Self {
            schema: None,
            reload_interval: None,
            logger: Some(Logger::Tracing),
            levels: HashMap::new(),
            adapter: None,
            env: EnvSource::Process,
            strict: false,
            on_reload_error: None,
        }
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Build the schema with env-friendly (coercing) field constructors.
    ///
    /// ```ignore
    /// Schemafig::builder().schema_fn(|env| {
    ///     Schema::new()
    ///         .field("port", env.integer().env("PORT"))
    ///         .field("debug", env.boolean().default(false).env("DEBUG"))
    /// })
    /// ```
    pub fn schema_fn<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Coerce) -> Schema,
    {
        self.schema = Some(f(&Coerce));
        self
    }

    /// Reload at this interval, starting after the first successful load.
    pub fn reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = Some(interval);
        self
    }

    /// Turn the default `tracing` logger on or off.
    pub fn logger(mut self, enabled: bool) -> Self {
        self.logger = enabled.then_some(Logger::Tracing);
        self
    }

    /// Send log lines to a callback instead of `tracing`.
    pub fn custom_logger<F>(self, f: F) -> Self
    where
        F: Fn(&str, Severity) + Send + Sync + 'static,
    {
        self.log_sink(Logger::custom(f))
    }

    pub fn log_sink(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Change the severity of one event. [`Severity::Silent`] drops it.
    pub fn log_level(mut self, event: LogEvent, severity: Severity) -> Self {
        self.levels.insert(event, severity);
        self
    }

    /// Assign an adapter up front. Auto-selection never replaces it.
    pub fn adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    /// Use these variables instead of the process environment.
    pub fn env_vars(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = EnvSource::Fixed(vars.into_iter().collect());
        self
    }

    /// Enable or disable strict mode (default: `false`).
    /// In strict mode, source keys that match no field fail validation
    /// instead of being dropped.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Called with the error of every failed reload tick, in addition to the
    /// error log line.
    pub fn on_reload_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&SchemafigError) + Send + Sync + 'static,
    {
        self.on_reload_error = Some(Arc::new(f));
        self
    }

    /// Compile the schema and create the engine, unloaded.
    pub fn build(self) -> Result<Schemafig, SchemafigError> {
        let schema = self.schema.ok_or(SchemafigError::SchemaRequired)?;
        let log = EventLog::new(self.logger, self.levels);

        let compiled = CompiledSchema::compile(schema);
        log.emit(
            LogEvent::SchemaCompiled,
            format!("compiled schema with {} field(s)", compiled.combined.len()),
        );
        log.emit(
            LogEvent::EnvSchemaCompiled,
            format!(
                "compiled env schema with {} bound field(s)",
                compiled.env_overlay.len()
            ),
        );

        let mut state = State::default();
        if let Some(adapter) = self.adapter {
            log.emit(
                LogEvent::AdapterAssigned,
                format!("assigned the {} adapter", adapter.name()),
            );
            state.adapter = Some(adapter);
            state.adapter_explicit = true;
        }

        Ok(Schemafig::from_inner(Inner {
            compiled,
            log,
            env: self.env,
            strict: self.strict,
            reload_interval: self.reload_interval,
            on_reload_error: self.on_reload_error,
            state: Mutex::new(state),
        }))
    }
}
