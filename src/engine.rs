//! The configuration engine: owns the current snapshot and runs the
//! load → merge → validate → diff → notify lifecycle.
//!
//! An engine starts *unloaded*: the schema is compiled but there is no
//! snapshot, and [`get`](Schemafig::get) / [`set`](Schemafig::set) fail with
//! [`NotLoaded`](SchemafigError::NotLoaded). The first successful
//! [`load`](Schemafig::load) or [`load_sync`](Schemafig::load_sync) makes it
//! *loaded*. Later loads and reload ticks replace the snapshot only if the
//! new configuration validates; on failure the previous snapshot stays.
//!
//! Values cross the engine boundary by copy. `get` hands out a fresh clone and
//! `set` stores its own, so callers can never mutate engine state in place.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::adapter::{self, Adapter};
use crate::builder::SchemafigBuilder;
use crate::compile::CompiledSchema;
use crate::diff;
use crate::env::{self, EnvSource};
use crate::error::{ListenerError, SchemafigError, ValidationFailure};
use crate::listeners::{self, Listener, ListenerRegistry};
use crate::log::{EventLog, LogEvent};
use crate::reload::{self, DEFAULT_RELOAD_INTERVAL};
use crate::resolve::{self, ResolveInput};
use crate::schema::Field;
use crate::types::{RawMap, Source, SourceRef};

pub(crate) type ReloadErrorFn = Arc<dyn Fn(&SchemafigError) + Send + Sync>;

/// A typed configuration manager. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Schemafig {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) compiled: CompiledSchema,
    pub(crate) log: EventLog,
    pub(crate) env: EnvSource,
    pub(crate) strict: bool,
    pub(crate) reload_interval: Option<Duration>,
    pub(crate) on_reload_error: Option<ReloadErrorFn>,
    pub(crate) state: Mutex<State>,
}

#[derive(Default)]
pub(crate) struct State {
    snapshot: Option<RawMap>,
    source: Option<Source>,
    pub(crate) adapter: Option<Arc<dyn Adapter>>,
    pub(crate) adapter_explicit: bool,
    listeners: ListenerRegistry,
    reload: Option<CancellationToken>,
    /// Ticket of the most recently started load.
    started: u64,
    /// Ticket of the load whose result is the current snapshot.
    committed: u64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(token) = self.state.get_mut().reload.take() {
            token.cancel();
        }
    }
}

/// A load that has resolved its source and adapter but not read yet.
struct Prepared {
    source: Source,
    adapter: Arc<dyn Adapter>,
    overlay: RawMap,
    ticket: u64,
}

/// One field's pending notification, gathered under the lock and run after it
/// is released.
struct Notification {
    field: String,
    new_value: Value,
    old_value: Value,
    listeners: Vec<Listener>,
}

impl Schemafig {
    pub fn builder() -> SchemafigBuilder {
        SchemafigBuilder::new()
    }

    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock()
    }

    fn emit(&self, event: LogEvent, message: impl AsRef<str>) {
        self.inner.log.emit(event, message);
    }

    /// Log a failure at the `error` event before handing it back.
    fn logged<T>(&self, result: Result<T, SchemafigError>) -> Result<T, SchemafigError> {
        if let Err(err) = &result {
            self.emit(LogEvent::Error, err.to_string());
        }
        result
    }

    fn field(&self, name: &str) -> Result<&Field, SchemafigError> {
        self.inner
            .compiled
            .schema
            .get(name)
            .ok_or_else(|| SchemafigError::UnknownField(name.to_string()))
    }

    // -- Loading ------------------------------------------------------------

    /// Load from `source`, reading files without blocking the runtime.
    ///
    /// `source` may be a path, a literal object, or a [`SourceRef::computed`]
    /// function that picks the source from the resolved env overlay.
    pub async fn load(&self, source: impl Into<SourceRef>) -> Result<(), SchemafigError> {
        let source = source.into();
        let result = self.load_inner(&source, LogEvent::LoadSucceeded).await;
        self.logged(result)
    }

    /// Like [`load`](Self::load), but blocks the calling thread on file reads.
    pub fn load_sync(&self, source: impl Into<SourceRef>) -> Result<(), SchemafigError> {
        let source = source.into();
        let result = self.prepare(&source).and_then(|prepared| {
            let raw = prepared.adapter.load_sync(&prepared.source)?;
            self.commit(raw, prepared.overlay, prepared.ticket, LogEvent::LoadSucceeded)
        });
        self.logged(result)
    }

    /// Re-run the load path against the most recently stored source.
    pub async fn reload(&self) -> Result<(), SchemafigError> {
        let stored = self.state().source.clone();
        let result = match stored {
            Some(source) => {
                self.load_inner(&SourceRef::Fixed(source), LogEvent::ReloadSucceeded)
                    .await
            }
            None => Err(SchemafigError::NoSource),
        };
        self.logged(result)
    }

    async fn load_inner(
        &self,
        source_ref: &SourceRef,
        event: LogEvent,
    ) -> Result<(), SchemafigError> {
        let prepared = self.prepare(source_ref)?;
        let raw = prepared.adapter.load(&prepared.source).await?;
        self.commit(raw, prepared.overlay, prepared.ticket, event)
    }

    /// Resolve the env overlay and the concrete source, store the source,
    /// settle on an adapter, and take a ticket ordering this load against
    /// others in flight.
    fn prepare(&self, source_ref: &SourceRef) -> Result<Prepared, SchemafigError> {
        let overlay = env::resolve_overlay(&self.inner.compiled, &self.inner.env)?;
        let source = source_ref.resolve(&overlay);

        let (adapter, selected, ticket) = {
            let mut state = self.state();
            state.source = Some(source.clone());
            let selected = !state.adapter_explicit;
            if selected {
                state.adapter = adapter::select(&source);
            }
            state.started += 1;
            (state.adapter.clone(), selected, state.started)
        };

        let adapter = adapter.ok_or(SchemafigError::AdapterNotSet)?;
        if selected {
            self.emit(
                LogEvent::AdapterAssigned,
                format!("selected the {} adapter", adapter.name()),
            );
        }
        Ok(Prepared {
            source,
            adapter,
            overlay,
            ticket,
        })
    }

    /// Validate the merged mapping, swap it in, and notify listeners of every
    /// field that changed.
    ///
    /// A load that finishes after a later-started load has already committed
    /// is discarded: its data is older than the current snapshot.
    fn commit(
        &self,
        raw: RawMap,
        overlay: RawMap,
        ticket: u64,
        event: LogEvent,
    ) -> Result<(), SchemafigError> {
        let snapshot = resolve::resolve(
            &self.inner.compiled,
            ResolveInput {
                raw,
                overlay,
                strict: self.inner.strict,
            },
        )?;

        let verb = match event {
            LogEvent::ReloadSucceeded => "reload",
            _ => "load",
        };

        let committed = {
            let mut state = self.state();
            if ticket < state.committed {
                None
            } else {
                state.committed = ticket;
                let prev = state.snapshot.replace(snapshot.clone());
                let notifications: Vec<Notification> = match &prev {
                    Some(prev) => diff::changed_fields(prev, &snapshot)
                        .into_iter()
                        .map(|field| Notification {
                            new_value: snapshot.get(&field).cloned().unwrap_or(Value::Null),
                            old_value: prev.get(&field).cloned().unwrap_or(Value::Null),
                            listeners: state.listeners.for_field(&field),
                            field,
                        })
                        .collect(),
                    None => Vec::new(),
                };
                Some((prev.is_none(), notifications))
            }
        };

        let Some((first_load, notifications)) = committed else {
            self.emit(
                event,
                format!("discarded stale {verb} result; a newer load already applied"),
            );
            return Ok(());
        };

        self.emit(
            event,
            format!("{verb}ed configuration ({} changed)", notifications.len()),
        );

        if first_load && let Some(interval) = self.inner.reload_interval {
            // The load itself succeeded; a timer that cannot start is only logged.
            if let Err(err) = self.start_reload_interval(Some(interval)) {
                self.emit(LogEvent::Error, err.to_string());
            }
        }

        for notification in notifications {
            self.notify(notification)?;
        }
        Ok(())
    }

    fn notify(&self, n: Notification) -> Result<(), SchemafigError> {
        if n.listeners.is_empty() {
            return Ok(());
        }
        self.emit(
            LogEvent::ListenerRun,
            format!("running {} listener(s) for '{}'", n.listeners.len(), n.field),
        );
        listeners::dispatch(&n.listeners, &n.new_value, &n.old_value).map_err(|source| {
            SchemafigError::Listener {
                field: n.field,
                source,
            }
        })
    }

    // -- Access -------------------------------------------------------------

    /// A copy of `field`'s current value; `Value::Null` for an absent optional field.
    pub fn get_value(&self, field: &str) -> Result<Value, SchemafigError> {
        let result = self.read_field(field);
        if result.is_ok() {
            self.emit(LogEvent::Get, format!("get '{field}'"));
        }
        self.logged(result)
    }

    fn read_field(&self, field: &str) -> Result<Value, SchemafigError> {
        let state = self.state();
        let snapshot = state.snapshot.as_ref().ok_or(SchemafigError::NotLoaded)?;
        self.field(field)?;
        Ok(snapshot.get(field).cloned().unwrap_or(Value::Null))
    }

    /// `field`'s current value, deserialized into `T`.
    pub fn get<T: DeserializeOwned>(&self, field: &str) -> Result<T, SchemafigError> {
        let value = self.get_value(field)?;
        let result = serde_json::from_value(value).map_err(|source| SchemafigError::Serde {
            field: field.to_string(),
            source,
        });
        self.logged(result)
    }

    /// A copy of the whole current configuration.
    pub fn snapshot_value(&self) -> Result<RawMap, SchemafigError> {
        let result = self
            .state()
            .snapshot
            .clone()
            .ok_or(SchemafigError::NotLoaded);
        self.logged(result)
    }

    /// The whole current configuration, deserialized into `T`.
    pub fn snapshot<T: DeserializeOwned>(&self) -> Result<T, SchemafigError> {
        let map = self.snapshot_value()?;
        let result =
            serde_json::from_value(Value::Object(map)).map_err(|source| SchemafigError::Serde {
                field: "<snapshot>".into(),
                source,
            });
        self.logged(result)
    }

    pub fn is_loaded(&self) -> bool {
        self.state().snapshot.is_some()
    }

    /// Replace `field`'s value and notify its listeners with `(new, old)`.
    ///
    /// The value is validated with the field's own validator. Listeners run on
    /// every successful set, even when the value did not change.
    pub fn set<T: Serialize>(&self, field: &str, value: &T) -> Result<(), SchemafigError> {
        let result = self.write_field(field, value);
        self.logged(result)
    }

    fn write_field<T: Serialize>(&self, field: &str, value: &T) -> Result<(), SchemafigError> {
        if !self.is_loaded() {
            return Err(SchemafigError::NotLoaded);
        }
        let def = self.field(field)?;
        let raw = serde_json::to_value(value).map_err(|source| SchemafigError::Serde {
            field: field.to_string(),
            source,
        })?;
        let validated = def
            .validate(Some(&raw))
            .map_err(|reason| ValidationFailure::single(field, reason))?;

        let notification = {
            let mut state = self.state();
            let listeners = state.listeners.for_field(field);
            let snapshot = state.snapshot.as_mut().ok_or(SchemafigError::NotLoaded)?;
            let old_value = match &validated {
                Some(v) => snapshot.insert(field.to_string(), v.clone()),
                None => snapshot.remove(field),
            };
            Notification {
                field: field.to_string(),
                new_value: validated.unwrap_or(Value::Null),
                old_value: old_value.unwrap_or(Value::Null),
                listeners,
            }
        };

        self.emit(LogEvent::Set, format!("set '{field}'"));
        self.notify(notification)
    }

    /// Register a change listener for `field`. Listeners run in registration
    /// order; registering the same callback twice runs it twice.
    pub fn add_listener<F>(&self, field: &str, listener: F) -> Result<(), SchemafigError>
    where
        F: Fn(&Value, &Value) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let result = self.field(field).map(|_| {
            let mut state = self.state();
            state.listeners.add(field, Arc::new(listener));
            state.listeners.count(field)
        });
        if let Ok(count) = &result {
            self.emit(
                LogEvent::ListenerRegistered,
                format!("listener registered for '{field}' ({count} total)"),
            );
        }
        self.logged(result).map(|_| ())
    }

    // -- Adapters -----------------------------------------------------------

    /// Assign an adapter explicitly. Auto-selection never replaces it.
    pub fn set_adapter(&self, adapter: impl Adapter + 'static) {
        let name = adapter.name().to_string();
        {
            let mut state = self.state();
            state.adapter = Some(Arc::new(adapter));
            state.adapter_explicit = true;
        }
        self.emit(LogEvent::AdapterAssigned, format!("assigned the {name} adapter"));
    }

    /// If no adapter is assigned yet, pick one from the stored source.
    pub fn select_adapter(&self) {
        let selected = {
            let mut state = self.state();
            if state.adapter.is_some() {
                return;
            }
            state.adapter = state.source.as_ref().and_then(adapter::select);
            state.adapter.as_ref().map(|adapter| adapter.name().to_string())
        };
        if let Some(name) = selected {
            self.emit(LogEvent::AdapterAssigned, format!("selected the {name} adapter"));
        }
    }

    /// Name of the current adapter, if any.
    pub fn adapter_name(&self) -> Option<String> {
        self.state()
            .adapter
            .as_ref()
            .map(|adapter| adapter.name().to_string())
    }

    /// The source the next reload will read.
    pub fn source(&self) -> Option<Source> {
        self.state().source.clone()
    }

    // -- Reload timer -------------------------------------------------------

    /// Start reloading periodically. No-op if a timer is already running,
    /// even if `interval` differs from the running one.
    ///
    /// Uses `interval`, else the builder's interval, else
    /// [`DEFAULT_RELOAD_INTERVAL`]. Must be called inside a tokio runtime.
    pub fn start_reload_interval(&self, interval: Option<Duration>) -> Result<(), SchemafigError> {
        let period = interval
            .or(self.inner.reload_interval)
            .unwrap_or(DEFAULT_RELOAD_INTERVAL);

        let started = {
            let mut state = self.state();
            if state.reload.is_some() {
                false
            } else {
                let token = CancellationToken::new();
                let weak = Arc::downgrade(&self.inner);
                reload::spawn(period, token.clone(), move || tick(weak.clone()))?;
                state.reload = Some(token);
                true
            }
        };

        if started {
            self.emit(
                LogEvent::ReloadStarted,
                format!("reloading every {}ms", period.as_millis()),
            );
        }
        Ok(())
    }

    /// Stop the reload timer. A tick already in progress finishes.
    pub fn stop_reload_interval(&self) {
        let token = self.state().reload.take();
        if let Some(token) = token {
            token.cancel();
            self.emit(LogEvent::ReloadStopped, "reload stopped");
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.state().reload.is_some()
    }
}

/// One timer tick. Failures have no caller: they are logged (by `reload`) and
/// passed to the `on_reload_error` hook. Returns `false` once the engine is gone.
async fn tick(engine: Weak<Inner>) -> bool {
    let Some(inner) = engine.upgrade() else {
        return false;
    };
    let engine = Schemafig { inner };
    if let Err(err) = engine.reload().await
        && let Some(hook) = &engine.inner.on_reload_error
    {
        hook(&err);
    }
    true
}
