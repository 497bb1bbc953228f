//! Lifecycle logging.
//!
//! The engine reports each lifecycle step as a [`LogEvent`]. Every event has a
//! default [`Severity`], which can be changed per event (or set to
//! [`Severity::Silent`] to drop it). Lines go to a [`Logger`]: `tracing` by
//! default, or a custom callback.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogEvent {
    SchemaCompiled,
    EnvSchemaCompiled,
    AdapterAssigned,
    LoadSucceeded,
    ReloadSucceeded,
    Get,
    Set,
    ListenerRegistered,
    ListenerRun,
    ReloadStarted,
    ReloadStopped,
    Error,
}

impl LogEvent {
    pub fn default_severity(self) -> Severity {
        match self {
            LogEvent::SchemaCompiled
            | LogEvent::EnvSchemaCompiled
            | LogEvent::AdapterAssigned
            | LogEvent::Get
            | LogEvent::Set
            | LogEvent::ListenerRegistered
            | LogEvent::ListenerRun => Severity::Debug,
            LogEvent::LoadSucceeded
            | LogEvent::ReloadSucceeded
            | LogEvent::ReloadStarted
            | LogEvent::ReloadStopped => Severity::Info,
            LogEvent::Error => Severity::Error,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LogEvent::SchemaCompiled => "schema_compiled",
            LogEvent::EnvSchemaCompiled => "env_schema_compiled",
            LogEvent::AdapterAssigned => "adapter_assigned",
            LogEvent::LoadSucceeded => "load_succeeded",
            LogEvent::ReloadSucceeded => "reload_succeeded",
            LogEvent::Get => "get",
            LogEvent::Set => "set",
            LogEvent::ListenerRegistered => "listener_registered",
            LogEvent::ListenerRun => "listener_run",
            LogEvent::ReloadStarted => "reload_started",
            LogEvent::ReloadStopped => "reload_stopped",
            LogEvent::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    /// Drop the event.
    Silent,
}

type LogFn = dyn Fn(&str, Severity) + Send + Sync;

/// Where log lines go.
#[derive(Clone)]
pub enum Logger {
    /// Emit `tracing` events under the `schemafig` target.
    Tracing,
    Custom(Arc<LogFn>),
}

impl Logger {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, Severity) + Send + Sync + 'static,
    {
        Logger::Custom(Arc::new(f))
    }

    fn write(&self, event: LogEvent, severity: Severity, message: &str) {
        match self {
            Logger::Tracing => {
                let event = event.name();
                match severity {
                    Severity::Debug => tracing::debug!(target: "schemafig", event, "{message}"),
                    Severity::Info => tracing::info!(target: "schemafig", event, "{message}"),
                    Severity::Warn => tracing::warn!(target: "schemafig", event, "{message}"),
                    Severity::Error => tracing::error!(target: "schemafig", event, "{message}"),
                    Severity::Silent => {}
                }
            }
            Logger::Custom(f) => f(message, severity),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logger::Tracing => f.write_str("Tracing"),
            Logger::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A logger plus per-event severity overrides. `None` logger means off.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    logger: Option<Logger>,
    levels: HashMap<LogEvent, Severity>,
}

impl EventLog {
    pub fn new(logger: Option<Logger>, levels: HashMap<LogEvent, Severity>) -> Self {
        Self { logger, levels }
    }

    pub fn severity(&self, event: LogEvent) -> Severity {
        self.levels
            .get(&event)
            .copied()
            .unwrap_or_else(|| event.default_severity())
    }

    pub fn emit(&self, event: LogEvent, message: impl AsRef<str>) {
        let Some(logger) = &self.logger else {
            return;
        };
        let severity = self.severity(event);
        if severity == Severity::Silent {
            return;
        }
        logger.write(event, severity, message.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::capture_logger;

    #[test]
    fn default_tiers() {
        assert_eq!(LogEvent::Get.default_severity(), Severity::Debug);
        assert_eq!(LogEvent::LoadSucceeded.default_severity(), Severity::Info);
        assert_eq!(LogEvent::Error.default_severity(), Severity::Error);
    }

    #[test]
    fn custom_logger_gets_message_and_severity() {
        let (logger, lines) = capture_logger();
        let log = EventLog::new(Some(logger), HashMap::new());
        log.emit(LogEvent::LoadSucceeded, "loaded");
        assert_eq!(*lines.lock(), vec![("loaded".to_string(), Severity::Info)]);
    }

    #[test]
    fn override_changes_severity() {
        let (logger, lines) = capture_logger();
        let levels = HashMap::from([(LogEvent::Get, Severity::Warn)]);
        let log = EventLog::new(Some(logger), levels);
        log.emit(LogEvent::Get, "get port");
        assert_eq!(lines.lock()[0].1, Severity::Warn);
    }

    #[test]
    fn silent_drops_event() {
        let (logger, lines) = capture_logger();
        let levels = HashMap::from([(LogEvent::Set, Severity::Silent)]);
        let log = EventLog::new(Some(logger), levels);
        log.emit(LogEvent::Set, "set port");
        log.emit(LogEvent::Get, "get port");
        assert_eq!(lines.lock().len(), 1);
        assert_eq!(lines.lock()[0].0, "get port");
    }

    #[test]
    fn no_logger_is_a_no_op() {
        let log = EventLog::default();
        log.emit(LogEvent::Error, "ignored");
        assert_eq!(log.severity(LogEvent::Error), Severity::Error);
    }
}
