use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ListenerError;

/// Change callback: receives `(new_value, old_value)`. An absent value is
/// passed as `Value::Null`.
pub type Listener = Arc<dyn Fn(&Value, &Value) -> Result<(), ListenerError> + Send + Sync>;

/// Per-field callbacks, called in registration order. No deduplication.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    by_field: HashMap<String, Vec<Listener>>,
}

impl ListenerRegistry {
    pub fn add(&mut self, field: &str, listener: Listener) {
        self.by_field
            .entry(field.to_string())
            .or_default()
            .push(listener);
    }

    /// Callbacks for `field`, cloned out so they can run without holding
    /// whatever lock guards the registry.
    pub fn for_field(&self, field: &str) -> Vec<Listener> {
        self.by_field.get(field).cloned().unwrap_or_default()
    }

    pub fn count(&self, field: &str) -> usize {
        self.by_field.get(field).map_or(0, Vec::len)
    }
}

/// Run `listeners` in order. The first error stops the rest and is returned.
pub fn dispatch(
    listeners: &[Listener],
    new_value: &Value,
    old_value: &Value,
) -> Result<(), ListenerError> {
    for listener in listeners {
        listener(new_value, old_value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Listener {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |new: &Value, old: &Value| -> Result<(), ListenerError> {
            log.lock().push(format!("{tag}:{new}:{old}"));
            Ok(())
        })
    }

    #[test]
    fn runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        registry.add("port", recorder(&log, "a"));
        registry.add("port", recorder(&log, "b"));
        dispatch(&registry.for_field("port"), &json!(2), &json!(1)).unwrap();
        assert_eq!(*log.lock(), vec!["a:2:1", "b:2:1"]);
    }

    #[test]
    fn same_listener_twice_runs_twice() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = recorder(&log, "x");
        let mut registry = ListenerRegistry::default();
        registry.add("port", Arc::clone(&listener));
        registry.add("port", listener);
        assert_eq!(registry.count("port"), 2);
        dispatch(&registry.for_field("port"), &json!(1), &Value::Null).unwrap();
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn unknown_field_has_no_listeners() {
        let registry = ListenerRegistry::default();
        assert!(registry.for_field("host").is_empty());
    }

    #[test]
    fn failing_listener_stops_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        registry.add("port", recorder(&log, "first"));
        registry.add(
            "port",
            Arc::new(|_: &Value, _: &Value| -> Result<(), ListenerError> { Err("boom".into()) }),
        );
        registry.add("port", recorder(&log, "never"));
        let err = dispatch(&registry.for_field("port"), &json!(2), &json!(1)).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(*log.lock(), vec!["first:2:1"]);
    }
}
