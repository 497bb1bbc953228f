#[cfg(test)]
pub mod test {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};

    use crate::log::{Logger, Severity};
    use crate::schema::{Field, Schema};

    /// `port` and `debug` are env-bound; `host` is required; `tags` is optional.
    pub fn server_schema() -> Schema {
        Schema::new()
            .field("port", Field::integer().coerce().env("APP_PORT"))
            .field("host", Field::string())
            .field(
                "debug",
                Field::boolean().coerce().default(false).env("APP_DEBUG"),
            )
            .field("tags", Field::array().optional())
    }

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct ServerConfig {
        pub port: u16,
        pub host: String,
        pub debug: bool,
        #[serde(default)]
        pub tags: Option<Vec<String>>,
    }

    pub fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// A custom logger that records every line it receives.
    pub fn capture_logger() -> (Logger, Arc<Mutex<Vec<(String, Severity)>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let logger = Logger::custom(move |msg: &str, severity: Severity| {
            sink.lock().push((msg.to_string(), severity));
        });
        (logger, lines)
    }

    #[test]
    fn server_schema_has_two_env_bindings() {
        let bound = server_schema()
            .iter()
            .filter(|(_, field)| field.env_name().is_some())
            .count();
        assert_eq!(bound, 2);
    }
}
