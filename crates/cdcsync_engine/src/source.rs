//! Entity sources: where current values come from.

use cdcsync_codec::Value;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Resolves an entity name to its current value.
///
/// Sources are read-only from the engine's point of view. An unknown or
/// undefined name resolves to `None`; resolution never fails.
pub trait EntitySource: Send + Sync {
    /// Returns the current value of `name`, or `None` if it is undefined.
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// A mutable in-memory source.
///
/// Useful for tests and for embedding applications that push their own
/// runtime settings into the engine.
#[derive(Debug, Default)]
pub struct MapSource {
    values: RwLock<HashMap<String, Value>>,
}

impl MapSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines or redefines `name`.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.write().insert(name.into(), value.into());
    }

    /// Undefines `name`. Returns the previous value.
    pub fn unset(&self, name: &str) -> Option<Value> {
        self.values.write().remove(name)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let source = MapSource::new();
        for (k, v) in iter {
            source.set(k, v);
        }
        source
    }
}

impl EntitySource for MapSource {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }
}

/// Reads entities from process environment variables.
///
/// The variable read for entity `NAME` is `{prefix}NAME`. With typed
/// parsing on, `true`/`false` and integers become the matching [`Value`]
/// variant; everything else, including version strings such as `8.1`,
/// stays a string.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    prefix: String,
    typed: bool,
}

impl EnvSource {
    /// Creates a source reading variables verbatim as strings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `{prefix}NAME` instead of `NAME`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Enables typed parsing of variable contents.
    #[must_use]
    pub fn typed(mut self, typed: bool) -> Self {
        self.typed = typed;
        self
    }

    fn parse(&self, raw: String) -> Value {
        if !self.typed {
            return Value::String(raw);
        }
        parse_typed(&raw).unwrap_or(Value::String(raw))
    }
}

/// Parses a scalar literal, or returns `None` if it is plain text.
pub(crate) fn parse_typed(raw: &str) -> Option<Value> {
    match raw {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    raw.parse::<i64>().ok().map(Value::Int)
}

impl EntitySource for EnvSource {
    fn resolve(&self, name: &str) -> Option<Value> {
        std::env::var(format!("{}{}", self.prefix, name))
            .ok()
            .map(|raw| self.parse(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_source_set_and_unset() {
        let source: MapSource = [("WP_DEBUG", Value::Bool(true))].into_iter().collect();
        assert_eq!(source.resolve("WP_DEBUG"), Some(Value::Bool(true)));
        assert_eq!(source.resolve("MISSING"), None);

        source.set("WP_DEBUG", false);
        assert_eq!(source.resolve("WP_DEBUG"), Some(Value::Bool(false)));

        assert_eq!(source.unset("WP_DEBUG"), Some(Value::Bool(false)));
        assert_eq!(source.resolve("WP_DEBUG"), None);
    }

    #[test]
    fn typed_parsing() {
        assert_eq!(parse_typed("true"), Some(Value::Bool(true)));
        assert_eq!(parse_typed("false"), Some(Value::Bool(false)));
        assert_eq!(parse_typed("42"), Some(Value::Int(42)));
        assert_eq!(parse_typed("-7"), Some(Value::Int(-7)));
        assert_eq!(parse_typed("8.1"), None);
        assert_eq!(parse_typed("True"), None);
        assert_eq!(parse_typed("256M"), None);
        assert_eq!(parse_typed("inf"), None);
        assert_eq!(parse_typed(""), None);
    }

    #[test]
    fn env_source_missing_variable_is_none() {
        let source = EnvSource::new().with_prefix("CDCSYNC_TEST_SURELY_UNSET_");
        assert_eq!(source.resolve("NOTHING"), None);
    }

    #[test]
    fn env_source_reads_path() {
        // PATH is set in every test environment we run in
        let source = EnvSource::new();
        assert!(matches!(source.resolve("PATH"), Some(Value::String(_))));
    }
}
