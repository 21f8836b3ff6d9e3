//! Namespaced settings
//!
//! Settings are read from a TOML document with one table per namespace:
//!
//! ```toml
//! [ProphetRouter]
//! seconds_in_time_unit = 30
//! nrof_copies = 6
//! binary_mode = true
//! ```
//!
//! Accessors fail with [`ConfigError::MissingRequired`] when a required key
//! is absent, so routers never come up half-configured.

use std::path::Path;

use crate::error::ConfigError;

/// Namespaced key/value configuration
#[derive(Debug, Clone, Default)]
pub struct Settings {
    root: toml::Table,
}

impl Settings {
    /// Empty settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a TOML string
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let root: toml::Table = source.parse()?;
        Ok(Self { root })
    }

    /// Load settings from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Set a value, creating the namespace if needed
    pub fn set(&mut self, namespace: &str, key: &str, value: impl Into<toml::Value>) {
        let table = self
            .root
            .entry(namespace.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(table) = table {
            table.insert(key.to_string(), value.into());
        }
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, namespace: &str, key: &str, value: impl Into<toml::Value>) -> Self {
        self.set(namespace, key, value);
        self
    }

    fn lookup(&self, namespace: &str, key: &str) -> Option<&toml::Value> {
        self.root.get(namespace)?.as_table()?.get(key)
    }

    /// Whether `namespace.key` is present
    pub fn contains(&self, namespace: &str, key: &str) -> bool {
        self.lookup(namespace, key).is_some()
    }

    /// Required integer
    pub fn get_int(&self, namespace: &str, key: &str) -> Result<i64, ConfigError> {
        self.get_int_opt(namespace, key)?
            .ok_or_else(|| ConfigError::missing(namespace, key))
    }

    /// Optional integer
    pub fn get_int_opt(&self, namespace: &str, key: &str) -> Result<Option<i64>, ConfigError> {
        match self.lookup(namespace, key) {
            None => Ok(None),
            Some(toml::Value::Integer(v)) => Ok(Some(*v)),
            Some(other) => Err(ConfigError::invalid(
                namespace,
                key,
                format!("expected integer, got {}", other.type_str()),
            )),
        }
    }

    /// Required boolean
    pub fn get_bool(&self, namespace: &str, key: &str) -> Result<bool, ConfigError> {
        match self.lookup(namespace, key) {
            None => Err(ConfigError::missing(namespace, key)),
            Some(toml::Value::Boolean(v)) => Ok(*v),
            Some(other) => Err(ConfigError::invalid(
                namespace,
                key,
                format!("expected boolean, got {}", other.type_str()),
            )),
        }
    }

    /// Required float; integers are accepted
    pub fn get_float(&self, namespace: &str, key: &str) -> Result<f64, ConfigError> {
        match self.lookup(namespace, key) {
            None => Err(ConfigError::missing(namespace, key)),
            Some(toml::Value::Float(v)) => Ok(*v),
            Some(toml::Value::Integer(v)) => Ok(*v as f64),
            Some(other) => Err(ConfigError::invalid(
                namespace,
                key,
                format!("expected float, got {}", other.type_str()),
            )),
        }
    }

    /// Float with a default for absent keys
    pub fn get_float_or(&self, namespace: &str, key: &str, default: f64) -> Result<f64, ConfigError> {
        if self.contains(namespace, key) {
            self.get_float(namespace, key)
        } else {
            Ok(default)
        }
    }
}
