//! Ordered SVG optimizer plugin configuration.
//!
//! Plugins are an ordered list of `name = value` entries. A value of `false`
//! (or `null`) disables the plugin; anything else is its option.
//!
//! # Merge rule
//!
//! Start from the defaults, apply overrides by key. A key that already exists
//! keeps its position and takes the override's value; new keys are appended.
//!
//! ```toml
//! [svgo]
//! floatPrecision = 2
//! removeDimensions = true
//! ```

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Ordered plugin sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginConfig {
    entries: Vec<(String, Value)>,
}

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in plugin sequence used when no override is given.
    pub fn defaults() -> Self {
        [
            ("dpi", json!(96)),
            ("preserveText", json!(true)),
            ("floatPrecision", json!(4)),
            ("transformPrecision", json!(6)),
            ("indent", json!(false)),
            ("singleQuote", json!(false)),
            ("prefixIds", json!(false)),
            ("expandViewBox", json!(false)),
            ("removeDimensions", json!(false)),
        ]
        .into_iter()
        .collect()
    }

    /// Set a plugin, keeping its position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Apply `overrides` on top of `self` (see the module docs for the rule).
    pub fn merged(&self, overrides: &PluginConfig) -> PluginConfig {
        let mut merged = self.clone();
        for (name, value) in &overrides.entries {
            merged.set(name.clone(), value.clone());
        }
        merged
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Whether `name` is present with a value other than `false`/`null`.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(is_enabled_value)
    }

    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Plugin names in order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }
}

/// `false` and `null` switch a plugin off.
pub fn is_enabled_value(value: &Value) -> bool {
    !matches!(value, Value::Bool(false) | Value::Null)
}

impl<K: Into<String>> FromIterator<(K, Value)> for PluginConfig {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (name, value) in iter {
            config.set(name, value);
        }
        config
    }
}

impl<'de> Deserialize<'de> for PluginConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}

impl Serialize for PluginConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
