//! Property source consumed by the placeholder resolver, and a loader that
//! builds one from files, environment variables and overrides.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, Source, Value, ValueKind};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

pub const ENV_PREFIX: &str = "FLOWMARK";

/// name -> value mapping used to resolve `${name}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySource {
    values: HashMap<String, String>,
}

impl PropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertySource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut source = Self::new();
        source.extend(iter);
        source
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for PropertySource {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl From<HashMap<String, String>> for PropertySource {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

/// Layers property files, environment variables and explicit overrides.
/// Later layers win.
#[derive(Debug, Clone)]
pub struct PropertyLoader {
    builder: ConfigBuilder<DefaultState>,
}

impl PropertyLoader {
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Any format the `config` crate recognizes from the extension
    /// (toml, yaml, json, ini, ...). `.properties` files are read as INI.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source = match path.extension().and_then(|ext| ext.to_str()) {
            Some("properties") => File::from(path).format(FileFormat::Ini),
            _ => File::from(path),
        };
        self.builder = self.builder.add_source(source.required(true));
        self
    }

    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// `FLOWMARK_DB__HOST=x` becomes `db.host = x`.
    pub fn with_environment(mut self) -> Self {
        self.builder = self
            .builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));
        self
    }

    pub fn with_override(mut self, key: &str, value: &str) -> Result<Self, ConfigError> {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<PropertySource, ConfigError> {
        let config = self.builder.build()?;
        let mut source = PropertySource::new();
        for (key, value) in config.collect()? {
            flatten(&key, value, &mut source);
        }
        debug!(count = source.len(), "Loaded property source");
        Ok(source)
    }
}

impl Default for PropertyLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Nested tables become dotted names; arrays and nils carry no single value
/// and are skipped.
fn flatten(prefix: &str, value: Value, out: &mut PropertySource) {
    match value.kind {
        ValueKind::Table(table) => {
            for (key, nested) in table {
                flatten(&format!("{}.{}", prefix, key), nested, out);
            }
        }
        ValueKind::Array(_) | ValueKind::Nil => {
            debug!(key = prefix, "Skipping non-scalar property");
        }
        ValueKind::String(s) => {
            out.insert(prefix, s);
        }
        ValueKind::Boolean(b) => {
            out.insert(prefix, b.to_string());
        }
        ValueKind::I64(n) => {
            out.insert(prefix, n.to_string());
        }
        ValueKind::I128(n) => {
            out.insert(prefix, n.to_string());
        }
        ValueKind::U64(n) => {
            out.insert(prefix, n.to_string());
        }
        ValueKind::U128(n) => {
            out.insert(prefix, n.to_string());
        }
        ValueKind::Float(n) => {
            out.insert(prefix, n.to_string());
        }
    }
}
