//! Typed configuration registry with default-value fallback.
//!
//! Every configuration key is its own type implementing [`ConfigKey`]; the
//! key type's identity is what values are stored under, and its associated
//! `Value` type fixes what can be stored. Keys may compute a default that is
//! returned whenever no value has been set.
//!
//! Keys that should also be settable from `key=value` text implement
//! [`TextConfigKey`] and are declared with [`ConfigRegistry::declare`]. Keys
//! without a text form can only be set programmatically.

mod keys;

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use switchyard_properties::Properties;
use tracing::debug;

use crate::error::{BoxError, ConfigError};
use crate::sync::{read, write};

pub use self::keys::TraceHandlers;

/// Tracing target for configuration operations.
pub(crate) const CONFIG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::config");

/// A typed configuration key.
///
/// # Example
///
/// ```
/// use switchyard::{BoxError, ConfigKey, ConfigRegistry};
///
/// struct Greeting;
///
/// impl ConfigKey for Greeting {
///     type Value = String;
///
///     fn default_value(&self) -> Option<Result<String, BoxError>> {
///         Some(Ok(String::from("hello")))
///     }
/// }
///
/// let registry = ConfigRegistry::new();
/// assert_eq!(registry.get(&Greeting).unwrap(), "hello");
/// registry.set::<Greeting>(String::from("hi"));
/// assert_eq!(registry.get(&Greeting).unwrap(), "hi");
/// ```
pub trait ConfigKey: Send + Sync + 'static {
    /// Type of the value stored under this key.
    type Value: Clone + Send + Sync + 'static;

    /// Returns the default value, when the key declares one.
    ///
    /// `None` means the key has no default. `Some(Err(_))` reports that the
    /// default exists but could not be computed.
    fn default_value(&self) -> Option<Result<Self::Value, BoxError>> {
        None
    }
}

/// A configuration key that can be set from `key=value` text.
pub trait TextConfigKey: ConfigKey + Default {
    /// Name the key is addressed by in properties text.
    const NAME: &'static str;

    /// Converts raw properties text into the key's value.
    ///
    /// # Errors
    ///
    /// Returns an error when `text` is not a valid value for this key.
    fn parse_value(text: &str) -> Result<Self::Value, BoxError>;
}

/// Parses trimmed `text` with the value type's [`FromStr`] implementation.
///
/// Convenience for [`TextConfigKey::parse_value`] implementations.
///
/// # Errors
///
/// Returns the [`FromStr`] error, boxed.
pub fn parse_text<T>(text: &str) -> Result<T, BoxError>
where
    T: FromStr,
    T::Err: Into<BoxError>,
{
    text.trim().parse::<T>().map_err(Into::into)
}

type StoredValue = Box<dyn Any + Send + Sync>;
type ValueParser = fn(&str) -> Result<(TypeId, StoredValue), BoxError>;

fn parse_erased<K: TextConfigKey>(text: &str) -> Result<(TypeId, StoredValue), BoxError> {
    let value = K::parse_value(text)?;
    Ok((TypeId::of::<K>(), Box::new(value)))
}

/// Heterogeneous map from key type to value.
///
/// # Thread Safety
///
/// Reads and writes may run concurrently; each operation observes either the
/// state before or after any concurrent write.
#[derive(Default)]
pub struct ConfigRegistry {
    values: RwLock<HashMap<TypeId, StoredValue>>,
    parsers: RwLock<HashMap<&'static str, ValueParser>>,
}

impl ConfigRegistry {
    /// Creates an empty registry with no declared text keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `K`, replacing any earlier value.
    pub fn set<K: ConfigKey>(&self, value: K::Value) {
        write(&self.values).insert(TypeId::of::<K>(), Box::new(value));
        debug!(target: CONFIG_TARGET, key = type_name::<K>(), "config value set");
    }

    /// Returns the stored value for `key`, falling back to its default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingValue`] when nothing is stored and the
    /// key has no default, or [`ConfigError::DefaultValue`] when the default
    /// could not be computed.
    pub fn get<K: ConfigKey>(&self, key: &K) -> Result<K::Value, ConfigError> {
        self.get_or_default(key).unwrap_or_else(|| {
            Err(ConfigError::MissingValue {
                key: type_name::<K>(),
            })
        })
    }

    /// Returns the value for `key` read as a boolean.
    ///
    /// A missing value with no declared default reads as `false`, as does a
    /// `None` stored in an optional key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefaultValue`] when the key declares a default
    /// that could not be computed.
    pub fn is_true<K>(&self, key: &K) -> Result<bool, ConfigError>
    where
        K: ConfigKey,
        K::Value: Into<Option<bool>>,
    {
        self.get_or_default(key)
            .map_or(Ok(false), |result| Ok(result?.into().unwrap_or(false)))
    }

    /// Returns `true` when a value is stored for `K`, ignoring defaults.
    #[must_use]
    pub fn contains<K: ConfigKey>(&self) -> bool {
        read(&self.values).contains_key(&TypeId::of::<K>())
    }

    /// Makes `K` addressable by [`TextConfigKey::NAME`] in properties text.
    pub fn declare<K: TextConfigKey>(&self) {
        write(&self.parsers).insert(K::NAME, parse_erased::<K>);
        debug!(target: CONFIG_TARGET, key = K::NAME, "config key declared");
    }

    /// Returns `true` when `name` refers to a declared text key.
    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        read(&self.parsers).contains_key(name)
    }

    /// Applies every entry of `properties`.
    ///
    /// All entries are converted before any is stored, so a failing batch
    /// leaves the registry unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] when an entry names an undeclared
    /// key, or [`ConfigError::InvalidValue`] when a value does not convert.
    pub fn set_values(&self, properties: &Properties) -> Result<(), ConfigError> {
        let parsed = {
            let parsers = read(&self.parsers);
            properties
                .iter()
                .map(|(name, value)| {
                    let parser = parsers.get(name).ok_or_else(|| ConfigError::UnknownKey {
                        name: name.to_owned(),
                    })?;
                    parser(value).map_err(|source| ConfigError::InvalidValue {
                        name: name.to_owned(),
                        value: value.to_owned(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let count = parsed.len();
        write(&self.values).extend(parsed);
        debug!(target: CONFIG_TARGET, count, "config values applied");
        Ok(())
    }

    /// Parses `text` as properties and applies it with
    /// [`set_values`](Self::set_values).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Properties`] when the text is malformed, or any
    /// error [`set_values`](Self::set_values) reports.
    pub fn set_text(&self, text: &str) -> Result<(), ConfigError> {
        let properties = Properties::parse(text)?;
        self.set_values(&properties)
    }

    fn get_or_default<K: ConfigKey>(&self, key: &K) -> Option<Result<K::Value, ConfigError>> {
        let stored = read(&self.values)
            .get(&TypeId::of::<K>())
            .and_then(|value| value.downcast_ref::<K::Value>())
            .cloned();
        stored.map(Ok).or_else(|| {
            key.default_value().map(|result| {
                result.map_err(|source| ConfigError::DefaultValue {
                    key: type_name::<K>(),
                    source,
                })
            })
        })
    }
}

impl fmt::Debug for ConfigRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut declared: Vec<&'static str> = read(&self.parsers).keys().copied().collect();
        declared.sort_unstable();
        f.debug_struct("ConfigRegistry")
            .field("values", &read(&self.values).len())
            .field("declared", &declared)
            .finish()
    }
}
