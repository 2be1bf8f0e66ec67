//! Line-oriented `key=value` configuration text.
//!
//! The `switchyard-properties` crate turns properties text into an ordered
//! [`Properties`] map of raw strings. It deliberately knows nothing about the
//! meaning of keys or the types of values: the `switchyard` engine resolves
//! each key to a declared configuration key and converts the value itself.
//!
//! # Format
//!
//! - Blank lines and lines whose first non-blank character is `#` or `!` are
//!   ignored.
//! - The key ends at the first unescaped `=`, `:` or blank. Blanks around the
//!   separator are skipped.
//! - A line ending in an odd number of backslashes continues on the next
//!   line; leading blanks of the continuation are dropped.
//! - `\t`, `\n`, `\r`, `\f` and `\uXXXX` are decoded. Any other escaped
//!   character stands for itself, so `\=`, `\:` and `\\` embed separators and
//!   backslashes.
//! - A later entry for the same key replaces the earlier value in place.
//!
//! # Example
//!
//! ```
//! use switchyard_properties::Properties;
//!
//! let props: Properties = "# engine settings\nswitchyard.trace-handlers = true\n"
//!     .parse()
//!     .expect("valid properties");
//! assert_eq!(props.get("switchyard.trace-handlers"), Some("true"));
//! ```

mod error;
mod parser;

use std::fs;
use std::str::FromStr;

use camino::Utf8Path;

pub use self::error::PropertiesError;

/// Insertion-ordered map of property keys to raw string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parses properties text.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::InvalidEscape`] when a `\u` escape is not
    /// followed by four hexadecimal digits naming a valid character.
    pub fn parse(text: &str) -> Result<Self, PropertiesError> {
        let mut properties = Self::new();
        for entry in parser::entries(text) {
            let (key, value) = entry?;
            properties.insert(key, value);
        }
        Ok(properties)
    }

    /// Reads and parses a properties file.
    ///
    /// # Errors
    ///
    /// Returns [`PropertiesError::Io`] when the file cannot be read, or any
    /// error produced by [`Properties::parse`].
    pub fn load(path: &Utf8Path) -> Result<Self, PropertiesError> {
        let text = fs::read_to_string(path).map_err(|source| PropertiesError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Returns the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    /// Stores `value` under `key`, returning the value it replaced.
    ///
    /// A replaced entry keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let owned_key = key.into();
        let owned_value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(candidate, _)| *candidate == owned_key)
        {
            Some((_, slot)) => Some(std::mem::replace(slot, owned_value)),
            None => {
                self.entries.push((owned_key, owned_value));
                None
            }
        }
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the map holds no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for Properties {
    type Err = PropertiesError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Self::new();
        properties.extend(iter);
        properties
    }
}

impl<K, V> Extend<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
