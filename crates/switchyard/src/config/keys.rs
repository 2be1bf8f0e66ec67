//! Configuration keys understood by the engine itself.

use crate::config::{ConfigKey, TextConfigKey};
use crate::error::BoxError;

/// Logs every handler call at `info` level when `true`.
///
/// Defaults to `false`. Addressed as `switchyard.trace-handlers` in
/// properties text, which accepts `true` or `false` in any case.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TraceHandlers;

impl ConfigKey for TraceHandlers {
    type Value = bool;

    fn default_value(&self) -> Option<Result<bool, BoxError>> {
        Some(Ok(false))
    }
}

impl TextConfigKey for TraceHandlers {
    const NAME: &'static str = "switchyard.trace-handlers";

    fn parse_value(text: &str) -> Result<bool, BoxError> {
        Ok(text.trim().to_ascii_lowercase().parse::<bool>()?)
    }
}
