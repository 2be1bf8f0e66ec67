//! Domain errors raised by registration, configuration, and dispatch.
//!
//! Registration and configuration failures use `thiserror`-derived enums
//! with structured context so callers can match on them programmatically.
//! Failures raised from inside handler, interceptor, and filter bodies are
//! carried by [`Fault`], which keeps the distinction between caller-defined
//! (checked) errors and unexpected (unchecked) ones that the two dispatch
//! entry points treat differently.

use std::error::Error as StdError;
use std::fmt;

use switchyard_properties::PropertiesError;
use thiserror::Error;

use crate::component::{ComponentInfo, Role};

/// Boxed error type used for caller-supplied failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while deploying handlers, interceptors, and filters.
///
/// Registration is fail-fast: the failing call leaves every registration
/// that succeeded before it in place.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A package or type identifier was required but blank.
    #[error("a package or type identifier is required, got an empty one")]
    EmptyType,

    /// A component requiring an action mapping did not declare one.
    #[error("{role} '{type_name}' does not declare the action it handles")]
    NoMapping {
        /// Type name of the component.
        type_name: &'static str,
        /// Role the component was registered for.
        role: Role,
    },

    /// A second handler was offered for an action that already has one.
    #[error("action '{action}' is already handled by '{existing}', rejecting '{rejected}'")]
    NotOneHandler {
        /// Action type name.
        action: &'static str,
        /// Handler already deployed for the action.
        existing: &'static str,
        /// Handler that was refused.
        rejected: &'static str,
    },

    /// A component required a context object that was never registered.
    #[error("{component} requires context object '{dependency}', but none is registered")]
    MissingContextObject {
        /// Component being deployed.
        component: ComponentInfo,
        /// Type name of the missing dependency.
        dependency: &'static str,
    },

    /// An initializer rejected a freshly constructed component.
    #[error("initializer failed for {component}: {source}")]
    Initializer {
        /// Component being deployed.
        component: ComponentInfo,
        /// Failure reported by the initializer.
        #[source]
        source: BoxError,
    },

    /// A component could not read configuration while being constructed.
    #[error("configuration unavailable while deploying: {0}")]
    Config(#[from] ConfigError),

    /// The class scanner failed to enumerate a package.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Errors raised by the configuration registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The key holds no value and declares no default.
    #[error("config key '{key}' has no value and declares no default")]
    MissingValue {
        /// Type name of the key.
        key: &'static str,
    },

    /// The key's default value could not be produced.
    #[error("default value for config key '{key}' could not be computed: {source}")]
    DefaultValue {
        /// Type name of the key.
        key: &'static str,
        /// Failure reported by the key.
        #[source]
        source: BoxError,
    },

    /// A properties entry named a key that was never declared.
    #[error("'{name}' does not name a declared config key")]
    UnknownKey {
        /// Name found in the properties input.
        name: String,
    },

    /// A properties value could not be converted to the key's value type.
    #[error("invalid value '{value}' for config key '{name}': {source}")]
    InvalidValue {
        /// Name of the key.
        name: String,
        /// Raw text that failed to convert.
        value: String,
        /// Conversion failure.
        #[source]
        source: BoxError,
    },

    /// Properties text could not be read or parsed.
    #[error(transparent)]
    Properties(#[from] PropertiesError),
}

/// Errors raised by a [`ClassScanner`](crate::scan::ClassScanner).
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scanner could not enumerate the package.
    #[error("scanning package '{package}' failed: {source}")]
    Failed {
        /// Package that was scanned.
        package: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },
}

/// Dispatch-time resolution failures.
///
/// These are never wrapped: both [`Engine::invoke`](crate::Engine::invoke)
/// and [`Engine::invoke_unwrap`](crate::Engine::invoke_unwrap) surface them
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// No handler is deployed for the action's type.
    #[error("no handler is deployed for action '{action}'")]
    NoHandler {
        /// Action type name.
        action: &'static str,
    },

    /// An interceptor advanced the chain after the handler had already run.
    #[error("invocation chain for action '{action}' was advanced after its handler ran")]
    ChainExhausted {
        /// Action type name.
        action: &'static str,
    },

    /// A filter advanced the pipeline after dispatch had already completed.
    #[error("filter pipeline for action '{action}' was advanced after dispatch completed")]
    FilterChainExhausted {
        /// Action type name.
        action: &'static str,
    },

    /// A filter handed the pipeline a different action than it received.
    #[error("filter passed action '{found}' while '{expected}' was being dispatched")]
    ActionMismatch {
        /// Action type being dispatched.
        expected: &'static str,
        /// Action type the filter passed on.
        found: &'static str,
    },
}

/// Checked failure surfaced by [`Engine::invoke`](crate::Engine::invoke).
///
/// Wraps the original caller-defined error so `invoke` callers handle a
/// single error shape; [`Engine::invoke_unwrap`](crate::Engine::invoke_unwrap)
/// returns the cause unwrapped instead.
#[derive(Debug, Error)]
#[error("component raised a checked error: {cause}")]
pub struct ExceptionWrapper {
    #[source]
    cause: BoxError,
}

impl ExceptionWrapper {
    /// Wraps `cause`.
    #[must_use]
    pub fn new(cause: BoxError) -> Self {
        Self { cause }
    }

    /// Returns the wrapped error.
    #[must_use]
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Returns the wrapped error as `E`, when it is one.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause.downcast_ref::<E>()
    }

    /// Consumes the wrapper, returning the original error.
    #[must_use]
    pub fn into_cause(self) -> BoxError {
        self.cause
    }
}

/// Failure raised from a handler, interceptor, or filter body.
///
/// `?` on any [`std::error::Error`] produces [`Fault::Checked`]; use
/// [`Fault::unchecked`] for failures that must reach the caller untouched.
/// Panics are never caught and behave like unchecked failures.
///
/// `Fault` does not implement [`std::error::Error`] itself, which is what
/// allows the blanket conversion. Use [`Fault::into_error`] (or `?` into a
/// [`BoxError`]) to hand it to generic error plumbing.
#[derive(Debug)]
pub enum Fault {
    /// A caller-defined error: wrapped by `invoke`, passed through by
    /// `invoke_unwrap`.
    Checked(BoxError),
    /// An unexpected failure: passed through by both entry points.
    Unchecked(BoxError),
    /// A resolution failure from a nested dispatch.
    Invocation(InvocationError),
}

impl Fault {
    /// Creates a checked fault.
    pub fn checked(error: impl Into<BoxError>) -> Self {
        Self::Checked(error.into())
    }

    /// Creates an unchecked fault.
    pub fn unchecked(error: impl Into<BoxError>) -> Self {
        Self::Unchecked(error.into())
    }

    /// Returns `true` for [`Fault::Checked`].
    #[must_use]
    pub const fn is_checked(&self) -> bool {
        matches!(self, Self::Checked(_))
    }

    /// Returns `true` for [`Fault::Unchecked`].
    #[must_use]
    pub const fn is_unchecked(&self) -> bool {
        matches!(self, Self::Unchecked(_))
    }

    /// Returns the carried error as `E`, when it is one.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Checked(error) | Self::Unchecked(error) => error.downcast_ref::<E>(),
            Self::Invocation(error) => (error as &(dyn StdError + 'static)).downcast_ref::<E>(),
        }
    }

    /// Converts the fault into a boxed error, discarding the tag.
    #[must_use]
    pub fn into_error(self) -> BoxError {
        match self {
            Self::Checked(error) | Self::Unchecked(error) => error,
            Self::Invocation(error) => Box::new(error),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checked(error) => write!(f, "checked: {error}"),
            Self::Unchecked(error) => write!(f, "unchecked: {error}"),
            Self::Invocation(error) => write!(f, "invocation: {error}"),
        }
    }
}

impl<E> From<E> for Fault
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::Checked(Box::new(error))
    }
}

impl From<Fault> for BoxError {
    fn from(fault: Fault) -> Self {
        fault.into_error()
    }
}

/// Error returned by [`Engine::invoke`](crate::Engine::invoke).
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The action could not be routed.
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// A component raised a checked error.
    #[error(transparent)]
    Wrapped(#[from] ExceptionWrapper),

    /// A component raised an unchecked error.
    #[error("{0}")]
    Unchecked(#[source] BoxError),
}

impl From<Fault> for InvokeError {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::Checked(cause) => Self::Wrapped(ExceptionWrapper::new(cause)),
            Fault::Unchecked(error) => match error.downcast::<ExceptionWrapper>() {
                Ok(wrapper) => Self::Wrapped(*wrapper),
                Err(other) => Self::Unchecked(other),
            },
            Fault::Invocation(error) => Self::Invocation(error),
        }
    }
}
