//! Component discovery by package.
//!
//! [`Engine::scan_and_put`](crate::Engine::scan_and_put) asks a
//! [`ClassScanner`] for the components declared under a package and deploys
//! each one. The scanner in use is the value of [`ClassScannerKey`], so
//! applications can swap in their own discovery. The default is an empty
//! [`Catalog`].

use std::sync::Arc;

use crate::component::Role;
use crate::config::ConfigKey;
use crate::deploy::{FilterType, HandlerType, InterceptorType};
use crate::engine::Engine;
use crate::error::{BoxError, DeployError, ScanError};

/// Tracing target for scanning operations.
pub(crate) const SCAN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scan");

/// Package path separator.
const SEPARATOR: &str = "::";

/// Source of deployable components, by package.
pub trait ClassScanner: Send + Sync {
    /// Returns the components declared under `package`, including nested
    /// packages.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Failed`] when the package cannot be enumerated.
    fn scan(&self, package: &str) -> Result<Vec<Candidate>, ScanError>;
}

/// A component found by a [`ClassScanner`].
///
/// Filters apply to every action and carry no mapping, so only handlers and
/// interceptors can be found unmapped.
#[derive(Debug, Clone, Copy)]
pub enum Candidate {
    /// A handler type.
    Handler(HandlerType),
    /// An interceptor type.
    Interceptor(InterceptorType),
    /// A filter type.
    Filter(FilterType),
    /// A type marked as a handler that declares no action mapping.
    UnmappedHandler(&'static str),
    /// A type marked as an interceptor that declares no action mapping.
    UnmappedInterceptor(&'static str),
}

impl Candidate {
    /// Returns the candidate's type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Handler(handler) => handler.type_name(),
            Self::Interceptor(interceptor) => interceptor.type_name(),
            Self::Filter(filter) => filter.type_name(),
            Self::UnmappedHandler(type_name) | Self::UnmappedInterceptor(type_name) => *type_name,
        }
    }

    /// Returns the role the candidate is deployed in.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Handler(_) | Self::UnmappedHandler(_) => Role::Handler,
            Self::Interceptor(_) | Self::UnmappedInterceptor(_) => Role::Interceptor,
            Self::Filter(_) => Role::Filter,
        }
    }

    pub(crate) fn register(self, engine: &Engine) -> Result<(), DeployError> {
        match self {
            Self::Handler(handler) => handler.register(engine),
            Self::Interceptor(interceptor) => interceptor.register(engine),
            Self::Filter(filter) => filter.register(engine),
            Self::UnmappedHandler(_) | Self::UnmappedInterceptor(_) => {
                Err(DeployError::NoMapping {
                    type_name: self.type_name(),
                    role: self.role(),
                })
            }
        }
    }
}

/// In-memory index of components by package.
///
/// # Example
///
/// ```
/// use switchyard::{Candidate, Catalog, ClassScanner, Role};
///
/// let catalog = Catalog::new()
///     .with("shop::orders", Candidate::UnmappedHandler("shop::orders::Ledger"))
///     .with("shop::billing", Candidate::UnmappedInterceptor("shop::billing::Audit"));
///
/// assert_eq!(catalog.scan("shop")?.len(), 2);
/// let orders = catalog.scan("shop::orders")?;
/// assert_eq!(orders.first().map(Candidate::role), Some(Role::Handler));
/// assert!(catalog.scan("shopfront")?.is_empty());
/// # Ok::<(), switchyard::ScanError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<(String, Candidate)>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds `candidate` under `package`, returning the catalog.
    #[must_use]
    pub fn with(mut self, package: impl Into<String>, candidate: Candidate) -> Self {
        self.add(package, candidate);
        self
    }

    /// Adds `candidate` under `package`.
    pub fn add(&mut self, package: impl Into<String>, candidate: Candidate) {
        self.entries.push((package.into(), candidate));
    }

    /// Returns the number of catalogued components.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is catalogued.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ClassScanner for Catalog {
    fn scan(&self, package: &str) -> Result<Vec<Candidate>, ScanError> {
        Ok(self
            .entries
            .iter()
            .filter(|(declared, _)| is_within(declared, package))
            .map(|(_, candidate)| *candidate)
            .collect())
    }
}

/// Returns `true` when `declared` is `package` or nested inside it.
fn is_within(declared: &str, package: &str) -> bool {
    declared
        .strip_prefix(package)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(SEPARATOR))
}

/// Returns the package a type name is declared in, ignoring generic
/// arguments.
pub(crate) fn package_of(type_name: &str) -> Option<&str> {
    let path = type_name
        .split_once('<')
        .map_or(type_name, |(path, _)| path);
    path.rsplit_once(SEPARATOR)
        .map(|(package, _)| package)
        .filter(|package| !package.is_empty())
}

/// Config key selecting the [`ClassScanner`] used by
/// [`Engine::scan_and_put`](crate::Engine::scan_and_put).
///
/// Defaults to an empty [`Catalog`]. Only settable programmatically.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassScannerKey;

impl ConfigKey for ClassScannerKey {
    type Value = Arc<dyn ClassScanner>;

    fn default_value(&self) -> Option<Result<Self::Value, BoxError>> {
        Some(Ok(Arc::new(Catalog::new())))
    }
}
