//! The dispatch engine façade.
//!
//! [`Engine`] owns the context, configuration, and deployment registries and
//! routes actions to their handlers. A top-level dispatch runs the global
//! filters, then the action's interceptors in ascending order, then its
//! handler. Handlers and interceptors dispatch further actions through the
//! [`Invocation`] handle they receive; such nested dispatches run the
//! interceptors and handler of the nested action but never the filters.

use std::any::{Any, type_name};
use std::fmt;
use std::ptr;
use std::sync::Arc;

use switchyard_properties::Properties;
use tracing::{debug, debug_span, warn};

use crate::action::{Action, DynAction};
use crate::chain::{FilterChain, Terminal};
use crate::component::{
    ComponentInfo, Deploy, Filter, Handler, Interceptor, InvocationObjectInitializer, Role,
};
use crate::config::{ConfigKey, ConfigRegistry, TextConfigKey, TraceHandlers};
use crate::context::{ContextObject, ContextRegistry};
use crate::deploy::{DeploymentRegistry, FilterType, HandlerType, InterceptorType, Route};
use crate::error::{
    ConfigError, DeployError, ExceptionWrapper, Fault, InvocationError, InvokeError,
};
use crate::scan::{ClassScannerKey, SCAN_TARGET, package_of};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// In-process action dispatcher.
///
/// Registration and dispatch both take `&self`; an engine can be shared
/// between threads behind an [`Arc`] and registered against while it serves
/// traffic. A dispatch keeps using the components it resolved when it
/// started.
///
/// # Example
///
/// ```
/// use switchyard::{Deploy, DeployContext, DeployError, Engine, Fault, Handler, Invocation, action};
///
/// action! {
///     /// Doubles a number.
///     pub struct Double(u32) -> u32;
/// }
///
/// struct Doubler;
///
/// impl Deploy for Doubler {
///     fn deploy(_: &DeployContext<'_>) -> Result<Self, DeployError> {
///         Ok(Self)
///     }
/// }
///
/// impl Handler for Doubler {
///     type Action = Double;
///
///     fn invoke(&self, action: &mut Double, _: &Invocation<'_>) -> Result<(), Fault> {
///         action.output = Some(action.input * 2);
///         Ok(())
///     }
/// }
///
/// let engine = Engine::new();
/// engine.put_handler::<Doubler>()?;
/// assert_eq!(engine.invoke(&mut Double::new(21))?, Some(42));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Engine {
    name: Option<String>,
    config: ConfigRegistry,
    context: ContextRegistry,
    deployments: DeploymentRegistry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an unnamed engine with no components deployed.
    #[must_use]
    pub fn new() -> Self {
        let config = ConfigRegistry::new();
        config.declare::<TraceHandlers>();
        Self {
            name: None,
            config,
            context: ContextRegistry::new(),
            deployments: DeploymentRegistry::default(),
        }
    }

    /// Creates an engine whose dispatch events carry `name`.
    #[must_use]
    pub fn with_name(name: impl Into<String>) -> Self {
        let mut engine = Self::new();
        engine.set_name(name);
        engine
    }

    /// Returns the engine's name, when it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Names the engine.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Dispatches `action`, wrapping checked faults.
    ///
    /// Returns the action's output after the handler and every interceptor
    /// and filter have finished with it.
    ///
    /// Every call is a top-level dispatch, even one made by a component
    /// holding this engine. Only dispatches made through the component's
    /// [`Invocation`] count as nested and skip the filters.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Invocation`] when the action cannot be routed,
    /// [`InvokeError::Wrapped`] when a component raised a checked fault, and
    /// [`InvokeError::Unchecked`] for unchecked faults.
    pub fn invoke<A: Action>(&self, action: &mut A) -> Result<Option<A::Output>, InvokeError> {
        self.invoke_unwrap(action).map_err(InvokeError::from)
    }

    /// Dispatches `action`, returning faults exactly as components raised
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Invocation`] when the action cannot be routed, or the
    /// [`Fault`] a component raised.
    pub fn invoke_unwrap<A: Action>(&self, action: &mut A) -> Result<Option<A::Output>, Fault> {
        self.dispatch(action, Invocation::root(self), true)
    }

    fn dispatch<A: Action>(
        &self,
        action: &mut A,
        invocation: Invocation<'_>,
        top_level: bool,
    ) -> Result<Option<A::Output>, Fault> {
        let route = self
            .deployments
            .resolve::<A>()
            .map_err(Fault::Invocation)?;
        let span = debug_span!(
            target: DISPATCH_TARGET,
            "dispatch",
            engine = self.name().unwrap_or_default(),
            action = type_name::<A>(),
            depth = invocation.depth(),
        );
        let _entered = span.enter();

        let filters = self.deployments.filters();
        if top_level && !filters.is_empty() {
            let dispatched = ptr::from_ref::<A>(action).cast::<()>();
            let terminal: Terminal<'_> = Box::new(move |dynamic: &mut dyn DynAction| {
                let found = dynamic.action_name();
                let same = ptr::addr_eq(ptr::from_ref(dynamic.as_any()), dispatched);
                let typed = dynamic
                    .downcast_mut::<A>()
                    .filter(|_| same)
                    .ok_or(Fault::Invocation(InvocationError::ActionMismatch {
                        expected: type_name::<A>(),
                        found,
                    }))?;
                run_chain(&route, invocation, typed)
            });
            FilterChain::new(&filters, type_name::<A>(), terminal).do_next(action)?;
        } else {
            run_chain(&route, invocation, action)?;
        }

        debug!(target: DISPATCH_TARGET, "dispatch completed");
        Ok(action.output().cloned())
    }

    // -----------------------------------------------------------------------
    // Deployment
    // -----------------------------------------------------------------------

    /// Constructs handler `H` through [`Deploy`] and deploys it.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::NotOneHandler`] when the action already has a
    /// handler, or the error raised while constructing or initializing `H`.
    pub fn put_handler<H: Handler + Deploy>(&self) -> Result<(), DeployError> {
        self.deployments
            .ensure_no_handler::<H::Action>(type_name::<H>())?;
        let handler = self
            .deployments
            .construct::<H>(Role::Handler, &self.context, &self.config)?;
        self.deployments.insert_handler(handler)
    }

    /// Deploys an already constructed handler.
    ///
    /// Initializers still run on it.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::NotOneHandler`] when the action already has a
    /// handler, or [`DeployError::Initializer`] when an initializer rejects
    /// it.
    pub fn put_handler_instance<H: Handler>(&self, handler: H) -> Result<(), DeployError> {
        self.deployments
            .ensure_no_handler::<H::Action>(type_name::<H>())?;
        let initialized = self
            .deployments
            .initialize(handler, ComponentInfo::of::<H>(Role::Handler))?;
        self.deployments.insert_handler(initialized)
    }

    /// Constructs interceptor `I` through [`Deploy`] and deploys it.
    ///
    /// # Errors
    ///
    /// Returns the error raised while constructing or initializing `I`.
    pub fn put_interceptor<I: Interceptor + Deploy>(&self) -> Result<(), DeployError> {
        let interceptor =
            self.deployments
                .construct::<I>(Role::Interceptor, &self.context, &self.config)?;
        self.deployments.insert_interceptor(interceptor)
    }

    /// Deploys an already constructed interceptor.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Initializer`] when an initializer rejects it.
    pub fn put_interceptor_instance<I: Interceptor>(&self, interceptor: I) -> Result<(), DeployError> {
        let initialized = self
            .deployments
            .initialize(interceptor, ComponentInfo::of::<I>(Role::Interceptor))?;
        self.deployments.insert_interceptor(initialized)
    }

    /// Constructs filter `F` through [`Deploy`] and deploys it.
    ///
    /// # Errors
    ///
    /// Returns the error raised while constructing or initializing `F`.
    pub fn put_filter<F: Filter + Deploy>(&self) -> Result<(), DeployError> {
        let filter = self
            .deployments
            .construct::<F>(Role::Filter, &self.context, &self.config)?;
        self.deployments.insert_filter(filter);
        Ok(())
    }

    /// Deploys an already constructed filter.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Initializer`] when an initializer rejects it.
    pub fn put_filter_instance<F: Filter>(&self, filter: F) -> Result<(), DeployError> {
        let initialized = self
            .deployments
            .initialize(filter, ComponentInfo::of::<F>(Role::Filter))?;
        self.deployments.insert_filter(initialized);
        Ok(())
    }

    /// Deploys every handler type in order, stopping at the first failure.
    ///
    /// Handlers deployed before the failure stay deployed.
    ///
    /// # Errors
    ///
    /// Returns the first registration error.
    pub fn set_handler_types<I>(&self, types: I) -> Result<(), DeployError>
    where
        I: IntoIterator<Item = HandlerType>,
    {
        types
            .into_iter()
            .try_for_each(|handler| handler.register(self))
    }

    /// Deploys every interceptor type in order, stopping at the first
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns the first registration error.
    pub fn set_interceptor_types<I>(&self, types: I) -> Result<(), DeployError>
    where
        I: IntoIterator<Item = InterceptorType>,
    {
        types
            .into_iter()
            .try_for_each(|interceptor| interceptor.register(self))
    }

    /// Deploys every filter type in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first registration error.
    pub fn set_filter_types<I>(&self, types: I) -> Result<(), DeployError>
    where
        I: IntoIterator<Item = FilterType>,
    {
        types
            .into_iter()
            .try_for_each(|filter| filter.register(self))
    }

    /// Registers an initializer for every component deployed afterwards.
    pub fn put_initializer(&self, initializer: Arc<dyn InvocationObjectInitializer>) {
        self.deployments.add_initializer(initializer);
    }

    /// Registers every initializer in order.
    pub fn set_initializers<I>(&self, initializers: I)
    where
        I: IntoIterator<Item = Arc<dyn InvocationObjectInitializer>>,
    {
        for initializer in initializers {
            self.put_initializer(initializer);
        }
    }

    /// Deploys every component the configured class scanner finds under
    /// `package`.
    ///
    /// Packages are `::`-separated module paths; nested modules are
    /// included. The scanner is the value of [`ClassScannerKey`].
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::EmptyType`] for a blank package,
    /// [`DeployError::Scan`] when scanning fails,
    /// [`DeployError::NoMapping`] for a candidate without an action mapping,
    /// or the first registration error.
    pub fn scan_and_put(&self, package: &str) -> Result<(), DeployError> {
        let trimmed = package.trim();
        if trimmed.is_empty() {
            return Err(DeployError::EmptyType);
        }
        let scanner = self.config.get(&ClassScannerKey)?;
        let candidates = scanner.scan(trimmed)?;
        if candidates.is_empty() {
            warn!(target: SCAN_TARGET, package = trimmed, "scan found no components");
        }
        debug!(
            target: SCAN_TARGET,
            package = trimmed,
            count = candidates.len(),
            "deploying scanned components"
        );
        candidates
            .into_iter()
            .try_for_each(|candidate| candidate.register(self))
    }

    /// Scans the package `T` is declared in.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::EmptyType`] when `T` is not declared inside a
    /// module path, or any error [`scan_and_put`](Self::scan_and_put)
    /// reports.
    pub fn scan_and_put_type<T: ?Sized>(&self) -> Result<(), DeployError> {
        let package = package_of(type_name::<T>()).ok_or(DeployError::EmptyType)?;
        self.scan_and_put(package)
    }

    /// Scans every package in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error [`scan_and_put`](Self::scan_and_put) reports.
    pub fn set_scan_and_put<I, S>(&self, packages: I) -> Result<(), DeployError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        packages
            .into_iter()
            .try_for_each(|package| self.scan_and_put(package.as_ref()))
    }

    /// Returns `true` when a handler is deployed for `A`.
    #[must_use]
    pub fn has_handler<A: Action>(&self) -> bool {
        self.deployments.resolve::<A>().is_ok()
    }

    /// Returns the number of interceptors deployed for `A`.
    #[must_use]
    pub fn interceptor_count<A: Action>(&self) -> usize {
        self.deployments.interceptor_count::<A>()
    }

    /// Returns the number of deployed filters.
    #[must_use]
    pub fn filter_count(&self) -> usize {
        self.deployments.filters().len()
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Returns the configuration registry.
    #[must_use]
    pub const fn config(&self) -> &ConfigRegistry {
        &self.config
    }

    /// Stores `value` under config key `K`.
    pub fn set_config<K: ConfigKey>(&self, value: K::Value) {
        self.config.set::<K>(value);
    }

    /// Returns the value of `key`, falling back to its default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingValue`] or [`ConfigError::DefaultValue`]
    /// when no value is available.
    pub fn get_config<K: ConfigKey>(&self, key: &K) -> Result<K::Value, ConfigError> {
        self.config.get(key)
    }

    /// Returns the value of `key` read as a boolean; absence reads as
    /// `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DefaultValue`] when the key's default could not
    /// be computed.
    pub fn is_true_config<K>(&self, key: &K) -> Result<bool, ConfigError>
    where
        K: ConfigKey,
        K::Value: Into<Option<bool>>,
    {
        self.config.is_true(key)
    }

    /// Makes text key `K` settable through
    /// [`set_config_values`](Self::set_config_values).
    pub fn declare_config_key<K: TextConfigKey>(&self) {
        self.config.declare::<K>();
    }

    /// Applies `properties` to the declared config keys as one batch.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] or [`ConfigError::InvalidValue`];
    /// nothing is applied in either case.
    pub fn set_config_values(&self, properties: &Properties) -> Result<(), ConfigError> {
        self.config.set_values(properties)
    }

    /// Parses `text` as properties and applies it as one batch.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Properties`] for malformed text, or any error
    /// [`set_config_values`](Self::set_config_values) reports.
    pub fn set_config_text(&self, text: &str) -> Result<(), ConfigError> {
        self.config.set_text(text)
    }

    // -----------------------------------------------------------------------
    // Context
    // -----------------------------------------------------------------------

    /// Returns the context registry.
    #[must_use]
    pub const fn context(&self) -> &ContextRegistry {
        &self.context
    }

    /// Makes `object` available to components deployed afterwards.
    pub fn add_to_context<T: Any + Send + Sync>(&self, object: Arc<T>) {
        self.context.add(object);
    }

    /// Registers every object in order.
    pub fn set_context_objects<I>(&self, objects: I)
    where
        I: IntoIterator<Item = ContextObject>,
    {
        self.context.set_objects(objects);
    }
}

fn run_chain<A: Action>(
    route: &Route<A>,
    invocation: Invocation<'_>,
    action: &mut A,
) -> Result<(), Fault> {
    route
        .chain(invocation)
        .map_err(Fault::Invocation)?
        .do_next(action)
}

/// Handle for dispatching from inside a running component.
///
/// Nested dispatches run the interceptors and handler of the nested action
/// synchronously on the calling thread. Filters are not applied again.
/// Calling [`Engine::invoke`] directly from a component bypasses this handle
/// and starts a new top-level dispatch at depth `0`.
#[derive(Clone, Copy)]
pub struct Invocation<'e> {
    engine: &'e Engine,
    depth: usize,
}

impl<'e> Invocation<'e> {
    pub(crate) const fn root(engine: &'e Engine) -> Self {
        Self { engine, depth: 0 }
    }

    /// Returns the nesting depth; `0` for a top-level dispatch.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the dispatching engine's name.
    #[must_use]
    pub fn engine_name(&self) -> Option<&'e str> {
        self.engine.name.as_deref()
    }

    /// Dispatches `action` from inside a component.
    ///
    /// Checked faults from the nested dispatch come back as unchecked faults
    /// carrying an [`ExceptionWrapper`], so they pass through the enclosing
    /// dispatch and reach an [`Engine::invoke`] caller as
    /// [`InvokeError::Wrapped`].
    ///
    /// # Errors
    ///
    /// Returns the nested dispatch's [`Fault`], with checked faults wrapped.
    pub fn invoke<B: Action>(&self, action: &mut B) -> Result<Option<B::Output>, Fault> {
        self.invoke_unwrap(action).map_err(|fault| match fault {
            Fault::Checked(cause) => Fault::Unchecked(Box::new(ExceptionWrapper::new(cause))),
            other => other,
        })
    }

    /// Dispatches `action` from inside a component, returning faults as
    /// raised.
    ///
    /// # Errors
    ///
    /// Returns the nested dispatch's [`Fault`] unchanged.
    pub fn invoke_unwrap<B: Action>(&self, action: &mut B) -> Result<Option<B::Output>, Fault> {
        let nested = Self {
            engine: self.engine,
            depth: self.depth.saturating_add(1),
        };
        self.engine.dispatch(action, nested, false)
    }

    /// Returns the value of `key` from the engine's configuration.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] raised by [`Engine::get_config`].
    pub fn config<K: ConfigKey>(&self, key: &K) -> Result<K::Value, ConfigError> {
        self.engine.get_config(key)
    }

    /// Returns the value of `key` read as a boolean.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] raised by [`Engine::is_true_config`].
    pub fn is_true_config<K>(&self, key: &K) -> Result<bool, ConfigError>
    where
        K: ConfigKey,
        K::Value: Into<Option<bool>>,
    {
        self.engine.is_true_config(key)
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("engine", &self.engine.name)
            .field("depth", &self.depth)
            .finish()
    }
}
