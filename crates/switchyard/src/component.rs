//! Handlers, interceptors, and filters: the components an engine deploys.
//!
//! A component's action mapping is its associated `Action` type, so typed
//! components always carry one. Components that need shared services or
//! configuration implement [`Deploy`] and resolve them once, at deploy time,
//! from the [`DeployContext`] they are constructed with.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use strum::Display;

use crate::action::{Action, DynAction};
use crate::chain::{Chain, FilterChain};
use crate::config::{ConfigKey, ConfigRegistry};
use crate::context::ContextRegistry;
use crate::engine::Invocation;
use crate::error::{BoxError, DeployError, Fault};

/// Order given to interceptors and filters that do not override `order`.
pub const DEFAULT_ORDER: i32 = 0;

/// Produces the result of exactly one action type.
///
/// Exactly one handler may be deployed per action type.
pub trait Handler: Send + Sync + 'static {
    /// Action type this handler is mapped to.
    type Action: Action;

    /// Handles `action`, usually by setting its output.
    ///
    /// `invocation` allows dispatching further actions on the same engine.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] describing why the action could not be handled.
    fn invoke(&self, action: &mut Self::Action, invocation: &Invocation<'_>)
    -> Result<(), Fault>;
}

/// Pre- and post-processing step for one action type.
///
/// Interceptors run in ascending [`order`](Interceptor::order), ties broken by
/// registration order. Each one decides whether to continue by calling
/// [`Chain::do_next`]; one that never does short-circuits the dispatch.
pub trait Interceptor: Send + Sync + 'static {
    /// Action type this interceptor is mapped to.
    type Action: Action;

    /// Position of this interceptor relative to others for the same action.
    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    /// Processes `action` around the remainder of `chain`.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] raised by this interceptor or by the remainder of
    /// the chain.
    fn invoke(
        &self,
        action: &mut Self::Action,
        chain: &mut Chain<'_, Self::Action>,
    ) -> Result<(), Fault>;
}

/// Pre- and post-processing step applied to every action.
///
/// Filters run once per top-level dispatch, outside all interceptors, and
/// are not re-applied to sub-invocations.
pub trait Filter: Send + Sync + 'static {
    /// Position of this filter relative to other filters.
    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }

    /// Processes `action` around the remainder of `chain`.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] raised by this filter or by the remainder of the
    /// pipeline.
    fn invoke(&self, action: &mut dyn DynAction, chain: &mut FilterChain<'_>)
    -> Result<(), Fault>;
}

/// Construction of a component from the engine's context at deploy time.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use switchyard::{Deploy, DeployContext, DeployError};
///
/// struct Clock;
///
/// struct TimestampHandler {
///     clock: Arc<Clock>,
/// }
///
/// impl Deploy for TimestampHandler {
///     fn deploy(context: &DeployContext<'_>) -> Result<Self, DeployError> {
///         Ok(Self {
///             clock: context.require::<Clock>()?,
///         })
///     }
/// }
/// ```
pub trait Deploy: Sized {
    /// Builds the component.
    ///
    /// # Errors
    ///
    /// Returns a [`DeployError`] when a dependency or configuration value is
    /// unavailable.
    fn deploy(context: &DeployContext<'_>) -> Result<Self, DeployError>;
}

/// Role a component plays in dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// A [`Handler`].
    Handler,
    /// An [`Interceptor`].
    Interceptor,
    /// A [`Filter`].
    Filter,
}

/// Identity of a component being deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentInfo {
    type_name: &'static str,
    role: Role,
}

impl ComponentInfo {
    /// Describes the component type `T` in `role`.
    #[must_use]
    pub fn of<T: ?Sized>(role: Role) -> Self {
        Self {
            type_name: type_name::<T>(),
            role,
        }
    }

    /// Returns the component's type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the component's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }
}

impl fmt::Display for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.role, self.type_name)
    }
}

/// Dependencies and configuration visible to a component under construction.
pub struct DeployContext<'a> {
    component: ComponentInfo,
    context: &'a ContextRegistry,
    config: &'a ConfigRegistry,
}

impl<'a> DeployContext<'a> {
    pub(crate) const fn new(
        component: ComponentInfo,
        context: &'a ContextRegistry,
        config: &'a ConfigRegistry,
    ) -> Self {
        Self {
            component,
            context,
            config,
        }
    }

    /// Returns the component being constructed.
    #[must_use]
    pub const fn component(&self) -> ComponentInfo {
        self.component
    }

    /// Returns the context object registered for `T`, if any.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.context.get::<T>()
    }

    /// Returns the context object registered for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::MissingContextObject`] when nothing is
    /// registered for `T`.
    pub fn require<T: Any + Send + Sync>(&self) -> Result<Arc<T>, DeployError> {
        self.get::<T>()
            .ok_or_else(|| DeployError::MissingContextObject {
                component: self.component,
                dependency: type_name::<T>(),
            })
    }

    /// Returns the configuration value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Config`] when the key has no value and no
    /// usable default.
    pub fn config<K: ConfigKey>(&self, key: &K) -> Result<K::Value, DeployError> {
        Ok(self.config.get(key)?)
    }
}

/// Post-construction hook run for every deployed component.
///
/// Every registered initializer runs once per constructed handler,
/// interceptor, or filter, in registration order, before the component is
/// deployed. A failing initializer aborts that registration.
pub trait InvocationObjectInitializer: Send + Sync {
    /// Prepares `component`, which can be downcast to its concrete type.
    ///
    /// # Errors
    ///
    /// Returns an error to reject the component.
    fn initialize(&self, component: &mut dyn Any, info: ComponentInfo) -> Result<(), BoxError>;
}
