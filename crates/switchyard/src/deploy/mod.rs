//! Deployment registry: routes from action type to handler and interceptors,
//! plus the global filter list.
//!
//! Each route and the filter list are immutable snapshots behind an `Arc`.
//! Registration builds a new snapshot and swaps it in, so a dispatch clones
//! the `Arc` it needs, releases the lock, and runs its components against a
//! view that later registrations cannot change.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::action::Action;
use crate::chain::Chain;
use crate::component::{
    ComponentInfo, DEFAULT_ORDER, Deploy, DeployContext, Filter, Handler, Interceptor,
    InvocationObjectInitializer, Role,
};
use crate::config::ConfigRegistry;
use crate::context::ContextRegistry;
use crate::engine::{Engine, Invocation};
use crate::error::{DeployError, InvocationError};
use crate::sync::{read, write};

/// Tracing target for deployment operations.
pub(crate) const DEPLOY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::deploy");

/// A component instance together with its identity and order.
pub(crate) struct Deployed<T: ?Sized> {
    pub(crate) type_name: &'static str,
    pub(crate) order: i32,
    pub(crate) component: Arc<T>,
}

impl<T: ?Sized> Clone for Deployed<T> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            order: self.order,
            component: Arc::clone(&self.component),
        }
    }
}

/// Handler and ordered interceptors deployed for one action type.
pub(crate) struct Route<A: Action> {
    handler: Option<Deployed<dyn Handler<Action = A>>>,
    interceptors: Vec<Deployed<dyn Interceptor<Action = A>>>,
}

impl<A: Action> Default for Route<A> {
    fn default() -> Self {
        Self {
            handler: None,
            interceptors: Vec::new(),
        }
    }
}

impl<A: Action> Clone for Route<A> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            interceptors: self.interceptors.clone(),
        }
    }
}

impl<A: Action> Route<A> {
    /// Starts a fresh chain over this route.
    pub(crate) fn chain<'c>(
        &'c self,
        invocation: Invocation<'c>,
    ) -> Result<Chain<'c, A>, InvocationError> {
        let handler = self.handler.as_ref().ok_or(InvocationError::NoHandler {
            action: type_name::<A>(),
        })?;
        Ok(Chain::new(&self.interceptors, handler, invocation))
    }
}

/// Registry of deployed components and initializers.
#[derive(Default)]
pub(crate) struct DeploymentRegistry {
    routes: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    filters: RwLock<Arc<Vec<Deployed<dyn Filter>>>>,
    initializers: RwLock<Vec<Arc<dyn InvocationObjectInitializer>>>,
}

impl DeploymentRegistry {
    /// Builds `T` through [`Deploy`] and runs the initializers on it.
    pub(crate) fn construct<T: Deploy + Any>(
        &self,
        role: Role,
        context: &ContextRegistry,
        config: &ConfigRegistry,
    ) -> Result<T, DeployError> {
        let info = ComponentInfo::of::<T>(role);
        let component = T::deploy(&DeployContext::new(info, context, config))?;
        self.initialize(component, info)
    }

    /// Runs every registered initializer, in registration order.
    pub(crate) fn initialize<T: Any>(
        &self,
        mut component: T,
        info: ComponentInfo,
    ) -> Result<T, DeployError> {
        let initializers = read(&self.initializers).clone();
        for initializer in &initializers {
            initializer
                .initialize(&mut component, info)
                .map_err(|source| DeployError::Initializer {
                    component: info,
                    source,
                })?;
        }
        Ok(component)
    }

    /// Fails when action `A` already has a handler.
    pub(crate) fn ensure_no_handler<A: Action>(
        &self,
        rejected: &'static str,
    ) -> Result<(), DeployError> {
        let routes = read(&self.routes);
        let existing = routes
            .get(&TypeId::of::<A>())
            .and_then(|route| route.downcast_ref::<Route<A>>())
            .and_then(|route| route.handler.as_ref());
        existing.map_or(Ok(()), |handler| {
            Err(DeployError::NotOneHandler {
                action: type_name::<A>(),
                existing: handler.type_name,
                rejected,
            })
        })
    }

    /// Deploys `handler` as the single handler of its action type.
    pub(crate) fn insert_handler<H: Handler>(&self, handler: H) -> Result<(), DeployError> {
        let rejected = type_name::<H>();
        self.update_route::<H::Action>(|route| {
            if let Some(existing) = &route.handler {
                return Err(DeployError::NotOneHandler {
                    action: type_name::<H::Action>(),
                    existing: existing.type_name,
                    rejected,
                });
            }
            route.handler = Some(Deployed {
                type_name: rejected,
                order: DEFAULT_ORDER,
                component: Arc::new(handler),
            });
            Ok(())
        })?;
        debug!(
            target: DEPLOY_TARGET,
            handler = rejected,
            action = type_name::<H::Action>(),
            "handler deployed"
        );
        Ok(())
    }

    /// Adds `interceptor` to its action type's chain.
    pub(crate) fn insert_interceptor<I: Interceptor>(
        &self,
        interceptor: I,
    ) -> Result<(), DeployError> {
        let order = interceptor.order();
        self.update_route::<I::Action>(|route| {
            route.interceptors.push(Deployed {
                type_name: type_name::<I>(),
                order,
                component: Arc::new(interceptor),
            });
            route.interceptors.sort_by_key(|deployed| deployed.order);
            Ok(())
        })?;
        debug!(
            target: DEPLOY_TARGET,
            interceptor = type_name::<I>(),
            action = type_name::<I::Action>(),
            order,
            "interceptor deployed"
        );
        Ok(())
    }

    /// Adds `filter` to the global filter list.
    pub(crate) fn insert_filter<F: Filter>(&self, filter: F) {
        let order = filter.order();
        {
            let mut filters = write(&self.filters);
            let mut updated = Vec::clone(&filters);
            updated.push(Deployed {
                type_name: type_name::<F>(),
                order,
                component: Arc::new(filter),
            });
            updated.sort_by_key(|deployed| deployed.order);
            *filters = Arc::new(updated);
        }
        debug!(
            target: DEPLOY_TARGET,
            filter = type_name::<F>(),
            order,
            "filter deployed"
        );
    }

    /// Registers an initializer for components deployed from now on.
    pub(crate) fn add_initializer(&self, initializer: Arc<dyn InvocationObjectInitializer>) {
        let count = {
            let mut initializers = write(&self.initializers);
            initializers.push(initializer);
            initializers.len()
        };
        debug!(target: DEPLOY_TARGET, count, "initializer registered");
    }

    /// Returns the route snapshot for action `A`.
    pub(crate) fn resolve<A: Action>(&self) -> Result<Arc<Route<A>>, InvocationError> {
        let route = read(&self.routes).get(&TypeId::of::<A>()).cloned();
        route
            .and_then(|erased| erased.downcast::<Route<A>>().ok())
            .filter(|route| route.handler.is_some())
            .ok_or(InvocationError::NoHandler {
                action: type_name::<A>(),
            })
    }

    /// Returns the current filter list snapshot.
    pub(crate) fn filters(&self) -> Arc<Vec<Deployed<dyn Filter>>> {
        Arc::clone(&read(&self.filters))
    }

    /// Returns the number of interceptors deployed for `A`.
    pub(crate) fn interceptor_count<A: Action>(&self) -> usize {
        read(&self.routes)
            .get(&TypeId::of::<A>())
            .and_then(|route| route.downcast_ref::<Route<A>>())
            .map_or(0, |route| route.interceptors.len())
    }

    fn update_route<A: Action>(
        &self,
        update: impl FnOnce(&mut Route<A>) -> Result<(), DeployError>,
    ) -> Result<(), DeployError> {
        let mut routes = write(&self.routes);
        let key = TypeId::of::<A>();
        let mut route = routes
            .get(&key)
            .and_then(|erased| erased.downcast_ref::<Route<A>>())
            .cloned()
            .unwrap_or_default();
        update(&mut route)?;
        routes.insert(key, Arc::new(route));
        Ok(())
    }
}

impl fmt::Debug for DeploymentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentRegistry")
            .field("routes", &read(&self.routes).len())
            .field("filters", &read(&self.filters).len())
            .field("initializers", &read(&self.initializers).len())
            .finish()
    }
}

/// Deferred registration of a handler type.
///
/// The token stands in for the type in bulk registration and class
/// scanning; applying it constructs the handler through [`Deploy`].
#[derive(Debug, Clone, Copy)]
pub struct HandlerType {
    type_name: &'static str,
    register: fn(&Engine) -> Result<(), DeployError>,
}

impl HandlerType {
    /// Token for handler type `H`.
    #[must_use]
    pub fn of<H: Handler + Deploy>() -> Self {
        Self {
            type_name: type_name::<H>(),
            register: Engine::put_handler::<H>,
        }
    }

    /// Returns the handler's type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn register(self, engine: &Engine) -> Result<(), DeployError> {
        (self.register)(engine)
    }
}

/// Deferred registration of an interceptor type.
#[derive(Debug, Clone, Copy)]
pub struct InterceptorType {
    type_name: &'static str,
    register: fn(&Engine) -> Result<(), DeployError>,
}

impl InterceptorType {
    /// Token for interceptor type `I`.
    #[must_use]
    pub fn of<I: Interceptor + Deploy>() -> Self {
        Self {
            type_name: type_name::<I>(),
            register: Engine::put_interceptor::<I>,
        }
    }

    /// Returns the interceptor's type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn register(self, engine: &Engine) -> Result<(), DeployError> {
        (self.register)(engine)
    }
}

/// Deferred registration of a filter type.
#[derive(Debug, Clone, Copy)]
pub struct FilterType {
    type_name: &'static str,
    register: fn(&Engine) -> Result<(), DeployError>,
}

impl FilterType {
    /// Token for filter type `F`.
    #[must_use]
    pub fn of<F: Filter + Deploy>() -> Self {
        Self {
            type_name: type_name::<F>(),
            register: Engine::put_filter::<F>,
        }
    }

    /// Returns the filter's type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn register(self, engine: &Engine) -> Result<(), DeployError> {
        (self.register)(engine)
    }
}

#[cfg(test)]
mod tests;
