//! Single-use controllers that sequence one dispatch.
//!
//! [`Chain`] walks the interceptors of one action type and finishes with its
//! handler. [`FilterChain`] walks the global filters and finishes with the
//! action's [`Chain`]. Both are built fresh for every dispatch and fail fast
//! when advanced past their end.

use std::any::type_name;
use std::fmt;

use tracing::{info, trace};

use crate::action::{Action, DynAction};
use crate::component::{Filter, Handler, Interceptor};
use crate::config::TraceHandlers;
use crate::deploy::Deployed;
use crate::engine::{DISPATCH_TARGET, Invocation};
use crate::error::{Fault, InvocationError};

/// Remaining interceptors and the handler for one dispatch of `A`.
///
/// Interceptors receive the chain and continue the dispatch with
/// [`do_next`](Self::do_next). Not calling it short-circuits the dispatch:
/// later interceptors and the handler never run.
pub struct Chain<'c, A: Action> {
    interceptors: &'c [Deployed<dyn Interceptor<Action = A>>],
    handler: &'c Deployed<dyn Handler<Action = A>>,
    invocation: Invocation<'c>,
    handled: bool,
}

impl<'c, A: Action> Chain<'c, A> {
    pub(crate) const fn new(
        interceptors: &'c [Deployed<dyn Interceptor<Action = A>>],
        handler: &'c Deployed<dyn Handler<Action = A>>,
        invocation: Invocation<'c>,
    ) -> Self {
        Self {
            interceptors,
            handler,
            invocation,
            handled: false,
        }
    }

    /// Runs the next interceptor, or the handler once none remain.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] raised by the remainder of the chain, or
    /// [`InvocationError::ChainExhausted`] when the handler has already run.
    pub fn do_next(&mut self, action: &mut A) -> Result<(), Fault> {
        let interceptors = self.interceptors;
        if let Some((next, rest)) = interceptors.split_first() {
            self.interceptors = rest;
            trace!(
                target: DISPATCH_TARGET,
                interceptor = next.type_name,
                order = next.order,
                depth = self.invocation.depth(),
                "entering interceptor"
            );
            return next.component.invoke(action, self);
        }

        if self.handled {
            return Err(Fault::Invocation(InvocationError::ChainExhausted {
                action: type_name::<A>(),
            }));
        }
        self.handled = true;

        if self
            .invocation
            .is_true_config(&TraceHandlers)
            .unwrap_or(false)
        {
            info!(
                target: DISPATCH_TARGET,
                engine = self.invocation.engine_name().unwrap_or_default(),
                handler = self.handler.type_name,
                action = type_name::<A>(),
                depth = self.invocation.depth(),
                "invoking handler"
            );
        }
        self.handler.component.invoke(action, &self.invocation)
    }

    /// Returns the invocation handle, for dispatching further actions.
    #[must_use]
    pub const fn invocation(&self) -> &Invocation<'c> {
        &self.invocation
    }

    /// Returns the number of interceptors not yet entered.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.interceptors.len()
    }
}

impl<A: Action> fmt::Debug for Chain<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("action", &type_name::<A>())
            .field("remaining", &self.interceptors.len())
            .field("handler", &self.handler.type_name)
            .field("handled", &self.handled)
            .finish()
    }
}

pub(crate) type Terminal<'c> = Box<dyn FnOnce(&mut dyn DynAction) -> Result<(), Fault> + 'c>;

/// Remaining filters of one top-level dispatch.
///
/// Filters continue the dispatch with [`do_next`](Self::do_next), passing the
/// same action they received.
pub struct FilterChain<'c> {
    filters: &'c [Deployed<dyn Filter>],
    terminal: Option<Terminal<'c>>,
    action: &'static str,
}

impl<'c> FilterChain<'c> {
    pub(crate) fn new(
        filters: &'c [Deployed<dyn Filter>],
        action: &'static str,
        terminal: Terminal<'c>,
    ) -> Self {
        Self {
            filters,
            terminal: Some(terminal),
            action,
        }
    }

    /// Runs the next filter, or the action's interceptor chain once none
    /// remain.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] raised by the remainder of the pipeline,
    /// [`InvocationError::ActionMismatch`] when `action` is not the action
    /// being dispatched, or [`InvocationError::FilterChainExhausted`] when the
    /// pipeline has already completed.
    pub fn do_next(&mut self, action: &mut dyn DynAction) -> Result<(), Fault> {
        let filters = self.filters;
        if let Some((next, rest)) = filters.split_first() {
            self.filters = rest;
            trace!(
                target: DISPATCH_TARGET,
                filter = next.type_name,
                order = next.order,
                "entering filter"
            );
            return next.component.invoke(action, self);
        }

        let terminal = self.terminal.take().ok_or(Fault::Invocation(
            InvocationError::FilterChainExhausted {
                action: self.action,
            },
        ))?;
        terminal(action)
    }

    /// Returns the type name of the action being dispatched.
    #[must_use]
    pub const fn action_name(&self) -> &'static str {
        self.action
    }

    /// Returns the number of filters not yet entered.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.filters.len()
    }
}

impl fmt::Debug for FilterChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("action", &self.action)
            .field("remaining", &self.filters.len())
            .field("completed", &self.terminal.is_none())
            .finish()
    }
}
