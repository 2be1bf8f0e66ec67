//! Actions and components shared by the unit and behaviour tests.

use std::io;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use thiserror::Error;

use crate::action::{Action, DynAction};
use crate::chain::{Chain, FilterChain};
use crate::component::{Deploy, DeployContext, Filter, Handler, Interceptor};
use crate::engine::{Engine, Invocation};
use crate::error::{DeployError, Fault};

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Context service recording the order in which components run.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub(crate) fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

crate::action! {
    /// Echoes its input.
    pub(crate) struct Echo(String) -> String;
}

crate::action! {
    /// Echoes its input through a nested dispatch of [`Echo`].
    pub(crate) struct Relay(String) -> String;
}

crate::action! {
    /// Fails in the way its input names.
    pub(crate) struct Explode(Failure) -> String;
}

crate::action! {
    /// Never has a handler.
    pub(crate) struct Orphan(()) -> ();
}

/// Failure mode requested from [`Exploder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    Checked,
    Unchecked,
}

/// Caller-defined failure raised by [`Exploder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("declined: {reason}")]
pub(crate) struct Declined {
    pub(crate) reason: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Handles [`Echo`], recording `handler` in the journal.
pub(crate) struct Echoer {
    pub(crate) journal: Arc<Journal>,
}

impl Deploy for Echoer {
    fn deploy(context: &DeployContext<'_>) -> Result<Self, DeployError> {
        Ok(Self {
            journal: context.require::<Journal>()?,
        })
    }
}

impl Handler for Echoer {
    type Action = Echo;

    fn invoke(&self, action: &mut Echo, invocation: &Invocation<'_>) -> Result<(), Fault> {
        self.journal
            .record(format!("handler {} depth {}", action.input(), invocation.depth()));
        let echoed = action.input().clone();
        action.set_output(echoed);
        Ok(())
    }
}

/// Second handler for [`Echo`], used to provoke duplicate registration.
pub(crate) struct ShadowEchoer;

impl Deploy for ShadowEchoer {
    fn deploy(_: &DeployContext<'_>) -> Result<Self, DeployError> {
        Ok(Self)
    }
}

impl Handler for ShadowEchoer {
    type Action = Echo;

    fn invoke(&self, action: &mut Echo, _: &Invocation<'_>) -> Result<(), Fault> {
        action.set_output(String::from("shadow"));
        Ok(())
    }
}

/// Handles [`Relay`] by dispatching an [`Echo`] of the same input.
pub(crate) struct Relayer {
    journal: Arc<Journal>,
}

impl Deploy for Relayer {
    fn deploy(context: &DeployContext<'_>) -> Result<Self, DeployError> {
        Ok(Self {
            journal: context.require::<Journal>()?,
        })
    }
}

impl Handler for Relayer {
    type Action = Relay;

    fn invoke(&self, action: &mut Relay, invocation: &Invocation<'_>) -> Result<(), Fault> {
        self.journal.record("relay before");
        let nested = invocation.invoke(&mut Echo::new(action.input().clone()))?;
        self.journal.record("relay after");
        action.set_output(nested.unwrap_or_default());
        Ok(())
    }
}

/// Handles [`Relay`] by dispatching an [`Explode`] with the checked failure.
pub(crate) struct FailingRelayer {
    pub(crate) unwrap: bool,
}

impl Handler for FailingRelayer {
    type Action = Relay;

    fn invoke(&self, _: &mut Relay, invocation: &Invocation<'_>) -> Result<(), Fault> {
        let mut nested = Explode::new(Failure::Checked);
        if self.unwrap {
            invocation.invoke_unwrap(&mut nested)?;
        } else {
            invocation.invoke(&mut nested)?;
        }
        Ok(())
    }
}

/// Handles [`Explode`] by failing.
pub(crate) struct Exploder;

impl Deploy for Exploder {
    fn deploy(_: &DeployContext<'_>) -> Result<Self, DeployError> {
        Ok(Self)
    }
}

impl Handler for Exploder {
    type Action = Explode;

    fn invoke(&self, action: &mut Explode, _: &Invocation<'_>) -> Result<(), Fault> {
        match action.input() {
            Failure::Checked => Err(Declined {
                reason: String::from("card expired"),
            }
            .into()),
            Failure::Unchecked => Err(Fault::unchecked(io::Error::other("ledger corrupted"))),
        }
    }
}

/// Handles [`Relay`] by dispatching an [`Echo`] straight on an engine rather
/// than through its [`Invocation`].
pub(crate) struct Forwarder {
    pub(crate) engine: Weak<Engine>,
}

impl Handler for Forwarder {
    type Action = Relay;

    fn invoke(&self, action: &mut Relay, _: &Invocation<'_>) -> Result<(), Fault> {
        let engine = self
            .engine
            .upgrade()
            .ok_or_else(|| Fault::unchecked(io::Error::other("engine dropped")))?;
        let output = engine.invoke(&mut Echo::new(action.input().clone()))?;
        if let Some(echoed) = output {
            action.set_output(echoed);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Interceptors
// ---------------------------------------------------------------------------

/// Interceptor for [`Echo`] with a fixed order that records around the rest
/// of the chain.
pub(crate) struct Around<const ORDER: i32> {
    journal: Arc<Journal>,
}

impl<const ORDER: i32> Around<ORDER> {
    pub(crate) const fn new(journal: Arc<Journal>) -> Self {
        Self { journal }
    }
}

impl<const ORDER: i32> Deploy for Around<ORDER> {
    fn deploy(context: &DeployContext<'_>) -> Result<Self, DeployError> {
        Ok(Self::new(context.require::<Journal>()?))
    }
}

impl<const ORDER: i32> Interceptor for Around<ORDER> {
    type Action = Echo;

    fn order(&self) -> i32 {
        ORDER
    }

    fn invoke(&self, action: &mut Echo, chain: &mut Chain<'_, Echo>) -> Result<(), Fault> {
        self.journal.record(format!("pre {ORDER}"));
        chain.do_next(action)?;
        self.journal.record(format!("post {ORDER}"));
        Ok(())
    }
}

/// Interceptor for [`Echo`] with default order, told apart by `label`.
pub(crate) struct Labelled {
    pub(crate) label: &'static str,
    pub(crate) journal: Arc<Journal>,
}

impl Interceptor for Labelled {
    type Action = Echo;

    fn invoke(&self, action: &mut Echo, chain: &mut Chain<'_, Echo>) -> Result<(), Fault> {
        self.journal.record(self.label);
        chain.do_next(action)
    }
}

/// Interceptor for [`Echo`] that stops the dispatch.
pub(crate) struct Gate;

impl Deploy for Gate {
    fn deploy(_: &DeployContext<'_>) -> Result<Self, DeployError> {
        Ok(Self)
    }
}

impl Interceptor for Gate {
    type Action = Echo;

    fn order(&self) -> i32 {
        -10
    }

    fn invoke(&self, action: &mut Echo, _: &mut Chain<'_, Echo>) -> Result<(), Fault> {
        action.set_output(String::from("denied"));
        Ok(())
    }
}

/// Interceptor for [`Echo`] that rewrites the input before the handler and
/// the output after it.
pub(crate) struct Rewrite;

impl Interceptor for Rewrite {
    type Action = Echo;

    fn invoke(&self, action: &mut Echo, chain: &mut Chain<'_, Echo>) -> Result<(), Fault> {
        action.input_mut().push('!');
        chain.do_next(action)?;
        if let Some(output) = action.take_output() {
            action.set_output(output.to_uppercase());
        }
        Ok(())
    }
}

/// Interceptor for [`Echo`] that advances its chain twice.
pub(crate) struct Stutter;

impl Interceptor for Stutter {
    type Action = Echo;

    fn invoke(&self, action: &mut Echo, chain: &mut Chain<'_, Echo>) -> Result<(), Fault> {
        chain.do_next(action)?;
        chain.do_next(action)
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Filter with a fixed order that records around the rest of the dispatch.
pub(crate) struct Audit<const ORDER: i32> {
    journal: Arc<Journal>,
}

impl<const ORDER: i32> Audit<ORDER> {
    pub(crate) const fn new(journal: Arc<Journal>) -> Self {
        Self { journal }
    }
}

impl<const ORDER: i32> Deploy for Audit<ORDER> {
    fn deploy(context: &DeployContext<'_>) -> Result<Self, DeployError> {
        Ok(Self::new(context.require::<Journal>()?))
    }
}

impl<const ORDER: i32> Filter for Audit<ORDER> {
    fn order(&self) -> i32 {
        ORDER
    }

    fn invoke(
        &self,
        action: &mut dyn DynAction,
        chain: &mut FilterChain<'_>,
    ) -> Result<(), Fault> {
        let name = action
            .action_name()
            .rsplit("::")
            .next()
            .unwrap_or_default();
        self.journal.record(format!("filter {ORDER} {name}"));
        chain.do_next(action)?;
        self.journal.record(format!("filter {ORDER} done"));
        Ok(())
    }
}

/// Filter that hands the pipeline a different action than it received.
pub(crate) struct Substitute;

impl Filter for Substitute {
    fn invoke(&self, _: &mut dyn DynAction, chain: &mut FilterChain<'_>) -> Result<(), Fault> {
        chain.do_next(&mut Orphan::new(()))
    }
}

/// Filter that hands the pipeline a fresh [`Echo`] in place of the one it
/// received.
pub(crate) struct Impostor;

impl Filter for Impostor {
    fn invoke(&self, _: &mut dyn DynAction, chain: &mut FilterChain<'_>) -> Result<(), Fault> {
        chain.do_next(&mut Echo::new(String::from("swapped")))
    }
}

/// Filter that advances its pipeline twice.
pub(crate) struct Repeat;

impl Filter for Repeat {
    fn invoke(
        &self,
        action: &mut dyn DynAction,
        chain: &mut FilterChain<'_>,
    ) -> Result<(), Fault> {
        chain.do_next(action)?;
        chain.do_next(action)
    }
}

/// Filter that appends a suffix to every [`Echo`] output.
pub(crate) struct Suffix;

impl Filter for Suffix {
    fn invoke(
        &self,
        action: &mut dyn DynAction,
        chain: &mut FilterChain<'_>,
    ) -> Result<(), Fault> {
        chain.do_next(action)?;
        if let Some(echo) = action.downcast_mut::<Echo>()
            && let Some(output) = echo.take_output()
        {
            echo.set_output(format!("{output}?"));
        }
        Ok(())
    }
}
