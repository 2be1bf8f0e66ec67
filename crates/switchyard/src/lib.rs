//! In-process action dispatch.
//!
//! The `switchyard` crate routes typed request/response values, called
//! actions, to the single handler deployed for their type. On the way the
//! action passes through the global filters and then through the
//! interceptors deployed for its type, each of which can work on the action
//! before and after the rest of the dispatch runs, or stop it altogether.
//!
//! Handlers and interceptors may dispatch further actions on the same engine
//! while they run. Such nested dispatches run their own interceptors and
//! handler; filters only ever run once, around the outermost dispatch.
//!
//! # Architecture
//!
//! - [`ContextRegistry`] holds shared services, one per type. Components
//!   resolve them once, while they are constructed, through
//!   [`DeployContext`].
//! - [`ConfigRegistry`] holds typed configuration values keyed by
//!   [`ConfigKey`] types, with per-key defaults and a text form for keys that
//!   implement [`TextConfigKey`].
//! - The deployment registry inside [`Engine`] maps each action type to its
//!   handler and ordered interceptors, and keeps the ordered filter list.
//! - [`Chain`] and [`FilterChain`] sequence a single dispatch.
//!
//! # Errors
//!
//! Component bodies fail with a [`Fault`]. `?` on any error produces a
//! checked fault. [`Engine::invoke`] wraps checked faults in an
//! [`ExceptionWrapper`]; [`Engine::invoke_unwrap`] returns them unchanged.
//! Unchecked faults and routing failures reach both callers as raised.
//!
//! # Example
//!
//! ```
//! use switchyard::{
//!     Action, Chain, Deploy, DeployContext, DeployError, Engine, Fault, Handler, Interceptor,
//!     Invocation, action,
//! };
//!
//! action! {
//!     /// Greets someone.
//!     pub struct Greet(String) -> String;
//! }
//!
//! struct Greeter;
//!
//! impl Deploy for Greeter {
//!     fn deploy(_: &DeployContext<'_>) -> Result<Self, DeployError> {
//!         Ok(Self)
//!     }
//! }
//!
//! impl Handler for Greeter {
//!     type Action = Greet;
//!
//!     fn invoke(&self, action: &mut Greet, _: &Invocation<'_>) -> Result<(), Fault> {
//!         let greeting = format!("hello {}", action.input());
//!         action.set_output(greeting);
//!         Ok(())
//!     }
//! }
//!
//! struct Shout;
//!
//! impl Interceptor for Shout {
//!     type Action = Greet;
//!
//!     fn invoke(&self, action: &mut Greet, chain: &mut Chain<'_, Greet>) -> Result<(), Fault> {
//!         chain.do_next(action)?;
//!         if let Some(output) = action.take_output() {
//!             action.set_output(output.to_uppercase());
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let engine = Engine::new();
//! engine.put_handler::<Greeter>()?;
//! engine.put_interceptor_instance(Shout)?;
//!
//! let output = engine.invoke(&mut Greet::new(String::from("ada")))?;
//! assert_eq!(output.as_deref(), Some("HELLO ADA"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod action;
pub mod chain;
pub mod component;
pub mod config;
pub mod context;
pub mod deploy;
pub mod engine;
pub mod error;
pub mod scan;
mod sync;

#[cfg(test)]
mod tests;

pub use switchyard_properties::{Properties, PropertiesError};

pub use self::action::{Action, DynAction};
pub use self::chain::{Chain, FilterChain};
pub use self::component::{
    ComponentInfo, DEFAULT_ORDER, Deploy, DeployContext, Filter, Handler, Interceptor,
    InvocationObjectInitializer, Role,
};
pub use self::config::{ConfigKey, ConfigRegistry, TextConfigKey, TraceHandlers, parse_text};
pub use self::context::{ContextObject, ContextRegistry};
pub use self::deploy::{FilterType, HandlerType, InterceptorType};
pub use self::engine::{Engine, Invocation};
pub use self::error::{
    BoxError, ConfigError, DeployError, ExceptionWrapper, Fault, InvocationError, InvokeError,
    ScanError,
};
pub use self::scan::{Candidate, Catalog, ClassScanner, ClassScannerKey};
