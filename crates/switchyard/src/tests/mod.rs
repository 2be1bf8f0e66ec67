//! Crate-level integration and BDD tests.

pub(crate) mod support;

use std::sync::Arc;

use rstest::rstest;

use crate::action::{Action, DynAction};
use crate::context::ContextObject;
use crate::engine::Engine;
use crate::error::InvokeError;

use self::support::{Audit, Echo, Echoer, Journal, Orphan, Relay, Relayer};

#[test]
fn action_macro_generates_accessors() {
    let mut echo = Echo::new(String::from("in"));
    assert_eq!(echo.input(), "in");
    assert!(echo.output().is_none());

    echo.set_input(String::from("changed"));
    echo.set_output(String::from("out"));
    assert_eq!(echo.input(), "changed");
    assert_eq!(echo.take_output().as_deref(), Some("out"));
    assert!(echo.output().is_none());

    echo.set_output(String::from("kept"));
    assert_eq!(echo.into_output().as_deref(), Some("kept"));
}

#[test]
fn dyn_action_downcasts_to_its_concrete_type() {
    let mut echo = Echo::new(String::from("x"));
    let dynamic: &mut dyn DynAction = &mut echo;

    assert!(dynamic.action_name().ends_with("::Echo"));
    assert!(dynamic.is::<Echo>());
    assert!(!dynamic.is::<Orphan>());
    assert!(dynamic.downcast_ref::<Orphan>().is_none());

    if let Some(typed) = dynamic.downcast_mut::<Echo>() {
        typed.set_output(String::from("via dyn"));
    }
    assert_eq!(echo.output().map(String::as_str), Some("via dyn"));
}

#[rstest]
#[case::without_filters(false)]
#[case::with_filters(true)]
fn end_to_end_relay(#[case] with_filters: bool) {
    let journal = Arc::new(Journal::default());
    let engine = Engine::with_name("e2e");
    engine.set_context_objects([ContextObject::new(Arc::clone(&journal))]);
    engine.put_handler::<Echoer>().expect("deploy echo");
    engine.put_handler::<Relayer>().expect("deploy relay");
    if with_filters {
        engine.put_filter::<Audit<0>>().expect("deploy filter");
    }

    let output = engine
        .invoke(&mut Relay::new(String::from("ping")))
        .expect("dispatch");

    assert_eq!(output.as_deref(), Some("ping"));
    let filter_entries = journal
        .entries()
        .iter()
        .filter(|entry| entry.starts_with("filter"))
        .count();
    assert_eq!(filter_entries, if with_filters { 2 } else { 0 });
}

#[test]
fn engine_error_is_a_standard_error() {
    let engine = Engine::default();
    let error: Box<dyn std::error::Error> = engine
        .invoke(&mut Orphan::new(()))
        .map(|_| ())
        .map_err(InvokeError::into)
        .expect_err("no handler");
    assert!(error.to_string().contains("no handler is deployed"));
}
