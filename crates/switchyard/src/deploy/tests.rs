//! Unit tests for the deployment registry.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::config::{ConfigKey, TraceHandlers};
use crate::error::ConfigError;
use crate::tests::support::{Around, Audit, Echo, Echoer, Journal, Labelled, Orphan, Rewrite};

#[fixture]
fn journal() -> Arc<Journal> {
    Arc::new(Journal::default())
}

#[fixture]
fn registry() -> DeploymentRegistry {
    DeploymentRegistry::default()
}

fn echoer(journal: &Arc<Journal>) -> Echoer {
    Echoer {
        journal: Arc::clone(journal),
    }
}

#[rstest]
fn resolve_fails_for_unknown_action(registry: DeploymentRegistry) {
    assert!(matches!(
        registry.resolve::<Orphan>(),
        Err(InvocationError::NoHandler { .. })
    ));
}

#[rstest]
fn handler_is_resolvable_after_insert(registry: DeploymentRegistry, journal: Arc<Journal>) {
    registry
        .insert_handler(echoer(&journal))
        .expect("insert handler");

    let route = registry.resolve::<Echo>().expect("route");
    assert!(route.handler.is_some());
    assert!(route.interceptors.is_empty());
}

#[rstest]
fn ensure_no_handler_reports_existing(registry: DeploymentRegistry, journal: Arc<Journal>) {
    registry
        .ensure_no_handler::<Echo>("first")
        .expect("no handler yet");
    registry
        .insert_handler(echoer(&journal))
        .expect("insert handler");

    let error = registry
        .ensure_no_handler::<Echo>("second")
        .expect_err("already handled");
    assert!(matches!(
        error,
        DeployError::NotOneHandler { existing, rejected: "second", .. } if existing.ends_with("Echoer")
    ));
}

#[rstest]
fn insert_handler_rechecks_under_lock(registry: DeploymentRegistry, journal: Arc<Journal>) {
    registry
        .insert_handler(echoer(&journal))
        .expect("insert handler");
    assert!(matches!(
        registry.insert_handler(echoer(&journal)),
        Err(DeployError::NotOneHandler { .. })
    ));
}

#[rstest]
fn interceptors_are_stably_sorted(registry: DeploymentRegistry, journal: Arc<Journal>) {
    registry
        .insert_interceptor(Around::<5>::new(Arc::clone(&journal)))
        .expect("insert");
    registry
        .insert_interceptor(Labelled {
            label: "x",
            journal: Arc::clone(&journal),
        })
        .expect("insert");
    registry
        .insert_interceptor(Around::<-5>::new(Arc::clone(&journal)))
        .expect("insert");
    registry.insert_interceptor(Rewrite).expect("insert");
    registry
        .insert_handler(echoer(&journal))
        .expect("insert handler");

    let route = registry.resolve::<Echo>().expect("route");
    let names: Vec<_> = route
        .interceptors
        .iter()
        .map(|deployed| (deployed.order, deployed.type_name.rsplit("::").next()))
        .collect();
    assert_eq!(
        names,
        [
            (-5, Some("Around<-5>")),
            (0, Some("Labelled")),
            (0, Some("Rewrite")),
            (5, Some("Around<5>")),
        ]
    );
    assert_eq!(registry.interceptor_count::<Echo>(), 4);
}

#[rstest]
fn resolved_route_is_a_snapshot(registry: DeploymentRegistry, journal: Arc<Journal>) {
    registry
        .insert_handler(echoer(&journal))
        .expect("insert handler");
    let before = registry.resolve::<Echo>().expect("route");

    registry.insert_interceptor(Rewrite).expect("insert");

    assert!(before.interceptors.is_empty());
    assert_eq!(
        registry.resolve::<Echo>().expect("route").interceptors.len(),
        1
    );
}

#[rstest]
fn filters_are_stably_sorted_snapshots(registry: DeploymentRegistry, journal: Arc<Journal>) {
    registry.insert_filter(Audit::<3>::new(Arc::clone(&journal)));
    let before = registry.filters();
    registry.insert_filter(Audit::<1>::new(Arc::clone(&journal)));
    registry.insert_filter(Audit::<3>::new(Arc::clone(&journal)));

    let orders: Vec<_> = registry
        .filters()
        .iter()
        .map(|deployed| deployed.order)
        .collect();
    assert_eq!(orders, [1, 3, 3]);
    assert_eq!(before.len(), 1);
}

#[rstest]
fn construct_passes_context_and_config(registry: DeploymentRegistry, journal: Arc<Journal>) {
    struct Probe {
        role: Role,
        journal: Option<Arc<Journal>>,
        trace: bool,
    }

    impl Deploy for Probe {
        fn deploy(context: &DeployContext<'_>) -> Result<Self, DeployError> {
            Ok(Self {
                role: context.component().role(),
                journal: context.get::<Journal>(),
                trace: context.config(&TraceHandlers)?,
            })
        }
    }

    let context = ContextRegistry::new();
    context.add(Arc::clone(&journal));
    let config = ConfigRegistry::new();
    config.set::<TraceHandlers>(true);

    let probe = registry
        .construct::<Probe>(Role::Filter, &context, &config)
        .expect("construct");

    assert_eq!(probe.role, Role::Filter);
    assert!(probe.trace);
    assert!(
        probe
            .journal
            .is_some_and(|found| Arc::ptr_eq(&found, &journal))
    );
}

#[rstest]
fn construct_surfaces_config_errors(registry: DeploymentRegistry) {
    struct Required;

    impl ConfigKey for Required {
        type Value = u16;
    }

    #[derive(Debug)]
    struct NeedsPort;

    impl Deploy for NeedsPort {
        fn deploy(context: &DeployContext<'_>) -> Result<Self, DeployError> {
            context.config(&Required)?;
            Ok(Self)
        }
    }

    let error = registry
        .construct::<NeedsPort>(Role::Handler, &ContextRegistry::new(), &ConfigRegistry::new())
        .expect_err("missing config");
    assert!(matches!(
        error,
        DeployError::Config(ConfigError::MissingValue { .. })
    ));
}

#[test]
fn type_tokens_report_type_names() {
    assert!(HandlerType::of::<Echoer>().type_name().ends_with("Echoer"));
    assert!(
        InterceptorType::of::<Around<1>>()
            .type_name()
            .ends_with("Around<1>")
    );
    assert!(FilterType::of::<Audit<2>>().type_name().ends_with("Audit<2>"));
}
