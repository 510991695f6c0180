//! Reconciliation engine - teardown and rebuild, fail-fast

use crate::context::{NoProgress, ProgressCallback};
use crate::planner::{ExecutionPlan, Step, TEARDOWN_ORDER};
use crate::types::{ApplyError, ApplySummary, Outcome, RouteIndex, Stage};
use kongkit::{
    Action, Document, EntityKind, Gateway, Page, RemoteConsumer, RemotePlugin, RemoteRoute,
    RemoteService,
};

/// Drives a [`Gateway`] to the state declared in a [`Document`]
///
/// Every call is sequential. The first failed call (transport error or any
/// status but the expected one) stops the run; what was already applied
/// stays applied. Running again deletes whatever is there and rebuilds.
pub struct Reconciler<'g, G: Gateway + ?Sized> {
    gateway: &'g G,
}

impl<'g, G: Gateway + ?Sized> Reconciler<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    /// Delete every remote consumer, route, service and plugin, then upsert
    /// all declared services and create all declared routes
    ///
    /// Plugins and credentials are not created here; see
    /// [`Reconciler::apply_plugins`].
    pub fn apply<P: ProgressCallback>(
        &self,
        document: &Document,
        progress: &mut P,
    ) -> Result<ApplySummary, ApplyError> {
        let mut summary = ApplySummary::default();

        progress.on_stage_start(Stage::Teardown);
        log::info!("Tearing down remote state");
        for kind in TEARDOWN_ORDER {
            self.teardown(kind, &mut summary, progress)?;
        }
        progress.on_stage_complete(Stage::Teardown);

        let plan = ExecutionPlan::rebuild(document);
        progress.on_stage_start(Stage::Rebuild);
        log::info!("Rebuilding {} declared entities", plan.len());
        self.execute(Stage::Rebuild, &plan, &mut summary, progress)?;
        progress.on_stage_complete(Stage::Rebuild);

        Ok(summary)
    }

    /// Create every declared plugin on its targets
    ///
    /// Independent of [`Reconciler::apply`]. Route targets resolve through
    /// `routes`, normally the index returned by an `apply` in the same run.
    pub fn apply_plugins<P: ProgressCallback>(
        &self,
        document: &Document,
        routes: &RouteIndex,
        progress: &mut P,
    ) -> Result<ApplySummary, ApplyError> {
        let mut summary = ApplySummary::default();
        let plan = ExecutionPlan::plugins(document, routes);

        progress.on_stage_start(Stage::Plugins);
        log::info!("Creating {} plugin instances", plan.len());
        self.execute(Stage::Plugins, &plan, &mut summary, progress)?;
        progress.on_stage_complete(Stage::Plugins);

        Ok(summary)
    }

    fn teardown<P: ProgressCallback>(
        &self,
        kind: EntityKind,
        summary: &mut ApplySummary,
        progress: &mut P,
    ) -> Result<(), ApplyError> {
        let gateway = self.gateway;
        let identities = match kind {
            EntityKind::Consumer => {
                listed(kind, gateway.list_consumers(), RemoteConsumer::identity, summary, progress)?
            }
            EntityKind::Route => {
                listed(kind, gateway.list_routes(None), RemoteRoute::identity, summary, progress)?
            }
            EntityKind::Service => {
                listed(kind, gateway.list_services(), RemoteService::identity, summary, progress)?
            }
            EntityKind::Plugin => {
                listed(kind, gateway.list_plugins(), RemotePlugin::identity, summary, progress)?
            }
        };

        for identity in identities {
            let result = match kind {
                EntityKind::Consumer => self.gateway.delete_consumer(&identity),
                EntityKind::Route => self.gateway.delete_route(&identity),
                EntityKind::Service => self.gateway.delete_service(&identity),
                EntityKind::Plugin => self.gateway.delete_plugin(&identity),
            };
            let outcome = Outcome::new(Stage::Teardown, Action::Delete, kind, identity);
            record(outcome, result, progress)?;
            summary.deleted += 1;
        }

        Ok(())
    }

    fn execute<P: ProgressCallback>(
        &self,
        stage: Stage,
        plan: &ExecutionPlan<'_>,
        summary: &mut ApplySummary,
        progress: &mut P,
    ) -> Result<(), ApplyError> {
        for step in &plan.steps {
            log::trace!("{stage}: next {} step", step.kind());
            match step {
                Step::UpsertService(service) => {
                    let outcome =
                        Outcome::new(stage, Action::Upsert, EntityKind::Service, &service.name);
                    record(outcome, self.gateway.upsert_service(service), progress)?;
                    summary.upserted += 1;
                }
                Step::CreateRoute(route) => {
                    let outcome =
                        Outcome::new(stage, Action::Create, EntityKind::Route, route.display_name())
                            .with_detail(format!("for service {}", route.service));
                    let id = record(outcome, self.gateway.create_route(route), progress)?;
                    if let Some(name) = &route.name {
                        summary.route_index.insert(name, id);
                    }
                    summary.created += 1;
                }
                Step::CreatePlugin { plugin, scope } => {
                    let outcome =
                        Outcome::new(stage, Action::Create, EntityKind::Plugin, &plugin.name)
                            .with_detail(format!("on {scope}"));
                    record(outcome, self.gateway.create_plugin(plugin, scope), progress)?;
                    summary.created += 1;
                }
            }
        }
        Ok(())
    }
}

/// Report a list result and extract the identities to delete
fn listed<T, P: ProgressCallback>(
    kind: EntityKind,
    result: kongkit::Result<Page<T>>,
    identity: fn(&T) -> &str,
    summary: &mut ApplySummary,
    progress: &mut P,
) -> Result<Vec<String>, ApplyError> {
    let page = fail_with(Stage::Teardown, result, progress)?;
    let truncated = page.next.is_some();

    log::debug!("Found {} remote {} entities", page.data.len(), kind);
    progress.on_listed(kind, page.data.len(), truncated);
    summary.listed += page.data.len();
    if truncated {
        summary.truncated.push(kind);
    }

    Ok(page.data.iter().map(|item| identity(item).to_string()).collect())
}

/// Report a mutating call: success line on `Ok`, abort on `Err`
fn record<T, P: ProgressCallback>(
    outcome: Outcome,
    result: kongkit::Result<T>,
    progress: &mut P,
) -> Result<T, ApplyError> {
    let value = fail_with(outcome.stage, result, progress)?;
    log::debug!("{}", outcome.message());
    progress.on_operation_complete(&outcome);
    Ok(value)
}

fn fail_with<T, P: ProgressCallback>(
    stage: Stage,
    result: kongkit::Result<T>,
    progress: &mut P,
) -> Result<T, ApplyError> {
    result.map_err(|source| {
        log::debug!("{stage} aborted: {source}");
        progress.on_operation_failed(stage, &source);
        ApplyError { stage, source }
    })
}

/// Run [`Reconciler::apply`] without progress reporting
pub fn apply_simple<G: Gateway + ?Sized>(
    gateway: &G,
    document: &Document,
) -> Result<ApplySummary, ApplyError> {
    Reconciler::new(gateway).apply(document, &mut NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RecordedProgress;
    use kongkit::{Call, Failure, MockGateway, Plugin, PluginScope, Route, Service};

    fn route(name: Option<&str>, service: &str, host: &str) -> Route {
        Route {
            name: name.map(str::to_string),
            service: service.to_string(),
            hosts: vec![host.to_string()],
            ..Route::default()
        }
    }

    /// One service `S1` and one route on `a.example.com`
    fn scenario_document() -> Document {
        Document {
            host: "kong:8001".into(),
            services: vec![Service::new("S1", "http://up:80")],
            routes: vec![route(None, "S1", "a.example.com")],
            ..Document::default()
        }
    }

    fn populated_gateway() -> MockGateway {
        let mut mock = MockGateway::new();
        mock.add_consumer("alice");
        mock.add_consumer("bob");
        mock.add_service("old");
        mock.add_route("old-route", "old");
        mock.add_plugin("rate-limiting");
        mock
    }

    fn position(calls: &[Call], pred: impl Fn(&Call) -> bool) -> Vec<usize> {
        calls
            .iter()
            .enumerate()
            .filter(|(_, c)| pred(c))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_scenario_empty_gateway() {
        let mock = MockGateway::new();
        let summary = apply_simple(&mock, &scenario_document()).unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                Call::ListConsumers,
                Call::ListRoutes(None),
                Call::ListServices,
                Call::ListPlugins,
                Call::UpsertService("S1".into()),
                Call::CreateRoute("S1".into()),
            ]
        );
        assert_eq!(summary.upserted, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.deleted, 0);
        assert_eq!(mock.services(), vec!["S1"]);
    }

    #[test]
    fn test_scenario_upsert_failure_stops_before_routes() {
        let mut mock = MockGateway::new();
        mock.fail_on(Call::UpsertService("S1".into()), Failure::Status(500));

        let err = apply_simple(&mock, &scenario_document()).unwrap_err();

        let calls = mock.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls.last(), Some(&Call::UpsertService("S1".into())));
        assert!(!calls.iter().any(|c| matches!(c, Call::CreateRoute(_))));
        assert_eq!(err.stage, Stage::Rebuild);
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.entity(), Some("S1"));
        assert!(err.to_string().contains("S1"));
    }

    #[test]
    fn test_scenario_existing_consumer_deleted_not_recreated() {
        let mut mock = MockGateway::new();
        mock.add_consumer("alice");
        let doc = Document {
            host: "kong:8001".into(),
            ..Document::default()
        };

        apply_simple(&mock, &doc).unwrap();

        let calls = mock.calls();
        assert_eq!(calls[0], Call::ListConsumers);
        assert_eq!(calls[1], Call::DeleteConsumer("alice".into()));
        assert!(!calls.iter().any(Call::is_create));
        assert!(mock.consumers().is_empty());
    }

    #[test]
    fn test_services_upserted_before_any_route() {
        let mock = MockGateway::new();
        let doc = Document {
            services: vec![
                Service::new("S1", "http://one:80"),
                Service::new("S2", "http://two:80"),
                Service::new("S3", "http://three:80"),
            ],
            routes: vec![
                route(Some("r3"), "S3", "c.example.com"),
                route(Some("r1"), "S1", "a.example.com"),
                route(None, "S2", "b.example.com"),
            ],
            ..Document::default()
        };

        apply_simple(&mock, &doc).unwrap();

        let calls = mock.calls();
        let upserts = position(&calls, |c| matches!(c, Call::UpsertService(_)));
        let creates = position(&calls, |c| matches!(c, Call::CreateRoute(_)));
        assert_eq!(upserts.len(), 3);
        assert_eq!(creates.len(), 3);
        assert!(upserts.iter().max() < creates.iter().min());
    }

    #[test]
    fn test_teardown_precedes_rebuild() {
        let mock = populated_gateway();
        let summary = apply_simple(&mock, &scenario_document()).unwrap();

        let calls = mock.calls();
        let deletes = position(&calls, Call::is_delete);
        let creates = position(&calls, Call::is_create);
        assert_eq!(deletes.len(), 5);
        assert!(deletes.iter().max() < creates.iter().min());
        assert_eq!(summary.deleted, 5);
        assert_eq!(summary.listed, 5);
        assert!(mock.plugins().is_empty());
        assert!(mock.consumers().is_empty());
    }

    #[test]
    fn test_teardown_order_by_kind() {
        let mock = populated_gateway();
        apply_simple(&mock, &Document::default()).unwrap();

        let deleted_kinds: Vec<EntityKind> = mock
            .calls()
            .iter()
            .filter(|c| c.is_delete())
            .map(Call::kind)
            .collect();
        assert_eq!(
            deleted_kinds,
            vec![
                EntityKind::Consumer,
                EntityKind::Consumer,
                EntityKind::Route,
                EntityKind::Service,
                EntityKind::Plugin
            ]
        );
    }

    #[test]
    fn test_failure_at_every_position_stops_immediately() {
        let doc = scenario_document();
        let total = {
            let mock = populated_gateway();
            apply_simple(&mock, &doc).unwrap();
            mock.calls().len()
        };

        for n in 1..=total {
            for failure in [Failure::Status(500), Failure::Transport] {
                let mut mock = populated_gateway();
                mock.fail_at(n, failure);

                let result = apply_simple(&mock, &doc);
                assert!(result.is_err(), "call {n} should have failed");
                assert_eq!(mock.calls().len(), n, "calls after failure at {n}");
            }
        }
    }

    #[test]
    fn test_delete_answered_with_ok_is_failure() {
        let mut mock = MockGateway::new();
        mock.add_consumer("alice");
        mock.fail_on(Call::DeleteConsumer("alice".into()), Failure::Status(200));

        let err = apply_simple(&mock, &scenario_document()).unwrap_err();
        assert_eq!(err.stage, Stage::Teardown);
        assert_eq!(err.status(), Some(200));
        assert_eq!(mock.calls().len(), 2);
        assert!(mock.services().is_empty());
    }

    #[test]
    fn test_second_apply_heals_partial_state() {
        let mut mock = MockGateway::new();
        mock.fail_on(Call::CreateRoute("S1".into()), Failure::Transport);
        assert!(apply_simple(&mock, &scenario_document()).is_err());
        assert_eq!(mock.services(), vec!["S1"]);
        assert!(mock.routes().is_empty());

        mock.clear_failures();
        let summary = apply_simple(&mock, &scenario_document()).unwrap();
        assert_eq!(summary.deleted, 1);
        assert_eq!(mock.services(), vec!["S1"]);
        assert_eq!(mock.routes().len(), 1);
    }

    #[test]
    fn test_repeated_apply_upserts_without_conflict() {
        let mock = MockGateway::new();
        let doc = Document {
            services: vec![Service::new("S1", "http://up:80")],
            routes: vec![route(Some("r1"), "S1", "a.example.com")],
            ..Document::default()
        };

        apply_simple(&mock, &doc).unwrap();
        apply_simple(&mock, &doc).unwrap();

        let upserts = position(&mock.calls(), |c| matches!(c, Call::UpsertService(_)));
        assert_eq!(upserts.len(), 2);
        assert_eq!(mock.routes().len(), 1);
    }

    #[test]
    fn test_route_for_undeclared_service_surfaces_as_status() {
        let mock = MockGateway::new();
        let doc = Document {
            services: vec![Service::new("S1", "http://up:80")],
            routes: vec![route(None, "ghost", "a.example.com")],
            ..Document::default()
        };

        let err = apply_simple(&mock, &doc).unwrap_err();
        assert_eq!(err.stage, Stage::Rebuild);
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_route_index_filled_for_named_routes() {
        let mock = MockGateway::new();
        let doc = Document {
            services: vec![Service::new("S1", "http://up:80")],
            routes: vec![
                route(Some("r1"), "S1", "a.example.com"),
                route(None, "S1", "b.example.com"),
            ],
            ..Document::default()
        };

        let summary = apply_simple(&mock, &doc).unwrap();
        assert_eq!(summary.route_index.len(), 1);
        let id = summary.route_index.get("r1").unwrap();
        assert!(mock.routes().iter().any(|(rid, _)| rid == id));
    }

    #[test]
    fn test_apply_never_creates_plugins() {
        let mock = MockGateway::new();
        let mut doc = scenario_document();
        doc.plugins.push(Plugin {
            name: "cors".into(),
            services: vec!["S1".into()],
            ..Plugin::default()
        });

        apply_simple(&mock, &doc).unwrap();
        assert!(
            !mock
                .calls()
                .iter()
                .any(|c| matches!(c, Call::CreatePlugin { .. }))
        );
    }

    #[test]
    fn test_apply_plugins_after_apply() {
        let mock = MockGateway::new();
        let doc = Document {
            services: vec![Service::new("S1", "http://up:80")],
            routes: vec![route(Some("r1"), "S1", "a.example.com")],
            plugins: vec![
                Plugin {
                    name: "prometheus".into(),
                    ..Plugin::default()
                },
                Plugin {
                    name: "cors".into(),
                    services: vec!["S1".into()],
                    routes: vec!["r1".into()],
                    ..Plugin::default()
                },
            ],
            ..Document::default()
        };

        let reconciler = Reconciler::new(&mock);
        let summary = reconciler.apply(&doc, &mut NoProgress).unwrap();
        let plugins = reconciler
            .apply_plugins(&doc, &summary.route_index, &mut NoProgress)
            .unwrap();
        assert_eq!(plugins.created, 3);

        let route_id = summary.route_index.get("r1").unwrap().to_string();
        let plugin_calls: Vec<Call> = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::CreatePlugin { .. }))
            .collect();
        assert_eq!(
            plugin_calls,
            vec![
                Call::CreatePlugin {
                    name: "prometheus".into(),
                    scope: PluginScope::Global
                },
                Call::CreatePlugin {
                    name: "cors".into(),
                    scope: PluginScope::Service("S1".into())
                },
                Call::CreatePlugin {
                    name: "cors".into(),
                    scope: PluginScope::Route(route_id)
                },
            ]
        );
    }

    #[test]
    fn test_apply_plugins_fails_fast() {
        let mock = MockGateway::new();
        let doc = Document {
            plugins: vec![
                Plugin {
                    name: "cors".into(),
                    services: vec!["missing".into()],
                    ..Plugin::default()
                },
                Plugin {
                    name: "prometheus".into(),
                    ..Plugin::default()
                },
            ],
            ..Document::default()
        };

        let err = Reconciler::new(&mock)
            .apply_plugins(&doc, &RouteIndex::new(), &mut NoProgress)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Plugins);
        assert_eq!(err.status(), Some(404));
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_progress_reports_each_operation() {
        let mut mock = MockGateway::new();
        mock.add_route("r-9", "old");
        mock.add_service("old");
        let mut progress = RecordedProgress::new();

        Reconciler::new(&mock)
            .apply(&scenario_document(), &mut progress)
            .unwrap();

        assert_eq!(
            progress.messages(),
            vec![
                "[HTTP 204] Route [r-9] deleted",
                "[HTTP 204] Service [old] deleted",
                "[HTTP 200] Successfully created/updated service: S1",
                "[HTTP 201] Route [<unnamed route of S1>] created for service S1",
            ]
        );
        assert_eq!(progress.stages_completed, vec![Stage::Teardown, Stage::Rebuild]);
        assert_eq!(progress.listed.len(), 4);
        assert!(progress.failures.is_empty());
    }

    #[test]
    fn test_progress_reports_failure_once() {
        let mut mock = MockGateway::new();
        mock.fail_on(Call::UpsertService("S1".into()), Failure::Status(500));
        let mut progress = RecordedProgress::new();

        let result = Reconciler::new(&mock).apply(&scenario_document(), &mut progress);
        assert!(result.is_err());

        assert_eq!(progress.failures.len(), 1);
        let (stage, message) = &progress.failures[0];
        assert_eq!(*stage, Stage::Rebuild);
        assert!(message.contains("500"));
        assert!(message.contains("S1"));
        assert_eq!(progress.stages_completed, vec![Stage::Teardown]);
    }
}
