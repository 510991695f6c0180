//! Ordering of reconciliation steps
//!
//! Teardown and rebuild run in opposite dependency order. Dependents go
//! first on the way down and last on the way up:
//!
//! ```text
//! teardown:  consumers -> routes -> services -> plugins
//! rebuild:   services  -> routes
//! plugins:   (separate) global / per service / per route
//! ```

use crate::types::RouteIndex;
use kongkit::{Document, EntityKind, Plugin, PluginScope, Route, Service};

/// Kinds deleted during teardown, in order.
///
/// Routes go before services because the gateway refuses to delete a
/// service still referenced by a route. Plugins go last since they can hang
/// off either.
pub const TEARDOWN_ORDER: [EntityKind; 4] = [
    EntityKind::Consumer,
    EntityKind::Route,
    EntityKind::Service,
    EntityKind::Plugin,
];

/// One mutating call in a plan
#[derive(Debug, Clone, PartialEq)]
pub enum Step<'a> {
    UpsertService(&'a Service),
    CreateRoute(&'a Route),
    CreatePlugin {
        plugin: &'a Plugin,
        scope: PluginScope,
    },
}

impl Step<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::UpsertService(_) => EntityKind::Service,
            Self::CreateRoute(_) => EntityKind::Route,
            Self::CreatePlugin { .. } => EntityKind::Plugin,
        }
    }
}

/// Ordered list of mutating steps
#[derive(Debug, Default)]
pub struct ExecutionPlan<'a> {
    pub steps: Vec<Step<'a>>,
}

impl<'a> ExecutionPlan<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every service upsert, then every route create, each in document order
    pub fn rebuild(document: &'a Document) -> Self {
        let services = document.services.iter().map(Step::UpsertService);
        let routes = document.routes.iter().map(Step::CreateRoute);
        Self {
            steps: services.chain(routes).collect(),
        }
    }

    /// One create per plugin target; a plugin without targets is global
    ///
    /// Route targets are looked up in `routes` by declared name. Values that
    /// are not a known name are used as remote route ids.
    pub fn plugins(document: &'a Document, routes: &RouteIndex) -> Self {
        let mut steps = Vec::new();
        for plugin in &document.plugins {
            if plugin.is_global() {
                steps.push(Step::CreatePlugin {
                    plugin,
                    scope: PluginScope::Global,
                });
                continue;
            }
            for service in &plugin.services {
                steps.push(Step::CreatePlugin {
                    plugin,
                    scope: PluginScope::Service(service.clone()),
                });
            }
            for route in &plugin.routes {
                steps.push(Step::CreatePlugin {
                    plugin,
                    scope: PluginScope::Route(routes.resolve(route).to_string()),
                });
            }
        }
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
