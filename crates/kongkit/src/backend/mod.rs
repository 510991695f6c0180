//! Gateway trait and implementations.
//!
//! [`Gateway`] is the narrow interface the reconciler drives. The real
//! implementation is [`admin::AdminClient`], which talks HTTP to the admin
//! API.
//!
//! # Testing
//!
//! Use [`MockGateway`] to run reconciliation without network access. It keeps
//! remote state in memory and records every call:
//!
//! ```
//! use kongkit::backend::{Call, Gateway, MockGateway};
//!
//! let mut mock = MockGateway::new();
//! mock.add_consumer("alice");
//!
//! mock.delete_consumer("alice").unwrap();
//! assert_eq!(mock.calls(), vec![Call::DeleteConsumer("alice".into())]);
//! assert!(mock.consumers().is_empty());
//! ```

pub mod admin;

use crate::document::{Plugin, Route, Service};
use crate::error::{Error, Result, check_status};
use crate::types::{Action, EntityKind, PluginScope};
use crate::wire::{Page, RemoteConsumer, RemotePlugin, RemoteRoute, RemoteService};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations against the gateway's admin API.
///
/// Each call is a single request. A call succeeds only when the response
/// status equals [`Action::expected_status`] for that call; everything else
/// is an error. Implementations hold no business logic.
pub trait Gateway: Send + Sync {
    /// `GET /services`
    fn list_services(&self) -> Result<Page<RemoteService>>;

    /// `PUT /services/{name}`, create-or-replace keyed by name.
    fn upsert_service(&self, service: &Service) -> Result<()>;

    /// `DELETE /services/{name}`
    fn delete_service(&self, name: &str) -> Result<()>;

    /// `GET /routes`, or `GET /services/{service}/routes` when scoped.
    fn list_routes(&self, service: Option<&str>) -> Result<Page<RemoteRoute>>;

    /// `POST /services/{route.service}/routes`
    ///
    /// Returns the id the gateway assigned to the new route.
    fn create_route(&self, route: &Route) -> Result<String>;

    /// `DELETE /routes/{id}`
    fn delete_route(&self, id: &str) -> Result<()>;

    /// `GET /plugins`
    fn list_plugins(&self) -> Result<Page<RemotePlugin>>;

    /// `POST` the plugin to the collection matching `scope`.
    fn create_plugin(&self, plugin: &Plugin, scope: &PluginScope) -> Result<()>;

    /// `DELETE /plugins/{name}`
    fn delete_plugin(&self, name: &str) -> Result<()>;

    /// `GET /consumers`
    fn list_consumers(&self) -> Result<Page<RemoteConsumer>>;

    /// `DELETE /consumers/{username}`
    fn delete_consumer(&self, username: &str) -> Result<()>;
}

/// A call recorded by [`MockGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    ListServices,
    UpsertService(String),
    DeleteService(String),
    /// Optional owning-service scope.
    ListRoutes(Option<String>),
    /// Owning service name.
    CreateRoute(String),
    DeleteRoute(String),
    ListPlugins,
    CreatePlugin { name: String, scope: PluginScope },
    DeletePlugin(String),
    ListConsumers,
    DeleteConsumer(String),
}

impl Call {
    /// Action this call performs.
    #[must_use]
    pub fn action(&self) -> Action {
        match self {
            Self::ListServices | Self::ListRoutes(_) | Self::ListPlugins | Self::ListConsumers => {
                Action::List
            }
            Self::UpsertService(_) => Action::Upsert,
            Self::CreateRoute(_) | Self::CreatePlugin { .. } => Action::Create,
            Self::DeleteService(_)
            | Self::DeleteRoute(_)
            | Self::DeletePlugin(_)
            | Self::DeleteConsumer(_) => Action::Delete,
        }
    }

    /// Entity kind this call targets.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::ListServices | Self::UpsertService(_) | Self::DeleteService(_) => {
                EntityKind::Service
            }
            Self::ListRoutes(_) | Self::CreateRoute(_) | Self::DeleteRoute(_) => EntityKind::Route,
            Self::ListPlugins | Self::CreatePlugin { .. } | Self::DeletePlugin(_) => {
                EntityKind::Plugin
            }
            Self::ListConsumers | Self::DeleteConsumer(_) => EntityKind::Consumer,
        }
    }

    /// Entity identity (or collection path for lists) used in errors.
    #[must_use]
    pub fn entity(&self) -> String {
        match self {
            Self::ListServices => "/services".to_string(),
            Self::ListRoutes(None) => "/routes".to_string(),
            Self::ListRoutes(Some(service)) => format!("/services/{service}/routes"),
            Self::ListPlugins => "/plugins".to_string(),
            Self::ListConsumers => "/consumers".to_string(),
            Self::CreateRoute(service) => format!("for service {service}"),
            Self::CreatePlugin { name, scope } => format!("{name} ({scope})"),
            Self::UpsertService(id)
            | Self::DeleteService(id)
            | Self::DeleteRoute(id)
            | Self::DeletePlugin(id)
            | Self::DeleteConsumer(id) => id.clone(),
        }
    }

    /// Whether this call removes remote state.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.action() == Action::Delete
    }

    /// Whether this call adds remote state.
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(self.action(), Action::Create | Action::Upsert)
    }
}

/// Scripted failure for a [`MockGateway`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Respond with this status instead of the expected one.
    Status(u16),
    /// Fail before any response, as if the connection dropped.
    Transport,
}

#[derive(Debug, Clone)]
struct MockRoute {
    id: String,
    name: Option<String>,
    service: String,
}

#[derive(Debug, Default)]
struct MockState {
    services: Vec<String>,
    routes: Vec<MockRoute>,
    plugins: Vec<String>,
    consumers: Vec<String>,
    next_id: usize,
    calls: Vec<Call>,
    failures: HashMap<Call, Failure>,
    fail_at: Option<(usize, Failure)>,
}

/// In-memory gateway for testing without network access.
///
/// Status codes produced by the mock go through the same strict check as
/// the HTTP client, so a scripted `Failure::Status(200)` on a delete is a
/// failure just like it would be against a real gateway.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    /// Create a new empty mock gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an existing remote service.
    pub fn add_service(&mut self, name: impl Into<String>) {
        self.state().services.push(name.into());
    }

    /// Seed an existing remote route.
    pub fn add_route(&mut self, id: impl Into<String>, service: impl Into<String>) {
        self.state().routes.push(MockRoute {
            id: id.into(),
            name: None,
            service: service.into(),
        });
    }

    /// Seed an existing remote plugin.
    pub fn add_plugin(&mut self, name: impl Into<String>) {
        self.state().plugins.push(name.into());
    }

    /// Seed an existing remote consumer.
    pub fn add_consumer(&mut self, username: impl Into<String>) {
        self.state().consumers.push(username.into());
    }

    /// Make every occurrence of `call` fail.
    pub fn fail_on(&mut self, call: Call, failure: Failure) {
        self.state().failures.insert(call, failure);
    }

    /// Make the `n`th recorded call (1-based) fail, whatever it is.
    pub fn fail_at(&mut self, n: usize, failure: Failure) {
        self.state().fail_at = Some((n, failure));
    }

    /// Drop every scripted failure; recorded calls and state are kept.
    pub fn clear_failures(&mut self) {
        let mut state = self.state();
        state.failures.clear();
        state.fail_at = None;
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Names of services currently held.
    pub fn services(&self) -> Vec<String> {
        self.state().services.clone()
    }

    /// `(id, owning service)` of routes currently held.
    pub fn routes(&self) -> Vec<(String, String)> {
        self.state()
            .routes
            .iter()
            .map(|r| (r.id.clone(), r.service.clone()))
            .collect()
    }

    /// Names of plugins currently held.
    pub fn plugins(&self) -> Vec<String> {
        self.state().plugins.clone()
    }

    /// Usernames of consumers currently held.
    pub fn consumers(&self) -> Vec<String> {
        self.state().consumers.clone()
    }

    /// Record `call` and resolve its status.
    ///
    /// `natural` is the status the gateway would return without scripting;
    /// `None` means the expected success code.
    fn respond(state: &mut MockState, call: Call, natural: Option<u16>) -> Result<()> {
        state.calls.push(call.clone());
        let position = state.calls.len();

        let scripted = state.failures.get(&call).copied().or_else(|| {
            state
                .fail_at
                .filter(|(n, _)| *n == position)
                .map(|(_, failure)| failure)
        });

        let action = call.action();
        let status = match scripted {
            Some(Failure::Transport) => {
                return Err(Error::transport(
                    action,
                    call.kind(),
                    call.entity(),
                    "connection refused",
                ));
            }
            Some(Failure::Status(status)) => status,
            None => natural.unwrap_or_else(|| action.expected_status()),
        };

        check_status(action, call.kind(), &call.entity(), status)
    }
}

impl Gateway for MockGateway {
    fn list_services(&self) -> Result<Page<RemoteService>> {
        let mut state = self.state();
        Self::respond(&mut state, Call::ListServices, None)?;
        let data = state
            .services
            .iter()
            .map(|name| RemoteService {
                id: None,
                name: Some(name.clone()),
            })
            .collect();
        Ok(Page { data, next: None })
    }

    fn upsert_service(&self, service: &Service) -> Result<()> {
        let mut state = self.state();
        Self::respond(&mut state, Call::UpsertService(service.name.clone()), None)?;
        if !state.services.contains(&service.name) {
            state.services.push(service.name.clone());
        }
        Ok(())
    }

    fn delete_service(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        let natural = state.routes.iter().any(|r| r.service == name).then_some(400);
        Self::respond(&mut state, Call::DeleteService(name.to_string()), natural)?;
        state.services.retain(|s| s != name);
        Ok(())
    }

    fn list_routes(&self, service: Option<&str>) -> Result<Page<RemoteRoute>> {
        let mut state = self.state();
        Self::respond(&mut state, Call::ListRoutes(service.map(str::to_string)), None)?;
        let data = state
            .routes
            .iter()
            .filter(|r| service.is_none_or(|s| r.service == s))
            .map(|r| RemoteRoute {
                id: r.id.clone(),
                name: r.name.clone(),
            })
            .collect();
        Ok(Page { data, next: None })
    }

    fn create_route(&self, route: &Route) -> Result<String> {
        let mut state = self.state();
        let natural = if !state.services.contains(&route.service) {
            Some(404)
        } else if route.name.is_some() && state.routes.iter().any(|r| r.name == route.name) {
            Some(409)
        } else {
            None
        };
        Self::respond(&mut state, Call::CreateRoute(route.service.clone()), natural)?;

        state.next_id += 1;
        let id = format!("route-{}", state.next_id);
        state.routes.push(MockRoute {
            id: id.clone(),
            name: route.name.clone(),
            service: route.service.clone(),
        });
        Ok(id)
    }

    fn delete_route(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        Self::respond(&mut state, Call::DeleteRoute(id.to_string()), None)?;
        state.routes.retain(|r| r.id != id);
        Ok(())
    }

    fn list_plugins(&self) -> Result<Page<RemotePlugin>> {
        let mut state = self.state();
        Self::respond(&mut state, Call::ListPlugins, None)?;
        let data = state
            .plugins
            .iter()
            .map(|name| RemotePlugin {
                id: None,
                name: name.clone(),
                enabled: Some(true),
            })
            .collect();
        Ok(Page { data, next: None })
    }

    fn create_plugin(&self, plugin: &Plugin, scope: &PluginScope) -> Result<()> {
        let mut state = self.state();
        let natural = match scope {
            PluginScope::Global => None,
            PluginScope::Service(name) => (!state.services.contains(name)).then_some(404),
            PluginScope::Route(id) => (!state.routes.iter().any(|r| &r.id == id)).then_some(404),
        };
        let call = Call::CreatePlugin {
            name: plugin.name.clone(),
            scope: scope.clone(),
        };
        Self::respond(&mut state, call, natural)?;
        state.plugins.push(plugin.name.clone());
        Ok(())
    }

    fn delete_plugin(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        Self::respond(&mut state, Call::DeletePlugin(name.to_string()), None)?;
        state.plugins.retain(|p| p != name);
        Ok(())
    }

    fn list_consumers(&self) -> Result<Page<RemoteConsumer>> {
        let mut state = self.state();
        Self::respond(&mut state, Call::ListConsumers, None)?;
        let data = state
            .consumers
            .iter()
            .map(|username| RemoteConsumer {
                id: None,
                username: Some(username.clone()),
                custom_id: None,
            })
            .collect();
        Ok(Page { data, next: None })
    }

    fn delete_consumer(&self, username: &str) -> Result<()> {
        let mut state = self.state();
        Self::respond(&mut state, Call::DeleteConsumer(username.to_string()), None)?;
        state.consumers.retain(|c| c != username);
        Ok(())
    }
}
