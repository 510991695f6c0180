//! Declared-state document.
//!
//! The document is the desired end state of the gateway: which services,
//! routes, plugins, consumers and credentials should exist. It is read once
//! per run and never mutated while reconciling.
//!
//! The same structs double as JSON request bodies. Fields the admin API must
//! not receive (a route's owning service, a plugin's targets) are skipped on
//! serialization and travel in the request path instead.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Top-level declared state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Admin API host, with optional port (`kong:8001`).
    #[serde(default)]
    pub host: String,
    /// Talk to the admin API over TLS.
    #[serde(default)]
    pub https: bool,
    /// Free-form document version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub plugins: Vec<Plugin>,
    #[serde(default)]
    pub consumers: Vec<Consumer>,
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

impl Document {
    /// Base URL of the admin API (`http://host` or `https://host`).
    #[must_use]
    pub fn admin_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{scheme}://{}", self.host)
    }

    /// Check cross-entity references and identity uniqueness.
    ///
    /// Reconciliation never calls this: a route pointing at an unknown
    /// service only surfaces as a rejected create on the gateway. Callers
    /// opt in to catch such problems before any network traffic.
    #[must_use]
    pub fn validate_references(&self) -> Vec<ReferenceIssue> {
        let mut issues = Vec::new();

        let services: HashSet<&str> = self.services.iter().map(|s| s.name.as_str()).collect();
        let consumers: HashSet<&str> = self.consumers.iter().map(|c| c.username.as_str()).collect();

        for name in duplicates(self.services.iter().map(|s| s.name.as_str())) {
            issues.push(ReferenceIssue::DuplicateService { name });
        }
        for username in duplicates(self.consumers.iter().map(|c| c.username.as_str())) {
            issues.push(ReferenceIssue::DuplicateConsumer { username });
        }
        for name in duplicates(self.plugins.iter().map(|p| p.name.as_str())) {
            issues.push(ReferenceIssue::DuplicatePlugin { name });
        }

        for route in &self.routes {
            if !services.contains(route.service.as_str()) {
                issues.push(ReferenceIssue::RouteServiceMissing {
                    route: route.display_name(),
                    service: route.service.clone(),
                });
            }
        }

        for plugin in &self.plugins {
            for service in &plugin.services {
                if !services.contains(service.as_str()) {
                    issues.push(ReferenceIssue::PluginServiceMissing {
                        plugin: plugin.name.clone(),
                        service: service.clone(),
                    });
                }
            }
        }

        for credential in &self.credentials {
            if !consumers.contains(credential.target.as_str()) {
                issues.push(ReferenceIssue::CredentialConsumerMissing {
                    credential: credential.name.clone(),
                    consumer: credential.target.clone(),
                });
            }
        }

        issues
    }
}

fn duplicates<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dupes = BTreeSet::new();
    for key in keys {
        if !seen.insert(key) {
            dupes.insert(key.to_string());
        }
    }
    dupes.into_iter().collect()
}

/// Upstream service. Identity key: `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_timeout: Option<u64>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl Service {
    /// Service with just a name and upstream URL.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Route owned by a service.
///
/// The gateway assigns the route id on creation; the document never has one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Local label, used to look up the created route's id within a run.
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    /// Name of the owning service. Sent in the path, not the body.
    #[serde(skip_serializing)]
    pub service: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_path: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_host: Option<bool>,
}

impl Route {
    /// Name if declared, otherwise a description built from the owning service.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("<unnamed route of {}>", self.service),
        }
    }
}

/// Plugin instance. Identity key: `name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Service names to attach to.
    #[serde(default, skip_serializing)]
    pub services: Vec<String>,
    /// Route names declared in this document, or remote route ids.
    #[serde(default, skip_serializing)]
    pub routes: Vec<String>,
    /// Plugin-specific settings; shape depends on `name`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

impl Plugin {
    /// Plugin without targets applies globally.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.services.is_empty() && self.routes.is_empty()
    }
}

/// Consumer. Identity key: `username`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

/// Credential for a consumer.
///
/// Declared only; reconciliation does not create credentials remotely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Credential kind (`jwt`, `key-auth`, ...).
    pub name: String,
    /// Username of the owning consumer.
    pub target: String,
    /// Kind-specific fields (`id`, `key`, `secret`, ...).
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// Problem found by [`Document::validate_references`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceIssue {
    RouteServiceMissing { route: String, service: String },
    PluginServiceMissing { plugin: String, service: String },
    CredentialConsumerMissing { credential: String, consumer: String },
    DuplicateService { name: String },
    DuplicateConsumer { username: String },
    DuplicatePlugin { name: String },
}

impl fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RouteServiceMissing { route, service } => {
                write!(f, "route {route} references undeclared service {service}")
            }
            Self::PluginServiceMissing { plugin, service } => {
                write!(f, "plugin {plugin} targets undeclared service {service}")
            }
            Self::CredentialConsumerMissing {
                credential,
                consumer,
            } => write!(
                f,
                "credential {credential} targets undeclared consumer {consumer}"
            ),
            Self::DuplicateService { name } => write!(f, "service {name} is declared more than once"),
            Self::DuplicateConsumer { username } => {
                write!(f, "consumer {username} is declared more than once")
            }
            Self::DuplicatePlugin { name } => write!(f, "plugin {name} is declared more than once"),
        }
    }
}
