//! Shared vocabulary for admin API operations.
//!
//! Every call against the gateway is described by an [`Action`] applied to an
//! [`EntityKind`]. The action also fixes the single HTTP status code that
//! counts as success for that call.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters escaped inside a single URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode a remote identity for use as one path segment.
///
/// Names, usernames and ids are unrestricted on the gateway; a raw `#`, `?`
/// or `/` would otherwise address a different resource.
#[must_use]
pub fn path_segment(identity: &str) -> String {
    utf8_percent_encode(identity, SEGMENT).to_string()
}

/// Kinds of entity managed through the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Upstream service, addressed by name.
    Service,
    /// Route owned by a service, addressed by its remote id.
    Route,
    /// Plugin instance, addressed by plugin name.
    Plugin,
    /// Consumer, addressed by username.
    Consumer,
}

impl EntityKind {
    /// Singular, lowercase label used in messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Route => "route",
            Self::Plugin => "plugin",
            Self::Consumer => "consumer",
        }
    }

    /// Capitalized label used at the start of progress lines.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Service => "Service",
            Self::Route => "Route",
            Self::Plugin => "Plugin",
            Self::Consumer => "Consumer",
        }
    }

    /// Collection path segment on the admin API.
    #[must_use]
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Service => "services",
            Self::Route => "routes",
            Self::Plugin => "plugins",
            Self::Consumer => "consumers",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a single admin API call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// `GET` a collection.
    List,
    /// `PUT` keyed by name (create-or-replace).
    Upsert,
    /// `POST` a new entity.
    Create,
    /// `DELETE` a single entity.
    Delete,
}

impl Action {
    /// The only status code accepted as success for this action.
    ///
    /// There is no tolerance band: any other code, including other 2xx
    /// codes, is a failure.
    #[must_use]
    pub fn expected_status(&self) -> u16 {
        match self {
            Self::List | Self::Upsert => 200,
            Self::Create => 201,
            Self::Delete => 204,
        }
    }

    /// Whether `status` is the success code for this action.
    #[must_use]
    pub fn accepts(&self, status: u16) -> bool {
        status == self.expected_status()
    }

    /// Infinitive verb used in error messages.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Upsert => "create/update",
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }

    /// Past-tense verb used in progress lines.
    #[must_use]
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::List => "listed",
            Self::Upsert => "created/updated",
            Self::Create => "created",
            Self::Delete => "deleted",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Where a plugin instance is attached when created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PluginScope {
    /// Applies to every request through the gateway.
    Global,
    /// Attached to the named service.
    Service(String),
    /// Attached to the route with this remote id.
    Route(String),
}

impl PluginScope {
    /// Admin API path (without base URL) plugins are posted to.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Global => "/plugins".to_string(),
            Self::Service(name) => format!("/services/{}/plugins", path_segment(name)),
            Self::Route(id) => format!("/routes/{}/plugins", path_segment(id)),
        }
    }
}

impl fmt::Display for PluginScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Service(name) => write!(f, "service {name}"),
            Self::Route(id) => write!(f, "route {id}"),
        }
    }
}
