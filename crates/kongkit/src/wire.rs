//! Admin API response payloads.
//!
//! List endpoints wrap their items in a [`Page`]. Only the fields needed to
//! address an entity for deletion are decoded; everything else the gateway
//! returns is ignored.

use serde::Deserialize;

/// One page of a list response.
///
/// `next` is the cursor to the following page. It is decoded but never
/// followed: only the first page of each collection is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            next: None,
        }
    }
}

/// Service as returned by `GET /services`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteService {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RemoteService {
    /// Name, or the id for services created without one.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.name.as_deref().or(self.id.as_deref()).unwrap_or_default()
    }
}

/// Route as returned by `GET /routes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteRoute {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl RemoteRoute {
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.id
    }
}

/// Plugin as returned by `GET /plugins`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemotePlugin {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl RemotePlugin {
    /// Plugins are deleted by name; one instance per name is assumed.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.name
    }
}

/// Consumer as returned by `GET /consumers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteConsumer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub custom_id: Option<String>,
}

impl RemoteConsumer {
    /// Username, or the id for consumers identified only by `custom_id`.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.username
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or_default()
    }
}

/// Body of a `201 Created` route response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedRoute {
    pub id: String,
}
