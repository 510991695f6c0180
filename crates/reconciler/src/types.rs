//! Core types for reconciliation runs

use kongkit::{Action, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Phase of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Listing and deleting every remote entity
    Teardown,
    /// Upserting services, then creating routes
    Rebuild,
    /// Creating declared plugins
    Plugins,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Teardown => "teardown",
            Self::Rebuild => "rebuild",
            Self::Plugins => "plugins",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single successful operation against the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub stage: Stage,
    pub action: Action,
    pub kind: EntityKind,
    /// Identity of the entity acted upon
    pub entity: String,
    /// Extra placement info (`for service S1`, `on route r-1`)
    pub detail: Option<String>,
    /// HTTP status the gateway answered with
    pub status: u16,
}

impl Outcome {
    /// Outcome of `action` on `entity`, with the status the action requires
    pub fn new(stage: Stage, action: Action, kind: EntityKind, entity: impl Into<String>) -> Self {
        Self {
            stage,
            action,
            kind,
            entity: entity.into(),
            detail: None,
            status: action.expected_status(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Progress line, e.g. `[HTTP 204] Route [r-1] deleted`
    pub fn message(&self) -> String {
        let body = match self.action {
            Action::Upsert => format!(
                "Successfully {} {}: {}",
                self.action.past_tense(),
                self.kind,
                self.entity
            ),
            _ => format!(
                "{} [{}] {}",
                self.kind.title(),
                self.entity,
                self.action.past_tense()
            ),
        };
        match &self.detail {
            Some(detail) => format!("[HTTP {}] {body} {detail}", self.status),
            None => format!("[HTTP {}] {body}", self.status),
        }
    }
}

/// Declared route name to remote route id, for one run only
///
/// Filled while routes are created so plugins declared against a route name
/// can be attached to the route the gateway just created. Never shared
/// between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteIndex {
    ids: BTreeMap<String, String>,
}

impl RouteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        self.ids.insert(name.into(), id.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    /// Remote id for a declared route name, or the value itself when it is
    /// not a known name (assumed to already be a remote id)
    pub fn resolve<'a>(&'a self, name_or_id: &'a str) -> &'a str {
        self.get(name_or_id).unwrap_or(name_or_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Summary of a reconciliation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplySummary {
    /// Remote entities found while listing
    pub listed: usize,
    pub deleted: usize,
    pub upserted: usize,
    pub created: usize,
    /// Collections that had more than one page (only the first was read)
    pub truncated: Vec<EntityKind>,
    pub route_index: RouteIndex,
}

impl ApplySummary {
    /// Total number of mutating operations
    pub fn total_changes(&self) -> usize {
        self.deleted + self.upserted + self.created
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: ApplySummary) {
        self.listed += other.listed;
        self.deleted += other.deleted;
        self.upserted += other.upserted;
        self.created += other.created;
        self.truncated.extend(other.truncated);
        for (name, id) in other.route_index.iter() {
            self.route_index.insert(name, id);
        }
    }
}

/// First failure of a run; nothing after it was attempted
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct ApplyError {
    pub stage: Stage,
    #[source]
    pub source: kongkit::Error,
}

impl ApplyError {
    pub fn status(&self) -> Option<u16> {
        self.source.status()
    }

    pub fn entity(&self) -> Option<&str> {
        self.source.entity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_message() {
        let outcome = Outcome::new(Stage::Teardown, Action::Delete, EntityKind::Route, "r-1");
        assert_eq!(outcome.message(), "[HTTP 204] Route [r-1] deleted");
    }

    #[test]
    fn test_upsert_message() {
        let outcome = Outcome::new(Stage::Rebuild, Action::Upsert, EntityKind::Service, "S1");
        assert_eq!(
            outcome.message(),
            "[HTTP 200] Successfully created/updated service: S1"
        );
    }

    #[test]
    fn test_create_message_with_detail() {
        let outcome = Outcome::new(Stage::Rebuild, Action::Create, EntityKind::Route, "r1")
            .with_detail("for service S1");
        assert_eq!(
            outcome.message(),
            "[HTTP 201] Route [r1] created for service S1"
        );
    }

    #[test]
    fn test_route_index_resolve() {
        let mut index = RouteIndex::new();
        index.insert("r1", "abc-123");
        assert_eq!(index.resolve("r1"), "abc-123");
        assert_eq!(index.resolve("def-456"), "def-456");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_summary_merge() {
        let mut a = ApplySummary {
            deleted: 2,
            upserted: 1,
            ..Default::default()
        };
        let mut b = ApplySummary {
            created: 3,
            ..Default::default()
        };
        b.route_index.insert("r1", "id-1");
        a.merge(b);
        assert_eq!(a.total_changes(), 6);
        assert_eq!(a.route_index.get("r1"), Some("id-1"));
    }

    #[test]
    fn test_apply_error_display() {
        let err = ApplyError {
            stage: Stage::Rebuild,
            source: kongkit::Error::unexpected_status(
                Action::Upsert,
                EntityKind::Service,
                "S1",
                500,
            ),
        };
        let display = err.to_string();
        assert!(display.starts_with("rebuild failed"));
        assert!(display.contains("S1"));
        assert!(display.contains("500"));
        assert_eq!(err.status(), Some(500));
    }
}
