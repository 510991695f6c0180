//! # Reconciler
//!
//! Converges a gateway's live state to a declared document by tearing down
//! everything remote and rebuilding it from the declaration.
//!
//! This is deliberately not a minimal diff: every run deletes all remote
//! consumers, routes, services and plugins, then recreates services and
//! routes. A failed run can leave the gateway partially rebuilt; the next
//! run starts from scratch again.
//!
//! ## Core Concepts
//!
//! - **Gateway**: the admin API operations, from [`kongkit::Gateway`]
//! - **ExecutionPlan**: the ordered mutating steps for a stage
//! - **Reconciler**: runs teardown, rebuild and (separately) plugin stages
//! - **RouteIndex**: declared route name to remote id, scoped to one run
//!
//! ## Example
//!
//! ```
//! use kongkit::{Document, MockGateway, Route, Service};
//! use reconciler::{NoProgress, Reconciler};
//!
//! let document = Document {
//!     services: vec![Service::new("billing", "http://billing:8080")],
//!     routes: vec![Route {
//!         service: "billing".into(),
//!         paths: vec!["/billing".into()],
//!         ..Route::default()
//!     }],
//!     ..Document::default()
//! };
//!
//! let gateway = MockGateway::new();
//! let summary = Reconciler::new(&gateway)
//!     .apply(&document, &mut NoProgress)
//!     .unwrap();
//! assert_eq!(summary.upserted, 1);
//! assert_eq!(summary.created, 1);
//! ```
//!
//! ## Provider Traits
//!
//! - [`kongkit::Gateway`]: the remote side (HTTP client or mock)
//! - [`ProgressCallback`]: receives one event per operation
//!
//! Printing is left to the caller, so the engine can be driven from a CLI
//! or a test without output.

pub mod context;
pub mod executor;
pub mod planner;
pub mod types;

// Re-export main types at crate root
pub use context::{NoProgress, ProgressCallback, RecordedProgress};
pub use executor::{Reconciler, apply_simple};
pub use planner::{ExecutionPlan, Step, TEARDOWN_ORDER};
pub use types::{ApplyError, ApplySummary, Outcome, RouteIndex, Stage};
