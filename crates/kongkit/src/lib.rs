//! # kongkit
//!
//! Typed access to a Kong gateway's admin API.
//!
//! This crate provides:
//! - The declared-state [`Document`] (services, routes, plugins, consumers,
//!   credentials) as read from a configuration file
//! - The [`Gateway`] trait: list/create/update/delete per entity kind
//! - [`AdminClient`], a blocking HTTP implementation of [`Gateway`]
//! - [`MockGateway`], an in-memory implementation that records every call
//!
//! ## Example
//!
//! ```no_run
//! use kongkit::{AdminClient, Gateway, Service};
//!
//! let client = AdminClient::new("http://localhost:8001");
//! client
//!     .upsert_service(&Service::new("billing", "http://billing:8080"))
//!     .expect("upsert failed");
//!
//! for route in client.list_routes(Some("billing")).unwrap().data {
//!     println!("route {}", route.id);
//! }
//! ```
//!
//! ## Status codes
//!
//! Each call has exactly one success status: 200 for list and upsert, 201
//! for create, 204 for delete. Anything else, including another 2xx code,
//! is returned as [`Error::UnexpectedStatus`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
#[allow(missing_docs)]
pub mod document;
pub mod error;
pub mod types;
#[allow(missing_docs)]
pub mod wire;

pub use backend::admin::AdminClient;
pub use backend::{Call, Failure, Gateway, MockGateway};
pub use document::{Consumer, Credential, Document, Plugin, ReferenceIssue, Route, Service};
pub use error::{Error, ErrorCategory, Result, check_status};
pub use types::{Action, EntityKind, PluginScope};
pub use wire::{Page, RemoteConsumer, RemotePlugin, RemoteRoute, RemoteService};
