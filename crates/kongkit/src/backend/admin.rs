//! Admin API backend.
//!
//! This module provides [`AdminClient`], the HTTP implementation of
//! [`Gateway`]. One `ureq` agent is created per client and reused for every
//! request, so connections are pooled across a run.
//!
//! # Status handling
//!
//! The agent is configured not to turn 4xx/5xx responses into transport
//! errors. Every status is checked against the single code expected for the
//! call (see [`Action::expected_status`]).

use crate::backend::Gateway;
use crate::document::{Plugin, Route, Service};
use crate::error::{Error, Result, check_status};
use crate::types::{Action, EntityKind, PluginScope, path_segment};
use crate::wire::{CreatedRoute, Page, RemoteConsumer, RemotePlugin, RemoteRoute, RemoteService};
use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::Body;
use ureq::http::Response;

/// Global timeout bounding each request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Content type sent with every request.
const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Identifying client header.
const USER_AGENT: &str = "kongfig";

/// Blocking admin API client.
///
/// # Example
///
/// ```no_run
/// use kongkit::backend::Gateway;
/// use kongkit::backend::admin::AdminClient;
///
/// let client = AdminClient::new("http://localhost:8001");
/// let services = client.list_services().unwrap();
/// println!("Found {} services", services.data.len());
/// ```
pub struct AdminClient {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Admin API base URL, without trailing slash.
    base_url: String,
}

impl AdminClient {
    /// Create a client for `base_url` with the default timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom global request timeout.
    #[must_use]
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        let base_url: String = base_url.into();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the admin API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str, kind: EntityKind) -> Result<Response<Body>> {
        let url = self.url(path);
        log::debug!("GET {url}");
        self.agent
            .get(&url)
            .header("Content-Type", CONTENT_TYPE)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| Error::transport(Action::List, kind, path, e.to_string()))
    }

    fn delete(&self, path: &str, kind: EntityKind, entity: &str) -> Result<()> {
        let url = self.url(path);
        log::debug!("DELETE {url}");
        let response = self
            .agent
            .delete(&url)
            .header("Content-Type", CONTENT_TYPE)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| Error::transport(Action::Delete, kind, entity, e.to_string()))?;
        check_status(Action::Delete, kind, entity, response.status().as_u16())
    }

    fn send(
        &self,
        action: Action,
        path: &str,
        kind: EntityKind,
        entity: &str,
        payload: &[u8],
    ) -> Result<Response<Body>> {
        let url = self.url(path);
        let request = match action {
            Action::Upsert => {
                log::debug!("PUT {url}");
                self.agent.put(&url)
            }
            _ => {
                log::debug!("POST {url}");
                self.agent.post(&url)
            }
        };
        let response = request
            .header("Content-Type", CONTENT_TYPE)
            .header("User-Agent", USER_AGENT)
            .send(payload)
            .map_err(|e| Error::transport(action, kind, entity, e.to_string()))?;
        check_status(action, kind, entity, response.status().as_u16())?;
        Ok(response)
    }

    fn list<T: DeserializeOwned>(&self, path: &str, kind: EntityKind) -> Result<Page<T>> {
        let mut response = self.get(path, kind)?;
        check_status(Action::List, kind, path, response.status().as_u16())?;
        let page: Page<T> = decode(&mut response, Action::List, kind, path)?;
        if let Some(next) = &page.next {
            log::warn!("{path} has more results ({next}); only the first page is used");
        }
        Ok(page)
    }
}

fn decode<T: DeserializeOwned>(
    response: &mut Response<Body>,
    action: Action,
    kind: EntityKind,
    entity: &str,
) -> Result<T> {
    response
        .body_mut()
        .read_json()
        .map_err(|e| Error::invalid_response(action, kind, entity, e.to_string()))
}

impl Gateway for AdminClient {
    fn list_services(&self) -> Result<Page<RemoteService>> {
        self.list("/services", EntityKind::Service)
    }

    fn upsert_service(&self, service: &Service) -> Result<()> {
        let payload = serde_json::to_vec(service)?;
        let path = format!("/services/{}", path_segment(&service.name));
        self.send(
            Action::Upsert,
            &path,
            EntityKind::Service,
            &service.name,
            &payload,
        )?;
        Ok(())
    }

    fn delete_service(&self, name: &str) -> Result<()> {
        self.delete(
            &format!("/services/{}", path_segment(name)),
            EntityKind::Service,
            name,
        )
    }

    fn list_routes(&self, service: Option<&str>) -> Result<Page<RemoteRoute>> {
        let path = match service {
            Some(name) => format!("/services/{}/routes", path_segment(name)),
            None => "/routes".to_string(),
        };
        self.list(&path, EntityKind::Route)
    }

    fn create_route(&self, route: &Route) -> Result<String> {
        let payload = serde_json::to_vec(route)?;
        let path = format!("/services/{}/routes", path_segment(&route.service));
        let entity = format!("for service {}", route.service);
        let mut response =
            self.send(Action::Create, &path, EntityKind::Route, &entity, &payload)?;
        let created: CreatedRoute = decode(&mut response, Action::Create, EntityKind::Route, &entity)?;
        Ok(created.id)
    }

    fn delete_route(&self, id: &str) -> Result<()> {
        self.delete(&format!("/routes/{}", path_segment(id)), EntityKind::Route, id)
    }

    fn list_plugins(&self) -> Result<Page<RemotePlugin>> {
        self.list("/plugins", EntityKind::Plugin)
    }

    fn create_plugin(&self, plugin: &Plugin, scope: &PluginScope) -> Result<()> {
        let payload = serde_json::to_vec(plugin)?;
        let entity = format!("{} ({scope})", plugin.name);
        self.send(
            Action::Create,
            &scope.path(),
            EntityKind::Plugin,
            &entity,
            &payload,
        )?;
        Ok(())
    }

    fn delete_plugin(&self, name: &str) -> Result<()> {
        self.delete(
            &format!("/plugins/{}", path_segment(name)),
            EntityKind::Plugin,
            name,
        )
    }

    fn list_consumers(&self) -> Result<Page<RemoteConsumer>> {
        self.list("/consumers", EntityKind::Consumer)
    }

    fn delete_consumer(&self, username: &str) -> Result<()> {
        self.delete(
            &format!("/consumers/{}", path_segment(username)),
            EntityKind::Consumer,
            username,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Run a blocking client call off the async test runtime.
    async fn blocking<T, F>(server: &MockServer, call: F) -> T
    where
        T: Send + 'static,
        F: FnOnce(AdminClient) -> T + Send + 'static,
    {
        let client = AdminClient::new(server.uri());
        tokio::task::spawn_blocking(move || call(client))
            .await
            .unwrap()
    }

    async fn expect(server: &MockServer, verb: &str, at: &str, response: ResponseTemplate) {
        Mock::given(method(verb))
            .and(path(at))
            .and(header("Content-Type", CONTENT_TYPE))
            .and(header("User-Agent", USER_AGENT))
            .respond_with(response)
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let client = AdminClient::new("http://kong:8001/");
        assert_eq!(client.base_url(), "http://kong:8001");
        assert_eq!(client.url("/services"), "http://kong:8001/services");
    }

    #[tokio::test]
    async fn test_list_services_decodes_first_page() {
        let server = MockServer::start().await;
        expect(
            &server,
            "GET",
            "/services",
            ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "1", "name": "S1"}],
                "next": "/services?offset=x"
            })),
        )
        .await;

        let page = blocking(&server, |c| c.list_services()).await.unwrap();
        assert_eq!(page.data[0].identity(), "S1");
        assert_eq!(page.next.as_deref(), Some("/services?offset=x"));
    }

    #[tokio::test]
    async fn test_upsert_service_puts_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/services/S1"))
            .and(header("User-Agent", USER_AGENT))
            .and(body_json(json!({"name": "S1", "url": "http://up:80"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        blocking(&server, |c| c.upsert_service(&Service::new("S1", "http://up:80")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_service_server_error() {
        let server = MockServer::start().await;
        expect(
            &server,
            "PUT",
            "/services/S1",
            ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})),
        )
        .await;

        let err = blocking(&server, |c| c.upsert_service(&Service::new("S1", "http://up:80")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.entity(), Some("S1"));
    }

    #[tokio::test]
    async fn test_upsert_service_rejects_created() {
        let server = MockServer::start().await;
        expect(&server, "PUT", "/services/S1", ResponseTemplate::new(201)).await;

        let err = blocking(&server, |c| c.upsert_service(&Service::new("S1", "http://up:80")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(201));
    }

    #[tokio::test]
    async fn test_delete_with_ok_instead_of_no_content_fails() {
        let server = MockServer::start().await;
        expect(&server, "DELETE", "/consumers/alice", ResponseTemplate::new(200)).await;

        let err = blocking(&server, |c| c.delete_consumer("alice"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Status);
        assert_eq!(err.status(), Some(200));
    }

    #[tokio::test]
    async fn test_delete_route_no_content() {
        let server = MockServer::start().await;
        expect(&server, "DELETE", "/routes/r-1", ResponseTemplate::new(204)).await;

        blocking(&server, |c| c.delete_route("r-1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_consumer_escapes_fragment_marker() {
        let server = MockServer::start().await;
        expect(&server, "DELETE", "/consumers/team%231", ResponseTemplate::new(204)).await;

        blocking(&server, |c| c.delete_consumer("team#1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_consumer_escapes_space() {
        let server = MockServer::start().await;
        expect(&server, "DELETE", "/consumers/jane%20doe", ResponseTemplate::new(204)).await;

        blocking(&server, |c| c.delete_consumer("jane doe")).await.unwrap();
    }

    #[tokio::test]
    async fn test_service_paths_are_escaped() {
        let server = MockServer::start().await;
        expect(&server, "PUT", "/services/a%2Fb", ResponseTemplate::new(200)).await;
        expect(
            &server,
            "GET",
            "/services/a%2Fb/routes",
            ResponseTemplate::new(200).set_body_json(json!({"data": []})),
        )
        .await;
        expect(&server, "DELETE", "/services/a%2Fb", ResponseTemplate::new(204)).await;
        expect(&server, "DELETE", "/plugins/key%3Fauth", ResponseTemplate::new(204)).await;

        blocking(&server, |c| -> Result<()> {
            c.upsert_service(&Service::new("a/b", "http://up:80"))?;
            c.list_routes(Some("a/b"))?;
            c.delete_service("a/b")?;
            c.delete_plugin("key?auth")
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_create_route_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/S%201/routes"))
            .and(header("Content-Type", CONTENT_TYPE))
            .and(body_json(json!({"paths": ["/a"]})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "abc-123", "paths": ["/a"]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let route = Route {
            name: Some("r1".into()),
            service: "S 1".into(),
            paths: vec!["/a".into()],
            ..Route::default()
        };
        let id = blocking(&server, move |c| c.create_route(&route)).await.unwrap();
        assert_eq!(id, "abc-123");
    }

    #[tokio::test]
    async fn test_create_plugin_on_route_scope() {
        let server = MockServer::start().await;
        expect(
            &server,
            "POST",
            "/routes/r-9/plugins",
            ResponseTemplate::new(201).set_body_json(json!({"id": "p-1"})),
        )
        .await;

        let plugin = Plugin {
            name: "cors".into(),
            ..Plugin::default()
        };
        blocking(&server, move |c| {
            c.create_plugin(&plugin, &PluginScope::Route("r-9".into()))
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_list_with_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        expect(
            &server,
            "GET",
            "/plugins",
            ResponseTemplate::new(200).set_body_string("not json"),
        )
        .await;

        let err = blocking(&server, |c| c.list_plugins()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Format);
    }

    #[test]
    fn test_connection_refused_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = AdminClient::with_timeout(format!("http://{addr}"), Duration::from_secs(1));
        let err = client.list_consumers().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert_eq!(err.entity(), Some("/consumers"));
    }
}
