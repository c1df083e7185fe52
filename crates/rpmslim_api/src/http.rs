//! HTTP transport implementation.
//!
//! `HttpTransport` maps every [`PulpApi`] call onto the Pulp 3 REST API.
//! The actual HTTP client is abstracted behind [`HttpClient`] so tests can
//! route requests without a network; [`ReqwestClient`] is the production
//! implementation.

use crate::error::{ApiError, ApiResult};
use crate::resources::{
    CopyRequest, Distribution, Href, NewDistribution, NewPublication, NewRemote, NewRepository,
    Package, PackageQuery, Page, Publication, Remote, Repository, RepositoryVersion, SyncRequest,
    Task, TaskRef,
};
use crate::transport::PulpApi;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Path prefix of every Pulp API endpoint.
pub const API_ROOT: &str = "/pulp/api/v3/";

const REPOSITORIES: &str = "/pulp/api/v3/repositories/rpm/rpm/";
const REMOTES: &str = "/pulp/api/v3/remotes/rpm/rpm/";
const PUBLICATIONS: &str = "/pulp/api/v3/publications/rpm/rpm/";
const DISTRIBUTIONS: &str = "/pulp/api/v3/distributions/rpm/rpm/";
const PACKAGES: &str = "/pulp/api/v3/content/rpm/packages/";
const COPY: &str = "/pulp/api/v3/rpm/copy/";

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

/// Raw response returned by an [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// HTTP client abstraction.
///
/// Implementations send one request with an optional JSON body and return
/// the status and body. Transport-level failures are reported as strings.
pub trait HttpClient: Send + Sync {
    /// Sends a request.
    fn send(&self, method: Method, url: &str, body: Option<Vec<u8>>)
        -> Result<HttpResponse, String>;
}

/// Blocking `reqwest` client with optional basic authentication.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
    username: Option<String>,
    password: Option<String>,
}

impl ReqwestClient {
    /// Creates a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            username: None,
            password: None,
        })
    }

    /// Sets basic-auth credentials sent with every request.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

impl HttpClient for ReqwestClient {
    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, String> {
        let mut request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// [`PulpApi`] over HTTP with JSON bodies.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the service (e.g. "http://localhost:8080").
    base_url: String,
    /// HTTP client implementation.
    client: C,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a path or an absolute URL against the base URL.
    fn absolute(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.base_url, path_or_url)
        }
    }

    fn url_with_query(&self, path: &str, params: &[(&str, &str)]) -> ApiResult<String> {
        let mut url = Url::parse(&self.absolute(path))
            .map_err(|e| ApiError::Encode(format!("invalid URL for '{path}': {e}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.into())
    }

    fn send(&self, method: Method, url: &str, body: Option<Vec<u8>>) -> ApiResult<HttpResponse> {
        debug!(?method, url, "pulp request");
        let response = self
            .client
            .send(method, url, body)
            .map_err(ApiError::Transport)?;
        if response.status >= 400 {
            return Err(ApiError::http(
                response.status,
                String::from_utf8_lossy(&response.body).into_owned(),
            ));
        }
        Ok(response)
    }

    fn get<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self.send(Method::Get, url, None)?;
        decode(&response.body)
    }

    fn write<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> ApiResult<T> {
        let body = serde_json::to_vec(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        let response = self.send(method, url, Some(body))?;
        decode(&response.body)
    }

    fn delete(&self, href: &Href) -> ApiResult<Option<TaskRef>> {
        let response = self.send(Method::Delete, &self.absolute(href.as_str()), None)?;
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        decode(&response.body).map(Some)
    }

    /// Fetches every page of a list endpoint.
    fn list_all<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> ApiResult<Vec<T>> {
        let mut url = self.url_with_query(path, params)?;
        let mut items = Vec::new();
        loop {
            let page: Page<T> = self.get(&url)?;
            items.extend(page.results);
            match page.next {
                Some(next) => url = self.absolute(&next),
                None => break,
            }
        }
        Ok(items)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

impl<C: HttpClient> PulpApi for HttpTransport<C> {
    fn list_repositories(&self, name: &str) -> ApiResult<Vec<Repository>> {
        self.list_all(REPOSITORIES, &[("name", name)])
    }

    fn create_repository(&self, request: &NewRepository) -> ApiResult<Repository> {
        self.write(Method::Post, &self.absolute(REPOSITORIES), request)
    }

    fn read_repository(&self, href: &Href) -> ApiResult<Repository> {
        self.get(&self.absolute(href.as_str()))
    }

    fn delete_repository(&self, href: &Href) -> ApiResult<Option<TaskRef>> {
        self.delete(href)
    }

    fn sync_repository(&self, repository: &Href, request: &SyncRequest) -> ApiResult<TaskRef> {
        let url = self.absolute(&format!("{}sync/", repository.as_str()));
        self.write(Method::Post, &url, request)
    }

    fn read_repository_version(&self, href: &Href) -> ApiResult<RepositoryVersion> {
        self.get(&self.absolute(href.as_str()))
    }

    fn list_remotes(&self, name: &str) -> ApiResult<Vec<Remote>> {
        self.list_all(REMOTES, &[("name", name)])
    }

    fn create_remote(&self, request: &NewRemote) -> ApiResult<Remote> {
        self.write(Method::Post, &self.absolute(REMOTES), request)
    }

    fn delete_remote(&self, href: &Href) -> ApiResult<Option<TaskRef>> {
        self.delete(href)
    }

    fn list_publications(&self, repository_version: &Href) -> ApiResult<Vec<Publication>> {
        self.list_all(
            PUBLICATIONS,
            &[("repository_version", repository_version.as_str())],
        )
    }

    fn create_publication(&self, request: &NewPublication) -> ApiResult<TaskRef> {
        self.write(Method::Post, &self.absolute(PUBLICATIONS), request)
    }

    fn read_publication(&self, href: &Href) -> ApiResult<Publication> {
        self.get(&self.absolute(href.as_str()))
    }

    fn delete_publication(&self, href: &Href) -> ApiResult<Option<TaskRef>> {
        self.delete(href)
    }

    fn list_distributions(&self, name: &str) -> ApiResult<Vec<Distribution>> {
        self.list_all(DISTRIBUTIONS, &[("name", name)])
    }

    fn create_distribution(&self, request: &NewDistribution) -> ApiResult<TaskRef> {
        self.write(Method::Post, &self.absolute(DISTRIBUTIONS), request)
    }

    fn update_distribution(&self, href: &Href, request: &NewDistribution) -> ApiResult<TaskRef> {
        self.write(Method::Put, &self.absolute(href.as_str()), request)
    }

    fn delete_distribution(&self, href: &Href) -> ApiResult<Option<TaskRef>> {
        self.delete(href)
    }

    fn list_packages(&self, query: &PackageQuery) -> ApiResult<Page<Package>> {
        let names = query.names.join(",");
        let limit = query.limit.to_string();
        let offset = query.offset.to_string();
        let mut params = vec![
            ("repository_version", query.repository_version.as_str()),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ];
        if !query.names.is_empty() {
            params.push(("name__in", names.as_str()));
        }
        let url = self.url_with_query(PACKAGES, &params)?;
        self.get(&url)
    }

    fn copy_content(&self, request: &CopyRequest) -> ApiResult<TaskRef> {
        self.write(Method::Post, &self.absolute(COPY), request)
    }

    fn read_task(&self, href: &Href) -> ApiResult<Task> {
        self.get(&self.absolute(href.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::TaskState;
    use std::sync::Mutex;

    /// Routes requests by exact URL and records everything it was sent.
    struct TestClient {
        routes: Mutex<Vec<(Method, String, HttpResponse)>>,
        sent: Mutex<Vec<(Method, String, Option<String>)>>,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                routes: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn route(&self, method: Method, url: &str, status: u16, body: &str) {
            self.routes.lock().unwrap().push((
                method,
                url.to_string(),
                HttpResponse::new(status, body.as_bytes().to_vec()),
            ));
        }

        fn sent(&self) -> Vec<(Method, String, Option<String>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl HttpClient for TestClient {
        fn send(
            &self,
            method: Method,
            url: &str,
            body: Option<Vec<u8>>,
        ) -> Result<HttpResponse, String> {
            self.sent.lock().unwrap().push((
                method,
                url.to_string(),
                body.map(|b| String::from_utf8(b).unwrap()),
            ));
            self.routes
                .lock()
                .unwrap()
                .iter()
                .find(|(m, u, _)| *m == method && u == url)
                .map(|(_, _, response)| response.clone())
                .ok_or_else(|| format!("no route for {method:?} {url}"))
        }
    }

    const BASE: &str = "http://pulp.test";

    #[test]
    fn base_url_is_normalized() {
        let transport = HttpTransport::new("http://pulp.test/", TestClient::new());
        assert_eq!(transport.base_url(), BASE);
    }

    #[test]
    fn list_follows_every_page() {
        let client = TestClient::new();
        client.route(
            Method::Get,
            "http://pulp.test/pulp/api/v3/distributions/rpm/rpm/?name=el8",
            200,
            r#"{"count": 2, "next": "http://pulp.test/pulp/api/v3/distributions/rpm/rpm/?name=el8&offset=1",
                "results": [{"pulp_href": "/d/1/", "name": "el8", "base_path": "el8"}]}"#,
        );
        client.route(
            Method::Get,
            "http://pulp.test/pulp/api/v3/distributions/rpm/rpm/?name=el8&offset=1",
            200,
            r#"{"count": 2, "next": null,
                "results": [{"pulp_href": "/d/2/", "name": "el8", "base_path": "el8-b"}]}"#,
        );

        let transport = HttpTransport::new(BASE, client);
        let distributions = transport.list_distributions("el8").unwrap();
        assert_eq!(distributions.len(), 2);
        assert_eq!(distributions[1].pulp_href, Href::new("/d/2/"));
    }

    #[test]
    fn error_status_maps_to_http_error() {
        let client = TestClient::new();
        client.route(Method::Get, "http://pulp.test/pulp/api/v3/tasks/9/", 404, "not found");

        let transport = HttpTransport::new(BASE, client);
        let err = transport
            .read_task(&Href::new("/pulp/api/v3/tasks/9/"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn transport_failure_is_reported() {
        let transport = HttpTransport::new(BASE, TestClient::new());
        let err = transport.list_remotes("missing").unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn delete_without_body_returns_no_task() {
        let client = TestClient::new();
        client.route(Method::Delete, "http://pulp.test/p/1/", 204, "");
        client.route(
            Method::Delete,
            "http://pulp.test/r/1/",
            202,
            r#"{"task": "/pulp/api/v3/tasks/1/"}"#,
        );

        let transport = HttpTransport::new(BASE, client);
        assert_eq!(transport.delete_publication(&Href::new("/p/1/")).unwrap(), None);
        let task = transport.delete_repository(&Href::new("/r/1/")).unwrap();
        assert_eq!(task.unwrap().task, Href::new("/pulp/api/v3/tasks/1/"));
    }

    #[test]
    fn sync_posts_mirror_request_to_repository() {
        let client = TestClient::new();
        client.route(
            Method::Post,
            "http://pulp.test/r/1/sync/",
            202,
            r#"{"task": "/t/1/"}"#,
        );

        let transport = HttpTransport::new(BASE, client);
        let request = SyncRequest {
            remote: Href::new("/remote/1/"),
            mirror: true,
        };
        transport
            .sync_repository(&Href::new("/r/1/"), &request)
            .unwrap();

        let sent = transport.client.sent();
        let body: serde_json::Value =
            serde_json::from_str(sent[0].2.as_deref().unwrap()).unwrap();
        assert_eq!(body["mirror"], serde_json::Value::Bool(true));
        assert_eq!(body["remote"], "/remote/1/");
    }

    #[test]
    fn package_query_encodes_name_filter_and_paging() {
        let client = TestClient::new();
        client.route(
            Method::Get,
            "http://pulp.test/pulp/api/v3/content/rpm/packages/?repository_version=%2Fv%2F1%2F&limit=50&offset=100&name__in=bash%2Cglibc",
            200,
            r#"{"count": 101, "next": null, "results": [
                {"pulp_href": "/c/1/", "name": "bash", "version": "5.1", "release": "1", "arch": "x86_64"}
            ]}"#,
        );

        let transport = HttpTransport::new(BASE, client);
        let page = transport
            .list_packages(&PackageQuery {
                repository_version: Href::new("/v/1/"),
                names: vec!["bash".into(), "glibc".into()],
                limit: 50,
                offset: 100,
            })
            .unwrap();
        assert_eq!(page.results[0].name, "bash");
        assert!(!page.has_more());
    }

    #[test]
    fn task_read_decodes_state() {
        let client = TestClient::new();
        client.route(
            Method::Get,
            "http://pulp.test/t/1/",
            200,
            r#"{"pulp_href": "/t/1/", "name": "sync", "state": "running"}"#,
        );

        let transport = HttpTransport::new(BASE, client);
        let task = transport.read_task(&Href::new("/t/1/")).unwrap();
        assert_eq!(task.state, TaskState::Running);
        assert!(task.created_resources.is_empty());
    }
}
