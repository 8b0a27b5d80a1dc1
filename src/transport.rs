//! HTTP transport adapter.
//!
//! The protocol mapper only ever talks to a [`Transport`]: it hands over a
//! [`Request`] whose path is already escaped and receives a [`RawResponse`].
//! [`HttpTransport`] is the `reqwest` implementation used by [`Client::new`].
//!
//! [`Client::new`]: crate::Client::new

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{AuthMethod, ClientConfig};
use crate::error::{CouchError, CouchResult};

const FULL_COMMIT: HeaderName = HeaderName::from_static("x-couch-full-commit");

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Encoded JSON document.
    Json(Bytes),
    /// Opaque attachment bytes, sent verbatim.
    Binary { data: Bytes, content_type: String },
}

/// A single CouchDB request, relative to the configured endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Escaped path, starting with `/`.
    pub path: String,
    /// Query parameters in the order they were added.
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a query parameter.
    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_owned(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present. Absent values are
    /// omitted entirely rather than sent empty.
    pub fn query_opt<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    pub fn json_body(mut self, json: Bytes) -> Self {
        self.body = Some(Body::Json(json));
        self
    }

    pub fn binary_body(mut self, data: Bytes, content_type: impl Into<String>) -> Self {
        self.body = Some(Body::Binary {
            data,
            content_type: content_type.into(),
        });
        self
    }

    /// Returns the value of the first query parameter called `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_write(&self) -> bool {
        self.method == Method::PUT || self.method == Method::DELETE
    }
}

/// What came back from the server, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    /// Reason phrase of the status line, when the transport knows it.
    pub reason: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// Returns true if the status code is one of `codes`.
    pub fn status_in(&self, codes: &[u16]) -> bool {
        codes.contains(&self.status.as_u16())
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// Executes requests against a CouchDB server.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn execute(&self, request: Request) -> CouchResult<RawResponse>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    full_commit: bool,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> CouchResult<Self> {
        let scheme = if config.tls { "https" } else { "http" };
        let endpoint = Url::parse(&format!("{}://{}:{}/", scheme, config.host, config.port))?;
        if config.timeout.is_zero() {
            return Err(CouchError::Config("timeout must be greater than zero".to_owned()));
        }

        let builder = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .timeout(config.timeout);

        #[cfg(any(
            feature = "native-tls",
            feature = "native-tls-alpn",
            feature = "native-tls-vendored",
            feature = "rustls-tls",
            feature = "rustls-tls-manual-roots",
            feature = "rustls-tls-webpki-roots",
            feature = "rustls-tls-native-roots"
        ))]
        let builder = builder.danger_accept_invalid_certs(!config.verify_tls);

        Ok(HttpTransport {
            client: builder.build()?,
            endpoint,
            full_commit: config.full_commit,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Headers added to a single request on top of the client defaults.
    fn request_headers(&self, request: &Request) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self.full_commit && request.is_write() {
            headers.insert(FULL_COMMIT, HeaderValue::from_static("true"));
        }
        headers
    }

    fn url_for(&self, request: &Request) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path(&request.path);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> CouchResult<RawResponse> {
        let url = self.url_for(&request);
        let builder = self
            .client
            .request(request.method.clone(), url)
            .headers(self.request_headers(&request));

        let builder = match request.body {
            Some(Body::Json(json)) => builder.header(CONTENT_TYPE, "application/json").body(json),
            Some(Body::Binary { data, content_type }) => {
                builder.header(CONTENT_TYPE, content_type).body(data)
            }
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            // hyper only keeps non-canonical phrases, and reqwest does not expose them
            reason: status.canonical_reason().map(str::to_owned),
            headers,
            body,
        })
    }
}

/// Headers sent with every request: Basic credentials when configured.
fn default_headers(config: &ClientConfig) -> CouchResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let (AuthMethod::Basic, Some(user)) = (config.auth_method, &config.user) {
        let credentials = format!("{}:{}", user, config.password.as_deref().unwrap_or(""));
        let mut value = HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(credentials)))
            .map_err(|e| CouchError::Config(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::ErrorMode;
    use crate::Client;

    pub(crate) fn response(status: u16, body: &str) -> RawResponse {
        let status = StatusCode::from_u16(status).unwrap();
        RawResponse {
            status,
            reason: status.canonical_reason().map(str::to_owned),
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_owned()),
        }
    }

    /// Replays canned responses in order and records every request.
    #[derive(Debug, Default)]
    pub(crate) struct MockTransport {
        responses: Mutex<VecDeque<RawResponse>>,
        requests: Mutex<Vec<Request>>,
    }

    impl MockTransport {
        pub(crate) fn respond(&self, status: u16, body: &str) -> &Self {
            self.respond_with(response(status, body))
        }

        pub(crate) fn respond_with(&self, response: RawResponse) -> &Self {
            self.responses.lock().unwrap().push_back(response);
            self
        }

        pub(crate) fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn last_request(&self) -> Request {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: Request) -> CouchResult<RawResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CouchError::Transport("connection refused".into()))
        }
    }

    pub(crate) fn client(mode: ErrorMode) -> (Client, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        let config = ClientConfig::default().with_error_mode(mode);
        (Client::with_transport(config, transport.clone()), transport)
    }
}
