use std::sync::Arc;

use http::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{ClientConfig, ErrorMode};
use crate::error::{CouchError, CouchResult, Operation, ServerFailure};
use crate::transport::{HttpTransport, RawResponse, Request, Transport};
use crate::types::system::{ServerInfo, ServerVersion, UuidsResponse};

/// Client for a single CouchDB server.
///
/// Cheap to clone; clones share the configuration and the transport. Every
/// method performs exactly one request, except
/// [`retrieve_document`](Client::retrieve_document) with revision info and
/// [`create_document`](Client::create_document) without an id, which may
/// issue a second one.
#[derive(Debug, Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client talking HTTP to the configured server.
    pub fn new(config: ClientConfig) -> CouchResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client on top of a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Client {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) async fn send(&self, request: Request) -> CouchResult<RawResponse> {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = self.transport.execute(request).await?;
        debug!(%method, %path, status = response.status.as_u16(), "couchdb request");
        Ok(response)
    }

    /// Resolve a non-success response according to the configured error mode.
    pub(crate) fn failed<T>(
        &self,
        operation: Operation,
        response: &RawResponse,
        fallback: T,
    ) -> CouchResult<T> {
        match self.config.error_mode {
            ErrorMode::Suppress => {
                warn!(
                    %operation,
                    status = response.status.as_u16(),
                    "couchdb request failed, returning fallback"
                );
                Ok(fallback)
            }
            ErrorMode::Surface => {
                let failure = ServerFailure::from_response(operation, response);
                debug!(
                    %operation,
                    failure_id = %failure.id,
                    title = %failure.title,
                    description = %failure.description,
                    "couchdb request failed"
                );
                Err(failure.into())
            }
        }
    }

    /// Decode a success body, reporting a shape mismatch as a protocol error.
    pub(crate) fn decode<T: DeserializeOwned>(
        operation: Operation,
        response: &RawResponse,
    ) -> CouchResult<T> {
        response
            .json()
            .map_err(|e| CouchError::protocol(operation, e))
    }

    /// Acquire one document id.
    ///
    /// With `server_uuids` disabled this never touches the network and cannot fail.
    pub async fn retrieve_uuid(&self) -> CouchResult<String> {
        if !self.config.server_uuids {
            return Ok(local_uuid());
        }

        let response = self.send(Request::get("/_uuids")).await?;
        if response.status == StatusCode::OK {
            let body: UuidsResponse = Self::decode(Operation::RetrieveUuid, &response)?;
            return body
                .uuids
                .into_iter()
                .next()
                .ok_or_else(|| CouchError::protocol(Operation::RetrieveUuid, "empty uuids list"));
        }

        self.failed(Operation::RetrieveUuid, &response, local_uuid())
    }

    /// Acquire `count` document ids.
    pub async fn retrieve_uuids(&self, count: usize) -> CouchResult<Vec<String>> {
        if !self.config.server_uuids {
            return Ok(local_uuids(count));
        }

        let response = self
            .send(Request::get("/_uuids").query("count", count))
            .await?;
        if response.status == StatusCode::OK {
            let body: UuidsResponse = Self::decode(Operation::RetrieveUuid, &response)?;
            return Ok(body.uuids);
        }

        self.failed(Operation::RetrieveUuid, &response, local_uuids(count))
    }

    /// Server version, or `None` if the server is not answering `200 OK`.
    pub async fn retrieve_status(&self) -> CouchResult<Option<String>> {
        let response = self.send(Request::get("/")).await?;
        if is_welcome(&response) {
            let body: ServerVersion = Self::decode(Operation::RetrieveStatus, &response)?;
            return Ok(Some(body.version));
        }

        self.failed(Operation::RetrieveStatus, &response, None)
    }

    /// Full welcome body of `GET /`, under the same rules as [`retrieve_status`](Client::retrieve_status).
    pub async fn server_info(&self) -> CouchResult<Option<ServerInfo>> {
        let response = self.send(Request::get("/")).await?;
        if is_welcome(&response) {
            return Self::decode(Operation::RetrieveStatus, &response).map(Some);
        }

        self.failed(Operation::RetrieveStatus, &response, None)
    }
}

// Some proxies answer 200 with another phrase; those do not count as a live server.
fn is_welcome(response: &RawResponse) -> bool {
    response.status == StatusCode::OK && response.reason.as_deref() == Some("OK")
}

fn local_uuid() -> String {
    Uuid::now_v7().simple().to_string()
}

fn local_uuids(count: usize) -> Vec<String> {
    (0..count).map(|_| local_uuid()).collect()
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::transport::mock::{client, response, MockTransport};

    #[tokio::test]
    async fn should_generate_local_uuids_without_network() {
        let transport = Arc::new(MockTransport::default());
        let client = Client::with_transport(
            ClientConfig::default().with_server_uuids(false),
            transport.clone(),
        );

        let a = client.retrieve_uuid().await.unwrap();
        let b = client.retrieve_uuid().await.unwrap();
        let many = client.retrieve_uuids(3).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert_eq!(many.len(), 3);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn should_fetch_single_uuid_from_server() {
        let (client, transport) = client(ErrorMode::Surface);
        transport.respond(200, r#"{"uuids":["6e1295ed6c29495e54cc05947f18c8af"]}"#);

        let uuid = client.retrieve_uuid().await.unwrap();

        assert_eq!(uuid, "6e1295ed6c29495e54cc05947f18c8af");
        let request = transport.last_request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/_uuids");
        assert!(request.query.is_empty());
    }

    #[tokio::test]
    async fn should_fetch_uuid_list_with_count() {
        let (client, transport) = client(ErrorMode::Surface);
        transport.respond(200, r#"{"uuids":["a","b"]}"#);

        let uuids = client.retrieve_uuids(2).await.unwrap();

        assert_eq!(uuids, vec!["a", "b"]);
        assert_eq!(transport.last_request().query_value("count"), Some("2"));
    }

    #[tokio::test]
    async fn should_fall_back_to_local_uuid_when_suppressing() {
        let (client, transport) = client(ErrorMode::Suppress);
        transport.respond(500, r#"{"error":"unknown","reason":"boom"}"#);

        let uuid = client.retrieve_uuid().await.unwrap();

        assert_eq!(uuid.len(), 32);
    }

    #[tokio::test]
    async fn should_fall_back_to_requested_number_of_local_uuids() {
        let (client, transport) = client(ErrorMode::Suppress);
        transport.respond(503, r#"{"error":"unavailable","reason":"boom"}"#);

        let uuids = client.retrieve_uuids(4).await.unwrap();

        assert_eq!(uuids.len(), 4);
        assert!(uuids.iter().all(|uuid| uuid.len() == 32));
        assert_eq!(transport.last_request().query_value("count"), Some("4"));
    }

    #[tokio::test]
    async fn should_surface_uuid_failure() {
        let (client, transport) = client(ErrorMode::Surface);
        transport.respond(500, r#"{"error":"unknown","reason":"boom"}"#);

        let err = client.retrieve_uuid().await.unwrap_err();

        assert_eq!(err.failure().unwrap().title, "failed to retrieve a uuid");
    }

    #[tokio::test]
    async fn should_report_empty_uuid_list_as_protocol_error() {
        let (client, transport) = client(ErrorMode::Suppress);
        transport.respond(200, r#"{"uuids":[]}"#);

        let err = client.retrieve_uuid().await.unwrap_err();

        assert!(matches!(
            err,
            CouchError::Protocol {
                operation: Operation::RetrieveUuid,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn should_return_server_version() {
        let (client, transport) = client(ErrorMode::Suppress);
        transport.respond(
            200,
            r#"{"couchdb":"Welcome","uuid":"85fb71bf700c17267fef77535820e371","vendor":{"name":"The Apache Software Foundation","version":"1.5.0"},"version":"1.5.0"}"#,
        );

        assert_eq!(client.retrieve_status().await.unwrap().as_deref(), Some("1.5.0"));
        assert_eq!(transport.last_request().path, "/");
    }

    #[tokio::test]
    async fn should_require_ok_reason_phrase() {
        let (client, transport) = client(ErrorMode::Suppress);
        let mut resp = response(200, r#"{"couchdb":"Welcome","version":"1.5.0"}"#);
        resp.reason = Some("Fine".to_owned());
        transport.respond_with(resp);

        assert_eq!(client.retrieve_status().await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_surface_status_failure() {
        let (client, transport) = client(ErrorMode::Surface);
        transport.respond(503, "");

        let err = client.retrieve_status().await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.failure().unwrap().title, "unable to get the server status");
    }

    #[tokio::test]
    async fn should_decode_server_info() {
        let (client, transport) = client(ErrorMode::Suppress);
        transport.respond(
            200,
            r#"{"couchdb":"Welcome","vendor":{"name":"The Apache Software Foundation","version":"1.5.0"},"version":"1.5.0"}"#,
        );

        let info = client.server_info().await.unwrap().unwrap();

        assert_eq!(info.couchdb, "Welcome");
        assert_eq!(info.vendor.unwrap().name, "The Apache Software Foundation");
    }

    #[tokio::test]
    async fn should_propagate_transport_errors_in_suppress_mode() {
        let (client, _transport) = client(ErrorMode::Suppress);

        let err = client.retrieve_status().await.unwrap_err();

        assert!(err.is_transport());
    }
}
