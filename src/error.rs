//! Error types and the per-operation status decision tables.
//!
//! A non-success HTTP status is only an error when the client runs in
//! [`ErrorMode::Surface`](crate::ErrorMode::Surface); it is then reported as a
//! [`ServerFailure`]. Transport and protocol problems are errors in every mode.

use std::backtrace::Backtrace;
use std::fmt;

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::transport::RawResponse;

/// Result type for client operations.
pub type CouchResult<T> = Result<T, CouchError>;

/// Boxed error raised by a [`Transport`](crate::Transport) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during client operations.
#[derive(Debug, thiserror::Error)]
pub enum CouchError {
    /// The server answered with a status the operation does not treat as success.
    #[error("{0}")]
    Server(Box<ServerFailure>),

    /// The request never produced an HTTP response (connection refused, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// A success response did not have the shape the operation expects.
    #[error("unexpected response to {operation}: {message}")]
    Protocol {
        operation: Operation,
        message: String,
    },

    /// The caller's value could not be encoded as JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The configured endpoint is not a valid URL.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<ServerFailure> for CouchError {
    fn from(failure: ServerFailure) -> Self {
        CouchError::Server(Box::new(failure))
    }
}

impl From<reqwest::Error> for CouchError {
    fn from(err: reqwest::Error) -> Self {
        CouchError::Transport(Box::new(err))
    }
}

impl CouchError {
    pub(crate) fn protocol(operation: Operation, message: impl fmt::Display) -> Self {
        CouchError::Protocol {
            operation,
            message: message.to_string(),
        }
    }

    /// Returns the structured server report if this is a surfaced failure.
    pub fn failure(&self) -> Option<&ServerFailure> {
        match self {
            CouchError::Server(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns the HTTP status if this is a surfaced failure.
    pub fn status(&self) -> Option<StatusCode> {
        self.failure().map(|failure| failure.status)
    }

    /// Returns true if the server rejected a write because of a stale or missing revision.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }

    /// Returns true if the server reported a missing database, document or attachment.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns true if no HTTP response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, CouchError::Transport(_))
    }
}

/// Terminal report of a non-success server response.
///
/// Carries no retry hint. `id` and `occurred_at` exist so a report can be
/// correlated with logs after the fact.
#[derive(Debug)]
pub struct ServerFailure {
    pub occurred_at: DateTime<Utc>,
    pub id: Uuid,
    /// Human summary derived from the operation and status code.
    pub title: String,
    /// `"[{error}] {reason}"` as reported by the server.
    pub description: String,
    pub stack_trace: String,
    pub status: StatusCode,
    pub operation: Operation,
}

/// CouchDB's failure body: `{"error": "...", "reason": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    reason: String,
}

impl ServerFailure {
    pub(crate) fn from_response(operation: Operation, response: &RawResponse) -> Self {
        let description = match response.json::<ErrorBody>() {
            Ok(body) => format!("[{}] {}", body.error, body.reason),
            // 304 and HEAD-like answers have no body; anything else is passed through as text
            Err(_) => response.text().trim().to_owned(),
        };

        ServerFailure {
            occurred_at: Utc::now(),
            id: Uuid::new_v4(),
            title: operation.title(response.status),
            description,
            stack_trace: Backtrace::capture().to_string(),
            status: response.status,
            operation,
        }
    }
}

impl fmt::Display for ServerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{}: {}", self.title, self.description)
        }
    }
}

/// Every operation the client maps onto the CouchDB REST surface.
///
/// Each operation owns a fixed lookup table from HTTP status to failure title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RetrieveUuid,
    RetrieveStatus,
    CreateDatabase,
    DeleteDatabase,
    ListDatabases,
    DatabaseInfo,
    CreateDocument,
    RetrieveDocument,
    RetrieveRevisionInfo,
    UpdateDocument,
    DeleteDocument,
    ListDocuments,
    CreateAttachment,
    UpdateAttachment,
    DeleteAttachment,
    RetrieveAttachment,
}

const BAD_DATABASE_NAME: &str = "400 Bad Request - invalid database name";
const ADMIN_REQUIRED: &str = "401 Unauthorized - server administrator privileges required";
const BAD_REQUEST: &str = "400 Bad Request - invalid request body or parameters";
const WRITE_REQUIRED: &str = "401 Unauthorized - write privileges required";
const READ_REQUIRED: &str = "401 Unauthorized - read privilege required";
const ATTACHMENT_NOT_FOUND: &str =
    "404 Not Found - specified database, document or attachment was not found";
const ATTACHMENT_CONFLICT: &str =
    "409 Conflict - document's revision wasn't specified or it's not the latest";

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::RetrieveUuid => "retrieve uuid",
            Operation::RetrieveStatus => "retrieve status",
            Operation::CreateDatabase => "create database",
            Operation::DeleteDatabase => "delete database",
            Operation::ListDatabases => "list databases",
            Operation::DatabaseInfo => "database info",
            Operation::CreateDocument => "create document",
            Operation::RetrieveDocument => "retrieve document",
            Operation::RetrieveRevisionInfo => "retrieve revision info",
            Operation::UpdateDocument => "update document",
            Operation::DeleteDocument => "delete document",
            Operation::ListDocuments => "list documents",
            Operation::CreateAttachment => "create attachment",
            Operation::UpdateAttachment => "update attachment",
            Operation::DeleteAttachment => "delete attachment",
            Operation::RetrieveAttachment => "retrieve attachment",
        }
    }

    /// Failure title for `status`. Codes missing from the table get a generic
    /// title carrying the raw code.
    pub fn title(self, status: StatusCode) -> String {
        let known = match (self, status.as_u16()) {
            (Operation::RetrieveUuid, _) => Some("failed to retrieve a uuid"),
            (Operation::RetrieveStatus, _) => Some("unable to get the server status"),
            (Operation::DatabaseInfo, _) => Some("database not found"),

            (Operation::CreateDatabase | Operation::DeleteDatabase, 400) => Some(BAD_DATABASE_NAME),
            (Operation::CreateDatabase | Operation::DeleteDatabase, 401) => Some(ADMIN_REQUIRED),
            (Operation::CreateDatabase, 412) => {
                Some("412 Precondition Failed - database already exists")
            }
            (Operation::DeleteDatabase, 404) => Some("404 Not Found - database doesn't exist"),

            (Operation::CreateDocument, 202) => {
                Some("202 Accepted - document data accepted, but not yet stored on disk")
            }
            (Operation::CreateDocument | Operation::DeleteDocument, 400) => Some(BAD_REQUEST),
            (Operation::CreateDocument | Operation::DeleteDocument, 401) => Some(WRITE_REQUIRED),
            (Operation::CreateDocument | Operation::DeleteDocument, 404) => {
                Some("404 Not Found - specified database or document id doesn't exist")
            }
            (Operation::CreateDocument, 409) => Some(
                "409 Conflict - document with the specified id already exists or specified \
                 revision is not latest for target document",
            ),
            (Operation::DeleteDocument, 409) => {
                Some("409 Conflict - specified revision is not the latest for target document")
            }

            (Operation::RetrieveDocument, 304) => {
                Some("304 Not Modified - document wasn't modified since specified revision")
            }
            (Operation::RetrieveDocument, 400) => {
                Some("400 Bad Request - the format of the request or revision was invalid")
            }
            (Operation::RetrieveDocument | Operation::RetrieveAttachment, 401) => {
                Some(READ_REQUIRED)
            }
            (Operation::RetrieveDocument, 404) => Some("404 Not Found - document not found"),

            (
                Operation::CreateAttachment
                | Operation::UpdateAttachment
                | Operation::DeleteAttachment,
                code,
            ) => match code {
                400 => Some(BAD_REQUEST),
                401 => Some(WRITE_REQUIRED),
                404 => Some(ATTACHMENT_NOT_FOUND),
                409 => Some(ATTACHMENT_CONFLICT),
                _ => None,
            },

            (Operation::RetrieveAttachment, 304) => Some(
                "304 Not Modified - attachment wasn't modified if ETag equals specified \
                 If-None-Match header",
            ),
            (Operation::RetrieveAttachment, 404) => Some(ATTACHMENT_NOT_FOUND),

            _ => None,
        };

        match known {
            Some(title) => title.to_owned(),
            None => format!("unknown status code encountered: {}", status.as_u16()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
