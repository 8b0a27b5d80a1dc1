//! # CouchDB client
//!
//! Typed access to the CouchDB 1.5 REST API: database lifecycle, document CRUD
//! with revision tracking, attachments and ranged enumeration of documents.
//!
//! Every operation is a method on [`Client`] that performs one HTTP round trip
//! and maps the answer onto a typed result. How a non-success status is
//! reported depends on the configured [`ErrorMode`]:
//!
//! - [`ErrorMode::Suppress`] (default) turns it into `None`, `false` or an
//!   empty list;
//! - [`ErrorMode::Surface`] turns it into a [`CouchError::Server`] carrying a
//!   [`ServerFailure`] report.
//!
//! Transport failures and malformed success bodies are errors in both modes.
//!
//! Conflicting writes are never retried here. A stale revision comes back as a
//! 409 outcome ([`CouchError::is_conflict`]); re-fetch, re-apply and try again.
//!
//! # Example
//!
//! ```ignore
//! use couch_client::{Client, ClientConfig, ErrorMode, RetrieveOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> couch_client::CouchResult<()> {
//!     let client = Client::new(ClientConfig::default().with_error_mode(ErrorMode::Surface))?;
//!
//!     client.create_database("t1").await?;
//!     let doc = client
//!         .create_document("t1", None, &json!({"a": 1}))
//!         .await?
//!         .expect("surface mode never yields None");
//!
//!     let fetched = client
//!         .retrieve_document("t1", &doc.id, RetrieveOptions::default())
//!         .await?;
//!     println!("{:?}", fetched);
//!
//!     client.delete_document("t1", &doc.id, &doc.rev).await?;
//!     client.delete_database("t1").await?;
//!     Ok(())
//! }
//! ```

mod attachment;
mod client;
mod database;
mod document;
mod path;

pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use attachment::DEFAULT_CONTENT_TYPE;
pub use client::Client;
pub use config::{AuthMethod, ClientConfig, ErrorMode, SUPPORTED_VERSION};
pub use error::{BoxError, CouchError, CouchResult, Operation, ServerFailure};
pub use transport::{Body, HttpTransport, RawResponse, Request, Transport};
pub use types::document::{
    Attachment, Document, DocumentId, DocumentRange, DocumentRef, RetrieveOptions,
};
pub use types::revision::{RevisionInfo, RevisionStatus};
pub use types::system::{DatabaseInfo, Sequence, ServerInfo, Vendor};
