//! Attachment CRUD. Bodies are opaque bytes and never parsed.

use bytes::Bytes;

use crate::client::Client;
use crate::error::{CouchResult, Operation};
use crate::path;
use crate::transport::Request;
use crate::types::document::{Attachment, Document, RevResponse};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

impl Client {
    /// Attach `data` to revision `rev` of a document. Returns the document's new revision.
    ///
    /// Without a `rev` the server creates the document along with its first attachment.
    pub async fn create_attachment(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
        data: impl Into<Bytes>,
        content_type: Option<&str>,
    ) -> CouchResult<Option<String>> {
        let data = data.into();
        self.put_attachment(Operation::CreateAttachment, db, id, rev, name, data, content_type)
            .await
    }

    /// Replace an existing attachment. Returns the document's new revision.
    pub async fn update_attachment(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
        data: impl Into<Bytes>,
        content_type: Option<&str>,
    ) -> CouchResult<Option<String>> {
        let data = data.into();
        self.put_attachment(Operation::UpdateAttachment, db, id, rev, name, data, content_type)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn put_attachment(
        &self,
        operation: Operation,
        db: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> CouchResult<Option<String>> {
        let request = Request::put(path::attachment(db, id, name))
            .query_opt("rev", rev)
            .binary_body(data, content_type.unwrap_or(DEFAULT_CONTENT_TYPE));

        let response = self.send(request).await?;
        if response.status_in(&[200, 201, 202]) {
            let body: RevResponse = Self::decode(operation, &response)?;
            return Ok(Some(body.rev));
        }

        self.failed(operation, &response, None)
    }

    /// Remove an attachment. Returns the document's new revision.
    pub async fn delete_attachment(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
    ) -> CouchResult<Option<String>> {
        let request = Request::delete(path::attachment(db, id, name)).query_opt("rev", rev);

        let response = self.send(request).await?;
        if response.status_in(&[200, 201]) {
            let body: RevResponse = Self::decode(Operation::DeleteAttachment, &response)?;
            return Ok(Some(body.rev));
        }

        self.failed(Operation::DeleteAttachment, &response, None)
    }

    /// Fetch an attachment body, wrapped in a document that carries the
    /// caller's `id` and `rev`. Without a `rev` the current one is read and
    /// the returned `rev` is empty.
    pub async fn retrieve_attachment(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
    ) -> CouchResult<Option<Document>> {
        let request = Request::get(path::attachment(db, id, name)).query_opt("rev", rev);

        let response = self.send(request).await?;
        if !response.status_in(&[200, 201]) {
            return self.failed(Operation::RetrieveAttachment, &response, None);
        }

        let content_type = response.content_type().map(str::to_owned);
        let attachment = Attachment {
            name: name.to_owned(),
            content_type,
            data: response.body,
        };
        Ok(Some(Document {
            id: id.to_owned(),
            rev: rev.unwrap_or_default().to_owned(),
            attachments: Some(vec![attachment]),
            ..Document::default()
        }))
    }
}
