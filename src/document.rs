//! Document CRUD, revision introspection and ranged enumeration.

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::client::Client;
use crate::error::{CouchError, CouchResult, Operation};
use crate::path;
use crate::transport::Request;
use crate::types::document::{
    json_body, AllDocsResponse, Document, DocumentMeta, DocumentRange, DocumentRef,
    RetrieveOptions, WriteResponse,
};
use crate::types::revision::{DocumentRevisions, RevisionInfo};

impl Client {
    /// Store `value` as a new document.
    ///
    /// Without an `id`, one is acquired through [`retrieve_uuid`](Client::retrieve_uuid).
    /// The returned document carries the server's write response as its payload.
    pub async fn create_document<T: Serialize + ?Sized>(
        &self,
        db: &str,
        id: Option<&str>,
        value: &T,
    ) -> CouchResult<Option<Document>> {
        let id = match id {
            Some(id) => id.to_owned(),
            None => self.retrieve_uuid().await?,
        };
        let body = json_body(value)?;

        let response = self
            .send(Request::put(path::document(db, &id)).json_body(body))
            .await?;
        if response.status == StatusCode::CREATED {
            let written: WriteResponse = Self::decode(Operation::CreateDocument, &response)?;
            let payload: Value = Self::decode(Operation::CreateDocument, &response)?;
            return Ok(Some(Document {
                id: written.id,
                rev: written.rev,
                payload,
                ..Document::default()
            }));
        }

        self.failed(Operation::CreateDocument, &response, None)
    }

    pub async fn retrieve_document(
        &self,
        db: &str,
        id: &str,
        options: RetrieveOptions,
    ) -> CouchResult<Option<Document>> {
        let request = Request::get(path::document(db, id))
            .query("attachments", options.attachments)
            .query_opt("rev", options.rev.as_deref())
            .query_opt("revs", options.revisions.then_some(true));

        let response = self.send(request).await?;
        if response.status != StatusCode::OK {
            return self.failed(Operation::RetrieveDocument, &response, None);
        }

        let meta: DocumentMeta = Self::decode(Operation::RetrieveDocument, &response)?;
        let payload: Value = Self::decode(Operation::RetrieveDocument, &response)?;

        let attachments = if options.attachments {
            let decoded = meta
                .decode_attachments()
                .map_err(|e| CouchError::protocol(Operation::RetrieveDocument, e))?;
            Some(decoded)
        } else {
            None
        };
        let revisions = if options.revisions {
            meta.revisions.as_ref().map(|history| history.revs())
        } else {
            None
        };
        let revs_info = if options.revision_info {
            self.retrieve_revision_info(db, id).await?
        } else {
            None
        };

        Ok(Some(Document {
            id: meta.id,
            rev: meta.rev,
            payload,
            attachments,
            revisions,
            revs_info,
        }))
    }

    pub async fn retrieve_revision_info(
        &self,
        db: &str,
        id: &str,
    ) -> CouchResult<Option<Vec<RevisionInfo>>> {
        let request = Request::get(path::document(db, id)).query("revs_info", true);

        let response = self.send(request).await?;
        if response.status_in(&[200, 201]) {
            let revisions: DocumentRevisions =
                Self::decode(Operation::RetrieveRevisionInfo, &response)?;
            return Ok(Some(revisions.revs_info));
        }

        self.failed(Operation::RetrieveRevisionInfo, &response, None)
    }

    /// Replace a document with `document.payload`.
    ///
    /// The payload must carry the current `_rev`; the server rejects stale ones.
    pub async fn update_document(&self, db: &str, document: &Document) -> CouchResult<bool> {
        let body = json_body(&document.payload)?;

        let response = self
            .send(Request::put(path::document(db, &document.id)).json_body(body))
            .await?;
        if response.status_in(&[200, 201]) {
            return Ok(true);
        }

        self.failed(Operation::UpdateDocument, &response, false)
    }

    pub async fn delete_document(&self, db: &str, id: &str, rev: &str) -> CouchResult<bool> {
        let request = Request::delete(path::document(db, id)).query("rev", rev);

        let response = self.send(request).await?;
        if response.status_in(&[200, 201, 202]) {
            return Ok(true);
        }

        self.failed(Operation::DeleteDocument, &response, false)
    }

    /// Every document in `db`, as `(id, rev)` pairs ordered by id.
    pub async fn list_all_documents(&self, db: &str) -> CouchResult<Vec<DocumentRef>> {
        self.list_documents_between(db, DocumentRange::default()).await
    }

    pub async fn list_documents_between(
        &self,
        db: &str,
        range: DocumentRange,
    ) -> CouchResult<Vec<DocumentRef>> {
        // key parameters are JSON values on the wire
        let start_key = range.start_key.map(Value::String);
        let end_key = range.end_key.map(Value::String);

        let request = Request::get(format!("{}/_all_docs", path::database(db)))
            .query_opt("startkey", start_key)
            .query_opt("endkey", end_key)
            .query_opt("descending", range.descending)
            .query_opt("limit", range.limit);

        let response = self.send(request).await?;
        if response.status == StatusCode::OK {
            let body: AllDocsResponse = Self::decode(Operation::ListDocuments, &response)?;
            return Ok(body.rows.into_iter().map(DocumentRef::from).collect());
        }

        self.failed(Operation::ListDocuments, &response, Vec::new())
    }
}
