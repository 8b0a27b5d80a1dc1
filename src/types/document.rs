use std::collections::BTreeMap;

use bytes::Bytes;
use serde::ser::Serialize;
use serde::Deserialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::{CouchError, CouchResult};
use crate::types::revision::{RevisionHistory, RevisionInfo};

pub type DocumentId = String;

/// A CouchDB document: identity plus an opaque JSON payload.
///
/// `rev` is empty only for a document that has not been written yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub id: DocumentId,
    pub rev: String,
    pub payload: Value,
    pub attachments: Option<Vec<Attachment>>,
    /// Revision history, newest first. Only populated when requested.
    pub revisions: Option<Vec<String>>,
    pub revs_info: Option<Vec<RevisionInfo>>,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, payload: Value) -> Self {
        Document {
            id: id.into(),
            payload,
            ..Document::default()
        }
    }

    pub fn is_persisted(&self) -> bool {
        !self.rev.is_empty()
    }

    /// Payload rendered with sorted keys and tab indentation.
    pub fn json_text(&self) -> serde_json::Result<String> {
        let mut out = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
        sorted_keys(self.payload.clone()).serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// A named binary blob attached to a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Row of a ranged enumeration, stripped down to identity.
#[derive(serde::Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub rev: String,
}

/// Options for [`Client::retrieve_document`](crate::Client::retrieve_document).
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    /// Fetch this revision instead of the current one.
    pub rev: Option<String>,
    /// Inline attachment bodies and decode them into [`Document::attachments`].
    pub attachments: bool,
    /// Populate [`Document::revisions`] from `_revisions`.
    pub revisions: bool,
    /// Populate [`Document::revs_info`] with a second request.
    pub revision_info: bool,
}

impl RetrieveOptions {
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    pub fn with_attachments(mut self) -> Self {
        self.attachments = true;
        self
    }

    pub fn with_revisions(mut self) -> Self {
        self.revisions = true;
        self
    }

    pub fn with_revision_info(mut self) -> Self {
        self.revision_info = true;
        self
    }
}

/// Key window for [`Client::list_documents_between`](crate::Client::list_documents_between).
///
/// Unset fields are left out of the query string entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentRange {
    pub start_key: Option<String>,
    pub end_key: Option<String>,
    pub descending: Option<bool>,
    pub limit: Option<u64>,
}

impl DocumentRange {
    pub fn start_key(mut self, key: impl Into<String>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    pub fn end_key(mut self, key: impl Into<String>) -> Self {
        self.end_key = Some(key.into());
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = Some(descending);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// `{"ok":true,"id":"...","rev":"..."}`
#[derive(Deserialize, Debug)]
pub(crate) struct WriteResponse {
    pub id: DocumentId,
    pub rev: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct RevResponse {
    pub rev: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct AllDocsRow {
    pub id: DocumentId,
    pub value: AllDocsValue,
}

#[derive(Deserialize, Debug)]
pub(crate) struct AllDocsValue {
    pub rev: String,
}

impl From<AllDocsRow> for DocumentRef {
    fn from(row: AllDocsRow) -> Self {
        DocumentRef {
            id: row.id,
            rev: row.value.rev,
        }
    }
}

/// Reserved members of a fetched document.
#[derive(Deserialize, Debug)]
pub(crate) struct DocumentMeta {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(rename = "_revisions", default)]
    pub revisions: Option<RevisionHistory>,
    #[serde(rename = "_attachments", default)]
    pub attachments: BTreeMap<String, InlineAttachment>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct InlineAttachment {
    #[serde(default)]
    pub content_type: Option<String>,
    /// Base64 body; absent for stubs.
    #[serde(default)]
    pub data: Option<String>,
}

impl DocumentMeta {
    /// Decode inlined attachment bodies, skipping stubs.
    pub fn decode_attachments(&self) -> Result<Vec<Attachment>, base64::DecodeError> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        self.attachments
            .iter()
            .filter_map(|(name, inline)| inline.data.as_ref().map(|data| (name, inline, data)))
            .map(|(name, inline, data)| {
                Ok(Attachment {
                    name: name.clone(),
                    content_type: inline.content_type.clone(),
                    data: Bytes::from(STANDARD.decode(data)?),
                })
            })
            .collect()
    }
}

/// Rebuild objects so their keys are inserted in lexicographic order, at every depth.
pub(crate) fn sorted_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sorted_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted_keys).collect()),
        other => other,
    }
}

/// Encode `value` as a request body with deterministic key order.
pub(crate) fn json_body<T: Serialize + ?Sized>(value: &T) -> CouchResult<Bytes> {
    let value = serde_json::to_value(value).map_err(CouchError::Serialization)?;
    let encoded = serde_json::to_vec(&sorted_keys(value)).map_err(CouchError::Serialization)?;
    Ok(Bytes::from(encoded))
}
