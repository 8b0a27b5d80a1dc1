use serde::{Deserialize, Serialize};
use crate::types::document::DocumentId;

/// Availability of one historical revision, as listed in `_revs_info`.
///
/// The set is closed: any status string the server invents later decodes to
/// [`RevisionStatus::Unknown`] instead of failing the whole response.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RevisionStatus {
    /// Revision body is stored and can be fetched
    Available,
    /// Revision body was compacted away
    Missing,
    /// Revision is a deletion tombstone
    Deleted,
    /// Status string this crate does not recognise
    #[serde(other)]
    Unknown,
}

/// One `(rev, status)` entry of a document's revision history
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    /// The revision identifier
    pub rev: String,
    /// Whether the revision body can still be fetched
    pub status: RevisionStatus,
}

/// Body of `GET /{db}/{id}?revs_info=true`; only the fields this crate reads
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct DocumentRevisions {
    /// Document ID
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Current revision
    #[serde(rename = "_rev")]
    pub rev: String,
    /// Revision history, newest first
    #[serde(rename = "_revs_info")]
    pub revs_info: Vec<RevisionInfo>,
}

/// `_revisions` member returned with `revs=true`: the newest generation number
/// and the revision hashes, newest first.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct RevisionHistory {
    /// Generation number of the newest revision
    pub start: u64,
    /// Revision hashes without their generation prefix
    pub ids: Vec<String>,
}

impl RevisionHistory {
    /// Full revision strings (`"{generation}-{hash}"`), newest first.
    pub fn revs(&self) -> Vec<String> {
        self.ids
            .iter()
            .zip((0..=self.start).rev())
            .map(|(hash, generation)| format!("{}-{}", generation, hash))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_unrecognised_status_as_unknown() {
        let info: RevisionInfo =
            serde_json::from_str(r#"{"rev":"3-abc","status":"bogus"}"#).unwrap();

        assert_eq!(info.status, RevisionStatus::Unknown);
        assert_eq!(info.rev, "3-abc");
    }

    #[test]
    fn should_decode_known_statuses() {
        let revs: DocumentRevisions = serde_json::from_str(
            r#"{
                "_id": "doc",
                "_rev": "3-c",
                "_revs_info": [
                    {"rev": "3-c", "status": "available"},
                    {"rev": "2-b", "status": "deleted"},
                    {"rev": "1-a", "status": "missing"}
                ]
            }"#,
        )
        .unwrap();

        let statuses: Vec<_> = revs.revs_info.iter().map(|info| info.status).collect();
        assert_eq!(
            statuses,
            vec![RevisionStatus::Available, RevisionStatus::Deleted, RevisionStatus::Missing]
        );
    }

    #[test]
    fn should_expand_revision_history() {
        let history = RevisionHistory {
            start: 3,
            ids: vec!["c".to_owned(), "b".to_owned(), "a".to_owned()],
        };

        assert_eq!(history.revs(), vec!["3-c", "2-b", "1-a"]);
    }
}
