//! Server and database level response bodies.

use serde::{Deserialize, Deserializer, Serialize};

/// Update or purge sequence.
///
/// CouchDB 1.x reports plain integers; later releases report opaque strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Sequence {
    Number(u64),
    Opaque(String),
}

/// Snapshot of a database's statistics from `GET /{db}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatabaseInfo {
    pub committed_update_seq: Sequence,
    pub compact_running: bool,
    /// Size of live data inside the database file, in bytes.
    pub data_size: u64,
    pub db_name: String,
    pub disk_format_version: u32,
    /// Size of the database file on disk, in bytes.
    pub disk_size: u64,
    pub doc_count: u64,
    pub doc_del_count: u64,
    /// Microseconds since the epoch, as the server formats it.
    #[serde(deserialize_with = "string_or_number")]
    pub instance_start_time: String,
    pub purge_seq: Sequence,
    pub update_seq: Sequence,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Vendor {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Welcome body of `GET /`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub couchdb: String,
    #[serde(default)]
    pub uuid: Option<String>,
    pub version: String,
    #[serde(default)]
    pub vendor: Option<Vendor>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ServerVersion {
    pub version: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct UuidsResponse {
    pub uuids: Vec<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_decode_couchdb_1_database_info() {
        let info: DatabaseInfo = serde_json::from_str(
            r#"{
                "committed_update_seq": 292786,
                "compact_running": false,
                "data_size": 65031503,
                "db_name": "receipts",
                "disk_format_version": 6,
                "disk_size": 137433211,
                "doc_count": 6146,
                "doc_del_count": 64637,
                "instance_start_time": "1376269325408900",
                "purge_seq": 0,
                "update_seq": 292786
            }"#,
        )
        .unwrap();

        assert_eq!(info.db_name, "receipts");
        assert_eq!(info.update_seq, Sequence::Number(292786));
        assert_eq!(info.instance_start_time, "1376269325408900");
        assert_eq!(info.doc_count, 6146);
    }

    #[test]
    fn should_accept_opaque_sequences_and_numeric_start_time() {
        let info: DatabaseInfo = serde_json::from_str(
            r#"{
                "committed_update_seq": 0,
                "compact_running": true,
                "data_size": 0,
                "db_name": "t",
                "disk_format_version": 8,
                "disk_size": 0,
                "doc_count": 0,
                "doc_del_count": 0,
                "instance_start_time": 0,
                "purge_seq": "0-g1AAAA",
                "update_seq": "12-g1AAAA"
            }"#,
        )
        .unwrap();

        assert_eq!(info.update_seq, Sequence::Opaque("12-g1AAAA".to_owned()));
        assert_eq!(info.instance_start_time, "0");
    }

    #[test]
    fn should_reject_missing_fields() {
        let result = serde_json::from_str::<DatabaseInfo>(r#"{"db_name":"t"}"#);

        assert!(result.is_err());
    }
}
