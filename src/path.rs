//! Escaping of database, document and attachment names into URL paths.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except RFC 3986 unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Prefixes whose slash is part of CouchDB's routing, not of the id.
const RESERVED_PREFIXES: [&str; 2] = ["_design/", "_local/"];

pub(crate) fn url_encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

pub(crate) fn database(db: &str) -> String {
    format!("/{}", url_encode(db))
}

pub(crate) fn document(db: &str, id: &str) -> String {
    let id = RESERVED_PREFIXES
        .iter()
        .find_map(|prefix| {
            id.strip_prefix(prefix)
                .map(|rest| format!("{}{}", prefix, url_encode(rest)))
        })
        .unwrap_or_else(|| url_encode(id));
    format!("{}/{}", database(db), id)
}

pub(crate) fn attachment(db: &str, id: &str, name: &str) -> String {
    format!("{}/{}", document(db, id), url_encode(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_escape_database_names() {
        assert_eq!(database("t1"), "/t1");
        assert_eq!(database("team/orders+2"), "/team%2Forders%2B2");
    }

    #[test]
    fn should_escape_document_ids() {
        assert_eq!(document("db", "a b/c"), "/db/a%20b%2Fc");
        assert_eq!(document("db", "caf\u{e9}"), "/db/caf%C3%A9");
    }

    #[test]
    fn should_keep_reserved_prefix_slash() {
        assert_eq!(document("db", "_design/app"), "/db/_design/app");
        assert_eq!(document("db", "_local/a/b"), "/db/_local/a%2Fb");
    }

    #[test]
    fn should_escape_attachment_names() {
        assert_eq!(attachment("db", "doc", "photo 1.jpg"), "/db/doc/photo%201.jpg");
    }
}
