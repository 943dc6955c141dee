//! Bucket and object metadata records and the lookup result shape.
//!
//! The gateway consumes these records from the metadata stores; it never
//! writes them. [`ObjectRecord`] carries everything the GET pipeline needs
//! to frame a response: content length, layout id, digest, timestamps,
//! content type, ordered user attributes, and optional placement/version
//! identifiers.

use chrono::{DateTime, Utc};

/// Outcome of a metadata lookup.
///
/// `FailedToLaunch` means the store could not even start the operation
/// (backend session down); it maps to `ServiceUnavailable`. `Other` covers
/// in-flight store failures and maps to `InternalError`.
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    /// The record was found.
    Present(T),
    /// No such record.
    Missing,
    /// The lookup could not be launched.
    FailedToLaunch,
    /// The lookup was launched but failed.
    Other,
}

/// A bucket as seen by the read path.
#[derive(Debug, Clone)]
pub struct BucketRecord {
    /// The bucket name.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// An object as seen by the read path.
#[derive(Debug, Clone)]
pub struct ObjectRecord {
    /// Backend object identifier.
    pub object_id: u128,
    /// The object key within its bucket.
    pub key: String,
    /// Object size in bytes.
    pub content_length: u64,
    /// Key into the layout table; selects the stripe-unit size.
    pub layout_id: u32,
    /// Hex MD5 digest of the object body (unquoted).
    pub md5_hex: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// MIME type reported in `Content-Type`.
    pub content_type: String,
    /// User attributes echoed verbatim as response headers, in insertion
    /// order (`x-amz-meta-*` and similar).
    pub user_attributes: Vec<(String, String)>,
    /// Optional placement identifier forwarded to the backend reader.
    pub placement_id: Option<u32>,
    /// Optional version identifier.
    pub version_id: Option<String>,
    /// Number of tags on the object; reported via `x-amz-tagging-count`
    /// when non-zero.
    pub tag_count: usize,
}

impl ObjectRecord {
    /// The ETag value: the hex MD5 wrapped in literal double quotes, as AWS
    /// formats it.
    #[must_use]
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.md5_hex)
    }

    /// `Last-Modified` formatted as an RFC 1123 HTTP date.
    #[must_use]
    pub fn last_modified_http(&self) -> String {
        self.last_modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }

    /// Whether the object has any tags.
    #[must_use]
    pub fn has_tags(&self) -> bool {
        self.tag_count > 0
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record() -> ObjectRecord {
        ObjectRecord {
            object_id: 7,
            key: "k".to_owned(),
            content_length: 0,
            layout_id: 1,
            md5_hex: "d41d8cd98f00b204e9800998ecf8427e".to_owned(),
            last_modified: Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap(),
            content_type: "binary/octet-stream".to_owned(),
            user_attributes: Vec::new(),
            placement_id: None,
            version_id: None,
            tag_count: 0,
        }
    }

    #[test]
    fn test_should_quote_etag() {
        assert_eq!(record().etag(), "\"d41d8cd98f00b204e9800998ecf8427e\"");
    }

    #[test]
    fn test_should_format_last_modified_as_http_date() {
        assert_eq!(record().last_modified_http(), "Sat, 09 Mar 2024 12:30:05 GMT");
    }

    #[test]
    fn test_should_report_tags_only_when_present() {
        let mut rec = record();
        assert!(!rec.has_tags());
        rec.tag_count = 3;
        assert!(rec.has_tags());
    }
}
