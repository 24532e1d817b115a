use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{Attachment, ts_from_wire};

// -- Upload --

pub const UPLOAD_PATH: &str = "/api/upload";

/// Multipart field the backend reads the archive from.
pub const UPLOAD_FIELD: &str = "file";

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// The backend only accepts zipped exports.
pub const ARCHIVE_EXTENSION: &str = "zip";

// -- Attachments --

/// How an attachment is addressed on the backend. Two export producers
/// coexist: one names attachments by their path inside the archive
/// (`data/{id}`), the other by bare filename (`/api/attachments/{filename}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentRef {
    Id(String),
    Filename(String),
}

impl AttachmentRef {
    /// Resolve against the backend base URL. Path characters are
    /// percent-encoded; an id keeps its `/` separators since it is a path
    /// inside the archive, a filename does not.
    pub fn resolve(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty();
            match self {
                Self::Id(id) => {
                    segments.push("data");
                    segments.extend(id.split('/'));
                }
                Self::Filename(name) => {
                    segments.push("api").push("attachments").push(name);
                }
            }
        }
        Ok(url)
    }
}

impl From<&Attachment> for AttachmentRef {
    fn from(attachment: &Attachment) -> Self {
        Self::Id(attachment.id.clone())
    }
}

// -- Server-side search --

pub const SEARCH_PATH: &str = "/api/search";

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    /// Interpreted by the backend as a case-insensitive regular expression.
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Results { results: Vec<SearchHit> },
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    pub channel: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: String,
    #[serde(default, deserialize_with = "ts_from_wire")]
    pub ts: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:5000").unwrap()
    }

    #[test]
    fn id_reference_keeps_archive_path() {
        let url = AttachmentRef::Id("Channels - 2024/files/img 1.png".into())
            .resolve(&base())
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/data/Channels%20-%202024/files/img%201.png");
    }

    #[test]
    fn filename_reference_encodes_slashes() {
        let url = AttachmentRef::Filename("Q3 report/final.pdf".into())
            .resolve(&base())
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/api/attachments/Q3%20report%2Ffinal.pdf");
    }

    #[test]
    fn resolve_appends_to_base_path() {
        let base = Url::parse("http://host/viewer/?x=1").unwrap();
        let url = AttachmentRef::Id("a.txt".into()).resolve(&base).unwrap();
        assert_eq!(url.as_str(), "http://host/viewer/data/a.txt");
    }

    #[test]
    fn search_response_variants() {
        let ok: SearchResponse =
            serde_json::from_str(r#"{"results":[{"channel":"c","text":"t","user":"u","ts":1.5}]}"#).unwrap();
        match ok {
            SearchResponse::Results { results } => assert_eq!(results[0].ts, "1.5"),
            other => panic!("unexpected {:?}", other),
        }
        let err: SearchResponse = serde_json::from_str(r#"{"error":"bad pattern"}"#).unwrap();
        assert!(matches!(err, SearchResponse::Error { .. }));
    }
}
