use std::path::PathBuf;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("File must be a ZIP file: {}", .0.display())]
    NotAnArchive(PathBuf),
    #[error("Cannot read archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success response. `reason` is the status line text.
    #[error("{action} failed: {reason}")]
    Status {
        action: &'static str,
        status: StatusCode,
        reason: String,
    },
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    pub(crate) fn status(action: &'static str, status: StatusCode) -> Self {
        let reason = status
            .canonical_reason()
            .map(str::to_owned)
            .unwrap_or_else(|| status.as_u16().to_string());
        Self::Status {
            action,
            status,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_uses_reason_phrase() {
        let err = ClientError::status("Upload", StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Upload failed: Bad Request");

        let err = ClientError::status("Upload", StatusCode::from_u16(599).unwrap());
        assert_eq!(err.to_string(), "Upload failed: 599");
    }
}
