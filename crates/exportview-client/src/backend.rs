use std::path::Path;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use url::Url;

use exportview_types::api::{
    ARCHIVE_EXTENSION, AttachmentRef, NDJSON_CONTENT_TYPE, SEARCH_PATH, SearchHit, SearchRequest,
    SearchResponse, UPLOAD_FIELD, UPLOAD_PATH,
};

use crate::error::ClientError;

/// NDJSON response body, chunked however the transport delivers it.
pub type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// HTTP access to the export backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base: Url,
}

impl BackendClient {
    pub fn new(base: Url) -> Self {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(http: Client, base: Url) -> Self {
        Self { http, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Upload a zipped export and return the streamed response body.
    ///
    /// The archive is streamed from disk. Any non-success status is a total
    /// failure and the body is not read.
    pub async fn upload_archive(&self, path: &Path) -> Result<ByteStream, ClientError> {
        if path.extension().and_then(|ext| ext.to_str()) != Some(ARCHIVE_EXTENSION) {
            return Err(ClientError::NotAnArchive(path.to_path_buf()));
        }

        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), size)
            .file_name(file_name.clone())
            .mime_str("application/zip")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = self.endpoint(UPLOAD_PATH)?;
        info!(file = %file_name, size, url = %url, "Uploading archive");

        let response = self
            .http
            .post(url)
            .header(ACCEPT, NDJSON_CONTENT_TYPE)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Upload rejected");
            return Err(ClientError::status("Upload", status));
        }

        debug!(status = %status, "Upload accepted, streaming response");
        Ok(response.bytes_stream().boxed())
    }

    /// Download an attachment of the currently loaded archive.
    pub async fn fetch_attachment(&self, attachment: &AttachmentRef) -> Result<Bytes, ClientError> {
        let url = attachment.resolve(&self.base)?;
        debug!(url = %url, "Fetching attachment");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::status("Attachment download", status));
        }
        Ok(response.bytes().await?)
    }

    /// Search the backend's copy of the archive. `query` is handed to the
    /// backend untouched; it treats it as a case-insensitive regex.
    pub async fn search_remote(
        &self,
        query: &str,
        channel: Option<&str>,
    ) -> Result<Vec<SearchHit>, ClientError> {
        let request = SearchRequest {
            query: query.to_owned(),
            channel: channel.map(str::to_owned),
        };
        let response = self
            .http
            .post(self.endpoint(SEARCH_PATH)?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        // The backend reports a bad pattern as `{error}` with a 500.
        match serde_json::from_slice::<SearchResponse>(&body) {
            Ok(SearchResponse::Error { error }) => Err(ClientError::Backend(error)),
            _ if !status.is_success() => Err(ClientError::status("Search", status)),
            Ok(SearchResponse::Results { results }) => {
                debug!(query, hits = results.len(), "Remote search finished");
                Ok(results)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_append_to_base_path() {
        let client = BackendClient::new(Url::parse("http://127.0.0.1:5000").unwrap());
        assert_eq!(
            client.endpoint(UPLOAD_PATH).unwrap().as_str(),
            "http://127.0.0.1:5000/api/upload"
        );

        let client = BackendClient::new(Url::parse("http://host/viewer/").unwrap());
        assert_eq!(
            client.endpoint(SEARCH_PATH).unwrap().as_str(),
            "http://host/viewer/api/search"
        );
    }

    #[tokio::test]
    async fn non_zip_is_rejected_before_any_request() {
        // Nothing listens here; a request would fail with Http instead.
        let client = BackendClient::new(Url::parse("http://127.0.0.1:9").unwrap());
        let err = client
            .upload_archive(Path::new("export.tar.gz"))
            .await
            .err().expect("expected an error");
        assert!(matches!(err, ClientError::NotAnArchive(_)));
        assert_eq!(err.to_string(), "File must be a ZIP file: export.tar.gz");
    }

    #[tokio::test]
    async fn missing_archive_is_an_io_error() {
        let client = BackendClient::new(Url::parse("http://127.0.0.1:9").unwrap());
        let err = client
            .upload_archive(Path::new("/nonexistent/dir/export.zip"))
            .await
            .err().expect("expected an error");
        assert!(matches!(err, ClientError::Io(_)));
    }
}
