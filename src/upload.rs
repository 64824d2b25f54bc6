//! Source delivery: local archive upload or node-side folder pass-through.
use crate::api::{ApiClient, ApiError};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const ARCHIVE_EXTENSIONS: [&str; 3] = [".zip", ".tar.gz", ".tgz"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("source file {0} is not a zip or tar.gz archive")]
    UnsupportedArchive(String),
    #[error("source file name {0} is not valid UTF-8")]
    InvalidFileName(String),
    #[error("read source archive {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("folder {0} does not exist in the console source area")]
    FolderNotFound(String),
}

pub struct UploadService<'a> {
    client: &'a ApiClient,
}

impl<'a> UploadService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        UploadService { client }
    }

    /// Make a local archive or node-side folder available to delivery jobs.
    ///
    /// A local `.zip`/`.tar.gz` is uploaded and referenced as
    /// `upload:<file name>`; anything else is treated as a folder that must
    /// already exist in the console's source area and is passed through.
    pub fn deliver_sources(
        &self,
        source: &Path,
        app_guid: Option<&str>,
        folder_exists: impl Fn(&str) -> bool,
    ) -> Result<String, UploadError> {
        if source.is_file() {
            return self.upload_archive(source, app_guid);
        }
        let folder = source.to_string_lossy().into_owned();
        if !folder_exists(&folder) {
            return Err(UploadError::FolderNotFound(folder));
        }
        info!("using node-side source folder {folder}");
        Ok(folder)
    }

    fn upload_archive(&self, source: &Path, app_guid: Option<&str>) -> Result<String, UploadError> {
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| UploadError::InvalidFileName(source.display().to_string()))?;
        if !ARCHIVE_EXTENSIONS
            .iter()
            .any(|extension| file_name.ends_with(extension))
        {
            return Err(UploadError::UnsupportedArchive(file_name.to_string()));
        }

        let bytes = fs::read(source).map_err(|source_err| UploadError::Read {
            path: source.display().to_string(),
            source: source_err,
        })?;
        let path = match app_guid {
            Some(guid) => format!("/api/applications/{guid}/upload/{file_name}"),
            None => format!("/api/upload/{file_name}"),
        };
        info!(
            "uploading {file_name} ({} bytes) to the console",
            bytes.len()
        );
        self.client
            .put_bytes(&path, "application/octet-stream", &bytes)?;
        Ok(format!("upload:{file_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthScheme;
    use std::io::Write;
    use std::time::Duration;

    fn client() -> ApiClient {
        // Points at a closed port; tests below never reach the network.
        ApiClient::new(
            "http://127.0.0.1:9",
            AuthScheme::ApiKey("key".into()),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn rejects_non_archive_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.rar");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"not an archive").unwrap();

        let client = client();
        let uploads = UploadService::new(&client);
        let err = uploads
            .deliver_sources(&path, None, |_| true)
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedArchive(_)));
    }

    #[test]
    fn missing_node_folder_is_reported() {
        let client = client();
        let uploads = UploadService::new(&client);
        let err = uploads
            .deliver_sources(Path::new("/drop/shop-sources"), None, |_| false)
            .unwrap_err();
        assert!(matches!(err, UploadError::FolderNotFound(_)));
    }

    #[test]
    fn existing_node_folder_passes_through() {
        let client = client();
        let uploads = UploadService::new(&client);
        let path = uploads
            .deliver_sources(Path::new("/drop/shop-sources"), None, |_| true)
            .unwrap();
        assert_eq!(path, "/drop/shop-sources");
    }
}
