//! Input loading: turn a user-supplied path or URL into an [`UploadedFile`].
//!
//! Everything is read into memory; converters never touch the filesystem.
//! For URLs the file name is taken from the last path segment, falling back
//! to `download` when the URL has none.

use crate::error::InputError;
use crate::file::UploadedFile;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load `input` from disk or over HTTP(S).
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<UploadedFile, InputError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

/// Read a local file, naming the upload after the file name component.
pub async fn load_local(path: &Path) -> Result<UploadedFile, InputError> {
    let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => InputError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => InputError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => InputError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    debug!("Loaded '{}' ({} bytes)", path.display(), data.len());
    Ok(UploadedFile::new(name, data))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedFile, InputError> {
    info!("Downloading: {}", url);

    let failed = |reason: String| InputError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            InputError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let name = file_name_from_url(url);
    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            InputError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    info!("Downloaded '{}' ({} bytes)", name, bytes.len());
    Ok(UploadedFile::new(name, bytes.to_vec()))
}

/// Last non-empty path segment of `url`.
pub fn file_name_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_else(|| "download".to_string())
}
