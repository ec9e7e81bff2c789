// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Image inlining for multimodal requests.
//!
//! An image reference is either a `data:` URI, which is split as-is, or a
//! local file path inside the workspace, which is read and Base64-encoded.
//! Remote URLs are rejected rather than fetched.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::error::{ProviderError, ToolError};
use crate::tools::files::confine;

/// Message for rejected `http(s)://` image references.
pub const URL_NOT_SUPPORTED: &str =
    "URL images are not supported. Please provide a file path or Base64 data URI instead.";

/// Inline image payload in the shape the Gemini API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// MIME type for an image file extension, `image/png` when unknown.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "image/png",
    }
}

/// Split a `data:` URI into MIME type and payload.
fn split_data_uri(uri: &str) -> InlineData {
    let (metadata, data) = uri.split_once(',').unwrap_or((uri, ""));
    let mime_type = metadata
        .split_once(':')
        .and_then(|(_, rest)| rest.split_once(';'))
        .map(|(mime, _)| mime)
        .filter(|mime| !mime.is_empty())
        .unwrap_or("image/png");

    InlineData {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    }
}

/// Resolve one image reference. Relative paths are taken from `root`, and
/// file paths must stay inside it.
pub async fn load_inline_image(
    image: &str,
    root: &Path,
    max_bytes: u64,
) -> Result<InlineData, ProviderError> {
    if image.starts_with("data:") {
        return Ok(split_data_uri(image));
    }

    if image.starts_with("http://") || image.starts_with("https://") {
        return Err(ProviderError::UnsupportedImage(URL_NOT_SUPPORTED.to_string()));
    }

    let path = resolve(image, root)?;
    let metadata = match tokio::fs::metadata(&path).await {
        Ok(m) if m.is_file() => m,
        _ => return Err(ProviderError::ImageNotFound(image.to_string())),
    };

    if metadata.len() > max_bytes {
        return Err(ProviderError::ImageTooLarge {
            path: image.to_string(),
            size: metadata.len(),
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ProviderError::ImageRead {
            path: image.to_string(),
            message: e.to_string(),
        })?;

    Ok(InlineData {
        mime_type: mime_type_for(Path::new(image)).to_string(),
        data: STANDARD.encode(bytes),
    })
}

fn resolve(image: &str, root: &Path) -> Result<PathBuf, ProviderError> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    confine(&root, image).map_err(|err| match err {
        ToolError::SecurityViolation(message) => ProviderError::ImageOutsideWorkspace(message),
        _ => ProviderError::ImageNotFound(image.to_string()),
    })
}
