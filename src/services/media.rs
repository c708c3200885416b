// src/services/media.rs

//! Media download and collision-safe file naming.
//!
//! Files land under `{root}/{site}/{category}/{post number}/` and callers
//! only ever see the path relative to `root`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use reqwest::Client;
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::PostKey;
use crate::utils::url_basename;

const FALLBACK_FILE_NAME: &str = "file";

/// Downloads post media into a per-post directory.
#[derive(Clone)]
pub struct MediaStore {
    client: Client,
    root: PathBuf,
}

impl MediaStore {
    pub fn new(client: Client, root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a path returned by [`MediaStore::save`].
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Download `url` into the post's directory and return the path relative
    /// to the media root.
    ///
    /// Name precedence: `Content-Disposition` filename, then `desired_name`,
    /// then the URL basename. Existing files are never overwritten; `_1`,
    /// `_2`, ... is appended to the stem until a free name is found, and on
    /// those retries a detected image format replaces the nominal extension.
    pub async fn save(
        &self,
        url: &str,
        key: &PostKey,
        desired_name: Option<&str>,
        headers: HeaderMap,
    ) -> Result<String> {
        log::info!("Saving media from URL: {}", url);

        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let disposition_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_file_name);
        let bytes = response.bytes().await?;

        let file_name = disposition_name
            .or_else(|| desired_name.map(str::to_string))
            .or_else(|| url_basename(url))
            .map(|name| sanitize_component(&name))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

        let detected_extension = image::guess_format(&bytes)
            .ok()
            .and_then(|format| format.extensions_str().first().copied());

        let dir = self
            .root
            .join(key.site.as_str())
            .join(sanitize_component(&key.category))
            .join(key.number.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let (file, path) = create_unique(&dir, &file_name, detected_extension)
            .await
            .map_err(|e| AppError::media(url, e))?;
        write_or_discard(file, &path, &bytes)
            .await
            .map_err(|e| AppError::media(url, e))?;

        let relative = relative_to(&self.root, &path)
            .ok_or_else(|| AppError::media(url, "saved path escaped the media root"))?;
        log::debug!("Saved {} as {}", url, relative);
        Ok(relative)
    }
}

/// Extract the filename from a `Content-Disposition` header value.
fn disposition_file_name(header: &str) -> Option<String> {
    let pattern = Regex::new(r#"filename="?([^";]+)"?"#).ok()?;
    pattern
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Keep only the final component of a name, so it cannot climb out of its directory.
fn sanitize_component(name: &str) -> String {
    let cleaned = name.replace(['/', '\\'], "_");
    match cleaned.as_str() {
        "." | ".." => "_".to_string(),
        _ => cleaned.trim().to_string(),
    }
}

/// Split `name` into stem and extension (with leading dot, possibly empty).
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Name tried on the `index`-th probe.
fn candidate_name(file_name: &str, index: usize, detected_extension: Option<&str>) -> String {
    if index == 0 {
        return file_name.to_string();
    }
    let (stem, nominal) = split_extension(file_name);
    match detected_extension {
        Some(ext) => format!("{stem}_{index}.{ext}"),
        None => format!("{stem}_{index}{nominal}"),
    }
}

/// Write the payload, removing the file again if the write fails.
async fn write_or_discard(mut file: tokio::fs::File, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let written = async {
        file.write_all(bytes).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            log::warn!("Could not remove partial file {}: {}", path.display(), remove_err);
        }
        return Err(e);
    }
    Ok(())
}

/// Create the first free candidate file, probing sequentially.
async fn create_unique(
    dir: &Path,
    file_name: &str,
    detected_extension: Option<&str>,
) -> std::io::Result<(tokio::fs::File, PathBuf)> {
    let mut index = 0;
    loop {
        let path = dir.join(candidate_name(file_name, index, detected_extension));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => index += 1,
            Err(e) => return Err(e),
        }
    }
}

/// `/`-separated path of `path` below `root`.
fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}
