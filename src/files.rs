//! Filesystem gateway: path resolution plus the read, write, list, delete
//! and upload operations, all rooted at the workspace.

use crate::config::Config;
use crate::error::ApiError;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::info;

/// One entry of a directory listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    /// Modification time as fractional seconds since the Unix epoch.
    pub modified: f64,
}

/// Resolve a caller-supplied path: absolute paths are used verbatim,
/// relative paths join under the workspace root.
///
/// With `confine_paths` set, any path whose normalized form leaves the
/// workspace is rejected, closing the `..` and absolute-path escape hatches.
pub fn resolve(config: &Config, raw: &str) -> Result<PathBuf, ApiError> {
    let path = Path::new(raw);
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        config.workspace.join(path)
    };
    if config.confine_paths && !normalize(&full).starts_with(&config.workspace) {
        return Err(ApiError::BadRequest(format!(
            "Path escapes the workspace root: {raw}"
        )));
    }
    Ok(full)
}

/// Lexically resolve `.` and `..` components without touching the
/// filesystem, so nonexistent paths can still be checked.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Existence check that treats unreadable paths as absent.
async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Write text content to a file, creating missing parent directories.
/// Returns the resolved absolute path.
pub async fn write_file(
    config: &Config,
    raw_path: &str,
    content: &str,
) -> Result<PathBuf, ApiError> {
    let full = resolve(config, raw_path)?;
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&full, content).await?;
    info!("wrote {} ({} bytes)", full.display(), content.len());
    Ok(full)
}

/// Read a whole file as text, replacing invalid UTF-8 sequences.
pub async fn read_file(config: &Config, raw_path: &str) -> Result<String, ApiError> {
    let full = resolve(config, raw_path)?;
    if !exists(&full).await {
        return Err(ApiError::NotFound("File not found".to_string()));
    }
    let bytes = fs::read(&full).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Enumerate the immediate children of a directory with their metadata,
/// directories first, then case-insensitive name order.
pub async fn list_dir(config: &Config, raw_path: &str) -> Result<Vec<ListItem>, ApiError> {
    let full = resolve(config, raw_path)?;
    if !exists(&full).await {
        return Err(ApiError::NotFound("Path not found".to_string()));
    }
    if !fs::metadata(&full).await?.is_dir() {
        return Err(ApiError::BadRequest("Not a directory".to_string()));
    }

    let mut items = Vec::new();
    let mut entries = fs::read_dir(&full).await?;
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        items.push(ListItem {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind: if meta.is_dir() { "dir" } else { "file" }.to_string(),
            size: meta.len(),
            modified,
        });
    }
    items.sort_by_key(|item| (item.kind != "dir", item.name.to_lowercase()));
    Ok(items)
}

/// Remove a file, or a directory with everything under it. Returns the
/// resolved path that was removed.
pub async fn delete_path(config: &Config, raw_path: &str) -> Result<PathBuf, ApiError> {
    let full = resolve(config, raw_path)?;
    if !exists(&full).await {
        return Err(ApiError::NotFound("Path not found".to_string()));
    }
    if fs::metadata(&full).await?.is_dir() {
        fs::remove_dir_all(&full).await?;
    } else {
        fs::remove_file(&full).await?;
    }
    info!("deleted {}", full.display());
    Ok(full)
}

/// Store uploaded bytes under the basename of `filename`, inside `subdir`
/// when given (created on demand) or the workspace root otherwise. An
/// existing file is never overwritten; collisions get a `_<n>` suffix.
///
/// Returns the stored path relative to the workspace root and the size.
pub async fn store_upload(
    config: &Config,
    subdir: Option<&str>,
    filename: &str,
    data: &[u8],
) -> Result<(String, u64), ApiError> {
    let dir = match subdir {
        Some(sub) if !sub.is_empty() => resolve(config, sub)?,
        _ => config.workspace.clone(),
    };
    fs::create_dir_all(&dir).await?;

    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin");
    let target = unique_path(&dir, name).await;
    fs::write(&target, data).await?;

    let stored = target.strip_prefix(&config.workspace).unwrap_or(&target);
    info!("stored upload {} ({} bytes)", stored.display(), data.len());
    Ok((stored.display().to_string(), data.len() as u64))
}

/// First unused path for `filename` in `dir`: the name itself, then
/// `stem_1.ext`, `stem_2.ext`, and so on.
async fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !exists(&candidate).await {
        return candidate;
    }
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let ext = Path::new(filename).extension().and_then(|s| s.to_str());
    let mut n = 1;
    loop {
        let name = match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = dir.join(name);
        if !exists(&candidate).await {
            return candidate;
        }
        n += 1;
    }
}
