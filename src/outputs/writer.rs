//! Atomic feed file replacement.
//!
//! The feed is usually served straight off disk by a web server, so a reader
//! must never observe a half-written file. The new content goes to a
//! uniquely named temporary file next to the target, is synced, and is then
//! renamed over the target in one step.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

/// The feed could not be persisted.
#[derive(Debug, Error)]
#[error("failed to {action} {}: {source}", .path.display())]
pub struct WriteError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    fn new(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Replace `path` with `contents`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns a [`WriteError`] naming the step that failed. The temporary file
/// is removed on failure and the previous content of `path` is untouched.
#[instrument(level = "info", skip_all, fields(path = %path.display(), bytes = contents.len()))]
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), WriteError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| WriteError::new("create directory", &dir, e))?;

    let temp_path = temp_path_for(path);
    if let Err(e) = write_and_sync(&temp_path, contents).await {
        let _ = fs::remove_file(&temp_path).await;
        error!(temp = %temp_path.display(), error = %e, "Failed writing temporary feed file");
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        error!(error = %e, "Failed to move feed into place");
        return Err(WriteError::new("rename into", path, e));
    }

    info!("Wrote feed file");
    Ok(())
}

async fn write_and_sync(temp_path: &Path, contents: &str) -> Result<(), WriteError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .await
        .map_err(|e| WriteError::new("create", temp_path, e))?;
    file.write_all(contents.as_bytes())
        .await
        .map_err(|e| WriteError::new("write", temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| WriteError::new("sync", temp_path, e))
}

/// `feed.xml` -> `.feed.xml.tmp.<nanos>` in the same directory, so the
/// rename never crosses a filesystem boundary.
fn temp_path_for(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "feed".to_string());
    path.with_file_name(format!(".{name}.tmp.{nanos:x}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("feed.xml");

        write_atomic(&path, "<rss/>").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<rss/>");
    }

    #[tokio::test]
    async fn test_replaces_existing_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, "new").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("feed.xml")]);
    }

    #[tokio::test]
    async fn test_unwritable_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the target path makes the rename fail.
        let path = dir.path().join("feed.xml");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = write_atomic(&path, "new").await.unwrap_err();

        assert_eq!(err.action, "rename into");
        assert!(path.join("keep").exists());
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/srv/www/feed.xml"));
        assert_eq!(temp.parent(), Some(Path::new("/srv/www")));
        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".feed.xml.tmp."));
    }
}
