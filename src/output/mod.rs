//! On-disk copies of upscaled results.
//!
//! Every successful upscale is written to `<directory>/<id>-upscaled.png`.
//! There is no cleanup; a repeated id overwrites the previous file.

use std::path::{Path, PathBuf};

/// Writes upscaled PNGs into a directory.
#[derive(Debug, Clone)]
pub struct OutputStore {
    directory: PathBuf,
}

impl OutputStore {
    /// Create the store, creating `directory` if it does not exist yet.
    pub async fn open(directory: impl Into<PathBuf>) -> std::io::Result<Self> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path the result for `unique_id` is written to.
    pub fn path_for(&self, unique_id: &str) -> PathBuf {
        self.directory
            .join(format!("{}-upscaled.png", file_stem(unique_id)))
    }

    /// Write `png` for `unique_id`, replacing any earlier result.
    pub async fn write(&self, unique_id: &str, png: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(unique_id);
        tokio::fs::write(&path, png).await?;
        tracing::debug!(path = %path.display(), bytes = png.len(), "Upscaled image saved");
        Ok(path)
    }

    /// Read back the stored result for `unique_id`, `None` if there is none.
    pub async fn read(&self, unique_id: &str) -> std::io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(unique_id)).await {
            Ok(png) => Ok(Some(png)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Map an arbitrary caller id onto a single path component.
fn file_stem(unique_id: &str) -> String {
    let stem: String = unique_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match stem.as_str() {
        "" | "." | ".." => format!("_{stem}"),
        _ => stem,
    }
}
