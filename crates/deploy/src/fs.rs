//! File system utils.

use std::path::Path;

use anyhow::Context;

pub struct FsHandler;

impl FsHandler {
    /// Create a directory (and its parents) if it doesn't exist.
    pub fn ensure_dir(path: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
        tracing::trace!("Ensured directory: {}", path.display());
        Ok(())
    }

    /// Write `content` to `path` through a sibling temporary file and a rename,
    /// so readers never observe a half-written file.
    pub fn write_atomic(path: &Path, content: &[u8]) -> anyhow::Result<()> {
        let file_name = path
            .file_name()
            .context("File path must have a file name")?
            .to_string_lossy();
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to move {} into place at {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Paths of the `*.json` files directly inside `dir`, sorted by name.
    pub fn json_files(dir: &Path) -> anyhow::Result<Vec<std::path::PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list directory {}", dir.display()))?
        {
            let path = entry
                .with_context(|| format!("Failed to read entry of {}", dir.display()))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
