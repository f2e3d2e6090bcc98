use crate::domain::ports::Storage;
use crate::utils::error::{BuildError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_path.join(path)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

impl Storage for LocalStorage {
    fn root(&self) -> &Path {
        &self.base_path
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let full_path = self.resolve(path);
        fs::read_to_string(&full_path)
            .await
            .map_err(|e| BuildError::file(display(&full_path), e))
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BuildError::file(display(parent), e))?;
        }

        fs::write(&full_path, data)
            .await
            .map_err(|e| BuildError::file(display(&full_path), e))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let full_path = self.resolve(path);
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| BuildError::file(display(&full_path), e))
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let source = self.resolve(from);
        let mut target = self.resolve(to);

        if fs::metadata(&target).await.map(|m| m.is_dir()).unwrap_or(false) {
            if let Some(name) = source.file_name() {
                target = target.join(name);
            }
        } else if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BuildError::file(display(parent), e))?;
        }

        tracing::debug!("copy {} -> {}", source.display(), target.display());
        fs::copy(&source, &target)
            .await
            .map_err(|e| BuildError::file(display(&source), e))?;
        Ok(())
    }

    async fn copy_dir(&self, from: &Path, to: &Path, overwrite: bool) -> Result<Vec<PathBuf>> {
        let source = self.resolve(from);
        let target = self.resolve(to);

        let mut files = Vec::new();
        for entry in WalkDir::new(&source).min_depth(1) {
            let entry = entry.map_err(|e| BuildError::file(display(&source), e.into()))?;
            if entry.file_type().is_file() {
                let relative = entry
                    .path()
                    .strip_prefix(&source)
                    .map_err(|e| BuildError::config(e.to_string()))?
                    .to_path_buf();
                files.push(relative);
            }
        }

        let mut written = Vec::new();
        for relative in files {
            let destination = target.join(&relative);
            if !overwrite && fs::try_exists(&destination).await.unwrap_or(false) {
                tracing::debug!("keeping existing {}", destination.display());
                continue;
            }
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BuildError::file(display(parent), e))?;
            }
            let origin = source.join(&relative);
            fs::copy(&origin, &destination)
                .await
                .map_err(|e| BuildError::file(display(&origin), e))?;
            written.push(destination);
        }

        Ok(written)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let full_path = self.resolve(path);
        fs::remove_file(&full_path)
            .await
            .map_err(|e| BuildError::file(display(&full_path), e))
    }
}
