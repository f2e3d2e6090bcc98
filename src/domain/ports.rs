use crate::utils::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};

/// File access relative to the project root.
pub trait Storage: Send + Sync {
    fn root(&self) -> &Path;

    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;

    fn read_to_string(&self, path: &Path) -> impl Future<Output = Result<String>> + Send;

    /// Writes `data`, creating parent directories as needed.
    fn write_file(&self, path: &Path, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    fn create_dir_all(&self, path: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Copies a file. `to` may be an existing directory, in which case the
    /// source file name is kept.
    fn copy_file(&self, from: &Path, to: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Recursively copies `from` into `to` and returns the destination paths
    /// written. Existing files are skipped unless `overwrite` is set.
    fn copy_dir(
        &self,
        from: &Path,
        to: &Path,
        overwrite: bool,
    ) -> impl Future<Output = Result<Vec<PathBuf>>> + Send;

    fn remove_file(&self, path: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// One independent unit of a command; tasks of a command run concurrently.
#[async_trait]
pub trait BuildTask: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<()>;
}
