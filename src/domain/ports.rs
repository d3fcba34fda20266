use crate::domain::model::{AggregatedData, RawAccountData};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &Path) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &Path,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn is_file(&self, path: &Path) -> impl std::future::Future<Output = bool> + Send;
    /// Names of the subdirectories of `path`, or `None` when `path` is not a directory.
    fn list_dirs(
        &self,
        path: &Path,
    ) -> impl std::future::Future<Output = Result<Option<Vec<String>>>> + Send;
    fn resolve(&self, path: &Path) -> PathBuf;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RawAccountData>;
    async fn transform(&self, data: RawAccountData) -> Result<AggregatedData>;
    async fn load(&self, data: AggregatedData) -> Result<String>;
}

#[async_trait]
pub trait Sink: Send + Sync {
    async fn write(&self, data: &AggregatedData) -> Result<String>;
}
