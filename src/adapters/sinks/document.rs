use crate::domain::model::AggregatedData;
use crate::domain::ports::{Sink, Storage};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::PathBuf;

pub fn render_json(data: &AggregatedData) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut serializer)?;
    Ok(buf)
}

pub struct JsonSink<S: Storage> {
    storage: S,
    file: PathBuf,
}

impl<S: Storage> JsonSink<S> {
    pub fn new(storage: S, file: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            file: file.into(),
        }
    }
}

#[async_trait]
impl<S: Storage> Sink for JsonSink<S> {
    async fn write(&self, data: &AggregatedData) -> Result<String> {
        let bytes = render_json(data)?;
        let destination = self.storage.resolve(&self.file);

        tracing::debug!("Writing {} bytes of JSON to {}", bytes.len(), destination.display());
        self.storage
            .write_file(&self.file, &bytes)
            .await
            .map_err(|e| EtlError::sink("json", e))?;

        tracing::info!("Data successfully written to {}", destination.display());
        Ok(destination.display().to_string())
    }
}
