use crate::adapters::sinks::FIELD_ORDER;
use crate::domain::model::AggregatedData;
use crate::domain::ports::{Sink, Storage};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    account: &'a str,
    char_name: &'a str,
    bag_id: Option<i64>,
    item_id: Option<i64>,
    item_name: Option<&'a str>,
    item_count: Option<i64>,
}

/// Header row, then one row per record with the account injected. Missing values are empty fields.
pub fn render_csv(data: &AggregatedData) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(FIELD_ORDER)
        .map_err(|e| EtlError::sink("csv", e))?;

    for (account, record) in data.rows() {
        writer
            .serialize(CsvRow {
                account,
                char_name: &record.char_name,
                bag_id: record.bag_id,
                item_id: record.item_id,
                item_name: record.item_name.as_deref(),
                item_count: record.item_count,
            })
            .map_err(|e| EtlError::sink("csv", e))?;
    }

    writer.into_inner().map_err(|e| EtlError::sink("csv", e))
}

pub struct CsvSink<S: Storage> {
    storage: S,
    file: PathBuf,
}

impl<S: Storage> CsvSink<S> {
    pub fn new(storage: S, file: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            file: file.into(),
        }
    }
}

#[async_trait]
impl<S: Storage> Sink for CsvSink<S> {
    async fn write(&self, data: &AggregatedData) -> Result<String> {
        let bytes = render_csv(data)?;
        let destination = self.storage.resolve(&self.file);

        tracing::debug!("Writing {} bytes of CSV to {}", bytes.len(), destination.display());
        self.storage
            .write_file(&self.file, &bytes)
            .await
            .map_err(|e| EtlError::sink("csv", e))?;

        tracing::info!(
            "Data successfully written to {} ({} rows)",
            destination.display(),
            data.record_count()
        );
        Ok(destination.display().to_string())
    }
}
