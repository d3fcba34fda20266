pub mod delimited;
pub mod document;
pub mod relational;

pub use delimited::CsvSink;
pub use document::JsonSink;
pub use relational::RelationalSink;

use crate::adapters::storage::LocalStorage;
use crate::config::{BankConfig, SinkKind};
use crate::domain::model::AggregatedData;
use crate::domain::ports::Sink;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Column order shared by the table and the CSV header.
pub const FIELD_ORDER: [&str; 6] = [
    "account",
    "charName",
    "bagId",
    "itemId",
    "itemName",
    "itemCount",
];

pub enum SinkWriter {
    Relational(RelationalSink),
    DelimitedFile(CsvSink<LocalStorage>),
    Document(JsonSink<LocalStorage>),
}

impl SinkWriter {
    /// Fails on an unknown sink type or incomplete credentials, before any data is read.
    pub fn from_config(config: &BankConfig) -> Result<Self> {
        let kind = config.sink_kind()?;
        let sink = match kind {
            SinkKind::Relational => SinkWriter::Relational(RelationalSink::new(
                config.database_url()?,
                config.table_name(),
            )?),
            SinkKind::DelimitedFile => SinkWriter::DelimitedFile(CsvSink::new(
                LocalStorage::new(config.output_location()),
                config.output_file("csv"),
            )),
            SinkKind::Document => SinkWriter::Document(JsonSink::new(
                LocalStorage::new(config.output_location()),
                config.output_file("json"),
            )),
        };
        Ok(sink)
    }

    pub fn kind(&self) -> SinkKind {
        match self {
            SinkWriter::Relational(_) => SinkKind::Relational,
            SinkWriter::DelimitedFile(_) => SinkKind::DelimitedFile,
            SinkWriter::Document(_) => SinkKind::Document,
        }
    }
}

#[async_trait]
impl Sink for SinkWriter {
    async fn write(&self, data: &AggregatedData) -> Result<String> {
        match self {
            SinkWriter::Relational(sink) => sink.write(data).await,
            SinkWriter::DelimitedFile(sink) => sink.write(data).await,
            SinkWriter::Document(sink) => sink.write(data).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sink_type: &str, connection: &str) -> BankConfig {
        BankConfig::from_toml_str(&format!(
            "sinkType = \"{}\"\n[wowInfo]\nrealmName = \"R\"\n[connection]\n{}\n",
            sink_type, connection
        ))
        .unwrap()
    }

    #[test]
    fn test_select_sink_from_config() {
        let csv = SinkWriter::from_config(&config("csv", "")).unwrap();
        assert_eq!(csv.kind(), SinkKind::DelimitedFile);

        let json = SinkWriter::from_config(&config("json", "")).unwrap();
        assert_eq!(json.kind(), SinkKind::Document);

        let db = SinkWriter::from_config(&config(
            "mariadb",
            "username = \"u\"\npassword = \"p\"\ndatabase = \"d\"",
        ))
        .unwrap();
        assert_eq!(db.kind(), SinkKind::Relational);
    }

    #[test]
    fn test_unknown_sink_is_rejected() {
        assert!(SinkWriter::from_config(&config("parquet", "")).is_err());
    }

    #[test]
    fn test_relational_without_credentials_is_rejected() {
        assert!(SinkWriter::from_config(&config("mariadb", "host = \"db\"")).is_err());
    }
}
