use crate::domain::model::AggregatedData;
use crate::domain::ports::Sink;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_identifier;
use async_trait::async_trait;
use sqlx::AnyConnection;
use sqlx::Connection;

// 同一交易內清空後重新寫入
pub struct RelationalSink {
    url: String,
    table: String,
}

impl RelationalSink {
    pub fn new(url: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_identifier("connection.table", &table)?;
        Ok(Self {
            url: url.into(),
            table,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (account VARCHAR(255), charName VARCHAR(255), bagId INT, itemId INT, itemName VARCHAR(255), itemCount INT)",
            self.table
        )
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (account, charName, bagId, itemId, itemName, itemCount) VALUES (?, ?, ?, ?, ?, ?)",
            self.table
        )
    }

    async fn connect(&self) -> Result<AnyConnection> {
        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect(&self.url)
            .await
            .map_err(|e| EtlError::sink("relational", format!("connection failed: {}", e)))?;
        tracing::info!("Successfully connected to the database");
        Ok(conn)
    }

    async fn replace_rows(
        &self,
        conn: &mut AnyConnection,
        data: &AggregatedData,
    ) -> std::result::Result<u64, sqlx::Error> {
        // DDL commits implicitly on MySQL, so it stays outside the transaction.
        sqlx::query(&self.create_table_sql()).execute(&mut *conn).await?;

        let mut tx = conn.begin().await?;
        let cleared = sqlx::query(&format!("DELETE FROM {}", self.table))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tracing::debug!("Cleared {} existing rows from {}", cleared, self.table);

        let insert = self.insert_sql();
        let mut inserted = 0;
        for (account, record) in data.rows() {
            sqlx::query(&insert)
                .bind(account.to_string())
                .bind(record.char_name.clone())
                .bind(record.bag_id)
                .bind(record.item_id)
                .bind(record.item_name.clone())
                .bind(record.item_count)
                .execute(&mut *tx)
                .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

#[async_trait]
impl Sink for RelationalSink {
    async fn write(&self, data: &AggregatedData) -> Result<String> {
        let mut conn = self.connect().await?;

        let result = self.replace_rows(&mut conn, data).await;
        let closed = conn.close().await;

        let inserted = result.map_err(|e| EtlError::sink("relational", e))?;
        closed.map_err(|e| EtlError::sink("relational", e))?;

        tracing::info!(
            "Data successfully inserted into the database ({} rows in {})",
            inserted,
            self.table
        );
        Ok(format!("table {}", self.table))
    }
}
