//! Import batch operations (upload traceability)

use rusqlite::{params, OptionalExtension};

use super::{enum_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{ImportBatch, ImportStatus, NewImportBatch};

const BATCH_COLUMNS: &str = "id, file_name, file_size, uploaded_by, invoice_count, error_count, \
                             processing_status, created_at";

fn row_to_batch(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImportBatch> {
    let created_at_str: String = row.get(7)?;
    Ok(ImportBatch {
        id: row.get(0)?,
        file_name: row.get(1)?,
        file_size: row.get(2)?,
        uploaded_by: row.get(3)?,
        invoice_count: row.get(4)?,
        error_count: row.get(5)?,
        processing_status: enum_column(row, 6)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Record a new upload in `pending` state
    pub fn create_import_batch(&self, batch: &NewImportBatch) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batches (file_name, file_size, uploaded_by, processing_status)
            VALUES (?, ?, ?, 'pending')
            "#,
            params![batch.file_name, batch.file_size, batch.uploaded_by],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Set the final status and counts of an upload
    pub fn complete_import_batch(
        &self,
        batch_id: i64,
        status: ImportStatus,
        invoice_count: i64,
        error_count: i64,
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE import_batches
            SET processing_status = ?, invoice_count = ?, error_count = ?
            WHERE id = ?
            "#,
            params![status.as_str(), invoice_count, error_count, batch_id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Import batch {}", batch_id)));
        }
        Ok(())
    }

    /// Get an import batch by ID
    pub fn get_import_batch(&self, batch_id: i64) -> Result<Option<ImportBatch>> {
        let conn = self.conn()?;
        let batch = conn
            .query_row(
                &format!("SELECT {} FROM import_batches WHERE id = ?", BATCH_COLUMNS),
                params![batch_id],
                row_to_batch,
            )
            .optional()?;
        Ok(batch)
    }

    /// Most recent uploads first
    pub fn list_import_batches(&self, limit: i64) -> Result<Vec<ImportBatch>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM import_batches ORDER BY created_at DESC, id DESC LIMIT ?",
            BATCH_COLUMNS
        ))?;

        let batches = stmt
            .query_map(params![limit], row_to_batch)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(batches)
    }
}
