use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

/// Writes bandwidth record batches to a Parquet file
pub struct ParquetWriter<W: Write + Send> {
    writer: ArrowWriter<W>,
    rows_written: usize,
}

impl ParquetWriter<File> {
    /// Creates (or truncates) the Parquet file at `path`
    pub fn create(path: &Path, schema: SchemaRef) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Self::new(file, schema)
    }
}

impl<W: Write + Send> ParquetWriter<W> {
    /// Creates a new ParquetWriter with the provided writer
    pub fn new(writer: W, schema: SchemaRef) -> Result<Self> {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let arrow_writer = ArrowWriter::try_new(writer, schema, Some(props))
            .map_err(|e| anyhow!("Failed to create Arrow writer: {}", e))?;

        Ok(Self {
            writer: arrow_writer,
            rows_written: 0,
        })
    }

    /// Appends a batch; empty batches are ignored
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        if batch.num_rows() == 0 {
            return Ok(());
        }

        self.writer
            .write(batch)
            .map_err(|e| anyhow!("Failed to write batch to Parquet: {}", e))?;
        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Rows appended so far
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Closes the writer, finishing the Parquet file
    pub fn close(self) -> Result<()> {
        self.writer
            .close()
            .map(|_| ())
            .map_err(|e| anyhow!("Failed to close Parquet writer: {}", e))
    }
}
