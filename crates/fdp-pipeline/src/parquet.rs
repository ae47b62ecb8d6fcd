//! Columnar (parquet) serialization
//!
//! Writes a cleaned table to `<parquet_dir>/<table>.parquet` as a single
//! record batch. The path is deterministic from the table name and any
//! existing file is overwritten.

use crate::table::{ColumnData, Table};
use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

fn arrow_type(data: &ColumnData) -> DataType {
    match data {
        ColumnData::Text(_) | ColumnData::Str(_) => DataType::Utf8,
        ColumnData::Int64(_) => DataType::Int64,
        ColumnData::Float64(_) => DataType::Float64,
    }
}

fn arrow_array(data: &ColumnData) -> ArrayRef {
    match data {
        ColumnData::Text(values) | ColumnData::Str(values) => {
            Arc::new(StringArray::from(values.clone()))
        },
        ColumnData::Int64(values) => Arc::new(Int64Array::from(values.clone())),
        ColumnData::Float64(values) => Arc::new(Float64Array::from(values.clone())),
    }
}

/// Serialize a table to parquet, returning the output path
pub fn write_parquet(table: &Table, parquet_dir: &Path) -> Result<PathBuf> {
    let path = parquet_dir.join(format!("{}.parquet", table.name));

    let fields: Vec<Field> = table
        .columns
        .iter()
        .map(|c| Field::new(&c.name, arrow_type(&c.data), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays: Vec<ArrayRef> = table.columns.iter().map(|c| arrow_array(&c.data)).collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .context("Failed to assemble record batch")?;

    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))
        .context("Failed to create parquet writer")?;
    writer.write(&batch).context("Failed to write record batch")?;
    writer.close().context("Failed to finalize parquet file")?;

    info!(
        table = %table.name,
        rows = table.num_rows(),
        path = %path.display(),
        "wrote parquet file"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn sample_table() -> Table {
        Table {
            name: "airports".to_string(),
            columns: vec![
                Column {
                    name: "iata".to_string(),
                    data: ColumnData::Str(vec![Some("JFK".to_string()), Some("LAX".to_string())]),
                },
                Column {
                    name: "elevation".to_string(),
                    data: ColumnData::Int64(vec![Some(13), None]),
                },
            ],
        }
    }

    #[test]
    fn test_write_parquet_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_parquet(&sample_table(), dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "airports.parquet");

        let file = std::fs::File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<_> = reader.collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_rows(), 2);
        assert_eq!(batches[0].schema().field(0).name(), "iata");
        assert_eq!(batches[0].schema().field(1).data_type(), &DataType::Int64);
    }

    #[test]
    fn test_write_parquet_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_parquet(&sample_table(), dir.path()).unwrap();

        let mut smaller = sample_table();
        for column in &mut smaller.columns {
            match &mut column.data {
                ColumnData::Str(v) | ColumnData::Text(v) => v.truncate(1),
                ColumnData::Int64(v) => v.truncate(1),
                ColumnData::Float64(v) => v.truncate(1),
            }
        }
        let second = write_parquet(&smaller, dir.path()).unwrap();
        assert_eq!(first, second);

        let file = std::fs::File::open(&second).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 1);
    }
}
