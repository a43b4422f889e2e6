//! Parquet plumbing shared by every table: fixed writer properties, atomic
//! single-file commits, and typed column access on read.

use std::fs::{create_dir_all, File};
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray, Int64Array, StringArray, UInt32Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Int64Type, UInt32Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::debug;

use crate::error::{GoldError, Result};

fn writer_properties() -> WriterProperties {
    // No timestamps or host data: rebuilding a partition must reproduce the same bytes.
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_created_by("clickstream_gold".to_string())
        .set_max_row_group_size(250_000)
        .set_dictionary_page_size_limit(2_000_000)
        .build()
}

/// Stage `batch` next to `target`, then rename it into place.
///
/// Readers see either the previous file or the complete new one. A stage file
/// abandoned by a crash or an error is removed when its handle drops.
pub fn write_parquet_atomic(target: &Path, batch: &RecordBatch) -> Result<()> {
    let dir = target.parent().ok_or_else(|| {
        GoldError::Config(format!("{} has no parent directory", target.display()))
    })?;
    create_dir_all(dir)?;

    let staged = tempfile::Builder::new()
        .prefix(".data.")
        .suffix(".parquet.tmp")
        .tempfile_in(dir)?;
    {
        let mut writer =
            ArrowWriter::try_new(staged.as_file(), batch.schema(), Some(writer_properties()))?;
        writer.write(batch)?;
        writer.close()?;
    }
    staged.as_file().sync_all()?;
    staged.persist(target).map_err(|e| e.error)?;

    debug!(
        rows = batch.num_rows(),
        path = %target.display(),
        "committed parquet file"
    );
    Ok(())
}

/// Read a whole Parquet file into memory.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| malformed(path, format!("parquet reader init failed: {e}")))?
        .build()
        .map_err(|e| malformed(path, format!("parquet reader build failed: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.map_err(|e| malformed(path, format!("parquet read failed: {e}")))?);
    }
    Ok(batches)
}

pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> GoldError {
    GoldError::MalformedPartition {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Typed view over one record batch of a file at `path`, used for error context.
pub struct Columns<'a> {
    path: &'a Path,
    batch: &'a RecordBatch,
}

impl<'a> Columns<'a> {
    pub fn new(path: &'a Path, batch: &'a RecordBatch) -> Self {
        Self { path, batch }
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// First of `names` present in the batch.
    fn find(&self, names: &[&str]) -> Result<&'a ArrayRef> {
        let schema = self.batch.schema_ref();
        names
            .iter()
            .find_map(|name| schema.index_of(name).ok())
            .map(|idx| self.batch.column(idx))
            .ok_or_else(|| malformed(self.path, format!("missing column, expected one of {names:?}")))
    }

    fn cast_to(&self, column: &ArrayRef, to: &DataType, accepts: fn(&DataType) -> bool) -> Result<ArrayRef> {
        if !accepts(column.data_type()) {
            return Err(malformed(
                self.path,
                format!("column has type {}, cannot read it as {to}", column.data_type()),
            ));
        }
        if column.data_type() == to {
            return Ok(column.clone());
        }
        Ok(cast(column.as_ref(), to)?)
    }

    pub fn strings(&self, names: &[&str]) -> Result<StringArray> {
        let column = self.find(names)?;
        let cast = self.cast_to(column, &DataType::Utf8, is_string)?;
        Ok(cast.as_string::<i32>().clone())
    }

    pub fn int64(&self, names: &[&str]) -> Result<Int64Array> {
        let column = self.find(names)?;
        let cast = self.cast_to(column, &DataType::Int64, DataType::is_integer)?;
        Ok(cast.as_primitive::<Int64Type>().clone())
    }

    pub fn uint32(&self, names: &[&str]) -> Result<UInt32Array> {
        let column = self.find(names)?;
        let cast = self.cast_to(column, &DataType::UInt32, DataType::is_integer)?;
        Ok(cast.as_primitive::<UInt32Type>().clone())
    }

    /// Fail when any value of a required column is null.
    pub fn require_non_null(&self, name: &str, column: &dyn Array) -> Result<()> {
        if column.null_count() > 0 {
            return Err(malformed(
                self.path,
                format!("column {name} has {} null values", column.null_count()),
            ));
        }
        Ok(())
    }
}

pub fn string_at(array: &StringArray, i: usize) -> Option<&str> {
    array.is_valid(i).then(|| array.value(i))
}

pub fn int64_at(array: &Int64Array, i: usize) -> Option<i64> {
    array.is_valid(i).then(|| array.value(i))
}

fn is_string(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use arrow::array::Int32Array;
    use tempfile::TempDir;

    fn sample_batch() -> RecordBatch {
        let schema = schema! {
            "title" => DataType::Utf8, false;
            "n" => DataType::Int32, false;
        };
        record_batch!(
            schema,
            Arc::new(StringArray::from(vec!["A", "B"])) as ArrayRef,
            Arc::new(Int32Array::from(vec![3, 4])) as ArrayRef,
        )
        .unwrap()
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_stage_files() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("t/lang=en/data.parquet");

        write_parquet_atomic(&target, &sample_batch()).unwrap();
        write_parquet_atomic(&target, &sample_batch()).unwrap();

        let names: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["data.parquet"]);

        let batches = read_parquet(&target).unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 2);
    }

    #[test]
    fn columns_widen_integers_and_resolve_aliases() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("data.parquet");
        write_parquet_atomic(&target, &sample_batch()).unwrap();
        let batches = read_parquet(&target).unwrap();
        let columns = Columns::new(&target, &batches[0]);

        let counts = columns.int64(&["count", "n"]).unwrap();
        assert_eq!(counts.values().to_vec(), vec![3i64, 4]);
        assert_eq!(columns.uint32(&["n"]).unwrap().value(1), 4);
        assert!(matches!(
            columns.int64(&["title"]),
            Err(GoldError::MalformedPartition { .. })
        ));
        assert!(matches!(
            columns.strings(&["absent"]),
            Err(GoldError::MalformedPartition { .. })
        ));
    }

    #[test]
    fn garbage_file_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.parquet");
        std::fs::write(&path, b"not parquet").unwrap();
        assert!(matches!(
            read_parquet(&path),
            Err(GoldError::MalformedPartition { .. })
        ));
    }
}
