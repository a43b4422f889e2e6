use std::io;
use std::path::PathBuf;

use arrow::record_batch::RecordBatch;
use tracing::info;

use crate::columnar::write_parquet_atomic;
use crate::error::Result;
use crate::partition::{discover_language_partitions, PartitionAddress};

/// Commits whole tables to `<root>/<table>/<partition>/data.parquet`.
///
/// A write always replaces the previous contents of the address, so running a
/// build twice never accumulates rows.
#[derive(Debug, Clone)]
pub struct PartitionWriter {
    root: PathBuf,
}

impl PartitionWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, table: &str, address: &PartitionAddress) -> PathBuf {
        address.data_file(&self.root, table)
    }

    /// Whether a non-empty committed file exists at the address.
    pub fn exists(&self, table: &str, address: &PartitionAddress) -> bool {
        std::fs::metadata(self.path_for(table, address))
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    pub fn write(
        &self,
        table: &str,
        address: &PartitionAddress,
        batch: &RecordBatch,
    ) -> Result<PathBuf> {
        let path = self.path_for(table, address);
        write_parquet_atomic(&path, batch)?;
        info!(
            "[WRITE] {:<18} {} ({} rows)",
            table,
            address,
            batch.num_rows()
        );
        Ok(path)
    }

    /// Addresses of `lang` that currently hold a committed file of `table`.
    pub fn committed(&self, table: &str, lang: &str) -> Result<Vec<PartitionAddress>> {
        let table_root = self.root.join(table);
        if !table_root.is_dir() {
            return Ok(Vec::new());
        }
        Ok(discover_language_partitions(&table_root, lang)?
            .into_iter()
            .map(|(address, _)| address)
            .collect())
    }

    /// Delete the committed file at an address. Returns whether one existed.
    pub fn remove(&self, table: &str, address: &PartitionAddress) -> Result<bool> {
        match std::fs::remove_file(self.path_for(table, address)) {
            Ok(()) => {
                info!("[PRUNE] {:<18} {}", table, address);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columnar::read_parquet;
    use crate::partition::YearMonth;
    use arrow::array::{ArrayRef, UInt32Array};
    use arrow::datatypes::DataType;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn ids(values: Vec<u32>) -> RecordBatch {
        let schema = schema! { "article_id" => DataType::UInt32, false; };
        record_batch!(schema, Arc::new(UInt32Array::from(values)) as ArrayRef).unwrap()
    }

    #[test]
    fn rewrite_replaces_instead_of_appending() {
        let tmp = TempDir::new().unwrap();
        let writer = PartitionWriter::new(tmp.path());
        let address = PartitionAddress::year("en", 2024);
        assert!(!writer.exists("top10_by_year", &address));

        writer.write("top10_by_year", &address, &ids(vec![1, 2, 3])).unwrap();
        let path = writer.write("top10_by_year", &address, &ids(vec![9])).unwrap();

        assert!(writer.exists("top10_by_year", &address));
        assert_eq!(path, tmp.path().join("top10_by_year/lang=en/year=2024/data.parquet"));
        let rows: usize = read_parquet(&path).unwrap().iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 1);
    }

    #[test]
    fn committed_lists_one_language_and_remove_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let writer = PartitionWriter::new(tmp.path());
        let may = PartitionAddress::month("en", YearMonth::new(2024, 5).unwrap());
        writer.write("edges_6m", &may, &ids(vec![1])).unwrap();
        writer
            .write("edges_6m", &PartitionAddress::month("de", YearMonth::new(2024, 5).unwrap()), &ids(vec![2]))
            .unwrap();

        assert_eq!(writer.committed("edges_6m", "en").unwrap(), vec![may.clone()]);
        assert!(writer.committed("trending_mom", "en").unwrap().is_empty());

        assert!(writer.remove("edges_6m", &may).unwrap());
        assert!(!writer.remove("edges_6m", &may).unwrap());
        assert!(writer.committed("edges_6m", "en").unwrap().is_empty());
        assert_eq!(writer.committed("edges_6m", "de").unwrap().len(), 1);
    }
}
