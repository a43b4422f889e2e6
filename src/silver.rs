//! Reader for the clean Silver partitions produced upstream.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::columnar::{int64_at, read_parquet, string_at, Columns};
use crate::error::{GoldError, Result};
use crate::partition::{PartitionAddress, DATA_FILE};

/// One clickstream transition: `count` readers went from `source_title` to
/// `target_title` through an `edge_type` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilverRow {
    pub source_title: Option<String>,
    pub target_title: String,
    pub edge_type: String,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct SilverPartition {
    pub address: PartitionAddress,
    pub rows: Vec<SilverRow>,
    /// Rows dropped for a null target, null type, or a non-positive count.
    pub dropped: usize,
}

impl SilverPartition {
    /// Every distinct title referenced as source or target.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flat_map(|row| {
            std::iter::once(row.target_title.as_str()).chain(row.source_title.as_deref())
        })
    }
}

/// `<silver>/lang=../year=../month=../data.parquet`
pub fn silver_partition_path(silver_root: &Path, address: &PartitionAddress) -> PathBuf {
    silver_root.join(address.relative_dir()).join(DATA_FILE)
}

pub fn read_silver_partition(path: &Path, address: &PartitionAddress) -> Result<SilverPartition> {
    if !path.is_file() {
        return Err(GoldError::MissingPartition {
            table: "silver".to_string(),
            address: address.clone(),
        });
    }

    let mut rows = Vec::new();
    let mut dropped = 0;
    for batch in read_parquet(path)? {
        let columns = Columns::new(path, &batch);
        let sources = columns.strings(&["source_title", "prev_title", "prev"])?;
        let targets = columns.strings(&["target_title", "curr_title", "curr"])?;
        let edge_types = columns.strings(&["edge_type", "type"])?;
        let counts = columns.int64(&["count", "n"])?;

        for i in 0..columns.num_rows() {
            let (Some(target), Some(edge_type), Some(count)) =
                (string_at(&targets, i), string_at(&edge_types, i), int64_at(&counts, i))
            else {
                dropped += 1;
                continue;
            };
            if count <= 0 || target.is_empty() {
                dropped += 1;
                continue;
            }
            rows.push(SilverRow {
                source_title: string_at(&sources, i)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                target_title: target.to_string(),
                edge_type: edge_type.to_string(),
                count,
            });
        }
    }

    debug!(
        partition = %address,
        rows = rows.len(),
        dropped,
        "read silver partition"
    );
    Ok(SilverPartition {
        address: address.clone(),
        rows,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columnar::write_parquet_atomic;
    use crate::partition::YearMonth;
    use arrow::array::{ArrayRef, Int32Array, StringArray};
    use arrow::datatypes::DataType;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn reads_legacy_column_names_and_drops_invalid_rows() {
        let tmp = TempDir::new().unwrap();
        let address = PartitionAddress::month("en", YearMonth::new(2024, 1).unwrap());
        let path = silver_partition_path(tmp.path(), &address);

        let schema = schema! {
            "prev_title" => DataType::Utf8;
            "curr_title" => DataType::Utf8;
            "type" => DataType::Utf8;
            "n" => DataType::Int32;
        };
        let batch = record_batch!(
            schema,
            Arc::new(StringArray::from(vec![Some("other-search"), None, Some("A"), Some("A")])) as ArrayRef,
            Arc::new(StringArray::from(vec![Some("A"), Some("B"), None, Some("C")])) as ArrayRef,
            Arc::new(StringArray::from(vec![Some("external"), Some("link"), Some("link"), Some("link")])) as ArrayRef,
            Arc::new(Int32Array::from(vec![Some(5), Some(2), Some(9), Some(0)])) as ArrayRef,
        )
        .unwrap();
        write_parquet_atomic(&path, &batch).unwrap();

        let partition = read_silver_partition(&path, &address).unwrap();
        assert_eq!(partition.dropped, 2);
        assert_eq!(
            partition.rows,
            vec![
                SilverRow {
                    source_title: Some("other-search".into()),
                    target_title: "A".into(),
                    edge_type: "external".into(),
                    count: 5,
                },
                SilverRow {
                    source_title: None,
                    target_title: "B".into(),
                    edge_type: "link".into(),
                    count: 2,
                },
            ]
        );
        let mut titles: Vec<_> = partition.titles().collect();
        titles.sort();
        assert_eq!(titles, vec!["A", "B", "other-search"]);
    }

    #[test]
    fn absent_partition_is_missing() {
        let tmp = TempDir::new().unwrap();
        let address = PartitionAddress::month("en", YearMonth::new(2024, 1).unwrap());
        let path = silver_partition_path(tmp.path(), &address);
        assert!(matches!(
            read_silver_partition(&path, &address),
            Err(GoldError::MissingPartition { .. })
        ));
    }
}
