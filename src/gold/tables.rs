//! Gold fact table schemas: row types, Arrow conversion, and typed readers.
//!
//! Every file carries its own `lang`, `year` and `month` columns next to the
//! Hive directories so it stays self-describing when copied elsewhere.

use std::collections::BTreeMap;
use std::path::Path;

use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use tracing::{debug, warn};

use crate::columnar::{read_parquet, Columns};
use crate::error::{GoldError, Result};
use crate::partition::{discover_language_partitions, MonthCalendar, PartitionAddress, YearMonth};

pub const ARTICLE_POPULARITY: &str = "article_popularity";
pub const ARTICLE_TOP: &str = "article_top";
pub const REFERRERS_TOP: &str = "referrers_top";
pub const EDGES_MONTHLY: &str = "edges_monthly";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularityRow {
    pub article_id: u32,
    pub total_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopArticleRow {
    pub article_id: u32,
    pub rank: u32,
    pub total_count: i64,
}

/// Clicks into `target_id` coming from `referrer_id`, which is either an
/// article or a referrer category such as `other-search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferrerRow {
    pub target_id: u32,
    pub referrer_id: u32,
    pub count: i64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRow {
    pub source_id: u32,
    pub target_id: u32,
    pub edge_type: String,
    pub count: i64,
}

fn monthly_period(address: &PartitionAddress) -> Result<YearMonth> {
    address.year_month().ok_or_else(|| {
        GoldError::Config(format!("{address} is not a monthly partition address"))
    })
}

// ====== RECORD BATCH CREATORS ======
pub fn popularity_to_record_batch(
    address: &PartitionAddress,
    rows: &[PopularityRow],
) -> Result<RecordBatch> {
    let period = monthly_period(address)?;
    let schema = schema! {
        "lang" => DataType::Utf8, false;
        "year" => DataType::Int32, false;
        "month" => DataType::Int32, false;
        "article_id" => DataType::UInt32, false;
        "total_count" => DataType::Int64, false;
    };

    let batch = record_batch!(
        schema,
        constant_string_array!(address.lang.as_str(), rows.len()),
        constant_int32_array!(period.year, rows.len()),
        constant_int32_array!(period.month as i32, rows.len()),
        uint32_array!(rows, article_id),
        int64_array!(rows, total_count),
    )?;

    Ok(batch)
}

pub fn article_top_to_record_batch(
    address: &PartitionAddress,
    rows: &[TopArticleRow],
) -> Result<RecordBatch> {
    let period = monthly_period(address)?;
    let schema = schema! {
        "lang" => DataType::Utf8, false;
        "year" => DataType::Int32, false;
        "month" => DataType::Int32, false;
        "article_id" => DataType::UInt32, false;
        "rank" => DataType::UInt32, false;
        "total_count" => DataType::Int64, false;
    };

    let batch = record_batch!(
        schema,
        constant_string_array!(address.lang.as_str(), rows.len()),
        constant_int32_array!(period.year, rows.len()),
        constant_int32_array!(period.month as i32, rows.len()),
        uint32_array!(rows, article_id),
        uint32_array!(rows, rank),
        int64_array!(rows, total_count),
    )?;

    Ok(batch)
}

pub fn referrers_to_record_batch(
    address: &PartitionAddress,
    rows: &[ReferrerRow],
) -> Result<RecordBatch> {
    let period = monthly_period(address)?;
    let schema = schema! {
        "lang" => DataType::Utf8, false;
        "year" => DataType::Int32, false;
        "month" => DataType::Int32, false;
        "target_id" => DataType::UInt32, false;
        "referrer_id" => DataType::UInt32, false;
        "count" => DataType::Int64, false;
        "rank" => DataType::UInt32, false;
    };

    let batch = record_batch!(
        schema,
        constant_string_array!(address.lang.as_str(), rows.len()),
        constant_int32_array!(period.year, rows.len()),
        constant_int32_array!(period.month as i32, rows.len()),
        uint32_array!(rows, target_id),
        uint32_array!(rows, referrer_id),
        int64_array!(rows, count),
        uint32_array!(rows, rank),
    )?;

    Ok(batch)
}

pub fn edges_to_record_batch(address: &PartitionAddress, rows: &[EdgeRow]) -> Result<RecordBatch> {
    let period = monthly_period(address)?;
    let schema = schema! {
        "lang" => DataType::Utf8, false;
        "year" => DataType::Int32, false;
        "month" => DataType::Int32, false;
        "source_id" => DataType::UInt32, false;
        "target_id" => DataType::UInt32, false;
        "edge_type" => DataType::Utf8, false;
        "count" => DataType::Int64, false;
    };

    let batch = record_batch!(
        schema,
        constant_string_array!(address.lang.as_str(), rows.len()),
        constant_int32_array!(period.year, rows.len()),
        constant_int32_array!(period.month as i32, rows.len()),
        uint32_array!(rows, source_id),
        uint32_array!(rows, target_id),
        string_array_required!(rows, edge_type),
        int64_array!(rows, count),
    )?;

    Ok(batch)
}

// ====== READERS ======
pub fn read_popularity(path: &Path) -> Result<Vec<PopularityRow>> {
    let mut rows = Vec::new();
    for batch in read_parquet(path)? {
        let columns = Columns::new(path, &batch);
        let ids = columns.uint32(&["article_id"])?;
        let totals = columns.int64(&["total_count"])?;
        columns.require_non_null("article_id", &ids)?;
        columns.require_non_null("total_count", &totals)?;
        rows.extend(
            ids.values()
                .iter()
                .zip(totals.values().iter())
                .map(|(&article_id, &total_count)| PopularityRow {
                    article_id,
                    total_count,
                }),
        );
    }
    Ok(rows)
}

pub fn read_article_top(path: &Path) -> Result<Vec<TopArticleRow>> {
    let mut rows = Vec::new();
    for batch in read_parquet(path)? {
        let columns = Columns::new(path, &batch);
        let ids = columns.uint32(&["article_id"])?;
        let ranks = columns.uint32(&["rank"])?;
        let totals = columns.int64(&["total_count"])?;
        columns.require_non_null("article_id", &ids)?;
        columns.require_non_null("rank", &ranks)?;
        columns.require_non_null("total_count", &totals)?;
        for i in 0..columns.num_rows() {
            rows.push(TopArticleRow {
                article_id: ids.value(i),
                rank: ranks.value(i),
                total_count: totals.value(i),
            });
        }
    }
    Ok(rows)
}

pub fn read_referrers(path: &Path) -> Result<Vec<ReferrerRow>> {
    let mut rows = Vec::new();
    for batch in read_parquet(path)? {
        let columns = Columns::new(path, &batch);
        let targets = columns.uint32(&["target_id"])?;
        let referrers = columns.uint32(&["referrer_id"])?;
        let counts = columns.int64(&["count"])?;
        let ranks = columns.uint32(&["rank"])?;
        columns.require_non_null("target_id", &targets)?;
        columns.require_non_null("referrer_id", &referrers)?;
        columns.require_non_null("count", &counts)?;
        columns.require_non_null("rank", &ranks)?;
        for i in 0..columns.num_rows() {
            rows.push(ReferrerRow {
                target_id: targets.value(i),
                referrer_id: referrers.value(i),
                count: counts.value(i),
                rank: ranks.value(i),
            });
        }
    }
    Ok(rows)
}

pub fn read_edges(path: &Path) -> Result<Vec<EdgeRow>> {
    let mut rows = Vec::new();
    for batch in read_parquet(path)? {
        let columns = Columns::new(path, &batch);
        let sources = columns.uint32(&["source_id"])?;
        let targets = columns.uint32(&["target_id"])?;
        let edge_types = columns.strings(&["edge_type"])?;
        let counts = columns.int64(&["count"])?;
        columns.require_non_null("source_id", &sources)?;
        columns.require_non_null("target_id", &targets)?;
        columns.require_non_null("edge_type", &edge_types)?;
        columns.require_non_null("count", &counts)?;
        for i in 0..columns.num_rows() {
            rows.push(EdgeRow {
                source_id: sources.value(i),
                target_id: targets.value(i),
                edge_type: edge_types.value(i).to_string(),
                count: counts.value(i),
            });
        }
    }
    Ok(rows)
}

/// One Gold table of one language, keyed by period.
///
/// Months whose file could not be read land in `broken` with their error.
/// They still count as committed, so calendars and windows see them.
#[derive(Debug)]
pub struct MonthlyTable<T> {
    pub months: BTreeMap<YearMonth, Vec<T>>,
    pub broken: BTreeMap<YearMonth, GoldError>,
}

impl<T> MonthlyTable<T> {
    pub fn empty() -> Self {
        Self {
            months: BTreeMap::new(),
            broken: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty() && self.broken.is_empty()
    }

    /// Readable and broken months together.
    pub fn calendar(&self) -> MonthCalendar {
        self.months.keys().chain(self.broken.keys()).copied().collect()
    }

    pub fn any_broken<I: IntoIterator<Item = YearMonth>>(&self, periods: I) -> bool {
        periods
            .into_iter()
            .any(|period| self.broken.contains_key(&period))
    }
}

/// Every committed month of `table` for `lang`. A file that fails to read is
/// recorded as broken and does not stop the other months.
pub fn read_monthly_table<T>(
    gold_root: &Path,
    table: &str,
    lang: &str,
    read: fn(&Path) -> Result<Vec<T>>,
) -> Result<MonthlyTable<T>> {
    let table_root = gold_root.join(table);
    let mut loaded = MonthlyTable::empty();
    if !table_root.is_dir() {
        return Ok(loaded);
    }
    for (address, path) in discover_language_partitions(&table_root, lang)? {
        let Some(period) = address.year_month() else {
            continue;
        };
        match read(&path) {
            Ok(rows) => {
                loaded.months.insert(period, rows);
            }
            Err(e) => {
                warn!("[BROKEN] {} {}: {}", table, address, e);
                loaded.broken.insert(period, e);
            }
        }
    }
    debug!(
        table,
        lang,
        months = loaded.months.len(),
        broken = loaded.broken.len(),
        "loaded gold table"
    );
    Ok(loaded)
}
