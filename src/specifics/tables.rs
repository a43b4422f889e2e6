//! Gold-Specifics output schemas.


use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::partition::{RollingWindow, YearMonth};

pub const TOP10_BY_YEAR: &str = "top10_by_year";
pub const ALL_TIME_TOP: &str = "all_time_top";
pub const EDGES_6M: &str = "edges_6m";
pub const TRENDING_MOM: &str = "trending_mom";
pub const REFERRERS_6M: &str = "referrers_6m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedArticle {
    pub article_id: u32,
    pub total_count: i64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEdgeRow {
    pub source_id: u32,
    pub target_id: u32,
    pub edge_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowReferrerRow {
    pub target_id: u32,
    pub referrer_id: u32,
    pub count: i64,
    pub rank: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
        }
    }
}

/// Month-over-month change of one article between `M-1` and `M`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRow {
    pub direction: TrendDirection,
    pub rank: u32,
    pub article_id: u32,
    pub count_prev: i64,
    pub count_curr: i64,
    pub delta: i64,
    /// `delta / count_prev`; `None` when the article had no clicks in `M-1`.
    pub pct_change: Option<f64>,
}

pub fn top10_to_record_batch(lang: &str, year: i32, rows: &[RankedArticle]) -> Result<RecordBatch> {
    let schema = schema! {
        "lang" => DataType::Utf8, false;
        "year" => DataType::Int32, false;
        "article_id" => DataType::UInt32, false;
        "total_count" => DataType::Int64, false;
        "rank" => DataType::UInt32, false;
    };

    Ok(record_batch!(
        schema,
        constant_string_array!(lang, rows.len()),
        constant_int32_array!(year, rows.len()),
        uint32_array!(rows, article_id),
        int64_array!(rows, total_count),
        uint32_array!(rows, rank),
    )?)
}

pub fn all_time_to_record_batch(lang: &str, rows: &[RankedArticle]) -> Result<RecordBatch> {
    let schema = schema! {
        "lang" => DataType::Utf8, false;
        "article_id" => DataType::UInt32, false;
        "total_count" => DataType::Int64, false;
        "rank" => DataType::UInt32, false;
    };

    Ok(record_batch!(
        schema,
        constant_string_array!(lang, rows.len()),
        uint32_array!(rows, article_id),
        int64_array!(rows, total_count),
        uint32_array!(rows, rank),
    )?)
}

pub fn window_edges_to_record_batch(
    lang: &str,
    window: &RollingWindow,
    rows: &[WindowEdgeRow],
) -> Result<RecordBatch> {
    let schema = schema! {
        "lang" => DataType::Utf8, false;
        "window_end_year" => DataType::Int32, false;
        "window_end_month" => DataType::Int32, false;
        "months_in_window" => DataType::UInt8, false;
        "window_complete" => DataType::Boolean, false;
        "source_id" => DataType::UInt32, false;
        "target_id" => DataType::UInt32, false;
        "edge_type" => DataType::Utf8, false;
        "count" => DataType::Int64, false;
    };

    let n = rows.len();
    Ok(record_batch!(
        schema,
        constant_string_array!(lang, n),
        constant_int32_array!(window.end.year, n),
        constant_int32_array!(window.end.month as i32, n),
        constant_uint8_array!(window.months_in_window() as u8, n),
        constant_bool_array!(window.is_complete(), n),
        uint32_array!(rows, source_id),
        uint32_array!(rows, target_id),
        string_array_required!(rows, edge_type),
        int64_array!(rows, count),
    )?)
}

pub fn window_referrers_to_record_batch(
    lang: &str,
    window: &RollingWindow,
    rows: &[WindowReferrerRow],
) -> Result<RecordBatch> {
    let schema = schema! {
        "lang" => DataType::Utf8, false;
        "window_end_year" => DataType::Int32, false;
        "window_end_month" => DataType::Int32, false;
        "months_in_window" => DataType::UInt8, false;
        "window_complete" => DataType::Boolean, false;
        "target_id" => DataType::UInt32, false;
        "referrer_id" => DataType::UInt32, false;
        "count" => DataType::Int64, false;
        "rank" => DataType::UInt32, false;
    };

    let n = rows.len();
    Ok(record_batch!(
        schema,
        constant_string_array!(lang, n),
        constant_int32_array!(window.end.year, n),
        constant_int32_array!(window.end.month as i32, n),
        constant_uint8_array!(window.months_in_window() as u8, n),
        constant_bool_array!(window.is_complete(), n),
        uint32_array!(rows, target_id),
        uint32_array!(rows, referrer_id),
        int64_array!(rows, count),
        uint32_array!(rows, rank),
    )?)
}

pub fn trending_to_record_batch(
    lang: &str,
    period: YearMonth,
    rows: &[TrendRow],
) -> Result<RecordBatch> {
    let schema = schema! {
        "lang" => DataType::Utf8, false;
        "window_end_year" => DataType::Int32, false;
        "window_end_month" => DataType::Int32, false;
        "direction" => DataType::Utf8, false;
        "rank" => DataType::UInt32, false;
        "article_id" => DataType::UInt32, false;
        "count_prev" => DataType::Int64, false;
        "count_curr" => DataType::Int64, false;
        "delta" => DataType::Int64, false;
        "pct_change" => DataType::Float64;
    };

    let n = rows.len();
    let directions = std::sync::Arc::new(arrow::array::StringArray::from_iter_values(
        rows.iter().map(|r| r.direction.as_str()),
    )) as arrow::array::ArrayRef;
    Ok(record_batch!(
        schema,
        constant_string_array!(lang, n),
        constant_int32_array!(period.year, n),
        constant_int32_array!(period.month as i32, n),
        directions,
        uint32_array!(rows, rank),
        uint32_array!(rows, article_id),
        int64_array!(rows, count_prev),
        int64_array!(rows, count_curr),
        int64_array!(rows, delta),
        float64_array_optional!(rows, pct_change),
    )?)
}
