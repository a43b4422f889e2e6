use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::partition::{PartitionAddress, YearMonth};

/// Errors raised while building Gold facts or Gold-Specifics tables.
///
/// Everything except the dictionary-level kinds (see `is_fatal_for_language`) is
/// scoped to a single partition: the driver reports it and moves on.
#[derive(Debug, Error)]
pub enum GoldError {
    #[error("missing {table} partition {address}")]
    MissingPartition {
        table: String,
        address: PartitionAddress,
    },
    #[error("malformed partition {}: {reason}", path.display())]
    MalformedPartition { path: PathBuf, reason: String },
    #[error("article dictionary for lang={lang} is corrupt: {reason}")]
    DictionaryCorruption { lang: String, reason: String },
    #[error("{table} references article_id {article_id} absent from the lang={lang} dictionary")]
    ReferentialViolation {
        table: String,
        lang: String,
        article_id: u32,
    },
    #[error("title {title:?} was never resolved in the lang={lang} dictionary")]
    UnresolvedTitle { lang: String, title: String },
    #[error("window ending {end} for lang={lang} has {available} of {required} months")]
    WindowIncomplete {
        lang: String,
        end: YearMonth,
        available: usize,
        required: usize,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GoldError {
    /// Whether the error must stop every remaining build of the language.
    pub fn is_fatal_for_language(&self) -> bool {
        matches!(
            self,
            GoldError::DictionaryCorruption { .. }
                | GoldError::ReferentialViolation { .. }
                | GoldError::UnresolvedTitle { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GoldError>;
