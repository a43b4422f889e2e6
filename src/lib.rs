//! Gold aggregation and Gold-Specifics derivation for Wikipedia clickstream
//! data stored as Hive-partitioned Parquet.

#[macro_use]
mod macros;

pub mod columnar;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod gold;
pub mod partition;
pub mod ranking;
pub mod silver;
pub mod specifics;
pub mod stats;
pub mod writer;

pub use config::{PartialWindowPolicy, PartitionFilter, PipelineConfig};
pub use dictionary::{ArticleDictionary, DictionaryManager};
pub use error::{GoldError, Result};
pub use gold::{GoldBuilder, GoldRunSummary};
pub use partition::{PartitionAddress, RollingWindow, YearMonth};
pub use specifics::{SpecificsEngine, SpecificsRunSummary};
pub use stats::ProcessingStats;
pub use writer::PartitionWriter;
