use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GoldError, Result};
use crate::partition::{PartitionAddress, YearMonth};

/// What to do with a rolling window that has fewer months than configured.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum PartialWindowPolicy {
    /// Sum over the months that exist and label the row as partial.
    #[default]
    Compute,
    /// Write nothing for that window end.
    Skip,
}

/// Options recognised by the Gold and Gold-Specifics builders.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// changes. CLI flags override the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub silver_dir: PathBuf,
    pub gold_dir: PathBuf,
    pub specifics_dir: PathBuf,
    pub top_n_articles: usize,
    pub top_n_referrers: usize,
    pub top_n_all_time: usize,
    pub top_n_trending: usize,
    pub top_n_edges: usize,
    pub rolling_window_months: usize,
    pub enable_referrers: bool,
    pub enable_edges: bool,
    pub min_clicks_edges: i64,
    pub min_clicks_referrers: i64,
    pub partial_windows: PartialWindowPolicy,
    pub skip_existing: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            silver_dir: PathBuf::from("data/silver"),
            gold_dir: PathBuf::from("data/gold"),
            specifics_dir: PathBuf::from("data/gold_specifics"),
            top_n_articles: 100,
            top_n_referrers: 50,
            top_n_all_time: 500,
            top_n_trending: 100,
            top_n_edges: 100_000,
            rolling_window_months: 6,
            enable_referrers: true,
            enable_edges: true,
            min_clicks_edges: 1,
            min_clicks_referrers: 1,
            partial_windows: PartialWindowPolicy::Compute,
            skip_existing: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=120).contains(&self.rolling_window_months) {
            return Err(GoldError::Config(format!(
                "rolling_window_months must be within 1..=120, got {}",
                self.rolling_window_months
            )));
        }
        for (name, value) in [
            ("top_n_articles", self.top_n_articles),
            ("top_n_referrers", self.top_n_referrers),
            ("top_n_all_time", self.top_n_all_time),
            ("top_n_trending", self.top_n_trending),
            ("top_n_edges", self.top_n_edges),
        ] {
            if value == 0 {
                return Err(GoldError::Config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

/// Narrows which partitions a run touches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionFilter {
    pub lang: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// Keep only the most recent (year, month) among the remaining partitions.
    pub latest_month: bool,
}

impl PartitionFilter {
    pub fn accepts_lang(&self, lang: &str) -> bool {
        self.lang.as_deref().map_or(true, |wanted| wanted == lang)
    }

    pub fn accepts(&self, address: &PartitionAddress) -> bool {
        self.accepts_lang(&address.lang)
            && self.year.map_or(true, |y| address.year == Some(y))
            && self.month.map_or(true, |m| address.month == Some(m))
    }

    /// Apply every criterion, including `latest_month`, to a partition list.
    pub fn apply<T>(&self, partitions: Vec<(PartitionAddress, T)>) -> Vec<(PartitionAddress, T)> {
        let kept: Vec<_> = partitions
            .into_iter()
            .filter(|(address, _)| self.accepts(address))
            .collect();
        if !self.latest_month {
            return kept;
        }
        let latest: Option<YearMonth> = kept.iter().filter_map(|(a, _)| a.year_month()).max();
        kept.into_iter()
            .filter(|(address, _)| address.year_month() == latest)
            .collect()
    }
}
