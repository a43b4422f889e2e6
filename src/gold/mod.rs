//! Gold Fact Builder: turns one Silver partition into ID-keyed fact tables.
//!
//! Per partition the order is fixed: read Silver, take the language lock,
//! load the dictionary, resolve every title, aggregate, verify every emitted
//! ID, flush the dictionary, and only then write the facts. A crash at any
//! point leaves each file either as it was or fully replaced, and a committed
//! fact never references an ID missing from the committed dictionary.

pub mod tables;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::dictionary::{ArticleDictionary, DictionaryManager};
use crate::error::{GoldError, Result};
use crate::partition::PartitionAddress;
use crate::ranking::{rank_top, rank_top_per_group, Order};
use crate::silver::{read_silver_partition, SilverPartition};
use crate::stats::ProcessingStats;
use crate::writer::PartitionWriter;

pub use tables::{
    EdgeRow, MonthlyTable, PopularityRow, ReferrerRow, TopArticleRow, ARTICLE_POPULARITY, ARTICLE_TOP,
    EDGES_MONTHLY, REFERRERS_TOP,
};

/// Aggregates for one `(lang, year, month)`. Disabled tables are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoldTables {
    pub popularity: Vec<PopularityRow>,
    pub top: Vec<TopArticleRow>,
    pub referrers: Option<Vec<ReferrerRow>>,
    pub edges: Option<Vec<EdgeRow>>,
}

impl GoldTables {
    fn referenced_ids(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        let popularity = self
            .popularity
            .iter()
            .map(|r| (ARTICLE_POPULARITY, r.article_id));
        let top = self.top.iter().map(|r| (ARTICLE_TOP, r.article_id));
        let referrers = self
            .referrers
            .iter()
            .flatten()
            .flat_map(|r| [(REFERRERS_TOP, r.target_id), (REFERRERS_TOP, r.referrer_id)]);
        let edges = self
            .edges
            .iter()
            .flatten()
            .flat_map(|r| [(EDGES_MONTHLY, r.source_id), (EDGES_MONTHLY, r.target_id)]);
        popularity.chain(top).chain(referrers).chain(edges)
    }
}

/// Sum and rank a Silver partition whose titles are all present in `dict`.
///
/// Output rows are sorted (popularity and edges by key, rankings by rank) so
/// identical input always encodes to identical files.
pub fn aggregate(
    partition: &SilverPartition,
    dict: &ArticleDictionary,
    config: &PipelineConfig,
) -> Result<GoldTables> {
    let lookup = |title: &str| {
        dict.get(title).ok_or_else(|| GoldError::UnresolvedTitle {
            lang: dict.lang().to_string(),
            title: title.to_string(),
        })
    };

    let mut popularity: BTreeMap<u32, i64> = BTreeMap::new();
    let mut referrers: BTreeMap<(u32, u32), i64> = BTreeMap::new();
    let mut edges: BTreeMap<(u32, u32, &str), i64> = BTreeMap::new();

    for row in &partition.rows {
        let target = lookup(&row.target_title)?;
        *popularity.entry(target).or_default() += row.count;

        let Some(source_title) = row.source_title.as_deref() else {
            continue;
        };
        let source = lookup(source_title)?;
        if config.enable_referrers {
            *referrers.entry((target, source)).or_default() += row.count;
        }
        if config.enable_edges {
            *edges
                .entry((source, target, row.edge_type.as_str()))
                .or_default() += row.count;
        }
    }

    let top = rank_top(
        popularity.iter().map(|(&id, &total)| (id, total)),
        Order::Descending,
        config.top_n_articles,
    )
    .into_iter()
    .map(|ranked| TopArticleRow {
        article_id: ranked.key,
        rank: ranked.rank,
        total_count: ranked.count,
    })
    .collect();

    let referrers = config.enable_referrers.then(|| {
        rank_top_per_group(
            referrers
                .into_iter()
                .filter(|(_, count)| *count >= config.min_clicks_referrers),
            config.top_n_referrers,
        )
        .into_iter()
        .map(|(target_id, ranked)| ReferrerRow {
            target_id,
            referrer_id: ranked.key,
            count: ranked.count,
            rank: ranked.rank,
        })
        .collect()
    });

    let edges = config.enable_edges.then(|| {
        edges
            .into_iter()
            .filter(|(_, count)| *count >= config.min_clicks_edges)
            .map(|((source_id, target_id, edge_type), count)| EdgeRow {
                source_id,
                target_id,
                edge_type: edge_type.to_string(),
                count,
            })
            .collect()
    });

    Ok(GoldTables {
        popularity: popularity
            .into_iter()
            .map(|(article_id, total_count)| PopularityRow {
                article_id,
                total_count,
            })
            .collect(),
        top,
        referrers,
        edges,
    })
}

/// Every ID emitted by `tables` must exist in `dict`.
pub fn check_referential_integrity(tables: &GoldTables, dict: &ArticleDictionary) -> Result<()> {
    match tables
        .referenced_ids()
        .find(|(_, id)| !dict.contains_id(*id))
    {
        Some((table, article_id)) => Err(GoldError::ReferentialViolation {
            table: table.to_string(),
            lang: dict.lang().to_string(),
            article_id,
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Built { new_titles: usize },
    Skipped,
}

#[derive(Debug, Default)]
pub struct GoldRunSummary {
    pub built: usize,
    pub skipped: usize,
    pub failed: Vec<(PartitionAddress, String)>,
}

impl GoldRunSummary {
    fn merge(mut self, other: GoldRunSummary) -> Self {
        self.built += other.built;
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
        self
    }
}

pub struct GoldBuilder<'a> {
    config: &'a PipelineConfig,
    dictionaries: &'a DictionaryManager,
    writer: PartitionWriter,
    stats: &'a ProcessingStats,
}

impl<'a> GoldBuilder<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        dictionaries: &'a DictionaryManager,
        stats: &'a ProcessingStats,
    ) -> Self {
        Self {
            config,
            dictionaries,
            writer: PartitionWriter::new(&config.gold_dir),
            stats,
        }
    }

    fn enabled_tables(&self) -> Vec<&'static str> {
        let mut tables = vec![ARTICLE_POPULARITY, ARTICLE_TOP];
        if self.config.enable_referrers {
            tables.push(REFERRERS_TOP);
        }
        if self.config.enable_edges {
            tables.push(EDGES_MONTHLY);
        }
        tables
    }

    /// Build (or rebuild) every enabled Gold table of one partition.
    pub fn build_partition(
        &self,
        address: &PartitionAddress,
        silver_path: &Path,
    ) -> Result<BuildOutcome> {
        if self.config.skip_existing
            && self
                .enabled_tables()
                .iter()
                .all(|table| self.writer.exists(table, address))
        {
            info!("[SKIP] GOLD already exists for {}", address);
            ProcessingStats::add(&self.stats.partitions_skipped, 1);
            return Ok(BuildOutcome::Skipped);
        }

        let partition = read_silver_partition(silver_path, address)?;
        ProcessingStats::add(&self.stats.silver_rows, partition.rows.len() as u64);
        ProcessingStats::add(&self.stats.silver_rows_dropped, partition.dropped as u64);

        let lock = self.dictionaries.language_lock(&address.lang);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut dict = self.dictionaries.load(&address.lang)?;
        let new_titles = dict.resolve_all(partition.titles())?;
        let tables = aggregate(&partition, &dict, self.config)?;
        check_referential_integrity(&tables, &dict)?;

        self.dictionaries.flush(&mut dict)?;
        ProcessingStats::add(&self.stats.titles_added, new_titles as u64);

        self.write_tables(address, &tables)?;
        ProcessingStats::add(&self.stats.partitions_built, 1);
        info!(
            "[OK] GOLD {} ({} articles, {} new titles)",
            address,
            tables.popularity.len(),
            new_titles
        );
        Ok(BuildOutcome::Built { new_titles })
    }

    fn write_tables(&self, address: &PartitionAddress, tables: &GoldTables) -> Result<()> {
        let mut batches = vec![
            (
                ARTICLE_POPULARITY,
                tables::popularity_to_record_batch(address, &tables.popularity)?,
            ),
            (
                ARTICLE_TOP,
                tables::article_top_to_record_batch(address, &tables.top)?,
            ),
        ];
        if let Some(referrers) = &tables.referrers {
            batches.push((
                REFERRERS_TOP,
                tables::referrers_to_record_batch(address, referrers)?,
            ));
        }
        if let Some(edges) = &tables.edges {
            batches.push((EDGES_MONTHLY, tables::edges_to_record_batch(address, edges)?));
        }
        for (table, batch) in &batches {
            self.writer.write(table, address, batch)?;
            ProcessingStats::add(&self.stats.gold_files_written, 1);
        }
        Ok(())
    }

    /// Build many partitions: languages in parallel, months of one language
    /// sequentially in calendar order. A failure is logged and only affects
    /// its partition, except dictionary-level failures, which stop the rest
    /// of that language.
    pub fn run(&self, partitions: Vec<(PartitionAddress, PathBuf)>) -> GoldRunSummary {
        let mut by_lang: BTreeMap<String, Vec<(PartitionAddress, PathBuf)>> = BTreeMap::new();
        for (address, path) in partitions {
            by_lang.entry(address.lang.clone()).or_default().push((address, path));
        }
        for months in by_lang.values_mut() {
            months.sort();
        }

        let total: usize = by_lang.values().map(Vec::len).sum();
        info!(
            "Building GOLD for {} partitions across {} languages",
            total,
            by_lang.len()
        );

        let progress = ProgressBar::new(total as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:50.cyan/blue} {pos:>7}/{len:7} partitions | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("Building GOLD...");

        let summary = by_lang
            .into_par_iter()
            .map(|(lang, months)| self.run_language(&lang, months, &progress))
            .reduce(GoldRunSummary::default, GoldRunSummary::merge);

        progress.finish_with_message("GOLD complete");
        summary
    }

    fn run_language(
        &self,
        lang: &str,
        months: Vec<(PartitionAddress, PathBuf)>,
        progress: &ProgressBar,
    ) -> GoldRunSummary {
        let mut summary = GoldRunSummary::default();
        let mut months = months.into_iter();
        while let Some((address, path)) = months.next() {
            let result = self.build_partition(&address, &path);
            progress.inc(1);
            match result {
                Ok(BuildOutcome::Built { .. }) => summary.built += 1,
                Ok(BuildOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    error!("[ERROR] GOLD {}: {}", address, e);
                    ProcessingStats::add(&self.stats.partitions_failed, 1);
                    let fatal = e.is_fatal_for_language();
                    summary.failed.push((address, e.to_string()));
                    if fatal {
                        let reason = format!("not built: lang={lang} stopped after: {e}");
                        for (rest, _) in months.by_ref() {
                            warn!("[ABORT] GOLD {}", rest);
                            progress.inc(1);
                            ProcessingStats::add(&self.stats.partitions_failed, 1);
                            summary.failed.push((rest, reason.clone()));
                        }
                    }
                }
            }
        }
        summary
    }
}
