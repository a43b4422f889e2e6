//! Specifics Derivation Engine: windowed analytics computed from Gold.
//!
//! Each derivation is a pure function over Gold rows keyed by month, and each
//! run recomputes its outputs from scratch. Windows are built from the
//! explicit calendar of committed months, so gaps are visible and the
//! partial-window policy is an explicit branch.

pub mod tables;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use arrow::record_batch::RecordBatch;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::config::{PartialWindowPolicy, PartitionFilter, PipelineConfig};
use crate::error::{GoldError, Result};
use crate::gold::tables::{
    read_article_top, read_edges, read_monthly_table, read_popularity, read_referrers,
};
use crate::gold::{
    EdgeRow, MonthlyTable, PopularityRow, ReferrerRow, TopArticleRow, ARTICLE_POPULARITY, ARTICLE_TOP,
    EDGES_MONTHLY, REFERRERS_TOP,
};
use crate::partition::{discover_languages, MonthCalendar, PartitionAddress, RollingWindow, YearMonth};
use crate::ranking::{rank_top, rank_top_per_group, Order, Ranked};
use crate::stats::ProcessingStats;
use crate::writer::PartitionWriter;

pub use tables::{
    RankedArticle, TrendDirection, TrendRow, WindowEdgeRow, WindowReferrerRow, ALL_TIME_TOP,
    EDGES_6M, REFERRERS_6M, TOP10_BY_YEAR, TRENDING_MOM,
};

/// Rows kept per year in `top10_by_year`.
pub const TOP_PER_YEAR: usize = 10;

fn ranked_articles(ranked: Vec<Ranked<u32>>) -> Vec<RankedArticle> {
    ranked
        .into_iter()
        .map(|r| RankedArticle {
            article_id: r.key,
            total_count: r.count,
            rank: r.rank,
        })
        .collect()
}

/// Per year, sum `article_top` totals over the year's months and keep the top 10.
pub fn top10_by_year(
    article_top: &BTreeMap<YearMonth, Vec<TopArticleRow>>,
) -> BTreeMap<i32, Vec<RankedArticle>> {
    let mut per_year: BTreeMap<i32, HashMap<u32, i64>> = BTreeMap::new();
    for (period, rows) in article_top {
        let totals = per_year.entry(period.year).or_default();
        for row in rows {
            *totals.entry(row.article_id).or_default() += row.total_count;
        }
    }
    per_year
        .into_iter()
        .map(|(year, totals)| {
            (
                year,
                ranked_articles(rank_top(totals, Order::Descending, TOP_PER_YEAR)),
            )
        })
        .collect()
}

/// Sum popularity over every available month and keep the top `limit`.
pub fn all_time_top(
    popularity: &BTreeMap<YearMonth, Vec<PopularityRow>>,
    limit: usize,
) -> Vec<RankedArticle> {
    let mut totals: HashMap<u32, i64> = HashMap::new();
    for row in popularity.values().flatten() {
        *totals.entry(row.article_id).or_default() += row.total_count;
    }
    ranked_articles(rank_top(totals, Order::Descending, limit))
}

/// Sum `edges_monthly` over the months of `window`, largest first.
pub fn edges_rolling(
    edges: &BTreeMap<YearMonth, Vec<EdgeRow>>,
    window: &RollingWindow,
    limit: usize,
) -> Vec<WindowEdgeRow> {
    let mut totals: HashMap<(u32, u32, &str), i64> = HashMap::new();
    for period in &window.months {
        for row in edges.get(period).into_iter().flatten() {
            *totals
                .entry((row.source_id, row.target_id, row.edge_type.as_str()))
                .or_default() += row.count;
        }
    }
    rank_top(totals, Order::Descending, limit)
        .into_iter()
        .map(|ranked| {
            let (source_id, target_id, edge_type) = ranked.key;
            WindowEdgeRow {
                source_id,
                target_id,
                edge_type: edge_type.to_string(),
                count: ranked.count,
            }
        })
        .collect()
}

/// Sum `referrers_top` per `(target, referrer)` over `window`, re-ranked per target.
pub fn referrers_rolling(
    referrers: &BTreeMap<YearMonth, Vec<ReferrerRow>>,
    window: &RollingWindow,
    limit: usize,
) -> Vec<WindowReferrerRow> {
    let mut totals: HashMap<(u32, u32), i64> = HashMap::new();
    for period in &window.months {
        for row in referrers.get(period).into_iter().flatten() {
            *totals.entry((row.target_id, row.referrer_id)).or_default() += row.count;
        }
    }
    rank_top_per_group(totals, limit)
        .into_iter()
        .map(|(target_id, ranked)| WindowReferrerRow {
            target_id,
            referrer_id: ranked.key,
            count: ranked.count,
            rank: ranked.rank,
        })
        .collect()
}

/// Month-over-month deltas between two popularity snapshots.
///
/// An article missing from one month counts as 0 there. "up" keeps the
/// `limit` largest positive deltas, "down" the `limit` most negative ones.
pub fn trending_mom(prev: &[PopularityRow], curr: &[PopularityRow], limit: usize) -> Vec<TrendRow> {
    let mut counts: BTreeMap<u32, (i64, i64)> = BTreeMap::new();
    for row in prev {
        counts.entry(row.article_id).or_default().0 += row.total_count;
    }
    for row in curr {
        counts.entry(row.article_id).or_default().1 += row.total_count;
    }

    let deltas = || counts.iter().map(|(&id, &(p, c))| (id, c - p));
    let up = rank_top(deltas().filter(|(_, d)| *d > 0), Order::Descending, limit);
    let down = rank_top(deltas().filter(|(_, d)| *d < 0), Order::Ascending, limit);

    let trend = |direction: TrendDirection, ranked: Ranked<u32>| {
        let (count_prev, count_curr) = counts[&ranked.key];
        TrendRow {
            direction,
            rank: ranked.rank,
            article_id: ranked.key,
            count_prev,
            count_curr,
            delta: ranked.count,
            pct_change: (count_prev != 0).then(|| ranked.count as f64 / count_prev as f64),
        }
    };
    up.into_iter()
        .map(|r| trend(TrendDirection::Up, r))
        .chain(down.into_iter().map(|r| trend(TrendDirection::Down, r)))
        .collect()
}

#[derive(Debug, Default)]
pub struct SpecificsRunSummary {
    pub languages: usize,
    pub files_written: usize,
    pub files_pruned: usize,
    /// Outputs left untouched because a Gold month they read is unreadable.
    pub blocked: usize,
    pub failed: Vec<(String, String)>,
}

impl SpecificsRunSummary {
    fn merge(mut self, other: SpecificsRunSummary) -> Self {
        self.languages += other.languages;
        self.files_written += other.files_written;
        self.files_pruned += other.files_pruned;
        self.blocked += other.blocked;
        self.failed.extend(other.failed);
        self
    }
}

/// What one language's derivation did to the Gold-Specifics tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LanguageOutcome {
    pub written: usize,
    pub pruned: usize,
    pub blocked: usize,
}

/// Gold rows of one language, loaded once and shared by every derivation.
struct LanguageGold {
    popularity: MonthlyTable<PopularityRow>,
    article_top: MonthlyTable<TopArticleRow>,
    edges: MonthlyTable<EdgeRow>,
    referrers: MonthlyTable<ReferrerRow>,
}

impl LanguageGold {
    fn unreadable(&self) -> usize {
        self.popularity.broken.len()
            + self.article_top.broken.len()
            + self.edges.broken.len()
            + self.referrers.broken.len()
    }
}

/// Addresses of one monthly table that a run is responsible for.
fn monthly_scope<'f>(
    filter: &'f PartitionFilter,
    calendar: &MonthCalendar,
) -> impl Fn(&PartitionAddress) -> bool + 'f {
    let latest = calendar.latest();
    move |address| {
        if filter.latest_month {
            latest.is_some() && address.year_month() == latest
        } else {
            filter.accepts(address)
        }
    }
}

pub struct SpecificsEngine<'a> {
    config: &'a PipelineConfig,
    writer: PartitionWriter,
    stats: &'a ProcessingStats,
}

impl<'a> SpecificsEngine<'a> {
    pub fn new(config: &'a PipelineConfig, stats: &'a ProcessingStats) -> Self {
        Self {
            config,
            writer: PartitionWriter::new(&config.specifics_dir),
            stats,
        }
    }

    /// Languages present in any Gold table the engine reads.
    pub fn languages(&self) -> Result<BTreeSet<String>> {
        let mut langs = BTreeSet::new();
        for table in [ARTICLE_POPULARITY, ARTICLE_TOP, EDGES_MONTHLY, REFERRERS_TOP] {
            let root = self.config.gold_dir.join(table);
            if root.is_dir() {
                langs.extend(discover_languages(&root)?);
            }
        }
        Ok(langs)
    }

    fn load(&self, lang: &str) -> Result<LanguageGold> {
        let gold = &self.config.gold_dir;
        Ok(LanguageGold {
            popularity: read_monthly_table(gold, ARTICLE_POPULARITY, lang, read_popularity)?,
            article_top: read_monthly_table(gold, ARTICLE_TOP, lang, read_article_top)?,
            edges: if self.config.enable_edges {
                read_monthly_table(gold, EDGES_MONTHLY, lang, read_edges)?
            } else {
                MonthlyTable::empty()
            },
            referrers: if self.config.enable_referrers {
                read_monthly_table(gold, REFERRERS_TOP, lang, read_referrers)?
            } else {
                MonthlyTable::empty()
            },
        })
    }

    /// Window ends to compute for a calendar, honouring the run filter.
    fn window_ends(&self, lang: &str, calendar: &MonthCalendar, filter: &PartitionFilter) -> Vec<YearMonth> {
        if filter.latest_month {
            return calendar.latest().into_iter().collect();
        }
        calendar
            .iter()
            .filter(|end| filter.accepts(&PartitionAddress::month(lang, *end)))
            .collect()
    }

    /// Apply the partial-window policy. `None` means the window is skipped.
    fn admit_window(&self, lang: &str, table: &str, window: RollingWindow) -> Option<RollingWindow> {
        match (window.require_complete(lang), self.config.partial_windows) {
            (Ok(()), _) => Some(window),
            (Err(e), PartialWindowPolicy::Compute) => {
                debug!(table, "computing partial window: {}", e);
                Some(window)
            }
            (Err(e), PartialWindowPolicy::Skip) => {
                debug!(table, "skipping window: {}", e);
                ProcessingStats::add(&self.stats.windows_skipped, 1);
                None
            }
        }
    }

    fn write(
        &self,
        table: &str,
        address: &PartitionAddress,
        batch: &RecordBatch,
        outcome: &mut LanguageOutcome,
    ) -> Result<()> {
        self.writer.write(table, address, batch)?;
        ProcessingStats::add(&self.stats.specifics_files_written, 1);
        outcome.written += 1;
        Ok(())
    }

    fn block(&self, table: &str, address: &PartitionAddress, outcome: &mut LanguageOutcome) {
        warn!("[BLOCKED] {:<18} {} reads an unreadable GOLD month", table, address);
        ProcessingStats::add(&self.stats.derivations_blocked, 1);
        outcome.blocked += 1;
    }

    /// Remove committed files of `table` that this run owns but did not keep.
    fn prune(
        &self,
        table: &str,
        lang: &str,
        kept: &BTreeSet<PartitionAddress>,
        in_scope: impl Fn(&PartitionAddress) -> bool,
        outcome: &mut LanguageOutcome,
    ) -> Result<()> {
        for address in self.writer.committed(table, lang)? {
            if in_scope(&address) && !kept.contains(&address) && self.writer.remove(table, &address)? {
                ProcessingStats::add(&self.stats.specifics_files_pruned, 1);
                outcome.pruned += 1;
            }
        }
        Ok(())
    }

    fn derive_top10(&self, lang: &str, gold: &LanguageGold, filter: &PartitionFilter, outcome: &mut LanguageOutcome) -> Result<()> {
        let by_year = top10_by_year(&gold.article_top.months);
        let years: BTreeSet<i32> = gold.article_top.calendar().iter().map(|p| p.year).collect();
        let in_scope = |address: &PartitionAddress| filter.year.map_or(true, |y| address.year == Some(y));

        let mut kept = BTreeSet::new();
        for year in years {
            let address = PartitionAddress::year(lang, year);
            if !in_scope(&address) {
                continue;
            }
            if gold.article_top.broken.keys().any(|p| p.year == year) {
                self.block(TOP10_BY_YEAR, &address, outcome);
            } else {
                let rows = by_year.get(&year).map(Vec::as_slice).unwrap_or_default();
                let batch = tables::top10_to_record_batch(lang, year, rows)?;
                self.write(TOP10_BY_YEAR, &address, &batch, outcome)?;
            }
            kept.insert(address);
        }
        self.prune(TOP10_BY_YEAR, lang, &kept, in_scope, outcome)
    }

    fn derive_all_time(&self, lang: &str, gold: &LanguageGold, outcome: &mut LanguageOutcome) -> Result<()> {
        let address = PartitionAddress::language(lang);
        let mut kept = BTreeSet::new();
        if !gold.popularity.broken.is_empty() {
            self.block(ALL_TIME_TOP, &address, outcome);
            kept.insert(address);
        } else if !gold.popularity.months.is_empty() {
            let rows = all_time_top(&gold.popularity.months, self.config.top_n_all_time);
            let batch = tables::all_time_to_record_batch(lang, &rows)?;
            self.write(ALL_TIME_TOP, &address, &batch, outcome)?;
            kept.insert(address);
        }
        self.prune(ALL_TIME_TOP, lang, &kept, |_| true, outcome)
    }

    fn derive_trending(&self, lang: &str, gold: &LanguageGold, filter: &PartitionFilter, outcome: &mut LanguageOutcome) -> Result<()> {
        let popularity = &gold.popularity;
        let calendar = popularity.calendar();
        let mut kept = BTreeSet::new();
        for end in self.window_ends(lang, &calendar, filter) {
            let address = PartitionAddress::month(lang, end);
            if let Err(e) = calendar.window(end, 2).require_complete(lang) {
                debug!(table = TRENDING_MOM, "no predecessor month: {}", e);
                continue;
            }
            if popularity.any_broken([end.pred(), end]) {
                self.block(TRENDING_MOM, &address, outcome);
                kept.insert(address);
                continue;
            }
            let rows = trending_mom(
                &popularity.months[&end.pred()],
                &popularity.months[&end],
                self.config.top_n_trending,
            );
            let batch = tables::trending_to_record_batch(lang, end, &rows)?;
            self.write(TRENDING_MOM, &address, &batch, outcome)?;
            kept.insert(address);
        }
        self.prune(TRENDING_MOM, lang, &kept, monthly_scope(filter, &calendar), outcome)
    }

    /// One rolling-window output per window end of `source`'s calendar.
    fn derive_windows<T>(
        &self,
        table: &str,
        lang: &str,
        source: &MonthlyTable<T>,
        filter: &PartitionFilter,
        outcome: &mut LanguageOutcome,
        compute: impl Fn(&RollingWindow) -> Result<RecordBatch>,
    ) -> Result<()> {
        let calendar = source.calendar();
        let mut kept = BTreeSet::new();
        for end in self.window_ends(lang, &calendar, filter) {
            let address = PartitionAddress::month(lang, end);
            let window = calendar.window(end, self.config.rolling_window_months);
            if source.any_broken(window.months.iter().copied()) {
                self.block(table, &address, outcome);
                kept.insert(address);
                continue;
            }
            let Some(window) = self.admit_window(lang, table, window) else {
                continue;
            };
            let batch = compute(&window)?;
            self.write(table, &address, &batch, outcome)?;
            kept.insert(address);
        }
        self.prune(table, lang, &kept, monthly_scope(filter, &calendar), outcome)
    }

    /// Recompute every Gold-Specifics table of one language.
    ///
    /// An unreadable Gold month blocks only the outputs that read it. Those
    /// keep their previous file. Any other committed output that this run owns
    /// but no longer produces is removed, so the tree always reflects one
    /// configuration.
    pub fn derive_language(&self, lang: &str, filter: &PartitionFilter) -> Result<LanguageOutcome> {
        let gold = self.load(lang)?;
        if gold.popularity.is_empty() && gold.edges.is_empty() {
            return Err(GoldError::MissingPartition {
                table: ARTICLE_POPULARITY.to_string(),
                address: PartitionAddress::language(lang),
            });
        }
        ProcessingStats::add(&self.stats.gold_files_unreadable, gold.unreadable() as u64);

        let mut outcome = LanguageOutcome::default();
        self.derive_top10(lang, &gold, filter, &mut outcome)?;
        self.derive_all_time(lang, &gold, &mut outcome)?;
        self.derive_trending(lang, &gold, filter, &mut outcome)?;

        if self.config.enable_edges {
            self.derive_windows(EDGES_6M, lang, &gold.edges, filter, &mut outcome, |window| {
                let rows = edges_rolling(&gold.edges.months, window, self.config.top_n_edges);
                tables::window_edges_to_record_batch(lang, window, &rows)
            })?;
        }
        if self.config.enable_referrers {
            self.derive_windows(REFERRERS_6M, lang, &gold.referrers, filter, &mut outcome, |window| {
                let rows = referrers_rolling(&gold.referrers.months, window, self.config.top_n_referrers);
                tables::window_referrers_to_record_batch(lang, window, &rows)
            })?;
        }

        info!(
            "[OK] GOLD_Specifics lang={} ({} written, {} pruned, {} blocked)",
            lang, outcome.written, outcome.pruned, outcome.blocked
        );
        Ok(outcome)
    }

    /// Derive every selected language in parallel. Gold is only read, so
    /// languages share nothing but the stats counters.
    pub fn run(&self, filter: &PartitionFilter) -> Result<SpecificsRunSummary> {
        let langs: Vec<String> = self
            .languages()?
            .into_iter()
            .filter(|lang| filter.accepts_lang(lang))
            .collect();
        if langs.is_empty() {
            warn!(
                "No languages found in GOLD under {}",
                self.config.gold_dir.display()
            );
            return Ok(SpecificsRunSummary::default());
        }

        let progress = ProgressBar::new(langs.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:50.cyan/blue} {pos:>4}/{len:4} languages | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("Deriving GOLD_Specifics...");

        let summary = langs
            .par_iter()
            .map(|lang| {
                let result = self.derive_language(lang, filter);
                progress.inc(1);
                match result {
                    Ok(outcome) => SpecificsRunSummary {
                        languages: 1,
                        files_written: outcome.written,
                        files_pruned: outcome.pruned,
                        blocked: outcome.blocked,
                        failed: Vec::new(),
                    },
                    Err(e) => {
                        error!("[ERROR] GOLD_Specifics lang={}: {}", lang, e);
                        SpecificsRunSummary {
                            failed: vec![(lang.clone(), e.to_string())],
                            ..Default::default()
                        }
                    }
                }
            })
            .reduce(SpecificsRunSummary::default, SpecificsRunSummary::merge);

        progress.finish_with_message("GOLD_Specifics complete");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn pop(rows: &[(u32, i64)]) -> Vec<PopularityRow> {
        rows.iter()
            .map(|&(article_id, total_count)| PopularityRow {
                article_id,
                total_count,
            })
            .collect()
    }

    fn edge(source_id: u32, target_id: u32, count: i64) -> EdgeRow {
        EdgeRow {
            source_id,
            target_id,
            edge_type: "link".to_string(),
            count,
        }
    }

    #[test]
    fn six_month_window_sums_every_month() {
        let edges: BTreeMap<_, _> = (1..=6).map(|m| (ym(2024, m), vec![edge(0, 1, 10)])).collect();
        let calendar: MonthCalendar = edges.keys().copied().collect();
        let window = calendar.window(ym(2024, 6), 6);
        assert!(window.is_complete());

        let rows = edges_rolling(&edges, &window, 100);
        assert_eq!(
            rows,
            vec![WindowEdgeRow {
                source_id: 0,
                target_id: 1,
                edge_type: "link".into(),
                count: 60,
            }]
        );
    }

    #[test]
    fn window_crosses_year_and_ignores_months_outside() {
        let edges: BTreeMap<_, _> = [
            (ym(2023, 8), vec![edge(0, 1, 1000)]),
            (ym(2023, 11), vec![edge(0, 1, 1), edge(2, 1, 4)]),
            (ym(2024, 1), vec![edge(0, 1, 2)]),
            (ym(2024, 2), vec![edge(0, 1, 3)]),
        ]
        .into_iter()
        .collect();
        let calendar: MonthCalendar = edges.keys().copied().collect();
        let window = calendar.window(ym(2024, 2), 6);
        assert_eq!(window.months_in_window(), 3);
        assert!(!window.is_complete());

        let rows = edges_rolling(&edges, &window, 100);
        let flat: Vec<_> = rows.iter().map(|r| (r.source_id, r.count)).collect();
        assert_eq!(flat, vec![(0, 6), (2, 4)]);
    }

    #[test]
    fn trending_reports_exact_delta_and_ratio() {
        let rows = trending_mom(&pop(&[(0, 100)]), &pop(&[(0, 150)]), 10);
        assert_eq!(
            rows,
            vec![TrendRow {
                direction: TrendDirection::Up,
                rank: 1,
                article_id: 0,
                count_prev: 100,
                count_curr: 150,
                delta: 50,
                pct_change: Some(0.5),
            }]
        );
    }

    #[test]
    fn trending_splits_directions_and_guards_zero_base() {
        let prev = pop(&[(1, 10), (2, 40), (3, 5), (4, 7)]);
        let curr = pop(&[(1, 30), (2, 10), (4, 7), (5, 8)]);
        let rows = trending_mom(&prev, &curr, 10);

        let flat: Vec<_> = rows
            .iter()
            .map(|r| (r.direction, r.rank, r.article_id, r.delta))
            .collect();
        assert_eq!(
            flat,
            vec![
                (TrendDirection::Up, 1, 1, 20),
                (TrendDirection::Up, 2, 5, 8),
                (TrendDirection::Down, 1, 2, -30),
                (TrendDirection::Down, 2, 3, -5),
            ]
        );
        let newcomer = rows.iter().find(|r| r.article_id == 5).unwrap();
        assert_eq!(newcomer.count_prev, 0);
        assert_eq!(newcomer.pct_change, None);
        let vanished = rows.iter().find(|r| r.article_id == 3).unwrap();
        assert_eq!(vanished.pct_change, Some(-1.0));
    }

    #[test]
    fn top10_by_year_sums_months_within_each_year() {
        let top = |rows: &[(u32, i64)]| -> Vec<TopArticleRow> {
            rows.iter()
                .zip(1u32..)
                .map(|(&(article_id, total_count), rank)| TopArticleRow {
                    article_id,
                    rank,
                    total_count,
                })
                .collect()
        };
        let mut article_top = BTreeMap::new();
        article_top.insert(ym(2023, 12), top(&[(9, 1000)]));
        article_top.insert(ym(2024, 1), top(&[(1, 50), (2, 40)]));
        article_top.insert(ym(2024, 2), top(&[(2, 30), (1, 10)]));
        let many: Vec<(u32, i64)> = (100..120).map(|id| (id, 1)).collect();
        article_top.insert(ym(2024, 3), top(&many));

        let by_year = top10_by_year(&article_top);
        assert_eq!(by_year[&2023].len(), 1);
        let y2024 = &by_year[&2024];
        assert_eq!(y2024.len(), TOP_PER_YEAR);
        assert_eq!((y2024[0].article_id, y2024[0].total_count), (2, 70));
        assert_eq!((y2024[1].article_id, y2024[1].total_count), (1, 60));
        assert_eq!(y2024[2].article_id, 100);
    }

    #[test]
    fn all_time_and_referrers_accumulate_across_partitions() {
        let mut popularity = BTreeMap::new();
        popularity.insert(ym(2023, 12), pop(&[(1, 5), (2, 9)]));
        popularity.insert(ym(2024, 1), pop(&[(1, 6)]));
        let ranked = all_time_top(&popularity, 1);
        assert_eq!(
            ranked,
            vec![RankedArticle {
                article_id: 1,
                total_count: 11,
                rank: 1,
            }]
        );

        let referrer = |target_id, referrer_id, count| ReferrerRow {
            target_id,
            referrer_id,
            count,
            rank: 1,
        };
        let mut referrers = BTreeMap::new();
        referrers.insert(ym(2024, 1), vec![referrer(1, 7, 5), referrer(1, 8, 4)]);
        referrers.insert(ym(2024, 2), vec![referrer(1, 8, 4)]);
        let calendar: MonthCalendar = referrers.keys().copied().collect();
        let rows = referrers_rolling(&referrers, &calendar.window(ym(2024, 2), 6), 1);
        assert_eq!(
            rows,
            vec![WindowReferrerRow {
                target_id: 1,
                referrer_id: 8,
                count: 8,
                rank: 1,
            }]
        );
    }
}
