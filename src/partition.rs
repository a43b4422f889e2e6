//! Partition addressing for the Hive-style `lang=/year=/month=` layout and the
//! explicit month calendar used by rolling-window derivations.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use glob::glob;
use tracing::{debug, warn};

use crate::error::{GoldError, Result};

/// File name holding a committed partition.
pub const DATA_FILE: &str = "data.parquet";

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// Shift by a signed number of calendar months.
    pub fn offset(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    pub fn pred(self) -> Self {
        self.offset(-1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Address of a partition: `lang`, optionally narrowed to a year and month.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionAddress {
    pub lang: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl PartitionAddress {
    pub fn language(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            year: None,
            month: None,
        }
    }

    pub fn year(lang: impl Into<String>, year: i32) -> Self {
        Self {
            lang: lang.into(),
            year: Some(year),
            month: None,
        }
    }

    pub fn month(lang: impl Into<String>, period: YearMonth) -> Self {
        Self {
            lang: lang.into(),
            year: Some(period.year),
            month: Some(period.month),
        }
    }

    pub fn year_month(&self) -> Option<YearMonth> {
        YearMonth::new(self.year?, self.month?)
    }

    /// Directory of this partition relative to a table root.
    pub fn relative_dir(&self) -> PathBuf {
        let mut dir = PathBuf::from(format!("lang={}", self.lang));
        if let Some(year) = self.year {
            dir.push(format!("year={year:04}"));
            if let Some(month) = self.month {
                dir.push(format!("month={month:02}"));
            }
        }
        dir
    }

    /// `<root>/<table>/<partition dirs>/data.parquet`
    pub fn data_file(&self, root: &Path, table: &str) -> PathBuf {
        root.join(table).join(self.relative_dir()).join(DATA_FILE)
    }
}

impl fmt::Display for PartitionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative_dir().display())
    }
}

/// Extract `(lang, year, month)` from the Hive components of a partition path.
pub fn parse_hive_path(path: &Path) -> Option<PartitionAddress> {
    let mut lang = None;
    let mut year = None;
    let mut month = None;
    for component in path.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        let Some((key, value)) = part.to_str().and_then(|s| s.split_once('=')) else {
            continue;
        };
        match key {
            "lang" => lang = Some(value.to_string()),
            "year" => year = value.parse::<i32>().ok(),
            "month" => month = value.parse::<u32>().ok(),
            _ => {}
        }
    }
    let lang = lang.filter(|l| !l.is_empty())?;
    match (year, month) {
        (Some(year), Some(month)) => {
            YearMonth::new(year, month).map(|ym| PartitionAddress::month(lang, ym))
        }
        (Some(year), None) => Some(PartitionAddress::year(lang, year)),
        (None, None) => Some(PartitionAddress::language(lang)),
        (None, Some(_)) => None,
    }
}

fn collect_partitions(pattern: &str) -> Result<Vec<(PartitionAddress, PathBuf)>> {
    let entries =
        glob(pattern).map_err(|e| GoldError::Config(format!("bad glob {pattern}: {e}")))?;

    let mut partitions = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => match parse_hive_path(&path) {
                Some(address) => partitions.push((address, path)),
                None => warn!("Ignoring non-partition path: {}", path.display()),
            },
            Err(e) => warn!("Error reading glob entry: {}", e),
        }
    }
    partitions.sort();
    Ok(partitions)
}

fn escaped_root(table_root: &Path) -> String {
    glob::Pattern::escape(&table_root.to_string_lossy())
}

/// Find every committed monthly partition under `table_root`, sorted by address.
pub fn discover_monthly_partitions(table_root: &Path) -> Result<Vec<(PartitionAddress, PathBuf)>> {
    let pattern = format!("{}/lang=*/year=*/month=*/{}", escaped_root(table_root), DATA_FILE);
    let mut partitions = collect_partitions(&pattern)?;
    partitions.retain(|(address, path)| {
        let monthly = address.year_month().is_some();
        if !monthly {
            warn!("Ignoring non-partition path: {}", path.display());
        }
        monthly
    });
    debug!(
        "Found {} partitions under {}",
        partitions.len(),
        table_root.display()
    );
    Ok(partitions)
}

/// Every committed partition of one language under `table_root`, at any depth
/// (`lang=`, `lang=/year=` or `lang=/year=/month=`), sorted by address.
pub fn discover_language_partitions(
    table_root: &Path,
    lang: &str,
) -> Result<Vec<(PartitionAddress, PathBuf)>> {
    let pattern = format!(
        "{}/lang={}/**/{}",
        escaped_root(table_root),
        glob::Pattern::escape(lang),
        DATA_FILE
    );
    let mut partitions = collect_partitions(&pattern)?;
    partitions.retain(|(address, _)| address.lang == lang);
    Ok(partitions)
}

/// Languages with at least one `lang=` directory under `table_root`.
pub fn discover_languages(table_root: &Path) -> Result<BTreeSet<String>> {
    let pattern = format!("{}/lang=*", escaped_root(table_root));
    let entries =
        glob(&pattern).map_err(|e| GoldError::Config(format!("bad glob {pattern}: {e}")))?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_dir())
        .filter_map(|path| parse_hive_path(&path).map(|address| address.lang))
        .collect())
}

/// Trailing span of months ending at `end`, restricted to months that exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingWindow {
    pub end: YearMonth,
    pub required: usize,
    pub months: Vec<YearMonth>,
}

impl RollingWindow {
    pub fn months_in_window(&self) -> usize {
        self.months.len()
    }

    pub fn is_complete(&self) -> bool {
        self.months.len() == self.required
    }

    /// Error out unless every month of the window is available.
    pub fn require_complete(&self, lang: &str) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        Err(GoldError::WindowIncomplete {
            lang: lang.to_string(),
            end: self.end,
            available: self.months.len(),
            required: self.required,
        })
    }
}

/// Ordered set of months for which a table has committed partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthCalendar {
    months: BTreeSet<YearMonth>,
}

impl MonthCalendar {
    pub fn iter(&self) -> impl Iterator<Item = YearMonth> + '_ {
        self.months.iter().copied()
    }

    pub fn latest(&self) -> Option<YearMonth> {
        self.months.last().copied()
    }

    /// Calendar window `[end - (size - 1), end]`, keeping only present months.
    pub fn window(&self, end: YearMonth, size: usize) -> RollingWindow {
        let start = end.offset(1 - size.max(1) as i64);
        RollingWindow {
            end,
            required: size,
            months: self.months.range(start..=end).copied().collect(),
        }
    }
}

impl FromIterator<YearMonth> for MonthCalendar {
    fn from_iter<I: IntoIterator<Item = YearMonth>>(iter: I) -> Self {
        Self {
            months: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn offset_crosses_year_boundaries() {
        assert_eq!(ym(2024, 1).pred(), ym(2023, 12));
        assert_eq!(ym(2024, 2).offset(-5), ym(2023, 9));
        assert_eq!(ym(2023, 11).offset(3), ym(2024, 2));
        assert!(YearMonth::new(2024, 13).is_none());
        assert!(YearMonth::new(2024, 0).is_none());
    }

    #[test]
    fn window_reports_gaps() {
        let calendar: MonthCalendar = [ym(2023, 10), ym(2023, 12), ym(2024, 1), ym(2024, 3)]
            .into_iter()
            .collect();

        let window = calendar.window(ym(2024, 3), 6);
        assert_eq!(window.months, vec![ym(2023, 10), ym(2023, 12), ym(2024, 1), ym(2024, 3)]);
        assert!(!window.is_complete());
        assert!(matches!(
            window.require_complete("en"),
            Err(GoldError::WindowIncomplete { available: 4, required: 6, .. })
        ));

        let narrow = calendar.window(ym(2024, 1), 2);
        assert!(narrow.is_complete());
        assert_eq!(narrow.months, vec![ym(2023, 12), ym(2024, 1)]);
    }

    #[test]
    fn hive_paths_round_trip_through_addresses() {
        let address = PartitionAddress::month("es", ym(2024, 3));
        let path = address.data_file(Path::new("/data/gold"), "article_top");
        assert_eq!(
            path,
            PathBuf::from("/data/gold/article_top/lang=es/year=2024/month=03/data.parquet")
        );
        assert_eq!(parse_hive_path(&path), Some(address));

        let yearly = PartitionAddress::year("de", 2023);
        assert_eq!(yearly.to_string(), "lang=de/year=2023");
        assert_eq!(
            parse_hive_path(Path::new("lang=de/year=2023/data.parquet")),
            Some(yearly)
        );
        assert_eq!(parse_hive_path(Path::new("no/partition/here")), None);
    }

    #[test]
    fn discovery_finds_only_monthly_partitions() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("silver");
        for (lang, year, month) in [("en", 2024, 2), ("en", 2024, 1), ("fr", 2023, 12)] {
            let file = PartitionAddress::month(lang, ym(year, month)).data_file(tmp.path(), "silver");
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(&file, b"x").unwrap();
        }
        std::fs::create_dir_all(root.join("lang=en/year=2024/month=xx")).unwrap();
        std::fs::write(root.join("lang=en/year=2024/month=xx/data.parquet"), b"x").unwrap();

        let found: Vec<_> = discover_monthly_partitions(&root)
            .unwrap()
            .into_iter()
            .map(|(address, _)| address.to_string())
            .collect();
        assert_eq!(
            found,
            vec![
                "lang=en/year=2024/month=01",
                "lang=en/year=2024/month=02",
                "lang=fr/year=2023/month=12",
            ]
        );

        let langs = discover_languages(&root).unwrap();
        assert_eq!(langs.into_iter().collect::<Vec<_>>(), vec!["en", "fr"]);
    }

    #[test]
    fn language_discovery_stays_inside_one_language() {
        let tmp = TempDir::new().unwrap();
        let addresses = [
            PartitionAddress::language("en"),
            PartitionAddress::year("en", 2024),
            PartitionAddress::month("en", ym(2024, 5)),
            PartitionAddress::month("en-simple", ym(2024, 5)),
            PartitionAddress::month("fr", ym(2024, 5)),
        ];
        for address in &addresses {
            let file = address.data_file(tmp.path(), "table");
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(&file, b"x").unwrap();
        }

        let found: Vec<_> = discover_language_partitions(&tmp.path().join("table"), "en")
            .unwrap()
            .into_iter()
            .map(|(address, _)| address)
            .collect();
        assert_eq!(found, addresses[..3].to_vec());
    }
}
