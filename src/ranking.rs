//! Deterministic top-N selection shared by the Gold and Gold-Specifics tables.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Largest count first.
    Descending,
    /// Smallest count first.
    Ascending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked<K> {
    pub key: K,
    /// 1-based.
    pub rank: u32,
    pub count: i64,
}

/// Sort by count in `order`, break ties by ascending key, keep `limit`.
pub fn rank_top<K, I>(totals: I, order: Order, limit: usize) -> Vec<Ranked<K>>
where
    K: Ord,
    I: IntoIterator<Item = (K, i64)>,
{
    let mut entries: Vec<(K, i64)> = totals.into_iter().collect();
    entries.sort_unstable_by(|a, b| {
        let by_count = match order {
            Order::Descending => b.1.cmp(&a.1),
            Order::Ascending => a.1.cmp(&b.1),
        };
        by_count.then_with(|| a.0.cmp(&b.0))
    });
    entries.truncate(limit);
    entries
        .into_iter()
        .zip(1u32..)
        .map(|((key, count), rank)| Ranked { key, rank, count })
        .collect()
}

/// Rank descending within each group; output ordered by group, then rank.
pub fn rank_top_per_group<G, K, I>(totals: I, limit: usize) -> Vec<(G, Ranked<K>)>
where
    G: Ord + Copy,
    K: Ord,
    I: IntoIterator<Item = ((G, K), i64)>,
{
    let mut groups: BTreeMap<G, Vec<(K, i64)>> = BTreeMap::new();
    for ((group, key), count) in totals {
        groups.entry(group).or_default().push((key, count));
    }
    groups
        .into_iter()
        .flat_map(|(group, members)| {
            rank_top(members, Order::Descending, limit)
                .into_iter()
                .map(move |ranked| (group, ranked))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_break_by_ascending_key() {
        let ranked = rank_top(vec![(5u32, 10), (2, 30), (9, 10), (1, 10)], Order::Descending, 3);
        let keys: Vec<_> = ranked.iter().map(|r| (r.key, r.rank, r.count)).collect();
        assert_eq!(keys, vec![(2, 1, 30), (1, 2, 10), (5, 3, 10)]);
    }

    #[test]
    fn ascending_puts_smallest_first() {
        let ranked = rank_top(vec![(1u32, -5), (2, -50), (3, -5)], Order::Ascending, 10);
        let keys: Vec<_> = ranked.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![2, 1, 3]);
    }

    #[test]
    fn groups_rank_independently() {
        let ranked = rank_top_per_group(
            vec![((7u32, 1u32), 3), ((7, 2), 8), ((4, 1), 1), ((7, 3), 8)],
            2,
        );
        let flat: Vec<_> = ranked.iter().map(|(g, r)| (*g, r.key, r.rank)).collect();
        assert_eq!(flat, vec![(4, 1, 1), (7, 2, 1), (7, 3, 2)]);
    }
}
