//! Pairs consecutive events inside a partition.
//!
//! The dwell, interval and turnaround analyses all reduce to the same step:
//! split events by some key, order each partition in time, and look at each
//! event together with the one just before it.

use std::collections::BTreeMap;

/// Returns `(previous, current)` for every adjacent pair inside each
/// partition that satisfies `keep`.
///
/// Partitions are visited in key order and each partition is sorted by
/// `order` with a stable sort, so events with equal ordering keys keep their
/// input order. The first event of a partition has no predecessor and never
/// appears as `current`.
pub fn pair_consecutive<'a, T, K, O, P, S, F>(
    items: &'a [T],
    partition: P,
    order: S,
    keep: F,
) -> Vec<(&'a T, &'a T)>
where
    K: Ord,
    O: Ord,
    P: Fn(&'a T) -> K,
    S: Fn(&'a T) -> O,
    F: Fn(&T, &T) -> bool,
{
    let mut partitions: BTreeMap<K, Vec<&'a T>> = BTreeMap::new();
    for item in items {
        partitions.entry(partition(item)).or_default().push(item);
    }

    let mut pairs = Vec::new();
    for (_, mut members) in partitions {
        members.sort_by_key(|item| order(*item));
        for window in members.windows(2) {
            let (previous, current) = (window[0], window[1]);
            if keep(previous, current) {
                pairs.push((previous, current));
            }
        }
    }

    pairs
}
