//! Reordering helpers that keep a single author from dominating a feed.
//!
//! All of these work on already-fetched lists and never change which items
//! are present, except `most_recent_per_source` which keeps one per author.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use chrono::{DateTime, Utc};

/// Something attributed to an author (a "source").
pub trait Sourced {
    type Source: Eq + Hash + Clone;

    fn source(&self) -> Option<Self::Source>;
}

/// Something with a creation time.
pub trait Dated {
    fn created_at(&self) -> Option<DateTime<Utc>>;
}

/// Round robin over authors.
///
/// Authors are visited in the order they first appear; each pass takes the
/// next item of every author that still has one. Each author's own order is
/// preserved.
pub fn distribute_sources<T: Sourced>(items: Vec<T>) -> Vec<T> {
    let total = items.len();
    let mut slots: HashMap<Option<T::Source>, usize> = HashMap::new();
    let mut groups: Vec<VecDeque<T>> = Vec::new();

    for item in items {
        let key = item.source();
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(VecDeque::new());
            groups.len() - 1
        });
        groups[slot].push_back(item);
    }

    let mut result = Vec::with_capacity(total);
    while !groups.is_empty() {
        for group in groups.iter_mut() {
            if let Some(item) = group.pop_front() {
                result.push(item);
            }
        }
        groups.retain(|group| !group.is_empty());
    }
    result
}

/// Breaks up runs of the same author with a single left-to-right pass.
///
/// When an item repeats its predecessor's author it is swapped with the
/// nearest later item from a different author. Runs that cannot be broken
/// are left as they are.
pub fn avoid_consecutive_sources<T: Sourced>(items: Vec<T>) -> Vec<T> {
    let mut result = items;
    for i in 1..result.len() {
        let Some(prev) = result[i - 1].source() else {
            continue;
        };
        if result[i].source().as_ref() != Some(&prev) {
            continue;
        }
        let swap_with = (i + 1..result.len()).find(|&j| result[j].source().as_ref() != Some(&prev));
        if let Some(j) = swap_with {
            result.swap(i, j);
        }
    }
    result
}

/// Keeps the newest item of each author, newest first.
///
/// An item without a timestamp never replaces one already kept.
pub fn most_recent_per_source<T: Sourced + Dated>(items: Vec<T>) -> Vec<T> {
    let mut latest: HashMap<Option<T::Source>, T> = HashMap::new();

    for item in items {
        let key = item.source();
        let replace = match latest.get(&key) {
            None => true,
            Some(current) => match (item.created_at(), current.created_at()) {
                (Some(candidate), Some(kept)) => candidate > kept,
                (Some(_), None) => true,
                (None, _) => false,
            },
        };
        if replace {
            latest.insert(key, item);
        }
    }

    let mut kept: Vec<T> = latest.into_values().collect();
    kept.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    impl Sourced for (char, u32) {
        type Source = char;

        fn source(&self) -> Option<char> {
            Some(self.0)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        author: Option<u8>,
        id: u32,
        at: Option<DateTime<Utc>>,
    }

    impl Sourced for Item {
        type Source = u8;

        fn source(&self) -> Option<u8> {
            self.author
        }
    }

    impl Dated for Item {
        fn created_at(&self) -> Option<DateTime<Utc>> {
            self.at
        }
    }

    fn at(minutes: i64) -> Option<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Some(base + Duration::minutes(minutes))
    }

    fn has_adjacent_repeat(items: &[(char, u32)]) -> bool {
        items.windows(2).any(|pair| pair[0].0 == pair[1].0)
    }

    #[test]
    fn round_robin_takes_one_per_author_per_round() {
        let items = vec![('A', 1), ('A', 2), ('B', 1), ('C', 1)];
        assert_eq!(
            distribute_sources(items),
            vec![('A', 1), ('B', 1), ('C', 1), ('A', 2)]
        );
    }

    #[test]
    fn round_robin_keeps_author_order_and_membership() {
        let items = vec![
            ('B', 1),
            ('A', 1),
            ('B', 2),
            ('B', 3),
            ('A', 2),
            ('C', 1),
        ];
        let out = distribute_sources(items.clone());
        assert_eq!(
            out,
            vec![('B', 1), ('A', 1), ('C', 1), ('B', 2), ('A', 2), ('B', 3)]
        );
        assert_eq!(out.len(), items.len());
    }

    #[test]
    fn round_robin_handles_empty_and_single_author() {
        assert!(distribute_sources(Vec::<(char, u32)>::new()).is_empty());
        let solo = vec![('A', 1), ('A', 2), ('A', 3)];
        assert_eq!(distribute_sources(solo.clone()), solo);
    }

    #[test]
    fn round_robin_scales_to_thousands() {
        let authors = ['A', 'B', 'C', 'D', 'E'];
        let items: Vec<(char, u32)> = (0..5_000u32)
            .map(|n| (authors[(n as usize * 7 / 3) % authors.len()], n))
            .collect();
        let out = distribute_sources(items);
        assert_eq!(out.len(), 5_000);
        for author in authors {
            let seqs: Vec<u32> = out.iter().filter(|i| i.0 == author).map(|i| i.1).collect();
            assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn avoid_consecutive_breaks_runs() {
        let items = vec![('A', 1), ('A', 2), ('B', 1), ('A', 3), ('C', 1), ('B', 2)];
        let out = avoid_consecutive_sources(items.clone());
        assert!(!has_adjacent_repeat(&out));
        let mut sorted_in = items;
        let mut sorted_out = out;
        sorted_in.sort();
        sorted_out.sort();
        assert_eq!(sorted_in, sorted_out);
    }

    #[test]
    fn avoid_consecutive_leaves_unbreakable_runs() {
        let items = vec![('B', 1), ('A', 1), ('A', 2), ('A', 3)];
        assert_eq!(avoid_consecutive_sources(items.clone()), items);
    }

    #[test]
    fn avoid_consecutive_without_majority_has_no_repeats() {
        let cases = vec![
            vec![('A', 1), ('A', 2), ('B', 1), ('B', 2)],
            vec![('A', 1), ('A', 2), ('A', 3), ('B', 1), ('C', 1), ('B', 2)],
            vec![('C', 1), ('C', 2), ('A', 1), ('B', 1), ('B', 2), ('A', 2)],
        ];
        for items in cases {
            let out = avoid_consecutive_sources(items.clone());
            assert!(!has_adjacent_repeat(&out), "{items:?} -> {out:?}");
        }
    }

    #[test]
    fn avoid_consecutive_is_idempotent() {
        let items = vec![('A', 1), ('A', 2), ('B', 1), ('B', 2), ('C', 1), ('A', 3)];
        let once = avoid_consecutive_sources(items);
        let twice = avoid_consecutive_sources(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn most_recent_keeps_newest_per_author() {
        let items = vec![
            Item { author: Some(1), id: 1, at: at(0) },
            Item { author: Some(2), id: 2, at: at(5) },
            Item { author: Some(1), id: 3, at: at(10) },
            Item { author: Some(2), id: 4, at: at(1) },
            Item { author: None, id: 5, at: at(3) },
        ];
        let ids: Vec<u32> = most_recent_per_source(items).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 2, 5]);
    }

    #[test]
    fn undated_item_never_replaces() {
        let items = vec![
            Item { author: Some(1), id: 1, at: at(0) },
            Item { author: Some(1), id: 2, at: None },
        ];
        let kept = most_recent_per_source(items);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 1);
    }
}
