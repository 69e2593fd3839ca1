//! Prefix statistics over a set of numbers

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::phone::PhoneNumberSet;

const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefixCount {
    pub prefix: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberStats {
    pub total: usize,
    /// Distinct first-5-character prefixes
    pub unique_prefixes: usize,
    pub average_length: f64,
    /// Most common first-4-character prefixes
    pub top_prefixes: Vec<PrefixCount>,
    /// Most common three characters after `+91`
    pub top_state_codes: Vec<PrefixCount>,
}

/// Count occurrences and keep the `TOP_N` most frequent, ties by prefix
fn top_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<PrefixCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut ranked: Vec<PrefixCount> = counts
        .into_iter()
        .map(|(prefix, count)| PrefixCount {
            prefix: prefix.to_string(),
            count,
        })
        .collect();
    // stable sort keeps the BTreeMap's prefix order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_N);
    ranked
}

/// Leading `n` characters, if the number is at least that long
fn leading(number: &str, n: usize) -> Option<&str> {
    let end = number
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(number.len()))
        .nth(n)?;
    Some(&number[..end])
}

pub fn compute(numbers: &PhoneNumberSet) -> NumberStats {
    let total = numbers.len();
    let unique_prefixes = numbers
        .iter()
        .filter_map(|n| leading(n, 5))
        .collect::<HashSet<_>>()
        .len();
    let average_length = if total == 0 {
        0.0
    } else {
        numbers.iter().map(|n| n.chars().count()).sum::<usize>() as f64 / total as f64
    };

    let top_prefixes = top_counts(numbers.iter().filter_map(|n| leading(n, 4)));
    let top_state_codes = top_counts(
        numbers
            .iter()
            .filter(|n| n.starts_with("+91"))
            .filter_map(|n| leading(n, 6))
            .map(|p| &p[3..]),
    );

    NumberStats {
        total,
        unique_prefixes,
        average_length,
        top_prefixes,
        top_state_codes,
    }
}
