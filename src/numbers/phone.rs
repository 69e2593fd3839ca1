//! Phone number normalization and the deduplicating number set

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// E.164-ish: leading '+' then 10 to 15 digits
static PHONE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn phone_pattern() -> Option<&'static Regex> {
    PHONE_PATTERN
        .get_or_init(|| Regex::new(r"^\+\d{10,15}$").ok())
        .as_ref()
}

/// Strip surrounding whitespace and any spaces or dashes
pub fn normalize_phone_number(phone_number: &str) -> String {
    phone_number
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}

/// Basic format check on the normalized form
pub fn validate_phone_number(phone_number: &str) -> bool {
    let normalized = normalize_phone_number(phone_number);
    phone_pattern().is_some_and(|re| re.is_match(&normalized))
}

/// Set of phone numbers, stored in normalized form.
///
/// Iteration is in sorted order, which is also the display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumberSet {
    numbers: BTreeSet<String>,
}

impl PhoneNumberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the normalized form. Returns false if it was already present
    /// or normalizes to nothing.
    pub fn insert(&mut self, phone_number: &str) -> bool {
        let normalized = normalize_phone_number(phone_number);
        if normalized.is_empty() {
            return false;
        }
        self.numbers.insert(normalized)
    }

    /// Membership test accepting either raw or normalized input
    pub fn contains_number(&self, phone_number: &str) -> bool {
        self.numbers.contains(phone_number)
            || self.numbers.contains(&normalize_phone_number(phone_number))
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.numbers.iter()
    }

    /// All numbers in display order
    pub fn sorted(&self) -> Vec<String> {
        self.numbers.iter().cloned().collect()
    }

    /// Numbers containing `term`, in display order. An empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<String> {
        let term = term.trim();
        self.numbers
            .iter()
            .filter(|n| n.contains(term))
            .cloned()
            .collect()
    }

    /// Merge another set into this one
    pub fn extend(&mut self, other: PhoneNumberSet) {
        self.numbers.extend(other.numbers);
    }
}

impl<S: AsRef<str>> FromIterator<S> for PhoneNumberSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = PhoneNumberSet::new();
        for number in iter {
            set.insert(number.as_ref());
        }
        set
    }
}

impl IntoIterator for PhoneNumberSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.numbers.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone_number() {
        assert_eq!(normalize_phone_number("  +91 555-123 4567 "), "+915551234567");
        assert_eq!(normalize_phone_number("+915551234567"), "+915551234567");
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+915551234567"));
        assert!(validate_phone_number("+91 555-123-4567"));
        assert!(!validate_phone_number("915551234567"));
        assert!(!validate_phone_number("+91555"));
        assert!(!validate_phone_number("+91555123456789012"));
        assert!(!validate_phone_number("+91abc1234567"));
    }

    #[test]
    fn test_set_deduplicates_normalized_forms() {
        let mut set = PhoneNumberSet::new();
        assert!(set.insert("+91 555 123 4567"));
        assert!(!set.insert("+91-555-123-4567"));
        assert!(!set.insert("   "));
        assert_eq!(set.len(), 1);
        assert!(set.contains_number("+915551234567"));
        assert!(set.contains_number("+91 555 123 4567"));
        assert!(!set.contains_number("+915551234568"));
    }

    #[test]
    fn test_search_and_sorting() {
        let set: PhoneNumberSet = ["+9180111", "+9122333", "+9122111"].into_iter().collect();
        assert_eq!(set.sorted(), vec!["+9122111", "+9122333", "+9180111"]);
        assert_eq!(set.search("+9122"), vec!["+9122111", "+9122333"]);
        assert_eq!(set.search("").len(), 3);
        assert!(set.search("+44").is_empty());
    }

    #[test]
    fn test_serializes_as_sorted_array() {
        let set: PhoneNumberSet = ["+2", "+1"].into_iter().collect();
        assert_eq!(
            serde_json::to_value(&set).expect("serialize"),
            serde_json::json!(["+1", "+2"])
        );
    }
}
