//! Approximate name search over an inventory list.
//!
//! Matching is a Bitap (shift-or) search that allows errors. Each candidate
//! gets a score in `[0, 1]` where 0 is a perfect match:
//!
//! ```text
//! score = errors / pattern_len + |match_location - location| / distance
//! ```
//!
//! Items scoring at or under [`SearchOptions::threshold`] are kept and returned
//! best first. An empty query returns the list untouched.

use crate::InventoryItem;
use std::collections::HashMap;

/// Longest pattern the bit masks can hold. Longer queries are chunked.
pub const MAX_PATTERN_LEN: usize = 64;

/// Scores are never reported below this, except for exact equality.
const MIN_SCORE: f64 = 0.001;

/// Tuning for [`search_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Highest score still counted as a match.
    pub threshold: f64,
    /// Where in the name a match is expected to start.
    pub location: usize,
    /// How far from `location` a match may drift before it stops counting.
    /// Zero makes any drift disqualifying.
    pub distance: usize,
    /// Ignore case when comparing.
    pub ignore_case: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            location: 0,
            distance: 100,
            ignore_case: true,
        }
    }
}

/// A matched item with its score and position in the input list.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub item: &'a InventoryItem,
    pub score: f64,
    pub index: usize,
}

/// Filter `items` by `query` with default options.
///
/// Returns clones of the matching items, best match first. A blank query
/// returns every item in its original order.
pub fn search(items: &[InventoryItem], query: &str) -> Vec<InventoryItem> {
    if query.trim().is_empty() {
        return items.to_vec();
    }
    search_with(items, query, &SearchOptions::default())
        .into_iter()
        .map(|hit| hit.item.clone())
        .collect()
}

/// Score every item against `query`, keeping matches ordered by score.
///
/// A blank query matches everything with score 0 in list order.
pub fn search_with<'a>(
    items: &'a [InventoryItem],
    query: &str,
    options: &SearchOptions,
) -> Vec<SearchHit<'a>> {
    if query.trim().is_empty() {
        return items
            .iter()
            .enumerate()
            .map(|(index, item)| SearchHit {
                item,
                score: 0.0,
                index,
            })
            .collect();
    }

    let matcher = Matcher::new(query, options);
    let mut hits: Vec<SearchHit<'a>> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let score = matcher.score(&item.name)?;
            Some(SearchHit {
                item,
                score: score.powf(field_norm(&item.name)),
                index,
            })
        })
        .collect();

    hits.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.index.cmp(&b.index)));
    hits
}

/// Length norm of a name: `1 / sqrt(words)`, rounded to three places.
fn field_norm(name: &str) -> f64 {
    let words = name.split(' ').filter(|w| !w.is_empty()).count().max(1);
    let norm = 1.0 / (words as f64).sqrt();
    (norm * 1000.0).round() / 1000.0
}

/// A prepared query.
struct Matcher {
    pattern: Vec<char>,
    chunks: Vec<Chunk>,
    options: SearchOptions,
}

/// One bit-parallel slice of the pattern.
struct Chunk {
    chars: Vec<char>,
    alphabet: HashMap<char, u64>,
}

impl Chunk {
    fn new(chars: &[char]) -> Self {
        let len = chars.len();
        let mut alphabet = HashMap::new();
        for (i, c) in chars.iter().enumerate() {
            *alphabet.entry(*c).or_insert(0u64) |= 1u64 << (len - i - 1);
        }
        Self {
            chars: chars.to_vec(),
            alphabet,
        }
    }
}

struct ChunkMatch {
    is_match: bool,
    score: f64,
}

impl Matcher {
    fn new(query: &str, options: &SearchOptions) -> Self {
        let pattern = normalize(query.trim(), options.ignore_case);
        let chunks = pattern.chunks(MAX_PATTERN_LEN).map(Chunk::new).collect();
        Self {
            pattern,
            chunks,
            options: *options,
        }
    }

    /// Score a name, or `None` if it does not match.
    fn score(&self, name: &str) -> Option<f64> {
        let text = normalize(name, self.options.ignore_case);
        if text == self.pattern {
            return Some(0.0);
        }

        let mut total = 0.0;
        let mut any_match = false;
        for chunk in &self.chunks {
            let result = self.bitap(&text, chunk);
            any_match |= result.is_match;
            total += result.score;
        }

        any_match.then(|| total / self.chunks.len() as f64)
    }

    fn compute_score(&self, pattern_len: usize, errors: usize, current: usize, expected: usize) -> f64 {
        let accuracy = errors as f64 / pattern_len as f64;
        let proximity = expected.abs_diff(current);
        if self.options.distance == 0 {
            return if proximity == 0 { accuracy } else { 1.0 };
        }
        accuracy + proximity as f64 / self.options.distance as f64
    }

    fn bitap(&self, text: &[char], chunk: &Chunk) -> ChunkMatch {
        let pattern = &chunk.chars;
        let pattern_len = pattern.len();
        let text_len = text.len();
        let expected = self.options.location.min(text_len);

        let mut threshold = self.options.threshold;
        let mut best_location: Option<usize> = None;

        // Exact occurrences tighten the threshold before the fuzzy pass.
        let mut from = expected;
        while let Some(index) = find(text, pattern, from) {
            let score = self.compute_score(pattern_len, 0, index, expected);
            threshold = threshold.min(score);
            from = index + pattern_len;
        }

        let mask = 1u64 << (pattern_len - 1);
        let mut bin_max = pattern_len + text_len;
        let mut last_bits: Vec<u64> = Vec::new();

        for errors in 0..pattern_len {
            // Widest window around `expected` that can still beat the threshold.
            let mut bin_min = 0;
            let mut bin_mid = bin_max;
            while bin_min < bin_mid {
                let score = self.compute_score(pattern_len, errors, expected + bin_mid, expected);
                if score <= threshold {
                    bin_min = bin_mid;
                } else {
                    bin_max = bin_mid;
                }
                bin_mid = (bin_max - bin_min) / 2 + bin_min;
            }
            bin_max = bin_mid;

            let mut start = 1.max((expected + 1).saturating_sub(bin_mid));
            let finish = (expected + bin_mid).min(text_len) + pattern_len;

            let mut bits = vec![0u64; finish + 2];
            bits[finish + 1] = (1u64 << errors) - 1;

            let mut j = finish;
            while j >= start {
                let location = j - 1;
                let char_mask = text
                    .get(location)
                    .and_then(|c| chunk.alphabet.get(c))
                    .copied()
                    .unwrap_or(0);

                bits[j] = ((bits[j + 1] << 1) | 1) & char_mask;
                if errors > 0 {
                    let prev_next = last_bits.get(j + 1).copied().unwrap_or(0);
                    let prev_here = last_bits.get(j).copied().unwrap_or(0);
                    bits[j] |= ((prev_next | prev_here) << 1) | 1 | prev_next;
                }

                if bits[j] & mask != 0 {
                    let score = self.compute_score(pattern_len, errors, location, expected);
                    if score <= threshold {
                        threshold = score;
                        best_location = Some(location);
                        if location <= expected {
                            break;
                        }
                        start = 1.max((2 * expected).saturating_sub(location));
                    }
                }
                j -= 1;
            }

            // No point allowing another error if it cannot beat what we have.
            let next = self.compute_score(pattern_len, errors + 1, expected, expected);
            if next > threshold {
                break;
            }
            last_bits = bits;
        }

        match best_location {
            Some(_) => ChunkMatch {
                is_match: true,
                score: threshold.max(MIN_SCORE),
            },
            None => ChunkMatch {
                is_match: false,
                score: 1.0,
            },
        }
    }
}

fn normalize(s: &str, ignore_case: bool) -> Vec<char> {
    if ignore_case {
        s.chars().flat_map(char::to_lowercase).collect()
    } else {
        s.chars().collect()
    }
}

/// Position of the first occurrence of `needle` in `haystack` at or after `from`.
fn find(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || from + needle.len() > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> Vec<InventoryItem> {
        names
            .iter()
            .map(|name| InventoryItem::new(*name, 1))
            .collect()
    }

    fn names(items: &[InventoryItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn blank_query_returns_everything_in_order() {
        let list = items(&["pear", "apple", "banana"]);
        assert_eq!(search(&list, ""), list);
        assert_eq!(search(&list, "   "), list);
    }

    #[test]
    fn tolerates_missing_letter() {
        let list = items(&["apple", "banana"]);
        assert_eq!(names(&search(&list, "aple")), vec!["apple"]);
    }

    #[test]
    fn exact_match_scores_zero_and_ranks_first() {
        let list = items(&["pineapple", "apple"]);
        let hits = search_with(&list, "apple", &SearchOptions::default());
        assert_eq!(hits[0].item.name, "apple");
        assert_eq!(hits[0].score, 0.0);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn case_insensitive_by_default() {
        let list = items(&["Apple", "Cherry"]);
        assert_eq!(names(&search(&list, "APPLE")), vec!["Apple"]);

        let options = SearchOptions {
            ignore_case: false,
            ..SearchOptions::default()
        };
        let hits = search_with(&list, "Apple", &options);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn unrelated_names_do_not_match() {
        let list = items(&["banana", "cherry", "kiwi"]);
        assert!(search(&list, "zzzz").is_empty());
    }

    #[test]
    fn prefix_beats_later_occurrence() {
        let list = items(&["green tea", "tea"]);
        let result = search(&list, "tea");
        assert_eq!(names(&result), vec!["tea", "green tea"]);
    }

    #[test]
    fn ties_keep_list_order() {
        let list = items(&["milk", "milk"]);
        let hits = search_with(&list, "mlk", &SearchOptions::default());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].index, 0);
        assert_eq!(hits[1].index, 1);
    }

    #[test]
    fn zero_distance_requires_match_at_location() {
        let options = SearchOptions {
            distance: 0,
            ..SearchOptions::default()
        };
        let list = items(&["zzzzzzzzapple", "apple pie"]);
        let hits = search_with(&list, "apple", &options);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.name, "apple pie");
    }

    #[test]
    fn long_queries_are_chunked() {
        let long = "a".repeat(80);
        let list = items(&[long.as_str(), "b"]);
        let hits = search_with(&list, &long, &SearchOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.0);

        let query = format!("{}b", "a".repeat(79));
        let hits = search_with(&list, &query, &SearchOptions::default());
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn multi_word_names_are_normed() {
        assert_eq!(field_norm("apple"), 1.0);
        assert_eq!(field_norm("green apple"), 0.707);
        assert_eq!(field_norm(""), 1.0);
    }

    #[test]
    fn find_subsequence() {
        let text: Vec<char> = "banana".chars().collect();
        let needle: Vec<char> = "an".chars().collect();
        assert_eq!(find(&text, &needle, 0), Some(1));
        assert_eq!(find(&text, &needle, 2), Some(3));
        assert_eq!(find(&text, &needle, 5), None);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_search_never_invents_items(
                names in proptest::collection::vec("[a-z]{1,12}", 0..20),
                query in "[a-z]{0,8}",
            ) {
                let list: Vec<_> = names.iter().map(|n| InventoryItem::new(n.clone(), 1)).collect();
                let result = search(&list, &query);
                prop_assert!(result.len() <= list.len());
                for item in &result {
                    prop_assert!(list.contains(item));
                }
            }

            #[test]
            fn prop_exact_name_always_found(
                names in proptest::collection::vec("[a-z]{1,12}", 1..20),
                pick in 0usize..20,
            ) {
                let list: Vec<_> = names.iter().map(|n| InventoryItem::new(n.clone(), 1)).collect();
                let target = &list[pick % list.len()];
                let hits = search_with(&list, &target.name, &SearchOptions::default());
                prop_assert!(!hits.is_empty());
                prop_assert_eq!(hits[0].score, 0.0);
            }

            #[test]
            fn prop_scores_sorted(
                names in proptest::collection::vec("[a-z ]{1,16}", 0..20),
                query in "[a-z]{1,6}",
            ) {
                let list: Vec<_> = names.iter().map(|n| InventoryItem::new(n.clone(), 1)).collect();
                let hits = search_with(&list, &query, &SearchOptions::default());
                for pair in hits.windows(2) {
                    prop_assert!(pair[0].score <= pair[1].score);
                }
            }
        }
    }
}
