//! Similarity between project keys
//!
//! [`ratio`] is the Ratcliff/Obershelp "gestalt" ratio (`2*M / T`), computed
//! the same way as a classic `SequenceMatcher`: find the longest matching
//! block, recurse on both sides, sum the matched characters. Sequences of 200
//! characters or more get the usual "popular element" pruning.
//!
//! [`are_similar`] layers the merge rules on top of it, cheapest and most
//! precise first.

use std::collections::HashMap;

/// Ratio at or above which two keys are the same entity.
pub const HIGH_RATIO: f64 = 0.88;
/// Looser ratio accepted for short keys sharing a 3-char prefix.
pub const SHORT_RATIO: f64 = 0.80;
/// Longest key still treated as a "short" name.
pub const SHORT_MAX_LEN: usize = 12;
/// Shortest key allowed to match by containment.
pub const MIN_CONTAINED_LEN: usize = 4;

const AUTOJUNK_MIN_LEN: usize = 200;

struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let ntest = b.len() / 100 + 1;
            b2j.retain(|_, indices| indices.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given window.
    /// Ties resolve to the earliest `i`, then the earliest `j`.
    fn find_longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(indices) = self.b2j.get(&self.a[i]) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular characters were pruned from b2j; grow the block over them.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }

    /// Total number of characters covered by matching blocks.
    fn matched_chars(&self) -> usize {
        let mut matched = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        matched
    }
}

/// Ratcliff/Obershelp similarity in `[0.0, 1.0]`.
///
/// ```
/// use unify::ratio;
///
/// assert_eq!(ratio("abcd", "bcde"), 0.75);
/// assert_eq!(ratio("", ""), 1.0);
/// assert_eq!(ratio("abc", ""), 0.0);
/// ```
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = SequenceMatcher::new(&a, &b).matched_chars();
    2.0 * matched as f64 / total as f64
}

fn is_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(char::is_alphabetic)
}

fn first_token(s: &str) -> Option<&str> {
    s.split_whitespace().next()
}

/// `abbrev` is an acronym key (e.g. "crm") and `full` may be its expansion.
fn expands_abbreviation(abbrev: &str, full: &str) -> bool {
    let len = abbrev.chars().count();
    if len > 3 {
        return false;
    }
    if full.starts_with(&format!("{abbrev} ")) {
        return true;
    }
    if full.starts_with(abbrev) && is_alpha(full) && full.chars().count() >= MIN_CONTAINED_LEN {
        return true;
    }
    first_token(full) == Some(abbrev) && len <= 4
}

/// Decides whether two folded keys denote the same project.
///
/// `a_key`/`b_key` are [`crate::norm_key`] outputs; `a_orig`/`b_orig` are the
/// raw names, needed because acronyms are only recognisable before folding.
///
/// Rules, first hit wins:
/// 1. identical keys
/// 2. an empty key never matches
/// 3. ratio >= 0.88
/// 4. containment, when the shorter key has at least 4 chars
/// 5. both keys <= 12 chars, same first 3 chars, ratio >= 0.80
/// 6. acronym expansion, checked in both directions
///
/// ```
/// use unify::{are_similar, norm_key};
///
/// assert!(are_similar(&norm_key("CRM"), &norm_key("CRM Migration"), "CRM", "CRM Migration"));
/// assert!(!are_similar(&norm_key("Alpha"), &norm_key("Omega"), "Alpha", "Omega"));
/// ```
pub fn are_similar(a_key: &str, b_key: &str, a_orig: &str, b_orig: &str) -> bool {
    if a_key == b_key {
        return true;
    }
    if a_key.is_empty() || b_key.is_empty() {
        return false;
    }

    let r = ratio(a_key, b_key);
    if r >= HIGH_RATIO {
        return true;
    }

    let a_len = a_key.chars().count();
    let b_len = b_key.chars().count();

    if (a_key.contains(b_key) || b_key.contains(a_key)) && a_len.min(b_len) >= MIN_CONTAINED_LEN {
        return true;
    }

    if a_len.max(b_len) <= SHORT_MAX_LEN
        && a_key.chars().take(3).eq(b_key.chars().take(3))
        && r >= SHORT_RATIO
    {
        return true;
    }

    if crate::is_abbreviation(a_orig) && expands_abbreviation(a_key, b_key) {
        return true;
    }
    if crate::is_abbreviation(b_orig) && expands_abbreviation(b_key, a_key) {
        return true;
    }

    false
}
