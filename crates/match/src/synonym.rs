use crate::model::ConfirmedMatch;
use crate::normalize::Normalizer;

/// Pair gate: learn nothing from confirmed pairs whose coarse overlap is
/// below this.
const MIN_PAIR_SIMILARITY: f64 = 50.0;

/// Aligned words must share at least this per-character similarity.
const MIN_WORD_SIMILARITY: f64 = 0.8;

/// Word-level equivalence table derived from the confirmed set.
///
/// Entries are kept in insertion order and applied as a sequential fold:
/// a symmetric pair (a→b, b→a) therefore rewrites *both* texts to the
/// first-inserted side. A plain map lookup would swap the variants and keep
/// the two texts apart, so the order here is semantic, not cosmetic.
#[derive(Debug, Clone, Default)]
pub struct SynonymMap {
    entries: Vec<(String, String)>,
}

impl SynonymMap {
    pub fn insert(&mut self, from: &str, to: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == from) {
            entry.1 = to.to_string();
        } else {
            self.entries.push((from.to_string(), to.to_string()));
        }
    }

    pub fn get(&self, word: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == word)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run a token through every entry in insertion order.
    pub fn apply_token(&self, token: &str) -> String {
        let mut current = token.to_string();
        for (from, to) in &self.entries {
            if current == *from {
                current = to.clone();
            }
        }
        current
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Derive a synonym map from the current confirmed set.
///
/// Only position-aligned spelling/abbreviation variants are admitted: the
/// confirmed pair must already overlap coarsely, and the aligned words must
/// differ, both be longer than two characters, and agree on most character
/// positions. This never learns arbitrary word associations.
pub fn learn(confirmed: &[ConfirmedMatch], normalizer: &Normalizer) -> SynonymMap {
    let mut map = SynonymMap::default();

    for row in confirmed {
        let p1 = normalizer.normalize(&row.product_a);
        let p2 = normalizer.normalize(&row.product_b);

        if simple_similarity(&p1, &p2) < MIN_PAIR_SIMILARITY {
            continue;
        }

        let words1 = normalizer.filtered_tokens(&p1);
        let words2 = normalizer.filtered_tokens(&p2);

        let len = words1.len().min(words2.len());
        for i in 0..len {
            let w1 = &words1[i];
            let w2 = &words2[i];
            if w1 != w2
                && w1.chars().count() > 2
                && w2.chars().count() > 2
                && word_similarity(w1, w2) >= MIN_WORD_SIMILARITY
            {
                map.insert(w1, w2);
                map.insert(w2, w1);
            }
        }
    }

    map
}

/// Coarse token overlap: fraction of left-text tokens found verbatim among
/// the right-text tokens, scaled to 0..=100. No ignore-word filtering here.
pub fn simple_similarity(left: &str, right: &str) -> f64 {
    let w1: Vec<&str> = left.split_whitespace().collect();
    let w2: Vec<&str> = right.split_whitespace().collect();
    let hits = w1.iter().filter(|w| w2.contains(w)).count();
    hits as f64 / w1.len().max(1) as f64 * 100.0
}

/// Per-character similarity: equal characters at equal positions, divided by
/// the longer word's length.
pub fn word_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let ac: Vec<char> = a.chars().collect();
    let bc: Vec<char> = b.chars().collect();
    let same = ac.iter().zip(bc.iter()).filter(|(x, y)| x == y).count();
    same as f64 / ac.len().max(bc.len()) as f64
}
