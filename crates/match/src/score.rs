use std::collections::HashSet;

use crate::model::ConfirmedMatch;
use crate::normalize::Normalizer;
use crate::synonym::{self, SynonymMap};

/// Description similarity scorer for one reconciliation run.
///
/// Built once per run from the confirmed set: the synonym map and the
/// confirmed price-side key set only change at run boundaries, so deriving
/// them here instead of per call changes nothing observable.
#[derive(Debug)]
pub struct Scorer<'a> {
    normalizer: &'a Normalizer,
    synonyms: SynonymMap,
    confirmed_keys: HashSet<String>,
}

impl<'a> Scorer<'a> {
    pub fn new(normalizer: &'a Normalizer, confirmed: &[ConfirmedMatch]) -> Self {
        let synonyms = synonym::learn(confirmed, normalizer);
        let confirmed_keys = confirmed
            .iter()
            .map(|c| normalizer.normalize(&c.product_a))
            .collect();
        Self {
            normalizer,
            synonyms,
            confirmed_keys,
        }
    }

    pub fn synonyms(&self) -> &SynonymMap {
        &self.synonyms
    }

    /// Score how much of `a`'s content is explained by `b`, 0..=100.
    ///
    /// Asymmetric on purpose: the caller passes the master description as `a`
    /// and each price candidate as `b`, so the score reads "how much of the
    /// master product does this candidate cover".
    pub fn score(&self, a: &str, b: &str) -> f64 {
        let norm_a = self.normalizer.normalize(a);
        let norm_b = self.normalizer.normalize(b);

        // Already-confirmed price items are never re-offered as candidates.
        if self.confirmed_keys.contains(&norm_a) || self.confirmed_keys.contains(&norm_b) {
            return 0.0;
        }

        let subst_a = self.apply_synonyms(&norm_a);
        let subst_b = self.apply_synonyms(&norm_b);

        let words_a = self.normalizer.content_tokens(&subst_a);
        let words_b = self.normalizer.content_tokens(&subst_b);
        if words_a.is_empty() || words_b.is_empty() {
            return 0.0;
        }

        let set_b: HashSet<&str> = words_b.iter().map(String::as_str).collect();

        let mut matches = 0usize;
        let mut counted: HashSet<&str> = HashSet::new();

        for word in &words_a {
            if counted.contains(word.as_str()) {
                continue;
            }
            let has_digit = word.chars().any(|c| c.is_ascii_digit());
            let matched = set_b.contains(word.as_str())
                || words_b
                    .iter()
                    .any(|bw| bw.contains(word.as_str()) || word.contains(bw.as_str()))
                || (has_digit
                    && words_b
                        .iter()
                        .any(|bw| digit_projection(bw) == digit_projection(word)));
            if matched {
                matches += 1;
                counted.insert(word);
            }
        }

        matches as f64 / words_a.len() as f64 * 100.0
    }

    fn apply_synonyms(&self, normalized: &str) -> String {
        if self.synonyms.is_empty() {
            return normalized.to_string();
        }
        normalized
            .split_whitespace()
            .map(|t| self.synonyms.apply_token(t))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Digits of a token, everything else dropped. "400GR" and "400G" project to
/// the same "400", which is how differently formatted pack sizes match.
fn digit_projection(token: &str) -> String {
    token.chars().filter(|c| c.is_ascii_digit()).collect()
}
