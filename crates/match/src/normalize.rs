use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::MatchConfig;

/// Literal characters removed before comparison.
const PUNCTUATION: &[char] = &['-', '*', '/', '(', ')', '.', ','];

/// Text canonicalizer shared by the scorer, the store keys and the table
/// cleaner. Cheap to clone; holds only the configured marker/ignore sets.
#[derive(Debug, Clone)]
pub struct Normalizer {
    markers: Vec<String>,
    ignore: HashSet<String>,
}

impl Normalizer {
    pub fn new(markers: Vec<String>, ignore_words: Vec<String>) -> Self {
        Self {
            markers,
            ignore: ignore_words.into_iter().map(|w| w.to_uppercase()).collect(),
        }
    }

    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(config.currency_markers.clone(), config.ignore_words.clone())
    }

    /// Canonical comparison form. Steps, in order: decompose accents and drop
    /// the combining marks; remove `- * / ( ) . ,`; collapse whitespace;
    /// strip one leading currency marker; upper-case; trim. Total: any input
    /// maps to some string, the empty string included.
    pub fn normalize(&self, text: &str) -> String {
        let decomposed: String = text.nfd().filter(|c| !is_combining_mark(*c)).collect();
        let stripped: String = decomposed
            .chars()
            .filter(|c| !PUNCTUATION.contains(c))
            .collect();
        let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        let unmarked = self.strip_currency_prefix(&collapsed);
        unmarked.to_uppercase().trim().to_string()
    }

    /// Strip the longest matching currency marker from the start of `text`,
    /// case-insensitively. Used directly by the currency column cleaner,
    /// which runs before normalization.
    pub fn strip_currency_prefix<'a>(&self, text: &'a str) -> &'a str {
        let mut best: Option<usize> = None;
        for marker in &self.markers {
            if let Some(len) = ci_prefix_len(text, marker) {
                if best.map_or(true, |b| len > b) {
                    best = Some(len);
                }
            }
        }
        match best {
            Some(len) => &text[len..],
            None => text,
        }
    }

    /// True when the (trimmed) cell is nothing but a currency marker.
    pub fn is_currency_marker(&self, cell: &str) -> bool {
        let cell = cell.trim();
        self.markers
            .iter()
            .any(|m| ci_prefix_len(cell, m) == Some(cell.len()))
    }

    /// Tokens of an already-normalized text with ignore words removed. When
    /// filtering would remove every token, the unfiltered list is kept so a
    /// score denominator always exists.
    pub fn content_tokens(&self, normalized: &str) -> Vec<String> {
        let all: Vec<String> = normalized.split_whitespace().map(str::to_string).collect();
        let filtered: Vec<String> = all
            .iter()
            .filter(|w| !self.ignore.contains(w.as_str()))
            .cloned()
            .collect();
        if filtered.is_empty() {
            all
        } else {
            filtered
        }
    }

    /// Ignore-word filter without the keep-all fallback, used by synonym
    /// learning where an empty list just means nothing to align.
    pub fn filtered_tokens(&self, normalized: &str) -> Vec<String> {
        normalized
            .split_whitespace()
            .filter(|w| !self.ignore.contains(*w))
            .map(str::to_string)
            .collect()
    }
}

/// Byte length of `prefix` matched case-insensitively at the start of
/// `text`, or None when it does not match.
fn ci_prefix_len(text: &str, prefix: &str) -> Option<usize> {
    let mut chars = text.chars();
    let mut len = 0;
    for pc in prefix.chars() {
        match chars.next() {
            Some(tc) if tc.to_lowercase().eq(pc.to_lowercase()) => len += tc.len_utf8(),
            _ => return None,
        }
    }
    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;

    fn norm() -> Normalizer {
        Normalizer::new(
            vec![
                "S/".into(),
                "$".into(),
                "USD".into(),
                "US$".into(),
                "€".into(),
                "EUR".into(),
                "£".into(),
            ],
            vec![
                "DEL".into(),
                "LA".into(),
                "EL".into(),
                "Y".into(),
                "CON".into(),
            ],
        )
    }

    #[test]
    fn strips_accents_and_punctuation() {
        let n = norm();
        assert_eq!(n.normalize("Azúcar Rubia (Bolsa) 1kg."), "AZUCAR RUBIA BOLSA 1KG");
        assert_eq!(n.normalize("café - molido"), "CAFE MOLIDO");
    }

    #[test]
    fn collapses_whitespace_and_uppercases() {
        let n = norm();
        assert_eq!(n.normalize("  leche   gloria  "), "LECHE GLORIA");
    }

    #[test]
    fn strips_leading_currency_marker() {
        let n = norm();
        assert_eq!(n.normalize("$ 120.50"), "12050");
        assert_eq!(n.normalize("usd 99"), "99");
        assert_eq!(n.normalize("€15"), "15");
    }

    #[test]
    fn idempotent() {
        let n = norm();
        for input in ["Leche Gloria 400g", "  S/ 3.50 ", "ÑANDÚ (x2)", ""] {
            let once = n.normalize(input);
            assert_eq!(n.normalize(&once), once);
        }
    }

    #[test]
    fn total_on_empty_input() {
        let n = norm();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   "), "");
        assert_eq!(n.normalize("()., -"), "");
    }

    #[test]
    fn content_tokens_filters_ignore_words() {
        let n = norm();
        let tokens = n.content_tokens("LECHE CON AZUCAR");
        assert_eq!(tokens, vec!["LECHE", "AZUCAR"]);
    }

    #[test]
    fn content_tokens_falls_back_when_all_ignored() {
        let n = norm();
        let tokens = n.content_tokens("EL Y LA");
        assert_eq!(tokens, vec!["EL", "Y", "LA"]);
    }

    #[test]
    fn marker_cell_detection() {
        let n = norm();
        assert!(n.is_currency_marker("S/"));
        assert!(n.is_currency_marker("  $  "));
        assert!(n.is_currency_marker("usd"));
        assert!(!n.is_currency_marker("S/ 3.30"));
        assert!(!n.is_currency_marker("120.50"));
    }

    #[test]
    fn longest_marker_wins() {
        let n = norm();
        // "US$" must strip as a whole, not stop after "U".
        assert_eq!(n.strip_currency_prefix("US$ 40"), " 40");
    }

    #[test]
    fn from_config_uses_configured_sets() {
        let toml = r#"
ignore_words = ["DE"]
currency_markers = ["S/"]

[price]
file = "p.csv"
[price.columns]
code = 0
description = 1
price = 2

[master]
file = "m.csv"
[master.columns]
product = 0
unit = 1
cost = 2
"#;
        let config = MatchConfig::from_toml(toml).unwrap();
        let n = Normalizer::from_config(&config);
        assert_eq!(n.content_tokens("PASTA DE TOMATE"), vec!["PASTA", "TOMATE"]);
        assert!(!n.is_currency_marker("$"));
    }
}
