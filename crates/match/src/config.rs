use serde::Deserialize;

use crate::error::MatchError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub name: String,
    /// Score at or above which a pairing is confirmed without review.
    #[serde(default = "default_good_threshold")]
    pub good_threshold: f64,
    /// Score below which a pairing is dropped instead of going to review.
    #[serde(default)]
    pub discard_threshold: f64,
    /// Only master rows whose normalized unit equals this value participate.
    #[serde(default = "default_unit_filter")]
    pub unit_filter: String,
    /// Low-signal tokens excluded from scoring and synonym learning.
    #[serde(default = "default_ignore_words")]
    pub ignore_words: Vec<String>,
    /// Currency markers stripped from text and detected in decorative columns.
    #[serde(default = "default_currency_markers")]
    pub currency_markers: Vec<String>,
    /// A column is dropped when (marker cells + empty cells) / data rows
    /// exceeds this ratio.
    #[serde(default = "default_symbol_column_cutoff")]
    pub symbol_column_cutoff: f64,
    pub price: PriceSource,
    pub master: MasterSource,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PriceSource {
    /// Input workbook or CSV, resolved relative to the config file by the CLI.
    pub file: String,
    /// Leading banner rows above the header row.
    #[serde(default)]
    pub skip_rows: usize,
    pub columns: PriceColumns,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MasterSource {
    pub file: String,
    #[serde(default)]
    pub skip_rows: usize,
    pub columns: MasterColumns,
}

/// Zero-based column indices into the cleaned price table.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceColumns {
    pub code: usize,
    pub description: usize,
    pub price: usize,
}

/// Zero-based column indices into the cleaned master table.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterColumns {
    pub product: usize,
    pub unit: usize,
    pub cost: usize,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_good_threshold() -> f64 {
    67.0
}

fn default_unit_filter() -> String {
    "UNIDAD".into()
}

/// Default low-signal tokens. Public: review commands normalize keys with
/// the same sets a run would use.
pub fn default_ignore_words() -> Vec<String> {
    ["DEL", "LA", "EL", "LOS", "LAS", "Y", "EN", "CON", "PARA", "S/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Default currency markers recognized in text and decorative columns.
pub fn default_currency_markers() -> Vec<String> {
    ["S/", "$", "USD", "US$", "€", "EUR", "£"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_symbol_column_cutoff() -> f64 {
    0.9
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchConfig {
    pub fn from_toml(input: &str) -> Result<Self, MatchError> {
        let config: MatchConfig =
            toml::from_str(input).map_err(|e| MatchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !(0.0..=100.0).contains(&self.good_threshold) {
            return Err(MatchError::ConfigValidation(format!(
                "good_threshold must be within 0..=100, got {}",
                self.good_threshold
            )));
        }
        if !(0.0..=100.0).contains(&self.discard_threshold) {
            return Err(MatchError::ConfigValidation(format!(
                "discard_threshold must be within 0..=100, got {}",
                self.discard_threshold
            )));
        }
        if self.discard_threshold > self.good_threshold {
            return Err(MatchError::ConfigValidation(format!(
                "discard_threshold ({}) must not exceed good_threshold ({})",
                self.discard_threshold, self.good_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.symbol_column_cutoff) {
            return Err(MatchError::ConfigValidation(format!(
                "symbol_column_cutoff must be within 0..=1, got {}",
                self.symbol_column_cutoff
            )));
        }

        let p = &self.price.columns;
        if p.code == p.description || p.code == p.price || p.description == p.price {
            return Err(MatchError::ConfigValidation(
                "price columns code/description/price must be distinct".into(),
            ));
        }
        let m = &self.master.columns;
        if m.product == m.unit || m.product == m.cost || m.unit == m.cost {
            return Err(MatchError::ConfigValidation(
                "master columns product/unit/cost must be distinct".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
