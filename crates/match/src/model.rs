use std::collections::HashMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// One row of the price list, projected at the configured columns.
#[derive(Debug, Clone)]
pub struct PriceRecord {
    pub code: String,
    pub description: String,
    pub price: f64,
}

/// One row of the master catalog, projected at the configured columns.
#[derive(Debug, Clone)]
pub struct MasterRecord {
    pub product: String,
    pub unit: String,
    pub cost: f64,
}

// ---------------------------------------------------------------------------
// Persisted rows
// ---------------------------------------------------------------------------

/// Field set shared by confirmed and pending rows, before a row id exists.
/// `product_a`/`price_a` are the price-list side, `product_b`/`price_b` the
/// master side.
#[derive(Debug, Clone)]
pub struct MatchFields {
    pub product_a: String,
    pub product_b: String,
    pub price_a: f64,
    pub price_b: f64,
    pub similarity: f64,
}

/// A reviewer- or threshold-accepted pairing, owned by the persisted store.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedMatch {
    pub id: i64,
    pub product_a: String,
    pub product_b: String,
    pub price_a: f64,
    pub price_b: f64,
    pub similarity: f64,
}

/// A below-threshold pairing awaiting review.
#[derive(Debug, Clone, Serialize)]
pub struct PendingMatch {
    pub id: i64,
    pub product_a: String,
    pub product_b: String,
    pub price_a: f64,
    pub price_b: f64,
    pub similarity: f64,
    pub status: PendingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
}

impl PendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfirmedMatch {
    pub fn fields(&self) -> MatchFields {
        MatchFields {
            product_a: self.product_a.clone(),
            product_b: self.product_b.clone(),
            price_a: self.price_a,
            price_b: self.price_b,
            similarity: self.similarity,
        }
    }
}

impl PendingMatch {
    pub fn fields(&self) -> MatchFields {
        MatchFields {
            product_a: self.product_a.clone(),
            product_b: self.product_b.clone(),
            price_a: self.price_a,
            price_b: self.price_b,
            similarity: self.similarity,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBucket {
    /// Score reached the good threshold; persisted as confirmed.
    Confirmed,
    /// Score between discard and good; persisted as pending.
    Pending,
    /// A confirmed row already existed for this master product; nothing
    /// recalculated or written, cost replacement still applies.
    CachedConfirmed,
    /// Master key or pair key was already consumed this run.
    Duplicate,
    /// No candidate, or score below the discard threshold.
    Unmatched,
}

impl std::fmt::Display for MatchBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Pending => write!(f, "pending"),
            Self::CachedConfirmed => write!(f, "cached_confirmed"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// Result for a single master record within one run.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub bucket: MatchBucket,
    /// Master-side product text as it appears in the catalog.
    pub product_b: String,
    /// Price-side description of the chosen candidate, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_a: Option<f64>,
    pub price_b: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// Normalized key pair of a confirmed outcome, consumed by the export layer
/// to paint both workbook rows the same fill color.
#[derive(Debug, Clone, Serialize)]
pub struct ColorPair {
    pub price_key: String,
    pub master_key: String,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Master records that passed the unit filter.
    pub processed: usize,
    pub matched: usize,
    pub pending: usize,
    pub duplicates: usize,
    pub unmatched: usize,
    pub skipped_units: usize,
    /// Store reads/writes that failed and were skipped over.
    pub store_errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub good_threshold: f64,
    pub discard_threshold: f64,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub outcomes: Vec<RecordOutcome>,
    /// Master product text -> price-side price that replaces its cost.
    pub cost_replacements: HashMap<String, f64>,
    pub color_pairs: Vec<ColorPair>,
}
