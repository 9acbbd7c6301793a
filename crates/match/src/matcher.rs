use std::collections::{HashMap, HashSet};

use crate::config::MatchConfig;
use crate::model::{
    ColorPair, MasterRecord, MatchBucket, MatchFields, PriceRecord, RecordOutcome, RunMeta,
    RunResult, RunSummary,
};
use crate::normalize::Normalizer;
use crate::score::Scorer;
use crate::store::{MatchRepo, MatchStore};

/// One-to-one pairing bookkeeping for a single run. Price records are a
/// shared, mutually exclusive resource across all master records.
#[derive(Debug, Default)]
struct RunState {
    seen_master: HashSet<String>,
    used_price: HashSet<String>,
    used_pairs: HashSet<String>,
}

/// Drive one reconciliation run.
///
/// Master records are processed strictly in catalog order; each store
/// operation completes before the next record starts, so the greedy
/// assignment is deterministic. Store failures never abort the run: the
/// affected write is skipped and counted in `summary.store_errors`.
pub fn run<R: MatchRepo>(
    config: &MatchConfig,
    price_records: &[PriceRecord],
    master_records: &[MasterRecord],
    store: &mut MatchStore<R>,
) -> RunResult {
    let normalizer = Normalizer::from_config(config);
    let unit_filter = normalizer.normalize(&config.unit_filter);

    let mut summary = RunSummary::default();
    let mut state = RunState::default();
    let mut outcomes: Vec<RecordOutcome> = Vec::new();
    let mut cost_replacements: HashMap<String, f64> = HashMap::new();
    let mut color_pairs: Vec<ColorPair> = Vec::new();

    // Pending reflects this run only; confirmed feeds the scorer.
    if store.clear_pending().is_err() {
        summary.store_errors += 1;
    }
    if store.preload_pending().is_err() {
        summary.store_errors += 1;
    }
    if store.preload_confirmed().is_err() {
        summary.store_errors += 1;
    }

    let confirmed = store.confirmed_rows();
    let scorer = Scorer::new(&normalizer, &confirmed);

    for record in master_records {
        if normalizer.normalize(&record.unit) != unit_filter {
            summary.skipped_units += 1;
            continue;
        }
        summary.processed += 1;

        let master_key = normalizer.normalize(&record.product);

        // A prior run (or reviewer) already settled this product: reuse the
        // stored decision, record the cost replacement, write nothing.
        if let Some(existing) = store.lookup_confirmed(&record.product) {
            let existing = existing.clone();
            summary.duplicates += 1;
            cost_replacements.insert(record.product.clone(), existing.price_a);
            color_pairs.push(ColorPair {
                price_key: normalizer.normalize(&existing.product_a),
                master_key: normalizer.normalize(&existing.product_b),
            });
            outcomes.push(RecordOutcome {
                bucket: MatchBucket::CachedConfirmed,
                product_b: record.product.clone(),
                product_a: Some(existing.product_a),
                price_a: Some(existing.price_a),
                price_b: existing.price_b,
                similarity: Some(existing.similarity),
            });
            continue;
        }

        // Greedy best candidate among price records not yet consumed.
        let mut best: Option<(&PriceRecord, f64)> = None;
        for price in price_records {
            let price_key = normalizer.normalize(&price.description);
            if state.used_price.contains(&price_key) {
                continue;
            }
            let sim = scorer.score(&record.product, &price.description);
            if sim > best.map_or(0.0, |(_, s)| s) {
                best = Some((price, sim));
            }
        }

        let Some((price, best_sim)) = best else {
            summary.unmatched += 1;
            outcomes.push(RecordOutcome {
                bucket: MatchBucket::Unmatched,
                product_b: record.product.clone(),
                product_a: None,
                price_a: None,
                price_b: record.cost,
                similarity: None,
            });
            continue;
        };

        let price_key = normalizer.normalize(&price.description);
        let pair_key = format!("{master_key}||{price_key}");

        if state.seen_master.contains(&master_key) || state.used_pairs.contains(&pair_key) {
            summary.duplicates += 1;
            outcomes.push(RecordOutcome {
                bucket: MatchBucket::Duplicate,
                product_b: record.product.clone(),
                product_a: Some(price.description.clone()),
                price_a: Some(price.price),
                price_b: record.cost,
                similarity: Some(best_sim),
            });
            continue;
        }

        state.seen_master.insert(master_key.clone());
        state.used_price.insert(price_key.clone());
        state.used_pairs.insert(pair_key);

        let fields = MatchFields {
            product_a: price.description.clone(),
            product_b: record.product.clone(),
            price_a: price.price,
            price_b: record.cost,
            similarity: best_sim,
        };

        if best_sim >= config.good_threshold {
            summary.matched += 1;
            cost_replacements.insert(record.product.clone(), price.price);
            color_pairs.push(ColorPair {
                price_key,
                master_key,
            });
            if store.save_confirmed(fields).is_err() {
                summary.store_errors += 1;
            }
            outcomes.push(RecordOutcome {
                bucket: MatchBucket::Confirmed,
                product_b: record.product.clone(),
                product_a: Some(price.description.clone()),
                price_a: Some(price.price),
                price_b: record.cost,
                similarity: Some(best_sim),
            });
        } else if best_sim >= config.discard_threshold {
            summary.pending += 1;
            if store.save_pending(fields).is_err() {
                summary.store_errors += 1;
            }
            outcomes.push(RecordOutcome {
                bucket: MatchBucket::Pending,
                product_b: record.product.clone(),
                product_a: Some(price.description.clone()),
                price_a: Some(price.price),
                price_b: record.cost,
                similarity: Some(best_sim),
            });
        } else {
            summary.unmatched += 1;
            outcomes.push(RecordOutcome {
                bucket: MatchBucket::Unmatched,
                product_b: record.product.clone(),
                product_a: Some(price.description.clone()),
                price_a: Some(price.price),
                price_b: record.cost,
                similarity: Some(best_sim),
            });
        }
    }

    // New confirmed rows become visible to the next run's scorer.
    if store.preload_confirmed().is_err() {
        summary.store_errors += 1;
    }

    RunResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            good_threshold: config.good_threshold,
            discard_threshold: config.discard_threshold,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        outcomes,
        cost_replacements,
        color_pairs,
    }
}
