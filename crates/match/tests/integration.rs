use cotejo_match::config::MatchConfig;
use cotejo_match::matcher::run;
use cotejo_match::model::{MatchBucket, MatchFields};
use cotejo_match::normalize::Normalizer;
use cotejo_match::store::{MatchStore, MemoryRepo};
use cotejo_match::table::{
    clean_currency_columns, project_master_records, project_price_records, rows_from_csv,
};

const CONFIG: &str = r#"
name = "Integration"

[price]
file = "precios.csv"
[price.columns]
code        = 0
description = 1
price       = 2

[master]
file = "maestro.csv"
[master.columns]
product = 0
unit    = 1
cost    = 2
"#;

const PRICE_CSV: &str = "\
COD,DESCRIPCION,PRECIO
P01,Leche Evaporada Gloria 400g,2.90
P02,Leche Gloria Entera 400gr,3.10
P03,Atun Florida Trozos 170g,4.80
P04,Aceite Primor Vegetal 1L,9.50
";

const MASTER_CSV: &str = "\
PRODUCTO,UNIDAD,COSTO
Leche Gloria Entera 400g,UNIDAD,3.50
Atun Florida Trozos en Aceite 170g,UNIDAD,5.20
Huevos Pardos,DOCENA,8.90
Quinua Organica Roja 500g,UNIDAD,12.00
";

fn load() -> (
    MatchConfig,
    Vec<cotejo_match::model::PriceRecord>,
    Vec<cotejo_match::model::MasterRecord>,
) {
    let config = MatchConfig::from_toml(CONFIG).unwrap();
    let normalizer = Normalizer::from_config(&config);

    let price_table = clean_currency_columns(
        &rows_from_csv(PRICE_CSV).unwrap(),
        &normalizer,
        config.symbol_column_cutoff,
    );
    let master_table = clean_currency_columns(
        &rows_from_csv(MASTER_CSV).unwrap(),
        &normalizer,
        config.symbol_column_cutoff,
    );

    let prices = project_price_records(&price_table, &config.price.columns);
    let masters = project_master_records(&master_table, &config.master.columns);
    (config, prices, masters)
}

fn fresh_store(config: &MatchConfig) -> MatchStore<MemoryRepo> {
    MatchStore::new(MemoryRepo::new(), Normalizer::from_config(config))
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

#[test]
fn end_to_end_first_run() {
    let (config, prices, masters) = load();
    let mut store = fresh_store(&config);

    let result = run(&config, &prices, &masters, &mut store);

    // DOCENA row is skipped before any outcome exists.
    assert_eq!(result.summary.skipped_units, 1);
    assert_eq!(result.summary.processed, 3);

    // Leche: the 400gr row wins over the Evaporada row.
    let leche = result
        .outcomes
        .iter()
        .find(|o| o.product_b == "Leche Gloria Entera 400g")
        .unwrap();
    assert_eq!(leche.bucket, MatchBucket::Confirmed);
    assert_eq!(leche.product_a.as_deref(), Some("Leche Gloria Entera 400gr"));
    assert_eq!(leche.price_a, Some(3.10));
    assert_eq!(leche.price_b, 3.50);
    assert!(leche.similarity.unwrap() >= 67.0);

    // Atun confirms against the only Atun price row.
    let atun = result
        .outcomes
        .iter()
        .find(|o| o.product_b.starts_with("Atun"))
        .unwrap();
    assert_eq!(atun.bucket, MatchBucket::Confirmed);

    // Quinua has no plausible candidate left above zero.
    let quinua = result
        .outcomes
        .iter()
        .find(|o| o.product_b.starts_with("Quinua"))
        .unwrap();
    assert!(matches!(
        quinua.bucket,
        MatchBucket::Pending | MatchBucket::Unmatched
    ));

    // Cost replacements cover exactly the confirmed products.
    assert_eq!(
        result.cost_replacements.get("Leche Gloria Entera 400g"),
        Some(&3.10)
    );
    assert_eq!(result.summary.matched, 2);
    assert_eq!(store.select_confirmed().unwrap().len(), 2);
}

#[test]
fn run_uniqueness_no_price_used_twice() {
    let (config, prices, masters) = load();
    let mut store = fresh_store(&config);

    let result = run(&config, &prices, &masters, &mut store);

    let mut used_price = std::collections::HashSet::new();
    let mut seen_master = std::collections::HashSet::new();
    for o in result.outcomes.iter().filter(|o| {
        matches!(o.bucket, MatchBucket::Confirmed | MatchBucket::Pending)
    }) {
        if let Some(ref a) = o.product_a {
            assert!(used_price.insert(a.clone()), "price row used twice: {a}");
        }
        assert!(
            seen_master.insert(o.product_b.clone()),
            "master row produced two outcomes: {}",
            o.product_b
        );
    }
}

// ---------------------------------------------------------------------------
// Re-run against the committed store
// ---------------------------------------------------------------------------

#[test]
fn second_run_reuses_confirmed_decisions() {
    let (config, prices, masters) = load();
    let mut store = fresh_store(&config);

    let first = run(&config, &prices, &masters, &mut store);
    let confirmed_after_first = store.select_confirmed().unwrap().len();
    assert!(first.summary.matched > 0);

    let second = run(&config, &prices, &masters, &mut store);

    // Every previously confirmed product comes back through the cache: no
    // recalculation, no new rows, cost replacement still present.
    assert_eq!(second.summary.matched, 0);
    assert_eq!(second.summary.duplicates, first.summary.matched);
    assert_eq!(
        store.select_confirmed().unwrap().len(),
        confirmed_after_first
    );
    assert_eq!(
        second.cost_replacements.get("Leche Gloria Entera 400g"),
        Some(&3.10)
    );
    assert!(second
        .outcomes
        .iter()
        .any(|o| o.bucket == MatchBucket::CachedConfirmed));
}

// ---------------------------------------------------------------------------
// Review flow
// ---------------------------------------------------------------------------

#[test]
fn promote_then_rerun_treats_pair_as_confirmed() {
    let (config, _, _) = load();
    let mut store = fresh_store(&config);

    let pending = store
        .save_pending(MatchFields {
            product_a: "Quinua Roja Organica 500gr".into(),
            product_b: "Quinua Organica Roja 500g".into(),
            price_a: 11.0,
            price_b: 12.0,
            similarity: 55.0,
        })
        .unwrap();
    store.promote(&pending).unwrap();
    store.preload_confirmed().unwrap();

    assert!(store.select_pending().unwrap().is_empty());
    assert!(store.lookup_confirmed("Quinua Organica Roja 500g").is_some());

    // The promoted pair now short-circuits a run.
    let prices = vec![cotejo_match::model::PriceRecord {
        code: "P9".into(),
        description: "Quinua Roja Organica 500gr".into(),
        price: 11.0,
    }];
    let masters = vec![cotejo_match::model::MasterRecord {
        product: "Quinua Organica Roja 500g".into(),
        unit: "UNIDAD".into(),
        cost: 12.0,
    }];
    let result = run(&config, &prices, &masters, &mut store);
    assert_eq!(result.outcomes[0].bucket, MatchBucket::CachedConfirmed);
    assert_eq!(result.cost_replacements.get("Quinua Organica Roja 500g"), Some(&11.0));
}

#[test]
fn annul_returns_pair_to_pending() {
    let (config, prices, masters) = load();
    let mut store = fresh_store(&config);

    run(&config, &prices, &masters, &mut store);
    let confirmed = store.select_confirmed().unwrap().remove(0);

    let pending = store.annul(&confirmed).unwrap();
    assert_eq!(pending.product_a, confirmed.product_a);
    assert_eq!(pending.product_b, confirmed.product_b);
    assert!(store
        .select_confirmed()
        .unwrap()
        .iter()
        .all(|c| c.id != confirmed.id));
}

// ---------------------------------------------------------------------------
// Scoring guard
// ---------------------------------------------------------------------------

#[test]
fn run_result_serializes_to_json() {
    let (config, prices, masters) = load();
    let mut store = fresh_store(&config);
    let result = run(&config, &prices, &masters, &mut store);

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["summary"]["matched"], 2);
    assert_eq!(value["meta"]["good_threshold"], 67.0);
    assert!(value["outcomes"].as_array().unwrap().len() >= 3);
    assert_eq!(
        value["cost_replacements"]["Leche Gloria Entera 400g"],
        3.10
    );
}

#[test]
fn confirmed_price_side_scores_zero_everywhere() {
    let (config, prices, masters) = load();
    let mut store = fresh_store(&config);
    run(&config, &prices, &masters, &mut store);

    store.preload_confirmed().unwrap();
    let confirmed = store.confirmed_rows();
    assert!(!confirmed.is_empty());

    let normalizer = Normalizer::from_config(&config);
    let scorer = cotejo_match::score::Scorer::new(&normalizer, &confirmed);
    for row in &confirmed {
        assert_eq!(scorer.score(&row.product_a, "Leche Fresca"), 0.0);
        assert_eq!(scorer.score("Leche Fresca", &row.product_a), 0.0);
    }
}
