// Integration tests for `cotejo run` and the review commands.
// Run with: cargo test -p cotejo-cli --test run_tests -- --nocapture

use std::path::Path;
use std::process::Command;

fn cotejo() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cotejo"))
}

const CONFIG_TOML: &str = r#"
name = "Prueba"

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
";

const MASTER_CSV: &str = "\
PRODUCTO,UNIDAD,COSTO
Leche Gloria Entera 400g,UNIDAD,3.50
Huevos Pardos,DOCENA,8.90
";

fn write_fixture(dir: &Path) {
    std::fs::write(dir.join("cotejo.toml"), CONFIG_TOML).unwrap();
    std::fs::write(dir.join("precios.csv"), PRICE_CSV).unwrap();
    std::fs::write(dir.join("maestro.csv"), MASTER_CSV).unwrap();
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_writes_db_exports_and_json() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let db = dir.path().join("matches.db");

    let output = cotejo()
        .args([
            "run",
            dir.path().join("cotejo.toml").to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--json",
        ])
        .output()
        .expect("cotejo run");

    assert!(
        output.status.success(),
        "exit: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let result: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON result");
    assert_eq!(result["summary"]["matched"], 1);
    assert_eq!(result["summary"]["skipped_units"], 1);
    assert_eq!(
        result["cost_replacements"]["Leche Gloria Entera 400g"],
        3.10
    );

    // Both decorated workbooks landed next to the config.
    let exports: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".xlsx"))
        .collect();
    assert_eq!(exports.len(), 2, "expected maestro + precios exports");

    assert!(db.exists());
}

#[test]
fn rerun_reuses_confirmed_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let db = dir.path().join("matches.db");
    let config = dir.path().join("cotejo.toml");

    let first = cotejo()
        .args([
            "run",
            config.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--json",
            "--no-export",
        ])
        .output()
        .unwrap();
    assert!(first.status.success());

    let second = cotejo()
        .args([
            "run",
            config.to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--json",
            "--no-export",
        ])
        .output()
        .unwrap();
    assert!(second.status.success());

    let result: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&second.stdout)).unwrap();
    // The confirmed pair now arrives through the cache, not a fresh write.
    assert_eq!(result["summary"]["matched"], 0);
    assert_eq!(result["summary"]["duplicates"], 1);
    // Cost replacement still present for the export merge.
    assert_eq!(
        result["cost_replacements"]["Leche Gloria Entera 400g"],
        3.10
    );
}

#[test]
fn dry_run_leaves_no_database() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let db = dir.path().join("matches.db");

    let output = cotejo()
        .args([
            "run",
            dir.path().join("cotejo.toml").to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--dry-run",
            "--no-export",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!db.exists(), "dry run must not create the database");
}

#[test]
fn invalid_config_exits_3_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    // Break the config: overlapping master columns.
    let broken = CONFIG_TOML.replace("unit    = 1", "unit    = 0");
    std::fs::write(dir.path().join("cotejo.toml"), broken).unwrap();
    let db = dir.path().join("matches.db");

    let output = cotejo()
        .args([
            "run",
            dir.path().join("cotejo.toml").to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert!(!db.exists(), "no store writes before validation passes");
}

#[test]
fn missing_input_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    std::fs::remove_file(dir.path().join("precios.csv")).unwrap();

    let output = cotejo()
        .args(["run", dir.path().join("cotejo.toml").to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
}

// ---------------------------------------------------------------------------
// review flow
// ---------------------------------------------------------------------------

#[test]
fn pending_promote_then_confirmed_list() {
    let dir = tempfile::tempdir().unwrap();
    // A price row that only weakly matches: ends up pending.
    std::fs::write(dir.path().join("cotejo.toml"), CONFIG_TOML).unwrap();
    std::fs::write(
        dir.path().join("precios.csv"),
        "COD,DESCRIPCION,PRECIO\nP01,Arroz Costeno Extra 5kg,21.00\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("maestro.csv"),
        "PRODUCTO,UNIDAD,COSTO\nArroz Grano Grueso,UNIDAD,19.00\n",
    )
    .unwrap();
    let db = dir.path().join("matches.db");

    let run = cotejo()
        .args([
            "run",
            dir.path().join("cotejo.toml").to_str().unwrap(),
            "--db",
            db.to_str().unwrap(),
            "--no-export",
        ])
        .output()
        .unwrap();
    assert!(run.status.success());

    let list = cotejo()
        .args(["pending", "list", "--db", db.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    let rows: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&list.stdout)).unwrap();
    let id = rows[0]["id"].as_i64().unwrap();

    let promote = cotejo()
        .args([
            "pending",
            "promote",
            &id.to_string(),
            "--db",
            db.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(promote.status.success());

    let confirmed = cotejo()
        .args(["confirmed", "list", "--db", db.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    let rows: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&confirmed.stdout)).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["product_b"], "Arroz Grano Grueso");
}

#[test]
fn promote_unknown_id_exits_6() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("matches.db");
    // Create an empty store first.
    cotejo()
        .args(["reset", "--db", db.to_str().unwrap()])
        .output()
        .unwrap();

    let output = cotejo()
        .args(["pending", "promote", "999", "--db", db.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));
}

// ---------------------------------------------------------------------------
// peek
// ---------------------------------------------------------------------------

#[test]
fn peek_prints_indexed_header() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let output = cotejo()
        .args(["peek", dir.path().join("precios.csv").to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[0] COD"));
    assert!(stdout.contains("[1] DESCRIPCION"));
}
