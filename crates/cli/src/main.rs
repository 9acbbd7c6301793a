// cotejo CLI - price list vs master catalog reconciliation, headless

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cotejo_match::config::{default_currency_markers, default_ignore_words, MatchConfig};
use cotejo_match::matcher;
use cotejo_match::normalize::Normalizer;
use cotejo_match::store::{MatchStore, MemoryRepo};
use cotejo_match::table::{
    clean_currency_columns, project_master_records, project_price_records,
};
use cotejo_store::SqliteRepo;

use exit_codes::{
    EXIT_ERROR, EXIT_INPUT, EXIT_INVALID_CONFIG, EXIT_NOT_FOUND, EXIT_STORE, EXIT_SUCCESS,
    EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "cotejo")]
#[command(about = "Refresh master catalog costs from a price list by fuzzy-matching descriptions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  cotejo run cotejo.toml
  cotejo run cotejo.toml --db matches.db --json
  cotejo run cotejo.toml --dry-run --no-export
  cotejo run cotejo.toml --output result.json --out-dir exports/")]
    Run {
        /// Path to the cotejo.toml config file
        config: PathBuf,

        /// SQLite database holding confirmed/pending matches
        #[arg(long, default_value = "cotejo.db")]
        db: PathBuf,

        /// Score and classify without touching the database
        #[arg(long)]
        dry_run: bool,

        /// Output the full run result as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON result to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip writing the updated workbooks
        #[arg(long)]
        no_export: bool,

        /// Directory for exported workbooks (default: alongside the config)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Preview the first rows of an input file, with column indices
    #[command(after_help = "\
Examples:
  cotejo peek precios.xlsx
  cotejo peek maestro.xlsx --skip-rows 1 --rows 5")]
    Peek {
        file: PathBuf,

        /// Data rows to show
        #[arg(long, default_value_t = 10)]
        rows: usize,

        /// Leading banner rows to skip
        #[arg(long, default_value_t = 0)]
        skip_rows: usize,
    },

    /// Review pending matches
    #[command(subcommand)]
    Pending(PendingCommands),

    /// Review confirmed matches
    #[command(subcommand)]
    Confirmed(ConfirmedCommands),

    /// Delete every pending match (start a fresh comparison)
    Reset {
        #[arg(long, default_value = "cotejo.db")]
        db: PathBuf,
    },
}

#[derive(Subcommand)]
enum PendingCommands {
    /// List pending matches awaiting review
    List {
        #[arg(long, default_value = "cotejo.db")]
        db: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Accept a pending match: it becomes confirmed
    Promote {
        id: i64,

        #[arg(long, default_value = "cotejo.db")]
        db: PathBuf,
    },

    /// Discard a pending match
    Delete {
        id: i64,

        #[arg(long, default_value = "cotejo.db")]
        db: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfirmedCommands {
    /// List confirmed matches
    List {
        #[arg(long, default_value = "cotejo.db")]
        db: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Undo a confirmed match: it returns to pending
    Annul {
        id: i64,

        #[arg(long, default_value = "cotejo.db")]
        db: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            db,
            dry_run,
            json,
            output,
            no_export,
            out_dir,
        } => cmd_run(config, db, dry_run, json, output, no_export, out_dir),
        Commands::Peek {
            file,
            rows,
            skip_rows,
        } => cmd_peek(file, rows, skip_rows),
        Commands::Pending(cmd) => cmd_pending(cmd),
        Commands::Confirmed(cmd) => cmd_confirmed(cmd),
        Commands::Reset { db } => cmd_reset(db),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {}", e.message);
            if let Some(hint) = e.hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(e.code)
        }
    }
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(
    config_path: PathBuf,
    db: PathBuf,
    dry_run: bool,
    json_output: bool,
    output_file: Option<PathBuf>,
    no_export: bool,
    out_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, format!("cannot read config: {e}")))?;
    let config = MatchConfig::from_toml(&config_str)
        .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))?;

    // Input files resolve relative to the config file's directory.
    let base_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let normalizer = Normalizer::from_config(&config);

    let price_path = base_dir.join(&config.price.file);
    let price_raw = cotejo_io::import_table(&price_path, config.price.skip_rows)
        .map_err(|e| CliError::new(EXIT_INPUT, format!("cannot read {}: {e}", price_path.display())))?;
    let master_path = base_dir.join(&config.master.file);
    let master_raw = cotejo_io::import_table(&master_path, config.master.skip_rows)
        .map_err(|e| CliError::new(EXIT_INPUT, format!("cannot read {}: {e}", master_path.display())))?;

    let price_table = clean_currency_columns(&price_raw, &normalizer, config.symbol_column_cutoff);
    let master_table =
        clean_currency_columns(&master_raw, &normalizer, config.symbol_column_cutoff);

    let prices = project_price_records(&price_table, &config.price.columns);
    let masters = project_master_records(&master_table, &config.master.columns);

    let result = if dry_run {
        let mut store = MatchStore::new(MemoryRepo::new(), normalizer.clone());
        matcher::run(&config, &prices, &masters, &mut store)
    } else {
        let repo = SqliteRepo::open(&db).map_err(|e| CliError::new(EXIT_STORE, e.to_string()))?;
        let mut store = MatchStore::new(repo, normalizer.clone());
        matcher::run(&config, &prices, &masters, &mut store)
    };

    if !no_export {
        let dir = out_dir.unwrap_or_else(|| base_dir.clone());
        let title = export_title(&config);

        let master_out = dir.join(cotejo_io::timestamped_name(&file_stem(&config.master.file), "xlsx"));
        cotejo_io::xlsx::export_master(
            &master_out,
            &master_table,
            &config.master.columns,
            &result,
            &normalizer,
            &format!("{title} - Maestro"),
        )
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write {}: {e}", master_out.display())))?;
        eprintln!("wrote {}", master_out.display());

        let price_out = dir.join(cotejo_io::timestamped_name(&file_stem(&config.price.file), "xlsx"));
        cotejo_io::xlsx::export_prices(
            &price_out,
            &price_table,
            &config.price.columns,
            &result,
            &normalizer,
            &format!("{title} - Precios"),
        )
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write {}: {e}", price_out.display())))?;
        eprintln!("wrote {}", price_out.display());
    }

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "{} master records — {} confirmed, {} pending, {} duplicates, {} unmatched, {} skipped by unit",
        s.processed, s.matched, s.pending, s.duplicates, s.unmatched, s.skipped_units,
    );

    if s.store_errors > 0 {
        return Err(CliError::new(
            EXIT_STORE,
            format!("{} store operation(s) failed during the run", s.store_errors),
        )
        .with_hint("the run completed; re-run to retry the skipped writes"));
    }

    Ok(())
}

fn export_title(config: &MatchConfig) -> String {
    if config.name.is_empty() {
        "Cotejo".to_string()
    } else {
        config.name.clone()
    }
}

fn file_stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export")
        .to_string()
}

// ============================================================================
// peek
// ============================================================================

fn cmd_peek(file: PathBuf, rows: usize, skip_rows: usize) -> Result<(), CliError> {
    if rows == 0 {
        return Err(CliError::new(EXIT_USAGE, "--rows must be at least 1"));
    }

    let table = cotejo_io::import_table(&file, skip_rows)
        .map_err(|e| CliError::new(EXIT_INPUT, format!("cannot read {}: {e}", file.display())))?;

    let Some(header) = table.first() else {
        eprintln!("empty table");
        return Ok(());
    };

    let indexed: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, h)| format!("[{i}] {h}"))
        .collect();
    println!("{}", indexed.join("  "));

    for row in table.iter().skip(1).take(rows) {
        println!("{}", row.join(" | "));
    }
    eprintln!("{} data rows total", table.len().saturating_sub(1));
    Ok(())
}

// ============================================================================
// review: pending / confirmed / reset
// ============================================================================

fn open_store(db: &Path) -> Result<MatchStore<SqliteRepo>, CliError> {
    let repo = SqliteRepo::open(db).map_err(|e| {
        CliError::new(EXIT_STORE, e.to_string())
            .with_hint("pass --db, or create the database with `cotejo run` first")
    })?;
    let normalizer = Normalizer::new(default_currency_markers(), default_ignore_words());
    Ok(MatchStore::new(repo, normalizer))
}

fn store_err(e: cotejo_match::store::StoreError) -> CliError {
    CliError::new(EXIT_STORE, e.to_string())
}

fn cmd_pending(cmd: PendingCommands) -> Result<(), CliError> {
    match cmd {
        PendingCommands::List { db, json } => {
            let store = open_store(&db)?;
            let rows = store.select_pending().map_err(store_err)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&rows)
                        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?
                );
            } else {
                for r in &rows {
                    println!(
                        "{:>6}  {:>6.2}  {}  |  {}",
                        r.id, r.similarity, r.product_a, r.product_b
                    );
                }
                eprintln!("{} pending", rows.len());
            }
            Ok(())
        }
        PendingCommands::Promote { id, db } => {
            let mut store = open_store(&db)?;
            let row = find_pending_by_id(&store, id)?;
            let confirmed = store.promote(&row).map_err(store_err)?;
            eprintln!(
                "promoted: {}  |  {} (confirmed id {})",
                row.product_a, row.product_b, confirmed.id
            );
            Ok(())
        }
        PendingCommands::Delete { id, db } => {
            let mut store = open_store(&db)?;
            let row = find_pending_by_id(&store, id)?;
            store.delete_pending(&row).map_err(store_err)?;
            eprintln!("deleted pending {id}");
            Ok(())
        }
    }
}

fn cmd_confirmed(cmd: ConfirmedCommands) -> Result<(), CliError> {
    match cmd {
        ConfirmedCommands::List { db, json } => {
            let store = open_store(&db)?;
            let rows = store.select_confirmed().map_err(store_err)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&rows)
                        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?
                );
            } else {
                for r in &rows {
                    println!(
                        "{:>6}  {:>6.2}  {}  |  {}",
                        r.id, r.similarity, r.product_a, r.product_b
                    );
                }
                eprintln!("{} confirmed", rows.len());
            }
            Ok(())
        }
        ConfirmedCommands::Annul { id, db } => {
            let mut store = open_store(&db)?;
            let row = store
                .select_confirmed()
                .map_err(store_err)?
                .into_iter()
                .find(|r| r.id == id)
                .ok_or_else(|| {
                    CliError::new(EXIT_NOT_FOUND, format!("no confirmed match with id {id}"))
                })?;
            let pending = store.annul(&row).map_err(store_err)?;
            eprintln!(
                "annulled: {}  |  {} (pending id {})",
                row.product_a, row.product_b, pending.id
            );
            Ok(())
        }
    }
}

fn find_pending_by_id(
    store: &MatchStore<SqliteRepo>,
    id: i64,
) -> Result<cotejo_match::model::PendingMatch, CliError> {
    store
        .select_pending()
        .map_err(store_err)?
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| CliError::new(EXIT_NOT_FOUND, format!("no pending match with id {id}")))
}

fn cmd_reset(db: PathBuf) -> Result<(), CliError> {
    let mut store = open_store(&db)?;
    store.clear_pending().map_err(store_err)?;
    eprintln!("pending matches cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_strips_extension_and_dirs() {
        assert_eq!(file_stem("precios.xlsx"), "precios");
        assert_eq!(file_stem("data/maestro.v2.csv"), "maestro.v2");
        assert_eq!(file_stem(""), "export");
    }

    #[test]
    fn export_title_falls_back() {
        let toml = r#"
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
        assert_eq!(export_title(&config), "Cotejo");

        let named = MatchConfig::from_toml(&format!("name = \"Semanal\"\n{toml}")).unwrap();
        assert_eq!(export_title(&named), "Semanal");
    }
}
