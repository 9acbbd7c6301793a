// SQLite persistence for confirmed/pending matches

use std::path::Path;

use rusqlite::{params, Connection, Row};

use cotejo_match::model::{ConfirmedMatch, MatchFields, PendingMatch, PendingStatus};
use cotejo_match::store::{MatchRepo, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS confirmed_matches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_a TEXT NOT NULL,
    product_b TEXT NOT NULL,
    price_a REAL NOT NULL DEFAULT 0,
    price_b REAL NOT NULL DEFAULT 0,
    similarity REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS pending_matches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_a TEXT NOT NULL,
    product_b TEXT NOT NULL,
    price_a REAL NOT NULL DEFAULT 0,
    price_b REAL NOT NULL DEFAULT 0,
    similarity REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'pending'
);

CREATE INDEX IF NOT EXISTS idx_pending_pair
    ON pending_matches (product_a, product_b, status);
"#;

/// SQLite implementation of the engine's repository trait.
///
/// No uniqueness constraint on the pending pair: the engine's
/// check-then-insert is the dedup path, and a lost race at worst leaves one
/// extra pending row that review resolves by id (see DESIGN.md).
pub struct SqliteRepo {
    conn: Connection,
}

impl SqliteRepo {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(sql_err)?;
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        Ok(Self { conn })
    }
}

fn sql_err(e: rusqlite::Error) -> StoreError {
    StoreError(e.to_string())
}

fn confirmed_from_row(row: &Row<'_>) -> rusqlite::Result<ConfirmedMatch> {
    Ok(ConfirmedMatch {
        id: row.get(0)?,
        product_a: row.get(1)?,
        product_b: row.get(2)?,
        price_a: row.get(3)?,
        price_b: row.get(4)?,
        similarity: row.get(5)?,
    })
}

fn pending_from_row(row: &Row<'_>) -> rusqlite::Result<PendingMatch> {
    Ok(PendingMatch {
        id: row.get(0)?,
        product_a: row.get(1)?,
        product_b: row.get(2)?,
        price_a: row.get(3)?,
        price_b: row.get(4)?,
        similarity: row.get(5)?,
        status: PendingStatus::Pending,
    })
}

impl MatchRepo for SqliteRepo {
    fn select_confirmed(&self) -> Result<Vec<ConfirmedMatch>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, product_a, product_b, price_a, price_b, similarity
                 FROM confirmed_matches",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], confirmed_from_row)
            .map_err(sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }

    fn insert_confirmed(&mut self, fields: &MatchFields) -> Result<ConfirmedMatch, StoreError> {
        self.conn
            .execute(
                "INSERT INTO confirmed_matches (product_a, product_b, price_a, price_b, similarity)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    fields.product_a,
                    fields.product_b,
                    fields.price_a,
                    fields.price_b,
                    fields.similarity
                ],
            )
            .map_err(sql_err)?;
        Ok(ConfirmedMatch {
            id: self.conn.last_insert_rowid(),
            product_a: fields.product_a.clone(),
            product_b: fields.product_b.clone(),
            price_a: fields.price_a,
            price_b: fields.price_b,
            similarity: fields.similarity,
        })
    }

    fn delete_confirmed(&mut self, id: i64) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM confirmed_matches WHERE id = ?1", params![id])
            .map_err(sql_err)?;
        Ok(())
    }

    fn select_pending(&self) -> Result<Vec<PendingMatch>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, product_a, product_b, price_a, price_b, similarity
                 FROM pending_matches WHERE status = 'pending'",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], pending_from_row)
            .map_err(sql_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }

    fn find_pending(
        &self,
        product_a: &str,
        product_b: &str,
    ) -> Result<Option<PendingMatch>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, product_a, product_b, price_a, price_b, similarity
                 FROM pending_matches
                 WHERE product_a = ?1 AND product_b = ?2 AND status = 'pending'
                 LIMIT 1",
            )
            .map_err(sql_err)?;
        let mut rows = stmt
            .query_map(params![product_a, product_b], pending_from_row)
            .map_err(sql_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(sql_err)?)),
            None => Ok(None),
        }
    }

    fn insert_pending(&mut self, fields: &MatchFields) -> Result<PendingMatch, StoreError> {
        self.conn
            .execute(
                "INSERT INTO pending_matches (product_a, product_b, price_a, price_b, similarity, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending')",
                params![
                    fields.product_a,
                    fields.product_b,
                    fields.price_a,
                    fields.price_b,
                    fields.similarity
                ],
            )
            .map_err(sql_err)?;
        Ok(PendingMatch {
            id: self.conn.last_insert_rowid(),
            product_a: fields.product_a.clone(),
            product_b: fields.product_b.clone(),
            price_a: fields.price_a,
            price_b: fields.price_b,
            similarity: fields.similarity,
            status: PendingStatus::Pending,
        })
    }

    fn delete_pending(&mut self, id: i64) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM pending_matches WHERE id = ?1", params![id])
            .map_err(sql_err)?;
        Ok(())
    }

    fn clear_pending(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM pending_matches", [])
            .map_err(sql_err)?;
        Ok(())
    }
}
