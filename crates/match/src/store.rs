use std::collections::HashMap;
use std::fmt;

use crate::model::{ConfirmedMatch, MatchFields, PendingMatch};
use crate::normalize::Normalizer;

/// Failure in the persisted store. One variant on purpose: the engine never
/// branches on the cause, it only skips the affected operation and counts it.
#[derive(Debug)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// The persisted keyed store: two collections, `confirmed` and `pending`,
/// with equality/status filtering. Implementations own the storage tech;
/// cache consistency and dedup rules live in [`MatchStore`].
pub trait MatchRepo {
    fn select_confirmed(&self) -> Result<Vec<ConfirmedMatch>, StoreError>;
    fn insert_confirmed(&mut self, fields: &MatchFields) -> Result<ConfirmedMatch, StoreError>;
    fn delete_confirmed(&mut self, id: i64) -> Result<(), StoreError>;

    fn select_pending(&self) -> Result<Vec<PendingMatch>, StoreError>;
    /// Find an existing pending row with these exact product texts.
    fn find_pending(
        &self,
        product_a: &str,
        product_b: &str,
    ) -> Result<Option<PendingMatch>, StoreError>;
    fn insert_pending(&mut self, fields: &MatchFields) -> Result<PendingMatch, StoreError>;
    fn delete_pending(&mut self, id: i64) -> Result<(), StoreError>;
    fn clear_pending(&mut self) -> Result<(), StoreError>;
}

/// Cache + dedup gateway in front of a [`MatchRepo`].
///
/// Owns the two process-local indexes: confirmed rows by normalized master
/// product, pending rows by the normalized pair key. Both are rebuilt or
/// cleared explicitly at run boundaries, never implicitly.
pub struct MatchStore<R: MatchRepo> {
    repo: R,
    normalizer: Normalizer,
    confirmed: HashMap<String, ConfirmedMatch>,
    pending: HashMap<String, PendingMatch>,
}

impl<R: MatchRepo> MatchStore<R> {
    pub fn new(repo: R, normalizer: Normalizer) -> Self {
        Self {
            repo,
            normalizer,
            confirmed: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// `normalize(product_a) + "||" + normalize(product_b)`.
    pub fn pair_key(&self, product_a: &str, product_b: &str) -> String {
        format!(
            "{}||{}",
            self.normalizer.normalize(product_a),
            self.normalizer.normalize(product_b)
        )
    }

    /// Rebuild the confirmed index from the store. Must run before any
    /// scoring, and again after a run commits new confirmed rows.
    pub fn preload_confirmed(&mut self) -> Result<(), StoreError> {
        let rows = self.repo.select_confirmed()?;
        let mut index = HashMap::with_capacity(rows.len());
        for row in rows {
            index.insert(self.normalizer.normalize(&row.product_b), row);
        }
        self.confirmed = index;
        Ok(())
    }

    /// Rebuild the pending index from the store.
    pub fn preload_pending(&mut self) -> Result<(), StoreError> {
        let rows = self.repo.select_pending()?;
        let mut index = HashMap::with_capacity(rows.len());
        for row in rows {
            index.insert(self.pair_key(&row.product_a, &row.product_b), row);
        }
        self.pending = index;
        Ok(())
    }

    pub fn lookup_confirmed(&self, master_product: &str) -> Option<&ConfirmedMatch> {
        self.confirmed.get(&self.normalizer.normalize(master_product))
    }

    /// Snapshot of the confirmed cache, for synonym learning.
    pub fn confirmed_rows(&self) -> Vec<ConfirmedMatch> {
        self.confirmed.values().cloned().collect()
    }

    /// Insert a confirmed row. Does not guard against duplicates (that is
    /// the orchestrator's job via its run state and the confirmed cache) and
    /// does not touch the cache: newly committed rows become visible at the
    /// next `preload_confirmed`.
    pub fn save_confirmed(&mut self, fields: MatchFields) -> Result<ConfirmedMatch, StoreError> {
        self.repo.insert_confirmed(&fields)
    }

    /// Insert a pending row unless the same pair already exists.
    ///
    /// Checks the cache first, then the store (so duplicates cannot survive
    /// a cache reset), and only then inserts. The check-then-insert is not
    /// atomic against concurrent writers; see DESIGN.md.
    pub fn save_pending(&mut self, fields: MatchFields) -> Result<PendingMatch, StoreError> {
        let key = self.pair_key(&fields.product_a, &fields.product_b);

        if let Some(row) = self.pending.get(&key) {
            return Ok(row.clone());
        }

        if let Some(row) = self.repo.find_pending(&fields.product_a, &fields.product_b)? {
            self.pending.insert(key, row.clone());
            return Ok(row);
        }

        let row = self.repo.insert_pending(&fields)?;
        self.pending.insert(key, row.clone());
        Ok(row)
    }

    /// Promote a pending row to confirmed: delete, then insert an equivalent
    /// confirmed row.
    pub fn promote(&mut self, pending: &PendingMatch) -> Result<ConfirmedMatch, StoreError> {
        self.repo.delete_pending(pending.id)?;
        let key = self.pair_key(&pending.product_a, &pending.product_b);
        self.pending.remove(&key);
        self.repo.insert_confirmed(&pending.fields())
    }

    /// Annul a confirmed row: delete it and re-create an equivalent pending
    /// row through the dedup path.
    pub fn annul(&mut self, confirmed: &ConfirmedMatch) -> Result<PendingMatch, StoreError> {
        self.repo.delete_confirmed(confirmed.id)?;
        self.confirmed
            .remove(&self.normalizer.normalize(&confirmed.product_b));
        self.save_pending(confirmed.fields())
    }

    /// Delete every pending row and empty the pending cache. Runs at the
    /// start of each reconciliation so pending only ever reflects the
    /// current run's open questions.
    pub fn clear_pending(&mut self) -> Result<(), StoreError> {
        self.repo.clear_pending()?;
        self.pending.clear();
        Ok(())
    }

    /// Delete a single pending row (reviewer discarded it).
    pub fn delete_pending(&mut self, pending: &PendingMatch) -> Result<(), StoreError> {
        self.repo.delete_pending(pending.id)?;
        let key = self.pair_key(&pending.product_a, &pending.product_b);
        self.pending.remove(&key);
        Ok(())
    }

    pub fn select_pending(&self) -> Result<Vec<PendingMatch>, StoreError> {
        self.repo.select_pending()
    }

    pub fn select_confirmed(&self) -> Result<Vec<ConfirmedMatch>, StoreError> {
        self.repo.select_confirmed()
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Vec-backed repository. The `--dry-run` backend, and what engine tests
/// run against.
#[derive(Debug, Default)]
pub struct MemoryRepo {
    confirmed: Vec<ConfirmedMatch>,
    pending: Vec<PendingMatch>,
    next_id: i64,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a confirmed row, for re-run scenarios.
    pub fn with_confirmed(mut self, fields: MatchFields) -> Self {
        let row = self.make_confirmed(&fields);
        self.confirmed.push(row);
        self
    }

    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn make_confirmed(&mut self, fields: &MatchFields) -> ConfirmedMatch {
        ConfirmedMatch {
            id: self.alloc_id(),
            product_a: fields.product_a.clone(),
            product_b: fields.product_b.clone(),
            price_a: fields.price_a,
            price_b: fields.price_b,
            similarity: fields.similarity,
        }
    }
}

impl MatchRepo for MemoryRepo {
    fn select_confirmed(&self) -> Result<Vec<ConfirmedMatch>, StoreError> {
        Ok(self.confirmed.clone())
    }

    fn insert_confirmed(&mut self, fields: &MatchFields) -> Result<ConfirmedMatch, StoreError> {
        let row = self.make_confirmed(fields);
        self.confirmed.push(row.clone());
        Ok(row)
    }

    fn delete_confirmed(&mut self, id: i64) -> Result<(), StoreError> {
        self.confirmed.retain(|r| r.id != id);
        Ok(())
    }

    fn select_pending(&self) -> Result<Vec<PendingMatch>, StoreError> {
        Ok(self.pending.clone())
    }

    fn find_pending(
        &self,
        product_a: &str,
        product_b: &str,
    ) -> Result<Option<PendingMatch>, StoreError> {
        Ok(self
            .pending
            .iter()
            .find(|r| r.product_a == product_a && r.product_b == product_b)
            .cloned())
    }

    fn insert_pending(&mut self, fields: &MatchFields) -> Result<PendingMatch, StoreError> {
        let row = PendingMatch {
            id: self.alloc_id(),
            product_a: fields.product_a.clone(),
            product_b: fields.product_b.clone(),
            price_a: fields.price_a,
            price_b: fields.price_b,
            similarity: fields.similarity,
            status: crate::model::PendingStatus::Pending,
        };
        self.pending.push(row.clone());
        Ok(row)
    }

    fn delete_pending(&mut self, id: i64) -> Result<(), StoreError> {
        self.pending.retain(|r| r.id != id);
        Ok(())
    }

    fn clear_pending(&mut self) -> Result<(), StoreError> {
        self.pending.clear();
        Ok(())
    }
}
