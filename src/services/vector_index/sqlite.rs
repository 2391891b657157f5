//! Exact linear-scan index persisted to SQLite.
//!
//! Every entry lives in an `entries` table; `seq` records insertion order
//! and survives overwrites, so tie-breaking stays stable across restarts.
//! A decoded copy of all rows is kept in memory for scanning.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rusqlite::{Connection, Transaction, params};
use tracing::debug;

use super::{SourceSummary, VectorIndex, cosine_with_norms, norm};
use crate::error::IndexError;
use crate::models::{IndexEntry, RetrievalResult, ScoredEntry};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    source_id TEXT NOT NULL,
    ordinal INTEGER NOT NULL,
    text TEXT NOT NULL,
    vector BLOB NOT NULL,
    metadata TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source_id);
"#;

const UPSERT: &str = r#"
INSERT INTO entries (id, source_id, ordinal, text, vector, metadata)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(id) DO UPDATE SET
    source_id = excluded.source_id,
    ordinal = excluded.ordinal,
    text = excluded.text,
    vector = excluded.vector,
    metadata = excluded.metadata
RETURNING seq
"#;

struct StoredEntry {
    seq: i64,
    norm: f64,
    entry: IndexEntry,
}

/// In-memory mirror of the `entries` table, ordered by `seq`.
#[derive(Default)]
struct Table {
    rows: Vec<StoredEntry>,
}

impl Table {
    fn dimension(&self) -> Option<usize> {
        self.rows.first().map(|row| row.entry.vector_dim())
    }

    fn dimension_excluding(&self, source_id: &str) -> Option<usize> {
        self.rows
            .iter()
            .find(|row| row.entry.source_id != source_id)
            .map(|row| row.entry.vector_dim())
    }

    fn apply_upsert(&mut self, stored: Vec<StoredEntry>) {
        let mut positions: HashMap<String, usize> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.entry.id.clone(), i))
            .collect();

        for row in stored {
            match positions.get(&row.entry.id) {
                Some(&i) => {
                    // overwrite keeps the original seq
                    let seq = self.rows[i].seq;
                    self.rows[i] = StoredEntry { seq, ..row };
                }
                None => {
                    positions.insert(row.entry.id.clone(), self.rows.len());
                    self.rows.push(row);
                }
            }
        }
    }

    fn remove_source(&mut self, source_id: &str) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.entry.source_id != source_id);
        before - self.rows.len()
    }
}

/// Vector index stored in a single SQLite database file.
pub struct SqliteVectorIndex {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
    table: RwLock<Table>,
}

impl SqliteVectorIndex {
    /// Open (or create) the index at `path` and load its entries.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Non-persistent index, mainly for tests.
    pub fn open_in_memory() -> Result<Self, IndexError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, IndexError> {
        conn.execute_batch(SCHEMA)?;
        let table = load_table(&conn)?;
        debug!(entries = table.rows.len(), "vector index loaded");

        Ok(Self {
            path,
            conn: Mutex::new(conn),
            table: RwLock::new(table),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // The connection mutex doubles as the writer lock.
    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_table(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_table(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VectorIndex for SqliteVectorIndex {
    fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock_conn();
        check_dimensions(&entries, self.read_table().dimension())?;

        let tx = conn.transaction()?;
        let stored = write_entries(&tx, entries)?;
        tx.commit()?;

        debug!(count = stored.len(), "upserted index entries");
        self.write_table().apply_upsert(stored);
        Ok(())
    }

    fn replace_source(
        &self,
        source_id: &str,
        entries: Vec<IndexEntry>,
    ) -> Result<usize, IndexError> {
        let mut conn = self.lock_conn();
        check_dimensions(&entries, self.read_table().dimension_excluding(source_id))?;

        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM entries WHERE source_id = ?1", params![source_id])?;
        let stored = write_entries(&tx, entries)?;
        tx.commit()?;

        debug!(source_id, removed, added = stored.len(), "replaced source");
        let mut table = self.write_table();
        table.remove_source(source_id);
        table.apply_upsert(stored);
        Ok(removed)
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult, IndexError> {
        let table = self.read_table();
        if k == 0 || table.rows.is_empty() {
            return Ok(RetrievalResult::empty());
        }

        if let Some(expected) = table.dimension()
            && expected != vector.len()
        {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        if !is_finite(vector) {
            return Err(IndexError::NonFinite("query vector".to_string()));
        }

        let query_norm = norm(vector);
        let mut scored: Vec<(usize, f32)> = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let score = cosine_with_norms(vector, query_norm, &row.entry.vector, row.norm);
                (i, score)
            })
            .collect();

        // sort_by is stable: equal scores stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(RetrievalResult::new(
            scored
                .into_iter()
                .map(|(i, score)| ScoredEntry {
                    entry: table.rows[i].entry.clone(),
                    score,
                })
                .collect(),
        ))
    }

    fn delete_by_source(&self, source_id: &str) -> Result<usize, IndexError> {
        let conn = self.lock_conn();
        let removed = conn.execute("DELETE FROM entries WHERE source_id = ?1", params![source_id])?;
        if removed > 0 {
            self.write_table().remove_source(source_id);
        }
        debug!(source_id, removed, "deleted source");
        Ok(removed)
    }

    fn clear(&self) -> Result<usize, IndexError> {
        let conn = self.lock_conn();
        let removed = conn.execute("DELETE FROM entries", [])?;
        self.write_table().rows.clear();
        Ok(removed)
    }

    fn source_checksum(&self, source_id: &str) -> Option<String> {
        self.read_table()
            .rows
            .iter()
            .find(|row| row.entry.source_id == source_id)
            .and_then(|row| row.entry.metadata.get("checksum").cloned())
    }

    fn sources(&self) -> Vec<SourceSummary> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for row in &self.read_table().rows {
            *counts.entry(row.entry.source_id.clone()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(source_id, chunks)| SourceSummary { source_id, chunks })
            .collect()
    }

    fn len(&self) -> usize {
        self.read_table().rows.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.read_table().dimension()
    }
}

fn check_dimensions(entries: &[IndexEntry], established: Option<usize>) -> Result<(), IndexError> {
    let mut expected = established;
    for entry in entries {
        let actual = entry.vector_dim();
        if actual == 0 {
            return Err(IndexError::EmptyVector(entry.id.clone()));
        }
        if !is_finite(&entry.vector) {
            return Err(IndexError::NonFinite(format!("entry {}", entry.id)));
        }
        match expected {
            Some(expected) if expected != actual => {
                return Err(IndexError::DimensionMismatch { expected, actual });
            }
            Some(_) => {}
            None => expected = Some(actual),
        }
    }
    Ok(())
}

fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite())
}

fn write_entries(
    tx: &Transaction<'_>,
    entries: Vec<IndexEntry>,
) -> Result<Vec<StoredEntry>, IndexError> {
    let mut stmt = tx.prepare_cached(UPSERT)?;
    let mut stored = Vec::with_capacity(entries.len());

    for entry in entries {
        let metadata = serde_json::to_string(&entry.metadata)
            .map_err(|e| IndexError::Corrupt(format!("{}: {}", entry.id, e)))?;
        let seq: i64 = stmt.query_row(
            params![
                entry.id,
                entry.source_id,
                entry.ordinal,
                entry.text,
                encode_vector(&entry.vector),
                metadata
            ],
            |row| row.get(0),
        )?;
        stored.push(StoredEntry {
            seq,
            norm: norm(&entry.vector),
            entry,
        });
    }

    Ok(stored)
}

fn load_table(conn: &Connection) -> Result<Table, IndexError> {
    let mut stmt = conn.prepare(
        "SELECT seq, id, source_id, ordinal, text, vector, metadata FROM entries ORDER BY seq",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, u32>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Vec<u8>>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut table = Table::default();
    for row in rows {
        let (seq, id, source_id, ordinal, text, blob, metadata) = row?;
        let vector = decode_vector(&blob).ok_or_else(|| {
            IndexError::Corrupt(format!("{id}: vector blob of {} bytes", blob.len()))
        })?;
        let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)
            .map_err(|e| IndexError::Corrupt(format!("{id}: {e}")))?;

        table.rows.push(StoredEntry {
            seq,
            norm: norm(&vector),
            entry: IndexEntry {
                id,
                source_id,
                ordinal,
                text,
                vector,
                metadata,
            },
        });
    }

    Ok(table)
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(source: &str, ordinal: u32, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: IndexEntry::generate_id(source, ordinal),
            source_id: source.to_string(),
            ordinal,
            text: format!("{source}#{ordinal}"),
            vector,
            metadata: BTreeMap::from([("checksum".to_string(), format!("sum-{source}"))]),
        }
    }

    fn unit(v: [f32; 3]) -> Vec<f32> {
        let n = norm(&v) as f32;
        v.iter().map(|x| x / n).collect()
    }

    fn texts(result: &RetrievalResult) -> Vec<String> {
        result.iter().map(|s| s.entry.text.clone()).collect()
    }

    fn sample_index() -> SqliteVectorIndex {
        let index = SqliteVectorIndex::open_in_memory().unwrap();
        index
            .upsert(vec![
                entry("doc1", 0, unit([1.0, 0.0, 0.0])),
                entry("doc1", 1, unit([0.0, 1.0, 0.0])),
                entry("doc2", 0, unit([0.6, 0.8, 0.0])),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_query_empty_index() {
        let index = SqliteVectorIndex::open_in_memory().unwrap();
        let result = index.query(&[1.0, 2.0], 5).unwrap();
        assert!(result.is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_exact_match_scores_one() {
        let index = sample_index();
        let query = unit([1.0, 0.0, 0.0]);
        let result = index.query(&query, 1).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.entries[0].entry.text, "doc1#0");
        assert!((result.entries[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_results_descending() {
        let index = sample_index();
        let result = index.query(&unit([0.5, 1.0, 0.0]), 3).unwrap();
        let scores: Vec<f32> = result.iter().map(|s| s.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(texts(&result)[0], "doc2#0");
    }

    #[test]
    fn test_k_bound() {
        let index = sample_index();
        for k in 0..6 {
            let result = index.query(&[1.0, 1.0, 1.0], k).unwrap();
            assert_eq!(result.len(), k.min(index.len()));
        }
    }

    #[test]
    fn test_query_deterministic() {
        let index = sample_index();
        let v = [0.3, 0.3, 0.1];
        assert_eq!(index.query(&v, 3).unwrap(), index.query(&v, 3).unwrap());
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let index = SqliteVectorIndex::open_in_memory().unwrap();
        index
            .upsert(vec![
                entry("c", 0, vec![1.0, 0.0]),
                entry("a", 0, vec![2.0, 0.0]),
                entry("b", 0, vec![0.5, 0.0]),
            ])
            .unwrap();

        let result = index.query(&[1.0, 0.0], 3).unwrap();
        assert_eq!(texts(&result), vec!["c#0", "a#0", "b#0"]);
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let index = sample_index();
        let mut replacement = entry("doc1", 0, unit([1.0, 0.0, 0.0]));
        replacement.text = "updated".to_string();
        index.upsert(vec![replacement]).unwrap();

        assert_eq!(index.len(), 3);
        // still first among equals
        index.upsert(vec![entry("doc3", 0, unit([1.0, 0.0, 0.0]))]).unwrap();
        let result = index.query(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(texts(&result), vec!["updated", "doc3#0"]);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let index = sample_index();
        let err = index.upsert(vec![entry("doc9", 0, vec![1.0, 0.0])]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_mixed_batch_rejected_on_empty_index() {
        let index = SqliteVectorIndex::open_in_memory().unwrap();
        let err = index
            .upsert(vec![entry("a", 0, vec![1.0, 0.0]), entry("a", 1, vec![1.0])])
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert!(index.is_empty());
    }

    #[test]
    fn test_empty_vector_rejected() {
        let index = SqliteVectorIndex::open_in_memory().unwrap();
        let err = index.upsert(vec![entry("a", 0, vec![])]).unwrap_err();
        assert!(matches!(err, IndexError::EmptyVector(_)));
    }

    #[test]
    fn test_non_finite_vectors_rejected() {
        let index = sample_index();
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = index.upsert(vec![entry("bad", 0, vec![bad, 1.0, 0.0])]).unwrap_err();
            assert!(matches!(err, IndexError::NonFinite(_)));
        }
        assert_eq!(index.len(), 3);
        assert!(matches!(
            index.query(&[f32::NAN, 0.0, 0.0], 3),
            Err(IndexError::NonFinite(_))
        ));

        let result = index.query(&[1.0, 1.0, 0.0], 3).unwrap();
        assert!(result.iter().all(|s| s.score.is_finite()));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = sample_index();
        assert!(matches!(
            index.query(&[1.0, 0.0], 1),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_delete_missing_source_is_noop() {
        let index = sample_index();
        let before = index.query(&[1.0, 1.0, 0.0], 10).unwrap();

        assert_eq!(index.delete_by_source("missing").unwrap(), 0);
        assert_eq!(index.len(), 3);
        assert_eq!(index.query(&[1.0, 1.0, 0.0], 10).unwrap(), before);
    }

    #[test]
    fn test_delete_by_source() {
        let index = sample_index();
        assert_eq!(index.delete_by_source("doc1").unwrap(), 2);
        assert_eq!(index.delete_by_source("doc1").unwrap(), 0);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.sources(),
            vec![SourceSummary {
                source_id: "doc2".to_string(),
                chunks: 1
            }]
        );
    }

    #[test]
    fn test_replace_source_drops_stale_entries() {
        let index = sample_index();
        let removed = index
            .replace_source("doc1", vec![entry("doc1", 0, unit([0.0, 0.0, 1.0]))])
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(index.len(), 2);
        let result = index.query(&[0.0, 0.0, 1.0], 1).unwrap();
        assert_eq!(texts(&result), vec!["doc1#0"]);
    }

    #[test]
    fn test_replace_sole_source_may_change_dimension() {
        let index = SqliteVectorIndex::open_in_memory().unwrap();
        index.upsert(vec![entry("only", 0, vec![1.0, 0.0])]).unwrap();
        index
            .replace_source("only", vec![entry("only", 0, vec![1.0, 0.0, 0.0])])
            .unwrap();
        assert_eq!(index.dimension(), Some(3));
    }

    #[test]
    fn test_source_checksum() {
        let index = sample_index();
        assert_eq!(index.source_checksum("doc2").as_deref(), Some("sum-doc2"));
        assert_eq!(index.source_checksum("nope"), None);
    }

    #[test]
    fn test_clear_forgets_dimension() {
        let index = sample_index();
        assert_eq!(index.clear().unwrap(), 3);
        assert_eq!(index.dimension(), None);
        index.upsert(vec![entry("x", 0, vec![1.0])]).unwrap();
        assert_eq!(index.dimension(), Some(1));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.sqlite3");

        let before = {
            let index = SqliteVectorIndex::open(&path).unwrap();
            index
                .upsert(vec![
                    entry("a", 0, vec![0.0, 1.0]),
                    entry("b", 0, vec![1.0, 0.0]),
                    entry("c", 0, vec![0.0, 2.0]),
                ])
                .unwrap();
            index.delete_by_source("b").unwrap();
            index.query(&[0.0, 1.0], 5).unwrap()
        };

        let reopened = SqliteVectorIndex::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.dimension(), Some(2));
        assert_eq!(reopened.query(&[0.0, 1.0], 5).unwrap(), before);
        assert_eq!(reopened.source_checksum("a").as_deref(), Some("sum-a"));
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.sqlite3");
        let index = Arc::new(SqliteVectorIndex::open(&path).unwrap());

        let writers: Vec<_> = (0..8)
            .map(|t| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for i in 0..25u32 {
                        let source = format!("thread-{t}");
                        index
                            .upsert(vec![entry(&source, i, vec![t as f32 + 1.0, i as f32, 1.0])])
                            .unwrap();
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let result = index.query(&[1.0, 0.5, 1.0], 10).unwrap();
                        assert!(result.len() <= 10);
                        let scores: Vec<f32> = result.iter().map(|s| s.score).collect();
                        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        assert_eq!(index.len(), 200);
        assert_eq!(index.sources().len(), 8);
        drop(index);

        let reopened = SqliteVectorIndex::open(&path).unwrap();
        assert_eq!(reopened.len(), 200);
        assert!(reopened.sources().iter().all(|s| s.chunks == 25));
    }

    #[test]
    fn test_vector_encoding() {
        let v = vec![0.25, -1.5, 3.0];
        assert_eq!(decode_vector(&encode_vector(&v)), Some(v));
        assert_eq!(decode_vector(&[0, 1, 2]), None);
    }
}
