//! Document store adapter — persistent chunk index behind `add`/`query`/`reset`.
//!
//! Wraps a rusqlite FTS5 collection: chunk text is indexed for bm25-ranked
//! retrieval, `source` and `sensitivity` ride along as unindexed metadata.
//! The adapter exclusively owns chunk persistence; chunks are immutable once
//! stored and destroyed only by [`DocStore::reset`].

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};

use crate::error::AppError;
use crate::policy::Sensitivity;

const DB_FILENAME: &str = "chunks.db";
const SCHEMA_VERSION: i64 = 1;

/// Per-chunk metadata supplied at insert time.
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    pub source: String,
    pub sensitivity: Sensitivity,
}

/// One retrieved chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub sensitivity: Sensitivity,
    pub score: f32,
}

/// Transient, in-memory query result: at most `k` chunks, best match first.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub matches: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Distinct source names in first-seen (retrieval) order.
    pub fn sources(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for m in &self.matches {
            if !seen.contains(&m.source.as_str()) {
                seen.push(m.source.as_str());
            }
        }
        seen
    }
}

#[derive(Debug, Clone)]
pub struct DocStore {
    db_path: PathBuf,
}

impl DocStore {
    /// Open (creating if needed) the collection under `dir`.
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::Storage(format!("store: cannot create {}: {e}", dir.display())))?;
        let store = Self {
            db_path: dir.join(DB_FILENAME),
        };
        store.init_db()?;
        Ok(store)
    }

    /// Persist `chunks` with one metadata entry and one globally unique id per
    /// chunk, in a single transaction.
    ///
    /// The three sequences must have equal length; a mismatch is a caller bug
    /// reported as a storage error without touching the collection.
    pub fn add(
        &self,
        chunks: &[String],
        metadata: &[ChunkMeta],
        ids: &[String],
    ) -> Result<(), AppError> {
        if chunks.len() != metadata.len() || chunks.len() != ids.len() {
            return Err(AppError::Storage(format!(
                "store: add requires equal-length sequences (chunks={}, metadata={}, ids={})",
                chunks.len(),
                metadata.len(),
                ids.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let mut conn = self.open_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Storage(format!("store: begin add tx: {e}")))?;

        for ((chunk, meta), id) in chunks.iter().zip(metadata).zip(ids) {
            tx.execute(
                "INSERT INTO chunks (id, text, source, sensitivity) VALUES (?1, ?2, ?3, ?4)",
                params![id, chunk, meta.source, meta.sensitivity.as_str()],
            )
            .map_err(|e| AppError::Storage(format!("store: insert chunk {id}: {e}")))?;
        }

        tx.commit()
            .map_err(|e| AppError::Storage(format!("store: commit add tx: {e}")))?;
        Ok(())
    }

    /// Return at most `k` chunks matching `text`, best score first.
    ///
    /// With a filter, only chunks whose sensitivity is in the permitted set
    /// are eligible, even when better-scoring ineligible chunks exist.
    /// An empty or unmatchable query returns an empty result, not an error.
    pub fn query(
        &self,
        text: &str,
        k: usize,
        filter: Option<&[Sensitivity]>,
    ) -> Result<RetrievalResult, AppError> {
        if k == 0 {
            return Ok(RetrievalResult::default());
        }
        let Some(expr) = match_expr(text) else {
            return Ok(RetrievalResult::default());
        };
        if filter.is_some_and(|labels| labels.is_empty()) {
            return Ok(RetrievalResult::default());
        }

        let mut sql = String::from(
            "SELECT id, text, source, sensitivity, bm25(chunks) AS rank \
             FROM chunks WHERE chunks MATCH ?1",
        );
        if let Some(labels) = filter {
            // Labels come from the static policy table, never from the caller.
            let list: Vec<String> = labels.iter().map(|l| format!("'{}'", l.as_str())).collect();
            sql.push_str(&format!(" AND sensitivity IN ({})", list.join(", ")));
        }
        sql.push_str(" ORDER BY rank LIMIT ?2");

        let conn = self.open_conn()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AppError::Storage(format!("store: prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![expr, k as i64], |row| {
                let sensitivity: String = row.get(3)?;
                let rank: f64 = row.get(4)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    sensitivity,
                    rank,
                ))
            })
            .map_err(|e| AppError::Storage(format!("store: execute query: {e}")))?;

        let mut matches = Vec::new();
        for row in rows {
            let (id, text, source, sensitivity, rank) =
                row.map_err(|e| AppError::Storage(format!("store: map query row: {e}")))?;
            let sensitivity = Sensitivity::parse(&sensitivity).ok_or_else(|| {
                AppError::Storage(format!("store: chunk {id} has invalid sensitivity '{sensitivity}'"))
            })?;
            matches.push(RetrievedChunk {
                id,
                text,
                source,
                sensitivity,
                // bm25 ranks ascending (lower is better); flip so callers see
                // similarity descending.
                score: (-rank) as f32,
            });
        }
        Ok(RetrievalResult { matches })
    }

    /// Irrevocably delete every chunk in the collection.
    ///
    /// Idempotent: resetting an already-empty collection is a no-op.
    pub fn reset(&self) -> Result<(), AppError> {
        let conn = self.open_conn()?;
        conn.execute("DELETE FROM chunks", [])
            .map_err(|e| AppError::Storage(format!("store: reset: {e}")))?;
        Ok(())
    }

    /// Number of chunks currently indexed.
    pub fn count(&self) -> Result<usize, AppError> {
        let conn = self.open_conn()?;
        let n: i64 = conn
            .query_row("SELECT count(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| AppError::Storage(format!("store: count: {e}")))?;
        Ok(n as usize)
    }

    fn init_db(&self) -> Result<(), AppError> {
        let conn = self.open_conn()?;
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(|e| AppError::Storage(format!("store: read schema version: {e}")))?;

        if version == 0 {
            conn.execute_batch(
                "
                CREATE VIRTUAL TABLE IF NOT EXISTS chunks USING fts5(
                    id UNINDEXED,
                    text,
                    source UNINDEXED,
                    sensitivity UNINDEXED
                );

                PRAGMA user_version = 1;
                ",
            )
            .map_err(|e| AppError::Storage(format!("store: initialize schema: {e}")))?;
            return Ok(());
        }

        if version != SCHEMA_VERSION {
            return Err(AppError::Storage(format!(
                "store: unsupported schema version {version}, expected {SCHEMA_VERSION}"
            )));
        }

        Ok(())
    }

    fn open_conn(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.db_path)
            .map_err(|e| AppError::Storage(format!("store: open {}: {e}", self.db_path.display())))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| AppError::Storage(format!("store: set journal_mode WAL: {e}")))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| AppError::Storage(format!("store: set busy_timeout: {e}")))?;

        Ok(conn)
    }
}

/// Build an FTS5 match expression from free-form question text.
///
/// Each alphanumeric term is quoted so punctuation cannot be misread as
/// query syntax; terms are OR-joined and bm25 does the ranking.
/// Returns `None` when the text contains no searchable terms.
fn match_expr(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}
