//! Field-level change log.
//!
//! One record per field-level change, written inside the same transaction as
//! the mutation it describes; a history row is never observable without its
//! mutation. Prior/new values are raw JSON: public ids, never surrogate row
//! keys, and never double-encoded strings.

use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use serde_json::Value;

/// Operation recorded for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// Entity came into existence; no prior value.
    Create,
    /// Field changed; prior and new both captured.
    Update,
    /// Entity removed; no new value.
    Delete,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Create => "CREATE",
            ChangeOp::Update => "UPDATE",
            ChangeOp::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for ChangeOp {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(ChangeOp::Create),
            "UPDATE" => Ok(ChangeOp::Update),
            "DELETE" => Ok(ChangeOp::Delete),
            _ => Err(format!("Invalid change op: {}", s)),
        }
    }
}

/// A single recorded change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Insertion-order sequence number.
    pub seq: i64,
    pub entity_kind: String,
    pub entity_id: String,
    /// Field name for UPDATEs; None for whole-entity CREATE/DELETE.
    pub field: Option<String>,
    pub op: ChangeOp,
    pub prior: Option<Value>,
    pub new: Option<Value>,
    /// ISO-8601 timestamp.
    pub timestamp: String,
}

/// Appends one change record. No-op when recording is disabled (bulk loads).
pub(crate) fn record(
    conn: &Connection,
    enabled: bool,
    kind: &str,
    entity_id: &str,
    field: Option<&str>,
    op: ChangeOp,
    prior: Option<Value>,
    new: Option<Value>,
) -> Result<()> {
    if !enabled {
        return Ok(());
    }
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    conn.execute(
        "INSERT INTO history (entity_kind, entity_id, field, op, prior, new, stamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            kind,
            entity_id,
            field,
            op.as_str(),
            prior.map(|v| v.to_string()),
            new.map(|v| v.to_string()),
            stamp,
        ],
    )?;
    Ok(())
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ChangeRecord> {
    let op_str: String = row.get(4)?;
    let op = op_str.parse::<ChangeOp>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
    })?;
    let prior: Option<String> = row.get(5)?;
    let new: Option<String> = row.get(6)?;
    let parse = |s: Option<String>, col: usize| -> rusqlite::Result<Option<Value>> {
        s.map(|s| {
            serde_json::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    col,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()
    };
    Ok(ChangeRecord {
        seq: row.get(0)?,
        entity_kind: row.get(1)?,
        entity_id: row.get(2)?,
        field: row.get(3)?,
        op,
        prior: parse(prior, 5)?,
        new: parse(new, 6)?,
        timestamp: row.get(7)?,
    })
}

const SELECT_COLUMNS: &str = "id, entity_kind, entity_id, field, op, prior, new, stamp";

/// All records for one entity, in insertion order.
pub(crate) fn for_entity(conn: &Connection, entity_id: &str) -> Result<Vec<ChangeRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM history WHERE entity_id = ?1 ORDER BY id"
    ))?;
    let iter = stmt.query_map(params![entity_id], row_to_record)?;
    iter.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Records stamped within `[from, to)`, in insertion order. Bounds are
/// ISO-8601 strings; RFC-3339 UTC stamps sort lexicographically.
pub(crate) fn in_range(conn: &Connection, from: &str, to: &str) -> Result<Vec<ChangeRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM history WHERE stamp >= ?1 AND stamp < ?2 ORDER BY id"
    ))?;
    let iter = stmt.query_map(params![from, to], row_to_record)?;
    iter.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// The most recent `limit` records, newest last.
pub(crate) fn recent(conn: &Connection, limit: u32) -> Result<Vec<ChangeRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM history ORDER BY id DESC LIMIT ?1"
    ))?;
    let iter = stmt.query_map(params![limit], row_to_record)?;
    let mut records = iter.collect::<rusqlite::Result<Vec<_>>>()?;
    records.reverse();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    fn test_conn() -> Connection {
        let conn = db::open_memory_store().unwrap();
        db::initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn records_round_trip_raw_json() {
        let conn = test_conn();
        record(
            &conn,
            true,
            "synset",
            "test-en-1-n",
            Some("part_of_speech"),
            ChangeOp::Update,
            Some(json!("n")),
            Some(json!("v")),
        )
        .unwrap();

        let records = for_entity(&conn, "test-en-1-n").unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.op, ChangeOp::Update);
        assert_eq!(rec.field.as_deref(), Some("part_of_speech"));
        // Raw JSON strings, not JSON-of-JSON.
        assert_eq!(rec.prior, Some(json!("n")));
        assert_eq!(rec.new, Some(json!("v")));
        assert!(!rec.timestamp.is_empty());
    }

    #[test]
    fn create_has_no_prior_and_delete_has_no_new() {
        let conn = test_conn();
        record(
            &conn,
            true,
            "entry",
            "test-en-cat-n",
            None,
            ChangeOp::Create,
            None,
            Some(json!({"lemma": "cat"})),
        )
        .unwrap();
        record(
            &conn,
            true,
            "entry",
            "test-en-cat-n",
            None,
            ChangeOp::Delete,
            Some(json!({"lemma": "cat"})),
            None,
        )
        .unwrap();

        let records = for_entity(&conn, "test-en-cat-n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].op, ChangeOp::Create);
        assert!(records[0].prior.is_none());
        assert_eq!(records[1].op, ChangeOp::Delete);
        assert!(records[1].new.is_none());
    }

    #[test]
    fn disabled_recording_writes_nothing() {
        let conn = test_conn();
        record(
            &conn,
            false,
            "synset",
            "test-en-1-n",
            None,
            ChangeOp::Create,
            None,
            Some(json!({})),
        )
        .unwrap();
        assert!(recent(&conn, 10).unwrap().is_empty());
    }

    #[test]
    fn recent_returns_newest_last() {
        let conn = test_conn();
        for i in 0..5 {
            record(
                &conn,
                true,
                "synset",
                &format!("test-en-{}-n", i),
                None,
                ChangeOp::Create,
                None,
                Some(json!(i)),
            )
            .unwrap();
        }
        let records = recent(&conn, 3).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].entity_id, "test-en-2-n");
        assert_eq!(records[2].entity_id, "test-en-4-n");
    }
}
