//! SQLite schema and low-level store plumbing.
//!
//! ## Schema
//!
//! One table per entity kind plus child tables for definitions, examples,
//! relations, forms, pronunciations, tags, counts, proposed ILIs, syntactic
//! behaviours and history. Every entity table carries an internal surrogate
//! row key (`id INTEGER PRIMARY KEY`) plus a `(public_id, lexicon)`
//! uniqueness constraint; foreign keys always reference surrogates so that
//! the same public id in two lexicons never aliases.
//!
//! A `meta` key/value table holds the schema version; opening a store file
//! written by a different schema version fails with a database error.

use crate::error::{EditorError, Result};
use crate::models::Metadata;
use log::{debug, info};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::fs;
use std::path::Path;

pub(crate) const SCHEMA_VERSION: u32 = 1;

const CREATE_META_TABLE: &str = "
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

const CREATE_LEXICONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS lexicons (
    id INTEGER PRIMARY KEY,
    public_id TEXT NOT NULL UNIQUE, -- multi-version coexistence is disallowed
    label TEXT NOT NULL,
    language TEXT NOT NULL,
    email TEXT NOT NULL,
    license TEXT NOT NULL,
    version TEXT NOT NULL,
    url TEXT,
    citation TEXT,
    logo TEXT,
    metadata TEXT
);";

const CREATE_LEXICON_DEPENDENCIES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS lexicon_dependencies (
    id INTEGER PRIMARY KEY,
    lexicon INTEGER NOT NULL REFERENCES lexicons(id),
    depends_id TEXT NOT NULL,
    depends_version TEXT NOT NULL,
    url TEXT
);";

const CREATE_ILIS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS ilis (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    definition TEXT
);";

const CREATE_SYNSETS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS synsets (
    id INTEGER PRIMARY KEY,
    public_id TEXT NOT NULL,
    lexicon INTEGER NOT NULL REFERENCES lexicons(id),
    ili TEXT, -- concrete identifier, or 'in' for a proposed concept
    part_of_speech TEXT NOT NULL,
    lexicalized INTEGER NOT NULL DEFAULT 1,
    lexfile TEXT,
    metadata TEXT,
    UNIQUE (public_id, lexicon)
);";

const CREATE_ENTRIES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY,
    public_id TEXT NOT NULL,
    lexicon INTEGER NOT NULL REFERENCES lexicons(id),
    part_of_speech TEXT NOT NULL,
    index_form TEXT,
    lemma_lower TEXT NOT NULL, -- denormalized rank-0 written form, lowercased
    metadata TEXT,
    UNIQUE (public_id, lexicon)
);";

const CREATE_FORMS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS forms (
    id INTEGER PRIMARY KEY,
    public_id TEXT,
    entry INTEGER NOT NULL REFERENCES entries(id),
    written_form TEXT NOT NULL,
    script TEXT,
    rank INTEGER NOT NULL, -- 0 is the lemma
    UNIQUE (entry, rank)
);";

const CREATE_PRONUNCIATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS pronunciations (
    id INTEGER PRIMARY KEY,
    form INTEGER NOT NULL REFERENCES forms(id),
    text TEXT NOT NULL,
    variety TEXT,
    notation TEXT,
    phonemic INTEGER NOT NULL DEFAULT 1,
    audio TEXT
);";

const CREATE_TAGS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    form INTEGER NOT NULL REFERENCES forms(id),
    category TEXT NOT NULL,
    text TEXT NOT NULL
);";

const CREATE_SENSES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS senses (
    id INTEGER PRIMARY KEY,
    public_id TEXT NOT NULL,
    lexicon INTEGER NOT NULL REFERENCES lexicons(id),
    entry INTEGER NOT NULL REFERENCES entries(id),
    synset INTEGER NOT NULL REFERENCES synsets(id),
    entry_rank INTEGER NOT NULL,  -- 1-based position within the entry
    synset_rank INTEGER NOT NULL, -- 1-based position within synset members
    lexicalized INTEGER NOT NULL DEFAULT 1,
    adjposition TEXT,
    metadata TEXT,
    UNIQUE (public_id, lexicon)
);";

const CREATE_DEFINITIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS definitions (
    id INTEGER PRIMARY KEY,
    synset INTEGER NOT NULL REFERENCES synsets(id),
    text TEXT NOT NULL,
    language TEXT,
    source_sense INTEGER REFERENCES senses(id),
    metadata TEXT
);";

const CREATE_SYNSET_EXAMPLES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS synset_examples (
    id INTEGER PRIMARY KEY,
    synset INTEGER NOT NULL REFERENCES synsets(id),
    text TEXT NOT NULL,
    language TEXT,
    metadata TEXT
);";

const CREATE_SENSE_EXAMPLES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS sense_examples (
    id INTEGER PRIMARY KEY,
    sense INTEGER NOT NULL REFERENCES senses(id),
    text TEXT NOT NULL,
    language TEXT,
    metadata TEXT
);";

const CREATE_COUNTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS counts (
    id INTEGER PRIMARY KEY,
    sense INTEGER NOT NULL REFERENCES senses(id),
    value INTEGER NOT NULL,
    metadata TEXT
);";

const CREATE_PROPOSED_ILIS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS proposed_ilis (
    synset INTEGER PRIMARY KEY REFERENCES synsets(id),
    definition TEXT NOT NULL,
    metadata TEXT
);";

const CREATE_SYNSET_RELATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS synset_relations (
    id INTEGER PRIMARY KEY,
    source INTEGER NOT NULL REFERENCES synsets(id),
    target INTEGER NOT NULL REFERENCES synsets(id),
    rel_type TEXT NOT NULL,
    metadata TEXT,
    UNIQUE (source, rel_type, target)
);";

const CREATE_SENSE_RELATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS sense_relations (
    id INTEGER PRIMARY KEY,
    source INTEGER NOT NULL REFERENCES senses(id),
    target INTEGER NOT NULL REFERENCES senses(id),
    rel_type TEXT NOT NULL,
    metadata TEXT,
    UNIQUE (source, rel_type, target)
);";

const CREATE_SENSE_SYNSET_RELATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS sense_synset_relations (
    id INTEGER PRIMARY KEY,
    source INTEGER NOT NULL REFERENCES senses(id),
    target INTEGER NOT NULL REFERENCES synsets(id),
    rel_type TEXT NOT NULL,
    metadata TEXT,
    UNIQUE (source, rel_type, target)
);";

const CREATE_SYNTACTIC_BEHAVIOURS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS syntactic_behaviours (
    id INTEGER PRIMARY KEY,
    public_id TEXT,
    lexicon INTEGER NOT NULL REFERENCES lexicons(id),
    frame TEXT NOT NULL
);";

const CREATE_SENSE_BEHAVIOURS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS sense_behaviours (
    sense INTEGER NOT NULL REFERENCES senses(id),
    behaviour INTEGER NOT NULL REFERENCES syntactic_behaviours(id),
    PRIMARY KEY (sense, behaviour)
);";

const CREATE_HISTORY_TABLE: &str = "
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY,
    entity_kind TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    field TEXT,
    op TEXT NOT NULL, -- CREATE | UPDATE | DELETE
    prior TEXT,       -- raw JSON, never double-encoded
    new TEXT,         -- raw JSON, never double-encoded
    stamp TEXT NOT NULL
);";

macro_rules! create_index {
    ($name:ident, $index_name:expr, $table:expr, $columns:expr) => {
        const $name: &str = concat!(
            "CREATE INDEX IF NOT EXISTS ",
            $index_name,
            " ON ",
            $table,
            " (",
            $columns,
            ");"
        );
    };
}

create_index!(IDX_SYNSET_LEXICON, "idx_synset_lexicon", "synsets", "lexicon");
create_index!(IDX_ENTRY_LEXICON, "idx_entry_lexicon", "entries", "lexicon");
create_index!(IDX_ENTRY_LEMMA, "idx_entry_lemma", "entries", "lemma_lower");
create_index!(IDX_FORM_ENTRY, "idx_form_entry", "forms", "entry");
create_index!(IDX_SENSE_ENTRY, "idx_sense_entry", "senses", "entry");
create_index!(IDX_SENSE_SYNSET, "idx_sense_synset", "senses", "synset");
create_index!(IDX_DEFINITION_SYNSET, "idx_definition_synset", "definitions", "synset");
create_index!(IDX_SYNSET_EXAMPLE_SYNSET, "idx_synset_example_synset", "synset_examples", "synset");
create_index!(IDX_SENSE_EXAMPLE_SENSE, "idx_sense_example_sense", "sense_examples", "sense");
create_index!(IDX_SYNSET_REL_SOURCE, "idx_synset_rel_source", "synset_relations", "source, rel_type");
create_index!(IDX_SYNSET_REL_TARGET, "idx_synset_rel_target", "synset_relations", "target");
create_index!(IDX_SENSE_REL_SOURCE, "idx_sense_rel_source", "sense_relations", "source, rel_type");
create_index!(IDX_SENSE_REL_TARGET, "idx_sense_rel_target", "sense_relations", "target");
create_index!(IDX_SENSE_SYNSET_REL_SOURCE, "idx_sense_synset_rel_source", "sense_synset_relations", "source");
create_index!(IDX_SENSE_SYNSET_REL_TARGET, "idx_sense_synset_rel_target", "sense_synset_relations", "target");
create_index!(IDX_HISTORY_ENTITY, "idx_history_entity", "history", "entity_id");
create_index!(IDX_HISTORY_STAMP, "idx_history_stamp", "history", "stamp");

const TABLES: &[&str] = &[
    CREATE_META_TABLE,
    CREATE_LEXICONS_TABLE,
    CREATE_LEXICON_DEPENDENCIES_TABLE,
    CREATE_ILIS_TABLE,
    CREATE_SYNSETS_TABLE,
    CREATE_ENTRIES_TABLE,
    CREATE_FORMS_TABLE,
    CREATE_PRONUNCIATIONS_TABLE,
    CREATE_TAGS_TABLE,
    CREATE_SENSES_TABLE,
    CREATE_DEFINITIONS_TABLE,
    CREATE_SYNSET_EXAMPLES_TABLE,
    CREATE_SENSE_EXAMPLES_TABLE,
    CREATE_COUNTS_TABLE,
    CREATE_PROPOSED_ILIS_TABLE,
    CREATE_SYNSET_RELATIONS_TABLE,
    CREATE_SENSE_RELATIONS_TABLE,
    CREATE_SENSE_SYNSET_RELATIONS_TABLE,
    CREATE_SYNTACTIC_BEHAVIOURS_TABLE,
    CREATE_SENSE_BEHAVIOURS_TABLE,
    CREATE_HISTORY_TABLE,
];

const INDICES: &[&str] = &[
    IDX_SYNSET_LEXICON,
    IDX_ENTRY_LEXICON,
    IDX_ENTRY_LEMMA,
    IDX_FORM_ENTRY,
    IDX_SENSE_ENTRY,
    IDX_SENSE_SYNSET,
    IDX_DEFINITION_SYNSET,
    IDX_SYNSET_EXAMPLE_SYNSET,
    IDX_SENSE_EXAMPLE_SENSE,
    IDX_SYNSET_REL_SOURCE,
    IDX_SYNSET_REL_TARGET,
    IDX_SENSE_REL_SOURCE,
    IDX_SENSE_REL_TARGET,
    IDX_SENSE_SYNSET_REL_SOURCE,
    IDX_SENSE_SYNSET_REL_TARGET,
    IDX_HISTORY_ENTITY,
    IDX_HISTORY_STAMP,
];

/// Opens (or creates) a store file and applies the connection pragmas.
///
/// WAL keeps readers in other processes unblocked while the single writer
/// holds its transaction; the second writer blocks at the storage layer.
pub(crate) fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

/// Opens a fresh in-memory store.
pub(crate) fn open_memory_store() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "cache_size", "-64000")?;
    Ok(())
}

/// Creates all tables and indices if absent and checks the schema version.
///
/// A fresh store gets the current version stamped into `meta`; an existing
/// store with any other version is refused.
pub(crate) fn initialize(conn: &Connection) -> Result<()> {
    info!("Initializing store schema (version {})...", SCHEMA_VERSION);
    conn.execute_batch("BEGIN")?;
    let init = (|| -> Result<()> {
        for ddl in TABLES {
            conn.execute(ddl, [])?;
        }
        for ddl in INDICES {
            conn.execute(ddl, [])?;
        }

        let existing: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| {
                row.get(0)
            })
            .optional()?;

        match existing {
            Some(v_str) => {
                let existing_version: u32 = v_str.parse().map_err(|e| {
                    EditorError::Db(format!("unreadable schema version '{}': {}", v_str, e))
                })?;
                if existing_version != SCHEMA_VERSION {
                    return Err(EditorError::Db(format!(
                        "store schema version {} does not match supported version {}",
                        existing_version, SCHEMA_VERSION
                    )));
                }
                debug!("Store schema version {} matches.", existing_version);
            }
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                    params![SCHEMA_VERSION.to_string()],
                )?;
                info!("Stamped initial schema version.");
            }
        }
        Ok(())
    })();

    match init {
        Ok(()) => {
            conn.execute_batch("COMMIT")?;
            info!("Store schema initialization complete.");
            Ok(())
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

/// Encodes a metadata mapping to its single-column JSON form.
pub(crate) fn encode_metadata(meta: Option<&Metadata>) -> Result<Option<String>> {
    match meta {
        Some(m) => Ok(Some(serde_json::to_string(m)?)),
        None => Ok(None),
    }
}

/// Decodes a metadata column read from the store.
///
/// Decoding at read is the contract: rows hand back the raw TEXT column and
/// every consumer goes through here. No automatic column-type magic.
pub(crate) fn decode_metadata(raw: Option<String>) -> Result<Option<Metadata>> {
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn initialize_is_idempotent() {
        let conn = open_memory_store().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'synsets'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn unknown_schema_version_is_refused() {
        let conn = open_memory_store().unwrap();
        initialize(&conn).unwrap();
        conn.execute("UPDATE meta SET value = '99' WHERE key = 'schema_version'", [])
            .unwrap();
        let err = initialize(&conn).unwrap_err();
        assert!(matches!(err, EditorError::Db(_)), "got {:?}", err);
    }

    #[test]
    fn store_file_round_trips_schema_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let conn = open_store(&path).unwrap();
            initialize(&conn).unwrap();
        }
        let conn = open_store(&path).unwrap();
        initialize(&conn).unwrap();
        let version: String = conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());
    }

    #[test]
    fn metadata_codec_round_trips() {
        let mut meta = Metadata::new();
        meta.insert("dc:source".into(), serde_json::json!("PWN 3.1"));
        meta.insert("confidenceScore".into(), serde_json::json!(0.8));
        let encoded = encode_metadata(Some(&meta)).unwrap().unwrap();
        let decoded = decode_metadata(Some(encoded)).unwrap().unwrap();
        assert_eq!(decoded, meta);
        assert!(decode_metadata(None).unwrap().is_none());
        assert!(encode_metadata(None).unwrap().is_none());
    }
}
