//! The transactional mutation engine.
//!
//! [`Editor`] owns the store connection. Every public mutation verifies
//! referential existence and domain constraints, runs inside a single
//! transaction, writes its history records and returns the post-state
//! record. `&mut self` on every mutation encodes the single-writer model;
//! readers in other processes are handled by SQLite's file locking.

use crate::db;
use crate::error::{EditorError, Result, is_unique_violation};
use crate::history::{self, ChangeOp, ChangeRecord};
use crate::models::{
    AdjPosition, Count, Definition, Entry, Example, Form, IliRef, IliStatus, Lexicon,
    LexiconDependency, Metadata, PROPOSED_ILI_MIN_DEFINITION, PartOfSpeech, Pronunciation,
    ProposedIli, Relation, Sense, Synset, SyntacticBehaviour, Tag,
};
use crate::relations::{SenseRelType, SenseSynsetRelType, SynsetRelType};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Value, json};
use std::path::Path;

/// Entity-kind tokens used in errors and history records.
pub(crate) mod kind {
    pub const LEXICON: &str = "lexicon";
    pub const ENTRY: &str = "entry";
    pub const FORM: &str = "form";
    pub const SENSE: &str = "sense";
    pub const SYNSET: &str = "synset";
    pub const DEFINITION: &str = "definition";
    pub const EXAMPLE: &str = "example";
    pub const COUNT: &str = "count";
    pub const ILI: &str = "ili";
    pub const BEHAVIOUR: &str = "syntactic_behaviour";
    pub const SYNSET_RELATION: &str = "synset_relation";
    pub const SENSE_RELATION: &str = "sense_relation";
    pub const SENSE_SYNSET_RELATION: &str = "sense_synset_relation";
}

/// The three relation tables share one row shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelSpace {
    Synset,
    Sense,
    SenseSynset,
}

impl RelSpace {
    pub(crate) fn table(self) -> &'static str {
        match self {
            RelSpace::Synset => "synset_relations",
            RelSpace::Sense => "sense_relations",
            RelSpace::SenseSynset => "sense_synset_relations",
        }
    }

    fn history_kind(self) -> &'static str {
        match self {
            RelSpace::Synset => kind::SYNSET_RELATION,
            RelSpace::Sense => kind::SENSE_RELATION,
            RelSpace::SenseSynset => kind::SENSE_SYNSET_RELATION,
        }
    }
}

/// Field updates for a lexicon; `None` leaves the field untouched.
#[derive(Debug, Default, Clone)]
pub struct LexiconUpdate {
    pub label: Option<String>,
    pub language: Option<String>,
    pub email: Option<String>,
    pub license: Option<String>,
    pub version: Option<String>,
    pub url: Option<String>,
    pub citation: Option<String>,
    pub logo: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Field updates for a synset.
#[derive(Debug, Default, Clone)]
pub struct SynsetUpdate {
    pub part_of_speech: Option<PartOfSpeech>,
    pub lexfile: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Field updates for an entry.
#[derive(Debug, Default, Clone)]
pub struct EntryUpdate {
    pub index: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Field updates for a sense.
#[derive(Debug, Default, Clone)]
pub struct SenseUpdate {
    pub adjposition: Option<AdjPosition>,
    pub lexicalized: Option<bool>,
    pub metadata: Option<Metadata>,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn parse_pos(s: &str) -> Result<PartOfSpeech> {
    s.parse::<PartOfSpeech>()
        .map_err(|e| EditorError::Db(format!("invalid part of speech in store: {}", e)))
}

/// Reduces a lemma to an id stem: lowercased, whitespace to underscores,
/// anything that is not a letter, digit or underscore dropped. Unicode
/// letters survive.
fn lemma_stem(lemma: &str) -> String {
    let stem: String = lemma
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if stem.is_empty() { "w".to_string() } else { stem }
}

/// The editing engine over one store.
pub struct Editor {
    conn: Connection,
    tx_depth: u32,
    history_enabled: bool,
}

impl Editor {
    /// Opens (or creates) a store file and initializes the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Editor> {
        let conn = db::open_store(path.as_ref())?;
        db::initialize(&conn)?;
        Ok(Editor {
            conn,
            tx_depth: 0,
            history_enabled: true,
        })
    }

    /// Opens a fresh in-memory store.
    pub fn open_in_memory() -> Result<Editor> {
        let conn = db::open_memory_store()?;
        db::initialize(&conn)?;
        Ok(Editor {
            conn,
            tx_depth: 0,
            history_enabled: true,
        })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Toggles history recording and returns the previous setting. Bulk
    /// loads suppress the write-amplifying log through this.
    pub fn set_history_recording(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.history_enabled, enabled)
    }

    /// Runs `f` inside one outer transaction. Nested calls join the
    /// enclosing transaction; only the outermost frame commits, and an
    /// error anywhere rolls the whole batch back.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Editor) -> Result<T>) -> Result<T> {
        self.with_tx(f)
    }

    pub(crate) fn with_tx<T>(&mut self, f: impl FnOnce(&mut Editor) -> Result<T>) -> Result<T> {
        if self.tx_depth > 0 {
            self.tx_depth += 1;
            let out = f(self);
            self.tx_depth -= 1;
            return out;
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.tx_depth = 1;
        let out = f(self);
        self.tx_depth = 0;
        match out {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(err)
            }
        }
    }

    pub(crate) fn record(
        &self,
        kind: &str,
        entity_id: &str,
        field: Option<&str>,
        op: ChangeOp,
        prior: Option<Value>,
        new: Option<Value>,
    ) -> Result<()> {
        history::record(
            &self.conn,
            self.history_enabled,
            kind,
            entity_id,
            field,
            op,
            prior,
            new,
        )
    }

    // --- History queries ---

    /// All change records for one entity, oldest first.
    pub fn history_for(&self, entity_id: &str) -> Result<Vec<ChangeRecord>> {
        history::for_entity(&self.conn, entity_id)
    }

    /// Change records stamped within `[from, to)` (ISO-8601 bounds).
    pub fn history_range(&self, from: &str, to: &str) -> Result<Vec<ChangeRecord>> {
        history::in_range(&self.conn, from, to)
    }

    /// The most recent `limit` change records, oldest first.
    pub fn history_recent(&self, limit: u32) -> Result<Vec<ChangeRecord>> {
        history::recent(&self.conn, limit)
    }

    // --- Resolvers ---

    /// Resolves a lexicon by `id:version` specifier or bare id; the
    /// specifier form wins when both parse.
    pub(crate) fn lexicon_key(&self, spec: &str) -> Result<i64> {
        if let Some((id, version)) = spec.split_once(':') {
            let key: Option<i64> = self
                .conn
                .query_row(
                    "SELECT id FROM lexicons WHERE public_id = ?1 AND version = ?2",
                    params![id, version],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(key) = key {
                return Ok(key);
            }
        }
        self.conn
            .query_row(
                "SELECT id FROM lexicons WHERE public_id = ?1",
                params![spec],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| EditorError::not_found(kind::LEXICON, spec))
    }

    pub(crate) fn lexicon_public_id(&self, key: i64) -> Result<String> {
        self.conn
            .query_row(
                "SELECT public_id FROM lexicons WHERE id = ?1",
                params![key],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    fn resolve_public(&self, table: &str, kind: &'static str, id: &str) -> Result<i64> {
        let sql = format!("SELECT id FROM {} WHERE public_id = ?1", table);
        let mut stmt = self.conn.prepare(&sql)?;
        let keys: Vec<i64> = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        match keys.as_slice() {
            [] => Err(EditorError::not_found(kind, id)),
            [key] => Ok(*key),
            _ => Err(EditorError::duplicate(
                kind,
                format!("{} (ambiguous across lexicons)", id),
            )),
        }
    }

    pub(crate) fn synset_key(&self, id: &str) -> Result<i64> {
        self.resolve_public("synsets", kind::SYNSET, id)
    }

    pub(crate) fn entry_key(&self, id: &str) -> Result<i64> {
        self.resolve_public("entries", kind::ENTRY, id)
    }

    pub(crate) fn sense_key(&self, id: &str) -> Result<i64> {
        self.resolve_public("senses", kind::SENSE, id)
    }

    pub(crate) fn owning_lexicon(&self, table: &str, key: i64) -> Result<i64> {
        let sql = format!("SELECT lexicon FROM {} WHERE id = ?1", table);
        self.conn
            .query_row(&sql, params![key], |row| row.get(0))
            .map_err(Into::into)
    }

    /// True when `id` already names an entry, sense, synset, form or
    /// syntactic behaviour in the lexicon.
    pub(crate) fn id_in_use(&self, lexicon: i64, id: &str) -> Result<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM entries WHERE lexicon = ?1 AND public_id = ?2)
                  + (SELECT COUNT(*) FROM senses WHERE lexicon = ?1 AND public_id = ?2)
                  + (SELECT COUNT(*) FROM synsets WHERE lexicon = ?1 AND public_id = ?2)
                  + (SELECT COUNT(*) FROM forms f JOIN entries e ON e.id = f.entry
                     WHERE e.lexicon = ?1 AND f.public_id = ?2)
                  + (SELECT COUNT(*) FROM syntactic_behaviours WHERE lexicon = ?1 AND public_id = ?2)",
            params![lexicon, id],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    fn check_prefix(kind: &'static str, lexicon_id: &str, id: &str) -> Result<()> {
        let prefix = format!("{}-", lexicon_id);
        if id.starts_with(&prefix) && id.len() > prefix.len() {
            Ok(())
        } else {
            Err(EditorError::validation(
                kind,
                id,
                format!("id must start with '{}'", prefix),
            ))
        }
    }

    // --- ID generation ---

    /// Next synset id in the lexicon namespace: `{lexicon}-{NNNNNNNN}-{pos}`
    /// with a monotone MAX+1 numeric component.
    pub(crate) fn next_synset_id(&self, lexicon: i64, lexicon_id: &str, pos: PartOfSpeech) -> Result<String> {
        let mut stmt = self
            .conn
            .prepare("SELECT public_id FROM synsets WHERE lexicon = ?1")?;
        let ids: Vec<String> = stmt
            .query_map(params![lexicon], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        let prefix = format!("{}-", lexicon_id);
        let mut max = 0u64;
        for id in &ids {
            if let Some(rest) = id.strip_prefix(&prefix) {
                for part in rest.split('-') {
                    if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
                        if let Ok(n) = part.parse::<u64>() {
                            max = max.max(n);
                        }
                        break;
                    }
                }
            }
        }
        Ok(format!("{}-{:08}-{}", lexicon_id, max + 1, pos.as_str()))
    }

    /// Next entry id: lemma stem, lowest free numeric suffix >= 2 filling
    /// gaps left by deletions.
    fn next_entry_id(
        &self,
        lexicon: i64,
        lexicon_id: &str,
        lemma: &str,
        pos: PartOfSpeech,
    ) -> Result<String> {
        let base = format!("{}-{}-{}", lexicon_id, lemma_stem(lemma), pos.as_str());
        if !self.id_in_use(lexicon, &base)? {
            return Ok(base);
        }
        let mut n = 2u32;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.id_in_use(lexicon, &candidate)? {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    // --- Lexicon CRUD ---

    pub fn create_lexicon(
        &mut self,
        id: &str,
        label: &str,
        language: &str,
        email: &str,
        license: &str,
        version: &str,
    ) -> Result<Lexicon> {
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lexicons WHERE public_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if exists > 0 {
            // Multi-version coexistence is disallowed: one lexicon per id.
            return Err(EditorError::duplicate(kind::LEXICON, id));
        }
        self.with_tx(|ed| {
            ed.conn.execute(
                "INSERT INTO lexicons (public_id, label, language, email, license, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, label, language, email, license, version],
            )?;
            let key = ed.conn.last_insert_rowid();
            let record = ed.fetch_lexicon(key)?;
            ed.record(
                kind::LEXICON,
                id,
                None,
                ChangeOp::Create,
                None,
                Some(to_json(&record)?),
            )?;
            info!("Created lexicon {}", record.specifier());
            Ok(record)
        })
    }

    pub fn get_lexicon(&self, spec: &str) -> Result<Lexicon> {
        let key = self.lexicon_key(spec)?;
        self.fetch_lexicon(key)
    }

    pub fn lexicons(&self) -> Result<Vec<Lexicon>> {
        let mut stmt = self.conn.prepare("SELECT id FROM lexicons ORDER BY id")?;
        let keys: Vec<i64> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        keys.into_iter().map(|k| self.fetch_lexicon(k)).collect()
    }

    pub fn update_lexicon(&mut self, spec: &str, update: LexiconUpdate) -> Result<Lexicon> {
        let key = self.lexicon_key(spec)?;
        self.with_tx(|ed| {
            let before = ed.fetch_lexicon(key)?;
            let id = before.id.clone();
            let mut apply = |column: &str, value: &str, prior: Value| -> Result<()> {
                ed.conn.execute(
                    &format!("UPDATE lexicons SET {} = ?1 WHERE id = ?2", column),
                    params![value, key],
                )?;
                ed.record(
                    kind::LEXICON,
                    &id,
                    Some(column),
                    ChangeOp::Update,
                    Some(prior),
                    Some(json!(value)),
                )?;
                Ok(())
            };
            if let Some(v) = &update.label {
                apply("label", v, json!(before.label))?;
            }
            if let Some(v) = &update.language {
                apply("language", v, json!(before.language))?;
            }
            if let Some(v) = &update.email {
                apply("email", v, json!(before.email))?;
            }
            if let Some(v) = &update.license {
                apply("license", v, json!(before.license))?;
            }
            if let Some(v) = &update.version {
                apply("version", v, json!(before.version))?;
            }
            if let Some(v) = &update.url {
                apply("url", v, json!(before.url))?;
            }
            if let Some(v) = &update.citation {
                apply("citation", v, json!(before.citation))?;
            }
            if let Some(v) = &update.logo {
                apply("logo", v, json!(before.logo))?;
            }
            if let Some(meta) = &update.metadata {
                ed.conn.execute(
                    "UPDATE lexicons SET metadata = ?1 WHERE id = ?2",
                    params![db::encode_metadata(Some(meta))?, key],
                )?;
                ed.record(
                    kind::LEXICON,
                    &before.id,
                    Some("metadata"),
                    ChangeOp::Update,
                    Some(to_json(&before.metadata)?),
                    Some(to_json(meta)?),
                )?;
            }
            ed.fetch_lexicon(key)
        })
    }

    pub fn delete_lexicon(&mut self, spec: &str, cascade: bool) -> Result<()> {
        let key = self.lexicon_key(spec)?;
        self.with_tx(|ed| {
            let record = ed.fetch_lexicon(key)?;
            let entries: Vec<i64> = ed.child_keys("entries", "lexicon", key)?;
            let synsets: Vec<i64> = ed.child_keys("synsets", "lexicon", key)?;
            if !cascade && (!entries.is_empty() || !synsets.is_empty()) {
                return Err(EditorError::relation(
                    kind::LEXICON,
                    spec,
                    format!(
                        "lexicon still owns {} entr(ies) and {} synset(s)",
                        entries.len(),
                        synsets.len()
                    ),
                ));
            }
            for entry in entries {
                ed.delete_entry_rows(entry)?;
            }
            for synset in synsets {
                ed.delete_synset_rows(synset)?;
            }
            ed.conn.execute(
                "DELETE FROM syntactic_behaviours WHERE lexicon = ?1",
                params![key],
            )?;
            ed.conn.execute(
                "DELETE FROM lexicon_dependencies WHERE lexicon = ?1",
                params![key],
            )?;
            ed.record(
                kind::LEXICON,
                &record.id,
                None,
                ChangeOp::Delete,
                Some(to_json(&record)?),
                None,
            )?;
            ed.conn
                .execute("DELETE FROM lexicons WHERE id = ?1", params![key])?;
            info!("Deleted lexicon {}", record.specifier());
            Ok(())
        })
    }

    pub fn add_lexicon_dependency(
        &mut self,
        lexicon: &str,
        depends_id: &str,
        depends_version: &str,
        url: Option<&str>,
    ) -> Result<()> {
        let key = self.lexicon_key(lexicon)?;
        self.with_tx(|ed| {
            ed.conn.execute(
                "INSERT INTO lexicon_dependencies (lexicon, depends_id, depends_version, url)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key, depends_id, depends_version, url],
            )?;
            ed.record(
                kind::LEXICON,
                lexicon,
                Some("requires"),
                ChangeOp::Update,
                None,
                Some(json!({ "id": depends_id, "version": depends_version })),
            )?;
            Ok(())
        })
    }

    pub fn lexicon_dependencies(&self, lexicon: &str) -> Result<Vec<LexiconDependency>> {
        let key = self.lexicon_key(lexicon)?;
        let mut stmt = self.conn.prepare(
            "SELECT depends_id, depends_version, url FROM lexicon_dependencies
             WHERE lexicon = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![key], |row| {
                Ok(LexiconDependency {
                    id: row.get(0)?,
                    version: row.get(1)?,
                    url: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // --- Synset CRUD ---

    pub fn create_synset(
        &mut self,
        lexicon: &str,
        pos: PartOfSpeech,
        id: Option<&str>,
    ) -> Result<Synset> {
        let lkey = self.lexicon_key(lexicon)?;
        let lexicon_id = self.lexicon_public_id(lkey)?;
        self.with_tx(|ed| {
            let synset_id = match id {
                Some(explicit) => {
                    Self::check_prefix(kind::SYNSET, &lexicon_id, explicit)?;
                    if ed.id_in_use(lkey, explicit)? {
                        return Err(EditorError::duplicate(kind::SYNSET, explicit));
                    }
                    explicit.to_string()
                }
                None => ed.next_synset_id(lkey, &lexicon_id, pos)?,
            };
            // A synset with no senses is born unlexicalized.
            ed.conn.execute(
                "INSERT INTO synsets (public_id, lexicon, part_of_speech, lexicalized)
                 VALUES (?1, ?2, ?3, 0)",
                params![synset_id, lkey, pos.as_str()],
            )?;
            let key = ed.conn.last_insert_rowid();
            let record = ed.fetch_synset(key)?;
            ed.record(
                kind::SYNSET,
                &synset_id,
                None,
                ChangeOp::Create,
                None,
                Some(to_json(&record)?),
            )?;
            debug!("Created synset {}", synset_id);
            Ok(record)
        })
    }

    pub fn get_synset(&self, id: &str) -> Result<Synset> {
        let key = self.synset_key(id)?;
        self.fetch_synset(key)
    }

    /// All synsets of a lexicon, in insertion order.
    pub fn synsets(&self, lexicon: &str) -> Result<Vec<Synset>> {
        let key = self.lexicon_key(lexicon)?;
        let keys = self.child_keys("synsets", "lexicon", key)?;
        keys.into_iter().map(|k| self.fetch_synset(k)).collect()
    }

    pub fn update_synset(&mut self, id: &str, update: SynsetUpdate) -> Result<Synset> {
        let key = self.synset_key(id)?;
        self.with_tx(|ed| {
            let before = ed.fetch_synset(key)?;
            if let Some(pos) = update.part_of_speech {
                ed.conn.execute(
                    "UPDATE synsets SET part_of_speech = ?1 WHERE id = ?2",
                    params![pos.as_str(), key],
                )?;
                ed.record(
                    kind::SYNSET,
                    id,
                    Some("part_of_speech"),
                    ChangeOp::Update,
                    Some(json!(before.part_of_speech.as_str())),
                    Some(json!(pos.as_str())),
                )?;
            }
            if let Some(lexfile) = &update.lexfile {
                ed.conn.execute(
                    "UPDATE synsets SET lexfile = ?1 WHERE id = ?2",
                    params![lexfile, key],
                )?;
                ed.record(
                    kind::SYNSET,
                    id,
                    Some("lexfile"),
                    ChangeOp::Update,
                    Some(json!(before.lexfile)),
                    Some(json!(lexfile)),
                )?;
            }
            if let Some(meta) = &update.metadata {
                ed.conn.execute(
                    "UPDATE synsets SET metadata = ?1 WHERE id = ?2",
                    params![db::encode_metadata(Some(meta))?, key],
                )?;
                ed.record(
                    kind::SYNSET,
                    id,
                    Some("metadata"),
                    ChangeOp::Update,
                    Some(to_json(&before.metadata)?),
                    Some(to_json(meta)?),
                )?;
            }
            ed.fetch_synset(key)
        })
    }

    /// Sets or clears a concrete ILI reference. Use [`Editor::propose_ili`]
    /// for the `"in"` sentinel.
    pub fn set_ili(&mut self, synset: &str, ili: Option<&str>) -> Result<Synset> {
        let key = self.synset_key(synset)?;
        self.with_tx(|ed| {
            let before = ed.fetch_synset(key)?;
            match ili {
                Some("in") => {
                    return Err(EditorError::validation(
                        kind::SYNSET,
                        synset,
                        "use propose_ili to mark a pending ILI",
                    ));
                }
                Some(ili_id) => {
                    if before.proposed_ili.is_some() {
                        return Err(EditorError::validation(
                            kind::SYNSET,
                            synset,
                            "a concrete ILI reference forbids a proposed definition; retract it first",
                        ));
                    }
                    ed.ensure_ili_row(ili_id)?;
                    ed.conn.execute(
                        "UPDATE synsets SET ili = ?1 WHERE id = ?2",
                        params![ili_id, key],
                    )?;
                }
                None => {
                    ed.conn.execute(
                        "UPDATE synsets SET ili = NULL WHERE id = ?1",
                        params![key],
                    )?;
                    ed.conn.execute(
                        "DELETE FROM proposed_ilis WHERE synset = ?1",
                        params![key],
                    )?;
                }
            }
            ed.record(
                kind::SYNSET,
                synset,
                Some("ili"),
                ChangeOp::Update,
                Some(to_json(&before.ili)?),
                Some(json!(ili)),
            )?;
            ed.fetch_synset(key)
        })
    }

    /// Marks the synset's concept as pending ILI assignment. The candidate
    /// definition must be at least 20 characters.
    pub fn propose_ili(&mut self, synset: &str, definition: &str) -> Result<Synset> {
        if definition.chars().count() < PROPOSED_ILI_MIN_DEFINITION {
            return Err(EditorError::validation(
                kind::ILI,
                synset,
                format!(
                    "proposed ILI definition must be at least {} characters",
                    PROPOSED_ILI_MIN_DEFINITION
                ),
            ));
        }
        let key = self.synset_key(synset)?;
        self.with_tx(|ed| {
            let before = ed.fetch_synset(key)?;
            if matches!(before.ili, Some(IliRef::Id(_))) {
                return Err(EditorError::validation(
                    kind::SYNSET,
                    synset,
                    "synset already carries a concrete ILI reference",
                ));
            }
            ed.conn.execute(
                "UPDATE synsets SET ili = 'in' WHERE id = ?1",
                params![key],
            )?;
            ed.conn.execute(
                "INSERT INTO proposed_ilis (synset, definition) VALUES (?1, ?2)
                 ON CONFLICT (synset) DO UPDATE SET definition = excluded.definition",
                params![key, definition],
            )?;
            ed.record(
                kind::SYNSET,
                synset,
                Some("ili"),
                ChangeOp::Update,
                Some(to_json(&before.ili)?),
                Some(json!("in")),
            )?;
            ed.record(
                kind::ILI,
                synset,
                Some("proposed_definition"),
                ChangeOp::Update,
                Some(to_json(&before.proposed_ili.as_ref().map(|p| &p.definition))?),
                Some(json!(definition)),
            )?;
            ed.fetch_synset(key)
        })
    }

    /// Withdraws a pending ILI proposal, clearing the sentinel.
    pub fn retract_proposed_ili(&mut self, synset: &str) -> Result<Synset> {
        let key = self.synset_key(synset)?;
        self.with_tx(|ed| {
            let before = ed.fetch_synset(key)?;
            if !matches!(before.ili, Some(IliRef::Proposed)) {
                return Err(EditorError::validation(
                    kind::SYNSET,
                    synset,
                    "synset has no pending ILI proposal",
                ));
            }
            ed.conn.execute(
                "UPDATE synsets SET ili = NULL WHERE id = ?1",
                params![key],
            )?;
            ed.conn.execute(
                "DELETE FROM proposed_ilis WHERE synset = ?1",
                params![key],
            )?;
            ed.record(
                kind::SYNSET,
                synset,
                Some("ili"),
                ChangeOp::Update,
                Some(json!("in")),
                Some(Value::Null),
            )?;
            ed.fetch_synset(key)
        })
    }

    pub(crate) fn ensure_ili_row(&self, ili_id: &str) -> Result<()> {
        let known: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ilis WHERE id = ?1",
            params![ili_id],
            |row| row.get(0),
        )?;
        if known == 0 {
            self.conn.execute(
                "INSERT INTO ilis (id, status) VALUES (?1, ?2)",
                params![ili_id, IliStatus::Presupposed.as_str()],
            )?;
        }
        Ok(())
    }

    pub fn delete_synset(&mut self, id: &str, cascade: bool) -> Result<()> {
        let key = self.synset_key(id)?;
        self.with_tx(|ed| {
            if !cascade {
                let senses: i64 = ed.conn.query_row(
                    "SELECT COUNT(*) FROM senses WHERE synset = ?1",
                    params![key],
                    |row| row.get(0),
                )?;
                if senses > 0 {
                    return Err(EditorError::relation(
                        kind::SYNSET,
                        id,
                        format!("{} sense(s) still reference this synset", senses),
                    ));
                }
            }
            ed.delete_synset_rows(key)
        })
    }

    /// Bottom-up cascade: senses first (each with its own DELETE record),
    /// then child rows, then the synset itself with a full subtree snapshot
    /// as the prior value.
    fn delete_synset_rows(&mut self, key: i64) -> Result<()> {
        let snapshot = self.fetch_synset(key)?;
        let sense_keys = self.child_keys("senses", "synset", key)?;
        for sense in sense_keys {
            self.delete_sense_rows(sense)?;
        }
        self.record(
            kind::SYNSET,
            &snapshot.id,
            None,
            ChangeOp::Delete,
            Some(to_json(&snapshot)?),
            None,
        )?;
        self.conn.execute(
            "DELETE FROM synset_relations WHERE source = ?1 OR target = ?1",
            params![key],
        )?;
        self.conn.execute(
            "DELETE FROM sense_synset_relations WHERE target = ?1",
            params![key],
        )?;
        self.conn
            .execute("DELETE FROM definitions WHERE synset = ?1", params![key])?;
        self.conn.execute(
            "DELETE FROM synset_examples WHERE synset = ?1",
            params![key],
        )?;
        self.conn
            .execute("DELETE FROM proposed_ilis WHERE synset = ?1", params![key])?;
        self.conn
            .execute("DELETE FROM synsets WHERE id = ?1", params![key])?;
        info!("Deleted synset {}", snapshot.id);
        Ok(())
    }

    // --- Definitions and synset examples ---

    pub fn add_definition(
        &mut self,
        synset: &str,
        text: &str,
        language: Option<&str>,
        source_sense: Option<&str>,
    ) -> Result<Synset> {
        let key = self.synset_key(synset)?;
        let source_key = source_sense.map(|s| self.sense_key(s)).transpose()?;
        self.with_tx(|ed| {
            ed.conn.execute(
                "INSERT INTO definitions (synset, text, language, source_sense)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key, text, language, source_key],
            )?;
            ed.record(
                kind::DEFINITION,
                synset,
                None,
                ChangeOp::Create,
                None,
                Some(json!({ "text": text, "language": language })),
            )?;
            ed.fetch_synset(key)
        })
    }

    pub fn remove_definition(&mut self, synset: &str, text: &str) -> Result<Synset> {
        let key = self.synset_key(synset)?;
        self.with_tx(|ed| {
            let removed = ed.conn.execute(
                "DELETE FROM definitions WHERE synset = ?1 AND text = ?2",
                params![key, text],
            )?;
            if removed == 0 {
                return Err(EditorError::not_found(kind::DEFINITION, text));
            }
            ed.record(
                kind::DEFINITION,
                synset,
                None,
                ChangeOp::Delete,
                Some(json!({ "text": text })),
                None,
            )?;
            ed.fetch_synset(key)
        })
    }

    pub fn add_synset_example(
        &mut self,
        synset: &str,
        text: &str,
        language: Option<&str>,
    ) -> Result<Synset> {
        let key = self.synset_key(synset)?;
        self.with_tx(|ed| {
            ed.conn.execute(
                "INSERT INTO synset_examples (synset, text, language) VALUES (?1, ?2, ?3)",
                params![key, text, language],
            )?;
            ed.record(
                kind::EXAMPLE,
                synset,
                None,
                ChangeOp::Create,
                None,
                Some(json!({ "text": text, "language": language })),
            )?;
            ed.fetch_synset(key)
        })
    }

    pub fn remove_synset_example(&mut self, synset: &str, text: &str) -> Result<Synset> {
        let key = self.synset_key(synset)?;
        self.with_tx(|ed| {
            let removed = ed.conn.execute(
                "DELETE FROM synset_examples WHERE synset = ?1 AND text = ?2",
                params![key, text],
            )?;
            if removed == 0 {
                return Err(EditorError::not_found(kind::EXAMPLE, text));
            }
            ed.record(
                kind::EXAMPLE,
                synset,
                None,
                ChangeOp::Delete,
                Some(json!({ "text": text })),
                None,
            )?;
            ed.fetch_synset(key)
        })
    }

    // --- Entry CRUD ---

    pub fn create_entry(
        &mut self,
        lexicon: &str,
        lemma: &str,
        pos: PartOfSpeech,
        id: Option<&str>,
    ) -> Result<Entry> {
        let lkey = self.lexicon_key(lexicon)?;
        let lexicon_id = self.lexicon_public_id(lkey)?;
        self.with_tx(|ed| {
            let entry_id = match id {
                Some(explicit) => {
                    Self::check_prefix(kind::ENTRY, &lexicon_id, explicit)?;
                    if ed.id_in_use(lkey, explicit)? {
                        return Err(EditorError::duplicate(kind::ENTRY, explicit));
                    }
                    explicit.to_string()
                }
                None => ed.next_entry_id(lkey, &lexicon_id, lemma, pos)?,
            };
            ed.conn.execute(
                "INSERT INTO entries (public_id, lexicon, part_of_speech, lemma_lower)
                 VALUES (?1, ?2, ?3, ?4)",
                params![entry_id, lkey, pos.as_str(), lemma.to_lowercase()],
            )?;
            let key = ed.conn.last_insert_rowid();
            ed.conn.execute(
                "INSERT INTO forms (entry, written_form, rank) VALUES (?1, ?2, 0)",
                params![key, lemma],
            )?;
            let record = ed.fetch_entry(key)?;
            ed.record(
                kind::ENTRY,
                &entry_id,
                None,
                ChangeOp::Create,
                None,
                Some(to_json(&record)?),
            )?;
            debug!("Created entry {} ({})", entry_id, lemma);
            Ok(record)
        })
    }

    pub fn get_entry(&self, id: &str) -> Result<Entry> {
        let key = self.entry_key(id)?;
        self.fetch_entry(key)
    }

    /// Entries whose lemma matches, optionally filtered by part of speech.
    pub fn find_entries(&self, lemma: &str, pos: Option<PartOfSpeech>) -> Result<Vec<Entry>> {
        let pos_filter = pos.map(|p| p.as_str());
        let mut stmt = self.conn.prepare(
            "SELECT id FROM entries
             WHERE lemma_lower = ?1 AND (?2 IS NULL OR part_of_speech = ?2)
             ORDER BY id",
        )?;
        let keys: Vec<i64> = stmt
            .query_map(params![lemma.to_lowercase(), pos_filter], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        keys.into_iter().map(|k| self.fetch_entry(k)).collect()
    }

    pub fn update_entry(&mut self, id: &str, update: EntryUpdate) -> Result<Entry> {
        let key = self.entry_key(id)?;
        self.with_tx(|ed| {
            let before = ed.fetch_entry(key)?;
            if let Some(index) = &update.index {
                ed.conn.execute(
                    "UPDATE entries SET index_form = ?1 WHERE id = ?2",
                    params![index, key],
                )?;
                ed.record(
                    kind::ENTRY,
                    id,
                    Some("index"),
                    ChangeOp::Update,
                    Some(json!(before.index)),
                    Some(json!(index)),
                )?;
            }
            if let Some(meta) = &update.metadata {
                ed.conn.execute(
                    "UPDATE entries SET metadata = ?1 WHERE id = ?2",
                    params![db::encode_metadata(Some(meta))?, key],
                )?;
                ed.record(
                    kind::ENTRY,
                    id,
                    Some("metadata"),
                    ChangeOp::Update,
                    Some(to_json(&before.metadata)?),
                    Some(to_json(meta)?),
                )?;
            }
            ed.fetch_entry(key)
        })
    }

    /// Replaces the lemma: the rank-0 form and the denormalized lemma index
    /// column move together in one transaction.
    pub fn set_lemma(&mut self, entry: &str, written_form: &str) -> Result<Entry> {
        let key = self.entry_key(entry)?;
        self.with_tx(|ed| {
            let prior: String = ed.conn.query_row(
                "SELECT written_form FROM forms WHERE entry = ?1 AND rank = 0",
                params![key],
                |row| row.get(0),
            )?;
            ed.conn.execute(
                "UPDATE forms SET written_form = ?1 WHERE entry = ?2 AND rank = 0",
                params![written_form, key],
            )?;
            ed.conn.execute(
                "UPDATE entries SET lemma_lower = ?1 WHERE id = ?2",
                params![written_form.to_lowercase(), key],
            )?;
            ed.record(
                kind::ENTRY,
                entry,
                Some("lemma"),
                ChangeOp::Update,
                Some(json!(prior)),
                Some(json!(written_form)),
            )?;
            ed.fetch_entry(key)
        })
    }

    pub fn delete_entry(&mut self, id: &str, cascade: bool) -> Result<()> {
        let key = self.entry_key(id)?;
        self.with_tx(|ed| {
            if !cascade {
                let senses: i64 = ed.conn.query_row(
                    "SELECT COUNT(*) FROM senses WHERE entry = ?1",
                    params![key],
                    |row| row.get(0),
                )?;
                if senses > 0 {
                    return Err(EditorError::relation(
                        kind::ENTRY,
                        id,
                        format!("{} sense(s) still belong to this entry", senses),
                    ));
                }
            }
            ed.delete_entry_rows(key)
        })
    }

    fn delete_entry_rows(&mut self, key: i64) -> Result<()> {
        let snapshot = self.fetch_entry(key)?;
        for sense in self.child_keys("senses", "entry", key)? {
            self.delete_sense_rows(sense)?;
        }
        self.record(
            kind::ENTRY,
            &snapshot.id,
            None,
            ChangeOp::Delete,
            Some(to_json(&snapshot)?),
            None,
        )?;
        self.conn.execute(
            "DELETE FROM pronunciations WHERE form IN (SELECT id FROM forms WHERE entry = ?1)",
            params![key],
        )?;
        self.conn.execute(
            "DELETE FROM tags WHERE form IN (SELECT id FROM forms WHERE entry = ?1)",
            params![key],
        )?;
        self.conn
            .execute("DELETE FROM forms WHERE entry = ?1", params![key])?;
        self.conn
            .execute("DELETE FROM entries WHERE id = ?1", params![key])?;
        info!("Deleted entry {}", snapshot.id);
        Ok(())
    }

    // --- Forms ---

    pub fn add_form(
        &mut self,
        entry: &str,
        written_form: &str,
        script: Option<&str>,
    ) -> Result<Entry> {
        let key = self.entry_key(entry)?;
        self.with_tx(|ed| {
            let rank: i64 = ed.conn.query_row(
                "SELECT MAX(rank) + 1 FROM forms WHERE entry = ?1",
                params![key],
                |row| row.get(0),
            )?;
            ed.conn.execute(
                "INSERT INTO forms (entry, written_form, script, rank) VALUES (?1, ?2, ?3, ?4)",
                params![key, written_form, script, rank],
            )?;
            ed.record(
                kind::FORM,
                entry,
                None,
                ChangeOp::Create,
                None,
                Some(json!({ "written_form": written_form, "rank": rank })),
            )?;
            ed.fetch_entry(key)
        })
    }

    /// Removes a non-lemma form. The rank-0 form is the lemma and cannot be
    /// removed.
    pub fn remove_form(&mut self, entry: &str, written_form: &str) -> Result<Entry> {
        let key = self.entry_key(entry)?;
        self.with_tx(|ed| {
            let row: Option<(i64, i64)> = ed
                .conn
                .query_row(
                    "SELECT id, rank FROM forms WHERE entry = ?1 AND written_form = ?2
                     ORDER BY rank LIMIT 1",
                    params![key, written_form],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let (form_key, rank) = row.ok_or_else(|| EditorError::not_found(kind::FORM, written_form))?;
            if rank == 0 {
                return Err(EditorError::validation(
                    kind::FORM,
                    written_form,
                    "the lemma form cannot be removed",
                ));
            }
            ed.conn
                .execute("DELETE FROM pronunciations WHERE form = ?1", params![form_key])?;
            ed.conn
                .execute("DELETE FROM tags WHERE form = ?1", params![form_key])?;
            ed.conn
                .execute("DELETE FROM forms WHERE id = ?1", params![form_key])?;
            ed.conn.execute(
                "UPDATE forms SET rank = rank - 1 WHERE entry = ?1 AND rank > ?2",
                params![key, rank],
            )?;
            ed.record(
                kind::FORM,
                entry,
                None,
                ChangeOp::Delete,
                Some(json!({ "written_form": written_form, "rank": rank })),
                None,
            )?;
            ed.fetch_entry(key)
        })
    }

    fn form_key_by_rank(&self, entry: i64, rank: u32) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT id FROM forms WHERE entry = ?1 AND rank = ?2",
                params![entry, rank],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| EditorError::not_found(kind::FORM, format!("rank {}", rank)))
    }

    pub fn add_pronunciation(
        &mut self,
        entry: &str,
        form_rank: u32,
        pronunciation: &Pronunciation,
    ) -> Result<Entry> {
        let key = self.entry_key(entry)?;
        self.with_tx(|ed| {
            let form_key = ed.form_key_by_rank(key, form_rank)?;
            ed.conn.execute(
                "INSERT INTO pronunciations (form, text, variety, notation, phonemic, audio)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    form_key,
                    pronunciation.text,
                    pronunciation.variety,
                    pronunciation.notation,
                    pronunciation.phonemic,
                    pronunciation.audio,
                ],
            )?;
            ed.record(
                kind::FORM,
                entry,
                Some("pronunciation"),
                ChangeOp::Update,
                None,
                Some(to_json(pronunciation)?),
            )?;
            ed.fetch_entry(key)
        })
    }

    pub fn add_tag(
        &mut self,
        entry: &str,
        form_rank: u32,
        category: &str,
        text: &str,
    ) -> Result<Entry> {
        let key = self.entry_key(entry)?;
        self.with_tx(|ed| {
            let form_key = ed.form_key_by_rank(key, form_rank)?;
            ed.conn.execute(
                "INSERT INTO tags (form, category, text) VALUES (?1, ?2, ?3)",
                params![form_key, category, text],
            )?;
            ed.record(
                kind::FORM,
                entry,
                Some("tag"),
                ChangeOp::Update,
                None,
                Some(json!({ "category": category, "text": text })),
            )?;
            ed.fetch_entry(key)
        })
    }

    // --- Sense CRUD ---

    pub fn add_sense(&mut self, entry: &str, synset: &str, id: Option<&str>) -> Result<Sense> {
        let ekey = self.entry_key(entry)?;
        let ykey = self.synset_key(synset)?;
        let elex = self.owning_lexicon("entries", ekey)?;
        let ylex = self.owning_lexicon("synsets", ykey)?;
        if elex != ylex {
            return Err(EditorError::validation(
                kind::SENSE,
                id.unwrap_or(entry),
                "entry and synset belong to different lexicons",
            ));
        }
        self.with_tx(|ed| {
            let entry_rank: i64 = ed.conn.query_row(
                "SELECT COUNT(*) + 1 FROM senses WHERE entry = ?1",
                params![ekey],
                |row| row.get(0),
            )?;
            let synset_rank: i64 = ed.conn.query_row(
                "SELECT COUNT(*) + 1 FROM senses WHERE synset = ?1",
                params![ykey],
                |row| row.get(0),
            )?;
            let sense_id = match id {
                Some(explicit) => {
                    let lexicon_id = ed.lexicon_public_id(elex)?;
                    Self::check_prefix(kind::SENSE, &lexicon_id, explicit)?;
                    if ed.id_in_use(elex, explicit)? {
                        return Err(EditorError::duplicate(kind::SENSE, explicit));
                    }
                    explicit.to_string()
                }
                None => {
                    let mut n = entry_rank;
                    loop {
                        let candidate = format!("{}-{}", entry, n);
                        if !ed.id_in_use(elex, &candidate)? {
                            break candidate;
                        }
                        n += 1;
                    }
                }
            };
            ed.conn.execute(
                "INSERT INTO senses (public_id, lexicon, entry, synset, entry_rank, synset_rank)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![sense_id, elex, ekey, ykey, entry_rank, synset_rank],
            )?;
            let key = ed.conn.last_insert_rowid();
            // A referencing sense clears the synset's unlexicalized mark.
            ed.conn.execute(
                "UPDATE synsets SET lexicalized = 1 WHERE id = ?1",
                params![ykey],
            )?;
            let record = ed.fetch_sense(key)?;
            ed.record(
                kind::SENSE,
                &sense_id,
                None,
                ChangeOp::Create,
                None,
                Some(to_json(&record)?),
            )?;
            debug!("Added sense {} ({} -> {})", sense_id, entry, synset);
            Ok(record)
        })
    }

    pub fn get_sense(&self, id: &str) -> Result<Sense> {
        let key = self.sense_key(id)?;
        self.fetch_sense(key)
    }

    pub fn senses_for_entry(&self, entry: &str) -> Result<Vec<Sense>> {
        let key = self.entry_key(entry)?;
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM senses WHERE entry = ?1 ORDER BY entry_rank")?;
        let keys: Vec<i64> = stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        keys.into_iter().map(|k| self.fetch_sense(k)).collect()
    }

    pub fn senses_for_synset(&self, synset: &str) -> Result<Vec<Sense>> {
        let key = self.synset_key(synset)?;
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM senses WHERE synset = ?1 ORDER BY synset_rank")?;
        let keys: Vec<i64> = stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        keys.into_iter().map(|k| self.fetch_sense(k)).collect()
    }

    pub fn update_sense(&mut self, id: &str, update: SenseUpdate) -> Result<Sense> {
        let key = self.sense_key(id)?;
        self.with_tx(|ed| {
            let before = ed.fetch_sense(key)?;
            if let Some(adjposition) = update.adjposition {
                ed.conn.execute(
                    "UPDATE senses SET adjposition = ?1 WHERE id = ?2",
                    params![adjposition.as_str(), key],
                )?;
                ed.record(
                    kind::SENSE,
                    id,
                    Some("adjposition"),
                    ChangeOp::Update,
                    Some(to_json(&before.adjposition)?),
                    Some(json!(adjposition.as_str())),
                )?;
            }
            if let Some(lexicalized) = update.lexicalized {
                ed.conn.execute(
                    "UPDATE senses SET lexicalized = ?1 WHERE id = ?2",
                    params![lexicalized, key],
                )?;
                ed.record(
                    kind::SENSE,
                    id,
                    Some("lexicalized"),
                    ChangeOp::Update,
                    Some(json!(before.lexicalized)),
                    Some(json!(lexicalized)),
                )?;
            }
            if let Some(meta) = &update.metadata {
                ed.conn.execute(
                    "UPDATE senses SET metadata = ?1 WHERE id = ?2",
                    params![db::encode_metadata(Some(meta))?, key],
                )?;
                ed.record(
                    kind::SENSE,
                    id,
                    Some("metadata"),
                    ChangeOp::Update,
                    Some(to_json(&before.metadata)?),
                    Some(to_json(meta)?),
                )?;
            }
            ed.fetch_sense(key)
        })
    }

    pub fn delete_sense(&mut self, id: &str) -> Result<()> {
        let key = self.sense_key(id)?;
        self.with_tx(|ed| ed.delete_sense_rows(key))
    }

    /// Removes a sense and everything hanging off it, renumbers the ranks
    /// it vacated, and re-derives the synset's lexicalized flag.
    pub(crate) fn delete_sense_rows(&mut self, key: i64) -> Result<()> {
        let snapshot = self.fetch_sense(key)?;
        let (entry_key, synset_key): (i64, i64) = self.conn.query_row(
            "SELECT entry, synset FROM senses WHERE id = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        self.record(
            kind::SENSE,
            &snapshot.id,
            None,
            ChangeOp::Delete,
            Some(to_json(&snapshot)?),
            None,
        )?;
        self.conn.execute(
            "DELETE FROM sense_relations WHERE source = ?1 OR target = ?1",
            params![key],
        )?;
        self.conn.execute(
            "DELETE FROM sense_synset_relations WHERE source = ?1",
            params![key],
        )?;
        self.conn
            .execute("DELETE FROM sense_examples WHERE sense = ?1", params![key])?;
        self.conn
            .execute("DELETE FROM counts WHERE sense = ?1", params![key])?;
        self.conn
            .execute("DELETE FROM sense_behaviours WHERE sense = ?1", params![key])?;
        self.conn.execute(
            "UPDATE definitions SET source_sense = NULL WHERE source_sense = ?1",
            params![key],
        )?;
        self.conn
            .execute("DELETE FROM senses WHERE id = ?1", params![key])?;
        self.renumber_entry_ranks(entry_key)?;
        self.renumber_synset_ranks(synset_key)?;
        self.refresh_synset_lexicalized(synset_key)?;
        Ok(())
    }

    pub fn add_sense_example(
        &mut self,
        sense: &str,
        text: &str,
        language: Option<&str>,
    ) -> Result<Sense> {
        let key = self.sense_key(sense)?;
        self.with_tx(|ed| {
            ed.conn.execute(
                "INSERT INTO sense_examples (sense, text, language) VALUES (?1, ?2, ?3)",
                params![key, text, language],
            )?;
            ed.record(
                kind::EXAMPLE,
                sense,
                None,
                ChangeOp::Create,
                None,
                Some(json!({ "text": text, "language": language })),
            )?;
            ed.fetch_sense(key)
        })
    }

    pub fn remove_sense_example(&mut self, sense: &str, text: &str) -> Result<Sense> {
        let key = self.sense_key(sense)?;
        self.with_tx(|ed| {
            let removed = ed.conn.execute(
                "DELETE FROM sense_examples WHERE sense = ?1 AND text = ?2",
                params![key, text],
            )?;
            if removed == 0 {
                return Err(EditorError::not_found(kind::EXAMPLE, text));
            }
            ed.record(
                kind::EXAMPLE,
                sense,
                None,
                ChangeOp::Delete,
                Some(json!({ "text": text })),
                None,
            )?;
            ed.fetch_sense(key)
        })
    }

    pub fn add_count(&mut self, sense: &str, value: i64) -> Result<Sense> {
        let key = self.sense_key(sense)?;
        self.with_tx(|ed| {
            ed.conn.execute(
                "INSERT INTO counts (sense, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            ed.record(
                kind::COUNT,
                sense,
                None,
                ChangeOp::Create,
                None,
                Some(json!(value)),
            )?;
            ed.fetch_sense(key)
        })
    }

    pub fn remove_count(&mut self, sense: &str, value: i64) -> Result<Sense> {
        let key = self.sense_key(sense)?;
        self.with_tx(|ed| {
            let removed = ed.conn.execute(
                "DELETE FROM counts WHERE id IN
                 (SELECT id FROM counts WHERE sense = ?1 AND value = ?2 LIMIT 1)",
                params![key, value],
            )?;
            if removed == 0 {
                return Err(EditorError::not_found(kind::COUNT, value.to_string()));
            }
            ed.record(
                kind::COUNT,
                sense,
                None,
                ChangeOp::Delete,
                Some(json!(value)),
                None,
            )?;
            ed.fetch_sense(key)
        })
    }

    // --- Syntactic behaviours ---

    pub fn create_syntactic_behaviour(
        &mut self,
        lexicon: &str,
        frame: &str,
        id: Option<&str>,
    ) -> Result<SyntacticBehaviour> {
        let lkey = self.lexicon_key(lexicon)?;
        let lexicon_id = self.lexicon_public_id(lkey)?;
        self.with_tx(|ed| {
            let existing: i64 = ed.conn.query_row(
                "SELECT COUNT(*) FROM syntactic_behaviours WHERE lexicon = ?1 AND frame = ?2",
                params![lkey, frame],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Err(EditorError::duplicate(kind::BEHAVIOUR, frame));
            }
            if let Some(explicit) = id {
                Self::check_prefix(kind::BEHAVIOUR, &lexicon_id, explicit)?;
                if ed.id_in_use(lkey, explicit)? {
                    return Err(EditorError::duplicate(kind::BEHAVIOUR, explicit));
                }
            }
            ed.conn.execute(
                "INSERT INTO syntactic_behaviours (public_id, lexicon, frame) VALUES (?1, ?2, ?3)",
                params![id, lkey, frame],
            )?;
            let key = ed.conn.last_insert_rowid();
            ed.record(
                kind::BEHAVIOUR,
                id.unwrap_or(frame),
                None,
                ChangeOp::Create,
                None,
                Some(json!({ "frame": frame })),
            )?;
            ed.fetch_behaviour(key)
        })
    }

    pub fn attach_syntactic_behaviour(&mut self, sense: &str, frame: &str) -> Result<()> {
        let skey = self.sense_key(sense)?;
        let lexicon = self.owning_lexicon("senses", skey)?;
        self.with_tx(|ed| {
            let bkey: Option<i64> = ed
                .conn
                .query_row(
                    "SELECT id FROM syntactic_behaviours WHERE lexicon = ?1 AND frame = ?2",
                    params![lexicon, frame],
                    |row| row.get(0),
                )
                .optional()?;
            let bkey = bkey.ok_or_else(|| EditorError::not_found(kind::BEHAVIOUR, frame))?;
            let attached: i64 = ed.conn.query_row(
                "SELECT COUNT(*) FROM sense_behaviours WHERE sense = ?1 AND behaviour = ?2",
                params![skey, bkey],
                |row| row.get(0),
            )?;
            if attached == 0 {
                ed.conn.execute(
                    "INSERT INTO sense_behaviours (sense, behaviour) VALUES (?1, ?2)",
                    params![skey, bkey],
                )?;
                ed.record(
                    kind::BEHAVIOUR,
                    sense,
                    Some("frame"),
                    ChangeOp::Update,
                    None,
                    Some(json!(frame)),
                )?;
            }
            Ok(())
        })
    }

    pub fn detach_syntactic_behaviour(&mut self, sense: &str, frame: &str) -> Result<()> {
        let skey = self.sense_key(sense)?;
        let lexicon = self.owning_lexicon("senses", skey)?;
        self.with_tx(|ed| {
            let removed = ed.conn.execute(
                "DELETE FROM sense_behaviours WHERE sense = ?1 AND behaviour IN
                 (SELECT id FROM syntactic_behaviours WHERE lexicon = ?2 AND frame = ?3)",
                params![skey, lexicon, frame],
            )?;
            if removed == 0 {
                return Err(EditorError::not_found(kind::BEHAVIOUR, frame));
            }
            ed.record(
                kind::BEHAVIOUR,
                sense,
                Some("frame"),
                ChangeOp::Update,
                Some(json!(frame)),
                None,
            )?;
            Ok(())
        })
    }

    pub fn syntactic_behaviours(&self, lexicon: &str) -> Result<Vec<SyntacticBehaviour>> {
        let key = self.lexicon_key(lexicon)?;
        let keys = self.child_keys("syntactic_behaviours", "lexicon", key)?;
        keys.into_iter().map(|k| self.fetch_behaviour(k)).collect()
    }

    // --- Relations ---

    pub fn add_synset_relation(
        &mut self,
        source: &str,
        rel_type: SynsetRelType,
        target: &str,
    ) -> Result<()> {
        self.add_synset_relation_with(source, rel_type, target, None, true)
    }

    /// Full form of [`Editor::add_synset_relation`]: explicit metadata
    /// (inherited by the inverse edge) and an auto-inverse switch.
    pub fn add_synset_relation_with(
        &mut self,
        source: &str,
        rel_type: SynsetRelType,
        target: &str,
        metadata: Option<Metadata>,
        auto_inverse: bool,
    ) -> Result<()> {
        let skey = self.synset_key(source)?;
        let tkey = self.synset_key(target)?;
        if skey == tkey {
            return Err(EditorError::validation(
                kind::SYNSET_RELATION,
                source,
                "relation source and target are the same synset",
            ));
        }
        self.with_tx(|ed| {
            if ed.insert_relation_row(RelSpace::Synset, skey, tkey, rel_type.as_str(), metadata.as_ref())? {
                ed.record_relation_change(RelSpace::Synset, ChangeOp::Create, source, rel_type.as_str(), target)?;
            }
            if auto_inverse {
                if let Some(inverse) = rel_type.inverse() {
                    if ed.insert_relation_row(RelSpace::Synset, tkey, skey, inverse.as_str(), metadata.as_ref())? {
                        ed.record_relation_change(RelSpace::Synset, ChangeOp::Create, target, inverse.as_str(), source)?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Removes the edge and, when the type has an inverse, its mirror.
    pub fn remove_synset_relation(
        &mut self,
        source: &str,
        rel_type: SynsetRelType,
        target: &str,
    ) -> Result<()> {
        let skey = self.synset_key(source)?;
        let tkey = self.synset_key(target)?;
        self.with_tx(|ed| {
            let removed = ed.delete_relation_row(RelSpace::Synset, skey, tkey, rel_type.as_str())?;
            if !removed {
                return Err(EditorError::not_found(
                    kind::SYNSET_RELATION,
                    format!("{} -{}-> {}", source, rel_type, target),
                ));
            }
            ed.record_relation_change(RelSpace::Synset, ChangeOp::Delete, source, rel_type.as_str(), target)?;
            if let Some(inverse) = rel_type.inverse() {
                if ed.delete_relation_row(RelSpace::Synset, tkey, skey, inverse.as_str())? {
                    ed.record_relation_change(RelSpace::Synset, ChangeOp::Delete, target, inverse.as_str(), source)?;
                }
            }
            Ok(())
        })
    }

    pub fn add_sense_relation(
        &mut self,
        source: &str,
        rel_type: SenseRelType,
        target: &str,
    ) -> Result<()> {
        self.add_sense_relation_with(source, rel_type, target, None, true)
    }

    pub fn add_sense_relation_with(
        &mut self,
        source: &str,
        rel_type: SenseRelType,
        target: &str,
        metadata: Option<Metadata>,
        auto_inverse: bool,
    ) -> Result<()> {
        let skey = self.sense_key(source)?;
        let tkey = self.sense_key(target)?;
        if skey == tkey {
            return Err(EditorError::validation(
                kind::SENSE_RELATION,
                source,
                "relation source and target are the same sense",
            ));
        }
        self.with_tx(|ed| {
            if ed.insert_relation_row(RelSpace::Sense, skey, tkey, rel_type.as_str(), metadata.as_ref())? {
                ed.record_relation_change(RelSpace::Sense, ChangeOp::Create, source, rel_type.as_str(), target)?;
            }
            if auto_inverse {
                if let Some(inverse) = rel_type.inverse() {
                    if ed.insert_relation_row(RelSpace::Sense, tkey, skey, inverse.as_str(), metadata.as_ref())? {
                        ed.record_relation_change(RelSpace::Sense, ChangeOp::Create, target, inverse.as_str(), source)?;
                    }
                }
            }
            Ok(())
        })
    }

    pub fn remove_sense_relation(
        &mut self,
        source: &str,
        rel_type: SenseRelType,
        target: &str,
    ) -> Result<()> {
        let skey = self.sense_key(source)?;
        let tkey = self.sense_key(target)?;
        self.with_tx(|ed| {
            let removed = ed.delete_relation_row(RelSpace::Sense, skey, tkey, rel_type.as_str())?;
            if !removed {
                return Err(EditorError::not_found(
                    kind::SENSE_RELATION,
                    format!("{} -{}-> {}", source, rel_type, target),
                ));
            }
            ed.record_relation_change(RelSpace::Sense, ChangeOp::Delete, source, rel_type.as_str(), target)?;
            if let Some(inverse) = rel_type.inverse() {
                if ed.delete_relation_row(RelSpace::Sense, tkey, skey, inverse.as_str())? {
                    ed.record_relation_change(RelSpace::Sense, ChangeOp::Delete, target, inverse.as_str(), source)?;
                }
            }
            Ok(())
        })
    }

    pub fn add_sense_synset_relation(
        &mut self,
        source: &str,
        rel_type: SenseSynsetRelType,
        target: &str,
    ) -> Result<()> {
        let skey = self.sense_key(source)?;
        let tkey = self.synset_key(target)?;
        self.with_tx(|ed| {
            if ed.insert_relation_row(RelSpace::SenseSynset, skey, tkey, rel_type.as_str(), None)? {
                ed.record_relation_change(RelSpace::SenseSynset, ChangeOp::Create, source, rel_type.as_str(), target)?;
            }
            Ok(())
        })
    }

    pub fn remove_sense_synset_relation(
        &mut self,
        source: &str,
        rel_type: SenseSynsetRelType,
        target: &str,
    ) -> Result<()> {
        let skey = self.sense_key(source)?;
        let tkey = self.synset_key(target)?;
        self.with_tx(|ed| {
            let removed =
                ed.delete_relation_row(RelSpace::SenseSynset, skey, tkey, rel_type.as_str())?;
            if !removed {
                return Err(EditorError::not_found(
                    kind::SENSE_SYNSET_RELATION,
                    format!("{} -{}-> {}", source, rel_type, target),
                ));
            }
            ed.record_relation_change(RelSpace::SenseSynset, ChangeOp::Delete, source, rel_type.as_str(), target)?;
            Ok(())
        })
    }

    /// Inserts a relation row, treating a pre-existing identical triple as
    /// success. Only UNIQUE violations are suppressed here; FK and NOT NULL
    /// failures re-raise.
    pub(crate) fn insert_relation_row(
        &self,
        space: RelSpace,
        source: i64,
        target: i64,
        rel_type: &str,
        metadata: Option<&Metadata>,
    ) -> Result<bool> {
        let sql = format!(
            "INSERT INTO {} (source, target, rel_type, metadata) VALUES (?1, ?2, ?3, ?4)",
            space.table()
        );
        let meta = db::encode_metadata(metadata)?;
        match self
            .conn
            .execute(&sql, params![source, target, rel_type, meta])
        {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => {
                debug!(
                    "{} ({} -> {}) [{}] already present; insert is idempotent",
                    space.table(),
                    source,
                    target,
                    rel_type
                );
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn delete_relation_row(
        &self,
        space: RelSpace,
        source: i64,
        target: i64,
        rel_type: &str,
    ) -> Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE source = ?1 AND target = ?2 AND rel_type = ?3",
            space.table()
        );
        Ok(self.conn.execute(&sql, params![source, target, rel_type])? > 0)
    }

    pub(crate) fn record_relation_change(
        &self,
        space: RelSpace,
        op: ChangeOp,
        source: &str,
        rel_type: &str,
        target: &str,
    ) -> Result<()> {
        let triple = json!({ "source": source, "type": rel_type, "target": target });
        let (prior, new) = match op {
            ChangeOp::Delete => (Some(triple), None),
            _ => (None, Some(triple)),
        };
        self.record(space.history_kind(), source, None, op, prior, new)
    }

    // --- Shared row plumbing ---

    pub(crate) fn child_keys(&self, table: &str, column: &str, parent: i64) -> Result<Vec<i64>> {
        let sql = format!("SELECT id FROM {} WHERE {} = ?1 ORDER BY id", table, column);
        let mut stmt = self.conn.prepare(&sql)?;
        let keys = stmt
            .query_map(params![parent], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(keys)
    }

    fn renumber_entry_ranks(&self, entry: i64) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM senses WHERE entry = ?1 ORDER BY entry_rank")?;
        let keys: Vec<i64> = stmt
            .query_map(params![entry], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for (i, key) in keys.iter().enumerate() {
            self.conn.execute(
                "UPDATE senses SET entry_rank = ?1 WHERE id = ?2",
                params![(i + 1) as i64, key],
            )?;
        }
        Ok(())
    }

    pub(crate) fn renumber_synset_ranks(&self, synset: i64) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM senses WHERE synset = ?1 ORDER BY synset_rank")?;
        let keys: Vec<i64> = stmt
            .query_map(params![synset], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for (i, key) in keys.iter().enumerate() {
            self.conn.execute(
                "UPDATE senses SET synset_rank = ?1 WHERE id = ?2",
                params![(i + 1) as i64, key],
            )?;
        }
        Ok(())
    }

    /// Re-derives the lexicalized flag from the presence of senses.
    pub(crate) fn refresh_synset_lexicalized(&self, synset: i64) -> Result<bool> {
        let senses: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM senses WHERE synset = ?1",
            params![synset],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "UPDATE synsets SET lexicalized = ?1 WHERE id = ?2",
            params![senses > 0, synset],
        )?;
        Ok(senses > 0)
    }

    // --- Record fetchers ---

    pub(crate) fn fetch_lexicon(&self, key: i64) -> Result<Lexicon> {
        let row = self.conn.query_row(
            "SELECT public_id, label, language, email, license, version, url, citation, logo, metadata
             FROM lexicons WHERE id = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, Option<String>>(9)?,
                ))
            },
        )?;
        Ok(Lexicon {
            id: row.0,
            label: row.1,
            language: row.2,
            email: row.3,
            license: row.4,
            version: row.5,
            url: row.6,
            citation: row.7,
            logo: row.8,
            metadata: db::decode_metadata(row.9)?,
        })
    }

    pub(crate) fn fetch_synset(&self, key: i64) -> Result<Synset> {
        let row = self.conn.query_row(
            "SELECT s.public_id, l.public_id, s.ili, s.part_of_speech, s.lexicalized, s.lexfile, s.metadata
             FROM synsets s JOIN lexicons l ON l.id = s.lexicon WHERE s.id = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            },
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT d.text, d.language, s.public_id, d.metadata
             FROM definitions d LEFT JOIN senses s ON s.id = d.source_sense
             WHERE d.synset = ?1 ORDER BY d.id",
        )?;
        let defs_raw: Vec<(String, Option<String>, Option<String>, Option<String>)> = stmt
            .query_map(params![key], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        let definitions = defs_raw
            .into_iter()
            .map(|(text, language, source_sense, meta)| {
                Ok(Definition {
                    text,
                    language,
                    source_sense,
                    metadata: db::decode_metadata(meta)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let examples = self.fetch_examples("synset_examples", "synset", key)?;
        let relations = self.fetch_relations(RelSpace::Synset, "synsets", key)?;

        let mut stmt = self
            .conn
            .prepare("SELECT public_id FROM senses WHERE synset = ?1 ORDER BY synset_rank")?;
        let members: Vec<String> = stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        let proposed_raw: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT definition, metadata FROM proposed_ilis WHERE synset = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let proposed_ili = proposed_raw
            .map(|(definition, meta)| {
                Ok::<_, EditorError>(ProposedIli {
                    definition,
                    metadata: db::decode_metadata(meta)?,
                })
            })
            .transpose()?;

        Ok(Synset {
            id: row.0,
            lexicon: row.1,
            ili: row.2.as_deref().map(IliRef::parse),
            part_of_speech: parse_pos(&row.3)?,
            lexicalized: row.4,
            lexfile: row.5,
            definitions,
            examples,
            relations,
            members,
            proposed_ili,
            metadata: db::decode_metadata(row.6)?,
        })
    }

    pub(crate) fn fetch_entry(&self, key: i64) -> Result<Entry> {
        let row = self.conn.query_row(
            "SELECT e.public_id, l.public_id, e.part_of_speech, e.index_form, e.metadata
             FROM entries e JOIN lexicons l ON l.id = e.lexicon WHERE e.id = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT id, public_id, written_form, script, rank FROM forms
             WHERE entry = ?1 ORDER BY rank",
        )?;
        let forms_raw: Vec<(i64, Option<String>, String, Option<String>, u32)> = stmt
            .query_map(params![key], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;
        let mut forms = Vec::with_capacity(forms_raw.len());
        for (form_key, public_id, written_form, script, rank) in forms_raw {
            forms.push(Form {
                id: public_id,
                written_form,
                script,
                rank,
                pronunciations: self.fetch_pronunciations(form_key)?,
                tags: self.fetch_tags(form_key)?,
            });
        }

        let mut stmt = self
            .conn
            .prepare("SELECT public_id FROM senses WHERE entry = ?1 ORDER BY entry_rank")?;
        let senses: Vec<String> = stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        Ok(Entry {
            id: row.0,
            lexicon: row.1,
            part_of_speech: parse_pos(&row.2)?,
            index: row.3,
            forms,
            senses,
            metadata: db::decode_metadata(row.4)?,
        })
    }

    fn fetch_pronunciations(&self, form: i64) -> Result<Vec<Pronunciation>> {
        let mut stmt = self.conn.prepare(
            "SELECT text, variety, notation, phonemic, audio FROM pronunciations
             WHERE form = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![form], |row| {
                Ok(Pronunciation {
                    text: row.get(0)?,
                    variety: row.get(1)?,
                    notation: row.get(2)?,
                    phonemic: row.get(3)?,
                    audio: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn fetch_tags(&self, form: i64) -> Result<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT category, text FROM tags WHERE form = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![form], |row| {
                Ok(Tag {
                    category: row.get(0)?,
                    text: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub(crate) fn fetch_sense(&self, key: i64) -> Result<Sense> {
        let row = self.conn.query_row(
            "SELECT s.public_id, e.public_id, y.public_id, s.entry_rank, s.synset_rank,
                    s.lexicalized, s.adjposition, s.metadata
             FROM senses s
             JOIN entries e ON e.id = s.entry
             JOIN synsets y ON y.id = s.synset
             WHERE s.id = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            },
        )?;
        let adjposition = row
            .6
            .as_deref()
            .map(|s| {
                s.parse::<AdjPosition>()
                    .map_err(|e| EditorError::Db(format!("invalid adjposition in store: {}", e)))
            })
            .transpose()?;

        let mut stmt = self.conn.prepare(
            "SELECT value, metadata FROM counts WHERE sense = ?1 ORDER BY id",
        )?;
        let counts_raw: Vec<(i64, Option<String>)> = stmt
            .query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        let counts = counts_raw
            .into_iter()
            .map(|(value, meta)| {
                Ok(Count {
                    value,
                    metadata: db::decode_metadata(meta)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Sense {
            id: row.0,
            entry: row.1,
            synset: row.2,
            entry_rank: row.3,
            synset_rank: row.4,
            lexicalized: row.5,
            adjposition,
            examples: self.fetch_examples("sense_examples", "sense", key)?,
            relations: self.fetch_relations(RelSpace::Sense, "senses", key)?,
            synset_relations: self.fetch_relations(RelSpace::SenseSynset, "synsets", key)?,
            counts,
            metadata: db::decode_metadata(row.7)?,
        })
    }

    fn fetch_behaviour(&self, key: i64) -> Result<SyntacticBehaviour> {
        let (public_id, frame): (Option<String>, String) = self.conn.query_row(
            "SELECT public_id, frame FROM syntactic_behaviours WHERE id = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let mut stmt = self.conn.prepare(
            "SELECT s.public_id FROM sense_behaviours b JOIN senses s ON s.id = b.sense
             WHERE b.behaviour = ?1 ORDER BY s.id",
        )?;
        let senses: Vec<String> = stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(SyntacticBehaviour {
            id: public_id,
            frame,
            senses,
        })
    }

    fn fetch_examples(&self, table: &str, column: &str, parent: i64) -> Result<Vec<Example>> {
        let sql = format!(
            "SELECT text, language, metadata FROM {} WHERE {} = ?1 ORDER BY id",
            table, column
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raw: Vec<(String, Option<String>, Option<String>)> = stmt
            .query_map(params![parent], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        raw.into_iter()
            .map(|(text, language, meta)| {
                Ok(Example {
                    text,
                    language,
                    metadata: db::decode_metadata(meta)?,
                })
            })
            .collect()
    }

    fn fetch_relations(
        &self,
        space: RelSpace,
        target_table: &str,
        source: i64,
    ) -> Result<Vec<Relation>> {
        let sql = format!(
            "SELECT r.rel_type, t.public_id, r.metadata FROM {} r
             JOIN {} t ON t.id = r.target WHERE r.source = ?1 ORDER BY r.id",
            space.table(),
            target_table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raw: Vec<(String, String, Option<String>)> = stmt
            .query_map(params![source], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        raw.into_iter()
            .map(|(rel_type, target, meta)| {
                Ok(Relation {
                    rel_type,
                    target,
                    metadata: db::decode_metadata(meta)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{Scope, Severity};

    fn editor() -> Editor {
        Editor::open_in_memory().unwrap()
    }

    fn seeded() -> Editor {
        let mut ed = editor();
        ed.create_lexicon(
            "awn",
            "Arabic WordNet",
            "arb",
            "wn@example.org",
            "https://creativecommons.org/licenses/by/4.0/",
            "4.0",
        )
        .unwrap();
        ed
    }

    #[test]
    fn scenario_create_synset_entry_sense() {
        // S1: lexicon, synset, entry, sense; lexicalized flips on.
        let mut ed = seeded();
        let synset = ed
            .create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        assert!(!synset.lexicalized);
        ed.add_definition("awn-00001-n", "A large feline", None, None)
            .unwrap();
        ed.create_entry("awn", "lion", PartOfSpeech::N, Some("awn-lion-n"))
            .unwrap();
        ed.add_sense("awn-lion-n", "awn-00001-n", None).unwrap();

        let synset = ed.get_synset("awn-00001-n").unwrap();
        assert!(synset.lexicalized);
        assert_eq!(synset.members.len(), 1);
        assert_eq!(synset.definitions[0].text, "A large feline");

        let findings = ed.validate(Scope::All).unwrap();
        assert!(
            findings.iter().all(|f| f.severity != Severity::Error),
            "unexpected errors: {:?}",
            findings
        );
    }

    #[test]
    fn scenario_auto_inverse_relation() {
        // S2: hypernym insert yields the hyponym mirror.
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.add_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00002-n")
            .unwrap();

        let a = ed.get_synset("awn-00001-n").unwrap();
        let b = ed.get_synset("awn-00002-n").unwrap();
        assert_eq!(a.relations.len(), 1);
        assert_eq!(a.relations[0].rel_type, "hypernym");
        assert_eq!(a.relations[0].target, "awn-00002-n");
        assert_eq!(b.relations.len(), 1);
        assert_eq!(b.relations[0].rel_type, "hyponym");
        assert_eq!(b.relations[0].target, "awn-00001-n");
    }

    #[test]
    fn scenario_remove_relation_removes_both_directions() {
        // S3.
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.add_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00002-n")
            .unwrap();
        ed.remove_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00002-n")
            .unwrap();

        assert!(ed.get_synset("awn-00001-n").unwrap().relations.is_empty());
        assert!(ed.get_synset("awn-00002-n").unwrap().relations.is_empty());
    }

    #[test]
    fn scenario_batch_rolls_back_on_error() {
        // S6: an error mid-batch leaves the store unchanged.
        let mut ed = seeded();
        let result: Result<()> = ed.batch(|ed| {
            ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))?;
            ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))?;
            ed.create_synset("awn", PartOfSpeech::N, Some("awn-00003-n"))?;
            Err(EditorError::validation(kind::SYNSET, "none", "forced failure"))
        });
        assert!(result.is_err());
        assert!(ed.get_synset("awn-00001-n").is_err());
        assert!(ed.get_synset("awn-00002-n").is_err());
        assert!(ed.get_synset("awn-00003-n").is_err());
        assert!(ed.synsets("awn").unwrap().is_empty());
    }

    #[test]
    fn nested_batches_commit_once() {
        let mut ed = seeded();
        ed.batch(|ed| {
            ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))?;
            ed.batch(|ed| {
                ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        assert_eq!(ed.synsets("awn").unwrap().len(), 2);
    }

    #[test]
    fn symmetric_relation_inserts_both_rows() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::A, Some("awn-00001-a"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::A, Some("awn-00002-a"))
            .unwrap();
        ed.add_synset_relation("awn-00001-a", SynsetRelType::Antonym, "awn-00002-a")
            .unwrap();
        assert_eq!(
            ed.get_synset("awn-00001-a").unwrap().relations[0].rel_type,
            "antonym"
        );
        assert_eq!(
            ed.get_synset("awn-00002-a").unwrap().relations[0].rel_type,
            "antonym"
        );
    }

    #[test]
    fn self_loop_relation_is_rejected() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        let err = ed
            .add_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00001-n")
            .unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        assert!(ed.get_synset("awn-00001-n").unwrap().relations.is_empty());
    }

    #[test]
    fn pre_existing_inverse_is_idempotent() {
        // Property 9: the inverse already exists; add succeeds, no duplicate.
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        // Forward-only insert of the hyponym edge.
        ed.add_synset_relation_with(
            "awn-00002-n",
            SynsetRelType::Hyponym,
            "awn-00001-n",
            None,
            false,
        )
        .unwrap();
        ed.add_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00002-n")
            .unwrap();
        assert_eq!(ed.get_synset("awn-00001-n").unwrap().relations.len(), 1);
        assert_eq!(ed.get_synset("awn-00002-n").unwrap().relations.len(), 1);
    }

    #[test]
    fn relation_metadata_is_inherited_by_inverse() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        let mut meta = Metadata::new();
        meta.insert("dc:source".into(), json!("manual"));
        ed.add_synset_relation_with(
            "awn-00001-n",
            SynsetRelType::Hypernym,
            "awn-00002-n",
            Some(meta.clone()),
            true,
        )
        .unwrap();
        let inverse = &ed.get_synset("awn-00002-n").unwrap().relations[0];
        assert_eq!(inverse.metadata.as_ref(), Some(&meta));
    }

    #[test]
    fn generated_synset_ids_are_monotone() {
        let mut ed = seeded();
        let a = ed.create_synset("awn", PartOfSpeech::N, None).unwrap();
        assert_eq!(a.id, "awn-00000001-n");
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00000700-n"))
            .unwrap();
        let b = ed.create_synset("awn", PartOfSpeech::V, None).unwrap();
        assert_eq!(b.id, "awn-00000701-v");
    }

    #[test]
    fn generated_entry_ids_fill_suffix_gaps() {
        let mut ed = seeded();
        let first = ed.create_entry("awn", "lion", PartOfSpeech::N, None).unwrap();
        assert_eq!(first.id, "awn-lion-n");
        let second = ed.create_entry("awn", "Lion", PartOfSpeech::N, None).unwrap();
        assert_eq!(second.id, "awn-lion-n-2");
        let third = ed.create_entry("awn", "lion", PartOfSpeech::N, None).unwrap();
        assert_eq!(third.id, "awn-lion-n-3");
        ed.delete_entry("awn-lion-n-2", false).unwrap();
        let refilled = ed.create_entry("awn", "lion", PartOfSpeech::N, None).unwrap();
        assert_eq!(refilled.id, "awn-lion-n-2");
    }

    #[test]
    fn entry_id_stem_preserves_unicode_letters() {
        let mut ed = seeded();
        let entry = ed
            .create_entry("awn", "Ég á þetta", PartOfSpeech::N, None)
            .unwrap();
        assert_eq!(entry.id, "awn-ég_á_þetta-n");
        let punctuated = ed
            .create_entry("awn", "o'clock (approx.)", PartOfSpeech::R, None)
            .unwrap();
        assert_eq!(punctuated.id, "awn-oclock_approx-r");
    }

    #[test]
    fn explicit_ids_must_carry_lexicon_prefix() {
        let mut ed = seeded();
        let err = ed
            .create_synset("awn", PartOfSpeech::N, Some("other-00001-n"))
            .unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        let err = ed
            .create_entry("awn", "lion", PartOfSpeech::N, Some("lion-n"))
            .unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected_across_entity_kinds() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        let err = ed
            .create_entry("awn", "lion", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap_err();
        assert!(matches!(err, EditorError::Duplicate { .. }));
    }

    #[test]
    fn duplicate_lexicon_id_is_rejected() {
        let mut ed = seeded();
        let err = ed
            .create_lexicon("awn", "Again", "arb", "x@y.z", "l", "5.0")
            .unwrap_err();
        assert!(matches!(err, EditorError::Duplicate { .. }));
    }

    #[test]
    fn lexicon_resolves_by_specifier_and_bare_id() {
        let ed = seeded();
        assert_eq!(ed.get_lexicon("awn").unwrap().version, "4.0");
        assert_eq!(ed.get_lexicon("awn:4.0").unwrap().id, "awn");
        assert!(ed.get_lexicon("awn:9.9").is_err());
    }

    #[test]
    fn cascade_delete_synset_leaves_no_references() {
        // Property 5.
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.add_definition("awn-00001-n", "A large feline", None, None)
            .unwrap();
        ed.add_synset_example("awn-00001-n", "the lion roared", None)
            .unwrap();
        ed.add_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00002-n")
            .unwrap();
        ed.create_entry("awn", "lion", PartOfSpeech::N, Some("awn-lion-n"))
            .unwrap();
        let sense = ed.add_sense("awn-lion-n", "awn-00001-n", None).unwrap();

        ed.delete_synset("awn-00001-n", true).unwrap();

        assert!(ed.get_synset("awn-00001-n").is_err());
        assert!(ed.get_sense(&sense.id).is_err());
        // The inverse edge on the surviving synset is gone too.
        assert!(ed.get_synset("awn-00002-n").unwrap().relations.is_empty());
        let entry = ed.get_entry("awn-lion-n").unwrap();
        assert!(entry.senses.is_empty());
        // History carries the per-sense DELETE and the synset DELETE.
        let ops: Vec<_> = ed
            .history_for(&sense.id)
            .unwrap()
            .into_iter()
            .map(|r| r.op)
            .collect();
        assert!(ops.contains(&ChangeOp::Delete));
    }

    #[test]
    fn non_cascade_delete_refuses_referenced_synset() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_entry("awn", "lion", PartOfSpeech::N, Some("awn-lion-n"))
            .unwrap();
        ed.add_sense("awn-lion-n", "awn-00001-n", None).unwrap();
        let err = ed.delete_synset("awn-00001-n", false).unwrap_err();
        assert!(matches!(err, EditorError::Relation { .. }));
        assert!(ed.get_synset("awn-00001-n").is_ok());
    }

    #[test]
    fn removing_last_sense_marks_synset_unlexicalized() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_entry("awn", "lion", PartOfSpeech::N, Some("awn-lion-n"))
            .unwrap();
        let sense = ed.add_sense("awn-lion-n", "awn-00001-n", None).unwrap();
        assert!(ed.get_synset("awn-00001-n").unwrap().lexicalized);
        ed.delete_sense(&sense.id).unwrap();
        assert!(!ed.get_synset("awn-00001-n").unwrap().lexicalized);
    }

    #[test]
    fn lemma_form_cannot_be_removed() {
        let mut ed = seeded();
        ed.create_entry("awn", "lion", PartOfSpeech::N, Some("awn-lion-n"))
            .unwrap();
        ed.add_form("awn-lion-n", "lions", None).unwrap();
        let err = ed.remove_form("awn-lion-n", "lion").unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        let entry = ed.remove_form("awn-lion-n", "lions").unwrap();
        assert_eq!(entry.forms.len(), 1);
    }

    #[test]
    fn set_lemma_updates_form_and_index_together() {
        let mut ed = seeded();
        ed.create_entry("awn", "lion", PartOfSpeech::N, Some("awn-lion-n"))
            .unwrap();
        ed.set_lemma("awn-lion-n", "Lioness").unwrap();
        let entry = ed.get_entry("awn-lion-n").unwrap();
        assert_eq!(entry.lemma(), "Lioness");
        assert_eq!(ed.find_entries("lioness", None).unwrap().len(), 1);
        assert!(ed.find_entries("lion", None).unwrap().is_empty());
    }

    #[test]
    fn proposed_ili_requires_long_definition() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        let err = ed.propose_ili("awn-00001-n", "too short").unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        let synset = ed
            .propose_ili("awn-00001-n", "A large tawny-coloured wild cat")
            .unwrap();
        assert_eq!(synset.ili, Some(IliRef::Proposed));
        assert!(synset.proposed_ili.is_some());
    }

    #[test]
    fn concrete_ili_conflicts_with_proposed_definition() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.propose_ili("awn-00001-n", "A large tawny-coloured wild cat")
            .unwrap();
        let err = ed.set_ili("awn-00001-n", Some("i12345")).unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        ed.retract_proposed_ili("awn-00001-n").unwrap();
        let synset = ed.set_ili("awn-00001-n", Some("i12345")).unwrap();
        assert_eq!(synset.ili, Some(IliRef::Id("i12345".into())));
    }

    #[test]
    fn update_history_captures_prior_and_new() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.update_synset(
            "awn-00001-n",
            SynsetUpdate {
                part_of_speech: Some(PartOfSpeech::V),
                ..Default::default()
            },
        )
        .unwrap();
        let records = ed.history_for("awn-00001-n").unwrap();
        let update = records
            .iter()
            .find(|r| r.op == ChangeOp::Update)
            .expect("update record");
        assert_eq!(update.field.as_deref(), Some("part_of_speech"));
        assert_eq!(update.prior, Some(json!("n")));
        assert_eq!(update.new, Some(json!("v")));
    }

    #[test]
    fn sense_ranks_stay_contiguous_after_delete() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        for lemma in ["lion", "tiger", "leopard"] {
            ed.create_entry("awn", lemma, PartOfSpeech::N, None).unwrap();
            ed.add_sense(&format!("awn-{}-n", lemma), "awn-00001-n", None)
                .unwrap();
        }
        ed.delete_sense("awn-tiger-n-1").unwrap();
        let senses = ed.senses_for_synset("awn-00001-n").unwrap();
        let ranks: Vec<u32> = senses.iter().map(|s| s.synset_rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }
}
