//! Export pipeline: reconstruct a WN-LMF tree from the store and emit it.
//!
//! Reconstruction uses bulk joins grouped in memory, so the number of
//! queries is constant regardless of entity count. Emission always
//! validates first: any error-severity finding aborts with an export error
//! and the store stays the source of truth. The emitted bytes are re-parsed
//! before they are handed to anyone.

use crate::db;
use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::lmf::{self, LmfVersion};
use crate::models::Metadata;
use crate::validate::{Scope, Severity};
use log::{debug, info, warn};
use rusqlite::params;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// The downstream consumer of committed lexicons: an opaque sink that takes
/// whole validated XML documents and can evict a lexicon by id.
pub trait ConsumerSink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Removes any lexicon with this id from the consumer's store. Removing
    /// an id the consumer does not know must succeed.
    fn remove_lexicon(&mut self, id: &str) -> std::result::Result<(), Self::Error>;

    /// Ingests a validated WN-LMF document from a file.
    fn add_document(&mut self, path: &Path) -> std::result::Result<(), Self::Error>;
}

fn meta_str(meta: &Option<Metadata>, key: &str) -> Option<String> {
    meta.as_ref()
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .map(String::from)
}

fn meta_f64(meta: &Option<Metadata>, key: &str) -> Option<f64> {
    meta.as_ref().and_then(|m| m.get(key)).and_then(Value::as_f64)
}

impl Editor {
    /// Reconstructs a WN-LMF tree for the given lexicons (all by default).
    pub fn export_document(&self, lexicons: Option<&[&str]>) -> Result<lmf::LexicalResource> {
        let keys: Vec<i64> = match lexicons {
            Some(specs) => specs
                .iter()
                .map(|spec| self.lexicon_key(spec))
                .collect::<Result<_>>()?,
            None => {
                let mut stmt = self.conn().prepare("SELECT id FROM lexicons ORDER BY id")?;
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?;
                keys
            }
        };
        let mut resource = lmf::LexicalResource {
            xmlns_dc: Some(lmf::DC_NAMESPACE.to_string()),
            lexicons: Vec::with_capacity(keys.len()),
        };
        for key in keys {
            resource.lexicons.push(self.export_lexicon(key)?);
        }
        Ok(resource)
    }

    /// Serializes the given lexicons after validating them. Error-severity
    /// findings abort; the emitted bytes are re-parsed as a final check.
    pub fn export_to_string(
        &self,
        lexicons: Option<&[&str]>,
        version: LmfVersion,
    ) -> Result<String> {
        let specs: Vec<String> = match lexicons {
            Some(specs) => specs.iter().map(|s| s.to_string()).collect(),
            None => self
                .lexicons()?
                .into_iter()
                .map(|l| l.specifier())
                .collect(),
        };
        for spec in &specs {
            let findings = self.validate(Scope::Lexicon(spec.clone()))?;
            let errors: Vec<_> = findings
                .iter()
                .filter(|f| f.severity == Severity::Error)
                .collect();
            if !errors.is_empty() {
                return Err(EditorError::Export(format!(
                    "lexicon '{}' has {} validation error(s); first: [{}] {}",
                    spec,
                    errors.len(),
                    errors[0].rule.code(),
                    errors[0].message
                )));
            }
        }

        let spec_refs: Vec<&str> = specs.iter().map(String::as_str).collect();
        let mut document = self.export_document(Some(&spec_refs))?;
        prune_for_version(&mut document, version);
        let xml = lmf::serialize_document(&document, version)?;
        // The emission must survive a re-parse before anyone consumes it.
        lmf::parse_document(&xml)
            .map_err(|e| EditorError::Export(format!("emitted XML failed to re-parse: {}", e)))?;
        info!(
            "Exported {} lexicon(s) as WN-LMF {} ({} bytes)",
            specs.len(),
            version.as_str(),
            xml.len()
        );
        Ok(xml)
    }

    /// Exports to a file on disk.
    pub fn export_file(
        &self,
        path: impl AsRef<Path>,
        lexicons: Option<&[&str]>,
        version: LmfVersion,
    ) -> Result<()> {
        let xml = self.export_to_string(lexicons, version)?;
        std::fs::write(path.as_ref(), xml)?;
        Ok(())
    }

    /// Commits one lexicon to a downstream consumer: export to a temporary
    /// XML file, evict the same-id lexicon from the consumer, re-add the
    /// file. If the re-add fails after eviction the editor's own store
    /// remains canonical and the commit can simply be re-run.
    pub fn commit_to<C: ConsumerSink>(&self, sink: &mut C, lexicon: &str) -> Result<()> {
        let record = self.get_lexicon(lexicon)?;
        let xml = self.export_to_string(Some(&[lexicon]), LmfVersion::V1_4)?;
        let mut file = tempfile::Builder::new()
            .prefix("wnedit-commit-")
            .suffix(".xml")
            .tempfile()?;
        file.write_all(xml.as_bytes())?;
        file.flush()?;
        sink.remove_lexicon(&record.id)
            .map_err(|e| EditorError::Export(format!("consumer removal failed: {}", e)))?;
        sink.add_document(file.path()).map_err(|e| {
            EditorError::Export(format!(
                "consumer re-add failed after removal: {}; the editor store remains canonical, \
                 re-run the commit",
                e
            ))
        })?;
        info!("Committed lexicon {} to consumer", record.specifier());
        Ok(())
    }

    /// Builds one lexicon subtree with a constant number of queries.
    fn export_lexicon(&self, key: i64) -> Result<lmf::Lexicon> {
        let record = self.fetch_lexicon(key)?;

        // Requires
        let mut stmt = self.conn().prepare(
            "SELECT depends_id, depends_version, url FROM lexicon_dependencies
             WHERE lexicon = ?1 ORDER BY id",
        )?;
        let requires: Vec<lmf::Requires> = stmt
            .query_map(params![key], |row| {
                Ok(lmf::Requires {
                    id: row.get(0)?,
                    version: row.get(1)?,
                    url: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        // Forms grouped by entry, pronunciations and tags grouped by form.
        let mut stmt = self.conn().prepare(
            "SELECT p.form, p.text, p.variety, p.notation, p.phonemic, p.audio
             FROM pronunciations p JOIN forms f ON f.id = p.form
             JOIN entries e ON e.id = f.entry WHERE e.lexicon = ?1 ORDER BY p.id",
        )?;
        let mut pronunciations: HashMap<i64, Vec<lmf::Pronunciation>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                lmf::Pronunciation {
                    text: row.get(1)?,
                    variety: row.get(2)?,
                    notation: row.get(3)?,
                    phonemic: row.get(4)?,
                    audio: row.get(5)?,
                },
            ))
        })? {
            let (form, pronunciation) = row?;
            pronunciations.entry(form).or_default().push(pronunciation);
        }

        let mut stmt = self.conn().prepare(
            "SELECT t.form, t.category, t.text FROM tags t JOIN forms f ON f.id = t.form
             JOIN entries e ON e.id = f.entry WHERE e.lexicon = ?1 ORDER BY t.id",
        )?;
        let mut tags: HashMap<i64, Vec<lmf::Tag>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                lmf::Tag {
                    category: row.get(1)?,
                    text: row.get(2)?,
                },
            ))
        })? {
            let (form, tag) = row?;
            tags.entry(form).or_default().push(tag);
        }

        let mut stmt = self.conn().prepare(
            "SELECT id, entry, public_id, written_form, script, rank FROM forms f
             WHERE f.entry IN (SELECT id FROM entries WHERE lexicon = ?1)
             ORDER BY f.entry, f.rank",
        )?;
        struct FormRow {
            key: i64,
            entry: i64,
            public_id: Option<String>,
            written_form: String,
            script: Option<String>,
            rank: i64,
        }
        let form_rows: Vec<FormRow> = stmt
            .query_map(params![key], |row| {
                Ok(FormRow {
                    key: row.get(0)?,
                    entry: row.get(1)?,
                    public_id: row.get(2)?,
                    written_form: row.get(3)?,
                    script: row.get(4)?,
                    rank: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        // Sense children grouped by sense surrogate.
        let mut stmt = self.conn().prepare(
            "SELECT x.sense, x.text, x.language, x.metadata FROM sense_examples x
             JOIN senses s ON s.id = x.sense WHERE s.lexicon = ?1 ORDER BY x.id",
        )?;
        let mut sense_examples: HashMap<i64, Vec<lmf::Example>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })? {
            let (sense, text, language, meta) = row?;
            let metadata = db::decode_metadata(meta)?;
            sense_examples.entry(sense).or_default().push(lmf::Example {
                language,
                dc_source: meta_str(&metadata, "dc:source"),
                text,
            });
        }

        let mut stmt = self.conn().prepare(
            "SELECT c.sense, c.value, c.metadata FROM counts c
             JOIN senses s ON s.id = c.sense WHERE s.lexicon = ?1 ORDER BY c.id",
        )?;
        let mut counts: HashMap<i64, Vec<lmf::Count>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })? {
            let (sense, value, meta) = row?;
            let metadata = db::decode_metadata(meta)?;
            counts.entry(sense).or_default().push(lmf::Count {
                dc_source: meta_str(&metadata, "dc:source"),
                value,
            });
        }

        // Relations out of senses, both spaces, merged per sense.
        let mut sense_relations: HashMap<i64, Vec<lmf::SenseRelation>> = HashMap::new();
        let mut stmt = self.conn().prepare(
            "SELECT r.source, r.rel_type, t.public_id, r.metadata FROM sense_relations r
             JOIN senses s ON s.id = r.source JOIN senses t ON t.id = r.target
             WHERE s.lexicon = ?1 ORDER BY r.id",
        )?;
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })? {
            let (source, rel_type, target, meta) = row?;
            let metadata = db::decode_metadata(meta)?;
            sense_relations
                .entry(source)
                .or_default()
                .push(lmf::SenseRelation {
                    rel_type,
                    target,
                    dc_type: meta_str(&metadata, "dc:type"),
                });
        }
        let mut stmt = self.conn().prepare(
            "SELECT r.source, r.rel_type, t.public_id, r.metadata FROM sense_synset_relations r
             JOIN senses s ON s.id = r.source JOIN synsets t ON t.id = r.target
             WHERE s.lexicon = ?1 ORDER BY r.id",
        )?;
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })? {
            let (source, rel_type, target, meta) = row?;
            let metadata = db::decode_metadata(meta)?;
            sense_relations
                .entry(source)
                .or_default()
                .push(lmf::SenseRelation {
                    rel_type,
                    target,
                    dc_type: meta_str(&metadata, "dc:type"),
                });
        }

        // Behaviour junctions: subcat per sense, and the behaviour list.
        let mut stmt = self.conn().prepare(
            "SELECT j.sense, b.public_id FROM sense_behaviours j
             JOIN syntactic_behaviours b ON b.id = j.behaviour
             WHERE b.lexicon = ?1 AND b.public_id IS NOT NULL ORDER BY b.id",
        )?;
        let mut subcats: HashMap<i64, Vec<String>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })? {
            let (sense, behaviour) = row?;
            subcats.entry(sense).or_default().push(behaviour);
        }
        let mut stmt = self.conn().prepare(
            "SELECT b.id, b.public_id, b.frame FROM syntactic_behaviours b
             WHERE b.lexicon = ?1 ORDER BY b.id",
        )?;
        let behaviour_rows: Vec<(i64, Option<String>, String)> = stmt
            .query_map(params![key], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        let mut stmt = self.conn().prepare(
            "SELECT j.behaviour, s.public_id FROM sense_behaviours j
             JOIN senses s ON s.id = j.sense
             JOIN syntactic_behaviours b ON b.id = j.behaviour
             WHERE b.lexicon = ?1 ORDER BY s.id",
        )?;
        let mut behaviour_senses: HashMap<i64, Vec<String>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })? {
            let (behaviour, sense) = row?;
            behaviour_senses.entry(behaviour).or_default().push(sense);
        }

        // Senses grouped by entry.
        struct SenseRow {
            key: i64,
            public_id: String,
            entry: i64,
            synset: String,
            entry_rank: u32,
            lexicalized: bool,
            adjposition: Option<String>,
        }
        let mut stmt = self.conn().prepare(
            "SELECT s.id, s.public_id, s.entry, y.public_id, s.entry_rank, s.lexicalized,
                    s.adjposition
             FROM senses s JOIN synsets y ON y.id = s.synset
             WHERE s.lexicon = ?1 ORDER BY s.entry, s.entry_rank",
        )?;
        let sense_rows: Vec<SenseRow> = stmt
            .query_map(params![key], |row| {
                Ok(SenseRow {
                    key: row.get(0)?,
                    public_id: row.get(1)?,
                    entry: row.get(2)?,
                    synset: row.get(3)?,
                    entry_rank: row.get(4)?,
                    lexicalized: row.get(5)?,
                    adjposition: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;
        let mut senses_by_entry: HashMap<i64, Vec<lmf::Sense>> = HashMap::new();
        for row in sense_rows {
            let subcat = subcats
                .get(&row.key)
                .map(|ids| ids.join(" "))
                .filter(|s| !s.is_empty());
            senses_by_entry
                .entry(row.entry)
                .or_default()
                .push(lmf::Sense {
                    id: row.public_id,
                    synset: row.synset,
                    n: Some(row.entry_rank),
                    lexicalized: row.lexicalized,
                    adjposition: row.adjposition,
                    subcat,
                    sense_relations: sense_relations.remove(&row.key).unwrap_or_default(),
                    examples: sense_examples.remove(&row.key).unwrap_or_default(),
                    counts: counts.remove(&row.key).unwrap_or_default(),
                });
        }

        // Entries.
        let mut stmt = self.conn().prepare(
            "SELECT id, public_id, part_of_speech, index_form FROM entries
             WHERE lexicon = ?1 ORDER BY id",
        )?;
        let entry_rows: Vec<(i64, String, String, Option<String>)> = stmt
            .query_map(params![key], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        let mut forms_by_entry: HashMap<i64, Vec<FormRow>> = HashMap::new();
        for form in form_rows {
            forms_by_entry.entry(form.entry).or_default().push(form);
        }
        let mut lexical_entries = Vec::with_capacity(entry_rows.len());
        for (entry_key, public_id, pos_str, index_form) in entry_rows {
            let pos = pos_str
                .parse()
                .map_err(|e| EditorError::Db(format!("invalid part of speech in store: {}", e)))?;
            let mut forms = forms_by_entry.remove(&entry_key).unwrap_or_default();
            if forms.is_empty() || forms[0].rank != 0 {
                return Err(EditorError::Db(format!(
                    "entry '{}' has no lemma form",
                    public_id
                )));
            }
            let lemma_row = forms.remove(0);
            let lemma = lmf::Lemma {
                written_form: lemma_row.written_form,
                part_of_speech: pos,
                script: lemma_row.script,
                pronunciations: pronunciations.remove(&lemma_row.key).unwrap_or_default(),
                tags: tags.remove(&lemma_row.key).unwrap_or_default(),
            };
            let forms = forms
                .into_iter()
                .map(|row| lmf::Form {
                    id: row.public_id,
                    written_form: row.written_form,
                    script: row.script,
                    pronunciations: pronunciations.remove(&row.key).unwrap_or_default(),
                    tags: tags.remove(&row.key).unwrap_or_default(),
                })
                .collect();
            lexical_entries.push(lmf::LexicalEntry {
                id: public_id,
                index: index_form,
                lemma,
                forms,
                senses: senses_by_entry.remove(&entry_key).unwrap_or_default(),
            });
        }

        // Synset children.
        let mut stmt = self.conn().prepare(
            "SELECT d.synset, d.text, d.language, n.public_id, d.metadata
             FROM definitions d JOIN synsets s ON s.id = d.synset
             LEFT JOIN senses n ON n.id = d.source_sense
             WHERE s.lexicon = ?1 ORDER BY d.id",
        )?;
        let mut definitions: HashMap<i64, Vec<lmf::Definition>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })? {
            let (synset, text, language, source_sense, meta) = row?;
            let metadata = db::decode_metadata(meta)?;
            definitions.entry(synset).or_default().push(lmf::Definition {
                language,
                source_sense,
                dc_source: meta_str(&metadata, "dc:source"),
                text,
            });
        }

        let mut stmt = self.conn().prepare(
            "SELECT x.synset, x.text, x.language, x.metadata FROM synset_examples x
             JOIN synsets s ON s.id = x.synset WHERE s.lexicon = ?1 ORDER BY x.id",
        )?;
        let mut synset_examples: HashMap<i64, Vec<lmf::Example>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })? {
            let (synset, text, language, meta) = row?;
            let metadata = db::decode_metadata(meta)?;
            synset_examples.entry(synset).or_default().push(lmf::Example {
                language,
                dc_source: meta_str(&metadata, "dc:source"),
                text,
            });
        }

        let mut stmt = self.conn().prepare(
            "SELECT r.source, r.rel_type, t.public_id, r.metadata FROM synset_relations r
             JOIN synsets s ON s.id = r.source JOIN synsets t ON t.id = r.target
             WHERE s.lexicon = ?1 ORDER BY r.id",
        )?;
        let mut synset_relations: HashMap<i64, Vec<lmf::SynsetRelation>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })? {
            let (source, rel_type, target, meta) = row?;
            let metadata = db::decode_metadata(meta)?;
            synset_relations
                .entry(source)
                .or_default()
                .push(lmf::SynsetRelation {
                    rel_type,
                    target,
                    dc_type: meta_str(&metadata, "dc:type"),
                });
        }

        let mut stmt = self.conn().prepare(
            "SELECT p.synset, p.definition, p.metadata FROM proposed_ilis p
             JOIN synsets s ON s.id = p.synset WHERE s.lexicon = ?1",
        )?;
        let mut ili_definitions: HashMap<i64, lmf::ILIDefinition> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })? {
            let (synset, text, meta) = row?;
            let metadata = db::decode_metadata(meta)?;
            ili_definitions.insert(
                synset,
                lmf::ILIDefinition {
                    dc_source: meta_str(&metadata, "dc:source"),
                    text,
                },
            );
        }

        let mut stmt = self.conn().prepare(
            "SELECT m.synset, m.public_id FROM senses m WHERE m.lexicon = ?1
             ORDER BY m.synset, m.synset_rank",
        )?;
        let mut members: HashMap<i64, Vec<String>> = HashMap::new();
        for row in stmt.query_map(params![key], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })? {
            let (synset, sense) = row?;
            members.entry(synset).or_default().push(sense);
        }

        let mut stmt = self.conn().prepare(
            "SELECT id, public_id, ili, part_of_speech, lexicalized, lexfile, metadata
             FROM synsets WHERE lexicon = ?1 ORDER BY id",
        )?;
        let synset_rows: Vec<(i64, String, Option<String>, String, bool, Option<String>, Option<String>)> =
            stmt.query_map(params![key], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;
        let mut synsets = Vec::with_capacity(synset_rows.len());
        for (synset_key, public_id, ili, pos_str, lexicalized, lexfile, meta) in synset_rows {
            let metadata = db::decode_metadata(meta)?;
            synsets.push(lmf::Synset {
                id: public_id,
                ili,
                part_of_speech: pos_str.parse().map_err(|e| {
                    EditorError::Db(format!("invalid part of speech in store: {}", e))
                })?,
                lexicalized,
                members: members.remove(&synset_key).unwrap_or_default().join(" "),
                lexfile,
                dc_source: meta_str(&metadata, "dc:source"),
                definitions: definitions.remove(&synset_key).unwrap_or_default(),
                ili_definition: ili_definitions.remove(&synset_key),
                synset_relations: synset_relations.remove(&synset_key).unwrap_or_default(),
                examples: synset_examples.remove(&synset_key).unwrap_or_default(),
            });
        }

        let syntactic_behaviours = behaviour_rows
            .into_iter()
            .map(|(behaviour_key, public_id, frame)| lmf::SyntacticBehaviour {
                // Behaviours without a public id fall back to listing their
                // member senses the pre-1.1 way.
                senses: if public_id.is_none() {
                    behaviour_senses
                        .remove(&behaviour_key)
                        .map(|senses| senses.join(" "))
                } else {
                    None
                }
                .filter(|s| !s.is_empty()),
                id: public_id,
                subcategorization_frame: frame,
            })
            .collect();

        debug!("Reconstructed lexicon {}:{}", record.id, record.version);
        Ok(lmf::Lexicon {
            id: record.id,
            label: record.label,
            language: record.language,
            email: record.email,
            license: record.license,
            version: record.version,
            url: record.url,
            citation: record.citation,
            logo: record.logo,
            status: meta_str(&record.metadata, "status"),
            confidence_score: meta_f64(&record.metadata, "confidenceScore"),
            dc_publisher: meta_str(&record.metadata, "dc:publisher"),
            dc_contributor: meta_str(&record.metadata, "dc:contributor"),
            requires,
            lexical_entries,
            synsets,
            syntactic_behaviours,
        })
    }
}

/// Strips constructs the target version cannot represent, with a diagnostic
/// per dropped category.
fn prune_for_version(resource: &mut lmf::LexicalResource, version: LmfVersion) {
    if version == LmfVersion::V1_4 {
        return;
    }
    let mut dropped: HashMap<&'static str, usize> = HashMap::new();
    for lexicon in &mut resource.lexicons {
        for synset in &mut lexicon.synsets {
            if synset.lexfile.take().is_some() {
                *dropped.entry("lexfile").or_default() += 1;
            }
            if !synset.members.is_empty() {
                synset.members = String::new();
                *dropped.entry("members").or_default() += 1;
            }
        }
        for entry in &mut lexicon.lexical_entries {
            if entry.index.take().is_some() {
                *dropped.entry("index").or_default() += 1;
            }
            for sense in &mut entry.senses {
                if sense.n.take().is_some() {
                    *dropped.entry("sense rank").or_default() += 1;
                }
            }
        }
        if version == LmfVersion::V1_0 {
            if lexicon.logo.take().is_some() {
                *dropped.entry("logo").or_default() += 1;
            }
            for entry in &mut lexicon.lexical_entries {
                let pronunciations = entry.lemma.pronunciations.drain(..).count()
                    + entry
                        .forms
                        .iter_mut()
                        .map(|f| f.pronunciations.drain(..).count())
                        .sum::<usize>();
                if pronunciations > 0 {
                    *dropped.entry("pronunciations").or_default() += pronunciations;
                }
                let tag_count = entry.lemma.tags.drain(..).count()
                    + entry
                        .forms
                        .iter_mut()
                        .map(|f| f.tags.drain(..).count())
                        .sum::<usize>();
                if tag_count > 0 {
                    *dropped.entry("tags").or_default() += tag_count;
                }
                for sense in &mut entry.senses {
                    let count_count = sense.counts.drain(..).count();
                    if count_count > 0 {
                        *dropped.entry("counts").or_default() += count_count;
                    }
                }
            }
        }
    }
    for (category, n) in dropped {
        warn!(
            "Dropped {} {} not representable in WN-LMF {}",
            n,
            category,
            version.as_str()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartOfSpeech;
    use crate::relations::SynsetRelType;
    use std::collections::BTreeSet;

    fn populated() -> Editor {
        let mut ed = Editor::open_in_memory().unwrap();
        ed.create_lexicon(
            "awn",
            "Arabic WordNet",
            "arb",
            "wn@example.org",
            "https://creativecommons.org/licenses/by/4.0/",
            "4.0",
        )
        .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.add_definition("awn-00001-n", "A large feline", None, None)
            .unwrap();
        ed.add_definition("awn-00002-n", "A wild animal", None, None)
            .unwrap();
        ed.add_synset_example("awn-00001-n", "the lion roared", None)
            .unwrap();
        ed.add_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00002-n")
            .unwrap();
        ed.create_entry("awn", "lion", PartOfSpeech::N, Some("awn-lion-n"))
            .unwrap();
        ed.add_form("awn-lion-n", "lions", None).unwrap();
        ed.add_sense("awn-lion-n", "awn-00001-n", None).unwrap();
        ed.create_entry("awn", "animal", PartOfSpeech::N, Some("awn-animal-n"))
            .unwrap();
        ed.add_sense("awn-animal-n", "awn-00002-n", None).unwrap();
        ed.add_count("awn-lion-n-1", 17).unwrap();
        ed.set_ili("awn-00002-n", Some("i90000")).unwrap();
        ed
    }

    /// Normalized view of a document for entity-set comparison.
    fn entity_view(resource: &lmf::LexicalResource) -> BTreeSet<String> {
        let mut view = BTreeSet::new();
        for lexicon in &resource.lexicons {
            view.insert(format!("lexicon {} {}", lexicon.id, lexicon.version));
            for entry in &lexicon.lexical_entries {
                view.insert(format!(
                    "entry {} {} {}",
                    entry.id,
                    entry.lemma.written_form,
                    entry.lemma.part_of_speech.as_str()
                ));
                for form in &entry.forms {
                    view.insert(format!("form {} {}", entry.id, form.written_form));
                }
                for sense in &entry.senses {
                    view.insert(format!("sense {} {}", sense.id, sense.synset));
                    for relation in &sense.sense_relations {
                        view.insert(format!(
                            "srel {} {} {}",
                            sense.id, relation.rel_type, relation.target
                        ));
                    }
                    for count in &sense.counts {
                        view.insert(format!("count {} {}", sense.id, count.value));
                    }
                }
            }
            for synset in &lexicon.synsets {
                view.insert(format!(
                    "synset {} {} {:?}",
                    synset.id,
                    synset.part_of_speech.as_str(),
                    synset.ili
                ));
                for definition in &synset.definitions {
                    view.insert(format!("def {} {}", synset.id, definition.text));
                }
                for example in &synset.examples {
                    view.insert(format!("ex {} {}", synset.id, example.text));
                }
                for relation in &synset.synset_relations {
                    view.insert(format!(
                        "rel {} {} {}",
                        synset.id, relation.rel_type, relation.target
                    ));
                }
            }
        }
        view
    }

    #[test]
    fn round_trip_preserves_entity_sets() {
        // Property 6: import(export(store)) is store-equivalent.
        let ed = populated();
        let exported = ed.export_document(None).unwrap();
        let xml = ed.export_to_string(None, LmfVersion::V1_4).unwrap();

        let mut second = Editor::open_in_memory().unwrap();
        let reparsed = lmf::parse_document(&xml).unwrap();
        second.import_document(&reparsed, false).unwrap();
        let re_exported = second.export_document(None).unwrap();

        assert_eq!(entity_view(&exported), entity_view(&re_exported));
    }

    #[test]
    fn export_emits_members_and_ranks() {
        let ed = populated();
        let document = ed.export_document(None).unwrap();
        let lexicon = &document.lexicons[0];
        let synset = lexicon
            .synsets
            .iter()
            .find(|s| s.id == "awn-00001-n")
            .unwrap();
        assert_eq!(synset.members, "awn-lion-n-1");
        let entry = lexicon
            .lexical_entries
            .iter()
            .find(|e| e.id == "awn-lion-n")
            .unwrap();
        assert_eq!(entry.senses[0].n, Some(1));
    }

    #[test]
    fn export_refuses_error_findings() {
        let mut ed = populated();
        // A synset with no definitions is an error-severity finding.
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00003-n"))
            .unwrap();
        let err = ed.export_to_string(None, LmfVersion::V1_4).unwrap_err();
        assert!(matches!(err, EditorError::Export(_)));
    }

    #[test]
    fn downgrade_to_1_0_drops_unrepresentable_data() {
        let ed = populated();
        let xml = ed.export_to_string(None, LmfVersion::V1_0).unwrap();
        assert!(xml.contains("WN-LMF-1.0.dtd"));
        let document = lmf::parse_document(&xml).unwrap();
        let lexicon = &document.lexicons[0];
        assert!(lexicon.synsets.iter().all(|s| s.members.is_empty()));
        assert!(
            lexicon
                .lexical_entries
                .iter()
                .flat_map(|e| &e.senses)
                .all(|s| s.counts.is_empty() && s.n.is_none())
        );
    }

    struct RecordingSink {
        removed: Vec<String>,
        added: Vec<String>,
        fail_add: bool,
    }

    impl ConsumerSink for RecordingSink {
        type Error = std::io::Error;

        fn remove_lexicon(&mut self, id: &str) -> std::io::Result<()> {
            self.removed.push(id.to_string());
            Ok(())
        }

        fn add_document(&mut self, path: &Path) -> std::io::Result<()> {
            if self.fail_add {
                return Err(std::io::Error::other("sink unavailable"));
            }
            self.added.push(std::fs::read_to_string(path)?);
            Ok(())
        }
    }

    #[test]
    fn commit_exports_removes_then_adds() {
        let ed = populated();
        let mut sink = RecordingSink {
            removed: Vec::new(),
            added: Vec::new(),
            fail_add: false,
        };
        ed.commit_to(&mut sink, "awn").unwrap();
        assert_eq!(sink.removed, vec!["awn"]);
        assert_eq!(sink.added.len(), 1);
        assert!(sink.added[0].contains("awn-00001-n"));
    }

    #[test]
    fn failed_commit_reports_export_error_and_keeps_store() {
        let ed = populated();
        let mut sink = RecordingSink {
            removed: Vec::new(),
            added: Vec::new(),
            fail_add: true,
        };
        let err = ed.commit_to(&mut sink, "awn").unwrap_err();
        assert!(matches!(err, EditorError::Export(_)));
        // The editor store is untouched and a retry would see it.
        assert!(ed.get_synset("awn-00001-n").is_ok());
    }
}
