//! Import pipeline: ingest a parsed WN-LMF tree into the store.
//!
//! Rows are inserted in foreign-key dependency order: lexicons, their
//! dependencies, synsets (with placeholder ILI rows for presupposed
//! references), entries, forms, pronunciations, tags, senses, adjpositions,
//! counts, syntactic behaviours, relations, then definitions (which may
//! reference a source sense) and examples. The whole import is one
//! transaction; a failing document leaves the store untouched.

use crate::db;
use crate::editor::{Editor, RelSpace, kind};
use crate::error::{EditorError, Result};
use crate::history::ChangeOp;
use crate::lmf;
use crate::models::{Lexicon, Metadata};
use crate::relations::is_sense_synset_rel_type;
use log::{debug, info};
use rusqlite::params;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Builds the stored metadata mapping for an element's Dublin Core-ish
/// attributes. Empty mappings collapse to NULL.
fn attr_metadata(pairs: &[(&str, Option<serde_json::Value>)]) -> Option<Metadata> {
    let mut meta = Metadata::new();
    for (key, value) in pairs {
        if let Some(value) = value {
            meta.insert((*key).to_string(), value.clone());
        }
    }
    if meta.is_empty() { None } else { Some(meta) }
}

impl Editor {
    /// Reads and ingests a WN-LMF XML file. Bulk loads skip the history log.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<Lexicon>> {
        let xml = fs::read_to_string(path.as_ref())?;
        let resource = lmf::parse_document(&xml)
            .map_err(|e| EditorError::Import(format!("failed to parse document: {}", e)))?;
        self.import_document(&resource, false)
    }

    /// Ingests a parsed document. With `record_history` set, one CREATE
    /// record is written per imported lexicon, synset, entry and sense;
    /// without it the log stays quiet for the bulk load.
    pub fn import_document(
        &mut self,
        resource: &lmf::LexicalResource,
        record_history: bool,
    ) -> Result<Vec<Lexicon>> {
        let previous = self.set_history_recording(record_history);
        let result = self.with_tx(|ed| ed.ingest(resource));
        self.set_history_recording(previous);
        result
    }

    fn ingest(&mut self, resource: &lmf::LexicalResource) -> Result<Vec<Lexicon>> {
        info!(
            "Importing {} lexicon(s) from WN-LMF document...",
            resource.lexicons.len()
        );
        let mut imported = Vec::new();
        for lexicon in &resource.lexicons {
            imported.push(self.ingest_lexicon(lexicon)?);
        }
        info!("Import complete.");
        Ok(imported)
    }

    fn ingest_lexicon(&mut self, lexicon: &lmf::Lexicon) -> Result<Lexicon> {
        let existing: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM lexicons WHERE public_id = ?1",
            params![lexicon.id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(EditorError::duplicate(kind::LEXICON, lexicon.id.clone()));
        }

        let metadata = attr_metadata(&[
            ("status", lexicon.status.as_deref().map(|v| json!(v))),
            (
                "confidenceScore",
                lexicon.confidence_score.map(|v| json!(v)),
            ),
            (
                "dc:publisher",
                lexicon.dc_publisher.as_deref().map(|v| json!(v)),
            ),
            (
                "dc:contributor",
                lexicon.dc_contributor.as_deref().map(|v| json!(v)),
            ),
        ]);
        self.conn().execute(
            "INSERT INTO lexicons (public_id, label, language, email, license, version,
                                   url, citation, logo, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                lexicon.id,
                lexicon.label,
                lexicon.language,
                lexicon.email,
                lexicon.license,
                lexicon.version,
                lexicon.url,
                lexicon.citation,
                lexicon.logo,
                db::encode_metadata(metadata.as_ref())?,
            ],
        )?;
        let lexicon_key = self.conn().last_insert_rowid();
        self.record(
            kind::LEXICON,
            &lexicon.id,
            None,
            ChangeOp::Create,
            None,
            Some(json!({ "id": lexicon.id, "version": lexicon.version })),
        )?;

        for requires in &lexicon.requires {
            self.conn().execute(
                "INSERT INTO lexicon_dependencies (lexicon, depends_id, depends_version, url)
                 VALUES (?1, ?2, ?3, ?4)",
                params![lexicon_key, requires.id, requires.version, requires.url],
            )?;
        }

        // Synsets first; senses and relations resolve against them.
        let mut synset_keys: HashMap<&str, i64> = HashMap::new();
        let mut members_order: HashMap<&str, Vec<String>> = HashMap::new();
        for synset in &lexicon.synsets {
            if let Some(ili) = synset.ili.as_deref() {
                if ili != "in" {
                    // Placeholder row for a presupposed reference.
                    self.ensure_ili_row(ili)?;
                }
            }
            let metadata = attr_metadata(&[(
                "dc:source",
                synset.dc_source.as_deref().map(|v| json!(v)),
            )]);
            self.conn().execute(
                "INSERT INTO synsets (public_id, lexicon, ili, part_of_speech, lexicalized,
                                      lexfile, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    synset.id,
                    lexicon_key,
                    synset.ili,
                    synset.part_of_speech.as_str(),
                    synset.lexicalized,
                    synset.lexfile,
                    db::encode_metadata(metadata.as_ref())?,
                ],
            )?;
            synset_keys.insert(&synset.id, self.conn().last_insert_rowid());
            members_order.insert(&synset.id, lmf::split_id_list(&synset.members));
            self.record(
                kind::SYNSET,
                &synset.id,
                None,
                ChangeOp::Create,
                None,
                Some(json!({ "id": synset.id, "part_of_speech": synset.part_of_speech.as_str() })),
            )?;
        }

        // Entries with their forms, pronunciations and tags.
        let mut entry_keys: HashMap<&str, i64> = HashMap::new();
        for entry in &lexicon.lexical_entries {
            self.conn().execute(
                "INSERT INTO entries (public_id, lexicon, part_of_speech, index_form, lemma_lower)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.id,
                    lexicon_key,
                    entry.lemma.part_of_speech.as_str(),
                    entry.index,
                    entry.lemma.written_form.to_lowercase(),
                ],
            )?;
            let entry_key = self.conn().last_insert_rowid();
            entry_keys.insert(&entry.id, entry_key);

            self.conn().execute(
                "INSERT INTO forms (entry, written_form, script, rank) VALUES (?1, ?2, ?3, 0)",
                params![entry_key, entry.lemma.written_form, entry.lemma.script],
            )?;
            let lemma_form_key = self.conn().last_insert_rowid();
            self.ingest_form_details(
                lemma_form_key,
                &entry.lemma.pronunciations,
                &entry.lemma.tags,
            )?;
            for (i, form) in entry.forms.iter().enumerate() {
                self.conn().execute(
                    "INSERT INTO forms (public_id, entry, written_form, script, rank)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![form.id, entry_key, form.written_form, form.script, i as i64 + 1],
                )?;
                let form_key = self.conn().last_insert_rowid();
                self.ingest_form_details(form_key, &form.pronunciations, &form.tags)?;
            }
            self.record(
                kind::ENTRY,
                &entry.id,
                None,
                ChangeOp::Create,
                None,
                Some(json!({ "id": entry.id, "lemma": entry.lemma.written_form })),
            )?;
        }

        // Senses resolve synsets by (id, lexicon) and fall back to a global
        // lookup for cross-lexicon references.
        let mut sense_keys: HashMap<&str, i64> = HashMap::new();
        let mut appended: HashMap<i64, i64> = HashMap::new();
        for entry in &lexicon.lexical_entries {
            let entry_key = entry_keys[entry.id.as_str()];
            for (position, sense) in entry.senses.iter().enumerate() {
                let synset_key = match synset_keys.get(sense.synset.as_str()) {
                    Some(key) => *key,
                    None => self.synset_key(&sense.synset).map_err(|_| {
                        EditorError::Import(format!(
                            "sense '{}' references unknown synset '{}'",
                            sense.id, sense.synset
                        ))
                    })?,
                };
                let entry_rank = sense.n.map(i64::from).unwrap_or(position as i64 + 1);
                let synset_rank = match members_order
                    .get(sense.synset.as_str())
                    .and_then(|members| members.iter().position(|m| m == &sense.id))
                {
                    Some(index) => index as i64 + 1,
                    None => {
                        let counter = appended.entry(synset_key).or_insert(0);
                        *counter += 1;
                        let listed = members_order
                            .get(sense.synset.as_str())
                            .map(|m| m.len() as i64)
                            .unwrap_or(0);
                        listed + *counter
                    }
                };
                self.conn().execute(
                    "INSERT INTO senses (public_id, lexicon, entry, synset, entry_rank,
                                         synset_rank, lexicalized, adjposition)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        sense.id,
                        lexicon_key,
                        entry_key,
                        synset_key,
                        entry_rank,
                        synset_rank,
                        sense.lexicalized,
                        sense.adjposition,
                    ],
                )?;
                let sense_key = self.conn().last_insert_rowid();
                sense_keys.insert(&sense.id, sense_key);
                for count in &sense.counts {
                    let metadata = attr_metadata(&[(
                        "dc:source",
                        count.dc_source.as_deref().map(|v| json!(v)),
                    )]);
                    self.conn().execute(
                        "INSERT INTO counts (sense, value, metadata) VALUES (?1, ?2, ?3)",
                        params![sense_key, count.value, db::encode_metadata(metadata.as_ref())?],
                    )?;
                }
                for example in &sense.examples {
                    let metadata = attr_metadata(&[(
                        "dc:source",
                        example.dc_source.as_deref().map(|v| json!(v)),
                    )]);
                    self.conn().execute(
                        "INSERT INTO sense_examples (sense, text, language, metadata)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            sense_key,
                            example.text,
                            example.language,
                            db::encode_metadata(metadata.as_ref())?
                        ],
                    )?;
                }
                self.record(
                    kind::SENSE,
                    &sense.id,
                    None,
                    ChangeOp::Create,
                    None,
                    Some(json!({ "id": sense.id, "synset": sense.synset })),
                )?;
            }
        }

        // Syntactic behaviours, with both the 1.4 subcat references and the
        // pre-1.1 senses attribute feeding the junction table.
        let mut behaviour_keys: HashMap<&str, i64> = HashMap::new();
        for behaviour in &lexicon.syntactic_behaviours {
            self.conn().execute(
                "INSERT INTO syntactic_behaviours (public_id, lexicon, frame) VALUES (?1, ?2, ?3)",
                params![behaviour.id, lexicon_key, behaviour.subcategorization_frame],
            )?;
            let behaviour_key = self.conn().last_insert_rowid();
            if let Some(id) = behaviour.id.as_deref() {
                behaviour_keys.insert(id, behaviour_key);
            }
            if let Some(sense_list) = behaviour.senses.as_deref() {
                for sense_id in lmf::split_id_list(sense_list) {
                    let sense_key = sense_keys.get(sense_id.as_str()).ok_or_else(|| {
                        EditorError::Import(format!(
                            "syntactic behaviour references unknown sense '{}'",
                            sense_id
                        ))
                    })?;
                    self.conn().execute(
                        "INSERT INTO sense_behaviours (sense, behaviour) VALUES (?1, ?2)",
                        params![sense_key, behaviour_key],
                    )?;
                }
            }
        }
        for entry in &lexicon.lexical_entries {
            for sense in &entry.senses {
                let Some(subcat) = sense.subcat.as_deref() else {
                    continue;
                };
                let sense_key = sense_keys[sense.id.as_str()];
                for behaviour_id in lmf::split_id_list(subcat) {
                    let behaviour_key =
                        behaviour_keys.get(behaviour_id.as_str()).ok_or_else(|| {
                            EditorError::Import(format!(
                                "sense '{}' references unknown syntactic behaviour '{}'",
                                sense.id, behaviour_id
                            ))
                        })?;
                    self.conn().execute(
                        "INSERT OR IGNORE INTO sense_behaviours (sense, behaviour)
                         VALUES (?1, ?2)",
                        params![sense_key, behaviour_key],
                    )?;
                }
            }
        }

        // Relations, verbatim from the document: no auto-inverse here, the
        // validation engine reports missing mirrors instead.
        for synset in &lexicon.synsets {
            let source_key = synset_keys[synset.id.as_str()];
            for relation in &synset.synset_relations {
                let target_key = match synset_keys.get(relation.target.as_str()) {
                    Some(key) => *key,
                    None => self.synset_key(&relation.target).map_err(|_| {
                        EditorError::Import(format!(
                            "synset relation target '{}' not found",
                            relation.target
                        ))
                    })?,
                };
                let metadata = attr_metadata(&[(
                    "dc:type",
                    relation.dc_type.as_deref().map(|v| json!(v)),
                )]);
                self.insert_relation_row(
                    RelSpace::Synset,
                    source_key,
                    target_key,
                    &relation.rel_type,
                    metadata.as_ref(),
                )?;
            }
        }
        for entry in &lexicon.lexical_entries {
            for sense in &entry.senses {
                let source_key = sense_keys[sense.id.as_str()];
                for relation in &sense.sense_relations {
                    let metadata = attr_metadata(&[(
                        "dc:type",
                        relation.dc_type.as_deref().map(|v| json!(v)),
                    )]);
                    if let Some(target_key) = sense_keys
                        .get(relation.target.as_str())
                        .copied()
                        .or_else(|| self.sense_key(&relation.target).ok())
                    {
                        self.insert_relation_row(
                            RelSpace::Sense,
                            source_key,
                            target_key,
                            &relation.rel_type,
                            metadata.as_ref(),
                        )?;
                    } else if let Some(target_key) = synset_keys
                        .get(relation.target.as_str())
                        .copied()
                        .or_else(|| self.synset_key(&relation.target).ok())
                    {
                        if !is_sense_synset_rel_type(&relation.rel_type) {
                            debug!(
                                "Sense relation '{}' from '{}' targets a synset with a \
                                 sense-only type; keeping it for validation to report",
                                relation.rel_type, sense.id
                            );
                        }
                        self.insert_relation_row(
                            RelSpace::SenseSynset,
                            source_key,
                            target_key,
                            &relation.rel_type,
                            metadata.as_ref(),
                        )?;
                    } else {
                        return Err(EditorError::Import(format!(
                            "sense relation target '{}' not found",
                            relation.target
                        )));
                    }
                }
            }
        }

        // Definitions come after senses because of sourceSense references.
        for synset in &lexicon.synsets {
            let synset_key = synset_keys[synset.id.as_str()];
            for definition in &synset.definitions {
                let source_sense = definition
                    .source_sense
                    .as_deref()
                    .map(|id| {
                        sense_keys.get(id).copied().ok_or_else(|| {
                            EditorError::Import(format!(
                                "definition of '{}' references unknown sense '{}'",
                                synset.id, id
                            ))
                        })
                    })
                    .transpose()?;
                let metadata = attr_metadata(&[(
                    "dc:source",
                    definition.dc_source.as_deref().map(|v| json!(v)),
                )]);
                self.conn().execute(
                    "INSERT INTO definitions (synset, text, language, source_sense, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        synset_key,
                        definition.text,
                        definition.language,
                        source_sense,
                        db::encode_metadata(metadata.as_ref())?
                    ],
                )?;
            }
            for example in &synset.examples {
                let metadata = attr_metadata(&[(
                    "dc:source",
                    example.dc_source.as_deref().map(|v| json!(v)),
                )]);
                self.conn().execute(
                    "INSERT INTO synset_examples (synset, text, language, metadata)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        synset_key,
                        example.text,
                        example.language,
                        db::encode_metadata(metadata.as_ref())?
                    ],
                )?;
            }
            if let Some(ili_definition) = &synset.ili_definition {
                let metadata = attr_metadata(&[(
                    "dc:source",
                    ili_definition.dc_source.as_deref().map(|v| json!(v)),
                )]);
                self.conn().execute(
                    "INSERT INTO proposed_ilis (synset, definition, metadata)
                     VALUES (?1, ?2, ?3)",
                    params![
                        synset_key,
                        ili_definition.text,
                        db::encode_metadata(metadata.as_ref())?
                    ],
                )?;
            }
        }

        debug!(
            "Imported lexicon {}:{} ({} entries, {} synsets)",
            lexicon.id,
            lexicon.version,
            lexicon.lexical_entries.len(),
            lexicon.synsets.len()
        );
        self.fetch_lexicon(lexicon_key)
    }

    fn ingest_form_details(
        &mut self,
        form_key: i64,
        pronunciations: &[lmf::Pronunciation],
        tags: &[lmf::Tag],
    ) -> Result<()> {
        for pronunciation in pronunciations {
            self.conn().execute(
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
        }
        for tag in tags {
            self.conn().execute(
                "INSERT INTO tags (form, category, text) VALUES (?1, ?2, ?3)",
                params![form_key, tag.category, tag.text],
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IliRef, PartOfSpeech};

    const FIXTURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<LexicalResource xmlns:dc="http://purl.org/dc/elements/1.1/">
  <Lexicon id="test-en" label="Test Wordnet" language="en"
           email="test@example.com" license="https://example.com/license" version="1.0">
    <LexicalEntry id="test-en-cat-n">
      <Lemma writtenForm="cat" partOfSpeech="n">
        <Pronunciation variety="en-GB-fonipa">kat</Pronunciation>
      </Lemma>
      <Form writtenForm="cats"/>
      <Sense id="test-en-cat-n-1" synset="test-en-1-n" subcat="test-en-sb-1">
        <SenseRelation relType="derivation" target="test-en-feline-a-1"/>
        <Count dc:source="corpus">42</Count>
      </Sense>
    </LexicalEntry>
    <LexicalEntry id="test-en-feline-a">
      <Lemma writtenForm="feline" partOfSpeech="a"/>
      <Sense id="test-en-feline-a-1" synset="test-en-2-a">
        <SenseRelation relType="derivation" target="test-en-cat-n-1"/>
        <SenseRelation relType="domain_topic" target="test-en-3-n"/>
      </Sense>
    </LexicalEntry>
    <Synset id="test-en-1-n" partOfSpeech="n" ili="i12345" members="test-en-cat-n-1" lexfile="noun.animal">
      <Definition dc:source="PWN">A small domesticated mammal.</Definition>
      <SynsetRelation relType="hypernym" target="test-en-3-n"/>
      <Example>the cat sat on the mat</Example>
    </Synset>
    <Synset id="test-en-2-a" partOfSpeech="a" ili="in" members="test-en-feline-a-1">
      <Definition>Of or relating to cats.</Definition>
      <ILIDefinition>Of, relating to, or resembling cats.</ILIDefinition>
    </Synset>
    <Synset id="test-en-3-n" partOfSpeech="n" members="">
      <Definition>An animal of any kind.</Definition>
      <SynsetRelation relType="hyponym" target="test-en-1-n"/>
    </Synset>
    <SyntacticBehaviour id="test-en-sb-1" subcategorizationFrame="Somebody %s something"/>
  </Lexicon>
</LexicalResource>
"#;

    fn imported() -> Editor {
        let mut ed = Editor::open_in_memory().unwrap();
        let resource = lmf::parse_document(FIXTURE).unwrap();
        ed.import_document(&resource, false).unwrap();
        ed
    }

    #[test]
    fn import_preserves_entities_and_attributes() {
        let ed = imported();
        let lexicon = ed.get_lexicon("test-en").unwrap();
        assert_eq!(lexicon.specifier(), "test-en:1.0");

        let synset = ed.get_synset("test-en-1-n").unwrap();
        assert_eq!(synset.ili, Some(IliRef::Id("i12345".into())));
        assert_eq!(synset.lexfile.as_deref(), Some("noun.animal"));
        assert_eq!(synset.definitions.len(), 1);
        assert_eq!(
            synset.definitions[0].metadata.as_ref().unwrap()["dc:source"],
            serde_json::json!("PWN")
        );
        assert_eq!(synset.examples[0].text, "the cat sat on the mat");
        assert_eq!(synset.members, vec!["test-en-cat-n-1"]);

        let entry = ed.get_entry("test-en-cat-n").unwrap();
        assert_eq!(entry.lemma(), "cat");
        assert_eq!(entry.part_of_speech, PartOfSpeech::N);
        assert_eq!(entry.forms.len(), 2);
        assert_eq!(entry.forms[1].written_form, "cats");
        assert_eq!(entry.forms[0].pronunciations[0].text, "kat");

        let sense = ed.get_sense("test-en-cat-n-1").unwrap();
        assert_eq!(sense.counts[0].value, 42);
        assert_eq!(sense.relations[0].rel_type, "derivation");
    }

    #[test]
    fn import_routes_sense_synset_relations() {
        let ed = imported();
        let sense = ed.get_sense("test-en-feline-a-1").unwrap();
        assert_eq!(sense.synset_relations.len(), 1);
        assert_eq!(sense.synset_relations[0].rel_type, "domain_topic");
        assert_eq!(sense.synset_relations[0].target, "test-en-3-n");
    }

    #[test]
    fn import_keeps_proposed_ili_definition() {
        let ed = imported();
        let synset = ed.get_synset("test-en-2-a").unwrap();
        assert_eq!(synset.ili, Some(IliRef::Proposed));
        assert_eq!(
            synset.proposed_ili.as_ref().unwrap().definition,
            "Of, relating to, or resembling cats."
        );
    }

    #[test]
    fn import_creates_presupposed_ili_placeholder() {
        let ed = imported();
        let status: String = ed
            .conn()
            .query_row(
                "SELECT status FROM ilis WHERE id = 'i12345'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(status, "presupposed");
    }

    #[test]
    fn import_wires_syntactic_behaviours() {
        let ed = imported();
        let behaviours = ed.syntactic_behaviours("test-en").unwrap();
        assert_eq!(behaviours.len(), 1);
        assert_eq!(behaviours[0].frame, "Somebody %s something");
        assert_eq!(behaviours[0].senses, vec!["test-en-cat-n-1"]);
    }

    #[test]
    fn duplicate_lexicon_import_fails_and_rolls_back() {
        let mut ed = imported();
        let resource = lmf::parse_document(FIXTURE).unwrap();
        let err = ed.import_document(&resource, false).unwrap_err();
        assert!(matches!(err, EditorError::Duplicate { .. }));
        // Still exactly one copy.
        assert_eq!(ed.lexicons().unwrap().len(), 1);
    }

    #[test]
    fn import_suppresses_history_by_default() {
        let ed = imported();
        assert!(ed.history_recent(100).unwrap().is_empty());
    }

    #[test]
    fn import_can_record_history() {
        let mut ed = Editor::open_in_memory().unwrap();
        let resource = lmf::parse_document(FIXTURE).unwrap();
        ed.import_document(&resource, true).unwrap();
        let records = ed.history_recent(100).unwrap();
        assert!(records.iter().any(|r| r.entity_id == "test-en"));
        assert!(records.iter().any(|r| r.entity_id == "test-en-1-n"));
    }

    #[test]
    fn dangling_relation_target_fails_import() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<LexicalResource>
  <Lexicon id="test-en" label="T" language="en" email="a@b.c" license="l" version="1">
    <Synset id="test-en-1-n" partOfSpeech="n">
      <Definition>Something described.</Definition>
      <SynsetRelation relType="hypernym" target="test-en-404-n"/>
    </Synset>
  </Lexicon>
</LexicalResource>"#;
        let mut ed = Editor::open_in_memory().unwrap();
        let resource = lmf::parse_document(xml).unwrap();
        let err = ed.import_document(&resource, false).unwrap_err();
        assert!(matches!(err, EditorError::Import(_)));
        assert!(ed.lexicons().unwrap().is_empty());
    }
}
