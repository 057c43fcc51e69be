//! Compound operations: synset merge, synset split, sense move.
//!
//! Each runs as one transaction and reconciles senses, relations, ILI links
//! and lexicalization flags in a single step; a failure anywhere leaves the
//! store untouched.

use crate::editor::{Editor, RelSpace, kind};
use crate::error::{EditorError, Result};
use crate::history::ChangeOp;
use crate::models::{IliRef, Sense, Synset};
use log::info;
use rusqlite::params;
use serde_json::json;

impl Editor {
    /// Merges `source` into `target`.
    ///
    /// All senses of `source` are repointed to `target` (appended after its
    /// existing members), relations in both directions are repointed with
    /// triples that collide after repointing dropped, and definitions and
    /// examples are appended. A concrete ILI on both operands is a conflict;
    /// one held only by `source` transfers. `source` is deleted at the end.
    pub fn merge_synsets(&mut self, source: &str, target: &str) -> Result<Synset> {
        let skey = self.synset_key(source)?;
        let tkey = self.synset_key(target)?;
        if skey == tkey {
            return Err(EditorError::validation(
                kind::SYNSET,
                source,
                "cannot merge a synset into itself",
            ));
        }
        if self.owning_lexicon("synsets", skey)? != self.owning_lexicon("synsets", tkey)? {
            return Err(EditorError::validation(
                kind::SYNSET,
                source,
                "merge operands belong to different lexicons",
            ));
        }
        self.with_tx(|ed| {
            let source_record = ed.fetch_synset(skey)?;
            let target_record = ed.fetch_synset(tkey)?;

            // ILI resolution comes first: a conflict must abort before any
            // row has moved.
            match (&source_record.ili, &target_record.ili) {
                (Some(IliRef::Id(s)), Some(IliRef::Id(t))) => {
                    return Err(EditorError::conflict(
                        kind::SYNSET,
                        target,
                        format!("both operands carry a concrete ILI ({} and {})", s, t),
                    ));
                }
                (Some(IliRef::Id(s)), Some(IliRef::Proposed)) => {
                    return Err(EditorError::conflict(
                        kind::SYNSET,
                        target,
                        format!(
                            "source carries concrete ILI {} but the target has a pending proposal",
                            s
                        ),
                    ));
                }
                (Some(source_ili), None) => {
                    ed.conn().execute(
                        "UPDATE synsets SET ili = ?1 WHERE id = ?2",
                        params![source_ili.as_str(), tkey],
                    )?;
                    if source_ili.is_proposed() {
                        ed.conn().execute(
                            "UPDATE OR REPLACE proposed_ilis SET synset = ?1 WHERE synset = ?2",
                            params![tkey, skey],
                        )?;
                    }
                    ed.record(
                        kind::SYNSET,
                        target,
                        Some("ili"),
                        ChangeOp::Update,
                        Some(serde_json::Value::Null),
                        Some(json!(source_ili.as_str())),
                    )?;
                }
                _ => {}
            }

            // Repoint senses, appending after the target's current members.
            let base: i64 = ed.conn().query_row(
                "SELECT COUNT(*) FROM senses WHERE synset = ?1",
                params![tkey],
                |row| row.get(0),
            )?;
            let moved: Vec<(i64, String)> = {
                let mut stmt = ed.conn().prepare(
                    "SELECT id, public_id FROM senses WHERE synset = ?1 ORDER BY synset_rank",
                )?;
                let rows = stmt
                    .query_map(params![skey], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };
            for (i, (sense_key, sense_id)) in moved.iter().enumerate() {
                ed.conn().execute(
                    "UPDATE senses SET synset = ?1, synset_rank = ?2 WHERE id = ?3",
                    params![tkey, base + i as i64 + 1, sense_key],
                )?;
                ed.record(
                    kind::SENSE,
                    sense_id,
                    Some("synset"),
                    ChangeOp::Update,
                    Some(json!(source)),
                    Some(json!(target)),
                )?;
            }
            if !moved.is_empty() {
                ed.conn().execute(
                    "UPDATE synsets SET lexicalized = 1 WHERE id = ?1",
                    params![tkey],
                )?;
            }

            // Repoint relations; identical triples after repointing drop.
            ed.repoint_relations(RelSpace::Synset, skey, tkey)?;
            ed.repoint_sense_synset_targets(skey, tkey)?;

            // Append definitions and examples by re-insertion so they land
            // after the target's own rows.
            ed.conn().execute(
                "INSERT INTO definitions (synset, text, language, source_sense, metadata)
                 SELECT ?1, text, language, source_sense, metadata
                 FROM definitions WHERE synset = ?2 ORDER BY id",
                params![tkey, skey],
            )?;
            ed.conn()
                .execute("DELETE FROM definitions WHERE synset = ?1", params![skey])?;
            ed.conn().execute(
                "INSERT INTO synset_examples (synset, text, language, metadata)
                 SELECT ?1, text, language, metadata
                 FROM synset_examples WHERE synset = ?2 ORDER BY id",
                params![tkey, skey],
            )?;
            ed.conn().execute(
                "DELETE FROM synset_examples WHERE synset = ?1",
                params![skey],
            )?;
            ed.conn()
                .execute("DELETE FROM proposed_ilis WHERE synset = ?1", params![skey])?;

            ed.record(
                kind::SYNSET,
                source,
                None,
                ChangeOp::Delete,
                Some(serde_json::to_value(&source_record)?),
                None,
            )?;
            ed.conn()
                .execute("DELETE FROM synsets WHERE id = ?1", params![skey])?;
            info!("Merged synset {} into {}", source, target);
            ed.fetch_synset(tkey)
        })
    }

    /// Splits `original` over a partition of its senses.
    ///
    /// `groups` must cover every sense of `original` exactly once. The first
    /// group stays on `original`; each further group moves to a fresh synset
    /// that copies `original`'s part of speech, lexfile, definitions,
    /// examples and outgoing relations. Incoming relations are not rewired
    /// and the ILI stays with `original`. Returns the surviving synset
    /// followed by the new ones, in group order.
    pub fn split_synset(&mut self, original: &str, groups: &[Vec<String>]) -> Result<Vec<Synset>> {
        let okey = self.synset_key(original)?;
        if groups.is_empty() {
            return Err(EditorError::validation(
                kind::SYNSET,
                original,
                "split requires at least one sense group",
            ));
        }
        if groups.iter().any(|g| g.is_empty()) {
            return Err(EditorError::validation(
                kind::SYNSET,
                original,
                "split groups must be non-empty",
            ));
        }
        self.with_tx(|ed| {
            let record = ed.fetch_synset(okey)?;
            let members: Vec<String> = record.members.clone();

            // The groups must partition the sense set exactly.
            let mut seen: Vec<&str> = Vec::new();
            for group in groups {
                for sense in group {
                    if !members.iter().any(|m| m == sense) {
                        return Err(EditorError::validation(
                            kind::SENSE,
                            sense.clone(),
                            format!("not a sense of synset {}", original),
                        ));
                    }
                    if seen.contains(&sense.as_str()) {
                        return Err(EditorError::validation(
                            kind::SENSE,
                            sense.clone(),
                            "sense appears in more than one split group",
                        ));
                    }
                    seen.push(sense);
                }
            }
            if seen.len() != members.len() {
                let missing: Vec<&String> = members
                    .iter()
                    .filter(|m| !seen.contains(&m.as_str()))
                    .collect();
                return Err(EditorError::validation(
                    kind::SYNSET,
                    original,
                    format!("split groups do not cover senses: {:?}", missing),
                ));
            }

            let lexicon_key = ed.owning_lexicon("synsets", okey)?;
            let lexicon_id = ed.lexicon_public_id(lexicon_key)?;

            // First group keeps the original synset; just renumber.
            for (i, sense) in groups[0].iter().enumerate() {
                let sense_key = ed.sense_key(sense)?;
                ed.conn().execute(
                    "UPDATE senses SET synset_rank = ?1 WHERE id = ?2",
                    params![(i + 1) as i64, sense_key],
                )?;
            }

            let mut result_keys = vec![okey];
            for group in &groups[1..] {
                let new_id =
                    ed.next_synset_id(lexicon_key, &lexicon_id, record.part_of_speech)?;
                ed.conn().execute(
                    "INSERT INTO synsets (public_id, lexicon, part_of_speech, lexicalized, lexfile)
                     VALUES (?1, ?2, ?3, 1, ?4)",
                    params![
                        new_id,
                        lexicon_key,
                        record.part_of_speech.as_str(),
                        record.lexfile
                    ],
                )?;
                let new_key = ed.conn().last_insert_rowid();

                // Copies start with no ILI; attributes and children follow
                // the original.
                ed.conn().execute(
                    "INSERT INTO definitions (synset, text, language, source_sense, metadata)
                     SELECT ?1, text, language, source_sense, metadata
                     FROM definitions WHERE synset = ?2 ORDER BY id",
                    params![new_key, okey],
                )?;
                ed.conn().execute(
                    "INSERT INTO synset_examples (synset, text, language, metadata)
                     SELECT ?1, text, language, metadata
                     FROM synset_examples WHERE synset = ?2 ORDER BY id",
                    params![new_key, okey],
                )?;
                // Outgoing edges are copied forward-only: nothing may end up
                // pointing at the copy, so no inverse maintenance here.
                for relation in &record.relations {
                    let target_key = ed.synset_key(&relation.target)?;
                    ed.insert_relation_row(
                        RelSpace::Synset,
                        new_key,
                        target_key,
                        &relation.rel_type,
                        relation.metadata.as_ref(),
                    )?;
                }

                for (i, sense) in group.iter().enumerate() {
                    let sense_key = ed.sense_key(sense)?;
                    ed.conn().execute(
                        "UPDATE senses SET synset = ?1, synset_rank = ?2 WHERE id = ?3",
                        params![new_key, (i + 1) as i64, sense_key],
                    )?;
                    ed.record(
                        kind::SENSE,
                        sense,
                        Some("synset"),
                        ChangeOp::Update,
                        Some(json!(original)),
                        Some(json!(new_id)),
                    )?;
                }

                let new_record = ed.fetch_synset(new_key)?;
                ed.record(
                    kind::SYNSET,
                    &new_id,
                    None,
                    ChangeOp::Create,
                    None,
                    Some(serde_json::to_value(&new_record)?),
                )?;
                result_keys.push(new_key);
            }

            ed.refresh_synset_lexicalized(okey)?;
            info!(
                "Split synset {} into {} group(s)",
                original,
                groups.len()
            );
            result_keys
                .into_iter()
                .map(|key| ed.fetch_synset(key))
                .collect()
        })
    }

    /// Repoints `sense` to `synset`.
    ///
    /// Fails when the sense's entry already has another sense on the target
    /// synset. Sense relations are preserved; both synsets' lexicalized
    /// flags are re-derived.
    pub fn move_sense(&mut self, sense: &str, synset: &str) -> Result<Sense> {
        let skey = self.sense_key(sense)?;
        let tkey = self.synset_key(synset)?;
        if self.owning_lexicon("senses", skey)? != self.owning_lexicon("synsets", tkey)? {
            return Err(EditorError::validation(
                kind::SENSE,
                sense,
                "sense and synset belong to different lexicons",
            ));
        }
        self.with_tx(|ed| {
            let (entry_key, old_synset_key): (i64, i64) = ed.conn().query_row(
                "SELECT entry, synset FROM senses WHERE id = ?1",
                params![skey],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            if old_synset_key == tkey {
                return Err(EditorError::validation(
                    kind::SENSE,
                    sense,
                    "sense already belongs to that synset",
                ));
            }
            let sibling: i64 = ed.conn().query_row(
                "SELECT COUNT(*) FROM senses WHERE entry = ?1 AND synset = ?2",
                params![entry_key, tkey],
                |row| row.get(0),
            )?;
            if sibling > 0 {
                return Err(EditorError::relation(
                    kind::SENSE,
                    sense,
                    "the entry already has a sense on the target synset",
                ));
            }
            let old_synset_id: String = ed.conn().query_row(
                "SELECT public_id FROM synsets WHERE id = ?1",
                params![old_synset_key],
                |row| row.get(0),
            )?;
            let rank: i64 = ed.conn().query_row(
                "SELECT COUNT(*) + 1 FROM senses WHERE synset = ?1",
                params![tkey],
                |row| row.get(0),
            )?;
            ed.conn().execute(
                "UPDATE senses SET synset = ?1, synset_rank = ?2 WHERE id = ?3",
                params![tkey, rank, skey],
            )?;
            ed.renumber_synset_ranks(old_synset_key)?;
            ed.refresh_synset_lexicalized(old_synset_key)?;
            ed.conn().execute(
                "UPDATE synsets SET lexicalized = 1 WHERE id = ?1",
                params![tkey],
            )?;
            ed.record(
                kind::SENSE,
                sense,
                Some("synset"),
                ChangeOp::Update,
                Some(json!(old_synset_id)),
                Some(json!(synset)),
            )?;
            info!("Moved sense {} to {}", sense, synset);
            ed.fetch_sense(skey)
        })
    }

    /// Repoints sense-to-synset edges whose target is `from` onto `to`,
    /// dropping triples that already exist on `to`.
    fn repoint_sense_synset_targets(&mut self, from: i64, to: i64) -> Result<()> {
        let rows: Vec<(i64, i64, String)> = {
            let mut stmt = self.conn().prepare(
                "SELECT id, source, rel_type FROM sense_synset_relations WHERE target = ?1",
            )?;
            let rows = stmt
                .query_map(params![from], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        for (row_key, source, rel_type) in rows {
            let collision: i64 = self.conn().query_row(
                "SELECT COUNT(*) FROM sense_synset_relations
                 WHERE source = ?1 AND target = ?2 AND rel_type = ?3",
                params![source, to, rel_type],
                |row| row.get(0),
            )?;
            if collision > 0 {
                self.conn().execute(
                    "DELETE FROM sense_synset_relations WHERE id = ?1",
                    params![row_key],
                )?;
            } else {
                self.conn().execute(
                    "UPDATE sense_synset_relations SET target = ?1 WHERE id = ?2",
                    params![to, row_key],
                )?;
            }
        }
        Ok(())
    }

    /// Repoints all edges touching `from` (either side) onto `to`, dropping
    /// edges that would become self-loops or collide with existing triples.
    fn repoint_relations(&mut self, space: RelSpace, from: i64, to: i64) -> Result<()> {
        let table = space.table();
        let rows: Vec<(i64, i64, i64, String)> = {
            let mut stmt = self.conn().prepare(&format!(
                "SELECT id, source, target, rel_type FROM {} WHERE source = ?1 OR target = ?1",
                table
            ))?;
            let rows = stmt
                .query_map(params![from], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        for (row_key, source, target, rel_type) in rows {
            let new_source = if source == from { to } else { source };
            let new_target = if target == from { to } else { target };
            if new_source == new_target {
                self.conn()
                    .execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![row_key])?;
                continue;
            }
            let collision: i64 = self.conn().query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE source = ?1 AND target = ?2 AND rel_type = ?3
                     AND id != ?4",
                    table
                ),
                params![new_source, new_target, rel_type, row_key],
                |row| row.get(0),
            )?;
            if collision > 0 {
                self.conn()
                    .execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![row_key])?;
            } else {
                self.conn().execute(
                    &format!("UPDATE {} SET source = ?1, target = ?2 WHERE id = ?3", table),
                    params![new_source, new_target, row_key],
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartOfSpeech;
    use crate::relations::SynsetRelType;

    fn seeded() -> Editor {
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
        ed
    }

    /// Synsets A, B with senses and a shared hypernym C, as in scenario S4.
    fn merge_fixture(ed: &mut Editor) {
        for id in ["awn-00001-n", "awn-00002-n", "awn-00003-n"] {
            ed.create_synset("awn", PartOfSpeech::N, Some(id)).unwrap();
        }
        for (lemma, synset) in [
            ("lion", "awn-00001-n"),
            ("cub", "awn-00001-n"),
            ("lioness", "awn-00002-n"),
        ] {
            ed.create_entry("awn", lemma, PartOfSpeech::N, None).unwrap();
            ed.add_sense(&format!("awn-{}-n", lemma), synset, None).unwrap();
        }
        ed.add_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00003-n")
            .unwrap();
        ed.add_synset_relation("awn-00002-n", SynsetRelType::Hypernym, "awn-00003-n")
            .unwrap();
    }

    #[test]
    fn merge_unions_senses_and_dedupes_relations() {
        // S4.
        let mut ed = seeded();
        merge_fixture(&mut ed);

        let merged = ed.merge_synsets("awn-00001-n", "awn-00002-n").unwrap();

        let mut members = merged.members.clone();
        members.sort();
        assert_eq!(
            members,
            vec!["awn-cub-n-1", "awn-lion-n-1", "awn-lioness-n-1"]
        );
        // Exactly one hypernym edge to C survives.
        let hypernyms: Vec<_> = merged
            .relations
            .iter()
            .filter(|r| r.rel_type == "hypernym")
            .collect();
        assert_eq!(hypernyms.len(), 1);
        assert_eq!(hypernyms[0].target, "awn-00003-n");
        // C keeps exactly one hyponym edge back.
        let c = ed.get_synset("awn-00003-n").unwrap();
        let hyponyms: Vec<_> = c
            .relations
            .iter()
            .filter(|r| r.rel_type == "hyponym")
            .collect();
        assert_eq!(hyponyms.len(), 1);
        assert_eq!(hyponyms[0].target, "awn-00002-n");
        // A is gone and its deletion is in the history.
        assert!(ed.get_synset("awn-00001-n").is_err());
        let deletes: Vec<_> = ed
            .history_for("awn-00001-n")
            .unwrap()
            .into_iter()
            .filter(|r| r.op == ChangeOp::Delete)
            .collect();
        assert_eq!(deletes.len(), 1);
    }

    #[test]
    fn merge_appends_definitions_and_examples() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.add_definition("awn-00001-n", "from the source", None, None)
            .unwrap();
        ed.add_definition("awn-00002-n", "already on the target", None, None)
            .unwrap();
        ed.add_synset_example("awn-00001-n", "a source example", None)
            .unwrap();

        let merged = ed.merge_synsets("awn-00001-n", "awn-00002-n").unwrap();
        let texts: Vec<&str> = merged.definitions.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["already on the target", "from the source"]);
        assert_eq!(merged.examples.len(), 1);
    }

    #[test]
    fn merge_transfers_single_concrete_ili() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.set_ili("awn-00001-n", Some("i12345")).unwrap();
        let merged = ed.merge_synsets("awn-00001-n", "awn-00002-n").unwrap();
        assert_eq!(merged.ili, Some(IliRef::Id("i12345".into())));
    }

    #[test]
    fn merge_with_two_concrete_ilis_conflicts() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.set_ili("awn-00001-n", Some("i11111")).unwrap();
        ed.set_ili("awn-00002-n", Some("i22222")).unwrap();
        let err = ed.merge_synsets("awn-00001-n", "awn-00002-n").unwrap_err();
        assert!(matches!(err, EditorError::Conflict { .. }));
        // Nothing moved.
        assert!(ed.get_synset("awn-00001-n").is_ok());
        assert_eq!(
            ed.get_synset("awn-00002-n").unwrap().ili,
            Some(IliRef::Id("i22222".into()))
        );
    }

    #[test]
    fn split_partitions_senses_and_copies_outgoing_relations() {
        // S5.
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00009-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00008-n"))
            .unwrap();
        for lemma in ["lion", "tiger", "leopard"] {
            ed.create_entry("awn", lemma, PartOfSpeech::N, None).unwrap();
            ed.add_sense(&format!("awn-{}-n", lemma), "awn-00001-n", None)
                .unwrap();
        }
        ed.add_definition("awn-00001-n", "A big cat", None, None).unwrap();
        ed.add_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00009-n")
            .unwrap();
        // An incoming edge that must keep pointing at the original.
        ed.add_synset_relation("awn-00008-n", SynsetRelType::Hyponym, "awn-00001-n")
            .unwrap();

        let groups = vec![
            vec!["awn-lion-n-1".to_string()],
            vec!["awn-tiger-n-1".to_string(), "awn-leopard-n-1".to_string()],
        ];
        let result = ed.split_synset("awn-00001-n", &groups).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "awn-00001-n");
        assert_eq!(result[0].members, vec!["awn-lion-n-1"]);
        let new = &result[1];
        assert_eq!(new.members, vec!["awn-tiger-n-1", "awn-leopard-n-1"]);
        assert!(new.lexicalized);
        assert_eq!(new.ili, None);
        assert_eq!(new.definitions[0].text, "A big cat");
        assert!(
            new.relations
                .iter()
                .any(|r| r.rel_type == "hypernym" && r.target == "awn-00009-n")
        );
        // Incoming relations were not rewired onto the copy.
        let incoming_source = ed.get_synset("awn-00008-n").unwrap();
        let targets: Vec<&str> = incoming_source
            .relations
            .iter()
            .map(|r| r.target.as_str())
            .collect();
        assert!(targets.contains(&"awn-00001-n"));
        assert!(!targets.contains(&new.id.as_str()));
    }

    #[test]
    fn split_rejects_bad_partitions() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        for lemma in ["lion", "tiger"] {
            ed.create_entry("awn", lemma, PartOfSpeech::N, None).unwrap();
            ed.add_sense(&format!("awn-{}-n", lemma), "awn-00001-n", None)
                .unwrap();
        }
        // Unknown sense.
        let err = ed
            .split_synset(
                "awn-00001-n",
                &[vec!["awn-lion-n-1".into()], vec!["awn-ghost-n-1".into()]],
            )
            .unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        // Missing sense.
        let err = ed
            .split_synset("awn-00001-n", &[vec!["awn-lion-n-1".into()]])
            .unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        // Duplicated sense.
        let err = ed
            .split_synset(
                "awn-00001-n",
                &[
                    vec!["awn-lion-n-1".into(), "awn-tiger-n-1".into()],
                    vec!["awn-tiger-n-1".into()],
                ],
            )
            .unwrap_err();
        assert!(matches!(err, EditorError::Validation { .. }));
        // Store unchanged by the failed attempts.
        assert_eq!(ed.get_synset("awn-00001-n").unwrap().members.len(), 2);
    }

    #[test]
    fn move_sense_repoints_and_recomputes_lexicalization() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.create_entry("awn", "lion", PartOfSpeech::N, None).unwrap();
        let sense = ed.add_sense("awn-lion-n", "awn-00001-n", None).unwrap();

        let moved = ed.move_sense(&sense.id, "awn-00002-n").unwrap();
        assert_eq!(moved.synset, "awn-00002-n");
        assert_eq!(moved.synset_rank, 1);
        assert!(!ed.get_synset("awn-00001-n").unwrap().lexicalized);
        assert!(ed.get_synset("awn-00002-n").unwrap().lexicalized);
    }

    #[test]
    fn move_sense_rejects_duplicate_membership() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.create_entry("awn", "lion", PartOfSpeech::N, None).unwrap();
        let s1 = ed.add_sense("awn-lion-n", "awn-00001-n", None).unwrap();
        ed.add_sense("awn-lion-n", "awn-00002-n", None).unwrap();
        let err = ed.move_sense(&s1.id, "awn-00002-n").unwrap_err();
        assert!(matches!(err, EditorError::Relation { .. }));
        // The failed move left the sense where it was.
        assert_eq!(ed.get_sense(&s1.id).unwrap().synset, "awn-00001-n");
    }

    #[test]
    fn move_sense_preserves_sense_relations() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::A, Some("awn-00001-a"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::A, Some("awn-00002-a"))
            .unwrap();
        ed.create_entry("awn", "hot", PartOfSpeech::A, None).unwrap();
        ed.create_entry("awn", "cold", PartOfSpeech::A, None).unwrap();
        let hot = ed.add_sense("awn-hot-a", "awn-00001-a", None).unwrap();
        let cold = ed.add_sense("awn-cold-a", "awn-00001-a", None).unwrap();
        ed.add_sense_relation(&hot.id, crate::relations::SenseRelType::Antonym, &cold.id)
            .unwrap();

        let moved = ed.move_sense(&hot.id, "awn-00002-a").unwrap();
        assert_eq!(moved.relations.len(), 1);
        assert_eq!(moved.relations[0].rel_type, "antonym");
        assert_eq!(moved.relations[0].target, cold.id);
    }
}
