//! Validation engine: read-only rule sweep over the store.
//!
//! Every rule produces severity-tagged findings; nothing here mutates.
//! Export refuses to emit while any ERROR-severity finding stands, so the
//! rules double as the emission gate.

use crate::db;
use crate::editor::{Editor, kind};
use crate::error::Result;
use crate::models::PROPOSED_ILI_MIN_DEFINITION;
use crate::relations::{
    SenseRelType, SynsetRelType, is_sense_rel_type, is_sense_synset_rel_type, is_synset_rel_type,
};
use rusqlite::params;
use serde_json::{Value, json};
use std::collections::HashSet;

/// How bad a finding is. Errors block export; warnings do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// The catalogued rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    DuplicateId,
    DanglingSenseSynset,
    DanglingRelationTarget,
    SelfLoopRelation,
    ShortProposedDefinition,
    MissingIdPrefix,
    SynsetWithoutDefinition,
    EntryWithoutSenses,
    RedundantSense,
    RedundantEntry,
    EmptySynset,
    DuplicateIli,
    ProposedIliWithoutDefinition,
    SpuriousProposedDefinition,
    BlankText,
    RepeatedDefinition,
    RelationTypeWrongSide,
    DuplicateRelation,
    MissingInverseRelation,
    HypernymPosMismatch,
    LowConfidence,
}

impl Rule {
    pub fn severity(&self) -> Severity {
        use Rule::*;
        match self {
            DuplicateId | DanglingSenseSynset | DanglingRelationTarget | SelfLoopRelation
            | ShortProposedDefinition | MissingIdPrefix | SynsetWithoutDefinition => {
                Severity::Error
            }
            _ => Severity::Warning,
        }
    }

    pub fn code(&self) -> &'static str {
        use Rule::*;
        match self {
            DuplicateId => "E001",
            DanglingSenseSynset => "E002",
            DanglingRelationTarget => "E003",
            SelfLoopRelation => "E004",
            ShortProposedDefinition => "E005",
            MissingIdPrefix => "E006",
            SynsetWithoutDefinition => "E007",
            EntryWithoutSenses => "W001",
            RedundantSense => "W002",
            RedundantEntry => "W003",
            EmptySynset => "W004",
            DuplicateIli => "W005",
            ProposedIliWithoutDefinition => "W006",
            SpuriousProposedDefinition => "W007",
            BlankText => "W008",
            RepeatedDefinition => "W009",
            RelationTypeWrongSide => "W010",
            DuplicateRelation => "W011",
            MissingInverseRelation => "W012",
            HypernymPosMismatch => "W013",
            LowConfidence => "W014",
        }
    }
}

/// One validation finding.
#[derive(Debug, Clone)]
pub struct Finding {
    pub rule: Rule,
    pub severity: Severity,
    pub entity_kind: &'static str,
    pub entity_id: String,
    pub message: String,
    pub details: Option<Value>,
}

impl Finding {
    fn new(rule: Rule, entity_kind: &'static str, entity_id: impl Into<String>, message: impl Into<String>) -> Finding {
        Finding {
            rule,
            severity: rule.severity(),
            entity_kind,
            entity_id: entity_id.into(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: Value) -> Finding {
        self.details = Some(details);
        self
    }
}

/// What part of the store a validation run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    /// One lexicon, by id or `id:version` specifier.
    Lexicon(String),
    /// One synset; findings are filtered to that id.
    Synset(String),
    /// One entry; findings are filtered to that id.
    Entry(String),
    /// Relation rules only.
    Relations,
}

/// One relation edge, loaded once for the graph rules.
struct Edge {
    source: String,
    target: String,
    rel_type: String,
    lexicon: i64,
    metadata: Option<String>,
}

impl Editor {
    /// Runs the rule catalogue over the scope and returns all findings.
    pub fn validate(&self, scope: Scope) -> Result<Vec<Finding>> {
        let lexicon = match &scope {
            Scope::Lexicon(spec) => Some(self.lexicon_key(spec)?),
            _ => None,
        };
        let mut findings = Vec::new();

        let relations_only = scope == Scope::Relations;
        if !relations_only {
            self.check_duplicate_ids(lexicon, &mut findings)?;
            self.check_dangling_senses(lexicon, &mut findings)?;
            self.check_proposed_ilis(lexicon, &mut findings)?;
            self.check_id_prefixes(lexicon, &mut findings)?;
            self.check_definitions(lexicon, &mut findings)?;
            self.check_entries_and_senses(lexicon, &mut findings)?;
            self.check_ili_duplicates(lexicon, &mut findings)?;
            self.check_confidence(lexicon, &mut findings)?;
        }
        self.check_relations(lexicon, &mut findings)?;

        match scope {
            Scope::Synset(id) | Scope::Entry(id) => {
                findings.retain(|f| f.entity_id == id);
            }
            _ => {}
        }
        Ok(findings)
    }

    fn check_duplicate_ids(&self, lexicon: Option<i64>, out: &mut Vec<Finding>) -> Result<()> {
        let mut stmt = self.conn().prepare(
            "SELECT public_id, COUNT(*) FROM (
                SELECT lexicon, public_id FROM entries
                UNION ALL SELECT lexicon, public_id FROM senses
                UNION ALL SELECT lexicon, public_id FROM synsets
                UNION ALL SELECT e.lexicon, f.public_id FROM forms f
                          JOIN entries e ON e.id = f.entry WHERE f.public_id IS NOT NULL
                UNION ALL SELECT lexicon, public_id FROM syntactic_behaviours
                          WHERE public_id IS NOT NULL
             ) WHERE ?1 IS NULL OR lexicon = ?1
             GROUP BY lexicon, public_id HAVING COUNT(*) > 1",
        )?;
        let rows: Vec<(String, i64)> = stmt
            .query_map(params![lexicon], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        for (id, n) in rows {
            out.push(
                Finding::new(
                    Rule::DuplicateId,
                    kind::LEXICON,
                    id.clone(),
                    format!("id '{}' is used by {} entities in one lexicon", id, n),
                )
                .with_details(json!({ "occurrences": n })),
            );
        }
        Ok(())
    }

    fn check_dangling_senses(&self, lexicon: Option<i64>, out: &mut Vec<Finding>) -> Result<()> {
        let mut stmt = self.conn().prepare(
            "SELECT s.public_id FROM senses s LEFT JOIN synsets y ON y.id = s.synset
             WHERE y.id IS NULL AND (?1 IS NULL OR s.lexicon = ?1)",
        )?;
        let rows: Vec<String> = stmt
            .query_map(params![lexicon], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for id in rows {
            out.push(Finding::new(
                Rule::DanglingSenseSynset,
                kind::SENSE,
                id,
                "sense references a synset that does not exist",
            ));
        }
        Ok(())
    }

    fn check_proposed_ilis(&self, lexicon: Option<i64>, out: &mut Vec<Finding>) -> Result<()> {
        let mut stmt = self.conn().prepare(
            "SELECT s.public_id, p.definition FROM proposed_ilis p
             JOIN synsets s ON s.id = p.synset
             WHERE LENGTH(p.definition) < ?2 AND (?1 IS NULL OR s.lexicon = ?1)",
        )?;
        let rows: Vec<(String, String)> = stmt
            .query_map(params![lexicon, PROPOSED_ILI_MIN_DEFINITION as i64], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        for (id, definition) in rows {
            out.push(
                Finding::new(
                    Rule::ShortProposedDefinition,
                    kind::SYNSET,
                    id,
                    format!(
                        "proposed ILI definition has {} characters; at least {} required",
                        definition.chars().count(),
                        PROPOSED_ILI_MIN_DEFINITION
                    ),
                )
                .with_details(json!({ "definition": definition })),
            );
        }

        let mut stmt = self.conn().prepare(
            "SELECT s.public_id FROM synsets s
             LEFT JOIN proposed_ilis p ON p.synset = s.id
             WHERE s.ili = 'in' AND p.synset IS NULL AND (?1 IS NULL OR s.lexicon = ?1)",
        )?;
        let rows: Vec<String> = stmt
            .query_map(params![lexicon], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for id in rows {
            out.push(Finding::new(
                Rule::ProposedIliWithoutDefinition,
                kind::SYNSET,
                id,
                "synset is marked 'in' but has no proposed-ILI definition record",
            ));
        }

        let mut stmt = self.conn().prepare(
            "SELECT s.public_id FROM synsets s
             JOIN proposed_ilis p ON p.synset = s.id
             WHERE s.ili IS NOT NULL AND s.ili != 'in' AND (?1 IS NULL OR s.lexicon = ?1)",
        )?;
        let rows: Vec<String> = stmt
            .query_map(params![lexicon], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for id in rows {
            out.push(Finding::new(
                Rule::SpuriousProposedDefinition,
                kind::SYNSET,
                id,
                "synset carries a concrete ILI yet still has a proposed definition",
            ));
        }
        Ok(())
    }

    fn check_id_prefixes(&self, lexicon: Option<i64>, out: &mut Vec<Finding>) -> Result<()> {
        for (table, entity_kind) in [
            ("entries", kind::ENTRY),
            ("senses", kind::SENSE),
            ("synsets", kind::SYNSET),
        ] {
            let sql = format!(
                "SELECT t.public_id, l.public_id FROM {} t JOIN lexicons l ON l.id = t.lexicon
                 WHERE t.public_id NOT LIKE l.public_id || '-%'
                   AND (?1 IS NULL OR t.lexicon = ?1)",
                table
            );
            let mut stmt = self.conn().prepare(&sql)?;
            let rows: Vec<(String, String)> = stmt
                .query_map(params![lexicon], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<_>>()?;
            for (id, lexicon_id) in rows {
                out.push(Finding::new(
                    Rule::MissingIdPrefix,
                    entity_kind,
                    id,
                    format!("id does not start with lexicon prefix '{}-'", lexicon_id),
                ));
            }
        }
        Ok(())
    }

    fn check_definitions(&self, lexicon: Option<i64>, out: &mut Vec<Finding>) -> Result<()> {
        let mut stmt = self.conn().prepare(
            "SELECT s.public_id FROM synsets s
             LEFT JOIN definitions d ON d.synset = s.id
             WHERE d.id IS NULL AND (?1 IS NULL OR s.lexicon = ?1)",
        )?;
        let rows: Vec<String> = stmt
            .query_map(params![lexicon], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for id in rows {
            out.push(Finding::new(
                Rule::SynsetWithoutDefinition,
                kind::SYNSET,
                id,
                "synset has no definitions",
            ));
        }

        // Blank definition or example text.
        for (sql, entity_kind) in [
            (
                "SELECT s.public_id FROM definitions d JOIN synsets s ON s.id = d.synset
                 WHERE TRIM(d.text) = '' AND (?1 IS NULL OR s.lexicon = ?1)",
                kind::SYNSET,
            ),
            (
                "SELECT s.public_id FROM synset_examples x JOIN synsets s ON s.id = x.synset
                 WHERE TRIM(x.text) = '' AND (?1 IS NULL OR s.lexicon = ?1)",
                kind::SYNSET,
            ),
            (
                "SELECT n.public_id FROM sense_examples x JOIN senses n ON n.id = x.sense
                 WHERE TRIM(x.text) = '' AND (?1 IS NULL OR n.lexicon = ?1)",
                kind::SENSE,
            ),
        ] {
            let mut stmt = self.conn().prepare(sql)?;
            let rows: Vec<String> = stmt
                .query_map(params![lexicon], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            for id in rows {
                out.push(Finding::new(
                    Rule::BlankText,
                    entity_kind,
                    id,
                    "blank definition or example text",
                ));
            }
        }

        let mut stmt = self.conn().prepare(
            "SELECT d.text, COUNT(DISTINCT d.synset) AS n FROM definitions d
             JOIN synsets s ON s.id = d.synset
             WHERE TRIM(d.text) != '' AND (?1 IS NULL OR s.lexicon = ?1)
             GROUP BY s.lexicon, d.text HAVING n > 1",
        )?;
        let rows: Vec<(String, i64)> = stmt
            .query_map(params![lexicon], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        for (text, n) in rows {
            out.push(
                Finding::new(
                    Rule::RepeatedDefinition,
                    kind::DEFINITION,
                    text.clone(),
                    format!("the same definition appears on {} synsets", n),
                )
                .with_details(json!({ "synsets": n })),
            );
        }
        Ok(())
    }

    fn check_entries_and_senses(&self, lexicon: Option<i64>, out: &mut Vec<Finding>) -> Result<()> {
        let mut stmt = self.conn().prepare(
            "SELECT e.public_id FROM entries e LEFT JOIN senses s ON s.entry = e.id
             WHERE s.id IS NULL AND (?1 IS NULL OR e.lexicon = ?1)",
        )?;
        let rows: Vec<String> = stmt
            .query_map(params![lexicon], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for id in rows {
            out.push(Finding::new(
                Rule::EntryWithoutSenses,
                kind::ENTRY,
                id,
                "entry has no senses",
            ));
        }

        let mut stmt = self.conn().prepare(
            "SELECT e.public_id, y.public_id, COUNT(*) FROM senses s
             JOIN entries e ON e.id = s.entry JOIN synsets y ON y.id = s.synset
             WHERE ?1 IS NULL OR s.lexicon = ?1
             GROUP BY s.entry, s.synset HAVING COUNT(*) > 1",
        )?;
        let rows: Vec<(String, String, i64)> = stmt
            .query_map(params![lexicon], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        for (entry, synset, n) in rows {
            out.push(
                Finding::new(
                    Rule::RedundantSense,
                    kind::ENTRY,
                    entry.clone(),
                    format!("{} senses link entry '{}' to synset '{}'", n, entry, synset),
                )
                .with_details(json!({ "synset": synset, "senses": n })),
            );
        }

        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT e1.public_id, e2.public_id, y.public_id
             FROM senses s1 JOIN senses s2 ON s1.synset = s2.synset AND s1.entry < s2.entry
             JOIN entries e1 ON e1.id = s1.entry JOIN entries e2 ON e2.id = s2.entry
             JOIN synsets y ON y.id = s1.synset
             WHERE e1.lemma_lower = e2.lemma_lower AND (?1 IS NULL OR e1.lexicon = ?1)",
        )?;
        let rows: Vec<(String, String, String)> = stmt
            .query_map(params![lexicon], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        for (e1, e2, synset) in rows {
            out.push(
                Finding::new(
                    Rule::RedundantEntry,
                    kind::ENTRY,
                    e2,
                    format!("same lemma as entry '{}' with a sense on synset '{}'", e1, synset),
                )
                .with_details(json!({ "other_entry": e1, "synset": synset })),
            );
        }

        let mut stmt = self.conn().prepare(
            "SELECT s.public_id FROM synsets s LEFT JOIN senses n ON n.synset = s.id
             WHERE n.id IS NULL AND (?1 IS NULL OR s.lexicon = ?1)",
        )?;
        let rows: Vec<String> = stmt
            .query_map(params![lexicon], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for id in rows {
            out.push(Finding::new(
                Rule::EmptySynset,
                kind::SYNSET,
                id,
                "synset has no member senses",
            ));
        }
        Ok(())
    }

    fn check_ili_duplicates(&self, lexicon: Option<i64>, out: &mut Vec<Finding>) -> Result<()> {
        let mut stmt = self.conn().prepare(
            "SELECT ili, COUNT(*) FROM synsets
             WHERE ili IS NOT NULL AND ili != 'in' AND (?1 IS NULL OR lexicon = ?1)
             GROUP BY lexicon, ili HAVING COUNT(*) > 1",
        )?;
        let rows: Vec<(String, i64)> = stmt
            .query_map(params![lexicon], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        for (ili, n) in rows {
            out.push(
                Finding::new(
                    Rule::DuplicateIli,
                    kind::ILI,
                    ili.clone(),
                    format!("ILI '{}' is referenced by {} synsets in one lexicon", ili, n),
                )
                .with_details(json!({ "synsets": n })),
            );
        }
        Ok(())
    }

    fn check_confidence(&self, lexicon: Option<i64>, out: &mut Vec<Finding>) -> Result<()> {
        for (sql, entity_kind) in [
            (
                "SELECT public_id, metadata FROM lexicons
                 WHERE metadata IS NOT NULL AND (?1 IS NULL OR id = ?1)",
                kind::LEXICON,
            ),
            (
                "SELECT public_id, metadata FROM synsets
                 WHERE metadata IS NOT NULL AND (?1 IS NULL OR lexicon = ?1)",
                kind::SYNSET,
            ),
            (
                "SELECT public_id, metadata FROM senses
                 WHERE metadata IS NOT NULL AND (?1 IS NULL OR lexicon = ?1)",
                kind::SENSE,
            ),
        ] {
            let mut stmt = self.conn().prepare(sql)?;
            let rows: Vec<(String, Option<String>)> = stmt
                .query_map(params![lexicon], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<_>>()?;
            for (id, raw) in rows {
                let Some(meta) = db::decode_metadata(raw)? else {
                    continue;
                };
                if let Some(score) = meta.get("confidenceScore").and_then(Value::as_f64) {
                    if score < 0.5 {
                        out.push(
                            Finding::new(
                                Rule::LowConfidence,
                                entity_kind,
                                id,
                                format!("confidence score {} is below 0.5", score),
                            )
                            .with_details(json!({ "confidenceScore": score })),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn load_edges(&self, table: &str, endpoint_table: &str, lexicon: Option<i64>) -> Result<Vec<Edge>> {
        // Source and target resolve through their own entity tables; a
        // dangling surrogate shows up as NULL and is reported separately.
        let sql = format!(
            "SELECT src.public_id, tgt.public_id, r.rel_type, src.lexicon, r.metadata
             FROM {table} r
             LEFT JOIN {endpoint} src ON src.id = r.source
             LEFT JOIN {target_table} tgt ON tgt.id = r.target
             WHERE ?1 IS NULL OR src.lexicon = ?1",
            table = table,
            endpoint = if table == "synset_relations" { "synsets" } else { "senses" },
            target_table = endpoint_table,
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows: Vec<(Option<String>, Option<String>, String, Option<i64>, Option<String>)> = stmt
            .query_map(params![lexicon], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<rusqlite::Result<_>>()?;
        Ok(rows
            .into_iter()
            .map(|(source, target, rel_type, lexicon, metadata)| Edge {
                source: source.unwrap_or_default(),
                target: target.unwrap_or_default(),
                rel_type,
                lexicon: lexicon.unwrap_or(-1),
                metadata,
            })
            .collect())
    }

    fn check_relations(&self, lexicon: Option<i64>, out: &mut Vec<Finding>) -> Result<()> {
        let synset_edges = self.load_edges("synset_relations", "synsets", lexicon)?;
        let sense_edges = self.load_edges("sense_relations", "senses", lexicon)?;
        let sense_synset_edges = self.load_edges("sense_synset_relations", "synsets", lexicon)?;

        let report_edges = |edges: &[Edge],
                            entity_kind: &'static str,
                            valid: fn(&str) -> bool,
                            out: &mut Vec<Finding>| {
            for edge in edges {
                if edge.target.is_empty() {
                    out.push(Finding::new(
                        Rule::DanglingRelationTarget,
                        entity_kind,
                        edge.source.clone(),
                        format!("relation '{}' points at a missing target", edge.rel_type),
                    ));
                }
                if edge.source == edge.target && !edge.source.is_empty() {
                    out.push(Finding::new(
                        Rule::SelfLoopRelation,
                        entity_kind,
                        edge.source.clone(),
                        format!("'{}' relation loops back onto its source", edge.rel_type),
                    ));
                }
                if !valid(&edge.rel_type) {
                    out.push(Finding::new(
                        Rule::RelationTypeWrongSide,
                        entity_kind,
                        edge.source.clone(),
                        format!(
                            "'{}' is not a valid relation type for this relation space",
                            edge.rel_type
                        ),
                    ));
                }
            }
        };
        report_edges(&synset_edges, kind::SYNSET, is_synset_rel_type, out);
        report_edges(&sense_edges, kind::SENSE, is_sense_rel_type, out);
        report_edges(
            &sense_synset_edges,
            kind::SENSE,
            is_sense_synset_rel_type,
            out,
        );

        // Graph rules over each same-space edge set.
        let synset_present: HashSet<(&str, &str, &str)> = synset_edges
            .iter()
            .map(|e| (e.source.as_str(), e.rel_type.as_str(), e.target.as_str()))
            .collect();
        for edge in &synset_edges {
            if let Ok(rel_type) = edge.rel_type.parse::<SynsetRelType>() {
                if !rel_type.is_symmetric()
                    && synset_present.contains(&(
                        edge.target.as_str(),
                        edge.rel_type.as_str(),
                        edge.source.as_str(),
                    ))
                    && edge.source < edge.target
                {
                    out.push(Finding::new(
                        Rule::DuplicateRelation,
                        kind::SYNSET,
                        edge.source.clone(),
                        format!(
                            "asymmetric '{}' relation exists in both directions with '{}'",
                            edge.rel_type, edge.target
                        ),
                    ));
                }
                if let Some(inverse) = rel_type.inverse() {
                    if !synset_present.contains(&(
                        edge.target.as_str(),
                        inverse.as_str(),
                        edge.source.as_str(),
                    )) {
                        out.push(Finding::new(
                            Rule::MissingInverseRelation,
                            kind::SYNSET,
                            edge.source.clone(),
                            format!(
                                "'{}' to '{}' has no '{}' edge back",
                                edge.rel_type, edge.target, inverse
                            ),
                        ));
                    }
                }
            }
        }
        let sense_present: HashSet<(&str, &str, &str)> = sense_edges
            .iter()
            .map(|e| (e.source.as_str(), e.rel_type.as_str(), e.target.as_str()))
            .collect();
        for edge in &sense_edges {
            if let Ok(rel_type) = edge.rel_type.parse::<SenseRelType>() {
                if let Some(inverse) = rel_type.inverse() {
                    if !sense_present.contains(&(
                        edge.target.as_str(),
                        inverse.as_str(),
                        edge.source.as_str(),
                    )) {
                        out.push(Finding::new(
                            Rule::MissingInverseRelation,
                            kind::SENSE,
                            edge.source.clone(),
                            format!(
                                "'{}' to '{}' has no '{}' edge back",
                                edge.rel_type, edge.target, inverse
                            ),
                        ));
                    }
                }
            }
        }

        // POS agreement along hypernymy.
        let mut stmt = self.conn().prepare(
            "SELECT s.public_id, t.public_id, s.part_of_speech, t.part_of_speech
             FROM synset_relations r
             JOIN synsets s ON s.id = r.source JOIN synsets t ON t.id = r.target
             WHERE r.rel_type = 'hypernym' AND s.part_of_speech != t.part_of_speech
               AND (?1 IS NULL OR s.lexicon = ?1)",
        )?;
        let rows: Vec<(String, String, String, String)> = stmt
            .query_map(params![lexicon], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        for (source, target, source_pos, target_pos) in rows {
            out.push(
                Finding::new(
                    Rule::HypernymPosMismatch,
                    kind::SYNSET,
                    source.clone(),
                    format!(
                        "part of speech '{}' disagrees with hypernym '{}' ('{}')",
                        source_pos, target, target_pos
                    ),
                )
                .with_details(json!({ "hypernym": target })),
            );
        }

        // Low-confidence relation metadata.
        for edges in [&synset_edges, &sense_edges, &sense_synset_edges] {
            for edge in edges.iter() {
                let Some(meta) = db::decode_metadata(edge.metadata.clone())? else {
                    continue;
                };
                if let Some(score) = meta.get("confidenceScore").and_then(Value::as_f64) {
                    if score < 0.5 {
                        out.push(Finding::new(
                            Rule::LowConfidence,
                            kind::SYNSET_RELATION,
                            edge.source.clone(),
                            format!(
                                "relation '{}' to '{}' has confidence {} below 0.5",
                                edge.rel_type, edge.target, score
                            ),
                        ));
                    }
                }
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

    fn codes(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.rule.code()).collect()
    }

    #[test]
    fn short_proposed_definition_is_an_error() {
        // S7 observed through the rule sweep: shorten a stored proposal
        // under the engine's guard.
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.add_definition("awn-00001-n", "A large feline", None, None)
            .unwrap();
        ed.propose_ili("awn-00001-n", "A large tawny wild cat")
            .unwrap();
        ed.conn()
            .execute("UPDATE proposed_ilis SET definition = '10 chars..'", [])
            .unwrap();
        let findings = ed.validate(Scope::All).unwrap();
        let finding = findings
            .iter()
            .find(|f| f.rule == Rule::ShortProposedDefinition)
            .expect("short-definition finding");
        assert_eq!(finding.severity, Severity::Error);
        assert_eq!(finding.entity_id, "awn-00001-n");
    }

    #[test]
    fn entry_without_senses_is_a_warning() {
        let mut ed = seeded();
        ed.create_entry("awn", "lion", PartOfSpeech::N, None).unwrap();
        let findings = ed.validate(Scope::All).unwrap();
        assert!(codes(&findings).contains(&"W001"));
        assert!(
            findings
                .iter()
                .filter(|f| f.rule == Rule::EntryWithoutSenses)
                .all(|f| f.severity == Severity::Warning)
        );
    }

    #[test]
    fn suppressed_inverse_is_warning_not_error() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00002-n"))
            .unwrap();
        ed.add_synset_relation_with(
            "awn-00001-n",
            SynsetRelType::Hypernym,
            "awn-00002-n",
            None,
            false,
        )
        .unwrap();
        let findings = ed.validate(Scope::Relations).unwrap();
        let finding = findings
            .iter()
            .find(|f| f.rule == Rule::MissingInverseRelation)
            .expect("missing-inverse finding");
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(finding.entity_id, "awn-00001-n");
    }

    #[test]
    fn hypernym_pos_mismatch_is_flagged() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_synset("awn", PartOfSpeech::V, Some("awn-00002-v"))
            .unwrap();
        ed.add_synset_relation("awn-00001-n", SynsetRelType::Hypernym, "awn-00002-v")
            .unwrap();
        let findings = ed.validate(Scope::Relations).unwrap();
        assert!(codes(&findings).contains(&"W013"));
    }

    #[test]
    fn redundant_sense_is_flagged() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.create_entry("awn", "lion", PartOfSpeech::N, None).unwrap();
        ed.add_sense("awn-lion-n", "awn-00001-n", None).unwrap();
        ed.add_sense("awn-lion-n", "awn-00001-n", None).unwrap();
        let findings = ed.validate(Scope::All).unwrap();
        assert!(codes(&findings).contains(&"W002"));
    }

    #[test]
    fn scope_narrows_to_one_entity() {
        let mut ed = seeded();
        ed.create_entry("awn", "lion", PartOfSpeech::N, None).unwrap();
        ed.create_entry("awn", "tiger", PartOfSpeech::N, None).unwrap();
        let findings = ed
            .validate(Scope::Entry("awn-lion-n".to_string()))
            .unwrap();
        assert!(!findings.is_empty());
        assert!(findings.iter().all(|f| f.entity_id == "awn-lion-n"));
    }

    #[test]
    fn empty_synset_and_missing_definition_are_reported() {
        let mut ed = seeded();
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        let findings = ed.validate(Scope::All).unwrap();
        let rules: Vec<Rule> = findings.iter().map(|f| f.rule).collect();
        assert!(rules.contains(&Rule::EmptySynset));
        assert!(rules.contains(&Rule::SynsetWithoutDefinition));
        // No definitions at all is an error-severity finding.
        assert!(
            findings
                .iter()
                .any(|f| f.rule == Rule::SynsetWithoutDefinition
                    && f.severity == Severity::Error)
        );
    }

    #[test]
    fn low_confidence_metadata_is_flagged() {
        let mut ed = seeded();
        let mut meta = crate::models::Metadata::new();
        meta.insert("confidenceScore".into(), serde_json::json!(0.3));
        ed.create_synset("awn", PartOfSpeech::N, Some("awn-00001-n"))
            .unwrap();
        ed.update_synset(
            "awn-00001-n",
            crate::editor::SynsetUpdate {
                metadata: Some(meta),
                ..Default::default()
            },
        )
        .unwrap();
        let findings = ed.validate(Scope::All).unwrap();
        assert!(codes(&findings).contains(&"W014"));
    }
}
