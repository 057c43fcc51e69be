//! Domain records for the editing engine.
//!
//! Every entity the store persists has a value record here. Records are
//! immutable snapshots: mutations go through the [`Editor`](crate::Editor)
//! and return the post-state record; nothing in this module writes back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key-to-scalar metadata mapping attached to most entities.
///
/// Persisted as a single JSON blob per row and always decoded explicitly at
/// read time. Dublin Core keys (`dc:source`, `dc:type`, ...) live here.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Part-of-speech enumeration following WN-LMF 1.4 conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartOfSpeech {
    N, // Noun
    V, // Verb
    A, // Adjective
    R, // Adverb
    S, // Adjective satellite
    T, // Phrase
    C, // Conjunction
    P, // Adposition
    X, // Other
    U, // Unknown
}

impl PartOfSpeech {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartOfSpeech::N => "n",
            PartOfSpeech::V => "v",
            PartOfSpeech::A => "a",
            PartOfSpeech::R => "r",
            PartOfSpeech::S => "s",
            PartOfSpeech::T => "t",
            PartOfSpeech::C => "c",
            PartOfSpeech::P => "p",
            PartOfSpeech::X => "x",
            PartOfSpeech::U => "u",
        }
    }
}

impl std::fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PartOfSpeech::N => "noun",
                PartOfSpeech::V => "verb",
                PartOfSpeech::A => "adjective",
                PartOfSpeech::R => "adverb",
                PartOfSpeech::S => "adjective satellite",
                PartOfSpeech::T => "phrase",
                PartOfSpeech::C => "conjunction",
                PartOfSpeech::P => "adposition",
                PartOfSpeech::X => "other",
                PartOfSpeech::U => "unknown",
            }
        )
    }
}

impl std::str::FromStr for PartOfSpeech {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "n" | "noun" => Ok(PartOfSpeech::N),
            "v" | "verb" => Ok(PartOfSpeech::V),
            "a" | "adj" | "adjective" => Ok(PartOfSpeech::A),
            "r" | "adv" | "adverb" => Ok(PartOfSpeech::R),
            "s" | "adj_sat" | "adjective_satellite" => Ok(PartOfSpeech::S),
            "t" | "phrase" => Ok(PartOfSpeech::T),
            "c" | "conj" | "conjunction" => Ok(PartOfSpeech::C),
            "p" | "adp" | "adposition" => Ok(PartOfSpeech::P),
            "x" | "other" => Ok(PartOfSpeech::X),
            "u" | "unknown" => Ok(PartOfSpeech::U),
            _ => Err(format!("Invalid part of speech: {}", s)),
        }
    }
}

/// Position of an adjective relative to the noun it modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjPosition {
    /// Attributive.
    #[serde(rename = "a")]
    Attributive,
    /// Immediately postnominal.
    #[serde(rename = "ip")]
    ImmediatelyPostnominal,
    /// Predicative.
    #[serde(rename = "p")]
    Predicative,
}

impl AdjPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjPosition::Attributive => "a",
            AdjPosition::ImmediatelyPostnominal => "ip",
            AdjPosition::Predicative => "p",
        }
    }
}

impl std::str::FromStr for AdjPosition {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "a" => Ok(AdjPosition::Attributive),
            "ip" => Ok(AdjPosition::ImmediatelyPostnominal),
            "p" => Ok(AdjPosition::Predicative),
            _ => Err(format!("Invalid adjective position: {}", s)),
        }
    }
}

/// Interlingual Index reference on a synset.
///
/// Either a concrete identifier or the `"in"` sentinel marking a proposed,
/// not-yet-assigned concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IliRef {
    Id(String),
    Proposed,
}

impl Serialize for IliRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl IliRef {
    pub fn as_str(&self) -> &str {
        match self {
            IliRef::Id(id) => id,
            IliRef::Proposed => "in",
        }
    }

    pub fn parse(s: &str) -> IliRef {
        if s == "in" {
            IliRef::Proposed
        } else {
            IliRef::Id(s.to_string())
        }
    }

    pub fn is_proposed(&self) -> bool {
        matches!(self, IliRef::Proposed)
    }
}

/// Lifecycle status of an ILI row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IliStatus {
    Active,
    Deprecated,
    /// Referenced by some lexicon but never formally assigned; placeholder
    /// rows created during import carry this status.
    Presupposed,
}

impl IliStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IliStatus::Active => "active",
            IliStatus::Deprecated => "deprecated",
            IliStatus::Presupposed => "presupposed",
        }
    }
}

impl std::str::FromStr for IliStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(IliStatus::Active),
            "deprecated" => Ok(IliStatus::Deprecated),
            "presupposed" => Ok(IliStatus::Presupposed),
            _ => Err(format!("Invalid ILI status: {}", s)),
        }
    }
}

/// A versioned container of entries and synsets.
///
/// Identity is the `(id, version)` pair; `id:version` is the *specifier*.
/// The store holds at most one lexicon per `id` at a time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lexicon {
    pub id: String,
    pub label: String,
    /// BCP-47 language tag.
    pub language: String,
    pub email: String,
    pub license: String,
    pub version: String,
    pub url: Option<String>,
    pub citation: Option<String>,
    pub logo: Option<String>,
    pub metadata: Option<Metadata>,
}

impl Lexicon {
    /// The `id:version` specifier.
    pub fn specifier(&self) -> String {
        format!("{}:{}", self.id, self.version)
    }
}

/// A dependency of one lexicon on another, by specifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexiconDependency {
    pub id: String,
    pub version: String,
    pub url: Option<String>,
}

/// A concept: a set of senses plus definitions, examples and typed relations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synset {
    pub id: String,
    /// Owning lexicon id.
    pub lexicon: String,
    pub part_of_speech: PartOfSpeech,
    pub ili: Option<IliRef>,
    /// True iff at least one sense references this synset.
    pub lexicalized: bool,
    pub lexfile: Option<String>,
    pub definitions: Vec<Definition>,
    pub examples: Vec<Example>,
    /// Outgoing relations. The type is kept as stored text so documents
    /// carrying off-catalogue types survive round-trip; validation reports
    /// them.
    pub relations: Vec<Relation>,
    /// Sense ids in synset-rank order.
    pub members: Vec<String>,
    pub proposed_ili: Option<ProposedIli>,
    pub metadata: Option<Metadata>,
}

/// A word with a part-of-speech in one lexicon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: String,
    pub lexicon: String,
    pub part_of_speech: PartOfSpeech,
    /// Alternative index form for sorting/lookup.
    pub index: Option<String>,
    /// Forms in rank order; rank 0 is the lemma and always present.
    pub forms: Vec<Form>,
    /// Sense ids in entry-rank order.
    pub senses: Vec<String>,
    pub metadata: Option<Metadata>,
}

impl Entry {
    /// The lemma's written form (rank-0 form).
    pub fn lemma(&self) -> &str {
        &self.forms[0].written_form
    }
}

/// A written form within an entry. Rank 0 is the lemma.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
    pub id: Option<String>,
    pub written_form: String,
    pub script: Option<String>,
    pub rank: u32,
    pub pronunciations: Vec<Pronunciation>,
    pub tags: Vec<Tag>,
}

/// Pronunciation attached to a form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pronunciation {
    pub text: String,
    pub variety: Option<String>,
    pub notation: Option<String>,
    pub phonemic: bool,
    pub audio: Option<String>,
}

/// A categorized annotation on a form (e.g. morphological tags).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub category: String,
    pub text: String,
}

/// The bridge between one entry and one synset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sense {
    pub id: String,
    pub entry: String,
    pub synset: String,
    /// 1-based position within the entry's senses.
    pub entry_rank: u32,
    /// 1-based position within the synset's members.
    pub synset_rank: u32,
    pub lexicalized: bool,
    pub adjposition: Option<AdjPosition>,
    pub examples: Vec<Example>,
    /// Outgoing sense-to-sense relations.
    pub relations: Vec<Relation>,
    /// Outgoing sense-to-synset relations.
    pub synset_relations: Vec<Relation>,
    pub counts: Vec<Count>,
    pub metadata: Option<Metadata>,
}

/// A directed typed edge. Identity is the `(source, type, target)` triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relation {
    /// Relation type as stored; catalogue membership is checked by
    /// validation and enforced for engine-created edges.
    pub rel_type: String,
    /// Public id of the target entity.
    pub target: String,
    pub metadata: Option<Metadata>,
}

/// A textual definition of a synset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub text: String,
    pub language: Option<String>,
    /// Sense this definition was written against, when known.
    pub source_sense: Option<String>,
    pub metadata: Option<Metadata>,
}

/// A usage example on a synset or sense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Example {
    pub text: String,
    pub language: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Corpus frequency of a sense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Count {
    pub value: i64,
    pub metadata: Option<Metadata>,
}

/// A pending ILI attached to a synset whose `ili` is the `"in"` sentinel.
/// Carries the candidate definition (at least 20 characters).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposedIli {
    pub definition: String,
    pub metadata: Option<Metadata>,
}

/// Minimum length of a proposed-ILI definition.
pub const PROPOSED_ILI_MIN_DEFINITION: usize = 20;

/// A subcategorization frame shared by senses of a lexicon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntacticBehaviour {
    pub id: Option<String>,
    pub frame: String,
    /// Sense ids using this frame.
    pub senses: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn pos_round_trips_through_str() {
        for pos in [
            PartOfSpeech::N,
            PartOfSpeech::V,
            PartOfSpeech::A,
            PartOfSpeech::R,
            PartOfSpeech::S,
            PartOfSpeech::T,
            PartOfSpeech::C,
            PartOfSpeech::P,
            PartOfSpeech::X,
            PartOfSpeech::U,
        ] {
            assert_eq!(PartOfSpeech::from_str(pos.as_str()), Ok(pos));
        }
    }

    #[test]
    fn ili_sentinel_parses_as_proposed() {
        assert_eq!(IliRef::parse("in"), IliRef::Proposed);
        assert_eq!(IliRef::parse("i90287"), IliRef::Id("i90287".to_string()));
        assert_eq!(IliRef::Proposed.as_str(), "in");
    }

    #[test]
    fn lexicon_specifier_joins_id_and_version() {
        let lex = Lexicon {
            id: "awn".into(),
            label: "Arabic WordNet".into(),
            language: "arb".into(),
            email: "wn@example.org".into(),
            license: "https://creativecommons.org/licenses/by/4.0/".into(),
            version: "4.0".into(),
            url: None,
            citation: None,
            logo: None,
            metadata: None,
        };
        assert_eq!(lex.specifier(), "awn:4.0");
    }
}
