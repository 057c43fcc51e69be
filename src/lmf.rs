//! Typed tree for WN-LMF interchange documents, plus parse/serialize entry
//! points.
//!
//! This is the boundary to the external XML format: the import pipeline
//! consumes a [`LexicalResource`] and the export pipeline produces one.
//! The tree mirrors the WN-LMF 1.4 schema; relation types are carried as
//! plain strings so off-catalogue types in third-party documents survive a
//! round trip (validation reports them instead of the parser rejecting them).

use crate::error::Result;
use crate::models::PartOfSpeech;
use log::debug;
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};

/// Dublin Core namespace declared on emitted documents.
pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// Interchange format versions the export pipeline can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LmfVersion {
    V1_0,
    V1_1,
    #[default]
    V1_4,
}

impl LmfVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            LmfVersion::V1_0 => "1.0",
            LmfVersion::V1_1 => "1.1",
            LmfVersion::V1_4 => "1.4",
        }
    }

    fn dtd_url(&self) -> String {
        format!(
            "http://globalwordnet.github.io/schemas/WN-LMF-{}.dtd",
            self.as_str()
        )
    }
}

impl std::str::FromStr for LmfVersion {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1.0" => Ok(LmfVersion::V1_0),
            "1.1" => Ok(LmfVersion::V1_1),
            "1.4" => Ok(LmfVersion::V1_4),
            _ => Err(format!("Unsupported WN-LMF version: {}", s)),
        }
    }
}

/// Root structure of a WN-LMF document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LexicalResource {
    #[serde(rename = "@xmlns:dc", default, skip_serializing_if = "Option::is_none")]
    pub xmlns_dc: Option<String>,
    #[serde(rename = "Lexicon", default)]
    pub lexicons: Vec<Lexicon>,
}

/// A lexicon containing lexical entries and synsets for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@label")]
    pub label: String,
    #[serde(rename = "@language")]
    pub language: String,
    #[serde(rename = "@email")]
    pub email: String,
    #[serde(rename = "@license")]
    pub license: String,
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(rename = "@url", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "@citation", default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(rename = "@logo", default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(rename = "@status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "@confidenceScore", default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(rename(serialize = "@dc:publisher", deserialize = "@publisher"), default, skip_serializing_if = "Option::is_none")]
    pub dc_publisher: Option<String>,
    #[serde(rename(serialize = "@dc:contributor", deserialize = "@contributor"), default, skip_serializing_if = "Option::is_none")]
    pub dc_contributor: Option<String>,

    #[serde(rename = "Requires", default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Requires>,
    #[serde(rename = "LexicalEntry", default, skip_serializing_if = "Vec::is_empty")]
    pub lexical_entries: Vec<LexicalEntry>,
    #[serde(rename = "Synset", default, skip_serializing_if = "Vec::is_empty")]
    pub synsets: Vec<Synset>,
    #[serde(rename = "SyntacticBehaviour", default, skip_serializing_if = "Vec::is_empty")]
    pub syntactic_behaviours: Vec<SyntacticBehaviour>,
}

/// Dependency requirement for a lexicon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requires {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(rename = "@url", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A lexical entry: lemma, extra forms, senses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalEntry {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "Lemma")]
    pub lemma: Lemma,
    #[serde(rename = "Form", default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,
    #[serde(rename = "Sense", default, skip_serializing_if = "Vec::is_empty")]
    pub senses: Vec<Sense>,
}

/// The canonical written form of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lemma {
    #[serde(rename = "@writtenForm")]
    pub written_form: String,
    #[serde(rename = "@partOfSpeech")]
    pub part_of_speech: PartOfSpeech,
    #[serde(rename = "@script", default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(rename = "Pronunciation", default, skip_serializing_if = "Vec::is_empty")]
    pub pronunciations: Vec<Pronunciation>,
    #[serde(rename = "Tag", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// An additional (non-lemma) written form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@writtenForm")]
    pub written_form: String,
    #[serde(rename = "@script", default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(rename = "Pronunciation", default, skip_serializing_if = "Vec::is_empty")]
    pub pronunciations: Vec<Pronunciation>,
    #[serde(rename = "Tag", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Pronunciation of a lemma or form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pronunciation {
    #[serde(rename = "@variety", default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    #[serde(rename = "@notation", default, skip_serializing_if = "Option::is_none")]
    pub notation: Option<String>,
    #[serde(rename = "@phonemic", default = "default_true", skip_serializing_if = "is_true")]
    pub phonemic: bool,
    #[serde(rename = "@audio", default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(rename = "$text")]
    pub text: String,
}

/// A categorized annotation on a lemma or form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "@category")]
    pub category: String,
    #[serde(rename = "$text")]
    pub text: String,
}

/// A sense connecting a lexical entry to a synset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sense {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@synset")]
    pub synset: String,
    /// 1-based rank within the entry (LMF 1.4).
    #[serde(rename = "@n", default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(rename = "@lexicalized", default = "default_true", skip_serializing_if = "is_true")]
    pub lexicalized: bool,
    #[serde(rename = "@adjposition", default, skip_serializing_if = "Option::is_none")]
    pub adjposition: Option<String>,
    /// Space-separated syntactic behaviour ids.
    #[serde(rename = "@subcat", default, skip_serializing_if = "Option::is_none")]
    pub subcat: Option<String>,
    #[serde(rename = "SenseRelation", default, skip_serializing_if = "Vec::is_empty")]
    pub sense_relations: Vec<SenseRelation>,
    #[serde(rename = "Example", default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
    #[serde(rename = "Count", default, skip_serializing_if = "Vec::is_empty")]
    pub counts: Vec<Count>,
}

/// A relationship from a sense to another sense or (for the four
/// sense-to-synset types) to a synset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseRelation {
    #[serde(rename = "@relType")]
    pub rel_type: String,
    #[serde(rename = "@target")]
    pub target: String,
    #[serde(rename(serialize = "@dc:type", deserialize = "@type"), default, skip_serializing_if = "Option::is_none")]
    pub dc_type: Option<String>,
}

/// Corpus frequency of a sense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Count {
    #[serde(rename(serialize = "@dc:source", deserialize = "@source"), default, skip_serializing_if = "Option::is_none")]
    pub dc_source: Option<String>,
    #[serde(rename = "$text")]
    pub value: i64,
}

/// A synset (synonym set) representing one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synset {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@ili", default, skip_serializing_if = "Option::is_none")]
    pub ili: Option<String>,
    #[serde(rename = "@partOfSpeech")]
    pub part_of_speech: PartOfSpeech,
    #[serde(rename = "@lexicalized", default = "default_true", skip_serializing_if = "is_true")]
    pub lexicalized: bool,
    /// Space-separated list of member sense ids.
    #[serde(rename = "@members", default, skip_serializing_if = "String::is_empty")]
    pub members: String,
    #[serde(rename = "@lexfile", default, skip_serializing_if = "Option::is_none")]
    pub lexfile: Option<String>,
    #[serde(rename(serialize = "@dc:source", deserialize = "@source"), default, skip_serializing_if = "Option::is_none")]
    pub dc_source: Option<String>,
    #[serde(rename = "Definition", default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<Definition>,
    #[serde(rename = "ILIDefinition", default, skip_serializing_if = "Option::is_none")]
    pub ili_definition: Option<ILIDefinition>,
    #[serde(rename = "SynsetRelation", default, skip_serializing_if = "Vec::is_empty")]
    pub synset_relations: Vec<SynsetRelation>,
    #[serde(rename = "Example", default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
}

/// A definition of a synset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(rename = "@language", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "@sourceSense", default, skip_serializing_if = "Option::is_none")]
    pub source_sense: Option<String>,
    #[serde(rename(serialize = "@dc:source", deserialize = "@source"), default, skip_serializing_if = "Option::is_none")]
    pub dc_source: Option<String>,
    #[serde(rename = "$text")]
    pub text: String,
}

/// The definition proposed for a pending ILI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ILIDefinition {
    #[serde(rename(serialize = "@dc:source", deserialize = "@source"), default, skip_serializing_if = "Option::is_none")]
    pub dc_source: Option<String>,
    #[serde(rename = "$text")]
    pub text: String,
}

/// A relationship between synsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynsetRelation {
    #[serde(rename = "@relType")]
    pub rel_type: String,
    #[serde(rename = "@target")]
    pub target: String,
    #[serde(rename(serialize = "@dc:type", deserialize = "@type"), default, skip_serializing_if = "Option::is_none")]
    pub dc_type: Option<String>,
}

/// A usage example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(rename = "@language", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename(serialize = "@dc:source", deserialize = "@source"), default, skip_serializing_if = "Option::is_none")]
    pub dc_source: Option<String>,
    #[serde(rename = "$text")]
    pub text: String,
}

/// A subcategorization frame shared by senses of a lexicon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntacticBehaviour {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@subcategorizationFrame")]
    pub subcategorization_frame: String,
    /// Space-separated sense ids (pre-1.1 style documents).
    #[serde(rename = "@senses", default, skip_serializing_if = "Option::is_none")]
    pub senses: Option<String>,
}

fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires the reference
fn is_true(b: &bool) -> bool {
    *b
}

/// Splits a space-separated id list attribute.
pub fn split_id_list(list: &str) -> Vec<String> {
    list.split_whitespace().map(String::from).collect()
}

/// Parses WN-LMF XML content into a [`LexicalResource`].
pub fn parse_document(xml: &str) -> Result<LexicalResource> {
    debug!("Parsing WN-LMF XML document ({} bytes)...", xml.len());
    let resource: LexicalResource = from_str(xml)?;
    debug!(
        "Parsed WN-LMF document with {} lexicon(s).",
        resource.lexicons.len()
    );
    Ok(resource)
}

/// Serializes a [`LexicalResource`] to a WN-LMF XML document with the
/// declaration and DOCTYPE for `version`.
pub fn serialize_document(resource: &LexicalResource, version: LmfVersion) -> Result<String> {
    let mut body = String::new();
    let mut ser = quick_xml::se::Serializer::new(&mut body);
    ser.indent(' ', 2);
    resource.serialize(ser)?;
    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE LexicalResource SYSTEM \"{}\">\n{}\n",
        version.dtd_url(),
        body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_LMF_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE LexicalResource SYSTEM "http://globalwordnet.github.io/schemas/WN-LMF-1.4.dtd">
<LexicalResource xmlns:dc="http://purl.org/dc/elements/1.1/">
  <Lexicon id="test-en"
           label="Test Wordnet (English)"
           language="en"
           email="test@example.com"
           license="https://example.com/license"
           version="1.0">
    <LexicalEntry id="test-en-cat-n">
      <Lemma writtenForm="cat" partOfSpeech="n"/>
      <Sense id="test-en-cat-n-1" synset="test-en-1-n"/>
    </LexicalEntry>
    <Synset id="test-en-1-n" partOfSpeech="n" members="test-en-cat-n-1">
      <Definition>A small domesticated carnivorous mammal.</Definition>
    </Synset>
  </Lexicon>
</LexicalResource>
"#;

    #[test]
    fn parse_minimal_document() {
        let resource = parse_document(MINIMAL_LMF_XML).unwrap();
        assert_eq!(resource.lexicons.len(), 1);
        let lexicon = &resource.lexicons[0];
        assert_eq!(lexicon.id, "test-en");
        assert_eq!(lexicon.lexical_entries.len(), 1);
        assert_eq!(lexicon.synsets.len(), 1);
        assert_eq!(lexicon.lexical_entries[0].lemma.written_form, "cat");
        assert_eq!(
            lexicon.synsets[0].definitions[0].text,
            "A small domesticated carnivorous mammal."
        );
        assert!(lexicon.synsets[0].lexicalized);
    }

    const LMF_WITH_PRONUNCIATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE LexicalResource SYSTEM "http://globalwordnet.github.io/schemas/WN-LMF-1.4.dtd">
<LexicalResource xmlns:dc="http://purl.org/dc/elements/1.1/">
  <Lexicon id="test-en"
           label="Test Wordnet (English)"
           language="en"
           email="test@example.com"
           license="https://example.com/license"
           version="1.0">
    <LexicalEntry id="test-en-rabbit-n">
      <Lemma writtenForm="rabbit" partOfSpeech="n">
        <Pronunciation variety="en-GB-fonipa" audio="http://example.com/rabbit.flac">'ræbɪt</Pronunciation>
        <Pronunciation variety="en-US-fonipa" phonemic="false">'ɹæbɪt</Pronunciation>
      </Lemma>
      <Sense id="test-en-rabbit-n-1" synset="test-en-2-n"/>
    </LexicalEntry>
    <Synset id="test-en-2-n" partOfSpeech="n" members="test-en-rabbit-n-1">
      <Definition>A burrowing mammal.</Definition>
    </Synset>
  </Lexicon>
</LexicalResource>
"#;

    #[test]
    fn parse_pronunciations_on_lemma() {
        let resource = parse_document(LMF_WITH_PRONUNCIATION).unwrap();
        let lemma = &resource.lexicons[0].lexical_entries[0].lemma;
        assert_eq!(lemma.pronunciations.len(), 2);
        assert_eq!(lemma.pronunciations[0].variety.as_deref(), Some("en-GB-fonipa"));
        assert_eq!(lemma.pronunciations[0].text, "'ræbɪt");
        assert_eq!(
            lemma.pronunciations[0].audio.as_deref(),
            Some("http://example.com/rabbit.flac")
        );
        assert!(lemma.pronunciations[0].phonemic); // Default
        assert!(!lemma.pronunciations[1].phonemic);
    }

    #[test]
    fn parse_relations_and_ili() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<LexicalResource>
  <Lexicon id="test-en" label="T" language="en" email="a@b.c" license="l" version="1">
    <Synset id="test-en-1-n" partOfSpeech="n" ili="i12345">
      <Definition>A feline.</Definition>
      <SynsetRelation relType="hypernym" target="test-en-2-n"/>
    </Synset>
    <Synset id="test-en-2-n" partOfSpeech="n" ili="in">
      <Definition>An animal of some description.</Definition>
      <ILIDefinition>An animal of some description.</ILIDefinition>
      <SynsetRelation relType="hyponym" target="test-en-1-n"/>
    </Synset>
  </Lexicon>
</LexicalResource>"#;
        let resource = parse_document(xml).unwrap();
        let synsets = &resource.lexicons[0].synsets;
        assert_eq!(synsets[0].ili.as_deref(), Some("i12345"));
        assert_eq!(synsets[0].synset_relations[0].rel_type, "hypernym");
        assert_eq!(synsets[1].ili.as_deref(), Some("in"));
        assert!(synsets[1].ili_definition.is_some());
    }

    #[test]
    fn serialized_document_reparses_equal() {
        let resource = parse_document(MINIMAL_LMF_XML).unwrap();
        let xml = serialize_document(&resource, LmfVersion::V1_4).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\""));
        assert!(xml.contains("WN-LMF-1.4.dtd"));
        let reparsed = parse_document(&xml).unwrap();
        assert_eq!(reparsed, resource);
    }

    #[test]
    fn lmf_version_strings() {
        assert_eq!("1.4".parse::<LmfVersion>(), Ok(LmfVersion::V1_4));
        assert_eq!(LmfVersion::V1_0.as_str(), "1.0");
        assert!("2.0".parse::<LmfVersion>().is_err());
    }
}
