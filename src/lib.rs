//! Editing engine for WN-LMF 1.4 lexical knowledge bases.
//!
//! The crate wraps a transactional SQLite store behind [`Editor`], the
//! single-writer mutation engine: create, update, delete, merge, split and
//! re-link synsets, lexical entries, senses, definitions, examples and
//! typed relations, with referential integrity and bi-directional relation
//! consistency maintained under every mutation. Import and export go
//! through the WN-LMF XML interchange format and are round-trip faithful;
//! export validates first and refuses to emit a document that would not
//! re-ingest cleanly.
//!
//! ```no_run
//! use wnedit::{Editor, PartOfSpeech, SynsetRelType};
//!
//! let mut ed = Editor::open("wordnet-edit.db")?;
//! ed.create_lexicon("ewn", "Example WordNet", "en",
//!     "wn@example.org", "https://example.com/license", "1.0")?;
//! let cat = ed.create_synset("ewn", PartOfSpeech::N, None)?;
//! let feline = ed.create_synset("ewn", PartOfSpeech::N, None)?;
//! ed.add_definition(&cat.id, "A small domesticated felid", None, None)?;
//! ed.add_synset_relation(&cat.id, SynsetRelType::Hypernym, &feline.id)?;
//! // The hyponym edge back is maintained automatically.
//! # Ok::<(), wnedit::EditorError>(())
//! ```

pub mod compound;
pub mod db;
pub mod editor;
pub mod error;
pub mod export;
pub mod history;
pub mod import;
pub mod lmf;
pub mod models;
pub mod relations;
pub mod validate;

pub use editor::{Editor, EntryUpdate, LexiconUpdate, SenseUpdate, SynsetUpdate};
pub use error::{EditorError, Result};
pub use export::ConsumerSink;
pub use history::{ChangeOp, ChangeRecord};
pub use lmf::LmfVersion;
pub use models::{
    AdjPosition, Count, Definition, Entry, Example, Form, IliRef, IliStatus, Lexicon,
    LexiconDependency, Metadata, PartOfSpeech, Pronunciation, ProposedIli, Relation, Sense, Synset,
    SyntacticBehaviour, Tag,
};
pub use relations::{SenseRelType, SenseSynsetRelType, SynsetRelType};
pub use validate::{Finding, Rule, Scope, Severity};
