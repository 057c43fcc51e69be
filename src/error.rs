//! Error types and handling for the wnedit library.
//!
//! Every public mutation either returns the post-state record or raises one
//! of the variants below; a failed operation never leaves a partially
//! applied transaction behind.

use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Comprehensive error type for the editing engine.
///
/// Variants carry the entity kind and id they concern where that is
/// meaningful, plus a human-readable message.
#[derive(Error, Debug)]
pub enum EditorError {
    /// A domain constraint was violated (bad POS, self-loop relation,
    /// id prefix mismatch, ILI rule breach, invalid relation type).
    #[error("validation error on {kind} '{id}': {message}")]
    Validation {
        kind: &'static str,
        id: String,
        message: String,
    },

    /// A referenced entity is absent from the store.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// An id or specifier collides with an existing row.
    #[error("duplicate {kind}: {id}")]
    Duplicate { kind: &'static str, id: String },

    /// A structural constraint was violated, e.g. deleting an entity that is
    /// still referenced, or moving a sense onto a synset its entry already
    /// participates in.
    #[error("relation error on {kind} '{id}': {message}")]
    Relation {
        kind: &'static str,
        id: String,
        message: String,
    },

    /// Irreconcilable state inside a compound operation (e.g. both merge
    /// operands carry a concrete ILI).
    #[error("conflict on {kind} '{id}': {message}")]
    Conflict {
        kind: &'static str,
        id: String,
        message: String,
    },

    /// External parse or ingest failed.
    #[error("import error: {0}")]
    Import(String),

    /// The emitted XML failed validation or could not be handed off.
    #[error("export error: {0}")]
    Export(String),

    /// Storage unavailable, schema version mismatch, or any other
    /// SQLite-level failure that is not the defined idempotency point.
    #[error("database error: {0}")]
    Db(String),

    /// I/O operations failed (store file, temporary export file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML deserialization failed.
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] quick_xml::DeError),

    /// XML serialization failed.
    #[error("XML serialization error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),

    /// Metadata or history payload could not be (de)serialized.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for EditorError {
    fn from(err: rusqlite::Error) -> Self {
        EditorError::Db(err.to_string())
    }
}

impl EditorError {
    pub(crate) fn validation(
        kind: &'static str,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EditorError::Validation {
            kind,
            id: id.into(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        EditorError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn duplicate(kind: &'static str, id: impl Into<String>) -> Self {
        EditorError::Duplicate {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn relation(
        kind: &'static str,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EditorError::Relation {
            kind,
            id: id.into(),
            message: message.into(),
        }
    }

    pub(crate) fn conflict(
        kind: &'static str,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EditorError::Conflict {
            kind,
            id: id.into(),
            message: message.into(),
        }
    }
}

/// True when `err` is a UNIQUE-constraint failure.
///
/// Relation-triple inserts treat a pre-existing identical edge as success;
/// this is the only integrity failure the engine is allowed to suppress.
/// FK and NOT NULL violations carry different extended codes and re-raise.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_discriminated_from_other_constraints() {
        let unique = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::ConstraintViolation,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            Some("UNIQUE constraint failed: synset_relations".into()),
        );
        assert!(is_unique_violation(&unique));

        let fk = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::ConstraintViolation,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            Some("FOREIGN KEY constraint failed".into()),
        );
        assert!(!is_unique_violation(&fk));

        let notnull = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::ConstraintViolation,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL,
            },
            None,
        );
        assert!(!is_unique_violation(&notnull));
    }
}
