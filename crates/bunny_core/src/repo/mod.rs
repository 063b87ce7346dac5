//! Transaction-scoped persistence: records, ordered indexes and focus buckets.
//!
//! # Responsibility
//! - Wrap store transactions with typed per-entity accessors.
//! - Keep ordered collections dense (`1..=N`) across insert, move and delete.
//! - Report semantic errors (`NotFound`, `Range`) next to storage failures.
//!
//! # Invariants
//! - Every accessor of one `DataTx` shares the same store transaction.
//! - Write paths never swallow errors; the caller's transaction rolls back.

use crate::codec::{CodecError, EntityKind, KeyError, Position};
use crate::db::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod focus;
pub mod ordered;
pub mod records;
pub mod tx;

pub type RepoResult<T> = Result<T, RepoError>;

/// Coarse classification of a [`RepoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced entity or membership does not exist.
    NotFound,
    /// Stored data could not be decoded; treated as corruption.
    Malformed,
    /// A value could not be encoded.
    Serialize,
    /// A position or id argument fell outside its valid range.
    Range,
    /// The store itself failed.
    Store,
}

#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
    NotFound {
        entity: EntityKind,
        id: u64,
    },
    /// The member is not part of the collection the operation targets.
    NotInCollection {
        collection: String,
        member: String,
    },
    Malformed {
        key: String,
        source: serde_json::Error,
    },
    MalformedKey(KeyError),
    /// Position entries and membership entries disagree.
    CorruptIndex(String),
    Serialize(serde_json::Error),
    /// `position` is outside `1..=max`.
    Range {
        position: Position,
        max: Position,
    },
    /// Records are identified by positive ids; 0 was supplied.
    InvalidId {
        entity: EntityKind,
    },
    /// The highest id is taken, so no new one can be assigned.
    IdsExhausted {
        entity: EntityKind,
    },
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(_) => ErrorKind::Store,
            Self::NotFound { .. } | Self::NotInCollection { .. } => ErrorKind::NotFound,
            Self::Malformed { .. } | Self::MalformedKey(_) | Self::CorruptIndex(_) => {
                ErrorKind::Malformed
            }
            Self::Serialize(_) => ErrorKind::Serialize,
            Self::Range { .. } | Self::InvalidId { .. } | Self::IdsExhausted { .. } => {
                ErrorKind::Range
            }
        }
    }

    pub(crate) fn not_found(entity: EntityKind, id: u64) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::NotInCollection { collection, member } => {
                write!(f, "{member} is not a member of {collection}")
            }
            Self::Malformed { key, source } => {
                write!(f, "malformed value under `{key}`: {source}")
            }
            Self::MalformedKey(err) => write!(f, "{err}"),
            Self::CorruptIndex(message) => write!(f, "corrupt index: {message}"),
            Self::Serialize(err) => write!(f, "failed to serialize value: {err}"),
            Self::Range { position, max } => {
                write!(f, "position {position} is outside 1..={max}")
            }
            Self::InvalidId { entity } => write!(f, "{entity} id must be positive"),
            Self::IdsExhausted { entity } => write!(f, "no {entity} ids left to assign"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Malformed { source, .. } => Some(source),
            Self::MalformedKey(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::NotFound { .. }
            | Self::NotInCollection { .. }
            | Self::CorruptIndex(_)
            | Self::Range { .. }
            | Self::InvalidId { .. }
            | Self::IdsExhausted { .. } => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(StoreError::Sqlite(value))
    }
}

impl From<KeyError> for RepoError {
    fn from(value: KeyError) -> Self {
        Self::MalformedKey(value)
    }
}

impl From<CodecError> for RepoError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::Serialize(err) => Self::Serialize(err),
            CodecError::Malformed { key, source } => Self::Malformed { key, source },
        }
    }
}
