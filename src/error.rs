use thiserror::Error;

use crate::{
    definition::UnknownRole,
    event::EventIdentity,
    label::{ObjectKind, UnknownLabel},
    store::{Field, PairField},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "Ranking keys for event {id} have inconsistent arity: current key has {current} entries, candidate key has {candidate}"
    )]
    MalformedRankingKey {
        id: EventIdentity,
        current: usize,
        candidate: usize,
    },
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),
    #[error(transparent)]
    UnknownLabel(#[from] UnknownLabel),
    #[error("Unknown identification predicate: {0}")]
    UnknownIdPredicate(String),
    #[error("Object definition {definition} has no role {role}")]
    NoSuchRole { role: usize, definition: String },
    #[error("Field {field} is not available for {kind} objects (role {role})")]
    MissingField {
        role: usize,
        kind: ObjectKind,
        field: Field,
    },
    #[error("Pair field {field} is not available for {kinds:?} objects (roles {roles:?})")]
    MissingPairField {
        roles: (usize, usize),
        kinds: (ObjectKind, ObjectKind),
        field: PairField,
    },
    #[error("Failed to read analysis settings")]
    Settings(#[from] serde_json::Error),
    #[error("Failed to commit row to output")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, Error>;
