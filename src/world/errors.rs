use thiserror::Error;

use crate::store::StoreError;

/// Errors that can arise while reading or mutating the world model.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Backend failure. A missing key never surfaces here; the model
    /// substitutes defaults for those.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored record did not have the expected shape.
    #[error("malformed {entity} record: {source}")]
    Malformed {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A stored table is not a JSON array. It is left as stored.
    #[error("stored {entity} table is not a list")]
    NotATable { entity: &'static str },

    /// Returned when an operation targets an id absent from its table.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The id has no compiled-in default to reset to.
    #[error("no built-in default for location {0}")]
    NoDefault(String),
}
