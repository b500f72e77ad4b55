/// All errors that can be returned by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No record with the given id exists in the collection.
    #[error("{collection} record not found: {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    /// A record with this id already exists in the collection.
    #[error("{collection} record already exists: {id}")]
    AlreadyExists {
        collection: &'static str,
        id: String,
    },

    /// The snapshot was opened against a different storage instance or
    /// is otherwise unusable.
    #[error("snapshot conflict: {0}")]
    Conflict(String),

    /// A stored collection could not be encoded or decoded.
    #[error("serialization error in {collection}: {source}")]
    Serialization {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem failure in a file-backed store.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A backend-specific storage error.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// True for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub(crate) fn not_found(collection: &'static str, id: &str) -> Self {
        StorageError::NotFound {
            collection,
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(collection: &'static str, id: &str) -> Self {
        StorageError::AlreadyExists {
            collection,
            id: id.to_string(),
        }
    }
}
