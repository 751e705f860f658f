use thiserror::Error;

/// Persistence errors raised by the JSON file store and the SQL store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading, writing or renaming the data file failed
    #[error("Data file error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The data file or a stored JSON column could not be (de)serialised
    #[error("Invalid stored data: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database operation failed
    #[cfg(feature = "server")]
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A record references a parent that does not exist
    #[error("{entity} {id} not found")]
    MissingReference { entity: &'static str, id: String },

    /// A merged update produced a record that no longer fits its schema
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// Unique constraint violated (duplicate user email)
    #[error("{0} already exists")]
    Duplicate(String),
}

impl StoreError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_reference_message() {
        let err = StoreError::MissingReference {
            entity: "project",
            id: "project-abc123".to_string(),
        };
        assert_eq!(err.to_string(), "project project-abc123 not found");
    }

    #[test]
    fn test_io_error_names_the_path() {
        let err = StoreError::io(
            "/tmp/db.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/db.json"));
    }
}
