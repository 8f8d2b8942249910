use serde_json::json;

/// Classified failure of a roster operation.
///
/// Every public store operation returns one of these instead of panicking;
/// the IPC layer maps each variant onto a stable error code.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{field} already in use: {value}")]
    Duplicate { field: &'static str, value: String },

    #[error("{0}")]
    Auth(String),

    #[error("mail delivery failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error("credential hashing failed: {0}")]
    Hash(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        StoreError::Auth(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation { .. } => "validation_failed",
            StoreError::NotFound { .. } => "not_found",
            StoreError::Duplicate { .. } => "duplicate",
            StoreError::Auth(_) => "forbidden",
            StoreError::Transport(_) => "transport_failed",
            StoreError::Db(_) => "db_query_failed",
            StoreError::Hash(_) => "internal",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            StoreError::Validation { field, .. } => Some(json!({ "field": field })),
            StoreError::Duplicate { field, .. } => Some(json!({ "field": field })),
            StoreError::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            _ => None,
        }
    }
}

impl From<crate::validation::FieldError> for StoreError {
    fn from(e: crate::validation::FieldError) -> Self {
        StoreError::Validation {
            field: e.field,
            message: e.message,
        }
    }
}
