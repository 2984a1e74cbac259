use std::fmt;

/// Error type for persistence operations (sessions, lookups, observers).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Transaction already finished")]
    Finished,

    #[error("Stored value could not be decoded: {0}")]
    Decode(String),

    #[error("Referenced row does not exist: {0}")]
    ForeignKey(String),

    #[error("Duplicate row: {0}")]
    Duplicate(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// The transaction committed, but at least one observer failed afterwards.
    #[error("Transaction observer failed: {0}")]
    Observer(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for persistence operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse classification of workflow failures.
///
/// The API layer maps each kind onto a transport status and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// HTTP status code conventionally used for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidInput => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Errors returned by the order workflow.
///
/// Raw storage errors never escape uninterpreted: they are either
/// classified here (unique/foreign-key violations) or wrapped as
/// [`OrderError::Internal`].
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    #[error("Internal error: {0}")]
    Internal(StoreError),
}

/// Result type for workflow operations
pub type OrderResult<T> = Result<T, OrderError>;

impl OrderError {
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        OrderError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        OrderError::InvalidInput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotFound { .. } => ErrorKind::NotFound,
            OrderError::InvalidInput(_) => ErrorKind::InvalidInput,
            OrderError::Conflict(_) => ErrorKind::Conflict,
            OrderError::DeadlineExceeded | OrderError::Internal(_) => ErrorKind::Internal,
        }
    }
}

// Postgres SQLSTATE codes
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::ForeignKey(message) => return OrderError::InvalidInput(message.clone()),
            StoreError::Duplicate(message) => return OrderError::Conflict(message.clone()),
            StoreError::OutOfRange(message) => return OrderError::InvalidInput(message.clone()),
            _ => {}
        }
        if let StoreError::Database(sqlx::Error::Database(db_err)) = &err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return OrderError::Conflict(db_err.message().to_string())
                }
                Some(FOREIGN_KEY_VIOLATION) | Some(NUMERIC_VALUE_OUT_OF_RANGE) => {
                    return OrderError::InvalidInput(db_err.message().to_string())
                }
                _ => {}
            }
        }
        OrderError::Internal(err)
    }
}
