use thiserror::Error;

/// Error type for all database operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist or belongs to another user.
    /// Carries the entity kind, e.g. "Task" or "Goal".
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Input failed validation before reaching the database.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the underlying failure is a SQLite constraint violation
    /// (CHECK, UNIQUE, FOREIGN KEY). Callers map these to client errors.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            CoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
