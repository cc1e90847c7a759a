use thiserror::Error;

/// Failures an operation reports back to the caller.
///
/// The console prints the `Display` text and keeps going; only
/// [`MessengerError::Connection`] is fatal.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// Input rejected before touching the database
    #[error("{0}")]
    Validation(String),

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// The row already exists or a constraint rejected it
    #[error("{0}")]
    Conflict(String),

    /// The session may not act on this chat or message
    #[error("{0}")]
    Forbidden(String),

    #[error("Unable to connect to database: {0:#}")]
    Connection(anyhow::Error),

    #[error("Database error: {0:#}")]
    Database(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MessengerError>;

impl MessengerError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        MessengerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, MessengerError::Connection(_))
    }
}

impl From<anyhow::Error> for MessengerError {
    fn from(err: anyhow::Error) -> Self {
        if messenger_db::is_constraint_violation(&err) {
            MessengerError::Conflict(format!("Rejected by the database: {}", err.root_cause()))
        } else {
            MessengerError::Database(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity() {
        let err = MessengerError::not_found("Chat", 42);
        assert_eq!(err.to_string(), "Chat '42' not found");
        assert!(!err.is_fatal());
    }

    #[test]
    fn plain_database_errors_stay_database_errors() {
        let err: MessengerError = anyhow::anyhow!("disk I/O error").into();
        assert!(matches!(err, MessengerError::Database(_)));
        assert_eq!(err.to_string(), "Database error: disk I/O error");
    }
}
