//! Error types for the Daylog core library.

use thiserror::Error;

/// All errors that can occur within the Daylog core library.
#[derive(Debug, Error)]
pub enum DaylogError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A notebook ID was requested that does not exist in the database.
    #[error("Notebook not found: {0}")]
    NotebookNotFound(String),

    /// A note ID was requested that does not exist in the database.
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// A component ID was requested that is not part of the addressed set.
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    /// A component set failed validation and was not written.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The opened file is not a valid Daylog journal.
    #[error("Invalid journal: {0}")]
    InvalidJournal(String),

    /// Settings could not be read or written.
    #[error("Settings error: {0}")]
    Settings(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored JSON could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`DaylogError`].
pub type Result<T> = std::result::Result<T, DaylogError>;

impl DaylogError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::NotebookNotFound(_) => "Notebook no longer exists".to_string(),
            Self::NoteNotFound(_) => "Note no longer exists".to_string(),
            Self::ComponentNotFound(_) => "Component no longer exists".to_string(),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::InvalidJournal(_) => "Could not open journal file".to_string(),
            Self::Settings(msg) => format!("Settings error: {msg}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages_hide_ids() {
        let e = DaylogError::NoteNotFound("abc-123".to_string());
        assert!(e.to_string().contains("abc-123"));
        assert!(!e.user_message().contains("abc-123"));
    }

    #[test]
    fn test_validation_message_passes_through() {
        let e = DaylogError::ValidationFailed("component #0 is missing a title".to_string());
        assert_eq!(e.user_message(), "component #0 is missing a title");
    }
}
