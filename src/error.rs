use std::collections::BTreeMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaskboardError>;

#[derive(Debug, Error)]
pub enum TaskboardError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Validation failed ({status}): {}", format_field_errors(.errors))]
    Validation {
        status: u16,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Server returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("ID mismatch: path ID ({path_id}) does not match record ID ({record_id})")]
    IdMismatch { path_id: i64, record_id: i64 },

    #[error("{entity} title must not be blank")]
    BlankTitle { entity: &'static str },

    #[error("Column {0} is not part of the selected board")]
    ColumnNotInBoard(i64),

    #[error("Card not found in loaded columns: {0}")]
    CardNotFound(i64),

    #[error("No board selected")]
    NoBoardSelected,

    #[error("No delete awaiting confirmation")]
    NoPendingDelete,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskboardError {
    /// True for failures raised locally, before any request was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::IdMismatch { .. }
                | Self::BlankTitle { .. }
                | Self::ColumnNotInBoard(_)
                | Self::CardNotFound(_)
                | Self::NoBoardSelected
                | Self::NoPendingDelete
        )
    }
}

fn format_field_errors(errors: &BTreeMap<String, Vec<String>>) -> String {
    if errors.is_empty() {
        return "no details".to_string();
    }
    errors
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let mut errors = BTreeMap::new();
        errors.insert(
            "Title".to_string(),
            vec!["The Title field is required.".to_string()],
        );
        let err = TaskboardError::Validation {
            status: 400,
            errors,
        };
        assert_eq!(
            err.to_string(),
            "Validation failed (400): Title: The Title field is required."
        );
    }

    #[test]
    fn test_precondition_classification() {
        assert!(TaskboardError::BlankTitle { entity: "Card" }.is_precondition());
        assert!(TaskboardError::IdMismatch {
            path_id: 1,
            record_id: 2
        }
        .is_precondition());
        assert!(!TaskboardError::NotFound {
            entity: "Card",
            id: 1
        }
        .is_precondition());
    }
}
