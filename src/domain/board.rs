use crate::domain::id::{BoardId, Identified};
use serde::{Deserialize, Serialize};

/// Top-level container of columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(default)]
    pub id: BoardId,
    pub title: String,
}

impl Board {
    /// Creates an unsaved board with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: BoardId::default(),
            title: title.into(),
        }
    }

    /// Returns a copy carrying a trimmed title
    pub fn with_title(&self, title: &str) -> Self {
        Self {
            id: self.id,
            title: title.trim().to_string(),
        }
    }
}

impl Identified for Board {
    type Id = BoardId;

    fn id(&self) -> BoardId {
        self.id
    }
}
