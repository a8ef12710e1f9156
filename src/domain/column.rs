use crate::domain::card::Card;
use crate::domain::id::{order_or_zero, BoardId, CardId, ColumnId, Identified};
use serde::{Deserialize, Deserializer, Serialize};

/// Ordered container of cards within a board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default)]
    pub id: ColumnId,
    pub title: String,
    #[serde(default, deserialize_with = "order_or_zero")]
    pub order: i32,
    pub board_id: BoardId,
    #[serde(default, deserialize_with = "null_as_empty_list")]
    pub cards: Vec<Card>,
}

impl Column {
    /// Creates an unsaved column at the given 1-based position
    pub fn new(board_id: BoardId, title: impl Into<String>, order: i32) -> Self {
        Self {
            id: ColumnId::default(),
            title: title.into(),
            order,
            board_id,
            cards: Vec::new(),
        }
    }

    /// Identity of the column as rendered
    pub fn key(&self) -> ColumnId {
        self.id
    }

    pub fn contains_card(&self, card_id: CardId) -> bool {
        self.cards.iter().any(|card| card.id == card_id)
    }

    /// Reassigns 1-based orders following the current card sequence
    pub fn renumber_cards(&mut self) {
        for (index, card) in self.cards.iter_mut().enumerate() {
            card.order = index as i32 + 1;
        }
    }

    /// Payload for create/update calls; cards travel through their own endpoints
    pub(crate) fn without_cards(&self) -> Self {
        Self {
            id: self.id,
            title: self.title.trim().to_string(),
            order: self.order,
            board_id: self.board_id,
            cards: Vec::new(),
        }
    }
}

impl Identified for Column {
    type Id = ColumnId;

    fn id(&self) -> ColumnId {
        self.id
    }
}

fn null_as_empty_list<'de, D>(deserializer: D) -> Result<Vec<Card>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Card>>::deserialize(deserializer)?.unwrap_or_default())
}
