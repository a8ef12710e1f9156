//! Repositioning of cards within and across columns, and of columns within
//! a board.
//!
//! Moves are computed in two steps: a plan that validates the request
//! against the loaded columns and resolves the clamped 1-based position,
//! then an apply step that mutates the in-memory lists. A plan that
//! resolves to the card's current slot is `Unchanged` and must not reach
//! the server.

use crate::domain::column::Column;
use crate::domain::id::{position_by_id, CardId, ColumnId};
use crate::error::{Result, TaskboardError};
use serde::{Deserialize, Serialize};

/// Body of `PATCH /cards/{id}/Move`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardRequest {
    pub new_column_id: ColumnId,
    /// 1-based index in the target column after the move
    pub new_position: i32,
}

/// Where a card sits: column and 0-based index within its card list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardLocation {
    pub column_id: ColumnId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardMove {
    Unchanged,
    Move {
        card_id: CardId,
        from: CardLocation,
        to: CardLocation,
    },
}

impl CardMove {
    pub fn request(&self) -> Option<MoveCardRequest> {
        match self {
            Self::Unchanged => None,
            Self::Move { to, .. } => Some(MoveCardRequest {
                new_column_id: to.column_id,
                new_position: to.index as i32 + 1,
            }),
        }
    }
}

/// Finds the column and index currently holding a card
pub fn locate_card(columns: &[Column], card_id: CardId) -> Option<CardLocation> {
    columns.iter().find_map(|column| {
        column
            .cards
            .iter()
            .position(|card| card.id == card_id)
            .map(|index| CardLocation {
                column_id: column.id,
                index,
            })
    })
}

/// Resolves a move request against the loaded columns
///
/// `target_position` is 1-based; positions past the end land at the end and
/// positions below 1 land first.
pub fn plan_card_move(
    columns: &[Column],
    card_id: CardId,
    target_column_id: ColumnId,
    target_position: i32,
) -> Result<CardMove> {
    let from = locate_card(columns, card_id).ok_or(TaskboardError::CardNotFound(card_id.value()))?;
    let target = columns
        .iter()
        .find(|column| column.id == target_column_id)
        .ok_or(TaskboardError::ColumnNotInBoard(target_column_id.value()))?;

    let same_column = from.column_id == target_column_id;
    let len_after_removal = if same_column {
        target.cards.len() - 1
    } else {
        target.cards.len()
    };
    let index = (target_position.max(1) as usize - 1).min(len_after_removal);

    if same_column && index == from.index {
        return Ok(CardMove::Unchanged);
    }

    Ok(CardMove::Move {
        card_id,
        from,
        to: CardLocation {
            column_id: target_column_id,
            index,
        },
    })
}

/// Applies a planned move to the in-memory columns
///
/// The card leaves its source list, takes the target column's ID and is
/// inserted at the planned index. Both touched columns are renumbered 1..n.
pub fn apply_card_move(columns: &mut [Column], plan: &CardMove) -> Result<()> {
    let CardMove::Move { card_id, from, to } = *plan else {
        return Ok(());
    };

    let source = position_by_id(columns, from.column_id)
        .ok_or(TaskboardError::ColumnNotInBoard(from.column_id.value()))?;
    let target = position_by_id(columns, to.column_id)
        .ok_or(TaskboardError::ColumnNotInBoard(to.column_id.value()))?;

    if columns[source].cards.get(from.index).map(|card| card.id) != Some(card_id) {
        return Err(TaskboardError::CardNotFound(card_id.value()));
    }

    let mut card = columns[source].cards.remove(from.index);
    card.column_id = to.column_id;

    let target_cards = &mut columns[target].cards;
    let index = to.index.min(target_cards.len());
    target_cards.insert(index, card);

    columns[source].renumber_cards();
    columns[target].renumber_cards();
    Ok(())
}

/// Resolves a column reorder to `(from, to)` indexes, or `None` when the
/// column already sits at the requested 1-based order
pub fn plan_column_reorder(
    columns: &[Column],
    column_id: ColumnId,
    new_order: i32,
) -> Result<Option<(usize, usize)>> {
    let from = position_by_id(columns, column_id)
        .ok_or(TaskboardError::ColumnNotInBoard(column_id.value()))?;
    let to = (new_order.max(1) as usize - 1).min(columns.len() - 1);

    if from == to {
        Ok(None)
    } else {
        Ok(Some((from, to)))
    }
}

/// Moves a column between indexes and renumbers all columns 1..n
pub fn apply_column_reorder(columns: &mut Vec<Column>, from: usize, to: usize) {
    let column = columns.remove(from);
    columns.insert(to.min(columns.len()), column);
    for (index, column) in columns.iter_mut().enumerate() {
        column.order = index as i32 + 1;
    }
}
