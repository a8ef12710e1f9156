use crate::{
    api::BoardApi,
    domain::{Board, BoardId, Card, CardId, Column, ColumnId, MoveCardRequest, Priority},
    error::{Result, TaskboardError},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::{Mutex, MutexGuard};

/// A request received by `MemoryApi`, recorded in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListBoards,
    GetBoard(BoardId),
    CreateBoard,
    UpdateBoard(BoardId),
    DeleteBoard(BoardId),
    ListColumns(BoardId),
    CreateColumn,
    UpdateColumn(ColumnId),
    DeleteColumn(ColumnId),
    ReorderColumn(ColumnId, i32),
    ListCards(ColumnId),
    CreateCard,
    UpdateCard(CardId),
    DeleteCard(CardId),
    MoveCard(CardId, MoveCardRequest),
}

impl ApiCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::ListBoards | Self::GetBoard(_) | Self::ListColumns(_) | Self::ListCards(_)
        )
    }
}

#[derive(Debug)]
struct State {
    boards: Vec<Board>,
    /// Stored without nested cards
    columns: Vec<Column>,
    cards: Vec<Card>,
    next_id: i64,
    calls: Vec<ApiCall>,
    /// Requests still to pass before the armed error is returned
    fail_next: Option<(usize, TaskboardError)>,
    echo_updated_cards: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            boards: Vec::new(),
            columns: Vec::new(),
            cards: Vec::new(),
            next_id: 1,
            calls: Vec::new(),
            fail_next: None,
            echo_updated_cards: true,
        }
    }
}

impl State {
    fn assign_id(&mut self, requested: i64) -> i64 {
        let id = if requested == 0 { self.next_id } else { requested };
        self.next_id = self.next_id.max(id + 1);
        id
    }

    fn column(&self, id: ColumnId) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.id == id)
            .ok_or(TaskboardError::NotFound {
                entity: "Column",
                id: id.value(),
            })
    }

    fn require_board(&self, id: BoardId) -> Result<()> {
        if self.boards.iter().any(|b| b.id == id) {
            Ok(())
        } else {
            Err(TaskboardError::NotFound {
                entity: "Board",
                id: id.value(),
            })
        }
    }

    /// Card IDs of a column, ascending by order, storage order on ties
    fn card_sequence(&self, column_id: ColumnId) -> Vec<CardId> {
        let mut cards: Vec<&Card> = self
            .cards
            .iter()
            .filter(|c| c.column_id == column_id)
            .collect();
        cards.sort_by_key(|c| c.order);
        cards.into_iter().map(|c| c.id).collect()
    }

    fn write_sequence(&mut self, column_id: ColumnId, sequence: &[CardId]) {
        for (index, id) in sequence.iter().enumerate() {
            if let Some(card) = self.cards.iter_mut().find(|c| c.id == *id) {
                card.column_id = column_id;
                card.order = index as i32 + 1;
            }
        }
    }

    fn next_card_order(&self, column_id: ColumnId) -> i32 {
        self.cards
            .iter()
            .filter(|c| c.column_id == column_id)
            .map(|c| c.order)
            .max()
            .unwrap_or(0)
            + 1
    }

    fn validate_title(title: &str, field: &str) -> Result<()> {
        if title.trim().is_empty() {
            let mut errors = BTreeMap::new();
            errors.insert(
                field.to_string(),
                vec![format!("The {} field is required.", field)],
            );
            return Err(TaskboardError::Validation {
                status: 400,
                errors,
            });
        }
        Ok(())
    }
}

/// In-process `BoardApi` with the server's semantics
///
/// Assigns IDs, keeps orders, cascades column deletion onto the board's
/// first remaining column and renumbers columns on moves. Every request is
/// recorded; `fail_next` and `fail_nth` make a later request fail with a
/// given error.
#[derive(Debug, Default)]
pub struct MemoryApi {
    state: Mutex<State>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a board as-is, assigning an ID when it carries the unsaved one
    pub async fn insert_board(&self, board: Board) -> Board {
        let mut state = self.state.lock().await;
        let mut board = board;
        board.id = BoardId::new(state.assign_id(board.id.value()));
        state.boards.push(board.clone());
        board
    }

    pub async fn insert_column(&self, column: Column) -> Column {
        let mut state = self.state.lock().await;
        let mut column = column;
        column.id = ColumnId::new(state.assign_id(column.id.value()));
        let cards = std::mem::take(&mut column.cards);
        state.columns.push(column.clone());
        drop(state);

        for mut card in cards {
            card.column_id = column.id;
            column.cards.push(self.insert_card(card).await);
        }
        column
    }

    pub async fn insert_card(&self, card: Card) -> Card {
        let mut state = self.state.lock().await;
        let mut card = card;
        card.id = CardId::new(state.assign_id(card.id.value()));
        state.cards.push(card.clone());
        card
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn mutation_count(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .count()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Fails the next request with `error`, after recording it
    pub async fn fail_next(&self, error: TaskboardError) {
        self.fail_nth(0, error).await;
    }

    /// Lets `skip` requests through, then fails the one after with `error`
    pub async fn fail_nth(&self, skip: usize, error: TaskboardError) {
        self.state.lock().await.fail_next = Some((skip, error));
    }

    /// When false, card updates answer without a body
    pub async fn echo_updated_cards(&self, echo: bool) {
        self.state.lock().await.echo_updated_cards = echo;
    }

    /// A stored card as the server currently holds it
    pub async fn stored_card(&self, id: CardId) -> Option<Card> {
        self.state
            .lock()
            .await
            .cards
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    async fn begin(&self, call: ApiCall) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state.lock().await;
        state.calls.push(call);
        let armed = match state.fail_next.take() {
            Some((0, error)) => Some(error),
            Some((skip, error)) => {
                state.fail_next = Some((skip - 1, error));
                None
            }
            None => None,
        };
        match armed {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl BoardApi for MemoryApi {
    async fn list_boards(&self) -> Result<Vec<Board>> {
        let state = self.begin(ApiCall::ListBoards).await?;
        Ok(state.boards.clone())
    }

    async fn get_board(&self, id: BoardId) -> Result<Board> {
        let state = self.begin(ApiCall::GetBoard(id)).await?;
        state
            .boards
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(TaskboardError::NotFound {
                entity: "Board",
                id: id.value(),
            })
    }

    async fn create_board(&self, board: &Board) -> Result<Board> {
        let mut state = self.begin(ApiCall::CreateBoard).await?;
        State::validate_title(&board.title, "Title")?;
        let id = state.assign_id(0);
        let created = Board {
            id: BoardId::new(id),
            title: board.title.clone(),
        };
        state.boards.push(created.clone());
        Ok(created)
    }

    async fn update_board(&self, id: BoardId, board: &Board) -> Result<()> {
        let mut state = self.begin(ApiCall::UpdateBoard(id)).await?;
        State::validate_title(&board.title, "Title")?;
        let stored = state
            .boards
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(TaskboardError::NotFound {
                entity: "Board",
                id: id.value(),
            })?;
        stored.title = board.title.clone();
        Ok(())
    }

    async fn delete_board(&self, id: BoardId) -> Result<()> {
        let mut state = self.begin(ApiCall::DeleteBoard(id)).await?;
        state.require_board(id)?;
        let doomed: Vec<ColumnId> = state
            .columns
            .iter()
            .filter(|c| c.board_id == id)
            .map(|c| c.id)
            .collect();
        state.boards.retain(|b| b.id != id);
        state.columns.retain(|c| c.board_id != id);
        state.cards.retain(|c| !doomed.contains(&c.column_id));
        Ok(())
    }

    async fn list_columns(&self, board_id: BoardId) -> Result<Vec<Column>> {
        let state = self.begin(ApiCall::ListColumns(board_id)).await?;
        state.require_board(board_id)?;
        Ok(state
            .columns
            .iter()
            .filter(|c| c.board_id == board_id)
            .map(|c| {
                let mut column = c.clone();
                column.cards = state
                    .cards
                    .iter()
                    .filter(|card| card.column_id == c.id)
                    .cloned()
                    .collect();
                column
            })
            .collect())
    }

    async fn create_column(&self, column: &Column) -> Result<Column> {
        let mut state = self.begin(ApiCall::CreateColumn).await?;
        State::validate_title(&column.title, "Title")?;
        state.require_board(column.board_id)?;

        let order = if column.order > 0 {
            column.order
        } else {
            state
                .columns
                .iter()
                .filter(|c| c.board_id == column.board_id)
                .count() as i32
                + 1
        };
        let id = state.assign_id(0);
        let created = Column {
            id: ColumnId::new(id),
            title: column.title.clone(),
            order,
            board_id: column.board_id,
            cards: Vec::new(),
        };
        state.columns.push(created.clone());
        Ok(created)
    }

    async fn update_column(&self, id: ColumnId, column: &Column) -> Result<()> {
        let mut state = self.begin(ApiCall::UpdateColumn(id)).await?;
        State::validate_title(&column.title, "Title")?;
        let stored = state
            .columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(TaskboardError::NotFound {
                entity: "Column",
                id: id.value(),
            })?;
        stored.title = column.title.clone();
        stored.order = column.order;
        Ok(())
    }

    async fn delete_column(&self, id: ColumnId) -> Result<()> {
        let mut state = self.begin(ApiCall::DeleteColumn(id)).await?;
        let board_id = state.column(id)?.board_id;
        let orphans = state.card_sequence(id);
        state.columns.retain(|c| c.id != id);

        let heir = state
            .columns
            .iter()
            .filter(|c| c.board_id == board_id)
            .min_by_key(|c| c.order)
            .map(|c| c.id);

        match heir {
            Some(heir) => {
                let mut sequence = state.card_sequence(heir);
                sequence.extend(orphans);
                state.write_sequence(heir, &sequence);
            }
            None => state.cards.retain(|c| !orphans.contains(&c.id)),
        }
        Ok(())
    }

    async fn reorder_column(&self, id: ColumnId, new_order: i32) -> Result<()> {
        let mut state = self.begin(ApiCall::ReorderColumn(id, new_order)).await?;
        let board_id = state.column(id)?.board_id;

        let mut siblings: Vec<(i32, ColumnId)> = state
            .columns
            .iter()
            .filter(|c| c.board_id == board_id && c.id != id)
            .map(|c| (c.order, c.id))
            .collect();
        siblings.sort_by_key(|(order, _)| *order);
        let mut sequence: Vec<ColumnId> = siblings.into_iter().map(|(_, id)| id).collect();
        let index = (new_order.max(1) as usize - 1).min(sequence.len());
        sequence.insert(index, id);

        for (position, column_id) in sequence.iter().enumerate() {
            if let Some(column) = state.columns.iter_mut().find(|c| c.id == *column_id) {
                column.order = position as i32 + 1;
            }
        }
        Ok(())
    }

    async fn list_cards(&self, column_id: ColumnId) -> Result<Vec<Card>> {
        let state = self.begin(ApiCall::ListCards(column_id)).await?;
        state.column(column_id)?;
        Ok(state
            .cards
            .iter()
            .filter(|c| c.column_id == column_id)
            .cloned()
            .collect())
    }

    async fn create_card(&self, card: &Card) -> Result<Card> {
        let mut state = self.begin(ApiCall::CreateCard).await?;
        State::validate_title(&card.title, "Title")?;
        state.column(card.column_id)?;

        let mut created = card.clone();
        created.id = CardId::new(state.assign_id(0));
        if created.order <= 0 {
            created.order = state.next_card_order(card.column_id);
        }
        state.cards.push(created.clone());
        Ok(created)
    }

    async fn update_card(&self, id: CardId, card: &Card) -> Result<Option<Card>> {
        let mut state = self.begin(ApiCall::UpdateCard(id)).await?;
        State::validate_title(&card.title, "Title")?;
        state.column(card.column_id)?;

        let echo = state.echo_updated_cards;
        let stored = state
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(TaskboardError::NotFound {
                entity: "Card",
                id: id.value(),
            })?;
        stored.title = card.title.clone();
        stored.description = card.description.clone();
        stored.priority = Priority::clamped(card.priority).value();
        stored.order = card.order;
        stored.column_id = card.column_id;

        Ok(echo.then(|| stored.clone()))
    }

    async fn delete_card(&self, id: CardId) -> Result<()> {
        let mut state = self.begin(ApiCall::DeleteCard(id)).await?;
        let before = state.cards.len();
        state.cards.retain(|c| c.id != id);
        if state.cards.len() == before {
            return Err(TaskboardError::NotFound {
                entity: "Card",
                id: id.value(),
            });
        }
        Ok(())
    }

    async fn move_card(&self, id: CardId, request: &MoveCardRequest) -> Result<Option<Card>> {
        let mut state = self.begin(ApiCall::MoveCard(id, *request)).await?;
        state.column(request.new_column_id)?;
        let source = state
            .cards
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.column_id)
            .ok_or(TaskboardError::NotFound {
                entity: "Card",
                id: id.value(),
            })?;

        let mut remaining = state.card_sequence(source);
        remaining.retain(|card_id| *card_id != id);
        if source != request.new_column_id {
            state.write_sequence(source, &remaining);
            remaining = state.card_sequence(request.new_column_id);
        }

        let index = (request.new_position.max(1) as usize - 1).min(remaining.len());
        remaining.insert(index, id);
        state.write_sequence(request.new_column_id, &remaining);

        Ok(state.cards.iter().find(|c| c.id == id).cloned())
    }
}
