use crate::{
    api::BoardApi,
    controller::{BoardController, CardController, ColumnController},
    domain::{BoardId, Card, ColumnId},
    error::{Result, TaskboardError},
};
use std::sync::Arc;

/// One user's board screen: the board list plus the selected board's columns
pub struct BoardSession<A: BoardApi> {
    pub boards: BoardController<A>,
    pub columns: ColumnController<A>,
}

impl<A: BoardApi> BoardSession<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            boards: BoardController::new(api.clone()),
            columns: ColumnController::new(api),
        }
    }

    /// Loads the board list
    pub async fn start(&mut self) -> Result<()> {
        self.boards.load_boards().await
    }

    /// Selects a board and loads its columns under a fresh view token
    pub async fn select_board(&mut self, id: BoardId) -> Result<()> {
        let token = self.boards.select_board(id)?;
        self.columns.open_board(id, token).await
    }

    /// Back to the welcome state
    pub fn leave_board(&mut self) {
        self.boards.clear_selection();
        self.columns.clear();
    }

    /// Deletes the board awaiting confirmation, closing its view if shown
    pub async fn confirm_board_delete(&mut self) -> Result<()> {
        if self.boards.confirm_delete().await? {
            self.columns.clear();
        }
        Ok(())
    }

    /// Board-level "add card" defaults to the first column
    pub fn new_card_draft(&self) -> Result<Card> {
        if self.columns.board_id().is_none() {
            return Err(TaskboardError::NoBoardSelected);
        }
        let column_id = self
            .columns
            .columns()
            .first()
            .map(|column| column.id)
            .unwrap_or_default();
        Ok(Card::new(column_id, ""))
    }

    pub fn card_controller(&self, card: Card) -> CardController<A> {
        self.columns.card_controller(card)
    }

    pub fn new_card_controller(&self, column_id: ColumnId) -> CardController<A> {
        self.columns.new_card_controller(column_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::domain::{Board, CardId, Column};

    async fn session() -> (Arc<MemoryApi>, BoardSession<MemoryApi>) {
        let api = Arc::new(MemoryApi::new());
        for (id, title) in [(1, "Sprint"), (2, "Backlog")] {
            api.insert_board(Board {
                id: BoardId::new(id),
                title: title.to_string(),
            })
            .await;
        }
        for (id, board, order) in [(10, 1, 1), (11, 1, 2), (20, 2, 1)] {
            let mut column = Column::new(BoardId::new(board), format!("column {}", id), order);
            column.id = ColumnId::new(id);
            api.insert_column(column).await;
        }
        let mut card = Card::new(ColumnId::new(10), "First");
        card.id = CardId::new(100);
        card.order = 1;
        api.insert_card(card).await;

        let mut session = BoardSession::new(api.clone());
        session.start().await.unwrap();
        (api, session)
    }

    #[tokio::test]
    async fn test_switching_boards_replaces_columns() {
        let (_, mut session) = session().await;

        session.select_board(BoardId::new(1)).await.unwrap();
        assert_eq!(session.columns.columns().len(), 2);

        session.select_board(BoardId::new(2)).await.unwrap();
        let ids: Vec<ColumnId> = session.columns.columns().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ColumnId::new(20)]);
    }

    #[tokio::test]
    async fn test_load_for_abandoned_board_is_ignored() {
        let (api, mut session) = session().await;
        session.select_board(BoardId::new(1)).await.unwrap();

        let ticket = session.columns.load_ticket().unwrap();
        let late = ColumnController::<MemoryApi>::fetch_columns(&api, &ticket)
            .await
            .unwrap();
        session.select_board(BoardId::new(2)).await.unwrap();

        assert!(!session.columns.apply_loaded(ticket, late));
        assert_eq!(session.columns.board_id(), Some(BoardId::new(2)));
        assert_eq!(session.columns.columns().len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_shown_board_closes_view() {
        let (_, mut session) = session().await;
        session.select_board(BoardId::new(1)).await.unwrap();

        session.boards.request_delete(BoardId::new(1)).unwrap();
        session.confirm_board_delete().await.unwrap();

        assert!(session.boards.selected().is_none());
        assert!(session.columns.board_id().is_none());
        assert!(session.columns.columns().is_empty());
    }

    #[tokio::test]
    async fn test_new_card_draft_targets_first_column() {
        let (_, mut session) = session().await;
        assert!(session.new_card_draft().is_err());

        session.select_board(BoardId::new(1)).await.unwrap();
        let mut draft = session.new_card_draft().unwrap();
        assert_eq!(draft.column_id, ColumnId::new(10));

        draft.title = "From sidebar".to_string();
        let created = session.columns.create_card(draft).await.unwrap();
        assert_eq!(created.order, 2);
    }

    #[tokio::test]
    async fn test_inline_card_form_reports_through_column_channel() {
        let (_, mut session) = session().await;
        session.select_board(BoardId::new(1)).await.unwrap();

        let mut form = session.new_card_controller(ColumnId::new(11));
        form.new_card_mut().title = "Inline".to_string();
        form.create().await.unwrap();

        assert_eq!(session.columns.process_card_events().await.unwrap(), 1);
        let done = session.columns.column(ColumnId::new(11)).unwrap();
        assert_eq!(done.cards.len(), 1);
        assert_eq!(done.cards[0].title, "Inline");
    }

    #[tokio::test]
    async fn test_leave_board() {
        let (_, mut session) = session().await;
        session.select_board(BoardId::new(1)).await.unwrap();

        session.leave_board();

        assert!(session.boards.selected().is_none());
        assert!(session.columns.columns().is_empty());
    }
}
