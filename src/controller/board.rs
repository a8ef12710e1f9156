use crate::{
    api::BoardApi,
    controller::{ensure_same_id, ensure_title, MutationPhase, MutationState, ViewToken},
    domain::{find_by_id, Board, BoardId},
    error::{Result, TaskboardError},
};
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates the board list and the current selection
pub struct BoardController<A: BoardApi> {
    api: Arc<A>,
    boards: Vec<Board>,
    selected: Option<(Board, ViewToken)>,
    menu_open: bool,
    pending_delete: Option<BoardId>,
    mutation: MutationState<Vec<Board>>,
    stale: bool,
}

impl<A: BoardApi> BoardController<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            boards: Vec::new(),
            selected: None,
            menu_open: false,
            pending_delete: None,
            mutation: MutationState::default(),
            stale: false,
        }
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn selected(&self) -> Option<&Board> {
        self.selected.as_ref().map(|(board, _)| board)
    }

    pub fn view_token(&self) -> Option<ViewToken> {
        self.selected.as_ref().map(|(_, token)| *token)
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }

    pub fn pending_delete(&self) -> Option<BoardId> {
        self.pending_delete
    }

    pub fn mutation_phase(&self) -> MutationPhase {
        self.mutation.phase()
    }

    /// True when the last reload after a committed change failed
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub async fn load_boards(&mut self) -> Result<()> {
        self.boards = self.api.list_boards().await?;
        self.stale = false;
        Ok(())
    }

    /// Makes a loaded board current and issues a fresh view token
    pub fn select_board(&mut self, id: BoardId) -> Result<ViewToken> {
        let board = find_by_id(&self.boards, id)
            .cloned()
            .ok_or(TaskboardError::NotFound {
                entity: "Board",
                id: id.value(),
            })?;
        let token = ViewToken::issue();
        self.selected = Some((board, token));
        self.menu_open = false;
        Ok(token)
    }

    /// Back to the welcome state
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.menu_open = false;
    }

    pub async fn create_board(&mut self, title: &str) -> Result<Board> {
        ensure_title(title, "Board")?;

        self.mutation.begin(self.boards.clone());
        match self.api.create_board(&Board::new(title.trim())).await {
            Ok(created) => {
                self.mutation.commit();
                info!(board_id = %created.id, "board created");
                if !self.refresh("create board").await {
                    self.boards.push(created.clone());
                }
                Ok(created)
            }
            Err(e) => {
                self.restore();
                Err(e)
            }
        }
    }

    /// Replaces a board record, then re-reads it since PUT returns no body
    pub async fn update_board(&mut self, id: BoardId, board: Board) -> Result<Board> {
        ensure_same_id(id.value(), board.id.value())?;
        ensure_title(&board.title, "Board")?;

        let payload = board.with_title(&board.title);
        self.mutation.begin(self.boards.clone());
        let result = match self.api.update_board(id, &payload).await {
            Ok(()) => self.api.get_board(id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(stored) => {
                self.mutation.commit();
                if let Some(slot) = self.boards.iter_mut().find(|b| b.id == id) {
                    *slot = stored.clone();
                }
                if let Some((selected, _)) = self.selected.as_mut() {
                    if selected.id == id {
                        *selected = stored.clone();
                    }
                }
                Ok(stored)
            }
            Err(e) => {
                self.restore();
                Err(e)
            }
        }
    }

    pub fn request_delete(&mut self, id: BoardId) -> Result<()> {
        if find_by_id(&self.boards, id).is_none() {
            return Err(TaskboardError::NotFound {
                entity: "Board",
                id: id.value(),
            });
        }
        self.pending_delete = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the confirmed board; returns true if it was the selected one
    pub async fn confirm_delete(&mut self) -> Result<bool> {
        let id = self.pending_delete.ok_or(TaskboardError::NoPendingDelete)?;

        self.mutation.begin(self.boards.clone());
        match self.api.delete_board(id).await {
            Ok(()) => {
                self.mutation.commit();
                self.pending_delete = None;
                self.boards.retain(|b| b.id != id);
                let was_selected = self.selected().map(|b| b.id) == Some(id);
                if was_selected {
                    self.clear_selection();
                }
                info!(board_id = %id, "board deleted");
                self.refresh("delete board").await;
                Ok(was_selected)
            }
            Err(e) => {
                self.restore();
                Err(e)
            }
        }
    }

    /// Reloads after a committed change; false leaves the list stale
    async fn refresh(&mut self, operation: &str) -> bool {
        match self.load_boards().await {
            Ok(()) => true,
            Err(e) => {
                self.stale = true;
                warn!(operation, error = %e, "reload after committed change failed");
                false
            }
        }
    }

    fn restore(&mut self) {
        if let Some(snapshot) = self.mutation.rollback() {
            self.boards = snapshot;
        }
        warn!("board change rolled back");
    }
}
