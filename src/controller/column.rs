//! Column orchestration for the selected board.
//!
//! Owns the board's in-memory column list (cards nested) and is the only
//! code that mutates it. Creates, edits and deletes are followed by a full
//! reload so IDs and orders match the server exactly; drag moves and
//! column reorders are applied optimistically and rolled back if the server
//! rejects them. A reload that fails after the server accepted a change does
//! not fail the change; it marks the view stale until the next good load.

use crate::{
    api::BoardApi,
    controller::{
        card::{CardController, CardEvent},
        ensure_same_id, ensure_title, MenuState, MutationPhase, MutationState, ViewToken,
    },
    domain::{
        find_by_id, find_by_id_mut,
        moves::{apply_card_move, apply_column_reorder, plan_card_move, plan_column_reorder},
        sorting::{reconcile, sort_cards},
        BoardId, Card, CardId, CardMove, Column, ColumnId,
    },
    error::{Result, TaskboardError},
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Inline title editing of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEdit {
    pub column_id: ColumnId,
    pub title: String,
}

/// A column load requested for one board view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub board_id: BoardId,
    pub token: ViewToken,
}

pub struct ColumnController<A: BoardApi> {
    api: Arc<A>,
    view: Option<LoadTicket>,
    columns: Vec<Column>,
    menu: MenuState<ColumnId>,
    editing: Option<ColumnEdit>,
    pending_delete: Option<ColumnId>,
    mutation: MutationState<Vec<Column>>,
    stale: bool,
    events_tx: UnboundedSender<CardEvent>,
    events_rx: UnboundedReceiver<CardEvent>,
}

impl<A: BoardApi> ColumnController<A> {
    pub fn new(api: Arc<A>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            view: None,
            columns: Vec::new(),
            menu: MenuState::default(),
            editing: None,
            pending_delete: None,
            mutation: MutationState::default(),
            stale: false,
            events_tx,
            events_rx,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        find_by_id(&self.columns, id)
    }

    pub fn board_id(&self) -> Option<BoardId> {
        self.view.map(|view| view.board_id)
    }

    pub fn mutation_phase(&self) -> MutationPhase {
        self.mutation.phase()
    }

    /// True when the last reload after a committed change failed
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn active_menu(&self) -> Option<ColumnId> {
        self.menu.active()
    }

    pub fn toggle_menu(&mut self, column_id: ColumnId) {
        self.menu.toggle(column_id);
    }

    /// A click outside any column menu
    pub fn close_menus(&mut self) {
        self.menu.close();
    }

    pub fn editing(&self) -> Option<&ColumnEdit> {
        self.editing.as_ref()
    }

    pub fn pending_delete(&self) -> Option<ColumnId> {
        self.pending_delete
    }

    /// Switches to another board view and drops all per-view state
    pub fn show_board(&mut self, board_id: BoardId, token: ViewToken) {
        self.view = Some(LoadTicket { board_id, token });
        self.reset_view_state();
    }

    /// Leaves the board view; late loads for it will be discarded
    pub fn clear(&mut self) {
        self.view = None;
        self.reset_view_state();
    }

    pub async fn open_board(&mut self, board_id: BoardId, token: ViewToken) -> Result<()> {
        self.show_board(board_id, token);
        self.load_columns().await
    }

    fn reset_view_state(&mut self) {
        self.columns.clear();
        self.menu.close();
        self.editing = None;
        self.pending_delete = None;
        self.mutation = MutationState::default();
        self.stale = false;
    }

    /// Captures the current view for a load that may outlive it
    pub fn load_ticket(&self) -> Option<LoadTicket> {
        self.view
    }

    /// Fetches a board's columns without borrowing the controller
    pub async fn fetch_columns(api: &A, ticket: &LoadTicket) -> Result<Vec<Column>> {
        api.list_columns(ticket.board_id).await
    }

    /// Installs loaded columns, unless the view they were loaded for is gone
    pub fn apply_loaded(&mut self, ticket: LoadTicket, columns: Vec<Column>) -> bool {
        if self.view != Some(ticket) {
            debug!(board_id = %ticket.board_id, "discarding columns loaded for a previous view");
            return false;
        }
        self.columns = reconcile(columns);
        self.stale = false;
        true
    }

    /// Full reload of the selected board's columns and cards
    pub async fn load_columns(&mut self) -> Result<()> {
        let ticket = self.load_ticket().ok_or(TaskboardError::NoBoardSelected)?;
        let columns = Self::fetch_columns(&self.api, &ticket).await?;
        self.apply_loaded(ticket, columns);
        Ok(())
    }

    /// Lists one column's cards straight from the server, sorted
    pub async fn list_cards(&self, column_id: ColumnId) -> Result<Vec<Card>> {
        let mut cards = self.api.list_cards(column_id).await?;
        sort_cards(&mut cards);
        Ok(cards)
    }

    /// Appends a new column after the existing ones
    pub async fn create_column(&mut self, title: &str) -> Result<Column> {
        let board_id = self.board_id().ok_or(TaskboardError::NoBoardSelected)?;
        ensure_title(title, "Column")?;

        let column = Column::new(board_id, title.trim(), self.columns.len() as i32 + 1);
        self.mutation.begin(self.columns.clone());
        match self.api.create_column(&column).await {
            Ok(created) => {
                self.mutation.commit();
                info!(column_id = %created.id, order = created.order, "column created");
                self.refresh("create column").await;
                Ok(created)
            }
            Err(e) => {
                self.restore("create column");
                Err(e)
            }
        }
    }

    /// Replaces a column record and reloads
    pub async fn update_column(&mut self, id: ColumnId, column: Column) -> Result<()> {
        ensure_same_id(id.value(), column.id.value())?;
        ensure_title(&column.title, "Column")?;
        if find_by_id(&self.columns, id).is_none() {
            return Err(TaskboardError::ColumnNotInBoard(id.value()));
        }

        self.mutation.begin(self.columns.clone());
        match self.api.update_column(id, &column.without_cards()).await {
            Ok(()) => {
                self.mutation.commit();
                self.refresh("update column").await;
                Ok(())
            }
            Err(e) => {
                self.restore("update column");
                Err(e)
            }
        }
    }

    pub fn start_edit(&mut self, column_id: ColumnId) -> Result<()> {
        let column = find_by_id(&self.columns, column_id)
            .ok_or(TaskboardError::ColumnNotInBoard(column_id.value()))?;
        self.editing = Some(ColumnEdit {
            column_id,
            title: column.title.clone(),
        });
        self.menu.forget(column_id);
        Ok(())
    }

    pub fn set_edit_title(&mut self, title: impl Into<String>) {
        if let Some(edit) = self.editing.as_mut() {
            edit.title = title.into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Saves the inline title edit; the editor stays open on failure
    pub async fn save_edit(&mut self) -> Result<()> {
        let Some(edit) = self.editing.clone() else {
            return Ok(());
        };
        ensure_title(&edit.title, "Column")?;
        let column = find_by_id(&self.columns, edit.column_id)
            .ok_or(TaskboardError::ColumnNotInBoard(edit.column_id.value()))?;

        let mut updated = column.without_cards();
        updated.title = edit.title.trim().to_string();
        self.update_column(edit.column_id, updated).await?;
        self.cancel_edit();
        Ok(())
    }

    /// First step of deletion: remember the column awaiting confirmation
    pub fn request_delete(&mut self, column_id: ColumnId) -> Result<()> {
        if find_by_id(&self.columns, column_id).is_none() {
            return Err(TaskboardError::ColumnNotInBoard(column_id.value()));
        }
        self.menu.forget(column_id);
        self.pending_delete = Some(column_id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the confirmed column; the server hands its cards to the
    /// board's first remaining column, which the reload picks up
    pub async fn confirm_delete(&mut self) -> Result<()> {
        let column_id = self.pending_delete.ok_or(TaskboardError::NoPendingDelete)?;

        self.mutation.begin(self.columns.clone());
        match self.api.delete_column(column_id).await {
            Ok(()) => {
                self.mutation.commit();
                self.pending_delete = None;
                self.columns.retain(|column| column.id != column_id);
                self.menu.forget(column_id);
                if self.editing.as_ref().map(|edit| edit.column_id) == Some(column_id) {
                    self.editing = None;
                }
                info!(column_id = %column_id, "column deleted");
                self.refresh("delete column").await;
                Ok(())
            }
            Err(e) => {
                self.restore("delete column");
                Err(e)
            }
        }
    }

    /// Moves a column to a new 1-based order; `false` when it was already there
    pub async fn reorder_column(&mut self, column_id: ColumnId, new_order: i32) -> Result<bool> {
        let Some((from, to)) = plan_column_reorder(&self.columns, column_id, new_order)? else {
            return Ok(false);
        };

        self.mutation.begin(self.columns.clone());
        apply_column_reorder(&mut self.columns, from, to);
        match self.api.reorder_column(column_id, to as i32 + 1).await {
            Ok(()) => {
                self.mutation.commit();
                Ok(true)
            }
            Err(e) => {
                self.restore("reorder column");
                Err(e)
            }
        }
    }

    /// Drag-and-drop move of a card within or across columns
    ///
    /// The move is applied locally before the request is sent. Moving a card
    /// onto its own slot sends nothing and returns `CardMove::Unchanged`.
    pub async fn move_card(
        &mut self,
        card_id: CardId,
        target_column_id: ColumnId,
        target_position: i32,
    ) -> Result<CardMove> {
        let plan = plan_card_move(&self.columns, card_id, target_column_id, target_position)?;
        let Some(request) = plan.request() else {
            return Ok(plan);
        };

        self.mutation.begin(self.columns.clone());
        apply_card_move(&mut self.columns, &plan)?;
        match self.api.move_card(card_id, &request).await {
            Ok(confirmed) => {
                self.mutation.commit();
                if let Some(card) = confirmed {
                    self.resync_card(card);
                }
                debug!(card_id = %card_id, column_id = %target_column_id, "card move committed");
                Ok(plan)
            }
            Err(e) => {
                self.restore("move card");
                Err(e)
            }
        }
    }

    /// Creates a card from the board-level form at the end of its column
    pub async fn create_card(&mut self, card: Card) -> Result<Card> {
        ensure_title(&card.title, "Card")?;
        let target = find_by_id(&self.columns, card.column_id)
            .ok_or(TaskboardError::ColumnNotInBoard(card.column_id.value()))?;

        let mut payload = card.normalized();
        payload.order = target.cards.len() as i32 + 1;

        self.mutation.begin(self.columns.clone());
        match self.api.create_card(&payload).await {
            Ok(created) => {
                self.mutation.commit();
                if let Some(column) = find_by_id_mut(&mut self.columns, created.column_id) {
                    column.cards.push(created.clone());
                }
                info!(card_id = %created.id, column_id = %created.column_id, "card created");
                self.refresh("create card").await;
                Ok(created)
            }
            Err(e) => {
                self.restore("create card");
                Err(e)
            }
        }
    }

    /// Channel on which card controllers of this view report
    pub fn card_events(&self) -> UnboundedSender<CardEvent> {
        self.events_tx.clone()
    }

    pub fn card_controller(&self, card: Card) -> CardController<A> {
        CardController::for_card(self.api.clone(), card, self.card_events())
    }

    pub fn new_card_controller(&self, column_id: ColumnId) -> CardController<A> {
        CardController::new_in_column(self.api.clone(), column_id, self.card_events())
    }

    /// Applies queued card events, then reloads once if there were any
    ///
    /// Edited records are patched in first; the reload picks up whatever
    /// the server did to their siblings. Returns the number of events handled.
    pub async fn process_card_events(&mut self) -> Result<usize> {
        let mut handled = 0;

        while let Ok(event) = self.events_rx.try_recv() {
            handled += 1;
            match event {
                CardEvent::Updated(card) => self.resync_card(card),
                CardEvent::Created(_) | CardEvent::Deleted(_) => {}
            }
        }

        if handled > 0 && self.view.is_some() {
            self.load_columns().await?;
        }
        Ok(handled)
    }

    /// Replaces a card's record in place, if it is where the record says
    fn resync_card(&mut self, card: Card) {
        let Some(column) = find_by_id_mut(&mut self.columns, card.column_id) else {
            return;
        };
        if let Some(slot) = find_by_id_mut(&mut column.cards, card.id) {
            *slot = card;
            sort_cards(&mut column.cards);
        }
    }

    /// Reload following a committed change
    async fn refresh(&mut self, operation: &str) {
        if let Err(e) = self.load_columns().await {
            self.stale = true;
            warn!(operation, error = %e, "reload after committed change failed");
        }
    }

    fn restore(&mut self, operation: &str) {
        if let Some(snapshot) = self.mutation.rollback() {
            self.columns = snapshot;
        }
        warn!(operation, "column change rolled back");
    }
}
