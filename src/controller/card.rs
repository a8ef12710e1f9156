use crate::{
    api::BoardApi,
    controller::{ensure_same_id, ensure_title, MutationPhase, MutationState},
    domain::{Card, CardId, ColumnId},
    error::{Result, TaskboardError},
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// What a card controller tells its owning column controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardEvent {
    Created(Card),
    Updated(Card),
    Deleted(CardId),
}

/// Orchestrates one card: inline creation, editing and deletion
///
/// A controller either wraps a persisted card or holds a draft for the
/// column's "add card" form. Outcomes are reported on the column's event
/// channel; a closed channel only means the column view is gone.
pub struct CardController<A: BoardApi> {
    api: Arc<A>,
    events: UnboundedSender<CardEvent>,
    card: Card,
    draft: Option<Card>,
    menu_open: bool,
    pending_delete: bool,
    deleted: bool,
    mutation: MutationState<Card>,
}

impl<A: BoardApi> CardController<A> {
    /// Controller for a card already stored on the server
    pub fn for_card(api: Arc<A>, card: Card, events: UnboundedSender<CardEvent>) -> Self {
        Self {
            api,
            events,
            card,
            draft: None,
            menu_open: false,
            pending_delete: false,
            deleted: false,
            mutation: MutationState::default(),
        }
    }

    /// Controller backing the new-card form of a column
    pub fn new_in_column(
        api: Arc<A>,
        column_id: ColumnId,
        events: UnboundedSender<CardEvent>,
    ) -> Self {
        Self::for_card(api, Card::new(column_id, ""), events)
    }

    pub fn card(&self) -> &Card {
        &self.card
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    /// The record being edited, when in edit mode
    pub fn draft_mut(&mut self) -> Option<&mut Card> {
        self.draft.as_mut()
    }

    /// The unsaved card behind the new-card form
    pub fn new_card_mut(&mut self) -> &mut Card {
        &mut self.card
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }

    pub fn mutation_phase(&self) -> MutationPhase {
        self.mutation.phase()
    }

    /// Persists the new-card form and resets it for the same column
    pub async fn create(&mut self) -> Result<Card> {
        if !self.card.id.is_unsaved() {
            return Err(TaskboardError::IdMismatch {
                path_id: 0,
                record_id: self.card.id.value(),
            });
        }
        ensure_title(&self.card.title, "Card")?;

        let payload = self.card.normalized();
        self.mutation.begin(self.card.clone());
        match self.api.create_card(&payload).await {
            Ok(created) => {
                self.mutation.commit();
                info!(card_id = %created.id, column_id = %created.column_id, "card created");
                self.card = Card::new(created.column_id, "");
                self.notify(CardEvent::Created(created.clone()));
                Ok(created)
            }
            Err(e) => {
                self.restore();
                Err(e)
            }
        }
    }

    pub fn start_edit(&mut self) {
        self.menu_open = false;
        self.draft = Some(self.card.clone());
    }

    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    /// Saves the edit form; stays in edit mode when the save fails
    pub async fn save_edit(&mut self) -> Result<Card> {
        let draft = self.draft.clone().ok_or_else(|| {
            TaskboardError::Other(anyhow::anyhow!("card {} is not being edited", self.card.id))
        })?;
        let saved = self.update(self.card.id, draft).await?;
        self.draft = None;
        Ok(saved)
    }

    /// Replaces the card with `record`, then resynchronizes from the server
    ///
    /// The priority is clamped into range before transmission. When the
    /// server answers without a body the card is re-read from its column.
    pub async fn update(&mut self, id: CardId, record: Card) -> Result<Card> {
        ensure_same_id(id.value(), record.id.value())?;
        ensure_title(&record.title, "Card")?;

        let payload = record.normalized();
        debug!(card_id = %id, priority = payload.priority, "updating card");
        self.mutation.begin(self.card.clone());

        let result = match self.api.update_card(id, &payload).await {
            Ok(Some(card)) => Ok(card),
            Ok(None) => self.refetch(id, payload.column_id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(card) => {
                self.mutation.commit();
                self.card = card.clone();
                self.notify(CardEvent::Updated(card.clone()));
                Ok(card)
            }
            Err(e) => {
                self.restore();
                Err(e)
            }
        }
    }

    /// First step of deletion: ask for confirmation
    pub fn request_delete(&mut self) {
        self.menu_open = false;
        self.pending_delete = true;
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = false;
    }

    pub fn delete_pending(&self) -> bool {
        self.pending_delete
    }

    pub async fn confirm_delete(&mut self) -> Result<()> {
        if !self.pending_delete {
            return Err(TaskboardError::NoPendingDelete);
        }

        let id = self.card.id;
        self.mutation.begin(self.card.clone());
        match self.api.delete_card(id).await {
            Ok(()) => {
                self.mutation.commit();
                self.pending_delete = false;
                self.deleted = true;
                info!(card_id = %id, "card deleted");
                self.notify(CardEvent::Deleted(id));
                Ok(())
            }
            Err(e) => {
                self.restore();
                Err(e)
            }
        }
    }

    async fn refetch(&self, id: CardId, column_id: ColumnId) -> Result<Card> {
        self.api
            .list_cards(column_id)
            .await?
            .into_iter()
            .find(|card| card.id == id)
            .ok_or(TaskboardError::NotFound {
                entity: "Card",
                id: id.value(),
            })
    }

    fn restore(&mut self) {
        if let Some(snapshot) = self.mutation.rollback() {
            self.card = snapshot;
        }
        warn!(card_id = %self.card.id, "card change rolled back");
    }

    fn notify(&self, event: CardEvent) {
        if self.events.send(event).is_err() {
            debug!("column view closed, card event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory_api::ApiCall;
    use crate::api::MemoryApi;
    use crate::domain::{Board, BoardId, Column, Priority};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    async fn setup() -> (Arc<MemoryApi>, Card, UnboundedSender<CardEvent>, UnboundedReceiver<CardEvent>) {
        let api = Arc::new(MemoryApi::new());
        api.insert_board(Board {
            id: BoardId::new(1),
            title: "Sprint".to_string(),
        })
        .await;
        let mut column = Column::new(BoardId::new(1), "Todo", 1);
        column.id = ColumnId::new(10);
        api.insert_column(column).await;
        let mut card = Card::new(ColumnId::new(10), "Existing");
        card.id = CardId::new(100);
        card.order = 1;
        let card = api.insert_card(card).await;

        let (tx, rx) = mpsc::unbounded_channel();
        (api, card, tx, rx)
    }

    #[tokio::test]
    async fn test_create_with_blank_title_makes_no_call() {
        let (api, _, tx, mut rx) = setup().await;
        let mut controller = CardController::new_in_column(api.clone(), ColumnId::new(10), tx);
        controller.new_card_mut().title = "   ".to_string();

        let err = controller.create().await.unwrap_err();

        assert!(matches!(err, TaskboardError::BlankTitle { .. }));
        assert!(api.calls().await.is_empty());
        assert!(rx.try_recv().is_err());
        assert_eq!(controller.mutation_phase(), MutationPhase::Idle);
    }

    #[tokio::test]
    async fn test_create_emits_event_and_resets_form() {
        let (api, _, tx, mut rx) = setup().await;
        let mut controller = CardController::new_in_column(api.clone(), ColumnId::new(10), tx);
        controller.new_card_mut().title = "Fresh".to_string();

        let created = controller.create().await.unwrap();

        assert!(!created.id.is_unsaved());
        assert_eq!(rx.try_recv().unwrap(), CardEvent::Created(created));
        assert!(controller.card().title.is_empty());
        assert_eq!(controller.card().column_id, ColumnId::new(10));
    }

    #[tokio::test]
    async fn test_update_clamps_priority_before_sending() {
        let (api, card, tx, _rx) = setup().await;
        let mut controller = CardController::for_card(api.clone(), card.clone(), tx);

        let mut record = card.clone();
        record.priority = 5;
        controller.update(card.id, record).await.unwrap();

        let stored = api.stored_card(card.id).await.unwrap();
        assert_eq!(stored.priority, Priority::Critical.value());
        assert_eq!(controller.card().priority, 3);
    }

    #[tokio::test]
    async fn test_update_with_mismatched_id_fails_fast() {
        let (api, card, tx, _rx) = setup().await;
        let mut controller = CardController::for_card(api.clone(), card.clone(), tx);

        let mut record = card.clone();
        record.id = CardId::new(999);
        let err = controller.update(card.id, record).await.unwrap_err();

        assert!(matches!(
            err,
            TaskboardError::IdMismatch {
                path_id: 100,
                record_id: 999
            }
        ));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_without_body_refetches_card() {
        let (api, card, tx, mut rx) = setup().await;
        api.echo_updated_cards(false).await;
        let mut controller = CardController::for_card(api.clone(), card.clone(), tx);

        let mut record = card.clone();
        record.title = "Renamed".to_string();
        let saved = controller.update(card.id, record).await.unwrap();

        assert_eq!(saved.title, "Renamed");
        assert_eq!(saved.created_on, card.created_on);
        assert_eq!(
            api.calls().await,
            vec![ApiCall::UpdateCard(card.id), ApiCall::ListCards(ColumnId::new(10))]
        );
        assert!(matches!(rx.try_recv().unwrap(), CardEvent::Updated(_)));
    }

    #[tokio::test]
    async fn test_failed_save_stays_in_edit_mode() {
        let (api, card, tx, _rx) = setup().await;
        let mut controller = CardController::for_card(api.clone(), card.clone(), tx);
        controller.start_edit();
        controller.draft_mut().unwrap().title = "Doomed".to_string();
        api.fail_next(TaskboardError::Http {
            status: 500,
            body: String::new(),
        })
        .await;

        assert!(controller.save_edit().await.is_err());

        assert!(controller.is_editing());
        assert_eq!(controller.card().title, "Existing");
        assert_eq!(controller.mutation_phase(), MutationPhase::RolledBack);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let (api, card, tx, mut rx) = setup().await;
        let mut controller = CardController::for_card(api.clone(), card.clone(), tx);

        assert!(matches!(
            controller.confirm_delete().await,
            Err(TaskboardError::NoPendingDelete)
        ));

        controller.request_delete();
        controller.confirm_delete().await.unwrap();

        assert!(controller.is_deleted());
        assert_eq!(rx.try_recv().unwrap(), CardEvent::Deleted(card.id));
        assert!(api.stored_card(card.id).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_card() {
        let (api, card, tx, mut rx) = setup().await;
        let mut controller = CardController::for_card(api.clone(), card.clone(), tx);
        controller.request_delete();
        api.fail_next(TaskboardError::NotFound {
            entity: "Card",
            id: 100,
        })
        .await;

        assert!(controller.confirm_delete().await.is_err());

        assert!(!controller.is_deleted());
        assert!(controller.delete_pending());
        assert!(rx.try_recv().is_err());
    }
}
