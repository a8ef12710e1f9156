//! Orchestrators for boards, columns and cards.
//!
//! Every mutating operation follows the same state machine: it starts
//! `Pending` with a snapshot of the list it may touch, then either
//! `Committed` once the server accepted it or `RolledBack`, in which case
//! the snapshot is restored. Operations that fail a local precondition
//! never leave `Idle`.

use crate::error::{Result, TaskboardError};
use uuid::Uuid;

pub mod board;
pub mod card;
pub mod column;
pub mod session;

pub use board::BoardController;
pub use card::{CardController, CardEvent};
pub use column::{ColumnController, ColumnEdit, LoadTicket};
pub use session::BoardSession;

/// Observable phase of the last mutating operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationPhase {
    #[default]
    Idle,
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, Default)]
pub enum MutationState<S> {
    #[default]
    Idle,
    Pending(S),
    Committed,
    RolledBack,
}

impl<S> MutationState<S> {
    /// Enters `Pending`, holding the state to restore on failure
    pub fn begin(&mut self, snapshot: S) {
        *self = Self::Pending(snapshot);
    }

    pub fn commit(&mut self) {
        *self = Self::Committed;
    }

    /// Enters `RolledBack` and hands back the snapshot, if one was pending
    pub fn rollback(&mut self) -> Option<S> {
        match std::mem::replace(self, Self::RolledBack) {
            Self::Pending(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn phase(&self) -> MutationPhase {
        match self {
            Self::Idle => MutationPhase::Idle,
            Self::Pending(_) => MutationPhase::Pending,
            Self::Committed => MutationPhase::Committed,
            Self::RolledBack => MutationPhase::RolledBack,
        }
    }
}

/// Identifies one selection of a board view
///
/// Responses requested under an older token belong to a view that is no
/// longer displayed and are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewToken(Uuid);

impl ViewToken {
    pub fn issue() -> Self {
        Self(Uuid::new_v4())
    }
}

/// The single open context menu, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState<Id>(Option<Id>);

impl<Id> Default for MenuState<Id> {
    fn default() -> Self {
        Self(None)
    }
}

impl<Id: Copy + Eq> MenuState<Id> {
    /// Opens the menu for `id`, or closes it if it was already open
    pub fn toggle(&mut self, id: Id) {
        self.0 = if self.0 == Some(id) { None } else { Some(id) };
    }

    pub fn close(&mut self) {
        self.0 = None;
    }

    /// Closes the menu if it belongs to `id`
    pub fn forget(&mut self, id: Id) {
        if self.0 == Some(id) {
            self.0 = None;
        }
    }

    pub fn active(&self) -> Option<Id> {
        self.0
    }

    pub fn is_open(&self, id: Id) -> bool {
        self.0 == Some(id)
    }
}

/// Fails fast when a path ID and the record's own ID disagree
pub(crate) fn ensure_same_id(path_id: i64, record_id: i64) -> Result<()> {
    if path_id != record_id {
        return Err(TaskboardError::IdMismatch { path_id, record_id });
    }
    Ok(())
}

pub(crate) fn ensure_title(title: &str, entity: &'static str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TaskboardError::BlankTitle { entity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_state_commit() {
        let mut state = MutationState::default();
        assert_eq!(state.phase(), MutationPhase::Idle);

        state.begin(vec![1, 2, 3]);
        assert_eq!(state.phase(), MutationPhase::Pending);

        state.commit();
        assert_eq!(state.phase(), MutationPhase::Committed);
        assert!(state.rollback().is_none());
    }

    #[test]
    fn test_mutation_state_rollback_returns_snapshot() {
        let mut state = MutationState::default();
        state.begin(vec![1, 2, 3]);

        assert_eq!(state.rollback(), Some(vec![1, 2, 3]));
        assert_eq!(state.phase(), MutationPhase::RolledBack);
    }

    #[test]
    fn test_menu_state_holds_one_menu() {
        let mut menu = MenuState::default();
        menu.toggle(10);
        assert!(menu.is_open(10));

        menu.toggle(11);
        assert_eq!(menu.active(), Some(11));
        assert!(!menu.is_open(10));

        menu.forget(10);
        assert_eq!(menu.active(), Some(11));
        menu.forget(11);
        assert_eq!(menu.active(), None);

        menu.toggle(12);
        menu.toggle(12);
        assert_eq!(menu.active(), None);
    }

    #[test]
    fn test_view_tokens_are_distinct() {
        assert_ne!(ViewToken::issue(), ViewToken::issue());
    }

    #[test]
    fn test_preconditions() {
        assert!(ensure_same_id(1, 1).is_ok());
        assert!(matches!(
            ensure_same_id(1, 2),
            Err(TaskboardError::IdMismatch {
                path_id: 1,
                record_id: 2
            })
        ));
        assert!(ensure_title(" \t", "Card").is_err());
        assert!(ensure_title("Ok", "Card").is_ok());
    }
}
