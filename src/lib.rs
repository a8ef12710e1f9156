//! # Taskboard Client
//!
//! Client-side core of a Kanban task board: boards hold ordered columns,
//! columns hold ordered cards.
//!
//! This crate keeps the in-memory column and card lists consistent with the
//! server across creates, edits, deletes and drag-and-drop moves. It
//! provides the domain records, the move/reorder protocol, list
//! reconciliation, and controllers that sequence calls against a
//! [`BoardApi`] backend.

pub mod api;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;

// Re-export commonly used types
pub use api::{BoardApi, HttpApi, MemoryApi};
pub use config::ClientConfig;
pub use controller::{
    BoardController, BoardSession, CardController, CardEvent, ColumnController, MutationPhase,
};
pub use domain::{
    board::Board,
    card::{Card, CardKey, Priority},
    column::Column,
    id::{BoardId, CardId, ColumnId},
    moves::MoveCardRequest,
};
pub use error::{Result, TaskboardError};
