use crate::{
    domain::{Board, BoardId, Card, CardId, Column, ColumnId, MoveCardRequest},
    error::Result,
};
use async_trait::async_trait;

pub mod http_api;
pub mod memory_api;

pub use http_api::HttpApi;
pub use memory_api::MemoryApi;

/// The board REST API, one method per endpoint
///
/// Create calls take records carrying the unsaved ID and return the
/// server's record. Calls documented as "Card or nothing" return `None`
/// when the server answers without a body.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Lists all boards
    async fn list_boards(&self) -> Result<Vec<Board>>;

    /// Loads a board by ID
    async fn get_board(&self, id: BoardId) -> Result<Board>;

    /// Creates a board
    async fn create_board(&self, board: &Board) -> Result<Board>;

    /// Replaces a board record
    async fn update_board(&self, id: BoardId, board: &Board) -> Result<()>;

    /// Deletes a board with its columns and cards
    async fn delete_board(&self, id: BoardId) -> Result<()>;

    /// Lists a board's columns with their cards nested
    async fn list_columns(&self, board_id: BoardId) -> Result<Vec<Column>>;

    /// Creates a column
    async fn create_column(&self, column: &Column) -> Result<Column>;

    /// Replaces a column record
    async fn update_column(&self, id: ColumnId, column: &Column) -> Result<()>;

    /// Deletes a column; its cards move to the board's first remaining column
    async fn delete_column(&self, id: ColumnId) -> Result<()>;

    /// Sets a column's 1-based order among its siblings
    async fn reorder_column(&self, id: ColumnId, new_order: i32) -> Result<()>;

    /// Lists a column's cards
    async fn list_cards(&self, column_id: ColumnId) -> Result<Vec<Card>>;

    /// Creates a card
    async fn create_card(&self, card: &Card) -> Result<Card>;

    /// Replaces a card record
    async fn update_card(&self, id: CardId, card: &Card) -> Result<Option<Card>>;

    /// Deletes a card
    async fn delete_card(&self, id: CardId) -> Result<()>;

    /// Persists a card's new column and position
    async fn move_card(&self, id: CardId, request: &MoveCardRequest) -> Result<Option<Card>>;
}
