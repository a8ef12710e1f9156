pub mod board;
pub mod card;
pub mod column;
pub mod id;
pub mod moves;
pub mod sorting;

pub use board::Board;
pub use card::{priority_label, Card, CardKey, Priority};
pub use column::Column;
pub use id::{find_by_id, find_by_id_mut, position_by_id, BoardId, CardId, ColumnId, Identified};
pub use moves::{CardMove, MoveCardRequest};
pub use sorting::reconcile;
