use crate::domain::card::Card;
use crate::domain::column::Column;

/// Sorts cards in-place by ascending order, keeping fetch order on ties
pub fn sort_cards(cards: &mut [Card]) {
    cards.sort_by_key(|card| card.order);
}

/// Sorts columns and the cards nested in each of them in-place
pub fn sort_columns(columns: &mut [Column]) {
    columns.sort_by_key(|column| column.order);
    for column in columns.iter_mut() {
        sort_cards(&mut column.cards);
    }
}

/// Main reconciliation function for a loaded board
///
/// Produces a new column sequence sorted ascending by `order`, with each
/// column's cards sorted ascending by `order`. Both sorts are stable, so
/// entries with equal orders keep the sequence the server returned them in.
/// Running it on its own output yields an identical structure.
///
/// # Arguments
/// * `columns` - The columns as fetched, cards nested inside each column
///
/// # Examples
/// ```
/// use taskboard_client::domain::sorting::reconcile;
/// use taskboard_client::domain::{BoardId, Column};
///
/// let columns = vec![
///     Column::new(BoardId::new(1), "Done", 3),
///     Column::new(BoardId::new(1), "Todo", 1),
///     Column::new(BoardId::new(1), "Doing", 2),
/// ];
///
/// let columns = reconcile(columns);
/// assert_eq!(columns[0].title, "Todo");
/// assert_eq!(columns[2].title, "Done");
/// ```
pub fn reconcile(columns: Vec<Column>) -> Vec<Column> {
    let mut columns = columns;
    sort_columns(&mut columns);
    columns
}

/// Checks the ordering invariant without reordering anything
pub fn is_reconciled(columns: &[Column]) -> bool {
    columns.windows(2).all(|pair| pair[0].order <= pair[1].order)
        && columns
            .iter()
            .all(|column| column.cards.windows(2).all(|pair| pair[0].order <= pair[1].order))
}
