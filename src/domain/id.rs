use serde::{Deserialize, Serialize};
use std::fmt;

/// ID the server has not assigned yet.
pub const UNSAVED_ID: i64 = 0;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn value(self) -> i64 {
                self.0
            }

            /// True until the server has assigned an ID
            pub const fn is_unsaved(self) -> bool {
                self.0 == UNSAVED_ID
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Server-assigned board identifier
    BoardId
);
entity_id!(
    /// Server-assigned column identifier
    ColumnId
);
entity_id!(
    /// Server-assigned card identifier
    CardId
);

/// Records that are looked up in lists by their ID alone.
pub trait Identified {
    type Id: Copy + Eq;

    fn id(&self) -> Self::Id;
}

pub fn find_by_id<T: Identified>(items: &[T], id: T::Id) -> Option<&T> {
    items.iter().find(|item| item.id() == id)
}

pub fn find_by_id_mut<T: Identified>(items: &mut [T], id: T::Id) -> Option<&mut T> {
    items.iter_mut().find(|item| item.id() == id)
}

pub fn position_by_id<T: Identified>(items: &[T], id: T::Id) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

/// Accepts a missing or `null` order and reads it as 0.
pub(crate) fn order_or_zero<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<i32>::deserialize(deserializer)?.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_id_is_unsaved() {
        assert!(CardId::default().is_unsaved());
        assert!(!CardId::new(7).is_unsaved());
    }

    #[test]
    fn test_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&ColumnId::new(11)).unwrap();
        assert_eq!(json, "11");

        let id: BoardId = serde_json::from_str("42").unwrap();
        assert_eq!(id, BoardId::new(42));
    }
}
