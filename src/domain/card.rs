use crate::domain::id::{order_or_zero, CardId, ColumnId, Identified};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Label shown for a priority value outside the known range
pub const PRIORITY_NOT_SET: &str = "Not set";

/// Urgency of a card, transmitted as its ordinal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    /// Maps a wire ordinal back to a priority, if it is one of the four
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            3 => Some(Self::Critical),
            _ => None,
        }
    }

    /// Forces any ordinal into the valid range
    pub fn clamped(value: i32) -> Self {
        match value {
            i32::MIN..=0 => Self::Low,
            1 => Self::Medium,
            2 => Self::High,
            _ => Self::Critical,
        }
    }

    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display label for a raw, possibly absent, priority value
pub fn priority_label(value: Option<i32>) -> &'static str {
    value
        .and_then(Priority::from_value)
        .map(Priority::label)
        .unwrap_or(PRIORITY_NOT_SET)
}

/// Identity of a card as rendered: changes when the card changes column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub id: CardId,
    pub column_id: ColumnId,
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.id, self.column_id)
    }
}

/// A task unit belonging to exactly one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default)]
    pub id: CardId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default = "Utc::now", with = "created_on")]
    pub created_on: DateTime<Utc>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default, deserialize_with = "order_or_zero")]
    pub order: i32,
    pub column_id: ColumnId,
}

fn default_priority() -> i32 {
    Priority::default().value()
}

impl Card {
    /// Creates an unsaved card in the given column, stamped now
    pub fn new(column_id: ColumnId, title: impl Into<String>) -> Self {
        Self {
            id: CardId::default(),
            title: title.into(),
            description: String::new(),
            created_on: Utc::now(),
            priority: default_priority(),
            order: 0,
            column_id,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority.value();
        self
    }

    pub fn key(&self) -> CardKey {
        CardKey {
            id: self.id,
            column_id: self.column_id,
        }
    }

    pub fn priority_level(&self) -> Option<Priority> {
        Priority::from_value(self.priority)
    }

    pub fn priority_label(&self) -> &'static str {
        priority_label(Some(self.priority))
    }

    pub fn has_blank_title(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Prepares the record for transmission: trimmed title, in-range priority
    pub(crate) fn normalized(&self) -> Self {
        let mut card = self.clone();
        card.title = card.title.trim().to_string();
        card.priority = Priority::clamped(card.priority).value();
        card
    }
}

impl Default for Card {
    fn default() -> Self {
        Self::new(ColumnId::default(), "")
    }
}

impl Identified for Card {
    type Id = CardId;

    fn id(&self) -> CardId {
        self.id
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `createdOn` wire format: seven fractional digits and an explicit offset
pub mod created_on {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Renders `YYYY-MM-DDTHH:mm:ss.fffffff+00:00`
    pub fn format(timestamp: &DateTime<Utc>) -> String {
        let ticks = (timestamp.timestamp_subsec_nanos() / 100).min(9_999_999);
        format!(
            "{}.{:07}{}",
            timestamp.format("%Y-%m-%dT%H:%M:%S"),
            ticks,
            timestamp.format("%:z")
        )
    }

    /// Accepts RFC 3339 and offset-less timestamps (read as UTC)
    pub fn parse(value: &str) -> crate::error::Result<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|_| crate::error::TaskboardError::InvalidTimestamp(value.to_string()))
    }

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(timestamp))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_priority_labels() {
        assert_eq!(priority_label(Some(0)), "Low");
        assert_eq!(priority_label(Some(1)), "Medium");
        assert_eq!(priority_label(Some(2)), "High");
        assert_eq!(priority_label(Some(3)), "Critical");
        assert_eq!(priority_label(Some(4)), "Not set");
        assert_eq!(priority_label(Some(-1)), "Not set");
        assert_eq!(priority_label(None), "Not set");
    }

    #[test]
    fn test_priority_ordinals_round_trip() {
        for (ordinal, priority) in Priority::ALL.iter().enumerate() {
            assert_eq!(priority.value(), ordinal as i32);
            assert_eq!(Priority::from_value(ordinal as i32), Some(*priority));
            assert_eq!(priority.to_string(), priority_label(Some(ordinal as i32)));
        }
    }

    #[test]
    fn test_priority_clamp() {
        assert_eq!(Priority::clamped(5), Priority::Critical);
        assert_eq!(Priority::clamped(-3), Priority::Low);
        assert_eq!(Priority::clamped(2), Priority::High);
    }

    #[test]
    fn test_new_card_is_unsaved_with_medium_priority() {
        let card = Card::new(ColumnId::new(10), "Write docs");
        assert!(card.id.is_unsaved());
        assert_eq!(card.priority_level(), Some(Priority::Medium));
        assert_eq!(card.order, 0);
    }

    #[test]
    fn test_key_changes_with_column() {
        let mut card = Card::new(ColumnId::new(10), "Move me");
        card.id = CardId::new(100);
        let before = card.key();

        card.column_id = ColumnId::new(11);

        assert_ne!(before, card.key());
        assert_eq!(before.to_string(), "100-10");
        assert_eq!(card.key().to_string(), "100-11");
    }

    #[test]
    fn test_normalized_clamps_priority_and_trims_title() {
        let mut card = Card::new(ColumnId::new(10), "  Ship it  ");
        card.priority = 5;

        let sent = card.normalized();
        assert_eq!(sent.priority, 3);
        assert_eq!(sent.title, "Ship it");
    }

    #[test]
    fn test_created_on_format() {
        let timestamp = Utc
            .with_ymd_and_hms(2024, 3, 5, 14, 7, 9)
            .unwrap()
            .checked_add_signed(chrono::Duration::nanoseconds(123_456_700))
            .unwrap();

        assert_eq!(
            created_on::format(&timestamp),
            "2024-03-05T14:07:09.1234567+00:00"
        );
    }

    #[test]
    fn test_created_on_parses_offset_and_offsetless_values() {
        let with_offset = created_on::parse("2024-03-05T16:07:09.1234567+02:00").unwrap();
        let without_offset = created_on::parse("2024-03-05T14:07:09.1234567").unwrap();
        assert_eq!(with_offset, without_offset);

        assert!(created_on::parse("yesterday").is_err());
    }

    #[test]
    fn test_card_tolerates_missing_and_null_fields() {
        let json = r#"{
            "id": 100,
            "title": "Legacy",
            "description": null,
            "createdOn": "2024-01-01T00:00:00",
            "order": null,
            "columnId": 10
        }"#;

        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.description, "");
        assert_eq!(card.order, 0);
        assert_eq!(card.priority, 1);
        assert_eq!(card.column_id, ColumnId::new(10));
    }

    #[test]
    fn test_card_serializes_camel_case() {
        let card = Card::new(ColumnId::new(10), "Wire");
        let json = serde_json::to_value(&card).unwrap();

        assert_eq!(json["columnId"], 10);
        assert!(json["createdOn"].as_str().unwrap().ends_with("+00:00"));
        assert!(json.get("column_id").is_none());
    }
}
