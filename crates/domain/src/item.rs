//! Item types exchanged with the resource API.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, DomainResult};

/// Server-assigned item identifier.
///
/// The server hands out integers, but the client treats ids as opaque text
/// and accepts either JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    /// Wraps an identifier value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(number) if number.to_string() == self.0 => serializer.serialize_i64(number),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(number) => Ok(Self::from(number)),
            RawId::Text(text) if !text.is_empty() => Ok(Self(text)),
            RawId::Text(_) => Err(serde::de::Error::custom("item id must not be empty")),
        }
    }
}

/// An item as stored by the resource API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Server-assigned identifier, stable for the item's lifetime.
    pub id: ItemId,
    /// Item name
    pub name: String,
    /// Free-form description
    pub description: String,
}

/// Name and description edited by the user before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    /// Item name
    pub name: String,
    /// Free-form description
    pub description: String,
}

impl ItemDraft {
    /// Creates a draft from its parts.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Checks the draft against the item schema.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidDraft` if the name is blank.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidDraft("name is required".to_string()));
        }
        Ok(())
    }

    /// Returns true if both fields are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.description.is_empty()
    }

    /// Resets both fields to empty.
    pub fn clear(&mut self) {
        self.name.clear();
        self.description.clear();
    }
}

impl From<&Item> for ItemDraft {
    fn from(item: &Item) -> Self {
        Self::new(item.name.clone(), item.description.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_item_accepts_numeric_and_text_ids() {
        let items: Vec<Item> = serde_json::from_str(
            r#"[
                {"id": 1, "name": "milk", "description": "2%"},
                {"id": "a-7", "name": "eggs", "description": ""}
            ]"#,
        )
        .unwrap();

        assert_eq!(items[0].id, ItemId::from(1));
        assert_eq!(items[1].id.as_str(), "a-7");
    }

    #[test]
    fn test_item_rejects_malformed_payloads() {
        assert!(serde_json::from_str::<Item>(r#"{"id": 1, "name": "milk"}"#).is_err());
        assert!(serde_json::from_str::<Item>(r#"{"id": null, "name": "a", "description": "b"}"#).is_err());
        assert!(serde_json::from_str::<Item>(r#"{"id": "", "name": "a", "description": "b"}"#).is_err());
        assert!(serde_json::from_str::<Item>(r#"{"id": 2, "name": 5, "description": "b"}"#).is_err());
    }

    #[test]
    fn test_numeric_id_serializes_as_number() {
        let json = serde_json::to_value(ItemId::from(42)).unwrap();
        assert_eq!(json, serde_json::json!(42));

        let json = serde_json::to_value(ItemId::new("abc")).unwrap();
        assert_eq!(json, serde_json::json!("abc"));
    }

    #[test]
    fn test_draft_validation() {
        assert!(ItemDraft::new("milk", "2%").validate().is_ok());
        assert!(ItemDraft::new("milk", "").validate().is_ok());
        assert_eq!(
            ItemDraft::new("   ", "x").validate(),
            Err(DomainError::InvalidDraft("name is required".to_string()))
        );
    }

    #[test]
    fn test_draft_clear() {
        let mut draft = ItemDraft::new("milk", "2%");
        assert!(!draft.is_empty());
        draft.clear();
        assert!(draft.is_empty());
        assert_eq!(draft, ItemDraft::default());
    }

    #[test]
    fn test_draft_serializes_to_api_body() {
        let body = serde_json::to_value(ItemDraft::new("milk", "2%")).unwrap();
        assert_eq!(body, serde_json::json!({"name": "milk", "description": "2%"}));
    }
}
