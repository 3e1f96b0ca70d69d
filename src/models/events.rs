use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::ProductId;

/// Taste signal carried by a search filter set or an interaction
///
/// Event payloads are loosely shaped JSON written by several clients. Only
/// `category` and `color` feed the preference profile; any other keys are
/// kept in `extra` untouched. A label that is missing, not a string, or empty
/// is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalPayload {
    #[serde(default, deserialize_with = "lenient_label")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SignalPayload {
    pub fn new(category: Option<&str>, color: Option<&str>) -> Self {
        Self {
            category: category.and_then(label),
            color: color.and_then(label),
            extra: Map::new(),
        }
    }

    /// Parses a raw payload, falling back to an empty signal for anything
    /// that is not a JSON object
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "Unreadable event payload, ignoring");
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.map(Self::from_value).unwrap_or_default())
    }
}

fn label(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

fn lenient_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(label))
}

/// A past catalog search with the filters the shopper applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    #[serde(default, deserialize_with = "SignalPayload::deserialize_lenient")]
    pub filters: SignalPayload,
    pub created_at: DateTime<Utc>,
}

/// A view, click or try-on of a specific product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    #[serde(default, deserialize_with = "SignalPayload::deserialize_lenient")]
    pub interaction_data: SignalPayload,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

/// A product saved to the shopper's wishlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistRecord {
    pub product_id: ProductId,
}
