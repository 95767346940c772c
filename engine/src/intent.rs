//! User intents and the outcomes of applying them.
//!
//! The presentation layer never touches the store. It emits intents, the
//! [`Synchronizer`](crate::Synchronizer) applies them and reports an
//! [`Outcome`].

use crate::{InventoryItem, ItemName, Quantity};
use serde::{Deserialize, Deserializer, Serialize};

/// A mutation requested by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Intent {
    /// Add `quantity` of an item, creating it if needed.
    Add {
        name: ItemName,
        /// Raw quantity text from the form. Numbers are accepted too.
        #[serde(default, deserialize_with = "quantity_text")]
        quantity: Option<String>,
    },
    /// Add one to an existing item.
    Increment { name: ItemName },
    /// Remove one from an existing item, deleting it at zero.
    Decrement { name: ItemName },
    /// Delete an item outright.
    Delete { name: ItemName },
}

impl Intent {
    /// Add intent with an optional raw quantity.
    pub fn add(name: impl Into<ItemName>, quantity: Option<&str>) -> Self {
        Intent::Add {
            name: name.into(),
            quantity: quantity.map(str::to_string),
        }
    }

    /// Name of the item this intent targets.
    pub fn name(&self) -> &ItemName {
        match self {
            Intent::Add { name, .. }
            | Intent::Increment { name }
            | Intent::Decrement { name }
            | Intent::Delete { name } => name,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Add { .. } => "add",
            Intent::Increment { .. } => "increment",
            Intent::Decrement { .. } => "decrement",
            Intent::Delete { .. } => "delete",
        }
    }
}

/// What a mutation did to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome {
    /// A new item was written.
    Created { item: InventoryItem },
    /// An existing item's quantity changed.
    #[serde(rename_all = "camelCase")]
    Updated {
        item: InventoryItem,
        previous_quantity: Quantity,
    },
    /// The item was deleted.
    Removed { name: ItemName },
    /// The item did not exist; nothing was written.
    NotFound { name: ItemName },
    /// The item exists but was left as is.
    Unchanged { item: InventoryItem },
}

impl Outcome {
    /// Whether the store was written to.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Outcome::Created { .. } | Outcome::Updated { .. } | Outcome::Removed { .. }
        )
    }
}

fn quantity_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(text)) => Some(text),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
