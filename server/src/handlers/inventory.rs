//! Inventory handlers - shared by the HTTP routes and the WebSocket channel.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use stockroom_engine::{Intent, InventoryItem, Outcome, Synchronizer};

/// An item as presented to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub name: String,
    pub display_name: String,
    pub quantity: i64,
    /// False when the decrement control should be disabled
    pub can_decrement: bool,
}

impl From<&InventoryItem> for ItemView {
    fn from(item: &InventoryItem) -> Self {
        Self {
            name: item.name.clone(),
            display_name: item.display_name(),
            quantity: item.quantity,
            can_decrement: item.can_decrement(),
        }
    }
}

/// Query parameters for listing items.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Search text; blank or missing lists everything
    #[serde(default)]
    pub q: Option<String>,
}

/// Response for listing items.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub items: Vec<ItemView>,
    /// Size of the unfiltered inventory
    pub total: usize,
}

/// Request body for adding an item.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    /// Raw quantity text (a string or a number)
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
}

impl AddItemRequest {
    /// Convert into an add intent.
    pub fn into_intent(self) -> Intent {
        let quantity = match self.quantity {
            Some(serde_json::Value::String(text)) => Some(text),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Intent::Add {
            name: self.name,
            quantity,
        }
    }
}

/// Response for a mutation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub outcome: Outcome,
    /// The refreshed, unfiltered inventory
    pub items: Vec<ItemView>,
}

/// List the current snapshot, filtered by the search text if any.
pub fn handle_list(sync: &Synchronizer, query: ListQuery) -> ListResponse {
    let query = query.q.unwrap_or_default();
    let matches = sync.search(&query);
    ListResponse {
        items: matches.iter().map(ItemView::from).collect(),
        total: sync.len(),
    }
}

/// Re-read the store and list everything.
pub async fn handle_refresh(sync: &Synchronizer) -> Result<ListResponse> {
    let items = sync.refresh().await?;
    Ok(ListResponse {
        items: items.iter().map(ItemView::from).collect(),
        total: items.len(),
    })
}

/// Apply an intent and report the outcome with the refreshed inventory.
pub async fn handle_intent(sync: &Synchronizer, intent: Intent) -> Result<MutationResponse> {
    let outcome = sync.dispatch(intent).await?;
    Ok(MutationResponse {
        outcome,
        items: sync.items().iter().map(ItemView::from).collect(),
    })
}
