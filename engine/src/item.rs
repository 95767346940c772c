//! Inventory items and their document encoding.

use crate::{error::Result, Document, Error, ItemName, Quantity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Field holding the quantity inside a stored document.
pub const QUANTITY_FIELD: &str = "quantity";

/// Quantity used when the add form leaves the quantity empty or unreadable.
pub const DEFAULT_QUANTITY: Quantity = 1;

/// A named item and how many of it are in stock.
///
/// The name doubles as the document key, so it is unique and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub name: ItemName,
    pub quantity: Quantity,
}

impl InventoryItem {
    /// Create an item.
    pub fn new(name: impl Into<ItemName>, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }

    /// Decode an item from a stored document.
    pub fn from_document(collection: &str, doc: &Document) -> Result<Self> {
        let quantity = quantity_from_fields(collection, &doc.key, &doc.fields)?;
        Ok(Self::new(doc.key.clone(), quantity))
    }

    /// Fields written to the store for this item. The name lives in the key.
    pub fn to_fields(&self) -> Value {
        fields_for(self.quantity)
    }

    /// Name with its first character upper-cased, as shown in listings.
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Whether a decrement control should be enabled for this item.
    pub fn can_decrement(&self) -> bool {
        self.quantity > 0
    }
}

/// Document fields for a given quantity.
pub fn fields_for(quantity: Quantity) -> Value {
    json!({ QUANTITY_FIELD: quantity })
}

/// Read the quantity out of a document's fields.
pub fn quantity_from_fields(collection: &str, key: &str, fields: &Value) -> Result<Quantity> {
    let invalid = |reason: &str| Error::InvalidDocument {
        collection: collection.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    };

    match fields.get(QUANTITY_FIELD) {
        Some(value) => value
            .as_i64()
            .ok_or_else(|| invalid("quantity is not an integer")),
        None => Err(invalid("missing quantity")),
    }
}

/// Parse the quantity typed into the add form.
///
/// Reads an optional sign and the leading run of digits, ignoring surrounding
/// whitespace and anything after the digits. Missing, empty, digit-less or
/// out-of-range text falls back to [`DEFAULT_QUANTITY`].
pub fn parse_quantity(text: Option<&str>) -> Quantity {
    let Some(text) = text else {
        return DEFAULT_QUANTITY;
    };
    let text = text.trim();

    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let digits_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];

    match digits.parse::<Quantity>() {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => DEFAULT_QUANTITY,
    }
}

/// Trim a user supplied name and reject it when nothing is left.
pub fn normalize_name(name: &str) -> Result<ItemName> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("item name must not be empty"));
    }
    Ok(trimmed.to_string())
}
