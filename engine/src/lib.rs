//! # Stockroom Engine
//!
//! Inventory synchronization for a single-page stock tracker.
//!
//! The engine keeps a client-side list of named items and their quantities
//! consistent with a remote document store. It owns no storage itself: every
//! read and write goes through a [`StoreGateway`].
//!
//! ## Core Concepts
//!
//! ### Items
//!
//! An [`InventoryItem`] is a name and a quantity. The name is the document
//! key, so it is unique and case-sensitive. Quantities are never stored at zero
//! or below: taking the last unit deletes the item.
//!
//! ### Synchronizer
//!
//! The [`Synchronizer`] owns the snapshot. Each mutation fetches the current
//! document, conditionally writes it, then re-reads the whole collection:
//! - [`Synchronizer::add_item`] - create or restock
//! - [`Synchronizer::increment_item`] / [`Synchronizer::decrement_item`]
//! - [`Synchronizer::delete_item`]
//!
//! Subscribers registered with [`Synchronizer::subscribe`] are called after
//! every successful refresh.
//!
//! ### Search
//!
//! [`search()`] filters a list by approximate name match, best match first.
//!
//! ## Quick Start
//!
//! ```rust
//! use stockroom_engine::{InventoryItem, MemoryGateway, Synchronizer};
//! use std::sync::Arc;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let sync = Synchronizer::new(Arc::new(MemoryGateway::new()), "inventory");
//!
//! sync.add_item("apple", Some("3")).await.unwrap();
//! sync.add_item("apple", Some("2")).await.unwrap();
//! assert_eq!(sync.items(), vec![InventoryItem::new("apple", 5)]);
//!
//! sync.decrement_item("apple").await.unwrap();
//! assert_eq!(sync.search("aple")[0].quantity, 4);
//! # });
//! ```

pub mod error;
pub mod gateway;
pub mod intent;
pub mod item;
pub mod memory;
pub mod search;
pub mod synchronizer;

// Re-export main types at crate root
pub use error::Error;
pub use gateway::{Document, SharedGateway, StoreGateway};
pub use intent::{Intent, Outcome};
pub use item::InventoryItem;
pub use memory::MemoryGateway;
pub use search::{search, search_with, SearchHit, SearchOptions};
pub use synchronizer::{Subscriber, SubscriptionId, Synchronizer};

/// Type aliases for clarity
pub type ItemName = String;
pub type Quantity = i64;
pub type CollectionName = String;
pub type DocumentKey = String;
