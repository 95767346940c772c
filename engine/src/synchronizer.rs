//! Synchronizer - the client's view of the inventory.
//!
//! Every mutation goes through the gateway as fetch, conditional write, then a
//! full re-read of the collection. The in-memory list is only ever replaced
//! wholesale by a successful [`Synchronizer::refresh`].
//!
//! Nothing here is atomic across the fetch/write pair. Two callers mutating the
//! same item concurrently can both read the same quantity, and the later write
//! wins.
//!
//! Refreshes are ordered, though. Each one takes a generation before it reads
//! the store, and a read that started earlier never replaces the snapshot
//! installed by one that started later.

use crate::item::{normalize_name, parse_quantity, quantity_from_fields};
use crate::{
    error::Result, search, CollectionName, Error, Intent, InventoryItem, Outcome, SharedGateway,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Callback run after every successful refresh with the new snapshot.
pub type Subscriber = Arc<dyn Fn(&[InventoryItem]) + Send + Sync>;

/// Handle returned by [`Synchronizer::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The installed list and the generation of the read that produced it.
#[derive(Debug, Default)]
struct Snapshot {
    generation: u64,
    items: Vec<InventoryItem>,
}

/// Owns the inventory snapshot and mediates every change to it.
pub struct Synchronizer {
    gateway: SharedGateway,
    collection: CollectionName,
    snapshot: RwLock<Snapshot>,
    next_generation: AtomicU64,
    /// Generation last delivered to subscribers.
    notified: Mutex<u64>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("collection", &self.collection)
            .field("items", &self.len())
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Create a synchronizer over one collection. The snapshot starts empty;
    /// call [`refresh`](Self::refresh) to load it.
    pub fn new(gateway: SharedGateway, collection: impl Into<CollectionName>) -> Self {
        Self {
            gateway,
            collection: collection.into(),
            snapshot: RwLock::new(Snapshot::default()),
            next_generation: AtomicU64::new(1),
            notified: Mutex::new(0),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Create a synchronizer wrapped in Arc for sharing.
    pub fn new_shared(gateway: SharedGateway, collection: impl Into<CollectionName>) -> Arc<Self> {
        Arc::new(Self::new(gateway, collection))
    }

    /// Name of the collection being tracked.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Copy of the current snapshot.
    pub fn items(&self) -> Vec<InventoryItem> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .clone()
    }

    /// Number of items in the snapshot.
    pub fn len(&self) -> usize {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .len()
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the search filter over the current snapshot.
    pub fn search(&self, query: &str) -> Vec<InventoryItem> {
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        search::search(&snapshot.items, query)
    }

    /// Register a callback for refreshed snapshots.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[InventoryItem]) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Re-read the whole collection and replace the snapshot.
    ///
    /// On failure the previous snapshot is kept and nobody is notified. If a
    /// refresh that started later has already been installed, this read is
    /// discarded and the installed list is returned instead.
    pub async fn refresh(&self) -> Result<Vec<InventoryItem>> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let documents = self.gateway.list_all(&self.collection).await?;

        let mut fresh = Vec::with_capacity(documents.len());
        for doc in &documents {
            match InventoryItem::from_document(&self.collection, doc) {
                Ok(item) => fresh.push(item),
                Err(e) => {
                    // Skip malformed documents
                    tracing::warn!(key = %doc.key, error = %e, "Skipping malformed inventory document");
                }
            }
        }

        {
            let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
            if generation < snapshot.generation {
                tracing::debug!(
                    generation,
                    installed = snapshot.generation,
                    "Discarding refresh overtaken by a later one"
                );
                return Ok(snapshot.items.clone());
            }
            snapshot.generation = generation;
            snapshot.items = fresh.clone();
        }
        tracing::debug!(
            collection = %self.collection,
            generation,
            items = fresh.len(),
            "Inventory refreshed"
        );

        self.notify(generation, &fresh);
        Ok(fresh)
    }

    /// Add `quantity_text` of `name`, creating the item if it does not exist.
    ///
    /// The name is trimmed and must not be empty. The quantity is read as an
    /// integer and defaults to 1 when missing or unreadable; it must be
    /// positive. Both checks happen before the store is touched.
    pub async fn add_item(&self, name: &str, quantity_text: Option<&str>) -> Result<Outcome> {
        let name = normalize_name(name)?;
        let quantity = parse_quantity(quantity_text);
        if quantity <= 0 {
            return Err(Error::validation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }

        let outcome = match self.fetch(&name).await? {
            Some(existing) => {
                let total = existing.quantity.checked_add(quantity).ok_or_else(|| {
                    Error::validation(format!("quantity of '{name}' would overflow"))
                })?;
                let item = InventoryItem::new(name, total);
                self.write(&item).await?;
                tracing::info!(item = %item.name, quantity = total, added = quantity, "Item restocked");
                Outcome::Updated {
                    item,
                    previous_quantity: existing.quantity,
                }
            }
            None => {
                let item = InventoryItem::new(name, quantity);
                self.write(&item).await?;
                tracing::info!(item = %item.name, quantity, "Item created");
                Outcome::Created { item }
            }
        };

        self.refresh().await?;
        Ok(outcome)
    }

    /// Add one to an existing item. A missing item is left alone.
    ///
    /// Names are trimmed the same way [`add_item`](Self::add_item) trims them.
    pub async fn increment_item(&self, name: &str) -> Result<Outcome> {
        let name = name.trim();
        let outcome = match self.fetch(name).await? {
            Some(existing) => {
                let total = existing.quantity.checked_add(1).ok_or_else(|| {
                    Error::validation(format!("quantity of '{name}' would overflow"))
                })?;
                let item = InventoryItem::new(name, total);
                self.write(&item).await?;
                tracing::info!(item = %name, quantity = total, "Item incremented");
                Outcome::Updated {
                    item,
                    previous_quantity: existing.quantity,
                }
            }
            None => {
                tracing::info!(item = %name, "Increment skipped, item does not exist");
                Outcome::NotFound {
                    name: name.to_string(),
                }
            }
        };

        self.refresh().await?;
        Ok(outcome)
    }

    /// Take one from an existing item, deleting it when the last one goes.
    ///
    /// Items already at zero or below are left alone.
    pub async fn decrement_item(&self, name: &str) -> Result<Outcome> {
        let name = name.trim();
        let outcome = match self.fetch(name).await? {
            Some(existing) if existing.quantity > 1 => {
                let item = InventoryItem::new(name, existing.quantity - 1);
                self.write(&item).await?;
                tracing::info!(item = %name, quantity = item.quantity, "Item decremented");
                Outcome::Updated {
                    item,
                    previous_quantity: existing.quantity,
                }
            }
            Some(existing) if existing.quantity == 1 => {
                self.gateway.delete_by_key(&self.collection, name).await?;
                tracing::info!(item = %name, "Last unit taken, item removed");
                Outcome::Removed {
                    name: name.to_string(),
                }
            }
            Some(existing) => {
                tracing::warn!(
                    item = %name,
                    quantity = existing.quantity,
                    "Decrement skipped, stored quantity is not positive"
                );
                Outcome::Unchanged { item: existing }
            }
            None => {
                tracing::info!(item = %name, "Decrement skipped, item does not exist");
                Outcome::NotFound {
                    name: name.to_string(),
                }
            }
        };

        self.refresh().await?;
        Ok(outcome)
    }

    /// Delete an item. A missing item is logged and the snapshot is not refreshed.
    pub async fn delete_item(&self, name: &str) -> Result<Outcome> {
        let name = name.trim();
        if self.fetch(name).await?.is_none() {
            tracing::info!(item = %name, "Delete skipped, item does not exist");
            return Ok(Outcome::NotFound {
                name: name.to_string(),
            });
        }

        self.gateway.delete_by_key(&self.collection, name).await?;
        tracing::info!(item = %name, "Item deleted");

        self.refresh().await?;
        Ok(Outcome::Removed {
            name: name.to_string(),
        })
    }

    /// Apply a user intent.
    pub async fn dispatch(&self, intent: Intent) -> Result<Outcome> {
        tracing::debug!(intent = intent.kind(), item = %intent.name(), "Dispatching intent");
        match intent {
            Intent::Add { name, quantity } => self.add_item(&name, quantity.as_deref()).await,
            Intent::Increment { name } => self.increment_item(&name).await,
            Intent::Decrement { name } => self.decrement_item(&name).await,
            Intent::Delete { name } => self.delete_item(&name).await,
        }
    }

    async fn fetch(&self, name: &str) -> Result<Option<InventoryItem>> {
        let fields = self.gateway.get_by_key(&self.collection, name).await?;
        fields
            .map(|fields| -> Result<InventoryItem> {
                let quantity = quantity_from_fields(&self.collection, name, &fields)?;
                Ok(InventoryItem::new(name, quantity))
            })
            .transpose()
    }

    async fn write(&self, item: &InventoryItem) -> Result<()> {
        self.gateway
            .upsert(&self.collection, &item.name, item.to_fields())
            .await
    }

    fn notify(&self, generation: u64, items: &[InventoryItem]) {
        // Held while callbacks run so deliveries stay in generation order
        let mut notified = self.notified.lock().unwrap_or_else(PoisonError::into_inner);
        if generation < *notified {
            return;
        }
        *notified = generation;

        let subscribers: Vec<Subscriber> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in subscribers {
            callback(items);
        }
    }
}
