//! Client-side cart.
//!
//! The cart belongs to the local session; there is no server-side copy.
//! Every mutation rewrites the whole collection, so the stored record is
//! always a complete, valid list. Concurrent writers (two terminals, two
//! tabs) are last-write-wins.

mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use counsel_core::{ItemId, LineItem, LineItemRecord, OrderTotals, Price, PriceError, Quantity};
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub use storage::{CartStorage, FileStorage, MemoryStorage};

/// Storage key of the cart record.
pub const CART_KEY: &str = "cart";

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Cart storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Cart serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Item not in cart: {0}")]
    ItemNotFound(ItemId),

    #[error("Cart total out of range: {0}")]
    Total(#[from] PriceError),

    #[error("Cart storage lock poisoned")]
    Poisoned,
}

impl CartError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ItemNotFound(_) => "That item is no longer in your cart.".to_string(),
            Self::Total(_) => "Your cart total is too large to check out.".to_string(),
            Self::Storage(_) | Self::Serialize(_) | Self::Poisoned => {
                "Your cart could not be saved. Please try again.".to_string()
            }
        }
    }
}

/// Item count and subtotal, for headers and badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    /// Number of distinct lines.
    pub lines: usize,
    /// Sum of quantities across lines.
    pub units: u64,
    pub subtotal: Price,
}

/// Persistent cart backed by a [`CartStorage`].
#[derive(Clone)]
pub struct CartStore {
    storage: Arc<dyn CartStorage>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore").finish_non_exhaustive()
    }
}

impl CartStore {
    pub fn new(storage: Arc<dyn CartStorage>) -> Self {
        Self { storage }
    }

    /// A cart stored as `<dir>/cart.json`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStorage::new(dir)))
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Current cart contents.
    ///
    /// Never fails: a missing or unreadable record is an empty cart, and
    /// records that do not describe a valid item are skipped.
    #[must_use]
    pub fn get(&self) -> Vec<LineItem> {
        self.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read cart, treating as empty");
            Vec::new()
        })
    }

    /// Current contents for a read-modify-write. A read failure is an
    /// error here so a mutation never overwrites a cart it could not see.
    fn load(&self) -> Result<Vec<LineItem>, CartError> {
        Ok(self
            .storage
            .load(CART_KEY)?
            .map(|raw| parse_cart(&raw))
            .unwrap_or_default())
    }

    /// Replace the cart contents.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be serialized or written.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub fn set(&self, items: &[LineItem]) -> Result<(), CartError> {
        let raw = serde_json::to_string(items)?;
        self.storage.save(CART_KEY, &raw)?;
        debug!("Cart saved");
        Ok(())
    }

    /// Add an item, merging quantities with an existing line of the same id.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be read or saved.
    #[instrument(skip(self, item), fields(item_id = %item.id()))]
    pub fn add(&self, item: LineItem) -> Result<Vec<LineItem>, CartError> {
        let mut items = self.load()?;
        if let Some(existing) = items.iter_mut().find(|i| i.id() == item.id()) {
            let merged = existing.quantity().saturating_add(item.quantity());
            existing.set_quantity(merged);
        } else {
            items.push(item);
        }
        self.set(&items)?;
        Ok(items)
    }

    /// Change a line's quantity by `delta`, never going below one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if no line has this id, or a
    /// storage error if the cart cannot be read or saved.
    #[instrument(skip(self, id), fields(item_id = %id))]
    pub fn update_quantity(&self, id: &ItemId, delta: i64) -> Result<Vec<LineItem>, CartError> {
        let mut items = self.load()?;
        let line = items
            .iter_mut()
            .find(|i| i.id() == id)
            .ok_or_else(|| CartError::ItemNotFound(id.clone()))?;
        let next: Quantity = line.quantity().adjusted(delta);
        line.set_quantity(next);
        self.set(&items)?;
        Ok(items)
    }

    /// Delete a line. Removing an id that is not in the cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be read or saved.
    #[instrument(skip(self, id), fields(item_id = %id))]
    pub fn remove(&self, id: &ItemId) -> Result<Vec<LineItem>, CartError> {
        let mut items = self.load()?;
        items.retain(|i| i.id() != id);
        self.set(&items)?;
        Ok(items)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be saved.
    pub fn clear(&self) -> Result<(), CartError> {
        self.set(&[])
    }

    /// Item count and subtotal of the current contents.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Total`] if the subtotal overflows.
    pub fn summary(&self) -> Result<CartSummary, CartError> {
        let items = self.get();
        let totals = OrderTotals::from_items(&items)?;
        Ok(CartSummary {
            lines: items.len(),
            units: items.iter().map(|i| u64::from(i.quantity().get())).sum(),
            subtotal: totals.subtotal,
        })
    }
}

/// Parse a stored cart, dropping records that cannot become a [`LineItem`].
fn parse_cart(raw: &str) -> Vec<LineItem> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(serde_json::Value::Array(values)) => values,
        Ok(_) => {
            warn!("Stored cart is not a list, treating as empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "Stored cart is not valid JSON, treating as empty");
            return Vec::new();
        }
    };

    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let record: LineItemRecord = serde_json::from_value(value)
                .map_err(|e| warn!(index, error = %e, "Dropping malformed cart record"))
                .ok()?;
            LineItem::try_from(record)
                .map_err(|e| warn!(index, error = %e, "Dropping invalid cart record"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use counsel_core::CurrencyCode;
    use rust_decimal::Decimal;

    fn item(id: &str, amount: i64) -> LineItem {
        LineItem::standard(
            ItemId::parse(id).unwrap(),
            format!("Template {id}"),
            "Contracts",
            Price::new(Decimal::from(amount), CurrencyCode::INR).unwrap(),
        )
    }

    fn seeded(raw: &str) -> CartStore {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert_raw(CART_KEY, raw);
        CartStore::new(storage)
    }

    #[test]
    fn test_empty_cart() {
        let cart = CartStore::in_memory();
        assert!(cart.get().is_empty());
        let summary = cart.summary().unwrap();
        assert_eq!(summary.lines, 0);
        assert!(summary.subtotal.is_zero());
    }

    #[test]
    fn test_add_merges_quantities() {
        let cart = CartStore::in_memory();
        cart.add(item("t1", 500)).unwrap();
        let items = cart
            .add(item("t1", 500).with_quantity(Quantity::new(2).unwrap()))
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity().get(), 3);
    }

    #[test]
    fn test_update_quantity_clamps_at_one() {
        let cart = CartStore::in_memory();
        cart.add(item("t1", 500)).unwrap();
        let id = ItemId::parse("t1").unwrap();

        let items = cart.update_quantity(&id, 4).unwrap();
        assert_eq!(items[0].quantity().get(), 5);

        let items = cart.update_quantity(&id, -10).unwrap();
        assert_eq!(items[0].quantity().get(), 1);
        assert_eq!(cart.get()[0].quantity().get(), 1);
    }

    #[test]
    fn test_update_quantity_unknown_item() {
        let cart = CartStore::in_memory();
        let err = cart
            .update_quantity(&ItemId::parse("nope").unwrap(), 1)
            .unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound(_)));
    }

    #[test]
    fn test_remove_and_clear() {
        let cart = CartStore::in_memory();
        cart.add(item("t1", 500)).unwrap();
        cart.add(item("t2", 250)).unwrap();

        let items = cart.remove(&ItemId::parse("t1").unwrap()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id().as_str(), "t2");

        cart.clear().unwrap();
        assert!(cart.get().is_empty());
    }

    #[test]
    fn test_summary() {
        let cart = CartStore::in_memory();
        cart.add(item("t1", 500).with_quantity(Quantity::new(2).unwrap()))
            .unwrap();
        cart.add(item("t2", 250)).unwrap();

        let summary = cart.summary().unwrap();
        assert_eq!(summary.lines, 2);
        assert_eq!(summary.units, 3);
        assert_eq!(summary.subtotal.amount(), Decimal::from(1250));
    }

    #[test]
    fn test_lenient_load_drops_bad_records() {
        let cart = seeded(
            r#"[
                {"id":"t1","title":"NDA","unitPrice":"500","quantity":"2"},
                {"id":"t2","title":"Bad","unitPrice":-5},
                {"id":"","title":"No id","unitPrice":10},
                {"id":"t3","title":"Zero","unitPrice":10,"quantity":0},
                {"title":"Missing id","unitPrice":10},
                {"id":"c1","title":"Review","unitPrice":0,"isCustom":"true"}
            ]"#,
        );
        let items = cart.get();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity().get(), 2);
        assert!(!items[0].is_custom());
        assert_eq!(items[1].option_name(), Some("Review"));
    }

    #[test]
    fn test_absurd_price_record_is_dropped() {
        let cart = seeded(
            r#"[
                {"id":"t1","title":"NDA","unitPrice":"500"},
                {"id":"t2","title":"Huge","unitPrice":"79228162514264337593543950335","quantity":2}
            ]"#,
        );
        let items = cart.get();
        assert_eq!(items.len(), 1);
        assert_eq!(cart.summary().unwrap().subtotal.amount(), Decimal::from(500));
    }

    /// Backend whose reads fail and whose writes are recorded.
    #[derive(Default)]
    struct UnreadableStorage {
        saves: std::sync::Mutex<Vec<String>>,
    }

    impl CartStorage for UnreadableStorage {
        fn load(&self, _key: &str) -> Result<Option<String>, CartError> {
            Err(CartError::Storage(std::io::Error::other("disk read failed")))
        }

        fn save(&self, _key: &str, value: &str) -> Result<(), CartError> {
            self.saves.lock().unwrap().push(value.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_unreadable_cart_is_never_overwritten() {
        let storage = Arc::new(UnreadableStorage::default());
        let cart = CartStore::new(storage.clone());
        let id = ItemId::parse("t1").unwrap();

        assert!(cart.get().is_empty());
        assert!(matches!(cart.add(item("t1", 500)), Err(CartError::Storage(_))));
        assert!(matches!(cart.update_quantity(&id, 1), Err(CartError::Storage(_))));
        assert!(matches!(cart.remove(&id), Err(CartError::Storage(_))));
        assert!(storage.saves.lock().unwrap().is_empty());
    }

    #[test]
    fn test_non_array_record_is_empty() {
        assert!(seeded(r#"{"id":"t1"}"#).get().is_empty());
        assert!(seeded("garbage").get().is_empty());
    }

    #[test]
    fn test_file_backed_cart_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        CartStore::in_dir(dir.path()).add(item("t1", 500)).unwrap();

        let reopened = CartStore::in_dir(dir.path());
        let items = reopened.get();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id().as_str(), "t1");
    }
}
