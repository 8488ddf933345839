use std::sync::{Arc, Mutex, PoisonError};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{CartItem, CartKey};
use crate::storage::{keys, LocalStorage};

/// The shopping cart, persisted after every change.
///
/// Totals are computed from the lines on demand, never stored.
#[derive(Debug, Clone)]
pub struct Cart {
    storage: LocalStorage,
    items: Arc<Mutex<Vec<CartItem>>>,
}

impl Cart {
    /// Load the persisted cart. An unreadable cart starts empty.
    pub fn load(storage: LocalStorage) -> Self {
        let items = match storage.get::<Vec<CartItem>>(keys::CART) {
            Ok(items) => items.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "discarding unreadable cart");
                Vec::new()
            }
        };
        Self {
            storage,
            items: Arc::new(Mutex::new(items)),
        }
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.lock().clone()
    }

    /// Add `item`; an existing line with the same key gets its quantity increased.
    pub fn add_item(&self, item: CartItem) -> Result<()> {
        self.mutate(|items| {
            match items.iter_mut().find(|line| line.key == item.key) {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                None => items.push(item),
            }
        })
    }

    /// Set the quantity of a line; zero or below removes it.
    pub fn update_quantity(&self, key: &CartKey, quantity: i64) -> Result<()> {
        self.mutate(|items| {
            if quantity <= 0 {
                items.retain(|line| &line.key != key);
            } else if let Some(line) = items.iter_mut().find(|line| &line.key == key) {
                line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            }
        })
    }

    pub fn remove_item(&self, key: &CartKey) -> Result<()> {
        self.mutate(|items| items.retain(|line| &line.key != key))
    }

    pub fn clear(&self) -> Result<()> {
        self.mutate(|items| items.clear())
    }

    pub fn total_cents(&self) -> u64 {
        self.lock()
            .iter()
            .map(CartItem::line_total_cents)
            .fold(0, u64::saturating_add)
    }

    pub fn item_count(&self) -> u32 {
        self.lock()
            .iter()
            .map(|line| line.quantity)
            .fold(0, u32::saturating_add)
    }

    /// Apply `change` to a copy, persist it, and only then make it current.
    fn mutate(&self, change: impl FnOnce(&mut Vec<CartItem>)) -> Result<()> {
        let mut items = self.lock();
        let mut next = items.clone();
        change(&mut next);
        self.storage.set(keys::CART, &next)?;
        debug!(
            lines = next.len(),
            products = ?next.iter().map(|l| l.key.product_id.as_str()).unique().collect_vec(),
            "cart changed"
        );
        *items = next;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CartItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;

    fn shirt(size: &str, quantity: u32) -> CartItem {
        CartItem {
            key: CartKey::new("p1").with_size(size).with_color("red"),
            name: "Home Shirt".into(),
            unit_price_cents: 5999,
            image_url: None,
            quantity,
        }
    }

    #[test]
    fn add_merges_matching_keys() {
        let dir = temp_dir();
        let cart = Cart::load(LocalStorage::new(dir.path()));
        cart.add_item(shirt("M", 1)).unwrap();
        cart.add_item(shirt("M", 2)).unwrap();
        cart.add_item(shirt("L", 1)).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.total_cents(), 4 * 5999);
    }

    #[test]
    fn update_to_zero_removes_line() {
        let dir = temp_dir();
        let cart = Cart::load(LocalStorage::new(dir.path()));
        cart.add_item(shirt("M", 1)).unwrap();
        cart.add_item(shirt("L", 1)).unwrap();

        let medium = CartKey::new("p1").with_size("M").with_color("red");
        cart.update_quantity(&medium, 5).unwrap();
        assert_eq!(cart.item_count(), 6);

        cart.update_quantity(&medium, -1).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].key.size.as_deref(), Some("L"));
    }

    #[test]
    fn quantities_saturate_instead_of_overflowing() {
        let dir = temp_dir();
        let cart = Cart::load(LocalStorage::new(dir.path()));
        cart.add_item(shirt("M", u32::MAX)).unwrap();
        cart.add_item(shirt("M", 1)).unwrap();
        cart.add_item(shirt("L", 5)).unwrap();

        assert_eq!(cart.items()[0].quantity, u32::MAX);
        assert_eq!(cart.item_count(), u32::MAX);
        assert_eq!(cart.total_cents(), 5999 * u64::from(u32::MAX) + 5 * 5999);

        let mut pricey = shirt("XL", u32::MAX);
        pricey.unit_price_cents = u64::MAX;
        cart.add_item(pricey).unwrap();
        assert_eq!(cart.total_cents(), u64::MAX);
    }

    #[test]
    fn failed_write_leaves_cart_unchanged() {
        let dir = temp_dir();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let cart = Cart::load(LocalStorage::new(&blocker));

        assert!(cart.add_item(shirt("M", 1)).is_err());
        assert!(cart.items().is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn cart_is_persisted() {
        let dir = temp_dir();
        let storage = LocalStorage::new(dir.path());
        let cart = Cart::load(storage.clone());
        cart.add_item(shirt("S", 3)).unwrap();

        let reloaded = Cart::load(storage.clone());
        assert_eq!(reloaded.item_count(), 3);

        reloaded.clear().unwrap();
        assert_eq!(Cart::load(storage).item_count(), 0);
    }
}
