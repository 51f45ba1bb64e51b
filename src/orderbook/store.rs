//! Order store
//!
//! Maps order ids to live orders. Every mutation is total: references to
//! unknown ids are no-ops, because a late-joining consumer routinely sees
//! executions and deletes for orders it never saw added.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{LiveOrder, OrderId};

/// What a store mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A new order id was inserted
    Inserted,
    /// An add reused a live id and replaced its order
    Overwritten,
    /// An execution left quantity behind
    Reduced,
    /// The order left the store
    Retired,
    /// The old id was retired and the new id inserted
    Replaced,
    /// An add carried no quantity and was not stored
    ZeroQuantity,
    /// The referenced order id is not live
    NotFound,
}

/// Live orders keyed by order id
///
/// Invariant: every stored order has `quantity > 0`.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: HashMap<OrderId, LiveOrder>,
    /// Live ids per symbol, kept in step with `orders`
    by_symbol: BTreeMap<String, HashSet<OrderId>>,
}

impl OrderStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an order, silently replacing any live order under the same id
    pub fn apply_add(&mut self, order_id: OrderId, order: LiveOrder) -> Applied {
        if order.quantity == 0 {
            self.remove(order_id);
            return Applied::ZeroQuantity;
        }

        match self.insert(order_id, order) {
            Some(_) => Applied::Overwritten,
            None => Applied::Inserted,
        }
    }

    /// Decrement quantity, retiring the order once nothing is left
    pub fn apply_execute(&mut self, order_id: OrderId, executed_quantity: u64) -> Applied {
        let Some(order) = self.orders.get_mut(&order_id) else {
            return Applied::NotFound;
        };

        if executed_quantity >= order.quantity {
            self.remove(order_id);
            Applied::Retired
        } else {
            order.quantity -= executed_quantity;
            Applied::Reduced
        }
    }

    /// Remove an order
    pub fn apply_delete(&mut self, order_id: OrderId) -> Applied {
        match self.remove(order_id) {
            Some(_) => Applied::Retired,
            None => Applied::NotFound,
        }
    }

    /// Retire `old_order_id` and insert `new_order_id` in one step
    ///
    /// Symbol, side and timestamp always come from the old order; price and
    /// quantity only when the event does not carry them. If the old id is
    /// not live the event is dropped entirely.
    pub fn apply_replace(
        &mut self,
        old_order_id: OrderId,
        new_order_id: OrderId,
        new_price: Option<Decimal>,
        new_quantity: Option<u64>,
    ) -> Applied {
        let Some(old) = self.remove(old_order_id) else {
            return Applied::NotFound;
        };

        let order = LiveOrder {
            price: new_price.unwrap_or(old.price),
            quantity: new_quantity.unwrap_or(old.quantity),
            ..old
        };
        if order.quantity == 0 {
            return Applied::Retired;
        }

        self.insert(new_order_id, order);
        Applied::Replaced
    }

    /// Get a live order
    pub fn get(&self, order_id: OrderId) -> Option<&LiveOrder> {
        self.orders.get(&order_id)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Number of live orders
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Symbols with at least one live order, in ascending order
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.by_symbol.keys().map(String::as_str)
    }

    /// Number of symbols with at least one live order
    pub fn symbol_count(&self) -> usize {
        self.by_symbol.len()
    }

    /// Live orders of one symbol, in no particular order
    pub fn orders_for<'a>(&'a self, symbol: &str) -> impl Iterator<Item = &'a LiveOrder> + 'a {
        self.by_symbol
            .get(symbol)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.orders.get(id))
    }

    fn insert(&mut self, order_id: OrderId, order: LiveOrder) -> Option<LiveOrder> {
        let previous = self.remove(order_id);
        self.by_symbol
            .entry(order.symbol.clone())
            .or_default()
            .insert(order_id);
        self.orders.insert(order_id, order);
        previous
    }

    fn remove(&mut self, order_id: OrderId) -> Option<LiveOrder> {
        let order = self.orders.remove(&order_id)?;
        if let Some(ids) = self.by_symbol.get_mut(&order.symbol) {
            ids.remove(&order_id);
            if ids.is_empty() {
                self.by_symbol.remove(&order.symbol);
            }
        }
        Some(order)
    }
}
