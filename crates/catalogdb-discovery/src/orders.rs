//! Orders: stock reservation on placement, pending-only cancellation.
//!
//! Placement and cancellation are single store writes, so an order never
//! exists without its stock taken and a rejected order leaves stock as it was.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use catalogdb_core::config::SearchSettings;
use catalogdb_core::traits::CatalogStore;
use catalogdb_core::types::{new_id, NewOrder, Order, OrderFilter, OrderItem, OrderStatus, OrderUpdate, UserId};
use catalogdb_core::{Error, Result};

use crate::compose::resolve_pagination;

pub struct OrderService {
    store: Arc<dyn CatalogStore>,
    settings: SearchSettings,
}

impl OrderService {
    pub fn new(store: Arc<dyn CatalogStore>, settings: SearchSettings) -> Self { Self { store, settings } }

    /// Price every line from the current catalog and reserve its stock.
    /// All lines must belong to one merchant.
    pub fn place_order(&self, user_id: &UserId, input: NewOrder) -> Result<Order> {
        if input.items.is_empty() {
            return Err(Error::InvalidInput("an order needs at least one item".into()));
        }
        let mut items = Vec::with_capacity(input.items.len());
        let mut merchants = BTreeSet::new();
        for line in input.items {
            if line.quantity == 0 {
                return Err(Error::InvalidInput(format!("quantity for product {} must be positive", line.product_id)));
            }
            let product = self
                .store
                .get_product(&line.product_id)
                .map_err(Error::from_store)?
                .filter(|p| p.is_active)
                .ok_or_else(|| Error::ProductNotFound(line.product_id.clone()))?;
            merchants.insert(product.merchant_id);
            items.push(OrderItem { product_id: line.product_id, quantity: line.quantity, price: product.price });
        }
        let merchant_id = match merchants.len() {
            1 => merchants.into_iter().next().unwrap_or_default(),
            _ => return Err(Error::InvalidInput("all products in an order must come from the same merchant".into())),
        };
        let total_amount = items.iter().map(|i| i.price * f64::from(i.quantity)).sum();
        let now = Utc::now();
        let order = Order {
            id: new_id(),
            user_id: user_id.clone(),
            merchant_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            shipping_address: input.shipping_address,
            contact_phone: input.contact_phone,
            created_at: now,
            updated_at: now,
        };
        self.store.place_order(order.clone()).map_err(Error::from_store)?;
        info!(order_id = %order.id, merchant_id = %order.merchant_id, total = order.total_amount, "order placed");
        Ok(order)
    }

    pub fn get_order(&self, id: &str) -> Result<Order> {
        self.store.get_order(id).map_err(Error::from_store)?.ok_or_else(|| Error::OrderNotFound(id.to_string()))
    }

    /// Newest first, paginated with the same bounds as product listings.
    pub fn list_orders(&self, filter: &OrderFilter, skip: usize, limit: Option<usize>) -> Result<Vec<Order>> {
        let page = resolve_pagination(&self.settings, skip, limit)?;
        Ok(page.apply(self.store.find_orders(filter).map_err(Error::from_store)?))
    }

    /// Status and delivery details. Cancellation goes through `cancel_order`
    /// so stock is returned; a cancelled order is final.
    pub fn update_order(&self, id: &str, update: OrderUpdate) -> Result<Order> {
        let mut order = self.get_order(id)?;
        if order.status == OrderStatus::Cancelled {
            return Err(Error::InvalidInput(format!("order {id} is cancelled")));
        }
        if let Some(status) = update.status {
            if status == OrderStatus::Cancelled {
                return Err(Error::InvalidInput("use cancel_order to cancel an order".into()));
            }
            order.status = status;
        }
        if let Some(address) = update.shipping_address { order.shipping_address = address; }
        if let Some(phone) = update.contact_phone { order.contact_phone = phone; }
        order.updated_at = Utc::now();
        self.store.replace_order(order.clone()).map_err(Error::from_store)?;
        Ok(order)
    }

    /// Only the ordering user may cancel, and only while the order is pending.
    pub fn cancel_order(&self, user_id: &UserId, id: &str) -> Result<Order> {
        let order = self.get_order(id)?;
        if &order.user_id != user_id {
            return Err(Error::OrderNotFound(id.to_string()));
        }
        let cancelled = self.store.cancel_order(id).map_err(Error::from_store)?;
        info!(order_id = %id, "order cancelled");
        Ok(cancelled)
    }
}
