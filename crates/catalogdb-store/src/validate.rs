//! Record checks shared by the store and the write paths above it.

use catalogdb_core::types::{Category, Order, Product, Review, MAX_RATING, MIN_RATING};
use catalogdb_core::{Error, Result};

pub fn validate_rating(rating: u8) -> Result<()> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}")))
    }
}

pub fn validate_price(price: f64) -> Result<()> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("price must be a non-negative number, got {price}")))
    }
}

pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{kind} name must not be empty")));
    }
    Ok(())
}

pub fn validate_product(product: &Product) -> Result<()> {
    if product.id.is_empty() { return Err(Error::InvalidInput("product id must not be empty".into())); }
    validate_name("product", &product.name)?;
    validate_price(product.price)?;
    if product.stock_quantity < 0 {
        return Err(Error::InvalidInput(format!("stock quantity must not be negative, got {}", product.stock_quantity)));
    }
    Ok(())
}

pub fn validate_category(category: &Category) -> Result<()> {
    if category.id.is_empty() { return Err(Error::InvalidInput("category id must not be empty".into())); }
    if category.parent_id.as_deref() == Some(category.id.as_str()) {
        return Err(Error::InvalidInput(format!("category {} cannot be its own parent", category.id)));
    }
    validate_name("category", &category.name)
}

pub fn validate_review(review: &Review) -> Result<()> {
    if review.id.is_empty() { return Err(Error::InvalidInput("review id must not be empty".into())); }
    validate_rating(review.rating)
}

pub fn validate_order(order: &Order) -> Result<()> {
    if order.id.is_empty() { return Err(Error::InvalidInput("order id must not be empty".into())); }
    if order.items.is_empty() { return Err(Error::InvalidInput(format!("order {} has no items", order.id))); }
    for item in &order.items {
        if item.quantity == 0 {
            return Err(Error::InvalidInput(format!("quantity for product {} must be positive", item.product_id)));
        }
        validate_price(item.price)?;
    }
    validate_price(order.total_amount)
}
