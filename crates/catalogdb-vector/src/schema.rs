use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// `id` is unique; `category_id` and `price` mirror the product at index time.
pub fn build_products_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("category_id", DataType::Utf8, false),
        Field::new("price", DataType::Float64, false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
