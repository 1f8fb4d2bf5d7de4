use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("No active categories available")]
    NoCategoriesAvailable,

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Review not found: {0}")]
    ReviewNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Not enough stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: String, requested: u32, available: i64 },

    #[error("User {user_id} has already reviewed product {product_id}")]
    DuplicateReview { product_id: String, user_id: String },

    #[error("Failed to fetch image {url}: {reason}")]
    ImageFetch { url: String, reason: String },

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProductNotFound(_) | Self::CategoryNotFound(_) | Self::ReviewNotFound(_) | Self::OrderNotFound(_)
        )
    }

    /// True for errors caused by the request itself rather than by the
    /// service or its collaborators.
    pub fn is_client_error(&self) -> bool {
        self.is_not_found()
            || matches!(
                self,
                Self::InvalidInput(_)
                    | Self::NoCategoriesAvailable
                    | Self::DuplicateReview { .. }
                    | Self::InsufficientStock { .. }
            )
    }

    pub fn storage(err: impl std::fmt::Display) -> Self { Self::Storage(err.to_string()) }

    pub fn provider(err: impl std::fmt::Display) -> Self { Self::ProviderUnavailable(err.to_string()) }

    /// Recover a typed error carried through a store seam; anything else is `Storage`.
    pub fn from_store(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(typed) => typed,
            Err(other) => Self::Storage(format!("{other:#}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
