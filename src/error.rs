//! Error taxonomy shared by the stores and the controllers.

use thiserror::Error;

use crate::models::ProductId;

/// Everything a store or controller can fail with.
///
/// The `Display` text is what gets shown to the user in a notice.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Product not found!")]
    NotFound(ProductId),

    #[error("You haven't made any changes.")]
    NoChange,

    /// The remote API answered with a client error carrying a message.
    #[error("{0}")]
    Rejected(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    /// Message for a transient notice.
    ///
    /// Transport failures get a generic wording; the detail goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable(_) => {
                "A network error occurred. Please check your connection.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(error: reqwest::Error) -> Self {
        Self::Unavailable(error.to_string())
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(error: std::io::Error) -> Self {
        Self::Unavailable(error.to_string())
    }
}

/// Input rejected before anything is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,

    #[error("Price must be a number")]
    InvalidPrice,

    #[error("Price must be greater than 0")]
    NonPositivePrice,

    #[error("Price is too large")]
    PriceTooLarge,
}

pub type Result<T> = std::result::Result<T, CatalogError>;
