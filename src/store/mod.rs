//! Persistence for products.
//!
//! Two backends implement [`ProductStore`]: [`LocalStore`] keeps the whole
//! collection under one key of a [`KeyValueMedium`], [`RemoteStore`] talks to
//! the products REST API. Controllers only ever see the trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Product, ProductDraft, ProductId, ProductPatch};

pub mod local;
pub mod medium;
pub mod remote;

pub use local::{LocalStore, STORAGE_KEY};
pub use medium::{FileMedium, KeyValueMedium, MemoryMedium};
pub use remote::RemoteStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Every stored product, in storage order.
    async fn list(&self) -> Result<Vec<Product>>;

    /// A single product.
    async fn get(&self, id: &ProductId) -> Result<Product>;

    /// Validates and persists a new product, assigning its id and creation time.
    async fn create(&self, draft: ProductDraft) -> Result<Product>;

    /// Applies a sparse patch; fields left out of `patch` are untouched.
    async fn update(&self, id: &ProductId, patch: ProductPatch) -> Result<Product>;

    /// Removes a product.
    async fn delete(&self, id: &ProductId) -> Result<()>;
}

#[async_trait]
impl<T: ProductStore + ?Sized> ProductStore for Box<T> {
    async fn list(&self) -> Result<Vec<Product>> {
        (**self).list().await
    }

    async fn get(&self, id: &ProductId) -> Result<Product> {
        (**self).get(id).await
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product> {
        (**self).create(draft).await
    }

    async fn update(&self, id: &ProductId, patch: ProductPatch) -> Result<Product> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &ProductId) -> Result<()> {
        (**self).delete(id).await
    }
}
