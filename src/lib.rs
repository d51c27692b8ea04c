//! Product catalog front end: product listings with search, sort and a
//! running total, create/edit forms, and persistence to either a local
//! key/value medium or the products REST API.

pub mod catalog;
pub mod config;
pub mod error;
pub mod forms;
pub mod logging;
pub mod mock_data;
pub mod models;
pub mod store;

pub use catalog::{Catalog, Confirm, Removal};
pub use error::{CatalogError, ValidationError};
pub use forms::{CreateController, EditController, Page, ProductForm};
pub use models::{Product, ProductDraft, ProductId, ProductKind, ProductPatch};
pub use store::{FileMedium, KeyValueMedium, LocalStore, MemoryMedium, ProductStore, RemoteStore};
