use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::models::{Product, ProductDraft, ProductId, ProductPatch};
use crate::store::medium::KeyValueMedium;
use crate::store::ProductStore;

/// Key the serialized collection lives under.
pub const STORAGE_KEY: &str = "pendingProducts";

const ID_SUFFIX_LEN: usize = 10;

/// Store backed by a single serialized array on a key/value medium.
///
/// Every mutation reads the whole collection and writes it back. Nothing
/// coordinates two processes sharing the medium: the last writer wins.
#[derive(Debug)]
pub struct LocalStore<M> {
    medium: M,
}

impl<M: KeyValueMedium> LocalStore<M> {
    pub fn new(medium: M) -> Self {
        Self { medium }
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Reads the collection for display. Unparseable data reads as empty.
    fn load(&self) -> Result<Vec<Product>> {
        let Some(raw) = self.medium.get(STORAGE_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(products) => Ok(products),
            Err(e) => {
                warn!(error = %e, key = STORAGE_KEY, "stored products are unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Reads the collection ahead of a write.
    ///
    /// Unlike [`Self::load`] this refuses corrupt data, so a mutation never
    /// overwrites records it could not read.
    fn load_for_write(&self) -> Result<Vec<Product>> {
        let Some(raw) = self.medium.get(STORAGE_KEY)? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&raw)
            .map_err(|e| CatalogError::Unavailable(format!("stored products are corrupt: {e}")))
    }

    fn save(&self, products: &[Product]) -> Result<()> {
        let raw = serde_json::to_string(products)
            .map_err(|e| CatalogError::Unavailable(format!("cannot serialize products: {e}")))?;
        self.medium.set(STORAGE_KEY, &raw)?;
        Ok(())
    }
}

#[async_trait]
impl<M: KeyValueMedium> ProductStore for LocalStore<M> {
    async fn list(&self) -> Result<Vec<Product>> {
        let products = self.load()?;
        debug!(count = products.len(), "listed local products");
        Ok(products)
    }

    async fn get(&self, id: &ProductId) -> Result<Product> {
        self.load()?
            .into_iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product> {
        let draft = draft.validate()?;
        let mut products = self.load_for_write()?;
        let now = Utc::now();

        let product = Product {
            id: generate_id(&products),
            title: draft.title,
            description: draft.description,
            price: draft.price,
            product_type: draft.product_type,
            created_at: Some(now),
            last_updated: Some(now),
        };
        products.push(product.clone());
        self.save(&products)?;

        debug!(id = %product.id, "created local product");
        Ok(product)
    }

    async fn update(&self, id: &ProductId, patch: ProductPatch) -> Result<Product> {
        if patch.is_empty() {
            return Err(CatalogError::NoChange);
        }
        let patch = patch.validate()?;

        let mut products = self.load_for_write()?;
        let product = products
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        product.apply(&patch);
        product.last_updated = Some(Utc::now());
        let updated = product.clone();
        self.save(&products)?;

        debug!(%id, "updated local product");
        Ok(updated)
    }

    async fn delete(&self, id: &ProductId) -> Result<()> {
        let mut products = self.load_for_write()?;
        let before = products.len();
        products.retain(|p| &p.id != id);

        if products.len() == before {
            return Err(CatalogError::NotFound(id.clone()));
        }
        self.save(&products)?;

        debug!(%id, "deleted local product");
        Ok(())
    }
}

/// `<unix millis>-<random base36>`, unique within `taken`.
fn generate_id(taken: &[Product]) -> ProductId {
    loop {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        let id = ProductId::new(format!("{}-{suffix}", Utc::now().timestamp_millis()));

        if !taken.iter().any(|p| p.id == id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;
    use crate::error::ValidationError;
    use crate::store::MemoryMedium;

    fn price(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn cam() -> ProductDraft {
        ProductDraft::new("Cam1", "d", price("100"), "camera")
    }

    #[tokio::test]
    async fn create_assigns_identity_and_persists() -> TestResult {
        let store = LocalStore::new(MemoryMedium::new());

        let created = store.create(cam()).await?;
        let listed = store.list().await?;

        assert_eq!(listed, vec![created.clone()]);
        assert!(created.created_at.is_some());
        assert!(!created.id.as_str().is_empty());
        assert_eq!(created.image_url(), "/img/cam.png");

        Ok(())
    }

    #[tokio::test]
    async fn create_rejects_non_positive_price_without_writing() -> TestResult {
        let store = LocalStore::new(MemoryMedium::new());

        let result = store
            .create(ProductDraft::new("Cam1", "d", Decimal::ZERO, "camera"))
            .await;

        assert!(matches!(
            result,
            Err(CatalogError::Validation(ValidationError::NonPositivePrice))
        ));
        assert_eq!(store.medium().get(STORAGE_KEY)?, None);

        Ok(())
    }

    #[tokio::test]
    async fn stored_price_matches_returned_price() -> TestResult {
        let store = LocalStore::new(MemoryMedium::new());

        let created = store
            .create(ProductDraft::new("Cam1", "d", price("0.123456789012345678901"), "camera"))
            .await?;
        let updated = store
            .update(&created.id, ProductPatch::default().price(price("1234.5678")))
            .await?;
        let listed = store.list().await?;

        assert_eq!(created.price, price("0.12"));
        assert_eq!(updated.price, price("1234.57"));
        assert_eq!(listed, vec![updated]);

        Ok(())
    }

    #[tokio::test]
    async fn create_rejects_oversized_price() -> TestResult {
        let store = LocalStore::new(MemoryMedium::new());

        let result = store
            .create(ProductDraft::new("Cam1", "d", price("50000000000000000000000000000"), "camera"))
            .await;

        assert!(matches!(
            result,
            Err(CatalogError::Validation(ValidationError::PriceTooLarge))
        ));
        assert!(store.list().await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn ids_are_unique() -> TestResult {
        let store = LocalStore::new(MemoryMedium::new());

        let a = store.create(cam()).await?;
        let b = store.create(cam()).await?;

        assert_ne!(a.id, b.id);

        Ok(())
    }

    #[tokio::test]
    async fn corrupt_collection_lists_as_empty() -> TestResult {
        let store = LocalStore::new(MemoryMedium::with_entry(STORAGE_KEY, "{not json"));

        assert!(store.list().await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn corrupt_collection_is_not_overwritten() -> TestResult {
        let store = LocalStore::new(MemoryMedium::with_entry(STORAGE_KEY, "{not json"));

        let result = store.create(cam()).await;

        assert!(matches!(result, Err(CatalogError::Unavailable(_))));
        assert_eq!(store.medium().get(STORAGE_KEY)?.as_deref(), Some("{not json"));

        Ok(())
    }

    #[tokio::test]
    async fn empty_patch_is_no_change() -> TestResult {
        let store = LocalStore::new(MemoryMedium::new());
        let created = store.create(cam()).await?;

        let result = store.update(&created.id, ProductPatch::default()).await;

        assert!(matches!(result, Err(CatalogError::NoChange)));
        assert_eq!(store.list().await?, vec![created]);

        Ok(())
    }

    #[tokio::test]
    async fn update_touches_only_patched_fields() -> TestResult {
        let store = LocalStore::new(MemoryMedium::new());
        let created = store.create(cam()).await?;

        let updated = store
            .update(&created.id, ProductPatch::default().price(price("200")))
            .await?;

        assert_eq!(updated.price, price("200"));
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.last_updated >= created.last_updated);
        assert_eq!(store.get(&created.id).await?, updated);

        Ok(())
    }

    #[tokio::test]
    async fn update_and_delete_unknown_id_are_not_found() -> TestResult {
        let store = LocalStore::new(MemoryMedium::new());
        let missing = ProductId::new("nope");

        let update = store
            .update(&missing, ProductPatch::default().title("x"))
            .await;
        let delete = store.delete(&missing).await;

        assert!(update.is_err_and(|e| e.is_not_found()));
        assert!(delete.is_err_and(|e| e.is_not_found()));

        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_from_medium() -> TestResult {
        let store = LocalStore::new(MemoryMedium::new());
        let keep = store.create(cam()).await?;
        let gone = store
            .create(ProductDraft::new("Phone1", "p", price("50"), "smartphone"))
            .await?;

        store.delete(&gone.id).await?;

        let ids: Vec<_> = store.list().await?.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![keep.id]);

        Ok(())
    }
}
