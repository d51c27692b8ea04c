//! The catalog listing: in-memory products, search and sort state, totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::models::{escape_html, format_money, Product, ProductId};
use crate::store::ProductStore;

pub const REMOVE_PROMPT: &str = "Are you sure you want to remove this product?";
pub const EMPTY_MESSAGE: &str = "No products found.";

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Removal {
    Cancelled,
    Removed { total: Decimal },
}

/// Catalog view state for one session.
///
/// `products` is a cache of the store, replaced wholesale by [`Catalog::refresh`].
#[derive(Debug)]
pub struct Catalog<S> {
    store: S,
    products: Vec<Product>,
    search_term: String,
    sort_by_price: bool,
    loaded: bool,
}

impl<S: ProductStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            products: Vec::new(),
            search_term: String::new(),
            sort_by_price: false,
            loaded: false,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Reloads every product from the store.
    ///
    /// On failure the previously loaded products stay in place.
    pub async fn refresh(&mut self) -> Result<()> {
        self.products = self.store.list().await?;
        self.loaded = true;
        debug!(count = self.products.len(), "catalog refreshed");
        Ok(())
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn clear_search(&mut self) {
        self.search_term.clear();
    }

    pub fn sort_by_price(&self) -> bool {
        self.sort_by_price
    }

    pub fn set_sort_by_price(&mut self, enabled: bool) {
        self.sort_by_price = enabled;
    }

    /// Products to display for the given search term and sort toggle.
    pub fn render(&self, search_term: &str, sort_enabled: bool) -> Vec<&Product> {
        filter_and_sort(&self.products, search_term, sort_enabled)
    }

    /// [`Catalog::render`] with the controller's own search and sort state.
    pub fn visible(&self) -> Vec<&Product> {
        self.render(&self.search_term, self.sort_by_price)
    }

    /// Sum of all prices, regardless of search or sort.
    ///
    /// Saturates at [`Decimal::MAX`] when the collection holds prices too
    /// large to add up.
    pub fn total_value(&self) -> Decimal {
        self.products
            .iter()
            .try_fold(Decimal::ZERO, |total, p| total.checked_add(p.price))
            .unwrap_or_else(|| {
                warn!(count = self.products.len(), "product total overflowed");
                Decimal::MAX
            })
    }

    pub fn total_label(&self) -> String {
        format!("Total: {}", format_money(self.total_value()))
    }

    /// Markup for the visible products, or the empty-state block.
    pub fn render_html(&self, image_root: &str, now: DateTime<Utc>) -> String {
        let visible = self.visible();
        if visible.is_empty() {
            return format!(
                r#"<div class="col"><p class="text-muted">{}</p></div>"#,
                escape_html(EMPTY_MESSAGE)
            );
        }

        visible.iter().map(|p| p.to_html(image_root, now)).collect()
    }

    /// Deletes a loaded product after the user confirms.
    ///
    /// Ids missing from the loaded collection fail with `NotFound` before the
    /// user is asked or the store is touched.
    pub async fn remove_product(
        &mut self,
        id: &ProductId,
        confirm: &mut impl Confirm,
    ) -> Result<Removal> {
        self.find(id)?;
        if !confirm.confirm(REMOVE_PROMPT) {
            return Ok(Removal::Cancelled);
        }

        self.store.delete(id).await?;
        self.products.retain(|p| &p.id != id);
        info!(%id, "product removed");

        Ok(Removal::Removed {
            total: self.total_value(),
        })
    }

    /// Looks a product up in the loaded collection.
    pub fn find(&self, id: &ProductId) -> Result<&Product> {
        self.products
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }
}

/// Stable ascending price sort, then a case-insensitive match over title,
/// description and type.
pub fn filter_and_sort<'a>(
    products: &'a [Product],
    search_term: &str,
    sort_enabled: bool,
) -> Vec<&'a Product> {
    let mut filtered: Vec<&Product> = products.iter().collect();

    if sort_enabled {
        filtered.sort_by(|a, b| a.price.cmp(&b.price));
    }

    if !search_term.is_empty() {
        let needle = search_term.to_lowercase();
        filtered.retain(|p| p.matches(&needle));
    }

    filtered
}
