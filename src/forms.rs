//! Create and edit form controllers.
//!
//! Both validate raw text input, talk to a [`ProductStore`], and either hand
//! back the page to navigate to or keep a transient notice for the user.

use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tracing::{info, warn};
use url::form_urlencoded;

use crate::error::{CatalogError, Result, ValidationError};
use crate::models::{Product, ProductDraft, ProductId, ProductPatch};
use crate::store::ProductStore;

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);
pub const MISSING_ID_MESSAGE: &str = "No product ID specified. Cannot edit.";

/// Where the front end goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Catalog,
    Create,
    Edit(ProductId),
}

impl Page {
    pub fn href(&self) -> String {
        match self {
            Self::Catalog => "/".to_string(),
            Self::Create => "/create".to_string(),
            Self::Edit(id) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("id", id.as_str())
                    .finish();
                format!("/edit?{query}")
            }
        }
    }

    /// The percent-decoded `id` parameter of an edit page query string.
    pub fn edit_target(query: &str) -> Option<ProductId> {
        form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .find(|(key, _)| key == "id")
            .map(|(_, id)| id.into_owned())
            .filter(|id| !id.is_empty())
            .map(ProductId::new)
    }
}

/// A message that disappears on its own after a while.
#[derive(Debug)]
pub struct Notice {
    ttl: Duration,
    current: Option<(String, Instant)>,
}

impl Notice {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn show(&mut self, message: impl Into<String>) {
        self.current = Some((message.into(), Instant::now() + self.ttl));
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn message(&self) -> Option<&str> {
        self.message_at(Instant::now())
    }

    pub fn message_at(&self, now: Instant) -> Option<&str> {
        match &self.current {
            Some((message, expires_at)) if now < *expires_at => Some(message),
            _ => None,
        }
    }
}

impl Default for Notice {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

/// Raw form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub title: String,
    pub description: String,
    pub price: String,
    pub product_type: String,
}

impl ProductForm {
    pub fn prefilled(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            product_type: product.product_type.clone(),
        }
    }

    pub fn to_draft(&self) -> std::result::Result<ProductDraft, ValidationError> {
        let price = self.price.trim();
        if price.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        let price = price
            .parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(price))
            .map_err(|_| ValidationError::InvalidPrice)?;

        ProductDraft::new(
            self.title.as_str(),
            self.description.as_str(),
            price,
            self.product_type.as_str(),
        )
        .validate()
    }
}

/// A successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    pub product: Product,
    pub next: Page,
}

#[derive(Debug, Default)]
pub struct CreateController {
    notice: Notice,
}

impl CreateController {
    pub fn new(notice_ttl: Duration) -> Self {
        Self {
            notice: Notice::new(notice_ttl),
        }
    }

    pub fn notice(&self) -> &Notice {
        &self.notice
    }

    pub async fn submit<S>(&mut self, store: &S, form: &ProductForm) -> Result<Submitted>
    where
        S: ProductStore + ?Sized,
    {
        let result = match form.to_draft() {
            Ok(draft) => store.create(draft).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(product) => {
                self.notice.clear();
                info!(id = %product.id, "product created");
                Ok(Submitted {
                    product,
                    next: Page::Catalog,
                })
            }
            Err(e) => {
                warn!(error = %e, "create rejected");
                self.notice.show(e.user_message());
                Err(e)
            }
        }
    }
}

/// Edits one product, sending only the fields that changed.
#[derive(Debug)]
pub struct EditController {
    original: Product,
    notice: Notice,
}

impl EditController {
    /// Fetches the product to edit from the store.
    pub async fn load<S>(store: &S, id: &ProductId, notice_ttl: Duration) -> Result<Self>
    where
        S: ProductStore + ?Sized,
    {
        let original = store.get(id).await?;
        Ok(Self::editing(original, notice_ttl))
    }

    /// Picks the product to edit out of an already loaded collection.
    pub fn from_loaded(products: &[Product], id: &ProductId, notice_ttl: Duration) -> Result<Self> {
        products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .map(|original| Self::editing(original, notice_ttl))
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    fn editing(original: Product, notice_ttl: Duration) -> Self {
        Self {
            original,
            notice: Notice::new(notice_ttl),
        }
    }

    pub fn id(&self) -> &ProductId {
        &self.original.id
    }

    pub fn original(&self) -> &Product {
        &self.original
    }

    pub fn notice(&self) -> &Notice {
        &self.notice
    }

    /// The form as first shown to the user.
    pub fn form(&self) -> ProductForm {
        ProductForm::prefilled(&self.original)
    }

    /// Field-by-field difference between the form and the loaded product.
    pub fn diff(&self, form: &ProductForm) -> std::result::Result<ProductPatch, ValidationError> {
        let draft = form.to_draft()?;
        let original = &self.original;
        let mut patch = ProductPatch::default();

        if draft.title != original.title {
            patch.title = Some(draft.title);
        }
        if draft.description != original.description {
            patch.description = Some(draft.description);
        }
        if draft.price != original.price {
            patch.price = Some(draft.price);
        }
        if draft.product_type != original.product_type {
            patch.product_type = Some(draft.product_type);
        }

        Ok(patch)
    }

    pub async fn submit<S>(&mut self, store: &S, form: &ProductForm) -> Result<Submitted>
    where
        S: ProductStore + ?Sized,
    {
        let result = match self.diff(form) {
            Ok(patch) if patch.is_empty() => Err(CatalogError::NoChange),
            Ok(patch) => store.update(self.id(), patch).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(product) => {
                self.notice.clear();
                self.original = product.clone();
                info!(id = %product.id, "product updated");
                Ok(Submitted {
                    product,
                    next: Page::Catalog,
                })
            }
            Err(e) => {
                warn!(id = %self.original.id, error = %e, "edit rejected");
                self.notice.show(e.user_message());
                Err(e)
            }
        }
    }
}
