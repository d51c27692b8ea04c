use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::error::{CatalogError, Result};
use crate::models::{timestamp, Product, ProductDraft, ProductId, ProductPatch};
use crate::store::ProductStore;

/// Store backed by the products REST API.
///
/// One request per operation, no retries. The API calls the category field
/// `product_type`; it is mapped to and from [`Product::product_type`] here.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    base_url: String,
    http: Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn products_url(&self) -> String {
        format!("{}/api/products", self.base_url)
    }

    /// The id goes in as a single percent-encoded path segment.
    fn product_url(&self, id: &ProductId) -> Result<Url> {
        let mut url = Url::parse(&self.products_url()).map_err(|e| {
            CatalogError::Unavailable(format!("invalid base url {}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                CatalogError::Unavailable(format!("base url {} cannot take a path", self.base_url))
            })?
            .push(id.as_str());
        Ok(url)
    }

    /// Turns a write response into the stored product.
    ///
    /// Servers that only acknowledge a write with `{id, message}` (or send no
    /// body at all) get a follow-up read.
    async fn settle(&self, response: Response, fallback: Option<&ProductId>) -> Result<Product> {
        let body = response.bytes().await?;

        let id = if body.iter().all(u8::is_ascii_whitespace) {
            fallback
                .cloned()
                .ok_or_else(|| CatalogError::Unavailable("empty response to create".to_string()))?
        } else {
            let reply: WriteReply = serde_json::from_slice(&body)
                .map_err(|e| CatalogError::Unavailable(format!("unexpected response: {e}")))?;
            match reply {
                WriteReply::Product(wire) => return Ok(wire.into()),
                WriteReply::Ack { id } => id,
            }
        };

        self.get(&id).await
    }
}

#[async_trait]
impl ProductStore for RemoteStore {
    async fn list(&self) -> Result<Vec<Product>> {
        let response = self.http.get(self.products_url()).send().await?;
        if !response.status().is_success() {
            return Err(failure(response, None).await);
        }

        let products: Vec<WireProduct> = response.json().await?;
        debug!(count = products.len(), "listed remote products");

        Ok(products.into_iter().map(Product::from).collect())
    }

    async fn get(&self, id: &ProductId) -> Result<Product> {
        let response = self.http.get(self.product_url(id)?).send().await?;
        if !response.status().is_success() {
            return Err(failure(response, Some(id)).await);
        }

        let product: WireProduct = response.json().await?;
        Ok(product.into())
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product> {
        let draft = draft.validate()?;
        let body = WireDraft {
            title: &draft.title,
            description: &draft.description,
            price: draft.price,
            product_type: &draft.product_type,
        };

        let response = self
            .http
            .post(self.products_url())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(failure(response, None).await);
        }

        let product = self.settle(response, None).await?;
        debug!(id = %product.id, "created remote product");
        Ok(product)
    }

    async fn update(&self, id: &ProductId, patch: ProductPatch) -> Result<Product> {
        if patch.is_empty() {
            return Err(CatalogError::NoChange);
        }
        let patch = patch.validate()?;

        let body = WirePatch {
            title: patch.title.as_deref(),
            description: patch.description.as_deref(),
            price: patch.price,
            product_type: patch.product_type.as_deref(),
        };

        let response = self
            .http
            .put(self.product_url(id)?)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(failure(response, Some(id)).await);
        }

        let product = self.settle(response, Some(id)).await?;
        debug!(%id, "updated remote product");
        Ok(product)
    }

    async fn delete(&self, id: &ProductId) -> Result<()> {
        let response = self.http.delete(self.product_url(id)?).send().await?;
        if !response.status().is_success() {
            return Err(failure(response, Some(id)).await);
        }

        debug!(%id, "deleted remote product");
        Ok(())
    }
}

/// Maps an unsuccessful response onto the error taxonomy.
async fn failure(response: Response, id: Option<&ProductId>) -> CatalogError {
    let status = response.status();
    let url = response.url().to_string();

    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return CatalogError::NotFound(id.clone());
        }
    }

    let message = response.json::<ErrorBody>().await.ok().map(|body| body.error);
    error!(%status, %url, reason = message.as_deref().unwrap_or(""), "products api request failed");

    match message {
        Some(message) if status.is_client_error() => CatalogError::Rejected(message),
        _ => CatalogError::Unavailable(format!("{url} answered {status}")),
    }
}

#[derive(Debug, Deserialize)]
struct WireProduct {
    id: ProductId,
    title: String,
    description: String,
    price: Decimal,
    product_type: String,
    #[serde(default, deserialize_with = "timestamp::lenient")]
    created_at: Option<DateTime<Utc>>,
}

impl From<WireProduct> for Product {
    fn from(wire: WireProduct) -> Self {
        Self {
            id: wire.id,
            title: wire.title,
            description: wire.description,
            price: wire.price,
            product_type: wire.product_type,
            created_at: wire.created_at,
            last_updated: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WriteReply {
    Product(WireProduct),
    Ack { id: ProductId },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct WireDraft<'a> {
    title: &'a str,
    description: &'a str,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    price: Decimal,
    product_type: &'a str,
}

#[derive(Debug, Serialize)]
struct WirePatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_type: Option<&'a str>,
}
