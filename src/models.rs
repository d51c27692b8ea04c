use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Root the default product images are served from in the local deployment.
pub const DEFAULT_IMAGE_ROOT: &str = "/img";

/// Largest price a product may carry (one trillion).
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Identifier assigned by whichever store persisted the product.
///
/// The local store generates strings, the API hands out integers; both are
/// kept in textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for ProductId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Self::from(n),
            RawId::Text(s) => Self(s),
        })
    }
}

/// Category a product type string falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    Camera,
    Laptop,
    Smartphone,
    Other,
}

impl ProductKind {
    pub fn classify(product_type: &str) -> Self {
        match product_type.trim().to_lowercase().as_str() {
            "camera" => Self::Camera,
            "laptop" => Self::Laptop,
            "smartphone" => Self::Smartphone,
            _ => Self::Other,
        }
    }

    pub fn image_file(self) -> &'static str {
        match self {
            Self::Camera => "cam.png",
            Self::Laptop => "laptop.png",
            Self::Smartphone => "smartphone.png",
            Self::Other => "default.png",
        }
    }
}

/// A catalog entry as stored.
///
/// Serializes to the record layout of the local medium (`type`,
/// `createdAt`, `lastUpdated`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(
        default,
        deserialize_with = "timestamp::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "timestamp::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Product {
    pub fn kind(&self) -> ProductKind {
        ProductKind::classify(&self.product_type)
    }

    /// Default image derived from the product type.
    pub fn image_url(&self) -> String {
        self.image_url_under(DEFAULT_IMAGE_ROOT)
    }

    pub fn image_url_under(&self, image_root: &str) -> String {
        format!(
            "{}/{}",
            image_root.trim_end_matches('/'),
            self.kind().image_file()
        )
    }

    pub fn formatted_price(&self) -> String {
        format_money(self.price)
    }

    /// Case-insensitive match over title, description and type.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.product_type.to_lowercase().contains(needle)
    }

    /// Human readable age of the last update, if one was recorded.
    pub fn time_since_update(&self, now: DateTime<Utc>) -> Option<String> {
        self.last_updated.map(|at| time_since(at, now))
    }

    /// Product card markup.
    pub fn to_html(&self, image_root: &str, now: DateTime<Utc>) -> String {
        let meta = match self.time_since_update(now) {
            Some(ago) => format!("Last updated: {ago}"),
            None => format!("Type: {}", escape_html(&self.product_type)),
        };
        let id = escape_html(self.id.as_str());
        let title = escape_html(&self.title);

        format!(
            r#"<div class="product-card" data-id="{id}" data-price="{price}">
    <div class="product-image">
        <img src="{image}" alt="{title}">
    </div>
    <div class="product-info">
        <h3>{title}</h3>
        <p>{description}</p>
        <div class="product-price">{formatted}</div>
        <div class="product-meta">
            <span>{meta}</span>
        </div>
        <div class="product-actions">
            <button class="edit-btn" data-id="{id}">Edit</button>
            <button class="remove-btn" data-id="{id}">Remove</button>
        </div>
    </div>
</div>
"#,
            price = self.price,
            image = escape_html(&self.image_url_under(image_root)),
            description = escape_html(&self.description),
            formatted = self.formatted_price(),
        )
    }

    pub(crate) fn apply(&mut self, patch: &ProductPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(product_type) = &patch.product_type {
            self.product_type.clone_from(product_type);
        }
    }
}

/// Fields of a product that is about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub product_type: String,
}

impl ProductDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        price: Decimal,
        product_type: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            price,
            product_type: product_type.into(),
        }
    }

    /// Trims the text fields, rounds the price to cents and checks the
    /// required-field and price rules.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let draft = Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            price: self.price,
            product_type: self.product_type.trim().to_string(),
        };

        if draft.title.is_empty() || draft.description.is_empty() || draft.product_type.is_empty()
        {
            return Err(ValidationError::MissingFields);
        }

        Ok(Self {
            price: validate_price(draft.price)?,
            ..draft
        })
    }
}

/// Sparse update: only the fields that are set get written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub product_type: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.product_type.is_none()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }

    /// Present fields follow the same rules as a draft; a present price comes
    /// back rounded to cents.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());

        if blank(&self.title) || blank(&self.description) || blank(&self.product_type) {
            return Err(ValidationError::MissingFields);
        }
        let price = self.price.map(validate_price).transpose()?;

        Ok(Self { price, ..self })
    }
}

/// Rounds to cents so the stored value survives the float encoding used on
/// disk and on the wire.
fn validate_price(price: Decimal) -> Result<Decimal, ValidationError> {
    let price = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if price <= Decimal::ZERO {
        return Err(ValidationError::NonPositivePrice);
    }
    if price > MAX_PRICE {
        return Err(ValidationError::PriceTooLarge);
    }
    Ok(price)
}

pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

fn time_since(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - at).num_hours();

    if hours < 1 {
        "Just now".to_string()
    } else if hours < 24 {
        format!("{hours} hour{} ago", plural(hours))
    } else {
        let days = hours / 24;
        format!("{days} day{} ago", plural(days))
    }
}

fn plural(n: i64) -> &'static str {
    if n > 1 { "s" } else { "" }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Timestamp parsing that tolerates what both backends produce.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, ParseError, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_rfc2822(raw))
            .map(|at| at.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|naive| Utc.from_utc_datetime(&naive))
            })
    }

    pub fn lenient<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse(&raw).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn d(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn product(product_type: &str) -> Product {
        Product {
            id: ProductId::new("1"),
            title: "Cam1".to_string(),
            description: "d".to_string(),
            price: d("100"),
            product_type: product_type.to_string(),
            created_at: None,
            last_updated: None,
        }
    }

    #[test]
    fn image_follows_type_case_insensitively() {
        assert_eq!(product("camera").image_url(), "/img/cam.png");
        assert_eq!(product(" Laptop ").image_url(), "/img/laptop.png");
        assert_eq!(product("SMARTPHONE").image_url(), "/img/smartphone.png");
        assert_eq!(product("toaster").image_url(), "/img/default.png");
        assert_eq!(
            product("camera").image_url_under("/static/img/"),
            "/static/img/cam.png"
        );
    }

    #[test]
    fn draft_validation_trims_and_rejects() {
        let ok = ProductDraft::new("  Cam1 ", "d", d("1"), "camera").validate();
        assert_eq!(ok.map(|d| d.title), Ok("Cam1".to_string()));

        let blank = ProductDraft::new("   ", "d", d("1"), "camera").validate();
        assert_eq!(blank, Err(ValidationError::MissingFields));

        let free = ProductDraft::new("Cam1", "d", Decimal::ZERO, "camera").validate();
        assert_eq!(free, Err(ValidationError::NonPositivePrice));

        let negative = ProductDraft::new("Cam1", "d", d("-3.5"), "camera").validate();
        assert_eq!(negative, Err(ValidationError::NonPositivePrice));
    }

    #[test]
    fn prices_are_rounded_to_cents_and_bounded() {
        let rounded = ProductDraft::new("Cam1", "d", d("19.995"), "camera").validate();
        assert_eq!(rounded.map(|d| d.price), Ok(d("20.00")));

        let tiny = ProductDraft::new("Cam1", "d", d("0.004"), "camera").validate();
        assert_eq!(tiny, Err(ValidationError::NonPositivePrice));

        let ceiling = ProductDraft::new("Cam1", "d", MAX_PRICE, "camera").validate();
        assert_eq!(ceiling.map(|d| d.price), Ok(d("1000000000000")));

        let huge = ProductDraft::new("Cam1", "d", d("50000000000000000000000000000"), "camera");
        assert_eq!(huge.validate(), Err(ValidationError::PriceTooLarge));

        let patch = ProductPatch::default().price(d("0.123456789012345678901"));
        assert_eq!(patch.validate().map(|p| p.price), Ok(Some(d("0.12"))));
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut p = product("camera");
        let patch = ProductPatch::default().price(d("200")).validate().unwrap();
        p.apply(&patch);

        assert_eq!(p.price, d("200"));
        assert_eq!(p.title, "Cam1");
        assert_eq!(p.product_type, "camera");
    }

    #[test]
    fn patch_rejects_blank_field() {
        let patch = ProductPatch::default().title(" ");

        assert_eq!(patch.validate(), Err(ValidationError::MissingFields));
        assert!(ProductPatch::default().is_empty());
    }

    #[test]
    fn time_since_update_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let mut p = product("camera");

        assert_eq!(p.time_since_update(now), None);

        p.last_updated = Some(now - Duration::minutes(30));
        assert_eq!(p.time_since_update(now).as_deref(), Some("Just now"));

        p.last_updated = Some(now - Duration::hours(1));
        assert_eq!(p.time_since_update(now).as_deref(), Some("1 hour ago"));

        p.last_updated = Some(now - Duration::hours(5));
        assert_eq!(p.time_since_update(now).as_deref(), Some("5 hours ago"));

        p.last_updated = Some(now - Duration::hours(49));
        assert_eq!(p.time_since_update(now).as_deref(), Some("2 days ago"));
    }

    #[test]
    fn html_card_escapes_user_text() {
        let now = Utc::now();
        let mut p = product("camera");
        p.title = "<b>Cam & co</b>".to_string();

        let html = p.to_html(DEFAULT_IMAGE_ROOT, now);

        assert!(html.contains("&lt;b&gt;Cam &amp; co&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("$100.00"));
        assert!(html.contains("Type: camera"));
        assert!(html.contains(r#"src="/img/cam.png""#));
    }

    #[test]
    fn reads_records_written_by_the_browser() {
        let raw = r#"{
            "title": "Cam1",
            "description": "d",
            "price": 100,
            "type": "camera",
            "id": "17000000000000.4fzyo82mvyr",
            "createdAt": "2024-01-01T12:00:00.000Z"
        }"#;

        let p: Product = serde_json::from_str(raw).unwrap();

        assert_eq!(p.id.as_str(), "17000000000000.4fzyo82mvyr");
        assert_eq!(p.price, d("100"));
        assert!(p.created_at.is_some());
        assert!(p.last_updated.is_none());
    }

    #[test]
    fn accepts_numeric_ids_and_naive_timestamps() {
        let id: ProductId = serde_json::from_str("42").unwrap();
        assert_eq!(id, ProductId::from(42));

        let at = timestamp::parse("2024-03-01T08:15:00").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap());
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(format_money(d("150")), "$150.00");
        assert_eq!(format_money(d("19.999")), "$20.00");
    }
}
