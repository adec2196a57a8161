//! Products, the visibility rule, and listing queries.
//!
//! Listing is deliberately simple: every query is a linear pass over the
//! product list held in memory.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, UserId};

/// Ids reserved for the bundled static catalog.
static STATIC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^static-[0-9]+$").expect("static product id pattern is valid"));

/// Returns true if the id belongs to the bundled static catalog.
#[must_use]
pub fn is_static_id(id: &ProductId) -> bool {
    STATIC_ID.is_match(id.as_str())
}

/// A product document, as stored in the product backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Primary image URL.
    #[serde(default)]
    pub image: String,
    /// Additional image URLs shown on the detail page.
    #[serde(default)]
    pub images: Vec<String>,
    /// Seller who listed the product. Static products have no owner.
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_denied: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Build a new product owned by `owner` from validated form input.
    #[must_use]
    pub fn from_draft(draft: ProductDraft, owner: UserId, approved: bool) -> Self {
        Self {
            id: ProductId::generate(),
            name: draft.name,
            price: draft.price,
            description: draft.description,
            category: draft.category,
            image: draft.image,
            images: draft.images,
            user_id: Some(owner),
            is_approved: approved,
            is_denied: false,
            created_at: Utc::now(),
        }
    }

    /// Overwrite the editable fields with a draft. Ownership, moderation flags
    /// and the creation time are untouched.
    pub fn apply_draft(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.price = draft.price;
        self.description = draft.description;
        self.category = draft.category;
        self.image = draft.image;
        self.images = draft.images;
    }

    /// The primary image followed by the extra images, without duplicates or blanks.
    #[must_use]
    pub fn image_set(&self) -> Vec<&str> {
        let mut set: Vec<&str> = Vec::with_capacity(self.images.len() + 1);
        for url in std::iter::once(&self.image).chain(&self.images) {
            let url = url.trim();
            if !url.is_empty() && !set.contains(&url) {
                set.push(url);
            }
        }
        set
    }

    /// Whether `user` owns this product.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.user_id.as_ref() == Some(user)
    }

    /// Mark as approved by an admin.
    pub const fn approve(&mut self) {
        self.is_approved = true;
        self.is_denied = false;
    }

    /// Mark as rejected by an admin.
    pub const fn reject(&mut self) {
        self.is_approved = false;
        self.is_denied = true;
    }
}

/// Visibility rule for a product, evaluated for every render.
///
/// A product is visible when its id is a static catalog id, when it has been
/// approved, or when the viewer is its owner.
#[must_use]
pub fn is_visible(product: &Product, viewer: Option<&UserId>) -> bool {
    is_static_id(&product.id)
        || product.is_approved
        || viewer.is_some_and(|viewer| product.is_owned_by(viewer))
}

/// Validated seller input for creating or editing a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub category: String,
    pub image: String,
    pub images: Vec<String>,
}

/// Highest price a seller may list.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Errors from [`ProductDraft::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("Product name is required")]
    MissingName,
    #[error("Category is required")]
    MissingCategory,
    #[error("Price must be a number from 0 to 1000000000")]
    InvalidPrice,
}

impl ProductDraft {
    /// Parse raw form fields. `images` is a newline or comma separated list.
    ///
    /// # Errors
    ///
    /// Returns a [`DraftError`] for a blank name or category, or a price that
    /// is not a non-negative decimal.
    pub fn parse(
        name: &str,
        price: &str,
        description: &str,
        category: &str,
        image: &str,
        images: &str,
    ) -> Result<Self, DraftError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }
        let category = category.trim();
        if category.is_empty() {
            return Err(DraftError::MissingCategory);
        }
        let price: Decimal = price
            .trim()
            .parse()
            .map_err(|_| DraftError::InvalidPrice)?;
        if price.is_sign_negative() || price > MAX_PRICE {
            return Err(DraftError::InvalidPrice);
        }

        Ok(Self {
            name: name.to_owned(),
            price,
            description: description.trim().to_owned(),
            category: category.to_owned(),
            image: image.trim().to_owned(),
            images: images
                .split([',', '\n'])
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_owned)
                .collect(),
        })
    }
}

/// Sort orders offered on listing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl SortOrder {
    /// Every sort order with its query value and label.
    pub const OPTIONS: [(Self, &'static str, &'static str); 4] = [
        (Self::Newest, "newest", "Newest"),
        (Self::PriceAsc, "price_asc", "Price: low to high"),
        (Self::PriceDesc, "price_desc", "Price: high to low"),
        (Self::Name, "name", "Name"),
    ];

    /// Parse a query-string value, falling back to `Newest`.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        value
            .and_then(|value| {
                Self::OPTIONS
                    .iter()
                    .find(|(_, key, _)| *key == value)
                    .map(|(order, _, _)| *order)
            })
            .unwrap_or_default()
    }

    /// Query-string value.
    #[must_use]
    pub fn as_query(self) -> &'static str {
        Self::OPTIONS
            .iter()
            .find(|(order, _, _)| *order == self)
            .map_or("newest", |(_, key, _)| key)
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        let primary = match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Filters and ordering for a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: SortOrder,
}

impl ListingQuery {
    /// Whether a single product passes every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && !product.category.eq_ignore_ascii_case(category.trim())
        {
            return false;
        }
        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            let needle = search.to_lowercase();
            let hit = product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle)
                || product.category.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }

    /// Filter and sort a list of products.
    #[must_use]
    pub fn apply<'a>(&self, products: impl IntoIterator<Item = &'a Product>) -> Vec<&'a Product> {
        let mut listed: Vec<&Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        listed.sort_by(|a, b| self.sort.compare(a, b));
        listed
    }
}

/// Distinct categories with product counts, sorted case-insensitively.
///
/// Categories that differ only by case are merged under the first spelling seen.
#[must_use]
pub fn categories<'a>(products: impl IntoIterator<Item = &'a Product>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for product in products {
        let name = product.category.trim();
        if name.is_empty() {
            continue;
        }
        counts
            .entry(name.to_lowercase())
            .or_insert_with(|| (name.to_owned(), 0))
            .1 += 1;
    }
    counts.into_values().collect()
}
