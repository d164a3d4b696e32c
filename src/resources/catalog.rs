//! Product catalog: list and detail reads

use super::Storefront;
use crate::client::{QueryRequest, QuerySpec};
use crate::error::ApiResult;
use crate::key::{FilterSet, ResourceKey};
use serde::{Deserialize, Serialize};

pub const DOMAIN: &str = "products";

pub fn root_key() -> ResourceKey {
    ResourceKey::new(DOMAIN)
}

pub fn list_key() -> ResourceKey {
    root_key().child("list")
}

pub fn filtered_key(filters: &ProductFilters) -> ResourceKey {
    list_key().child(filters.to_filter_set().canonical())
}

pub fn detail_key(slug: &str) -> ResourceKey {
    root_key().child("detail").child(slug)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Cookie,
    Snack,
    Cake,
    Sweet,
    Hamper,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cookie => "COOKIE",
            Self::Snack => "SNACK",
            Self::Cake => "CAKE",
            Self::Sweet => "SWEET",
            Self::Hamper => "HAMPER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub price: u64,
    pub currency: String,
    pub category: Category,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_grams: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    Name,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Name => "name",
        }
    }
}

/// Catalog query parameters. Unset fields are omitted from both the cache
/// key and the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilters {
    pub category: Option<Category>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort: Option<SortOrder>,
}

impl ProductFilters {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.tag.is_none()
            && self.search.is_none()
            && self.sort.is_none()
    }

    pub fn to_filter_set(&self) -> FilterSet {
        FilterSet::new()
            .set_opt("category", self.category.map(|c| c.as_str()))
            .set_opt("search", self.search.clone())
            .set_opt("sort", self.sort.map(|s| s.as_str()))
            .set_opt("tag", self.tag.clone())
    }
}

impl Storefront {
    /// Full catalog listing.
    pub async fn products(&self) -> ApiResult<Vec<Product>> {
        let config = self.client().config();
        self.client()
            .query(
                QuerySpec::new(list_key(), config.catalog_staleness).retry(config.retry_limit),
                QueryRequest::new("/products/"),
            )
            .await
    }

    /// Catalog listing restricted by filters. An empty filter set shares
    /// the cache entry of [`products`](Self::products).
    pub async fn products_filtered(&self, filters: &ProductFilters) -> ApiResult<Vec<Product>> {
        if filters.is_empty() {
            return self.products().await;
        }
        let config = self.client().config();
        self.client()
            .query(
                QuerySpec::new(filtered_key(filters), config.catalog_staleness)
                    .retry(config.retry_limit),
                QueryRequest::new("/products/").with_query(filters.to_filter_set().pairs()),
            )
            .await
    }

    /// Single product by slug. Disabled (no call issued) for an empty slug.
    pub async fn product(&self, slug: &str) -> ApiResult<Option<Product>> {
        if slug.is_empty() {
            return Ok(None);
        }
        let config = self.client().config();
        self.client()
            .query::<Product>(
                QuerySpec::new(detail_key(slug), config.catalog_staleness)
                    .retry(config.retry_limit),
                QueryRequest::new(format!("/products/{slug}/")),
            )
            .await
            .map(Some)
    }
}
