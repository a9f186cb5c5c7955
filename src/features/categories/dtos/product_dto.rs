use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::Product;
use crate::shared::types::{
    default_page, default_page_size, page_limit, page_offset, SortDirection,
};

/// Sort fields for products in a category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    #[default]
    Name,
    Price,
    CreatedAt,
}

impl ProductSortBy {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ProductSortBy::Name => "p.name",
            ProductSortBy::Price => "p.price",
            ProductSortBy::CreatedAt => "p.created_at",
        }
    }
}

/// Query params for listing the products of a category
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ProductQueryParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// Inclusive lower price bound
    #[param(value_type = Option<String>)]
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound
    #[param(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
    /// true = stock > 0, false = out of stock
    pub in_stock: Option<bool>,
    /// Filter by featured flag
    pub is_featured: Option<bool>,
    /// Sort field (default: name)
    #[serde(default)]
    pub sort_by: ProductSortBy,
    /// Sort direction (default: asc)
    #[serde(default)]
    pub sort: SortDirection,
}

impl ProductQueryParams {
    pub fn offset(&self) -> i64 {
        page_offset(self.page, self.page_size)
    }

    pub fn limit(&self) -> i64 {
        page_limit(self.page_size)
    }
}

impl Default for ProductQueryParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            min_price: None,
            max_price: None,
            in_stock: None,
            is_featured: None,
            sort_by: ProductSortBy::default(),
            sort: SortDirection::default(),
        }
    }
}

/// Product ids for attach and detach requests
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProductIdsDto {
    #[validate(length(min = 1, max = 500))]
    pub product_ids: Vec<Uuid>,
}

/// Full membership set for a replace request (may be empty)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReplaceProductsDto {
    #[validate(length(max = 500))]
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponseDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub stock: i32,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponseDto {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            slug: p.slug,
            price: p.price,
            stock: p.stock,
            is_featured: p.is_featured,
            created_at: p.created_at,
        }
    }
}

/// Outcome of a membership change
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MembershipResultDto {
    pub category_id: Uuid,
    /// Memberships created by this request
    pub added: u64,
    /// Memberships removed by this request
    pub removed: u64,
    /// Products in the category after the change
    pub product_count: i64,
}
