//! Storage seam for the category tree.
//!
//! `PgCategoryRepository` backs the running service; tests use the
//! in-memory implementation so service and handler logic runs without a
//! database.

#[cfg(test)]
pub mod memory;
mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::categories::dtos::{CategorySortBy, ProductSortBy};
use crate::features::categories::models::{
    Category, CategoryChanges, CategoryCounts, CategoryWithCounts, DeleteOutcome, NewCategory,
    Product,
};
use crate::shared::types::SortDirection;

pub use postgres::PgCategoryRepository;

/// Which part of the forest a listing covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentFilter {
    #[default]
    Any,
    TopLevel,
    Parent(Uuid),
}

#[derive(Debug, Clone, Default)]
pub struct CategoryListFilter {
    pub parent: ParentFilter,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub search: Option<String>,
    pub sort_by: CategorySortBy,
    pub sort: SortDirection,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ProductListFilter {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub is_featured: Option<bool>,
    pub sort_by: ProductSortBy,
    pub sort: SortDirection,
    pub limit: i64,
    pub offset: i64,
}

/// Persistence operations for categories and their product memberships
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    async fn find_with_counts(&self, id: Uuid) -> Result<Option<CategoryWithCounts>>;

    /// Whether another category (other than `exclude`) already uses `slug`
    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool>;

    async fn counts(&self, id: Uuid) -> Result<CategoryCounts>;

    /// One page of categories plus the total matching the filter
    async fn list(&self, filter: &CategoryListFilter) -> Result<(Vec<CategoryWithCounts>, i64)>;

    /// Direct children of `parent` (`None` = top level), ordered by display
    /// order then name
    async fn children(
        &self,
        parent: Option<Uuid>,
        include_inactive: bool,
    ) -> Result<Vec<CategoryWithCounts>>;

    /// Direct children of every id in `parents`, in one round trip
    async fn children_of_many(
        &self,
        parents: &[Uuid],
        include_inactive: bool,
    ) -> Result<Vec<CategoryWithCounts>>;

    async fn insert(&self, category: NewCategory) -> Result<Category>;

    /// Apply a partial update. When `changes` moves the category under a new
    /// parent, the parent chain is re-checked atomically with the write and
    /// a cycle is rejected. Returns `None` for an unknown id.
    async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>>;

    /// Hard delete, only when no products and no children reference the row
    async fn delete_if_empty(&self, id: Uuid) -> Result<DeleteOutcome>;

    /// Ids from `ids` that match no product
    async fn missing_products(&self, ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// Add memberships, keeping existing ones. Returns how many were created.
    async fn attach_products(&self, category_id: Uuid, product_ids: &[Uuid]) -> Result<u64>;

    /// Make the membership exactly `product_ids`. Returns (added, removed).
    async fn replace_products(&self, category_id: Uuid, product_ids: &[Uuid])
        -> Result<(u64, u64)>;

    /// Remove the listed memberships. Returns how many were removed.
    async fn detach_products(&self, category_id: Uuid, product_ids: &[Uuid]) -> Result<u64>;

    async fn list_products(
        &self,
        category_id: Uuid,
        filter: &ProductListFilter,
    ) -> Result<(Vec<Product>, i64)>;
}
