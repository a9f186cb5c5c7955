use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::{Category, CategoryWithCounts};
use crate::shared::types::{
    default_page, default_page_size, double_option, page_limit, page_offset, SortDirection,
};

// =============================================================================
// QUERY PARAMS
// =============================================================================

/// Sort fields for categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CategorySortBy {
    Name,
    #[default]
    Order,
    CreatedAt,
}

impl CategorySortBy {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CategorySortBy::Name => "c.name",
            CategorySortBy::Order => "c.display_order",
            CategorySortBy::CreatedAt => "c.created_at",
        }
    }
}

/// Query params for listing categories
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CategoryQueryParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// Only children of this category
    pub parent_id: Option<Uuid>,
    /// Only top-level categories (cannot be combined with parent_id)
    #[serde(default)]
    pub top_level: bool,
    /// Filter by active flag (omit for both)
    pub is_active: Option<bool>,
    /// Filter by featured flag
    pub is_featured: Option<bool>,
    /// Case-insensitive search in name or slug
    pub search: Option<String>,
    /// Sort field (default: order)
    #[serde(default)]
    pub sort_by: CategorySortBy,
    /// Sort direction (default: asc)
    #[serde(default)]
    pub sort: SortDirection,
}

impl CategoryQueryParams {
    pub fn offset(&self) -> i64 {
        page_offset(self.page, self.page_size)
    }

    pub fn limit(&self) -> i64 {
        page_limit(self.page_size)
    }
}

impl Default for CategoryQueryParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            parent_id: None,
            top_level: false,
            is_active: None,
            is_featured: None,
            search: None,
            sort_by: CategorySortBy::default(),
            sort: SortDirection::default(),
        }
    }
}

/// Query params for fetching a single category
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CategoryDetailQuery {
    /// Include a summary of the parent category
    #[serde(default)]
    pub include_parent: bool,
    /// Include the direct children
    #[serde(default)]
    pub include_children: bool,
    /// Include product and child counts
    #[serde(default)]
    pub include_counts: bool,
    /// Also list inactive children
    #[serde(default)]
    pub include_inactive: bool,
}

/// Query params for children and tree endpoints
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct HierarchyQuery {
    /// Root of the tree (omit for the whole forest)
    pub parent_id: Option<Uuid>,
    /// Also return inactive categories
    #[serde(default)]
    pub include_inactive: bool,
}

// =============================================================================
// REQUEST DTOs
// =============================================================================

/// Create category request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub parent_id: Option<Uuid>,

    #[validate(url)]
    pub image: Option<String>,

    pub is_active: Option<bool>,

    pub is_featured: Option<bool>,

    /// Display order among siblings
    pub order: Option<i32>,

    /// Arbitrary JSON object
    pub metadata: Option<serde_json::Value>,
}

/// Update category request (partial)
///
/// `parent_id: null` moves the category to the top level; omitting it keeps
/// the current parent.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image: Option<Option<String>>,

    pub is_active: Option<bool>,

    pub is_featured: Option<bool>,

    pub order: Option<i32>,

    pub metadata: Option<serde_json::Value>,
}

// =============================================================================
// RESPONSE DTOs
// =============================================================================

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub order: i32,
    pub metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            parent_id: c.parent_id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            image: c.image,
            is_active: c.is_active,
            is_featured: c.is_featured,
            order: c.display_order,
            metadata: c.metadata,
            product_count: None,
            child_count: None,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<CategoryWithCounts> for CategoryResponseDto {
    fn from(c: CategoryWithCounts) -> Self {
        Self {
            product_count: Some(c.product_count),
            child_count: Some(c.child_count),
            ..c.category.into()
        }
    }
}

/// Minimal category reference used for parents and breadcrumbs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryRefDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<&Category> for CategoryRefDto {
    fn from(c: &Category) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
        }
    }
}

/// Category with optional parent and children
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryDetailDto {
    #[serde(flatten)]
    pub category: CategoryResponseDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<CategoryRefDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<CategoryResponseDto>>,
}

/// Response DTO for category tree (hierarchical structure)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(no_recursion)]
pub struct CategoryTreeDto {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub order: i32,
    pub product_count: i64,
    /// Number of direct children in the store, even when they are not
    /// expanded. Inactive children are counted when `include_inactive` is
    /// false, so this can exceed `children.len()`; it is the same count that
    /// blocks a delete.
    pub child_count: i64,
    pub children: Vec<CategoryTreeDto>,
}

impl From<CategoryWithCounts> for CategoryTreeDto {
    fn from(c: CategoryWithCounts) -> Self {
        let CategoryWithCounts {
            category,
            product_count,
            child_count,
        } = c;

        Self {
            id: category.id,
            parent_id: category.parent_id,
            name: category.name,
            slug: category.slug,
            image: category.image,
            is_active: category.is_active,
            is_featured: category.is_featured,
            order: category.display_order,
            product_count,
            child_count,
            children: Vec::new(),
        }
    }
}
