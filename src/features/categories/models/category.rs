use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for category
#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub display_order: i32,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category row joined with its membership and child counts
#[derive(Debug, Clone, FromRow)]
pub struct CategoryWithCounts {
    #[sqlx(flatten)]
    pub category: Category,
    pub product_count: i64,
    pub child_count: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct CategoryCounts {
    pub product_count: i64,
    pub child_count: i64,
}

/// Fields for a new category row; the slug is already derived and checked
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub display_order: i32,
    pub metadata: serde_json::Value,
}

/// Partial update. `None` leaves a column untouched; the nested `Option`
/// of nullable columns distinguishes "set to NULL" from "unchanged".
#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub display_order: Option<i32>,
    pub metadata: Option<serde_json::Value>,
}

impl CategoryChanges {
    /// New parent id when this update moves the category under another one
    pub fn new_parent(&self) -> Option<Uuid> {
        self.parent_id.flatten()
    }
}

/// Result of a guarded hard delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    HasProducts(i64),
    HasChildren(i64),
}

impl DeleteOutcome {
    /// Why a category with `counts` must be kept, or `None` when nothing
    /// references it. Products are reported before children.
    pub fn refusal(counts: &CategoryCounts) -> Option<Self> {
        if counts.product_count > 0 {
            Some(DeleteOutcome::HasProducts(counts.product_count))
        } else if counts.child_count > 0 {
            Some(DeleteOutcome::HasChildren(counts.child_count))
        } else {
            None
        }
    }
}
