use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CategoryListFilter, CategoryRepository, ParentFilter, ProductListFilter};
use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{CategorySortBy, ProductSortBy};
use crate::features::categories::models::{
    Category, CategoryChanges, CategoryCounts, CategoryWithCounts, DeleteOutcome, NewCategory,
    Product,
};
use crate::features::categories::services::hierarchy::{check_reparent, ParentLookup};
use crate::shared::types::SortDirection;

#[derive(Default)]
struct State {
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
    /// (category_id, product_id)
    memberships: BTreeSet<(Uuid, Uuid)>,
}

impl State {
    fn counts(&self, id: Uuid) -> CategoryCounts {
        CategoryCounts {
            product_count: self.memberships.iter().filter(|(c, _)| *c == id).count() as i64,
            child_count: self
                .categories
                .values()
                .filter(|c| c.parent_id == Some(id))
                .count() as i64,
        }
    }

    fn with_counts(&self, category: &Category) -> CategoryWithCounts {
        let counts = self.counts(category.id);
        CategoryWithCounts {
            category: category.clone(),
            product_count: counts.product_count,
            child_count: counts.child_count,
        }
    }

    fn sorted_children<F>(&self, include_inactive: bool, matches: F) -> Vec<CategoryWithCounts>
    where
        F: Fn(&Category) -> bool,
    {
        let mut rows: Vec<&Category> = self
            .categories
            .values()
            .filter(|&c| matches(c) && (include_inactive || c.is_active))
            .collect();
        rows.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        rows.into_iter().map(|c| self.with_counts(c)).collect()
    }
}

#[async_trait]
impl ParentLookup for HashMap<Uuid, Category> {
    async fn parent_of(&mut self, id: Uuid) -> Result<Option<Option<Uuid>>> {
        Ok(self.get(&id).map(|c| c.parent_id))
    }
}

/// In-memory repository for service and handler tests
#[derive(Default)]
pub struct InMemoryCategoryRepository {
    state: RwLock<State>,
}

impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> Product {
        let product = Product {
            id: Uuid::now_v7(),
            name: name.to_string(),
            slug: crate::shared::validation::slugify(name),
            price,
            stock,
            is_featured: false,
            is_active: true,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        product
    }

    /// Insert a row as-is, bypassing every check; used to build corrupt trees
    pub async fn seed_category(&self, category: Category) {
        self.state
            .write()
            .await
            .categories
            .insert(category.id, category);
    }
}

fn cmp_direction(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn find_with_counts(&self, id: Uuid) -> Result<Option<CategoryWithCounts>> {
        let state = self.state.read().await;
        Ok(state.categories.get(&id).map(|c| state.with_counts(c)))
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .values()
            .any(|c| c.slug == slug && Some(c.id) != exclude))
    }

    async fn counts(&self, id: Uuid) -> Result<CategoryCounts> {
        Ok(self.state.read().await.counts(id))
    }

    async fn list(&self, filter: &CategoryListFilter) -> Result<(Vec<CategoryWithCounts>, i64)> {
        let state = self.state.read().await;
        let needle = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut rows: Vec<&Category> = state
            .categories
            .values()
            .filter(|c| match filter.parent {
                ParentFilter::Any => true,
                ParentFilter::TopLevel => c.parent_id.is_none(),
                ParentFilter::Parent(id) => c.parent_id == Some(id),
            })
            .filter(|c| filter.is_active.is_none_or(|v| c.is_active == v))
            .filter(|c| filter.is_featured.is_none_or(|v| c.is_featured == v))
            .filter(|c| {
                needle.as_deref().is_none_or(|n| {
                    c.name.to_lowercase().contains(n) || c.slug.to_lowercase().contains(n)
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            let primary = match filter.sort_by {
                CategorySortBy::Name => a.name.cmp(&b.name),
                CategorySortBy::Order => a.display_order.cmp(&b.display_order),
                CategorySortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            cmp_direction(primary, filter.sort)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(|c| state.with_counts(c))
            .collect();

        Ok((page, total))
    }

    async fn children(
        &self,
        parent: Option<Uuid>,
        include_inactive: bool,
    ) -> Result<Vec<CategoryWithCounts>> {
        let state = self.state.read().await;
        Ok(state.sorted_children(include_inactive, |c| c.parent_id == parent))
    }

    async fn children_of_many(
        &self,
        parents: &[Uuid],
        include_inactive: bool,
    ) -> Result<Vec<CategoryWithCounts>> {
        let state = self.state.read().await;
        Ok(state.sorted_children(include_inactive, |c| {
            c.parent_id.is_some_and(|p| parents.contains(&p))
        }))
    }

    async fn insert(&self, new: NewCategory) -> Result<Category> {
        let mut state = self.state.write().await;
        if state.categories.values().any(|c| c.slug == new.slug) {
            return Err(AppError::Conflict(
                "A category with this slug already exists".to_string(),
            ));
        }
        if let Some(parent_id) = new.parent_id {
            if !state.categories.contains_key(&parent_id) {
                return Err(AppError::BadRequest(
                    "Referenced record does not exist".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let category = Category {
            id: Uuid::now_v7(),
            parent_id: new.parent_id,
            name: new.name,
            slug: new.slug,
            description: new.description,
            image: new.image,
            is_active: new.is_active,
            is_featured: new.is_featured,
            display_order: new.display_order,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&id) {
            return Ok(None);
        }

        if let Some(new_parent) = changes.new_parent() {
            check_reparent(&mut state.categories, id, new_parent).await?;
        }
        if let Some(slug) = &changes.slug {
            if state
                .categories
                .values()
                .any(|c| &c.slug == slug && c.id != id)
            {
                return Err(AppError::Conflict(
                    "A category with this slug already exists".to_string(),
                ));
            }
        }

        let Some(category) = state.categories.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            category.name = name;
        }
        if let Some(slug) = changes.slug {
            category.slug = slug;
        }
        if let Some(description) = changes.description {
            category.description = description;
        }
        if let Some(image) = changes.image {
            category.image = image;
        }
        if let Some(parent_id) = changes.parent_id {
            category.parent_id = parent_id;
        }
        if let Some(is_active) = changes.is_active {
            category.is_active = is_active;
        }
        if let Some(is_featured) = changes.is_featured {
            category.is_featured = is_featured;
        }
        if let Some(display_order) = changes.display_order {
            category.display_order = display_order;
        }
        if let Some(metadata) = changes.metadata {
            category.metadata = metadata;
        }
        category.updated_at = Utc::now();

        Ok(Some(category.clone()))
    }

    async fn delete_if_empty(&self, id: Uuid) -> Result<DeleteOutcome> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&id) {
            return Ok(DeleteOutcome::NotFound);
        }

        if let Some(refusal) = DeleteOutcome::refusal(&state.counts(id)) {
            return Ok(refusal);
        }

        state.categories.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn missing_products(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter(|id| !state.products.contains_key(*id))
            .copied()
            .collect())
    }

    async fn attach_products(&self, category_id: Uuid, product_ids: &[Uuid]) -> Result<u64> {
        let mut state = self.state.write().await;
        let added = product_ids
            .iter()
            .filter(|p| state.memberships.insert((category_id, **p)))
            .count();
        Ok(added as u64)
    }

    async fn replace_products(
        &self,
        category_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<(u64, u64)> {
        let mut state = self.state.write().await;
        let before = state.memberships.len();
        state
            .memberships
            .retain(|(c, p)| *c != category_id || product_ids.contains(p));
        let removed = (before - state.memberships.len()) as u64;

        let added = product_ids
            .iter()
            .filter(|p| state.memberships.insert((category_id, **p)))
            .count() as u64;

        Ok((added, removed))
    }

    async fn detach_products(&self, category_id: Uuid, product_ids: &[Uuid]) -> Result<u64> {
        let mut state = self.state.write().await;
        let removed = product_ids
            .iter()
            .filter(|p| state.memberships.remove(&(category_id, **p)))
            .count();
        Ok(removed as u64)
    }

    async fn list_products(
        &self,
        category_id: Uuid,
        filter: &ProductListFilter,
    ) -> Result<(Vec<Product>, i64)> {
        let state = self.state.read().await;

        let mut rows: Vec<&Product> = state
            .memberships
            .iter()
            .filter(|(c, _)| *c == category_id)
            .filter_map(|(_, p)| state.products.get(p))
            .filter(|p| p.is_active)
            .filter(|p| filter.min_price.is_none_or(|min| p.price >= min))
            .filter(|p| filter.max_price.is_none_or(|max| p.price <= max))
            .filter(|p| filter.in_stock.is_none_or(|v| (p.stock > 0) == v))
            .filter(|p| filter.is_featured.is_none_or(|v| p.is_featured == v))
            .collect();

        rows.sort_by(|a, b| {
            let primary = match filter.sort_by {
                ProductSortBy::Name => a.name.cmp(&b.name),
                ProductSortBy::Price => a.price.cmp(&b.price),
                ProductSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            cmp_direction(primary, filter.sort).then_with(|| a.id.cmp(&b.id))
        });

        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }
}
