use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{CategoryListFilter, CategoryRepository, ParentFilter, ProductListFilter};
use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::categories::models::{
    Category, CategoryChanges, CategoryCounts, CategoryWithCounts, DeleteOutcome, NewCategory,
    Product,
};
use crate::features::categories::services::hierarchy::{check_reparent, ParentLookup};

/// Key for the transaction-scoped advisory lock serialising hierarchy writes
const HIERARCHY_LOCK_KEY: i64 = 0x0CA7_E609;

const CATEGORY_COLUMNS: &str = r#"
    c.id, c.parent_id, c.name, c.slug, c.description, c.image,
    c.is_active, c.is_featured, c.display_order, c.metadata,
    c.created_at, c.updated_at
"#;

const COUNT_COLUMNS: &str = r#"
    (SELECT COUNT(*) FROM product_categories pc WHERE pc.category_id = c.id) AS product_count,
    (SELECT COUNT(*) FROM categories ch WHERE ch.parent_id = c.id) AS child_count
"#;

const LIST_FILTERS: &str = r#"
    WHERE ($1::boolean IS NULL OR ($1 AND c.parent_id IS NULL))
      AND ($2::uuid IS NULL OR c.parent_id = $2)
      AND ($3::boolean IS NULL OR c.is_active = $3)
      AND ($4::boolean IS NULL OR c.is_featured = $4)
      AND ($5::text IS NULL OR c.name ILIKE $5 OR c.slug ILIKE $5)
"#;

const PRODUCT_FILTERS: &str = r#"
    WHERE pc.category_id = $1
      AND p.is_active = TRUE
      AND ($2::numeric IS NULL OR p.price >= $2)
      AND ($3::numeric IS NULL OR p.price <= $3)
      AND ($4::boolean IS NULL OR ($4 AND p.stock > 0) OR (NOT $4 AND p.stock <= 0))
      AND ($5::boolean IS NULL OR p.is_featured = $5)
"#;

/// PostgreSQL-backed category repository
pub struct PgCategoryRepository {
    pool: PgPool,
}

/// Parent pointers read through the connection holding the hierarchy lock
#[async_trait]
impl ParentLookup for PgConnection {
    async fn parent_of(&mut self, id: Uuid) -> Result<Option<Option<Uuid>>> {
        sqlx::query_scalar::<_, Option<Uuid>>("SELECT parent_id FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load category parent: {:?}", e);
                AppError::Database(e)
            })
    }
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin_hierarchy_write(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            AppError::Database(e)
        })?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(HIERARCHY_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to lock category hierarchy: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(tx)
    }

    async fn counts_in<'e, E>(executor: E, id: Uuid) -> Result<CategoryCounts>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, CategoryCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM product_categories WHERE category_id = $1) AS product_count,
                (SELECT COUNT(*) FROM categories WHERE parent_id = $1) AS child_count
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count category references: {:?}", e);
            AppError::Database(e)
        })
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories c WHERE c.id = $1", CATEGORY_COLUMNS);
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get category: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories c WHERE c.slug = $1", CATEGORY_COLUMNS);
        sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get category by slug: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn find_with_counts(&self, id: Uuid) -> Result<Option<CategoryWithCounts>> {
        let sql = format!(
            "SELECT {}, {} FROM categories c WHERE c.id = $1",
            CATEGORY_COLUMNS, COUNT_COLUMNS
        );
        sqlx::query_as::<_, CategoryWithCounts>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get category with counts: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM categories
                WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check slug uniqueness: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn counts(&self, id: Uuid) -> Result<CategoryCounts> {
        Self::counts_in(&self.pool, id).await
    }

    async fn list(&self, filter: &CategoryListFilter) -> Result<(Vec<CategoryWithCounts>, i64)> {
        let (top_level, parent_id) = match filter.parent {
            ParentFilter::Any => (None, None),
            ParentFilter::TopLevel => (Some(true), None),
            ParentFilter::Parent(id) => (None, Some(id)),
        };
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let sql = format!(
            "SELECT {}, {} FROM categories c {} ORDER BY {} {}, c.name ASC, c.id ASC LIMIT $6 OFFSET $7",
            CATEGORY_COLUMNS,
            COUNT_COLUMNS,
            LIST_FILTERS,
            filter.sort_by.as_sql(),
            filter.sort.as_sql()
        );
        let categories = sqlx::query_as::<_, CategoryWithCounts>(&sql)
            .bind(top_level)
            .bind(parent_id)
            .bind(filter.is_active)
            .bind(filter.is_featured)
            .bind(search.as_deref())
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list categories: {:?}", e);
                AppError::Database(e)
            })?;

        let count_sql = format!("SELECT COUNT(*) FROM categories c {}", LIST_FILTERS);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(top_level)
            .bind(parent_id)
            .bind(filter.is_active)
            .bind(filter.is_featured)
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count categories: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((categories, total))
    }

    async fn children(
        &self,
        parent: Option<Uuid>,
        include_inactive: bool,
    ) -> Result<Vec<CategoryWithCounts>> {
        let sql = format!(
            r#"
            SELECT {}, {} FROM categories c
            WHERE c.parent_id IS NOT DISTINCT FROM $1
              AND ($2 OR c.is_active = TRUE)
            ORDER BY c.display_order ASC, c.name ASC
            "#,
            CATEGORY_COLUMNS, COUNT_COLUMNS
        );
        sqlx::query_as::<_, CategoryWithCounts>(&sql)
            .bind(parent)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list child categories: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn children_of_many(
        &self,
        parents: &[Uuid],
        include_inactive: bool,
    ) -> Result<Vec<CategoryWithCounts>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {}, {} FROM categories c
            WHERE c.parent_id = ANY($1)
              AND ($2 OR c.is_active = TRUE)
            ORDER BY c.display_order ASC, c.name ASC
            "#,
            CATEGORY_COLUMNS, COUNT_COLUMNS
        );
        sqlx::query_as::<_, CategoryWithCounts>(&sql)
            .bind(parents)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list category tree level: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn insert(&self, category: NewCategory) -> Result<Category> {
        let sql = format!(
            r#"
            INSERT INTO categories AS c (
                id, parent_id, name, slug, description, image,
                is_active, is_featured, display_order, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(Uuid::now_v7())
            .bind(category.parent_id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(&category.image)
            .bind(category.is_active)
            .bind(category.is_featured)
            .bind(category.display_order)
            .bind(&category.metadata)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create category: {:?}", e);
                handle_db_error(e)
            })
    }

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>> {
        let mut tx = self.begin_hierarchy_write().await?;

        if let Some(new_parent) = changes.new_parent() {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to check category: {:?}", e);
                        AppError::Database(e)
                    })?;
            if !exists {
                return Ok(None);
            }
            check_reparent(&mut *tx, id, new_parent).await?;
        }

        let sql = format!(
            r#"
            UPDATE categories AS c SET
                name = COALESCE($2, c.name),
                slug = COALESCE($3, c.slug),
                description = CASE WHEN $4 THEN $5 ELSE c.description END,
                image = CASE WHEN $6 THEN $7 ELSE c.image END,
                parent_id = CASE WHEN $8 THEN $9 ELSE c.parent_id END,
                is_active = COALESCE($10, c.is_active),
                is_featured = COALESCE($11, c.is_featured),
                display_order = COALESCE($12, c.display_order),
                metadata = COALESCE($13, c.metadata),
                updated_at = NOW()
            WHERE c.id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );
        let updated = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.slug)
            .bind(changes.description.is_some())
            .bind(changes.description.clone().flatten())
            .bind(changes.image.is_some())
            .bind(changes.image.clone().flatten())
            .bind(changes.parent_id.is_some())
            .bind(changes.parent_id.flatten())
            .bind(changes.is_active)
            .bind(changes.is_featured)
            .bind(changes.display_order)
            .bind(&changes.metadata)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update category: {:?}", e);
                handle_db_error(e)
            })?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit category update: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(updated)
    }

    async fn delete_if_empty(&self, id: Uuid) -> Result<DeleteOutcome> {
        let mut tx = self.begin_hierarchy_write().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to check category: {:?}", e);
                    AppError::Database(e)
                })?;
        if !exists {
            return Ok(DeleteOutcome::NotFound);
        }

        let counts = Self::counts_in(&mut *tx, id).await?;
        if let Some(refusal) = DeleteOutcome::refusal(&counts) {
            return Ok(refusal);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM categories c
            WHERE c.id = $1
              AND NOT EXISTS (SELECT 1 FROM product_categories pc WHERE pc.category_id = c.id)
              AND NOT EXISTS (SELECT 1 FROM categories ch WHERE ch.parent_id = c.id)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete category: {:?}", e);
            match handle_db_error(e) {
                AppError::BadRequest(_) => {
                    AppError::BadRequest("Category still has children or products".to_string())
                }
                other => other,
            }
        })?;

        // Memberships are written without the hierarchy lock, so one may
        // have landed after the count above
        if result.rows_affected() == 0 {
            let counts = Self::counts_in(&mut *tx, id).await?;
            let outcome = DeleteOutcome::refusal(&counts).unwrap_or(DeleteOutcome::NotFound);
            tracing::warn!(category_id = %id, ?outcome, "Guarded category delete removed no rows");
            return Ok(outcome);
        }

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit category delete: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(DeleteOutcome::Deleted)
    }

    async fn missing_products(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_scalar(
            r#"
            SELECT requested.id
            FROM UNNEST($1::uuid[]) WITH ORDINALITY AS requested(id, position)
            WHERE NOT EXISTS (SELECT 1 FROM products p WHERE p.id = requested.id)
            ORDER BY requested.position
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check product ids: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn attach_products(&self, category_id: Uuid, product_ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_categories (product_id, category_id)
            SELECT DISTINCT UNNEST($1::uuid[]), $2::uuid
            ON CONFLICT (product_id, category_id) DO NOTHING
            "#,
        )
        .bind(product_ids)
        .bind(category_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to attach products: {:?}", e);
            handle_db_error(e)
        })?;

        Ok(result.rows_affected())
    }

    async fn replace_products(
        &self,
        category_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<(u64, u64)> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            AppError::Database(e)
        })?;

        let removed = sqlx::query(
            r#"
            DELETE FROM product_categories
            WHERE category_id = $1 AND NOT (product_id = ANY($2))
            "#,
        )
        .bind(category_id)
        .bind(product_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to prune category products: {:?}", e);
            AppError::Database(e)
        })?
        .rows_affected();

        let added = sqlx::query(
            r#"
            INSERT INTO product_categories (product_id, category_id)
            SELECT DISTINCT UNNEST($1::uuid[]), $2::uuid
            ON CONFLICT (product_id, category_id) DO NOTHING
            "#,
        )
        .bind(product_ids)
        .bind(category_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to replace category products: {:?}", e);
            handle_db_error(e)
        })?
        .rows_affected();

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit product replace: {:?}", e);
            AppError::Database(e)
        })?;

        Ok((added, removed))
    }

    async fn detach_products(&self, category_id: Uuid, product_ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM product_categories WHERE category_id = $1 AND product_id = ANY($2)",
        )
        .bind(category_id)
        .bind(product_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to detach products: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(result.rows_affected())
    }

    async fn list_products(
        &self,
        category_id: Uuid,
        filter: &ProductListFilter,
    ) -> Result<(Vec<Product>, i64)> {
        let sql = format!(
            r#"
            SELECT p.id, p.name, p.slug, p.price, p.stock, p.is_featured, p.is_active, p.created_at
            FROM products p
            JOIN product_categories pc ON pc.product_id = p.id
            {}
            ORDER BY {} {}, p.id ASC
            LIMIT $6 OFFSET $7
            "#,
            PRODUCT_FILTERS,
            filter.sort_by.as_sql(),
            filter.sort.as_sql()
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(category_id)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.in_stock)
            .bind(filter.is_featured)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list category products: {:?}", e);
                AppError::Database(e)
            })?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM products p JOIN product_categories pc ON pc.product_id = p.id {}",
            PRODUCT_FILTERS
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(category_id)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.in_stock)
            .bind(filter.is_featured)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count category products: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((products, total))
    }
}
