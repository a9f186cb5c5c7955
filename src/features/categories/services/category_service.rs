use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::categories::dtos::{
    CategoryDetailDto, CategoryDetailQuery, CategoryQueryParams, CategoryRefDto,
    CategoryResponseDto, CategoryTreeDto, CreateCategoryDto, HierarchyQuery, MembershipResultDto,
    ProductQueryParams, ProductResponseDto, UpdateCategoryDto,
};
use crate::features::categories::models::{
    Category, CategoryChanges, DeleteOutcome, NewCategory,
};
use crate::features::categories::repositories::{
    CategoryListFilter, CategoryRepository, ParentFilter, ProductListFilter,
};
use crate::features::categories::services::hierarchy::{
    parent_not_found, AncestorWalk, TreeBuilder,
};
use crate::shared::constants::MAX_SLUG_LENGTH;
use crate::shared::validation::{slugify, SLUG_REGEX};

/// Service for the category tree and its product memberships
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    tree_max_depth: usize,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, tree_max_depth: usize) -> Self {
        Self {
            repo,
            tree_max_depth: tree_max_depth.max(1),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Paginated, filtered list with product and child counts
    pub async fn list(
        &self,
        params: &CategoryQueryParams,
    ) -> Result<(Vec<CategoryResponseDto>, i64)> {
        let parent = match (params.top_level, params.parent_id) {
            (true, Some(_)) => {
                return Err(AppError::Validation(
                    "top_level cannot be combined with parent_id".to_string(),
                ))
            }
            (true, None) => ParentFilter::TopLevel,
            (false, Some(id)) => ParentFilter::Parent(id),
            (false, None) => ParentFilter::Any,
        };

        let filter = CategoryListFilter {
            parent,
            is_active: params.is_active,
            is_featured: params.is_featured,
            search: params.search.clone(),
            sort_by: params.sort_by,
            sort: params.sort,
            limit: params.limit(),
            offset: params.offset(),
        };

        let (rows, total) = self.repo.list(&filter).await?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    pub async fn get(&self, id: Uuid, query: &CategoryDetailQuery) -> Result<CategoryDetailDto> {
        let category: CategoryResponseDto = if query.include_counts {
            self.repo
                .find_with_counts(id)
                .await?
                .ok_or_else(|| category_not_found(id))?
                .into()
        } else {
            self.require(id).await?.into()
        };

        let parent = match (query.include_parent, category.parent_id) {
            (true, Some(parent_id)) => self
                .repo
                .find_by_id(parent_id)
                .await?
                .map(|p| CategoryRefDto::from(&p)),
            _ => None,
        };

        let children = if query.include_children {
            let rows = self.repo.children(Some(id), query.include_inactive).await?;
            Some(rows.into_iter().map(Into::into).collect())
        } else {
            None
        };

        Ok(CategoryDetailDto {
            category,
            parent,
            children,
        })
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<CategoryResponseDto> {
        if !SLUG_REGEX.is_match(slug) {
            return Err(AppError::NotFound(format!("Category '{}' not found", slug)));
        }

        let category = self
            .repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))?;

        let counts = self.repo.counts(category.id).await?;
        let mut dto = CategoryResponseDto::from(category);
        dto.product_count = Some(counts.product_count);
        dto.child_count = Some(counts.child_count);
        Ok(dto)
    }

    /// Direct children of a category, ordered by display order then name
    pub async fn children(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<CategoryResponseDto>> {
        self.require(id).await?;
        let rows = self.repo.children(Some(id), include_inactive).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Ancestors of a category, root first, without the category itself
    pub async fn ancestors(&self, id: Uuid) -> Result<Vec<CategoryResponseDto>> {
        let category = self.require(id).await?;
        let chain = self.ancestor_chain(&category).await?;
        Ok(chain.into_iter().map(Into::into).collect())
    }

    /// Root-first navigation trail above a category
    pub async fn breadcrumbs(&self, id: Uuid) -> Result<Vec<CategoryRefDto>> {
        let category = self.require(id).await?;
        let chain = self.ancestor_chain(&category).await?;
        Ok(chain.iter().map(CategoryRefDto::from).collect())
    }

    /// Nested tree below `parent_id` (the whole forest when absent), fetched
    /// one level per round trip and bounded by the configured depth
    pub async fn tree(&self, query: &HierarchyQuery) -> Result<Vec<CategoryTreeDto>> {
        if let Some(parent_id) = query.parent_id {
            self.require(parent_id).await?;
        }

        let mut builder = TreeBuilder::new(self.tree_max_depth);
        builder.add_roots(
            self.repo
                .children(query.parent_id, query.include_inactive)
                .await?,
        );

        while let Some(frontier) = builder.frontier() {
            let level = self
                .repo
                .children_of_many(frontier, query.include_inactive)
                .await?;
            builder.add_level(level);
        }

        tracing::debug!(depth = builder.depth(), "Built category tree");
        Ok(builder.finish())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        dto: CreateCategoryDto,
    ) -> Result<CategoryResponseDto> {
        let name = dto.name.trim().to_string();
        let slug = self.unique_slug(&name, None).await?;

        if let Some(parent_id) = dto.parent_id {
            if self.repo.find_by_id(parent_id).await?.is_none() {
                return Err(parent_not_found(parent_id));
            }
        }
        let metadata = validate_metadata(dto.metadata)?.unwrap_or_else(empty_metadata);

        let category = self
            .repo
            .insert(NewCategory {
                parent_id: dto.parent_id,
                name,
                slug,
                description: dto.description,
                image: dto.image,
                is_active: dto.is_active.unwrap_or(true),
                is_featured: dto.is_featured.unwrap_or(false),
                display_order: dto.order.unwrap_or(0),
                metadata,
            })
            .await?;

        tracing::info!(
            category_id = %category.id,
            slug = %category.slug,
            parent_id = ?category.parent_id,
            by = %user.sub,
            "Category created"
        );

        Ok(category.into())
    }

    pub async fn update(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        dto: UpdateCategoryDto,
    ) -> Result<CategoryResponseDto> {
        self.require(id).await?;

        let (name, slug) = match dto.name {
            Some(name) => {
                let name = name.trim().to_string();
                let slug = self.unique_slug(&name, Some(id)).await?;
                (Some(name), Some(slug))
            }
            None => (None, None),
        };

        let changes = CategoryChanges {
            name,
            slug,
            description: dto.description,
            image: dto.image,
            parent_id: dto.parent_id,
            is_active: dto.is_active,
            is_featured: dto.is_featured,
            display_order: dto.order,
            metadata: validate_metadata(dto.metadata)?,
        };

        let category = self
            .repo
            .update(id, changes)
            .await?
            .ok_or_else(|| category_not_found(id))?;

        tracing::info!(
            category_id = %category.id,
            slug = %category.slug,
            parent_id = ?category.parent_id,
            by = %user.sub,
            "Category updated"
        );

        Ok(category.into())
    }

    /// Hard delete; refused while products or child categories reference it
    pub async fn delete(&self, user: &AuthenticatedUser, id: Uuid) -> Result<()> {
        match self.repo.delete_if_empty(id).await? {
            DeleteOutcome::Deleted => {
                tracing::info!(category_id = %id, by = %user.sub, "Category deleted");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(category_not_found(id)),
            DeleteOutcome::HasProducts(count) => {
                tracing::warn!(category_id = %id, count, "Refused to delete category with products");
                Err(AppError::BadRequest(format!(
                    "Cannot delete category with {} attached product(s)",
                    count
                )))
            }
            DeleteOutcome::HasChildren(count) => {
                tracing::warn!(category_id = %id, count, "Refused to delete category with children");
                Err(AppError::BadRequest(format!(
                    "Cannot delete category with {} child categor{}",
                    count,
                    if count == 1 { "y" } else { "ies" }
                )))
            }
        }
    }

    // ========================================================================
    // Product membership
    // ========================================================================

    pub async fn list_products(
        &self,
        id: Uuid,
        params: &ProductQueryParams,
    ) -> Result<(Vec<ProductResponseDto>, i64)> {
        self.require(id).await?;

        if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
            if min > max {
                return Err(AppError::Validation(
                    "min_price cannot be greater than max_price".to_string(),
                ));
            }
        }

        let filter = ProductListFilter {
            min_price: params.min_price,
            max_price: params.max_price,
            in_stock: params.in_stock,
            is_featured: params.is_featured,
            sort_by: params.sort_by,
            sort: params.sort,
            limit: params.limit(),
            offset: params.offset(),
        };

        let (rows, total) = self.repo.list_products(id, &filter).await?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Add products to a category; existing memberships are kept
    pub async fn attach_products(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<MembershipResultDto> {
        self.require(id).await?;
        self.ensure_products_exist(product_ids).await?;

        let added = self.repo.attach_products(id, product_ids).await?;
        tracing::info!(category_id = %id, added, by = %user.sub, "Products attached");

        self.membership_result(id, added, 0).await
    }

    /// Make the category's membership exactly `product_ids`
    pub async fn replace_products(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<MembershipResultDto> {
        self.require(id).await?;
        self.ensure_products_exist(product_ids).await?;

        let (added, removed) = self.repo.replace_products(id, product_ids).await?;
        tracing::info!(category_id = %id, added, removed, by = %user.sub, "Products replaced");

        self.membership_result(id, added, removed).await
    }

    /// Remove the listed products; other memberships stay
    pub async fn detach_products(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<MembershipResultDto> {
        self.require(id).await?;
        self.ensure_products_exist(product_ids).await?;

        let removed = self.repo.detach_products(id, product_ids).await?;
        tracing::info!(category_id = %id, removed, by = %user.sub, "Products detached");

        self.membership_result(id, 0, removed).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn require(&self, id: Uuid) -> Result<Category> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| category_not_found(id))
    }

    async fn ancestor_chain(&self, category: &Category) -> Result<Vec<Category>> {
        let mut walk = AncestorWalk::new(category.id, category.parent_id);
        let mut chain = Vec::new();

        while let Some(ancestor_id) = walk.next_ancestor() {
            let Some(ancestor) = self.repo.find_by_id(ancestor_id).await? else {
                tracing::warn!(category_id = %category.id, missing = %ancestor_id, "Dangling parent reference");
                break;
            };
            walk.step(ancestor.parent_id);
            chain.push(ancestor);
        }

        if let Some(revisited) = walk.revisited() {
            tracing::warn!(
                category_id = %category.id,
                revisited = %revisited,
                "Cycle in category parent chain"
            );
        }

        chain.reverse();
        Ok(chain)
    }

    async fn unique_slug(&self, name: &str, exclude: Option<Uuid>) -> Result<String> {
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        let slug = slugify(name);
        if slug.is_empty() {
            return Err(AppError::Validation(format!(
                "Name '{}' does not produce a usable slug",
                name
            )));
        }
        if slug.len() > MAX_SLUG_LENGTH {
            return Err(AppError::Validation(format!(
                "Name produces a slug longer than {} characters",
                MAX_SLUG_LENGTH
            )));
        }

        if self.repo.slug_taken(&slug, exclude).await? {
            tracing::warn!(slug = %slug, "Rejected duplicate category slug");
            return Err(AppError::Conflict(format!(
                "A category with slug '{}' already exists",
                slug
            )));
        }

        Ok(slug)
    }

    async fn ensure_products_exist(&self, product_ids: &[Uuid]) -> Result<()> {
        let missing = self.repo.missing_products(product_ids).await?;
        if !missing.is_empty() {
            return Err(AppError::ProductsNotFound(missing));
        }
        Ok(())
    }

    async fn membership_result(
        &self,
        id: Uuid,
        added: u64,
        removed: u64,
    ) -> Result<MembershipResultDto> {
        let counts = self.repo.counts(id).await?;
        Ok(MembershipResultDto {
            category_id: id,
            added,
            removed,
            product_count: counts.product_count,
        })
    }
}

fn category_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Category {} not found", id))
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn validate_metadata(metadata: Option<serde_json::Value>) -> Result<Option<serde_json::Value>> {
    match metadata {
        Some(value) if !value.is_object() => Err(AppError::Validation(
            "metadata must be a JSON object".to_string(),
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fake::faker::lorem::en::Word;
    use fake::Fake;
    use rust_decimal::Decimal;

    use crate::features::categories::repositories::memory::InMemoryCategoryRepository;
    use crate::shared::test_helpers::create_admin_user;

    fn service() -> (CategoryService, Arc<InMemoryCategoryRepository>) {
        let repo = Arc::new(InMemoryCategoryRepository::new());
        (CategoryService::new(repo.clone(), 8), repo)
    }

    fn create_dto(name: &str, parent_id: Option<Uuid>) -> CreateCategoryDto {
        CreateCategoryDto {
            name: name.to_string(),
            description: None,
            parent_id,
            image: None,
            is_active: None,
            is_featured: None,
            order: None,
            metadata: None,
        }
    }

    fn reparent(parent_id: Option<Uuid>) -> UpdateCategoryDto {
        UpdateCategoryDto {
            parent_id: Some(parent_id),
            ..Default::default()
        }
    }

    fn raw_category(id: Uuid, parent_id: Option<Uuid>, slug: &str) -> Category {
        Category {
            id,
            parent_id,
            name: slug.to_string(),
            slug: slug.to_string(),
            description: None,
            image: None,
            is_active: true,
            is_featured: false,
            display_order: 0,
            metadata: empty_metadata(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn chain(service: &CategoryService, names: &[&str]) -> Vec<Uuid> {
        let admin = create_admin_user();
        let mut ids = Vec::new();
        let mut parent = None;
        for name in names {
            let created = service
                .create(&admin, create_dto(name, parent))
                .await
                .unwrap();
            parent = Some(created.id);
            ids.push(created.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_clothing_dresses_scenario() {
        let (service, _) = service();
        let admin = create_admin_user();

        let clothing = service
            .create(&admin, create_dto("Clothing", None))
            .await
            .unwrap();
        assert_eq!(clothing.slug, "clothing");
        assert_eq!(clothing.parent_id, None);

        let dresses = service
            .create(&admin, create_dto("Dresses", Some(clothing.id)))
            .await
            .unwrap();
        assert_eq!(dresses.slug, "dresses");

        let children = service.children(clothing.id, false).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, dresses.id);

        let ancestors = service.ancestors(dresses.id).await.unwrap();
        assert_eq!(ancestors.len(), 1);
        assert_eq!(ancestors[0].id, clothing.id);

        let cycle = service
            .update(&admin, clothing.id, reparent(Some(dresses.id)))
            .await;
        assert!(matches!(cycle, Err(AppError::BadRequest(_))));

        let refused = service.delete(&admin, clothing.id).await;
        assert!(matches!(refused, Err(AppError::BadRequest(_))));

        service.delete(&admin, dresses.id).await.unwrap();
        service.delete(&admin, clothing.id).await.unwrap();

        let gone = service.get(clothing.id, &CategoryDetailQuery::default()).await;
        assert!(matches!(gone, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_rejects_collision() {
        let (service, _) = service();
        let admin = create_admin_user();

        let created = service
            .create(&admin, create_dto("Men's Wear!!", None))
            .await
            .unwrap();
        assert_eq!(created.slug, "mens-wear");
        assert_eq!(created.metadata, serde_json::json!({}));
        assert!(created.is_active);

        let duplicate = service.create(&admin, create_dto("Mens Wear", None)).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        let empty = service.create(&admin, create_dto("!!!", None)).await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_slug_longer_than_column() {
        let (service, _) = service();
        let admin = create_admin_user();

        // 100 characters, each expanding to "and"
        let ampersands = "&".repeat(100);
        let too_long = service.create(&admin, create_dto(&ampersands, None)).await;
        assert!(matches!(too_long, Err(AppError::Validation(_))));

        let eszett = service
            .create(&admin, create_dto(&"ß".repeat(100), None))
            .await
            .unwrap();
        assert_eq!(eszett.slug.len(), 200);
        assert!(eszett.slug.len() <= MAX_SLUG_LENGTH);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_parent_and_bad_metadata() {
        let (service, _) = service();
        let admin = create_admin_user();

        let orphan = service
            .create(&admin, create_dto("Socks", Some(Uuid::now_v7())))
            .await;
        assert!(matches!(orphan, Err(AppError::NotFound(_))));

        let mut dto = create_dto("Socks", None);
        dto.metadata = Some(serde_json::json!(["not", "an", "object"]));
        let bad = service.create(&admin, dto).await;
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reparent_rules_on_chain() {
        let (service, _) = service();
        let admin = create_admin_user();
        let ids = chain(&service, &["A", "B", "C", "D"]).await;
        let (a, d) = (ids[0], ids[3]);
        let e = service.create(&admin, create_dto("E", None)).await.unwrap().id;

        let self_parent = service.update(&admin, a, reparent(Some(a))).await;
        assert!(matches!(self_parent, Err(AppError::BadRequest(_))));

        let under_descendant = service.update(&admin, a, reparent(Some(d))).await;
        assert!(matches!(under_descendant, Err(AppError::BadRequest(_))));

        let unknown = service.update(&admin, a, reparent(Some(Uuid::now_v7()))).await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));

        let moved = service.update(&admin, a, reparent(Some(e))).await.unwrap();
        assert_eq!(moved.parent_id, Some(e));

        let detached = service.update(&admin, a, reparent(None)).await.unwrap();
        assert_eq!(detached.parent_id, None);
    }

    #[tokio::test]
    async fn test_update_name_regenerates_slug() {
        let (service, _) = service();
        let admin = create_admin_user();
        let shoes = service.create(&admin, create_dto("Shoes", None)).await.unwrap();
        service.create(&admin, create_dto("Boots", None)).await.unwrap();

        let renamed = service
            .update(
                &admin,
                shoes.id,
                UpdateCategoryDto {
                    name: Some("Running Shoes".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.slug, "running-shoes");
        assert_eq!(renamed.parent_id, None);

        // Renaming to its own current slug is not a conflict
        let same = service
            .update(
                &admin,
                shoes.id,
                UpdateCategoryDto {
                    name: Some("Running  Shoes".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(same.is_ok());

        let taken = service
            .update(
                &admin,
                shoes.id,
                UpdateCategoryDto {
                    name: Some("Boots".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(taken, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_ancestors_and_breadcrumbs_are_root_first() {
        let (service, _) = service();
        let ids = chain(&service, &["Home", "Kitchen", "Cookware", "Pans"]).await;

        let ancestors = service.ancestors(ids[3]).await.unwrap();
        let ancestor_ids: Vec<_> = ancestors.iter().map(|c| c.id).collect();
        assert_eq!(ancestor_ids, ids[..3].to_vec());

        let crumbs = service.breadcrumbs(ids[3]).await.unwrap();
        let slugs: Vec<_> = crumbs.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["home", "kitchen", "cookware"]);

        assert!(service.ancestors(ids[0]).await.unwrap().is_empty());
        assert!(matches!(
            service.breadcrumbs(Uuid::now_v7()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ancestors_terminate_on_corrupt_cycle() {
        let (service, repo) = service();
        let (x, y, z) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        repo.seed_category(raw_category(x, Some(y), "x")).await;
        repo.seed_category(raw_category(y, Some(z), "y")).await;
        repo.seed_category(raw_category(z, Some(x), "z")).await;

        let ancestors = service.ancestors(x).await.unwrap();
        assert!(ancestors.iter().all(|c| c.id != x));
        assert!(ancestors.len() <= 3);
        assert_eq!(ancestors.len(), 2);

        // Any revisit while checking a move fails closed
        let (target, other) = (Uuid::now_v7(), Uuid::now_v7());
        repo.seed_category(raw_category(target, None, "target")).await;
        repo.seed_category(raw_category(other, Some(y), "other")).await;
        let moved = service
            .update(&create_admin_user(), target, reparent(Some(other)))
            .await;
        assert!(matches!(moved, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_tree_is_nested_and_bounded() {
        let repo = Arc::new(InMemoryCategoryRepository::new());
        let service = CategoryService::new(repo.clone(), 2);
        let ids = chain(&service, &["Sports", "Outdoor", "Camping", "Tents"]).await;

        let tree = service.tree(&HierarchyQuery::default()).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, ids[0]);
        assert_eq!(tree[0].children.len(), 1);

        let second = &tree[0].children[0];
        assert_eq!(second.id, ids[1]);
        assert!(second.children.is_empty());
        assert_eq!(second.child_count, 1);

        let subtree = service
            .tree(&HierarchyQuery {
                parent_id: Some(ids[1]),
                include_inactive: false,
            })
            .await
            .unwrap();
        assert_eq!(subtree[0].id, ids[2]);
        assert_eq!(subtree[0].children[0].id, ids[3]);
    }

    #[tokio::test]
    async fn test_children_hide_inactive_by_default() {
        let (service, _) = service();
        let admin = create_admin_user();
        let parent = service.create(&admin, create_dto("Toys", None)).await.unwrap();

        let mut hidden = create_dto("Retired", Some(parent.id));
        hidden.is_active = Some(false);
        service.create(&admin, hidden).await.unwrap();
        let mut first = create_dto("Puzzles", Some(parent.id));
        first.order = Some(-1);
        service.create(&admin, first).await.unwrap();
        service
            .create(&admin, create_dto("Blocks", Some(parent.id)))
            .await
            .unwrap();

        let visible = service.children(parent.id, false).await.unwrap();
        let names: Vec<_> = visible.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Puzzles", "Blocks"]);

        let all = service.children(parent.id, true).await.unwrap();
        assert_eq!(all.len(), 3);

        // child_count keeps counting the hidden child
        let tree = service.tree(&HierarchyQuery::default()).await.unwrap();
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].child_count, 3);
    }

    #[tokio::test]
    async fn test_delete_refuses_category_with_products() {
        let (service, repo) = service();
        let admin = create_admin_user();
        let category = service.create(&admin, create_dto("Hats", None)).await.unwrap();
        let product = repo.seed_product("Fedora", Decimal::new(4999, 2), 3).await;

        service
            .attach_products(&admin, category.id, &[product.id])
            .await
            .unwrap();
        let refused = service.delete(&admin, category.id).await;
        assert!(matches!(refused, Err(AppError::BadRequest(_))));

        service
            .detach_products(&admin, category.id, &[product.id])
            .await
            .unwrap();
        service.delete(&admin, category.id).await.unwrap();

        let missing = service.delete(&admin, category.id).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_attach_is_additive() {
        let (service, repo) = service();
        let admin = create_admin_user();
        let category = service.create(&admin, create_dto("Bags", None)).await.unwrap();

        let mut products = Vec::new();
        for _ in 0..3 {
            let name: String = Word().fake();
            products.push(repo.seed_product(&name, Decimal::new(1000, 2), 1).await);
        }
        let (p1, p2, p3) = (products[0].id, products[1].id, products[2].id);

        let first = service
            .attach_products(&admin, category.id, &[p1, p2])
            .await
            .unwrap();
        assert_eq!(first.added, 2);
        assert_eq!(first.product_count, 2);

        let second = service
            .attach_products(&admin, category.id, &[p3])
            .await
            .unwrap();
        assert_eq!(second.added, 1);
        assert_eq!(second.product_count, 3);

        let again = service
            .attach_products(&admin, category.id, &[p1])
            .await
            .unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.product_count, 3);

        let (listed, total) = service
            .list_products(category.id, &ProductQueryParams::default())
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn test_replace_and_detach_memberships() {
        let (service, repo) = service();
        let admin = create_admin_user();
        let category = service.create(&admin, create_dto("Lamps", None)).await.unwrap();
        let p1 = repo.seed_product("Desk Lamp", Decimal::new(2500, 2), 4).await.id;
        let p2 = repo.seed_product("Floor Lamp", Decimal::new(8900, 2), 0).await.id;
        let p3 = repo.seed_product("Bulb", Decimal::new(300, 2), 50).await.id;

        service
            .attach_products(&admin, category.id, &[p1, p2])
            .await
            .unwrap();

        let replaced = service
            .replace_products(&admin, category.id, &[p2, p3])
            .await
            .unwrap();
        assert_eq!((replaced.added, replaced.removed), (1, 1));
        assert_eq!(replaced.product_count, 2);

        let detached = service
            .detach_products(&admin, category.id, &[p3])
            .await
            .unwrap();
        assert_eq!(detached.removed, 1);
        assert_eq!(detached.product_count, 1);

        let unknown = Uuid::now_v7();
        let err = service
            .attach_products(&admin, category.id, &[p1, unknown])
            .await
            .unwrap_err();
        match err {
            AppError::ProductsNotFound(ids) => assert_eq!(ids, vec![unknown]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(repo.counts(category.id).await.unwrap().product_count, 1);
    }

    #[tokio::test]
    async fn test_list_products_filters() {
        let (service, repo) = service();
        let admin = create_admin_user();
        let category = service.create(&admin, create_dto("Audio", None)).await.unwrap();
        let cheap = repo.seed_product("Earbuds", Decimal::new(1999, 2), 0).await.id;
        let pricey = repo.seed_product("Headphones", Decimal::new(19900, 2), 2).await.id;
        service
            .attach_products(&admin, category.id, &[cheap, pricey])
            .await
            .unwrap();

        let params = ProductQueryParams {
            in_stock: Some(true),
            ..Default::default()
        };
        let (in_stock, total) = service.list_products(category.id, &params).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(in_stock[0].id, pricey);

        let params = ProductQueryParams {
            max_price: Some(Decimal::new(5000, 2)),
            ..Default::default()
        };
        let (budget, _) = service.list_products(category.id, &params).await.unwrap();
        assert_eq!(budget[0].id, cheap);

        let params = ProductQueryParams {
            min_price: Some(Decimal::new(100, 0)),
            max_price: Some(Decimal::new(1, 0)),
            ..Default::default()
        };
        let inverted = service.list_products(category.id, &params).await;
        assert!(matches!(inverted, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let (service, _) = service();
        let admin = create_admin_user();
        let ids = chain(&service, &["Garden", "Tools"]).await;
        service.create(&admin, create_dto("Pets", None)).await.unwrap();

        let top = CategoryQueryParams {
            top_level: true,
            sort_by: crate::features::categories::dtos::CategorySortBy::Name,
            ..Default::default()
        };
        let (rows, total) = service.list(&top).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].name, "Garden");
        assert_eq!(rows[0].child_count, Some(1));

        let under = CategoryQueryParams {
            parent_id: Some(ids[0]),
            ..Default::default()
        };
        let (rows, _) = service.list(&under).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, ids[1]);

        let search = CategoryQueryParams {
            search: Some("PET".to_string()),
            ..Default::default()
        };
        assert_eq!(service.list(&search).await.unwrap().1, 1);

        let paged = CategoryQueryParams {
            page: 2,
            page_size: 2,
            ..Default::default()
        };
        let (rows, total) = service.list(&paged).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 1);

        let far = CategoryQueryParams {
            page: i64::MAX,
            ..Default::default()
        };
        let (rows, total) = service.list(&far).await.unwrap();
        assert_eq!(total, 3);
        assert!(rows.is_empty());

        let conflicting = CategoryQueryParams {
            top_level: true,
            parent_id: Some(ids[0]),
            ..Default::default()
        };
        assert!(matches!(
            service.list(&conflicting).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_with_includes() {
        let (service, _) = service();
        let ids = chain(&service, &["Books", "Fiction"]).await;

        let detail = service
            .get(
                ids[1],
                &CategoryDetailQuery {
                    include_parent: true,
                    include_children: true,
                    include_counts: true,
                    include_inactive: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.parent.map(|p| p.slug), Some("books".to_string()));
        assert_eq!(detail.children.map(|c| c.len()), Some(0));
        assert_eq!(detail.category.product_count, Some(0));

        let plain = service
            .get(ids[0], &CategoryDetailQuery::default())
            .await
            .unwrap();
        assert!(plain.parent.is_none());
        assert!(plain.children.is_none());
        assert!(plain.category.child_count.is_none());

        let by_slug = service.get_by_slug("fiction").await.unwrap();
        assert_eq!(by_slug.id, ids[1]);
        assert!(matches!(
            service.get_by_slug("nope").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get_by_slug("Not A Slug").await,
            Err(AppError::NotFound(_))
        ));
    }
}
