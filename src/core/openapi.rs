use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth;
use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::shared::types::{ApiResponse, Meta, SortDirection};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories (public)
        categories_handlers::list_categories,
        categories_handlers::get_category_tree,
        categories_handlers::get_category,
        categories_handlers::get_category_by_slug,
        categories_handlers::get_children,
        categories_handlers::get_ancestors,
        categories_handlers::get_breadcrumbs,
        categories_handlers::list_category_products,
        // Categories (admin)
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::delete_category,
        categories_handlers::attach_products,
        categories_handlers::replace_products,
        categories_handlers::detach_products,
    ),
    components(
        schemas(
            // Shared
            Meta,
            SortDirection,
            auth::model::AuthenticatedUser,
            // Categories
            categories_dtos::CategorySortBy,
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryDetailDto,
            categories_dtos::CategoryRefDto,
            categories_dtos::CategoryTreeDto,
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<categories_dtos::CategoryDetailDto>,
            ApiResponse<Vec<categories_dtos::CategoryRefDto>>,
            ApiResponse<Vec<categories_dtos::CategoryTreeDto>>,
            // Category products
            categories_dtos::ProductSortBy,
            categories_dtos::ProductResponseDto,
            categories_dtos::ProductIdsDto,
            categories_dtos::ReplaceProductsDto,
            categories_dtos::MembershipResultDto,
            ApiResponse<Vec<categories_dtos::ProductResponseDto>>,
            ApiResponse<categories_dtos::MembershipResultDto>,
        )
    ),
    tags(
        (name = "categories", description = "Product category hierarchy (public)"),
        (name = "admin-categories", description = "Category and membership management (admin only)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Storefront Catalog API",
        version = "0.1.0",
        description = "API documentation for the storefront catalog service",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Overrides title, version and description from configuration
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_category_paths() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/categories",
            "/api/categories/tree",
            "/api/categories/{id}/breadcrumbs",
            "/api/admin/categories/{id}",
            "/api/admin/categories/{id}/products",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
