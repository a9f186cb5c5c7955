use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::features::categories::handlers;
use crate::features::categories::services::CategoryService;

/// Create public routes for the categories feature
///
/// Note: These routes are public (no authentication required)
pub fn routes(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/categories/tree", get(handlers::get_category_tree))
        .route(
            "/api/categories/slug/{slug}",
            get(handlers::get_category_by_slug),
        )
        .route("/api/categories/{id}", get(handlers::get_category))
        .route("/api/categories/{id}/children", get(handlers::get_children))
        .route("/api/categories/{id}/ancestors", get(handlers::get_ancestors))
        .route(
            "/api/categories/{id}/breadcrumbs",
            get(handlers::get_breadcrumbs),
        )
        .route(
            "/api/categories/{id}/products",
            get(handlers::list_category_products),
        )
        .with_state(service)
}

/// Create admin routes for category management
///
/// Must sit behind the JWT middleware; handlers enforce the admin role.
pub fn admin_routes(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route("/api/admin/categories", post(handlers::create_category))
        .route(
            "/api/admin/categories/{id}",
            patch(handlers::update_category).delete(handlers::delete_category),
        )
        .route(
            "/api/admin/categories/{id}/products",
            post(handlers::attach_products)
                .put(handlers::replace_products)
                .delete(handlers::detach_products),
        )
        .with_state(service)
}
