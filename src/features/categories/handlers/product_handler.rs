use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RequireAdmin;
use crate::features::categories::dtos::{
    MembershipResultDto, ProductIdsDto, ProductQueryParams, ProductResponseDto,
    ReplaceProductsDto,
};
use crate::features::categories::services::CategoryService;
use crate::shared::types::{ApiResponse, Meta};

/// List products in a category
#[utoipa::path(
    get,
    path = "/api/categories/{id}/products",
    params(
        ("id" = Uuid, Path, description = "Category ID"),
        ProductQueryParams
    ),
    responses(
        (status = 200, description = "Products in the category", body = ApiResponse<Vec<ProductResponseDto>>),
        (status = 400, description = "Invalid price range"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn list_category_products(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ProductQueryParams>,
) -> Result<Json<ApiResponse<Vec<ProductResponseDto>>>> {
    let (products, total) = service.list_products(id, &params).await?;
    Ok(Json(ApiResponse::success(
        Some(products),
        None,
        Some(Meta { total }),
    )))
}

/// Attach products to a category
///
/// Additive: products already in the category stay attached.
#[utoipa::path(
    post,
    path = "/api/admin/categories/{id}/products",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = ProductIdsDto,
    responses(
        (status = 200, description = "Products attached", body = ApiResponse<MembershipResultDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Category or products not found")
    ),
    tag = "admin-categories",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn attach_products(
    RequireAdmin(user): RequireAdmin,
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ProductIdsDto>,
) -> Result<Json<ApiResponse<MembershipResultDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let result = service.attach_products(&user, id, &dto.product_ids).await?;
    Ok(Json(ApiResponse::success(
        Some(result),
        Some("Products attached successfully".to_string()),
        None,
    )))
}

/// Replace the products of a category
#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}/products",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = ReplaceProductsDto,
    responses(
        (status = 200, description = "Products replaced", body = ApiResponse<MembershipResultDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Category or products not found")
    ),
    tag = "admin-categories",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn replace_products(
    RequireAdmin(user): RequireAdmin,
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ReplaceProductsDto>,
) -> Result<Json<ApiResponse<MembershipResultDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let result = service.replace_products(&user, id, &dto.product_ids).await?;
    Ok(Json(ApiResponse::success(
        Some(result),
        Some("Products replaced successfully".to_string()),
        None,
    )))
}

/// Detach products from a category
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}/products",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = ProductIdsDto,
    responses(
        (status = 200, description = "Products detached", body = ApiResponse<MembershipResultDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "Category or products not found")
    ),
    tag = "admin-categories",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn detach_products(
    RequireAdmin(user): RequireAdmin,
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ProductIdsDto>,
) -> Result<Json<ApiResponse<MembershipResultDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let result = service.detach_products(&user, id, &dto.product_ids).await?;
    Ok(Json(ApiResponse::success(
        Some(result),
        Some("Products detached successfully".to_string()),
        None,
    )))
}
