#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
pub fn create_admin_user() -> AuthenticatedUser {
    AuthenticatedUser {
        sub: "test-admin".to_string(),
        email: Some("admin@example.com".to_string()),
        roles: vec!["admin".to_string()],
    }
}

#[cfg(test)]
pub fn create_customer_user() -> AuthenticatedUser {
    AuthenticatedUser {
        sub: "test-customer".to_string(),
        email: Some("customer@example.com".to_string()),
        roles: vec!["customer".to_string()],
    }
}

#[cfg(test)]
async fn inject_admin_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_admin_user());
    next.run(request).await
}

#[cfg(test)]
async fn inject_customer_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_customer_user());
    next.run(request).await
}

/// Stand-in for the JWT middleware: every request is an authenticated admin
#[cfg(test)]
pub fn with_admin_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_admin_middleware))
}

/// Every request is authenticated but lacks the admin role
#[cfg(test)]
pub fn with_customer_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_customer_middleware))
}
