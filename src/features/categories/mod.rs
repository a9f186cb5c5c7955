//! Product category hierarchy for the storefront catalog.
//!
//! Categories form a forest through a nullable `parent_id`. Reads expose
//! tree-shaped views over it; admin writes keep it acyclic and refuse to
//! delete categories that still hold products or children.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | GET | `/api/categories` | No | Filtered, paginated list |
//! | GET | `/api/categories/tree` | No | Nested tree, depth bounded |
//! | GET | `/api/categories/{id}` | No | Category with optional parent, children, counts |
//! | GET | `/api/categories/slug/{slug}` | No | Category by slug |
//! | GET | `/api/categories/{id}/children` | No | Direct children |
//! | GET | `/api/categories/{id}/ancestors` | No | Ancestors, root first |
//! | GET | `/api/categories/{id}/breadcrumbs` | No | Breadcrumb trail |
//! | GET | `/api/categories/{id}/products` | No | Products in the category |
//! | POST | `/api/admin/categories` | Admin | Create category |
//! | PATCH | `/api/admin/categories/{id}` | Admin | Update or re-parent |
//! | DELETE | `/api/admin/categories/{id}` | Admin | Delete empty category |
//! | POST | `/api/admin/categories/{id}/products` | Admin | Attach products (additive) |
//! | PUT | `/api/admin/categories/{id}/products` | Admin | Replace products |
//! | DELETE | `/api/admin/categories/{id}/products` | Admin | Detach products |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{CategoryRepository, PgCategoryRepository};
pub use services::CategoryService;
