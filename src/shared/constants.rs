/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Longest slug the `categories.slug` column accepts
pub const MAX_SLUG_LENGTH: usize = 255;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Store administrator - manages categories and catalog membership
pub const ROLE_ADMIN: &str = "admin";

/// Platform owner - implicitly holds every admin capability
pub const ROLE_SUPER_ADMIN: &str = "super_admin";
