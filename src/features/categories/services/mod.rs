mod category_service;
pub mod hierarchy;

pub use category_service::CategoryService;
