pub mod category_handler;
pub mod product_handler;

pub use category_handler::{
    __path_create_category, __path_delete_category, __path_get_ancestors,
    __path_get_breadcrumbs, __path_get_category, __path_get_category_by_slug,
    __path_get_category_tree, __path_get_children, __path_list_categories,
    __path_update_category, create_category, delete_category, get_ancestors, get_breadcrumbs,
    get_category, get_category_by_slug, get_category_tree, get_children, list_categories,
    update_category,
};
pub use product_handler::{
    __path_attach_products, __path_detach_products, __path_list_category_products,
    __path_replace_products, attach_products, detach_products, list_category_products,
    replace_products,
};
