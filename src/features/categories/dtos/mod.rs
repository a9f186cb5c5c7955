pub mod category_dto;
pub mod product_dto;

pub use category_dto::{
    CategoryDetailDto, CategoryDetailQuery, CategoryQueryParams, CategoryRefDto,
    CategoryResponseDto, CategorySortBy, CategoryTreeDto, CreateCategoryDto, HierarchyQuery,
    UpdateCategoryDto,
};
pub use product_dto::{
    MembershipResultDto, ProductIdsDto, ProductQueryParams, ProductResponseDto, ProductSortBy,
    ReplaceProductsDto,
};
