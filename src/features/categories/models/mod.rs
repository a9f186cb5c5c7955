mod category;
mod product;

pub use category::{
    Category, CategoryChanges, CategoryCounts, CategoryWithCounts, DeleteOutcome, NewCategory,
};
pub use product::Product;
