//! Domain entities and value objects shared by forms, repositories and
//! services.

pub mod product;
pub mod types;
pub mod user;
