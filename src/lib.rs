//! Product catalog state for the BeautyHub and ShineSales apps.
//!
//! The `data` feature exposes the domain types and form validation only. The
//! default `store` feature adds the remote gateway contract, an in-memory
//! backend and [`services::CatalogStore`], which keeps the local product list
//! in step with the backend.

pub mod domain;
pub mod forms;

#[cfg(feature = "store")]
pub mod error_conversions;
#[cfg(feature = "store")]
pub mod repository;
#[cfg(feature = "store")]
pub mod services;
#[cfg(feature = "store")]
pub mod settings;
