pub mod client;
pub mod images;
pub mod types;

pub use client::{CatalogClient, CatalogError, CatalogResult};
pub use types::*;
