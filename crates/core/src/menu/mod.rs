//! Menu catalog, price parsing and product-name resolution.
//!
//! The catalog is loaded once at startup and never mutated afterwards, so
//! every lookup here is a pure function of (catalog, query).

pub mod catalog;
pub mod ingest;
pub mod price;
pub mod resolver;

pub use catalog::{Catalog, MenuError};
pub use price::parse_price;
pub use resolver::ProductResolver;
