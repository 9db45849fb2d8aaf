use std::sync::Arc;

use crate::domain::product::Product;
use crate::menu::catalog::Catalog;

/// Maps a raw spoken or typed name onto a catalog entry: exact first, then
/// substring.
#[derive(Clone, Debug)]
pub struct ProductResolver {
    catalog: Arc<Catalog>,
}

impl ProductResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn resolve(&self, raw_name: &str) -> Option<Arc<Product>> {
        let name = raw_name.trim();
        self.catalog.find_exact(name).or_else(|| self.catalog.find_fuzzy(name)).cloned()
    }
}
