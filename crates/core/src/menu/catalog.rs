use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::domain::product::Product;

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("could not read menu file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse menu file `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

#[derive(Clone, Debug)]
struct CatalogEntry {
    product: Arc<Product>,
    key: String,
}

/// Immutable, ordered menu. Order is ingestion order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        let entries = products
            .into_iter()
            .map(|product| CatalogEntry { key: normalize_name(&product.name), product: Arc::new(product) })
            .collect();
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the menu, degrading to an empty catalog when the source is
    /// missing or malformed.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(catalog) => {
                info!(
                    event_name = "menu.catalog.loaded",
                    path = %path.display(),
                    products = catalog.len(),
                    "menu catalog loaded"
                );
                catalog
            }
            Err(error) => {
                warn!(
                    event_name = "menu.catalog.load_failed",
                    path = %path.display(),
                    error = %error,
                    "menu could not be loaded; continuing with an empty catalog"
                );
                Self::empty()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, MenuError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| MenuError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_json(&raw).map_err(|source| MenuError::Parse { path: path.to_path_buf(), source })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let products = serde_json::from_str::<Vec<Product>>(raw)?;
        Ok(Self::new(products))
    }

    /// Case-insensitive exact match; the first duplicate wins.
    pub fn find_exact(&self, name: &str) -> Option<&Arc<Product>> {
        let key = normalize_name(name);
        self.entries.iter().find(|entry| entry.key == key).map(|entry| &entry.product)
    }

    /// First entry, in catalog order, whose name contains `name`.
    pub fn find_fuzzy(&self, name: &str) -> Option<&Arc<Product>> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        self.entries.iter().find(|entry| entry.key.contains(&key)).map(|entry| &entry.product)
    }

    pub fn list_first(&self, n: usize) -> impl Iterator<Item = &Product> {
        self.entries.iter().take(n).map(|entry| entry.product.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.product.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{Catalog, MenuError};
    use crate::domain::product::Product;

    fn catalog_fixture() -> Catalog {
        Catalog::new(vec![
            Product::new("Піца Маргарита", "150"),
            Product::new("Піца Пепероні", "від 185"),
            Product::new("Кола", "40"),
            Product::new("кола", "45"),
        ])
    }

    #[test]
    fn exact_match_ignores_case_and_keeps_first_duplicate() {
        let catalog = catalog_fixture();
        let product = catalog.find_exact("КОЛА").expect("cola should match");
        assert_eq!(product.price, "40");
    }

    #[test]
    fn fuzzy_match_scans_in_catalog_order() {
        let catalog = catalog_fixture();
        let product = catalog.find_fuzzy("піца").expect("substring should match");
        assert_eq!(product.name, "Піца Маргарита");
        assert!(catalog.find_fuzzy("суші").is_none());
    }

    #[test]
    fn blank_query_never_matches_fuzzily() {
        let catalog = catalog_fixture();
        assert!(catalog.find_fuzzy("   ").is_none());
    }

    #[test]
    fn list_first_truncates_silently() {
        let catalog = catalog_fixture();
        assert_eq!(catalog.list_first(2).count(), 2);
        assert_eq!(catalog.list_first(100).count(), 4);
    }

    #[test]
    fn load_degrades_to_empty_catalog_for_missing_file() {
        let dir = TempDir::new().expect("temp dir");
        let catalog = Catalog::load(&dir.path().join("missing.json"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn load_degrades_to_empty_catalog_for_malformed_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("products.json");
        fs::write(&path, r#"[{"price": "150"}]"#).expect("write fixture");

        assert!(matches!(Catalog::try_load(&path), Err(MenuError::Parse { .. })));
        assert!(Catalog::load(&path).is_empty());
    }

    #[test]
    fn load_keeps_ingestion_order() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("products.json");
        fs::write(
            &path,
            r#"[
                {"name": "Чотири сири", "price": "210", "ingredients": ["моцарела", "дорблю"]},
                {"name": "Гавайська", "price": "від 175", "ingredients": []}
            ]"#,
        )
        .expect("write fixture");

        let catalog = Catalog::load(&path);
        assert_eq!(catalog.names(), vec!["Чотири сири".to_string(), "Гавайська".to_string()]);
    }
}
