use serde::{Deserialize, Serialize};

use crate::menu::price::parse_price;

/// A menu entry as produced by menu ingestion.
///
/// `price` is kept verbatim; the numeric value is derived on demand with
/// [`parse_price`] so that receipts and menu listings agree on the source text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: impl Into<String>) -> Self {
        Self { name: name.into(), price: price.into(), ingredients: Vec::new() }
    }

    pub fn with_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn unit_price(&self) -> u64 {
        parse_price(&self.price)
    }
}
