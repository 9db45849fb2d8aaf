//! Normalization of raw scraped menu cards into the ingestion format the
//! catalog loads.

use serde::{Deserialize, Serialize};

use crate::domain::product::Product;

pub const INGREDIENT_DELIMITER: char = '/';

/// A product card as scraped from the restaurant website.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMenuRecord {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price_text: String,
}

pub fn normalize_record(record: RawMenuRecord) -> Product {
    Product {
        name: record.title.trim().to_owned(),
        price: normalize_price_text(&record.price_text),
        ingredients: split_ingredients(&record.description),
    }
}

pub fn normalize_records(records: Vec<RawMenuRecord>) -> Vec<Product> {
    records
        .into_iter()
        .filter(|record| !record.title.trim().is_empty())
        .map(normalize_record)
        .collect()
}

pub fn split_ingredients(description: &str) -> Vec<String> {
    description
        .split(INGREDIENT_DELIMITER)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Drops the "від" ("from") qualifier the site prints in front of prices.
pub fn normalize_price_text(price_text: &str) -> String {
    price_text.trim().trim_matches(|ch| matches!(ch, 'в' | 'і' | 'д')).trim().to_owned()
}
