use std::sync::Arc;

use serde::Serialize;

use crate::domain::product::Product;

/// One entry of a cart, resolved once at the boundary where it entered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartLine {
    /// A raw name that did not match any catalog entry.
    Unresolved(String),
    Resolved(Arc<Product>),
}

impl CartLine {
    pub fn resolved(product: Product) -> Self {
        Self::Resolved(Arc::new(product))
    }

    pub fn product(&self) -> Option<&Product> {
        match self {
            Self::Resolved(product) => Some(product),
            Self::Unresolved(_) => None,
        }
    }

    /// Name recorded into history at checkout.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Resolved(product) => &product.name,
            Self::Unresolved(raw) => raw,
        }
    }
}

/// A cart change requested by the intent interpreter, already narrowed from
/// the untrusted payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartItemRequest {
    /// Raw product name; resolved against the catalog when applied.
    Name(String),
    /// Literal product record; trusted as-is.
    Inline(Product),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: CartLine) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn resolved_items(&self) -> impl Iterator<Item = &Product> {
        self.lines.iter().filter_map(CartLine::product)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub(crate) fn take_lines(&mut self) -> Vec<CartLine> {
        std::mem::take(&mut self.lines)
    }

    /// Plain-data view handed to the intent interpreter.
    pub fn snapshot(&self) -> Vec<CartSnapshotItem> {
        self.lines
            .iter()
            .map(|line| match line {
                CartLine::Resolved(product) => CartSnapshotItem::Item {
                    name: product.name.clone(),
                    price: product.price.clone(),
                },
                CartLine::Unresolved(raw) => CartSnapshotItem::Name(raw.clone()),
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CartSnapshotItem {
    Name(String),
    Item { name: String, price: String },
}
