use crate::domain::cart::Cart;
use crate::replies::{CART_EMPTY, CURRENCY, RECEIPT_HEADER};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub text: String,
    pub total: u64,
    pub item_count: usize,
}

impl Receipt {
    pub fn empty() -> Self {
        Self { text: CART_EMPTY.to_owned(), total: 0, item_count: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}

/// Renders the resolved lines of `cart`; unresolved lines neither print nor
/// count towards the total.
pub fn build_receipt(cart: &Cart) -> Receipt {
    let mut total = 0u64;
    let mut lines = Vec::new();

    for product in cart.resolved_items() {
        let price = product.unit_price();
        total = total.saturating_add(price);
        lines.push(format!("▫️ {} — {price} {CURRENCY}", product.name));
    }

    if lines.is_empty() {
        return Receipt::empty();
    }

    let text = format!(
        "{RECEIPT_HEADER}\n\n{}\n\n💰 ВСЬОГО ДО СПЛАТИ: {total} {CURRENCY}",
        lines.join("\n")
    );
    Receipt { text, total, item_count: lines.len() }
}
