use serde_json::Value;
use waiter_core::domain::cart::CartItemRequest;
use waiter_core::domain::product::Product;
use waiter_core::replies;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntentAction {
    #[default]
    Continue,
    Checkout,
}

impl IntentAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Checkout => "checkout",
        }
    }
}

/// Interpreter answer after every field has been narrowed to a safe default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentResponse {
    pub reply_text: String,
    pub cart_update: Vec<CartItemRequest>,
    pub action: IntentAction,
}

impl IntentResponse {
    /// Narrows an untrusted interpreter payload. Never fails: anything that
    /// does not have the expected shape falls back to its default.
    pub fn sanitize(value: &Value) -> Self {
        let reply_text = value
            .get("reply_text")
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| replies::ACKNOWLEDGED.to_owned());

        let cart_update = value
            .get("cart_update")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(sanitize_cart_entry).collect())
            .unwrap_or_default();

        let action = match value.get("action").and_then(Value::as_str) {
            Some(action) if action.trim().eq_ignore_ascii_case("checkout") => IntentAction::Checkout,
            _ => IntentAction::Continue,
        };

        Self { reply_text, cart_update, action }
    }

    pub fn fallback() -> Self {
        Self {
            reply_text: replies::INTERPRETER_ERROR.to_owned(),
            cart_update: Vec::new(),
            action: IntentAction::Continue,
        }
    }
}

fn sanitize_cart_entry(entry: &Value) -> Option<CartItemRequest> {
    match entry {
        Value::String(name) => Some(CartItemRequest::Name(name.clone())),
        Value::Object(record) => {
            let name = record.get("name").and_then(Value::as_str)?;
            let price = match record.get("price") {
                Some(Value::String(price)) => price.clone(),
                Some(Value::Number(price)) => price.to_string(),
                _ => "0".to_owned(),
            };
            let ingredients = record
                .get("ingredients")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).map(str::to_owned).collect())
                .unwrap_or_default();

            Some(CartItemRequest::Inline(Product {
                name: name.to_owned(),
                price,
                ingredients,
            }))
        }
        _ => None,
    }
}
