use std::sync::Arc;

use tracing::debug;

use crate::cart::receipt::{build_receipt, Receipt};
use crate::domain::cart::{CartItemRequest, CartLine};
use crate::domain::session::Session;
use crate::menu::resolver::ProductResolver;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddOutcome {
    pub added: usize,
    pub dropped: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct CartEngine {
    resolver: ProductResolver,
}

impl CartEngine {
    pub fn new(resolver: ProductResolver) -> Self {
        Self { resolver }
    }

    /// Appends items in order. Names that resolve to nothing are dropped and
    /// reported in the outcome; they never abort the batch.
    pub fn add_items<I>(&self, session: &mut Session, items: I) -> AddOutcome
    where
        I: IntoIterator<Item = CartItemRequest>,
    {
        let mut outcome = AddOutcome::default();

        for item in items {
            match item {
                CartItemRequest::Inline(product) => {
                    session.cart.push(CartLine::Resolved(Arc::new(product)));
                    outcome.added += 1;
                }
                CartItemRequest::Name(raw_name) => match self.resolver.resolve(&raw_name) {
                    Some(product) => {
                        session.cart.push(CartLine::Resolved(product));
                        outcome.added += 1;
                    }
                    None => {
                        debug!(
                            event_name = "cart.item.unresolved",
                            raw_name = %raw_name,
                            "cart item matched no menu entry; dropping"
                        );
                        outcome.dropped.push(raw_name);
                    }
                },
            }
        }

        outcome
    }

    pub fn clear(&self, session: &mut Session) {
        session.cart.clear();
    }

    pub fn build_receipt(&self, session: &Session) -> Receipt {
        build_receipt(&session.cart)
    }

    /// Renders the receipt, moves every line's name into history and empties
    /// the cart.
    pub fn checkout(&self, session: &mut Session) -> Receipt {
        let receipt = build_receipt(&session.cart);
        let lines = session.cart.take_lines();
        session.extend_history(lines.iter().map(|line| line.display_name().to_owned()));
        receipt
    }
}
