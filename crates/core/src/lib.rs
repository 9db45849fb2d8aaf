//! Order-taking core: menu catalog, name resolution, price parsing, carts,
//! receipts and per-user sessions.
//!
//! Nothing in this crate talks to the network. The language model, speech
//! recognizer and chat transport live in `waiter-agent` and `waiter-chat`.

pub mod cart;
pub mod config;
pub mod domain;
pub mod errors;
pub mod menu;
pub mod replies;
pub mod sessions;

pub use cart::{build_receipt, AddOutcome, CartEngine, Receipt};
pub use domain::cart::{Cart, CartItemRequest, CartLine};
pub use domain::product::Product;
pub use domain::session::{Session, TurnState, UserId};
pub use errors::ApplicationError;
pub use menu::{parse_price, Catalog, MenuError, ProductResolver};
pub use sessions::{SessionHandle, SessionStore};
