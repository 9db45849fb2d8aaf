//! Cart mutation, receipts and checkout.
//!
//! Every mutation of a session's cart or history goes through [`CartEngine`];
//! callers are expected to hold the session lock for the duration of a call.

mod engine;
mod receipt;

pub use engine::{AddOutcome, CartEngine};
pub use receipt::{build_receipt, Receipt};
