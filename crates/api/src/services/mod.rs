//! Core business logic.
//!
//! - [`catalog`] - browse/search/filter query engine plus product CRUD
//! - [`reviews`] - the review ledger (one review per author per product)
//! - [`checkout`] - cart totals, gateway sales, order persistence

pub mod catalog;
pub mod checkout;
pub mod reviews;

pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use reviews::ReviewLedger;
