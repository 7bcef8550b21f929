//! Domain types for the catalog and checkout backend.
//!
//! These types represent validated domain objects separate from database row
//! types. Listing projections ([`product::ProductSummary`]) deliberately have
//! no photo or reviews fields, so heavy payloads cannot leak into list
//! responses by construction.

pub mod category;
pub mod order;
pub mod product;
pub mod review;

pub use category::Category;
pub use order::{CartLineItem, CartProduct, NewOrder, Order};
pub use product::{Photo, ProductDetail, ProductInput, ProductRecord, ProductSummary};
pub use review::{Author, NewReview, Review, ReviewDetail};
