//! Category domain type.

use serde::{Deserialize, Serialize};

use greenbasket_core::{CategoryId, Slug};

/// A product category.
///
/// Referenced (not owned) by products. Long-lived; products resolve their
/// category to this full record in every listing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique category ID.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// URL-safe identifier derived from the name.
    pub slug: Slug,
}
