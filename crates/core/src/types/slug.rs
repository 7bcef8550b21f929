//! URL-safe slugs derived from display names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A URL-safe identifier string derived from a display name.
///
/// Slugs are derived deterministically: the name is lowercased, runs of
/// non-alphanumeric characters collapse to a single `-`, and leading or
/// trailing separators are stripped. Derivation is idempotent, so re-slugging
/// a slug returns it unchanged.
///
/// Uniqueness is **not** enforced here; collisions are tolerated and resolve
/// last-write-wins at the store layer.
///
/// ## Examples
///
/// ```
/// use greenbasket_core::Slug;
///
/// assert_eq!(Slug::from_name("Cold Brew Kit").as_str(), "cold-brew-kit");
/// assert_eq!(Slug::from_name("  100% Arabica!  ").as_str(), "100-arabica");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a display name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut out = String::with_capacity(name.len());
        let mut pending_sep = false;

        for c in name.trim().chars() {
            if c.is_alphanumeric() {
                if pending_sep && !out.is_empty() {
                    out.push('-');
                }
                pending_sep = false;
                for lower in c.to_lowercase() {
                    out.push(lower);
                }
            } else {
                pending_sep = true;
            }
        }

        Self(out)
    }

    /// Wrap an already-derived slug, e.g. one read back from the store.
    #[must_use]
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
