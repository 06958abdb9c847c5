use serde::{Deserialize, Serialize};

/// A concept in the content hierarchy (top level).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Concept {
    /// Backend identifier.
    pub id: i64,
    /// URL slug, unique across concepts; lookup maps key on it.
    pub slug: String,
    /// Display title.
    pub title: String,
}

impl Concept {
    /// Create a new concept.
    pub fn new(id: i64, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
            title: title.into(),
        }
    }
}

/// A chapter in the content hierarchy (belongs to a concept).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chapter {
    /// Backend identifier.
    pub id: i64,
    /// URL slug, unique across chapters; lookup maps key on it.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Slug of the concept this chapter belongs to.
    pub concept_slug: String,
}

impl Chapter {
    /// Create a new chapter.
    pub fn new(
        id: i64,
        slug: impl Into<String>,
        title: impl Into<String>,
        concept_slug: impl Into<String>,
    ) -> Self {
        Self {
            id,
            slug: slug.into(),
            title: title.into(),
            concept_slug: concept_slug.into(),
        }
    }
}
