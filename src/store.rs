//! Selection state for the concept/chapter hierarchy.
//!
//! Plain observable containers with no derived state: collections and their
//! slug-keyed lookup maps are populated by an external collaborator (the
//! content loader), while the selected-item slots and the map visibility
//! flag are driven by UI interactions.

use std::collections::HashMap;

use crate::models::{Chapter, Concept};
use crate::observable::Observable;

/// Observable UI selection state.
///
/// The two selections are independent: selecting a chapter never touches the
/// selected concept and vice versa, and both may be set at once.
#[derive(Debug, Default)]
pub struct SelectionStore {
    /// All concepts, in display order.
    pub concepts: Observable<Vec<Concept>>,
    /// All chapters, in display order.
    pub chapters: Observable<Vec<Chapter>>,
    /// Concepts keyed by slug; populated externally alongside `concepts`.
    pub concepts_by_slug: Observable<HashMap<String, Concept>>,
    /// Chapters keyed by slug; populated externally alongside `chapters`.
    pub chapters_by_slug: Observable<HashMap<String, Chapter>>,
    /// Whether the map view is visible.
    pub map_shown: Observable<bool>,
    /// Currently selected concept, if any.
    pub selected_concept: Observable<Option<Concept>>,
    /// Currently selected chapter, if any.
    pub selected_chapter: Observable<Option<Chapter>>,
}

impl SelectionStore {
    /// Create an empty store: no collections, nothing selected, map hidden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a concept.
    pub fn select_concept(&self, concept: Concept) {
        self.selected_concept.set(Some(concept));
    }

    /// Select a chapter.
    pub fn select_chapter(&self, chapter: Chapter) {
        self.selected_chapter.set(Some(chapter));
    }

    /// Return to the home view: clears the selected concept.
    ///
    /// The selected chapter is deliberately untouched.
    pub fn go_home(&self) {
        self.selected_concept.set(None);
    }
}
