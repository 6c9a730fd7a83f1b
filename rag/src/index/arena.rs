//! Slot arena mapping public document ids to stable integer labels.

use std::collections::HashMap;

use crate::types::Document;

/// Dense array of document slots addressed by `u32` labels.
///
/// Labels are handed out in insertion order and never reused within a generation, so a label
/// held by an index keeps pointing at the same document (or at a vacated slot) until
/// [`compact`](SlotArena::compact) starts a new generation.
#[derive(Debug, Clone, Default)]
pub struct SlotArena {
    slots: Vec<Option<Document>>,
    ids: HashMap<String, u32>,
    vacated: usize,
    generation: u64,
}

/// Outcome of [`SlotArena::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Label assigned to the new document.
    pub label: u32,
    /// Label of the slot vacated because the id was already present.
    pub replaced: Option<u32>,
}

impl SlotArena {
    /// Creates an empty arena at generation 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `document` in a fresh slot.
    ///
    /// An existing document with the same id is vacated first. Returns `None` when the label
    /// space is exhausted; nothing is modified in that case.
    pub fn insert(&mut self, document: Document) -> Option<Placement> {
        let label = u32::try_from(self.slots.len()).ok()?;
        let replaced = self.remove(&document.id).map(|(old, _)| old);
        self.ids.insert(document.id.clone(), label);
        self.slots.push(Some(document));
        Some(Placement { label, replaced })
    }

    /// Vacates the slot holding `id`.
    pub fn remove(&mut self, id: &str) -> Option<(u32, Document)> {
        let label = self.ids.remove(id)?;
        let document = self.slots.get_mut(label as usize)?.take()?;
        self.vacated += 1;
        Some((label, document))
    }

    /// Returns the document stored under `label`.
    #[must_use]
    pub fn get(&self, label: u32) -> Option<&Document> {
        self.slots.get(label as usize)?.as_ref()
    }

    /// Returns the document with public id `id`.
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&Document> {
        self.get(*self.ids.get(id)?)
    }

    /// Returns the label currently assigned to `id`.
    #[must_use]
    pub fn label_of(&self, id: &str) -> Option<u32> {
        self.ids.get(id).copied()
    }

    /// Raw slot view, vacated slots included.
    #[must_use]
    pub fn slots(&self) -> &[Option<Document>] {
        &self.slots
    }

    /// Iterates live documents with their labels in label order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Document)> {
        self.slots
            .iter()
            .zip(0_u32..)
            .filter_map(|(slot, label)| slot.as_ref().map(|doc| (label, doc)))
    }

    /// Number of live documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no document is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of slots vacated since the last compaction.
    #[must_use]
    pub const fn vacated(&self) -> usize {
        self.vacated
    }

    /// Current generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Moves live documents into slots `0..len` and starts a new generation.
    pub fn compact(&mut self) {
        let live: Vec<Document> = self.slots.drain(..).flatten().collect();
        self.ids.clear();
        for (label, document) in (0_u32..).zip(live) {
            self.ids.insert(document.id.clone(), label);
            self.slots.push(Some(document));
        }
        self.vacated = 0;
        self.generation += 1;
    }

    /// Drops every document and resets the generation.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
