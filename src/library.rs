//! The playlist: an ordered, capped list of documents plus the active index.
//!
//! The active index is the only record of which document playback is on, so
//! every mutation here keeps it pointing at the same logical document.

use crate::chunker;
use crate::config::{AppConfig, OverflowPolicy};
use crate::error::{ReaderError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    name: String,
    full_text: String,
    chunks: Vec<String>,
    processed: bool,
    serial: u64,
}

impl Document {
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Chunks computed so far; empty until [`Document::ensure_chunked`] runs.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// Chunk the text on first access; later calls return the cached chunks.
    pub fn ensure_chunked(&mut self, limit: usize) -> &[String] {
        if !self.processed {
            self.chunks = chunker::chunk(&self.full_text, limit);
            self.processed = true;
            debug!(
                id = %self.id,
                chunks = self.chunks.len(),
                limit,
                "Chunked document"
            );
        }
        &self.chunks
    }
}

/// Text waiting to be inserted; the library assigns identity on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub name: String,
    pub text: String,
}

impl NewDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Paste and URL ingestion.
    Front,
    /// File uploads keep their batch order.
    Back,
}

/// Outcome of an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inserted {
    pub index: usize,
    pub evicted: Option<DocumentId>,
}

/// Outcome of a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub id: DocumentId,
    pub was_active: bool,
}

#[derive(Debug, Clone)]
pub struct Library {
    documents: Vec<Document>,
    active: Option<usize>,
    capacity: usize,
    overflow: OverflowPolicy,
    next_serial: u64,
}

impl Default for Library {
    fn default() -> Self {
        Self::new(50, OverflowPolicy::EvictOldest)
    }
}

impl From<&AppConfig> for Library {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.max_documents, config.overflow)
    }
}

impl Library {
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            documents: Vec::new(),
            active: None,
            capacity: capacity.max(1),
            overflow,
            next_serial: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Number of documents a batch may add before the cap is reached.
    pub fn remaining_room(&self) -> usize {
        self.capacity.saturating_sub(self.documents.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Document> {
        self.documents.get_mut(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Document> {
        self.active.and_then(|idx| self.documents.get(idx))
    }

    pub fn active_mut(&mut self) -> Option<&mut Document> {
        self.active.and_then(|idx| self.documents.get_mut(idx))
    }

    pub fn position_of(&self, id: &DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| &doc.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.documents.iter().position(|doc| doc.name == name)
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.active = Some(index);
        Ok(())
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn add_document(&mut self, doc: NewDocument, position: InsertPosition) -> Result<Inserted> {
        if self.documents.len() >= self.capacity && self.overflow == OverflowPolicy::Reject {
            warn!(capacity = self.capacity, name = %doc.name, "Library full; rejecting document");
            return Err(ReaderError::LibraryFull {
                capacity: self.capacity,
            });
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        let document = Document {
            id: document_id(serial, &doc.name, &doc.text),
            name: doc.name,
            full_text: doc.text,
            chunks: Vec::new(),
            processed: false,
            serial,
        };
        let id = document.id.clone();

        let mut index = match position {
            InsertPosition::Front => {
                self.documents.insert(0, document);
                if let Some(active) = self.active.as_mut() {
                    *active += 1;
                }
                0
            }
            InsertPosition::Back => {
                self.documents.push(document);
                self.documents.len() - 1
            }
        };

        let mut evicted = None;
        if self.documents.len() > self.capacity {
            let Some(victim) = self.eviction_victim(index) else {
                self.documents.remove(index);
                if position == InsertPosition::Front {
                    if let Some(active) = self.active.as_mut() {
                        *active -= 1;
                    }
                }
                return Err(ReaderError::LibraryFull {
                    capacity: self.capacity,
                });
            };
            let removed = self.remove_at(victim);
            if victim < index {
                index -= 1;
            }
            info!(evicted = %removed.id, "Evicted oldest document to stay under capacity");
            evicted = Some(removed.id);
        }

        info!(%id, index, total = self.documents.len(), "Added document");
        Ok(Inserted { index, evicted })
    }

    /// Remove a document. Callers stop playback first when it is the active one.
    pub fn remove_document(&mut self, index: usize) -> Result<Removed> {
        self.check_index(index)?;
        let removed = self.remove_at(index);
        info!(id = %removed.id, index, "Removed document");
        Ok(removed)
    }

    /// Move a document; the active index keeps following the same document.
    pub fn reorder(&mut self, old_index: usize, new_index: usize) -> Result<()> {
        self.check_index(old_index)?;
        self.check_index(new_index)?;
        if old_index == new_index {
            return Ok(());
        }

        let doc = self.documents.remove(old_index);
        self.documents.insert(new_index, doc);

        if let Some(active) = self.active {
            self.active = Some(if active == old_index {
                new_index
            } else if old_index < active && new_index >= active {
                active - 1
            } else if old_index > active && new_index <= active {
                active + 1
            } else {
                active
            });
        }
        debug!(old_index, new_index, active = ?self.active, "Reordered library");
        Ok(())
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.active = None;
        info!("Cleared library");
    }

    fn remove_at(&mut self, index: usize) -> Removed {
        let doc = self.documents.remove(index);
        let was_active = self.active == Some(index);
        self.active = match self.active {
            Some(active) if active == index => None,
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        Removed {
            id: doc.id,
            was_active,
        }
    }

    /// Oldest-inserted document that is neither active nor the one just added.
    fn eviction_victim(&self, just_added: usize) -> Option<usize> {
        self.documents
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != just_added && Some(*idx) != self.active)
            .min_by_key(|(_, doc)| doc.serial)
            .map(|(idx, _)| idx)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.documents.len() {
            Ok(())
        } else {
            Err(ReaderError::IndexOutOfRange {
                index,
                len: self.documents.len(),
            })
        }
    }
}

fn document_id(serial: u64, name: &str, text: &str) -> DocumentId {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    DocumentId(format!("doc-{serial}-{}", &digest[..12]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_with(names: &[&str]) -> Library {
        let mut library = Library::new(10, OverflowPolicy::EvictOldest);
        for name in names {
            library
                .add_document(NewDocument::new(*name, format!("Text of {name}.")), InsertPosition::Back)
                .expect("room");
        }
        library
    }

    fn names(library: &Library) -> Vec<&str> {
        library.iter().map(Document::name).collect()
    }

    #[test]
    fn front_and_back_insertion() {
        let mut library = library_with(&["a", "b"]);
        let inserted = library
            .add_document(NewDocument::new("pasted", "x"), InsertPosition::Front)
            .expect("room");
        assert_eq!(inserted.index, 0);
        assert_eq!(names(&library), vec!["pasted", "a", "b"]);
    }

    #[test]
    fn ids_are_unique_even_for_identical_content() {
        let library = library_with(&["same", "same"]);
        assert_ne!(library.get(0).unwrap().id(), library.get(1).unwrap().id());
    }

    #[test]
    fn front_insert_shifts_active_index() {
        let mut library = library_with(&["a", "b"]);
        library.set_active(1).unwrap();
        library
            .add_document(NewDocument::new("new", "x"), InsertPosition::Front)
            .unwrap();
        assert_eq!(library.active().unwrap().name(), "b");
        assert_eq!(library.active_index(), Some(2));
    }

    #[test]
    fn overflow_evicts_oldest_non_active() {
        let mut library = Library::new(3, OverflowPolicy::EvictOldest);
        for name in ["a", "b", "c"] {
            library
                .add_document(NewDocument::new(name, "t"), InsertPosition::Front)
                .unwrap();
        }
        assert_eq!(names(&library), vec!["c", "b", "a"]);
        library.set_active(2).unwrap();

        let inserted = library
            .add_document(NewDocument::new("d", "t"), InsertPosition::Front)
            .unwrap();
        assert_eq!(names(&library), vec!["d", "c", "a"]);
        assert_eq!(inserted.index, 0);
        assert!(inserted.evicted.is_some());
        assert_eq!(library.active().unwrap().name(), "a");
    }

    #[test]
    fn overflow_reject_policy_keeps_library_intact() {
        let mut library = Library::new(2, OverflowPolicy::Reject);
        library.add_document(NewDocument::new("a", "t"), InsertPosition::Back).unwrap();
        library.add_document(NewDocument::new("b", "t"), InsertPosition::Back).unwrap();
        let err = library
            .add_document(NewDocument::new("c", "t"), InsertPosition::Back)
            .unwrap_err();
        assert_eq!(err, ReaderError::LibraryFull { capacity: 2 });
        assert_eq!(names(&library), vec!["a", "b"]);
    }

    #[test]
    fn remove_shifts_active_and_clears_when_active_removed() {
        let mut library = library_with(&["a", "b", "c"]);
        library.set_active(2).unwrap();
        let removed = library.remove_document(0).unwrap();
        assert!(!removed.was_active);
        assert_eq!(library.active_index(), Some(1));
        assert_eq!(library.active().unwrap().name(), "c");

        let removed = library.remove_document(1).unwrap();
        assert!(removed.was_active);
        assert_eq!(library.active_index(), None);
    }

    #[test]
    fn out_of_range_operations_fail_without_changes() {
        let mut library = library_with(&["a", "b"]);
        library.set_active(0).unwrap();
        assert_eq!(
            library.remove_document(5).unwrap_err(),
            ReaderError::IndexOutOfRange { index: 5, len: 2 }
        );
        assert!(library.reorder(0, 9).is_err());
        assert!(library.set_active(2).is_err());
        assert_eq!(names(&library), vec!["a", "b"]);
        assert_eq!(library.active_index(), Some(0));
    }

    #[test]
    fn reorder_tracks_active_document() {
        let mut library = library_with(&["a", "b", "c"]);
        library.set_active(0).unwrap();
        library.reorder(0, 2).unwrap();
        assert_eq!(names(&library), vec!["b", "c", "a"]);
        assert_eq!(library.active().unwrap().name(), "a");

        // Moving another document across the active one shifts it.
        library.reorder(0, 2).unwrap();
        assert_eq!(names(&library), vec!["c", "a", "b"]);
        assert_eq!(library.active().unwrap().name(), "a");

        library.reorder(2, 0).unwrap();
        assert_eq!(names(&library), vec!["b", "c", "a"]);
        assert_eq!(library.active().unwrap().name(), "a");

        // Moves that do not cross it leave it alone.
        library.reorder(0, 1).unwrap();
        assert_eq!(library.active_index(), Some(2));
    }

    #[test]
    fn chunking_is_lazy_and_cached() {
        let mut library = library_with(&["a"]);
        let doc = library.get_mut(0).unwrap();
        assert!(!doc.is_processed());
        assert!(doc.chunks().is_empty());
        let first = doc.ensure_chunked(500).to_vec();
        assert_eq!(first, vec!["Text of a.".to_string()]);
        assert!(doc.is_processed());
        assert_eq!(doc.ensure_chunked(1), first.as_slice());
    }

    #[test]
    fn clear_drops_everything() {
        let mut library = library_with(&["a", "b"]);
        library.set_active(1).unwrap();
        library.clear();
        assert!(library.is_empty());
        assert_eq!(library.active_index(), None);
    }
}
