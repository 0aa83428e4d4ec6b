//! Provider tables and their builders (CSV, ELF)
//!
//! A provider is the set of literal message templates of one firmware
//! library. Builders turn a provider source into a [`LiteralTable`]; the
//! decoder files each table under the library id the caller assigned to that
//! source.

use crate::types::{LibraryId, RecordKey};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

pub mod csv;
pub mod elf;

pub use csv::SptLiteral;
pub use elf::IclLiteral;

/// Literals of one provider, by record key
pub type LiteralTable<L> = BTreeMap<RecordKey, L>;

/// Insert a literal unless its key is already taken
///
/// Returns false when the key was present; the first definition always wins.
pub(crate) fn insert_first<L>(table: &mut LiteralTable<L>, key: RecordKey, literal: L) -> bool {
    match table.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(literal);
            true
        }
        Entry::Occupied(_) => false,
    }
}

/// Why a record could not be resolved to a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// The header failed the format's validity check
    InvalidHeader,
    /// No provider was loaded for the record's library id
    UnknownLibrary(LibraryId),
    /// The provider has no literal for the record's key
    UnknownKey(LibraryId, RecordKey),
}

/// All provider tables of a decoding run, by library id
///
/// Built once before decoding and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderTables<L> {
    libraries: BTreeMap<LibraryId, LiteralTable<L>>,
}

impl<L> ProviderTables<L> {
    /// Create an empty set of tables
    pub fn new() -> Self {
        Self {
            libraries: BTreeMap::new(),
        }
    }

    /// File a provider table under `library_id`
    ///
    /// If the library already has a table, the two are merged and literals
    /// already present keep their first definition.
    pub fn insert_library(&mut self, library_id: LibraryId, table: LiteralTable<L>) {
        match self.libraries.entry(library_id) {
            Entry::Vacant(slot) => {
                slot.insert(table);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                let mut dropped = 0usize;
                for (key, literal) in table {
                    if !insert_first(existing, key, literal) {
                        dropped += 1;
                    }
                }
                if dropped > 0 {
                    log::debug!(
                        "Library {}: {} duplicate literals ignored while merging providers",
                        library_id,
                        dropped
                    );
                }
            }
        }
    }

    /// Table for one library
    pub fn library(&self, library_id: LibraryId) -> Option<&LiteralTable<L>> {
        self.libraries.get(&library_id)
    }

    /// Look up a literal
    pub fn resolve(&self, library_id: LibraryId, key: RecordKey) -> Result<&L, Unresolved> {
        self.libraries
            .get(&library_id)
            .ok_or(Unresolved::UnknownLibrary(library_id))?
            .get(&key)
            .ok_or(Unresolved::UnknownKey(library_id, key))
    }

    /// All library ids with a table, ascending
    pub fn library_ids(&self) -> Vec<LibraryId> {
        self.libraries.keys().copied().collect()
    }

    /// Table statistics
    pub fn stats(&self) -> ProviderStats {
        ProviderStats {
            num_libraries: self.libraries.len(),
            num_literals: self.libraries.values().map(|t| t.len()).sum(),
        }
    }
}

impl<L> Default for ProviderTables<L> {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider table statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    /// Number of libraries with a table
    pub num_libraries: usize,
    /// Total literals across all libraries
    pub num_literals: usize,
}
