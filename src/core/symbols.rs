//! Per-connection string interning.
//!
//! A connection keeps two tables: one for indices it assigned while writing
//! and one mirroring the indices its peer assigned. The two numbering spaces
//! never mix. Index 0 is reserved as the "literal follows" marker, so the
//! first registered string gets index 1.

use std::collections::HashMap;

/// Bidirectional string ↔ index map that only ever grows.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    by_name: HashMap<String, u32>,
    by_index: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index previously assigned to `symbol`, if any.
    #[inline]
    pub fn lookup(&self, symbol: &str) -> Option<u32> {
        self.by_name.get(symbol).copied()
    }

    /// String registered under `index`, if any.
    #[inline]
    pub fn resolve(&self, index: u32) -> Option<&str> {
        let slot = index.checked_sub(1)? as usize;
        self.by_index.get(slot).map(String::as_str)
    }

    /// Register `symbol` under the next free index and return it.
    ///
    /// Registering a string twice keeps the first index.
    pub fn register(&mut self, symbol: &str) -> u32 {
        if let Some(index) = self.lookup(symbol) {
            return index;
        }
        self.by_index.push(symbol.to_owned());
        let index = self.by_index.len() as u32;
        self.by_name.insert(symbol.to_owned(), index);
        index
    }

    /// Append `symbol` under the next index unconditionally.
    ///
    /// Used for the peer's table, whose numbering must follow the literals
    /// exactly as they arrive. A repeated string keeps its first index for
    /// [`lookup`](Self::lookup) but still occupies a new slot.
    pub fn push(&mut self, symbol: &str) -> u32 {
        self.by_index.push(symbol.to_owned());
        let index = self.by_index.len() as u32;
        self.by_name.entry(symbol.to_owned()).or_insert(index);
        index
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}
