//! String interning for knowledge-graph symbols.

use std::collections::HashMap;
use std::mem::size_of;
use std::sync::Arc;

use crate::types::SymbolId;

/// Bidirectional map between strings and dense ids.
///
/// Ids are handed out in first-intern order starting from zero, so the id of
/// a symbol is also its slot in [`names`][Self::names]. The string data is
/// shared between both directions.
#[derive(Debug, Clone)]
pub struct SymbolTable<Id> {
    names: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, Id>,
}

impl<Id> Default for SymbolTable<Id> {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            ids: HashMap::new(),
        }
    }
}

impl<Id> SymbolTable<Id>
where
    Id: SymbolId,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `name`, assigning the next free one on first sight.
    pub fn intern(&mut self, name: &str) -> Id {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = Id::from_index(self.names.len());
        let name: Arc<str> = Arc::from(name);
        self.names.push(Arc::clone(&name));
        self.ids.insert(name, id);
        id
    }

    /// Id of an already-interned `name`.
    pub fn get(&self, name: &str) -> Option<Id> {
        self.ids.get(name).copied()
    }

    pub fn resolve(&self, id: Id) -> Option<&str> {
        self.names.get(id.index()).map(|name| name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.names = Vec::new();
        self.ids = HashMap::new();
    }

    /// Rough heap footprint: string bytes, the name vector and the map slots.
    pub fn memory_usage_bytes(&self) -> usize {
        let strings: usize = self.names.iter().map(|name| name.len() + 2 * size_of::<usize>()).sum();
        let names = self.names.capacity() * size_of::<Arc<str>>();
        let ids = self.ids.capacity() * (size_of::<Arc<str>>() + size_of::<Id>());
        strings + names + ids
    }
}
