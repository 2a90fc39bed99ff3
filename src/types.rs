//! Type-safe wrappers for formula variables and interned graph symbols.
//!
//! These newtypes keep variable indices, entity ids and relation ids from
//! being mixed up, even though all of them are plain integers underneath.
use std::fmt;

/// A formula variable index (0-indexed).
///
/// Variables are numbered in the order they first appear in a formula,
/// scanning left to right. This numbering is also the solver's branching
/// order, which is what makes models reproducible.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarId(u32);

impl VarId {
    /// Creates a variable id from its first-seen position.
    pub fn new(index: u32) -> Self {
        VarId(index)
    }

    /// Returns the position as a `usize`, for indexing assignment vectors.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<VarId> for u32 {
    fn from(var: VarId) -> Self {
        var.0
    }
}

/// An interned subject or object of a quantized knowledge graph.
///
/// Subjects and objects share one table, so an entity used in both positions
/// has a single id.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EntityId(u32);

/// An interned predicate of a quantized knowledge graph.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RelationId(u32);

/// Conversion between a symbol id and its slot in a symbol table.
pub trait SymbolId: Copy + Eq {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

impl SymbolId for EntityId {
    fn from_index(index: usize) -> Self {
        EntityId(index as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl SymbolId for RelationId {
    fn from_index(index: usize) -> Self {
        RelationId(index as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}
