//! Append-only store of `(subject, predicate, object)` facts.
//!
//! A [`KnowledgeGraph`] is created in one of two encodings, fixed for its
//! lifetime by [`GraphConfig::quantized`]:
//!
//! - **plain**: every fact owns its three strings;
//! - **quantized**: subjects and objects are interned into one entity table,
//!   predicates into a relation table, and each fact is three 32-bit ids.
//!
//! The encoding only changes [`memory_usage_bytes`][KnowledgeGraph::memory_usage_bytes].
//! Every query answers the same in both modes, duplicates included.

use std::collections::HashSet;
use std::fmt;
use std::mem::size_of;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::symbol::SymbolTable;
use crate::types::{EntityId, RelationId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphConfig {
    /// Intern symbols and store facts as id triples.
    pub quantized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Fact {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

#[derive(Debug, Clone)]
enum Storage {
    Plain(Vec<Fact>),
    Quantized {
        entities: SymbolTable<EntityId>,
        relations: SymbolTable<RelationId>,
        triples: Vec<(EntityId, RelationId, EntityId)>,
    },
}

impl Storage {
    fn empty(config: &GraphConfig) -> Self {
        match config.quantized {
            true => Storage::Quantized {
                entities: SymbolTable::new(),
                relations: SymbolTable::new(),
                triples: Vec::new(),
            },
            false => Storage::Plain(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    config: GraphConfig,
    storage: Storage,
    disposed: bool,
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl KnowledgeGraph {
    pub fn new(config: GraphConfig) -> Self {
        debug!("new knowledge graph (quantized = {})", config.quantized);
        let storage = Storage::empty(&config);
        Self {
            config,
            storage,
            disposed: false,
        }
    }

    pub fn plain() -> Self {
        Self::new(GraphConfig { quantized: false })
    }

    pub fn quantized() -> Self {
        Self::new(GraphConfig { quantized: true })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn is_quantized(&self) -> bool {
        self.config.quantized
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            warn!("KnowledgeGraph used after dispose");
            return Err(Error::Disposed {
                component: "KnowledgeGraph",
            });
        }
        Ok(())
    }

    /// Appends a fact. Duplicates are kept and counted.
    pub fn add_fact(&mut self, subject: &str, predicate: &str, object: &str) -> Result<()> {
        self.ensure_live()?;
        match &mut self.storage {
            Storage::Plain(facts) => facts.push(Fact::new(subject, predicate, object)),
            Storage::Quantized {
                entities,
                relations,
                triples,
            } => {
                let s = entities.intern(subject);
                let p = relations.intern(predicate);
                let o = entities.intern(object);
                triples.push((s, p, o));
            }
        }
        Ok(())
    }

    pub fn fact_count(&self) -> Result<usize> {
        self.ensure_live()?;
        Ok(match &self.storage {
            Storage::Plain(facts) => facts.len(),
            Storage::Quantized { triples, .. } => triples.len(),
        })
    }

    /// Drops every fact and interned symbol. The graph stays usable.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_live()?;
        debug!("clearing knowledge graph");
        match &mut self.storage {
            Storage::Plain(facts) => *facts = Vec::new(),
            Storage::Quantized {
                entities,
                relations,
                triples,
            } => {
                entities.clear();
                relations.clear();
                *triples = Vec::new();
            }
        }
        Ok(())
    }

    /// Number of distinct strings used as subject or object.
    pub fn entity_count(&self) -> Result<usize> {
        self.ensure_live()?;
        Ok(match &self.storage {
            Storage::Plain(facts) => facts
                .iter()
                .flat_map(|f| [f.subject.as_str(), f.object.as_str()])
                .collect::<HashSet<_>>()
                .len(),
            Storage::Quantized { entities, .. } => entities.len(),
        })
    }

    /// Number of distinct predicates.
    pub fn relation_count(&self) -> Result<usize> {
        self.ensure_live()?;
        Ok(match &self.storage {
            Storage::Plain(facts) => facts.iter().map(|f| f.predicate.as_str()).collect::<HashSet<_>>().len(),
            Storage::Quantized { relations, .. } => relations.len(),
        })
    }

    pub fn has_entity(&self, name: &str) -> Result<bool> {
        self.ensure_live()?;
        Ok(match &self.storage {
            Storage::Plain(facts) => facts.iter().any(|f| f.subject == name || f.object == name),
            Storage::Quantized { entities, .. } => entities.get(name).is_some(),
        })
    }

    pub fn contains(&self, subject: &str, predicate: &str, object: &str) -> Result<bool> {
        self.ensure_live()?;
        Ok(match &self.storage {
            Storage::Plain(facts) => facts
                .iter()
                .any(|f| f.subject == subject && f.predicate == predicate && f.object == object),
            Storage::Quantized {
                entities,
                relations,
                triples,
            } => match (entities.get(subject), relations.get(predicate), entities.get(object)) {
                (Some(s), Some(p), Some(o)) => triples.contains(&(s, p, o)),
                _ => false,
            },
        })
    }

    /// Objects `o` of every fact `(subject, predicate, o)`, in insertion order.
    pub fn objects(&self, subject: &str, predicate: &str) -> Result<Vec<String>> {
        self.ensure_live()?;
        Ok(match &self.storage {
            Storage::Plain(facts) => facts
                .iter()
                .filter(|f| f.subject == subject && f.predicate == predicate)
                .map(|f| f.object.clone())
                .collect(),
            Storage::Quantized {
                entities,
                relations,
                triples,
            } => {
                let (Some(s), Some(p)) = (entities.get(subject), relations.get(predicate)) else {
                    return Ok(Vec::new());
                };
                triples
                    .iter()
                    .filter(|&&(ts, tp, _)| ts == s && tp == p)
                    .filter_map(|&(_, _, o)| entities.resolve(o))
                    .map(str::to_string)
                    .collect()
            }
        })
    }

    /// Subjects `s` of every fact `(s, predicate, object)`, in insertion order.
    pub fn subjects(&self, predicate: &str, object: &str) -> Result<Vec<String>> {
        self.ensure_live()?;
        Ok(match &self.storage {
            Storage::Plain(facts) => facts
                .iter()
                .filter(|f| f.predicate == predicate && f.object == object)
                .map(|f| f.subject.clone())
                .collect(),
            Storage::Quantized {
                entities,
                relations,
                triples,
            } => {
                let (Some(p), Some(o)) = (relations.get(predicate), entities.get(object)) else {
                    return Ok(Vec::new());
                };
                triples
                    .iter()
                    .filter(|&&(_, tp, to)| tp == p && to == o)
                    .filter_map(|&(s, _, _)| entities.resolve(s))
                    .map(str::to_string)
                    .collect()
            }
        })
    }

    /// All facts in insertion order.
    pub fn facts(&self) -> Result<Vec<Fact>> {
        self.ensure_live()?;
        Ok(match &self.storage {
            Storage::Plain(facts) => facts.clone(),
            Storage::Quantized {
                entities,
                relations,
                triples,
            } => triples
                .iter()
                .filter_map(|&(s, p, o)| {
                    Some(Fact::new(entities.resolve(s)?, relations.resolve(p)?, entities.resolve(o)?))
                })
                .collect(),
        })
    }

    /// Estimated heap footprint of the stored facts. Zero after dispose.
    pub fn memory_usage_bytes(&self) -> usize {
        match &self.storage {
            Storage::Plain(facts) => {
                let strings: usize = facts
                    .iter()
                    .map(|f| f.subject.capacity() + f.predicate.capacity() + f.object.capacity())
                    .sum();
                facts.capacity() * size_of::<Fact>() + strings
            }
            Storage::Quantized {
                entities,
                relations,
                triples,
            } => {
                triples.capacity() * size_of::<(EntityId, RelationId, EntityId)>()
                    + entities.memory_usage_bytes()
                    + relations.memory_usage_bytes()
            }
        }
    }

    /// Releases all facts and symbols. Safe to call more than once; every
    /// later operation returns [`Error::Disposed`].
    pub fn dispose(&mut self) {
        if !self.disposed {
            debug!("disposing knowledge graph");
        }
        self.storage = Storage::empty(&self.config);
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
