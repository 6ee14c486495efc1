//! The four datom indexes.
//!
//! Every index stores the same universe of datoms, reordered on the way in by
//! a permutation from canonical `(entity, attribute, value)` order into the
//! index's storage order, and filtered by a usage predicate over the
//! attribute. Only four permutation/predicate pairs are ever needed, so the
//! configuration is the tagged [`IndexKind`] rather than a pair of closures:
//!
//! | kind | stored order | eligible |
//! |------|--------------|----------|
//! | EAVT | (E, A, V)    | always   |
//! | AVET | (A, V, E)    | always   |
//! | VEAT | (V, E, A)    | always   |
//! | VAET | (V, A, E)    | `ref`-typed attributes only |
//!
//! VAET answers "which entities reference this entity" without a scan, which
//! is why its predicate is a correctness invariant: a datom whose value is not
//! an entity id must never land there.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::construct::{Attribute, Datom, EntityId, OtherHasher};
use crate::datatype::Value;
use crate::error::Result;

// ------------- Component -------------
/// One datom component, the uniform key type of every index level.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum Component {
    Entity(EntityId),
    Attribute(String),
    Value(Value),
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Component::Entity(id) => write!(f, "{}", id),
            Component::Attribute(name) => write!(f, "{}", name),
            Component::Value(value) => write!(f, "{}", value),
        }
    }
}

// ------------- IndexKind -------------
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum IndexKind {
    Eavt,
    Avet,
    Veat,
    Vaet,
}

impl IndexKind {
    pub const ALL: [IndexKind; 4] = [
        IndexKind::Eavt,
        IndexKind::Avet,
        IndexKind::Veat,
        IndexKind::Vaet,
    ];

    /// Reorders a triple from canonical (entity, attribute, value) order into
    /// this index's storage order.
    pub fn to_stored(&self, canonical: [Component; 3]) -> [Component; 3] {
        let [e, a, v] = canonical;
        match self {
            IndexKind::Eavt => [e, a, v],
            IndexKind::Avet => [a, v, e],
            IndexKind::Veat => [v, e, a],
            IndexKind::Vaet => [v, a, e],
        }
    }

    /// The exact inverse of [`IndexKind::to_stored`].
    pub fn to_canonical(&self, stored: [Component; 3]) -> [Component; 3] {
        let [x, y, z] = stored;
        match self {
            IndexKind::Eavt => [x, y, z],
            IndexKind::Avet => [z, x, y],
            IndexKind::Veat => [y, z, x],
            IndexKind::Vaet => [z, y, x],
        }
    }

    /// The usage predicate: decides whether an attribute's datoms belong in
    /// this index at all.
    pub fn covers(&self, attribute: &Attribute) -> bool {
        match self {
            IndexKind::Vaet => attribute.kind().is_ref(),
            _ => true,
        }
    }
}
impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IndexKind::Eavt => write!(f, "EAVT"),
            IndexKind::Avet => write!(f, "AVET"),
            IndexKind::Veat => write!(f, "VEAT"),
            IndexKind::Vaet => write!(f, "VAET"),
        }
    }
}

// ------------- Index -------------
pub type Leaves = HashSet<Component, OtherHasher>;
pub type Branch = HashMap<Component, Arc<Leaves>, OtherHasher>;

/// A nested mapping of stored-order level-1 key to level-2 key to the set of
/// level-3 components. The inner levels are `Arc`-shared: cloning an index is
/// shallow and a derived index copies only the branches a write touches.
#[derive(Clone, Debug)]
pub struct Index {
    kind: IndexKind,
    root: HashMap<Component, Arc<Branch>, OtherHasher>,
}

impl Index {
    pub fn new(kind: IndexKind) -> Self {
        Self {
            kind,
            root: HashMap::default(),
        }
    }
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Returns a new index holding this attribute's datoms as well. Not
    /// covered by the predicate means unchanged; inserting an already present
    /// datom is a no-op.
    pub fn with(&self, entity: EntityId, attribute: &Attribute) -> Index {
        if !self.kind.covers(attribute) {
            return self.clone();
        }
        let mut next = self.clone();
        for value in attribute.values() {
            next.insert(Datom::new(entity, attribute.name(), value.clone()));
        }
        next
    }

    /// Symmetric removal of every datom the attribute holds.
    pub fn without(&self, entity: EntityId, attribute: &Attribute) -> Index {
        if !self.kind.covers(attribute) {
            return self.clone();
        }
        let mut next = self.clone();
        for value in attribute.values() {
            next.remove(&Datom::new(entity, attribute.name(), value.clone()));
        }
        next
    }

    /// Removal of one retired value, used when a single-cardinality attribute
    /// is replaced.
    pub fn without_value(&self, entity: EntityId, attribute: &Attribute, value: &Value) -> Index {
        if !self.kind.covers(attribute) {
            return self.clone();
        }
        let mut next = self.clone();
        next.remove(&Datom::new(entity, attribute.name(), value.clone()));
        next
    }

    fn insert(&mut self, datom: Datom) {
        let [level1, level2, level3] = self.kind.to_stored(datom.into_components());
        let branch = self
            .root
            .entry(level1)
            .or_insert_with(|| Arc::new(Branch::default()));
        let leaves = Arc::make_mut(branch)
            .entry(level2)
            .or_insert_with(|| Arc::new(Leaves::default()));
        Arc::make_mut(leaves).insert(level3);
    }

    fn remove(&mut self, datom: &Datom) {
        let [level1, level2, level3] = self.kind.to_stored(datom.clone().into_components());
        if let Some(branch) = self.root.get_mut(&level1) {
            let branch = Arc::make_mut(branch);
            if let Some(leaves) = branch.get_mut(&level2) {
                let leaves = Arc::make_mut(leaves);
                leaves.remove(&level3);
                // empty branches are pruned for memory economy
                if leaves.is_empty() {
                    branch.remove(&level2);
                }
            }
            if branch.is_empty() {
                self.root.remove(&level1);
            }
        }
    }

    /// The level-3 set under two stored-order keys, if any.
    pub fn leaves(&self, level1: &Component, level2: &Component) -> Option<&Leaves> {
        self.root
            .get(level1)
            .and_then(|branch| branch.get(level2))
            .map(|leaves| leaves.as_ref())
    }

    /// The level-2 mapping under a stored-order level-1 key, if any.
    pub fn branch(&self, level1: &Component) -> Option<&Branch> {
        self.root.get(level1).map(|branch| branch.as_ref())
    }

    pub fn contains(&self, datom: &Datom) -> bool {
        let [level1, level2, level3] = self.kind.to_stored(datom.clone().into_components());
        self.leaves(&level1, &level2)
            .is_some_and(|leaves| leaves.contains(&level3))
    }

    /// Walks the three levels and reconstructs every reachable datom through
    /// the inverse permutation.
    pub fn datoms(&self) -> impl Iterator<Item = Result<Datom>> + '_ {
        let kind = self.kind;
        self.root.iter().flat_map(move |(level1, branch)| {
            branch.iter().flat_map(move |(level2, leaves)| {
                leaves.iter().map(move |level3| {
                    Datom::try_from_canonical(kind.to_canonical([
                        level1.clone(),
                        level2.clone(),
                        level3.clone(),
                    ]))
                })
            })
        })
    }

    pub fn len(&self) -> usize {
        self.root
            .values()
            .flat_map(|branch| branch.values())
            .map(|leaves| leaves.len())
            .sum()
    }
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}
