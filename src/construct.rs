// used for atomic publication of database snapshots
use arc_swap::ArcSwap;

// maps and sets keyed by ids, names and values
use core::hash::BuildHasherDefault;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use seahash::SeaHasher;

// used to print out readable forms of a construct
use std::fmt;
// used when parsing a cardinality tag
use std::str::FromStr;

use tracing::{debug, trace};

// our own stuff that we need
use crate::datatype::{LogicalTime, Value, ValueKind};
use crate::error::{FactumError, Result};
use crate::index::{Component, Index, IndexKind};
use crate::storage::{InMemoryStorage, Storage};

// ------------- EntityId -------------
pub type EntityId = u64;

pub type IdHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

// ------------- Cardinality -------------
/// Whether an attribute holds one value or accumulates a set of them.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Cardinality {
    Single,
    Multiple,
}

impl FromStr for Cardinality {
    type Err = FactumError;
    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "single" => Ok(Cardinality::Single),
            "multiple" => Ok(Cardinality::Multiple),
            other => Err(FactumError::InvalidCardinality(other.to_owned())),
        }
    }
}
impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cardinality::Single => write!(f, "single"),
            Cardinality::Multiple => write!(f, "multiple"),
        }
    }
}

// ------------- Attribute -------------
/// A named, typed, cardinality-constrained value holder. The two most recent
/// write times are retained so that a value's history can be walked without
/// visiting every layer in between.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Attribute {
    name: String,
    values: HashSet<Value, OtherHasher>,
    kind: ValueKind,
    cardinality: Cardinality,
    ts: Option<LogicalTime>,
    prev_ts: Option<LogicalTime>,
}

impl Attribute {
    pub fn new(
        name: impl Into<String>,
        value: Value,
        kind: ValueKind,
        cardinality: Cardinality,
    ) -> Self {
        let mut values = HashSet::default();
        values.insert(value);
        Self {
            name: name.into(),
            values,
            kind,
            cardinality,
            ts: None,
            prev_ts: None,
        }
    }
    // It's intentional to encapsulate the fields and only expose "getters",
    // because this yields true immutability for constructs after creation.
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
    /// The logical time of the most recent write, once there has been one.
    pub fn ts(&self) -> Option<LogicalTime> {
        self.ts
    }
    /// The logical time of the write before that.
    pub fn prev_ts(&self) -> Option<LogicalTime> {
        self.prev_ts
    }
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }
    /// The held value. Under `Multiple` cardinality an arbitrary element of
    /// the set is returned; use [`Attribute::values`] there instead.
    pub fn value(&self) -> Option<&Value> {
        self.values.iter().next()
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn stamped(&self, at: LogicalTime) -> Self {
        Self {
            ts: Some(at),
            prev_ts: self.ts,
            ..self.clone()
        }
    }
    fn merged(&self, incoming: &Attribute) -> Self {
        let mut next = self.clone();
        for value in incoming.values() {
            next.values.insert(value.clone());
        }
        next
    }
    fn replaced(&self, value: Value) -> Self {
        let mut next = self.clone();
        next.values.clear();
        next.values.insert(value);
        next
    }
    fn accumulated(&self, value: Value) -> Self {
        let mut next = self.clone();
        next.values.insert(value);
        next
    }
}
impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut values = String::new();
        for value in self.values() {
            values += &(value.to_string() + ",");
        }
        values.pop();
        write!(f, "{} {{{}}}::<{}>", self.name, values, self.kind)
    }
}

// ------------- Entity -------------
/// An identifier plus a mapping from attribute name to attribute. The id is
/// `None` until the database allocates one.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Entity {
    id: Option<EntityId>,
    attrs: HashMap<String, Attribute, OtherHasher>,
}

impl Entity {
    /// A placeholder entity: attributes without an assigned id.
    pub fn new(attributes: Vec<Attribute>) -> Self {
        let mut attrs = HashMap::default();
        for attribute in attributes {
            attrs.insert(attribute.name().to_owned(), attribute);
        }
        Self { id: None, attrs }
    }
    /// A fresh, empty entity under an allocated id.
    pub fn with_id(id: EntityId) -> Self {
        Self {
            id: Some(id),
            attrs: HashMap::default(),
        }
    }
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(name)
    }
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.values()
    }
    pub fn len(&self) -> usize {
        self.attrs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
    /// The facts this entity contributes: one datom per attribute value.
    /// A placeholder entity contributes none.
    pub fn datoms(&self) -> impl Iterator<Item = Datom> + '_ {
        self.id.into_iter().flat_map(move |id| {
            self.attrs.values().flat_map(move |attribute| {
                attribute
                    .values()
                    .map(move |value| Datom::new(id, attribute.name(), value.clone()))
            })
        })
    }

    fn with_attribute(&self, attribute: Attribute) -> Self {
        let mut next = self.clone();
        next.attrs.insert(attribute.name().to_owned(), attribute);
        next
    }
    fn without_attribute(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.attrs.remove(name);
        next
    }
}

// ------------- Datom -------------
/// A single fact, derived from an entity's attribute map rather than stored
/// as its own record. The unit the index layer reasons about.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Datom {
    entity: EntityId,
    attribute: String,
    value: Value,
}

impl Datom {
    pub fn new(entity: EntityId, attribute: impl Into<String>, value: Value) -> Self {
        Self {
            entity,
            attribute: attribute.into(),
            value,
        }
    }
    pub fn entity(&self) -> EntityId {
        self.entity
    }
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
    pub fn value(&self) -> &Value {
        &self.value
    }
    /// The canonical (entity, attribute, value) triple.
    pub fn into_components(self) -> [Component; 3] {
        [
            Component::Entity(self.entity),
            Component::Attribute(self.attribute),
            Component::Value(self.value),
        ]
    }
    /// Rebuilds a datom from a canonical-order triple, as produced by
    /// [`IndexKind::to_canonical`].
    pub fn try_from_canonical(canonical: [Component; 3]) -> Result<Datom> {
        match canonical {
            [Component::Entity(entity), Component::Attribute(attribute), Component::Value(value)] => {
                Ok(Datom {
                    entity,
                    attribute,
                    value,
                })
            }
            [one, two, three] => Err(FactumError::Invariant(format!(
                "ill-typed canonical triple ({}, {}, {})",
                one, two, three
            ))),
        }
    }
}
impl fmt::Display for Datom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.entity,
            self.attribute,
            self.value.to_string() + "::<" + self.value.data_type() + ">"
        )
    }
}

// ------------- Layer -------------
/// One immutable snapshot of the entire entity store plus its four indexes,
/// tagged with the logical time it was created. Derived from its predecessor
/// by exactly one logical write; never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Layer<S: Storage = InMemoryStorage> {
    time: LogicalTime,
    storage: S,
    eavt: Index,
    avet: Index,
    veat: Index,
    vaet: Index,
}

impl<S: Storage> Layer<S> {
    /// The empty layer a database starts from, at time zero.
    pub fn genesis() -> Self {
        Self {
            time: 0,
            storage: S::default(),
            eavt: Index::new(IndexKind::Eavt),
            avet: Index::new(IndexKind::Avet),
            veat: Index::new(IndexKind::Veat),
            vaet: Index::new(IndexKind::Vaet),
        }
    }
    pub fn time(&self) -> LogicalTime {
        self.time
    }
    pub fn storage(&self) -> &S {
        &self.storage
    }
    pub fn eavt(&self) -> &Index {
        &self.eavt
    }
    pub fn avet(&self) -> &Index {
        &self.avet
    }
    pub fn veat(&self) -> &Index {
        &self.veat
    }
    pub fn vaet(&self) -> &Index {
        &self.vaet
    }
    /// Every datom visible at this layer, reconstructed from EAVT.
    pub fn datoms(&self) -> impl Iterator<Item = Result<Datom>> + '_ {
        self.eavt.datoms()
    }

    /// Adds an attribute to an entity, creating the entity when the id is not
    /// yet present. Adding to a name that already holds a value is only legal
    /// when both sides have `Multiple` cardinality; everything else is a
    /// `CardinalityViolation` (a single value is replaced, never added to).
    pub fn with_attribute(&self, id: EntityId, attribute: Attribute, at: LogicalTime) -> Result<Self> {
        let entity = match self.storage.get(id) {
            Ok(kept) => (*kept).clone(),
            Err(FactumError::NotFound(_)) => Entity::with_id(id),
            Err(error) => return Err(error),
        };
        let next_attribute = match entity.attr(attribute.name()) {
            None => attribute.stamped(at),
            Some(existing) => {
                if existing.cardinality() == Cardinality::Single
                    || attribute.cardinality() == Cardinality::Single
                {
                    return Err(FactumError::CardinalityViolation(format!(
                        "attribute {} of entity {} holds a single value and must be replaced, not added to",
                        attribute.name(),
                        id
                    )));
                }
                existing.merged(&attribute).stamped(at)
            }
        };
        let storage = self.storage.put(entity.with_attribute(next_attribute.clone()))?;
        Ok(Self {
            time: at,
            storage,
            eavt: self.eavt.with(id, &next_attribute),
            avet: self.avet.with(id, &next_attribute),
            veat: self.veat.with(id, &next_attribute),
            vaet: self.vaet.with(id, &next_attribute),
        })
    }

    /// The write behind `update-attribute`: replaces the value of a `Single`
    /// attribute, accumulates one more value under `Multiple`. Fails with
    /// `NotFound` when the entity or the attribute name does not exist.
    pub fn with_updated_value(
        &self,
        id: EntityId,
        name: &str,
        value: Value,
        at: LogicalTime,
    ) -> Result<Self> {
        let kept = self.storage.get(id)?;
        let existing = kept
            .attr(name)
            .ok_or_else(|| FactumError::NotFound(format!("attribute {} of entity {}", name, id)))?;
        let (next_attribute, retired) = match existing.cardinality() {
            Cardinality::Single => (
                existing.replaced(value).stamped(at),
                existing.values().cloned().collect::<Vec<_>>(),
            ),
            Cardinality::Multiple => (existing.accumulated(value).stamped(at), Vec::new()),
        };
        // retired values leave every index before the new value enters
        let reindexed = |index: &Index| {
            let mut next = index.clone();
            for old in &retired {
                next = next.without_value(id, existing, old);
            }
            next.with(id, &next_attribute)
        };
        let eavt = reindexed(&self.eavt);
        let avet = reindexed(&self.avet);
        let veat = reindexed(&self.veat);
        let vaet = reindexed(&self.vaet);
        let storage = self.storage.put(kept.with_attribute(next_attribute))?;
        Ok(Self {
            time: at,
            storage,
            eavt,
            avet,
            veat,
            vaet,
        })
    }

    /// Removes an attribute and its datoms from the entity and all four
    /// indexes. Fails with `NotFound` when the entity or the attribute name
    /// does not exist.
    pub fn without_attribute(&self, id: EntityId, name: &str, at: LogicalTime) -> Result<Self> {
        let kept = self.storage.get(id)?;
        let existing = kept
            .attr(name)
            .ok_or_else(|| FactumError::NotFound(format!("attribute {} of entity {}", name, id)))?;
        let storage = self.storage.put(kept.without_attribute(name))?;
        Ok(Self {
            time: at,
            storage,
            eavt: self.eavt.without(id, existing),
            avet: self.avet.without(id, existing),
            veat: self.veat.without(id, existing),
            vaet: self.vaet.without(id, existing),
        })
    }

    /// Removes the entity and every one of its datoms from all four indexes
    /// in one derived value, so readers observe either all of it or none.
    pub fn remove_entity(&self, id: EntityId, at: LogicalTime) -> Result<Self> {
        let kept = self.storage.get(id)?;
        let cleared = |index: &Index| {
            let mut next = index.clone();
            for attribute in kept.attributes() {
                next = next.without(id, attribute);
            }
            next
        };
        Ok(Self {
            time: at,
            storage: self.storage.remove(id),
            eavt: cleared(&self.eavt),
            avet: cleared(&self.avet),
            veat: cleared(&self.veat),
            vaet: cleared(&self.vaet),
        })
    }

    // entity creation starts from an empty entity so that an attributeless
    // create still lands in storage
    fn seeded(&self, id: EntityId, at: LogicalTime) -> Result<Self> {
        Ok(Self {
            time: at,
            storage: self.storage.put(Entity::with_id(id))?,
            eavt: self.eavt.clone(),
            avet: self.avet.clone(),
            veat: self.veat.clone(),
            vaet: self.vaet.clone(),
        })
    }
}

// ------------- Database -------------
#[derive(Debug)]
struct DatabaseState<S: Storage> {
    // ordered oldest first, append-only; position equals logical time
    layers: Vec<Arc<Layer<S>>>,
    top_id: EntityId,
    curr_time: LogicalTime,
}

impl<S: Storage> DatabaseState<S> {
    fn genesis() -> Self {
        Self {
            layers: vec![Arc::new(Layer::genesis())],
            top_id: 0,
            curr_time: 0,
        }
    }
    fn latest(&self) -> &Arc<Layer<S>> {
        self.layers.last().expect("the layer sequence is never empty")
    }
    fn layer_at(&self, time: LogicalTime) -> Result<Arc<Layer<S>>> {
        self.layers.get(time as usize).cloned().ok_or_else(|| {
            FactumError::OutOfRange(format!(
                "no layer at time {}, current time is {}",
                time, self.curr_time
            ))
        })
    }
    fn advanced(&self, layer: Layer<S>) -> Self {
        let mut layers = self.layers.clone();
        let curr_time = layer.time();
        layers.push(Arc::new(layer));
        Self {
            layers,
            top_id: self.top_id,
            curr_time,
        }
    }
}

/// An ordered sequence of layers behind an atomically swappable reference.
///
/// Readers load the current snapshot and work against immutable values, so
/// they never block and never observe a partially applied write. Writers
/// derive a full candidate state from a locally loaded snapshot and publish
/// it with compare-and-swap; losing the race means retrying from a fresh
/// snapshot. A failing write leaves the published state untouched.
pub struct Database<S: Storage = InMemoryStorage> {
    state: ArcSwap<DatabaseState<S>>,
}

impl<S: Storage> Database<S> {
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(DatabaseState::genesis()),
        }
    }

    /// The logical clock: the number of committed writes.
    pub fn curr_time(&self) -> LogicalTime {
        self.state.load().curr_time
    }
    /// The next unassigned entity id.
    pub fn top_id(&self) -> EntityId {
        self.state.load().top_id
    }
    pub fn latest(&self) -> Arc<Layer<S>> {
        Arc::clone(self.state.load().latest())
    }
    /// The layer whose timestamp equals `time`. Fails with `OutOfRange` when
    /// `time` exceeds the current logical time.
    pub fn as_of(&self, time: LogicalTime) -> Result<Arc<Layer<S>>> {
        self.state.load().layer_at(time)
    }

    /// Allocates an id, builds the entity attribute by attribute, and commits
    /// one new layer. Returns the newly minted id.
    pub fn create_entity(&self, attributes: Vec<Attribute>) -> Result<EntityId> {
        loop {
            let current = self.state.load_full();
            let id = current.top_id;
            let at = current.curr_time + 1;
            let mut layer = current.latest().seeded(id, at)?;
            for attribute in &attributes {
                layer = layer.with_attribute(id, attribute.clone(), at)?;
            }
            let mut next = current.advanced(layer);
            next.top_id = id + 1;
            if self.install(&current, next) {
                debug!(id, at, "entity created");
                return Ok(id);
            }
        }
    }

    /// Writes a new value for an existing attribute at the next logical time:
    /// replacement under `Single` cardinality, accumulation under `Multiple`.
    /// Returns the commit time.
    pub fn update_attribute(&self, id: EntityId, name: &str, value: Value) -> Result<LogicalTime> {
        loop {
            let current = self.state.load_full();
            let at = current.curr_time + 1;
            let layer = current
                .latest()
                .with_updated_value(id, name, value.clone(), at)?;
            if self.install(&current, current.advanced(layer)) {
                debug!(id, name, at, "attribute updated");
                return Ok(at);
            }
        }
    }

    /// Removes an attribute from an entity. Returns the commit time.
    pub fn remove_attribute(&self, id: EntityId, name: &str) -> Result<LogicalTime> {
        loop {
            let current = self.state.load_full();
            let at = current.curr_time + 1;
            let layer = current.latest().without_attribute(id, name, at)?;
            if self.install(&current, current.advanced(layer)) {
                debug!(id, name, at, "attribute removed");
                return Ok(at);
            }
        }
    }

    /// Removes an entity and all of its datoms. Returns the commit time.
    pub fn remove_entity(&self, id: EntityId) -> Result<LogicalTime> {
        loop {
            let current = self.state.load_full();
            let at = current.curr_time + 1;
            let layer = current.latest().remove_entity(id, at)?;
            if self.install(&current, current.advanced(layer)) {
                debug!(id, at, "entity removed");
                return Ok(at);
            }
        }
    }

    /// The value history of one attribute, newest first, read back through
    /// the `ts`/`prev_ts` chain against a single consistent snapshot. Each
    /// listed time is the layer at which that value set became current.
    pub fn evolution_of(&self, id: EntityId, name: &str) -> Result<Vec<(LogicalTime, Vec<Value>)>> {
        let current = self.state.load_full();
        let entity = current.latest().storage().get(id)?;
        let attribute = entity
            .attr(name)
            .ok_or_else(|| FactumError::NotFound(format!("attribute {} of entity {}", name, id)))?;
        let mut history = Vec::new();
        let mut cursor = attribute.ts();
        while let Some(at) = cursor {
            let layer = current.layer_at(at)?;
            let entity = layer.storage().get(id)?;
            let attribute = entity.attr(name).ok_or_else(|| {
                FactumError::Invariant(format!(
                    "attribute {} of entity {} missing from its own write layer {}",
                    name, id, at
                ))
            })?;
            history.push((at, attribute.values().cloned().collect()));
            cursor = attribute.prev_ts();
        }
        Ok(history)
    }

    fn install(&self, current: &Arc<DatabaseState<S>>, next: DatabaseState<S>) -> bool {
        let previous = self.state.compare_and_swap(current, Arc::new(next));
        let swapped = Arc::ptr_eq(&previous, current);
        if !swapped {
            trace!("lost the snapshot race, retrying from a fresh snapshot");
        }
        swapped
    }
}

impl<S: Storage> Default for Database<S> {
    fn default() -> Self {
        Self::new()
    }
}
