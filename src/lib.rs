//! Factum – a layered, multi-indexed, temporally-versioned fact store.
//!
//! Factum centers on the *datom* concept: a fact of the form
//! `(entity id, attribute name, attribute value)`, where:
//! * A [`construct::EntityId`] is an opaque identity (a simple `u64`).
//! * An [`construct::Attribute`] is a named, typed, cardinality-constrained
//!   value holder that retains its two most recent write times.
//! * An [`construct::Entity`] is an id plus a mapping from attribute name to attribute.
//! * A [`construct::Datom`] is the derived triple the index layer reasons about.
//!
//! Writes never mutate anything in place. Each committed write derives one new
//! [`construct::Layer`] — a snapshot of the whole entity store plus its four
//! indexes, tagged with a logical time — and appends it to the
//! [`construct::Database`]'s layer sequence, so the state at any past moment
//! stays reconstructable through [`construct::Database::as_of`].
//!
//! ## Modules
//! * [`construct`] – Attributes, entities, datoms, layers and the database orchestrator.
//! * [`datatype`] – The typed values a datom can carry (string, numeric,
//!   temporal, JSON, decimal, entity references) and the logical clock.
//! * [`index`] – The shared index implementation and its four permutation/predicate
//!   configurations (EAVT, AVET, VEAT, VAET).
//! * [`storage`] – The pluggable entity storage contract and the in-memory backend.
//! * [`error`] – The error taxonomy; everything is recoverable and returned to the caller.
//!
//! ## Indexes
//! All four indexes share one implementation and differ only in a tagged
//! configuration: a permutation from canonical `(entity, attribute, value)`
//! order into storage order, its exact inverse, and a predicate deciding which
//! attributes are eligible. VAET indexes only `ref`-typed attributes, so
//! "which entities reference this one" never needs a scan.
//!
//! ## Concurrency
//! A database is a passive value behind an atomically swappable reference.
//! Readers load a snapshot and go; writers compute a full candidate state and
//! publish it with compare-and-swap, retrying from a fresh snapshot when
//! another writer got there first. Everything reachable from a snapshot is
//! immutable and freely shareable across threads.
//!
//! ## Quick Start
//! ```
//! use factum::construct::{Attribute, Cardinality, Database};
//! use factum::datatype::{Value, ValueKind};
//! use factum::storage::Storage;
//!
//! let db: Database = Database::new();
//! let id = db
//!     .create_entity(vec![Attribute::new(
//!         "age",
//!         Value::Int(30),
//!         ValueKind::scalar("int"),
//!         Cardinality::Single,
//!     )])
//!     .unwrap();
//! assert_eq!(id, 0);
//! assert_eq!(db.curr_time(), 1);
//! let layer = db.as_of(1).unwrap();
//! assert!(layer.storage().get(id).is_ok());
//! ```

pub mod construct;
pub mod datatype;
pub mod error;
pub mod index;
pub mod storage;
