use std::collections::HashSet;

use factum::construct::{Attribute, Cardinality, Database, Datom};
use factum::datatype::{Value, ValueKind};
use factum::index::{Component, IndexKind};

#[test]
fn every_permutation_round_trips() {
    let triples = [
        [
            Component::Entity(0),
            Component::Attribute("age".into()),
            Component::Value(Value::Int(30)),
        ],
        [
            Component::Entity(7),
            Component::Attribute("owner".into()),
            Component::Value(Value::Ref(3)),
        ],
        [
            Component::Entity(u64::MAX),
            Component::Attribute(String::new()),
            Component::Value(Value::Bool(false)),
        ],
    ];
    for kind in IndexKind::ALL {
        for triple in &triples {
            assert_eq!(
                kind.to_canonical(kind.to_stored(triple.clone())),
                *triple,
                "{kind} must invert its own permutation exactly"
            );
        }
    }
}

#[test]
fn example_indexes_from_a_first_write() {
    let db: Database = Database::new();
    let id = db
        .create_entity(vec![Attribute::new(
            "age",
            Value::Int(30),
            ValueKind::scalar("int"),
            Cardinality::Single,
        )])
        .unwrap();
    assert_eq!(id, 0);
    assert_eq!(db.curr_time(), 1);
    let layer = db.latest();
    let eavt = layer
        .eavt()
        .leaves(&Component::Entity(0), &Component::Attribute("age".into()))
        .unwrap();
    assert_eq!(eavt.len(), 1);
    assert!(eavt.contains(&Component::Value(Value::Int(30))));
    let avet = layer
        .avet()
        .leaves(
            &Component::Attribute("age".into()),
            &Component::Value(Value::Int(30)),
        )
        .unwrap();
    assert_eq!(avet.len(), 1);
    assert!(avet.contains(&Component::Entity(0)));
}

#[test]
fn all_stored_orders_reconstruct_the_same_datoms() {
    let db: Database = Database::new();
    let liked = db
        .create_entity(vec![Attribute::new(
            "name",
            Value::Text("Bella".into()),
            ValueKind::scalar("string"),
            Cardinality::Single,
        )])
        .unwrap();
    let fan = db
        .create_entity(vec![
            Attribute::new("likes", Value::Ref(liked), ValueKind::Ref, Cardinality::Single),
            Attribute::new("age", Value::Int(9), ValueKind::scalar("int"), Cardinality::Single),
        ])
        .unwrap();
    let layer = db.latest();
    let canonical: HashSet<Datom> = layer
        .datoms()
        .collect::<Result<_, _>>()
        .expect("every reachable triple is well typed");
    assert_eq!(canonical.len(), 3);
    assert!(canonical.contains(&Datom::new(fan, "age", Value::Int(9))));
    // the always-eligible indexes agree datom for datom
    for index in [layer.avet(), layer.veat()] {
        let reconstructed: HashSet<Datom> = index
            .datoms()
            .collect::<Result<_, _>>()
            .expect("every reachable triple is well typed");
        assert_eq!(reconstructed, canonical, "{} diverged", index.kind());
    }
}

#[test]
fn vaet_holds_only_reference_datoms() {
    let db: Database = Database::new();
    let liked = db.create_entity(Vec::new()).unwrap();
    let fan = db
        .create_entity(vec![
            Attribute::new("likes", Value::Ref(liked), ValueKind::Ref, Cardinality::Single),
            Attribute::new("age", Value::Int(9), ValueKind::scalar("int"), Cardinality::Single),
        ])
        .unwrap();
    let layer = db.latest();
    assert!(layer.eavt().contains(&Datom::new(fan, "age", Value::Int(9))));
    assert!(!layer.vaet().contains(&Datom::new(fan, "age", Value::Int(9))));
    // the reference datom is reachable value-first: who references `liked`?
    let referrers = layer
        .vaet()
        .leaves(
            &Component::Value(Value::Ref(liked)),
            &Component::Attribute("likes".into()),
        )
        .expect("the reference is graph-indexed");
    assert!(referrers.contains(&Component::Entity(fan)));
    assert_eq!(layer.vaet().len(), 1);
    // removing the reference drains the graph index
    db.remove_attribute(fan, "likes").unwrap();
    assert!(db.latest().vaet().is_empty());
}
