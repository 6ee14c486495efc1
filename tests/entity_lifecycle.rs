use factum::construct::{Attribute, Cardinality, Database, Entity};
use factum::datatype::{Value, ValueKind};
use factum::error::FactumError;
use factum::index::Component;
use factum::storage::Storage;

fn age(value: i64) -> Attribute {
    Attribute::new(
        "age",
        Value::Int(value),
        ValueKind::scalar("int"),
        Cardinality::Single,
    )
}

#[test]
fn first_entity_gets_id_zero_and_advances_the_clock() {
    let db: Database = Database::new();
    let id = db.create_entity(vec![age(30)]).unwrap();
    assert_eq!(id, 0);
    assert_eq!(db.curr_time(), 1);
    assert_eq!(db.top_id(), 1);
    let layer = db.latest();
    let eavt = layer
        .eavt()
        .leaves(&Component::Entity(0), &Component::Attribute("age".into()))
        .expect("the new datom is entity-indexed");
    assert_eq!(eavt.len(), 1);
    assert!(eavt.contains(&Component::Value(Value::Int(30))));
    let avet = layer
        .avet()
        .leaves(
            &Component::Attribute("age".into()),
            &Component::Value(Value::Int(30)),
        )
        .expect("the new datom is attribute-indexed");
    assert!(avet.contains(&Component::Entity(0)));
}

#[test]
fn update_replaces_the_value_of_a_single_attribute() {
    let db: Database = Database::new();
    let id = db.create_entity(vec![age(30)]).unwrap();
    let at = db.update_attribute(id, "age", Value::Int(31)).unwrap();
    assert_eq!(at, 2);
    let layer = db.latest();
    let leaves = layer
        .eavt()
        .leaves(&Component::Entity(id), &Component::Attribute("age".into()))
        .expect("age stays indexed");
    assert_eq!(leaves.len(), 1);
    assert!(leaves.contains(&Component::Value(Value::Int(31))));
    // the old value is gone from the value-led indexes as well
    assert!(layer.veat().branch(&Component::Value(Value::Int(30))).is_none());
    let entity = layer.storage().get(id).unwrap();
    let attribute = entity.attr("age").unwrap();
    assert_eq!(attribute.ts(), Some(2));
    assert_eq!(attribute.prev_ts(), Some(1));
}

#[test]
fn update_of_a_missing_attribute_is_not_found() {
    let db: Database = Database::new();
    let id = db.create_entity(vec![age(30)]).unwrap();
    let err = db
        .update_attribute(id, "name", Value::Text("Archie".into()))
        .unwrap_err();
    assert!(matches!(err, FactumError::NotFound(_)));
    let err = db.update_attribute(17, "age", Value::Int(1)).unwrap_err();
    assert!(matches!(err, FactumError::NotFound(_)));
    // a failing write leaves the database untouched
    assert_eq!(db.curr_time(), 1);
}

#[test]
fn a_new_entity_is_a_placeholder_until_created() {
    let placeholder = Entity::new(vec![age(30)]);
    assert!(placeholder.id().is_none());
    assert_eq!(placeholder.datoms().count(), 0);
    let db: Database = Database::new();
    let id = db.create_entity(vec![age(30)]).unwrap();
    let stored = db.latest().storage().get(id).unwrap();
    assert_eq!(stored.id(), Some(id));
    assert_eq!(stored.datoms().count(), 1);
}

#[test]
fn an_entity_can_be_created_without_attributes() {
    let db: Database = Database::new();
    let id = db.create_entity(Vec::new()).unwrap();
    let stored = db.latest().storage().get(id).unwrap();
    assert!(stored.is_empty());
    assert_eq!(db.curr_time(), 1);
}

#[test]
fn remove_attribute_clears_its_datoms() {
    let db: Database = Database::new();
    let id = db
        .create_entity(vec![
            age(30),
            Attribute::new(
                "name",
                Value::Text("Bella".into()),
                ValueKind::scalar("string"),
                Cardinality::Single,
            ),
        ])
        .unwrap();
    db.remove_attribute(id, "age").unwrap();
    let layer = db.latest();
    let entity = layer.storage().get(id).unwrap();
    assert!(entity.attr("age").is_none());
    assert!(entity.attr("name").is_some());
    assert!(
        layer
            .eavt()
            .leaves(&Component::Entity(id), &Component::Attribute("age".into()))
            .is_none()
    );
    assert!(layer.avet().branch(&Component::Attribute("age".into())).is_none());
    let err = db.remove_attribute(id, "age").unwrap_err();
    assert!(matches!(err, FactumError::NotFound(_)));
}

#[test]
fn remove_entity_clears_every_index_atomically() {
    let db: Database = Database::new();
    let owner = db.create_entity(vec![age(52)]).unwrap();
    let pet = db
        .create_entity(vec![
            Attribute::new("owner", Value::Ref(owner), ValueKind::Ref, Cardinality::Single),
            Attribute::new(
                "name",
                Value::Text("Bella".into()),
                ValueKind::scalar("string"),
                Cardinality::Single,
            ),
        ])
        .unwrap();
    db.remove_entity(pet).unwrap();
    let layer = db.latest();
    assert!(matches!(
        layer.storage().get(pet),
        Err(FactumError::NotFound(_))
    ));
    assert!(layer.eavt().branch(&Component::Entity(pet)).is_none());
    assert!(
        layer
            .avet()
            .branch(&Component::Attribute("owner".into()))
            .is_none()
    );
    assert!(
        layer
            .veat()
            .branch(&Component::Value(Value::Text("Bella".into())))
            .is_none()
    );
    assert!(
        layer
            .vaet()
            .branch(&Component::Value(Value::Ref(owner)))
            .is_none()
    );
    // history is immutable: the layer before the removal still shows the pet
    let before = db.as_of(2).unwrap();
    assert!(before.storage().get(pet).is_ok());
    assert!(
        before
            .vaet()
            .branch(&Component::Value(Value::Ref(owner)))
            .is_some()
    );
}
