use helium_core::db::open_db_in_memory;
use helium_core::{
    RepoError, SqliteSubscriberMetaRepository, SqliteSubscriberRepository, Subscriber,
    SubscriberMeta, SubscriberMetaError, SubscriberMetaRepository, SubscriberRepository,
    ValidationError,
};
use serde_json::{json, Map, Value};

#[test]
fn from_map_populates_every_field_from_its_own_key() {
    let data = object(json!({
        "name": "company",
        "value": "Acme",
        "subscriber": 7,
        "createdAt": 1_700_000_000_000_i64,
        "updatedAt": 1_700_000_360_000_i64,
    }));

    let meta = SubscriberMeta::from_map(&data).unwrap();
    assert_eq!(meta.id(), None);
    assert_eq!(meta.name(), "company");
    assert_eq!(meta.value(), Some("Acme"));
    assert_eq!(meta.subscriber_id(), Some(7));
    assert_eq!(meta.created_at(), 1_700_000_000_000);
    assert_eq!(meta.updated_at(), 1_700_000_360_000);
}

#[test]
fn from_map_accepts_null_value_and_unassigned_subscriber() {
    let data = object(json!({
        "name": "nickname",
        "value": null,
        "subscriber": null,
        "createdAt": 1,
        "updatedAt": 2,
    }));

    let meta = SubscriberMeta::from_map(&data).unwrap();
    assert_eq!(meta.value(), None);
    assert_eq!(meta.subscriber_id(), None);
    assert_eq!(meta.validate(), Err(ValidationError::MissingSubscriber));
}

#[test]
fn from_map_requires_every_key() {
    for missing in ["name", "value", "subscriber", "createdAt", "updatedAt"] {
        let mut data = object(json!({
            "name": "city",
            "value": "Berlin",
            "subscriber": 1,
            "createdAt": 1,
            "updatedAt": 1,
        }));
        data.remove(missing);

        let err = SubscriberMeta::from_map(&data).unwrap_err();
        assert_eq!(err, SubscriberMetaError::MissingField(missing));
    }
}

#[test]
fn from_map_rejects_wrong_types_and_empty_names() {
    let wrong_type = object(json!({
        "name": "city",
        "value": "Berlin",
        "subscriber": "one",
        "createdAt": 1,
        "updatedAt": 1,
    }));
    assert!(matches!(
        SubscriberMeta::from_map(&wrong_type),
        Err(SubscriberMetaError::InvalidField(_))
    ));

    let empty_name = object(json!({
        "name": "   ",
        "value": "Berlin",
        "subscriber": 1,
        "createdAt": 1,
        "updatedAt": 1,
    }));
    assert_eq!(
        SubscriberMeta::from_map(&empty_name),
        Err(SubscriberMetaError::Validation(ValidationError::EmptyField(
            "name"
        )))
    );
}

#[test]
fn serialization_uses_factory_key_names() {
    let meta = SubscriberMeta::new(3, "plan", Some("pro".to_string()), 10);
    let json = serde_json::to_value(&meta).unwrap();

    assert_eq!(json["subscriber"], 3);
    assert_eq!(json["createdAt"], 10);
    assert_eq!(json["updatedAt"], 10);

    let Value::Object(map) = json else {
        panic!("meta should serialize to an object");
    };
    assert_eq!(SubscriberMeta::from_map(&map).unwrap(), meta);
}

#[test]
fn save_and_find_round_trip_keeps_caller_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let subscriber_id = seed_subscriber(&conn, "ada@example.com");
    let repo = SqliteSubscriberMetaRepository::try_new(&conn).unwrap();

    let mut meta = SubscriberMeta::new(subscriber_id, "plan", Some("pro".to_string()), 100);
    meta.set_updated_at(250);
    let id = repo.save(&mut meta).unwrap();
    assert_eq!(meta.id(), Some(id));

    let loaded = repo.find_one_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, meta);
    assert_eq!(loaded.created_at(), 100);
    assert_eq!(loaded.updated_at(), 250);
}

#[test]
fn save_updates_existing_meta() {
    let conn = open_db_in_memory().unwrap();
    let subscriber_id = seed_subscriber(&conn, "ada@example.com");
    let repo = SqliteSubscriberMetaRepository::try_new(&conn).unwrap();

    let mut meta = SubscriberMeta::new(subscriber_id, "plan", Some("free".to_string()), 100);
    let id = repo.save(&mut meta).unwrap();

    meta.set_value(None).set_updated_at(300);
    assert_eq!(repo.save(&mut meta).unwrap(), id);

    let loaded = repo.find_one_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.value(), None);
    assert_eq!(loaded.updated_at(), 300);
    assert_eq!(repo.count_by_subscriber(subscriber_id).unwrap(), 1);
}

#[test]
fn save_rejects_orphans_and_unknown_owners() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteSubscriberMetaRepository::try_new(&conn).unwrap();

    let mut orphan = SubscriberMeta::default();
    orphan.set_name("plan");
    assert!(matches!(
        repo.save(&mut orphan),
        Err(RepoError::Validation(ValidationError::MissingSubscriber))
    ));

    let mut dangling = SubscriberMeta::new(404, "plan", None, 0);
    assert!(matches!(
        repo.save(&mut dangling),
        Err(RepoError::NotFound {
            entity: "subscriber",
            id: 404
        })
    ));
}

#[test]
fn name_limit_counts_characters_not_bytes() {
    let conn = open_db_in_memory().unwrap();
    let subscriber_id = seed_subscriber(&conn, "ada@example.com");
    let repo = SqliteSubscriberMetaRepository::try_new(&conn).unwrap();

    let longest = "é".repeat(255);
    let mut meta = SubscriberMeta::new(subscriber_id, longest.as_str(), None, 0);
    let id = repo.save(&mut meta).unwrap();
    assert_eq!(repo.find_one_by_id(id).unwrap().unwrap().name(), longest);
}

#[test]
fn name_longer_than_limit_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let subscriber_id = seed_subscriber(&conn, "ada@example.com");
    let repo = SqliteSubscriberMetaRepository::try_new(&conn).unwrap();

    let mut meta = SubscriberMeta::new(subscriber_id, "é".repeat(256), None, 0);
    assert!(matches!(
        repo.save(&mut meta),
        Err(RepoError::Validation(ValidationError::FieldTooLong {
            field: "name",
            max: 255,
            actual: 256
        }))
    ));
    assert_eq!(repo.count_by_subscriber(subscriber_id).unwrap(), 0);

    let data = object(json!({
        "name": "x".repeat(256),
        "value": null,
        "subscriber": subscriber_id,
        "createdAt": 0,
        "updatedAt": 0,
    }));
    assert!(matches!(
        SubscriberMeta::from_map(&data),
        Err(SubscriberMetaError::Validation(
            ValidationError::FieldTooLong { max: 255, .. }
        ))
    ));
}

#[test]
fn find_by_subscriber_is_scoped_and_ordered_by_name() {
    let conn = open_db_in_memory().unwrap();
    let ada = seed_subscriber(&conn, "ada@example.com");
    let bob = seed_subscriber(&conn, "bob@example.com");
    let repo = SqliteSubscriberMetaRepository::try_new(&conn).unwrap();

    for name in ["zip", "city", "plan"] {
        repo.save(&mut SubscriberMeta::new(ada, name, None, 0))
            .unwrap();
    }
    repo.save(&mut SubscriberMeta::new(bob, "city", None, 0))
        .unwrap();

    let names: Vec<_> = repo
        .find_by_subscriber(ada)
        .unwrap()
        .iter()
        .map(|meta| meta.name().to_string())
        .collect();
    assert_eq!(names, ["city", "plan", "zip"]);
    assert_eq!(repo.count_by_subscriber(bob).unwrap(), 1);

    let city = repo
        .find_one_by_subscriber_and_name(bob, "city")
        .unwrap()
        .unwrap();
    assert_eq!(city.subscriber_id(), Some(bob));
    assert!(repo
        .find_one_by_subscriber_and_name(bob, "zip")
        .unwrap()
        .is_none());
}

#[test]
fn removing_meta_and_owner() {
    let conn = open_db_in_memory().unwrap();
    let ada = seed_subscriber(&conn, "ada@example.com");
    let metas = SqliteSubscriberMetaRepository::try_new(&conn).unwrap();
    let subscribers = SqliteSubscriberRepository::try_new(&conn).unwrap();

    let mut first = SubscriberMeta::new(ada, "plan", None, 0);
    let first_id = metas.save(&mut first).unwrap();
    let mut second = SubscriberMeta::new(ada, "city", None, 0);
    let second_id = metas.save(&mut second).unwrap();

    metas.remove(first_id).unwrap();
    assert!(metas.find_one_by_id(first_id).unwrap().is_none());
    assert!(matches!(
        metas.remove(first_id),
        Err(RepoError::NotFound { .. })
    ));

    subscribers.remove(ada).unwrap();
    assert!(metas.find_one_by_id(second_id).unwrap().is_none());
    assert_eq!(metas.count_by_subscriber(ada).unwrap(), 0);
}

fn seed_subscriber(conn: &rusqlite::Connection, email: &str) -> i64 {
    let repo = SqliteSubscriberRepository::try_new(conn).unwrap();
    repo.save(&mut Subscriber::new(email, 0)).unwrap()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}
