use tabula::error::TabulaError;
use tabula::{SchemaCatalog, Value};

use crate::common::{insert_named, setup_db};

#[test]
fn save_and_load_round_trip() {
    let db = setup_db();
    let site = insert_named(&db, "site", "north");

    let mut user = db.new_record("user").unwrap();
    assert_eq!(user.id(), None);
    assert_eq!(user.get("active").unwrap(), &Value::Integer(1));
    user.set("name", "alice")
        .unwrap()
        .set("site_id", site)
        .unwrap()
        .set("profile_bio", "likes rust")
        .unwrap();
    user.save().unwrap();
    let id = user.id().unwrap();
    assert!(id > 0);

    let loaded = db.load("user", id).unwrap();
    assert_eq!(loaded.get("name").unwrap(), &Value::from("alice"));
    assert_eq!(loaded.get("site_id").unwrap(), &Value::Integer(site));
    assert_eq!(loaded.get("profile_bio").unwrap(), &Value::from("likes rust"));
    assert!(loaded.get("create_timestamp").unwrap().as_str().is_some());
    assert_eq!(loaded.column_values().get("name"), Some(&Value::from("alice")));
}

#[test]
fn update_existing_record() {
    let db = setup_db();
    let id = insert_named(&db, "user", "bob");

    let mut user = db.load("user", id).unwrap();
    user.set("active", 0).unwrap();
    user.set("profile_name", "Bob B.").unwrap();
    user.save().unwrap();

    let mut again = db.load("user", id).unwrap();
    assert_eq!(again.get("active").unwrap(), &Value::Integer(0));
    assert_eq!(again.get("profile_name").unwrap(), &Value::from("Bob B."));

    // a second save upserts the existing extending row
    again.set("profile_name", "Robert").unwrap();
    again.save().unwrap();
    let rows = db
        .catalog()
        .get_one("SELECT COUNT(*) FROM user_profile")
        .unwrap();
    assert_eq!(rows, Some(Value::Integer(1)));
    assert_eq!(
        db.load("user", id).unwrap().get("profile_name").unwrap(),
        &Value::from("Robert")
    );
}

#[test]
fn missing_extending_row_keeps_defaults() {
    let db = setup_db();
    db.catalog()
        .execute("INSERT INTO user (id, name) VALUES (7, 'raw')")
        .unwrap();
    let user = db.load("user", 7).unwrap();
    assert_eq!(user.get("name").unwrap(), &Value::from("raw"));
    assert!(user.get("profile_bio").unwrap().is_null());
}

#[test]
fn load_errors() {
    let db = setup_db();
    let err = db.load("user", 42).unwrap_err();
    assert!(matches!(err, TabulaError::RecordNotFound { id: 42, .. }));
    assert!(err.is_runtime());
    assert!(db.load("user", -1).unwrap_err().is_argument());
}

#[test]
fn unknown_attributes_and_primary_key() {
    let db = setup_db();
    let mut user = db.new_record("user").unwrap();
    assert!(user.get("nickname").unwrap_err().is_argument());
    assert!(user.set("nickname", "x").unwrap_err().is_argument());
    assert!(user.set("id", 5).unwrap_err().is_argument());
    // the extending key column is internal
    assert!(user.get("profile_user_id").unwrap_err().is_argument());
}

#[test]
fn delete_removes_every_table_row() {
    let db = setup_db();
    let mut user = db.new_record("user").unwrap();
    user.set("name", "carol").unwrap();
    user.set("profile_bio", "temp").unwrap();
    user.save().unwrap();
    let id = user.id().unwrap();

    user.delete().unwrap();
    assert_eq!(user.id(), None);
    assert!(matches!(
        db.load("user", id).unwrap_err(),
        TabulaError::RecordNotFound { .. }
    ));
    let profiles = db
        .catalog()
        .get_one("SELECT COUNT(*) FROM user_profile")
        .unwrap();
    assert_eq!(profiles, Some(Value::Integer(0)));
}

#[test]
fn read_only_records_are_left_alone() {
    let db = setup_db();
    let id = insert_named(&db, "role", "admin");
    let mut role = db.load("role", id).unwrap();
    role.set_read_only(true);
    role.set("name", "root").unwrap();
    role.save().unwrap();
    role.delete().unwrap();

    let stored = db.load("role", id).unwrap();
    assert_eq!(stored.get("name").unwrap(), &Value::from("admin"));
}

#[test]
fn datetimes_are_canonicalized() {
    let db = setup_db();
    let mut shift = db.new_record("shift").unwrap();
    // start_datetime starts at "now"
    let now = shift.get("start_datetime").unwrap().as_str().unwrap().to_string();
    assert!(now.ends_with("+00:00"));

    shift.set("start_datetime", "2024-05-01T10:00:00+02:00").unwrap();
    shift.set("end_datetime", "2024-05-01 12:00:00").unwrap();
    shift.set("start_time", "09:00").unwrap();
    shift.set("end_time", "17:30:00").unwrap();
    shift.save().unwrap();

    let stored = db
        .catalog()
        .get_row(&format!("SELECT * FROM shift WHERE id = {}", shift.id().unwrap()))
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("start_datetime"), Some(&Value::from("2024-05-01 08:00:00")));
    assert_eq!(stored.get("start_time"), Some(&Value::from("09:00:00")));

    let loaded = db.load("shift", shift.id().unwrap()).unwrap();
    assert_eq!(
        loaded.get("start_datetime").unwrap(),
        &Value::from("2024-05-01T08:00:00+00:00")
    );
    assert_eq!(
        loaded.get("end_datetime").unwrap(),
        &Value::from("2024-05-01T12:00:00+00:00")
    );
}

#[test]
fn end_must_come_after_start() {
    let db = setup_db();
    let mut shift = db.new_record("shift").unwrap();
    shift.set("start_datetime", "2024-05-01 10:00:00").unwrap();
    shift.set("end_datetime", "2024-05-01 10:00:00").unwrap();
    let err = shift.save().unwrap_err();
    assert!(matches!(err, TabulaError::Validation(_)));
    assert_eq!(shift.id(), None);

    let mut bad = db.new_record("shift").unwrap();
    bad.set("end_datetime", "not a date").unwrap();
    assert!(bad.save().unwrap_err().is_argument());
}

#[test]
fn constraint_violations_are_classified() {
    let db = setup_db();
    insert_named(&db, "role", "admin");
    let mut dup = db.new_record("role").unwrap();
    dup.set("name", "admin").unwrap();
    let err = dup.save().unwrap_err();
    assert!(err.is_duplicate());

    let mut orphan = db.new_record("user").unwrap();
    orphan.set("name", "dave").unwrap();
    orphan.set("site_id", 999).unwrap();
    let err = orphan.save().unwrap_err();
    assert_eq!(
        err.constraint_kind(),
        Some(tabula::error::ConstraintKind::ForeignKey)
    );
}
