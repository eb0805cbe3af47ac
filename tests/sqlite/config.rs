use std::io::Write;

use tabula::prelude::*;

use crate::common::{config, setup_db_with};

const LONG_BIO: &str = "far too long for the check constraint";

fn user_count(db: &Tabula<SqliteCatalog>) -> Option<Value> {
    db.catalog().get_one("SELECT COUNT(*) FROM user").unwrap()
}

#[test]
fn config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
distinct = false
atomic_saves = true

[[entity]]
name = "user"
extending = ["profile"]
"#
    )
    .unwrap();

    let config = TabulaConfig::from_file(file.path()).unwrap();
    assert!(!config.distinct);
    assert!(config.atomic_saves);
    assert_eq!(config.primary_key, "id");

    let db = setup_db_with(config);
    let user = db.new_record("user").unwrap();
    assert!(user.get("profile_bio").is_ok());
}

#[test]
fn missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = TabulaConfig::from_file(dir.path().join("tabula.toml")).unwrap_err();
    assert!(matches!(err, tabula::ConfigError::IoError(_)));
}

#[test]
fn atomic_saves_roll_back_every_table() {
    let mut config = config();
    config.atomic_saves = true;
    let db = setup_db_with(config);

    let mut user = db.new_record("user").unwrap();
    user.set("name", "kim").unwrap().set("profile_bio", LONG_BIO).unwrap();
    let err = user.save().unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::Check));
    assert_eq!(user_count(&db), Some(Value::Integer(0)));

    // the connection is usable afterwards
    user.set("profile_bio", "short").unwrap();
    user.save().unwrap();
    assert_eq!(user_count(&db), Some(Value::Integer(1)));
}

#[test]
fn without_atomic_saves_the_primary_row_stays() {
    let db = setup_db_with(config());
    let mut user = db.new_record("user").unwrap();
    user.set("name", "lee").unwrap().set("profile_bio", LONG_BIO).unwrap();
    assert!(user.save().unwrap_err().is_constraint());
    assert_eq!(user_count(&db), Some(Value::Integer(1)));
}

#[test]
fn file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tabula.db");
    {
        let conn = ::rusqlite::Connection::open(&path).unwrap();
        crate::common::create_schema(&conn, "");
    }

    let id = {
        let db = Tabula::open(&path, config()).unwrap();
        let mut user = db.new_record("user").unwrap();
        user.set("name", "mia").unwrap().set("profile_bio", "hello").unwrap();
        user.save().unwrap();
        user.id().unwrap()
    };

    let db = Tabula::open(&path, config()).unwrap();
    let user = db.load("user", id).unwrap();
    assert_eq!(user.get("profile_bio").unwrap(), &Value::from("hello"));
}
