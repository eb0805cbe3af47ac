use tabula::prelude::*;
use tabula::EntityConfig;

use crate::common::{config, insert_named, setup_db, setup_db_with};

fn seed(db: &Tabula<SqliteCatalog>) -> (i64, i64, i64, i64) {
    let north = insert_named(db, "site", "north");
    let south = insert_named(db, "site", "south");
    let mut ids = Vec::new();
    for (name, site) in [("a", north), ("b", south)] {
        let mut user = db.new_record("user").unwrap();
        user.set("name", name).unwrap().set("site_id", site).unwrap();
        user.save().unwrap();
        ids.push(user.id().unwrap());
    }
    (north, south, ids[0], ids[1])
}

#[test]
fn registry_discovers_tables() {
    let db = setup_db();
    let mut names: Vec<_> = db.registry().names().collect();
    names.sort_unstable();
    assert_eq!(names, ["access", "passport", "role", "shift", "site", "user"]);
    assert!(db.entity("user_profile").is_err());
    assert!(db.entity("user_has_role").is_err());
}

#[test]
fn selects_join_filtered_tables() {
    let db = setup_db();
    let (_, _, a, b) = seed(&db);
    let users = db.entity("user").unwrap();

    let mut on_north = Modifier::new();
    on_north.r#where("site.name", Operator::Eq, "north");
    assert_eq!(users.id_select(Some(on_north.clone())).unwrap(), vec![a]);
    assert_eq!(users.count(Some(on_north)).unwrap(), 1);

    let mut by_site_desc = Modifier::new();
    by_site_desc.order_desc("site.name");
    assert_eq!(users.id_select(Some(by_site_desc)).unwrap(), vec![b, a]);

    assert_eq!(users.count(None).unwrap(), 2);
    let all = users.records(None).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].get("name").unwrap(), &Value::from("b"));
}

#[test]
fn array_rows_leave_out_timestamps() {
    let db = setup_db();
    seed(&db);
    let rows = db.entity("site").unwrap().array_select(None).unwrap();
    assert_eq!(rows.len(), 2);
    let columns: Vec<_> = rows[0].columns().collect();
    assert_eq!(columns, ["id", "name", "status"]);
    assert_eq!(rows[0].get("status"), Some(&Value::from("open")));
}

#[test]
fn unique_records() {
    let db = setup_db();
    let (north, _, a, _) = seed(&db);
    let mut access = db.new_record("access").unwrap();
    access
        .set("user_id", a)
        .unwrap()
        .set("site_id", north)
        .unwrap()
        .set("code", "1234")
        .unwrap();
    access.save().unwrap();

    let entity = db.entity("access").unwrap();
    let found = entity
        .get_unique_record(&["site_id", "user_id"], &[Value::Integer(north), Value::Integer(a)])
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), access.id());
    assert_eq!(found.get("code").unwrap(), &Value::from("1234"));

    assert!(entity
        .get_unique_record(&["site_id", "user_id"], &[Value::Integer(north), Value::Integer(99)])
        .unwrap()
        .is_none());
    // not a unique key
    assert!(entity
        .get_unique_record(&["code"], &[Value::from("1234")])
        .unwrap()
        .is_none());
    assert!(entity
        .get_unique_record(&["code"], &[])
        .unwrap_err()
        .is_argument());

    let users = db.entity("user").unwrap();
    let bob = users
        .get_unique_record(&["name"], &[Value::from("a")])
        .unwrap()
        .unwrap();
    assert_eq!(bob.id(), Some(a));
}

#[test]
fn enum_and_distinct_values() {
    let db = setup_db();
    seed(&db);
    let sites = db.entity("site").unwrap();
    assert_eq!(sites.get_enum_values("status").unwrap(), ["open", "closed"]);
    assert!(sites.get_enum_values("name").unwrap().is_empty());

    let mut site = db.load("site", 1).unwrap();
    site.set("status", "closed").unwrap();
    site.save().unwrap();
    assert_eq!(
        sites.get_distinct_values("status").unwrap(),
        vec![Value::from("closed"), Value::from("open")]
    );
    assert!(sites.get_distinct_values("nope").unwrap_err().is_argument());

    let mut bad = db.new_record("site").unwrap();
    bad.set("name", "x").unwrap().set("status", "gone").unwrap();
    assert_eq!(bad.save().unwrap_err().constraint_kind(), Some(ConstraintKind::Check));
}

#[test]
fn column_lookup() {
    let db = setup_db();
    let users = db.entity("user").unwrap();
    assert!(users.column_exists("site_id", false));
    assert!(!users.column_exists("profile_bio", false));
    assert!(users.column_exists("profile_bio", true));
    assert_eq!(users.relationship("role").unwrap(), Relationship::ManyToMany);
    assert_eq!(
        users.joining_table_name("role").unwrap().as_deref(),
        Some("user_has_role")
    );
}

#[test]
fn prefixed_tables() {
    let mut config = config();
    config.prefix = "app_".to_string();
    let mut role = EntityConfig::new("role");
    role.read_only = true;
    let db = setup_db_with(config.with_entity(role));

    assert!(db.entity("user").is_ok());
    assert_eq!(db.entity("user").unwrap().table_name(), "app_user");
    assert_eq!(db.relationship("user", "role").unwrap(), Relationship::ManyToMany);
    assert_eq!(
        db.joining_table("user", "role").unwrap().as_deref(),
        Some("app_user_has_role")
    );

    let site = insert_named(&db, "site", "north");
    let mut user = db.new_record("user").unwrap();
    user.set("name", "ann").unwrap().set("site_id", site).unwrap();
    user.save().unwrap();
    let mut on_north = Modifier::new();
    on_north.r#where("app_site.name", Operator::Eq, "north");
    assert_eq!(
        db.entity("user").unwrap().id_select(Some(on_north)).unwrap(),
        vec![user.id().unwrap()]
    );

    // declared read-only entities never write
    let mut role = db.new_record("role").unwrap();
    assert!(role.is_read_only());
    role.set("name", "admin").unwrap();
    role.save().unwrap();
    assert_eq!(db.entity("role").unwrap().count(None).unwrap(), 0);
}
