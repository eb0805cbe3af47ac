use tabula::prelude::*;

use crate::common::{insert_named, setup_db};

fn user_on_site(db: &Tabula<SqliteCatalog>, name: &str, site: i64) -> i64 {
    let mut user = db.new_record("user").unwrap();
    user.set("name", name).unwrap().set("site_id", site).unwrap();
    user.save().unwrap();
    user.id().unwrap()
}

#[test]
fn relationship_kinds() {
    let db = setup_db();
    assert_eq!(db.relationship("site", "user").unwrap(), Relationship::OneToMany);
    assert_eq!(db.relationship("user", "site").unwrap(), Relationship::None);
    assert_eq!(db.relationship("user", "passport").unwrap(), Relationship::OneToOne);
    assert_eq!(db.relationship("passport", "user").unwrap(), Relationship::OneToOne);
    assert_eq!(db.relationship("user", "role").unwrap(), Relationship::ManyToMany);
    assert_eq!(db.relationship("role", "user").unwrap(), Relationship::ManyToMany);
    assert_eq!(db.relationship("role", "site").unwrap(), Relationship::None);

    assert_eq!(
        db.joining_table("role", "user").unwrap().as_deref(),
        Some("user_has_role")
    );
    assert_eq!(db.joining_table("user", "site").unwrap(), None);
    assert_eq!(db.relationship("user", "ghost").unwrap(), Relationship::None);
}

#[test]
fn one_to_many_lists() {
    let db = setup_db();
    let north = insert_named(&db, "site", "north");
    let south = insert_named(&db, "site", "south");
    let a = user_on_site(&db, "a", north);
    let b = user_on_site(&db, "b", north);
    let c = user_on_site(&db, "c", south);
    let loose = insert_named(&db, "user", "loose");

    let site = db.load("site", north).unwrap();
    assert_eq!(site.idlist("user", RelationQuery::new()).unwrap(), vec![a, b]);
    assert_eq!(site.count_related("user", RelationQuery::new()).unwrap(), 2);

    // the complement includes users with no site at all
    let inverted = site.idlist("user", RelationQuery::new().inverted()).unwrap();
    assert_eq!(inverted, vec![c, loose]);

    let mut by_name = Modifier::new();
    by_name.r#where("user.name", Operator::Eq, "b");
    let names: Vec<_> = site
        .list("user", RelationQuery::new().with_modifier(by_name))
        .unwrap()
        .iter()
        .map(|u| u.get("name").unwrap().clone())
        .collect();
    assert_eq!(names, vec![Value::from("b")]);

    let rows = site.arraylist("user", RelationQuery::new()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name"), Some(&Value::from("a")));
    assert!(!rows[0].contains("create_timestamp"));
}

#[test]
fn list_on_one_to_one_is_empty() {
    let db = setup_db();
    let user = insert_named(&db, "user", "solo");
    let user = db.load("user", user).unwrap();
    assert!(user.list("passport", RelationQuery::new()).unwrap().is_empty());
    assert_eq!(user.count_related("site", RelationQuery::new()).unwrap(), 0);
}

#[test]
fn parent_follows_the_foreign_key() {
    let db = setup_db();
    let site = insert_named(&db, "site", "hq");
    let user = db.load("user", user_on_site(&db, "eve", site)).unwrap();
    let parent = user.parent("site").unwrap().unwrap();
    assert_eq!(parent.id(), Some(site));
    assert_eq!(parent.get("name").unwrap(), &Value::from("hq"));

    let orphan = db.load("user", insert_named(&db, "user", "orphan")).unwrap();
    assert!(orphan.parent("site").unwrap().is_none());
    // no role_id column on user
    assert!(orphan.parent("role").unwrap().is_none());
}

#[test]
fn many_to_many_add_list_remove() {
    let db = setup_db();
    let admin = insert_named(&db, "role", "admin");
    let staff = insert_named(&db, "role", "staff");
    let guest = insert_named(&db, "role", "guest");
    let user = db.load("user", insert_named(&db, "user", "frank")).unwrap();

    user.add("role", &[admin, staff]).unwrap();
    assert_eq!(user.idlist("role", RelationQuery::new()).unwrap(), vec![admin, staff]);
    assert_eq!(
        user.idlist("role", RelationQuery::new().inverted()).unwrap(),
        vec![guest]
    );
    assert_eq!(user.count_related("role", RelationQuery::new()).unwrap(), 2);

    // the other side sees the same link
    let role = db.load("role", admin).unwrap();
    assert_eq!(
        role.idlist("user", RelationQuery::new()).unwrap(),
        vec![user.id().unwrap()]
    );

    let err = user.add("role", &[admin]).unwrap_err();
    assert!(err.is_duplicate());

    user.remove("role", admin).unwrap();
    assert_eq!(user.idlist("role", RelationQuery::new()).unwrap(), vec![staff]);
    // removing a missing link is a no-op
    user.remove("role", guest).unwrap();
    assert_eq!(user.count_related("role", RelationQuery::new()).unwrap(), 1);
}

#[test]
fn repeated_ids_in_one_add_are_a_duplicate() {
    let db = setup_db();
    let admin = insert_named(&db, "role", "admin");
    let user = db.load("user", insert_named(&db, "user", "otto")).unwrap();

    let err = user.add("role", &[admin, admin]).unwrap_err();
    assert!(err.is_duplicate());
    let links = db
        .catalog()
        .get_one("SELECT COUNT(*) FROM user_has_role")
        .unwrap();
    assert_eq!(links, Some(Value::Integer(0)));
    assert_eq!(user.count_related("role", RelationQuery::new()).unwrap(), 0);
}

#[test]
fn many_to_many_filters_join_through_the_holder() {
    let db = setup_db();
    let north = insert_named(&db, "site", "north");
    let south = insert_named(&db, "site", "south");
    let admin = insert_named(&db, "role", "admin");
    let a = user_on_site(&db, "a", north);
    let b = user_on_site(&db, "b", south);
    for id in [a, b] {
        db.load("user", id).unwrap().add("role", &[admin]).unwrap();
    }

    let role = db.load("role", admin).unwrap();
    let mut on_north = Modifier::new();
    on_north.r#where("site.name", Operator::Eq, "north");
    let ids = role
        .idlist("user", RelationQuery::new().with_modifier(on_north))
        .unwrap();
    assert_eq!(ids, vec![a]);
}

#[test]
fn one_to_many_remove_deletes_the_child() {
    let db = setup_db();
    let user = db.load("user", insert_named(&db, "user", "gina")).unwrap();
    let mut shift = db.new_record("shift").unwrap();
    shift.set("user_id", user.id()).unwrap();
    shift.set("end_datetime", "2099-01-01 00:00:00").unwrap();
    shift.save().unwrap();
    let shift_id = shift.id().unwrap();
    assert_eq!(user.count_related("shift", RelationQuery::new()).unwrap(), 1);

    user.remove("shift", shift_id).unwrap();
    assert_eq!(user.count_related("shift", RelationQuery::new()).unwrap(), 0);
    assert!(matches!(
        db.load("shift", shift_id).unwrap_err(),
        TabulaError::RecordNotFound { .. }
    ));
}

#[test]
fn add_requires_many_to_many() {
    let db = setup_db();
    let site = db.load("site", insert_named(&db, "site", "west")).unwrap();
    let user = insert_named(&db, "user", "hank");
    site.add("user", &[user]).unwrap();
    assert_eq!(site.count_related("user", RelationQuery::new()).unwrap(), 0);
}
