use tabula::prelude::*;

use crate::common::{insert_named, setup_db};

#[test]
fn unknown_names_are_rejected() {
    let db = setup_db();
    let user = db.new_record("user").unwrap();
    let err = user.call("get_planet_list", AccessorArgs::None).unwrap_err();
    assert!(matches!(err, TabulaError::NoSuchOperation(_)));
    assert!(err.is_argument());
    // user has no role_id column, so there is no parent getter
    assert!(matches!(
        user.call("get_role", AccessorArgs::None).unwrap_err(),
        TabulaError::NoSuchOperation(_)
    ));
    assert!(user.call("fetch_role", AccessorArgs::None).is_err());
}

#[test]
fn registered_accessors() {
    let db = setup_db();
    let user = db.entity("user").unwrap();
    let accessors = &user.schema().accessors;
    assert!(accessors.contains("get_site"));
    assert!(accessors.contains("get_role_idlist_inverted"));
    assert!(accessors.contains("add_role"));
    assert!(accessors.contains("remove_shift"));
    assert!(!accessors.contains("get_shift"));
}

#[test]
fn argument_checks() {
    let db = setup_db();
    let user = db.load("user", insert_named(&db, "user", "ivy")).unwrap();
    assert!(user
        .call("add_role", AccessorArgs::Ids(Vec::new()))
        .unwrap_err()
        .is_argument());
    assert!(user
        .call("remove_role", AccessorArgs::Id(0))
        .unwrap_err()
        .is_argument());
    assert!(user
        .call("remove_role", AccessorArgs::Ids(vec![1]))
        .unwrap_err()
        .is_argument());
    assert!(user
        .call("get_site", AccessorArgs::Id(1))
        .unwrap_err()
        .is_argument());
}

#[test]
fn calls_route_to_relations() {
    let db = setup_db();
    let site = insert_named(&db, "site", "dock");
    let admin = insert_named(&db, "role", "admin");
    let staff = insert_named(&db, "role", "staff");
    let mut user = db.new_record("user").unwrap();
    user.set("name", "jack").unwrap().set("site_id", site).unwrap();
    user.save().unwrap();

    let out = user.call("add_role", AccessorArgs::Ids(vec![admin])).unwrap();
    assert!(matches!(out, AccessorOutput::Done));
    user.call("add_role", AccessorArgs::Id(staff)).unwrap();

    let roles = user
        .call("get_role_list", AccessorArgs::None)
        .unwrap()
        .into_records();
    let names: Vec<_> = roles.iter().map(|r| r.get("name").unwrap().clone()).collect();
    assert_eq!(names, vec![Value::from("admin"), Value::from("staff")]);

    let mut only_staff = Modifier::new();
    only_staff.r#where("role.name", Operator::Eq, "staff");
    let ids = user
        .call(
            "get_role_idlist",
            AccessorArgs::Query {
                modifier: only_staff,
                distinct: Some(false),
            },
        )
        .unwrap()
        .into_ids();
    assert_eq!(ids, vec![staff]);

    user.call("remove_role", AccessorArgs::Id(admin)).unwrap();
    let count = user.call("get_role_count", AccessorArgs::None).unwrap();
    assert_eq!(count.count(), 1);
    let inverted = user
        .call("get_role_idlist_inverted", AccessorArgs::None)
        .unwrap()
        .into_ids();
    assert_eq!(inverted, vec![admin]);

    let parent = user
        .call("get_site", AccessorArgs::None)
        .unwrap()
        .into_record()
        .unwrap();
    assert_eq!(parent.id(), Some(site));

    let rows = db
        .load("site", site)
        .unwrap()
        .call("get_user_arraylist", AccessorArgs::None)
        .unwrap()
        .into_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("jack")));
}

#[test]
fn user_role_scenario() {
    let db = setup_db();
    for name in ["viewer", "editor", "owner", "auditor"] {
        insert_named(&db, "role", name);
    }

    let mut alice = db.new_record("user").unwrap();
    alice.set("name", "alice").unwrap().set("profile_bio", "hi").unwrap();
    alice.save().unwrap();
    assert_eq!(alice.id(), Some(1));

    // the profile lives in its own table only
    let primary = db
        .catalog()
        .get_row("SELECT * FROM user WHERE id = 1")
        .unwrap()
        .unwrap();
    assert!(!primary.contains("bio"));
    let bio = db
        .catalog()
        .get_one("SELECT bio FROM user_profile WHERE user_id = 1")
        .unwrap();
    assert_eq!(bio, Some(Value::from("hi")));

    alice.call("add_role", AccessorArgs::Ids(vec![2, 3])).unwrap();
    assert_eq!(
        alice.call("get_role_list", AccessorArgs::None).unwrap().into_records()
            .iter()
            .map(|r| r.id().unwrap())
            .collect::<Vec<_>>(),
        vec![2, 3]
    );
    assert_eq!(
        alice
            .call("get_role_idlist_inverted", AccessorArgs::None)
            .unwrap()
            .into_ids(),
        vec![1, 4]
    );
    alice.call("remove_role", AccessorArgs::Id(2)).unwrap();
    assert_eq!(
        alice.call("get_role_count", AccessorArgs::None).unwrap().count(),
        1
    );
}
