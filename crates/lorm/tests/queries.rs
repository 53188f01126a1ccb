mod common;

use common::{Person, Role, seed, setup_db};
use lorm::prelude::*;
use lorm::SqlContext;

#[test]
fn find_by_name_first() {
    let db = setup_db();
    seed(&db);

    let alice = Person::find_by("name", "Alice").first(&db).unwrap().unwrap();
    assert_eq!(alice.name, "Alice");
    assert_eq!(alice.email.as_deref(), Some("alice@example.com"));
    assert_eq!(alice.role_id, Some(1));

    assert!(Person::find_by("name", "Zed").first(&db).unwrap().is_none());
}

#[test]
fn join_role_yields_person_then_nested_role() {
    let db = setup_db();
    seed(&db);

    let query = Person::find_by("name", "Bob").join("role");
    let built = query.to_sql(&db).unwrap();
    assert_eq!(
        built.sql,
        "SELECT app_person.p_id, app_person.p_name, app_person.p_email, app_person.p_role, \
         app_role.r_id, app_role.r_title \
         FROM app_person LEFT JOIN app_role ON (app_person.p_role = app_role.r_id) \
         WHERE (app_person.p_name = ?)"
    );

    let bob = query.first(&db).unwrap().unwrap();
    assert_eq!(bob.id, Some(2));
    let role: Role = bob.joined.get("role").unwrap();
    assert_eq!(
        role,
        Role {
            id: Some(2),
            title: "staff".into()
        }
    );

    let carol = Person::find_by("name", "Carol")
        .join("role")
        .first(&db)
        .unwrap()
        .unwrap();
    assert!(carol.joined.get_opt::<Role>("role").unwrap().is_none());
}

#[test]
fn filter_on_joined_entity() {
    let db = setup_db();
    seed(&db);

    let admins = Person::query()
        .join("role")
        .filter("[Role.title] = ?", "admin")
        .all(&db)
        .unwrap();
    assert_eq!(admins.len(), 1);
    assert_eq!(admins[0].name, "Alice");
}

#[test]
fn filter_binds_exactly_one_parameter() {
    let db = setup_db();
    let built = Person::filter("[email] = ?", "a@x.com").to_sql(&db).unwrap();
    assert_eq!(built.sql.matches('?').count(), 1);
    assert!(built.sql.ends_with("WHERE (app_person.p_email = ?)"));
    assert_eq!(built.params, vec![Value::from("a@x.com")]);
}

#[test]
fn find_fields_conjunction_sql_and_args() {
    let db = setup_db();
    seed(&db);

    let query = Person::find_fields([("name", Value::from("Bob")), ("role_id", Value::from(2))]);
    let built = query.select_sql(&SqlContext::of(&db)).unwrap();
    assert!(built
        .sql
        .ends_with("WHERE (app_person.p_name = ?) AND (app_person.p_role = ?)"));
    assert_eq!(built.params, vec![Value::from("Bob"), Value::Integer(2)]);
    assert_eq!(query.count(&db).unwrap(), 1);
}

#[test]
fn count_equals_all_len() {
    let db = setup_db();
    seed(&db);

    let query = Person::query();
    assert_eq!(query.count(&db).unwrap(), 3);
    assert_eq!(query.count(&db).unwrap(), query.all(&db).unwrap().len() as u64);
}

#[test]
fn range_pages_are_disjoint_and_contiguous() {
    let db = setup_db();
    for i in 0..25 {
        Person::named(&format!("person{i:02}")).save(&db).unwrap().unwrap();
    }

    let query = Person::query().order_asc("id");
    let first = query.range(&db, 0, 10).unwrap();
    let second = query.range(&db, 10, 10).unwrap();
    let all = query.all(&db).unwrap();

    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 10);
    let paged: Vec<_> = first.iter().chain(&second).map(|p| p.id).collect();
    let expected: Vec<_> = all[..20].iter().map(|p| p.id).collect();
    assert_eq!(paged, expected);

    let tail = query.range(&db, 20, 10).unwrap();
    assert_eq!(tail.len(), 5);
}

#[test]
fn update_binds_set_args_then_where_args() {
    let db = setup_db();
    seed(&db);

    let query = Person::filter("[role_id] = ?", 2);
    let built = query
        .update_sql(&SqlContext::of(&db), "[name] = ?", "Robert")
        .unwrap();
    assert_eq!(
        built.sql,
        "UPDATE app_person SET p_name = ? WHERE (app_person.p_role = ?)"
    );
    assert_eq!(built.params, vec![Value::from("Robert"), Value::Integer(2)]);

    assert_eq!(query.update(&db, "[name] = ?", "Robert").unwrap(), 1);
    let bob = Person::get(&db, 2).unwrap().unwrap();
    assert_eq!(bob.name, "Robert");
}

#[test]
fn like_and_in_list() {
    let db = setup_db();
    seed(&db);

    let matched = Person::query().like("name", "o").order_asc("name").all(&db).unwrap();
    let names: Vec<_> = matched.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Bob", "Carol"]);

    let listed = Person::query().in_list("id", [1, 3]).count(&db).unwrap();
    assert_eq!(listed, 2);
}

#[test]
fn in_list_matches_text_values_verbatim() {
    let db = setup_db();
    seed(&db);
    Person::named("[email]").save(&db).unwrap().unwrap();

    let matched = Person::query()
        .in_list("name", ["Alice", "[email]", "[nickname]"])
        .order_asc("id")
        .all(&db)
        .unwrap();
    let names: Vec<_> = matched.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Alice", "[email]"]);

    assert!(matches!(
        Person::query().in_list("nickname", ["x"]).all(&db),
        Err(OrmError::Mapping { .. })
    ));
}

#[test]
fn order_desc_and_first() {
    let db = setup_db();
    seed(&db);

    let last = Person::query().order_desc("name").first(&db).unwrap().unwrap();
    assert_eq!(last.name, "Carol");
}

#[test]
fn symbolic_errors_surface_at_execution() {
    let db = setup_db();

    assert!(matches!(
        Person::filter("[nickname] = ?", "x").all(&db),
        Err(OrmError::Mapping { .. })
    ));
    assert!(matches!(
        Person::query().join("manager").all(&db),
        Err(OrmError::UnknownRelation { .. })
    ));
    assert!(matches!(
        Person::filter("[Team.id] = ?", 1).all(&db),
        Err(OrmError::UnknownEntity(_))
    ));
    assert!(matches!(
        Person::filter("[id] = ? AND [name] = ?", 1).all(&db),
        Err(OrmError::ParameterCount { .. })
    ));
}
