use super::*;
use crate::client::Row;
use crate::meta::Registry;

struct TestDb {
    conn: rusqlite::Connection,
    registry: Registry,
    prefix: &'static str,
}

impl Connection for TestDb {
    fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        Connection::query(&self.conn, sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        Connection::execute(&self.conn, sql, params)
    }

    fn last_insert_id(&self) -> OrmResult<Value> {
        self.conn.last_insert_id()
    }

    fn table_prefix(&self) -> &str {
        self.prefix
    }

    fn registry(&self) -> &Registry {
        &self.registry
    }
}

fn db() -> (TestDb, Arc<EntityDescriptor>) {
    let registry = Registry::new();
    let person = registry.register(
        EntityDescriptor::new("Person", "person")
            .field("id", "p_id")
            .field("name", "p_name")
            .field("email", "p_email")
            .field("role_id", "p_role")
            .relation("role", "Role", "[role_id] = [Role.id]"),
    );
    registry.register(
        EntityDescriptor::new("Role", "role")
            .field("id", "r_id")
            .field("title", "r_title"),
    );

    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE t_role (r_id INTEGER PRIMARY KEY, r_title TEXT);
         CREATE TABLE t_person (p_id INTEGER PRIMARY KEY, p_name TEXT, p_email TEXT, p_role INTEGER);
         INSERT INTO t_role VALUES (1, 'admin'), (2, 'staff');
         INSERT INTO t_person VALUES
            (1, 'Alice', 'alice@example.com', 1),
            (2, 'Bob', 'bob@example.com', 2),
            (3, 'Carol', 'carol@example.com', NULL),
            (4, 'Dave', 'dave@example.com', 2);",
    )
    .unwrap();

    (
        TestDb {
            conn,
            registry,
            prefix: "t_",
        },
        person,
    )
}

fn q(person: &Arc<EntityDescriptor>) -> Query<Record> {
    Query::with_descriptor(Arc::clone(person))
}

#[test]
fn filter_binds_one_parameter_per_placeholder() {
    let (db, person) = db();
    let built = q(&person).filter("[name] = ?", "Alice").to_sql(&db).unwrap();
    assert_eq!(
        built.sql,
        "SELECT t_person.p_id, t_person.p_name, t_person.p_email, t_person.p_role \
         FROM t_person WHERE (t_person.p_name = ?)"
    );
    assert_eq!(built.params, vec![Value::from("Alice")]);
}

#[test]
fn find_fields_is_a_left_to_right_conjunction() {
    let (db, person) = db();
    let query = q(&person).find_fields([("name", Value::from("Bob")), ("role_id", Value::from(2))]);
    let built = query.to_sql(&db).unwrap();
    assert!(
        built
            .sql
            .ends_with("WHERE (t_person.p_name = ?) AND (t_person.p_role = ?)"),
        "{}",
        built.sql
    );
    assert_eq!(built.params, vec![Value::from("Bob"), Value::Integer(2)]);
    assert_eq!(query.all(&db).unwrap().len(), 1);
}

#[test]
fn first_returns_none_when_nothing_matches() {
    let (db, person) = db();
    assert!(q(&person).find(99).first(&db).unwrap().is_none());
    let alice = q(&person).find(1).first(&db).unwrap().unwrap();
    assert_eq!(alice.get("name"), Some(&Value::from("Alice")));
}

#[test]
fn join_decodes_nested_record() {
    let (db, person) = db();
    let people = q(&person)
        .join("role")
        .join("role")
        .filter("[Role.title] = ?", "staff")
        .order_asc("name")
        .all(&db)
        .unwrap();
    let names: Vec<_> = people.iter().map(|p| p.get("name").cloned().unwrap()).collect();
    assert_eq!(names, vec![Value::from("Bob"), Value::from("Dave")]);
    let role = people[0].joined().record("role").unwrap();
    assert_eq!(role.get("title"), Some(&Value::from("staff")));
    assert_eq!(people[0].joined().len(), 1);
}

#[test]
fn unmatched_left_join_is_all_null() {
    let (db, person) = db();
    let carol = q(&person).join("role").find(3).first(&db).unwrap().unwrap();
    assert!(carol.joined().get_opt::<Record>("role").unwrap().is_none());
}

#[test]
fn unknown_relation_fails_at_execution() {
    let (db, person) = db();
    let query = q(&person).join("manager");
    assert!(matches!(
        query.all(&db),
        Err(OrmError::UnknownRelation { .. })
    ));
}

#[test]
fn unmapped_field_fails_at_execution() {
    let (db, person) = db();
    assert!(matches!(
        q(&person).find_by("nickname", "x").all(&db),
        Err(OrmError::Mapping { ref field, .. }) if field == "nickname"
    ));
    assert!(matches!(
        q(&person).filter("[nickname] = ?", "x").count(&db),
        Err(OrmError::Mapping { .. })
    ));
}

#[test]
fn count_matches_all_and_ignores_joins() {
    let (db, person) = db();
    let query = q(&person).join("role").filter("[id] > ?", 1).order_desc("id");
    assert_eq!(query.count(&db).unwrap(), query.all(&db).unwrap().len() as u64);
    let built = query.count_sql(&SqlContext::of(&db)).unwrap();
    assert_eq!(
        built.sql,
        "SELECT COUNT(*) FROM t_person WHERE (t_person.p_id > ?)"
    );
    assert!(query.exists(&db).unwrap());
    assert!(!q(&person).find(42).exists(&db).unwrap());
}

#[test]
fn range_pages_are_disjoint() {
    let (db, person) = db();
    let query = q(&person).order_asc("id");
    let first = query.range(&db, 0, 2).unwrap();
    let second = query.range(&db, 2, 2).unwrap();
    let ids = |page: &[Record]| -> Vec<Value> {
        page.iter().map(|p| p.get("id").cloned().unwrap()).collect()
    };
    assert_eq!(ids(&first), vec![Value::Integer(1), Value::Integer(2)]);
    assert_eq!(ids(&second), vec![Value::Integer(3), Value::Integer(4)]);
}

#[test]
fn like_wraps_value_in_wildcards() {
    let (db, person) = db();
    let query = q(&person).like("email", "example");
    assert_eq!(query.args(), [Value::from("%example%")]);
    assert_eq!(query.count(&db).unwrap(), 4);
}

#[test]
fn in_list_inlines_literals() {
    let (db, person) = db();
    let query = q(&person).in_list("name", ["Alice", "O'Brien"]);
    let built = query.to_sql(&db).unwrap();
    assert!(
        built.sql.ends_with("WHERE (t_person.p_name IN ('Alice','O''Brien'))"),
        "{}",
        built.sql
    );
    assert!(built.params.is_empty());
    assert_eq!(query.count(&db).unwrap(), 1);
}

#[test]
fn in_list_literals_are_not_substituted() {
    let (db, person) = db();
    let query = q(&person).in_list("name", ["[email]", "[nickname]"]);
    let built = query.to_sql(&db).unwrap();
    assert!(
        built
            .sql
            .ends_with("WHERE (t_person.p_name IN ('[email]','[nickname]'))"),
        "{}",
        built.sql
    );
    assert_eq!(query.count(&db).unwrap(), 0);
}

#[test]
fn update_binds_set_args_before_where_args() {
    let (db, person) = db();
    let query = q(&person).filter("[role_id] = ?", 2);
    let built = query
        .update_sql(&SqlContext::of(&db), "[name] = ?", "Staffer")
        .unwrap();
    assert_eq!(
        built.sql,
        "UPDATE t_person SET p_name = ? WHERE (t_person.p_role = ?)"
    );
    assert_eq!(built.params, vec![Value::from("Staffer"), Value::Integer(2)]);
    assert_eq!(query.update(&db, "[name] = ?", "Staffer").unwrap(), 2);
    assert_eq!(
        q(&person).find_by("name", "Staffer").count(&db).unwrap(),
        2
    );
}

#[test]
fn delete_uses_where_only() {
    let (db, person) = db();
    let removed = q(&person).filter("[id] IN (?, ?)", [1, 2]).order_asc("name").delete(&db).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(q(&person).count(&db).unwrap(), 2);
    assert_eq!(q(&person).delete(&db).unwrap(), 2);
    assert_eq!(q(&person).count(&db).unwrap(), 0);
}

#[test]
fn argument_count_mismatch_surfaces() {
    let (db, person) = db();
    let err = q(&person).filter("[id] = ? OR [id] = ?", 1).all(&db).unwrap_err();
    assert!(matches!(err, OrmError::ParameterCount { .. }), "{err:?}");
}

#[test]
fn order_expression_is_substituted() {
    let (db, person) = db();
    let built = q(&person)
        .order(Direction::Desc, "length([name])")
        .order_asc("id")
        .to_sql(&db)
        .unwrap();
    assert!(
        built
            .sql
            .ends_with("ORDER BY length(t_person.p_name) DESC, t_person.p_id ASC"),
        "{}",
        built.sql
    );
}
