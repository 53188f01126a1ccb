#![allow(dead_code)]

use lorm::prelude::*;
use std::sync::Once;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "person", rules = "person_rules")]
#[orm(relation(name = "role", entity = "Role", on = "[role_id] = [Role.id]"))]
pub struct Person {
    #[orm(id, column = "p_id", protected)]
    pub id: Option<i64>,
    #[orm(column = "p_name")]
    pub name: String,
    #[orm(column = "p_email")]
    pub email: Option<String>,
    #[orm(column = "p_role")]
    pub role_id: Option<i64>,
    #[orm(joined)]
    pub joined: Joined,
    #[orm(errors)]
    pub errors: ValidationErrors,
}

fn person_rules() -> Vec<Rule> {
    vec![
        Rule::new("name", Check::Required),
        Rule::new("name", Check::MaxLen(32)),
        Rule::new("email", Check::Email).on("register"),
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "role")]
pub struct Role {
    #[orm(column = "r_id")]
    pub id: Option<i64>,
    #[orm(column = "r_title")]
    pub title: String,
}

impl Person {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "lorm.sql=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// An in-memory database with prefixed `person` and `role` tables.
pub fn setup_db() -> Database {
    init_tracing();
    let db = Database::open_in_memory()
        .expect("open in-memory database")
        .with_prefix("app_");
    db.execute_batch(
        "CREATE TABLE app_role (
            r_id INTEGER PRIMARY KEY,
            r_title TEXT NOT NULL
        );
        CREATE TABLE app_person (
            p_id INTEGER PRIMARY KEY,
            p_name TEXT NOT NULL,
            p_email TEXT UNIQUE,
            p_role INTEGER REFERENCES app_role (r_id)
        );",
    )
    .expect("create schema");
    db
}

/// Roles `admin` (1) and `staff` (2), and people Alice (admin), Bob (staff),
/// Carol (no role).
pub fn seed(db: &Database) {
    for title in ["admin", "staff"] {
        let mut role = Role {
            title: title.to_string(),
            ..Default::default()
        };
        role.save(db).expect("save role").expect("role saved");
    }
    for (name, email, role_id) in [
        ("Alice", "alice@example.com", Some(1)),
        ("Bob", "bob@example.com", Some(2)),
        ("Carol", "carol@example.com", None),
    ] {
        let mut person = Person {
            name: name.to_string(),
            email: Some(email.to_string()),
            role_id,
            ..Default::default()
        };
        person.save(db).expect("save person").expect("person saved");
    }
}
