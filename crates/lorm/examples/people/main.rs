//! People and roles on an in-memory database.
//!
//! Run with:
//!   cargo run --example people -p lorm
//!
//! Set `RUST_LOG=lorm.sql=debug` to see every statement.

use lorm::prelude::*;

#[derive(Debug, Clone, Default, Entity)]
#[orm(table = "person", rules = "person_rules")]
#[orm(relation(name = "role", entity = "Role", on = "[role_id] = [Role.id]"))]
struct Person {
    #[orm(id, column = "p_id", protected)]
    id: Option<i64>,
    #[orm(column = "p_name")]
    name: String,
    #[orm(column = "p_email")]
    email: Option<String>,
    #[orm(column = "p_role")]
    role_id: Option<i64>,
    #[orm(joined)]
    joined: Joined,
    #[orm(errors)]
    errors: ValidationErrors,
}

fn person_rules() -> Vec<Rule> {
    vec![
        Rule::new("name", Check::Required),
        Rule::new("email", Check::Email),
    ]
}

#[derive(Debug, Clone, Default, Entity)]
#[orm(table = "role")]
struct Role {
    #[orm(column = "r_id")]
    id: Option<i64>,
    #[orm(column = "r_title")]
    title: String,
}

fn main() -> OrmResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let db = Database::open_in_memory()?.with_prefix("demo_");
    db.execute_batch(
        "CREATE TABLE demo_role (r_id INTEGER PRIMARY KEY, r_title TEXT NOT NULL);
         CREATE TABLE demo_person (
             p_id INTEGER PRIMARY KEY,
             p_name TEXT NOT NULL,
             p_email TEXT UNIQUE,
             p_role INTEGER
         );",
    )?;

    let mut admin = Role {
        title: "admin".into(),
        ..Default::default()
    };
    admin.save(&db)?;

    for (name, email) in [("Alice", "alice@example.com"), ("Bob", "bob@example.com")] {
        let mut person = Person {
            name: name.into(),
            email: Some(email.into()),
            role_id: admin.id.filter(|_| name == "Alice"),
            ..Default::default()
        };
        person.validate_save(&db, None)?;
    }

    let mut invalid = Person {
        name: "Mallory".into(),
        email: Some("mallory-at-example".into()),
        ..Default::default()
    };
    if invalid.validate_save(&db, None)?.is_none() {
        println!("rejected Mallory: {:?}", invalid.errors.messages());
    }

    if let Some(alice) = Person::find_by("name", "Alice").join("role").first(&db)? {
        let role = alice.joined.get_opt::<Role>("role")?;
        println!(
            "{} <{}> is {}",
            alice.name,
            alice.email.as_deref().unwrap_or("-"),
            role.map_or("unassigned".to_string(), |r| r.title)
        );
    }

    let people = Person::query().order_asc("name").range(&db, 0, 10)?;
    println!("{} of {} people on the first page", people.len(), Person::query().count(&db)?);

    let renamed = Person::find_by("name", "Bob").update(&db, "[name] = ?", "Robert")?;
    println!("renamed {renamed} row(s)");

    let built = Person::filter("[email] LIKE ?", "%@example.com").to_sql(&db)?;
    println!("{}  -- {:?}", built.sql, built.params);

    Ok(())
}
