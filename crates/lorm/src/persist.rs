//! Single-row writes for entity records.
//!
//! Each function issues exactly one autocommit statement.

use crate::client::Connection;
use crate::error::OrmResult;
use crate::meta::EntityDescriptor;
use crate::record::Record;
use crate::value::Value;

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn value_of(record: &Record, field: &str) -> Value {
    record.get(field).cloned().unwrap_or(Value::Null)
}

/// `INSERT` every non-key field in mapping order and return the generated key.
pub fn insert<C: Connection + ?Sized>(
    conn: &C,
    descriptor: &EntityDescriptor,
    record: &Record,
) -> OrmResult<Value> {
    let table = descriptor.table_name(conn.table_prefix());
    let fields: Vec<_> = descriptor.non_key_fields().collect();

    let sql = if fields.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        let columns: Vec<&str> = fields.iter().map(|f| f.column.as_str()).collect();
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders(fields.len())
        )
    };
    let params: Vec<Value> = fields.iter().map(|f| value_of(record, &f.name)).collect();

    conn.execute(&sql, &params)?;
    conn.last_insert_id()
}

/// `REPLACE INTO` the key plus every non-key field and return the key.
pub fn replace<C: Connection + ?Sized>(
    conn: &C,
    descriptor: &EntityDescriptor,
    record: &Record,
) -> OrmResult<Value> {
    let table = descriptor.table_name(conn.table_prefix());
    let pk_field = descriptor.primary_key_field();
    let pk = value_of(record, pk_field);

    let mut columns = vec![descriptor.primary_key_column()?];
    let mut params = vec![pk.clone()];
    for field in descriptor.non_key_fields() {
        columns.push(field.column.as_str());
        params.push(value_of(record, &field.name));
    }

    let sql = format!(
        "REPLACE INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders(columns.len())
    );
    conn.execute(&sql, &params)?;
    Ok(pk)
}

/// Insert when the key is NULL, replace otherwise, writing the key back into
/// `record`.
///
/// Statement failures are logged and reported as `Ok(None)`; mapping problems
/// are errors.
pub fn save<C: Connection + ?Sized>(
    conn: &C,
    descriptor: &EntityDescriptor,
    record: &mut Record,
) -> OrmResult<Option<Value>> {
    let pk_field = descriptor.primary_key_field();
    let result = if value_of(record, pk_field).is_null() {
        insert(conn, descriptor, record)
    } else {
        replace(conn, descriptor, record)
    };

    match result {
        Ok(pk) => {
            record.set(pk_field, pk.clone());
            Ok(Some(pk))
        }
        Err(err) if err.is_statement_error() => {
            tracing::warn!(
                target: "lorm.sql",
                entity = descriptor.name(),
                error = %err,
                "save failed",
            );
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Delete the row whose key is `pk`. A NULL key deletes nothing.
pub fn delete<C: Connection + ?Sized>(
    conn: &C,
    descriptor: &EntityDescriptor,
    pk: &Value,
) -> OrmResult<u64> {
    if pk.is_null() {
        return Ok(0);
    }
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        descriptor.table_name(conn.table_prefix()),
        descriptor.primary_key_column()?
    );
    conn.execute(&sql, std::slice::from_ref(pk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;

    fn setup() -> (rusqlite::Connection, EntityDescriptor) {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE note (n_id INTEGER PRIMARY KEY, n_title TEXT NOT NULL, n_body TEXT)",
        )
        .unwrap();
        let note = EntityDescriptor::new("Note", "note")
            .field("id", "n_id")
            .field("title", "n_title")
            .field("body", "n_body");
        (conn, note)
    }

    fn count(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM note", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn null_key_inserts_and_adopts_generated_id() {
        let (conn, note) = setup();
        let mut record = Record::new("Note")
            .with("id", Value::Null)
            .with("title", "first")
            .with("body", "hello");
        let pk = save(&conn, &note, &mut record).unwrap();
        assert_eq!(pk, Some(Value::Integer(1)));
        assert_eq!(record.get("id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn existing_key_replaces_row() {
        let (conn, note) = setup();
        let mut record = Record::new("Note")
            .with("id", Value::Null)
            .with("title", "draft");
        save(&conn, &note, &mut record).unwrap();
        record.set("title", "final");
        assert_eq!(save(&conn, &note, &mut record).unwrap(), Some(Value::Integer(1)));
        assert_eq!(count(&conn), 1);
        let title: String = conn
            .query_row("SELECT n_title FROM note WHERE n_id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(title, "final");
    }

    #[test]
    fn explicit_key_on_new_row_is_kept() {
        let (conn, note) = setup();
        let mut record = Record::new("Note").with("id", 40).with("title", "pinned");
        assert_eq!(save(&conn, &note, &mut record).unwrap(), Some(Value::Integer(40)));
    }

    #[test]
    fn constraint_failure_is_soft() {
        let (conn, note) = setup();
        let mut record = Record::new("Note").with("id", Value::Null).with("title", Value::Null);
        assert_eq!(save(&conn, &note, &mut record).unwrap(), None);
        assert_eq!(record.get("id"), Some(&Value::Null));
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn unmapped_key_is_a_hard_error() {
        let (conn, _) = setup();
        let odd = EntityDescriptor::new("Note", "note")
            .primary_key("uid")
            .field("title", "n_title");
        let mut record = Record::new("Note").with("uid", 3).with("title", "x");
        assert!(matches!(
            save(&conn, &odd, &mut record),
            Err(OrmError::Mapping { .. })
        ));
    }

    #[test]
    fn delete_by_key() {
        let (conn, note) = setup();
        let mut record = Record::new("Note").with("id", Value::Null).with("title", "x");
        let pk = save(&conn, &note, &mut record).unwrap().unwrap();
        assert_eq!(delete(&conn, &note, &Value::Null).unwrap(), 0);
        assert_eq!(delete(&conn, &note, &pk).unwrap(), 1);
        assert_eq!(count(&conn), 0);
    }
}
