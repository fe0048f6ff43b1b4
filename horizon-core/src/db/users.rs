use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{now, ts_value, uuid_value, Database};
use crate::error::CoreError;
use crate::models::User;

impl Database {
    /// Insert a user on first sight, refresh the email otherwise. Called by
    /// the auth layer whenever a verified token arrives; this is the only
    /// way user rows come into existence.
    pub fn upsert_user(&self, id: Uuid, email: &str) -> Result<User, CoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET email = excluded.email",
                params![id.to_string(), email, now()],
            )?;
            fetch_user(conn, id)?.ok_or(CoreError::NotFound("User"))
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, CoreError> {
        self.with_conn(|conn| fetch_user(conn, id))
    }
}

fn fetch_user(conn: &Connection, id: Uuid) -> Result<Option<User>, CoreError> {
    let user = conn
        .query_row(
            "SELECT * FROM users WHERE id = ?1",
            params![id.to_string()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_value(&row.get::<_, String>("id")?)?,
        email: row.get("email")?,
        created_at: ts_value(&row.get::<_, String>("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_upsert_creates_user() {
        let db = setup_db();
        let id = Uuid::new_v4();
        let user = db.upsert_user(id, "a@example.com").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "a@example.com");
    }

    #[test]
    fn test_upsert_refreshes_email() {
        let db = setup_db();
        let id = Uuid::new_v4();
        db.upsert_user(id, "old@example.com").unwrap();
        let user = db.upsert_user(id, "new@example.com").unwrap();
        assert_eq!(user.email, "new@example.com");
    }

    #[test]
    fn test_get_user_missing() {
        let db = setup_db();
        assert!(db.get_user(Uuid::new_v4()).unwrap().is_none());
    }
}
