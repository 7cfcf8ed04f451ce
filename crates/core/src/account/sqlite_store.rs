//! SQLite-backed account store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::{NewUser, Role, StoredSession, User, UserStore, UserStoreError};
use crate::shipment::Address;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, phone_number, street, city, state, zip_code, country, roles, created_at, updated_at";

/// SQLite-backed store for users and their sessions.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn new(path: &Path) -> Result<Self, UserStoreError> {
        let conn = Connection::open(path).map_err(|e| UserStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, UserStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| UserStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), UserStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                phone_number TEXT NOT NULL DEFAULT '',
                street TEXT NOT NULL DEFAULT '',
                city TEXT NOT NULL DEFAULT '',
                state TEXT NOT NULL DEFAULT '',
                zip_code TEXT NOT NULL DEFAULT '',
                country TEXT NOT NULL DEFAULT '',
                roles TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token_hash TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
            "#,
        )
        .map_err(|e| UserStoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, UserStoreError> {
        self.conn
            .lock()
            .map_err(|_| UserStoreError::Database("connection mutex poisoned".to_string()))
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn encode_roles(roles: &[Role]) -> String {
        roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn decode_roles(raw: &str) -> Vec<Role> {
        raw.split(',').filter_map(Role::parse).collect()
    }

    fn map_write_error(e: rusqlite::Error, email: &str) -> UserStoreError {
        match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                UserStoreError::EmailTaken(email.to_string())
            }
            other => UserStoreError::Database(other.to_string()),
        }
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let roles: String = row.get(11)?;
        let created_at: String = row.get(12)?;
        let updated_at: String = row.get(13)?;

        Ok(User {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            password_hash: row.get(4)?,
            phone_number: row.get(5)?,
            address: Address {
                street: row.get(6)?,
                city: row.get(7)?,
                state: row.get(8)?,
                zip_code: row.get(9)?,
                country: row.get(10)?,
            },
            roles: Self::decode_roles(&roles),
            created_at: Self::parse_timestamp(&created_at),
            updated_at: Self::parse_timestamp(&updated_at),
        })
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<StoredSession> {
        let created_at: String = row.get(2)?;
        let expires_at: String = row.get(3)?;

        Ok(StoredSession {
            token_hash: row.get(0)?,
            user_id: row.get(1)?,
            created_at: Self::parse_timestamp(&created_at),
            expires_at: Self::parse_timestamp(&expires_at),
        })
    }

    fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>, UserStoreError> {
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            params![id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| UserStoreError::Database(e.to_string()))
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user: &NewUser) -> Result<User, UserStoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        let email = user.email.trim().to_lowercase();

        conn.execute(
            "INSERT INTO users (first_name, last_name, email, password_hash, phone_number, street, city, state, zip_code, country, roles, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                user.first_name.trim(),
                user.last_name.trim(),
                email,
                user.password_hash,
                user.phone_number.trim(),
                user.address.street.trim(),
                user.address.city.trim(),
                user.address.state.trim(),
                user.address.zip_code.trim(),
                user.address.country.trim(),
                Self::encode_roles(&user.roles),
                now,
                now,
            ],
        )
        .map_err(|e| Self::map_write_error(e, &email))?;

        let id = conn.last_insert_rowid();
        Self::fetch_user(&conn, id)?.ok_or(UserStoreError::UserNotFound(id))
    }

    fn get_user(&self, id: i64) -> Result<Option<User>, UserStoreError> {
        let conn = self.lock()?;
        Self::fetch_user(&conn, id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
            params![email.trim().to_lowercase()],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| UserStoreError::Database(e.to_string()))
    }

    fn update_user(&self, user: &User) -> Result<User, UserStoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        let email = user.email.trim().to_lowercase();

        let changed = conn
            .execute(
                "UPDATE users SET first_name = ?, last_name = ?, email = ?, password_hash = ?, phone_number = ?, street = ?, city = ?, state = ?, zip_code = ?, country = ?, roles = ?, updated_at = ? WHERE id = ?",
                params![
                    user.first_name.trim(),
                    user.last_name.trim(),
                    email,
                    user.password_hash,
                    user.phone_number.trim(),
                    user.address.street.trim(),
                    user.address.city.trim(),
                    user.address.state.trim(),
                    user.address.zip_code.trim(),
                    user.address.country.trim(),
                    Self::encode_roles(&user.roles),
                    now,
                    user.id,
                ],
            )
            .map_err(|e| Self::map_write_error(e, &email))?;

        if changed == 0 {
            return Err(UserStoreError::UserNotFound(user.id));
        }

        Self::fetch_user(&conn, user.id)?.ok_or(UserStoreError::UserNotFound(user.id))
    }

    fn insert_session(&self, session: &StoredSession) -> Result<(), UserStoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
            params![
                session.token_hash,
                session.user_id,
                session.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                session.expires_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )
        .map_err(|e| UserStoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn get_session(&self, token_hash: &str) -> Result<Option<StoredSession>, UserStoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT token_hash, user_id, created_at, expires_at FROM sessions WHERE token_hash = ?",
            params![token_hash],
            Self::row_to_session,
        )
        .optional()
        .map_err(|e| UserStoreError::Database(e.to_string()))
    }

    fn delete_session(&self, token_hash: &str) -> Result<bool, UserStoreError> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM sessions WHERE token_hash = ?",
                params![token_hash],
            )
            .map_err(|e| UserStoreError::Database(e.to_string()))?;
        Ok(deleted > 0)
    }

    fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, UserStoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT token_hash, user_id, created_at, expires_at FROM sessions")
            .map_err(|e| UserStoreError::Database(e.to_string()))?;

        let expired: Vec<String> = stmt
            .query_map([], Self::row_to_session)
            .map_err(|e| UserStoreError::Database(e.to_string()))?
            .filter_map(Result::ok)
            .filter(|s| s.is_expired(now))
            .map(|s| s.token_hash)
            .collect();
        drop(stmt);

        for token_hash in &expired {
            conn.execute(
                "DELETE FROM sessions WHERE token_hash = ?",
                params![token_hash],
            )
            .map_err(|e| UserStoreError::Database(e.to_string()))?;
        }

        Ok(expired.len())
    }
}
