//! # Database
//!
//! SQLite database wrapper for Amity storage.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE LAYER                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │   Database      │  UserStore impl + media metadata                  │
//! │  │   (Arc<Mutex>)  │                                                   │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   SQLite DB     │  Storage                                          │
//! │  │   (file or      │  - In-memory for tests                            │
//! │  │    memory)      │  - File for production                            │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A user row plus its `friendships` and `friend_requests` rows form one
//! logical record. Every write replaces all three inside one transaction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{schema, StoreResult, UserStore};
use crate::error::{Result, StoreError};
use crate::media::{MediaKind, MediaQuery, MediaRecord};
use crate::users::User;

/// How long a writer waits on a locked database file before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const USER_COLUMNS: &str = "id, username, email, password_hash, bio, avatar, interests, \
                            profile_complete, version, created_at, updated_at";

const MEDIA_COLUMNS: &str = "id, owner_id, filename, storage_key, url, kind, content_type, \
                             size, created_at, updated_at";

/// The main database handle
///
/// This wraps a SQLite connection and provides the [`UserStore`]
/// implementation plus media metadata queries. Cloning shares the
/// connection.
#[derive(Clone)]
pub struct Database {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub async fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => {
                let conn = Connection::open(p).map_err(|e| {
                    StoreError::Backend(format!("Failed to open database: {}", e))
                })?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn
            }
            None => Connection::open_in_memory().map_err(|e| {
                StoreError::Backend(format!("Failed to create in-memory database: {}", e))
            })?,
        };
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        // Initialize schema
        db.init_schema()?;

        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        // Check current schema version
        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                // Fresh database, create all tables
                conn.execute_batch(schema::CREATE_TABLES).map_err(|e| {
                    StoreError::Backend(format!("Failed to create tables: {}", e))
                })?;

                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )
                .map_err(|e| StoreError::Backend(format!("Failed to set schema version: {}", e)))?;

                tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) if v < schema::SCHEMA_VERSION => {
                tracing::info!(
                    "Database schema version {} is older than current {}, running migrations",
                    v,
                    schema::SCHEMA_VERSION
                );

                if v < 2 {
                    tracing::info!("Running migration v1 → v2 (media)");
                    conn.execute_batch(schema::MIGRATE_V1_TO_V2).map_err(|e| {
                        StoreError::Backend(format!("Migration v1→v2 failed: {}", e))
                    })?;
                }

                tracing::info!("All migrations complete (now at version {})", schema::SCHEMA_VERSION);
            }
            Some(v) => {
                tracing::debug!("Database schema version: {}", v);
            }
        }

        Ok(())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    // ========================================================================
    // MEDIA OPERATIONS
    // ========================================================================

    /// Store a media metadata row
    pub fn insert_media(&self, record: &MediaRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO media (id, owner_id, filename, filename_lower, storage_key, url, kind,
                                content_type, size, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id,
                record.owner_id,
                record.filename,
                record.filename.to_lowercase(),
                record.storage_key,
                record.url,
                record.kind.as_str(),
                record.content_type,
                record.size,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a media row by id
    pub fn get_media(&self, id: &str) -> Result<Option<MediaRecord>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM media WHERE id = ?1", MEDIA_COLUMNS);
        Ok(conn.query_row(&sql, [id], media_from_row).optional()?)
    }

    /// Get a media row by its object storage key
    pub fn get_media_by_key(&self, key: &str) -> Result<Option<MediaRecord>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM media WHERE storage_key = ?1", MEDIA_COLUMNS);
        Ok(conn.query_row(&sql, [key], media_from_row).optional()?)
    }

    /// Delete a media row. Returns false if it did not exist.
    pub fn delete_media(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM media WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// All media owned by a user, newest first
    pub fn media_for_owner(&self, owner_id: &str) -> Result<Vec<MediaRecord>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM media WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
            MEDIA_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([owner_id], media_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Filtered, sorted media listing
    ///
    /// The created-at range only applies when both bounds are present.
    pub fn search_media(&self, query: &MediaQuery) -> Result<Vec<MediaRecord>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(filename) = query.filename.as_deref().filter(|f| !f.is_empty()) {
            clauses.push("instr(filename_lower, ?) > 0");
            values.push(Value::Text(filename.to_lowercase()));
        }
        if let Some(kind) = query.kind {
            clauses.push("kind = ?");
            values.push(Value::Text(kind.as_str().to_string()));
        }
        if let (Some(from), Some(to)) = (query.created_from, query.created_to) {
            clauses.push("created_at BETWEEN ? AND ?");
            values.push(Value::Integer(from));
            values.push(Value::Integer(to));
        }

        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let direction = query.order.as_sql();
        let sql = format!(
            "SELECT {} FROM media{} ORDER BY {} {}, rowid {}",
            MEDIA_COLUMNS,
            filter,
            query.sort.column(),
            direction,
            direction
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), media_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

// ============================================================================
// USER STORE
// ============================================================================

#[async_trait]
impl UserStore for Database {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| load_user_where(conn, "id", id))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| load_user_where(conn, "email", &email.to_lowercase()))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| load_user_where(conn, "username", username))
    }

    async fn find_by_name(&self, pattern: &str) -> StoreResult<Vec<User>> {
        let needle = pattern.to_lowercase();
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE instr(username_lower, ?1) > 0 \
                 ORDER BY username_lower, id",
                USER_COLUMNS
            );
            let mut users = {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([needle.as_str()], user_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };
            for user in &mut users {
                load_relationships(conn, user)?;
            }
            Ok(users)
        })
    }

    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        self.with_conn(|conn| {
            let mut users = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(user) = load_user_where(conn, "id", id)? {
                    users.push(user);
                }
            }
            Ok(users)
        })
    }

    async fn insert(&self, user: &mut User) -> StoreResult<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO users ({}, username_lower) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    USER_COLUMNS
                ),
                params![
                    user.id,
                    user.username,
                    user.email,
                    user.password_hash,
                    user.bio,
                    user.avatar,
                    encode_interests(&user.interests)?,
                    user.profile_complete,
                    user.version,
                    user.created_at,
                    user.updated_at,
                    user.username.to_lowercase(),
                ],
            )?;
            replace_relationships(&tx, user)?;
            tx.commit()?;
            Ok(())
        })?;

        tracing::debug!(user_id = user.id.as_str(), "User inserted");
        Ok(())
    }

    async fn save(&self, user: &mut User) -> StoreResult<()> {
        let now = crate::time::now_timestamp();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            update_user(&tx, user, now)?;
            tx.commit()?;
            Ok(())
        })?;

        user.version += 1;
        user.updated_at = now;
        Ok(())
    }

    async fn save_pair(&self, first: &mut User, second: &mut User) -> Result<()> {
        let now = crate::time::now_timestamp();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            update_user(&tx, first, now)?;
            update_user(&tx, second, now)?;
            tx.commit()?;
            Ok(())
        })?;

        for user in [first, second] {
            user.version += 1;
            user.updated_at = now;
        }
        Ok(())
    }
}

// ============================================================================
// ROW HELPERS
// ============================================================================

fn encode_interests(interests: &[String]) -> StoreResult<String> {
    serde_json::to_string(interests).map_err(|e| StoreError::Backend(e.to_string()))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let interests: String = row.get(6)?;
    let interests = serde_json::from_str(&interests)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        bio: row.get(4)?,
        avatar: row.get(5)?,
        interests,
        profile_complete: row.get(7)?,
        friends: Vec::new(),
        friend_requests: Vec::new(),
        version: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn media_from_row(row: &Row<'_>) -> rusqlite::Result<MediaRecord> {
    let kind: String = row.get(5)?;
    let kind = MediaKind::parse(&kind)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(5, "kind".into(), Type::Text))?;

    Ok(MediaRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        filename: row.get(2)?,
        storage_key: row.get(3)?,
        url: row.get(4)?,
        kind,
        content_type: row.get(6)?,
        size: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn load_user_where(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    match conn.query_row(&sql, [value], user_from_row).optional()? {
        Some(mut user) => {
            load_relationships(conn, &mut user)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

fn load_relationships(conn: &Connection, user: &mut User) -> rusqlite::Result<()> {
    let mut stmt =
        conn.prepare("SELECT friend_id FROM friendships WHERE user_id = ?1 ORDER BY position")?;
    user.friends = stmt
        .query_map([&user.id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    let mut stmt = conn
        .prepare("SELECT requester_id FROM friend_requests WHERE user_id = ?1 ORDER BY position")?;
    user.friend_requests = stmt
        .query_map([&user.id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(())
}

fn replace_relationships(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM friendships WHERE user_id = ?1", [&user.id])?;
    conn.execute("DELETE FROM friend_requests WHERE user_id = ?1", [&user.id])?;

    let mut stmt = conn
        .prepare("INSERT INTO friendships (user_id, friend_id, position) VALUES (?1, ?2, ?3)")?;
    for (position, friend) in user.friends.iter().enumerate() {
        stmt.execute(params![user.id, friend, position as i64])?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO friend_requests (user_id, requester_id, position) VALUES (?1, ?2, ?3)",
    )?;
    for (position, requester) in user.friend_requests.iter().enumerate() {
        stmt.execute(params![user.id, requester, position as i64])?;
    }

    Ok(())
}

/// Version-checked update of one user record.
fn update_user(conn: &Connection, user: &User, now: i64) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE users SET username = ?1, username_lower = ?2, email = ?3, password_hash = ?4,
                          bio = ?5, avatar = ?6, interests = ?7, profile_complete = ?8,
                          version = version + 1, updated_at = ?9
         WHERE id = ?10 AND version = ?11",
        params![
            user.username,
            user.username.to_lowercase(),
            user.email,
            user.password_hash,
            user.bio,
            user.avatar,
            encode_interests(&user.interests)?,
            user.profile_complete,
            now,
            user.id,
            user.version,
        ],
    )?;

    if changed == 0 {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            [&user.id],
            |row| row.get(0),
        )?;
        if exists {
            tracing::debug!(user_id = user.id.as_str(), version = user.version, "Stale write rejected");
            return Err(StoreError::Conflict(user.id.clone()));
        }
        return Err(StoreError::Backend(format!("User {} does not exist", user.id)));
    }

    replace_relationships(conn, user)?;
    Ok(())
}
