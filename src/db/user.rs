use serde::Serialize;
use sqlx::sqlite::SqlitePool;

macro_rules! user_columns {
    () => {
        "id, uuid, username, email, full_name, password_hash, refresh_token_hash, created_at"
    };
}

macro_rules! profile_columns {
    () => {
        "uuid, username, email, full_name, created_at"
    };
}

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// Full user record, including credential material. Never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub refresh_token_hash: Option<String>,
    pub created_at: String,
}

impl User {
    /// The client-safe subset of this record.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            uuid: self.uuid.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

/// Public user summary. Does not expose internal IDs or hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: String,
}

/// Fields for a new user record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user and return the stored record.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (uuid, username, email, full_name, password_hash) ",
            "VALUES (?, ?, ?, ?, ?) RETURNING ",
            user_columns!()
        ))
        .bind(&new_user.uuid)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a user whose username or email matches `identity`.
    pub async fn get_by_identity(&self, identity: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE username = ?1 OR email = ?1 LIMIT 1"
        ))
        .bind(identity)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a user by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE uuid = ?"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get the public projection of a user by UUID. Hash columns are never read.
    pub async fn get_profile_by_uuid(
        &self,
        uuid: &str,
    ) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(concat!(
            "SELECT ",
            profile_columns!(),
            " FROM users WHERE uuid = ?"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Check whether a username or email is already registered.
    pub async fn is_identity_taken(&self, username: &str, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Replace the stored refresh token hash and return the updated record.
    ///
    /// With `expected` set, the write only happens if the current hash equals
    /// it (compare-and-set). Returns `None` if no row matched.
    pub async fn update_refresh_hash(
        &self,
        id: i64,
        expected: Option<&str>,
        new_hash: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        match expected {
            Some(expected) => {
                sqlx::query_as::<_, User>(concat!(
                    "UPDATE users SET refresh_token_hash = ? ",
                    "WHERE id = ? AND refresh_token_hash = ? RETURNING ",
                    user_columns!()
                ))
                .bind(new_hash)
                .bind(id)
                .bind(expected)
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, User>(concat!(
                    "UPDATE users SET refresh_token_hash = ? WHERE id = ? RETURNING ",
                    user_columns!()
                ))
                .bind(new_hash)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
            }
        }
    }

    /// Store a new password hash.
    pub async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update display name and email, returning the new public projection.
    pub async fn update_details(
        &self,
        id: i64,
        full_name: &str,
        email: &str,
    ) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(concat!(
            "UPDATE users SET full_name = ?, email = ? WHERE id = ? RETURNING ",
            profile_columns!()
        ))
        .bind(full_name)
        .bind(email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a user by ID.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Whether a store error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}
