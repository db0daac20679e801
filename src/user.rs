//! Code for creating the user table, creating users, and fetching them from
//! the database.
//!
//! Creating a user also seeds that user's default taxonomies (asset types,
//! debt types, and transaction categories) in the same database transaction,
//! so a user row never exists without its defaults.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, atomic::with_transaction, taxonomy::seed_defaults};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// Every account, debt, taxonomy row, and transaction belongs to exactly one
/// user, and all queries are scoped to the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The user's display name.
    pub name: String,
    /// When the user was created.
    pub created_at: OffsetDateTime,
}

/// Create the user table.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub(crate) fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database, along with the default
/// taxonomies every user starts with.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if `name` is empty or whitespace,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn create_user(name: &str, connection: &Connection) -> Result<User, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    with_transaction(connection, |tx| {
        let user = tx
            .prepare(
                "INSERT INTO user (name, created_at)
                 VALUES (?1, ?2)
                 RETURNING id, name, created_at",
            )?
            .query_one((name, OffsetDateTime::now_utc()), map_user_row)?;

        seed_defaults(user.id, tx)?;

        Ok(user)
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `user_id` does not belong to a known user,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn get_user(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare("SELECT id, name, created_at FROM user WHERE id = :id")?
        .query_one(&[(":id", &user_id.as_i64())], map_user_row)?;

    Ok(user)
}

/// Map a database row to a [User].
fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = UserId::new(row.get(0)?);
    let name = row.get(1)?;
    let created_at = row.get(2)?;

    Ok(User {
        id,
        name,
        created_at,
    })
}

#[cfg(test)]
mod user_tests {
    use crate::{
        Error,
        db::open_in_memory,
        user::{UserId, create_user, get_user},
    };

    #[test]
    fn create_then_get_returns_same_user() {
        let conn = open_in_memory().expect("Could not create database");

        let created = create_user("Alice", &conn).expect("Could not create user");
        let fetched = get_user(created.id, &conn).expect("Could not get user");

        assert_eq!(created, fetched);
    }

    #[test]
    fn create_rejects_blank_name() {
        let conn = open_in_memory().expect("Could not create database");

        let result = create_user("   ", &conn);

        assert_eq!(result, Err(Error::EmptyName));
    }

    #[test]
    fn create_trims_name() {
        let conn = open_in_memory().expect("Could not create database");

        let user = create_user("  Bob  ", &conn).expect("Could not create user");

        assert_eq!(user.name, "Bob");
    }

    #[test]
    fn get_fails_on_unknown_id() {
        let conn = open_in_memory().expect("Could not create database");

        let result = get_user(UserId::new(999), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn create_seeds_default_taxonomies() {
        let conn = open_in_memory().expect("Could not create database");

        let user = create_user("Carol", &conn).expect("Could not create user");

        let count = |sql: &str| -> i64 {
            conn.query_row(sql, [user.id.as_i64()], |row| row.get(0))
                .expect("Could not count rows")
        };

        assert_eq!(
            count("SELECT COUNT(*) FROM asset_type WHERE user_id = ?1"),
            19
        );
        assert_eq!(count("SELECT COUNT(*) FROM debt_type WHERE user_id = ?1"), 8);
        assert_eq!(
            count("SELECT COUNT(*) FROM transaction_category WHERE user_id = ?1"),
            30
        );
    }

    #[test]
    fn users_get_separate_defaults() {
        let conn = open_in_memory().expect("Could not create database");

        let first = create_user("Dan", &conn).expect("Could not create user");
        let second = create_user("Erin", &conn).expect("Could not create user");

        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM asset_type", [], |row| row.get(0))
            .expect("Could not count rows");
        let first_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM asset_type WHERE user_id = ?1",
                [first.id.as_i64()],
                |row| row.get(0),
            )
            .expect("Could not count rows");
        let second_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM asset_type WHERE user_id = ?1",
                [second.id.as_i64()],
                |row| row.get(0),
            )
            .expect("Could not count rows");

        assert_eq!(total, 38);
        assert_eq!(first_count, 19);
        assert_eq!(second_count, 19);
    }
}
