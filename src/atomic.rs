//! Scoped database transactions for balance-affecting writes.
//!
//! Every operation that touches an account balance runs through
//! [with_transaction] so the transaction row and the balance adjustment
//! commit or roll back as one unit.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::Error;

/// How many times a write is attempted before a lock conflict is reported to
/// the caller.
const MAX_ATTEMPTS: u32 = 3;

/// Run `operation` inside an immediate-mode database transaction.
///
/// The write lock is taken up front, so every read inside `operation` sees a
/// state no other writer can change before the commit. If the operation
/// returns an error the transaction is rolled back and nothing it did is
/// visible.
///
/// A [Error::Conflict] (the database was busy or locked) is retried with a
/// fresh transaction up to [MAX_ATTEMPTS] times before being returned.
pub(crate) fn with_transaction<T>(
    connection: &Connection,
    operation: impl Fn(&SqlTransaction) -> Result<T, Error>,
) -> Result<T, Error> {
    let mut attempt = 1;

    loop {
        match run_once(connection, &operation) {
            Err(Error::Conflict) if attempt < MAX_ATTEMPTS => {
                tracing::debug!("database locked, retrying write (attempt {attempt})");
                attempt += 1;
            }
            result => return result,
        }
    }
}

fn run_once<T>(
    connection: &Connection,
    operation: &impl Fn(&SqlTransaction) -> Result<T, Error>,
) -> Result<T, Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let value = operation(&transaction)?;
    transaction.commit()?;

    Ok(value)
}

#[cfg(test)]
mod with_transaction_tests {
    use crate::{Error, atomic::with_transaction, db::open_in_memory};

    #[test]
    fn commits_on_success() {
        let conn = open_in_memory().expect("Could not create database");

        let result = with_transaction(&conn, |tx| {
            tx.execute("INSERT INTO user (name, created_at) VALUES ('a', '2025-01-01')", [])?;
            Ok(())
        });

        assert_eq!(result, Ok(()));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))
            .expect("Could not count users");
        assert_eq!(count, 1);
    }

    #[test]
    fn rolls_back_on_error() {
        let conn = open_in_memory().expect("Could not create database");

        let result: Result<(), Error> = with_transaction(&conn, |tx| {
            tx.execute("INSERT INTO user (name, created_at) VALUES ('a', '2025-01-01')", [])?;
            Err(Error::EmptyName)
        });

        assert_eq!(result, Err(Error::EmptyName));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))
            .expect("Could not count users");
        assert_eq!(count, 0);
    }
}
