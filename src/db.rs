//! Connection setup and schema creation.

use std::path::Path;

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    account::create_account_table,
    debt::create_debt_table,
    taxonomy::{
        create_asset_type_table, create_debt_type_table, create_transaction_category_table,
    },
    transaction::create_transaction_table,
    user::create_user_table,
};

/// Open the database at `path`, creating the file and the schema if needed.
///
/// Write-ahead logging lets readers proceed alongside the single writer,
/// foreign keys are enforced, and the busy timeout gives a competing writer
/// time to finish before a lock error is reported.
///
/// # Errors
/// Returns an [Error::SqlError] if the file cannot be opened or the schema
/// cannot be created.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection, Error> {
    let connection = Connection::open(path)?;

    connection.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
    )?;

    initialize(&connection)?;

    Ok(connection)
}

/// Create the database schema if it does not already exist.
///
/// All tables are created within a single exclusive transaction so a
/// concurrently opened connection never sees a partial schema.
///
/// # Errors
/// Returns an [Error::SqlError] if the schema cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_asset_type_table(&transaction)?;
    create_debt_type_table(&transaction)?;
    create_transaction_category_table(&transaction)?;
    create_account_table(&transaction)?;
    create_debt_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Open an in-memory database for tests.
///
/// Foreign keys are enforced to match [open]; the journal mode and busy
/// timeout are irrelevant without a file.
#[cfg(test)]
pub(crate) fn open_in_memory() -> Result<Connection, Error> {
    let connection = Connection::open_in_memory()?;
    connection.execute_batch("PRAGMA foreign_keys=ON;")?;
    initialize(&connection)?;

    Ok(connection)
}
