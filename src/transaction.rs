//! The transaction table and its read-side queries.
//!
//! Rows here are only ever written through the ledger functions, which keep
//! account balances in step with the rows they insert, change, and delete.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error,
    database_id::{AccountId, CategoryId, TransactionId},
    money::decimal_column,
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction adds money to its account or removes it.
///
/// Transfers between accounts are recorded as an expense on one account and
/// an income on the other, so there is no third kind here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

impl TransactionKind {
    /// The canonical text stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            _ => Err(format!("Unknown transaction kind: {s}")),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single movement of money in or out of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user this transaction belongs to.
    pub user_id: UserId,
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// The category the transaction files under.
    pub category_id: CategoryId,
    /// Whether the money came in or went out.
    pub kind: TransactionKind,
    /// What the transaction was for.
    pub description: String,
    /// How much money moved. Always positive.
    pub amount: Decimal,
    /// When the transaction occurred. Stored in UTC.
    pub transaction_date: OffsetDateTime,
    /// Optional free-form notes.
    pub notes: Option<String>,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    pub updated_at: OffsetDateTime,
}

/// The data required to record a new transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Whether the money came in or went out.
    pub kind: TransactionKind,
    /// The account the money moved in or out of. Must belong to the same
    /// user.
    pub account_id: AccountId,
    /// The category the transaction files under. Must belong to the same
    /// user.
    pub category_id: CategoryId,
    /// What the transaction was for.
    pub description: String,
    /// How much money moved. Must be positive with at most two decimal
    /// places.
    pub amount: Decimal,
    /// When the transaction occurred.
    pub transaction_date: OffsetDateTime,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// A partial update to a transaction. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionUpdate {
    /// A new kind.
    pub kind: Option<TransactionKind>,
    /// A new account. Must belong to the same user.
    pub account_id: Option<AccountId>,
    /// A new category. Must belong to the same user.
    pub category_id: Option<CategoryId>,
    /// A new description.
    pub description: Option<String>,
    /// A new amount.
    pub amount: Option<Decimal>,
    /// A new date.
    pub transaction_date: Option<OffsetDateTime>,
    /// New notes.
    pub notes: Option<String>,
}

/// The order to sort transactions by date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    #[default]
    Descending,
}

/// Filters and paging for listing transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionQuery {
    /// Only include transactions at or after this instant.
    pub after: Option<OffsetDateTime>,
    /// Only include transactions at or before this instant.
    pub before: Option<OffsetDateTime>,
    /// The date order of the results.
    pub order: SortOrder,
    /// Return at most this many transactions.
    pub limit: Option<u32>,
    /// Skip this many transactions before returning any.
    pub offset: Option<u32>,
}

/// A transaction decorated with the names a listing displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionListEntry {
    /// The transaction itself.
    pub transaction: Transaction,
    /// The name of the account the transaction belongs to.
    pub account_name: String,
    /// The label of the category the transaction files under.
    pub category_label: String,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub(crate) fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS txn (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
                description TEXT NOT NULL,
                amount TEXT NOT NULL,
                transaction_date TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES transaction_category(id) ON UPDATE CASCADE ON DELETE RESTRICT
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_txn_user_date ON txn(user_id, transaction_date);",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_txn_account ON txn(account_id);",
        (),
    )?;

    Ok(())
}

/// Retrieve a transaction by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    user_id: UserId,
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, user_id, account_id, category_id, kind, description, amount,
                    transaction_date, notes, created_at, updated_at
             FROM txn
             WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(
            &[(":id", &transaction_id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// List transactions with their account and category names, filtered and
/// paged by `query`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn query_transactions(
    user_id: UserId,
    query: TransactionQuery,
    connection: &Connection,
) -> Result<Vec<TransactionListEntry>, Error> {
    let order_clause = match query.order {
        SortOrder::Ascending => "ORDER BY txn.transaction_date ASC",
        SortOrder::Descending => "ORDER BY txn.transaction_date DESC",
    };

    // Sort by date, and then ID to keep transaction order stable after updates
    let sql = format!(
        "SELECT txn.id, txn.user_id, txn.account_id, txn.category_id, txn.kind,
                txn.description, txn.amount, txn.transaction_date, txn.notes,
                txn.created_at, txn.updated_at,
                account.name, transaction_category.label
         FROM txn
         JOIN account ON txn.account_id = account.id
         JOIN transaction_category ON txn.category_id = transaction_category.id
         WHERE txn.user_id = ?1
           AND txn.transaction_date >= COALESCE(?2, txn.transaction_date)
           AND txn.transaction_date <= COALESCE(?3, txn.transaction_date)
         {order_clause}, txn.id ASC
         LIMIT COALESCE(?4, -1) OFFSET COALESCE(?5, 0)"
    );

    let entries = connection
        .prepare(&sql)?
        .query_map(
            (
                user_id.as_i64(),
                query.after.map(|after| after.to_offset(UtcOffset::UTC)),
                query.before.map(|before| before.to_offset(UtcOffset::UTC)),
                query.limit,
                query.offset,
            ),
            |row| {
                Ok(TransactionListEntry {
                    transaction: map_transaction_row(row)?,
                    account_name: row.get(11)?,
                    category_label: row.get(12)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Count the transactions matching `query`, ignoring its paging fields.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_transactions(
    user_id: UserId,
    query: TransactionQuery,
    connection: &Connection,
) -> Result<u64, Error> {
    let count = connection.query_row(
        "SELECT COUNT(*)
         FROM txn
         WHERE user_id = ?1
           AND transaction_date >= COALESCE(?2, transaction_date)
           AND transaction_date <= COALESCE(?3, transaction_date)",
        (
            user_id.as_i64(),
            query.after.map(|after| after.to_offset(UtcOffset::UTC)),
            query.before.map(|before| before.to_offset(UtcOffset::UTC)),
        ),
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Map a database row to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserId::new(row.get(1)?);
    let account_id = row.get(2)?;
    let category_id = row.get(3)?;
    let kind = row
        .get::<_, String>(4)?
        .parse::<TransactionKind>()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, error.into()))?;
    let description = row.get(5)?;
    let amount = decimal_column(row, 6)?;
    let transaction_date = row.get(7)?;
    let notes = row.get(8)?;
    let created_at = row.get(9)?;
    let updated_at = row.get(10)?;

    Ok(Transaction {
        id,
        user_id,
        account_id,
        category_id,
        kind,
        description,
        amount,
        transaction_date,
        notes,
        created_at,
        updated_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod transaction_kind_tests {
    use crate::transaction::TransactionKind;

    #[test]
    fn round_trips_both_kinds() {
        for kind in [TransactionKind::Income, TransactionKind::Expense] {
            let parsed: TransactionKind = kind
                .as_str()
                .parse()
                .expect("Could not parse transaction kind");

            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        let result = "transfer".parse::<TransactionKind>();

        assert_eq!(result, Err("Unknown transaction kind: transfer".to_owned()));
    }
}
