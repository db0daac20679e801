//! Networth is a library for tracking personal net worth: asset accounts and
//! debts with exact decimal values, plus a transaction ledger that keeps every
//! account balance consistent with its transaction history.
//!
//! All writes that touch a balance run inside a single database transaction,
//! so an account's `current_value` is always the value it was created with
//! plus the signed effect of every ledger row that survived. The read side
//! ([net_worth], [monthly_summary], [top_categories], [asset_summary]) only
//! aggregates, never mutates.
//!
//! Money is handled as [rust_decimal::Decimal] end to end and stored as
//! canonical text. Binary floating point is never involved.

#![warn(missing_docs)]

use rust_decimal::Decimal;

mod account;
mod aggregation;
mod atomic;
mod database_id;
mod db;
mod debt;
mod ledger;
mod money;
mod taxonomy;
mod transaction;
mod transfer;
mod user;

pub use account::{
    Account, AccountCategory, AccountUpdate, NewAccount, accounts_by_category, all_accounts,
    create_account, delete_account, get_account, update_account,
};
pub use aggregation::{
    AssetSummary, AssetTotals, CategorySpending, MonthlySummary, NetWorth, asset_summary,
    monthly_summary, net_worth, top_categories,
};
pub use database_id::{
    AccountId, AssetTypeId, CategoryId, DatabaseId, DebtId, DebtTypeId, TransactionId,
};
pub use db::{initialize, open};
pub use debt::{
    Debt, DebtSummary, DebtUpdate, NewDebt, all_debts, create_debt, debt_summary, delete_debt,
    get_debt, update_debt,
};
pub use ledger::{create_transaction, delete_transaction, update_transaction};
pub use money::{parse_amount, validate_amount};
pub use taxonomy::{
    AssetType, AssetTypeUpdate, CategoryKind, DebtType, DebtTypeUpdate, TransactionCategory,
    create_asset_type, create_debt_type, create_transaction_category, delete_asset_type,
    delete_debt_type, delete_transaction_category, get_asset_types, get_debt_types,
    get_transaction_categories, update_asset_type, update_debt_type, update_transaction_category,
};
pub use transaction::{
    NewTransaction, SortOrder, Transaction, TransactionKind, TransactionListEntry,
    TransactionQuery, TransactionUpdate, count_transactions, get_transaction, query_transactions,
};
pub use transfer::{NewTransfer, TransferPair, create_transfer};
pub use user::{User, UserId, create_user, get_user};

/// The errors that may occur when working with the store.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A transaction amount was zero or negative.
    ///
    /// Amounts are magnitudes; the direction of a transaction is carried by
    /// its kind, not by the sign of the amount.
    #[error("transaction amounts must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// An amount had more than two fractional digits.
    #[error("{0} has more than two decimal places")]
    AmountPrecision(Decimal),

    /// A string could not be parsed as a decimal amount.
    #[error("could not parse \"{0}\" as a decimal amount")]
    InvalidAmount(String),

    /// A transfer named the same account as both source and destination.
    #[error("cannot transfer from an account to itself")]
    SameAccountTransfer,

    /// An empty string was used for a taxonomy label.
    #[error("label cannot be empty")]
    EmptyLabel,

    /// An empty string was used for a name.
    #[error("name cannot be empty")]
    EmptyName,

    /// A write referred to a row that does not exist.
    ///
    /// The client should check that the ids are valid.
    #[error("a query was given an invalid foreign key")]
    InvalidForeignKey,

    /// Tried to delete a system-provided taxonomy row.
    ///
    /// The default asset types, debt types, and transaction categories that
    /// are seeded for each user can be renamed but never deleted.
    #[error("system taxonomy rows cannot be deleted")]
    SystemRowImmutable,

    /// Tried to delete a taxonomy row that accounts, debts, or transactions
    /// still refer to.
    #[error("the row is still referenced and cannot be deleted")]
    TaxonomyInUse,

    /// The requested resource was not found.
    ///
    /// Rows owned by another user are reported as not found so that ids
    /// cannot be probed across users.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The database was locked by another writer and the operation could not
    /// be completed within the retry budget.
    ///
    /// No partial effects are left behind; the operation may be retried.
    #[error("the operation conflicted with another writer")]
    Conflict,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

/// The broad classes of [Error], for callers that branch on failure class
/// rather than on the specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input was rejected before it touched the store.
    Validation,
    /// The referenced resource does not exist or is owned by another user.
    NotFound,
    /// The operation lost a race with another writer and may be retried.
    Conflict,
    /// The underlying store failed.
    Store,
}

impl Error {
    /// The class of failure this error represents.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NonPositiveAmount(_)
            | Error::AmountPrecision(_)
            | Error::InvalidAmount(_)
            | Error::SameAccountTransfer
            | Error::EmptyLabel
            | Error::EmptyName
            | Error::InvalidForeignKey
            | Error::SystemRowImmutable
            | Error::TaxonomyInUse => ErrorKind::Validation,
            Error::NotFound => ErrorKind::NotFound,
            Error::Conflict => ErrorKind::Conflict,
            Error::SqlError(_) => ErrorKind::Store,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::InvalidForeignKey
            }
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.code == rusqlite::ErrorCode::DatabaseBusy
                    || sql_error.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Error::Conflict
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
