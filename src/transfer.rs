//! Transfers between two accounts of the same user.
//!
//! A transfer is stored as two ordinary transactions: an expense on the
//! source account and an income on the destination, written in one database
//! transaction so no crash or competing writer can observe one leg without
//! the other.

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    atomic::with_transaction,
    database_id::{AccountId, CategoryId},
    ledger::apply_transaction,
    money::validate_amount,
    transaction::{NewTransaction, Transaction, TransactionKind},
    user::UserId,
};

/// The data required to move money between two accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    /// The account the money leaves. Must belong to the same user.
    pub from_account_id: AccountId,
    /// The account the money arrives in. Must belong to the same user.
    pub to_account_id: AccountId,
    /// The category both legs file under. Must belong to the same user.
    pub category_id: CategoryId,
    /// What the transfer was for.
    pub description: String,
    /// How much money to move. Must be positive with at most two decimal
    /// places.
    pub amount: Decimal,
    /// When the transfer occurred.
    pub transaction_date: OffsetDateTime,
}

/// The two transactions a transfer decomposes into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferPair {
    /// The expense leg on the source account.
    pub outgoing: Transaction,
    /// The income leg on the destination account.
    pub incoming: Transaction,
}

/// Move money between two accounts of the same user.
///
/// # Errors
/// This function will return a:
/// - [Error::SameAccountTransfer] if the source and destination are the same
///   account,
/// - or [Error::NonPositiveAmount] if the amount is zero or negative,
/// - or [Error::AmountPrecision] if the amount has more than two decimal
///   places,
/// - or [Error::NotFound] if either account or the category does not exist
///   or belongs to another user,
/// - or [Error::Conflict] if a competing writer held the database across
///   every retry,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transfer(
    user_id: UserId,
    new_transfer: NewTransfer,
    connection: &Connection,
) -> Result<TransferPair, Error> {
    if new_transfer.from_account_id == new_transfer.to_account_id {
        return Err(Error::SameAccountTransfer);
    }

    validate_amount(new_transfer.amount)?;

    with_transaction(connection, |transaction| {
        let outgoing = apply_transaction(
            user_id,
            &NewTransaction {
                kind: TransactionKind::Expense,
                account_id: new_transfer.from_account_id,
                category_id: new_transfer.category_id,
                description: format!("Transfer out: {}", new_transfer.description),
                amount: new_transfer.amount,
                transaction_date: new_transfer.transaction_date,
                notes: None,
            },
            transaction,
        )?;

        let incoming = apply_transaction(
            user_id,
            &NewTransaction {
                kind: TransactionKind::Income,
                account_id: new_transfer.to_account_id,
                category_id: new_transfer.category_id,
                description: format!("Transfer in: {}", new_transfer.description),
                amount: new_transfer.amount,
                transaction_date: new_transfer.transaction_date,
                notes: None,
            },
            transaction,
        )?;

        Ok(TransferPair { outgoing, incoming })
    })
}

// ============================================================================
// TESTS
// ============================================================================
