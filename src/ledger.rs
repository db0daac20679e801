//! The write side of the transaction ledger.
//!
//! Every function here changes a transaction row and the balance of the
//! account it touches in one database transaction, so the invariant "an
//! account's value equals its starting value plus the signed sum of its
//! transactions" survives crashes and concurrent writers.
//!
//! Changing a transaction's amount, kind, or account first reverts the old
//! row's effect and then applies the new one. The two steps compose on a
//! single account and move money correctly when the account changes.

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    Error,
    account::{account_value, set_account_value},
    atomic::with_transaction,
    database_id::{CategoryId, TransactionId},
    money::validate_amount,
    transaction::{
        NewTransaction, Transaction, TransactionKind, TransactionUpdate, get_transaction,
        map_transaction_row,
    },
    user::UserId,
};

/// Record a new transaction and fold its effect into the account balance.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - or [Error::AmountPrecision] if the amount has more than two decimal
///   places,
/// - or [Error::NotFound] if the account or category does not exist or
///   belongs to another user,
/// - or [Error::Conflict] if a competing writer held the database across
///   every retry,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserId,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_amount(new_transaction.amount)?;

    with_transaction(connection, |transaction| {
        apply_transaction(user_id, &new_transaction, transaction)
    })
}

/// Change a transaction, keeping the affected account balances consistent.
///
/// When the update touches the amount, kind, or account, the stored row's
/// effect is reverted before the new effect is applied, even if the new
/// values happen to equal the old ones. Other fields change in place.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the new amount is zero or negative,
/// - or [Error::AmountPrecision] if the new amount has more than two decimal
///   places,
/// - or [Error::NotFound] if the transaction, the new account, or the new
///   category does not exist or belongs to another user,
/// - or [Error::Conflict] if a competing writer held the database across
///   every retry,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    user_id: UserId,
    transaction_id: TransactionId,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if let Some(amount) = update.amount {
        validate_amount(amount)?;
    }

    with_transaction(connection, |transaction| {
        let stored = get_transaction(user_id, transaction_id, transaction)?;

        let moves_money =
            update.amount.is_some() || update.kind.is_some() || update.account_id.is_some();
        if moves_money {
            let old_value = account_value(user_id, stored.account_id, transaction)?;
            set_account_value(
                stored.account_id,
                old_value - signed_effect(stored.kind, stored.amount),
                transaction,
            )?;

            let account_id = update.account_id.unwrap_or(stored.account_id);
            let kind = update.kind.unwrap_or(stored.kind);
            let amount = update.amount.unwrap_or(stored.amount);

            let value = account_value(user_id, account_id, transaction)?;
            set_account_value(account_id, value + signed_effect(kind, amount), transaction)?;
        }

        if let Some(category_id) = update.category_id {
            resolve_category(user_id, category_id, transaction)?;
        }

        let updated = transaction
            .prepare(
                "UPDATE txn
                 SET kind = COALESCE(?1, kind),
                     account_id = COALESCE(?2, account_id),
                     category_id = COALESCE(?3, category_id),
                     description = COALESCE(?4, description),
                     amount = COALESCE(?5, amount),
                     transaction_date = COALESCE(?6, transaction_date),
                     notes = COALESCE(?7, notes),
                     updated_at = ?8
                 WHERE id = ?9 AND user_id = ?10
                 RETURNING id, user_id, account_id, category_id, kind, description, amount,
                           transaction_date, notes, created_at, updated_at",
            )?
            .query_one(
                (
                    update.kind.map(|kind| kind.as_str()),
                    update.account_id,
                    update.category_id,
                    update.description.as_deref(),
                    update.amount.map(|amount| amount.to_string()),
                    update
                        .transaction_date
                        .map(|date| date.to_offset(UtcOffset::UTC)),
                    update.notes.as_deref(),
                    OffsetDateTime::now_utc(),
                    transaction_id,
                    user_id.as_i64(),
                ),
                map_transaction_row,
            )?;

        Ok(updated)
    })
}

/// Delete a transaction, undoing its effect on the account balance.
///
/// Returns the transaction as it was at deletion.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist or belongs to
///   another user,
/// - or [Error::Conflict] if a competing writer held the database across
///   every retry,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    user_id: UserId,
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    with_transaction(connection, |transaction| {
        let stored = get_transaction(user_id, transaction_id, transaction)?;

        let value = account_value(user_id, stored.account_id, transaction)?;
        set_account_value(
            stored.account_id,
            value - signed_effect(stored.kind, stored.amount),
            transaction,
        )?;

        transaction.execute(
            "DELETE FROM txn WHERE id = ?1 AND user_id = ?2",
            (transaction_id, user_id.as_i64()),
        )?;

        Ok(stored)
    })
}

/// Insert a transaction row and fold its effect into the account balance.
///
/// The caller must run this inside a write transaction and must have
/// validated the amount.
pub(crate) fn apply_transaction(
    user_id: UserId,
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let value = account_value(user_id, new_transaction.account_id, connection)?;
    resolve_category(user_id, new_transaction.category_id, connection)?;

    let now = OffsetDateTime::now_utc();
    let inserted = connection
        .prepare(
            "INSERT INTO txn (user_id, account_id, category_id, kind, description, amount,
                              transaction_date, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING id, user_id, account_id, category_id, kind, description, amount,
                       transaction_date, notes, created_at, updated_at",
        )?
        .query_one(
            (
                user_id.as_i64(),
                new_transaction.account_id,
                new_transaction.category_id,
                new_transaction.kind.as_str(),
                new_transaction.description.as_str(),
                new_transaction.amount.to_string(),
                new_transaction.transaction_date.to_offset(UtcOffset::UTC),
                new_transaction.notes.as_deref(),
                now,
                now,
            ),
            map_transaction_row,
        )?;

    set_account_value(
        new_transaction.account_id,
        value + signed_effect(new_transaction.kind, new_transaction.amount),
        connection,
    )?;

    Ok(inserted)
}

/// The change a transaction makes to its account's value.
fn signed_effect(kind: TransactionKind, amount: Decimal) -> Decimal {
    match kind {
        TransactionKind::Income => amount,
        TransactionKind::Expense => -amount,
    }
}

/// Check that a transaction category exists and belongs to `user_id`.
fn resolve_category(
    user_id: UserId,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    connection
        .prepare("SELECT id FROM transaction_category WHERE id = :id AND user_id = :user_id")?
        .query_one(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            |row| row.get::<_, i64>(0),
        )?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
