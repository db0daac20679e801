//! Asset accounts: the stores of value whose balances the ledger keeps
//! consistent.
//!
//! An account's `current_value` is set once at creation and from then on
//! changes only through the ledger. Updates here deliberately have no value
//! field; a manual balance correction is a transaction, so the history always
//! explains the number.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{AccountId, AssetTypeId},
    money::{check_precision, decimal_column, optional_decimal_column},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// How readily an account's value can be turned into cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    /// Cash and near-cash accounts.
    Liquid,
    /// Property and other holdings that take time to sell.
    NonLiquid,
    /// Brokerage, retirement, and other market holdings.
    Investment,
}

impl AccountCategory {
    /// The canonical text stored in the database for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::Liquid => "liquid",
            AccountCategory::NonLiquid => "non_liquid",
            AccountCategory::Investment => "investment",
        }
    }
}

impl FromStr for AccountCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "liquid" => Ok(AccountCategory::Liquid),
            "non_liquid" => Ok(AccountCategory::NonLiquid),
            "investment" => Ok(AccountCategory::Investment),
            _ => Err(format!("Unknown account category: {s}")),
        }
    }
}

impl Display for AccountCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A store of value: a bank account, a vehicle, a brokerage position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The user this account belongs to.
    pub user_id: UserId,
    /// How readily the account's value can be turned into cash.
    pub category: AccountCategory,
    /// The asset type this account files under.
    pub asset_type_id: AssetTypeId,
    /// The display name of the account.
    pub name: String,
    /// An optional free-form description.
    pub description: Option<String>,
    /// The account's present value. Kept consistent with the transaction
    /// history by the ledger.
    pub current_value: Decimal,
    /// What was originally paid for the asset, if recorded.
    pub purchase_value: Option<Decimal>,
    /// When the asset was acquired, if recorded.
    pub purchase_date: Option<Date>,
    /// Optional free-form notes.
    pub notes: Option<String>,
    /// When the account was created.
    pub created_at: OffsetDateTime,
    /// When the account was last changed, by an update or by the ledger.
    pub updated_at: OffsetDateTime,
}

/// The data required to create a new account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// How readily the account's value can be turned into cash.
    pub category: AccountCategory,
    /// The asset type the account files under. Must belong to the same user.
    pub asset_type_id: AssetTypeId,
    /// The display name of the account.
    pub name: String,
    /// An optional free-form description.
    pub description: Option<String>,
    /// The starting value of the account.
    pub current_value: Decimal,
    /// What was originally paid for the asset, if known.
    pub purchase_value: Option<Decimal>,
    /// When the asset was acquired, if known.
    pub purchase_date: Option<Date>,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// A partial update to an account. `None` fields are left unchanged.
///
/// There is intentionally no `current_value` here: balances change through
/// the ledger, never by direct edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountUpdate {
    /// A new display name.
    pub name: Option<String>,
    /// A new description.
    pub description: Option<String>,
    /// A new purchase value.
    pub purchase_value: Option<Decimal>,
    /// A new purchase date.
    pub purchase_date: Option<Date>,
    /// New notes.
    pub notes: Option<String>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub(crate) fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                category TEXT NOT NULL CHECK (category IN ('liquid', 'non_liquid', 'investment')),
                asset_type_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                current_value TEXT NOT NULL,
                purchase_value TEXT,
                purchase_date TEXT,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(asset_type_id) REFERENCES asset_type(id) ON UPDATE CASCADE ON DELETE RESTRICT
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_user ON account(user_id);",
        (),
    )?;

    Ok(())
}

/// Create a new account with its starting value.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the name is empty or whitespace,
/// - or [Error::AmountPrecision] if a value has more than two decimal places,
/// - or [Error::NotFound] if the asset type does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_account(
    user_id: UserId,
    new_account: NewAccount,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = new_account.name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    check_precision(new_account.current_value)?;
    if let Some(purchase_value) = new_account.purchase_value {
        check_precision(purchase_value)?;
    }

    resolve_asset_type(user_id, new_account.asset_type_id, connection)?;

    let now = OffsetDateTime::now_utc();
    let account = connection
        .prepare(
            "INSERT INTO account (user_id, category, asset_type_id, name, description,
                                  current_value, purchase_value, purchase_date, notes,
                                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING id, user_id, category, asset_type_id, name, description,
                       current_value, purchase_value, purchase_date, notes,
                       created_at, updated_at",
        )?
        .query_one(
            (
                user_id.as_i64(),
                new_account.category.as_str(),
                new_account.asset_type_id,
                name,
                new_account.description.as_deref(),
                new_account.current_value.to_string(),
                new_account.purchase_value.map(|value| value.to_string()),
                new_account.purchase_date,
                new_account.notes.as_deref(),
                now,
                now,
            ),
            map_account_row,
        )?;

    Ok(account)
}

/// Retrieve an account by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the account does not exist or belongs to another
///   user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_account(
    user_id: UserId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "SELECT id, user_id, category, asset_type_id, name, description,
                    current_value, purchase_value, purchase_date, notes,
                    created_at, updated_at
             FROM account
             WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(
            &[(":id", &account_id), (":user_id", &user_id.as_i64())],
            map_account_row,
        )?;

    Ok(account)
}

/// Get all accounts belonging to `user_id`, highest value first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn all_accounts(user_id: UserId, connection: &Connection) -> Result<Vec<Account>, Error> {
    let accounts = connection
        .prepare(
            "SELECT id, user_id, category, asset_type_id, name, description,
                    current_value, purchase_value, purchase_date, notes,
                    created_at, updated_at
             FROM account
             WHERE user_id = :user_id
             ORDER BY CAST(current_value AS REAL) DESC, id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_account_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(accounts)
}

/// Get the accounts in one category belonging to `user_id`, highest value
/// first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn accounts_by_category(
    user_id: UserId,
    category: AccountCategory,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    let accounts = connection
        .prepare(
            "SELECT id, user_id, category, asset_type_id, name, description,
                    current_value, purchase_value, purchase_date, notes,
                    created_at, updated_at
             FROM account
             WHERE user_id = ?1 AND category = ?2
             ORDER BY CAST(current_value AS REAL) DESC, id",
        )?
        .query_map((user_id.as_i64(), category.as_str()), map_account_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(accounts)
}

/// Update an account's descriptive fields.
///
/// The account's value is not part of the update; balances change only
/// through the ledger.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the new name is empty or whitespace,
/// - or [Error::AmountPrecision] if the new purchase value has more than two
///   decimal places,
/// - or [Error::NotFound] if the account does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_account(
    user_id: UserId,
    account_id: AccountId,
    update: AccountUpdate,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = match update.name.as_deref().map(str::trim) {
        Some("") => return Err(Error::EmptyName),
        other => other,
    };
    if let Some(purchase_value) = update.purchase_value {
        check_precision(purchase_value)?;
    }

    let account = connection
        .prepare(
            "UPDATE account
             SET name = COALESCE(?1, name),
                 description = COALESCE(?2, description),
                 purchase_value = COALESCE(?3, purchase_value),
                 purchase_date = COALESCE(?4, purchase_date),
                 notes = COALESCE(?5, notes),
                 updated_at = ?6
             WHERE id = ?7 AND user_id = ?8
             RETURNING id, user_id, category, asset_type_id, name, description,
                       current_value, purchase_value, purchase_date, notes,
                       created_at, updated_at",
        )?
        .query_one(
            (
                name,
                update.description.as_deref(),
                update.purchase_value.map(|value| value.to_string()),
                update.purchase_date,
                update.notes.as_deref(),
                OffsetDateTime::now_utc(),
                account_id,
                user_id.as_i64(),
            ),
            map_account_row,
        )?;

    Ok(account)
}

/// Delete an account, along with its transaction history.
///
/// Returns the account as it was at deletion.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the account does not exist or belongs to another
///   user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_account(
    user_id: UserId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "DELETE FROM account
             WHERE id = :id AND user_id = :user_id
             RETURNING id, user_id, category, asset_type_id, name, description,
                       current_value, purchase_value, purchase_date, notes,
                       created_at, updated_at",
        )?
        .query_one(
            &[(":id", &account_id), (":user_id", &user_id.as_i64())],
            map_account_row,
        )?;

    Ok(account)
}

/// Check that an asset type exists and belongs to `user_id`.
pub(crate) fn resolve_asset_type(
    user_id: UserId,
    asset_type_id: AssetTypeId,
    connection: &Connection,
) -> Result<(), Error> {
    connection
        .prepare("SELECT id FROM asset_type WHERE id = :id AND user_id = :user_id")?
        .query_one(
            &[(":id", &asset_type_id), (":user_id", &user_id.as_i64())],
            |row| row.get::<_, i64>(0),
        )?;

    Ok(())
}

/// Read an account's current value, scoped to its owner.
pub(crate) fn account_value(
    user_id: UserId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let value = connection
        .prepare("SELECT current_value FROM account WHERE id = :id AND user_id = :user_id")?
        .query_one(
            &[(":id", &account_id), (":user_id", &user_id.as_i64())],
            |row| decimal_column(row, 0),
        )?;

    Ok(value)
}

/// Write an account's current value and refresh its updated time.
///
/// The caller must have already resolved the account under its owner.
pub(crate) fn set_account_value(
    account_id: AccountId,
    value: Decimal,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET current_value = ?1, updated_at = ?2 WHERE id = ?3",
        (value.to_string(), OffsetDateTime::now_utc(), account_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Map a database row to an [Account].
pub(crate) fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserId::new(row.get(1)?);
    let raw_category: String = row.get(2)?;
    let category = raw_category.parse::<AccountCategory>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, error.into())
    })?;
    let asset_type_id = row.get(3)?;
    let name = row.get(4)?;
    let description = row.get(5)?;
    let current_value = decimal_column(row, 6)?;
    let purchase_value = optional_decimal_column(row, 7)?;
    let purchase_date = row.get(8)?;
    let notes = row.get(9)?;
    let created_at = row.get(10)?;
    let updated_at = row.get(11)?;

    Ok(Account {
        id,
        user_id,
        category,
        asset_type_id,
        name,
        description,
        current_value,
        purchase_value,
        purchase_date,
        notes,
        created_at,
        updated_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
