//! Asset types, debt types, and transaction categories.
//!
//! These are the per-user classification tables the rest of the store hangs
//! off. Each user gets a seeded set of defaults at sign-up (marked
//! `is_system`); defaults can be renamed but not deleted, and no taxonomy
//! row can be deleted while an account, debt, or transaction still refers
//! to it.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    account::AccountCategory,
    atomic::with_transaction,
    database_id::{AssetTypeId, CategoryId, DebtTypeId},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// The kind of cash flow a transaction category describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
    /// Money moving between two accounts of the same user.
    Transfer,
}

impl CategoryKind {
    /// The canonical text stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
            CategoryKind::Transfer => "transfer",
        }
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(CategoryKind::Income),
            "expense" => Ok(CategoryKind::Expense),
            "transfer" => Ok(CategoryKind::Transfer),
            _ => Err(format!("Unknown category kind: {s}")),
        }
    }
}

impl Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classification for asset accounts, e.g. "Savings Account" or "Stocks".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetType {
    /// The ID of the asset type.
    pub id: AssetTypeId,
    /// The user this asset type belongs to.
    pub user_id: UserId,
    /// Which account category this type files under.
    pub category: AccountCategory,
    /// The display label.
    pub label: String,
    /// An emoji shown next to the label.
    pub icon: String,
    /// Whether this row was seeded by the application. System rows cannot be
    /// deleted.
    pub is_system: bool,
    /// When the asset type was created.
    pub created_at: OffsetDateTime,
}

/// A classification for debts, e.g. "Mortgage" or "Credit Card".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtType {
    /// The ID of the debt type.
    pub id: DebtTypeId,
    /// The user this debt type belongs to.
    pub user_id: UserId,
    /// The display label.
    pub label: String,
    /// An emoji shown next to the label.
    pub icon: String,
    /// Whether this row was seeded by the application. System rows cannot be
    /// deleted.
    pub is_system: bool,
    /// When the debt type was created.
    pub created_at: OffsetDateTime,
}

/// A classification for transactions, e.g. "Groceries" or "Salary".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCategory {
    /// The ID of the category.
    pub id: CategoryId,
    /// The user this category belongs to.
    pub user_id: UserId,
    /// The kind of cash flow this category describes.
    pub kind: CategoryKind,
    /// The display label.
    pub label: String,
    /// Whether this row was seeded by the application. System rows cannot be
    /// deleted.
    pub is_system: bool,
    /// When the category was created.
    pub created_at: OffsetDateTime,
}

/// A partial update to an asset type. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetTypeUpdate {
    /// A new display label.
    pub label: Option<String>,
    /// A new icon.
    pub icon: Option<String>,
}

/// A partial update to a debt type. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtTypeUpdate {
    /// A new display label.
    pub label: Option<String>,
    /// A new icon.
    pub icon: Option<String>,
}

// ============================================================================
// SEED DATA
// ============================================================================

const DEFAULT_ASSET_TYPES: &[(AccountCategory, &str, &str)] = &[
    (AccountCategory::Liquid, "Cash", "💵"),
    (AccountCategory::Liquid, "Checking Account", "🏦"),
    (AccountCategory::Liquid, "Savings Account", "💰"),
    (AccountCategory::Liquid, "Money Market", "📈"),
    (AccountCategory::Liquid, "Cash App", "📱"),
    (AccountCategory::Liquid, "PayPal", "💳"),
    (AccountCategory::NonLiquid, "Real Estate", "🏠"),
    (AccountCategory::NonLiquid, "Vehicle", "🚗"),
    (AccountCategory::NonLiquid, "Jewelry", "💎"),
    (AccountCategory::NonLiquid, "Electronics", "💻"),
    (AccountCategory::NonLiquid, "Collectibles", "🎨"),
    (AccountCategory::NonLiquid, "Business Equipment", "🏢"),
    (AccountCategory::Investment, "Stocks", "📊"),
    (AccountCategory::Investment, "Bonds", "📜"),
    (AccountCategory::Investment, "Mutual Funds", "🏛️"),
    (AccountCategory::Investment, "ETFs", "📈"),
    (AccountCategory::Investment, "Cryptocurrency", "₿"),
    (AccountCategory::Investment, "Retirement Account", "🏖️"),
    (AccountCategory::Investment, "Commodities", "🛢️"),
];

const DEFAULT_DEBT_TYPES: &[(&str, &str)] = &[
    ("Mortgage", "🏠"),
    ("Auto Loan", "🚗"),
    ("Credit Card", "💳"),
    ("Personal Loan", "💸"),
    ("Student Loan", "🎓"),
    ("Business Loan", "💼"),
    ("Medical Debt", "🏥"),
    ("Other", "📄"),
];

const DEFAULT_TRANSACTION_CATEGORIES: &[(CategoryKind, &str)] = &[
    (CategoryKind::Income, "Salary"),
    (CategoryKind::Income, "Freelance"),
    (CategoryKind::Income, "Investment Income"),
    (CategoryKind::Income, "Business Income"),
    (CategoryKind::Income, "Rental Income"),
    (CategoryKind::Income, "Interest"),
    (CategoryKind::Income, "Dividends"),
    (CategoryKind::Income, "Gift"),
    (CategoryKind::Income, "Refund"),
    (CategoryKind::Income, "Other Income"),
    (CategoryKind::Expense, "Food & Dining"),
    (CategoryKind::Expense, "Groceries"),
    (CategoryKind::Expense, "Transportation"),
    (CategoryKind::Expense, "Shopping"),
    (CategoryKind::Expense, "Entertainment"),
    (CategoryKind::Expense, "Bills & Utilities"),
    (CategoryKind::Expense, "Healthcare"),
    (CategoryKind::Expense, "Education"),
    (CategoryKind::Expense, "Home"),
    (CategoryKind::Expense, "Personal Care"),
    (CategoryKind::Expense, "Gifts & Donations"),
    (CategoryKind::Expense, "Insurance"),
    (CategoryKind::Expense, "Taxes"),
    (CategoryKind::Expense, "Other Expense"),
    (CategoryKind::Transfer, "Account Transfer"),
    (CategoryKind::Transfer, "Investment Transfer"),
    (CategoryKind::Transfer, "Loan Payment"),
    (CategoryKind::Transfer, "Credit Card Payment"),
    (CategoryKind::Transfer, "Family Transfer"),
    (CategoryKind::Transfer, "Savings Transfer"),
];

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the asset type table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub(crate) fn create_asset_type_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS asset_type (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                category TEXT NOT NULL CHECK (category IN ('liquid', 'non_liquid', 'investment')),
                label TEXT NOT NULL,
                icon TEXT NOT NULL,
                is_system INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create the debt type table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub(crate) fn create_debt_type_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS debt_type (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                label TEXT NOT NULL,
                icon TEXT NOT NULL,
                is_system INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create the transaction category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub(crate) fn create_transaction_category_table(
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transaction_category (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('income', 'expense', 'transfer')),
                label TEXT NOT NULL,
                is_system INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Insert the default taxonomies for a newly created user.
///
/// All seeded rows are marked as system rows so they cannot be deleted.
pub(crate) fn seed_defaults(user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let now = OffsetDateTime::now_utc();

    let mut insert_asset_type = connection.prepare(
        "INSERT INTO asset_type (user_id, category, label, icon, is_system, created_at)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)",
    )?;
    for (category, label, icon) in DEFAULT_ASSET_TYPES {
        insert_asset_type.execute((user_id.as_i64(), category.as_str(), label, icon, now))?;
    }

    let mut insert_debt_type = connection.prepare(
        "INSERT INTO debt_type (user_id, label, icon, is_system, created_at)
         VALUES (?1, ?2, ?3, 1, ?4)",
    )?;
    for (label, icon) in DEFAULT_DEBT_TYPES {
        insert_debt_type.execute((user_id.as_i64(), label, icon, now))?;
    }

    let mut insert_category = connection.prepare(
        "INSERT INTO transaction_category (user_id, kind, label, is_system, created_at)
         VALUES (?1, ?2, ?3, 1, ?4)",
    )?;
    for (kind, label) in DEFAULT_TRANSACTION_CATEGORIES {
        insert_category.execute((user_id.as_i64(), kind.as_str(), label, now))?;
    }

    Ok(())
}

/// Create a custom asset type for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyLabel] if `label` is empty or whitespace,
/// - or [Error::InvalidForeignKey] if `user_id` does not refer to a user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_asset_type(
    user_id: UserId,
    category: AccountCategory,
    label: &str,
    icon: &str,
    connection: &Connection,
) -> Result<AssetType, Error> {
    let label = label.trim();

    if label.is_empty() {
        return Err(Error::EmptyLabel);
    }

    let asset_type = connection
        .prepare(
            "INSERT INTO asset_type (user_id, category, label, icon, is_system, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)
             RETURNING id, user_id, category, label, icon, is_system, created_at",
        )?
        .query_one(
            (
                user_id.as_i64(),
                category.as_str(),
                label,
                icon,
                OffsetDateTime::now_utc(),
            ),
            map_asset_type_row,
        )?;

    Ok(asset_type)
}

/// Get all asset types belonging to `user_id`, grouped by category.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_asset_types(user_id: UserId, connection: &Connection) -> Result<Vec<AssetType>, Error> {
    let asset_types = connection
        .prepare(
            "SELECT id, user_id, category, label, icon, is_system, created_at
             FROM asset_type
             WHERE user_id = :user_id
             ORDER BY category, created_at, id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_asset_type_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(asset_types)
}

/// Update the label and/or icon of an asset type.
///
/// System rows may be renamed; only deletion is restricted.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyLabel] if the new label is empty or whitespace,
/// - or [Error::NotFound] if the asset type does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_asset_type(
    user_id: UserId,
    asset_type_id: AssetTypeId,
    update: AssetTypeUpdate,
    connection: &Connection,
) -> Result<AssetType, Error> {
    let label = normalized_label(update.label.as_deref())?;

    let asset_type = connection
        .prepare(
            "UPDATE asset_type
             SET label = COALESCE(?1, label), icon = COALESCE(?2, icon)
             WHERE id = ?3 AND user_id = ?4
             RETURNING id, user_id, category, label, icon, is_system, created_at",
        )?
        .query_one(
            (label, update.icon.as_deref(), asset_type_id, user_id.as_i64()),
            map_asset_type_row,
        )?;

    Ok(asset_type)
}

/// Delete a custom asset type.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the asset type does not exist or belongs to
///   another user,
/// - or [Error::SystemRowImmutable] if the asset type is a seeded default,
/// - or [Error::TaxonomyInUse] if any account still refers to it,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_asset_type(
    user_id: UserId,
    asset_type_id: AssetTypeId,
    connection: &Connection,
) -> Result<(), Error> {
    with_transaction(connection, |tx| {
        let is_system: bool = tx
            .prepare("SELECT is_system FROM asset_type WHERE id = :id AND user_id = :user_id")?
            .query_one(
                &[(":id", &asset_type_id), (":user_id", &user_id.as_i64())],
                |row| row.get(0),
            )?;

        if is_system {
            return Err(Error::SystemRowImmutable);
        }

        let in_use: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM account WHERE asset_type_id = ?1)",
            [asset_type_id],
            |row| row.get(0),
        )?;

        if in_use {
            return Err(Error::TaxonomyInUse);
        }

        tx.execute("DELETE FROM asset_type WHERE id = ?1", [asset_type_id])?;

        Ok(())
    })
}

/// Create a custom debt type for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyLabel] if `label` is empty or whitespace,
/// - or [Error::InvalidForeignKey] if `user_id` does not refer to a user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_debt_type(
    user_id: UserId,
    label: &str,
    icon: &str,
    connection: &Connection,
) -> Result<DebtType, Error> {
    let label = label.trim();

    if label.is_empty() {
        return Err(Error::EmptyLabel);
    }

    let debt_type = connection
        .prepare(
            "INSERT INTO debt_type (user_id, label, icon, is_system, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)
             RETURNING id, user_id, label, icon, is_system, created_at",
        )?
        .query_one(
            (user_id.as_i64(), label, icon, OffsetDateTime::now_utc()),
            map_debt_type_row,
        )?;

    Ok(debt_type)
}

/// Get all debt types belonging to `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_debt_types(user_id: UserId, connection: &Connection) -> Result<Vec<DebtType>, Error> {
    let debt_types = connection
        .prepare(
            "SELECT id, user_id, label, icon, is_system, created_at
             FROM debt_type
             WHERE user_id = :user_id
             ORDER BY created_at, id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_debt_type_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(debt_types)
}

/// Update the label and/or icon of a debt type.
///
/// System rows may be renamed; only deletion is restricted.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyLabel] if the new label is empty or whitespace,
/// - or [Error::NotFound] if the debt type does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_debt_type(
    user_id: UserId,
    debt_type_id: DebtTypeId,
    update: DebtTypeUpdate,
    connection: &Connection,
) -> Result<DebtType, Error> {
    let label = normalized_label(update.label.as_deref())?;

    let debt_type = connection
        .prepare(
            "UPDATE debt_type
             SET label = COALESCE(?1, label), icon = COALESCE(?2, icon)
             WHERE id = ?3 AND user_id = ?4
             RETURNING id, user_id, label, icon, is_system, created_at",
        )?
        .query_one(
            (label, update.icon.as_deref(), debt_type_id, user_id.as_i64()),
            map_debt_type_row,
        )?;

    Ok(debt_type)
}

/// Delete a custom debt type.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the debt type does not exist or belongs to another
///   user,
/// - or [Error::SystemRowImmutable] if the debt type is a seeded default,
/// - or [Error::TaxonomyInUse] if any debt still refers to it,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_debt_type(
    user_id: UserId,
    debt_type_id: DebtTypeId,
    connection: &Connection,
) -> Result<(), Error> {
    with_transaction(connection, |tx| {
        let is_system: bool = tx
            .prepare("SELECT is_system FROM debt_type WHERE id = :id AND user_id = :user_id")?
            .query_one(
                &[(":id", &debt_type_id), (":user_id", &user_id.as_i64())],
                |row| row.get(0),
            )?;

        if is_system {
            return Err(Error::SystemRowImmutable);
        }

        let in_use: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM debt WHERE debt_type_id = ?1)",
            [debt_type_id],
            |row| row.get(0),
        )?;

        if in_use {
            return Err(Error::TaxonomyInUse);
        }

        tx.execute("DELETE FROM debt_type WHERE id = ?1", [debt_type_id])?;

        Ok(())
    })
}

/// Create a custom transaction category for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyLabel] if `label` is empty or whitespace,
/// - or [Error::InvalidForeignKey] if `user_id` does not refer to a user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction_category(
    user_id: UserId,
    kind: CategoryKind,
    label: &str,
    connection: &Connection,
) -> Result<TransactionCategory, Error> {
    let label = label.trim();

    if label.is_empty() {
        return Err(Error::EmptyLabel);
    }

    let category = connection
        .prepare(
            "INSERT INTO transaction_category (user_id, kind, label, is_system, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)
             RETURNING id, user_id, kind, label, is_system, created_at",
        )?
        .query_one(
            (user_id.as_i64(), kind.as_str(), label, OffsetDateTime::now_utc()),
            map_transaction_category_row,
        )?;

    Ok(category)
}

/// Get all transaction categories belonging to `user_id`, grouped by kind.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transaction_categories(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<TransactionCategory>, Error> {
    let categories = connection
        .prepare(
            "SELECT id, user_id, kind, label, is_system, created_at
             FROM transaction_category
             WHERE user_id = :user_id
             ORDER BY kind, created_at, id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_category_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(categories)
}

/// Rename a transaction category.
///
/// System rows may be renamed; only deletion is restricted. The kind of a
/// category is fixed at creation since changing it would silently reclassify
/// the transactions filed under it.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyLabel] if `label` is empty or whitespace,
/// - or [Error::NotFound] if the category does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction_category(
    user_id: UserId,
    category_id: CategoryId,
    label: &str,
    connection: &Connection,
) -> Result<TransactionCategory, Error> {
    let label = label.trim();

    if label.is_empty() {
        return Err(Error::EmptyLabel);
    }

    let category = connection
        .prepare(
            "UPDATE transaction_category
             SET label = ?1
             WHERE id = ?2 AND user_id = ?3
             RETURNING id, user_id, kind, label, is_system, created_at",
        )?
        .query_one(
            (label, category_id, user_id.as_i64()),
            map_transaction_category_row,
        )?;

    Ok(category)
}

/// Delete a custom transaction category.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the category does not exist or belongs to another
///   user,
/// - or [Error::SystemRowImmutable] if the category is a seeded default,
/// - or [Error::TaxonomyInUse] if any transaction still refers to it,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction_category(
    user_id: UserId,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    with_transaction(connection, |tx| {
        let is_system: bool = tx
            .prepare(
                "SELECT is_system FROM transaction_category WHERE id = :id AND user_id = :user_id",
            )?
            .query_one(
                &[(":id", &category_id), (":user_id", &user_id.as_i64())],
                |row| row.get(0),
            )?;

        if is_system {
            return Err(Error::SystemRowImmutable);
        }

        let in_use: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM txn WHERE category_id = ?1)",
            [category_id],
            |row| row.get(0),
        )?;

        if in_use {
            return Err(Error::TaxonomyInUse);
        }

        tx.execute(
            "DELETE FROM transaction_category WHERE id = ?1",
            [category_id],
        )?;

        Ok(())
    })
}

/// Check an optional replacement label, returning the trimmed value.
fn normalized_label(label: Option<&str>) -> Result<Option<&str>, Error> {
    match label {
        Some(label) => {
            let label = label.trim();

            if label.is_empty() {
                Err(Error::EmptyLabel)
            } else {
                Ok(Some(label))
            }
        }
        None => Ok(None),
    }
}

/// Map a database row to an [AssetType].
fn map_asset_type_row(row: &Row) -> Result<AssetType, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserId::new(row.get(1)?);
    let raw_category: String = row.get(2)?;
    let category = raw_category.parse::<AccountCategory>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, error.into())
    })?;
    let label = row.get(3)?;
    let icon = row.get(4)?;
    let is_system = row.get(5)?;
    let created_at = row.get(6)?;

    Ok(AssetType {
        id,
        user_id,
        category,
        label,
        icon,
        is_system,
        created_at,
    })
}

/// Map a database row to a [DebtType].
fn map_debt_type_row(row: &Row) -> Result<DebtType, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserId::new(row.get(1)?);
    let label = row.get(2)?;
    let icon = row.get(3)?;
    let is_system = row.get(4)?;
    let created_at = row.get(5)?;

    Ok(DebtType {
        id,
        user_id,
        label,
        icon,
        is_system,
        created_at,
    })
}

/// Map a database row to a [TransactionCategory].
fn map_transaction_category_row(row: &Row) -> Result<TransactionCategory, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserId::new(row.get(1)?);
    let raw_kind: String = row.get(2)?;
    let kind = raw_kind.parse::<CategoryKind>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, error.into())
    })?;
    let label = row.get(3)?;
    let is_system = row.get(4)?;
    let created_at = row.get(5)?;

    Ok(TransactionCategory {
        id,
        user_id,
        kind,
        label,
        is_system,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================



#[cfg(test)]
mod debt_type_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        db::open_in_memory,
        debt::NewDebt,
        taxonomy::{
            DebtTypeUpdate, create_debt_type, delete_debt_type, get_debt_types, update_debt_type,
        },
        user::{User, create_user},
    };

    fn get_test_connection() -> (Connection, User) {
        let conn = open_in_memory().expect("Could not create database");
        let user = create_user("Test", &conn).expect("Could not create user");

        (conn, user)
    }

    #[test]
    fn list_returns_seeded_defaults() {
        let (conn, user) = get_test_connection();

        let debt_types = get_debt_types(user.id, &conn).expect("Could not get debt types");

        assert_eq!(debt_types.len(), 8);
        assert_eq!(debt_types[0].label, "Mortgage");
        assert_eq!(debt_types[0].icon, "🏠");
    }

    #[test]
    fn update_changes_icon_only() {
        let (conn, user) = get_test_connection();
        let custom =
            create_debt_type(user.id, "Tab at the Pub", "🍺", &conn).expect("Could not create");

        let updated = update_debt_type(
            user.id,
            custom.id,
            DebtTypeUpdate {
                label: None,
                icon: Some("🍻".to_owned()),
            },
            &conn,
        )
        .expect("Could not update debt type");

        assert_eq!(updated.label, "Tab at the Pub");
        assert_eq!(updated.icon, "🍻");
    }

    #[test]
    fn update_rejects_blank_label() {
        let (conn, user) = get_test_connection();
        let custom =
            create_debt_type(user.id, "Tab at the Pub", "🍺", &conn).expect("Could not create");

        let result = update_debt_type(
            user.id,
            custom.id,
            DebtTypeUpdate {
                label: Some("   ".to_owned()),
                icon: None,
            },
            &conn,
        );

        assert_eq!(result, Err(Error::EmptyLabel));
    }

    #[test]
    fn delete_fails_on_system_row() {
        let (conn, user) = get_test_connection();
        let mortgage = &get_debt_types(user.id, &conn).expect("Could not get debt types")[0];

        let result = delete_debt_type(user.id, mortgage.id, &conn);

        assert_eq!(result, Err(Error::SystemRowImmutable));
    }

    #[test]
    fn delete_fails_while_debt_refers_to_row() {
        let (conn, user) = get_test_connection();
        let custom =
            create_debt_type(user.id, "Tab at the Pub", "🍺", &conn).expect("Could not create");
        crate::debt::create_debt(
            user.id,
            NewDebt {
                debt_type_id: custom.id,
                name: "Friday Tab".to_owned(),
                balance: dec!(86.50),
                original_amount: None,
                interest_rate: None,
                monthly_payment: None,
                start_date: None,
                due_date: None,
                notes: None,
            },
            &conn,
        )
        .expect("Could not create debt");

        let result = delete_debt_type(user.id, custom.id, &conn);

        assert_eq!(result, Err(Error::TaxonomyInUse));
    }
}

#[cfg(test)]
mod transaction_category_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        db::open_in_memory,
        taxonomy::{
            CategoryKind, create_transaction_category, delete_transaction_category,
            get_transaction_categories, update_transaction_category,
        },
        user::{User, create_user},
    };

    fn get_test_connection() -> (Connection, User) {
        let conn = open_in_memory().expect("Could not create database");
        let user = create_user("Test", &conn).expect("Could not create user");

        (conn, user)
    }

    #[test]
    fn list_returns_seeded_defaults_grouped_by_kind() {
        let (conn, user) = get_test_connection();

        let categories =
            get_transaction_categories(user.id, &conn).expect("Could not get categories");

        assert_eq!(categories.len(), 30);

        let income_count = categories
            .iter()
            .filter(|category| category.kind == CategoryKind::Income)
            .count();
        let expense_count = categories
            .iter()
            .filter(|category| category.kind == CategoryKind::Expense)
            .count();
        let transfer_count = categories
            .iter()
            .filter(|category| category.kind == CategoryKind::Transfer)
            .count();

        assert_eq!(income_count, 10);
        assert_eq!(expense_count, 14);
        assert_eq!(transfer_count, 6);
        assert!(categories.iter().any(|category| category.label == "Salary"));
        assert!(
            categories
                .iter()
                .any(|category| category.label == "Account Transfer"
                    && category.kind == CategoryKind::Transfer)
        );
    }

    #[test]
    fn create_returns_custom_row() {
        let (conn, user) = get_test_connection();

        let category =
            create_transaction_category(user.id, CategoryKind::Expense, "Board Games", &conn)
                .expect("Could not create category");

        assert_eq!(category.kind, CategoryKind::Expense);
        assert_eq!(category.label, "Board Games");
        assert!(!category.is_system);
    }

    #[test]
    fn update_renames_category() {
        let (conn, user) = get_test_connection();
        let category =
            create_transaction_category(user.id, CategoryKind::Expense, "Board Games", &conn)
                .expect("Could not create category");

        let renamed = update_transaction_category(user.id, category.id, "Tabletop", &conn)
            .expect("Could not rename category");

        assert_eq!(renamed.label, "Tabletop");
        assert_eq!(renamed.kind, CategoryKind::Expense);
    }

    #[test]
    fn delete_fails_on_system_row() {
        let (conn, user) = get_test_connection();
        let salary = get_transaction_categories(user.id, &conn)
            .expect("Could not get categories")
            .into_iter()
            .find(|category| category.label == "Salary")
            .expect("Missing seeded Salary category");

        let result = delete_transaction_category(user.id, salary.id, &conn);

        assert_eq!(result, Err(Error::SystemRowImmutable));
    }

    #[test]
    fn delete_removes_unused_custom_row() {
        let (conn, user) = get_test_connection();
        let category =
            create_transaction_category(user.id, CategoryKind::Expense, "Board Games", &conn)
                .expect("Could not create category");

        let result = delete_transaction_category(user.id, category.id, &conn);

        assert_eq!(result, Ok(()));
    }
}
