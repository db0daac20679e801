//! Debts: mortgages, loans, credit cards, and other liabilities.
//!
//! Debts are not ledger-driven. Their balances are edited directly, so
//! updates here accept a new balance, unlike accounts.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{DebtId, DebtTypeId},
    money::{check_precision, decimal_column, optional_decimal_column},
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Money owed: a mortgage, a loan, a credit card balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    /// The ID of the debt.
    pub id: DebtId,
    /// The user this debt belongs to.
    pub user_id: UserId,
    /// The debt type this debt files under.
    pub debt_type_id: DebtTypeId,
    /// The display name of the debt.
    pub name: String,
    /// The amount currently owed.
    pub balance: Decimal,
    /// The amount originally borrowed, if recorded.
    pub original_amount: Option<Decimal>,
    /// The annual interest rate as a percentage, if recorded.
    pub interest_rate: Option<Decimal>,
    /// The regular monthly payment, if recorded.
    pub monthly_payment: Option<Decimal>,
    /// When the debt was taken on, if recorded.
    pub start_date: Option<Date>,
    /// When the debt is due to be paid off, if recorded.
    pub due_date: Option<Date>,
    /// Optional free-form notes.
    pub notes: Option<String>,
    /// When the debt was created.
    pub created_at: OffsetDateTime,
    /// When the debt was last changed.
    pub updated_at: OffsetDateTime,
}

/// The data required to create a new debt.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDebt {
    /// The debt type the debt files under. Must belong to the same user.
    pub debt_type_id: DebtTypeId,
    /// The display name of the debt.
    pub name: String,
    /// The amount currently owed.
    pub balance: Decimal,
    /// The amount originally borrowed, if known.
    pub original_amount: Option<Decimal>,
    /// The annual interest rate as a percentage, if known.
    pub interest_rate: Option<Decimal>,
    /// The regular monthly payment, if known.
    pub monthly_payment: Option<Decimal>,
    /// When the debt was taken on, if known.
    pub start_date: Option<Date>,
    /// When the debt is due to be paid off, if known.
    pub due_date: Option<Date>,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// A partial update to a debt. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtUpdate {
    /// A new display name.
    pub name: Option<String>,
    /// A new debt type. Must belong to the same user.
    pub debt_type_id: Option<DebtTypeId>,
    /// A new balance.
    pub balance: Option<Decimal>,
    /// A new original amount.
    pub original_amount: Option<Decimal>,
    /// A new interest rate.
    pub interest_rate: Option<Decimal>,
    /// A new monthly payment.
    pub monthly_payment: Option<Decimal>,
    /// A new start date.
    pub start_date: Option<Date>,
    /// A new due date.
    pub due_date: Option<Date>,
    /// New notes.
    pub notes: Option<String>,
}

/// Totals across all of a user's debts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtSummary {
    /// How many debts the user has.
    pub count: usize,
    /// The total amount currently owed.
    pub total_debt: Decimal,
    /// The total of the recorded monthly payments.
    pub total_monthly_payment: Decimal,
    /// The total originally borrowed. Debts without a recorded original
    /// amount count their current balance.
    pub total_original: Decimal,
    /// How much of the original total has been paid off.
    pub total_paid_off: Decimal,
    /// The paid-off share of the original total, as a percentage.
    pub paid_off_percent: Decimal,
    /// The average interest rate across the debts that carry one.
    pub average_interest_rate: Decimal,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the debt table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub(crate) fn create_debt_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS debt (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                debt_type_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                balance TEXT NOT NULL,
                original_amount TEXT,
                interest_rate TEXT,
                monthly_payment TEXT,
                start_date TEXT,
                due_date TEXT,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(debt_type_id) REFERENCES debt_type(id) ON UPDATE CASCADE ON DELETE RESTRICT
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_debt_user ON debt(user_id);",
        (),
    )?;

    Ok(())
}

/// Create a new debt.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the name is empty or whitespace,
/// - or [Error::AmountPrecision] if a money amount has more than two decimal
///   places,
/// - or [Error::NotFound] if the debt type does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_debt(
    user_id: UserId,
    new_debt: NewDebt,
    connection: &Connection,
) -> Result<Debt, Error> {
    let name = new_debt.name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    check_precision(new_debt.balance)?;
    for amount in [new_debt.original_amount, new_debt.monthly_payment]
        .into_iter()
        .flatten()
    {
        check_precision(amount)?;
    }

    resolve_debt_type(user_id, new_debt.debt_type_id, connection)?;

    let now = OffsetDateTime::now_utc();
    let debt = connection
        .prepare(
            "INSERT INTO debt (user_id, debt_type_id, name, balance, original_amount,
                               interest_rate, monthly_payment, start_date, due_date, notes,
                               created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             RETURNING id, user_id, debt_type_id, name, balance, original_amount,
                       interest_rate, monthly_payment, start_date, due_date, notes,
                       created_at, updated_at",
        )?
        .query_one(
            (
                user_id.as_i64(),
                new_debt.debt_type_id,
                name,
                new_debt.balance.to_string(),
                new_debt.original_amount.map(|value| value.to_string()),
                new_debt.interest_rate.map(|value| value.to_string()),
                new_debt.monthly_payment.map(|value| value.to_string()),
                new_debt.start_date,
                new_debt.due_date,
                new_debt.notes.as_deref(),
                now,
                now,
            ),
            map_debt_row,
        )?;

    Ok(debt)
}

/// Retrieve a debt by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the debt does not exist or belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_debt(user_id: UserId, debt_id: DebtId, connection: &Connection) -> Result<Debt, Error> {
    let debt = connection
        .prepare(
            "SELECT id, user_id, debt_type_id, name, balance, original_amount,
                    interest_rate, monthly_payment, start_date, due_date, notes,
                    created_at, updated_at
             FROM debt
             WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(
            &[(":id", &debt_id), (":user_id", &user_id.as_i64())],
            map_debt_row,
        )?;

    Ok(debt)
}

/// Get all debts belonging to `user_id`, largest balance first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn all_debts(user_id: UserId, connection: &Connection) -> Result<Vec<Debt>, Error> {
    let debts = connection
        .prepare(
            "SELECT id, user_id, debt_type_id, name, balance, original_amount,
                    interest_rate, monthly_payment, start_date, due_date, notes,
                    created_at, updated_at
             FROM debt
             WHERE user_id = :user_id
             ORDER BY CAST(balance AS REAL) DESC, id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_debt_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(debts)
}

/// Update a debt.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the new name is empty or whitespace,
/// - or [Error::AmountPrecision] if a new money amount has more than two
///   decimal places,
/// - or [Error::NotFound] if the debt or the new debt type does not exist or
///   belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_debt(
    user_id: UserId,
    debt_id: DebtId,
    update: DebtUpdate,
    connection: &Connection,
) -> Result<Debt, Error> {
    let name = match update.name.as_deref().map(str::trim) {
        Some("") => return Err(Error::EmptyName),
        other => other,
    };
    for amount in [update.balance, update.original_amount, update.monthly_payment]
        .into_iter()
        .flatten()
    {
        check_precision(amount)?;
    }
    if let Some(debt_type_id) = update.debt_type_id {
        resolve_debt_type(user_id, debt_type_id, connection)?;
    }

    let debt = connection
        .prepare(
            "UPDATE debt
             SET name = COALESCE(?1, name),
                 debt_type_id = COALESCE(?2, debt_type_id),
                 balance = COALESCE(?3, balance),
                 original_amount = COALESCE(?4, original_amount),
                 interest_rate = COALESCE(?5, interest_rate),
                 monthly_payment = COALESCE(?6, monthly_payment),
                 start_date = COALESCE(?7, start_date),
                 due_date = COALESCE(?8, due_date),
                 notes = COALESCE(?9, notes),
                 updated_at = ?10
             WHERE id = ?11 AND user_id = ?12
             RETURNING id, user_id, debt_type_id, name, balance, original_amount,
                       interest_rate, monthly_payment, start_date, due_date, notes,
                       created_at, updated_at",
        )?
        .query_one(
            (
                name,
                update.debt_type_id,
                update.balance.map(|value| value.to_string()),
                update.original_amount.map(|value| value.to_string()),
                update.interest_rate.map(|value| value.to_string()),
                update.monthly_payment.map(|value| value.to_string()),
                update.start_date,
                update.due_date,
                update.notes.as_deref(),
                OffsetDateTime::now_utc(),
                debt_id,
                user_id.as_i64(),
            ),
            map_debt_row,
        )?;

    Ok(debt)
}

/// Delete a debt, returning it as it was at deletion.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the debt does not exist or belongs to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_debt(
    user_id: UserId,
    debt_id: DebtId,
    connection: &Connection,
) -> Result<Debt, Error> {
    let debt = connection
        .prepare(
            "DELETE FROM debt
             WHERE id = :id AND user_id = :user_id
             RETURNING id, user_id, debt_type_id, name, balance, original_amount,
                       interest_rate, monthly_payment, start_date, due_date, notes,
                       created_at, updated_at",
        )?
        .query_one(
            &[(":id", &debt_id), (":user_id", &user_id.as_i64())],
            map_debt_row,
        )?;

    Ok(debt)
}

/// Summarise all of a user's debts.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn debt_summary(user_id: UserId, connection: &Connection) -> Result<DebtSummary, Error> {
    let debts = all_debts(user_id, connection)?;

    let total_debt: Decimal = debts.iter().map(|debt| debt.balance).sum();
    let total_monthly_payment: Decimal = debts
        .iter()
        .filter_map(|debt| debt.monthly_payment)
        .sum();
    let total_original: Decimal = debts
        .iter()
        .map(|debt| debt.original_amount.unwrap_or(debt.balance))
        .sum();
    let total_paid_off = total_original - total_debt;
    let paid_off_percent = if total_original > Decimal::ZERO {
        total_paid_off / total_original * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    let rates: Vec<Decimal> = debts
        .iter()
        .filter_map(|debt| debt.interest_rate)
        .filter(|rate| !rate.is_zero())
        .collect();
    let average_interest_rate = if rates.is_empty() {
        Decimal::ZERO
    } else {
        rates.iter().sum::<Decimal>() / Decimal::from(rates.len() as u64)
    };

    Ok(DebtSummary {
        count: debts.len(),
        total_debt,
        total_monthly_payment,
        total_original,
        total_paid_off,
        paid_off_percent,
        average_interest_rate,
    })
}

/// Check that a debt type exists and belongs to `user_id`.
fn resolve_debt_type(
    user_id: UserId,
    debt_type_id: DebtTypeId,
    connection: &Connection,
) -> Result<(), Error> {
    connection
        .prepare("SELECT id FROM debt_type WHERE id = :id AND user_id = :user_id")?
        .query_one(
            &[(":id", &debt_type_id), (":user_id", &user_id.as_i64())],
            |row| row.get::<_, i64>(0),
        )?;

    Ok(())
}

/// Map a database row to a [Debt].
fn map_debt_row(row: &Row) -> Result<Debt, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserId::new(row.get(1)?);
    let debt_type_id = row.get(2)?;
    let name = row.get(3)?;
    let balance = decimal_column(row, 4)?;
    let original_amount = optional_decimal_column(row, 5)?;
    let interest_rate = optional_decimal_column(row, 6)?;
    let monthly_payment = optional_decimal_column(row, 7)?;
    let start_date = row.get(8)?;
    let due_date = row.get(9)?;
    let notes = row.get(10)?;
    let created_at = row.get(11)?;
    let updated_at = row.get(12)?;

    Ok(Debt {
        id,
        user_id,
        debt_type_id,
        name,
        balance,
        original_amount,
        interest_rate,
        monthly_payment,
        start_date,
        due_date,
        notes,
        created_at,
        updated_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
