//! Read-only rollups for the dashboard: net worth, monthly cash flow, top
//! spending categories, and per-category asset summaries.
//!
//! Money totals are folded in Rust so amounts never pass through floating
//! point on their way to a report.

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, Month, OffsetDateTime};

use crate::{
    Error,
    account::{AccountCategory, accounts_by_category, all_accounts},
    debt::all_debts,
    money::decimal_column,
    transaction::TransactionKind,
    user::UserId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Account value totals split by how liquid they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetTotals {
    /// The total value of cash and near-cash accounts.
    pub liquid: Decimal,
    /// The total value of property and other slow-to-sell holdings.
    pub non_liquid: Decimal,
    /// The total value of market holdings.
    pub investment: Decimal,
    /// The sum of the three buckets.
    pub total: Decimal,
}

/// A user's overall financial position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetWorth {
    /// What the user owns.
    pub assets: AssetTotals,
    /// What the user owes.
    pub liabilities_total: Decimal,
    /// Assets minus liabilities.
    pub net_worth: Decimal,
}

/// Cash flow through one calendar month.
///
/// Transfer legs are excluded: money moving between two of the user's own
/// accounts is neither income nor spending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// Money that came in during the month.
    pub income: Decimal,
    /// Money that went out during the month.
    pub expense: Decimal,
}

impl MonthlySummary {
    /// Income minus expenses.
    pub fn net(&self) -> Decimal {
        self.income - self.expense
    }

    /// The share of income kept, as a percentage.
    ///
    /// Zero when the month had no income.
    pub fn savings_rate(&self) -> Decimal {
        if self.income > Decimal::ZERO {
            (self.income - self.expense) / self.income * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    }
}

/// Total spending against one category label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpending {
    /// The category's display label.
    pub label: String,
    /// How much was spent against it.
    pub amount: Decimal,
}

/// Totals across one category of a user's accounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetSummary {
    /// How many accounts are in the category.
    pub count: usize,
    /// The total current value.
    pub total_value: Decimal,
    /// The total of the recorded purchase values. Accounts without one
    /// contribute nothing.
    pub total_purchase_value: Decimal,
    /// The gain over the recorded purchase values, as a percentage. Zero when
    /// no purchase values are recorded.
    pub growth_percent: Decimal,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Summarise a user's overall financial position.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn net_worth(user_id: UserId, connection: &Connection) -> Result<NetWorth, Error> {
    let mut assets = AssetTotals::default();
    for account in all_accounts(user_id, connection)? {
        let bucket = match account.category {
            AccountCategory::Liquid => &mut assets.liquid,
            AccountCategory::NonLiquid => &mut assets.non_liquid,
            AccountCategory::Investment => &mut assets.investment,
        };
        *bucket += account.current_value;
    }
    assets.total = assets.liquid + assets.non_liquid + assets.investment;

    let liabilities_total: Decimal = all_debts(user_id, connection)?
        .iter()
        .map(|debt| debt.balance)
        .sum();
    let net_worth = assets.total - liabilities_total;

    Ok(NetWorth {
        assets,
        liabilities_total,
        net_worth,
    })
}

/// Sum a user's income and spending over the calendar month containing
/// `month`.
///
/// Transactions filed under a transfer category are left out of both totals.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn monthly_summary(
    user_id: UserId,
    month: Date,
    connection: &Connection,
) -> Result<MonthlySummary, Error> {
    let (start, end) = month_window(month);

    let rows = connection
        .prepare(
            "SELECT txn.kind, txn.amount
             FROM txn
             JOIN transaction_category ON txn.category_id = transaction_category.id
             WHERE txn.user_id = ?1
               AND txn.transaction_date >= ?2
               AND txn.transaction_date < ?3
               AND transaction_category.kind != 'transfer'",
        )?
        .query_map((user_id.as_i64(), start, end), |row| {
            let kind = row.get::<_, String>(0)?.parse::<TransactionKind>().map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, error.into())
            })?;
            let amount = decimal_column(row, 1)?;

            Ok((kind, amount))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut summary = MonthlySummary {
        income: Decimal::ZERO,
        expense: Decimal::ZERO,
    };
    for (kind, amount) in rows {
        match kind {
            TransactionKind::Income => summary.income += amount,
            TransactionKind::Expense => summary.expense += amount,
        }
    }

    Ok(summary)
}

/// The five categories with the most spending in the calendar month
/// containing `month`, largest first.
///
/// Spending is any expense transaction, so the outgoing leg of a transfer
/// counts against its transfer category. Equal totals keep the category with
/// the most recent spending first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn top_categories(
    user_id: UserId,
    month: Date,
    connection: &Connection,
) -> Result<Vec<CategorySpending>, Error> {
    let (start, end) = month_window(month);

    let rows = connection
        .prepare(
            "SELECT transaction_category.label, txn.amount
             FROM txn
             JOIN transaction_category ON txn.category_id = transaction_category.id
             WHERE txn.user_id = ?1
               AND txn.transaction_date >= ?2
               AND txn.transaction_date < ?3
               AND txn.kind = 'expense'
             ORDER BY txn.transaction_date DESC, txn.id ASC",
        )?
        .query_map((user_id.as_i64(), start, end), |row| {
            Ok((row.get::<_, String>(0)?, decimal_column(row, 1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut totals: Vec<CategorySpending> = Vec::new();
    for (label, amount) in rows {
        match totals.iter_mut().find(|entry| entry.label == label) {
            Some(entry) => entry.amount += amount,
            None => totals.push(CategorySpending { label, amount }),
        }
    }

    totals.sort_by(|a, b| b.amount.cmp(&a.amount));
    totals.truncate(5);

    Ok(totals)
}

/// Summarise one category of a user's accounts.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn asset_summary(
    user_id: UserId,
    category: AccountCategory,
    connection: &Connection,
) -> Result<AssetSummary, Error> {
    let accounts = accounts_by_category(user_id, category, connection)?;

    let total_value: Decimal = accounts.iter().map(|account| account.current_value).sum();
    let total_purchase_value: Decimal = accounts
        .iter()
        .filter_map(|account| account.purchase_value)
        .sum();
    let growth_percent = if total_purchase_value > Decimal::ZERO {
        (total_value - total_purchase_value) / total_purchase_value * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    Ok(AssetSummary {
        count: accounts.len(),
        total_value,
        total_purchase_value,
        growth_percent,
    })
}

/// The UTC bounds of the calendar month containing `month`, as a half-open
/// range.
fn month_window(month: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = Date::from_calendar_date(month.year(), month.month(), 1)
        .expect("invalid month start date");
    let next_first = match start.month() {
        Month::December => Date::from_calendar_date(start.year() + 1, Month::January, 1),
        other => Date::from_calendar_date(start.year(), other.next(), 1),
    }
    .expect("invalid month end date");

    (
        start.midnight().assume_utc(),
        next_first.midnight().assume_utc(),
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod month_window_tests {
    use time::macros::{date, datetime};

    use super::month_window;

    #[test]
    fn covers_whole_month_from_any_day() {
        let (start, end) = month_window(date!(2025 - 03 - 17));

        assert_eq!(start, datetime!(2025-03-01 00:00 UTC));
        assert_eq!(end, datetime!(2025-04-01 00:00 UTC));
    }

    #[test]
    fn december_rolls_into_the_new_year() {
        let (start, end) = month_window(date!(2025 - 12 - 31));

        assert_eq!(start, datetime!(2025-12-01 00:00 UTC));
        assert_eq!(end, datetime!(2026-01-01 00:00 UTC));
    }

    #[test]
    fn handles_leap_february() {
        let (start, end) = month_window(date!(2024 - 02 - 29));

        assert_eq!(start, datetime!(2024-02-01 00:00 UTC));
        assert_eq!(end, datetime!(2024-03-01 00:00 UTC));
    }
}

#[cfg(test)]
mod aggregation_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{
        OffsetDateTime,
        macros::{date, datetime},
    };

    use crate::{
        account::{Account, AccountCategory, NewAccount, create_account},
        aggregation::{asset_summary, monthly_summary, net_worth, top_categories},
        database_id::CategoryId,
        db::open_in_memory,
        debt::{NewDebt, create_debt},
        ledger::create_transaction,
        taxonomy::{
            CategoryKind, create_transaction_category, get_asset_types, get_debt_types,
            get_transaction_categories,
        },
        transaction::{NewTransaction, TransactionKind},
        transfer::{NewTransfer, create_transfer},
        user::{User, create_user},
    };

    fn get_test_connection() -> (Connection, User) {
        let conn = open_in_memory().expect("Could not create database");
        let user = create_user("Test", &conn).expect("Could not create user");

        (conn, user)
    }

    fn account_of(
        user: &User,
        category: AccountCategory,
        asset_type_label: &str,
        name: &str,
        value: Decimal,
        purchase_value: Option<Decimal>,
        conn: &Connection,
    ) -> Account {
        let asset_type_id = get_asset_types(user.id, conn)
            .expect("Could not get asset types")
            .into_iter()
            .find(|asset_type| asset_type.label == asset_type_label)
            .expect("Missing seeded asset type")
            .id;

        create_account(
            user.id,
            NewAccount {
                category,
                asset_type_id,
                name: name.to_owned(),
                description: None,
                current_value: value,
                purchase_value,
                purchase_date: None,
                notes: None,
            },
            conn,
        )
        .expect("Could not create account")
    }

    fn checking(user: &User, name: &str, value: Decimal, conn: &Connection) -> Account {
        account_of(
            user,
            AccountCategory::Liquid,
            "Checking Account",
            name,
            value,
            None,
            conn,
        )
    }

    fn category_of_kind(user: &User, kind: CategoryKind, conn: &Connection) -> CategoryId {
        get_transaction_categories(user.id, conn)
            .expect("Could not get categories")
            .into_iter()
            .find(|category| category.kind == kind)
            .expect("Missing seeded category")
            .id
    }

    fn record(
        user: &User,
        account: &Account,
        kind: TransactionKind,
        category_id: CategoryId,
        amount: Decimal,
        date: OffsetDateTime,
        conn: &Connection,
    ) {
        create_transaction(
            user.id,
            NewTransaction {
                kind,
                account_id: account.id,
                category_id,
                description: "Entry".to_owned(),
                amount,
                transaction_date: date,
                notes: None,
            },
            conn,
        )
        .expect("Could not create transaction");
    }

    #[test]
    fn monthly_summary_sums_by_kind_within_month() {
        let (conn, user) = get_test_connection();
        let account = checking(&user, "Everyday", dec!(10000.00), &conn);
        let income = category_of_kind(&user, CategoryKind::Income, &conn);
        let expense = category_of_kind(&user, CategoryKind::Expense, &conn);

        record(&user, &account, TransactionKind::Income, income, dec!(2000.00), datetime!(2025-03-01 09:00 UTC), &conn);
        record(&user, &account, TransactionKind::Income, income, dec!(500.00), datetime!(2025-03-20 09:00 UTC), &conn);
        record(&user, &account, TransactionKind::Expense, expense, dec!(300.50), datetime!(2025-03-10 12:00 UTC), &conn);
        record(&user, &account, TransactionKind::Expense, expense, dec!(199.50), datetime!(2025-03-31 23:00 UTC), &conn);
        // Neighbouring months stay out of the window.
        record(&user, &account, TransactionKind::Expense, expense, dec!(75.00), datetime!(2025-02-28 12:00 UTC), &conn);
        record(&user, &account, TransactionKind::Income, income, dec!(75.00), datetime!(2025-04-01 00:30 UTC), &conn);

        let summary = monthly_summary(user.id, date!(2025 - 03 - 15), &conn)
            .expect("Could not summarise month");

        assert_eq!(summary.income, dec!(2500.00));
        assert_eq!(summary.expense, dec!(500.00));
        assert_eq!(summary.net(), dec!(2000.00));
        assert_eq!(summary.savings_rate(), dec!(80));
    }

    #[test]
    fn monthly_summary_excludes_transfer_legs() {
        let (conn, user) = get_test_connection();
        let savings = checking(&user, "Savings", dec!(5000.00), &conn);
        let everyday = checking(&user, "Everyday", dec!(1000.00), &conn);
        let income = category_of_kind(&user, CategoryKind::Income, &conn);
        let expense = category_of_kind(&user, CategoryKind::Expense, &conn);

        record(&user, &everyday, TransactionKind::Income, income, dec!(100.00), datetime!(2025-03-05 09:00 UTC), &conn);
        record(&user, &everyday, TransactionKind::Expense, expense, dec!(40.00), datetime!(2025-03-06 09:00 UTC), &conn);
        create_transfer(
            user.id,
            NewTransfer {
                from_account_id: savings.id,
                to_account_id: everyday.id,
                category_id: category_of_kind(&user, CategoryKind::Transfer, &conn),
                description: "Float".to_owned(),
                amount: dec!(1000.00),
                transaction_date: datetime!(2025-03-07 09:00 UTC),
            },
            &conn,
        )
        .expect("Could not create transfer");

        let summary = monthly_summary(user.id, date!(2025 - 03 - 01), &conn)
            .expect("Could not summarise month");

        assert_eq!(summary.income, dec!(100.00));
        assert_eq!(summary.expense, dec!(40.00));
    }

    #[test]
    fn monthly_summary_without_income_has_zero_savings_rate() {
        let (conn, user) = get_test_connection();
        let account = checking(&user, "Everyday", dec!(1000.00), &conn);
        let expense = category_of_kind(&user, CategoryKind::Expense, &conn);

        record(&user, &account, TransactionKind::Expense, expense, dec!(120.00), datetime!(2025-03-10 12:00 UTC), &conn);

        let summary = monthly_summary(user.id, date!(2025 - 03 - 01), &conn)
            .expect("Could not summarise month");

        assert_eq!(summary.expense, dec!(120.00));
        assert_eq!(summary.net(), dec!(-120.00));
        assert_eq!(summary.savings_rate(), dec!(0));
    }

    #[test]
    fn monthly_summary_scopes_to_owner() {
        let (conn, user) = get_test_connection();
        let other = create_user("Other", &conn).expect("Could not create user");
        let theirs = checking(&other, "Theirs", dec!(1000.00), &conn);
        let their_income = category_of_kind(&other, CategoryKind::Income, &conn);

        record(&other, &theirs, TransactionKind::Income, their_income, dec!(999.00), datetime!(2025-03-05 09:00 UTC), &conn);

        let summary = monthly_summary(user.id, date!(2025 - 03 - 01), &conn)
            .expect("Could not summarise month");

        assert_eq!(summary.income, dec!(0));
        assert_eq!(summary.expense, dec!(0));
    }

    #[test]
    fn top_categories_ranks_grouped_spending() {
        let (conn, user) = get_test_connection();
        let account = checking(&user, "Everyday", dec!(10000.00), &conn);

        let labels_and_spends = [
            ("Groceries", vec![dec!(80.00), dec!(45.50)]),
            ("Rent", vec![dec!(1500.00)]),
            ("Dining Out", vec![dec!(60.00)]),
            ("Fuel", vec![dec!(90.00)]),
            ("Streaming", vec![dec!(25.00)]),
            ("Hobbies", vec![dec!(110.00)]),
        ];

        let mut day = 1;
        for (label, spends) in &labels_and_spends {
            let category = create_transaction_category(user.id, CategoryKind::Expense, label, &conn)
                .expect("Could not create category");
            for amount in spends {
                let date = datetime!(2025-03-01 09:00 UTC) + time::Duration::days(day);
                record(&user, &account, TransactionKind::Expense, category.id, *amount, date, &conn);
                day += 1;
            }
        }

        let got = top_categories(user.id, date!(2025 - 03 - 01), &conn)
            .expect("Could not rank categories");

        let want: Vec<(&str, Decimal)> = vec![
            ("Rent", dec!(1500.00)),
            ("Groceries", dec!(125.50)),
            ("Hobbies", dec!(110.00)),
            ("Fuel", dec!(90.00)),
            ("Dining Out", dec!(60.00)),
        ];
        let got_pairs: Vec<(&str, Decimal)> = got
            .iter()
            .map(|entry| (entry.label.as_str(), entry.amount))
            .collect();
        assert_eq!(got_pairs, want);
    }

    #[test]
    fn top_categories_counts_transfer_legs_as_spending() {
        let (conn, user) = get_test_connection();
        let savings = checking(&user, "Savings", dec!(5000.00), &conn);
        let everyday = checking(&user, "Everyday", dec!(1000.00), &conn);
        let expense = category_of_kind(&user, CategoryKind::Expense, &conn);

        record(&user, &everyday, TransactionKind::Expense, expense, dec!(50.00), datetime!(2025-03-06 09:00 UTC), &conn);
        create_transfer(
            user.id,
            NewTransfer {
                from_account_id: savings.id,
                to_account_id: everyday.id,
                category_id: category_of_kind(&user, CategoryKind::Transfer, &conn),
                description: "Float".to_owned(),
                amount: dec!(1000.00),
                transaction_date: datetime!(2025-03-07 09:00 UTC),
            },
            &conn,
        )
        .expect("Could not create transfer");

        let got = top_categories(user.id, date!(2025 - 03 - 01), &conn)
            .expect("Could not rank categories");

        // The expense leg of the transfer outranks the ordinary spending; the
        // income leg appears nowhere.
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].amount, dec!(1000.00));
        assert_eq!(got[1].amount, dec!(50.00));
    }

    #[test]
    fn top_categories_breaks_ties_by_recency() {
        let (conn, user) = get_test_connection();
        let account = checking(&user, "Everyday", dec!(1000.00), &conn);

        let late = create_transaction_category(user.id, CategoryKind::Expense, "Late", &conn)
            .expect("Could not create category");
        let early = create_transaction_category(user.id, CategoryKind::Expense, "Early", &conn)
            .expect("Could not create category");

        record(&user, &account, TransactionKind::Expense, early.id, dec!(30.00), datetime!(2025-03-10 09:00 UTC), &conn);
        record(&user, &account, TransactionKind::Expense, late.id, dec!(30.00), datetime!(2025-03-20 09:00 UTC), &conn);

        let got = top_categories(user.id, date!(2025 - 03 - 01), &conn)
            .expect("Could not rank categories");

        let labels: Vec<&str> = got.iter().map(|entry| entry.label.as_str()).collect();
        assert_eq!(labels, vec!["Late", "Early"]);
    }

    #[test]
    fn net_worth_totals_accounts_against_debts() {
        let (conn, user) = get_test_connection();
        account_of(&user, AccountCategory::Liquid, "Checking Account", "Everyday", dec!(1000.00), None, &conn);
        account_of(&user, AccountCategory::NonLiquid, "Real Estate", "House", dec!(250000.00), Some(dec!(200000.00)), &conn);
        account_of(&user, AccountCategory::Investment, "Stocks", "Brokerage", dec!(15000.00), Some(dec!(12000.00)), &conn);

        let debt_type_id = get_debt_types(user.id, &conn)
            .expect("Could not get debt types")
            .first()
            .expect("Missing seeded debt type")
            .id;
        for (name, balance) in [("Mortgage", dec!(180000.00)), ("Card", dec!(2000.00))] {
            create_debt(
                user.id,
                NewDebt {
                    debt_type_id,
                    name: name.to_owned(),
                    balance,
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
        }

        let got = net_worth(user.id, &conn).expect("Could not compute net worth");

        assert_eq!(got.assets.liquid, dec!(1000.00));
        assert_eq!(got.assets.non_liquid, dec!(250000.00));
        assert_eq!(got.assets.investment, dec!(15000.00));
        assert_eq!(got.assets.total, dec!(266000.00));
        assert_eq!(got.liabilities_total, dec!(182000.00));
        assert_eq!(got.net_worth, dec!(84000.00));
    }

    #[test]
    fn net_worth_of_new_user_is_zero() {
        let (conn, user) = get_test_connection();

        let got = net_worth(user.id, &conn).expect("Could not compute net worth");

        assert_eq!(got.assets.total, dec!(0));
        assert_eq!(got.liabilities_total, dec!(0));
        assert_eq!(got.net_worth, dec!(0));
    }

    #[test]
    fn asset_summary_computes_growth_from_purchase_values() {
        let (conn, user) = get_test_connection();
        account_of(&user, AccountCategory::Investment, "Stocks", "Brokerage", dec!(15000.00), Some(dec!(10000.00)), &conn);
        account_of(&user, AccountCategory::Investment, "ETFs", "Index Fund", dec!(5000.00), None, &conn);
        // Accounts in other categories stay out of the summary.
        account_of(&user, AccountCategory::Liquid, "Checking Account", "Everyday", dec!(1000.00), None, &conn);

        let got = asset_summary(user.id, AccountCategory::Investment, &conn)
            .expect("Could not summarise assets");

        assert_eq!(got.count, 2);
        assert_eq!(got.total_value, dec!(20000.00));
        assert_eq!(got.total_purchase_value, dec!(10000.00));
        assert_eq!(got.growth_percent, dec!(100));
    }

    #[test]
    fn asset_summary_without_purchase_values_has_zero_growth() {
        let (conn, user) = get_test_connection();
        account_of(&user, AccountCategory::Liquid, "Checking Account", "Everyday", dec!(1000.00), None, &conn);

        let got = asset_summary(user.id, AccountCategory::Liquid, &conn)
            .expect("Could not summarise assets");

        assert_eq!(got.count, 1);
        assert_eq!(got.total_value, dec!(1000.00));
        assert_eq!(got.total_purchase_value, dec!(0));
        assert_eq!(got.growth_percent, dec!(0));
    }
}
