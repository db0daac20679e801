use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use serde::Serialize;
use time::{Duration, OffsetDateTime, macros::date};

use networth_rs::{
    AccountCategory, AssetType, AssetTypeId, CategoryId, CategoryKind, DebtType, DebtTypeId,
    MonthlySummary, NetWorth, NewAccount, NewDebt, NewTransaction, NewTransfer,
    TransactionCategory, TransactionKind, User, create_account, create_debt, create_transaction,
    create_transfer, create_user, get_asset_types, get_debt_types, get_transaction_categories,
    monthly_summary, net_worth, open, parse_amount,
};

/// A utility for creating a demo database for networth_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// Print the seeded user's summary as pretty JSON instead of plain text.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct DemoSummary {
    net_worth: NetWorth,
    this_month: MonthlySummary,
}

/// Create and populate a database for trying out the library.
fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'demo.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'demo.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = open(output_path)?;

    println!("Creating demo user...");
    let user = create_user("Demo", &conn)?;

    let asset_types = get_asset_types(user.id, &conn)?;
    let debt_types = get_debt_types(user.id, &conn)?;
    let categories = get_transaction_categories(user.id, &conn)?;

    println!("Creating accounts...");
    let everyday = create_account(
        user.id,
        NewAccount {
            category: AccountCategory::Liquid,
            asset_type_id: asset_type_id(&asset_types, "Checking Account"),
            name: "Everyday".to_owned(),
            description: Some("Day-to-day spending".to_owned()),
            current_value: parse_amount("2500.00")?,
            purchase_value: None,
            purchase_date: None,
            notes: None,
        },
        &conn,
    )?;
    let savings = create_account(
        user.id,
        NewAccount {
            category: AccountCategory::Liquid,
            asset_type_id: asset_type_id(&asset_types, "Savings Account"),
            name: "Rainy Day".to_owned(),
            description: None,
            current_value: parse_amount("12000.00")?,
            purchase_value: None,
            purchase_date: None,
            notes: None,
        },
        &conn,
    )?;
    create_account(
        user.id,
        NewAccount {
            category: AccountCategory::NonLiquid,
            asset_type_id: asset_type_id(&asset_types, "Real Estate"),
            name: "House".to_owned(),
            description: None,
            current_value: parse_amount("450000.00")?,
            purchase_value: Some(parse_amount("400000.00")?),
            purchase_date: Some(date!(2019 - 06 - 14)),
            notes: None,
        },
        &conn,
    )?;
    create_account(
        user.id,
        NewAccount {
            category: AccountCategory::Investment,
            asset_type_id: asset_type_id(&asset_types, "Stocks"),
            name: "Brokerage".to_owned(),
            description: None,
            current_value: parse_amount("18000.00")?,
            purchase_value: Some(parse_amount("15000.00")?),
            purchase_date: None,
            notes: None,
        },
        &conn,
    )?;

    println!("Creating debts...");
    create_debt(
        user.id,
        NewDebt {
            debt_type_id: debt_type_id(&debt_types, "Mortgage"),
            name: "Home Loan".to_owned(),
            balance: parse_amount("380000.00")?,
            original_amount: Some(parse_amount("420000.00")?),
            interest_rate: Some(parse_amount("5.2")?),
            monthly_payment: Some(parse_amount("2300.00")?),
            start_date: Some(date!(2019 - 06 - 14)),
            due_date: None,
            notes: None,
        },
        &conn,
    )?;
    create_debt(
        user.id,
        NewDebt {
            debt_type_id: debt_type_id(&debt_types, "Credit Card"),
            name: "Visa".to_owned(),
            balance: parse_amount("1850.00")?,
            original_amount: None,
            interest_rate: Some(parse_amount("19.9")?),
            monthly_payment: Some(parse_amount("150.00")?),
            start_date: None,
            due_date: None,
            notes: None,
        },
        &conn,
    )?;

    println!("Creating transactions...");
    let now = OffsetDateTime::now_utc();
    create_transaction(
        user.id,
        NewTransaction {
            kind: TransactionKind::Income,
            account_id: everyday.id,
            category_id: category_id(&categories, CategoryKind::Income, "Salary"),
            description: "Monthly salary".to_owned(),
            amount: parse_amount("5200.00")?,
            transaction_date: now - Duration::days(3),
            notes: None,
        },
        &conn,
    )?;
    create_transaction(
        user.id,
        NewTransaction {
            kind: TransactionKind::Expense,
            account_id: everyday.id,
            category_id: category_id(&categories, CategoryKind::Expense, "Groceries"),
            description: "Supermarket run".to_owned(),
            amount: parse_amount("240.50")?,
            transaction_date: now - Duration::days(2),
            notes: None,
        },
        &conn,
    )?;
    create_transaction(
        user.id,
        NewTransaction {
            kind: TransactionKind::Expense,
            account_id: everyday.id,
            category_id: category_id(&categories, CategoryKind::Expense, "Bills & Utilities"),
            description: "Power and internet".to_owned(),
            amount: parse_amount("180.00")?,
            transaction_date: now - Duration::days(2),
            notes: None,
        },
        &conn,
    )?;
    create_transaction(
        user.id,
        NewTransaction {
            kind: TransactionKind::Expense,
            account_id: everyday.id,
            category_id: category_id(&categories, CategoryKind::Expense, "Food & Dining"),
            description: "Dinner out".to_owned(),
            amount: parse_amount("96.40")?,
            transaction_date: now - Duration::days(1),
            notes: None,
        },
        &conn,
    )?;

    println!("Creating transfer...");
    create_transfer(
        user.id,
        NewTransfer {
            from_account_id: everyday.id,
            to_account_id: savings.id,
            category_id: category_id(&categories, CategoryKind::Transfer, "Savings Transfer"),
            description: "Monthly savings".to_owned(),
            amount: parse_amount("1000.00")?,
            transaction_date: now - Duration::hours(12),
        },
        &conn,
    )?;

    print_summary(&user, args.json, &conn)?;

    println!("Success!");

    Ok(())
}

fn print_summary(user: &User, as_json: bool, conn: &Connection) -> Result<(), Box<dyn Error>> {
    let summary = DemoSummary {
        net_worth: net_worth(user.id, conn)?,
        this_month: monthly_summary(user.id, OffsetDateTime::now_utc().date(), conn)?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Net worth: {} ({} in assets, {} in debts)",
            summary.net_worth.net_worth,
            summary.net_worth.assets.total,
            summary.net_worth.liabilities_total
        );
        println!(
            "This month: {} in, {} out",
            summary.this_month.income, summary.this_month.expense
        );
    }

    Ok(())
}

fn asset_type_id(asset_types: &[AssetType], label: &str) -> AssetTypeId {
    asset_types
        .iter()
        .find(|asset_type| asset_type.label == label)
        .expect("The default asset types have changed")
        .id
}

fn debt_type_id(debt_types: &[DebtType], label: &str) -> DebtTypeId {
    debt_types
        .iter()
        .find(|debt_type| debt_type.label == label)
        .expect("The default debt types have changed")
        .id
}

fn category_id(categories: &[TransactionCategory], kind: CategoryKind, label: &str) -> CategoryId {
    categories
        .iter()
        .find(|category| category.kind == kind && category.label == label)
        .expect("The default transaction categories have changed")
        .id
}

fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::from_default_env().add_directive("networth_rs=info".parse().unwrap());

    fmt().with_env_filter(filter).init();
}
