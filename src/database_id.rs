//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of a row in the account table.
pub type AccountId = DatabaseId;

/// The ID of a row in the transaction table.
pub type TransactionId = DatabaseId;

/// The ID of a row in the transaction category table.
pub type CategoryId = DatabaseId;

/// The ID of a row in the asset type table.
pub type AssetTypeId = DatabaseId;

/// The ID of a row in the debt type table.
pub type DebtTypeId = DatabaseId;

/// The ID of a row in the debt table.
pub type DebtId = DatabaseId;
