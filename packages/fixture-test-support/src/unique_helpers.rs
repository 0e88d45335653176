//! Unique names for data sources, tables and scratch files

use ulid::Ulid;

/// Generate a unique string with the given prefix
///
/// # Examples
/// ```
/// use fixture_test_support::unique_str;
///
/// let a = unique_str("ds");
/// let b = unique_str("ds");
/// assert_ne!(a, b);
/// assert!(a.starts_with("ds-"));
/// ```
pub fn unique_str(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}

/// Generate a unique SQL-safe identifier (lowercase, underscores only)
///
/// # Examples
/// ```
/// use fixture_test_support::unique_helpers::unique_ident;
///
/// let table = unique_ident("orders");
/// assert!(table.starts_with("orders_"));
/// assert!(table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
/// ```
pub fn unique_ident(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string().to_lowercase())
}
