//! SQL quoting helpers
//!
//! Everything that splices a name or value into generated SQL goes through
//! these functions.

/// Quote a SQL identifier, doubling embedded double quotes.
///
/// # Examples
/// ```
/// use sluice_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("channel"), r#""channel""#);
/// assert_eq!(quote_ident(r#"odd"name"#), r#""odd""name""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote each dot-separated part of a relation name.
///
/// # Examples
/// ```
/// use sluice_core::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("raw.telegram_messages"), r#""raw"."telegram_messages""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split `schema.table` on the last dot; unqualified names land in `main`.
///
/// # Examples
/// ```
/// use sluice_core::sql_utils::split_qualified_name;
/// assert_eq!(split_qualified_name("dim_channel"), ("main", "dim_channel"));
/// assert_eq!(split_qualified_name("marts.dim_channel"), ("marts", "dim_channel"));
/// ```
pub fn split_qualified_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("main", name),
    }
}

/// Escape a value for use inside a single-quoted SQL literal.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a single-quoted SQL string literal.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", escape_sql_string(value))
}

#[cfg(test)]
#[path = "sql_utils_test.rs"]
mod tests;
