//! Supported SQL dialects and their rendering rules.
//!
//! One variant per supported database. Every variant satisfies the same
//! contract (quoted identifiers, bound parameters, the same upsert
//! semantics) with dialect-specific rendering and capabilities.

use serde::{Deserialize, Serialize};

use crate::schema::SqlType;

/// The supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB.
    Mysql,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// Returns the dialect name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Quotes an identifier (schema, table or column name).
    ///
    /// Embedded quote characters are doubled, so a hostile identifier cannot
    /// break out of the quoting.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Self::Mysql => format!("`{}`", name.replace('`', "``")),
            Self::Postgres | Self::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Returns the bind-parameter placeholder for the given 1-based position.
    #[must_use]
    pub fn placeholder(self, position: usize) -> String {
        match self {
            Self::Postgres => format!("${position}"),
            Self::Mysql | Self::Sqlite => String::from("?"),
        }
    }

    /// Maximum number of bound parameters in a single statement.
    ///
    /// SQLite: `SQLITE_MAX_VARIABLE_NUMBER` default since 3.32.0.
    /// PostgreSQL and MySQL: the wire protocols carry the parameter count as
    /// an unsigned 16-bit integer.
    #[must_use]
    pub const fn parameter_limit(self) -> usize {
        match self {
            Self::Sqlite => 32_766,
            Self::Postgres | Self::Mysql => 65_535,
        }
    }

    /// Whether the dialect has a schema/namespace system.
    #[must_use]
    pub const fn supports_schemas(self) -> bool {
        matches!(self, Self::Postgres)
    }

    /// Whether the dialect can alter an existing column's type.
    #[must_use]
    pub const fn supports_alter_column_type(self) -> bool {
        !matches!(self, Self::Sqlite)
    }

    /// Whether rows with null key values are skipped instead of rejected.
    ///
    /// MySQL's `ON DUPLICATE KEY` never treats NULL key parts as
    /// conflicting, so null-key rows are dropped with a warning rather than
    /// failing the whole operation.
    #[must_use]
    pub const fn skips_null_key_rows(self) -> bool {
        matches!(self, Self::Mysql)
    }

    /// Renders the concrete type name for a canonical [`SqlType`].
    #[must_use]
    pub fn type_name(self, sql_type: &SqlType) -> String {
        match self {
            Self::Postgres => match sql_type {
                SqlType::Boolean => "BOOLEAN".into(),
                SqlType::BigInt => "BIGINT".into(),
                SqlType::Double => "DOUBLE PRECISION".into(),
                SqlType::Text => "TEXT".into(),
                SqlType::Varchar(len) => format!("VARCHAR({len})"),
                SqlType::Timestamp => "TIMESTAMP".into(),
                SqlType::TimestampTz => "TIMESTAMPTZ".into(),
                SqlType::Bytes => "BYTEA".into(),
                SqlType::Json => "JSONB".into(),
            },
            Self::Mysql => match sql_type {
                SqlType::Boolean => "BOOLEAN".into(),
                SqlType::BigInt => "BIGINT".into(),
                SqlType::Double => "DOUBLE".into(),
                SqlType::Text => "TEXT".into(),
                SqlType::Varchar(len) => format!("VARCHAR({len})"),
                SqlType::Timestamp => "DATETIME".into(),
                SqlType::TimestampTz => "TIMESTAMP".into(),
                SqlType::Bytes => "BLOB".into(),
                SqlType::Json => "JSON".into(),
            },
            // SQLite's type affinity collapses most of these.
            Self::Sqlite => match sql_type {
                SqlType::Boolean | SqlType::BigInt => "INTEGER".into(),
                SqlType::Double => "REAL".into(),
                SqlType::Text
                | SqlType::Varchar(_)
                | SqlType::Timestamp
                | SqlType::TimestampTz
                | SqlType::Json => "TEXT".into(),
                SqlType::Bytes => "BLOB".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(Dialect::Postgres.quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::Mysql.quote_identifier("users"), "`users`");
        // embedded quotes are doubled, not interpreted
        assert_eq!(
            Dialect::Sqlite.quote_identifier("bad\"name"),
            "\"bad\"\"name\""
        );
        assert_eq!(Dialect::Mysql.quote_identifier("bad`name"), "`bad``name`");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
        assert_eq!(Dialect::Mysql.placeholder(3), "?");
        assert_eq!(Dialect::Sqlite.placeholder(1), "?");
    }

    #[test]
    fn test_parameter_limits() {
        assert_eq!(Dialect::Sqlite.parameter_limit(), 32_766);
        assert_eq!(Dialect::Postgres.parameter_limit(), 65_535);
        assert_eq!(Dialect::Mysql.parameter_limit(), 65_535);
    }

    #[test]
    fn test_capabilities() {
        assert!(Dialect::Postgres.supports_schemas());
        assert!(!Dialect::Mysql.supports_schemas());
        assert!(!Dialect::Sqlite.supports_schemas());
        assert!(!Dialect::Sqlite.supports_alter_column_type());
        assert!(Dialect::Mysql.skips_null_key_rows());
        assert!(!Dialect::Postgres.skips_null_key_rows());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Dialect::Postgres.type_name(&SqlType::Json), "JSONB");
        assert_eq!(Dialect::Postgres.type_name(&SqlType::Double), "DOUBLE PRECISION");
        assert_eq!(Dialect::Mysql.type_name(&SqlType::Varchar(50)), "VARCHAR(50)");
        assert_eq!(Dialect::Sqlite.type_name(&SqlType::BigInt), "INTEGER");
        assert_eq!(Dialect::Sqlite.type_name(&SqlType::Json), "TEXT");
    }
}
