//! Error types for TinySql operations.

use std::fmt;

/// The primary error type for all TinySql operations.
///
/// Every variant except [`Error::Execution`] is raised while a statement is
/// being built, compiled or assembled. Those are fail-fast: no partial SQL is
/// ever returned alongside them.
#[derive(Debug)]
pub enum Error {
    /// No metadata or configuration available when one is required
    Configuration(ConfigError),
    /// A table is missing from the query model or the metadata catalog
    UnknownTable(UnknownTableError),
    /// A column is missing from a table or row
    UnknownColumn(UnknownColumnError),
    /// Join resolution found zero or several candidate relationships
    AmbiguousRelationship(RelationshipError),
    /// A row commit could not move every changed value
    UnacceptedChanges(UnacceptedChangesError),
    /// An operation was invoked on a builder of the wrong statement kind
    StatementKindMismatch(StatementKindError),
    /// Value conversion errors
    Type(TypeError),
    /// Errors reported by an external executor
    Execution(ExecutionError),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Where a lookup was performed when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupScope {
    /// The tables participating in a builder (and its ancestors)
    QueryModel,
    /// The metadata catalog
    Catalog,
    /// A materialized row
    Row,
}

#[derive(Debug)]
pub struct UnknownTableError {
    pub table: String,
    pub scope: LookupScope,
    pub message: String,
}

#[derive(Debug)]
pub struct UnknownColumnError {
    pub table: Option<String>,
    pub column: String,
    pub scope: LookupScope,
    pub message: String,
}

#[derive(Debug)]
pub struct RelationshipError {
    pub kind: RelationshipErrorKind,
    /// Source table (schema-qualified when known)
    pub table: String,
    /// Column the join was requested from
    pub column: String,
    /// Target table, when the caller named one or it was inferred
    pub target: Option<String>,
    /// Number of foreign keys that qualified
    pub candidates: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipErrorKind {
    /// No foreign key qualified
    NoCandidate,
    /// More than one foreign key qualified
    MultipleCandidates,
    /// The shortcut requires a single primary key column
    CompositeKey,
    /// The column is neither a primary key nor a foreign key
    NotAKey,
}

#[derive(Debug)]
pub struct UnacceptedChangesError {
    /// Changed columns that could not be committed
    pub columns: Vec<String>,
    pub message: String,
}

#[derive(Debug)]
pub struct StatementKindError {
    pub operation: &'static str,
    pub expected: &'static str,
    pub actual: &'static str,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct ExecutionError {
    pub message: String,
    pub sql: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Result type alias for TinySql operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    pub fn unknown_table(table: impl Into<String>, scope: LookupScope) -> Self {
        let table = table.into();
        let message = match scope {
            LookupScope::QueryModel => format!("The table '{}' does not exist in the query", table),
            LookupScope::Catalog => format!("The table '{}' was not found in metadata", table),
            LookupScope::Row => format!("The row has no table named '{}'", table),
        };
        Error::UnknownTable(UnknownTableError {
            table,
            scope,
            message,
        })
    }

    pub fn unknown_column(
        table: Option<&str>,
        column: impl Into<String>,
        scope: LookupScope,
    ) -> Self {
        let column = column.into();
        let message = match table {
            Some(t) => format!("The column '{}' was not found in the table '{}'", column, t),
            None => format!("The column '{}' does not exist", column),
        };
        Error::UnknownColumn(UnknownColumnError {
            table: table.map(str::to_string),
            column,
            scope,
            message,
        })
    }

    pub fn kind_mismatch(
        operation: &'static str,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Error::StatementKindMismatch(StatementKindError {
            operation,
            expected,
            actual,
        })
    }

    /// Is this a join resolution failure?
    pub fn is_relationship_error(&self) -> bool {
        matches!(self, Error::AmbiguousRelationship(_))
    }

    /// Is this an error raised by an external executor?
    pub fn is_execution_error(&self) -> bool {
        matches!(self, Error::Execution(_))
    }

    /// The table named by this error, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            Error::UnknownTable(e) => Some(&e.table),
            Error::UnknownColumn(e) => e.table.as_deref(),
            Error::AmbiguousRelationship(e) => Some(&e.table),
            _ => None,
        }
    }

    /// The column named by this error, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Error::UnknownColumn(e) => Some(&e.column),
            Error::AmbiguousRelationship(e) => Some(&e.column),
            Error::Type(e) => e.column.as_deref(),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Execution(e) => e.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(e) => write!(f, "Configuration error: {}", e.message),
            Error::UnknownTable(e) => write!(f, "Unknown table: {}", e.message),
            Error::UnknownColumn(e) => write!(f, "Unknown column: {}", e.message),
            Error::AmbiguousRelationship(e) => write!(f, "Ambiguous relationship: {}", e),
            Error::UnacceptedChanges(e) => write!(f, "Unaccepted changes: {}", e.message),
            Error::StatementKindMismatch(e) => write!(f, "Statement kind mismatch: {}", e),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Execution(e) => write!(f, "Execution error: {}", e.message),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Configuration(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Execution(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for RelationshipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for StatementKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requires a {} statement, but the builder is a {} statement",
            self.operation, self.expected, self.actual
        )
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Configuration(err)
    }
}

impl From<RelationshipError> for Error {
    fn from(err: RelationshipError) -> Self {
        Error::AmbiguousRelationship(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        Error::Execution(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Configuration(ConfigError {
            message: format!("invalid metadata document: {}", err),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_unknown_table_message_names_table() {
        let err = Error::unknown_table("Account", LookupScope::QueryModel);
        assert_eq!(err.table(), Some("Account"));
        assert_eq!(
            err.to_string(),
            "Unknown table: The table 'Account' does not exist in the query"
        );
    }

    #[test]
    fn test_unknown_column_carries_context() {
        let err = Error::unknown_column(Some("dbo.Account"), "Nope", LookupScope::Catalog);
        assert_eq!(err.column(), Some("Nope"));
        assert_eq!(err.table(), Some("dbo.Account"));
        assert!(err.to_string().contains("'Nope'"));
    }

    #[test]
    fn test_kind_mismatch_display() {
        let err = Error::kind_mismatch("set", "Update", "Select");
        assert_eq!(
            err.to_string(),
            "Statement kind mismatch: set requires a Update statement, but the builder is a Select statement"
        );
    }

    #[test]
    fn test_relationship_classification() {
        let err = Error::from(RelationshipError {
            kind: RelationshipErrorKind::MultipleCandidates,
            table: "dbo.Account".to_string(),
            column: "OwningUserID".to_string(),
            target: None,
            candidates: 2,
            message: "two keys".to_string(),
        });
        assert!(err.is_relationship_error());
        assert!(!err.is_execution_error());
        assert_eq!(err.column(), Some("OwningUserID"));
    }

    #[test]
    fn test_execution_error_exposes_source_and_sql() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = Error::Execution(ExecutionError {
            message: "batch failed".to_string(),
            sql: Some("SELECT 1".to_string()),
            source: Some(Box::new(io)),
        });
        assert_eq!(err.sql(), Some("SELECT 1"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_serde_errors_become_configuration_errors() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(parse);
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.source().is_some());
    }
}
