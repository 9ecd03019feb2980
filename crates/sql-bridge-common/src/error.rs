//! Error types for sql-bridge
//!
//! Every failure in the workspace surfaces as an [`ErrorContext`]: a unified
//! error code plus the diagnostics the server (or the client layer) provided.
//! Success is always represented by the absence of an error, never by a code.

use std::fmt;

use thiserror::Error;

/// Result type alias for sql-bridge operations
pub type Result<T> = std::result::Result<T, ErrorContext>;

/// Errors caused by how the caller used the library or the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientError {
    NotConnected,
    InvalidState,
    InvalidArgument,
    InvalidOption,
    InvalidParameter,
    TypeMismatch,
    SyntaxError,
    AuthenticationError,
    ConfigurationError,
    TransactionActive,
    NoActiveTransaction,
}

/// Errors reported by the database server while executing a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerError {
    ConnectionError,
    ConnectionLost,
    RuntimeError,
    DataError,
    DataTooLong,
    NumericOverflow,
    InvalidDatetime,
    DivisionByZero,
    InvalidTextFormat,
    InvalidEncoding,
    ConstraintViolation,
    NotNullViolation,
    ForeignKeyViolation,
    UniqueViolation,
    CheckViolation,
    ExclusionViolation,
    ObjectNotFound,
    TableNotFound,
    ColumnNotFound,
    FunctionNotFound,
    SchemaNotFound,
    DatabaseNotFound,
    PermissionDenied,
    TransactionError,
    TransactionRollback,
    TransactionAborted,
    SerializationFailure,
    DeadlockDetected,
    ResourceError,
    DiskFull,
    OutOfMemory,
    TooManyConnections,
    ConfigurationLimit,
    QueryTooComplex,
    LockTimeout,
    StatementTimeout,
}

/// Errors that indicate a broken protocol or a broken server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalError {
    InternalError,
    CorruptionDetected,
    ProtocolViolation,
    UnexpectedState,
}

/// The three error families of the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFamily {
    Client,
    Server,
    Fatal,
}

/// Unified error code: one of the three closed families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Client(ClientError),
    Server(ServerError),
    Fatal(FatalError),
}

impl ErrorCode {
    /// The family this code belongs to.
    pub fn family(&self) -> ErrorFamily {
        match self {
            ErrorCode::Client(_) => ErrorFamily::Client,
            ErrorCode::Server(_) => ErrorFamily::Server,
            ErrorCode::Fatal(_) => ErrorFamily::Fatal,
        }
    }

    /// The bare code name, e.g. `"UniqueViolation"`.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::Client(c) => match c {
                ClientError::NotConnected => "NotConnected",
                ClientError::InvalidState => "InvalidState",
                ClientError::InvalidArgument => "InvalidArgument",
                ClientError::InvalidOption => "InvalidOption",
                ClientError::InvalidParameter => "InvalidParameter",
                ClientError::TypeMismatch => "TypeMismatch",
                ClientError::SyntaxError => "SyntaxError",
                ClientError::AuthenticationError => "AuthenticationError",
                ClientError::ConfigurationError => "ConfigurationError",
                ClientError::TransactionActive => "TransactionActive",
                ClientError::NoActiveTransaction => "NoActiveTransaction",
            },
            ErrorCode::Server(s) => match s {
                ServerError::ConnectionError => "ConnectionError",
                ServerError::ConnectionLost => "ConnectionLost",
                ServerError::RuntimeError => "RuntimeError",
                ServerError::DataError => "DataError",
                ServerError::DataTooLong => "DataTooLong",
                ServerError::NumericOverflow => "NumericOverflow",
                ServerError::InvalidDatetime => "InvalidDatetime",
                ServerError::DivisionByZero => "DivisionByZero",
                ServerError::InvalidTextFormat => "InvalidTextFormat",
                ServerError::InvalidEncoding => "InvalidEncoding",
                ServerError::ConstraintViolation => "ConstraintViolation",
                ServerError::NotNullViolation => "NotNullViolation",
                ServerError::ForeignKeyViolation => "ForeignKeyViolation",
                ServerError::UniqueViolation => "UniqueViolation",
                ServerError::CheckViolation => "CheckViolation",
                ServerError::ExclusionViolation => "ExclusionViolation",
                ServerError::ObjectNotFound => "ObjectNotFound",
                ServerError::TableNotFound => "TableNotFound",
                ServerError::ColumnNotFound => "ColumnNotFound",
                ServerError::FunctionNotFound => "FunctionNotFound",
                ServerError::SchemaNotFound => "SchemaNotFound",
                ServerError::DatabaseNotFound => "DatabaseNotFound",
                ServerError::PermissionDenied => "PermissionDenied",
                ServerError::TransactionError => "TransactionError",
                ServerError::TransactionRollback => "TransactionRollback",
                ServerError::TransactionAborted => "TransactionAborted",
                ServerError::SerializationFailure => "SerializationFailure",
                ServerError::DeadlockDetected => "DeadlockDetected",
                ServerError::ResourceError => "ResourceError",
                ServerError::DiskFull => "DiskFull",
                ServerError::OutOfMemory => "OutOfMemory",
                ServerError::TooManyConnections => "TooManyConnections",
                ServerError::ConfigurationLimit => "ConfigurationLimit",
                ServerError::QueryTooComplex => "QueryTooComplex",
                ServerError::LockTimeout => "LockTimeout",
                ServerError::StatementTimeout => "StatementTimeout",
            },
            ErrorCode::Fatal(f) => match f {
                FatalError::InternalError => "InternalError",
                FatalError::CorruptionDetected => "CorruptionDetected",
                FatalError::ProtocolViolation => "ProtocolViolation",
                FatalError::UnexpectedState => "UnexpectedState",
            },
        }
    }

    /// Returns true if retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::Server(ServerError::DeadlockDetected)
                | ErrorCode::Server(ServerError::SerializationFailure)
                | ErrorCode::Server(ServerError::StatementTimeout)
                | ErrorCode::Server(ServerError::LockTimeout)
                | ErrorCode::Server(ServerError::ConnectionLost)
        )
    }

    /// Returns true if this is a constraint violation error.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            ErrorCode::Server(ServerError::ConstraintViolation)
                | ErrorCode::Server(ServerError::NotNullViolation)
                | ErrorCode::Server(ServerError::ForeignKeyViolation)
                | ErrorCode::Server(ServerError::UniqueViolation)
                | ErrorCode::Server(ServerError::CheckViolation)
                | ErrorCode::Server(ServerError::ExclusionViolation)
        )
    }
}

impl From<ClientError> for ErrorCode {
    fn from(c: ClientError) -> Self {
        ErrorCode::Client(c)
    }
}

impl From<ServerError> for ErrorCode {
    fn from(s: ServerError) -> Self {
        ErrorCode::Server(s)
    }
}

impl From<FatalError> for ErrorCode {
    fn from(f: FatalError) -> Self {
        ErrorCode::Fatal(f)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rich error context carried by every failure.
///
/// `sqlstate` is the 5-character SQL-standard code when the server provided
/// one, empty otherwise. The optional diagnostics mirror what PostgreSQL
/// reports alongside the primary message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "[{code}] {}{message}{}",
    sqlstate_section(.sqlstate),
    diagnostic_sections(.detail, .hint, .context, .position)
)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub sqlstate: String,
    pub message: String,
    pub detail: String,
    pub hint: String,
    pub context: String,
    pub position: Option<i32>,
}

impl ErrorContext {
    /// Context with a code and a primary message, no server diagnostics.
    pub fn new(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        ErrorContext {
            code: code.into(),
            sqlstate: String::new(),
            message: message.into(),
            detail: String::new(),
            hint: String::new(),
            context: String::new(),
            position: None,
        }
    }

    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = sqlstate.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Renders the full diagnostic surface:
    /// `[<CodeName>] SQLSTATE <sqlstate>: <message>` followed by
    /// newline-prefixed `Detail:`, `Hint:`, `Context:`, `Position:` sections
    /// when present.
    pub fn format(&self) -> String {
        self.to_string()
    }
}

fn sqlstate_section(sqlstate: &str) -> String {
    if sqlstate.is_empty() {
        String::new()
    } else {
        format!("SQLSTATE {sqlstate}: ")
    }
}

fn diagnostic_sections(detail: &str, hint: &str, context: &str, position: &Option<i32>) -> String {
    let mut out = String::new();
    if !detail.is_empty() {
        out.push_str("\nDetail: ");
        out.push_str(detail);
    }
    if !hint.is_empty() {
        out.push_str("\nHint: ");
        out.push_str(hint);
    }
    if !context.is_empty() {
        out.push_str("\nContext: ");
        out.push_str(context);
    }
    if let Some(position) = position {
        out.push_str("\nPosition: ");
        out.push_str(&position.to_string());
    }
    out
}
