//! SQLSTATE-to-error-code mapping and native-client error translation.
//!
//! The mapping is table-driven: the first two characters select the class,
//! exact codes override inside the class. Class `00` (and an empty state)
//! is success and never produces an error; an unknown class falls through
//! to `Fatal(UnexpectedState)`.
//!
//! Reference: <https://www.postgresql.org/docs/current/errcodes-appendix.html>

use tokio_postgres::error::DbError;

use sql_bridge_common::{
    ClientError, ErrorCode, ErrorContext, FatalError, ServerError,
};

/// Maps a 5-character SQLSTATE to a unified error code.
///
/// Returns `None` for success states (`00…`, empty input).
pub fn map_sqlstate(sqlstate: &str) -> Option<ErrorCode> {
    if sqlstate.is_empty() || sqlstate == "00000" {
        return None;
    }
    if !sqlstate.is_ascii() {
        return Some(FatalError::UnexpectedState.into());
    }
    let class = &sqlstate[..sqlstate.len().min(2)];

    let code: ErrorCode = match class {
        "00" => return None,

        // Connection Exception
        "08" => match sqlstate {
            "08000" => ServerError::ConnectionError.into(),
            "08003" => ClientError::NotConnected.into(),
            "08006" => ServerError::ConnectionLost.into(),
            "08P01" => FatalError::ProtocolViolation.into(),
            _ => ServerError::ConnectionError.into(),
        },

        // Feature Not Supported
        "0A" => ClientError::InvalidOption.into(),

        // Case Not Found
        "20" => ServerError::ObjectNotFound.into(),

        // Cardinality Violation
        "21" => ServerError::DataError.into(),

        // Data Exception
        "22" => match sqlstate {
            "22001" => ServerError::DataTooLong.into(),
            "22003" => ServerError::NumericOverflow.into(),
            "22007" | "22008" => ServerError::InvalidDatetime.into(),
            "22012" => ServerError::DivisionByZero.into(),
            "22P02" | "22P04" => ServerError::InvalidTextFormat.into(),
            "22P03" => ServerError::InvalidEncoding.into(),
            _ => ServerError::DataError.into(),
        },

        // Integrity Constraint Violation
        "23" => match sqlstate {
            "23502" => ServerError::NotNullViolation.into(),
            "23503" => ServerError::ForeignKeyViolation.into(),
            "23505" => ServerError::UniqueViolation.into(),
            "23514" => ServerError::CheckViolation.into(),
            "23P01" => ServerError::ExclusionViolation.into(),
            _ => ServerError::ConstraintViolation.into(),
        },

        // Invalid Cursor State
        "24" => ClientError::InvalidState.into(),

        // Invalid Transaction State
        "25" => match sqlstate {
            "25001" | "25P02" => ClientError::TransactionActive.into(),
            "25P01" | "25P03" => ClientError::NoActiveTransaction.into(),
            _ => ClientError::InvalidState.into(),
        },

        // Invalid SQL Statement Name / Invalid Cursor Name
        "26" | "34" => ClientError::InvalidArgument.into(),

        // Invalid Authorization Specification
        "28" => ClientError::AuthenticationError.into(),

        // Dependent Privilege Descriptors Still Exist
        "2B" => ServerError::ConstraintViolation.into(),

        // Invalid Transaction Termination
        "2D" => ServerError::TransactionError.into(),

        // SQL Routine / External Routine Exceptions
        "2F" | "38" | "39" => ServerError::RuntimeError.into(),

        // Savepoint Exception
        "3B" => ServerError::TransactionError.into(),

        // Invalid Catalog Name
        "3D" => ServerError::DatabaseNotFound.into(),

        // Invalid Schema Name
        "3F" => ServerError::SchemaNotFound.into(),

        // Transaction Rollback
        "40" => match sqlstate {
            "40001" => ServerError::SerializationFailure.into(),
            "40002" | "40003" => ServerError::TransactionAborted.into(),
            "40P01" => ServerError::DeadlockDetected.into(),
            _ => ServerError::TransactionRollback.into(),
        },

        // Syntax Error or Access Rule Violation
        "42" => match sqlstate {
            "42000" | "42601" => ClientError::SyntaxError.into(),
            "42501" | "42830" => ServerError::PermissionDenied.into(),
            "42703" => ServerError::ColumnNotFound.into(),
            "42704" => ServerError::ObjectNotFound.into(),
            "42804" | "42846" | "42P18" => ClientError::TypeMismatch.into(),
            "42883" => ServerError::FunctionNotFound.into(),
            "42P01" => ServerError::TableNotFound.into(),
            "42P02" => ClientError::InvalidParameter.into(),
            "42P04" => ServerError::DatabaseNotFound.into(),
            "42P06" | "42P15" => ServerError::SchemaNotFound.into(),
            "42602" | "42611" | "42622" | "42701" | "42702" | "42710" | "42712" | "42723"
            | "42725" | "42803" | "42809" | "42939" | "42P03" | "42P05" | "42P07" | "42P08"
            | "42P09" | "42P10" | "42P11" | "42P12" | "42P13" | "42P14" | "42P16" | "42P17"
            | "42P19" | "42P20" | "42P21" | "42P22" => ClientError::InvalidArgument.into(),
            _ => ClientError::SyntaxError.into(),
        },

        // WITH CHECK OPTION Violation
        "44" => ServerError::CheckViolation.into(),

        // Insufficient Resources
        "53" => match sqlstate {
            "53100" => ServerError::DiskFull.into(),
            "53200" => ServerError::OutOfMemory.into(),
            "53300" => ServerError::TooManyConnections.into(),
            "53400" => ServerError::ConfigurationLimit.into(),
            _ => ServerError::ResourceError.into(),
        },

        // Program Limit Exceeded
        "54" => match sqlstate {
            "54001" => ServerError::QueryTooComplex.into(),
            "54011" | "54023" => ServerError::TooManyConnections.into(),
            _ => ServerError::ConfigurationLimit.into(),
        },

        // Object Not In Prerequisite State
        "55" => match sqlstate {
            "55P02" | "55P03" => ServerError::LockTimeout.into(),
            _ => ClientError::InvalidState.into(),
        },

        // Operator Intervention
        "57" => match sqlstate {
            "57014" => ServerError::StatementTimeout.into(),
            "57P01" | "57P02" | "57P03" | "57P04" | "57P05" => {
                ServerError::ConnectionError.into()
            }
            _ => ServerError::RuntimeError.into(),
        },

        // System Error
        "58" => match sqlstate {
            "58030" => FatalError::CorruptionDetected.into(),
            _ => FatalError::InternalError.into(),
        },

        // Configuration File Error
        "F0" => ClientError::ConfigurationError.into(),

        // Foreign Data Wrapper Error
        "HV" => ServerError::RuntimeError.into(),

        // PL/pgSQL Error
        "P0" => match sqlstate {
            "P0002" => ServerError::ObjectNotFound.into(),
            "P0003" => ServerError::DataError.into(),
            "P0004" => ClientError::InvalidParameter.into(),
            _ => ServerError::RuntimeError.into(),
        },

        // Internal Error
        "XX" => match sqlstate {
            "XX001" | "XX002" => FatalError::CorruptionDetected.into(),
            _ => FatalError::InternalError.into(),
        },

        _ => FatalError::UnexpectedState.into(),
    };

    Some(code)
}

/// Builds a full error context from the server's diagnostics.
pub fn context_from_db_error(db: &DbError) -> ErrorContext {
    let sqlstate = db.code().code();
    let code = map_sqlstate(sqlstate).unwrap_or_else(|| ServerError::RuntimeError.into());
    let mut ctx = ErrorContext::new(code, db.message());
    ctx.sqlstate = sqlstate.to_string();
    ctx.detail = db.detail().unwrap_or_default().to_string();
    ctx.hint = db.hint().unwrap_or_default().to_string();
    ctx.context = db.where_().unwrap_or_default().to_string();
    ctx.position = db.position().map(|p| match p {
        tokio_postgres::error::ErrorPosition::Original(n) => *n as i32,
        tokio_postgres::error::ErrorPosition::Internal { position, .. } => *position as i32,
    });
    ctx
}

/// Translates any native-client error into a context.
pub fn context_from_client_error(err: &tokio_postgres::Error) -> ErrorContext {
    if let Some(db) = err.as_db_error() {
        return context_from_db_error(db);
    }
    if err.is_closed() {
        return ErrorContext::new(ServerError::ConnectionLost, "connection closed");
    }
    ErrorContext::new(ServerError::ConnectionError, err.to_string())
}
