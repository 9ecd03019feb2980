//! PostgreSQL backend for sql-bridge.
//!
//! Implements the core's dialect abstraction for PostgreSQL and binds
//! compiled queries to the native client:
//!
//! - [`PostgresDialect`] — identifier quoting, `$N` placeholders,
//!   LIMIT/OFFSET shape, inline value rendering, parameter sink factory
//! - [`PgParams`] — binary wire-format parameter encoding with parallel
//!   value/length/format/OID arrays
//! - [`ResultBlock`] / [`RowView`] / [`FieldView`] — format- and OID-aware
//!   decoding over result rows
//! - [`map_sqlstate`] — table-driven SQLSTATE to error-code mapping
//! - [`SyncExecutor`] / [`AsyncExecutor`] — blocking and cooperative
//!   query execution with rich error contexts

pub mod async_executor;
pub mod dialect;
pub mod error;
pub mod params;
pub mod result;
pub mod sync_executor;

pub use async_executor::AsyncExecutor;
pub use dialect::PostgresDialect;
pub use error::{context_from_client_error, context_from_db_error, map_sqlstate};
pub use params::{PgParamSink, PgParams, POSTGRES_BACKEND};
pub use result::{FieldView, FromField, ResultBlock, RowView, WireFormat};
pub use sync_executor::SyncExecutor;

pub use sql_bridge_common::{ErrorCode, ErrorContext, Result};
