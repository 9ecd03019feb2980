//! Common utilities for sql-bridge
//!
//! This crate provides the unified error taxonomy shared by the query core
//! and the database backends.

pub mod error;

pub use error::{
    ClientError, ErrorCode, ErrorContext, ErrorFamily, FatalError, Result, ServerError,
};
