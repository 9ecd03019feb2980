//! Type-safe, compositional SQL query construction and compilation.
//!
//! Applications describe a relational query as a strongly-typed expression
//! tree and obtain, per query, a dialect-appropriate SQL string plus a
//! parameter packet ready for parameterized execution.
//!
//! # Architecture
//!
//! ```text
//! schema / record      typed tables, fields, rows
//!        |
//! builder + expr       fluent chain -> owned AST (clause order checked
//!        |             statically via stage markers)
//! visitor              enter/leave hooks over every construct
//!        |
//! generator + dialect  one walk -> SQL text + ParamSink pushes
//!        |
//! CompiledQuery        finalized SQL + opaque backend packet
//! ```
//!
//! Backends implement [`dialect::SqlDialect`] and consume the packet on
//! their side of the wire; see the `sql-bridge-postgres` crate.

pub mod builder;
pub mod column;
pub mod compiled;
pub mod dialect;
pub mod expr;
pub mod generator;
pub mod record;
pub mod schema;
pub mod value;
pub mod visitor;

pub use builder::{
    select, select_distinct, select_from_schema, Select, SelectBuilder, SelectList,
};
pub use column::{all, all_of, col, dynamic, AllColumns, Column, DynamicColumn, SchemaColumns};
pub use compiled::CompiledQuery;
pub use dialect::{ParamPacket, ParamSink, SqlDialect};
pub use expr::{
    asc, avg, between, case_when, count, count_all, count_distinct, delete_from, desc, except,
    exists, in_list, insert_into, intersect, is_not_null, is_null, lit, max, min, null_value,
    subquery, sum, union_all, union_query, update, with, AggregateFn, BinaryOp, Cte,
    DeleteBuilder, DeleteStatement, Expr, ExprOps, InsertBuilder, InsertStatement, IntoExpr,
    JoinKind, OrderBy, OrderDirection, ReturningClause, SelectStatement, SetOperator, Statement,
    UnaryOp, UpdateBuilder, UpdateStatement,
};
pub use generator::{GenerationMode, QueryCompiler, SqlGenerator};
pub use record::{Field, Record};
pub use schema::{FieldSchema, TableSchema, TableSchemaRef};
pub use value::{FieldKind, FieldValue, SqlType};
pub use visitor::QueryVisitor;

pub use sql_bridge_common::{
    ClientError, ErrorCode, ErrorContext, ErrorFamily, FatalError, Result, ServerError,
};
