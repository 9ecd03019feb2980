//! The expression AST.
//!
//! Nodes are owned values composed by move; a query is a tree, never a DAG,
//! and is consumed once when the compiler walks it. Comparison and logical
//! helpers auto-lift raw scalars into literals so `col.gt(18)` and
//! `col.gt(lit(18))` build the same tree.

use std::ops;
use std::sync::Arc;

use crate::column::{AllColumns, Column, DynamicColumn};
use crate::record::Record;
use crate::schema::TableSchemaRef;
use crate::value::{FieldValue, SqlType};
use sql_bridge_common::{ClientError, ErrorContext, Result};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Like,
    NotLike,
    In,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    IsNull,
    IsNotNull,
}

/// Join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// Set operations over two queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Aggregate functions. Count-all is `Count` with no inner column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count { distinct: bool },
    Sum,
    Avg,
    Min,
    Max,
}

/// AST-level column reference. Typed and dynamic handles converge here;
/// the visitor does not distinguish them. Schema-backed references keep
/// their schema alive for the life of the tree.
#[derive(Debug, Clone)]
pub struct ColumnExpr {
    field: Option<(TableSchemaRef, usize)>,
    name: String,
    table: Option<Arc<str>>,
    alias: Option<String>,
}

impl ColumnExpr {
    pub fn name(&self) -> &str {
        match &self.field {
            Some((schema, index)) => &schema.field(*index).name,
            None => &self.name,
        }
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn field_schema(&self) -> Option<&crate::schema::FieldSchema> {
        self.field.as_ref().map(|(schema, index)| schema.field(*index))
    }
}

impl<T: SqlType> From<Column<T>> for ColumnExpr {
    fn from(col: Column<T>) -> Self {
        let (schema, index, table, alias) = col.parts();
        ColumnExpr {
            field: Some((schema, index)),
            name: String::new(),
            table,
            alias,
        }
    }
}

impl<T: SqlType> From<&Column<T>> for ColumnExpr {
    fn from(col: &Column<T>) -> Self {
        col.clone().into()
    }
}

impl From<DynamicColumn> for ColumnExpr {
    fn from(col: DynamicColumn) -> Self {
        ColumnExpr {
            field: None,
            name: col.name,
            table: col.table,
            alias: col.alias,
        }
    }
}

impl From<&DynamicColumn> for ColumnExpr {
    fn from(col: &DynamicColumn) -> Self {
        col.clone().into()
    }
}

/// Aggregate call, e.g. `COUNT(DISTINCT "id") AS "n"`.
#[derive(Debug, Clone)]
pub struct AggregateExpr {
    pub func: AggregateFn,
    pub column: Option<ColumnExpr>,
    pub alias: Option<String>,
}

impl AggregateExpr {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// One `WHEN condition THEN value` arm.
#[derive(Debug, Clone)]
pub struct WhenClause {
    pub condition: Expr,
    pub value: Expr,
}

/// `CASE WHEN … [ELSE …] END`.
#[derive(Debug, Clone)]
pub struct CaseExpr {
    pub whens: Vec<WhenClause>,
    pub else_value: Option<Expr>,
    pub alias: Option<String>,
}

impl CaseExpr {
    pub fn when(mut self, condition: impl IntoExpr, value: impl IntoExpr) -> Self {
        self.whens.push(WhenClause {
            condition: condition.into_expr(),
            value: value.into_expr(),
        });
        self
    }

    pub fn else_(mut self, value: impl IntoExpr) -> Self {
        self.else_value = Some(value.into_expr());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Starts a fluent CASE expression.
pub fn case_when(condition: impl IntoExpr, value: impl IntoExpr) -> CaseExpr {
    CaseExpr {
        whens: vec![WhenClause {
            condition: condition.into_expr(),
            value: value.into_expr(),
        }],
        else_value: None,
        alias: None,
    }
}

/// A parenthesized subquery usable as a scalar or a from-source.
#[derive(Debug, Clone)]
pub struct SubqueryExpr {
    pub query: SelectStatement,
    pub alias: Option<String>,
}

impl SubqueryExpr {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

pub fn subquery(query: impl Into<SelectStatement>) -> SubqueryExpr {
    SubqueryExpr {
        query: query.into(),
        alias: None,
    }
}

/// `EXISTS (query)`. Negate with `!exists(q)`.
pub fn exists(query: impl Into<SelectStatement>) -> Expr {
    Expr::Exists {
        query: Box::new(query.into()),
    }
}

/// Expression node. One closed family covers scalars and conditions; the
/// generator parenthesizes binary nodes uniformly.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Scalar literal, pushed through the parameter sink in parameterized
    /// mode. `FieldValue::Null` here binds a NULL parameter.
    Literal {
        value: FieldValue,
        alias: Option<String>,
    },
    /// The literal `NULL` keyword, never parameterized.
    Null,
    Column(ColumnExpr),
    All(AllColumns),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Between {
        operand: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    InList {
        operand: Box<Expr>,
        items: Vec<Expr>,
    },
    Exists {
        query: Box<SelectStatement>,
    },
    Subquery {
        query: Box<SelectStatement>,
        alias: Option<String>,
    },
    Aggregate(AggregateExpr),
    Case(Box<CaseExpr>),
}

impl Expr {
    pub(crate) fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Wraps a scalar in a literal expression.
pub fn lit(value: impl Into<FieldValue>) -> Expr {
    Expr::Literal {
        value: value.into(),
        alias: None,
    }
}

/// The `NULL` keyword.
pub fn null_value() -> Expr {
    Expr::Null
}

/// Conversion into an AST expression; raw scalars lift into literals.
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for FieldValue {
    fn into_expr(self) -> Expr {
        Expr::Literal {
            value: self,
            alias: None,
        }
    }
}

impl IntoExpr for bool {
    fn into_expr(self) -> Expr {
        lit(self)
    }
}
impl IntoExpr for i32 {
    fn into_expr(self) -> Expr {
        lit(self)
    }
}
impl IntoExpr for i64 {
    fn into_expr(self) -> Expr {
        lit(self)
    }
}
impl IntoExpr for f64 {
    fn into_expr(self) -> Expr {
        lit(self)
    }
}
impl IntoExpr for &str {
    fn into_expr(self) -> Expr {
        lit(self)
    }
}
impl IntoExpr for String {
    fn into_expr(self) -> Expr {
        lit(self)
    }
}
impl IntoExpr for Vec<u8> {
    fn into_expr(self) -> Expr {
        lit(self)
    }
}

impl<T: SqlType> IntoExpr for Column<T> {
    fn into_expr(self) -> Expr {
        Expr::Column(self.into())
    }
}

impl<T: SqlType> IntoExpr for &Column<T> {
    fn into_expr(self) -> Expr {
        Expr::Column(self.into())
    }
}

impl IntoExpr for DynamicColumn {
    fn into_expr(self) -> Expr {
        Expr::Column(self.into())
    }
}

impl IntoExpr for &DynamicColumn {
    fn into_expr(self) -> Expr {
        Expr::Column(self.into())
    }
}

impl IntoExpr for AllColumns {
    fn into_expr(self) -> Expr {
        Expr::All(self)
    }
}

impl IntoExpr for AggregateExpr {
    fn into_expr(self) -> Expr {
        Expr::Aggregate(self)
    }
}

impl IntoExpr for CaseExpr {
    fn into_expr(self) -> Expr {
        Expr::Case(Box::new(self))
    }
}

impl IntoExpr for SubqueryExpr {
    fn into_expr(self) -> Expr {
        Expr::Subquery {
            query: Box::new(self.query),
            alias: self.alias,
        }
    }
}

/// Comparison, logical and membership combinators, available on anything
/// that converts to an expression.
pub trait ExprOps: IntoExpr + Sized {
    fn eq(self, rhs: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::Eq, self.into_expr(), rhs.into_expr())
    }

    fn ne(self, rhs: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::Ne, self.into_expr(), rhs.into_expr())
    }

    fn lt(self, rhs: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::Lt, self.into_expr(), rhs.into_expr())
    }

    fn le(self, rhs: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::Le, self.into_expr(), rhs.into_expr())
    }

    fn gt(self, rhs: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::Gt, self.into_expr(), rhs.into_expr())
    }

    fn ge(self, rhs: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::Ge, self.into_expr(), rhs.into_expr())
    }

    fn like(self, pattern: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::Like, self.into_expr(), pattern.into_expr())
    }

    fn not_like(self, pattern: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::NotLike, self.into_expr(), pattern.into_expr())
    }

    fn and(self, rhs: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::And, self.into_expr(), rhs.into_expr())
    }

    fn or(self, rhs: impl IntoExpr) -> Expr {
        Expr::binary(BinaryOp::Or, self.into_expr(), rhs.into_expr())
    }

    fn is_null(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::IsNull,
            operand: Box::new(self.into_expr()),
        }
    }

    fn is_not_null(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::IsNotNull,
            operand: Box::new(self.into_expr()),
        }
    }

    fn between(self, low: impl IntoExpr, high: impl IntoExpr) -> Expr {
        Expr::Between {
            operand: Box::new(self.into_expr()),
            low: Box::new(low.into_expr()),
            high: Box::new(high.into_expr()),
        }
    }

    /// `operand IN (v1, v2, …)`. An empty list is rejected at compile time.
    fn in_list<I>(self, items: I) -> Expr
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        Expr::InList {
            operand: Box::new(self.into_expr()),
            items: items.into_iter().map(IntoExpr::into_expr).collect(),
        }
    }

    /// `operand IN (subquery)`.
    fn in_subquery(self, query: impl Into<SelectStatement>) -> Expr {
        Expr::binary(
            BinaryOp::In,
            self.into_expr(),
            Expr::Subquery {
                query: Box::new(query.into()),
                alias: None,
            },
        )
    }
}

impl<T: IntoExpr + Sized> ExprOps for T {}

/// Free-function spellings matching the fluent surface.
pub fn between(operand: impl IntoExpr, low: impl IntoExpr, high: impl IntoExpr) -> Expr {
    operand.between(low, high)
}

pub fn in_list<I>(operand: impl IntoExpr, items: I) -> Expr
where
    I: IntoIterator,
    I::Item: IntoExpr,
{
    operand.in_list(items)
}

pub fn is_null(operand: impl IntoExpr) -> Expr {
    operand.is_null()
}

pub fn is_not_null(operand: impl IntoExpr) -> Expr {
    operand.is_not_null()
}

impl ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl<R: IntoExpr> ops::BitAnd<R> for Expr {
    type Output = Expr;

    fn bitand(self, rhs: R) -> Expr {
        Expr::binary(BinaryOp::And, self, rhs.into_expr())
    }
}

impl<R: IntoExpr> ops::BitOr<R> for Expr {
    type Output = Expr;

    fn bitor(self, rhs: R) -> Expr {
        Expr::binary(BinaryOp::Or, self, rhs.into_expr())
    }
}

// ---- Aggregate factories ----

fn aggregate(func: AggregateFn, column: impl Into<ColumnExpr>) -> AggregateExpr {
    AggregateExpr {
        func,
        column: Some(column.into()),
        alias: None,
    }
}

pub fn count(column: impl Into<ColumnExpr>) -> AggregateExpr {
    aggregate(AggregateFn::Count { distinct: false }, column)
}

pub fn count_distinct(column: impl Into<ColumnExpr>) -> AggregateExpr {
    aggregate(AggregateFn::Count { distinct: true }, column)
}

/// `COUNT(*)`.
pub fn count_all() -> AggregateExpr {
    AggregateExpr {
        func: AggregateFn::Count { distinct: false },
        column: None,
        alias: None,
    }
}

pub fn sum(column: impl Into<ColumnExpr>) -> AggregateExpr {
    aggregate(AggregateFn::Sum, column)
}

pub fn avg(column: impl Into<ColumnExpr>) -> AggregateExpr {
    aggregate(AggregateFn::Avg, column)
}

pub fn min(column: impl Into<ColumnExpr>) -> AggregateExpr {
    aggregate(AggregateFn::Min, column)
}

pub fn max(column: impl Into<ColumnExpr>) -> AggregateExpr {
    aggregate(AggregateFn::Max, column)
}

// ---- Ordering ----

/// One ORDER BY key.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: OrderDirection,
}

pub fn asc(key: impl IntoExpr) -> OrderBy {
    OrderBy {
        expr: key.into_expr(),
        direction: OrderDirection::Asc,
    }
}

pub fn desc(key: impl IntoExpr) -> OrderBy {
    OrderBy {
        expr: key.into_expr(),
        direction: OrderDirection::Desc,
    }
}

// ---- Query-level nodes ----

/// LIMIT/OFFSET pair; either side may be zero and is then omitted by the
/// dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub count: u64,
    pub offset: u64,
}

/// One chained set operation arm: `… UNION <query>`.
#[derive(Debug, Clone)]
pub struct SetOpArm {
    pub op: SetOperator,
    pub query: SelectStatement,
}

/// A named, optionally recursive common table expression definition.
#[derive(Debug, Clone)]
pub struct CteDef {
    pub name: Arc<str>,
    pub recursive: bool,
    pub query: SelectStatement,
}

/// Source of a FROM clause.
#[derive(Debug, Clone)]
pub enum FromSource {
    Table {
        schema: TableSchemaRef,
        alias: Option<String>,
    },
    Subquery {
        query: Box<SelectStatement>,
        alias: Option<String>,
    },
    Cte {
        name: Arc<str>,
    },
}

/// One JOIN arm. `on` is `None` only for CROSS joins.
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableSchemaRef,
    pub alias: Option<String>,
    pub on: Option<Expr>,
}

/// A complete SELECT tree, including hoisted CTE definitions and chained
/// set operations.
#[derive(Debug, Clone, Default)]
pub struct SelectStatement {
    pub ctes: Vec<CteDef>,
    pub distinct: bool,
    pub columns: Vec<Expr>,
    pub from: Option<FromSource>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<Limit>,
    pub set_ops: Vec<SetOpArm>,
}

/// Rows handed back by a DML statement.
#[derive(Debug, Clone)]
pub enum ReturningClause {
    All,
    Columns(Vec<String>),
}

/// INSERT with a column list and one or more value rows.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub table: TableSchemaRef,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
    pub returning: Option<ReturningClause>,
}

/// UPDATE with assignments and an optional filter.
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub table: TableSchemaRef,
    pub assignments: Vec<(String, FieldValue)>,
    pub where_clause: Option<Expr>,
    pub returning: Option<ReturningClause>,
}

/// DELETE with an optional filter.
#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub table: TableSchemaRef,
    pub where_clause: Option<Expr>,
    pub returning: Option<ReturningClause>,
}

impl Statement {
    /// The statement's RETURNING clause, if any.
    pub fn returning(&self) -> Option<&ReturningClause> {
        match self {
            Statement::Select(_) => None,
            Statement::Insert(stmt) => stmt.returning.as_ref(),
            Statement::Update(stmt) => stmt.returning.as_ref(),
            Statement::Delete(stmt) => stmt.returning.as_ref(),
        }
    }
}

/// Any compilable statement.
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl From<SelectStatement> for Statement {
    fn from(stmt: SelectStatement) -> Self {
        Statement::Select(stmt)
    }
}

impl From<InsertStatement> for Statement {
    fn from(stmt: InsertStatement) -> Self {
        Statement::Insert(stmt)
    }
}

impl From<UpdateStatement> for Statement {
    fn from(stmt: UpdateStatement) -> Self {
        Statement::Update(stmt)
    }
}

impl From<DeleteStatement> for Statement {
    fn from(stmt: DeleteStatement) -> Self {
        Statement::Delete(stmt)
    }
}

// ---- Set operations ----

fn set_op(op: SetOperator, left: impl Into<SelectStatement>, right: impl Into<SelectStatement>) -> SelectStatement {
    let mut left = left.into();
    left.set_ops.push(SetOpArm {
        op,
        query: right.into(),
    });
    left
}

pub fn union_query(left: impl Into<SelectStatement>, right: impl Into<SelectStatement>) -> SelectStatement {
    set_op(SetOperator::Union, left, right)
}

pub fn union_all(left: impl Into<SelectStatement>, right: impl Into<SelectStatement>) -> SelectStatement {
    set_op(SetOperator::UnionAll, left, right)
}

pub fn intersect(left: impl Into<SelectStatement>, right: impl Into<SelectStatement>) -> SelectStatement {
    set_op(SetOperator::Intersect, left, right)
}

pub fn except(left: impl Into<SelectStatement>, right: impl Into<SelectStatement>) -> SelectStatement {
    set_op(SetOperator::Except, left, right)
}

// ---- CTE ----

/// A named CTE. Using it as a from-source hoists its definition into the
/// statement's WITH clause and references it by name.
#[derive(Debug, Clone)]
pub struct Cte {
    name: Arc<str>,
    recursive: bool,
    query: SelectStatement,
}

impl Cte {
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A dynamic column qualified with this CTE's name.
    pub fn column(&self, name: impl Into<String>) -> DynamicColumn {
        DynamicColumn::new(name).qualified(self.name.clone())
    }

    pub(crate) fn to_def(&self) -> CteDef {
        CteDef {
            name: self.name.clone(),
            recursive: self.recursive,
            query: self.query.clone(),
        }
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }
}

pub fn with(name: impl Into<Arc<str>>, query: impl Into<SelectStatement>) -> Cte {
    Cte {
        name: name.into(),
        recursive: false,
        query: query.into(),
    }
}

// ---- DML builders ----

/// Fluent INSERT builder.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    stmt: InsertStatement,
}

pub fn insert_into(table: &TableSchemaRef) -> InsertBuilder {
    InsertBuilder {
        stmt: InsertStatement {
            table: table.clone(),
            columns: Vec::new(),
            rows: Vec::new(),
            returning: None,
        },
    }
}

impl InsertBuilder {
    /// Declares the target column list.
    pub fn columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.stmt.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Appends one value row.
    pub fn values<I>(mut self, row: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        self.stmt.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Appends one row taken from a record, in declared column order.
    ///
    /// # Errors
    ///
    /// Fails when a declared column is missing from the record's schema.
    pub fn values_from(mut self, record: &Record) -> Result<Self> {
        let mut row = Vec::with_capacity(self.stmt.columns.len());
        for column in &self.stmt.columns {
            row.push(record.value(column)?.clone());
        }
        self.stmt.rows.push(row);
        Ok(self)
    }

    /// Appends one row per record.
    pub fn batch(mut self, records: &[Record]) -> Result<Self> {
        for record in records {
            self = self.values_from(record)?;
        }
        Ok(self)
    }

    /// Asks the server to hand back the named columns of inserted rows.
    pub fn returning<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.stmt.returning = Some(ReturningClause::Columns(
            columns.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// `RETURNING *`.
    pub fn returning_all(mut self) -> Self {
        self.stmt.returning = Some(ReturningClause::All);
        self
    }

    pub fn build(self) -> InsertStatement {
        self.stmt
    }
}

impl From<InsertBuilder> for InsertStatement {
    fn from(builder: InsertBuilder) -> Self {
        builder.stmt
    }
}

impl From<InsertBuilder> for Statement {
    fn from(builder: InsertBuilder) -> Self {
        Statement::Insert(builder.stmt)
    }
}

/// Fluent UPDATE builder.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    stmt: UpdateStatement,
}

pub fn update(table: &TableSchemaRef) -> UpdateBuilder {
    UpdateBuilder {
        stmt: UpdateStatement {
            table: table.clone(),
            assignments: Vec::new(),
            where_clause: None,
            returning: None,
        },
    }
}

impl UpdateBuilder {
    pub fn set(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.stmt.assignments.push((column.into(), value.into()));
        self
    }

    /// Appends several assignments at once.
    pub fn set_all<I, S, V>(mut self, assignments: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<FieldValue>,
    {
        for (column, value) in assignments {
            self.stmt.assignments.push((column.into(), value.into()));
        }
        self
    }

    /// Attaches the filter; only RETURNING may follow.
    pub fn where_(mut self, condition: impl IntoExpr) -> UpdateWhere {
        self.stmt.where_clause = Some(condition.into_expr());
        UpdateWhere { stmt: self.stmt }
    }

    pub fn returning<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.stmt.returning = Some(ReturningClause::Columns(
            columns.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn returning_all(mut self) -> Self {
        self.stmt.returning = Some(ReturningClause::All);
        self
    }

    pub fn build(self) -> UpdateStatement {
        self.stmt
    }
}

/// Terminal UPDATE with its filter attached.
#[derive(Debug, Clone)]
pub struct UpdateWhere {
    stmt: UpdateStatement,
}

impl UpdateWhere {
    pub fn returning<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.stmt.returning = Some(ReturningClause::Columns(
            columns.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn returning_all(mut self) -> Self {
        self.stmt.returning = Some(ReturningClause::All);
        self
    }

    pub fn build(self) -> UpdateStatement {
        self.stmt
    }
}

impl From<UpdateBuilder> for UpdateStatement {
    fn from(builder: UpdateBuilder) -> Self {
        builder.stmt
    }
}

impl From<UpdateBuilder> for Statement {
    fn from(builder: UpdateBuilder) -> Self {
        Statement::Update(builder.stmt)
    }
}

impl From<UpdateWhere> for UpdateStatement {
    fn from(update: UpdateWhere) -> Self {
        update.stmt
    }
}

impl From<UpdateWhere> for Statement {
    fn from(update: UpdateWhere) -> Self {
        Statement::Update(update.stmt)
    }
}

/// Fluent DELETE builder.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    stmt: DeleteStatement,
}

pub fn delete_from(table: &TableSchemaRef) -> DeleteBuilder {
    DeleteBuilder {
        stmt: DeleteStatement {
            table: table.clone(),
            where_clause: None,
            returning: None,
        },
    }
}

impl DeleteBuilder {
    /// Attaches the filter; only RETURNING may follow.
    pub fn where_(mut self, condition: impl IntoExpr) -> DeleteWhere {
        self.stmt.where_clause = Some(condition.into_expr());
        DeleteWhere { stmt: self.stmt }
    }

    pub fn returning<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.stmt.returning = Some(ReturningClause::Columns(
            columns.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn returning_all(mut self) -> Self {
        self.stmt.returning = Some(ReturningClause::All);
        self
    }

    pub fn build(self) -> DeleteStatement {
        self.stmt
    }
}

/// Terminal DELETE with its filter attached.
#[derive(Debug, Clone)]
pub struct DeleteWhere {
    stmt: DeleteStatement,
}

impl DeleteWhere {
    pub fn returning<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.stmt.returning = Some(ReturningClause::Columns(
            columns.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn returning_all(mut self) -> Self {
        self.stmt.returning = Some(ReturningClause::All);
        self
    }

    pub fn build(self) -> DeleteStatement {
        self.stmt
    }
}

impl From<DeleteBuilder> for DeleteStatement {
    fn from(builder: DeleteBuilder) -> Self {
        builder.stmt
    }
}

impl From<DeleteBuilder> for Statement {
    fn from(builder: DeleteBuilder) -> Self {
        Statement::Delete(builder.stmt)
    }
}

impl From<DeleteWhere> for DeleteStatement {
    fn from(delete: DeleteWhere) -> Self {
        delete.stmt
    }
}

impl From<DeleteWhere> for Statement {
    fn from(delete: DeleteWhere) -> Self {
        Statement::Delete(delete.stmt)
    }
}

/// Validates structural constraints the type system cannot express.
/// Called once by the compiler before generation.
pub(crate) fn validate_statement(stmt: &Statement) -> Result<()> {
    match stmt {
        Statement::Select(select) => validate_select(select),
        Statement::Insert(insert) => {
            if insert.rows.is_empty() {
                return Err(ErrorContext::new(
                    ClientError::InvalidArgument,
                    "INSERT requires at least one value row",
                ));
            }
            if !insert.columns.is_empty() {
                for row in &insert.rows {
                    if row.len() != insert.columns.len() {
                        return Err(ErrorContext::new(
                            ClientError::InvalidArgument,
                            format!(
                                "INSERT row has {} values but {} columns were declared",
                                row.len(),
                                insert.columns.len()
                            ),
                        ));
                    }
                }
            }
            Ok(())
        }
        Statement::Update(update) => {
            if update.assignments.is_empty() {
                return Err(ErrorContext::new(
                    ClientError::InvalidArgument,
                    "UPDATE requires at least one assignment",
                ));
            }
            if let Some(cond) = &update.where_clause {
                validate_expr(cond)?;
            }
            Ok(())
        }
        Statement::Delete(delete) => {
            if let Some(cond) = &delete.where_clause {
                validate_expr(cond)?;
            }
            Ok(())
        }
    }
}

fn validate_select(stmt: &SelectStatement) -> Result<()> {
    for cte in &stmt.ctes {
        validate_select(&cte.query)?;
    }
    for column in &stmt.columns {
        validate_expr(column)?;
    }
    if let Some(FromSource::Subquery { query, .. }) = &stmt.from {
        validate_select(query)?;
    }
    for join in &stmt.joins {
        if let Some(on) = &join.on {
            validate_expr(on)?;
        }
    }
    if let Some(cond) = &stmt.where_clause {
        validate_expr(cond)?;
    }
    for key in &stmt.group_by {
        validate_expr(key)?;
    }
    if let Some(cond) = &stmt.having {
        validate_expr(cond)?;
    }
    for order in &stmt.order_by {
        validate_expr(&order.expr)?;
    }
    for arm in &stmt.set_ops {
        validate_select(&arm.query)?;
    }
    Ok(())
}

fn validate_expr(expr: &Expr) -> Result<()> {
    match expr {
        Expr::InList { items, .. } => {
            if items.is_empty() {
                return Err(ErrorContext::new(
                    ClientError::InvalidArgument,
                    "IN list requires at least one value",
                ));
            }
            for item in items {
                validate_expr(item)?;
            }
            Ok(())
        }
        Expr::Binary { left, right, .. } => {
            validate_expr(left)?;
            validate_expr(right)
        }
        Expr::Unary { operand, .. } => validate_expr(operand),
        Expr::Between { operand, low, high } => {
            validate_expr(operand)?;
            validate_expr(low)?;
            validate_expr(high)
        }
        Expr::Exists { query } | Expr::Subquery { query, .. } => validate_select(query),
        Expr::Case(case) => {
            for when in &case.whens {
                validate_expr(&when.condition)?;
                validate_expr(&when.value)?;
            }
            if let Some(else_value) = &case.else_value {
                validate_expr(else_value)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::SchemaColumns;
    use crate::schema::TableSchema;

    fn users() -> TableSchemaRef {
        TableSchema::new("users")
            .add_field::<i32>("id", "INTEGER")
            .add_field::<i32>("age", "INTEGER")
            .add_field::<String>("name", "VARCHAR(255)")
            .into_ref()
    }

    #[test]
    fn test_auto_lift_builds_same_tree_shape() {
        let schema = users();
        let age = schema.column::<i32>("age").unwrap();
        let from_raw = age.clone().gt(18);
        let from_lit = age.gt(lit(18));
        match (from_raw, from_lit) {
            (
                Expr::Binary { op: op1, right: r1, .. },
                Expr::Binary { op: op2, right: r2, .. },
            ) => {
                assert_eq!(op1, BinaryOp::Gt);
                assert_eq!(op2, BinaryOp::Gt);
                assert!(matches!(*r1, Expr::Literal { value: FieldValue::I32(18), .. }));
                assert!(matches!(*r2, Expr::Literal { value: FieldValue::I32(18), .. }));
            }
            _ => panic!("expected binary nodes"),
        }
    }

    #[test]
    fn test_not_exists_is_unary_not_over_exists() {
        let schema = users();
        let q = crate::builder::select((schema.column::<i32>("id").unwrap(),)).from(&schema);
        let negated = !exists(q);
        match negated {
            Expr::Unary { op: UnaryOp::Not, operand } => {
                assert!(matches!(*operand, Expr::Exists { .. }));
            }
            other => panic!("expected NOT over EXISTS, got {other:?}"),
        }
    }

    #[test]
    fn test_logical_operator_sugar() {
        let schema = users();
        let age = schema.column::<i32>("age").unwrap();
        let name = schema.column::<String>("name").unwrap();
        let cond = age.gt(18) & name.like("A%");
        assert!(matches!(cond, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn test_case_builder() {
        let schema = users();
        let age = schema.column::<i32>("age").unwrap();
        let case = case_when(age.clone().lt(18), "minor")
            .when(age.lt(65), "adult")
            .else_("senior")
            .alias("bracket");
        assert_eq!(case.whens.len(), 2);
        assert!(case.else_value.is_some());
        assert_eq!(case.alias.as_deref(), Some("bracket"));
    }

    #[test]
    fn test_empty_in_list_rejected_by_validation() {
        let schema = users();
        let age = schema.column::<i32>("age").unwrap();
        let stmt: Statement = crate::builder::select((schema.column::<i32>("id").unwrap(),))
            .from(&schema)
            .where_(age.in_list(Vec::<i32>::new()))
            .into();
        let err = validate_statement(&stmt).unwrap_err();
        assert!(err.message.contains("IN list requires at least one value"));
    }

    #[test]
    fn test_aggregate_alias_chain() {
        let schema = users();
        let id = schema.column::<i32>("id").unwrap();
        let agg = count(&id).alias("user_count");
        assert_eq!(agg.alias.as_deref(), Some("user_count"));
        assert!(matches!(agg.func, AggregateFn::Count { distinct: false }));
    }
}
