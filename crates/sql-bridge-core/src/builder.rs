//! Fluent SELECT builder with statically-checked clause ordering.
//!
//! Every builder state carries a stage marker type; each chain method is
//! gated on a capability trait implemented only by the stages that permit
//! it. An ill-formed chain such as `.having(..)` before `.group_by(..)`
//! fails to compile instead of producing broken SQL.
//!
//! Permitted successors per stage:
//!
//! | stage     | permitted next                              |
//! |-----------|---------------------------------------------|
//! | FROM      | JOIN, WHERE, GROUP BY, ORDER BY, LIMIT      |
//! | JOIN      | JOIN, WHERE, GROUP BY, ORDER BY, LIMIT      |
//! | WHERE     | GROUP BY, ORDER BY, LIMIT                   |
//! | GROUP BY  | HAVING, ORDER BY, LIMIT                     |
//! | HAVING    | ORDER BY, LIMIT                             |
//! | ORDER BY  | LIMIT                                       |
//! | LIMIT     | (terminal)                                  |

use std::marker::PhantomData;

use crate::column::all;
use crate::expr::{
    Cte, Expr, FromSource, IntoExpr, Join, JoinKind, Limit, OrderBy, SelectStatement, Statement,
    SubqueryExpr,
};
use crate::schema::{TableSchema, TableSchemaRef};

/// Stage markers.
#[derive(Debug, Clone, Copy)]
pub struct FromStage;
#[derive(Debug, Clone, Copy)]
pub struct JoinStage;
#[derive(Debug, Clone, Copy)]
pub struct WhereStage;
#[derive(Debug, Clone, Copy)]
pub struct GroupByStage;
#[derive(Debug, Clone, Copy)]
pub struct HavingStage;
#[derive(Debug, Clone, Copy)]
pub struct OrderByStage;
#[derive(Debug, Clone, Copy)]
pub struct LimitStage;

/// Capability tags gating the chain methods.
pub trait AllowJoin {}
pub trait AllowWhere {}
pub trait AllowGroupBy {}
pub trait AllowHaving {}
pub trait AllowOrderBy {}
pub trait AllowLimit {}

impl AllowJoin for FromStage {}
impl AllowJoin for JoinStage {}

impl AllowWhere for FromStage {}
impl AllowWhere for JoinStage {}

impl AllowGroupBy for FromStage {}
impl AllowGroupBy for JoinStage {}
impl AllowGroupBy for WhereStage {}

impl AllowHaving for GroupByStage {}

impl AllowOrderBy for FromStage {}
impl AllowOrderBy for JoinStage {}
impl AllowOrderBy for WhereStage {}
impl AllowOrderBy for GroupByStage {}
impl AllowOrderBy for HavingStage {}

impl AllowLimit for FromStage {}
impl AllowLimit for JoinStage {}
impl AllowLimit for WhereStage {}
impl AllowLimit for GroupByStage {}
impl AllowLimit for HavingStage {}
impl AllowLimit for OrderByStage {}

/// List of select items; implemented for single expressions, tuples and
/// vectors.
pub trait SelectList {
    fn into_select_list(self) -> Vec<Expr>;
}

impl<T: IntoExpr> SelectList for T {
    fn into_select_list(self) -> Vec<Expr> {
        vec![self.into_expr()]
    }
}

impl SelectList for Vec<Expr> {
    fn into_select_list(self) -> Vec<Expr> {
        self
    }
}

macro_rules! impl_select_list_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: IntoExpr),+> SelectList for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_select_list(self) -> Vec<Expr> {
                let ($($name,)+) = self;
                vec![$($name.into_expr()),+]
            }
        }
    };
}

impl_select_list_for_tuple!(A);
impl_select_list_for_tuple!(A, B);
impl_select_list_for_tuple!(A, B, C);
impl_select_list_for_tuple!(A, B, C, D);
impl_select_list_for_tuple!(A, B, C, D, E);
impl_select_list_for_tuple!(A, B, C, D, E, F);
impl_select_list_for_tuple!(A, B, C, D, E, F, G);
impl_select_list_for_tuple!(A, B, C, D, E, F, G, H);

/// List of ORDER BY keys; plain columns default to ascending.
pub trait IntoOrderBy {
    fn into_order_by(self) -> OrderBy;
}

impl IntoOrderBy for OrderBy {
    fn into_order_by(self) -> OrderBy {
        self
    }
}

impl<T: crate::value::SqlType> IntoOrderBy for crate::column::Column<T> {
    fn into_order_by(self) -> OrderBy {
        crate::expr::asc(self)
    }
}

impl IntoOrderBy for crate::column::DynamicColumn {
    fn into_order_by(self) -> OrderBy {
        crate::expr::asc(self)
    }
}

pub trait OrderList {
    fn into_order_list(self) -> Vec<OrderBy>;
}

impl<T: IntoOrderBy> OrderList for T {
    fn into_order_list(self) -> Vec<OrderBy> {
        vec![self.into_order_by()]
    }
}

impl OrderList for Vec<OrderBy> {
    fn into_order_list(self) -> Vec<OrderBy> {
        self
    }
}

macro_rules! impl_order_list_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: IntoOrderBy),+> OrderList for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_order_list(self) -> Vec<OrderBy> {
                let ($($name,)+) = self;
                vec![$($name.into_order_by()),+]
            }
        }
    };
}

impl_order_list_for_tuple!(A);
impl_order_list_for_tuple!(A, B);
impl_order_list_for_tuple!(A, B, C);
impl_order_list_for_tuple!(A, B, C, D);

/// Anything a FROM clause can draw from: a table schema, a subquery, a CTE
/// handle, a nested builder or a bare table name.
pub trait IntoFromSource {
    fn apply(self, stmt: &mut SelectStatement);
}

impl IntoFromSource for &TableSchemaRef {
    fn apply(self, stmt: &mut SelectStatement) {
        stmt.from = Some(FromSource::Table {
            schema: self.clone(),
            alias: None,
        });
    }
}

impl IntoFromSource for TableSchemaRef {
    fn apply(self, stmt: &mut SelectStatement) {
        stmt.from = Some(FromSource::Table {
            schema: self,
            alias: None,
        });
    }
}

impl IntoFromSource for &str {
    fn apply(self, stmt: &mut SelectStatement) {
        stmt.from = Some(FromSource::Table {
            schema: TableSchema::make_ref(self),
            alias: None,
        });
    }
}

impl IntoFromSource for SubqueryExpr {
    fn apply(self, stmt: &mut SelectStatement) {
        stmt.from = Some(FromSource::Subquery {
            query: Box::new(self.query),
            alias: self.alias,
        });
    }
}

impl IntoFromSource for &Cte {
    fn apply(self, stmt: &mut SelectStatement) {
        if stmt.ctes.iter().all(|def| def.name != self.name_arc()) {
            stmt.ctes.push(self.to_def());
        }
        stmt.from = Some(FromSource::Cte {
            name: self.name_arc(),
        });
    }
}

impl IntoFromSource for Select {
    fn apply(self, stmt: &mut SelectStatement) {
        stmt.from = Some(FromSource::Subquery {
            query: Box::new(self.into()),
            alias: None,
        });
    }
}

impl<S> IntoFromSource for SelectBuilder<S> {
    fn apply(self, stmt: &mut SelectStatement) {
        stmt.from = Some(FromSource::Subquery {
            query: Box::new(self.stmt),
            alias: None,
        });
    }
}

/// Entry node: a SELECT with a column list but no FROM yet.
#[derive(Debug, Clone)]
pub struct Select {
    stmt: SelectStatement,
}

/// `SELECT <columns…>`.
pub fn select(columns: impl SelectList) -> Select {
    Select {
        stmt: SelectStatement {
            columns: columns.into_select_list(),
            ..SelectStatement::default()
        },
    }
}

/// `SELECT DISTINCT <columns…>`.
pub fn select_distinct(columns: impl SelectList) -> Select {
    select(columns).distinct()
}

/// `SELECT * FROM <table>` convenience over a schema handle.
pub fn select_from_schema(table: &TableSchemaRef) -> SelectBuilder<FromStage> {
    select(all()).from(table)
}

impl Select {
    pub fn distinct(mut self) -> Self {
        self.stmt.distinct = true;
        self
    }

    /// Registers a CTE definition that the query references somewhere other
    /// than its FROM clause (a join, a subquery). Using a CTE as the FROM
    /// source registers it automatically.
    pub fn with_cte(mut self, cte: &Cte) -> Self {
        if self.stmt.ctes.iter().all(|def| def.name != cte.name_arc()) {
            self.stmt.ctes.push(cte.to_def());
        }
        self
    }

    pub fn from(mut self, source: impl IntoFromSource) -> SelectBuilder<FromStage> {
        source.apply(&mut self.stmt);
        SelectBuilder {
            stmt: self.stmt,
            _stage: PhantomData,
        }
    }
}

impl From<Select> for SelectStatement {
    fn from(select: Select) -> Self {
        select.stmt
    }
}

impl From<Select> for Statement {
    fn from(select: Select) -> Self {
        Statement::Select(select.stmt)
    }
}

/// SELECT chain in a given stage.
#[derive(Debug, Clone)]
pub struct SelectBuilder<S> {
    stmt: SelectStatement,
    _stage: PhantomData<S>,
}

impl<S> SelectBuilder<S> {
    fn transition<N>(self) -> SelectBuilder<N> {
        SelectBuilder {
            stmt: self.stmt,
            _stage: PhantomData,
        }
    }

    pub fn build(self) -> SelectStatement {
        self.stmt
    }
}

impl<S> From<SelectBuilder<S>> for SelectStatement {
    fn from(builder: SelectBuilder<S>) -> Self {
        builder.stmt
    }
}

impl<S> From<SelectBuilder<S>> for Statement {
    fn from(builder: SelectBuilder<S>) -> Self {
        Statement::Select(builder.stmt)
    }
}

impl<S: AllowJoin> SelectBuilder<S> {
    /// Starts an INNER JOIN; finish the arm with `.on(...)`.
    pub fn join(self, table: &TableSchemaRef) -> JoinBuilder {
        self.join_kind(table, JoinKind::Inner)
    }

    pub fn inner_join(self, table: &TableSchemaRef) -> JoinBuilder {
        self.join_kind(table, JoinKind::Inner)
    }

    pub fn left_join(self, table: &TableSchemaRef) -> JoinBuilder {
        self.join_kind(table, JoinKind::Left)
    }

    pub fn right_join(self, table: &TableSchemaRef) -> JoinBuilder {
        self.join_kind(table, JoinKind::Right)
    }

    pub fn full_join(self, table: &TableSchemaRef) -> JoinBuilder {
        self.join_kind(table, JoinKind::Full)
    }

    /// CROSS JOIN has no ON condition and completes immediately.
    pub fn cross_join(mut self, table: &TableSchemaRef) -> SelectBuilder<JoinStage> {
        self.stmt.joins.push(Join {
            kind: JoinKind::Cross,
            table: table.clone(),
            alias: None,
            on: None,
        });
        self.transition()
    }

    fn join_kind(self, table: &TableSchemaRef, kind: JoinKind) -> JoinBuilder {
        JoinBuilder {
            stmt: self.stmt,
            table: table.clone(),
            kind,
            alias: None,
        }
    }
}

/// Pending JOIN arm awaiting its ON condition.
#[derive(Debug, Clone)]
pub struct JoinBuilder {
    stmt: SelectStatement,
    table: TableSchemaRef,
    kind: JoinKind,
    alias: Option<String>,
}

impl JoinBuilder {
    /// Aliases the joined table.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn on(mut self, condition: impl IntoExpr) -> SelectBuilder<JoinStage> {
        self.stmt.joins.push(Join {
            kind: self.kind,
            table: self.table,
            alias: self.alias,
            on: Some(condition.into_expr()),
        });
        SelectBuilder {
            stmt: self.stmt,
            _stage: PhantomData,
        }
    }
}

impl<S: AllowWhere> SelectBuilder<S> {
    pub fn where_(mut self, condition: impl IntoExpr) -> SelectBuilder<WhereStage> {
        self.stmt.where_clause = Some(condition.into_expr());
        self.transition()
    }
}

impl<S: AllowGroupBy> SelectBuilder<S> {
    pub fn group_by(mut self, keys: impl SelectList) -> SelectBuilder<GroupByStage> {
        self.stmt.group_by = keys.into_select_list();
        self.transition()
    }

    /// GROUP BY over an arbitrary expression.
    pub fn group_by_expr(mut self, key: impl IntoExpr) -> SelectBuilder<GroupByStage> {
        self.stmt.group_by = vec![key.into_expr()];
        self.transition()
    }
}

impl<S: AllowHaving> SelectBuilder<S> {
    pub fn having(mut self, condition: impl IntoExpr) -> SelectBuilder<HavingStage> {
        self.stmt.having = Some(condition.into_expr());
        self.transition()
    }
}

impl<S: AllowOrderBy> SelectBuilder<S> {
    pub fn order_by(mut self, orders: impl OrderList) -> SelectBuilder<OrderByStage> {
        self.stmt.order_by = orders.into_order_list();
        self.transition()
    }
}

impl<S: AllowLimit> SelectBuilder<S> {
    pub fn limit(mut self, count: u64) -> SelectBuilder<LimitStage> {
        self.stmt.limit = Some(Limit { count, offset: 0 });
        self.transition()
    }

    pub fn limit_offset(mut self, count: u64, offset: u64) -> SelectBuilder<LimitStage> {
        self.stmt.limit = Some(Limit { count, offset });
        self.transition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::SchemaColumns;
    use crate::expr::{asc, count, desc, ExprOps};
    use crate::schema::TableSchema;

    fn users() -> TableSchemaRef {
        TableSchema::new("users")
            .add_field::<i32>("id", "INTEGER")
            .add_field::<i32>("age", "INTEGER")
            .add_field::<String>("name", "VARCHAR(255)")
            .add_field::<bool>("active", "BOOLEAN")
            .into_ref()
    }

    fn posts() -> TableSchemaRef {
        TableSchema::new("posts")
            .add_field::<i32>("user_id", "INTEGER")
            .add_field::<String>("title", "VARCHAR(255)")
            .into_ref()
    }

    #[test]
    fn test_full_chain_builds() {
        let schema = users();
        let age = schema.column::<i32>("age").unwrap();
        let active = schema.column::<bool>("active").unwrap();
        let id = schema.column::<i32>("id").unwrap();
        let stmt: SelectStatement = select((active.clone(), count(&id).alias("n")))
            .from(&schema)
            .where_(age.gt(18))
            .group_by(active)
            .having(count(&id).gt(5))
            .order_by(desc(id))
            .limit(10)
            .into();
        assert!(stmt.where_clause.is_some());
        assert_eq!(stmt.group_by.len(), 1);
        assert!(stmt.having.is_some());
        assert_eq!(stmt.order_by.len(), 1);
        assert_eq!(stmt.limit.unwrap().count, 10);
    }

    #[test]
    fn test_join_chain() {
        let u = users();
        let p = posts();
        let stmt: SelectStatement = select((
            u.column::<String>("name").unwrap(),
            p.column::<String>("title").unwrap(),
        ))
        .from(&u)
        .join(&p)
        .on(p.column::<i32>("user_id")
            .unwrap()
            .eq(u.column::<i32>("id").unwrap()))
        .into();
        assert_eq!(stmt.joins.len(), 1);
        assert_eq!(stmt.joins[0].kind, JoinKind::Inner);
        assert!(stmt.joins[0].on.is_some());
    }

    #[test]
    fn test_multiple_joins_permitted() {
        let u = users();
        let p = posts();
        let stmt: SelectStatement = select_from_schema(&u)
            .left_join(&p)
            .on(p.column::<i32>("user_id")
                .unwrap()
                .eq(u.column::<i32>("id").unwrap()))
            .cross_join(&p)
            .into();
        assert_eq!(stmt.joins.len(), 2);
        assert_eq!(stmt.joins[1].kind, JoinKind::Cross);
        assert!(stmt.joins[1].on.is_none());
    }

    #[test]
    fn test_from_subquery() {
        let u = users();
        let inner = select((u.column::<i32>("id").unwrap(),)).from(&u);
        let stmt: SelectStatement = select(all())
            .from(crate::expr::subquery(inner).alias("ids"))
            .into();
        match stmt.from {
            Some(FromSource::Subquery { alias, .. }) => assert_eq!(alias.as_deref(), Some("ids")),
            other => panic!("expected subquery source, got {other:?}"),
        }
    }

    #[test]
    fn test_from_cte_registers_definition() {
        let u = users();
        let adults = crate::expr::with(
            "adults",
            select((u.column::<i32>("id").unwrap(),))
                .from(&u)
                .where_(u.column::<i32>("age").unwrap().ge(18)),
        );
        let stmt: SelectStatement = select(all()).from(&adults).into();
        assert_eq!(stmt.ctes.len(), 1);
        assert_eq!(&*stmt.ctes[0].name, "adults");
        assert!(matches!(stmt.from, Some(FromSource::Cte { .. })));
    }

    #[test]
    fn test_order_by_accepts_mixed_keys() {
        let u = users();
        let stmt: SelectStatement = select_from_schema(&u)
            .order_by((
                asc(u.column::<String>("name").unwrap()),
                desc(u.column::<i32>("age").unwrap()),
            ))
            .into();
        assert_eq!(stmt.order_by.len(), 2);
    }

    #[test]
    fn test_bare_table_name_from() {
        let stmt: SelectStatement = select(crate::expr::lit(1)).from("test_table").into();
        match stmt.from {
            Some(FromSource::Table { schema, .. }) => assert_eq!(schema.table_name(), "test_table"),
            other => panic!("expected table source, got {other:?}"),
        }
    }
}
