//! Visitor interface over the query AST.
//!
//! Hooks are split into enter / between-children / leave callbacks so a
//! generator can emit bracketing syntax without the nodes knowing about it.
//! The traversal order lives in the `accept` functions below; visitors only
//! answer "what text (or parameter) does this event produce".
//!
//! Separators are always produced by the walker calling
//! [`QueryVisitor::column_separator`] between children, with the leading
//! separator suppressed on the first element.

use sql_bridge_common::{ClientError, ErrorContext, Result};

use crate::expr::{
    AggregateFn, BinaryOp, ColumnExpr, Expr, FromSource, JoinKind, OrderDirection,
    ReturningClause, SelectStatement, SetOperator, Statement, UnaryOp,
};
use crate::value::FieldValue;

/// Structured hooks over every AST construct.
///
/// Only the hooks that sink parameter values are fallible.
pub trait QueryVisitor {
    // Columns, values, identifiers
    fn emit_column(&mut self, column: &ColumnExpr);
    fn emit_literal(&mut self, value: &FieldValue, alias: Option<&str>) -> Result<()>;
    fn emit_null(&mut self);
    fn emit_all_columns(&mut self, table: Option<&str>);
    fn emit_table_ref(&mut self, name: &str);
    fn emit_alias(&mut self, alias: Option<&str>);
    fn column_separator(&mut self);

    // Binary / unary expressions
    fn enter_binary(&mut self);
    fn emit_binary_op(&mut self, op: BinaryOp);
    fn leave_binary(&mut self);
    fn emit_unary_op(&mut self, op: UnaryOp);

    // Special operators
    fn emit_between(&mut self);
    fn emit_between_and(&mut self);
    fn enter_in_list(&mut self);
    fn leave_in_list(&mut self);
    fn enter_subquery(&mut self);
    fn leave_subquery(&mut self);
    fn enter_exists(&mut self);
    fn leave_exists(&mut self);

    // Aggregates
    fn enter_aggregate(&mut self, func: AggregateFn);
    fn leave_aggregate(&mut self, alias: Option<&str>);

    // Query clauses
    fn enter_select(&mut self, distinct: bool);
    fn leave_select(&mut self);
    fn enter_from(&mut self);
    fn leave_from(&mut self);
    fn enter_where(&mut self);
    fn leave_where(&mut self);
    fn enter_group_by(&mut self);
    fn leave_group_by(&mut self);
    fn enter_having(&mut self);
    fn leave_having(&mut self);
    fn enter_order_by(&mut self);
    fn leave_order_by(&mut self);
    fn emit_order_direction(&mut self, direction: OrderDirection);
    fn emit_limit(&mut self, count: u64, offset: u64);

    // Joins
    fn enter_join(&mut self, kind: JoinKind);
    fn emit_join_on(&mut self);
    fn leave_join(&mut self);

    // DML
    fn enter_insert(&mut self);
    fn emit_insert_columns(&mut self, columns: &[String]);
    fn emit_insert_values(&mut self, rows: &[Vec<FieldValue>]) -> Result<()>;
    fn leave_insert(&mut self);
    fn enter_update(&mut self);
    fn emit_update_assignments(&mut self, assignments: &[(String, FieldValue)]) -> Result<()>;
    fn leave_update(&mut self);
    fn enter_delete(&mut self);
    fn leave_delete(&mut self);
    fn emit_returning(&mut self, returning: &ReturningClause);

    // Set operations
    fn emit_set_op(&mut self, op: SetOperator);

    // CASE / WHEN / ELSE
    fn enter_case(&mut self);
    fn leave_case(&mut self, alias: Option<&str>);
    fn enter_when(&mut self);
    fn emit_when_then(&mut self);
    fn leave_when(&mut self);
    fn enter_else(&mut self);
    fn leave_else(&mut self);

    // CTE
    fn enter_cte(&mut self, recursive: bool);
    fn emit_cte_name(&mut self, name: &str);
    fn enter_cte_body(&mut self);
    fn leave_cte_body(&mut self);
    fn leave_cte(&mut self);
}

impl Statement {
    /// Routes to the statement-specific walk.
    pub fn accept<V: QueryVisitor>(&self, visitor: &mut V) -> Result<()> {
        match self {
            Statement::Select(stmt) => stmt.accept(visitor),
            Statement::Insert(stmt) => {
                visitor.enter_insert();
                visitor.emit_table_ref(stmt.table.table_name());
                visitor.emit_insert_columns(&stmt.columns);
                visitor.emit_insert_values(&stmt.rows)?;
                if let Some(returning) = &stmt.returning {
                    visitor.emit_returning(returning);
                }
                visitor.leave_insert();
                Ok(())
            }
            Statement::Update(stmt) => {
                visitor.enter_update();
                visitor.emit_table_ref(stmt.table.table_name());
                visitor.emit_update_assignments(&stmt.assignments)?;
                if let Some(condition) = &stmt.where_clause {
                    visitor.enter_where();
                    condition.accept(visitor)?;
                    visitor.leave_where();
                }
                if let Some(returning) = &stmt.returning {
                    visitor.emit_returning(returning);
                }
                visitor.leave_update();
                Ok(())
            }
            Statement::Delete(stmt) => {
                visitor.enter_delete();
                visitor.emit_table_ref(stmt.table.table_name());
                if let Some(condition) = &stmt.where_clause {
                    visitor.enter_where();
                    condition.accept(visitor)?;
                    visitor.leave_where();
                }
                if let Some(returning) = &stmt.returning {
                    visitor.emit_returning(returning);
                }
                visitor.leave_delete();
                Ok(())
            }
        }
    }
}

impl SelectStatement {
    pub fn accept<V: QueryVisitor>(&self, visitor: &mut V) -> Result<()> {
        // WITH clause first; RECURSIVE applies to the whole clause.
        if !self.ctes.is_empty() {
            let recursive = self.ctes.iter().any(|cte| cte.recursive);
            visitor.enter_cte(recursive);
            for (i, cte) in self.ctes.iter().enumerate() {
                if i > 0 {
                    visitor.column_separator();
                }
                visitor.emit_cte_name(&cte.name);
                visitor.enter_cte_body();
                cte.query.accept(visitor)?;
                visitor.leave_cte_body();
            }
            visitor.leave_cte();
        }

        visitor.enter_select(self.distinct);
        if self.columns.is_empty() {
            visitor.emit_all_columns(None);
        } else {
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    visitor.column_separator();
                }
                column.accept(visitor)?;
            }
        }
        visitor.leave_select();

        if let Some(from) = &self.from {
            visitor.enter_from();
            match from {
                FromSource::Table { schema, alias } => {
                    visitor.emit_table_ref(schema.table_name());
                    visitor.emit_alias(alias.as_deref());
                }
                FromSource::Subquery { query, alias } => {
                    visitor.enter_subquery();
                    query.accept(visitor)?;
                    visitor.leave_subquery();
                    visitor.emit_alias(alias.as_deref());
                }
                FromSource::Cte { name } => {
                    visitor.emit_table_ref(name);
                }
            }
            visitor.leave_from();
        }

        for join in &self.joins {
            visitor.enter_join(join.kind);
            visitor.emit_table_ref(join.table.table_name());
            visitor.emit_alias(join.alias.as_deref());
            if let Some(on) = &join.on {
                visitor.emit_join_on();
                on.accept(visitor)?;
            }
            visitor.leave_join();
        }

        if let Some(condition) = &self.where_clause {
            visitor.enter_where();
            condition.accept(visitor)?;
            visitor.leave_where();
        }

        if !self.group_by.is_empty() {
            visitor.enter_group_by();
            for (i, key) in self.group_by.iter().enumerate() {
                if i > 0 {
                    visitor.column_separator();
                }
                key.accept(visitor)?;
            }
            visitor.leave_group_by();
        }

        if let Some(condition) = &self.having {
            visitor.enter_having();
            condition.accept(visitor)?;
            visitor.leave_having();
        }

        if !self.order_by.is_empty() {
            visitor.enter_order_by();
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    visitor.column_separator();
                }
                order.expr.accept(visitor)?;
                visitor.emit_order_direction(order.direction);
            }
            visitor.leave_order_by();
        }

        if let Some(limit) = &self.limit {
            visitor.emit_limit(limit.count, limit.offset);
        }

        for arm in &self.set_ops {
            visitor.emit_set_op(arm.op);
            arm.query.accept(visitor)?;
        }

        Ok(())
    }
}

impl Expr {
    pub fn accept<V: QueryVisitor>(&self, visitor: &mut V) -> Result<()> {
        match self {
            Expr::Literal { value, alias } => visitor.emit_literal(value, alias.as_deref()),
            Expr::Null => {
                visitor.emit_null();
                Ok(())
            }
            Expr::Column(column) => {
                visitor.emit_column(column);
                Ok(())
            }
            Expr::All(all) => {
                visitor.emit_all_columns(all.table());
                Ok(())
            }
            Expr::Binary { op, left, right } => {
                visitor.enter_binary();
                left.accept(visitor)?;
                visitor.emit_binary_op(*op);
                right.accept(visitor)?;
                visitor.leave_binary();
                Ok(())
            }
            Expr::Unary { op, operand } => match op {
                // NOT is prefix; the null tests are postfix.
                UnaryOp::Not => {
                    visitor.emit_unary_op(*op);
                    operand.accept(visitor)
                }
                UnaryOp::IsNull | UnaryOp::IsNotNull => {
                    operand.accept(visitor)?;
                    visitor.emit_unary_op(*op);
                    Ok(())
                }
            },
            Expr::Between { operand, low, high } => {
                operand.accept(visitor)?;
                visitor.emit_between();
                low.accept(visitor)?;
                visitor.emit_between_and();
                high.accept(visitor)
            }
            Expr::InList { operand, items } => {
                if items.is_empty() {
                    return Err(ErrorContext::new(
                        ClientError::InvalidArgument,
                        "IN list requires at least one value",
                    ));
                }
                operand.accept(visitor)?;
                visitor.enter_in_list();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        visitor.column_separator();
                    }
                    item.accept(visitor)?;
                }
                visitor.leave_in_list();
                Ok(())
            }
            Expr::Exists { query } => {
                visitor.enter_exists();
                query.accept(visitor)?;
                visitor.leave_exists();
                Ok(())
            }
            Expr::Subquery { query, alias } => {
                visitor.enter_subquery();
                query.accept(visitor)?;
                visitor.leave_subquery();
                visitor.emit_alias(alias.as_deref());
                Ok(())
            }
            Expr::Aggregate(aggregate) => {
                visitor.enter_aggregate(aggregate.func);
                match &aggregate.column {
                    Some(column) => visitor.emit_column(column),
                    // Count-all has no inner column.
                    None => visitor.emit_all_columns(None),
                }
                visitor.leave_aggregate(aggregate.alias.as_deref());
                Ok(())
            }
            Expr::Case(case) => {
                visitor.enter_case();
                for when in &case.whens {
                    visitor.enter_when();
                    when.condition.accept(visitor)?;
                    visitor.emit_when_then();
                    when.value.accept(visitor)?;
                    visitor.leave_when();
                }
                if let Some(else_value) = &case.else_value {
                    visitor.enter_else();
                    else_value.accept(visitor)?;
                    visitor.leave_else();
                }
                visitor.leave_case(case.alias.as_deref());
                Ok(())
            }
        }
    }
}
