//! SQL generation: the concrete visitor and the compiler front door.

use std::sync::Arc;

use tracing::debug;

use sql_bridge_common::Result;

use crate::compiled::CompiledQuery;
use crate::dialect::{ParamPacket, ParamSink, SqlDialect};
use crate::expr::{
    AggregateFn, BinaryOp, ColumnExpr, JoinKind, OrderDirection, ReturningClause, SetOperator,
    Statement, UnaryOp,
};
use crate::value::FieldValue;
use crate::visitor::QueryVisitor;

/// Whether literals become placeholders or are rendered inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Literals and DML values go through the dialect's parameter sink and
    /// the matching placeholder is emitted.
    Parameterized,
    /// Values are formatted directly into the SQL text. Used for logging
    /// and for emitters that cannot bind.
    Inline,
}

/// Concrete visitor that concatenates the SQL string and accumulates the
/// parameter packet.
pub struct SqlGenerator<'d> {
    dialect: &'d dyn SqlDialect,
    sql: String,
    sink: Option<Box<dyn ParamSink>>,
}

impl<'d> SqlGenerator<'d> {
    pub fn new(dialect: &'d dyn SqlDialect, mode: GenerationMode) -> Self {
        let sink = match mode {
            GenerationMode::Parameterized => Some(dialect.make_param_sink()),
            GenerationMode::Inline => None,
        };
        SqlGenerator {
            dialect,
            sql: String::new(),
            sink,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Moves the text and the sink's packet into the compiled result.
    pub fn finish(self) -> (String, ParamPacket) {
        let packet = match self.sink {
            Some(sink) => sink.into_packet(),
            None => ParamPacket::empty(),
        };
        (self.sql, packet)
    }

    fn emit_value(&mut self, value: &FieldValue) -> Result<()> {
        match &mut self.sink {
            Some(sink) => {
                let index = sink.push(value)?;
                self.dialect.placeholder(&mut self.sql, index);
            }
            None => self.dialect.format_value(&mut self.sql, value),
        }
        Ok(())
    }

    fn quote(&mut self, name: &str) {
        self.dialect.quote_identifier(&mut self.sql, name);
    }
}

impl QueryVisitor for SqlGenerator<'_> {
    fn emit_column(&mut self, column: &ColumnExpr) {
        if let Some(table) = column.table() {
            self.quote(table);
            self.sql.push('.');
        }
        self.quote(column.name());
        self.emit_alias(column.alias());
    }

    fn emit_literal(&mut self, value: &FieldValue, alias: Option<&str>) -> Result<()> {
        self.emit_value(value)?;
        self.emit_alias(alias);
        Ok(())
    }

    fn emit_null(&mut self) {
        self.sql.push_str("NULL");
    }

    fn emit_all_columns(&mut self, table: Option<&str>) {
        if let Some(table) = table {
            self.quote(table);
            self.sql.push('.');
        }
        self.sql.push('*');
    }

    fn emit_table_ref(&mut self, name: &str) {
        self.quote(name);
    }

    fn emit_alias(&mut self, alias: Option<&str>) {
        if let Some(alias) = alias {
            self.sql.push_str(" AS ");
            self.quote(alias);
        }
    }

    fn column_separator(&mut self) {
        self.sql.push_str(", ");
    }

    fn enter_binary(&mut self) {
        self.sql.push('(');
    }

    fn emit_binary_op(&mut self, op: BinaryOp) {
        self.sql.push_str(match op {
            BinaryOp::Eq => " = ",
            BinaryOp::Ne => " != ",
            BinaryOp::Lt => " < ",
            BinaryOp::Le => " <= ",
            BinaryOp::Gt => " > ",
            BinaryOp::Ge => " >= ",
            BinaryOp::And => " AND ",
            BinaryOp::Or => " OR ",
            BinaryOp::Like => " LIKE ",
            BinaryOp::NotLike => " NOT LIKE ",
            BinaryOp::In => " IN ",
        });
    }

    fn leave_binary(&mut self) {
        self.sql.push(')');
    }

    fn emit_unary_op(&mut self, op: UnaryOp) {
        self.sql.push_str(match op {
            UnaryOp::Not => "NOT ",
            UnaryOp::IsNull => " IS NULL",
            UnaryOp::IsNotNull => " IS NOT NULL",
        });
    }

    fn emit_between(&mut self) {
        self.sql.push_str(" BETWEEN ");
    }

    fn emit_between_and(&mut self) {
        self.sql.push_str(" AND ");
    }

    fn enter_in_list(&mut self) {
        self.sql.push_str(" IN (");
    }

    fn leave_in_list(&mut self) {
        self.sql.push(')');
    }

    fn enter_subquery(&mut self) {
        self.sql.push('(');
    }

    fn leave_subquery(&mut self) {
        self.sql.push(')');
    }

    fn enter_exists(&mut self) {
        self.sql.push_str("EXISTS (");
    }

    fn leave_exists(&mut self) {
        self.sql.push(')');
    }

    fn enter_aggregate(&mut self, func: AggregateFn) {
        match func {
            AggregateFn::Count { distinct } => {
                self.sql.push_str("COUNT(");
                if distinct {
                    self.sql.push_str("DISTINCT ");
                }
            }
            AggregateFn::Sum => self.sql.push_str("SUM("),
            AggregateFn::Avg => self.sql.push_str("AVG("),
            AggregateFn::Min => self.sql.push_str("MIN("),
            AggregateFn::Max => self.sql.push_str("MAX("),
        }
    }

    fn leave_aggregate(&mut self, alias: Option<&str>) {
        self.sql.push(')');
        self.emit_alias(alias);
    }

    fn enter_select(&mut self, distinct: bool) {
        self.sql.push_str("SELECT ");
        if distinct {
            self.sql.push_str("DISTINCT ");
        }
    }

    fn leave_select(&mut self) {}

    fn enter_from(&mut self) {
        self.sql.push_str(" FROM ");
    }

    fn leave_from(&mut self) {}

    fn enter_where(&mut self) {
        self.sql.push_str(" WHERE ");
    }

    fn leave_where(&mut self) {}

    fn enter_group_by(&mut self) {
        self.sql.push_str(" GROUP BY ");
    }

    fn leave_group_by(&mut self) {}

    fn enter_having(&mut self) {
        self.sql.push_str(" HAVING ");
    }

    fn leave_having(&mut self) {}

    fn enter_order_by(&mut self) {
        self.sql.push_str(" ORDER BY ");
    }

    fn leave_order_by(&mut self) {}

    fn emit_order_direction(&mut self, direction: OrderDirection) {
        self.sql.push_str(match direction {
            OrderDirection::Asc => " ASC",
            OrderDirection::Desc => " DESC",
        });
    }

    fn emit_limit(&mut self, count: u64, offset: u64) {
        let clause = self.dialect.limit_clause(count, offset);
        self.sql.push_str(&clause);
    }

    fn enter_join(&mut self, kind: JoinKind) {
        self.sql.push_str(match kind {
            JoinKind::Inner => " INNER JOIN ",
            JoinKind::Left => " LEFT JOIN ",
            JoinKind::Right => " RIGHT JOIN ",
            JoinKind::Full => " FULL OUTER JOIN ",
            JoinKind::Cross => " CROSS JOIN ",
        });
    }

    fn emit_join_on(&mut self) {
        self.sql.push_str(" ON ");
    }

    fn leave_join(&mut self) {}

    fn enter_insert(&mut self) {
        self.sql.push_str("INSERT INTO ");
    }

    fn emit_insert_columns(&mut self, columns: &[String]) {
        self.sql.push_str(" (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.column_separator();
            }
            self.quote(column);
        }
        self.sql.push_str(") VALUES ");
    }

    fn emit_insert_values(&mut self, rows: &[Vec<FieldValue>]) -> Result<()> {
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                self.column_separator();
            }
            self.sql.push('(');
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    self.column_separator();
                }
                self.emit_value(value)?;
            }
            self.sql.push(')');
        }
        Ok(())
    }

    fn leave_insert(&mut self) {}

    fn enter_update(&mut self) {
        self.sql.push_str("UPDATE ");
    }

    fn emit_update_assignments(&mut self, assignments: &[(String, FieldValue)]) -> Result<()> {
        self.sql.push_str(" SET ");
        for (i, (column, value)) in assignments.iter().enumerate() {
            if i > 0 {
                self.column_separator();
            }
            self.quote(column);
            self.sql.push_str(" = ");
            self.emit_value(value)?;
        }
        Ok(())
    }

    fn leave_update(&mut self) {}

    fn enter_delete(&mut self) {
        self.sql.push_str("DELETE FROM ");
    }

    fn leave_delete(&mut self) {}

    fn emit_returning(&mut self, returning: &ReturningClause) {
        self.sql.push_str(" RETURNING ");
        match returning {
            ReturningClause::All => self.sql.push('*'),
            ReturningClause::Columns(columns) => {
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        self.column_separator();
                    }
                    self.quote(column);
                }
            }
        }
    }

    fn emit_set_op(&mut self, op: SetOperator) {
        self.sql.push_str(match op {
            SetOperator::Union => " UNION ",
            SetOperator::UnionAll => " UNION ALL ",
            SetOperator::Intersect => " INTERSECT ",
            SetOperator::Except => " EXCEPT ",
        });
    }

    fn enter_case(&mut self) {
        self.sql.push_str("CASE");
    }

    fn leave_case(&mut self, alias: Option<&str>) {
        self.sql.push_str(" END");
        self.emit_alias(alias);
    }

    fn enter_when(&mut self) {
        self.sql.push_str(" WHEN ");
    }

    fn emit_when_then(&mut self) {
        self.sql.push_str(" THEN ");
    }

    fn leave_when(&mut self) {}

    fn enter_else(&mut self) {
        self.sql.push_str(" ELSE ");
    }

    fn leave_else(&mut self) {}

    fn enter_cte(&mut self, recursive: bool) {
        self.sql.push_str("WITH ");
        if recursive {
            self.sql.push_str("RECURSIVE ");
        }
    }

    fn emit_cte_name(&mut self, name: &str) {
        self.quote(name);
    }

    fn enter_cte_body(&mut self) {
        self.sql.push_str(" AS (");
    }

    fn leave_cte_body(&mut self) {
        self.sql.push(')');
    }

    fn leave_cte(&mut self) {
        self.sql.push(' ');
    }
}

/// Compiler front door: walks a statement once with a dialect-bound
/// generator and returns the finalized query.
pub struct QueryCompiler {
    dialect: Arc<dyn SqlDialect>,
    mode: GenerationMode,
}

impl QueryCompiler {
    /// Parameterized compiler.
    pub fn new(dialect: Arc<dyn SqlDialect>) -> Self {
        QueryCompiler {
            dialect,
            mode: GenerationMode::Parameterized,
        }
    }

    pub fn with_mode(dialect: Arc<dyn SqlDialect>, mode: GenerationMode) -> Self {
        QueryCompiler { dialect, mode }
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        &*self.dialect
    }

    /// Compiles any statement into SQL plus a parameter packet.
    pub fn compile(&self, statement: impl Into<Statement>) -> Result<CompiledQuery> {
        let statement = statement.into();
        if statement.returning().is_some() && !self.dialect.supports_returning() {
            return Err(sql_bridge_common::ErrorContext::new(
                sql_bridge_common::ClientError::InvalidOption,
                "dialect does not support RETURNING",
            ));
        }
        crate::expr::validate_statement(&statement)?;
        let mut generator = SqlGenerator::new(&*self.dialect, self.mode);
        statement.accept(&mut generator)?;
        let (sql, params) = generator.finish();
        debug!(sql = %sql, params = params.len(), "compiled query");
        Ok(CompiledQuery::new(sql, params))
    }
}
