//! PostgreSQL dialect.

use std::fmt::Write as _;

use sql_bridge_core::dialect::{ParamSink, SqlDialect};
use sql_bridge_core::value::FieldValue;

use crate::params::PgParamSink;

/// Syntax rules for PostgreSQL: double-quoted identifiers with embedded
/// quotes doubled, `$N` placeholders, `LIMIT n OFFSET m` with zero sides
/// omitted, single-quote-doubled string literals and `\x` hex bytea.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        PostgresDialect
    }
}

impl SqlDialect for PostgresDialect {
    fn quote_identifier(&self, out: &mut String, name: &str) {
        out.push('"');
        for ch in name.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    }

    fn placeholder(&self, out: &mut String, index: usize) {
        let _ = write!(out, "${index}");
    }

    fn limit_clause(&self, count: u64, offset: u64) -> String {
        let mut clause = String::new();
        if count != 0 {
            let _ = write!(clause, " LIMIT {count}");
        }
        if offset != 0 {
            let _ = write!(clause, " OFFSET {offset}");
        }
        clause
    }

    fn format_value(&self, out: &mut String, value: &FieldValue) {
        match value {
            FieldValue::Null => out.push_str("NULL"),
            FieldValue::Bool(true) => out.push_str("TRUE"),
            FieldValue::Bool(false) => out.push_str("FALSE"),
            FieldValue::I32(v) => {
                let _ = write!(out, "{v}");
            }
            FieldValue::I64(v) => {
                let _ = write!(out, "{v}");
            }
            FieldValue::F64(v) => {
                if v.is_nan() {
                    out.push_str("'NaN'::float8");
                } else if v.is_infinite() {
                    if *v > 0.0 {
                        out.push_str("'Infinity'::float8");
                    } else {
                        out.push_str("'-Infinity'::float8");
                    }
                } else {
                    let _ = write!(out, "{v}");
                }
            }
            FieldValue::Text(s) => {
                out.push('\'');
                for ch in s.chars() {
                    if ch == '\'' {
                        out.push('\'');
                    }
                    out.push(ch);
                }
                out.push('\'');
            }
            FieldValue::Bytes(bytes) => {
                out.push_str("'\\x");
                for byte in bytes.iter() {
                    let _ = write!(out, "{byte:02x}");
                }
                out.push('\'');
            }
        }
    }

    fn make_param_sink(&self) -> Box<dyn ParamSink> {
        Box::new(PgParamSink::new())
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_cte(&self) -> bool {
        true
    }

    fn supports_window_functions(&self) -> bool {
        true
    }

    fn supports_lateral_joins(&self) -> bool {
        true
    }
}
