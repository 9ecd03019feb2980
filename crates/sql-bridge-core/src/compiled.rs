//! The finalized output of a compilation.

use crate::dialect::ParamPacket;

/// Owning value holding the emitted SQL and the backend parameter packet.
///
/// The number of placeholders in `sql` always equals the packet's parameter
/// count; dropping the query releases both.
#[derive(Debug)]
pub struct CompiledQuery {
    sql: String,
    params: ParamPacket,
}

impl CompiledQuery {
    pub fn new(sql: String, params: ParamPacket) -> Self {
        CompiledQuery { sql, params }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &ParamPacket {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn into_parts(self) -> (String, ParamPacket) {
        (self.sql, self.params)
    }
}
