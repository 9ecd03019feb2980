//! Blocking query execution over a native PostgreSQL connection.

use postgres::Client;
use tracing::warn;

use sql_bridge_common::{ClientError, ErrorContext, Result};
use sql_bridge_core::CompiledQuery;

use crate::error::context_from_client_error;
use crate::params::{PgParams, POSTGRES_BACKEND};
use crate::result::ResultBlock;

/// Synchronous executor borrowing an established connection.
///
/// Non-reentrant per instance; use one executor per connection. The calling
/// thread blocks inside the native client for the duration of each query.
pub struct SyncExecutor<'c> {
    client: &'c mut Client,
}

impl<'c> SyncExecutor<'c> {
    pub fn new(client: &'c mut Client) -> Self {
        SyncExecutor { client }
    }

    /// Executes a query without parameters.
    pub fn execute(&mut self, sql: &str) -> Result<ResultBlock> {
        self.run(sql, None)
    }

    /// Executes a query with a pre-encoded parameter packet.
    pub fn execute_with(&mut self, sql: &str, params: &PgParams) -> Result<ResultBlock> {
        self.run(sql, Some(params))
    }

    /// Executes a compiled query, recovering the packet by backend tag.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the query carries parameters compiled for a
    /// different backend.
    pub fn execute_compiled(&mut self, query: &CompiledQuery) -> Result<ResultBlock> {
        if query.param_count() == 0 {
            return self.run(query.sql(), None);
        }
        let params = query
            .params()
            .downcast_ref::<PgParams>(POSTGRES_BACKEND)
            .ok_or_else(|| {
                ErrorContext::new(
                    ClientError::InvalidArgument,
                    "query was compiled for a different backend",
                )
            })?;
        self.run(query.sql(), Some(params))
    }

    fn run(&mut self, sql: &str, params: Option<&PgParams>) -> Result<ResultBlock> {
        if self.client.is_closed() {
            return Err(ErrorContext::new(
                ClientError::NotConnected,
                "connection is closed",
            ));
        }

        let rows = match params {
            Some(params) if !params.is_empty() => {
                let raw = params.raw_params();
                let types = params.param_types();
                let args: Vec<_> = raw
                    .iter()
                    .zip(types)
                    .map(|(p, t)| (p as &(dyn postgres::types::ToSql + Sync), t))
                    .collect();
                self.client.query_typed(sql, &args)
            }
            _ => self.client.query_typed(sql, &[]),
        }
        .map_err(|e| {
            let ctx = context_from_client_error(&e);
            warn!(error = %ctx, "query failed");
            ctx
        })?;

        Ok(ResultBlock::new(rows))
    }
}
