//! Non-blocking query execution on a cooperative reactor.
//!
//! The executor owns the native client plus the connection driver task that
//! pumps the socket. Methods take `&mut self`, so no two operations on the
//! same executor can interleave and results of successive queries arrive in
//! FIFO order. Suspensions happen only inside the native client's socket
//! waits; cancellation is cooperative — dropping an in-flight call leaves
//! the executor usable, and the next call either completes normally or
//! reports the connection state. Timeouts are the caller's concern, composed
//! with the reactor's timed wait.

use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{error, warn};

use sql_bridge_common::{ClientError, ErrorContext, Result};
use sql_bridge_core::CompiledQuery;

use crate::error::context_from_client_error;
use crate::params::{PgParams, POSTGRES_BACKEND};
use crate::result::ResultBlock;

/// Asynchronous executor owning a native connection.
pub struct AsyncExecutor {
    client: Client,
    driver: JoinHandle<()>,
}

impl AsyncExecutor {
    /// Connects and spawns the connection driver on the ambient runtime.
    pub async fn connect(config: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(config, NoTls)
            .await
            .map_err(|e| context_from_client_error(&e))?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "connection driver terminated");
            }
        });
        Ok(AsyncExecutor { client, driver })
    }

    /// Wraps an already-established client and its driver handle.
    pub fn new(client: Client, driver: JoinHandle<()>) -> Self {
        AsyncExecutor { client, driver }
    }

    /// False once the connection is closed or its driver has exited; the
    /// next execute on an invalid executor reports the state instead of
    /// sending.
    pub fn is_valid(&self) -> bool {
        !self.client.is_closed() && !self.driver.is_finished()
    }

    pub async fn execute(&mut self, sql: &str) -> Result<ResultBlock> {
        self.run(sql, None).await
    }

    pub async fn execute_with(&mut self, sql: &str, params: &PgParams) -> Result<ResultBlock> {
        self.run(sql, Some(params)).await
    }

    /// Executes a compiled query, recovering the packet by backend tag.
    pub async fn execute_compiled(&mut self, query: &CompiledQuery) -> Result<ResultBlock> {
        if query.param_count() == 0 {
            return self.run(query.sql(), None).await;
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
        self.run(query.sql(), Some(params)).await
    }

    fn validate(&self) -> Result<()> {
        if self.client.is_closed() {
            return Err(ErrorContext::new(
                ClientError::NotConnected,
                "connection is closed",
            ));
        }
        if self.driver.is_finished() {
            return Err(ErrorContext::new(
                ClientError::InvalidState,
                "connection driver task has exited",
            )
            .with_detail("the socket pump is gone; no further queries can complete"));
        }
        Ok(())
    }

    async fn run(&mut self, sql: &str, params: Option<&PgParams>) -> Result<ResultBlock> {
        self.validate()?;

        let result = match params {
            Some(params) if !params.is_empty() => {
                let raw = params.raw_params();
                let types = params.param_types();
                let args: Vec<_> = raw
                    .iter()
                    .zip(types)
                    .map(|(p, t)| (p as &(dyn tokio_postgres::types::ToSql + Sync), t))
                    .collect();
                self.client.query_typed(sql, &args).await
            }
            _ => self.client.query_typed(sql, &[]).await,
        };

        let rows = result.map_err(|e| {
            let ctx = context_from_client_error(&e);
            warn!(error = %ctx, "query failed");
            ctx
        })?;

        Ok(ResultBlock::new(rows))
    }
}
