//! Client-side prepared statements
//!
//! The statement text is scanned once for placeholders at prepare time.
//! Every execution renders the bound values as literals and sends the
//! result over `COM_QUERY`, so nothing is allocated on the server.

use async_trait::async_trait;
use mysql_async::Pool;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tinyprobe_core::{
    ParameterBindings, PlaceholderTemplate, PreparedStatement, QueryResult, Result,
    StatementResult, Value,
};

use crate::connection::{ensure_open, run_execute, run_query};
use crate::value_to_mysql_literal;

/// A prepared statement bound to one [`MySqlConnection`](crate::MySqlConnection)
pub struct MySqlPreparedStatement {
    pool: Pool,
    connection_closed: Arc<AtomicBool>,
    template: PlaceholderTemplate,
    bindings: ParameterBindings,
}

impl MySqlPreparedStatement {
    pub(crate) fn new(pool: Pool, connection_closed: Arc<AtomicBool>, sql: &str) -> Self {
        let template = PlaceholderTemplate::parse(sql);
        let bindings = ParameterBindings::new(template.placeholder_count());
        tracing::debug!(
            parameters = template.placeholder_count(),
            "prepared client-side statement"
        );
        Self {
            pool,
            connection_closed,
            template,
            bindings,
        }
    }

    fn render(&self) -> Result<String> {
        ensure_open(&self.connection_closed)?;
        let values = self.bindings.values()?;
        self.template.render(&values, value_to_mysql_literal)
    }
}

#[async_trait]
impl PreparedStatement for MySqlPreparedStatement {
    fn sql(&self) -> &str {
        self.template.sql()
    }

    fn parameter_count(&self) -> usize {
        self.template.placeholder_count()
    }

    fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        self.bindings.bind(index, value)
    }

    fn clear_parameters(&mut self) {
        self.bindings.clear();
    }

    #[tracing::instrument(skip(self), fields(sql_preview = %self.template.sql().chars().take(100).collect::<String>()))]
    async fn query(&self) -> Result<QueryResult> {
        let sql = self.render()?;
        run_query(&self.pool, &sql).await
    }

    #[tracing::instrument(skip(self), fields(sql_preview = %self.template.sql().chars().take(100).collect::<String>()))]
    async fn execute(&self) -> Result<StatementResult> {
        let sql = self.render()?;
        run_execute(&self.pool, &sql).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        tracing::debug!("closing client-side statement");
        Ok(())
    }
}
