//! Concurrent `SELECT 1` workers sharing a bounded pool

use tinyprobe_connection::{ConnectionPool, DriverConnectionFactory, PoolConfig};
use tinyprobe_core::{Result, Value};

use crate::report::ProbeReport;

use super::ProbeContext;

pub(super) async fn run(ctx: &ProbeContext) -> ProbeReport {
    let mut report = ProbeReport::new("pool", "Connection pool");

    let settings = &ctx.pool;
    let config = match PoolConfig::new(0, settings.max_open) {
        Ok(config) => config
            .with_max_idle(settings.max_idle)
            .with_max_lifetime_ms(settings.max_lifetime_secs.saturating_mul(1000))
            .with_idle_timeout_ms(settings.max_idle_time_secs.saturating_mul(1000))
            .with_acquire_timeout_ms(acquire_timeout_ms(ctx)),
        Err(e) => {
            report.fail("Pool configuration", &e);
            return report;
        }
    };
    report.ok_with(
        "Pool configuration",
        format!(
            "max open {}, max idle {}, max lifetime {}s",
            config.max_size(),
            config.max_idle(),
            settings.max_lifetime_secs
        ),
    );

    let factory = DriverConnectionFactory::new(ctx.driver.clone(), ctx.base.clone());
    let pool = ConnectionPool::new(config, factory);

    let workers = (1..=settings.workers).map(|id| {
        let pool = &pool;
        async move { (id, select_one(pool).await) }
    });
    for (id, outcome) in futures::future::join_all(workers).await {
        match outcome {
            Ok(value) if value.as_i64() == Some(1) => {
                report.ok_with(format!("Worker {id}"), format!("SELECT 1 = {value}"))
            }
            Ok(value) => report.fail_with(format!("Worker {id}"), "query", format!("SELECT 1 = {value}")),
            Err(e) => report.fail(format!("Worker {id}"), &e),
        }
    }

    let stats = pool.stats();
    report.ok_with(
        "Pool stats",
        format!(
            "open {}, in use {}, idle {}, created {}, closed over idle cap {}",
            stats.total(),
            stats.active(),
            stats.idle(),
            stats.created(),
            stats.max_idle_closed()
        ),
    );

    pool.close().await;
    report.ok("Pool closed");
    report
}

async fn select_one(pool: &ConnectionPool) -> Result<Value> {
    let conn = pool.get().await?;
    let result = conn.query("SELECT 1", &[]).await?;
    Ok(result.scalar("1").cloned().unwrap_or(Value::Null))
}

/// Waiting for a pooled connection should not outlast opening one
fn acquire_timeout_ms(ctx: &ProbeContext) -> u64 {
    let connect_ms = u64::try_from(ctx.base.connect_timeout.as_millis()).unwrap_or(u64::MAX);
    connect_ms.saturating_mul(2)
}
