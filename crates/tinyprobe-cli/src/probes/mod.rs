//! Probe routines
//!
//! Each probe opens its own connections through the driver, records one
//! [`StepOutcome`](crate::report::StepOutcome) per driver call and closes
//! every connection before returning. Failures never abort the run.

mod basic;
mod batch;
mod ping;
mod pool;
mod prepared;
mod properties;
mod query;
mod users;


use std::sync::Arc;

use tinyprobe_connection::HealthThresholds;
use tinyprobe_core::{Connection, ConnectionConfig, ConnectionProperties, DatabaseDriver};

use crate::report::ProbeReport;
use crate::settings::{PoolSettings, Settings, UserCredentials};

/// Everything a probe needs, resolved once at startup
pub struct ProbeContext {
    pub driver: Arc<dyn DatabaseDriver>,
    /// Target and credentials used by every probe except `users`
    pub base: ConnectionConfig,
    pub users: Vec<UserCredentials>,
    /// Layered over the properties probe's standard bag
    pub extra_properties: ConnectionProperties,
    pub pool: PoolSettings,
    pub health: HealthThresholds,
}

impl ProbeContext {
    pub fn new(driver: Arc<dyn DatabaseDriver>, base: ConnectionConfig, settings: &Settings) -> Self {
        let extra_properties = settings
            .properties
            .iter()
            .fold(ConnectionProperties::new(), |bag, (key, value)| {
                bag.with(key, value)
            });

        Self {
            driver,
            base,
            users: settings.users(),
            extra_properties,
            pool: settings.pool.clone(),
            health: HealthThresholds::new(settings.health.healthy_ms, settings.health.degraded_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Basic,
    Users,
    Prepared,
    Properties,
    Ping,
    Batch,
    Pool,
    Query(String),
}

impl Probe {
    /// The routines `tinyprobe all` runs, in order
    pub fn all() -> Vec<Probe> {
        vec![
            Probe::Basic,
            Probe::Users,
            Probe::Prepared,
            Probe::Properties,
            Probe::Ping,
            Probe::Batch,
            Probe::Pool,
        ]
    }
}

#[tracing::instrument(skip(ctx), fields(addr = %ctx.base.target()))]
pub async fn run_probe(ctx: &ProbeContext, probe: &Probe) -> ProbeReport {
    let report = match probe {
        Probe::Basic => basic::run(ctx).await,
        Probe::Users => users::run(ctx).await,
        Probe::Prepared => prepared::run(ctx).await,
        Probe::Properties => properties::run(ctx).await,
        Probe::Ping => ping::run(ctx).await,
        Probe::Batch => batch::run(ctx).await,
        Probe::Pool => pool::run(ctx).await,
        Probe::Query(sql) => query::run(ctx, sql).await,
    };
    tracing::info!(
        probe = %report.name,
        steps = report.steps.len(),
        failed = report.failures().count(),
        "probe finished"
    );
    report
}

/// Open a connection for `config`, recording the attempt
async fn open(
    ctx: &ProbeContext,
    config: &ConnectionConfig,
    report: &mut ProbeReport,
) -> Option<Arc<dyn Connection>> {
    match ctx.driver.connect(config).await {
        Ok(conn) => {
            report.ok(format!("Connected to {}", config.target()));
            Some(conn)
        }
        Err(e) => {
            report.fail(format!("Connect to {}", config.target()), &e);
            None
        }
    }
}

async fn close(conn: &dyn Connection, report: &mut ProbeReport) {
    match conn.close().await {
        Ok(()) => report.ok("Connection closed"),
        Err(e) => report.fail("Close connection", &e),
    }
}
