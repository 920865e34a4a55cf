//! COM_PING round trip with latency classification

use tinyprobe_connection::{HealthStatus, PingError, ping_database};

use crate::report::ProbeReport;

use super::{ProbeContext, close, open};

pub(super) async fn run(ctx: &ProbeContext) -> ProbeReport {
    let mut report = ProbeReport::new("ping", "Ping");

    let Some(conn) = open(ctx, &ctx.base, &mut report).await else {
        return report;
    };

    report.ok_with("Connection id", conn.server_info().connection_id);

    match ping_database(&*conn, Some(ctx.base.connect_timeout)).await {
        Ok(latency) => {
            let status = HealthStatus::from_latency_with_thresholds(latency, &ctx.health);
            let detail = format!("{:.2} ms ({status})", latency.as_secs_f64() * 1000.0);
            if status == HealthStatus::Unhealthy {
                report.fail_with("Ping", "timeout", detail);
            } else {
                report.ok_with("Ping", detail);
            }
        }
        Err(e) => {
            let kind = match e {
                PingError::Timeout(_) => "timeout",
                PingError::ConnectionClosed | PingError::Failed(_) => "connection",
            };
            report.fail_with("Ping", kind, e);
        }
    }

    close(&*conn, &mut report).await;
    report
}
