//! Connect, print driver and server metadata, run three scalar queries

use crate::report::ProbeReport;

use super::{ProbeContext, close, open};

const QUERIES: [(&str, &str, &str); 3] = [
    ("SELECT 1 as result", "result", "Result"),
    ("SELECT VERSION() as version", "version", "Version"),
    ("SELECT DATABASE() as db", "db", "Database"),
];

pub(super) async fn run(ctx: &ProbeContext) -> ProbeReport {
    let mut report = ProbeReport::new("basic", "Basic connection");

    let Some(conn) = open(ctx, &ctx.base, &mut report).await else {
        return report;
    };

    report.ok_with(
        "Driver",
        format!(
            "{} {} ({} prepared statements)",
            ctx.driver.display_name(),
            ctx.driver.version(),
            ctx.driver.capabilities().prepared_statements()
        ),
    );
    let server = conn.server_info();
    report.ok_with("Server", format!("{} {}", server.product_name, server.version));

    for (sql, column, label) in QUERIES {
        match conn.query(sql, &[]).await {
            // No row prints nothing
            Ok(result) => {
                if let Some(value) = result.scalar(column) {
                    report.ok_with(label, value);
                }
            }
            Err(e) => report.fail(label, &e),
        }
    }

    close(&*conn, &mut report).await;
    report
}
