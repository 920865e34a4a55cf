//! Bind an integer into `SELECT ? as result`

use tinyprobe_core::{Connection, PreparedStatement, Value};

use crate::report::ProbeReport;

use super::{ProbeContext, close, open};

const SQL: &str = "SELECT ? as result";
const BOUND: i32 = 42;

pub(super) async fn run(ctx: &ProbeContext) -> ProbeReport {
    let mut report = ProbeReport::new("prepared", "Prepared statement");

    let Some(conn) = open(ctx, &ctx.base, &mut report).await else {
        return report;
    };

    run_statement(&*conn, &mut report).await;

    close(&*conn, &mut report).await;
    report
}

async fn run_statement(conn: &dyn Connection, report: &mut ProbeReport) {
    let mut stmt = match conn.prepare(SQL).await {
        Ok(stmt) => stmt,
        Err(e) => {
            report.fail(format!("Prepare {SQL}"), &e);
            return;
        }
    };
    report.ok_with(
        format!("Prepared {SQL}"),
        format!("{} parameter(s)", stmt.parameter_count()),
    );

    if let Err(e) = stmt.bind(1, Value::Int32(BOUND)) {
        report.fail("Bind parameter 1", &e);
    } else {
        execute(&*stmt, report).await;
    }

    if let Err(e) = stmt.close().await {
        report.fail("Close statement", &e);
    }
}

async fn execute(stmt: &dyn PreparedStatement, report: &mut ProbeReport) {
    match stmt.query().await {
        Ok(result) => match result.scalar("result") {
            Some(value) => report.ok_with("Result", value),
            None => report.ok_with("Result", "(no rows)"),
        },
        Err(e) => report.fail("Result", &e),
    }
}
