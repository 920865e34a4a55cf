//! Several statements on one connection, then the database list

use tinyprobe_core::{Connection, QueryResult};

use crate::report::ProbeReport;

use super::{ProbeContext, close, open};

const STATEMENTS: [&str; 3] = ["SELECT 1", "SELECT VERSION()", "SELECT DATABASE()"];

pub(super) async fn run(ctx: &ProbeContext) -> ProbeReport {
    let mut report = ProbeReport::new("batch", "Batch queries");

    let Some(conn) = open(ctx, &ctx.base, &mut report).await else {
        return report;
    };

    for sql in STATEMENTS {
        match conn.query(sql, &[]).await {
            Ok(result) => report.ok_with(sql, first_row(&result)),
            Err(e) => report.fail(sql, &e),
        }
    }

    list_databases(&*conn, &mut report).await;

    close(&*conn, &mut report).await;
    report
}

fn first_row(result: &QueryResult) -> String {
    match result.first_row() {
        Some(row) => row
            .values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        None => "(no rows)".to_string(),
    }
}

async fn list_databases(conn: &dyn Connection, report: &mut ProbeReport) {
    let result = match conn.query("SHOW DATABASES", &[]).await {
        Ok(result) => result,
        Err(e) => {
            report.fail("SHOW DATABASES", &e);
            return;
        }
    };

    let names: Vec<String> = result
        .rows
        .iter()
        .filter_map(|row| row.get(0))
        .map(ToString::to_string)
        .collect();
    report.ok_with("SHOW DATABASES", format!("{} database(s)", names.len()));
    for name in names {
        report.ok_with("Database", name);
    }
}
