//! Run one statement from the command line and tabulate the rows

use crate::report::{ProbeReport, TableData};

use super::{ProbeContext, close, open};

pub(super) async fn run(ctx: &ProbeContext, sql: &str) -> ProbeReport {
    let mut report = ProbeReport::new("query", "Query");

    let Some(conn) = open(ctx, &ctx.base, &mut report).await else {
        return report;
    };

    match conn.query(sql, &[]).await {
        Ok(result) if !result.has_rows() => {
            report.ok_with(
                sql,
                format!(
                    "no rows, {} affected in {} ms",
                    result.affected_rows, result.execution_time_ms
                ),
            );
        }
        Ok(result) => {
            report.ok_with(
                sql,
                format!(
                    "{} row(s) in {} ms",
                    result.row_count(),
                    result.execution_time_ms
                ),
            );
            report.table = Some(TableData {
                columns: result.columns.iter().map(|c| c.name.clone()).collect(),
                rows: result
                    .rows
                    .iter()
                    .map(|row| row.values.iter().map(ToString::to_string).collect())
                    .collect(),
            });
        }
        Err(e) => report.fail(sql, &e),
    }

    close(&*conn, &mut report).await;
    report
}
