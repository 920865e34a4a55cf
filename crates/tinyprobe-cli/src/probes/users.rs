//! Try each configured account in turn

use crate::report::ProbeReport;

use super::ProbeContext;

pub(super) async fn run(ctx: &ProbeContext) -> ProbeReport {
    let mut report = ProbeReport::new("users", "User authentication");

    for account in &ctx.users {
        let config = ctx
            .base
            .clone()
            .with_credentials(&account.user, &account.password);
        let label = format!("User '{}'", account.user);

        match ctx.driver.connect(&config).await {
            Ok(conn) => {
                report.ok_with(&label, "authenticated");
                if let Err(e) = conn.close().await {
                    report.fail(format!("Close connection for '{}'", account.user), &e);
                }
            }
            Err(e) => report.fail(label, &e),
        }
    }

    report
}
