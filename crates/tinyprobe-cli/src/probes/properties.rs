//! Connect through a property bag and print the session state

use tinyprobe_core::{ConnectionProperties, PARAM_CHARACTER_ENCODING, PARAM_SERVER_TIMEZONE};

use crate::report::ProbeReport;

use super::{ProbeContext, close, open};

/// `user`, `password`, `useSSL=false`, `serverTimezone=UTC`,
/// `characterEncoding=utf8`, then the settings file's extras
pub(super) fn standard_properties(ctx: &ProbeContext) -> ConnectionProperties {
    let mut properties = ConnectionProperties::new()
        .with("user", ctx.base.username.clone().unwrap_or_default())
        .with("password", ctx.base.password.clone().unwrap_or_default())
        .with("useSSL", "false")
        .with(PARAM_SERVER_TIMEZONE, "UTC")
        .with(PARAM_CHARACTER_ENCODING, "utf8");

    for (key, value) in ctx.extra_properties.iter() {
        properties.set(key, value);
    }
    properties
}

pub(super) async fn run(ctx: &ProbeContext) -> ProbeReport {
    let mut report = ProbeReport::new("properties", "Connection properties");

    let properties = standard_properties(ctx);
    let config = match ctx.base.clone().with_properties(&properties) {
        Ok(config) => config,
        Err(e) => {
            report.fail("Apply connection properties", &e);
            return report;
        }
    };
    report.ok_with(
        "Properties",
        properties
            .redacted()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", "),
    );

    let Some(conn) = open(ctx, &config, &mut report).await else {
        return report;
    };

    let session = conn.session();
    report.ok_with("Auto-commit", session.auto_commit);
    report.ok_with("Read-only", session.read_only);
    report.ok_with(
        "Transaction isolation",
        format!("{} ({})", session.isolation, session.isolation.level_code()),
    );
    report.ok_with("Catalog", session.catalog.as_deref().unwrap_or("(none)"));
    if let Some(tz) = &session.time_zone {
        report.ok_with("Time zone", tz);
    }
    if let Some(encoding) = &session.character_encoding {
        report.ok_with("Character encoding", encoding);
    }

    close(&*conn, &mut report).await;
    report
}
