//! `tinyprobe`: diagnostic client for Tiny-SQL and other MySQL-protocol servers
//!
//! Usage:
//!   tinyprobe                              # run every probe against localhost:3307/test
//!   tinyprobe basic --host db --port 3307  # one probe
//!   tinyprobe --url jdbc:mysql://db:3307/test?serverTimezone=UTC properties
//!   tinyprobe query "SHOW DATABASES"
//!   tinyprobe --format json --strict       # machine-readable, non-zero exit on failure

mod logging;
mod probes;
mod report;
mod settings;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tinyprobe_core::DatabaseDriver;
use tinyprobe_driver_mysql::MySqlDriver;

use logging::LoggingConfig;
use probes::{Probe, ProbeContext};
use report::{OutputFormat, ProbeReport};
use settings::{Settings, TargetSettings};

/// Exit status when the configuration itself is invalid
const EXIT_CONFIG: u8 = 2;
/// Exit status for `--strict` runs with a failed step
const EXIT_STEP_FAILED: u8 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "tinyprobe",
    version,
    about = "Diagnostic client for Tiny-SQL and other MySQL-protocol servers"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Server host
    #[arg(long, global = true, env = "TINYPROBE_HOST")]
    host: Option<String>,

    /// Server port [default: 3307]
    #[arg(long, global = true, env = "TINYPROBE_PORT")]
    port: Option<u16>,

    /// Database to select [default: test]
    #[arg(long, global = true, env = "TINYPROBE_DATABASE")]
    database: Option<String>,

    /// User name [default: root]
    #[arg(long, short = 'u', global = true, env = "TINYPROBE_USER")]
    user: Option<String>,

    /// Password [default: empty]
    #[arg(long, short = 'p', global = true, env = "TINYPROBE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// host:port/database, mysql://... or jdbc:mysql://... URL
    #[arg(long, global = true, env = "TINYPROBE_URL")]
    url: Option<String>,

    /// Settings file [default: <config dir>/tinyprobe/config.toml]
    #[arg(long, global = true, env = "TINYPROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text, env = "TINYPROBE_FORMAT")]
    format: OutputFormat,

    /// Exit with status 1 when any step failed
    #[arg(long, global = true)]
    strict: bool,

    /// Connect timeout in milliseconds [default: 10000]
    #[arg(long, global = true, env = "TINYPROBE_CONNECT_TIMEOUT")]
    connect_timeout: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn", env = "TINYPROBE_LOG_LEVEL")]
    log_level: String,

    /// Write log events as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Run every probe in order (default)
    All,
    /// Connect, print metadata and run three scalar queries
    Basic,
    /// Try each configured account
    Users,
    /// Run `SELECT ? as result` with 42 bound
    Prepared,
    /// Connect through a property bag and print session state
    Properties,
    /// Measure a COM_PING round trip
    Ping,
    /// Several statements on one connection, then SHOW DATABASES
    Batch,
    /// Concurrent workers through a bounded pool
    Pool,
    /// Run one SQL statement and print the rows as a table
    Query {
        /// Statement to run
        sql: String,
    },
}

impl Command {
    fn probes(self) -> Vec<Probe> {
        match self {
            Command::All => Probe::all(),
            Command::Basic => vec![Probe::Basic],
            Command::Users => vec![Probe::Users],
            Command::Prepared => vec![Probe::Prepared],
            Command::Properties => vec![Probe::Properties],
            Command::Ping => vec![Probe::Ping],
            Command::Batch => vec![Probe::Batch],
            Command::Pool => vec![Probe::Pool],
            Command::Query { sql } => vec![Probe::Query(sql)],
        }
    }
}

impl Cli {
    /// Target values given on the command line or through the environment
    fn target_overrides(&self) -> TargetSettings {
        TargetSettings {
            url: self.url.clone(),
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            connect_timeout_ms: self.connect_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(LoggingConfig::with_level(&cli.log_level, cli.log_json)) {
        eprintln!("error: {e:#}");
        return ExitCode::from(EXIT_CONFIG);
    }

    let ctx = match build_context(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match run(&cli, &ctx).await {
        Ok(reports) => exit_code(cli.strict, &reports),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn build_context(cli: &Cli) -> anyhow::Result<ProbeContext> {
    let settings = Settings::load(cli.config.as_deref())?;
    let driver = Arc::new(MySqlDriver::new());

    let overrides = cli.target_overrides();
    let base = settings::resolve_target(driver.as_ref(), &[&settings.target, &overrides])
        .context("invalid connection target")?;
    let mut shown = base.clone();
    shown.password = None;
    tracing::debug!(url = %driver.build_connection_string(&shown), "resolved target");

    Ok(ProbeContext::new(driver, base, &settings))
}

async fn run(cli: &Cli, ctx: &ProbeContext) -> anyhow::Result<Vec<ProbeReport>> {
    let probes = cli.command.clone().unwrap_or(Command::All).probes();
    let mut reports = Vec::with_capacity(probes.len());

    for probe in &probes {
        let report = probes::run_probe(ctx, probe).await;
        if cli.format == OutputFormat::Text {
            report::render_text(&report, &mut io::stdout().lock(), &mut io::stderr().lock())
                .context("failed to write report")?;
        }
        reports.push(report);
    }

    if cli.format == OutputFormat::Json {
        report::render_json(&reports, &mut io::stdout().lock())?;
    }
    Ok(reports)
}

fn exit_code(strict: bool, reports: &[ProbeReport]) -> ExitCode {
    if strict && reports.iter().any(ProbeReport::has_failures) {
        ExitCode::from(EXIT_STEP_FAILED)
    } else {
        ExitCode::SUCCESS
    }
}
