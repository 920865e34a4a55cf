//! Connection tests: authentication, handshake metadata, ping and close.

use anyhow::Result;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::time::Duration;
use tinyprobe_core::{ConnectionConfig, DatabaseDriver};
use tinyprobe_driver_mysql::MySqlDriver;

use crate::fixtures::{config_for, test_connection};

/// Every stock account can log in and run a query
#[rstest]
#[case::root("root", "")]
#[case::test("test", "test")]
#[case::admin("admin", "admin123")]
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_connect_with_valid_credentials(
    #[case] user: &str,
    #[case] password: &str,
) -> Result<()> {
    let config = config_for(user, password).await?;
    let conn = MySqlDriver::new().connect(&config).await?;

    assert_eq!(conn.driver_name(), "mysql");
    let result = conn.query("SELECT 1 as result", &[]).await?;
    assert_eq!(result.scalar("result").and_then(|v| v.as_i64()), Some(1));

    conn.close().await?;
    Ok(())
}

#[rstest]
#[case::wrong_password("test", "nope")]
#[case::unknown_user("nobody", "")]
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_connect_with_invalid_credentials(
    #[case] user: &str,
    #[case] password: &str,
) -> Result<()> {
    let config = config_for(user, password).await?;
    let err = MySqlDriver::new()
        .connect(&config)
        .await
        .err()
        .expect("login should be refused");

    assert_eq!(err.kind(), "connection");
    assert!(
        err.to_string().contains("Access denied"),
        "unexpected error: {err}"
    );
    Ok(())
}

#[tokio::test]
async fn test_connect_to_closed_port_fails_fast() -> Result<()> {
    let mut config = ConnectionConfig::new_mysql("127.0.0.1", 1, "test", "root");
    config.connect_timeout = Duration::from_secs(2);

    let err = MySqlDriver::new()
        .connect(&config)
        .await
        .err()
        .expect("nothing listens on port 1");
    assert!(matches!(err.kind(), "connection" | "timeout"), "{err}");
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_handshake_metadata() -> Result<()> {
    let conn = test_connection().await?;

    let info = conn.server_info();
    assert_eq!(info.product_name, "MySQL");
    assert!(!info.version.is_empty());
    assert!(info.connection_id > 0);

    let version = conn.query("SELECT VERSION() as version", &[]).await?;
    let reported = version.scalar("version").map(|v| v.to_string()).unwrap_or_default();
    assert!(
        reported.starts_with(&info.version),
        "{reported} vs {}",
        info.version
    );

    conn.close().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_current_database() -> Result<()> {
    let conn = test_connection().await?;
    let result = conn.query("SELECT DATABASE() as db", &[]).await?;
    assert_eq!(result.scalar("db").map(|v| v.to_string()).as_deref(), Some("test"));
    conn.close().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_ping_and_idempotent_close() -> Result<()> {
    let conn = test_connection().await?;

    conn.ping().await?;
    conn.close().await?;
    assert!(conn.is_closed());
    conn.close().await?;

    let err = conn.query("SELECT 1", &[]).await.err().expect("closed");
    assert_eq!(err.kind(), "connection");
    assert!(conn.ping().await.is_err());
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_query_error_keeps_connection_usable() -> Result<()> {
    let conn = test_connection().await?;

    let err = conn
        .query("SELECT * FROM no_such_table", &[])
        .await
        .err()
        .expect("table does not exist");
    assert_eq!(err.kind(), "query");

    let result = conn.query("SELECT 1", &[]).await?;
    assert_eq!(result.row_count(), 1);

    conn.close().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_each_connection_is_its_own_session() -> Result<()> {
    let first = test_connection().await?;
    let second = test_connection().await?;

    assert_ne!(
        first.server_info().connection_id,
        second.server_info().connection_id
    );

    first.close().await?;
    second.close().await?;
    Ok(())
}
