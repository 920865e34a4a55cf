//! Tests for the health module

use super::*;
use std::time::Duration;

mod status_tests {
    use super::*;

    #[test]
    fn test_health_status_at_threshold_boundary() {
        assert_eq!(
            HealthStatus::from_latency(Duration::from_millis(100)),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from_latency(Duration::from_millis(101)),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::from_latency(Duration::from_millis(500)),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::from_latency(Duration::from_millis(501)),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = HealthThresholds::new(50, 200);
        assert_eq!(
            HealthStatus::from_latency_with_thresholds(Duration::from_millis(30), &thresholds),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from_latency_with_thresholds(Duration::from_millis(100), &thresholds),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::from_latency_with_thresholds(Duration::from_millis(300), &thresholds),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_degraded_threshold_never_below_healthy() {
        let thresholds = HealthThresholds::new(300, 100);
        assert_eq!(thresholds.degraded_threshold, Duration::from_millis(300));
    }

    #[test]
    fn test_status_serialization_and_display() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
        assert_eq!(HealthStatus::default(), HealthStatus::Healthy);
    }
}

mod ping_tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tinyprobe_core::{
        Connection, PreparedStatement, ProbeError, QueryResult, Result, StatementResult, Value,
    };

    enum PingBehavior {
        Answer,
        Fail,
        Hang,
    }

    struct PingConnection {
        behavior: PingBehavior,
        closed: AtomicBool,
    }

    impl PingConnection {
        fn new(behavior: PingBehavior) -> Self {
            Self {
                behavior,
                closed: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Connection for PingConnection {
        fn driver_name(&self) -> &str {
            "mock"
        }

        async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
            Ok(StatementResult::default())
        }

        async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
            Ok(QueryResult::empty())
        }

        async fn prepare(&self, _sql: &str) -> Result<Box<dyn PreparedStatement>> {
            Err(ProbeError::NotSupported("mock".into()))
        }

        async fn ping(&self) -> Result<()> {
            match self.behavior {
                PingBehavior::Answer => Ok(()),
                PingBehavior::Fail => Err(ProbeError::Connection("server has gone away".into())),
                PingBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }

        async fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_ping_answers() {
        let conn = PingConnection::new(PingBehavior::Answer);
        let latency = ping_database(&conn, Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(HealthStatus::from_latency(latency), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_ping_on_closed_connection() {
        let conn = PingConnection::new(PingBehavior::Answer);
        conn.close().await.unwrap();
        assert_eq!(
            ping_database(&conn, None).await,
            Err(PingError::ConnectionClosed)
        );
    }

    #[tokio::test]
    async fn test_failed_ping_carries_driver_message() {
        let conn = PingConnection::new(PingBehavior::Fail);
        let err = ping_database(&conn, None).await.unwrap_err();
        assert_eq!(
            err,
            PingError::Failed("Connection error: server has gone away".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_timeout() {
        let conn = PingConnection::new(PingBehavior::Hang);
        let err = ping_database(&conn, Some(Duration::from_secs(2)))
            .await
            .unwrap_err();
        assert_eq!(err, PingError::Timeout(Duration::from_secs(2)));
    }
}
