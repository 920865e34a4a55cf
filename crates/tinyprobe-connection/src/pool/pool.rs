//! Connection pool implementation

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tinyprobe_core::{Connection, ProbeError, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use super::config::PoolConfig;
use super::factory::ConnectionFactory;
use super::stats::PoolStats;

struct IdleConnection {
    connection: Arc<dyn Connection>,
    created_at: Instant,
    idle_since: Instant,
}

/// A bounded pool of database connections
///
/// Borrowed connections go back to the pool when their [`PooledConnection`]
/// guard is dropped. Connections beyond the idle cap are closed instead.
pub struct ConnectionPool {
    config: PoolConfig,
    factory: Arc<dyn ConnectionFactory>,
    idle: Mutex<VecDeque<IdleConnection>>,
    /// One permit per connection that may be open
    semaphore: Arc<Semaphore>,
    active_count: AtomicUsize,
    waiting_count: AtomicUsize,
    created: AtomicU64,
    max_idle_closed: AtomicU64,
    max_lifetime_closed: AtomicU64,
    idle_timeout_closed: AtomicU64,
    /// Closes started from the synchronous return path
    retiring: Mutex<Vec<Retiring>>,
    closed: AtomicBool,
}

/// A surplus connection on its way out
enum Retiring {
    Closing(JoinHandle<()>),
    /// Returned outside a runtime; closed by [`ConnectionPool::close`]
    Pending(Arc<dyn Connection>),
}

impl ConnectionPool {
    /// Create a new connection pool with the given configuration and factory
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_size()));
        Self {
            config,
            factory: Arc::new(factory),
            idle: Mutex::new(VecDeque::new()),
            semaphore,
            active_count: AtomicUsize::new(0),
            waiting_count: AtomicUsize::new(0),
            created: AtomicU64::new(0),
            max_idle_closed: AtomicU64::new(0),
            max_lifetime_closed: AtomicU64::new(0),
            idle_timeout_closed: AtomicU64::new(0),
            retiring: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Borrow a connection.
    ///
    /// Reuses an idle connection when one is still valid, opens a new one
    /// while under `max_size`, and otherwise waits up to the acquire timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProbeError::Connection("pool is closed".into()));
        }

        self.waiting_count.fetch_add(1, Ordering::SeqCst);
        let result = tokio::time::timeout(self.config.acquire_timeout(), self.acquire()).await;
        self.waiting_count.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(conn) => conn,
            Err(_) => Err(ProbeError::Timeout(format!(
                "Timed out waiting for connection (timeout: {:?})",
                self.config.acquire_timeout()
            ))),
        }
    }

    async fn acquire(&self) -> Result<PooledConnection<'_>> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProbeError::Connection("pool is closed".into()))?;

        let (connection, created_at) = match self.try_get_idle().await {
            Some(reused) => reused,
            None => {
                let connection = self.factory.create().await?;
                self.created.fetch_add(1, Ordering::SeqCst);
                (connection, Instant::now())
            }
        };

        self.active_count.fetch_add(1, Ordering::SeqCst);
        Ok(PooledConnection {
            connection,
            created_at,
            pool: self,
            _permit: permit,
        })
    }

    /// Pop idle connections until one passes the lifetime, idle-time and
    /// validity checks
    async fn try_get_idle(&self) -> Option<(Arc<dyn Connection>, Instant)> {
        loop {
            let candidate = { self.idle.lock().pop_front() }?;

            if self.outlived(candidate.created_at) {
                self.max_lifetime_closed.fetch_add(1, Ordering::SeqCst);
                let _ = candidate.connection.close().await;
                continue;
            }

            if candidate.idle_since.elapsed() > self.config.idle_timeout() {
                self.idle_timeout_closed.fetch_add(1, Ordering::SeqCst);
                let _ = candidate.connection.close().await;
                continue;
            }

            if !self.factory.validate(&*candidate.connection).await {
                let _ = candidate.connection.close().await;
                continue;
            }

            return Some((candidate.connection, candidate.created_at));
        }
    }

    fn outlived(&self, created_at: Instant) -> bool {
        self.config
            .max_lifetime()
            .is_some_and(|max| created_at.elapsed() > max)
    }

    fn return_connection(&self, connection: Arc<dyn Connection>, created_at: Instant) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);

        if connection.is_closed() {
            return;
        }
        if self.closed.load(Ordering::SeqCst) {
            self.retire(connection);
            return;
        }
        if self.outlived(created_at) {
            self.max_lifetime_closed.fetch_add(1, Ordering::SeqCst);
            self.retire(connection);
            return;
        }

        let mut idle = self.idle.lock();
        if idle.len() >= self.config.max_idle() {
            drop(idle);
            self.max_idle_closed.fetch_add(1, Ordering::SeqCst);
            self.retire(connection);
            return;
        }
        idle.push_back(IdleConnection {
            connection,
            created_at,
            idle_since: Instant::now(),
        });
    }

    /// Start closing a connection the pool will not keep
    fn retire(&self, connection: Arc<dyn Connection>) {
        let entry = match tokio::runtime::Handle::try_current() {
            Ok(handle) => Retiring::Closing(handle.spawn(async move {
                if let Err(e) = connection.close().await {
                    tracing::debug!(error = %e, "closing surplus connection failed");
                }
            })),
            Err(_) => Retiring::Pending(connection),
        };

        let mut retiring = self.retiring.lock();
        retiring.retain(|r| !matches!(r, Retiring::Closing(h) if h.is_finished()));
        retiring.push(entry);
    }

    /// Wait for every surplus connection handed to [`Self::retire`] to close
    async fn finish_retiring(&self) {
        let retiring: Vec<_> = { self.retiring.lock().drain(..).collect() };
        for entry in retiring {
            match entry {
                Retiring::Closing(task) => {
                    if let Err(e) = task.await {
                        tracing::debug!(error = %e, "surplus close task failed");
                    }
                }
                Retiring::Pending(connection) => {
                    if let Err(e) = connection.close().await {
                        tracing::debug!(error = %e, "closing surplus connection failed");
                    }
                }
            }
        }
    }

    /// Open connections until `min_size` are idle
    pub async fn warm_up(&self) -> Result<()> {
        let target = self.config.min_size().min(self.config.max_idle());
        loop {
            let idle_now = self.idle.lock().len();
            if idle_now >= target {
                return Ok(());
            }
            let connection = self.factory.create().await?;
            self.created.fetch_add(1, Ordering::SeqCst);
            let now = Instant::now();
            self.idle.lock().push_back(IdleConnection {
                connection,
                created_at: now,
                idle_since: now,
            });
        }
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let idle = self.idle.lock().len();
        let active = self.active_count.load(Ordering::SeqCst);
        PoolStats {
            max_open: self.config.max_size(),
            total: idle + active,
            idle,
            active,
            waiting: self.waiting_count.load(Ordering::SeqCst),
            created: self.created.load(Ordering::SeqCst),
            max_idle_closed: self.max_idle_closed.load(Ordering::SeqCst),
            max_lifetime_closed: self.max_lifetime_closed.load(Ordering::SeqCst),
            idle_timeout_closed: self.idle_timeout_closed.load(Ordering::SeqCst),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Close all idle connections in the pool
    pub async fn close_idle(&self) {
        let connections: Vec<_> = { self.idle.lock().drain(..).collect() };

        for inner in connections {
            if let Err(e) = inner.connection.close().await {
                tracing::debug!(error = %e, "closing idle connection failed");
            }
        }
    }

    /// Refuse new borrows and close idle connections.
    ///
    /// Returns once every connection already handed back is closed, including
    /// those that were over the idle cap. Connections still borrowed are
    /// closed when they come back.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.semaphore.close();
        self.close_idle().await;
        self.finish_retiring().await;
    }
}

/// A connection borrowed from the pool
///
/// When dropped, the connection is automatically returned to the pool.
pub struct PooledConnection<'a> {
    connection: Arc<dyn Connection>,
    created_at: Instant,
    pool: &'a ConnectionPool,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection<'_> {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        self.pool
            .return_connection(self.connection.clone(), self.created_at);
    }
}

impl PooledConnection<'_> {
    /// Get the underlying connection as an Arc
    pub fn inner(&self) -> &Arc<dyn Connection> {
        &self.connection
    }
}
