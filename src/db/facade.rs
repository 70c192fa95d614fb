//! Fail-fast pool facade.
//!
//! [`ResilientPool`] wraps any [`ConnectionPool`] and consults the shared
//! availability flag before every acquisition. While the flag is down the call
//! returns [`DbError::Unavailable`] without touching the pool, so request
//! handlers never wait out the pool's connection timeout during an outage.
//! When the flag is up, the delegate's own errors pass through unchanged.

use async_trait::async_trait;
use metrics::counter;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::db::availability::Availability;
use crate::db::error::DbError;
use crate::db::probe::ProbeHandle;

/// Pool saturation snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub active: u32,
    pub idle: u32,
    pub total: u32,
    /// Facade callers that found no idle connection and are still in
    /// `acquire`. Includes callers waiting on a new connection to open,
    /// not only those queued behind a full pool.
    pub waiting: u32,
}

/// Connection acquisition contract shared by the real pool and the facade.
#[async_trait]
pub trait ConnectionPool: Send + Sync + 'static {
    type Connection: Send;

    async fn acquire(&self) -> Result<Self::Connection, DbError>;

    fn stats(&self) -> PoolStats;

    async fn close(&self);
}

pub struct ResilientPool<P: ConnectionPool> {
    inner: P,
    availability: Arc<Availability>,
    waiting: AtomicUsize,
    probe: Mutex<Option<ProbeHandle>>,
}

impl<P: ConnectionPool> ResilientPool<P> {
    pub fn new(inner: P, availability: Arc<Availability>) -> Self {
        Self {
            inner,
            availability,
            waiting: AtomicUsize::new(0),
            probe: Mutex::new(None),
        }
    }

    /// Hand over the probe so [`close`](Self::close) can stop it.
    pub fn attach_probe(&self, handle: ProbeHandle) {
        *self.probe.lock() = Some(handle);
    }

    pub fn availability(&self) -> &Arc<Availability> {
        &self.availability
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn is_available(&self) -> bool {
        self.availability.is_available()
    }

    pub async fn acquire(&self) -> Result<P::Connection, DbError> {
        if !self.availability.is_available() {
            counter!("bank_db_acquire_rejected_total").increment(1);
            return Err(DbError::Unavailable);
        }

        let _waiting =
            (self.inner.stats().idle == 0).then(|| WaitingGuard::enter(&self.waiting));
        self.inner.acquire().await
    }

    /// Delegate stats with the facade's own waiter count.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            waiting: self.waiting.load(Ordering::Relaxed) as u32,
            ..self.inner.stats()
        }
    }

    /// Stop the probe, then close the delegate.
    pub async fn close(&self) {
        let probe = self.probe.lock().take();
        if let Some(probe) = probe {
            probe.stop().await;
        }
        self.inner.close().await;
        tracing::info!("Database pool closed");
    }
}

#[async_trait]
impl<P: ConnectionPool> ConnectionPool for ResilientPool<P> {
    type Connection = P::Connection;

    async fn acquire(&self) -> Result<Self::Connection, DbError> {
        ResilientPool::acquire(self).await
    }

    fn stats(&self) -> PoolStats {
        ResilientPool::stats(self)
    }

    async fn close(&self) {
        ResilientPool::close(self).await
    }
}

struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
