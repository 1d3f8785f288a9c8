// Shared real-time connection for booking notifications
// One connection per context, opened by the first consumer and closed by the last.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

// The transport that actually talks to the notification server
pub trait Connector: Send + Sync + 'static {
    type Connection: Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn connect(&self) -> Result<Self::Connection, Self::Error>;

    fn disconnect(&self, connection: &Self::Connection);
}

struct PoolState<T> {
    connection: Option<Arc<T>>,
    ref_count: usize,
}

struct PoolInner<C: Connector> {
    connector: C,
    state: Mutex<PoolState<C::Connection>>,
}

// One shared connection, reference-counted; clones of the pool share it
pub struct ConnectionPool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> ConnectionPool<C> {
    pub fn new(connector: C) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                connector,
                state: Mutex::new(PoolState {
                    connection: None,
                    ref_count: 0,
                }),
            }),
        }
    }

    pub fn acquire(&self) -> Result<PooledConnection<C>, C::Error> {
        let mut state = self.inner.state.lock();

        let connection = match state.connection.clone() {
            Some(connection) => connection,
            None => {
                let connection = Arc::new(self.inner.connector.connect()?);
                info!("Notification connection opened");
                state.connection = Some(Arc::clone(&connection));
                connection
            }
        };
        state.ref_count += 1;
        debug!(ref_count = state.ref_count, "Notification connection acquired");

        Ok(PooledConnection {
            pool: self.clone(),
            connection,
        })
    }

    pub fn ref_count(&self) -> usize {
        self.inner.state.lock().ref_count
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().connection.is_some()
    }

    fn release(&self) {
        let mut state = self.inner.state.lock();
        state.ref_count = state.ref_count.saturating_sub(1);
        debug!(ref_count = state.ref_count, "Notification connection released");

        if state.ref_count == 0 {
            if let Some(connection) = state.connection.take() {
                self.inner.connector.disconnect(&connection);
                info!("Notification connection closed");
            }
        }
    }
}

// Handle held by one consumer; dropping it releases the shared connection
pub struct PooledConnection<C: Connector> {
    pool: ConnectionPool<C>,
    connection: Arc<C::Connection>,
}

impl<C: Connector> PooledConnection<C> {
    pub fn connection(&self) -> &C::Connection {
        &self.connection
    }
}

impl<C: Connector> std::ops::Deref for PooledConnection<C> {
    type Target = C::Connection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        self.pool.release();
    }
}
