/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;
use tokio_util::sync::CancellationToken;

use super::{ConnectionManager, HttpConnection};
use crate::Cancellable;

#[derive(Default)]
struct LeaseState {
    reusable: bool,
    valid_for: Option<Duration>,
    settled: bool,
    cancelled: bool,
}

struct LeaseShared {
    state: Mutex<LeaseState>,
    shutdown: CancellationToken,
}

impl LeaseShared {
    fn lock(&self) -> MutexGuard<'_, LeaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Cancellable for LeaseShared {
    fn cancel(&self) -> bool {
        {
            let mut state = self.lock();
            if state.settled || state.cancelled {
                return false;
            }
            state.cancelled = true;
            state.reusable = false;
        }
        self.shutdown.cancel();
        true
    }
}

/// Exclusive use of a leased connection until it is released or aborted.
///
/// Exactly one of [`ConnectionLease::release`] or [`ConnectionLease::abort`]
/// takes effect, later calls are no-ops. A lease dropped unsettled is aborted.
pub struct ConnectionLease {
    manager: Arc<dyn ConnectionManager>,
    connection: Option<HttpConnection>,
    shared: Arc<LeaseShared>,
}

impl ConnectionLease {
    pub fn new(manager: Arc<dyn ConnectionManager>, connection: HttpConnection) -> Self {
        let shared = LeaseShared {
            state: Mutex::new(LeaseState::default()),
            shutdown: connection.shutdown_handle(),
        };
        ConnectionLease {
            manager,
            connection: Some(connection),
            shared: Arc::new(shared),
        }
    }

    /// The connection, `None` once settled.
    #[inline]
    pub fn connection(&self) -> Option<&HttpConnection> {
        self.connection.as_ref()
    }

    #[inline]
    pub fn connection_mut(&mut self) -> Option<&mut HttpConnection> {
        self.connection.as_mut()
    }

    /// Handle shutting down the connection from another thread.
    pub fn cancellable(&self) -> Arc<dyn Cancellable> {
        self.shared.clone()
    }

    pub fn mark_reusable(&self) {
        let mut state = self.shared.lock();
        if !state.cancelled {
            state.reusable = true;
        }
    }

    pub fn mark_non_reusable(&self) {
        self.shared.lock().reusable = false;
    }

    pub fn is_reusable(&self) -> bool {
        self.shared.lock().reusable
    }

    pub fn set_valid_for(&self, valid_for: Option<Duration>) {
        self.shared.lock().valid_for = valid_for;
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.connection.is_none()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.lock().cancelled
    }

    /// Hand the connection back to the manager, for reuse if it is still open
    /// and marked reusable, otherwise the same as [`ConnectionLease::abort`].
    pub fn release(&mut self) -> bool {
        let Some(conn) = self.connection.take() else {
            return false;
        };
        let (reuse, valid_for) = {
            let mut state = self.shared.lock();
            state.settled = true;
            (
                state.reusable && !state.cancelled && conn.is_open(),
                state.valid_for,
            )
        };
        if reuse {
            debug!("releasing connection {} for reuse", conn.id());
            self.manager.release(conn, valid_for);
        } else {
            debug!("closing non-reusable connection {}", conn.id());
            conn.shutdown();
            self.manager.abort(conn);
        }
        true
    }

    /// Shut down the connection and hand it back for disposal.
    pub fn abort(&mut self) -> bool {
        let Some(conn) = self.connection.take() else {
            return false;
        };
        self.shared.lock().settled = true;
        debug!("aborting connection {}", conn.id());
        conn.shutdown();
        self.manager.abort(conn);
        true
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.abort();
    }
}
