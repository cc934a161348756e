/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::HttpConnection;
use crate::route::HttpRoute;
use crate::{Cancellable, ClientContext};

#[derive(Debug, Error)]
pub enum ConnectionRequestError {
    #[error("timed out waiting for a connection")]
    Timeout,
    #[error("connection request cancelled")]
    Cancelled,
    #[error("connection manager has been shut down")]
    Shutdown,
    #[error("io failed: {0:?}")]
    Io(#[from] io::Error),
}

/// A pending lease of a connection for one route.
#[async_trait]
pub trait ConnectionRequest: Cancellable {
    /// Wait for the connection, at most `timeout` if set.
    ///
    /// Fails with [`ConnectionRequestError::Cancelled`] once cancelled.
    async fn get(&self, timeout: Option<Duration>)
    -> Result<HttpConnection, ConnectionRequestError>;
}

/// Pool of client connections.
///
/// Every connection obtained from a request must be handed back by exactly one
/// call to [`ConnectionManager::release`] or [`ConnectionManager::abort`].
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    fn request_connection(&self, route: &HttpRoute) -> Arc<dyn ConnectionRequest>;

    /// Open the transport to the first hop of `route` and bind it to `conn`.
    async fn connect(
        &self,
        conn: &mut HttpConnection,
        route: &HttpRoute,
        timeout: Option<Duration>,
        ctx: &ClientContext,
    ) -> io::Result<()>;

    /// Complete the remaining hops, a no-op for direct routes.
    async fn route_complete(
        &self,
        conn: &mut HttpConnection,
        route: &HttpRoute,
        ctx: &ClientContext,
    ) -> io::Result<()>;

    /// Return an open connection to the pool, reusable until `valid_for` elapses.
    fn release(&self, conn: HttpConnection, valid_for: Option<Duration>);

    /// Return a connection that must not be reused.
    fn abort(&self, conn: HttpConnection);

    fn shutdown(&self);
}
