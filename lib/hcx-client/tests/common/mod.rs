/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWrite, DuplexStream};
use tokio_util::sync::CancellationToken;

use hcx_client::conn::{
    ConnectionManager, ConnectionRequest, ConnectionRequestError, HttpConnection,
};
use hcx_client::route::HttpRoute;
use hcx_client::{Cancellable, ClientContext, CloseableResponse, HttpClientError};

/// What the peer of one connection sends.
pub enum Script {
    /// Send the bytes, then close.
    Respond(&'static [u8]),
    /// Send the bytes, then stay silent.
    Stall(&'static [u8]),
}

#[derive(Clone, Default)]
pub struct RecordingWriter(Arc<Mutex<Vec<u8>>>);

impl RecordingWriter {
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl AsyncWrite for RecordingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[derive(Default)]
pub struct Stats {
    pub requests: AtomicUsize,
    pub connects: AtomicUsize,
    pub released: AtomicUsize,
    pub aborted: AtomicUsize,
    pub cancels: Arc<AtomicUsize>,
    pub shutdown: AtomicBool,
}

/// A connection manager serving scripted peers, one script per new connection.
#[derive(Default)]
pub struct MockManager {
    scripts: Mutex<VecDeque<Script>>,
    idle: Mutex<Vec<(HttpRoute, HttpConnection)>>,
    leased: Mutex<Vec<(u64, HttpRoute)>>,
    silent_peers: Mutex<Vec<DuplexStream>>,
    next_id: AtomicU64,
    block_requests: AtomicBool,
    pub written: RecordingWriter,
    pub stats: Stats,
}

impl MockManager {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        let manager = MockManager::default();
        manager.scripts.lock().unwrap().extend(scripts);
        Arc::new(manager)
    }

    /// Connection requests never complete until cancelled or timed out.
    pub fn blocking() -> Arc<Self> {
        let manager = MockManager::default();
        manager.block_requests.store(true, Ordering::SeqCst);
        Arc::new(manager)
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().len()
    }

    pub fn leased_count(&self) -> usize {
        self.leased.lock().unwrap().len()
    }

    pub fn requests(&self) -> usize {
        self.stats.requests.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.stats.connects.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.stats.released.load(Ordering::SeqCst)
    }

    pub fn aborted(&self) -> usize {
        self.stats.aborted.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.stats.cancels.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        self.stats.shutdown.load(Ordering::SeqCst)
    }

    pub fn written_text(&self) -> String {
        String::from_utf8(self.written.take()).unwrap()
    }
}

struct MockConnRequest {
    connection: Mutex<Option<HttpConnection>>,
    blocking: bool,
    cancelled: AtomicBool,
    token: CancellationToken,
    cancels: Arc<AtomicUsize>,
}

impl Cancellable for MockConnRequest {
    fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
        true
    }
}

#[async_trait]
impl ConnectionRequest for MockConnRequest {
    async fn get(
        &self,
        timeout: Option<Duration>,
    ) -> Result<HttpConnection, ConnectionRequestError> {
        if self.blocking {
            let wait = self.token.cancelled();
            match timeout {
                Some(timeout) => {
                    if tokio::time::timeout(timeout, wait).await.is_err() {
                        return Err(ConnectionRequestError::Timeout);
                    }
                }
                None => wait.await,
            }
            return Err(ConnectionRequestError::Cancelled);
        }
        if self.token.is_cancelled() {
            return Err(ConnectionRequestError::Cancelled);
        }
        self.connection
            .lock()
            .unwrap()
            .take()
            .ok_or(ConnectionRequestError::Shutdown)
    }
}

#[async_trait]
impl ConnectionManager for MockManager {
    fn request_connection(&self, route: &HttpRoute) -> Arc<dyn ConnectionRequest> {
        self.stats.requests.fetch_add(1, Ordering::SeqCst);
        let blocking = self.block_requests.load(Ordering::SeqCst);

        let connection = if blocking {
            None
        } else {
            let pooled = {
                let mut idle = self.idle.lock().unwrap();
                idle.iter()
                    .position(|(r, _)| r == route)
                    .map(|i| idle.remove(i).1)
            };
            let conn = pooled.unwrap_or_else(|| {
                HttpConnection::new(self.next_id.fetch_add(1, Ordering::SeqCst))
            });
            self.leased.lock().unwrap().push((conn.id(), route.clone()));
            Some(conn)
        };

        Arc::new(MockConnRequest {
            connection: Mutex::new(connection),
            blocking,
            cancelled: AtomicBool::new(false),
            token: CancellationToken::new(),
            cancels: self.stats.cancels.clone(),
        })
    }

    async fn connect(
        &self,
        conn: &mut HttpConnection,
        _route: &HttpRoute,
        _timeout: Option<Duration>,
        _ctx: &ClientContext,
    ) -> io::Result<()> {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        let writer = self.written.clone();
        match script {
            Some(Script::Respond(data)) => conn.bind(data, writer),
            Some(Script::Stall(data)) => {
                let (client, server) = tokio::io::duplex(64);
                self.silent_peers.lock().unwrap().push(server);
                conn.bind(data.chain(client), writer);
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "no script left",
                ));
            }
        }
        Ok(())
    }

    async fn route_complete(
        &self,
        _conn: &mut HttpConnection,
        _route: &HttpRoute,
        _ctx: &ClientContext,
    ) -> io::Result<()> {
        Ok(())
    }

    fn release(&self, conn: HttpConnection, _valid_for: Option<Duration>) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        let route = {
            let mut leased = self.leased.lock().unwrap();
            leased
                .iter()
                .position(|(id, _)| *id == conn.id())
                .map(|i| leased.remove(i).1)
        };
        if let Some(route) = route {
            self.idle.lock().unwrap().push((route, conn));
        }
    }

    fn abort(&self, conn: HttpConnection) {
        self.stats.aborted.fetch_add(1, Ordering::SeqCst);
        self.leased.lock().unwrap().retain(|(id, _)| *id != conn.id());
    }

    fn shutdown(&self) {
        self.stats.shutdown.store(true, Ordering::SeqCst);
        for (_, conn) in self.idle.lock().unwrap().drain(..) {
            conn.shutdown();
        }
    }
}

pub fn expect_err(r: Result<CloseableResponse, HttpClientError>) -> HttpClientError {
    match r {
        Ok(rsp) => panic!("expected an error, got response {}", rsp.code()),
        Err(e) => e,
    }
}
