/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, BufReader, ReadBuf};
use tokio::time::Sleep;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

pub type BoxAsyncRead = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxAsyncWrite = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Error)]
#[error("connection has been shut down")]
pub struct ConnectionShutdown;

pub(crate) fn connection_shutdown_error() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, ConnectionShutdown)
}

/// Whether an io error was caused by [`HttpConnection::shutdown`].
pub fn is_connection_shutdown(e: &io::Error) -> bool {
    e.get_ref().is_some_and(|inner| inner.is::<ConnectionShutdown>())
}

/// Shared by the read and write half, wakes pending io on shutdown or timeout.
struct IoGuard {
    shutdown: CancellationToken,
    shutdown_wait: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    timeout: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl IoGuard {
    fn new(shutdown: CancellationToken, timeout: Option<Duration>) -> Self {
        IoGuard {
            shutdown,
            shutdown_wait: None,
            timeout,
            sleep: None,
        }
    }

    fn check(&self) -> io::Result<()> {
        if self.shutdown.is_cancelled() {
            Err(connection_shutdown_error())
        } else {
            Ok(())
        }
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
        self.sleep = None;
    }

    #[inline]
    fn progress(&mut self) {
        self.sleep = None;
    }

    /// Register wakeups while the inner io is pending.
    fn poll_stalled(&mut self, cx: &mut Context<'_>, what: &str) -> Poll<io::Error> {
        let shutdown = &self.shutdown;
        let wait = self
            .shutdown_wait
            .get_or_insert_with(|| Box::pin(shutdown.clone().cancelled_owned()));
        if wait.as_mut().poll(cx).is_ready() {
            return Poll::Ready(connection_shutdown_error());
        }

        if let Some(timeout) = self.timeout {
            let sleep = self
                .sleep
                .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
            if sleep.as_mut().poll(cx).is_ready() {
                self.sleep = None;
                return Poll::Ready(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("socket {what} timed out after {timeout:?}"),
                ));
            }
        }
        Poll::Pending
    }
}

pub struct GuardedReader {
    inner: BoxAsyncRead,
    guard: IoGuard,
}

impl AsyncRead for GuardedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        me.guard.check()?;
        match Pin::new(&mut me.inner).poll_read(cx, buf) {
            Poll::Ready(r) => {
                me.guard.progress();
                Poll::Ready(r)
            }
            Poll::Pending => {
                let e = ready!(me.guard.poll_stalled(cx, "read"));
                Poll::Ready(Err(e))
            }
        }
    }
}

pub struct GuardedWriter {
    inner: BoxAsyncWrite,
    guard: IoGuard,
}

impl GuardedWriter {
    fn poll_guarded<T>(
        &mut self,
        cx: &mut Context<'_>,
        f: impl FnOnce(Pin<&mut BoxAsyncWrite>, &mut Context<'_>) -> Poll<io::Result<T>>,
    ) -> Poll<io::Result<T>> {
        self.guard.check()?;
        match f(Pin::new(&mut self.inner), cx) {
            Poll::Ready(r) => {
                self.guard.progress();
                Poll::Ready(r)
            }
            Poll::Pending => {
                let e = ready!(self.guard.poll_stalled(cx, "write"));
                Poll::Ready(Err(e))
            }
        }
    }
}

impl AsyncWrite for GuardedWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut()
            .poll_guarded(cx, |w, cx| w.poll_write(cx, buf))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().poll_guarded(cx, |w, cx| w.poll_flush(cx))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().poll_guarded(cx, |w, cx| w.poll_shutdown(cx))
    }
}

/// The bound io of an open connection.
pub struct ConnectionIo {
    pub reader: BufReader<GuardedReader>,
    pub writer: GuardedWriter,
}

/// A client connection as handed out by a connection manager.
///
/// It starts unbound and is opened by the manager binding a transport to it.
/// [`HttpConnection::shutdown`] may be called from any thread through the
/// token returned by [`HttpConnection::shutdown_handle`], all pending and
/// later io on it then fails.
pub struct HttpConnection {
    id: u64,
    io: Option<ConnectionIo>,
    shutdown: CancellationToken,
    socket_timeout: Option<Duration>,
}

impl HttpConnection {
    pub fn new(id: u64) -> Self {
        HttpConnection {
            id,
            io: None,
            shutdown: CancellationToken::new(),
            socket_timeout: None,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bind<R, W>(&mut self, reader: R, writer: W)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader = GuardedReader {
            inner: Box::new(reader),
            guard: IoGuard::new(self.shutdown.clone(), self.socket_timeout),
        };
        let writer = GuardedWriter {
            inner: Box::new(writer),
            guard: IoGuard::new(self.shutdown.clone(), self.socket_timeout),
        };
        self.io = Some(ConnectionIo {
            reader: BufReader::new(reader),
            writer,
        });
    }

    pub fn is_open(&self) -> bool {
        self.io.is_some() && !self.shutdown.is_cancelled()
    }

    /// Fail all io on this connection, without waiting for anything.
    ///
    /// A connection once shut down is never open again.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Drop the bound transport.
    pub fn close(&mut self) {
        self.io = None;
    }

    #[inline]
    pub fn socket_timeout(&self) -> Option<Duration> {
        self.socket_timeout
    }

    pub fn set_socket_timeout(&mut self, timeout: Option<Duration>) {
        self.socket_timeout = timeout;
        if let Some(io) = &mut self.io {
            io.reader.get_mut().guard.set_timeout(timeout);
            io.writer.guard.set_timeout(timeout);
        }
    }

    #[inline]
    pub fn io_mut(&mut self) -> Option<&mut ConnectionIo> {
        self.io.as_mut()
    }
}
