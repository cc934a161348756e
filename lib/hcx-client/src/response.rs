/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use hcx_http::HttpResponseHead;
use hcx_http::body::HttpBodyDecoder;
use http::{HeaderMap, Version};
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::HttpExecError;
use crate::conn::ConnectionLease;

enum BodyState {
    Empty,
    Streaming {
        lease: ConnectionLease,
        decoder: HttpBodyDecoder,
    },
    Done {
        trailers: Option<HeaderMap>,
    },
    Closed,
}

/// Body of a response, reading it to the end releases the connection.
///
/// A body closed before the end, or failing while read, aborts the connection.
pub struct ResponseBody {
    state: BodyState,
}

impl ResponseBody {
    pub(crate) fn empty() -> Self {
        ResponseBody {
            state: BodyState::Empty,
        }
    }

    pub(crate) fn streaming(lease: ConnectionLease, decoder: HttpBodyDecoder) -> Self {
        ResponseBody {
            state: BodyState::Streaming { lease, decoder },
        }
    }

    /// Whether the connection is still held by this body.
    pub fn is_streaming(&self) -> bool {
        matches!(self.state, BodyState::Streaming { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, BodyState::Empty | BodyState::Done { .. })
    }

    /// Trailer fields of a chunked body, available once it is read to the end.
    pub fn trailers(&self) -> Option<&HeaderMap> {
        match &self.state {
            BodyState::Done { trailers } => trailers.as_ref(),
            _ => None,
        }
    }

    /// Read and discard what is left of the body.
    pub async fn drain(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 4096];
        let mut total = 0u64;
        loop {
            let nr = self.read(&mut buf).await?;
            if nr == 0 {
                return Ok(total);
            }
            total += nr as u64;
        }
    }

    /// Stop reading, the connection is aborted if the body has not been read to the end.
    pub fn close(&mut self) {
        if let BodyState::Streaming { lease, .. } = &mut self.state {
            debug!("response body closed before the end");
            lease.abort();
            self.state = BodyState::Closed;
        }
    }
}

impl AsyncRead for ResponseBody {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        let BodyState::Streaming { lease, decoder } = &mut me.state else {
            return match me.state {
                BodyState::Closed => Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "read from closed response body",
                ))),
                _ => Poll::Ready(Ok(())),
            };
        };

        let Some(io) = lease.connection_mut().and_then(|c| c.io_mut()) else {
            lease.abort();
            me.state = BodyState::Closed;
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection of response body is gone",
            )));
        };
        match decoder.poll_decode(cx, Pin::new(&mut io.reader), buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => {
                if decoder.finished() {
                    let trailers = decoder.trailers().cloned();
                    lease.release();
                    me.state = BodyState::Done { trailers };
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => {
                lease.abort();
                me.state = BodyState::Closed;
                Poll::Ready(Err(e))
            }
        }
    }
}

/// A response whose body may still hold the connection.
pub struct CloseableResponse {
    head: HttpResponseHead,
    body: ResponseBody,
}

impl CloseableResponse {
    pub(crate) fn new(head: HttpResponseHead, body: ResponseBody) -> Self {
        CloseableResponse { head, body }
    }

    #[inline]
    pub fn head(&self) -> &HttpResponseHead {
        &self.head
    }

    #[inline]
    pub fn code(&self) -> u16 {
        self.head.code
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.head.version
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    #[inline]
    pub fn body(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    pub fn into_parts(self) -> (HttpResponseHead, ResponseBody) {
        (self.head, self.body)
    }

    pub async fn drain(&mut self) -> io::Result<u64> {
        self.body.drain().await
    }

    pub fn close(&mut self) {
        self.body.close();
    }

    /// Read the whole body of a successful response.
    ///
    /// A status of 300 or above is an error, the body is drained first so the
    /// connection can be reused.
    pub async fn into_bytes(mut self, limit: usize) -> Result<Bytes, HttpExecError> {
        if self.head.code >= 300 {
            if let Err(e) = self.body.drain().await {
                debug!("failed to drain body of error response: {e}");
            }
            return Err(HttpExecError::UnexpectedStatus(
                self.head.code,
                self.head.reason,
            ));
        }

        let mut data = BytesMut::new();
        let mut buf = [0u8; 4096];
        loop {
            let nr = self.body.read(&mut buf).await?;
            if nr == 0 {
                return Ok(data.freeze());
            }
            if data.len() + nr > limit {
                self.body.close();
                return Err(HttpExecError::BodyTooLarge(limit));
            }
            data.extend_from_slice(&buf[..nr]);
        }
    }

    pub async fn into_string(self, limit: usize) -> Result<String, HttpExecError> {
        let data = self.into_bytes(limit).await?;
        String::from_utf8(data.to_vec())
            .map_err(|e| HttpExecError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}
