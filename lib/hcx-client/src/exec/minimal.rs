/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use hcx_http::body::{HttpBodyDecoder, HttpBodyEncodeWriter};
use hcx_http::{ContentLengthMode, HttpRequestHead, HttpResponseHead, MessageConstraints};
use http::{Uri, header};
use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};

use super::ClientExecChain;
use crate::conn::{ConnectionLease, ConnectionManager, ConnectionRequestError};
use crate::protocol::HttpProcessor;
use crate::route::{HttpHost, HttpRoute};
use crate::strategy::{ConnectionKeepAliveStrategy, ConnectionReuseStrategy};
use crate::{
    CancelToken, Cancellable, ClientContext, CloseableResponse, HttpExecError, ProtocolError,
    RequestConfig, RequestWrapper, ResponseBody,
};

/// Rewrite the request target to origin form, or to absolute form when the
/// request goes to a proxy without a tunnel.
fn rewrite_request_uri(
    request: &mut RequestWrapper,
    route: &HttpRoute,
) -> Result<(), ProtocolError> {
    let uri = request.request().uri();
    let path = uri
        .path_and_query()
        .map(|p| p.as_str())
        .filter(|p| !p.is_empty())
        .unwrap_or("/");

    let target = if route.proxy_host().is_some() && !route.is_tunnelled() {
        match (uri.scheme_str(), uri.authority()) {
            (Some(scheme), Some(authority)) => format!("{scheme}://{authority}{path}"),
            _ => {
                let host = request.target().unwrap_or(route.target_host());
                format!("{}://{}{path}", host.scheme(), host.to_host_string())
            }
        }
    } else {
        path.to_string()
    };

    let uri = Uri::from_str(&target).map_err(|_| ProtocolError::InvalidUri(target))?;
    request.request_mut().set_uri(uri);
    Ok(())
}

fn expects_continue(head: &HttpRequestHead) -> bool {
    head.headers
        .get(header::EXPECT)
        .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"100-continue"))
}

/// Wait for the go-ahead of a request sent with `Expect: 100-continue`.
///
/// Returns the final response if the server answered without a 100. If
/// nothing arrives within `wait` the body should be sent anyway.
async fn wait_for_continue<R>(
    reader: &mut R,
    constraints: &MessageConstraints,
    wait: Duration,
) -> Result<Option<HttpResponseHead>, HttpExecError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match tokio::time::timeout(wait, reader.fill_buf()).await {
            Ok(r) => {
                r?;
            }
            Err(_) => {
                debug!("no interim response within {wait:?}, sending request body");
                return Ok(None);
            }
        }
        let rsp = HttpResponseHead::parse(reader, constraints).await?;
        if rsp.code == 100 {
            return Ok(None);
        }
        if rsp.is_informational() && rsp.code != 101 {
            debug!("skipped interim response {} {}", rsp.code, rsp.reason);
            continue;
        }
        debug!("final response {} before request body was sent", rsp.code);
        return Ok(Some(rsp));
    }
}

/// The terminal stage: leases a connection, sends the request and reads the response head.
pub struct MinimalClientExec {
    manager: Arc<dyn ConnectionManager>,
    reuse_strategy: Arc<dyn ConnectionReuseStrategy>,
    keep_alive_strategy: Arc<dyn ConnectionKeepAliveStrategy>,
    processor: HttpProcessor,
}

impl MinimalClientExec {
    pub fn new(
        manager: Arc<dyn ConnectionManager>,
        reuse_strategy: Arc<dyn ConnectionReuseStrategy>,
        keep_alive_strategy: Arc<dyn ConnectionKeepAliveStrategy>,
    ) -> Self {
        MinimalClientExec {
            manager,
            reuse_strategy,
            keep_alive_strategy,
            processor: HttpProcessor::client_defaults(None),
        }
    }

    pub fn with_processor(mut self, processor: HttpProcessor) -> Self {
        self.processor = processor;
        self
    }

    async fn exchange(
        &self,
        route: &HttpRoute,
        request: &RequestWrapper,
        ctx: &mut ClientContext,
        lease: &mut ConnectionLease,
        config: &RequestConfig,
    ) -> Result<(HttpResponseHead, Option<HttpBodyDecoder>), HttpExecError> {
        let Some(conn) = lease.connection_mut() else {
            return Err(HttpExecError::Interrupted);
        };
        if !conn.is_open() {
            debug!("opening connection {} for route {route}", conn.id());
            self.manager
                .connect(conn, route, config.connect_timeout(), ctx)
                .await?;
            self.manager.route_complete(conn, route, ctx).await?;
        }
        conn.set_socket_timeout(config.socket_timeout());

        let target = HttpHost::from_uri(request.original().uri())
            .or_else(|| request.target().cloned())
            .unwrap_or_else(|| route.target_host().clone());
        ctx.set_target_host(target);
        ctx.set_route(route.clone());

        let req = request.request();
        let mut head =
            HttpRequestHead::new(req.method().clone(), req.uri().to_string(), req.version());
        head.headers = req.headers().clone();
        self.processor
            .process_request(&mut head, req.entity(), ctx)?;
        ctx.set_request_head(head.clone());

        let Some(io) = conn.io_mut() else {
            return Err(HttpExecError::Interrupted);
        };
        io.writer.write_all(&head.serialize()).await?;
        let constraints = config.message_constraints();
        let early_response = if req.entity().is_some() && expects_continue(&head) {
            io.writer.flush().await?;
            wait_for_continue(&mut io.reader, constraints, config.expect_continue_timeout())
                .await?
        } else {
            None
        };
        match req.entity() {
            Some(entity) if early_response.is_none() => {
                let mode = ContentLengthMode::for_outbound(&head.headers, false)
                    .map_err(ProtocolError::from)?;
                let mut body =
                    HttpBodyEncodeWriter::new(&mut io.writer, mode, config.chunk_fragment_size());
                if let Err(e) = entity.write_to(&mut body).await {
                    body.abandon();
                    return Err(e.into());
                }
                body.finish().await?;
            }
            Some(_) => debug!("request body not sent"),
            None => io.writer.flush().await?,
        }

        let body_skipped = early_response.is_some();
        let mut response = match early_response {
            Some(rsp) => rsp,
            None => loop {
                let rsp = HttpResponseHead::parse(&mut io.reader, constraints).await?;
                if rsp.is_informational() && rsp.code != 101 {
                    debug!("skipped interim response {} {}", rsp.code, rsp.reason);
                    continue;
                }
                break rsp;
            },
        };
        self.processor.process_response(&mut response, ctx)?;

        let mode = response
            .body_mode(&head.method)
            .map_err(ProtocolError::from)?;
        if !body_skipped && self.reuse_strategy.keep_alive(&response, ctx) {
            let valid_for = self.keep_alive_strategy.keep_alive_duration(&response, ctx);
            lease.set_valid_for(valid_for);
            lease.mark_reusable();
        } else {
            lease.mark_non_reusable();
        }

        let decoder = match mode {
            None | Some(ContentLengthMode::Fixed(0)) => None,
            Some(mode) => Some(HttpBodyDecoder::new(mode, constraints)),
        };
        Ok((response, decoder))
    }
}

#[async_trait]
impl ClientExecChain for MinimalClientExec {
    async fn execute(
        &self,
        route: &HttpRoute,
        request: &mut RequestWrapper,
        ctx: &mut ClientContext,
        cancel: Option<&CancelToken>,
    ) -> Result<CloseableResponse, HttpExecError> {
        rewrite_request_uri(request, route)?;

        if cancel.is_some_and(|t| t.is_aborted()) {
            return Err(HttpExecError::Aborted("request aborted"));
        }
        let conn_request = self.manager.request_connection(route);
        if let Some(token) = cancel {
            if token.is_aborted() {
                conn_request.cancel();
                return Err(HttpExecError::Aborted("request aborted"));
            }
            token.set_cancellable(conn_request.clone());
        }

        let config = ctx.request_config().clone();
        let conn = conn_request
            .get(config.connection_request_timeout())
            .await
            .map_err(|e| match e {
                ConnectionRequestError::Timeout => HttpExecError::ConnectionRequestTimeout,
                ConnectionRequestError::Cancelled => {
                    HttpExecError::Aborted("request aborted while waiting for connection")
                }
                ConnectionRequestError::Shutdown => HttpExecError::ManagerShutdown,
                ConnectionRequestError::Io(e) => e.into(),
            })?;

        let mut lease = ConnectionLease::new(self.manager.clone(), conn);
        if let Some(token) = cancel {
            if token.is_aborted() {
                lease.abort();
                return Err(HttpExecError::Aborted("request aborted"));
            }
            token.set_cancellable(lease.cancellable());
        }

        let exchange = AssertUnwindSafe(self.exchange(route, request, ctx, &mut lease, &config))
            .catch_unwind()
            .await;
        match exchange {
            Ok(Ok((head, Some(decoder)))) => Ok(CloseableResponse::new(
                head,
                ResponseBody::streaming(lease, decoder),
            )),
            Ok(Ok((head, None))) => {
                lease.release();
                Ok(CloseableResponse::new(head, ResponseBody::empty()))
            }
            Ok(Err(e)) => {
                lease.abort();
                if matches!(e, HttpExecError::Interrupted) && cancel.is_some_and(|t| t.is_aborted())
                {
                    Err(HttpExecError::Aborted("request aborted"))
                } else {
                    Err(e)
                }
            }
            Err(panic) => {
                lease.abort();
                warn!(
                    "panic while executing request on route {route}, shutting down connection manager"
                );
                self.manager.shutdown();
                std::panic::resume_unwind(panic)
            }
        }
    }
}
