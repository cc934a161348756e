/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use hcx_http::body::{BodyWriteError, decode_error};
use hcx_http::{FramingError, HttpResponseParseError};
use thiserror::Error;

use crate::conn::is_connection_shutdown;
use crate::request::EntityWriteError;
use crate::route::{HttpRoute, RoutePlanError};

/// A message violated HTTP semantics, the connection should not be trusted afterwards.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid response head: {0}")]
    InvalidResponseHead(HttpResponseParseError),
    #[error("invalid message framing: {0}")]
    InvalidFraming(#[from] FramingError),
    #[error("invalid request body: {0}")]
    InvalidRequestBody(BodyWriteError),
    #[error("invalid response body: {0}")]
    InvalidResponseBody(io::Error),
    #[error("invalid request uri {0}")]
    InvalidUri(String),
    #[error("route planning failed: {0}")]
    RoutePlanFailed(#[from] RoutePlanError),
    #[error("no Location header in redirect response {0}")]
    MissingLocation(u16),
    #[error("invalid redirect location {0}: {1}")]
    InvalidRedirectLocation(String, String),
    #[error("relative redirect location {0} not allowed")]
    RelativeRedirect(String),
    #[error("circular redirect to {0}")]
    CircularRedirect(String),
    #[error("redirect uri {0} does not specify a target host")]
    RedirectWithoutHost(String),
    #[error("{0}")]
    Interceptor(String),
}

#[derive(Debug, Error)]
pub enum HttpExecError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("the target server failed to respond")]
    NoResponse,
    #[error("request aborted: {0}")]
    Aborted(&'static str),
    #[error("maximum redirects ({0}) exceeded")]
    RedirectLimit(usize),
    #[error("connection has been shut down")]
    Interrupted,
    #[error("timeout waiting for connection from pool")]
    ConnectionRequestTimeout,
    #[error("connection manager has been shut down")]
    ManagerShutdown,
    #[error("unexpected response status {0} {1}")]
    UnexpectedStatus(u16, String),
    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error("io failed: {0:?}")]
    Io(io::Error),
}

impl From<io::Error> for HttpExecError {
    fn from(e: io::Error) -> Self {
        if is_connection_shutdown(&e) {
            HttpExecError::Interrupted
        } else if decode_error(&e).is_some() {
            HttpExecError::Protocol(ProtocolError::InvalidResponseBody(e))
        } else {
            HttpExecError::Io(e)
        }
    }
}

impl From<HttpResponseParseError> for HttpExecError {
    fn from(e: HttpResponseParseError) -> Self {
        match e {
            HttpResponseParseError::NoResponse => HttpExecError::NoResponse,
            HttpResponseParseError::IoFailed(e) => e.into(),
            e => HttpExecError::Protocol(ProtocolError::InvalidResponseHead(e)),
        }
    }
}

impl From<BodyWriteError> for HttpExecError {
    fn from(e: BodyWriteError) -> Self {
        match e {
            BodyWriteError::WriteFailed(e) => e.into(),
            e => HttpExecError::Protocol(ProtocolError::InvalidRequestBody(e)),
        }
    }
}

impl From<EntityWriteError> for HttpExecError {
    fn from(e: EntityWriteError) -> Self {
        match e {
            EntityWriteError::AlreadyConsumed => HttpExecError::Io(io::Error::other(e)),
            EntityWriteError::ReadFailed(e) => HttpExecError::Io(e),
            EntityWriteError::WriteFailed(e) => e.into(),
        }
    }
}

impl From<RoutePlanError> for HttpExecError {
    fn from(e: RoutePlanError) -> Self {
        HttpExecError::Protocol(ProtocolError::RoutePlanFailed(e))
    }
}

impl HttpExecError {
    /// Whether the request may be sent again as is, on a fresh connection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HttpExecError::NoResponse
                | HttpExecError::Io(_)
                | HttpExecError::ConnectionRequestTimeout
        )
    }

    #[inline]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, HttpExecError::Protocol(_))
    }
}

/// The error returned to the caller of a client.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct HttpClientError {
    /// Route of the failed attempt, if one was planned.
    pub route: Option<HttpRoute>,
    /// Set if the failure happened after following at least one redirect.
    pub redirecting: bool,
    #[source]
    pub source: HttpExecError,
}

impl HttpClientError {
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }

    #[inline]
    pub fn is_protocol_error(&self) -> bool {
        self.source.is_protocol_error()
    }
}
