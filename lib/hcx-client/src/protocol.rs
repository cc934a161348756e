/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Interceptors completing a request head before it is sent, and
//! inspecting a response head once received.

use std::sync::Arc;

use hcx_http::{HttpRequestHead, HttpResponseHead};
use http::{HeaderName, HeaderValue, Method, Version, header};

use crate::{ClientContext, HttpEntity, ProtocolError};

pub const DEFAULT_USER_AGENT: &str = concat!("hcx-client/", env!("CARGO_PKG_VERSION"));

fn proxy_connection() -> HeaderName {
    HeaderName::from_static("proxy-connection")
}

fn keep_alive() -> HeaderValue {
    HeaderValue::from_static("Keep-Alive")
}

pub trait RequestInterceptor: Send + Sync {
    fn process(
        &self,
        head: &mut HttpRequestHead,
        entity: Option<&HttpEntity>,
        ctx: &ClientContext,
    ) -> Result<(), ProtocolError>;
}

pub trait ResponseInterceptor: Send + Sync {
    fn process(&self, head: &mut HttpResponseHead, ctx: &ClientContext)
    -> Result<(), ProtocolError>;
}

/// Sets the body framing headers from the entity.
#[derive(Default)]
pub struct RequestContent {
    overwrite: bool,
}

impl RequestContent {
    /// Replace framing headers set by the caller instead of failing.
    pub fn overwrite() -> Self {
        RequestContent { overwrite: true }
    }
}

impl RequestInterceptor for RequestContent {
    fn process(
        &self,
        head: &mut HttpRequestHead,
        entity: Option<&HttpEntity>,
        _ctx: &ClientContext,
    ) -> Result<(), ProtocolError> {
        if self.overwrite {
            head.headers.remove(header::TRANSFER_ENCODING);
            head.headers.remove(header::CONTENT_LENGTH);
        } else {
            if head.headers.contains_key(header::TRANSFER_ENCODING) {
                return Err(ProtocolError::Interceptor(
                    "Transfer-Encoding header already present".to_string(),
                ));
            }
            if head.headers.contains_key(header::CONTENT_LENGTH) {
                return Err(ProtocolError::Interceptor(
                    "Content-Length header already present".to_string(),
                ));
            }
        }

        let Some(entity) = entity else {
            if matches!(head.method, Method::POST | Method::PUT | Method::PATCH) {
                head.headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
            }
            return Ok(());
        };

        match entity.content_length() {
            Some(len) if !entity.is_chunked() => {
                head.headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
            }
            _ => {
                if head.version < Version::HTTP_11 {
                    return Err(ProtocolError::Interceptor(format!(
                        "chunked transfer encoding not allowed for {:?}",
                        head.version
                    )));
                }
                head.headers.insert(
                    header::TRANSFER_ENCODING,
                    HeaderValue::from_static("chunked"),
                );
            }
        }
        if let Some(content_type) = entity.content_type()
            && !head.headers.contains_key(header::CONTENT_TYPE)
        {
            let value = HeaderValue::from_str(content_type.as_ref()).map_err(|_| {
                ProtocolError::Interceptor(format!("invalid content type {content_type}"))
            })?;
            head.headers.insert(header::CONTENT_TYPE, value);
        }
        Ok(())
    }
}

/// Adds the `Host` header.
pub struct RequestTargetHost;

impl RequestInterceptor for RequestTargetHost {
    fn process(
        &self,
        head: &mut HttpRequestHead,
        _entity: Option<&HttpEntity>,
        ctx: &ClientContext,
    ) -> Result<(), ProtocolError> {
        if head.headers.contains_key(header::HOST) {
            return Ok(());
        }
        let target = ctx
            .target_host()
            .or_else(|| ctx.route().map(|r| r.target_host()));
        match target {
            Some(target) => {
                let value = HeaderValue::from_str(&target.to_host_string()).map_err(|_| {
                    ProtocolError::Interceptor(format!("invalid target host {target}"))
                })?;
                head.headers.insert(header::HOST, value);
                Ok(())
            }
            None if head.version < Version::HTTP_11 => Ok(()),
            None => Err(ProtocolError::Interceptor("target host missing".to_string())),
        }
    }
}

/// Asks for a persistent connection to the next hop.
pub struct RequestClientConnControl;

impl RequestInterceptor for RequestClientConnControl {
    fn process(
        &self,
        head: &mut HttpRequestHead,
        _entity: Option<&HttpEntity>,
        ctx: &ClientContext,
    ) -> Result<(), ProtocolError> {
        if head.method == Method::CONNECT {
            head.headers.insert(proxy_connection(), keep_alive());
            return Ok(());
        }
        let Some(route) = ctx.route() else {
            return Ok(());
        };
        if (route.hop_count() == 1 || route.is_tunnelled())
            && !head.headers.contains_key(header::CONNECTION)
        {
            head.headers.insert(header::CONNECTION, keep_alive());
        }
        if route.hop_count() == 2
            && !route.is_tunnelled()
            && !head.headers.contains_key("proxy-connection")
        {
            head.headers.insert(proxy_connection(), keep_alive());
        }
        Ok(())
    }
}

/// Adds `Expect: 100-continue` to requests with a non-empty body if enabled in the config.
pub struct RequestExpectContinue;

impl RequestInterceptor for RequestExpectContinue {
    fn process(
        &self,
        head: &mut HttpRequestHead,
        entity: Option<&HttpEntity>,
        ctx: &ClientContext,
    ) -> Result<(), ProtocolError> {
        if head.headers.contains_key(header::EXPECT) || head.version <= Version::HTTP_10 {
            return Ok(());
        }
        let Some(entity) = entity else {
            return Ok(());
        };
        if entity.content_length() != Some(0) && ctx.request_config().expect_continue_enabled() {
            head.headers
                .insert(header::EXPECT, HeaderValue::from_static("100-continue"));
        }
        Ok(())
    }
}

pub struct RequestUserAgent {
    user_agent: HeaderValue,
}

impl Default for RequestUserAgent {
    fn default() -> Self {
        RequestUserAgent {
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }
}

impl RequestUserAgent {
    pub fn new(user_agent: HeaderValue) -> Self {
        RequestUserAgent { user_agent }
    }
}

impl RequestInterceptor for RequestUserAgent {
    fn process(
        &self,
        head: &mut HttpRequestHead,
        _entity: Option<&HttpEntity>,
        _ctx: &ClientContext,
    ) -> Result<(), ProtocolError> {
        if !head.headers.contains_key(header::USER_AGENT) {
            head.headers
                .insert(header::USER_AGENT, self.user_agent.clone());
        }
        Ok(())
    }
}

/// Ordered interceptor lists run by the terminal executor.
#[derive(Clone, Default)]
pub struct HttpProcessor {
    request: Vec<Arc<dyn RequestInterceptor>>,
    response: Vec<Arc<dyn ResponseInterceptor>>,
}

impl HttpProcessor {
    /// The interceptors every client request goes through.
    pub fn client_defaults(user_agent: Option<HeaderValue>) -> Self {
        let user_agent = match user_agent {
            Some(v) => RequestUserAgent::new(v),
            None => RequestUserAgent::default(),
        };
        let mut processor = HttpProcessor::default();
        processor.add_request_interceptor(Arc::new(RequestContent::default()));
        processor.add_request_interceptor(Arc::new(RequestTargetHost));
        processor.add_request_interceptor(Arc::new(RequestClientConnControl));
        processor.add_request_interceptor(Arc::new(user_agent));
        processor.add_request_interceptor(Arc::new(RequestExpectContinue));
        processor
    }

    pub fn add_request_interceptor(&mut self, interceptor: Arc<dyn RequestInterceptor>) {
        self.request.push(interceptor);
    }

    pub fn add_response_interceptor(&mut self, interceptor: Arc<dyn ResponseInterceptor>) {
        self.response.push(interceptor);
    }

    pub fn process_request(
        &self,
        head: &mut HttpRequestHead,
        entity: Option<&HttpEntity>,
        ctx: &ClientContext,
    ) -> Result<(), ProtocolError> {
        for interceptor in &self.request {
            interceptor.process(head, entity, ctx)?;
        }
        Ok(())
    }

    pub fn process_response(
        &self,
        head: &mut HttpResponseHead,
        ctx: &ClientContext,
    ) -> Result<(), ProtocolError> {
        for interceptor in &self.response {
            interceptor.process(head, ctx)?;
        }
        Ok(())
    }
}
