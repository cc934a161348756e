/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use hcx_http::{ContentLengthMode, HttpResponseHead};
use http::{HeaderMap, HeaderName, Method, Version, header};

use crate::ClientContext;

/// Decides whether the connection may carry another request after this response.
pub trait ConnectionReuseStrategy: Send + Sync {
    fn keep_alive(&self, response: &HttpResponseHead, ctx: &ClientContext) -> bool;
}

fn has_token(headers: &HeaderMap, name: HeaderName, token: &str) -> bool {
    headers.get_all(name).iter().any(|v| {
        v.to_str()
            .map(|s| s.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
            .unwrap_or(false)
    })
}

/// Persistence rules of HTTP/1.x.
pub struct DefaultConnectionReuseStrategy;

impl ConnectionReuseStrategy for DefaultConnectionReuseStrategy {
    fn keep_alive(&self, response: &HttpResponseHead, ctx: &ClientContext) -> bool {
        let request = ctx.request_head();
        if let Some(request) = request
            && has_token(&request.headers, header::CONNECTION, "close")
        {
            return false;
        }

        let method = request.map(|r| &r.method).unwrap_or(&Method::GET);
        match response.body_mode(method) {
            // only the close of the connection ends such a body
            Ok(Some(ContentLengthMode::Identity)) => return false,
            Err(_) => return false,
            Ok(_) => {}
        }
        if response.headers.get_all(header::CONTENT_LENGTH).iter().count() > 1 {
            return false;
        }

        let conn_header = if response.headers.contains_key(header::CONNECTION) {
            header::CONNECTION
        } else {
            HeaderName::from_static("proxy-connection")
        };
        if has_token(&response.headers, conn_header.clone(), "close") {
            return false;
        }
        if has_token(&response.headers, conn_header, "keep-alive") {
            return true;
        }
        response.version >= Version::HTTP_11
    }
}

pub struct NoConnectionReuseStrategy;

impl ConnectionReuseStrategy for NoConnectionReuseStrategy {
    fn keep_alive(&self, _response: &HttpResponseHead, _ctx: &ClientContext) -> bool {
        false
    }
}
