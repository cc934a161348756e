/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use hcx_http::HttpResponseHead;
use http::HeaderName;

use crate::ClientContext;

/// How long a reusable connection may stay idle in the pool.
pub trait ConnectionKeepAliveStrategy: Send + Sync {
    /// `None` means no limit.
    fn keep_alive_duration(
        &self,
        response: &HttpResponseHead,
        ctx: &ClientContext,
    ) -> Option<Duration>;
}

/// Honours the `timeout` parameter of a `Keep-Alive` response header.
#[derive(Default)]
pub struct DefaultConnectionKeepAliveStrategy {
    max_idle: Option<Duration>,
}

impl DefaultConnectionKeepAliveStrategy {
    /// Cap for the idle time, also used when the server announces nothing.
    pub fn with_max_idle(max_idle: Duration) -> Self {
        DefaultConnectionKeepAliveStrategy {
            max_idle: Some(max_idle),
        }
    }
}

fn keep_alive_timeout(response: &HttpResponseHead) -> Option<u64> {
    response
        .headers
        .get_all(HeaderName::from_static("keep-alive"))
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|param| {
            let (name, value) = param.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("timeout") {
                value.trim().trim_matches('"').parse::<u64>().ok()
            } else {
                None
            }
        })
        .next()
}

impl ConnectionKeepAliveStrategy for DefaultConnectionKeepAliveStrategy {
    fn keep_alive_duration(
        &self,
        response: &HttpResponseHead,
        _ctx: &ClientContext,
    ) -> Option<Duration> {
        match keep_alive_timeout(response).map(Duration::from_secs) {
            Some(timeout) => match self.max_idle {
                Some(max) => Some(timeout.min(max)),
                None => Some(timeout),
            },
            None => self.max_idle,
        }
    }
}
