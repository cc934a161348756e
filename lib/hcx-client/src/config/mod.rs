/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::time::Duration;

use hcx_http::MessageConstraints;

use crate::route::HttpHost;

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_MAX_REDIRECTS: usize = 50;
const DEFAULT_CHUNK_FRAGMENT_SIZE: usize = 2048;
const DEFAULT_EXPECT_CONTINUE_TIMEOUT: Duration = Duration::from_secs(3);

/// Per request settings, falling back to the client defaults when not set on the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestConfig {
    redirects_enabled: bool,
    max_redirects: usize,
    circular_redirects_allowed: bool,
    relative_redirects_allowed: bool,
    expect_continue_enabled: bool,
    expect_continue_timeout: Duration,
    connection_request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    socket_timeout: Option<Duration>,
    proxy: Option<HttpHost>,
    local_address: Option<IpAddr>,
    chunk_fragment_size: usize,
    message_constraints: MessageConstraints,
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig {
            redirects_enabled: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            circular_redirects_allowed: false,
            relative_redirects_allowed: true,
            expect_continue_enabled: false,
            expect_continue_timeout: DEFAULT_EXPECT_CONTINUE_TIMEOUT,
            connection_request_timeout: None,
            connect_timeout: None,
            socket_timeout: None,
            proxy: None,
            local_address: None,
            chunk_fragment_size: DEFAULT_CHUNK_FRAGMENT_SIZE,
            message_constraints: MessageConstraints::default(),
        }
    }
}

fn non_zero(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}

impl RequestConfig {
    #[inline]
    pub fn redirects_enabled(&self) -> bool {
        self.redirects_enabled
    }

    #[inline]
    pub fn set_redirects_enabled(&mut self, enabled: bool) {
        self.redirects_enabled = enabled;
    }

    /// The redirect limit, a configured value of 0 means the default 50.
    pub fn max_redirects(&self) -> usize {
        if self.max_redirects == 0 {
            DEFAULT_MAX_REDIRECTS
        } else {
            self.max_redirects
        }
    }

    #[inline]
    pub fn set_max_redirects(&mut self, max: usize) {
        self.max_redirects = max;
    }

    #[inline]
    pub fn circular_redirects_allowed(&self) -> bool {
        self.circular_redirects_allowed
    }

    #[inline]
    pub fn set_circular_redirects_allowed(&mut self, allowed: bool) {
        self.circular_redirects_allowed = allowed;
    }

    #[inline]
    pub fn relative_redirects_allowed(&self) -> bool {
        self.relative_redirects_allowed
    }

    #[inline]
    pub fn set_relative_redirects_allowed(&mut self, allowed: bool) {
        self.relative_redirects_allowed = allowed;
    }

    /// Send `Expect: 100-continue` with requests carrying a body.
    #[inline]
    pub fn expect_continue_enabled(&self) -> bool {
        self.expect_continue_enabled
    }

    #[inline]
    pub fn set_expect_continue_enabled(&mut self, enabled: bool) {
        self.expect_continue_enabled = enabled;
    }

    /// How long to wait for the interim 100 before sending the body anyway.
    #[inline]
    pub fn expect_continue_timeout(&self) -> Duration {
        self.expect_continue_timeout
    }

    #[inline]
    pub fn set_expect_continue_timeout(&mut self, timeout: Duration) {
        self.expect_continue_timeout = timeout;
    }

    /// Max time to wait for a connection lease, `None` to wait forever.
    #[inline]
    pub fn connection_request_timeout(&self) -> Option<Duration> {
        self.connection_request_timeout
    }

    /// A zero duration is the same as `None`.
    #[inline]
    pub fn set_connection_request_timeout(&mut self, timeout: Option<Duration>) {
        self.connection_request_timeout = non_zero(timeout);
    }

    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    #[inline]
    pub fn set_connect_timeout(&mut self, timeout: Option<Duration>) {
        self.connect_timeout = non_zero(timeout);
    }

    /// Max idle time of a single read or write on the connection.
    #[inline]
    pub fn socket_timeout(&self) -> Option<Duration> {
        self.socket_timeout
    }

    #[inline]
    pub fn set_socket_timeout(&mut self, timeout: Option<Duration>) {
        self.socket_timeout = non_zero(timeout);
    }

    #[inline]
    pub fn proxy(&self) -> Option<&HttpHost> {
        self.proxy.as_ref()
    }

    #[inline]
    pub fn set_proxy(&mut self, proxy: Option<HttpHost>) {
        self.proxy = proxy;
    }

    #[inline]
    pub fn local_address(&self) -> Option<IpAddr> {
        self.local_address
    }

    #[inline]
    pub fn set_local_address(&mut self, addr: Option<IpAddr>) {
        self.local_address = addr;
    }

    #[inline]
    pub fn chunk_fragment_size(&self) -> usize {
        self.chunk_fragment_size
    }

    #[inline]
    pub fn set_chunk_fragment_size(&mut self, size: usize) {
        self.chunk_fragment_size = size;
    }

    #[inline]
    pub fn message_constraints(&self) -> &MessageConstraints {
        &self.message_constraints
    }

    #[inline]
    pub fn message_constraints_mut(&mut self) -> &mut MessageConstraints {
        &mut self.message_constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RequestConfig::default();
        assert!(config.redirects_enabled());
        assert_eq!(config.max_redirects(), 50);
        assert!(!config.circular_redirects_allowed());
        assert!(config.relative_redirects_allowed());
        assert!(!config.expect_continue_enabled());
        assert_eq!(config.expect_continue_timeout(), Duration::from_secs(3));
        assert!(config.connection_request_timeout().is_none());
        assert_eq!(config.chunk_fragment_size(), 2048);
    }

    #[test]
    fn zero_values() {
        let mut config = RequestConfig::default();
        config.set_max_redirects(0);
        assert_eq!(config.max_redirects(), 50);
        config.set_max_redirects(3);
        assert_eq!(config.max_redirects(), 3);

        config.set_socket_timeout(Some(Duration::ZERO));
        assert!(config.socket_timeout().is_none());
        config.set_socket_timeout(Some(Duration::from_secs(5)));
        assert_eq!(config.socket_timeout(), Some(Duration::from_secs(5)));
    }
}
