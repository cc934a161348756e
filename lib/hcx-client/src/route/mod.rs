/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::net::IpAddr;

mod host;
pub use host::{HttpHost, HttpHostParseError};

mod scheme;
pub use scheme::{DefaultSchemePortResolver, SchemePortResolver};

mod planner;
pub use planner::{
    DefaultRoutePlanner, DetermineProxy, FixedProxy, HttpRoutePlanner, NoProxy, RoutePlanError,
};

/// The path a request travels: target, optional proxy and local bind address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpRoute {
    target: HttpHost,
    local_address: Option<IpAddr>,
    proxy: Option<HttpHost>,
    secure: bool,
}

impl HttpRoute {
    pub fn new(
        target: HttpHost,
        local_address: Option<IpAddr>,
        proxy: Option<HttpHost>,
        secure: bool,
    ) -> Self {
        HttpRoute {
            target,
            local_address,
            proxy,
            secure,
        }
    }

    pub fn direct(target: HttpHost) -> Self {
        let secure = target.scheme() == "https";
        HttpRoute::new(target, None, None, secure)
    }

    #[inline]
    pub fn target_host(&self) -> &HttpHost {
        &self.target
    }

    #[inline]
    pub fn proxy_host(&self) -> Option<&HttpHost> {
        self.proxy.as_ref()
    }

    #[inline]
    pub fn local_address(&self) -> Option<IpAddr> {
        self.local_address
    }

    #[inline]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// A secure route through a proxy goes over a `CONNECT` tunnel.
    #[inline]
    pub fn is_tunnelled(&self) -> bool {
        self.secure && self.proxy.is_some()
    }

    pub fn hop_count(&self) -> usize {
        if self.proxy.is_some() { 2 } else { 1 }
    }

    /// The host the connection is actually opened to.
    pub fn first_hop(&self) -> &HttpHost {
        self.proxy.as_ref().unwrap_or(&self.target)
    }
}

impl fmt::Display for HttpRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ip) = self.local_address {
            write!(f, "{ip}->")?;
        }
        write!(f, "{{")?;
        if self.is_tunnelled() {
            write!(f, "t")?;
        }
        if self.secure {
            write!(f, "s")?;
        }
        write!(f, "}}->")?;
        if let Some(proxy) = &self.proxy {
            write!(f, "{proxy}->")?;
        }
        write!(f, "{}", self.target)
    }
}
