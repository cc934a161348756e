/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use thiserror::Error;

use super::{DefaultSchemePortResolver, HttpHost, HttpRoute, SchemePortResolver};
use crate::{ClientContext, HttpRequest};

#[derive(Debug, Error)]
pub enum RoutePlanError {
    #[error("target host is not specified")]
    NoTargetHost,
    #[error("unsupported scheme {0}")]
    UnsupportedScheme(String),
    #[error("proxy selection failed: {0}")]
    ProxySelectionFailed(String),
}

/// Hook choosing a proxy for a target, when none is set in the request config.
pub trait DetermineProxy: Send + Sync {
    fn determine_proxy(
        &self,
        target: &HttpHost,
        request: &HttpRequest,
        ctx: &ClientContext,
    ) -> Result<Option<HttpHost>, RoutePlanError>;
}

pub struct NoProxy;

impl DetermineProxy for NoProxy {
    fn determine_proxy(
        &self,
        _target: &HttpHost,
        _request: &HttpRequest,
        _ctx: &ClientContext,
    ) -> Result<Option<HttpHost>, RoutePlanError> {
        Ok(None)
    }
}

pub struct FixedProxy(pub HttpHost);

impl DetermineProxy for FixedProxy {
    fn determine_proxy(
        &self,
        _target: &HttpHost,
        _request: &HttpRequest,
        _ctx: &ClientContext,
    ) -> Result<Option<HttpHost>, RoutePlanError> {
        Ok(Some(self.0.clone()))
    }
}

pub trait HttpRoutePlanner: Send + Sync {
    fn determine_route(
        &self,
        target: Option<&HttpHost>,
        request: &HttpRequest,
        ctx: &ClientContext,
    ) -> Result<HttpRoute, RoutePlanError>;
}

pub struct DefaultRoutePlanner {
    port_resolver: Arc<dyn SchemePortResolver>,
    proxy: Arc<dyn DetermineProxy>,
}

impl Default for DefaultRoutePlanner {
    fn default() -> Self {
        DefaultRoutePlanner::new()
    }
}

impl DefaultRoutePlanner {
    pub fn new() -> Self {
        DefaultRoutePlanner {
            port_resolver: Arc::new(DefaultSchemePortResolver::default()),
            proxy: Arc::new(NoProxy),
        }
    }

    /// A planner sending every request through `proxy`, unless the request
    /// config names another one.
    pub fn with_fixed_proxy(proxy: HttpHost) -> Self {
        DefaultRoutePlanner::new().with_proxy_hook(Arc::new(FixedProxy(proxy)))
    }

    pub fn with_port_resolver(mut self, resolver: Arc<dyn SchemePortResolver>) -> Self {
        self.port_resolver = resolver;
        self
    }

    pub fn with_proxy_hook(mut self, hook: Arc<dyn DetermineProxy>) -> Self {
        self.proxy = hook;
        self
    }
}

impl HttpRoutePlanner for DefaultRoutePlanner {
    fn determine_route(
        &self,
        target: Option<&HttpHost>,
        request: &HttpRequest,
        ctx: &ClientContext,
    ) -> Result<HttpRoute, RoutePlanError> {
        let Some(target) = target else {
            return Err(RoutePlanError::NoTargetHost);
        };

        let config = ctx.request_config();
        let proxy = match config.proxy() {
            Some(proxy) => Some(proxy.clone()),
            None => self.proxy.determine_proxy(target, request, ctx)?,
        };

        let target = match target.port() {
            Some(_) => target.clone(),
            None => target.with_port(self.port_resolver.resolve(target)?),
        };
        let secure = target.scheme() == "https";
        Ok(HttpRoute::new(target, config.local_address(), proxy, secure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestConfig;

    fn get(uri: &'static str) -> HttpRequest {
        HttpRequest::get(http::Uri::from_static(uri))
    }

    #[test]
    fn direct_route() {
        let planner = DefaultRoutePlanner::new();
        let ctx = ClientContext::default();
        let target = HttpHost::new("example.com", None, "http");
        let route = planner
            .determine_route(Some(&target), &get("http://example.com/"), &ctx)
            .unwrap();
        assert_eq!(route.target_host(), &target.with_port(80));
        assert!(route.proxy_host().is_none());
        assert!(!route.is_secure());

        let target = HttpHost::new("example.com", None, "https");
        let route = planner
            .determine_route(Some(&target), &get("https://example.com/"), &ctx)
            .unwrap();
        assert_eq!(route.target_host().port(), Some(443));
        assert!(route.is_secure());
    }

    #[test]
    fn no_target() {
        let planner = DefaultRoutePlanner::new();
        let e = planner
            .determine_route(None, &get("/relative"), &ClientContext::default())
            .unwrap_err();
        assert!(matches!(e, RoutePlanError::NoTargetHost));
    }

    #[test]
    fn unsupported_scheme() {
        let planner = DefaultRoutePlanner::new();
        let target = HttpHost::new("example.com", None, "ftp");
        let e = planner
            .determine_route(Some(&target), &get("/"), &ClientContext::default())
            .unwrap_err();
        assert!(matches!(e, RoutePlanError::UnsupportedScheme(_)));
    }

    #[test]
    fn fixed_proxy() {
        let proxy = HttpHost::new("proxy.local", Some(3128), "http");
        let planner = DefaultRoutePlanner::with_fixed_proxy(proxy.clone());
        let target = HttpHost::new("example.com", Some(8080), "http");
        let route = planner
            .determine_route(Some(&target), &get("/"), &ClientContext::default())
            .unwrap();
        assert_eq!(route.proxy_host(), Some(&proxy));
        assert_eq!(route.target_host(), &target);
        assert!(!route.is_tunnelled());
    }

    #[test]
    fn config_proxy_overrides_hook() {
        let planner = DefaultRoutePlanner::with_fixed_proxy(HttpHost::new("a", Some(1), "http"));
        let other = HttpHost::new("b", Some(2), "http");
        let mut config = RequestConfig::default();
        config.set_proxy(Some(other.clone()));
        config.set_local_address(Some("127.0.0.1".parse().unwrap()));
        let ctx = ClientContext::new(config);

        let target = HttpHost::new("example.com", None, "https");
        let route = planner
            .determine_route(Some(&target), &get("/"), &ctx)
            .unwrap();
        assert_eq!(route.proxy_host(), Some(&other));
        assert!(route.is_tunnelled());
        assert_eq!(route.local_address(), Some("127.0.0.1".parse().unwrap()));
    }
}
