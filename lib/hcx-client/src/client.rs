/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use http::HeaderValue;
use log::debug;

use crate::conn::ConnectionManager;
use crate::exec::{ClientExecChain, MinimalClientExec, RedirectExec};
use crate::protocol::{HttpProcessor, RequestInterceptor, ResponseInterceptor};
use crate::route::{DefaultRoutePlanner, HttpHost, HttpRoutePlanner};
use crate::strategy::{
    ConnectionKeepAliveStrategy, ConnectionReuseStrategy, DefaultConnectionKeepAliveStrategy,
    DefaultConnectionReuseStrategy, DefaultRedirectStrategy, RedirectStrategy,
};
use crate::{
    CancelToken, ClientContext, CloseableResponse, HttpClientError, HttpExecError, HttpRequest,
    RequestConfig, RequestWrapper,
};

type ExecDecorator = Box<dyn FnOnce(Arc<dyn ClientExecChain>) -> Arc<dyn ClientExecChain> + Send>;

/// Entry point executing requests through the assembled chain.
pub struct HttpClient {
    chain: Arc<dyn ClientExecChain>,
    route_planner: Arc<dyn HttpRoutePlanner>,
    manager: Arc<dyn ConnectionManager>,
    default_config: RequestConfig,
}

impl HttpClient {
    pub fn builder(manager: Arc<dyn ConnectionManager>) -> HttpClientBuilder {
        HttpClientBuilder::new(manager)
    }

    #[inline]
    pub fn default_config(&self) -> &RequestConfig {
        &self.default_config
    }

    /// Execute a request to the host named in its absolute uri.
    pub async fn execute(
        &self,
        request: HttpRequest,
        ctx: &mut ClientContext,
        cancel: Option<&CancelToken>,
    ) -> Result<CloseableResponse, HttpClientError> {
        let target = HttpHost::from_uri(request.uri());
        self.execute_on(target, request, ctx, cancel).await
    }

    /// Execute a request to an explicit target host.
    pub async fn execute_on(
        &self,
        target: Option<HttpHost>,
        request: HttpRequest,
        ctx: &mut ClientContext,
        cancel: Option<&CancelToken>,
    ) -> Result<CloseableResponse, HttpClientError> {
        if let Some(config) = request.config() {
            ctx.set_request_config(config.clone());
        } else if !ctx.has_request_config() {
            ctx.set_request_config(self.default_config.clone());
        }

        let route = self
            .route_planner
            .determine_route(target.as_ref(), &request, ctx)
            .map_err(|e| HttpClientError {
                route: None,
                redirecting: false,
                source: e.into(),
            })?;
        debug!(
            "executing {} {} via {route}",
            request.method(),
            request.uri()
        );

        let mut wrapper = RequestWrapper::wrap(request, target);
        self.chain
            .execute(&route, &mut wrapper, ctx, cancel)
            .await
            .map_err(|source| client_error(ctx, source))
    }

    /// Shut down the connection manager, failing all pooled and leased connections.
    pub fn shutdown(&self) {
        self.manager.shutdown();
    }
}

fn client_error(ctx: &ClientContext, source: HttpExecError) -> HttpClientError {
    HttpClientError {
        route: ctx.route().cloned(),
        redirecting: !ctx.redirect_locations().is_empty(),
        source,
    }
}

pub struct HttpClientBuilder {
    manager: Arc<dyn ConnectionManager>,
    route_planner: Option<Arc<dyn HttpRoutePlanner>>,
    proxy: Option<HttpHost>,
    reuse_strategy: Arc<dyn ConnectionReuseStrategy>,
    keep_alive_strategy: Arc<dyn ConnectionKeepAliveStrategy>,
    redirect_strategy: Arc<dyn RedirectStrategy>,
    redirect_handling_disabled: bool,
    user_agent: Option<HeaderValue>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    decorators: Vec<ExecDecorator>,
    default_config: RequestConfig,
}

impl HttpClientBuilder {
    pub fn new(manager: Arc<dyn ConnectionManager>) -> Self {
        HttpClientBuilder {
            manager,
            route_planner: None,
            proxy: None,
            reuse_strategy: Arc::new(DefaultConnectionReuseStrategy),
            keep_alive_strategy: Arc::new(DefaultConnectionKeepAliveStrategy::default()),
            redirect_strategy: Arc::new(DefaultRedirectStrategy::default()),
            redirect_handling_disabled: false,
            user_agent: None,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
            decorators: Vec::new(),
            default_config: RequestConfig::default(),
        }
    }

    /// Takes precedence over [`HttpClientBuilder::proxy`].
    pub fn route_planner(mut self, planner: Arc<dyn HttpRoutePlanner>) -> Self {
        self.route_planner = Some(planner);
        self
    }

    pub fn proxy(mut self, proxy: HttpHost) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn reuse_strategy(mut self, strategy: Arc<dyn ConnectionReuseStrategy>) -> Self {
        self.reuse_strategy = strategy;
        self
    }

    pub fn keep_alive_strategy(mut self, strategy: Arc<dyn ConnectionKeepAliveStrategy>) -> Self {
        self.keep_alive_strategy = strategy;
        self
    }

    pub fn redirect_strategy(mut self, strategy: Arc<dyn RedirectStrategy>) -> Self {
        self.redirect_strategy = strategy;
        self
    }

    pub fn disable_redirect_handling(mut self) -> Self {
        self.redirect_handling_disabled = true;
        self
    }

    pub fn user_agent(mut self, user_agent: HeaderValue) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Run after the built-in request interceptors.
    pub fn add_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    pub fn add_response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }

    /// Wrap the terminal stage with another one, such as a retry or auth stage.
    ///
    /// Decorators are applied in the order added, the redirect stage stays outermost.
    pub fn decorate_exec<F>(mut self, decorator: F) -> Self
    where
        F: FnOnce(Arc<dyn ClientExecChain>) -> Arc<dyn ClientExecChain> + Send + 'static,
    {
        self.decorators.push(Box::new(decorator));
        self
    }

    pub fn default_config(mut self, config: RequestConfig) -> Self {
        self.default_config = config;
        self
    }

    pub fn build(self) -> HttpClient {
        let mut processor = HttpProcessor::client_defaults(self.user_agent);
        for interceptor in self.request_interceptors {
            processor.add_request_interceptor(interceptor);
        }
        for interceptor in self.response_interceptors {
            processor.add_response_interceptor(interceptor);
        }

        let mut chain: Arc<dyn ClientExecChain> = Arc::new(
            MinimalClientExec::new(
                self.manager.clone(),
                self.reuse_strategy,
                self.keep_alive_strategy,
            )
            .with_processor(processor),
        );
        for decorate in self.decorators {
            chain = decorate(chain);
        }

        let route_planner = self.route_planner.unwrap_or_else(|| match self.proxy {
            Some(proxy) => Arc::new(DefaultRoutePlanner::with_fixed_proxy(proxy)),
            None => Arc::new(DefaultRoutePlanner::new()),
        });
        if !self.redirect_handling_disabled {
            chain = Arc::new(RedirectExec::new(
                chain,
                route_planner.clone(),
                self.redirect_strategy,
            ));
        }

        HttpClient {
            chain,
            route_planner,
            manager: self.manager,
            default_config: self.default_config,
        }
    }
}
