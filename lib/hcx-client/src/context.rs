/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::LazyLock;

use hcx_http::HttpRequestHead;
use http::Uri;

use crate::RequestConfig;
use crate::route::{HttpHost, HttpRoute};

static DEFAULT_REQUEST_CONFIG: LazyLock<RequestConfig> = LazyLock::new(RequestConfig::default);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthProtocolState {
    #[default]
    Unchallenged,
    Challenged,
    Handshake,
    Failure,
    Success,
}

/// Progress of authentication against a target or a proxy.
#[derive(Clone, Debug, Default)]
pub struct AuthState {
    state: AuthProtocolState,
    scheme: Option<String>,
    connection_based: bool,
}

impl AuthState {
    #[inline]
    pub fn state(&self) -> AuthProtocolState {
        self.state
    }

    #[inline]
    pub fn set_state(&mut self, state: AuthProtocolState) {
        self.state = state;
    }

    #[inline]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Connection based schemes (NTLM like) bind the auth result to one connection.
    #[inline]
    pub fn is_connection_based(&self) -> bool {
        self.connection_based
    }

    pub fn update(&mut self, scheme: &str, connection_based: bool) {
        self.scheme = Some(scheme.to_string());
        self.connection_based = connection_based;
    }

    pub fn reset(&mut self) {
        *self = AuthState::default();
    }
}

/// Mutable state shared by all stages while executing one logical request.
#[derive(Clone, Debug, Default)]
pub struct ClientContext {
    config: Option<RequestConfig>,
    route: Option<HttpRoute>,
    target_host: Option<HttpHost>,
    request_head: Option<HttpRequestHead>,
    redirect_locations: Vec<Uri>,
    target_auth: AuthState,
    proxy_auth: AuthState,
}

impl ClientContext {
    pub fn new(config: RequestConfig) -> Self {
        ClientContext {
            config: Some(config),
            ..Default::default()
        }
    }

    #[inline]
    pub fn request_config(&self) -> &RequestConfig {
        self.config.as_ref().unwrap_or(&DEFAULT_REQUEST_CONFIG)
    }

    #[inline]
    pub fn has_request_config(&self) -> bool {
        self.config.is_some()
    }

    #[inline]
    pub fn set_request_config(&mut self, config: RequestConfig) {
        self.config = Some(config);
    }

    /// Route of the current attempt.
    #[inline]
    pub fn route(&self) -> Option<&HttpRoute> {
        self.route.as_ref()
    }

    #[inline]
    pub fn set_route(&mut self, route: HttpRoute) {
        self.route = Some(route);
    }

    #[inline]
    pub fn target_host(&self) -> Option<&HttpHost> {
        self.target_host.as_ref()
    }

    #[inline]
    pub fn set_target_host(&mut self, host: HttpHost) {
        self.target_host = Some(host);
    }

    /// Head of the request attempt last sent.
    #[inline]
    pub fn request_head(&self) -> Option<&HttpRequestHead> {
        self.request_head.as_ref()
    }

    #[inline]
    pub fn set_request_head(&mut self, head: HttpRequestHead) {
        self.request_head = Some(head);
    }

    /// Locations visited by redirects so far, in order.
    #[inline]
    pub fn redirect_locations(&self) -> &[Uri] {
        &self.redirect_locations
    }

    #[inline]
    pub fn push_redirect_location(&mut self, uri: Uri) {
        self.redirect_locations.push(uri);
    }

    #[inline]
    pub fn clear_redirect_locations(&mut self) {
        self.redirect_locations.clear();
    }

    #[inline]
    pub fn target_auth_state(&self) -> &AuthState {
        &self.target_auth
    }

    #[inline]
    pub fn target_auth_state_mut(&mut self) -> &mut AuthState {
        &mut self.target_auth
    }

    #[inline]
    pub fn proxy_auth_state(&self) -> &AuthState {
        &self.proxy_auth
    }

    #[inline]
    pub fn proxy_auth_state_mut(&mut self) -> &mut AuthState {
        &mut self.proxy_auth
    }
}
